//! Deterministic environments used in tests and documentation.
//!
//! Both environments count the steps taken since the last reset and end the
//! episode after a fixed number of steps. The observation encodes the counter,
//! which makes it easy to tell a fresh initial observation from a terminal one.
use crate::{record::Record, BoxSpace, Env, GymAct, GymInfo, Step};
use anyhow::{anyhow, Result};
use ndarray::{ArrayD, IxDyn};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

fn reward_of(a: &GymAct) -> f32 {
    match a {
        GymAct::Discrete(a) => *a as f32,
        GymAct::Continuous(v) => v.iter().sum(),
    }
}

/// Dummy environment with feature-vector observations.
///
/// The observation has shape `[dim]`. Element 0 is the number of steps since the last
/// reset, the remaining elements hold the seed. The reward equals the action
/// (discrete index, or the sum of a continuous action).
#[derive(Clone, Debug)]
pub struct DummyEnv {
    space: BoxSpace,
    episode_len: usize,
    count: usize,
    seed: u64,
    fail_at: Option<usize>,
    n_closed: Arc<AtomicUsize>,
}

impl DummyEnv {
    /// Constructs an environment with observations of shape `[dim]` and
    /// episodes of `episode_len` steps.
    pub fn new(dim: usize, episode_len: usize) -> Self {
        Self {
            space: BoxSpace::new(0.0, f32::MAX, vec![dim]),
            episode_len,
            count: 0,
            seed: 0,
            fail_at: None,
            n_closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Makes the `n`-th step after a reset fail.
    pub fn fail_at(mut self, n: usize) -> Self {
        self.fail_at = Some(n);
        self
    }

    /// Overrides the declared observation space, without changing emitted observations.
    pub fn declare_space(mut self, space: BoxSpace) -> Self {
        self.space = space;
        self
    }

    /// Counter of `close()` calls, shared by all clones of this environment.
    pub fn n_closed(&self) -> Arc<AtomicUsize> {
        self.n_closed.clone()
    }

    fn obs(&self) -> ArrayD<f32> {
        let dim = self.space.shape.iter().product::<usize>().max(1);
        let mut obs = ArrayD::from_elem(IxDyn(&[dim]), self.seed as f32);
        obs[[0]] = self.count as f32;
        obs
    }
}

impl Env for DummyEnv {
    type Obs = ArrayD<f32>;
    type Act = GymAct;
    type Info = GymInfo;

    fn observation_space(&self) -> &BoxSpace {
        &self.space
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        self.count = 0;
        Ok(self.obs())
    }

    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)> {
        self.count += 1;
        if self.fail_at == Some(self.count) {
            return Err(anyhow!("simulated failure at step {}", self.count));
        }
        let is_terminated = self.count >= self.episode_len;
        let step = Step::new(
            self.obs(),
            a.clone(),
            reward_of(a),
            is_terminated,
            false,
            GymInfo {},
        );
        Ok((step, Record::empty()))
    }

    fn close(&mut self) -> Result<()> {
        self.n_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn seed(&mut self, seed: u64) {
        self.seed = seed;
    }
}

/// Dummy environment with `u8` image observations of shape `[height, width, channels]`.
///
/// Every pixel of channel `c` holds [`DummyImageEnv::pixel`]`(count, c)`, where `count`
/// is the number of steps since the last reset.
#[derive(Clone, Debug)]
pub struct DummyImageEnv {
    space: BoxSpace,
    episode_len: usize,
    count: usize,
}

impl DummyImageEnv {
    /// Constructs an environment.
    pub fn new(height: usize, width: usize, channels: usize, episode_len: usize) -> Self {
        Self {
            space: BoxSpace::new(0.0, 255.0, vec![height, width, channels]),
            episode_len,
            count: 0,
        }
    }

    /// Pixel value of channel `c` after `count` steps.
    pub fn pixel(count: usize, c: usize) -> u8 {
        ((count * 16 + c * 64) % 256) as u8
    }

    fn obs(&self) -> ArrayD<u8> {
        let count = self.count;
        ArrayD::from_shape_fn(IxDyn(&self.space.shape), |ix| Self::pixel(count, ix[2]))
    }
}

impl Env for DummyImageEnv {
    type Obs = ArrayD<u8>;
    type Act = GymAct;
    type Info = GymInfo;

    fn observation_space(&self) -> &BoxSpace {
        &self.space
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        self.count = 0;
        Ok(self.obs())
    }

    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)> {
        self.count += 1;
        let is_terminated = self.count >= self.episode_len;
        let step = Step::new(
            self.obs(),
            a.clone(),
            reward_of(a),
            is_terminated,
            false,
            GymInfo {},
        );
        Ok((step, Record::empty()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn test_dummy_env_episode() -> Result<()> {
        let mut env = DummyEnv::new(2, 2);
        env.seed(7);
        let obs = env.reset()?;
        assert_eq!(obs.as_slice().unwrap(), &[0.0, 7.0]);

        let (step, _) = env.step(&GymAct::Discrete(3))?;
        assert_eq!(step.reward, 3.0);
        assert!(!step.is_done());

        let (step, _) = env.step(&GymAct::Discrete(3))?;
        assert!(step.is_done());
        assert_eq!(step.obs[[0]], 2.0);
        Ok(())
    }

    #[test]
    fn test_dummy_env_failure() {
        let mut env = DummyEnv::new(1, 10).fail_at(2);
        env.reset().unwrap();
        assert!(env.step(&GymAct::Discrete(0)).is_ok());
        assert!(env.step(&GymAct::Discrete(0)).is_err());
    }
}
