//! A layer truncating episodes after a fixed number of steps.
use anyhow::Result;
use gympool_core::{
    record::{Record, RecordValue},
    BoxSpace, Env, EnvError, Step,
};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// Configuration of [`TimeLimit`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLimitConfig {
    /// Maximum number of steps in an episode.
    pub max_episode_steps: usize,
}

impl TimeLimitConfig {
    /// Constructs a configuration.
    pub fn new(max_episode_steps: usize) -> Self {
        Self { max_episode_steps }
    }
}

/// Marks the step on which the episode length reaches the limit as truncated.
///
/// A step that terminates the episode at the same time is reported as terminated only.
/// Truncated steps carry `"time_limit_truncated" = 1.0` in their record.
#[derive(Clone, Debug)]
pub struct TimeLimit<E> {
    env: E,
    max_episode_steps: usize,
    elapsed_steps: usize,
}

impl<E: Env> TimeLimit<E> {
    /// Wraps an environment.
    pub fn new(env: E, config: &TimeLimitConfig) -> Result<Self> {
        if config.max_episode_steps == 0 {
            return Err(EnvError::config("episode step limit must be positive").into());
        }
        debug!("TimeLimit: {} steps per episode", config.max_episode_steps);
        Ok(Self {
            env,
            max_episode_steps: config.max_episode_steps,
            elapsed_steps: 0,
        })
    }

    /// Number of steps since the last reset.
    pub fn elapsed_steps(&self) -> usize {
        self.elapsed_steps
    }
}

impl<E: Env> Env for TimeLimit<E> {
    type Obs = E::Obs;
    type Act = E::Act;
    type Info = E::Info;

    fn observation_space(&self) -> &BoxSpace {
        self.env.observation_space()
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        self.elapsed_steps = 0;
        self.env.reset()
    }

    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)> {
        let (step, mut record) = self.env.step(a)?;
        let mut step: Step<Self> = step.cast();
        self.elapsed_steps += 1;

        if self.elapsed_steps >= self.max_episode_steps && !step.is_terminated {
            trace!("TimeLimit: truncated after {} steps", self.elapsed_steps);
            step.is_truncated = true;
            record.insert("time_limit_truncated", RecordValue::Scalar(1.0));
        }
        Ok((step, record))
    }

    fn close(&mut self) -> Result<()> {
        self.env.close()
    }

    fn seed(&mut self, seed: u64) {
        self.env.seed(seed)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use gympool_core::{dummy::DummyEnv, GymAct};
    use test_log::test;

    #[test]
    fn test_truncates_at_limit() -> Result<()> {
        let mut env = TimeLimit::new(DummyEnv::new(1, 100), &TimeLimitConfig::new(3))?;
        env.reset()?;
        for i in 1..=3 {
            let (step, record) = env.step(&GymAct::Discrete(0))?;
            assert_eq!(step.is_truncated, i == 3);
            assert!(!step.is_terminated);
            assert_eq!(record.get_scalar("time_limit_truncated").is_ok(), i == 3);
        }

        // The counter restarts with the episode
        env.reset()?;
        assert_eq!(env.elapsed_steps(), 0);
        let (step, _) = env.step(&GymAct::Discrete(0))?;
        assert!(!step.is_done());
        Ok(())
    }

    #[test]
    fn test_termination_wins() -> Result<()> {
        let mut env = TimeLimit::new(DummyEnv::new(1, 2), &TimeLimitConfig::new(2))?;
        env.reset()?;
        env.step(&GymAct::Discrete(0))?;
        let (step, _) = env.step(&GymAct::Discrete(0))?;
        assert!(step.is_terminated);
        assert!(!step.is_truncated);
        Ok(())
    }

    #[test]
    fn test_zero_limit() {
        let e = TimeLimit::new(DummyEnv::new(1, 2), &TimeLimitConfig::new(0)).unwrap_err();
        assert!(matches!(
            e.downcast_ref::<EnvError>(),
            Some(EnvError::Configuration(_))
        ));
    }
}
