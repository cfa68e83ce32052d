//! A layer repeating every action for a fixed number of steps.
use anyhow::Result;
use gympool_core::{record::Record, BoxSpace, Env, EnvError, Step};
use log::debug;
use serde::{Deserialize, Serialize};

/// Configuration of [`FrameSkip`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSkipConfig {
    /// Number of inner steps per outer step.
    pub skip: usize,
}

impl Default for FrameSkipConfig {
    fn default() -> Self {
        Self { skip: 4 }
    }
}

impl FrameSkipConfig {
    /// Sets the number of inner steps per outer step.
    pub fn skip(mut self, v: usize) -> Self {
        self.skip = v;
        self
    }
}

/// Repeats an action `skip` times and sums the rewards.
///
/// Stops early when the episode ends; the last inner observation and flags are returned.
#[derive(Clone, Debug)]
pub struct FrameSkip<E> {
    env: E,
    skip: usize,
}

impl<E: Env> FrameSkip<E> {
    /// Wraps an environment.
    pub fn new(env: E, config: &FrameSkipConfig) -> Result<Self> {
        if config.skip == 0 {
            return Err(EnvError::config("frame skip must be positive").into());
        }
        debug!("FrameSkip: {} steps per action", config.skip);
        Ok(Self {
            env,
            skip: config.skip,
        })
    }
}

impl<E: Env> Env for FrameSkip<E> {
    type Obs = E::Obs;
    type Act = E::Act;
    type Info = E::Info;

    fn observation_space(&self) -> &BoxSpace {
        self.env.observation_space()
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        self.env.reset()
    }

    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)> {
        let (mut step, mut record) = self.env.step(a)?;
        let mut reward = step.reward;
        for _ in 1..self.skip {
            if step.is_done() {
                break;
            }
            let (step_, record_) = self.env.step(a)?;
            reward += step_.reward;
            step = step_;
            record = record.merge(record_);
        }
        let mut step: Step<Self> = step.cast();
        step.reward = reward;
        Ok((step, record))
    }

    fn close(&mut self) -> Result<()> {
        self.env.close()
    }

    fn seed(&mut self, seed: u64) {
        self.env.seed(seed)
    }
}
