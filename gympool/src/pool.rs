//! Batched pool of environments stepped in lockstep.
use anyhow::{Context, Result};
use gympool_core::{record::Record, BoxSpace, Env, EnvError};
use log::{debug, trace};
use ndarray::{ArrayD, Axis, IxDyn};
use serde::{Deserialize, Serialize};

/// Configuration of [`EnvPool`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvPoolConfig {
    /// Number of slots.
    pub n_envs: usize,

    /// If given, slot `i` is seeded with `seed + i` whenever it is created.
    /// The sum wraps around at `u64::MAX`.
    pub seed: Option<u64>,
}

impl Default for EnvPoolConfig {
    fn default() -> Self {
        Self {
            n_envs: 1,
            seed: None,
        }
    }
}

impl EnvPoolConfig {
    /// Sets the number of slots.
    pub fn n_envs(mut self, v: usize) -> Self {
        self.n_envs = v;
        self
    }

    /// Sets the base seed of the slots.
    pub fn seed(mut self, v: Option<u64>) -> Self {
        self.seed = v;
        self
    }
}

/// Result of [`EnvPool::step`].
#[derive(Clone, Debug, PartialEq)]
pub struct PoolStep {
    /// Current observations of all slots, of shape `(N, *obs_shape)`.
    ///
    /// The observation of a slot whose episode ended in this step is already the
    /// initial observation of its next episode.
    pub obs: ArrayD<f32>,

    /// Rewards of the step, one per slot.
    pub reward: Vec<f32>,

    /// Whether the episode of each slot ended in this step, by termination or truncation.
    pub is_done: Vec<bool>,

    /// Auxiliary information, currently empty.
    pub aux: Record,
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// A fixed number of independent copies of an environment, stepped together.
///
/// The pool keeps a batch of current observations of shape `(N, *obs_shape)`,
/// where `N` is the number of slots and `obs_shape` the declared shape of the
/// template environment. Every slot is a clone of the template.
///
/// Slots are reset automatically at the end of an episode, so callers never
/// see terminal observations in [`PoolStep::obs`]. Episode boundaries are reported
/// by [`PoolStep::is_done`], next to the reward of the last step of the episode.
///
/// ```mermaid
/// stateDiagram-v2
///     [*] --> Ready: new() / reset()
///     Ready --> Ready: step()
///     Ready --> Ready: reset()
///     Ready --> Closed: close()
///     Closed --> [*]
/// ```
///
/// Once closed, [`EnvPool::reset`] and [`EnvPool::step`] fail with [`EnvError::Closed`].
///
/// Slots are stepped one after another. If a slot fails, the error is returned with
/// the index of the slot and the observations of the slots stepped before it are
/// already updated.
pub struct EnvPool<E: Env> {
    template: E,
    envs: Vec<E>,
    config: EnvPoolConfig,
    space: BoxSpace,
    states: ArrayD<f32>,
    rewards: Vec<f32>,
    dones: Vec<bool>,
    closed: bool,
}

impl<E> EnvPool<E>
where
    E: Env<Obs = ArrayD<f32>> + Clone,
{
    /// Constructs a pool of `config.n_envs` copies of `template` and resets them.
    pub fn new(template: E, config: &EnvPoolConfig) -> Result<Self> {
        if config.n_envs == 0 {
            return Err(EnvError::config("a pool needs at least one environment").into());
        }
        let space = template.observation_space().clone();
        if space.shape().is_empty() {
            return Err(EnvError::config("the template declares an empty observation shape").into());
        }
        let mut shape = vec![config.n_envs];
        shape.extend_from_slice(space.shape());

        let mut pool = Self {
            template,
            envs: Vec::with_capacity(config.n_envs),
            config: config.clone(),
            space,
            states: ArrayD::zeros(IxDyn(&shape)),
            rewards: vec![0.0; config.n_envs],
            dones: vec![false; config.n_envs],
            closed: false,
        };
        pool.reset()?;
        debug!("EnvPool: {} slots, observation shape {:?}", config.n_envs, pool.space.shape());
        Ok(pool)
    }

    /// Number of slots.
    pub fn n_envs(&self) -> usize {
        self.config.n_envs
    }

    /// Declared space of the observation of a slot.
    pub fn observation_space(&self) -> &BoxSpace {
        &self.space
    }

    fn check_open(&self) -> Result<(), EnvError> {
        if self.closed {
            Err(EnvError::Closed)
        } else {
            Ok(())
        }
    }

    fn set_state(&mut self, i: usize, obs: &ArrayD<f32>) -> Result<(), EnvError> {
        EnvError::check_shape(self.space.shape(), obs.shape())?;
        self.states.index_axis_mut(Axis(0), i).assign(obs);
        Ok(())
    }

    /// Replaces every slot with a fresh clone of the template, resets them all and
    /// returns a copy of the batch of initial observations.
    ///
    /// Previous slots are closed first.
    pub fn reset(&mut self) -> Result<ArrayD<f32>> {
        self.check_open()?;
        trace!("EnvPool::reset()");

        for (i, env) in self.envs.iter_mut().enumerate() {
            env.close().with_context(|| format!("slot {}", i))?;
        }
        let template = &self.template;
        let seed = self.config.seed;
        self.envs = (0..self.config.n_envs)
            .map(|i| {
                let mut env = template.clone();
                if let Some(seed) = seed {
                    env.seed(seed.wrapping_add(i as u64));
                }
                env
            })
            .collect();

        for i in 0..self.config.n_envs {
            let obs = self.envs[i]
                .reset()
                .with_context(|| format!("slot {}", i))?;
            self.set_state(i, &obs).with_context(|| format!("slot {}", i))?;
        }
        self.rewards.iter_mut().for_each(|r| *r = 0.0);
        self.dones.iter_mut().for_each(|d| *d = false);
        Ok(self.states.clone())
    }

    /// Steps every slot with its own action.
    ///
    /// The number of actions must equal [`EnvPool::n_envs`]; otherwise
    /// [`EnvError::ActionCountMismatch`] is returned and no slot is touched.
    pub fn step(&mut self, acts: &[E::Act]) -> Result<PoolStep> {
        self.check_open()?;
        if acts.len() != self.config.n_envs {
            return Err(EnvError::ActionCountMismatch {
                expected: self.config.n_envs,
                actual: acts.len(),
            }
            .into());
        }
        trace!("EnvPool::step()");

        for (i, a) in acts.iter().enumerate() {
            let (step, _) = self.envs[i].step(a).with_context(|| format!("slot {}", i))?;
            let (r, done) = (step.reward, step.is_done());

            // Terminal observations are replaced by the initial one of the next episode
            let obs = if done {
                trace!("EnvPool: slot {} done", i);
                self.envs[i].reset().with_context(|| format!("slot {}", i))?
            } else {
                step.obs
            };
            self.set_state(i, &obs).with_context(|| format!("slot {}", i))?;
            self.rewards[i] = r;
            self.dones[i] = done;
        }

        Ok(PoolStep {
            obs: self.states.clone(),
            reward: self.rewards.clone(),
            is_done: self.dones.clone(),
            aux: Record::empty(),
        })
    }

    /// Returns a copy of the current batch of observations.
    ///
    /// Later steps do not modify the returned array.
    pub fn pool_states(&self) -> ArrayD<f32> {
        self.states.clone()
    }

    /// Closes every slot. The pool cannot be used afterwards.
    ///
    /// All slots are closed even if some of them fail; the first failure is returned.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut result = Ok(());
        for (i, mut env) in self.envs.drain(..).enumerate() {
            if let Err(e) = env.close() {
                if result.is_ok() {
                    result = Err(e.context(format!("slot {}", i)));
                }
            }
        }
        debug!("EnvPool: closed");
        result
    }
}
