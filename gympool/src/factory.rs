//! Builds environments and pools from registered ids.
//!
//! Layers are composed in a fixed order:
//!
//! backend → [`FrameSkip`] → [`PreprocessImage`] → [`FrameStack`] → [`TimeLimit`]
//!
//! where frame skipping and preprocessing only apply to image backends, stacking
//! only when more than one frame is requested, and the time limit only when
//! a limit is configured or registered for the id.
mod config;
use crate::{
    EnvPool, EnvPoolConfig, FrameSkip, FrameSkipConfig, FrameStack, FrameStackConfig,
    PreprocessImage, PreprocessImageConfig, Registry, TimeLimit, TimeLimitConfig,
};
use anyhow::Result;
pub use config::{EnvConfig, ImageEnvConfig};
use gympool_core::{BoxedEnv, Env, EnvError};
use log::info;
use ndarray::ArrayD;

/// Environment with canonical `f32` observations, as built by the factories.
pub type CanonicalEnv = BoxedEnv<ArrayD<f32>>;

/// A single environment or a pool of them.
pub enum Made<E: Env> {
    /// A single environment.
    Single(E),

    /// A pool of environments.
    Pool(EnvPool<E>),
}

impl<E: Env> Made<E> {
    /// Returns `true` for a pool.
    pub fn is_pool(&self) -> bool {
        matches!(self, Self::Pool(_))
    }

    /// Returns the pool, if any.
    pub fn into_pool(self) -> Option<EnvPool<E>> {
        match self {
            Self::Pool(pool) => Some(pool),
            Self::Single(_) => None,
        }
    }

    /// Returns the single environment, if any.
    pub fn into_single(self) -> Option<E> {
        match self {
            Self::Single(env) => Some(env),
            Self::Pool(_) => None,
        }
    }
}

/// Builds an environment with feature-vector observations.
///
/// Returns a pool of `config.n_envs` environments, or a single one if `n_envs` is `0`.
pub fn make_env(registry: &Registry, config: &EnvConfig) -> Result<Made<CanonicalEnv>> {
    let (env, default_limit) = registry.make_features(&config.env_id, config.seed)?;
    let mut layers = Vec::new();
    let env = stack_and_limit(env, config, default_limit, &mut layers)?;
    info!("make_env: {} with layers {:?}", config.env_id, layers);
    into_made(env, config)
}

/// Builds an environment with preprocessed image observations.
///
/// Returns a pool of `config.env.n_envs` environments, or a single one if `n_envs` is `0`.
pub fn make_image_env(registry: &Registry, config: &ImageEnvConfig) -> Result<Made<CanonicalEnv>> {
    let base = &config.env;
    let (mut env, default_limit) = registry.make_image(&base.env_id, base.seed)?;
    let mut layers = Vec::new();

    if let Some(skip) = config.frame_skip {
        env = BoxedEnv::new(FrameSkip::new(env, &FrameSkipConfig::default().skip(skip))?);
        layers.push("FrameSkip");
    }

    let preprocess_config = PreprocessImageConfig::default()
        .size(config.height, config.width)
        .grayscale(config.grayscale)
        .crop(config.crop);
    let env = match &config.crop_fn {
        Some(crop_fn) => PreprocessImage::with_crop_fn(env, &preprocess_config, crop_fn.clone())?,
        None => PreprocessImage::new(env, &preprocess_config)?,
    };
    layers.push("PreprocessImage");

    let env = stack_and_limit(BoxedEnv::new(env), base, default_limit, &mut layers)?;
    info!("make_image_env: {} with layers {:?}", base.env_id, layers);
    into_made(env, base)
}

fn stack_and_limit(
    env: CanonicalEnv,
    config: &EnvConfig,
    default_limit: Option<usize>,
    layers: &mut Vec<&'static str>,
) -> Result<CanonicalEnv> {
    let env = match config.n_frames {
        0 => {
            return Err(EnvError::config("the number of stacked frames must be positive").into())
        }
        1 => env,
        n => {
            layers.push("FrameStack");
            BoxedEnv::new(FrameStack::new(env, &FrameStackConfig::default().n_frames(n))?)
        }
    };

    let env = match config.episode_step_limit.or(default_limit) {
        Some(limit) => {
            layers.push("TimeLimit");
            BoxedEnv::new(TimeLimit::new(env, &TimeLimitConfig::new(limit))?)
        }
        None => env,
    };
    Ok(env)
}

fn into_made(env: CanonicalEnv, config: &EnvConfig) -> Result<Made<CanonicalEnv>> {
    if config.n_envs == 0 {
        return Ok(Made::Single(env));
    }
    let pool_config = EnvPoolConfig::default()
        .n_envs(config.n_envs)
        .seed(Some(config.seed as u64));
    Ok(Made::Pool(EnvPool::new(env, &pool_config)?))
}

/// A factory configuration that can be retargeted to another id, pool size and
/// episode step limit.
pub trait EnvFactory: Clone {
    /// Returns a copy of the configuration with the given target.
    fn with_target(self, env_id: &str, n_envs: usize, episode_step_limit: Option<usize>) -> Self;

    /// Builds the environment.
    fn make(&self, registry: &Registry) -> Result<Made<CanonicalEnv>>;
}

impl EnvFactory for EnvConfig {
    fn with_target(self, env_id: &str, n_envs: usize, episode_step_limit: Option<usize>) -> Self {
        self.env_id(env_id)
            .n_envs(n_envs)
            .episode_step_limit(episode_step_limit)
    }

    fn make(&self, registry: &Registry) -> Result<Made<CanonicalEnv>> {
        make_env(registry, self)
    }
}

impl EnvFactory for ImageEnvConfig {
    fn with_target(self, env_id: &str, n_envs: usize, episode_step_limit: Option<usize>) -> Self {
        self.env_id(env_id)
            .n_envs(n_envs)
            .episode_step_limit(episode_step_limit)
    }

    fn make(&self, registry: &Registry) -> Result<Made<CanonicalEnv>> {
        make_image_env(registry, self)
    }
}

/// Binds every option of `config` except the id, the pool size and the episode
/// step limit, which are given to the returned function.
///
/// ```
/// use gympool::{env_maker, EnvConfig, Registry};
///
/// let make = env_maker(Registry::with_builtin(), EnvConfig::default().n_frames(2));
/// let pool = make("CartPole-v1", 4, Some(100)).unwrap().into_pool().unwrap();
/// assert_eq!(pool.pool_states().shape(), &[4, 8]);
/// ```
pub fn env_maker<C>(
    registry: Registry,
    config: C,
) -> impl Fn(&str, usize, Option<usize>) -> Result<Made<CanonicalEnv>>
where
    C: EnvFactory,
{
    move |env_id: &str, n_envs: usize, episode_step_limit: Option<usize>| {
        config
            .clone()
            .with_target(env_id, n_envs, episode_step_limit)
            .make(&registry)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use gympool_core::GymAct;
    use test_log::test;

    #[test]
    fn test_make_env_pool() -> Result<()> {
        let registry = Registry::with_builtin();
        let config = EnvConfig::default().env_id("CartPole-v1").n_envs(3).n_frames(4);
        let mut pool = make_env(&registry, &config)?.into_pool().unwrap();
        assert_eq!(pool.observation_space().shape(), &[16]);
        assert_eq!(pool.pool_states().shape(), &[3, 16]);

        let step = pool.step(&vec![GymAct::Discrete(0); 3])?;
        assert_eq!(step.reward, vec![1.0; 3]);
        Ok(())
    }

    #[test]
    fn test_make_env_single() -> Result<()> {
        let registry = Registry::with_builtin();
        let config = EnvConfig::default().env_id("CartPole-v0").n_envs(0);
        let mut env = make_env(&registry, &config)?.into_single().unwrap();
        assert_eq!(env.reset()?.shape(), &[4]);
        Ok(())
    }

    #[test]
    fn test_episode_step_limit_overrides_default() -> Result<()> {
        let registry = Registry::with_builtin();
        let config = EnvConfig::default()
            .env_id("CartPole-v1")
            .n_envs(0)
            .episode_step_limit(Some(2));
        let mut env = make_env(&registry, &config)?.into_single().unwrap();
        env.reset()?;

        // Alternating pushes keep the pole up for a few steps
        let (step, _) = env.step(&GymAct::Discrete(0))?;
        assert!(!step.is_done());
        let (step, _) = env.step(&GymAct::Discrete(1))?;
        assert!(step.is_truncated);
        Ok(())
    }

    #[test]
    fn test_make_image_env() -> Result<()> {
        let registry = Registry::with_builtin();
        let config = ImageEnvConfig::default()
            .env_id("Catch-v0")
            .n_envs(2)
            .n_frames(4)
            .frame_skip(Some(2));
        let mut pool = make_image_env(&registry, &config)?.into_pool().unwrap();
        assert_eq!(pool.pool_states().shape(), &[2, 64, 64, 4]);
        let step = pool.step(&vec![GymAct::Discrete(1); 2])?;
        assert!(step.obs.iter().all(|x| (0.0..=1.0).contains(x)));
        Ok(())
    }

    #[test]
    fn test_wrong_backend_kind() {
        let registry = Registry::with_builtin();
        let config = EnvConfig::default().env_id("Catch-v0");
        assert!(make_env(&registry, &config).is_err());
        let config = ImageEnvConfig::default().env_id("CartPole-v1");
        assert!(make_image_env(&registry, &config).is_err());
    }

    #[test]
    fn test_zero_frames() {
        let registry = Registry::with_builtin();
        let config = EnvConfig::default().env_id("CartPole-v1").n_frames(0);
        let e = make_env(&registry, &config).err().unwrap();
        assert!(matches!(
            e.downcast_ref::<EnvError>(),
            Some(EnvError::Configuration(_))
        ));
    }

    #[test]
    fn test_env_maker() -> Result<()> {
        let config = ImageEnvConfig::default().size(16, 32).grayscale(false);
        let make = env_maker(Registry::with_builtin(), config);
        let pool = make("Catch-v0", 3, None)?.into_pool().unwrap();
        assert_eq!(pool.pool_states().shape(), &[3, 16, 32, 3]);
        Ok(())
    }
}
