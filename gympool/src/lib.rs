#![warn(missing_docs)]
//! Observation preprocessing layers and batched pools of environments.
//!
//! Environments implement [`gympool_core::Env`]. Layers wrap an environment and
//! implement [`Env`](gympool_core::Env) again:
//!
//! * [`PreprocessImage`] turns raw `u8` frames into `f32` frames of a fixed size,
//!   optionally cropped and grayscaled, with values in `[0, 1]`.
//! * [`FrameStack`] emits the last `K` observations stacked along the last axis.
//! * [`TimeLimit`] truncates episodes after a fixed number of steps.
//! * [`FrameSkip`] repeats each action and sums the rewards.
//!
//! [`EnvPool`] steps `N` copies of an environment together and resets them
//! automatically at the end of their episodes.
//!
//! [`make_env`] and [`make_image_env`] compose layers and pools for an id of a
//! [`Registry`]:
//!
//! ```
//! use gympool::{make_image_env, ImageEnvConfig, Registry};
//! use gympool_core::GymAct;
//!
//! # fn main() -> anyhow::Result<()> {
//! let registry = Registry::with_builtin();
//! let config = ImageEnvConfig::default()
//!     .env_id("Catch-v0")
//!     .n_envs(2)
//!     .n_frames(4);
//! let mut pool = make_image_env(&registry, &config)?.into_pool().unwrap();
//! assert_eq!(pool.pool_states().shape(), &[2, 64, 64, 4]);
//!
//! let step = pool.step(&[GymAct::Discrete(0), GymAct::Discrete(2)])?;
//! assert_eq!(step.reward.len(), 2);
//! # Ok(())
//! # }
//! ```
mod factory;
mod frame_skip;
mod frame_stack;
mod pool;
mod preprocess;
mod registry;
mod time_limit;

pub use factory::{
    env_maker, make_env, make_image_env, CanonicalEnv, EnvConfig, EnvFactory, ImageEnvConfig,
    Made,
};
pub use frame_skip::{FrameSkip, FrameSkipConfig};
pub use frame_stack::{FrameStack, FrameStackConfig, StackLayout};
pub use pool::{EnvPool, EnvPoolConfig, PoolStep};
pub use preprocess::{CropFn, CropWindow, PreprocessImage, PreprocessImageConfig};
pub use registry::{Backend, EnvEntry, FeatureCtor, ImageCtor, Registry};
pub use time_limit::{TimeLimit, TimeLimitConfig};
