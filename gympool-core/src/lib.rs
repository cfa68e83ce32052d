#![warn(missing_docs)]
//! Core traits and types shared by gympool environments, layers and pools.
//!
//! An environment is anything implementing [`Env`]: it advertises the shape of its
//! observations with [`Env::observation_space`] and supports `reset`, `step` and `close`.
//! Layers wrapping an environment implement [`Env`] again, so that they can be composed
//! in any order and handed to a batched pool.
pub mod dummy;
pub mod record;

mod base;
pub use base::{Act, BoxSpace, Env, GymAct, GymInfo, Info, Obs, Step, Transition};

mod boxed;
pub use boxed::{BoxedEnv, DynEnv};

mod error;
pub use error::EnvError;
