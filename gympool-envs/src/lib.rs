//! Built-in environments written in pure Rust.
//!
//! * [`CartPoleEnv`] - classic control task with a feature-vector observation of shape `[4]`.
//! * [`CatchEnv`] - a pixel task emitting RGB frames of shape `[height, width, 3]`.
//!
//! Both are deterministic given a seed and cheap to clone, so they can serve as
//! templates of a batched pool.
mod cartpole;
mod catch;
pub use cartpole::{CartPoleConfig, CartPoleEnv};
pub use catch::{CatchConfig, CatchEnv};
