//! Environment.
use super::{Act, BoxSpace, Info, Obs, Step};
use crate::record::Record;
use anyhow::Result;

/// Represents an environment, typically an MDP.
///
/// This is the capability interface every simulation backend and every layer
/// implements. Pools and layers depend on this trait only, never on a concrete backend.
pub trait Env {
    /// Observation of the environment.
    type Obs: Obs;

    /// Action of the environment.
    type Act: Act;

    /// Information in the [`Step`] object.
    type Info: Info;

    /// Returns the declared observation space.
    ///
    /// It is available right after construction and never changes during the
    /// lifetime of the environment.
    fn observation_space(&self) -> &BoxSpace;

    /// Resets the environment and returns the initial observation.
    fn reset(&mut self) -> Result<Self::Obs>;

    /// Performs an environment step.
    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)>
    where
        Self: Sized;

    /// Releases resources held by the environment. Does nothing by default.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Reseeds the random number generator of the environment, if any.
    ///
    /// The new seed takes effect from the next call of [`Env::reset`].
    fn seed(&mut self, _seed: u64) {}
}
