//! Environment step.
use super::Env;

/// Additional information to `Obs` and `Act`.
pub trait Info: 'static {}

impl Info for () {}

/// Information of the built-in backends.
///
/// Currently, it is empty and used to match the type signature.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GymInfo {}

impl Info for GymInfo {}

/// Represents an action, observation and reward tuple `(a_t, o_t+1, r_t)`
/// with some additional information.
///
/// An environment emits a [`Step`] object at every interaction step.
/// This object might be used to create transitions `(o_t, a_t, o_t+1, r_t)`,
/// see [`Step::into_transition`].
pub struct Step<E: Env + ?Sized> {
    /// Action.
    pub act: E::Act,

    /// Observation.
    pub obs: E::Obs,

    /// Reward.
    pub reward: f32,

    /// Flag denoting if episode is terminated.
    pub is_terminated: bool,

    /// Flag denoting if episode is truncated.
    pub is_truncated: bool,

    /// Information defined by user.
    pub info: E::Info,
}

impl<E: Env + ?Sized> Step<E> {
    /// Constructs a [`Step`] object.
    pub fn new(
        obs: E::Obs,
        act: E::Act,
        reward: f32,
        is_terminated: bool,
        is_truncated: bool,
        info: E::Info,
    ) -> Self {
        Step {
            act,
            obs,
            reward,
            is_terminated,
            is_truncated,
            info,
        }
    }

    #[inline]
    /// Terminated or truncated.
    pub fn is_done(&self) -> bool {
        self.is_terminated || self.is_truncated
    }

    /// Rebuilds the step for an environment with the same action and info types,
    /// replacing the observation.
    ///
    /// Layers changing only the observation use this to forward the inner step.
    pub fn with_obs<F>(self, obs: F::Obs) -> Step<F>
    where
        F: Env<Act = E::Act, Info = E::Info> + ?Sized,
    {
        Step {
            act: self.act,
            obs,
            reward: self.reward,
            is_terminated: self.is_terminated,
            is_truncated: self.is_truncated,
            info: self.info,
        }
    }

    /// Reinterprets the step as a step of another environment with the same
    /// observation, action and info types.
    pub fn cast<F>(self) -> Step<F>
    where
        F: Env<Obs = E::Obs, Act = E::Act, Info = E::Info> + ?Sized,
    {
        let obs = self.obs;
        Step {
            act: self.act,
            obs,
            reward: self.reward,
            is_terminated: self.is_terminated,
            is_truncated: self.is_truncated,
            info: self.info,
        }
    }

    /// Builds a transition `(o_t, a_t, r_t, o_t+1, done_t)` given the previous observation.
    pub fn into_transition(self, state: E::Obs) -> Transition<E::Obs, E::Act> {
        let done = self.is_done();
        Transition {
            state,
            action: self.act,
            reward: self.reward,
            next_state: self.obs,
            done,
        }
    }
}

/// A transition `(o_t, a_t, r_t, o_t+1, done_t)`.
///
/// Exported for replay buffers and training loops; environments and pools do not
/// keep transitions themselves.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition<O, A> {
    /// Observation before the action.
    pub state: O,

    /// Action taken.
    pub action: A,

    /// Reward received.
    pub reward: f32,

    /// Observation after the action.
    pub next_state: O,

    /// Episode ended with this transition.
    pub done: bool,
}
