//! Core functionalities.
mod env;
mod space;
mod step;
pub use env::Env;
pub use space::BoxSpace;
pub use step::{GymInfo, Info, Step, Transition};

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// An observation of an environment.
///
/// Observations are fixed-shape tensors. The shape reported here must agree with
/// the shape declared by [`Env::observation_space`].
pub trait Obs: Clone + Debug + 'static {
    /// Returns the shape of the observation.
    fn shape(&self) -> &[usize];
}

impl<T: Clone + Debug + 'static> Obs for ArrayD<T> {
    fn shape(&self) -> &[usize] {
        ndarray::ArrayBase::shape(self)
    }
}

/// An action of an environment.
pub trait Act: Clone + Debug + 'static {}

/// Action type of the built-in backends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GymAct {
    /// Index of a discrete action.
    Discrete(i64),

    /// Continuous action vector.
    Continuous(Vec<f32>),
}

impl GymAct {
    /// Returns the discrete action index, if any.
    pub fn discrete(&self) -> Option<i64> {
        match self {
            Self::Discrete(a) => Some(*a),
            Self::Continuous(_) => None,
        }
    }
}

impl Act for GymAct {}

impl From<i64> for GymAct {
    fn from(a: i64) -> Self {
        Self::Discrete(a)
    }
}

impl From<Vec<f32>> for GymAct {
    fn from(a: Vec<f32>) -> Self {
        Self::Continuous(a)
    }
}
