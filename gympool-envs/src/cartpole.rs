//! CartPole classic control environment.
use anyhow::{bail, Result};
use gympool_core::{record::Record, BoxSpace, Env, GymAct, GymInfo, Step};
use log::trace;
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Configuration of [`CartPoleEnv`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartPoleConfig {
    /// Gravity.
    pub gravity: f32,

    /// Mass of the cart.
    pub mass_cart: f32,

    /// Mass of the pole.
    pub mass_pole: f32,

    /// Half length of the pole.
    pub length: f32,

    /// Magnitude of the force applied to the cart.
    pub force_mag: f32,

    /// Seconds between state updates.
    pub tau: f32,
}

impl Default for CartPoleConfig {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            mass_cart: 1.0,
            mass_pole: 0.1,
            length: 0.5,
            force_mag: 10.0,
            tau: 0.02,
        }
    }
}

/// CartPole environment.
///
/// A pole is attached to a cart on a frictionless track. The goal
/// is to balance the pole by applying forces to the cart.
///
/// Observation: `[cart_pos, cart_vel, pole_angle, pole_vel]`.
/// Action: `0` pushes left, `1` pushes right.
///
/// The environment itself never truncates episodes; wrap it with a time limit.
///
/// Cloning forks the random number generator, so clones start different episodes
/// unless they are reseeded.
#[derive(Clone)]
pub struct CartPoleEnv {
    config: CartPoleConfig,
    space: BoxSpace,
    // x, x_dot, theta, theta_dot
    state: [f32; 4],
    rng: fastrand::Rng,
}

impl CartPoleEnv {
    const THETA_THRESHOLD: f32 = 12.0 * 2.0 * PI / 360.0;
    const X_THRESHOLD: f32 = 2.4;

    /// Builds the environment with a given random seed.
    pub fn build(config: &CartPoleConfig, seed: i64) -> Result<Self> {
        if config.tau <= 0.0 || config.length <= 0.0 {
            bail!("CartPole requires positive tau and length: {:?}", config);
        }
        Ok(Self {
            config: config.clone(),
            space: BoxSpace::new(-4.8, 4.8, vec![4]),
            state: [0.0; 4],
            rng: fastrand::Rng::with_seed(seed as u64),
        })
    }

    fn is_terminal(&self) -> bool {
        self.state[0].abs() > Self::X_THRESHOLD || self.state[2].abs() > Self::THETA_THRESHOLD
    }

    fn obs(&self) -> Result<ArrayD<f32>> {
        Ok(ArrayD::from_shape_vec(IxDyn(&[4]), self.state.to_vec())?)
    }
}

impl Env for CartPoleEnv {
    type Obs = ArrayD<f32>;
    type Act = GymAct;
    type Info = GymInfo;

    fn observation_space(&self) -> &BoxSpace {
        &self.space
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        trace!("CartPoleEnv::reset()");
        for x in self.state.iter_mut() {
            *x = self.rng.f32() * 0.1 - 0.05;
        }
        self.obs()
    }

    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)> {
        let force = match a.discrete() {
            Some(0) => -self.config.force_mag,
            Some(1) => self.config.force_mag,
            _ => bail!("CartPole expects a discrete action in {{0, 1}}, got {:?}", a),
        };

        let c = &self.config;
        let total_mass = c.mass_cart + c.mass_pole;
        let pole_mass_length = c.mass_pole * c.length;
        let [x, x_dot, theta, theta_dot] = self.state;
        let (sin_theta, cos_theta) = theta.sin_cos();

        let temp = (force + pole_mass_length * theta_dot * theta_dot * sin_theta) / total_mass;
        let theta_acc = (c.gravity * sin_theta - cos_theta * temp)
            / (c.length * (4.0 / 3.0 - c.mass_pole * cos_theta * cos_theta / total_mass));
        let x_acc = temp - pole_mass_length * theta_acc * cos_theta / total_mass;

        // Euler integration
        self.state = [
            x + c.tau * x_dot,
            x_dot + c.tau * x_acc,
            theta + c.tau * theta_dot,
            theta_dot + c.tau * theta_acc,
        ];

        let is_terminated = self.is_terminal();
        let step = Step::new(self.obs()?, a.clone(), 1.0, is_terminated, false, GymInfo {});
        Ok((step, Record::empty()))
    }

    fn seed(&mut self, seed: u64) {
        self.rng = fastrand::Rng::with_seed(seed);
    }
}
