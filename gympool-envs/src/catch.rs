//! Catch, a pixel environment.
use anyhow::{bail, Result};
use gympool_core::{record::Record, BoxSpace, Env, GymAct, GymInfo, Step};
use log::trace;
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

const BALL: [u8; 3] = [255, 255, 0];
const PADDLE: [u8; 3] = [0, 128, 255];

/// Configuration of [`CatchEnv`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatchConfig {
    /// Number of rows of the grid.
    pub rows: usize,

    /// Number of columns of the grid.
    pub cols: usize,

    /// Size of a grid cell in pixels.
    pub cell_size: usize,
}

impl Default for CatchConfig {
    fn default() -> Self {
        Self {
            rows: 10,
            cols: 10,
            cell_size: 10,
        }
    }
}

impl CatchConfig {
    /// Sets the size of the grid.
    pub fn grid(mut self, rows: usize, cols: usize) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    /// Sets the size of a cell in pixels.
    pub fn cell_size(mut self, v: usize) -> Self {
        self.cell_size = v;
        self
    }
}

/// A ball falls one row per step from a random column of the top row.
/// The agent moves a paddle along the bottom row to catch it.
///
/// Observation: RGB frame, `u8` array of shape `[rows * cell_size, cols * cell_size, 3]`.
/// Action: `0` moves left, `1` stays, `2` moves right.
/// Reward: `1` when the ball is caught, `-1` when it is missed, `0` otherwise.
/// The episode terminates when the ball reaches the bottom row.
#[derive(Clone)]
pub struct CatchEnv {
    config: CatchConfig,
    space: BoxSpace,
    ball: (usize, usize),
    paddle: usize,
    rng: fastrand::Rng,
}

impl CatchEnv {
    /// Builds the environment with a given random seed.
    pub fn build(config: &CatchConfig, seed: i64) -> Result<Self> {
        if config.rows < 2 || config.cols == 0 || config.cell_size == 0 {
            bail!(
                "Catch requires at least 2 rows, 1 column and a positive cell size: {:?}",
                config
            );
        }
        let shape = vec![config.rows * config.cell_size, config.cols * config.cell_size, 3];
        Ok(Self {
            config: config.clone(),
            space: BoxSpace::new(0.0, 255.0, shape),
            ball: (0, 0),
            paddle: config.cols / 2,
            rng: fastrand::Rng::with_seed(seed as u64),
        })
    }

    fn render(&self) -> ArrayD<u8> {
        let cell = self.config.cell_size;
        let bottom = self.config.rows - 1;
        let (ball, paddle) = (self.ball, self.paddle);

        ArrayD::from_shape_fn(IxDyn(&self.space.shape), |ix| {
            let (r, c, ch) = (ix[0] / cell, ix[1] / cell, ix[2]);
            if (r, c) == ball {
                BALL[ch]
            } else if r == bottom && c == paddle {
                PADDLE[ch]
            } else {
                0
            }
        })
    }
}

impl Env for CatchEnv {
    type Obs = ArrayD<u8>;
    type Act = GymAct;
    type Info = GymInfo;

    fn observation_space(&self) -> &BoxSpace {
        &self.space
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        self.ball = (0, self.rng.usize(..self.config.cols));
        self.paddle = self.config.cols / 2;
        trace!("CatchEnv::reset(), ball = {:?}", self.ball);
        Ok(self.render())
    }

    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)> {
        match a.discrete() {
            Some(0) => self.paddle = self.paddle.saturating_sub(1),
            Some(1) => {}
            Some(2) => self.paddle = (self.paddle + 1).min(self.config.cols - 1),
            _ => bail!("Catch expects a discrete action in {{0, 1, 2}}, got {:?}", a),
        }

        self.ball.0 += 1;
        let is_terminated = self.ball.0 == self.config.rows - 1;
        let reward = match (is_terminated, self.ball.1 == self.paddle) {
            (false, _) => 0.0,
            (true, true) => 1.0,
            (true, false) => -1.0,
        };

        let step = Step::new(self.render(), a.clone(), reward, is_terminated, false, GymInfo {});
        Ok((step, Record::empty()))
    }

    fn seed(&mut self, seed: u64) {
        self.rng = fastrand::Rng::with_seed(seed);
    }
}
