//! A layer stacking the most recent observations along the last axis.
use anyhow::Result;
use gympool_core::{record::Record, BoxSpace, Env, EnvError, Step};
use log::{debug, trace};
use ndarray::{ArrayD, IxDyn, SliceInfoElem};
use serde::{Deserialize, Serialize};

/// Configuration of [`FrameStack`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameStackConfig {
    /// Number of stacked observations.
    pub n_frames: usize,
}

impl Default for FrameStackConfig {
    fn default() -> Self {
        Self { n_frames: 4 }
    }
}

impl FrameStackConfig {
    /// Sets the number of stacked observations.
    pub fn n_frames(mut self, v: usize) -> Self {
        self.n_frames = v;
        self
    }
}

/// Shape arithmetic of frame stacking.
///
/// The history buffer has shape `(K, *base)`, index 0 holding the newest frame.
/// It is emitted with the history axis moved to the end and merged into the last
/// axis of a frame, so `(H, W, C)` becomes `(H, W, C * K)` and `(F,)` becomes `(F * K,)`.
/// Along the merged axis, the history index varies fastest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackLayout {
    base_shape: Vec<usize>,
    n_frames: usize,
    // (K, *base), with a unit channel axis appended for flat frames
    frames_shape: Vec<usize>,
    axes: Vec<usize>,
    out_shape: Vec<usize>,
}

impl StackLayout {
    /// Computes the layout of `n_frames` stacked frames of shape `base_shape`.
    pub fn new(base_shape: &[usize], n_frames: usize) -> Result<Self, EnvError> {
        if n_frames == 0 {
            return Err(EnvError::config("the number of stacked frames must be positive"));
        }
        let (last, rest) = base_shape
            .split_last()
            .ok_or_else(|| EnvError::config("cannot stack scalar observations"))?;

        let mut frame_shape = base_shape.to_vec();
        if rest.is_empty() {
            frame_shape.push(1);
        }
        let rank = frame_shape.len();

        let mut frames_shape = vec![n_frames];
        frames_shape.extend_from_slice(&frame_shape);

        let mut axes: Vec<usize> = (1..=rank).collect();
        axes.push(0);

        let mut out_shape = rest.to_vec();
        out_shape.push(last * n_frames);

        Ok(Self {
            base_shape: base_shape.to_vec(),
            n_frames,
            frames_shape,
            axes,
            out_shape,
        })
    }

    /// Shape of a single frame.
    pub fn base_shape(&self) -> &[usize] {
        &self.base_shape
    }

    /// Number of stacked frames.
    pub fn n_frames(&self) -> usize {
        self.n_frames
    }

    /// Shape of the history buffer, `(K, *base)`.
    pub fn buffer_shape(&self) -> Vec<usize> {
        let mut shape = vec![self.n_frames];
        shape.extend_from_slice(&self.base_shape);
        shape
    }

    /// Shape of a stacked observation.
    pub fn out_shape(&self) -> &[usize] {
        &self.out_shape
    }

    /// Builds the stacked observation from a history buffer.
    pub fn stack(&self, buffer: &ArrayD<f32>) -> Result<ArrayD<f32>> {
        EnvError::check_shape(&self.buffer_shape(), buffer.shape())?;
        let frames = buffer.view().into_shape(IxDyn(&self.frames_shape))?;
        let data: Vec<f32> = frames.permuted_axes(IxDyn(&self.axes)).iter().copied().collect();
        Ok(ArrayD::from_shape_vec(IxDyn(&self.out_shape), data)?)
    }
}

/// Keeps the last `K` observations of an environment and emits them stacked,
/// see [`StackLayout`] for the output shape.
///
/// On reset the history is zeroed before the initial observation is pushed, so the
/// first observation of an episode holds one real frame and `K - 1` blank ones.
#[derive(Clone, Debug)]
pub struct FrameStack<E> {
    env: E,
    layout: StackLayout,
    buffer: ArrayD<f32>,
    space: BoxSpace,
}

impl<E> FrameStack<E>
where
    E: Env<Obs = ArrayD<f32>>,
{
    /// Wraps an environment.
    pub fn new(env: E, config: &FrameStackConfig) -> Result<Self> {
        let base = env.observation_space();
        let layout = StackLayout::new(base.shape(), config.n_frames)?;
        let buffer = ArrayD::zeros(IxDyn(&layout.buffer_shape()));

        // Blank frames are part of the observation
        let space = BoxSpace::new(
            base.low.min(0.0),
            base.high.max(0.0),
            layout.out_shape().to_vec(),
        );
        debug!(
            "FrameStack: {} x {:?} -> {:?}",
            layout.n_frames(),
            layout.base_shape(),
            layout.out_shape()
        );

        Ok(Self {
            env,
            layout,
            buffer,
            space,
        })
    }

    /// Returns the layout of stacked observations.
    pub fn layout(&self) -> &StackLayout {
        &self.layout
    }

    /// Create slice for a dynamic array: equivalent to arr[j, ...] in numpy.
    fn s(&self, j: usize) -> Vec<SliceInfoElem> {
        let mut slicer = vec![SliceInfoElem::Index(j as isize)];
        let n = self.layout.base_shape().len();
        let (start, end, step) = (0, None, 1);
        slicer.extend(vec![SliceInfoElem::Slice { start, end, step }; n]);
        slicer
    }

    /// Shifts frame(j) <- frame(j - 1) for j = K - 1, ..., 1 and puts `obs` at index 0.
    fn push(&mut self, obs: &ArrayD<f32>) -> Result<()> {
        EnvError::check_shape(self.layout.base_shape(), obs.shape())?;
        for j in (1..self.layout.n_frames()).rev() {
            let dst_slice = self.s(j);
            let src_slice = self.s(j - 1);
            let (mut dst, src) = self
                .buffer
                .multi_slice_mut((dst_slice.as_slice(), src_slice.as_slice()));
            dst.assign(&src);
        }
        let slice = self.s(0);
        self.buffer.slice_mut(slice.as_slice()).assign(obs);
        Ok(())
    }
}

impl<E> Env for FrameStack<E>
where
    E: Env<Obs = ArrayD<f32>>,
{
    type Obs = ArrayD<f32>;
    type Act = E::Act;
    type Info = E::Info;

    fn observation_space(&self) -> &BoxSpace {
        &self.space
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        trace!("FrameStack::reset()");
        let obs = self.env.reset()?;
        self.buffer.fill(0.0);
        self.push(&obs)?;
        self.layout.stack(&self.buffer)
    }

    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)> {
        trace!("FrameStack::step()");
        let (step, record) = self.env.step(a)?;
        self.push(&step.obs)?;
        let obs = self.layout.stack(&self.buffer)?;
        Ok((step.with_obs(obs), record))
    }

    fn close(&mut self) -> Result<()> {
        self.env.close()
    }

    fn seed(&mut self, seed: u64) {
        self.env.seed(seed)
    }
}
