//! A layer that crops, resizes and optionally grayscales image observations.
use anyhow::{anyhow, bail, Result};
use gympool_core::{record::Record, BoxSpace, Env, EnvError, Step};
use image::{
    imageops::{resize, FilterType::Triangle},
    ImageBuffer, Luma, Rgb,
};
use log::{debug, trace};
use ndarray::{s, Array3, ArrayD, ArrayViewD, Axis, Ix3, IxDyn};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// A rectangular crop applied to raw frames before resizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropWindow {
    /// First row of the window.
    pub top: usize,

    /// First column of the window.
    pub left: usize,

    /// Number of rows.
    pub height: usize,

    /// Number of columns.
    pub width: usize,
}

impl CropWindow {
    /// Constructs a crop window.
    pub fn new(top: usize, left: usize, height: usize, width: usize) -> Self {
        Self {
            top,
            left,
            height,
            width,
        }
    }

    fn check(&self, frame_height: usize, frame_width: usize) -> Result<(), EnvError> {
        if self.height == 0
            || self.width == 0
            || self.top + self.height > frame_height
            || self.left + self.width > frame_width
        {
            return Err(EnvError::config(format!(
                "crop window {:?} does not fit in a {}x{} frame",
                self, frame_height, frame_width
            )));
        }
        Ok(())
    }

    fn apply(&self, img: ArrayViewD<u8>) -> Result<ArrayD<u8>> {
        let img = img.into_dimensionality::<Ix3>()?;
        let (h, w, _) = img.dim();
        self.check(h, w)?;
        let (top, left) = (self.top, self.left);
        let cropped = img.slice(s![top..top + self.height, left..left + self.width, ..]);
        Ok(cropped.to_owned().into_dyn())
    }
}

/// A user-defined crop function, applied to raw `(height, width, channels)` frames.
#[derive(Clone)]
pub struct CropFn(Arc<dyn Fn(ArrayViewD<u8>) -> Result<ArrayD<u8>> + Send + Sync>);

impl CropFn {
    /// Wraps a function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(ArrayViewD<u8>) -> Result<ArrayD<u8>> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    fn call(&self, img: ArrayViewD<u8>) -> Result<ArrayD<u8>> {
        (self.0)(img)
    }
}

impl fmt::Debug for CropFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CropFn")
    }
}

impl PartialEq for CropFn {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Configuration of [`PreprocessImage`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessImageConfig {
    /// Height of the output frame.
    pub height: usize,

    /// Width of the output frame.
    pub width: usize,

    /// If `true`, channels are averaged into one.
    pub grayscale: bool,

    /// Crop applied before resizing. No crop if `None`.
    pub crop: Option<CropWindow>,
}

impl Default for PreprocessImageConfig {
    fn default() -> Self {
        Self {
            height: 64,
            width: 64,
            grayscale: true,
            crop: None,
        }
    }
}

impl PreprocessImageConfig {
    /// Sets the size of the output frame.
    pub fn size(mut self, height: usize, width: usize) -> Self {
        self.height = height;
        self.width = width;
        self
    }

    /// Sets the grayscale flag.
    pub fn grayscale(mut self, v: bool) -> Self {
        self.grayscale = v;
        self
    }

    /// Sets the crop window.
    pub fn crop(mut self, v: Option<CropWindow>) -> Self {
        self.crop = v;
        self
    }

    fn n_colors(&self) -> usize {
        if self.grayscale {
            1
        } else {
            3
        }
    }
}

/// Converts raw `u8` frames of shape `(h, w, c)` into canonical `f32` frames
/// of shape `(height, width, 1 | 3)` with values in `[0, 1]`.
///
/// Each frame is cropped, resized with a bilinear filter, averaged over channels
/// when grayscale is requested, and divided by 255.
///
/// The output space is declared at construction. Construction fails with
/// [`EnvError::Configuration`] if the declared space of the wrapped environment
/// cannot produce it; raw frames of any other shape are rejected at runtime.
#[derive(Clone, Debug)]
pub struct PreprocessImage<E> {
    env: E,
    config: PreprocessImageConfig,
    crop_fn: Option<CropFn>,
    base_shape: Vec<usize>,
    space: BoxSpace,
}

impl<E> PreprocessImage<E>
where
    E: Env<Obs = ArrayD<u8>>,
{
    /// Wraps an environment.
    pub fn new(env: E, config: &PreprocessImageConfig) -> Result<Self> {
        Self::build(env, config, None)
    }

    /// Wraps an environment, cropping frames with a custom function instead of
    /// [`PreprocessImageConfig::crop`].
    pub fn with_crop_fn(env: E, config: &PreprocessImageConfig, crop_fn: CropFn) -> Result<Self> {
        Self::build(env, config, Some(crop_fn))
    }

    fn build(env: E, config: &PreprocessImageConfig, crop_fn: Option<CropFn>) -> Result<Self> {
        let base_shape = env.observation_space().shape().to_vec();
        if base_shape.len() != 3 {
            return Err(EnvError::config(format!(
                "image observations must have shape (height, width, channels), got {:?}",
                base_shape
            ))
            .into());
        }
        if !matches!(base_shape[2], 1 | 3) {
            return Err(EnvError::config(format!(
                "image observations must have 1 or 3 channels, got {}",
                base_shape[2]
            ))
            .into());
        }
        if !config.grayscale && base_shape[2] != 3 && crop_fn.is_none() {
            return Err(EnvError::config("colour output requires RGB observations").into());
        }
        if config.height == 0 || config.width == 0 {
            return Err(EnvError::config("resize target must be at least 1x1").into());
        }
        if let (Some(crop), None) = (config.crop.as_ref(), crop_fn.as_ref()) {
            crop.check(base_shape[0], base_shape[1])?;
        }

        let shape = vec![config.height, config.width, config.n_colors()];
        let layer = Self {
            env,
            config: config.clone(),
            crop_fn,
            base_shape,
            space: BoxSpace::unit(shape),
        };

        // Runs the transform once on a blank frame, so that inconsistent settings,
        // e.g. a custom crop changing the number of channels, fail here.
        let blank = ArrayD::<u8>::zeros(IxDyn(&layer.base_shape));
        if let Err(e) = layer.transform(blank.view()) {
            return Err(EnvError::config(format!("{:#}", e)).into());
        }

        debug!(
            "PreprocessImage: {:?} -> {:?}",
            layer.base_shape,
            layer.space.shape()
        );
        Ok(layer)
    }

    /// Returns a reference to the wrapped environment.
    pub fn inner(&self) -> &E {
        &self.env
    }

    fn crop(&self, raw: ArrayViewD<u8>) -> Result<ArrayD<u8>> {
        match (&self.crop_fn, &self.config.crop) {
            (Some(f), _) => f.call(raw),
            (None, Some(window)) => window.apply(raw),
            (None, None) => Ok(raw.to_owned()),
        }
    }

    /// Applies crop, resize, grayscale and scaling to a raw frame.
    pub fn transform(&self, raw: ArrayViewD<u8>) -> Result<ArrayD<f32>> {
        EnvError::check_shape(&self.base_shape, raw.shape())?;

        let img = self.crop(raw)?.into_dimensionality::<Ix3>()?;
        let img = resize_frame(img, self.config.height, self.config.width)?;
        let img = img.mapv(|x| x as f32);
        let img = if self.config.grayscale {
            img.mean_axis(Axis(2))
                .ok_or_else(|| anyhow!("cannot average an image without channels"))?
                .insert_axis(Axis(2))
        } else {
            img
        };
        let obs = img.mapv_into(|x| x / 255.0).into_dyn();

        EnvError::check_shape(self.space.shape(), obs.shape())?;
        Ok(obs)
    }
}

/// Resizes a `(h, w, c)` frame to `(height, width, c)` with a bilinear filter.
fn resize_frame(img: Array3<u8>, height: usize, width: usize) -> Result<Array3<u8>> {
    let (h, w, c) = img.dim();
    if h == 0 || w == 0 {
        bail!("cannot resize an empty {}x{} frame", h, w);
    }
    let raw: Vec<u8> = img.iter().copied().collect();
    let (w, h, nw, nh) = (w as u32, h as u32, width as u32, height as u32);
    let buf = match c {
        1 => {
            let img = ImageBuffer::<Luma<u8>, _>::from_raw(w, h, raw)
                .ok_or_else(|| anyhow!("invalid {}x{} luma frame", h, w))?;
            resize(&img, nw, nh, Triangle).into_raw()
        }
        3 => {
            let img = ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, raw)
                .ok_or_else(|| anyhow!("invalid {}x{} rgb frame", h, w))?;
            resize(&img, nw, nh, Triangle).into_raw()
        }
        _ => bail!("cannot resize a frame with {} channels", c),
    };
    Ok(Array3::from_shape_vec((height, width, c), buf)?)
}

impl<E> Env for PreprocessImage<E>
where
    E: Env<Obs = ArrayD<u8>>,
{
    type Obs = ArrayD<f32>;
    type Act = E::Act;
    type Info = E::Info;

    fn observation_space(&self) -> &BoxSpace {
        &self.space
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        trace!("PreprocessImage::reset()");
        let raw = self.env.reset()?;
        self.transform(raw.view())
    }

    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)> {
        trace!("PreprocessImage::step()");
        let (step, record) = self.env.step(a)?;
        let obs = self.transform(step.obs.view())?;
        Ok((step.with_obs(obs), record))
    }

    fn close(&mut self) -> Result<()> {
        self.env.close()
    }

    fn seed(&mut self, seed: u64) {
        self.env.seed(seed)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use gympool_core::{dummy::DummyImageEnv, GymAct};
    use test_log::test;

    // Resampling may round a constant frame by one intensity level
    const TOL: f32 = 1.01 / 255.0;

    fn downcast(e: &anyhow::Error) -> Option<&EnvError> {
        e.downcast_ref::<EnvError>()
    }

    #[test]
    fn test_grayscale_shape_and_range() -> Result<()> {
        let env = DummyImageEnv::new(100, 100, 3, 10);
        let mut env = PreprocessImage::new(env, &PreprocessImageConfig::default().size(64, 64))?;
        assert_eq!(env.observation_space().shape(), &[64, 64, 1]);
        assert_eq!(env.inner().observation_space().shape(), &[100, 100, 3]);

        let obs = env.reset()?;
        assert_eq!(obs.shape(), &[64, 64, 1]);
        assert!(obs.iter().all(|&x| (0.0..=1.0).contains(&x)));

        // A constant frame stays constant and gray values are channel means
        let (step, _) = env.step(&GymAct::Discrete(0))?;
        let expected = (0..3)
            .map(|c| DummyImageEnv::pixel(1, c) as f32)
            .sum::<f32>()
            / 3.0
            / 255.0;
        assert!(step.obs.iter().all(|&x| (x - expected).abs() <= TOL));
        Ok(())
    }

    #[test]
    fn test_color_output() -> Result<()> {
        let env = DummyImageEnv::new(20, 30, 3, 10);
        let config = PreprocessImageConfig::default().size(8, 12).grayscale(false);
        let mut env = PreprocessImage::new(env, &config)?;
        let obs = env.reset()?;
        assert_eq!(obs.shape(), &[8, 12, 3]);
        for c in 0..3 {
            let expected = DummyImageEnv::pixel(0, c) as f32 / 255.0;
            assert!((obs[[3, 4, c]] - expected).abs() <= TOL);
        }
        Ok(())
    }

    #[test]
    fn test_full_range_input() -> Result<()> {
        let env = DummyImageEnv::new(4, 4, 1, 10);
        let env = PreprocessImage::new(env, &PreprocessImageConfig::default().size(2, 2))?;
        let white = ArrayD::from_elem(IxDyn(&[4, 4, 1]), 255u8);
        let black = ArrayD::from_elem(IxDyn(&[4, 4, 1]), 0u8);
        assert!(env.transform(white.view())?.iter().all(|&x| x >= 1.0 - TOL));
        assert!(env.transform(black.view())?.iter().all(|&x| x <= TOL));
        Ok(())
    }

    #[test]
    fn test_crop_window() -> Result<()> {
        let env = DummyImageEnv::new(10, 10, 3, 10);
        let config = PreprocessImageConfig::default()
            .size(5, 5)
            .crop(Some(CropWindow::new(0, 5, 5, 5)));
        let env = PreprocessImage::new(env, &config)?;

        // Left half black, right half white: the crop keeps the white half only
        let raw = ArrayD::from_shape_fn(IxDyn(&[10, 10, 3]), |ix| if ix[1] >= 5 { 255 } else { 0 });
        let obs = env.transform(raw.view())?;
        assert!(obs.iter().all(|&x| x >= 1.0 - TOL));
        Ok(())
    }

    #[test]
    fn test_crop_fn() -> Result<()> {
        let env = DummyImageEnv::new(10, 10, 3, 10);
        let crop = CropFn::new(|img: ArrayViewD<u8>| {
            let img = img.into_dimensionality::<Ix3>()?;
            Ok(img.slice(s![2..8, .., ..]).to_owned().into_dyn())
        });
        let config = PreprocessImageConfig::default().size(3, 5);
        let mut env = PreprocessImage::with_crop_fn(env, &config, crop)?;
        assert_eq!(env.reset()?.shape(), &[3, 5, 1]);
        Ok(())
    }

    #[test]
    fn test_invalid_configurations() {
        let config = PreprocessImageConfig::default();

        // Not an image
        let e = PreprocessImage::new(DummyImageEnv::new(4, 4, 2, 1), &config).unwrap_err();
        assert!(matches!(downcast(&e), Some(EnvError::Configuration(_))));

        // Crop outside of the frame
        let config_ = config.clone().crop(Some(CropWindow::new(2, 2, 4, 4)));
        let e = PreprocessImage::new(DummyImageEnv::new(4, 4, 3, 1), &config_).unwrap_err();
        assert!(matches!(downcast(&e), Some(EnvError::Configuration(_))));

        // Empty resize target
        let config_ = config.clone().size(0, 8);
        let e = PreprocessImage::new(DummyImageEnv::new(4, 4, 3, 1), &config_).unwrap_err();
        assert!(matches!(downcast(&e), Some(EnvError::Configuration(_))));

        // Colour output from a single channel
        let config_ = config.clone().grayscale(false);
        let e = PreprocessImage::new(DummyImageEnv::new(4, 4, 1, 1), &config_).unwrap_err();
        assert!(matches!(downcast(&e), Some(EnvError::Configuration(_))));

        // Custom crop producing a frame that cannot be resized
        let crop = CropFn::new(|img: ArrayViewD<u8>| {
            let img = img.into_dimensionality::<Ix3>()?;
            Ok(img.slice(s![0..0, .., ..]).to_owned().into_dyn())
        });
        let e = PreprocessImage::with_crop_fn(DummyImageEnv::new(4, 4, 3, 1), &config, crop)
            .unwrap_err();
        assert!(matches!(downcast(&e), Some(EnvError::Configuration(_))));
    }

    #[test]
    fn test_rejects_wrong_raw_shape() -> Result<()> {
        let env = DummyImageEnv::new(8, 8, 3, 1);
        let env = PreprocessImage::new(env, &PreprocessImageConfig::default())?;
        let raw = ArrayD::<u8>::zeros(IxDyn(&[8, 9, 3]));
        let e = env.transform(raw.view()).unwrap_err();
        assert!(matches!(downcast(&e), Some(EnvError::ShapeMismatch { .. })));
        Ok(())
    }
}
