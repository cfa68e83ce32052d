//! Configurations of the environment factories.
use crate::CropWindow;
use crate::CropFn;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`make_env`](super::make_env).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Registered id of the environment.
    pub env_id: String,

    /// Number of environments in the pool. `0` builds a single environment.
    pub n_envs: usize,

    /// Maximum number of steps in an episode. Replaces the default limit of the
    /// registry if given.
    pub episode_step_limit: Option<usize>,

    /// Number of stacked observations. No stacking if `1`.
    pub n_frames: usize,

    /// Random seed. Slot `i` of a pool is seeded with `seed + i`.
    pub seed: i64,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            env_id: "".to_string(),
            n_envs: 1,
            episode_step_limit: None,
            n_frames: 1,
            seed: 0,
        }
    }
}

impl EnvConfig {
    /// Sets the id of the environment.
    pub fn env_id(mut self, v: impl Into<String>) -> Self {
        self.env_id = v.into();
        self
    }

    /// Sets the number of environments in the pool.
    pub fn n_envs(mut self, v: usize) -> Self {
        self.n_envs = v;
        self
    }

    /// Sets the maximum number of steps in an episode.
    pub fn episode_step_limit(mut self, v: Option<usize>) -> Self {
        self.episode_step_limit = v;
        self
    }

    /// Sets the number of stacked observations.
    pub fn n_frames(mut self, v: usize) -> Self {
        self.n_frames = v;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, v: i64) -> Self {
        self.seed = v;
        self
    }

    /// Constructs [`EnvConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`EnvConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Configuration of [`make_image_env`](super::make_image_env).
///
/// The common options are flattened into the same YAML mapping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageEnvConfig {
    /// Options shared with [`EnvConfig`].
    #[serde(flatten)]
    pub env: EnvConfig,

    /// Width of preprocessed frames.
    pub width: usize,

    /// Height of preprocessed frames.
    pub height: usize,

    /// Averages the channels of preprocessed frames.
    pub grayscale: bool,

    /// Crop applied to raw frames.
    pub crop: Option<CropWindow>,

    /// Number of raw steps per step. No skipping if `None`.
    pub frame_skip: Option<usize>,

    /// Custom crop, used instead of `crop`. Not serialized.
    #[serde(skip)]
    pub crop_fn: Option<CropFn>,
}

impl Default for ImageEnvConfig {
    fn default() -> Self {
        Self {
            env: EnvConfig::default(),
            width: 64,
            height: 64,
            grayscale: true,
            crop: None,
            frame_skip: None,
            crop_fn: None,
        }
    }
}

impl ImageEnvConfig {
    /// Sets the id of the environment.
    pub fn env_id(mut self, v: impl Into<String>) -> Self {
        self.env.env_id = v.into();
        self
    }

    /// Sets the number of environments in the pool.
    pub fn n_envs(mut self, v: usize) -> Self {
        self.env.n_envs = v;
        self
    }

    /// Sets the maximum number of steps in an episode.
    pub fn episode_step_limit(mut self, v: Option<usize>) -> Self {
        self.env.episode_step_limit = v;
        self
    }

    /// Sets the number of stacked frames.
    pub fn n_frames(mut self, v: usize) -> Self {
        self.env.n_frames = v;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, v: i64) -> Self {
        self.env.seed = v;
        self
    }

    /// Sets the size of preprocessed frames.
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

    /// Sets the number of raw steps per step.
    pub fn frame_skip(mut self, v: Option<usize>) -> Self {
        self.frame_skip = v;
        self
    }

    /// Sets a custom crop function.
    pub fn crop_fn(mut self, v: Option<CropFn>) -> Self {
        self.crop_fn = v;
        self
    }

    /// Constructs [`ImageEnvConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ImageEnvConfig`]. The custom crop function is not saved.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_env_config() -> Result<()> {
        let config = EnvConfig::default()
            .env_id("CartPole-v1")
            .n_envs(8)
            .episode_step_limit(Some(100))
            .n_frames(4)
            .seed(42);

        let dir = TempDir::new("env_config")?;
        let path = dir.path().join("env_config.yaml");
        config.save(&path)?;
        let config_ = EnvConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_serde_image_env_config() -> Result<()> {
        let config = ImageEnvConfig::default()
            .env_id("Catch-v0")
            .size(84, 84)
            .grayscale(false)
            .crop(Some(CropWindow::new(0, 0, 80, 100)))
            .frame_skip(Some(4));

        let dir = TempDir::new("image_env_config")?;
        let path = dir.path().join("image_env_config.yaml");
        config.save(&path)?;
        let config_ = ImageEnvConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_partial_yaml() -> Result<()> {
        let config: ImageEnvConfig = serde_yaml::from_str("env_id: Catch-v0\nn_frames: 4\n")?;
        assert_eq!(config.env.env_id, "Catch-v0");
        assert_eq!(config.env.n_frames, 4);
        assert_eq!(config.env.n_envs, 1);
        assert_eq!((config.width, config.height), (64, 64));
        assert!(config.grayscale);
        Ok(())
    }
}
