//! Mapping from environment ids to backends.
use anyhow::Result;
use gympool_core::{BoxedEnv, EnvError};
use gympool_envs::{CartPoleConfig, CartPoleEnv, CatchConfig, CatchEnv};
use log::debug;
use ndarray::ArrayD;
use std::{collections::BTreeMap, fmt, sync::Arc};

/// Constructor of a backend emitting feature vectors, given a seed.
pub type FeatureCtor = Arc<dyn Fn(i64) -> Result<BoxedEnv<ArrayD<f32>>> + Send + Sync>;

/// Constructor of a backend emitting raw `u8` frames, given a seed.
pub type ImageCtor = Arc<dyn Fn(i64) -> Result<BoxedEnv<ArrayD<u8>>> + Send + Sync>;

/// How an environment id is instantiated.
#[derive(Clone)]
pub enum Backend {
    /// Emits canonical `f32` observations.
    Features(FeatureCtor),

    /// Emits raw frames, to be preprocessed.
    Image(ImageCtor),

    /// Known but cannot be instantiated in this build.
    Unavailable(String),
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Features(_) => write!(f, "Features"),
            Self::Image(_) => write!(f, "Image"),
            Self::Unavailable(reason) => write!(f, "Unavailable({})", reason),
        }
    }
}

/// A registered environment.
#[derive(Clone, Debug)]
pub struct EnvEntry {
    /// Backend of the environment.
    pub backend: Backend,

    /// Episode step limit applied by default.
    pub max_episode_steps: Option<usize>,
}

/// Environment ids and their backends.
///
/// [`Registry::with_builtin`] knows the environments of `gympool-envs`:
///
/// | id            | observation       | default step limit |
/// |---------------|-------------------|--------------------|
/// | `CartPole-v0` | `[4]`             | 200                |
/// | `CartPole-v1` | `[4]`             | 500                |
/// | `Catch-v0`    | `[100, 100, 3]` u8 | none              |
#[derive(Clone, Debug, Default)]
pub struct Registry {
    entries: BTreeMap<String, EnvEntry>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in environments.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for (id, limit) in [("CartPole-v0", 200), ("CartPole-v1", 500)] {
            registry.register_features(id, Some(limit), |seed| {
                let env = CartPoleEnv::build(&CartPoleConfig::default(), seed)?;
                Ok(BoxedEnv::new(env))
            });
        }
        registry.register_image("Catch-v0", None, |seed| {
            let env = CatchEnv::build(&CatchConfig::default(), seed)?;
            Ok(BoxedEnv::new(env))
        });
        registry
    }

    fn insert(&mut self, id: impl Into<String>, entry: EnvEntry) {
        let id = id.into();
        debug!("Registry: {} -> {:?}", id, entry.backend);
        self.entries.insert(id, entry);
    }

    /// Registers a feature-vector backend, replacing any entry with the same id.
    pub fn register_features<F>(
        &mut self,
        id: impl Into<String>,
        max_episode_steps: Option<usize>,
        ctor: F,
    ) where
        F: Fn(i64) -> Result<BoxedEnv<ArrayD<f32>>> + Send + Sync + 'static,
    {
        let backend = Backend::Features(Arc::new(ctor));
        self.insert(
            id,
            EnvEntry {
                backend,
                max_episode_steps,
            },
        );
    }

    /// Registers an image backend, replacing any entry with the same id.
    pub fn register_image<F>(
        &mut self,
        id: impl Into<String>,
        max_episode_steps: Option<usize>,
        ctor: F,
    )
    where
        F: Fn(i64) -> Result<BoxedEnv<ArrayD<u8>>> + Send + Sync + 'static,
    {
        let backend = Backend::Image(Arc::new(ctor));
        self.insert(
            id,
            EnvEntry {
                backend,
                max_episode_steps,
            },
        );
    }

    /// Registers an id whose backend is missing, e.g. a simulator not linked in this build.
    pub fn register_unavailable(&mut self, id: impl Into<String>, reason: impl Into<String>) {
        let backend = Backend::Unavailable(reason.into());
        self.insert(
            id,
            EnvEntry {
                backend,
                max_episode_steps: None,
            },
        );
    }

    /// Registered ids, in lexicographic order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns `true` if `id` is registered with a usable backend.
    pub fn is_available(&self, id: &str) -> bool {
        matches!(self.entries.get(id), Some(e) if !matches!(e.backend, Backend::Unavailable(_)))
    }

    /// Looks up an entry.
    pub fn entry(&self, id: &str) -> Result<&EnvEntry, EnvError> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| EnvError::UnknownEnv(id.to_string()))?;
        if let Backend::Unavailable(reason) = &entry.backend {
            return Err(EnvError::Unavailable {
                id: id.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(entry)
    }

    /// Instantiates a feature-vector backend. Returns the environment and its default step limit.
    pub fn make_features(
        &self,
        id: &str,
        seed: i64,
    ) -> Result<(BoxedEnv<ArrayD<f32>>, Option<usize>)> {
        let entry = self.entry(id)?;
        match &entry.backend {
            Backend::Features(ctor) => Ok((ctor(seed)?, entry.max_episode_steps)),
            _ => Err(EnvError::config(format!(
                "{} emits raw frames, build it as an image environment",
                id
            ))
            .into()),
        }
    }

    /// Instantiates an image backend. Returns the environment and its default step limit.
    pub fn make_image(&self, id: &str, seed: i64) -> Result<(BoxedEnv<ArrayD<u8>>, Option<usize>)> {
        let entry = self.entry(id)?;
        match &entry.backend {
            Backend::Image(ctor) => Ok((ctor(seed)?, entry.max_episode_steps)),
            _ => Err(EnvError::config(format!("{} does not emit image observations", id)).into()),
        }
    }
}
