//! Loading entry points for Lottie compositions.
//!
//! Three ways in:
//! - [`load_composition`]: async and strict, every failure is an error.
//! - [`load_composition_sync`]: best-effort, failures become a logged
//!   diagnostic next to an absent composition.
//! - [`from_document`] / [`from_json_value`]: already decoded input.

use lottie_core::{CancellationFlag, Composition, CompositionBuilder, CompositionError};
use lottie_data::model::LottieJson;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub use lottie_core;
pub use lottie_data;

/// Source of document bytes.
pub trait AssetLoader: Send + Sync {
    fn load_bytes(&self, path: &str) -> anyhow::Result<Vec<u8>>;
}

/// Reads from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileAssetLoader;

impl AssetLoader for FileAssetLoader {
    fn load_bytes(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        use anyhow::Context;
        std::fs::read(path).with_context(|| format!("failed to read {path}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoaderConfig {
    /// Resolution factor applied to every spatial value.
    pub scale: f32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig { scale: 1.0 }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read animation {path}")]
    Read {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Composition(#[from] CompositionError),
    #[error("loader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result of the best-effort path. At most one of the two is present.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub composition: Option<Arc<Composition>>,
    pub diagnostic: Option<String>,
}

impl LoadOutcome {
    fn failed(diagnostic: String) -> Self {
        warn!("{diagnostic}");
        LoadOutcome {
            composition: None,
            diagnostic: Some(diagnostic),
        }
    }
}

fn builder(config: &LoaderConfig) -> CompositionBuilder {
    CompositionBuilder::new().scale(config.scale)
}

/// Reads and parses `path` off the async runtime's worker threads.
pub async fn load_composition(
    loader: Arc<dyn AssetLoader>,
    path: &str,
    config: LoaderConfig,
) -> Result<Arc<Composition>, LoadError> {
    load_composition_cancellable(loader, path, config, CancellationFlag::new()).await
}

/// Like [`load_composition`]; a cancelled load publishes nothing.
pub async fn load_composition_cancellable(
    loader: Arc<dyn AssetLoader>,
    path: &str,
    config: LoaderConfig,
    cancellation: CancellationFlag,
) -> Result<Arc<Composition>, LoadError> {
    let owned_path = path.to_string();
    let composition = tokio::task::spawn_blocking(move || {
        let bytes = loader.load_bytes(&owned_path).map_err(|source| LoadError::Read {
            path: owned_path.clone(),
            source,
        })?;
        if cancellation.is_cancelled() {
            return Err(CompositionError::Cancelled.into());
        }
        let composition = builder(&config)
            .cancellation(cancellation)
            .from_slice(&bytes)?;
        Ok::<_, LoadError>(composition)
    })
    .await??;
    debug!(path, layers = composition.layers.len(), "Loaded composition");
    Ok(Arc::new(composition))
}

/// Reads and parses through `loader` on the calling thread. Never fails;
/// problems are logged and reported in [`LoadOutcome::diagnostic`].
pub fn load_composition_sync(loader: &dyn AssetLoader, path: &str, config: LoaderConfig) -> LoadOutcome {
    match loader.load_bytes(path) {
        Ok(bytes) => parse_composition_sync(&bytes, config),
        Err(e) => LoadOutcome::failed(format!("Unable to read animation {path}: {e:#}")),
    }
}

/// Best-effort parse of bytes already in memory.
pub fn parse_composition_sync(bytes: &[u8], config: LoaderConfig) -> LoadOutcome {
    match builder(&config).from_slice(bytes) {
        Ok(composition) => LoadOutcome {
            composition: Some(Arc::new(composition)),
            diagnostic: None,
        },
        Err(e) => LoadOutcome::failed(format!("Unable to parse composition: {e}")),
    }
}

/// Builds from an already decoded document; no byte decoding involved.
pub fn from_document(document: &LottieJson, config: LoaderConfig) -> Result<Arc<Composition>, CompositionError> {
    builder(&config).build(document).map(Arc::new)
}

/// Builds from a generic JSON value.
pub fn from_json_value(value: serde_json::Value, config: LoaderConfig) -> Result<Arc<Composition>, CompositionError> {
    builder(&config).from_value(value).map(Arc::new)
}
