//! Service contexts, built once at startup and shared with every handler.

use crate::config::{EmbeddingConfig, TranscriptionConfig};
use futures::future::{BoxFuture, FutureExt};
use index::IndexStore;
use semantic::SemanticModel;
use std::sync::Arc;
use tokio::sync::OnceCell;
use transcribe::{SpeechModel, TranscriptionError};

type SharedSpeechModel = Arc<dyn SpeechModel>;

/// Produces the speech model. Called at most once to completion per process.
pub type ModelLoader =
    Arc<dyn Fn() -> BoxFuture<'static, Result<SharedSpeechModel, TranscriptionError>> + Send + Sync>;

/// Shared state of the transcription service.
///
/// The model is loaded lazily behind a `OnceCell`: a background preload and
/// any number of concurrent requests all wait on the same load.
#[derive(Clone)]
pub struct TranscriptionState {
    pub config: Arc<TranscriptionConfig>,
    model: Arc<OnceCell<SharedSpeechModel>>,
    loader: ModelLoader,
}

impl TranscriptionState {
    /// State whose model comes from `transcribe::load_model` with the configured
    /// size, directory and thread count.
    pub fn new(config: TranscriptionConfig) -> Self {
        let model_dir = config.model_dir.clone();
        let name = config.whisper_model.clone();
        let threads = config.whisper_threads;
        let loader: ModelLoader = Arc::new(move || {
            let model_dir = model_dir.clone();
            let name = name.clone();
            async move { transcribe::load_model(&model_dir, &name, threads).await }.boxed()
        });
        Self::with_loader(config, loader)
    }

    pub fn with_loader(config: TranscriptionConfig, loader: ModelLoader) -> Self {
        Self {
            config: Arc::new(config),
            model: Arc::new(OnceCell::new()),
            loader,
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// The loaded model, loading it first if nobody has yet.
    ///
    /// A failed load leaves the cell empty, so the next caller tries again.
    pub async fn model(&self) -> Result<SharedSpeechModel, TranscriptionError> {
        self.model
            .get_or_try_init(|| (self.loader)())
            .await
            .cloned()
    }

    /// Start loading the model in the background.
    pub fn spawn_preload(&self) -> tokio::task::JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let name = state.config.whisper_model.clone();
            tracing::info!(model = %name, "preloading speech model");
            match state.model().await {
                Ok(_) => tracing::info!(model = %name, "speech model loaded"),
                Err(err) => tracing::error!(model = %name, error = %err, "speech model preload failed"),
            }
        })
    }
}

/// Shared state of the embedding & search service.
#[derive(Clone)]
pub struct EmbeddingState {
    pub config: Arc<EmbeddingConfig>,
    pub model: Arc<SemanticModel>,
    pub store: Arc<IndexStore>,
}

impl EmbeddingState {
    /// Load the embedding model, then open (or create) the index for its
    /// name and output dimension.
    pub async fn load(config: EmbeddingConfig) -> anyhow::Result<Self> {
        let model = SemanticModel::load(&config.semantic()).await?;
        let store_config = config.index_store();
        let name = model.name().to_string();
        let dimension = model.dimension();
        let store = tokio::task::spawn_blocking(move || IndexStore::open(store_config, &name, dimension))
            .await??;

        tracing::info!(
            model = model.name(),
            dimension,
            index_size = store.len()?,
            "embedding service ready"
        );

        Ok(Self::new(config, Arc::new(model), Arc::new(store)))
    }

    pub fn new(config: EmbeddingConfig, model: Arc<SemanticModel>, store: Arc<IndexStore>) -> Self {
        Self {
            config: Arc::new(config),
            model,
            store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use transcribe::RawTranscript;

    struct Silent;

    impl SpeechModel for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        fn transcribe(
            &self,
            _samples: &[f32],
            _language: Option<&str>,
        ) -> Result<RawTranscript, TranscriptionError> {
            Ok(RawTranscript::default())
        }
    }

    fn counting_loader(calls: Arc<AtomicUsize>) -> ModelLoader {
        Arc::new(move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Ok::<_, TranscriptionError>(Arc::new(Silent) as SharedSpeechModel)
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_load() {
        let calls = Arc::new(AtomicUsize::new(0));
        let state = TranscriptionState::with_loader(
            TranscriptionConfig::default(),
            counting_loader(calls.clone()),
        );
        assert!(!state.model_loaded());

        let preload = state.spawn_preload();
        let (a, b) = tokio::join!(state.model(), state.model());
        preload.await.unwrap();

        assert_eq!(a.unwrap().name(), "silent");
        assert_eq!(b.unwrap().name(), "silent");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(state.model_loaded());
    }

    #[tokio::test]
    async fn failed_load_is_retried_by_next_caller() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let loader: ModelLoader = Arc::new(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(TranscriptionError::ModelNotAvailable("offline".into()))
                } else {
                    Ok(Arc::new(Silent) as SharedSpeechModel)
                }
            }
            .boxed()
        });
        let state = TranscriptionState::with_loader(TranscriptionConfig::default(), loader);

        assert!(state.model().await.is_err());
        assert!(!state.model_loaded());
        assert!(state.model().await.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn embedding_state_loads_fast_mode() {
        let dir = tempfile::tempdir().unwrap();
        let config = EmbeddingConfig {
            embedding_mode: semantic::EmbeddingMode::Fast,
            embedding_dimension: 8,
            faiss_index_path: dir.path().join("faiss_index"),
            metadata_path: dir.path().join("faiss_metadata.json"),
            ..Default::default()
        };
        let state = EmbeddingState::load(config).await.unwrap();
        assert_eq!(state.model.dimension(), 8);
        assert_eq!(state.store.dimension(), 8);
        assert_eq!(state.store.len().unwrap(), 0);
    }
}
