//! Question-answering engine over a single loaded PDF
//!
//! The engine owns one document at a time. `process_pdf` extracts, chunks
//! and indexes a file, then swaps it in atomically; `ask_question` grounds
//! a prompt in the loaded document and routes it to the chosen model.
//!
//! Every ingestion takes a new generation number. Only the newest
//! ingestion may commit, so an older one that finishes late is discarded
//! with [`Error::Superseded`]. Dropping a `process_pdf` future before it
//! commits puts the engine back in the state it had before. State locks
//! are never held across `.await`.
//!
//! A query whose embedding no longer matches the index dimension moves the
//! engine to [`EngineState::Error`]; the document must be processed again.

use crate::chunk::{chunk_text, compute_content_hash};
use crate::config::Config;
use crate::embed::{create_embedder, Embedder};
use crate::error::{Error, Result};
use crate::history::{
    Answer, Citation, ConversationHistory, ConversationStore, ConversationTurn, Query,
};
use crate::index::EmbeddingIndex;
use crate::llm::{ModelRouter, ModelRuntime, OllamaRuntime};
use crate::models::ModelProfile;
use crate::parse::{PdfExtractor, TextExtractor};
use crate::prompt::{ComposedPrompt, PromptComposer};
use crate::retrieve::Retriever;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Called with `(embedded, total)` chunk counts while a document is indexed
pub type ProgressHook = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Metadata about the loaded document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// blake3 hash of the file bytes
    pub id: String,
    pub path: PathBuf,
    pub file_name: String,
    pub page_count: usize,
    pub chunk_count: usize,
    pub char_count: usize,
    pub loaded_at: DateTime<Utc>,
}

/// Lifecycle state of the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineState {
    Empty,
    Ingesting,
    Ready,
    Error { reason: String },
}

/// Snapshot of the engine for status displays
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    #[serde(flatten)]
    pub state: EngineState,
    pub ready: bool,
    pub current_file: Option<String>,
    pub chunk_count: usize,
    pub history_count: usize,
}

/// The operations a PDF question-answering backend offers
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    fn is_ready(&self) -> bool;

    /// Load `path`, replacing the current document on success
    async fn process_pdf(&self, path: &Path) -> Result<DocumentInfo>;

    /// Answer `query` with `model`, grounded in the loaded document
    async fn ask_question(&self, query: &str, model: &str) -> Result<Answer>;

    fn get_current_file(&self) -> Option<String>;

    fn get_document_info(&self) -> Option<DocumentInfo>;
}

struct LoadedDocument {
    info: DocumentInfo,
    index: EmbeddingIndex,
}

struct Inner {
    state: EngineState,
    /// Current document, or the last good one after a failed ingestion
    document: Option<Arc<LoadedDocument>>,
}

/// Work prepared for a question before the model is invoked
struct PreparedQuestion {
    document: Arc<LoadedDocument>,
    query: Query,
    prompt: ComposedPrompt,
    started: Instant,
}

pub struct QaEngine {
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn Embedder>,
    router: ModelRouter,
    retriever: Retriever,
    composer: PromptComposer,
    history: Arc<dyn ConversationHistory>,
    max_chunk_chars: usize,
    chunk_overlap: usize,
    batch_size: usize,
    max_history_turns: usize,
    reserve_tokens: usize,
    progress: Option<ProgressHook>,
    generation: AtomicU64,
    inner: RwLock<Inner>,
}

impl QaEngine {
    /// Build an engine with the PDF extractor, configured embedder and HTTP runtime
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding, &config.runtime)?;
        let runtime: Arc<dyn ModelRuntime> = Arc::new(OllamaRuntime::from_config(&config.runtime)?);
        let history: Arc<dyn ConversationHistory> = match &config.history.file {
            Some(path) => Arc::new(ConversationStore::open(path)),
            None => Arc::new(ConversationStore::new()),
        };
        Self::with_components(config, Arc::new(PdfExtractor::new()), embedder, runtime, history)
    }

    /// Build an engine from explicit collaborators
    pub fn with_components(
        config: &Config,
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn Embedder>,
        runtime: Arc<dyn ModelRuntime>,
        history: Arc<dyn ConversationHistory>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            extractor,
            embedder,
            router: ModelRouter::new(runtime, config.runtime.timeout()),
            retriever: Retriever::new(config.retrieval.top_k, config.retrieval.min_score),
            composer: PromptComposer::from_config(&config.prompt),
            history,
            max_chunk_chars: config.chunk.max_chars,
            chunk_overlap: config.chunk.overlap_chars,
            batch_size: config.embedding.batch_size,
            max_history_turns: config.prompt.max_history_turns,
            reserve_tokens: config.prompt.reserve_tokens,
            progress: None,
            generation: AtomicU64::new(0),
            inner: RwLock::new(Inner {
                state: EngineState::Empty,
                document: None,
            }),
        })
    }

    /// Report embedding progress through `hook` during ingestion
    pub fn with_progress(mut self, hook: ProgressHook) -> Self {
        self.progress = Some(hook);
        self
    }

    pub fn router(&self) -> &ModelRouter {
        &self.router
    }

    pub fn history(&self) -> &Arc<dyn ConversationHistory> {
        &self.history
    }

    pub fn state(&self) -> EngineState {
        self.read().state.clone()
    }

    pub fn status(&self) -> EngineStatus {
        let inner = self.read();
        EngineStatus {
            ready: inner.state == EngineState::Ready,
            state: inner.state.clone(),
            current_file: inner.document.as_ref().map(|d| d.info.file_name.clone()),
            chunk_count: inner.document.as_ref().map(|d| d.info.chunk_count).unwrap_or(0),
            history_count: self.history.len(),
        }
    }

    /// Answer `query`, forwarding answer fragments to `on_fragment` as they arrive
    pub async fn ask_question_streaming<F>(
        &self,
        query: &str,
        model: &str,
        on_fragment: F,
    ) -> Result<Answer>
    where
        F: FnMut(&str) + Send,
    {
        let prepared = self.prepare(query, model).await?;
        let text = self
            .router
            .invoke_streaming(model, &prepared.prompt.text, on_fragment)
            .await?;
        self.finish(prepared, text)
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// The loaded document, if the engine is ready to answer
    fn ready_document(&self) -> Result<Arc<LoadedDocument>> {
        let inner = self.read();
        match (&inner.state, &inner.document) {
            (EngineState::Ready, Some(document)) => Ok(document.clone()),
            _ => Err(Error::EngineNotReady),
        }
    }

    /// Take `document` out of service after its index proved unusable
    fn invalidate(&self, document: &Arc<LoadedDocument>, cause: &Error) {
        let mut inner = self.write();
        let still_loaded = inner
            .document
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, document));
        if still_loaded && inner.state == EngineState::Ready {
            warn!("Index for {} is unusable: {}", document.info.file_name, cause);
            inner.state = EngineState::Error {
                reason: cause.to_string(),
            };
        }
    }

    async fn load(&self, path: &Path, generation: u64) -> Result<LoadedDocument> {
        let extractor = self.extractor.clone();
        let owned_path = path.to_path_buf();
        let (id, extracted) = tokio::task::spawn_blocking(move || {
            let bytes = std::fs::read(&owned_path).map_err(|e| {
                Error::Ingestion(format!("Failed to read '{}': {}", owned_path.display(), e))
            })?;
            let id = compute_content_hash(&bytes);
            let extracted = extractor.extract(&owned_path)?;
            Ok::<_, Error>((id, extracted))
        })
        .await
        .map_err(|e| Error::Ingestion(format!("Extraction task failed: {}", e)))??;

        if !self.is_current(generation) {
            return Err(Error::Superseded);
        }

        let chunks = chunk_text(
            &id,
            &extracted.text,
            self.max_chunk_chars,
            self.chunk_overlap,
        )?;
        if chunks.is_empty() {
            return Err(Error::Ingestion(
                "Document contains no extractable text".to_string(),
            ));
        }
        let chunk_count = chunks.len();
        debug!("Split {} into {} chunks", path.display(), chunk_count);

        let index = match &self.progress {
            Some(hook) => {
                hook(0, chunk_count);
                let report = |done: usize| hook(done, chunk_count);
                EmbeddingIndex::build_with_progress(
                    self.embedder.clone(),
                    chunks,
                    self.batch_size,
                    Some(&report),
                )
                .await?
            }
            None => EmbeddingIndex::build(self.embedder.clone(), chunks, self.batch_size).await?,
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(LoadedDocument {
            info: DocumentInfo {
                id,
                path: path.to_path_buf(),
                file_name,
                page_count: extracted.page_count,
                chunk_count,
                char_count: extracted.text.chars().count(),
                loaded_at: Utc::now(),
            },
            index,
        })
    }

    async fn prepare(&self, query: &str, model: &str) -> Result<PreparedQuestion> {
        let question = query.trim();
        if question.is_empty() {
            return Err(Error::EmptyQuery);
        }
        let document = self.ready_document()?;
        let profile = ModelProfile::from_name(model)?;
        let model = ModelProfile::runtime_name(model)?;

        let asked_at = Utc::now();
        let started = Instant::now();

        let retrieved = match self.retriever.retrieve(&document.index, question).await {
            Err(e @ Error::EmbeddingDimensionMismatch { .. }) => {
                self.invalidate(&document, &e);
                return Err(e);
            }
            other => other?,
        };
        let recent = self.history.recent(self.max_history_turns);
        let prompt = self.composer.compose(
            question,
            &retrieved,
            &recent,
            profile.budget_chars(self.reserve_tokens),
        )?;

        if !prompt.is_grounded() {
            warn!("No supporting text found for question; answer will be ungrounded");
        }

        Ok(PreparedQuestion {
            document,
            query: Query {
                text: question.to_string(),
                model,
                asked_at,
            },
            prompt,
            started,
        })
    }

    /// Build the answer and record the turn if its document is still loaded
    fn finish(&self, prepared: PreparedQuestion, text: String) -> Result<Answer> {
        let PreparedQuestion {
            document,
            query,
            prompt,
            started,
        } = prepared;

        let answer = Answer {
            text,
            model: query.model.clone(),
            citations: prompt
                .included
                .iter()
                .map(|r| Citation {
                    chunk_id: r.chunk.id.clone(),
                    ordinal: r.chunk.ordinal,
                    score: r.score,
                })
                .collect(),
            grounded: prompt.is_grounded(),
            latency_ms: started.elapsed().as_millis() as u64,
            answered_at: Utc::now(),
        };

        let inner = self.read();
        let still_loaded = inner.state == EngineState::Ready
            && inner
                .document
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, &document));
        if !still_loaded {
            info!("Document changed while answering; discarding answer");
            return Err(Error::Superseded);
        }

        let sequence = self.history.add_entry(ConversationTurn {
            sequence: 0,
            document: document.info.file_name.clone(),
            query,
            answer: answer.clone(),
        });
        debug!("Recorded turn {} ({} ms)", sequence, answer.latency_ms);

        Ok(answer)
    }
}

/// Restores the pre-ingestion state if a `process_pdf` future is dropped mid-load
struct CancelledIngestion<'a> {
    engine: &'a QaEngine,
    generation: u64,
    previous: Option<EngineState>,
}

impl Drop for CancelledIngestion<'_> {
    fn drop(&mut self) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        let mut inner = self.engine.write();
        if self.engine.is_current(self.generation) && inner.state == EngineState::Ingesting {
            debug!("Ingestion {} cancelled; restoring {:?}", self.generation, previous);
            inner.state = previous;
        }
    }
}

#[async_trait]
impl DocumentProcessor for QaEngine {
    fn is_ready(&self) -> bool {
        self.read().state == EngineState::Ready
    }

    async fn process_pdf(&self, path: &Path) -> Result<DocumentInfo> {
        let (generation, previous) = {
            let mut inner = self.write();
            let previous = std::mem::replace(&mut inner.state, EngineState::Ingesting);
            (self.generation.fetch_add(1, Ordering::SeqCst) + 1, previous)
        };
        info!("Processing {} (generation {})", path.display(), generation);

        let mut cancelled = CancelledIngestion {
            engine: self,
            generation,
            previous: Some(previous),
        };
        let loaded = self.load(path, generation).await;
        cancelled.previous = None;

        let mut inner = self.write();
        if !self.is_current(generation) {
            debug!("Ingestion {} superseded", generation);
            return Err(Error::Superseded);
        }

        match loaded {
            Ok(document) => {
                let info = document.info.clone();
                inner.document = Some(Arc::new(document));
                inner.state = EngineState::Ready;
                self.history.clear();
                info!(
                    "Loaded {} ({} pages, {} chunks)",
                    info.file_name, info.page_count, info.chunk_count
                );
                Ok(info)
            }
            Err(e) => {
                warn!("Failed to process {}: {}", path.display(), e);
                inner.state = EngineState::Error {
                    reason: e.to_string(),
                };
                Err(e)
            }
        }
    }

    async fn ask_question(&self, query: &str, model: &str) -> Result<Answer> {
        let prepared = self.prepare(query, model).await?;
        let text = self.router.invoke(model, &prepared.prompt.text).await?;
        self.finish(prepared, text)
    }

    fn get_current_file(&self) -> Option<String> {
        self.read()
            .document
            .as_ref()
            .map(|d| d.info.file_name.clone())
    }

    fn get_document_info(&self) -> Option<DocumentInfo> {
        self.read().document.as_ref().map(|d| d.info.clone())
    }
}
