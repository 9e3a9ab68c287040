//! Per-mode classification session: selection, in-flight request, result and
//! error state for one upload workflow.
//!
//! One generic controller serves all four modes. The [`Submitter`] decides the
//! arity and media type and performs the actual request; the controller owns
//! the state machine around it:
//!
//! ```text
//! Idle --select--> Selected --confirm--> Pending --> Success | Failed
//!   \______________classify_______________/  ^            |
//!                                            \---retry----/
//! ```
//!
//! Every request is tagged with the generation it was started in. `reset`
//! bumps the generation, so a response that arrives after the session was
//! abandoned is dropped instead of applied.

use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{Arity, MediaType, Mode},
    protocol::{BatchPredictionResponse, PredictionResult},
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    error::{format_api_error, GatewayError},
    gateway::PredictionGateway,
    notify::{Notification, Notifier},
    preview::{PreviewBackend, PreviewHandle, PreviewSlots},
    retry::RetryPolicy,
    upload::{FileSummary, UploadFile},
    validation::{validate_selection, Rejection, SelectionLimits},
};

#[async_trait]
pub trait Submitter: Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    fn mode(&self) -> Mode;

    async fn submit(&self, files: &[UploadFile]) -> Result<Self::Output, GatewayError>;

    /// Called with every successful response before it is stored.
    fn inspect(&self, _output: &Self::Output, _submitted: usize) {}
}

pub struct SingleSubmitter {
    gateway: Arc<dyn PredictionGateway>,
    media: MediaType,
}

impl SingleSubmitter {
    pub fn new(gateway: Arc<dyn PredictionGateway>, media: MediaType) -> Self {
        Self { gateway, media }
    }
}

#[async_trait]
impl Submitter for SingleSubmitter {
    type Output = PredictionResult;

    fn mode(&self) -> Mode {
        Mode::new(Arity::Single, self.media)
    }

    async fn submit(&self, files: &[UploadFile]) -> Result<PredictionResult, GatewayError> {
        let file = files
            .first()
            .ok_or_else(|| GatewayError::Transport("no file selected".into()))?;
        self.gateway.predict(self.media, file).await
    }
}

pub struct BatchSubmitter {
    gateway: Arc<dyn PredictionGateway>,
    media: MediaType,
}

impl BatchSubmitter {
    pub fn new(gateway: Arc<dyn PredictionGateway>, media: MediaType) -> Self {
        Self { gateway, media }
    }
}

#[async_trait]
impl Submitter for BatchSubmitter {
    type Output = BatchPredictionResponse;

    fn mode(&self) -> Mode {
        Mode::new(Arity::Batch, self.media)
    }

    async fn submit(&self, files: &[UploadFile]) -> Result<BatchPredictionResponse, GatewayError> {
        self.gateway.batch_predict(self.media, files).await
    }

    fn inspect(&self, output: &BatchPredictionResponse, submitted: usize) {
        if !output.is_consistent_with(submitted) {
            warn!(
                mode = %self.mode(),
                submitted,
                total_processed = output.total_processed,
                success_count = output.success_count,
                error_count = output.error_count,
                "batch response counters do not add up"
            );
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState<O> {
    Idle,
    Selected,
    Pending,
    Success(O),
    Failed(String),
}

impl<O> SessionState<O> {
    pub fn is_pending(&self) -> bool {
        matches!(self, SessionState::Pending)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Selected => "selected",
            SessionState::Pending => "pending",
            SessionState::Success(_) => "success",
            SessionState::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassifyOutcome<O> {
    Completed(O),
    Failed(String),
    /// The session was reset while the request was in flight.
    Abandoned,
    /// Nothing was submitted: a request was already pending or no file is held.
    Ignored,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("selection rejected: {}", join_rejections(.0))]
    Rejected(Vec<Rejection>),
    #[error("a request is already in flight")]
    Busy,
    #[error("{0} mode does not support removing files")]
    NotBatch(Mode),
    #[error("no file at position {index} (holding {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

fn join_rejections(rejections: &[Rejection]) -> String {
    rejections
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone)]
pub struct SessionSnapshot<O> {
    pub mode: Mode,
    pub state: SessionState<O>,
    pub files: Vec<FileSummary>,
    pub previews: Vec<Option<PreviewHandle>>,
}

impl<O> SessionSnapshot<O> {
    pub fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    pub fn is_error(&self) -> bool {
        matches!(self.state, SessionState::Failed(_))
    }

    pub fn result(&self) -> Option<&O> {
        match &self.state {
            SessionState::Success(output) => Some(output),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            SessionState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

struct SessionInner<O> {
    files: Vec<UploadFile>,
    previews: PreviewSlots,
    state: SessionState<O>,
    generation: u64,
}

impl<O> SessionInner<O> {
    fn hold(&mut self, files: Vec<UploadFile>) {
        self.previews.replace_all(&files);
        self.files = files;
    }

    fn begin(&mut self) -> (u64, Vec<UploadFile>) {
        self.generation += 1;
        self.state = SessionState::Pending;
        (self.generation, self.files.clone())
    }

    fn clear(&mut self) {
        self.generation += 1;
        self.files.clear();
        self.previews.clear();
        self.state = SessionState::Idle;
    }
}

pub fn success_message(mode: Mode) -> &'static str {
    match mode {
        Mode::Image => "Image processed successfully",
        Mode::Audio => "Audio processed successfully",
        Mode::BatchImage | Mode::BatchAudio => "Batch processing complete",
    }
}

pub fn default_error_message(mode: Mode) -> &'static str {
    match mode {
        Mode::Image => "Error processing image",
        Mode::Audio => "Error processing audio",
        Mode::BatchImage | Mode::BatchAudio => "Error in batch processing",
    }
}

pub struct SessionController<S: Submitter> {
    submitter: S,
    limits: SelectionLimits,
    retry: RetryPolicy,
    notifier: Arc<dyn Notifier>,
    inner: Mutex<SessionInner<S::Output>>,
}

impl<S: Submitter> SessionController<S> {
    pub fn new(
        submitter: S,
        settings: &Settings,
        previews: Arc<dyn PreviewBackend>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let mode = submitter.mode();
        Self {
            limits: SelectionLimits::for_mode(mode, settings),
            retry: RetryPolicy::for_arity(mode.arity()),
            submitter,
            notifier,
            inner: Mutex::new(SessionInner {
                files: Vec::new(),
                previews: PreviewSlots::new(previews),
                state: SessionState::Idle,
                generation: 0,
            }),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn mode(&self) -> Mode {
        self.submitter.mode()
    }

    pub fn limits(&self) -> SelectionLimits {
        self.limits
    }

    pub async fn snapshot(&self) -> SessionSnapshot<S::Output> {
        let inner = self.inner.lock().await;
        SessionSnapshot {
            mode: self.mode(),
            state: inner.state.clone(),
            files: inner.files.iter().map(FileSummary::from).collect(),
            previews: inner.previews.handles(),
        }
    }

    /// Validates `files` and keeps the accepted ones without submitting.
    pub async fn select(&self, files: Vec<UploadFile>) -> Result<usize, SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.state.is_pending() {
            return Err(SessionError::Busy);
        }
        let accepted = self.accept(files)?;
        let count = accepted.len();
        inner.hold(accepted);
        inner.state = SessionState::Selected;
        debug!(mode = %self.mode(), count, "files selected");
        Ok(count)
    }

    /// Submits a selection made with [`select`](Self::select).
    pub async fn confirm(&self) -> ClassifyOutcome<S::Output> {
        let (generation, files) = {
            let mut inner = self.inner.lock().await;
            if !matches!(inner.state, SessionState::Selected) || inner.files.is_empty() {
                return ClassifyOutcome::Ignored;
            }
            inner.begin()
        };
        self.run(generation, files).await
    }

    /// Selects `files` and submits them immediately.
    pub async fn classify(
        &self,
        files: Vec<UploadFile>,
    ) -> Result<ClassifyOutcome<S::Output>, SessionError> {
        let (generation, files) = {
            let mut inner = self.inner.lock().await;
            if inner.state.is_pending() {
                debug!(mode = %self.mode(), "ignoring classify while a request is pending");
                return Ok(ClassifyOutcome::Ignored);
            }
            let accepted = self.accept(files)?;
            inner.hold(accepted);
            inner.begin()
        };
        Ok(self.run(generation, files).await)
    }

    /// Resubmits the held files. A no-op when nothing is held.
    pub async fn retry(&self) -> ClassifyOutcome<S::Output> {
        let (generation, files) = {
            let mut inner = self.inner.lock().await;
            if inner.state.is_pending() || inner.files.is_empty() {
                return ClassifyOutcome::Ignored;
            }
            inner.begin()
        };
        self.run(generation, files).await
    }

    /// Drops one file from a batch selection. Emptying the selection also
    /// clears any result or error.
    pub async fn remove_file(&self, index: usize) -> Result<usize, SessionError> {
        let mode = self.mode();
        if !mode.is_batch() {
            return Err(SessionError::NotBatch(mode));
        }
        let mut inner = self.inner.lock().await;
        if inner.state.is_pending() {
            return Err(SessionError::Busy);
        }
        let len = inner.files.len();
        if index >= len {
            return Err(SessionError::IndexOutOfRange { index, len });
        }

        let removed = inner.files.remove(index);
        inner.previews.remove(index);
        debug!(%mode, filename = %removed.filename, "removed file from selection");

        if inner.files.is_empty() {
            inner.clear();
        }
        Ok(inner.files.len())
    }

    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state.is_pending() {
            info!(mode = %self.mode(), "abandoning in-flight request");
        }
        inner.clear();
    }

    fn accept(&self, files: Vec<UploadFile>) -> Result<Vec<UploadFile>, SessionError> {
        let mode = self.mode();
        let selection = validate_selection(files, mode.media(), self.limits);
        for rejection in &selection.rejected {
            warn!(%mode, %rejection, "file rejected before submission");
            self.notifier.notify(Notification::error(rejection.to_string()));
        }
        if selection.accepted.is_empty() {
            return Err(SessionError::Rejected(selection.rejected));
        }
        Ok(selection.accepted)
    }

    async fn run(&self, generation: u64, files: Vec<UploadFile>) -> ClassifyOutcome<S::Output> {
        let mode = self.mode();
        info!(%mode, files = files.len(), "submitting prediction request");

        let result = self.retry.run(|| self.submitter.submit(&files)).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            warn!(%mode, "discarding response for abandoned session");
            return ClassifyOutcome::Abandoned;
        }

        match result {
            Ok(output) => {
                self.submitter.inspect(&output, files.len());
                inner.state = SessionState::Success(output.clone());
                info!(%mode, "prediction request succeeded");
                self.notifier
                    .notify(Notification::success(success_message(mode)));
                ClassifyOutcome::Completed(output)
            }
            Err(err) => {
                let message = format_api_error(&err, default_error_message(mode));
                warn!(%mode, error = %err, "prediction request failed");
                inner.state = SessionState::Failed(message.clone());
                self.notifier.notify(Notification::error(message.clone()));
                ClassifyOutcome::Failed(message)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
