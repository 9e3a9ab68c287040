//! Client core for the instrument-classification service: request packaging,
//! error normalization and the per-mode session state machine.

pub mod config;
pub mod error;
pub mod gateway;
pub mod modes;
pub mod notify;
pub mod preview;
pub mod retry;
pub mod session;
pub mod upload;
pub mod validation;

pub use config::Settings;
pub use error::{format_api_error, GatewayError};
pub use gateway::{HttpPredictionGateway, PredictionGateway};
pub use modes::{ModeChanged, ModeListener, ModeSwitch, Workbench};
pub use notify::{Notification, NotificationLevel, Notifier, RecordingNotifier, TracingNotifier};
pub use preview::{
    MemoryPreviews, PreviewBackend, PreviewHandle, PreviewLocator, TempFilePreviews,
};
pub use retry::RetryPolicy;
pub use session::{
    BatchSubmitter, ClassifyOutcome, SessionController, SessionError, SessionSnapshot,
    SessionState, SingleSubmitter, Submitter,
};
pub use upload::{FileSummary, UploadFile};
pub use validation::{Rejection, RejectionReason, SelectionLimits};
