use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("platform rejected request: code={code}, message={message}")]
    Platform { code: i64, message: String },

    #[error("malformed platform payload: {0}")]
    MalformedPayload(String),

    #[error("platform credential is missing or incomplete")]
    MissingCredential,

    #[error("export submission failed: {0}")]
    ExportSubmission(String),

    #[error("export job {task_id} not ready after {attempts} poll attempts")]
    JobTimeout { task_id: String, attempts: u32 },

    #[error("failed to load configuration snapshot: {0}")]
    ConfigLoad(String),

    #[error("notification delivery failed: {0}")]
    Notification(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
