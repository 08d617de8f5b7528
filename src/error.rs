use std::path::PathBuf;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing credential: set {0}")]
    MissingCredential(&'static str),
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Failures of the analysis path. The display string is the message shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("analysis failed: {0}")]
    AnalysisFailed(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("no JSON object found in the model response")]
    NoJsonFound,
    #[error("malformed model response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("failed to write history to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("failed to read image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported image type: {0}")]
    NotAnImage(String),
    #[error("malformed data URL")]
    MalformedDataUrl,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("no history entry at index {0}")]
    NotFound(usize),
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("pdf backend error: {0}")]
    Pdf(#[from] printpdf::Error),
}
