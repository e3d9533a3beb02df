use thiserror::Error;

#[derive(Debug, Error)]
pub enum TsdbError {
    #[error("Invalid time value: {0}")]
    InvalidTime(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    /// JSON syntax or type mismatch. `line`/`column` locate the offending byte
    /// when the decoder knows it; both are 0 otherwise.
    #[error("Decode error at line {line} column {column}: {message}")]
    Decode {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Request canceled")]
    Canceled,
}

impl TsdbError {
    /// Short label used for the `kind` dimension of the error counter.
    pub fn kind(&self) -> &'static str {
        match self {
            TsdbError::InvalidTime(_) => "invalid_time",
            TsdbError::InvalidValue(_) => "invalid_value",
            TsdbError::InvalidRequest(_) => "invalid_request",
            TsdbError::Transport(_) => "transport",
            TsdbError::Server { .. } => "server",
            TsdbError::Decode { .. } => "decode",
            TsdbError::Canceled => "canceled",
        }
    }
}

impl From<serde_json::Error> for TsdbError {
    fn from(err: serde_json::Error) -> Self {
        TsdbError::Decode {
            message: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }
}

impl From<reqwest::Error> for TsdbError {
    fn from(err: reqwest::Error) -> Self {
        TsdbError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TsdbError>;
