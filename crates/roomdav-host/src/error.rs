use thiserror::Error;

/// Errors surfaced by host store implementations
#[derive(Error, Debug)]
pub enum HostError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected status {status} from host during {operation}")]
    UnexpectedStatus { operation: &'static str, status: u16 },

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed host response: {0}")]
    MalformedResponse(String),

    #[error("OCS failure {statuscode}: {message}")]
    Ocs { statuscode: i64, message: String },
}

pub type HostResult<T> = std::result::Result<T, HostError>;
