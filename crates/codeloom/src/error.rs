/// Classified errors from the generation provider boundary.
///
/// Transport specifics stay behind these variants so callers can decide
/// fatal-vs-recoverable without knowing the wire protocol.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Generic {0}")]
    Generic(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode provider response: {0}")]
    Decode(String),
}
