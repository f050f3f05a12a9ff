/// Everything the client side can fail with, from transport to editor
/// preconditions.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("network: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid base url {0:?}")]
    InvalidUrl(String),

    #[error("not in edit mode")]
    NotEditing,

    #[error("row index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("unknown operation {0}")]
    UnknownOperation(i64),

    #[error("{0:?} is not one of the offered names")]
    NameNotOffered(String),

    #[error("load failed: {0}")]
    LoadFailed(String),
}

pub type ClientResult<T> = Result<T, ClientError>;
