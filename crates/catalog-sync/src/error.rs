use crate::catalog::CatalogError;
use crate::remote::RemoteError;
use crate::state::StateError;

/// Failure classes of a sync run.
///
/// Page-level variants (`Transport`, `Payload`, `Config`) end a chunk with
/// `success = false`. Product-level variants (`DetailFetch`, `Write`) only
/// skip the product they belong to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("payload error: {0}")]
    Payload(String),

    #[error("detail fetch failed for product {id}: {reason}")]
    DetailFetch { id: i64, reason: String },

    #[error("write error: {0}")]
    Write(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Transport(msg) => Self::Transport(msg),
            RemoteError::Payload(msg) => Self::Payload(msg),
            RemoteError::NotFound(id) => Self::Payload(format!("product {id} not found")),
            RemoteError::PageLimit(pages) => {
                Self::Payload(format!("listing did not finish within {pages} pages"))
            }
        }
    }
}

impl From<CatalogError> for SyncError {
    fn from(err: CatalogError) -> Self {
        Self::Write(err.to_string())
    }
}

impl From<StateError> for SyncError {
    fn from(err: StateError) -> Self {
        Self::Write(err.to_string())
    }
}
