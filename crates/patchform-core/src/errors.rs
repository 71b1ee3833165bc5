//! Error types for the patchform core library.

/// Top-level error enum for the patchform core library.
#[derive(Debug, thiserror::Error)]
pub enum PatchformError {
    /// The apply precondition failed: the working tree has outstanding
    /// changes and `require_clean_git` is enabled. This aborts the whole
    /// run before any file is touched.
    #[error("working tree has uncommitted changes; commit or stash them, or disable require_clean_git")]
    DirtyWorkTree,

    /// An edit plan contained an operation the engine does not recognize.
    /// Surfaces as a per-file failure, never as a run abort.
    #[error("unknown or malformed op: {0}")]
    UnknownOp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type PatchformResult<T> = Result<T, PatchformError>;
