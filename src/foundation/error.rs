/// Convenience result type used across layercast.
pub type LayercastResult<T> = Result<T, LayercastError>;

/// Top-level error taxonomy used by compositor, upload and studio APIs.
#[derive(thiserror::Error, Debug)]
pub enum LayercastError {
    /// Invalid user-provided or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A base or overlay image could not be fetched or decoded.
    #[error("load error: '{source_ref}': {reason}")]
    Load {
        /// The source reference as the caller supplied it.
        source_ref: String,
        /// Underlying failure, rendered as text.
        reason: String,
    },

    /// The drawing surface could not be acquired for the requested canvas.
    #[error("drawing surface unavailable: {0}")]
    ContextUnavailable(String),

    /// The composed surface could not be encoded as PNG.
    #[error("encode error: {0}")]
    Encode(String),

    /// The object store rejected or failed the upload.
    #[error("upload error: {0}")]
    Upload(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LayercastError {
    /// Build a [`LayercastError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`LayercastError::Load`] value for `source_ref`.
    pub fn load(source_ref: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Load {
            source_ref: source_ref.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`LayercastError::ContextUnavailable`] value.
    pub fn context_unavailable(msg: impl Into<String>) -> Self {
        Self::ContextUnavailable(msg.into())
    }

    /// Build a [`LayercastError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`LayercastError::Upload`] value.
    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }
}
