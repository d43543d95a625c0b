/// Convenience result type used across clipframe.
pub type ClipframeResult<T> = Result<T, ClipframeError>;

/// Caller-facing failure class.
///
/// Only these three classes cross the boundary; stage detail stays in the logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request was rejected before any pipeline stage ran.
    BadInput,
    /// Preparation, rasterization, encoding or cancellation failed.
    RenderFailed,
    /// The artifact was encoded but could not be handed off.
    DeliveryFailed,
}

/// Top-level error taxonomy used by pipeline stages.
#[derive(thiserror::Error, Debug)]
pub enum ClipframeError {
    /// Invalid user-provided input (file type, label, missing field).
    #[error("validation error: {0}")]
    Validation(String),

    /// Server-side configuration or layout is unusable. Never the caller's fault.
    #[error("config error: {0}")]
    Config(String),

    /// Metadata extraction failed. Recovered by the orchestrator via the fallback duration.
    #[error("probe error: {0}")]
    Probe(String),

    /// The composition could not be prepared for rendering.
    #[error("preparation error: {0}")]
    Preparation(String),

    /// Frame generation failed (decode or raster).
    #[error("rasterization error: {0}")]
    Rasterization(String),

    /// The encoder failed to start, accept frames, or finish.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The artifact exists but could not be exposed to the caller.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// The render was cancelled or exceeded its deadline.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClipframeError {
    /// Build a [`ClipframeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ClipframeError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`ClipframeError::Probe`] value.
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    /// Build a [`ClipframeError::Preparation`] value.
    pub fn preparation(msg: impl Into<String>) -> Self {
        Self::Preparation(msg.into())
    }

    /// Build a [`ClipframeError::Rasterization`] value.
    pub fn rasterization(msg: impl Into<String>) -> Self {
        Self::Rasterization(msg.into())
    }

    /// Build a [`ClipframeError::Encoding`] value.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Build a [`ClipframeError::Delivery`] value.
    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    /// Build a [`ClipframeError::Cancelled`] value.
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Map the error onto the caller-facing failure class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::BadInput,
            Self::Delivery(_) => ErrorKind::DeliveryFailed,
            Self::Config(_)
            | Self::Probe(_)
            | Self::Preparation(_)
            | Self::Rasterization(_)
            | Self::Encoding(_)
            | Self::Cancelled(_)
            | Self::Other(_) => ErrorKind::RenderFailed,
        }
    }

    /// Short message safe to show to the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Delivery(_) => {
                "Video was rendered but could not be delivered, please try again".to_string()
            }
            _ => "Rendering failed, please try again".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
