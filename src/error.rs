use thiserror::Error;

/// Errors raised inside the analysis core and the delivery sink.
///
/// Most numerical failures never reach callers: the analyzers catch
/// `Degenerate` and `Segmentation` and substitute their fallback values.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Signal too short, silent or otherwise unusable for an estimate.
    #[error("degenerate input: {0}")]
    Degenerate(String),

    #[error("segmentation failed: {0}")]
    Segmentation(String),

    #[error("analysis cancelled")]
    Cancelled,

    #[error("delivery failed: {0}")]
    Sink(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
