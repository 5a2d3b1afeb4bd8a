use thiserror::Error;

/// Failures surfaced by the detection pipeline to its caller.
///
/// Absent quotes and an empty set of opportunities are normal outcomes
/// and never show up here.
#[derive(Debug, Error)]
pub enum ArbitrageError {
    /// Topology requested before exchange metadata was resolved
    #[error("exchange topology is not initialized")]
    NotInitialized,

    /// Metadata or quote fetch returned a non-success status or a malformed payload
    #[error("fetch failed: {0}")]
    FetchFailure(String),

    /// Push subscription ended; the source cannot be resumed
    #[error("quote stream closed")]
    StreamClosed,

    #[error("configuration error: {0}")]
    Config(String),
}

impl ArbitrageError {
    #[inline]
    pub fn fetch(message: impl Into<String>) -> Self {
        ArbitrageError::FetchFailure(message.into())
    }

    /// Whether the orchestration layer may keep the pipeline running after this error
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, ArbitrageError::FetchFailure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_fetch_failures_are_transient() {
        assert!(ArbitrageError::fetch("503").is_transient());
        assert!(!ArbitrageError::NotInitialized.is_transient());
        assert!(!ArbitrageError::StreamClosed.is_transient());
        assert!(!ArbitrageError::Config("x".into()).is_transient());
    }

    #[test]
    fn fetch_failure_message_carries_cause() {
        let err = ArbitrageError::fetch("HTTP 418");
        assert_eq!(err.to_string(), "fetch failed: HTTP 418");
    }
}
