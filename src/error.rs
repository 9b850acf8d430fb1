use thiserror::Error;

/// Boxed error returned by step hooks and custom plan options.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while building or executing a plan.
///
/// # Non-Exhaustive
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code. When matching
/// on this error, always include a wildcard pattern:
///
/// ```
/// use tejun::PlanError;
///
/// fn report(error: PlanError) {
///     match error {
///         PlanError::Cancelled => eprintln!("plan cancelled"),
///         PlanError::Timeout => eprintln!("plan took too long"),
///         PlanError::Step(err) => eprintln!("step failed: {}", err),
///         _ => eprintln!("error: {}", error),
///     }
/// }
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PlanError {
    /// The token governing the run was cancelled before the run finished.
    #[error("plan execution cancelled")]
    Cancelled,

    /// The plan's maximum duration elapsed before the run finished.
    #[error("plan execution duration limit exceeded")]
    Timeout,

    /// A step's `pre_exec`, `exec` or `post_exec` hook failed.
    ///
    /// The hook's error is carried as-is, its display is not decorated.
    #[error(transparent)]
    Step(BoxError),

    /// A plan option could not be applied.
    #[error("invalid plan option: {0}")]
    Configuration(#[source] BoxError),

    /// The background task stopped without reporting a result, which
    /// happens when a hook panics.
    #[error("plan execution aborted before reporting a result")]
    Aborted,
}

impl PlanError {
    /// Returns `true` for [`PlanError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PlanError::Cancelled)
    }

    /// Returns `true` for [`PlanError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, PlanError::Timeout)
    }

    /// Returns the hook error if this is a [`PlanError::Step`].
    pub fn step_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            PlanError::Step(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_sentinel_display() {
        assert_eq!(PlanError::Cancelled.to_string(), "plan execution cancelled");
        assert_eq!(
            PlanError::Timeout.to_string(),
            "plan execution duration limit exceeded"
        );
    }

    #[test]
    fn test_step_error_is_transparent() {
        let error = PlanError::Step("disk full".into());
        assert_eq!(error.to_string(), "disk full");
        assert_eq!(error.step_error().map(|e| e.to_string()), Some("disk full".to_string()));
        assert!(!error.is_cancelled());
        assert!(!error.is_timeout());
    }

    #[test]
    fn test_configuration_keeps_source() {
        let error = PlanError::Configuration("bad limit".into());
        assert_eq!(error.to_string(), "invalid plan option: bad limit");
        assert_eq!(error.source().map(|e| e.to_string()), Some("bad limit".to_string()));
        assert!(error.step_error().is_none());
    }
}
