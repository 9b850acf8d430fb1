use crate::error::BoxError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Plan-wide settings.
///
/// # Examples
///
/// ```
/// use tejun::PlanConfig;
/// use std::time::Duration;
///
/// let config = PlanConfig {
///     continue_on_error: true,
///     max_duration: Some(Duration::from_secs(30)),
/// };
/// assert_eq!(config.deadline(), Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Keep going (and allow retries) when a hook fails. Default: stop at
    /// the first failure.
    pub continue_on_error: bool,
    /// Upper bound on a run. `None` or zero means the run only ends early
    /// on explicit cancellation.
    pub max_duration: Option<Duration>,
}

impl PlanConfig {
    /// `max_duration`, unless it is zero.
    pub fn deadline(&self) -> Option<Duration> {
        self.max_duration.filter(|limit| !limit.is_zero())
    }
}

/// A named setting applied when creating a [`Plan`](crate::Plan).
///
/// # Examples
///
/// ```
/// use tejun::{Plan, PlanOption};
/// use std::time::Duration;
///
/// let plan = Plan::new([
///     PlanOption::continue_on_error(),
///     PlanOption::limit_duration(Duration::from_secs(10)),
/// ])?;
/// assert!(plan.config().continue_on_error);
/// # Ok::<(), tejun::PlanError>(())
/// ```
pub struct PlanOption(Box<dyn FnOnce(&mut PlanConfig) -> Result<(), BoxError> + Send>);

impl PlanOption {
    /// Tolerate hook failures instead of stopping the plan.
    pub fn continue_on_error() -> Self {
        Self::from_fn(|config| {
            config.continue_on_error = true;
            Ok(())
        })
    }

    /// Time the plan out once it has run for `limit`.
    pub fn limit_duration(limit: Duration) -> Self {
        Self::from_fn(move |config| {
            config.max_duration = Some(limit);
            Ok(())
        })
    }

    /// Option backed by an arbitrary function. An error fails plan creation.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce(&mut PlanConfig) -> Result<(), BoxError> + Send + 'static,
    {
        Self(Box::new(f))
    }

    pub(crate) fn apply(self, config: &mut PlanConfig) -> Result<(), BoxError> {
        (self.0)(config)
    }
}

impl fmt::Debug for PlanOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PlanOption(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continue_on_error_option() {
        let mut config = PlanConfig::default();
        assert!(PlanOption::continue_on_error().apply(&mut config).is_ok());
        assert!(config.continue_on_error);
    }

    #[test]
    fn test_limit_duration_option() {
        let mut config = PlanConfig::default();
        assert!(PlanOption::limit_duration(Duration::from_secs(1))
            .apply(&mut config)
            .is_ok());
        assert_eq!(config.max_duration, Some(Duration::from_secs(1)));
        assert_eq!(config.deadline(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_zero_duration_is_no_deadline() {
        let config = PlanConfig {
            continue_on_error: false,
            max_duration: Some(Duration::ZERO),
        };
        assert_eq!(config.deadline(), None);
        assert_eq!(PlanConfig::default().deadline(), None);
    }

    #[test]
    fn test_failing_option() {
        let mut config = PlanConfig::default();
        let result = PlanOption::from_fn(|_| Err("blah".into())).apply(&mut config);
        assert_eq!(result.map_err(|e| e.to_string()), Err("blah".to_string()));
    }

    #[test]
    fn test_config_from_json() {
        let config: PlanConfig = serde_json::from_str(
            r#"{"continue_on_error": true, "max_duration": {"secs": 2, "nanos": 0}}"#,
        )
        .unwrap();
        assert!(config.continue_on_error);
        assert_eq!(config.max_duration, Some(Duration::from_secs(2)));

        let config: PlanConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PlanConfig::default());
    }
}
