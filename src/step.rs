use crate::context::Context;
use crate::error::BoxError;
use async_trait::async_trait;
use std::fmt;

/// Label for a step in logs and in `Plan`'s debug output.
///
/// ```
/// use tejun::StepName;
///
/// let name: StepName = "attach-volume".into();
/// assert_eq!(name.to_string(), "attach-volume");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StepName(String);

impl StepName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Bare name of `T`, without module path or generic arguments.
    pub(crate) fn of<T: ?Sized>() -> Self {
        let full = std::any::type_name::<T>();
        let path = full.split('<').next().unwrap_or(full);
        Self::new(path.rsplit("::").next().unwrap_or(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for StepName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Tells the plan how to treat a step beyond running its hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepKind {
    /// Regular unit of work, rolled back on cleanup.
    #[default]
    Action,
    /// Pure wait. Never rolled back.
    Delay,
}

/// One of the four lifecycle hooks of a [`Step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    PreExec,
    Exec,
    PostExec,
    Cleanup,
}

impl Hook {
    /// Forward hooks, in the order a plan runs them.
    pub const FORWARD: [Hook; 3] = [Hook::PreExec, Hook::Exec, Hook::PostExec];
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::PreExec => write!(f, "pre_exec"),
            Hook::Exec => write!(f, "exec"),
            Hook::PostExec => write!(f, "post_exec"),
            Hook::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// A unit of work in a [`Plan`](crate::Plan).
///
/// An attempt at a step succeeds only if `pre_exec`, `exec` and `post_exec`
/// all return `Ok`. Once the plan stops moving forward it walks back over
/// the steps it got through and calls `cleanup` on each, last one first.
///
/// On retry every forward hook is called again. Steps that must not repeat
/// a hook that already succeeded have to track that themselves, as
/// [`FnStep`](crate::FnStep) does.
///
/// # Examples
///
/// ```
/// use tejun::{BoxError, Context, Step};
/// use async_trait::async_trait;
///
/// struct CreateUser;
///
/// #[async_trait]
/// impl Step for CreateUser {
///     async fn exec(&self, ctx: &Context) -> Result<(), BoxError> {
///         ctx.state().store("user_id", 42u64);
///         Ok(())
///     }
///
///     async fn cleanup(&self, ctx: &Context) {
///         ctx.state().remove("user_id");
///     }
///
///     fn retries(&self) -> u32 {
///         2
///     }
/// }
/// ```
#[async_trait]
pub trait Step: Send + Sync {
    /// Runs before `exec`. Default: nothing.
    async fn pre_exec(&self, _ctx: &Context) -> Result<(), BoxError> {
        Ok(())
    }

    /// The step's main action.
    async fn exec(&self, ctx: &Context) -> Result<(), BoxError>;

    /// Runs after `exec`. Default: nothing.
    async fn post_exec(&self, _ctx: &Context) -> Result<(), BoxError> {
        Ok(())
    }

    /// Undoes the step during rollback. Not retried, and failures are the
    /// step's own business.
    async fn cleanup(&self, _ctx: &Context) {}

    /// Extra attempts allowed after a failed one. Only consumed when the
    /// plan continues on error.
    ///
    /// The plan stops attempting a step after its first clean attempt, so
    /// a budget never causes hooks to run again once all three succeeded.
    fn retries(&self) -> u32 {
        0
    }

    fn kind(&self) -> StepKind {
        StepKind::Action
    }

    /// By default, uses the type name. Override to provide a custom name.
    fn name(&self) -> StepName {
        StepName::of::<Self>()
    }
}
