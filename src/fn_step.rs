use crate::context::Context;
use crate::error::BoxError;
use crate::step::{Hook, Step, StepName};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Boxed future returned by [`FnStep`] hooks.
pub type HookFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

type ForwardFn = Arc<dyn Fn(Context) -> HookFuture<Result<(), BoxError>> + Send + Sync>;
type CleanupFn = Arc<dyn Fn(Context) -> HookFuture<()> + Send + Sync>;

#[derive(Debug, Default)]
struct Completed {
    pre_exec: AtomicBool,
    exec: AtomicBool,
    post_exec: AtomicBool,
}

impl Completed {
    fn flag(&self, hook: Hook) -> Option<&AtomicBool> {
        match hook {
            Hook::PreExec => Some(&self.pre_exec),
            Hook::Exec => Some(&self.exec),
            Hook::PostExec => Some(&self.post_exec),
            Hook::Cleanup => None,
        }
    }
}

/// Step assembled from plain async functions.
///
/// Any hook may be left out: missing forward hooks succeed, a missing
/// cleanup does nothing. Each forward hook runs until it succeeds once;
/// after that, further calls on the same `FnStep` return `Ok(())` without
/// running it again, so a retry only repeats the hooks that failed.
///
/// Cloning shares the hook functions but not that bookkeeping.
///
/// # Examples
///
/// ```
/// use tejun::FnStep;
///
/// let step = FnStep::named("reserve-ip")
///     .on_exec(|ctx| async move {
///         ctx.state().store("ip", "10.0.0.7".to_string());
///         Ok(())
///     })
///     .on_cleanup(|ctx| async move {
///         ctx.state().remove("ip");
///     })
///     .with_retries(3);
/// ```
pub struct FnStep {
    name: StepName,
    pre_exec: Option<ForwardFn>,
    exec: Option<ForwardFn>,
    post_exec: Option<ForwardFn>,
    cleanup: Option<CleanupFn>,
    retries: u32,
    completed: Completed,
}

fn forward_fn<F, Fut>(f: F) -> ForwardFn
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Arc::new(move |ctx: Context| -> HookFuture<Result<(), BoxError>> { Box::pin(f(ctx)) })
}

impl FnStep {
    pub fn new() -> Self {
        Self::named("FnStep")
    }

    pub fn named(name: impl Into<StepName>) -> Self {
        Self {
            name: name.into(),
            pre_exec: None,
            exec: None,
            post_exec: None,
            cleanup: None,
            retries: 0,
            completed: Completed::default(),
        }
    }

    pub fn on_pre_exec<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.pre_exec = Some(forward_fn(f));
        self
    }

    pub fn on_exec<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.exec = Some(forward_fn(f));
        self
    }

    pub fn on_post_exec<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.post_exec = Some(forward_fn(f));
        self
    }

    pub fn on_cleanup<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cleanup = Some(Arc::new(move |ctx: Context| -> HookFuture<()> {
            Box::pin(f(ctx))
        }));
        self
    }

    /// Sets how many extra attempts the plan may make at this step.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Whether `hook` has already succeeded on this step. Always `false`
    /// for [`Hook::Cleanup`].
    pub fn completed(&self, hook: Hook) -> bool {
        self.completed
            .flag(hook)
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// Forgets which hooks have succeeded, so the next run calls them all.
    pub fn reset(&self) {
        for hook in Hook::FORWARD {
            if let Some(flag) = self.completed.flag(hook) {
                flag.store(false, Ordering::Release);
            }
        }
    }

    async fn run_once(
        &self,
        hook: Hook,
        f: Option<&ForwardFn>,
        ctx: &Context,
    ) -> Result<(), BoxError> {
        let Some(flag) = self.completed.flag(hook) else {
            return Ok(());
        };
        if flag.load(Ordering::Acquire) {
            return Ok(());
        }
        if let Some(f) = f {
            f(ctx.clone()).await?;
        }
        flag.store(true, Ordering::Release);
        Ok(())
    }
}

impl Default for FnStep {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for FnStep {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            pre_exec: self.pre_exec.clone(),
            exec: self.exec.clone(),
            post_exec: self.post_exec.clone(),
            cleanup: self.cleanup.clone(),
            retries: self.retries,
            completed: Completed::default(),
        }
    }
}

impl fmt::Debug for FnStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep")
            .field("name", &self.name)
            .field("retries", &self.retries)
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Step for FnStep {
    async fn pre_exec(&self, ctx: &Context) -> Result<(), BoxError> {
        self.run_once(Hook::PreExec, self.pre_exec.as_ref(), ctx).await
    }

    async fn exec(&self, ctx: &Context) -> Result<(), BoxError> {
        self.run_once(Hook::Exec, self.exec.as_ref(), ctx).await
    }

    async fn post_exec(&self, ctx: &Context) -> Result<(), BoxError> {
        self.run_once(Hook::PostExec, self.post_exec.as_ref(), ctx).await
    }

    async fn cleanup(&self, ctx: &Context) {
        if let Some(f) = &self.cleanup {
            f(ctx.clone()).await;
        }
    }

    fn retries(&self) -> u32 {
        self.retries
    }

    fn name(&self) -> StepName {
        self.name.clone()
    }
}
