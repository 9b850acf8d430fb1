use crate::config::{PlanConfig, PlanOption};
use crate::context::Context;
use crate::delay::Delay;
use crate::error::{BoxError, PlanError};
use crate::scope::Scope;
use crate::state::State;
use crate::step::{Hook, Step, StepKind};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// An ordered list of steps run as one unit.
///
/// Steps run in the order they were added. When the plan stops moving
/// forward, because a hook failed or because every step ran, it calls
/// `cleanup` on the steps it got through, last one first, skipping delays.
/// All steps share one [`State`], which stays readable after the run.
///
/// # Examples
///
/// ```
/// use tejun::{CancellationToken, FnStep, Plan};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), tejun::PlanError> {
/// let mut plan = Plan::default();
/// plan.add_step(FnStep::named("create").on_exec(|ctx| async move {
///         ctx.state().store("id", 7u32);
///         Ok(())
///     }))
///     .add_delay(Duration::from_millis(10));
///
/// plan.execute(&CancellationToken::new()).await?;
/// assert_eq!(plan.state().get::<u32>("id"), Some(7));
/// # Ok(())
/// # }
/// ```
pub struct Plan {
    steps: Vec<Arc<dyn Step>>,
    config: PlanConfig,
    state: Arc<State>,
}

impl fmt::Debug for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field(
                "steps",
                &self.steps.iter().map(|step| step.name()).collect::<Vec<_>>(),
            )
            .field("config", &self.config)
            .field("state", &self.state)
            .finish()
    }
}

impl Default for Plan {
    fn default() -> Self {
        Self::with_config(PlanConfig::default())
    }
}

impl Plan {
    /// Creates a plan with `options` applied over the default config.
    ///
    /// # Errors
    ///
    /// [`PlanError::Configuration`] with the option's own error as source if
    /// any option fails.
    pub fn new(options: impl IntoIterator<Item = PlanOption>) -> Result<Self, PlanError> {
        let mut config = PlanConfig::default();
        for option in options {
            option.apply(&mut config).map_err(PlanError::Configuration)?;
        }
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: PlanConfig) -> Self {
        Self {
            steps: Vec::new(),
            config,
            state: Arc::new(State::new()),
        }
    }

    pub fn add_step<S: Step + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Adds a step that only waits for `duration`, after the last step
    /// added. Delays are skipped during rollback.
    pub fn add_delay(&mut self, duration: Duration) -> &mut Self {
        self.add_step(Delay::new(duration))
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    /// Shared state of the plan's steps.
    pub fn state(&self) -> Arc<State> {
        Arc::clone(&self.state)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step, then rolls back.
    ///
    /// The run happens on a spawned task governed by a child of `token`,
    /// bounded by the plan's `max_duration` if set. This call returns when
    /// that task reports, or as soon as the child token is cancelled. In
    /// the latter case the task may still be finishing a hook.
    ///
    /// Cancellation seen between two attempts ends the run without any
    /// rollback. Cancellation seen during rollback stops the rollback.
    ///
    /// # Errors
    ///
    /// - [`PlanError::Cancelled`] if `token` was cancelled first
    /// - [`PlanError::Timeout`] if `max_duration` elapsed first
    /// - [`PlanError::Step`] with the last hook's error otherwise
    pub async fn execute(&self, token: &CancellationToken) -> Result<(), PlanError> {
        let scope = Scope::derive(token, self.config.deadline());
        // cancels the run and its deadline timer however this call ends,
        // including when the caller drops it
        let _release = scope.token().clone().drop_guard();
        let run = Run {
            steps: self.steps.clone(),
            continue_on_error: self.config.continue_on_error,
            context: Context::new(scope.token().clone(), Arc::clone(&self.state)),
            scope: scope.clone(),
        };

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = tx.send(run.run().await);
        });

        tokio::select! {
            biased;
            received = rx => received.unwrap_or(Err(PlanError::Aborted)),
            _ = scope.cancelled() => {
                match scope.check() {
                    Err(err) => {
                        warn!("Plan stopped waiting: {}", err);
                        Err(err)
                    }
                    Ok(()) => Ok(()),
                }
            }
        }
    }
}

/// Everything the background task needs, detached from the `Plan`.
struct Run {
    steps: Vec<Arc<dyn Step>>,
    continue_on_error: bool,
    context: Context,
    scope: Scope,
}

impl Run {
    async fn run(self) -> Result<(), PlanError> {
        let mut outcome: Result<(), BoxError> = Ok(());
        let mut rollback_from = None;

        'forward: for (index, step) in self.steps.iter().enumerate() {
            let retries = step.retries();

            for attempt in 0..=retries {
                if let Err(err) = self.scope.check() {
                    warn!("Step '{}' not attempted: {}", step.name(), err);
                    return Err(err);
                }

                let ctx = self.context.with_attempt(attempt);
                let mut clean = true;

                for hook in Hook::FORWARD {
                    outcome = invoke(step.as_ref(), hook, &ctx).await;
                    if let Err(err) = &outcome {
                        clean = false;
                        warn!(
                            "Hook '{}' failed in step '{}' (attempt {}/{}): {}",
                            hook,
                            step.name(),
                            attempt + 1,
                            retries.saturating_add(1),
                            err
                        );
                        if !self.continue_on_error {
                            break 'forward;
                        }
                        if attempt < retries {
                            break;
                        }
                    }
                }

                if clean {
                    info!("Step '{}' completed successfully", step.name());
                    break;
                }
            }

            rollback_from = Some(index);
        }

        if let Some(last) = rollback_from {
            let ctx = self.context.with_attempt(0);
            for step in self.steps[..=last].iter().rev() {
                if step.kind() == StepKind::Delay {
                    debug!("Skipping '{}' during rollback", step.name());
                    continue;
                }
                if let Err(err) = self.scope.check() {
                    warn!("Rollback interrupted at step '{}': {}", step.name(), err);
                    return Err(err);
                }
                debug!("Rolling back step '{}'", step.name());
                // cleanup failures stay inside the step
                let _ = invoke(step.as_ref(), Hook::Cleanup, &ctx).await;
            }
        }

        match outcome {
            Ok(()) => {
                info!("Plan completed in {:?}", self.context.elapsed());
                Ok(())
            }
            Err(err) => {
                warn!("Plan failed after {:?}: {}", self.context.elapsed(), err);
                Err(PlanError::Step(err))
            }
        }
    }
}

async fn invoke(step: &dyn Step, hook: Hook, ctx: &Context) -> Result<(), BoxError> {
    match hook {
        Hook::PreExec => step.pre_exec(ctx).await,
        Hook::Exec => step.exec(ctx).await,
        Hook::PostExec => step.post_exec(ctx).await,
        Hook::Cleanup => {
            step.cleanup(ctx).await;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fn_step::FnStep;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn append(state: &State, suffix: &'static str) {
        state.update::<String, _>("test", |cur| {
            format!("{}{}", cur.map(String::as_str).unwrap_or(""), suffix)
        });
    }

    fn test_step(
        pre: &'static str,
        exec: &'static str,
        post: &'static str,
        cleanup: &'static str,
    ) -> FnStep {
        FnStep::new()
            .on_pre_exec(move |ctx| async move {
                append(ctx.state(), pre);
                Ok(())
            })
            .on_exec(move |ctx| async move {
                append(ctx.state(), exec);
                Ok(())
            })
            .on_post_exec(move |ctx| async move {
                append(ctx.state(), post);
                Ok(())
            })
            .on_cleanup(move |ctx| async move { append(ctx.state(), cleanup) })
    }

    #[test]
    fn test_new_plan() {
        let failing = PlanOption::from_fn(|_| Err("blah".into()));
        let result = Plan::new([failing]);
        assert!(matches!(result, Err(PlanError::Configuration(_))));

        let plan = Plan::new([PlanOption::continue_on_error()]).unwrap();
        assert!(plan.config().continue_on_error);
        assert_eq!(plan.config().max_duration, None);
        assert!(plan.is_empty());
        assert!(plan.state().is_empty());
    }

    #[test]
    fn test_add_step() {
        let mut plan = Plan::default();
        plan.add_step(FnStep::named("first"))
            .add_delay(Duration::from_millis(5));

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps[0].name().as_str(), "first");
        assert_eq!(plan.steps[1].kind(), StepKind::Delay);
    }

    #[test]
    fn test_state_is_shared() {
        let plan = Plan::default();
        assert!(Arc::ptr_eq(&plan.state(), &plan.state));
    }

    #[tokio::test]
    async fn test_empty_plan_succeeds() {
        let plan = Plan::default();
        assert!(plan.execute(&CancellationToken::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_execute_no_error() {
        let mut plan = Plan::default();
        let result = plan
            .add_step(test_step("b", "o", "b", "o"))
            .add_step(test_step("k", "e", "l", "s"))
            .execute(&CancellationToken::new())
            .await;

        assert!(result.is_ok());
        assert_eq!(plan.state().get::<String>("test"), Some("bobkelso".to_string()));
    }

    struct CountingDelay {
        cleanups: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Step for CountingDelay {
        async fn exec(&self, _ctx: &Context) -> Result<(), BoxError> {
            Ok(())
        }

        async fn cleanup(&self, _ctx: &Context) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
        }

        fn kind(&self) -> StepKind {
            StepKind::Delay
        }
    }

    struct CountingStep {
        execs: Arc<AtomicUsize>,
        retries: u32,
    }

    #[async_trait]
    impl Step for CountingStep {
        async fn exec(&self, _ctx: &Context) -> Result<(), BoxError> {
            self.execs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn retries(&self) -> u32 {
            self.retries
        }
    }

    #[tokio::test]
    async fn test_clean_attempt_ends_retry_loop() {
        let execs = Arc::new(AtomicUsize::new(0));
        let mut plan = Plan::new([PlanOption::continue_on_error()]).unwrap();
        plan.add_step(CountingStep {
            execs: Arc::clone(&execs),
            retries: 2,
        });

        assert!(plan.execute(&CancellationToken::new()).await.is_ok());
        assert_eq!(execs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delay_kind_skipped_in_rollback() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut plan = Plan::default();
        plan.add_step(test_step("a", "", "", "A"))
            .add_step(CountingDelay {
                cleanups: Arc::clone(&cleanups),
            })
            .add_step(test_step("b", "", "", "B"))
            .add_step(FnStep::new().on_pre_exec(|_ctx| async { Err(BoxError::from("blah")) }));

        let result = plan.execute(&CancellationToken::new()).await;

        assert_eq!(result.map_err(|e| e.to_string()), Err("blah".to_string()));
        assert_eq!(plan.state().get::<String>("test"), Some("abBA".to_string()));
        assert_eq!(cleanups.load(Ordering::SeqCst), 0);
    }
}
