use crate::context::Context;
use crate::error::BoxError;
use crate::step::{Step, StepKind, StepName};
use async_trait::async_trait;
use std::time::Duration;

/// Step that only waits.
///
/// Appended with [`Plan::add_delay`](crate::Plan::add_delay). Its kind is
/// [`StepKind::Delay`], so the plan skips it during rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delay {
    duration: Duration,
}

impl Delay {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

#[async_trait]
impl Step for Delay {
    async fn exec(&self, _ctx: &Context) -> Result<(), BoxError> {
        tokio::time::sleep(self.duration).await;
        Ok(())
    }

    fn kind(&self) -> StepKind {
        StepKind::Delay
    }

    fn name(&self) -> StepName {
        StepName::new(format!("Delay({:?})", self.duration))
    }
}
