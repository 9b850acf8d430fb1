//! Commonly used types and traits

pub use crate::config::{PlanConfig, PlanOption};
pub use crate::context::Context;
pub use crate::error::{BoxError, PlanError};
pub use crate::fn_step::FnStep;
pub use crate::plan::Plan;
pub use crate::state::State;
pub use crate::step::{Step, StepName};
pub use tokio_util::sync::CancellationToken;
