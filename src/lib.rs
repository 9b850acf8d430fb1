//! # Tejun (手順)
//!
//! Run an ordered list of steps as one unit, and unwind what was done when
//! it goes wrong.
//!
//! "Tejun" (手順) means "procedure" or "the order of steps" in Japanese.
//!
//! ## Features
//!
//! - **Ordered steps**: each [`Step`] has `pre_exec`, `exec`, `post_exec` and
//!   `cleanup` hooks, run in the order the steps were added
//! - **Rollback**: once the plan stops, `cleanup` runs on every step it got
//!   through, last one first
//! - **Retries**: per-step retry budget, consumed in continue-on-error mode
//! - **Cancellation and timeouts**: driven by a [`CancellationToken`] and an
//!   optional plan-wide duration limit
//! - **Shared state**: a concurrent [`State`] store visible to every hook
//!
//! ## Quick Start
//!
//! ```rust
//! use tejun::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), PlanError> {
//! let mut plan = Plan::new([PlanOption::limit_duration(std::time::Duration::from_secs(5))])?;
//!
//! plan.add_step(
//!     FnStep::named("create-volume")
//!         .on_exec(|ctx| async move {
//!             ctx.state().store("volume", "vol-1".to_string());
//!             Ok(())
//!         })
//!         .on_cleanup(|ctx| async move {
//!             ctx.state().store("volume_released", true);
//!         }),
//! );
//!
//! plan.execute(&CancellationToken::new()).await?;
//!
//! let state = plan.state();
//! assert_eq!(state.get::<String>("volume"), Some("vol-1".to_string()));
//! assert_eq!(state.get::<bool>("volume_released"), Some(true));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use tejun::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut plan = Plan::default();
//! plan.add_step(FnStep::new().on_pre_exec(|_ctx| async { Err(BoxError::from("no quota")) }));
//!
//! match plan.execute(&CancellationToken::new()).await {
//!     Ok(()) => println!("done"),
//!     Err(PlanError::Cancelled) => eprintln!("cancelled"),
//!     Err(PlanError::Timeout) => eprintln!("timed out"),
//!     Err(err) => eprintln!("step failed: {}", err),
//! }
//! # }
//! ```

mod config;
mod context;
mod delay;
mod error;
mod fn_step;
mod plan;
mod scope;
mod state;
mod step;

pub mod prelude;

pub use config::{PlanConfig, PlanOption};
pub use context::Context;
pub use delay::Delay;
pub use error::{BoxError, PlanError};
pub use fn_step::{FnStep, HookFuture};
pub use plan::Plan;
pub use state::{State, Value};
pub use step::{Hook, Step, StepKind, StepName};

pub use tokio_util::sync::CancellationToken;
