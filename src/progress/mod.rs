//! Deployment progress inference
//!
//! - [`steps`] - phase catalogue and trigger predicates
//! - [`interpreter`] - batch interpretation into ratcheted snapshots
//! - [`cache`] - session-wide snapshot table
//! - [`view`] - step list and progress fraction for display

pub mod cache;
pub mod interpreter;
pub mod steps;
pub mod view;

pub use cache::ProgressCache;
pub use interpreter::{LogInterpreter, ProgressSnapshot};
pub use steps::{InstallTarget, DEPLOYMENT_STEPS, FINAL_STEP};
pub use view::{ProgressView, StepStatus, StepView};
