//! Enhancement planning and execution.

mod executor;
mod planner;

pub use executor::EnhancementExecutor;
pub use planner::{EnhancementPlanner, PlannerConfig};
