mod context;
mod events;
mod naming;
mod resources;
mod runner;
mod state;
mod steps;

pub use context::StepContext;
pub use events::EngineEvent;
pub use naming::{
    ScenarioPlan, UnitKind, UnitPlan, disposal_name, isolated_step_name, join_labels,
    normalize_label, opener_name, partition, plan_units,
};
pub use resources::{Cleanup, CleanupStack, Disposable, TeardownFn};
pub use runner::{Runner, run_scenario};
pub use state::{RunPhase, ScenarioRuntime, UnitStatus};
