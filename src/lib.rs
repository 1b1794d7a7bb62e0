//! 시나리오 Step 실행 엔진.
//!
//! 시나리오 본문이 한 번 실행되며 given/when/then Step을 등록하면, 엔진은
//! background Step을 한 번 실행한 뒤 then-step 마다 독립된 보고 단위를 만든다.
//! 앞선 Step의 실패는 이후 단위에 "Failed to execute preceding step" 으로 전파되고,
//! 등록된 정리 항목은 마지막에 등록 역순으로 한 번씩 실행된다.
//!
//! ```no_run
//! use scenario_steps::{Runner, RunnerConfig};
//! use std::sync::{Arc, Mutex};
//!
//! # async fn demo() {
//! let report = Runner::new(RunnerConfig::default())
//!     .run_body("adding", |s| {
//!         let value = Arc::new(Mutex::new(0));
//!         let v = Arc::clone(&value);
//!         s.given("Given 1", move |_| {
//!             *v.lock().unwrap() = 1;
//!             Ok(())
//!         });
//!         let v = Arc::clone(&value);
//!         s.when("When I add 1", move |_| {
//!             *v.lock().unwrap() += 1;
//!             Ok(())
//!         });
//!         s.then("Then I have 2", move |_| {
//!             anyhow::ensure!(*value.lock().unwrap() == 2, "expected 2");
//!             Ok(())
//!         });
//!         Ok(())
//!     })
//!     .await;
//! assert!(report.is_success());
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod report;
pub mod scenario;

pub use config::{RunnerConfig, load_config_from_file, load_config_from_reader};
pub use engine::{
    Disposable, EngineEvent, RunPhase, Runner, StepContext, UnitKind, UnitStatus, run_scenario,
};
pub use error::StepError;
pub use report::{CollectingSink, Outcome, ReportSink, ScenarioReport, TracingSink, UnitReport};
pub use scenario::{Scenario, Step, StepAction, StepHandle, StepPhase, discover};
