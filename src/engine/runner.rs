use super::events::EngineEvent;
use super::naming::{UnitKind, UnitPlan, normalize_label, plan_units};
use super::resources::CleanupStack;
use super::state::{RunPhase, ScenarioRuntime};
use super::steps::{StepRunResult, run_single_step};
use crate::config::RunnerConfig;
use crate::error::StepError;
use crate::report::{Outcome, ScenarioReport, SharedSink, UnitReport};
use crate::scenario::{Scenario, Step, discover};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// background 실행이 멈춘 이유.
enum Halt {
    /// background Step이 skip 되었다.
    Skipped(String),
    /// background Step이 실패했다.
    Failed { label: String, error: StepError },
}

/// Scenario를 실행해 보고 단위 결과를 만드는 실행 조정기이다.
///
/// 한 시나리오 안의 Step은 항상 순차 실행된다. 서로 다른 시나리오는
/// 각자 `Scenario`를 넘기는 한 같은 `Runner`로 동시에 실행해도 된다.
#[derive(Clone, Default)]
pub struct Runner {
    config: RunnerConfig,
    sender: Option<UnboundedSender<EngineEvent>>,
    sinks: Vec<SharedSink>,
    cancel: CancellationToken,
}

impl Runner {
    /// 설정으로 실행기를 만든다.
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// 진행 이벤트를 받을 채널을 지정한다.
    pub fn with_events(mut self, sender: UnboundedSender<EngineEvent>) -> Self {
        self.sender = Some(sender);
        self
    }

    /// 결과 수신자를 추가한다.
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sinks.push(sink);
        self
    }

    /// 실행 취소 토큰을 지정한다.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 현재 설정.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// 시나리오 본문을 실행해 Step을 수집한 뒤 실행한다.
    ///
    /// 본문이 실패하면 시나리오 이름으로 된 실패 단위 하나만 보고한다.
    pub async fn run_body<F>(&self, name: impl Into<String>, body: F) -> ScenarioReport
    where
        F: FnOnce(&mut Scenario) -> anyhow::Result<()>,
    {
        let name = name.into();
        match discover(name.clone(), body) {
            Ok(scenario) => self.run(scenario).await,
            Err(error) => {
                let mut report = ScenarioReport::new(&name);
                self.emit(EngineEvent::UnitStarted { unit: name.clone() });
                self.record(
                    &mut report,
                    name.clone(),
                    UnitKind::ScenarioBody,
                    Outcome::Failed(error),
                )
                .await;
                self.emit(EngineEvent::ScenarioFinished { scenario: name });
                report
            }
        }
    }

    /// Scenario 전체를 실행하고 보고 단위 결과를 반환한다.
    ///
    /// Step 액션과 정리 항목의 오류는 모두 결과로 변환되며 밖으로 전파되지 않는다.
    pub async fn run(&self, scenario: Scenario) -> ScenarioReport {
        let (name, mut steps) = scenario.into_parts();
        let plan = plan_units(&steps);
        let mut runtime = ScenarioRuntime::new(&name);
        let mut report = ScenarioReport::new(&name);
        let cleanups = CleanupStack::new();
        let limit = self.config.step_timeout();

        if plan.units.is_empty() {
            debug!(scenario = %name, "scenario registered no steps");
            self.emit(EngineEvent::ScenarioFinished { scenario: name });
            return report;
        }

        self.transition(&mut runtime, RunPhase::BackgroundRunning);
        let opener = plan.opener.name().to_string();
        self.emit(EngineEvent::UnitStarted {
            unit: opener.clone(),
        });

        let mut halt = None;
        for index in plan.background.clone() {
            let step = &mut steps[index];
            let label = normalize_label(step.label()).to_string();
            if let Some(reason) = step.skip_reason() {
                halt = Some(Halt::Skipped(self.config.skip_reason_or_default(reason)));
                break;
            }
            self.log(&opener, format!("running background step '{label}'"));
            if let StepRunResult::Failed(error) =
                run_single_step(step, &cleanups, limit, &self.cancel).await
            {
                halt = Some(Halt::Failed { label, error });
                break;
            }
        }

        match halt {
            Some(Halt::Skipped(reason)) => {
                info!(scenario = %name, reason = %reason, "background skipped");
                for unit in &plan.units {
                    self.record(
                        &mut report,
                        unit.name().to_string(),
                        unit.kind(),
                        Outcome::Skipped(reason.clone()),
                    )
                    .await;
                }
            }
            Some(Halt::Failed { label, error }) => {
                self.transition(&mut runtime, RunPhase::BackgroundFailed);
                self.record(
                    &mut report,
                    opener,
                    UnitKind::Opener,
                    Outcome::Failed(error),
                )
                .await;
                for unit in &plan.units {
                    let outcome = match unit {
                        UnitPlan::SkippedStep { reason, .. } => {
                            Outcome::Skipped(self.config.skip_reason_or_default(reason))
                        }
                        _ => Outcome::Failed(StepError::Preceding {
                            label: label.clone(),
                        }),
                    };
                    self.record(
                        &mut report,
                        unit.name().to_string(),
                        unit.kind(),
                        outcome,
                    )
                    .await;
                }
            }
            None => {
                self.transition(&mut runtime, RunPhase::BackgroundSucceeded);
                if self.config.report_opener_on_success {
                    self.record(
                        &mut report,
                        opener,
                        UnitKind::Opener,
                        Outcome::Passed,
                    )
                    .await;
                }
                self.run_then_steps(&mut steps, &plan.units, &cleanups, &mut runtime, &mut report)
                    .await;
            }
        }

        self.transition(&mut runtime, RunPhase::Disposing);
        let disposal = plan.disposal.name().to_string();
        if let Some(error) = cleanups.dispose_all() {
            self.record(
                &mut report,
                disposal,
                UnitKind::Disposal,
                Outcome::Failed(error),
            )
            .await;
        }
        self.transition(&mut runtime, RunPhase::Done);
        self.emit(EngineEvent::ScenarioFinished { scenario: name });
        report
    }

    /// then-step 을 선언 순서대로 처리한다. 첫 실패 이후 Step은 실행하지 않는다.
    async fn run_then_steps(
        &self,
        steps: &mut [Step],
        units: &[UnitPlan],
        cleanups: &CleanupStack,
        runtime: &mut ScenarioRuntime,
        report: &mut ScenarioReport,
    ) {
        let limit = self.config.step_timeout();
        let mut failed_origin: Option<String> = None;
        for (position, unit) in units.iter().enumerate() {
            self.transition(runtime, RunPhase::ThenRunning(position));
            let name = unit.name().to_string();
            let outcome = match unit {
                UnitPlan::SkippedStep { reason, .. } => {
                    Outcome::Skipped(self.config.skip_reason_or_default(reason))
                }
                UnitPlan::IsolatedStep { step, .. } => {
                    if let Some(label) = &failed_origin {
                        Outcome::Failed(StepError::Preceding {
                            label: label.clone(),
                        })
                    } else {
                        self.emit(EngineEvent::UnitStarted { unit: name.clone() });
                        let step = &mut steps[*step];
                        match run_single_step(step, cleanups, limit, &self.cancel).await {
                            StepRunResult::Success => Outcome::Passed,
                            StepRunResult::Failed(error) => {
                                failed_origin = Some(normalize_label(step.label()).to_string());
                                Outcome::Failed(error)
                            }
                        }
                    }
                }
                UnitPlan::Opener { .. } | UnitPlan::Disposal { .. } => continue,
            };
            self.record(report, name, unit.kind(), outcome).await;
        }
    }

    async fn record(
        &self,
        report: &mut ScenarioReport,
        name: String,
        kind: UnitKind,
        outcome: Outcome,
    ) {
        let status = outcome.status();
        debug!(scenario = %report.scenario, unit = %name, status = ?status, "unit finished");
        self.emit(EngineEvent::UnitFinished {
            unit: name.clone(),
            status,
        });
        let unit = UnitReport {
            name,
            kind,
            outcome,
        };
        for sink in &self.sinks {
            sink.record(&report.scenario, &unit).await;
        }
        report.units.push(unit);
    }

    fn transition(&self, runtime: &mut ScenarioRuntime, next: RunPhase) {
        if runtime.advance(next) {
            self.emit(EngineEvent::PhaseChanged {
                scenario: runtime.scenario.clone(),
                phase: next,
            });
        }
    }

    fn log(&self, unit: &str, line: String) {
        self.emit(EngineEvent::UnitLog {
            unit: unit.to_string(),
            line,
        });
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}

/// 기본 설정으로 Scenario를 실행한다.
pub async fn run_scenario(scenario: Scenario) -> ScenarioReport {
    Runner::default().run(scenario).await
}
