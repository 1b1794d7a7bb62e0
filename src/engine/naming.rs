//! Step 목록을 background/then-step 으로 나누고 보고 단위 이름을 만든다.
//!
//! 이 모듈의 함수는 모두 순수 함수다. 같은 Step 목록은 항상 같은 계획을 만든다.

use crate::scenario::{Step, StepPhase};
use std::ops::Range;

const SHARED_CONTEXT_SUFFIX: &str = " { (shared context)";
const DISPOSAL_SUFFIX: &str = " } (disposal)";
const SEPARATOR: &str = ", ";

/// 보고 단위의 종류이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// background 만 실행하는 공유 컨텍스트 시작 단위.
    Opener,
    /// background 위에서 then-step 하나를 실행하는 단위.
    IsolatedStep,
    /// 실행 없이 skip 으로 보고되는 then-step 단위.
    SkippedStep,
    /// 누적된 정리 항목을 실행하는 종료 단위.
    Disposal,
    /// Step 등록 중 실패한 시나리오 본문.
    ScenarioBody,
}

/// 이름과 실행 대상을 묶은 보고 단위 계획이다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitPlan {
    /// 공유 컨텍스트 시작 단위.
    Opener { name: String },
    /// 독립 보고되는 then-step.
    IsolatedStep { name: String, step: usize },
    /// 선언 시점에 skip 된 then-step.
    SkippedStep {
        name: String,
        step: usize,
        reason: String,
    },
    /// disposal 단위.
    Disposal { name: String },
}

impl UnitPlan {
    /// 표시 이름.
    pub fn name(&self) -> &str {
        match self {
            UnitPlan::Opener { name }
            | UnitPlan::IsolatedStep { name, .. }
            | UnitPlan::SkippedStep { name, .. }
            | UnitPlan::Disposal { name } => name,
        }
    }

    /// 단위 종류.
    pub fn kind(&self) -> UnitKind {
        match self {
            UnitPlan::Opener { .. } => UnitKind::Opener,
            UnitPlan::IsolatedStep { .. } => UnitKind::IsolatedStep,
            UnitPlan::SkippedStep { .. } => UnitKind::SkippedStep,
            UnitPlan::Disposal { .. } => UnitKind::Disposal,
        }
    }
}

/// 한 시나리오의 실행 계획이다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioPlan {
    /// background Step 인덱스 범위.
    pub background: Range<usize>,
    /// 공유 컨텍스트 시작 단위.
    pub opener: UnitPlan,
    /// then-step 단위 목록(선언 순서).
    pub units: Vec<UnitPlan>,
    /// disposal 단위.
    pub disposal: UnitPlan,
}

/// 라벨 앞뒤의 공백과 쉼표를 제거한다.
pub fn normalize_label(label: &str) -> &str {
    label.trim_matches(|c: char| c.is_whitespace() || c == ',')
}

/// 비어 있지 않은 정규화 라벨만 `", "`로 잇는다.
pub fn join_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> String {
    labels
        .into_iter()
        .map(normalize_label)
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// 공유 컨텍스트 시작 단위 이름.
pub fn opener_name(background: &str) -> String {
    format!("{background}{SHARED_CONTEXT_SUFFIX}")
}

/// then-step 단위 이름. background 가 비어도 구분자는 유지한다.
pub fn isolated_step_name(background: &str, then_label: &str) -> String {
    format!("{background}{SEPARATOR}{}", join_labels([then_label]))
}

/// disposal 단위 이름.
pub fn disposal_name(background: &str) -> String {
    format!("{background}{DISPOSAL_SUFFIX}")
}

/// Step 목록을 background 와 then-step 범위로 나눈다.
///
/// 첫 `Outcome` Step 앞은 background, 그 이후는 전부 then-step 이다.
/// `Outcome` Step이 하나도 없으면 모든 Step을 then-step 으로 보고 각각 보고한다.
pub fn partition(steps: &[Step]) -> (Range<usize>, Range<usize>) {
    let split = steps
        .iter()
        .position(|step| step.phase() == StepPhase::Outcome)
        .unwrap_or(0);
    (0..split, split..steps.len())
}

/// Step 목록에서 보고 단위 계획을 만든다.
pub fn plan_units(steps: &[Step]) -> ScenarioPlan {
    let (background, thens) = partition(steps);
    let joined = join_labels(steps[background.clone()].iter().map(Step::label));
    let units = thens
        .clone()
        .map(|index| {
            let step = &steps[index];
            let name = isolated_step_name(&joined, step.label());
            match step.skip_reason() {
                Some(reason) => UnitPlan::SkippedStep {
                    name,
                    step: index,
                    reason: reason.to_string(),
                },
                None => UnitPlan::IsolatedStep { name, step: index },
            }
        })
        .collect();
    ScenarioPlan {
        opener: UnitPlan::Opener {
            name: opener_name(&joined),
        },
        disposal: UnitPlan::Disposal {
            name: disposal_name(&joined),
        },
        background,
        units,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;

    fn scenario_with(labels: &[(&'static str, StepPhase)]) -> Scenario {
        let mut scenario = Scenario::new("naming");
        for (label, phase) in labels {
            scenario.step(*label, *phase, |_| Ok(()));
        }
        scenario
    }

    #[test]
    fn names_follow_templates() {
        let scenario = scenario_with(&[
            ("Given 1", StepPhase::Background),
            ("When I add 1", StepPhase::Background),
            ("Then I have 2", StepPhase::Outcome),
        ]);
        let plan = plan_units(scenario.steps());

        assert_eq!(plan.opener.name(), "Given 1, When I add 1 { (shared context)");
        assert_eq!(plan.disposal.name(), "Given 1, When I add 1 } (disposal)");
        assert_eq!(plan.units.len(), 1);
        assert_eq!(plan.units[0].name(), "Given 1, When I add 1, Then I have 2");
        assert_eq!(plan.units[0].kind(), UnitKind::IsolatedStep);
    }

    #[test]
    fn labels_are_trimmed_and_empty_labels_dropped() {
        assert_eq!(join_labels([" Given 1 ,", "", "  ", ",When,"]), "Given 1, When");
        assert_eq!(join_labels(["", " , "]), "");
    }

    #[test]
    fn backgroundless_names_keep_leading_separator() {
        let scenario = scenario_with(&[("Then z", StepPhase::Outcome)]);
        let plan = plan_units(scenario.steps());
        assert_eq!(plan.units[0].name(), ", Then z");
        assert_eq!(plan.opener.name(), " { (shared context)");
    }

    #[test]
    fn steps_after_first_outcome_are_all_then_steps() {
        let scenario = scenario_with(&[
            ("Given", StepPhase::Background),
            ("Then a", StepPhase::Outcome),
            ("Given late", StepPhase::Background),
        ]);
        let (background, thens) = partition(scenario.steps());
        assert_eq!(background, 0..1);
        assert_eq!(thens, 1..3);
    }

    #[test]
    fn scenarios_without_outcomes_report_every_step() {
        let scenario = scenario_with(&[
            ("Step 1", StepPhase::Background),
            ("Step 2", StepPhase::Background),
        ]);
        let plan = plan_units(scenario.steps());
        let names: Vec<_> = plan.units.iter().map(UnitPlan::name).collect();
        assert_eq!(names, vec![", Step 1", ", Step 2"]);
    }

    #[test]
    fn skipped_then_steps_are_planned_as_skipped_units() {
        let mut scenario = Scenario::new("skips");
        scenario.given("Given", |_| Ok(()));
        scenario.then("Then later", |_| Ok(())).skip("not yet");
        let plan = plan_units(scenario.steps());
        assert_eq!(
            plan.units[0],
            UnitPlan::SkippedStep {
                name: "Given, Then later".into(),
                step: 1,
                reason: "not yet".into(),
            }
        );
    }
}
