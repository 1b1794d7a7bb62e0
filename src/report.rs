//! 보고 단위 결과와 호스트 쪽 결과 수신자 계약.

use crate::engine::{UnitKind, UnitStatus};
use crate::error::StepError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

/// 보고 단위 하나의 최종 결과이다.
#[derive(Debug)]
pub enum Outcome {
    /// 통과.
    Passed,
    /// 실패. 원본 오류 또는 선행 Step 전파 오류를 담는다.
    Failed(StepError),
    /// skip 사유.
    Skipped(String),
}

impl Outcome {
    /// 통과 여부.
    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    /// 실패 여부.
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    /// skip 여부.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }

    /// 실패 메시지. 실패가 아니면 `None`.
    pub fn message(&self) -> Option<String> {
        match self {
            Outcome::Failed(err) => Some(err.to_string()),
            Outcome::Passed | Outcome::Skipped(_) => None,
        }
    }

    /// 이벤트로 보낼 수 있는 상태 값으로 변환한다.
    pub fn status(&self) -> UnitStatus {
        match self {
            Outcome::Passed => UnitStatus::Passed,
            Outcome::Failed(err) => UnitStatus::Failed(err.to_string()),
            Outcome::Skipped(reason) => UnitStatus::Skipped(reason.clone()),
        }
    }
}

/// 이름이 붙은 보고 단위 결과.
#[derive(Debug)]
pub struct UnitReport {
    /// 표시 이름.
    pub name: String,
    /// 단위 종류.
    pub kind: UnitKind,
    /// 결과.
    pub outcome: Outcome,
}

/// 한 시나리오 실행이 만든 보고 단위 목록(보고 순서).
#[derive(Debug, Default)]
pub struct ScenarioReport {
    /// 시나리오 이름.
    pub scenario: String,
    /// 보고된 단위 목록.
    pub units: Vec<UnitReport>,
}

impl ScenarioReport {
    /// 빈 보고서를 만든다.
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            units: Vec::new(),
        }
    }

    /// 이름으로 단위를 찾는다.
    pub fn unit(&self, name: &str) -> Option<&UnitReport> {
        self.units.iter().find(|unit| unit.name == name)
    }

    /// 통과한 단위 수.
    pub fn passed(&self) -> usize {
        self.units.iter().filter(|u| u.outcome.is_passed()).count()
    }

    /// 실패한 단위 수.
    pub fn failed(&self) -> usize {
        self.units.iter().filter(|u| u.outcome.is_failed()).count()
    }

    /// skip 된 단위 수.
    pub fn skipped(&self) -> usize {
        self.units.iter().filter(|u| u.outcome.is_skipped()).count()
    }

    /// 모든 단위가 실패 없이 끝났는지 여부.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// 보고 단위 결과를 호스트 어휘로 옮기는 수신자이다.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// 단위 결과 하나를 기록한다.
    async fn record(&self, scenario: &str, unit: &UnitReport);
}

/// 결과를 tracing 로그로 남기는 수신자이다.
#[derive(Debug, Default, Clone)]
pub struct TracingSink;

#[async_trait]
impl ReportSink for TracingSink {
    async fn record(&self, scenario: &str, unit: &UnitReport) {
        match &unit.outcome {
            Outcome::Passed => info!(scenario, unit = %unit.name, "passed"),
            Outcome::Failed(err) => warn!(scenario, unit = %unit.name, error = %err, "failed"),
            Outcome::Skipped(reason) => info!(scenario, unit = %unit.name, reason = %reason, "skipped"),
        }
    }
}

/// 결과를 `(이름, 상태)` 목록으로 모으는 수신자이다.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    records: Arc<Mutex<Vec<(String, UnitStatus)>>>,
}

impl CollectingSink {
    /// 빈 수신자를 만든다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 지금까지 모은 결과의 복사본.
    pub fn records(&self) -> Vec<(String, UnitStatus)> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ReportSink for CollectingSink {
    async fn record(&self, _scenario: &str, unit: &UnitReport) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((unit.name.clone(), unit.outcome.status()));
    }
}

/// 공유 가능한 수신자 타입 별칭이다.
pub type SharedSink = Arc<dyn ReportSink>;
