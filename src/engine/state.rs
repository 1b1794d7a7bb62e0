use tracing::debug;

/// 실행 조정기의 상태이다.
///
/// `NotStarted -> BackgroundRunning -> BackgroundFailed | BackgroundSucceeded
/// -> ThenRunning(i) -> ... -> Disposing -> Done`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// 아직 시작 전.
    NotStarted,
    /// background 실행 중.
    BackgroundRunning,
    /// background 실패.
    BackgroundFailed,
    /// background 성공.
    BackgroundSucceeded,
    /// i 번째 then-step 처리 중.
    ThenRunning(usize),
    /// 정리 항목 실행 중.
    Disposing,
    /// 종료.
    Done,
}

impl RunPhase {
    /// 허용된 전이인지 확인한다.
    pub fn can_advance_to(self, next: RunPhase) -> bool {
        use RunPhase::*;
        match (self, next) {
            (NotStarted, BackgroundRunning) => true,
            (BackgroundRunning, BackgroundFailed | BackgroundSucceeded | Disposing) => true,
            (BackgroundFailed, Disposing) => true,
            (BackgroundSucceeded, ThenRunning(0) | Disposing) => true,
            (ThenRunning(i), ThenRunning(j)) => j == i + 1,
            (ThenRunning(_), Disposing) => true,
            (Disposing, Done) => true,
            _ => false,
        }
    }
}

/// 보고 단위의 최종 상태이다. 이벤트와 결과 수신자에 전달된다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    /// 정상 종료.
    Passed,
    /// 실패와 함께 오류 메시지를 포함한다.
    Failed(String),
    /// skip 사유를 포함한다.
    Skipped(String),
}

/// Scenario 실행 중 단계 전이를 관리한다.
#[derive(Debug, Clone)]
pub struct ScenarioRuntime {
    /// 시나리오 이름.
    pub scenario: String,
    /// 현재 단계.
    phase: RunPhase,
}

impl ScenarioRuntime {
    /// 시나리오 이름으로 초기 상태를 만든다.
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            phase: RunPhase::NotStarted,
        }
    }

    /// 현재 단계.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// 다음 단계로 전이한다. 허용되지 않는 전이면 `false`를 반환하고 상태를 유지한다.
    pub fn advance(&mut self, next: RunPhase) -> bool {
        if !self.phase.can_advance_to(next) {
            debug!(scenario = %self.scenario, from = ?self.phase, to = ?next, "rejected phase transition");
            return false;
        }
        debug!(scenario = %self.scenario, from = ?self.phase, to = ?next, "phase transition");
        self.phase = next;
        true
    }
}
