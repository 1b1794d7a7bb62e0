use super::state::{RunPhase, UnitStatus};

/// 엔진에서 호스트로 전달되는 주요 이벤트 모델이다.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// 실행 단계 전이 알림.
    PhaseChanged { scenario: String, phase: RunPhase },
    /// 보고 단위 시작 알림.
    UnitStarted { unit: String },
    /// 단위별 로그 라인.
    UnitLog { unit: String, line: String },
    /// 보고 단위 종료 알림.
    UnitFinished { unit: String, status: UnitStatus },
    /// 전체 시나리오 종료.
    ScenarioFinished { scenario: String },
}
