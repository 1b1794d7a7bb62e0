use thiserror::Error;

/// 시나리오 실행 중 보고 단위에 기록되는 실패 원인이다.
///
/// 어떤 변형도 `run_scenario` 밖으로 전파되지 않고 `Outcome::Failed`로 변환된다.
#[derive(Debug, Error)]
pub enum StepError {
    /// Step 액션이 오류를 반환했다.
    #[error("{0:#}")]
    Action(anyhow::Error),
    /// Step 액션이 panic 했다.
    #[error("step panicked: {0}")]
    Panicked(String),
    /// 설정된 제한 시간을 초과했다.
    #[error("Test execution time exceeded: {limit_ms}ms")]
    Timeout {
        /// 적용된 제한 시간(밀리초).
        limit_ms: u64,
    },
    /// 호스트가 실행을 취소했다.
    #[error("step execution was cancelled")]
    Cancelled,
    /// 앞선 Step 실패로 실행되지 않았다.
    #[error("Failed to execute preceding step, {label}.")]
    Preceding {
        /// 최초로 실패한 Step의 정규화된 라벨.
        label: String,
    },
    /// 정리(teardown/dispose) 단계에서 오류가 발생했다.
    #[error("teardown failed: {0:#}")]
    Teardown(anyhow::Error),
    /// 시나리오 본문이 Step 등록 중 실패했다.
    #[error("scenario body failed: {0:#}")]
    Body(anyhow::Error),
}

impl StepError {
    /// 앞선 Step 실패가 전파된 결과인지 여부.
    pub fn is_propagated(&self) -> bool {
        matches!(self, StepError::Preceding { .. })
    }
}

/// panic payload에서 사람이 읽을 수 있는 메시지를 꺼낸다.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preceding_message_names_the_origin_step() {
        let err = StepError::Preceding {
            label: "Step z".into(),
        };
        assert_eq!(err.to_string(), "Failed to execute preceding step, Step z.");
        assert!(err.is_propagated());
    }

    #[test]
    fn timeout_message_matches_host_wording() {
        let err = StepError::Timeout { limit_ms: 1 };
        assert_eq!(err.to_string(), "Test execution time exceeded: 1ms");
    }

    #[test]
    fn panic_payloads_are_stringified() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(owned.as_ref()), "bang");
        let other: Box<dyn std::any::Any + Send> = Box::new(5_u32);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
