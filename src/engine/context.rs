use super::resources::{Cleanup, CleanupStack, Disposable};

/// 실행 중인 Step 액션이 정리 항목을 등록할 때 사용하는 핸들이다.
///
/// 모든 등록은 시나리오 공용 정리 스택으로 들어가며 disposal 단계에서 역순으로 실행된다.
/// disposal 이 시작된 뒤의 등록은 실행되지 않고 `warn!` 로그만 남긴다.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// 현재 Step의 정규화된 라벨.
    label: String,
    /// 시나리오 공용 정리 스택.
    cleanups: CleanupStack,
}

impl StepContext {
    pub(crate) fn new(label: impl Into<String>, cleanups: CleanupStack) -> Self {
        Self {
            label: label.into(),
            cleanups,
        }
    }

    /// 현재 Step 라벨을 반환한다.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// 시나리오 종료 시 해제할 리소스를 등록한다.
    ///
    /// # 매개변수
    /// - `disposable`: 해제 대상 리소스.
    ///
    /// # 반환값
    /// 체이닝을 위해 자기 자신을 반환한다.
    pub fn using<D>(&self, disposable: D) -> &Self
    where
        D: Disposable + 'static,
    {
        self.cleanups
            .push(Cleanup::disposable(self.label.clone(), Box::new(disposable)));
        self
    }

    /// 시나리오 종료 시 실행할 teardown 콜백을 등록한다.
    pub fn teardown<F>(&self, teardown: F) -> &Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.cleanups
            .push(Cleanup::teardown(self.label.clone(), teardown));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn context_outliving_its_run_cannot_register_cleanups() {
        let stack = CleanupStack::new();
        let ctx = StepContext::new("Then late", stack.clone());
        let late = ctx.clone();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&log);
        ctx.teardown(move || {
            first.lock().unwrap().push("registered in time");
            Ok(())
        });
        assert!(stack.dispose_all().is_none());

        let second = Arc::clone(&log);
        late.teardown(move || {
            second.lock().unwrap().push("registered late");
            Ok(())
        });
        assert!(stack.is_empty());
        assert!(stack.dispose_all().is_none());
        assert_eq!(*log.lock().unwrap(), vec!["registered in time"]);
    }
}
