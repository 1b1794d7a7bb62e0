use crate::error::{StepError, panic_message};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// 시나리오 종료 시 닫아야 하는 리소스를 표현한다.
pub trait Disposable: Send {
    /// 리소스를 해제한다. 실패는 disposal 단위로 보고된다.
    fn dispose(self: Box<Self>) -> anyhow::Result<()>;
}

/// teardown 콜백 타입 별칭이다.
pub type TeardownFn = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

enum CleanupKind {
    Dispose(Box<dyn Disposable>),
    Teardown(TeardownFn),
}

/// 정리 스택의 한 항목. dispose 대상과 teardown 콜백을 같은 순서 공간에 둔다.
pub struct Cleanup {
    /// 항목을 등록한 Step 라벨.
    owner: String,
    kind: CleanupKind,
}

impl Cleanup {
    /// teardown 콜백 항목을 만든다.
    pub fn teardown<F>(owner: impl Into<String>, teardown: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            owner: owner.into(),
            kind: CleanupKind::Teardown(Box::new(teardown)),
        }
    }

    /// dispose 대상 항목을 만든다.
    pub fn disposable(owner: impl Into<String>, disposable: Box<dyn Disposable>) -> Self {
        Self {
            owner: owner.into(),
            kind: CleanupKind::Dispose(disposable),
        }
    }

    /// 항목을 등록한 Step 라벨.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// 항목을 한 번 실행한다. panic 도 오류로 변환한다.
    fn run(self) -> anyhow::Result<()> {
        let Cleanup { owner, kind } = self;
        let outcome = catch_unwind(AssertUnwindSafe(move || match kind {
            CleanupKind::Dispose(disposable) => disposable.dispose(),
            CleanupKind::Teardown(teardown) => teardown(),
        }));
        match outcome {
            Ok(result) => result,
            Err(payload) => Err(anyhow::anyhow!(
                "cleanup registered by '{owner}' panicked: {}",
                panic_message(payload.as_ref())
            )),
        }
    }
}

impl std::fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            CleanupKind::Dispose(_) => "dispose",
            CleanupKind::Teardown(_) => "teardown",
        };
        f.debug_struct("Cleanup")
            .field("owner", &self.owner)
            .field("kind", &kind)
            .finish()
    }
}

#[derive(Default)]
struct StackState {
    items: Vec<Cleanup>,
    /// `dispose_all` 이 시작되면 설정되며 이후 등록은 거부된다.
    closed: bool,
}

/// 시나리오 실행 전체가 공유하는 LIFO 정리 스택이다.
///
/// 모든 Step의 dispose/teardown 등록이 하나의 순서로 쌓이고,
/// `dispose_all`만이 이를 꺼내 역순으로 실행한다.
#[derive(Clone, Default)]
pub struct CleanupStack {
    inner: Arc<Mutex<StackState>>,
}

impl CleanupStack {
    /// 비어 있는 스택을 만든다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 항목을 스택 위에 올린다.
    ///
    /// 정리가 이미 시작된 뒤의 등록은 실행되지 않으므로 거부하고 `false`를 반환한다.
    pub fn push(&self, cleanup: Cleanup) -> bool {
        let mut state = self.lock();
        if state.closed {
            warn!(owner = %cleanup.owner, "cleanup registered after disposal started; ignored");
            return false;
        }
        debug!(owner = %cleanup.owner, "cleanup registered");
        state.items.push(cleanup);
        true
    }

    /// 여러 항목을 등록 순서대로 올린다.
    pub fn extend(&self, cleanups: impl IntoIterator<Item = Cleanup>) {
        for cleanup in cleanups {
            self.push(cleanup);
        }
    }

    /// 현재 쌓인 항목 수.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// 스택이 비었는지 여부.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// 정리가 시작되어 더 이상 등록을 받지 않는지 여부.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// 모든 항목을 등록 역순으로 정확히 한 번씩 실행한다.
    ///
    /// 실패가 있어도 나머지 항목은 계속 실행하며, 처음 만난 실패만 반환한다.
    /// 호출 이후 스택은 닫힌다.
    pub fn dispose_all(&self) -> Option<StepError> {
        let drained = {
            let mut state = self.lock();
            state.closed = true;
            std::mem::take(&mut state.items)
        };
        let mut first_failure = None;
        for cleanup in drained.into_iter().rev() {
            let owner = cleanup.owner.clone();
            if let Err(err) = cleanup.run() {
                warn!(owner = %owner, error = %format!("{err:#}"), "cleanup failed");
                if first_failure.is_none() {
                    first_failure = Some(StepError::Teardown(err));
                }
            }
        }
        first_failure
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StackState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CleanupStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupStack")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Disposable for Recorder {
        fn dispose(self: Box<Self>) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(self.name);
            Ok(())
        }
    }

    fn teardown_into(
        log: &Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
    ) -> impl FnOnce() -> anyhow::Result<()> + Send + 'static {
        let log = Arc::clone(log);
        move || {
            log.lock().unwrap().push(name);
            Ok(())
        }
    }

    #[test]
    fn disposables_and_teardowns_share_one_lifo_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stack = CleanupStack::new();
        stack.push(Cleanup::teardown("a", teardown_into(&log, "A")));
        stack.push(Cleanup::disposable(
            "b",
            Box::new(Recorder {
                name: "B",
                log: Arc::clone(&log),
            }),
        ));
        stack.push(Cleanup::teardown("c", teardown_into(&log, "C")));

        assert!(stack.dispose_all().is_none());
        assert_eq!(*log.lock().unwrap(), vec!["C", "B", "A"]);
    }

    #[test]
    fn dispose_all_runs_each_cleanup_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stack = CleanupStack::new();
        stack.push(Cleanup::teardown("a", teardown_into(&log, "A")));

        assert!(stack.dispose_all().is_none());
        assert!(stack.dispose_all().is_none());
        assert!(stack.is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["A"]);
    }

    #[test]
    fn failures_do_not_stop_remaining_cleanup_and_first_is_surfaced() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stack = CleanupStack::new();
        stack.push(Cleanup::teardown("a", teardown_into(&log, "A")));
        stack.push(Cleanup::teardown("b", || anyhow::bail!("second")));
        stack.push(Cleanup::teardown("c", || -> anyhow::Result<()> {
            panic!("first")
        }));

        let failure = stack.dispose_all().expect("a failure is reported");
        assert!(failure.to_string().contains("first"));
        assert_eq!(*log.lock().unwrap(), vec!["A"]);
    }

    #[test]
    fn registrations_after_disposal_are_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stack = CleanupStack::new();
        assert!(stack.push(Cleanup::teardown("a", teardown_into(&log, "A"))));
        assert!(stack.dispose_all().is_none());

        assert!(stack.is_closed());
        assert!(!stack.push(Cleanup::teardown("late", teardown_into(&log, "late"))));
        assert!(stack.is_empty());
        assert!(stack.dispose_all().is_none());
        assert_eq!(*log.lock().unwrap(), vec!["A"]);
    }
}
