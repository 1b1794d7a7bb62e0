use super::context::StepContext;
use super::naming::normalize_label;
use super::resources::CleanupStack;
use crate::error::{StepError, panic_message};
use crate::scenario::{Step, StepAction};
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// 액션 실행 결과. panic 은 이미 `StepError`로 변환되어 있다.
type GuardedAction = BoxFuture<'static, Result<anyhow::Result<()>, StepError>>;

/// Step 실행의 결과를 표현한다.
#[derive(Debug)]
pub(super) enum StepRunResult {
    /// 실행 성공.
    Success,
    /// 실행 실패. 제한 시간 초과와 취소도 여기에 포함된다.
    Failed(StepError),
}

/// 단일 Step을 실행하고 결과를 반환한다.
///
/// 선언 시점 정리 항목은 액션 실행 직전에 공용 스택으로 옮겨진다.
/// 동기 액션은 blocking 스레드에서 실행되므로 제한 시간과 취소가 실행 중에도 적용된다.
/// 제한 시간 초과나 취소 시 동기 액션 스레드는 끝날 때까지 분리된 채로 남는다.
pub(super) async fn run_single_step(
    step: &mut Step,
    cleanups: &CleanupStack,
    limit: Option<Duration>,
    cancel: &CancellationToken,
) -> StepRunResult {
    let label = normalize_label(step.label()).to_string();
    cleanups.extend(step.take_cleanups());
    let Some(action) = step.take_action() else {
        trace!(step = %label, "action already consumed");
        return StepRunResult::Success;
    };
    if cancel.is_cancelled() {
        return StepRunResult::Failed(StepError::Cancelled);
    }
    let ctx = StepContext::new(label.clone(), cleanups.clone());
    let guarded = guard_action(action, ctx);
    let bounded = async {
        match limit {
            Some(limit) => tokio::time::timeout(limit, guarded)
                .await
                .unwrap_or_else(|_| {
                    Err(StepError::Timeout {
                        limit_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    })
                }),
            None => guarded.await,
        }
    };
    debug!(step = %label, "step started");
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StepError::Cancelled),
        outcome = bounded => outcome,
    };
    match outcome {
        Ok(Ok(())) => StepRunResult::Success,
        Ok(Err(err)) => StepRunResult::Failed(StepError::Action(err)),
        Err(err) => {
            if matches!(err, StepError::Timeout { .. } | StepError::Cancelled) {
                warn!(step = %label, error = %err, "step interrupted");
            }
            StepRunResult::Failed(err)
        }
    }
}

/// 액션을 panic 이 잡힌 future 로 바꾼다.
fn guard_action(action: StepAction, ctx: StepContext) -> GuardedAction {
    match action {
        StepAction::Sync(action) => async move {
            tokio::task::spawn_blocking(move || action(&ctx))
                .await
                .map_err(join_failure)
        }
        .boxed(),
        StepAction::Async(action) => match catch_unwind(AssertUnwindSafe(move || action(ctx))) {
            Ok(fut) => AssertUnwindSafe(fut)
                .catch_unwind()
                .map(|outcome| outcome.map_err(panicked))
                .boxed(),
            Err(payload) => future::ready(Err(panicked(payload))).boxed(),
        },
    }
}

fn panicked(payload: Box<dyn Any + Send>) -> StepError {
    StepError::Panicked(panic_message(payload.as_ref()))
}

fn join_failure(err: JoinError) -> StepError {
    if err.is_panic() {
        panicked(err.into_panic())
    } else {
        StepError::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::StepPhase;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sync_step(action: impl FnOnce(&StepContext) -> anyhow::Result<()> + Send + 'static) -> Step {
        Step::new("Then sync", StepPhase::Outcome, StepAction::sync(action))
    }

    #[tokio::test]
    async fn slow_sync_action_hits_the_time_limit() {
        let mut step = sync_step(|_| {
            std::thread::sleep(Duration::from_millis(300));
            Ok(())
        });
        let result = run_single_step(
            &mut step,
            &CleanupStack::new(),
            Some(Duration::from_millis(20)),
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(
            result,
            StepRunResult::Failed(StepError::Timeout { limit_ms: 20 })
        ));
    }

    #[tokio::test]
    async fn sync_panic_becomes_a_panicked_failure() {
        let mut step = sync_step(|_| -> anyhow::Result<()> { panic!("동기 panic") });
        let result =
            run_single_step(&mut step, &CleanupStack::new(), None, &CancellationToken::new()).await;
        match result {
            StepRunResult::Failed(StepError::Panicked(message)) => {
                assert_eq!(message, "동기 panic")
            }
            other => panic!("panic 결과가 아님: {other:?}"),
        }
    }

    #[tokio::test]
    async fn async_closure_panicking_before_its_future_is_caught() {
        let mut step = Step::new(
            "Then eager",
            StepPhase::Outcome,
            StepAction::from_async(|_ctx: StepContext| -> futures::future::Ready<anyhow::Result<()>> {
                panic!("future 생성 전 panic")
            }),
        );
        let result =
            run_single_step(&mut step, &CleanupStack::new(), None, &CancellationToken::new()).await;
        assert!(matches!(result, StepRunResult::Failed(StepError::Panicked(_))));
    }

    #[tokio::test]
    async fn action_runs_at_most_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut step = sync_step(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let stack = CleanupStack::new();
        let cancel = CancellationToken::new();
        assert!(matches!(
            run_single_step(&mut step, &stack, None, &cancel).await,
            StepRunResult::Success
        ));
        assert!(matches!(
            run_single_step(&mut step, &stack, None, &cancel).await,
            StepRunResult::Success
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
