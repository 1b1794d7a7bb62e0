use crate::engine::{Cleanup, Disposable, StepContext, TeardownFn};
use crate::error::{StepError, panic_message};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// 비동기 Step 액션이 반환하는 future 타입이다.
pub type StepFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Step이 실행할 지연 액션이다. 동기와 비동기 중 정확히 하나만 가진다.
pub enum StepAction {
    /// 동기 액션.
    Sync(Box<dyn FnOnce(&StepContext) -> anyhow::Result<()> + Send>),
    /// 비동기 액션.
    Async(Box<dyn FnOnce(StepContext) -> StepFuture + Send>),
}

impl StepAction {
    /// 동기 클로저로 액션을 만든다.
    pub fn sync<F>(action: F) -> Self
    where
        F: FnOnce(&StepContext) -> anyhow::Result<()> + Send + 'static,
    {
        StepAction::Sync(Box::new(action))
    }

    /// future를 반환하는 클로저로 액션을 만든다.
    pub fn from_async<F, Fut>(action: F) -> Self
    where
        F: FnOnce(StepContext) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        StepAction::Async(Box::new(move |ctx: StepContext| -> StepFuture {
            action(ctx).boxed()
        }))
    }
}

impl std::fmt::Debug for StepAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepAction::Sync(_) => f.write_str("StepAction::Sync"),
            StepAction::Async(_) => f.write_str("StepAction::Async"),
        }
    }
}

/// Step이 속한 단계. 첫 `Outcome` Step부터는 모두 then-step으로 취급된다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    /// given/when 계열 공유 컨텍스트 Step.
    Background,
    /// then 계열 결과 검증 Step.
    Outcome,
}

/// Step은 Scenario 내 최소 실행 단위를 표현한다.
#[derive(Debug)]
pub struct Step {
    /// 사용자 친화적인 Step 라벨. 생성 후 변경되지 않는다.
    label: String,
    /// 등록 시점의 단계.
    phase: StepPhase,
    /// 실행 전까지 보관되는 액션.
    action: Option<StepAction>,
    /// 설정되면 액션을 실행하지 않는다.
    skip_reason: Option<String>,
    /// 선언 시점에 등록된 정리 항목.
    cleanups: Vec<Cleanup>,
}

impl Step {
    /// 라벨과 액션으로 Step을 만든다.
    pub fn new(label: impl Into<String>, phase: StepPhase, action: StepAction) -> Self {
        Self {
            label: label.into(),
            phase,
            action: Some(action),
            skip_reason: None,
            cleanups: Vec::new(),
        }
    }

    /// 원본 라벨을 반환한다.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// 등록 시점의 단계를 반환한다.
    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    /// skip 사유를 반환한다.
    pub fn skip_reason(&self) -> Option<&str> {
        self.skip_reason.as_deref()
    }

    /// 선언 시점에 등록된 정리 항목 수.
    pub fn cleanup_count(&self) -> usize {
        self.cleanups.len()
    }

    /// Step을 skip 으로 표시한다. 이후 액션은 절대 실행되지 않는다.
    pub fn skip(&mut self, reason: impl Into<String>) {
        self.skip_reason = Some(reason.into());
    }

    /// dispose 대상을 추가한다. `None`이면 아무 것도 하지 않는다.
    pub fn add_disposable(&mut self, disposable: Option<Box<dyn Disposable>>) {
        if let Some(disposable) = disposable {
            self.cleanups
                .push(Cleanup::disposable(self.label.clone(), disposable));
        }
    }

    /// teardown 콜백을 추가한다. `None`이면 아무 것도 하지 않는다.
    pub fn add_teardown(&mut self, teardown: Option<TeardownFn>) {
        if let Some(teardown) = teardown {
            self.cleanups
                .push(Cleanup::teardown(self.label.clone(), teardown));
        }
    }

    /// 실행을 위해 액션을 꺼낸다. 두 번째 호출은 `None`을 반환한다.
    pub(crate) fn take_action(&mut self) -> Option<StepAction> {
        self.action.take()
    }

    /// 선언 시점 정리 항목을 꺼낸다.
    pub(crate) fn take_cleanups(&mut self) -> Vec<Cleanup> {
        std::mem::take(&mut self.cleanups)
    }
}

/// Step 등록 직후 반환되어 skip/teardown/using 을 이어서 지정하는 핸들이다.
#[derive(Debug)]
pub struct StepHandle<'a> {
    step: &'a mut Step,
}

impl<'a> StepHandle<'a> {
    /// Step을 skip 처리한다.
    pub fn skip(self, reason: impl Into<String>) -> Self {
        self.step.skip(reason);
        self
    }

    /// teardown 콜백을 등록한다.
    pub fn teardown<F>(self, teardown: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        let teardown: TeardownFn = Box::new(teardown);
        self.step.add_teardown(Some(teardown));
        self
    }

    /// dispose 대상을 등록한다.
    pub fn using<D>(self, disposable: D) -> Self
    where
        D: Disposable + 'static,
    {
        let disposable: Box<dyn Disposable> = Box::new(disposable);
        self.step.add_disposable(Some(disposable));
        self
    }

    /// 등록된 Step을 들여다본다.
    pub fn step(&self) -> &Step {
        self.step
    }
}

/// Scenario는 한 번의 시나리오 본문 실행 동안 등록된 Step 목록이다.
///
/// 전역 상태 없이 본문에 명시적으로 전달되며, 실행기에 한 번 소비된다.
#[derive(Debug)]
pub struct Scenario {
    /// 시나리오의 표시 이름.
    name: String,
    /// 선언 순서대로의 Step 목록.
    steps: Vec<Step>,
}

impl Scenario {
    /// 비어 있는 시나리오를 만든다.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// 시나리오 이름을 반환한다.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 선언 순서의 Step 목록을 반환한다.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// 전체 Step 수를 반환한다.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Step 수가 비었는지 여부를 확인한다.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// 미리 만든 Step을 끝에 추가한다.
    pub fn add_step(&mut self, step: Step) -> StepHandle<'_> {
        self.steps.push(step);
        let index = self.steps.len() - 1;
        StepHandle {
            step: &mut self.steps[index],
        }
    }

    /// 지정한 단계로 동기 Step을 추가한다.
    pub fn step<F>(&mut self, label: impl Into<String>, phase: StepPhase, action: F) -> StepHandle<'_>
    where
        F: FnOnce(&StepContext) -> anyhow::Result<()> + Send + 'static,
    {
        self.add_step(Step::new(label, phase, StepAction::sync(action)))
    }

    /// 지정한 단계로 비동기 Step을 추가한다.
    pub fn step_async<F, Fut>(
        &mut self,
        label: impl Into<String>,
        phase: StepPhase,
        action: F,
    ) -> StepHandle<'_>
    where
        F: FnOnce(StepContext) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_step(Step::new(label, phase, StepAction::from_async(action)))
    }

    /// given Step을 추가한다.
    pub fn given<F>(&mut self, label: impl Into<String>, action: F) -> StepHandle<'_>
    where
        F: FnOnce(&StepContext) -> anyhow::Result<()> + Send + 'static,
    {
        self.step(label, StepPhase::Background, action)
    }

    /// when Step을 추가한다.
    pub fn when<F>(&mut self, label: impl Into<String>, action: F) -> StepHandle<'_>
    where
        F: FnOnce(&StepContext) -> anyhow::Result<()> + Send + 'static,
    {
        self.step(label, StepPhase::Background, action)
    }

    /// then Step을 추가한다.
    pub fn then<F>(&mut self, label: impl Into<String>, action: F) -> StepHandle<'_>
    where
        F: FnOnce(&StepContext) -> anyhow::Result<()> + Send + 'static,
    {
        self.step(label, StepPhase::Outcome, action)
    }

    /// 직전 Step과 같은 단계로 Step을 추가한다.
    pub fn and<F>(&mut self, label: impl Into<String>, action: F) -> StepHandle<'_>
    where
        F: FnOnce(&StepContext) -> anyhow::Result<()> + Send + 'static,
    {
        let phase = self.last_phase();
        self.step(label, phase, action)
    }

    /// 비동기 given Step을 추가한다.
    pub fn given_async<F, Fut>(&mut self, label: impl Into<String>, action: F) -> StepHandle<'_>
    where
        F: FnOnce(StepContext) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.step_async(label, StepPhase::Background, action)
    }

    /// 비동기 when Step을 추가한다.
    pub fn when_async<F, Fut>(&mut self, label: impl Into<String>, action: F) -> StepHandle<'_>
    where
        F: FnOnce(StepContext) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.step_async(label, StepPhase::Background, action)
    }

    /// 비동기 then Step을 추가한다.
    pub fn then_async<F, Fut>(&mut self, label: impl Into<String>, action: F) -> StepHandle<'_>
    where
        F: FnOnce(StepContext) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.step_async(label, StepPhase::Outcome, action)
    }

    /// 직전 Step과 같은 단계로 비동기 Step을 추가한다.
    pub fn and_async<F, Fut>(&mut self, label: impl Into<String>, action: F) -> StepHandle<'_>
    where
        F: FnOnce(StepContext) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let phase = self.last_phase();
        self.step_async(label, phase, action)
    }

    fn last_phase(&self) -> StepPhase {
        self.steps
            .last()
            .map(Step::phase)
            .unwrap_or(StepPhase::Background)
    }

    pub(crate) fn into_parts(self) -> (String, Vec<Step>) {
        (self.name, self.steps)
    }
}

/// 시나리오 본문을 한 번 실행해 Step 목록을 수집한다.
///
/// 본문이 오류를 반환하거나 panic 하면 그때까지 등록된 Step은 버리고 `StepError::Body`를 반환한다.
pub fn discover<F>(name: impl Into<String>, body: F) -> Result<Scenario, StepError>
where
    F: FnOnce(&mut Scenario) -> anyhow::Result<()>,
{
    let mut scenario = Scenario::new(name);
    let outcome = catch_unwind(AssertUnwindSafe(|| body(&mut scenario)));
    match outcome {
        Ok(Ok(())) => Ok(scenario),
        Ok(Err(err)) => Err(StepError::Body(err)),
        Err(payload) => Err(StepError::Body(anyhow::anyhow!(
            "scenario body panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}
