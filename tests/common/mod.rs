//! 시나리오 엔진 통합 테스트 공용 도우미.

#![allow(dead_code)]

use scenario_steps::Disposable;
use std::sync::{Arc, Mutex};

/// Step과 정리 항목이 남긴 실행 기록이다.
#[derive(Clone, Default, Debug)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().expect("기록 잠금 실패").push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().expect("기록 잠금 실패").clone()
    }
}

/// 해제 시 자신의 이름을 기록하는 테스트용 리소스이다.
pub struct Resource {
    pub name: &'static str,
    pub log: Log,
}

impl Disposable for Resource {
    fn dispose(self: Box<Self>) -> anyhow::Result<()> {
        self.log.push(format!("dispose {}", self.name));
        Ok(())
    }
}

/// 테스트 바이너리마다 한 번 test writer 구독자를 설치한다.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
