use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// 시나리오 실행기 설정이다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Step 액션 하나에 허용되는 시간(밀리초). 없으면 제한하지 않는다.
    pub step_timeout_ms: Option<u64>,
    /// background 성공 시에도 공유 컨텍스트 시작 단위를 통과로 보고할지 여부.
    pub report_opener_on_success: bool,
    /// 빈 사유로 skip 된 Step에 사용할 기본 사유.
    pub default_skip_reason: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            step_timeout_ms: None,
            report_opener_on_success: false,
            default_skip_reason: default_skip_reason(),
        }
    }
}

impl RunnerConfig {
    /// Step 제한 시간을 `Duration`으로 반환한다.
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_ms.map(Duration::from_millis)
    }

    /// skip 사유가 비어 있으면 기본 사유로 바꾼다.
    pub fn skip_reason_or_default(&self, reason: &str) -> String {
        if reason.trim().is_empty() {
            self.default_skip_reason.clone()
        } else {
            reason.to_string()
        }
    }
}

fn default_skip_reason() -> String {
    "Skipped".to_string()
}

/// YAML 파일을 읽어 RunnerConfig로 역직렬화한다.
pub fn load_config_from_file(path: &Path) -> anyhow::Result<RunnerConfig> {
    let mut file = File::open(path)
        .with_context(|| format!("설정 파일 열기 실패: {}", path.display()))?;
    load_config_from_reader(&mut file)
}

/// Reader에서 YAML을 읽어 RunnerConfig로 파싱한다.
pub fn load_config_from_reader<R: Read>(reader: &mut R) -> anyhow::Result<RunnerConfig> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    if buf.trim().is_empty() {
        return Ok(RunnerConfig::default());
    }
    let config: RunnerConfig =
        serde_yaml::from_str(&buf).context("실행기 설정 YAML 파싱 실패")?;
    Ok(config)
}
