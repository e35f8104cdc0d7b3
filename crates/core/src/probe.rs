//! 외부 도구 가용성 확인
//!
//! `<tool> --version`을 실행해 보고, 프로세스가 실행되기만 하면 (종료 코드와 무관하게)
//! 사용 가능으로 판단합니다. 실행 자체가 불가능할 때만 `false`이며, 이 확인은 실패하지 않습니다.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::config::StowageConfig;
use crate::process::CommandRunner;
use crate::types::Provenance;

/// `--version` 확인 제한 시간
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// 주어진 도구를 실행할 수 있는지 확인합니다.
///
/// 제한 시간 초과는 도구가 실행된 것으로 보고 `true`를 반환합니다.
pub async fn is_available<R: CommandRunner>(runner: &R, tool: &str) -> bool {
    match runner.run(tool, &["--version"], PROBE_TIMEOUT).await {
        Ok(output) => {
            debug!(tool, code = ?output.code, "tool is available");
            true
        }
        Err(e) if e.is_spawn_failure() => {
            debug!(tool, error = %e, "tool is not available");
            false
        }
        Err(e) => {
            debug!(tool, error = %e, "tool launched but version check did not finish");
            true
        }
    }
}

/// 런타임 및 스캐너 가용성 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ToolAvailability {
    pub docker: bool,
    pub podman: bool,
    pub scanner: bool,
}

impl ToolAvailability {
    /// 설정된 세 바이너리를 순서대로 확인합니다.
    pub async fn probe<R: CommandRunner>(runner: &R, config: &StowageConfig) -> Self {
        let docker = is_available(runner, &config.runtime.docker_bin).await;
        let podman = is_available(runner, &config.runtime.podman_bin).await;
        let scanner = is_available(runner, &config.scanner.scanner_bin).await;
        Self {
            docker,
            podman,
            scanner,
        }
    }

    /// 해당 런타임의 가용성
    pub fn runtime(&self, provenance: Provenance) -> bool {
        match provenance {
            Provenance::Docker => self.docker,
            Provenance::Podman => self.podman,
        }
    }

    /// 런타임이 하나라도 사용 가능한지 여부
    pub fn any_runtime(&self) -> bool {
        self.docker || self.podman
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CommandOutput;
    use crate::process::testing::FakeRunner;

    #[tokio::test]
    async fn launchable_tool_is_available_even_on_nonzero_exit() {
        let runner = FakeRunner::new().respond(
            "docker",
            "--version",
            CommandOutput::failed(1, "daemon down"),
        );
        assert!(is_available(&runner, "docker").await);
    }

    #[tokio::test]
    async fn missing_tool_is_unavailable() {
        let runner = FakeRunner::new().without_tool("podman");
        assert!(!is_available(&runner, "podman").await);
    }

    #[tokio::test]
    async fn hanging_tool_counts_as_launched() {
        let runner = FakeRunner::new().time_out("trivy", "--version");
        assert!(is_available(&runner, "trivy").await);
    }

    #[tokio::test]
    async fn probe_checks_configured_binaries() {
        let mut config = StowageConfig::default();
        config.runtime.podman_bin = "podman-remote".to_owned();
        let runner = FakeRunner::new().without_tool("trivy");

        let availability = ToolAvailability::probe(&runner, &config).await;
        assert_eq!(
            availability,
            ToolAvailability {
                docker: true,
                podman: true,
                scanner: false,
            }
        );
        assert!(availability.any_runtime());
        assert!(availability.runtime(Provenance::Podman));
        assert_eq!(runner.calls_to("podman-remote", "--version").len(), 1);
    }
}
