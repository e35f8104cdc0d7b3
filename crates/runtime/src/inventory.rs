//! 이미지 인벤토리 -- 런타임별 이미지 열거
//!
//! [`ImageInventory`]는 가용성 확인 결과에 따라 선택된 런타임만 순서대로 호출하고,
//! 각 런타임의 출력을 [`normalize`](crate::normalize)로 정규화해 하나의 목록으로 합칩니다.
//!
//! ```text
//! RuntimeFilter ─► [docker?] ─► docker images ─► normalize_docker ─┐
//!                  [podman?] ─► podman images ─► normalize_podman ─┴─► Vec<ImageRecord>
//! ```
//!
//! 한 런타임의 실패는 그 런타임의 기여분만 비우며 다른 런타임에는 영향을 주지 않습니다.

use std::sync::Arc;

use tracing::{debug, info, warn};

use stowage_core::config::{RuntimeConfig, StowageConfig};
use stowage_core::metrics as m;
use stowage_core::probe::ToolAvailability;
use stowage_core::process::CommandRunner;
use stowage_core::types::{ImageRecord, Provenance, RuntimeFilter};

use crate::error::RuntimeError;
use crate::normalize::{normalize_docker, normalize_podman};

/// 런타임 이미지 인벤토리
pub struct ImageInventory<R: CommandRunner> {
    runner: Arc<R>,
    config: RuntimeConfig,
    availability: ToolAvailability,
}

impl<R: CommandRunner> ImageInventory<R> {
    /// 설정된 도구들의 가용성을 확인한 뒤 인벤토리를 생성합니다.
    pub async fn new(runner: Arc<R>, config: &StowageConfig) -> Self {
        let availability = ToolAvailability::probe(runner.as_ref(), config).await;
        debug!(?availability, "probed container tooling");
        Self::with_availability(runner, config.runtime.clone(), availability)
    }

    /// 이미 확인한 가용성으로 인벤토리를 생성합니다.
    pub fn with_availability(
        runner: Arc<R>,
        config: RuntimeConfig,
        availability: ToolAvailability,
    ) -> Self {
        Self {
            runner,
            config,
            availability,
        }
    }

    pub fn availability(&self) -> ToolAvailability {
        self.availability
    }

    /// 필터에 포함된 런타임의 이미지를 열거합니다.
    ///
    /// docker 레코드가 항상 podman 레코드보다 먼저 오며, 각 런타임 안에서는
    /// 원본 목록 순서를 유지합니다. 사용할 수 없거나 실패한 런타임은 빈 목록으로 처리되고
    /// 이 함수는 실패하지 않습니다.
    pub async fn list_images(&self, filter: RuntimeFilter) -> Vec<ImageRecord> {
        let mut images = Vec::new();

        for runtime in filter.runtimes() {
            if !self.availability.runtime(runtime) {
                debug!(%runtime, "runtime not available, skipping");
                continue;
            }

            match self.try_list(runtime).await {
                Ok(records) => {
                    metrics::counter!(m::INVENTORY_IMAGES_TOTAL, m::LABEL_RUNTIME => runtime.as_str())
                        .increment(records.len() as u64);
                    info!(%runtime, count = records.len(), "enumerated images");
                    images.extend(records);
                }
                Err(e) => {
                    metrics::counter!(
                        m::INVENTORY_FAILURES_TOTAL,
                        m::LABEL_RUNTIME => runtime.as_str(),
                        m::LABEL_REASON => e.kind()
                    )
                    .increment(1);
                    warn!(%runtime, error = %e, "image enumeration failed");
                }
            }
        }

        images
    }

    /// 한 런타임의 이미지를 열거하고 실패 이유를 그대로 반환합니다.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::ToolUnavailable`: 런타임을 사용할 수 없음
    /// - `RuntimeError::Command`: 목록 명령이 실패하거나 제한 시간을 넘김
    /// - `RuntimeError::Parse`: 출력 형식이 예상과 다름
    pub async fn try_list(&self, runtime: Provenance) -> Result<Vec<ImageRecord>, RuntimeError> {
        let bin = self.config.bin(runtime);
        if !self.availability.runtime(runtime) {
            return Err(RuntimeError::ToolUnavailable(bin.to_owned()));
        }

        let args: &[&str] = match runtime {
            Provenance::Docker => &["images", "--format", "{{json .}}"],
            Provenance::Podman => &["images", "--format", "json"],
        };

        let output = self
            .runner
            .run(bin, args, self.config.command_timeout())
            .await
            .map_err(|e| {
                if e.is_spawn_failure() {
                    RuntimeError::ToolUnavailable(bin.to_owned())
                } else {
                    RuntimeError::Command {
                        runtime,
                        reason: e.to_string(),
                    }
                }
            })?;

        if !output.success() {
            return Err(RuntimeError::Command {
                runtime,
                reason: output.stderr_summary(),
            });
        }

        match runtime {
            Provenance::Docker => normalize_docker(&output.stdout),
            Provenance::Podman => normalize_podman(&output.stdout),
        }
    }
}
