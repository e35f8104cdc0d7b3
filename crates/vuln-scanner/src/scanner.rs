//! 스캔 오케스트레이터 -- 출처별 스캔 전략 선택과 실행
//!
//! ```text
//! docker: ScanRequest ─────────────────────────────► trivy image --format json <ref>
//! podman: ScanRequest ─► TempDir ─► podman save ─► trivy image --input <archive> --format json
//!                          │                                         │
//!                          └──────────── drop (항상 삭제) ◄───────────┘
//! ```
//!
//! 모든 실패는 [`ScanResult`]의 [`ScanOutcome::Failed`](crate::report::ScanOutcome)로
//! 반환되며, 이미지는 한 번에 하나씩 처리됩니다.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use stowage_core::config::{RuntimeConfig, ScannerConfig, StowageConfig};
use stowage_core::metrics as m;
use stowage_core::probe::ToolAvailability;
use stowage_core::process::CommandRunner;
use stowage_core::types::{ImageRecord, Provenance};

use crate::error::ScanError;
use crate::report::{ScanResult, ScanTarget, parse_report};

/// 임시 내보내기 디렉토리 접두어
const EXPORT_DIR_PREFIX: &str = "stowage-export-";

/// 스캔할 이미지와 그 출처
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub image: String,
    pub source: Provenance,
}

impl ScanRequest {
    pub fn new(image: impl Into<String>, source: Provenance) -> Self {
        Self {
            image: image.into(),
            source,
        }
    }

    /// 인벤토리 레코드에서 스캔 요청을 만듭니다.
    ///
    /// podman은 이름이 있으면 `repository:tag`, 없으면 ID로 내보내고,
    /// docker는 항상 ID로 스캔합니다.
    pub fn from_record(record: &ImageRecord) -> Self {
        let image = match record.source {
            Provenance::Podman if record.is_named() => record.reference(),
            _ => record.id.clone(),
        };
        Self::new(image, record.source)
    }
}

/// ID 또는 `repository:tag`로 인벤토리에서 이미지를 찾습니다.
pub fn find_image<'a>(records: &'a [ImageRecord], reference: &str) -> Option<&'a ImageRecord> {
    records.iter().find(|r| r.matches_reference(reference))
}

/// 취약점 스캐너 오케스트레이터
pub struct ImageScanner<R: CommandRunner> {
    runner: Arc<R>,
    runtime: RuntimeConfig,
    scanner: ScannerConfig,
    scanner_available: bool,
}

impl<R: CommandRunner> ImageScanner<R> {
    pub fn new(runner: Arc<R>, config: &StowageConfig, availability: &ToolAvailability) -> Self {
        if !availability.scanner {
            warn!(
                scanner = %config.scanner.scanner_bin,
                "vulnerability scanner not found, scans will report an error"
            );
        }
        Self {
            runner,
            runtime: config.runtime.clone(),
            scanner: config.scanner.clone(),
            scanner_available: availability.scanner,
        }
    }

    pub fn scanner_available(&self) -> bool {
        self.scanner_available
    }

    /// 이미지 하나를 스캔합니다. 이 함수는 실패하지 않습니다.
    pub async fn scan(&self, image: &str, source: Provenance) -> ScanResult {
        info!(image, %source, "scanning image");

        let result = match self.run_scan(image, source).await {
            Ok(targets) => ScanResult::completed(image, source, targets),
            Err(e) => ScanResult::failed(image, source, e),
        };
        record_metrics(&result);

        match result.error() {
            Some(e) => warn!(image, %source, error = %e, "scan failed"),
            None => info!(
                image,
                %source,
                targets = result.targets().len(),
                findings = result.finding_count(),
                "scan completed"
            ),
        }
        result
    }

    /// 요청 순서대로 하나씩 스캔합니다. 결과는 요청마다 하나씩 같은 순서로 반환됩니다.
    pub async fn scan_batch(&self, requests: &[ScanRequest]) -> Vec<ScanResult> {
        let mut results = Vec::with_capacity(requests.len());
        for (idx, request) in requests.iter().enumerate() {
            debug!(index = idx + 1, total = requests.len(), image = %request.image, "batch scan");
            results.push(self.scan(&request.image, request.source).await);
        }
        results
    }

    async fn run_scan(&self, image: &str, source: Provenance) -> Result<Vec<ScanTarget>, ScanError> {
        if !self.scanner_available {
            return Err(ScanError::ToolUnavailable(self.scanner.scanner_bin.clone()));
        }

        let stdout = match source {
            Provenance::Docker => {
                self.invoke_scanner(&["image", "--format", "json", image])
                    .await?
            }
            Provenance::Podman => self.export_and_scan(image).await?,
        };

        parse_report(&stdout)
    }

    /// podman 이미지를 임시 디렉토리에 내보낸 뒤 아카이브를 스캔합니다.
    ///
    /// 임시 디렉토리는 반환(성공, 실패, 취소) 시 drop 되며 삭제됩니다.
    async fn export_and_scan(&self, image: &str) -> Result<String, ScanError> {
        let workdir = tempfile::Builder::new()
            .prefix(EXPORT_DIR_PREFIX)
            .tempdir()
            .map_err(|e| ScanError::Unexpected(format!("failed to create export directory: {e}")))?;
        let archive = workdir.path().join(&self.scanner.archive_name);
        let archive = path_arg(&archive)?;

        debug!(image, archive, "exporting podman image");
        let output = self
            .runner
            .run(
                &self.runtime.podman_bin,
                &["save", "-o", archive, image],
                self.runtime.command_timeout(),
            )
            .await
            .map_err(|e| ScanError::Export(e.to_string()))?;
        if !output.success() {
            return Err(ScanError::Export(output.stderr_summary()));
        }

        self.invoke_scanner(&["image", "--input", archive, "--format", "json"])
            .await
    }

    /// 스캐너를 실행하고 stdout을 반환합니다.
    ///
    /// 취약점이 발견되면 스캐너가 0이 아닌 코드로 종료하므로, 출력이 없을 때만 실패입니다.
    async fn invoke_scanner(&self, args: &[&str]) -> Result<String, ScanError> {
        let output = self
            .runner
            .run(&self.scanner.scanner_bin, args, self.scanner.timeout())
            .await
            .map_err(|e| ScanError::Invocation(e.to_string()))?;

        if !output.success() && output.stdout_is_empty() {
            return Err(ScanError::Invocation(output.stderr_summary()));
        }
        if !output.success() {
            debug!(code = ?output.code, "scanner exited non-zero with output");
        }
        Ok(output.stdout)
    }
}

fn path_arg(path: &Path) -> Result<&str, ScanError> {
    path.to_str().ok_or_else(|| {
        ScanError::Unexpected(format!("export path is not valid UTF-8: {}", path.display()))
    })
}

fn record_metrics(result: &ScanResult) {
    match result.error() {
        Some(e) => {
            metrics::counter!(m::SCANNER_SCANS_FAILED_TOTAL, m::LABEL_REASON => e.kind())
                .increment(1);
        }
        None => {
            metrics::counter!(m::SCANNER_SCANS_COMPLETED_TOTAL, m::LABEL_RUNTIME => result.source.as_str())
                .increment(1);
            for finding in result.findings() {
                metrics::counter!(m::SCANNER_FINDINGS_TOTAL, m::LABEL_SEVERITY => finding.severity.as_str())
                    .increment(1);
            }
        }
    }
}
