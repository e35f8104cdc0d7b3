//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()` 매크로를 호출합니다.
//! recorder가 설치되지 않으면 모든 호출은 no-op 입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `stowage_`
//! - 모듈명: `inventory_`, `scanner_`, `persist_`
//! - 접미어: `_total` (counter)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 런타임 레이블 키 (docker, podman)
pub const LABEL_RUNTIME: &str = "runtime";

/// 심각도 레이블 키 (CRITICAL, HIGH, MEDIUM, LOW, UNKNOWN)
pub const LABEL_SEVERITY: &str = "severity";

/// 실패 종류 레이블 키 (tool_unavailable, export, invocation, parse, unexpected)
pub const LABEL_REASON: &str = "reason";

// ─── Inventory 메트릭 ──────────────────────────────────────────────

/// Inventory: 열거된 이미지 수 (counter, label: runtime)
pub const INVENTORY_IMAGES_TOTAL: &str = "stowage_inventory_images_total";

/// Inventory: 런타임 열거 실패 수 (counter, label: runtime)
pub const INVENTORY_FAILURES_TOTAL: &str = "stowage_inventory_failures_total";

// ─── Scanner 메트릭 ────────────────────────────────────────────────

/// Scanner: 완료된 스캔 수 (counter, label: runtime)
pub const SCANNER_SCANS_COMPLETED_TOTAL: &str = "stowage_scanner_scans_completed_total";

/// Scanner: 실패한 스캔 수 (counter, label: reason)
pub const SCANNER_SCANS_FAILED_TOTAL: &str = "stowage_scanner_scans_failed_total";

/// Scanner: 발견된 취약점 수 (counter, label: severity)
pub const SCANNER_FINDINGS_TOTAL: &str = "stowage_scanner_findings_total";

// ─── Persist 메트릭 ────────────────────────────────────────────────

/// Persist: 파일 기록 수 (counter)
pub const PERSIST_WRITES_TOTAL: &str = "stowage_persist_writes_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// recorder 설치 직후 한 번 호출합니다. recorder가 없어도 안전합니다.
pub fn describe_all() {
    use metrics::describe_counter;

    describe_counter!(
        INVENTORY_IMAGES_TOTAL,
        "Total container images enumerated per runtime"
    );
    describe_counter!(
        INVENTORY_FAILURES_TOTAL,
        "Total runtime enumerations that failed"
    );
    describe_counter!(
        SCANNER_SCANS_COMPLETED_TOTAL,
        "Total image scans that produced findings data"
    );
    describe_counter!(
        SCANNER_SCANS_FAILED_TOTAL,
        "Total image scans that ended with an error result"
    );
    describe_counter!(
        SCANNER_FINDINGS_TOTAL,
        "Total vulnerability findings reported by the scanner"
    );
    describe_counter!(PERSIST_WRITES_TOTAL, "Total record files written");
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        INVENTORY_IMAGES_TOTAL,
        INVENTORY_FAILURES_TOTAL,
        SCANNER_SCANS_COMPLETED_TOTAL,
        SCANNER_SCANS_FAILED_TOTAL,
        SCANNER_FINDINGS_TOTAL,
        PERSIST_WRITES_TOTAL,
    ];

    #[test]
    fn all_metrics_start_with_stowage_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("stowage_"),
                "Metric '{}' does not start with 'stowage_' prefix",
                name
            );
            assert!(name.ends_with("_total"), "Counter '{}' lacks _total", name);
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_RUNTIME, LABEL_SEVERITY, LABEL_REASON] {
            assert_eq!(label.to_lowercase(), label);
        }
    }
}
