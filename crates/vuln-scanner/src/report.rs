//! 스캔 결과 타입 및 스캐너 출력 파싱
//!
//! 스캐너(trivy 호환) JSON 출력은 대상(Target)별 취약점 목록으로 구성됩니다.
//! 알려진 필드는 명시적 구조체 필드로, 알 수 없는 필드는 `extra`에 보존되어
//! 결과를 다시 직렬화해도 원본 정보가 유지됩니다.
//!
//! # 영속화 형태
//!
//! ```json
//! {
//!   "scan_id": "…",
//!   "image": "app:1.0",
//!   "source": "podman",
//!   "scan_time": "2024-05-01T12:00:00Z",
//!   "error": null,
//!   "results": [ { "Target": "…", "Vulnerabilities": [ … ] } ]
//! }
//! ```
//!
//! 실패한 스캔도 `error`와 `results`(빈 배열) 키를 모두 가집니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use stowage_core::types::{Provenance, Severity};

use crate::error::ScanError;

/// 하나의 취약점 발견
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "VulnerabilityID", default)]
    pub vulnerability_id: String,
    #[serde(rename = "PkgName", default)]
    pub pkg_name: String,
    #[serde(rename = "InstalledVersion", default)]
    pub installed_version: String,
    /// 수정 버전 (없으면 미수정)
    #[serde(
        rename = "FixedVersion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub fixed_version: Option<String>,
    /// 없거나 알 수 없는 값은 `UNKNOWN`
    #[serde(rename = "Severity", default)]
    pub severity: Severity,
    #[serde(rename = "Title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// 그 외 스캐너 필드 (Description, References, CVSS, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Finding {
    /// 수정 버전이 있는지 여부 (빈 문자열은 미수정)
    pub fn is_fixable(&self) -> bool {
        self.fixed_version
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty())
    }
}

/// 스캔 대상 하나 (OS 패키지 DB, 언어 매니페스트 등)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanTarget {
    #[serde(rename = "Target", default)]
    pub target: String,
    #[serde(
        rename = "Vulnerabilities",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub vulnerabilities: Vec<Finding>,
    /// 그 외 스캐너 필드 (Class, Type, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 스캔 결과 본문: 대상 목록 또는 실패 원인 중 하나
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Completed(Vec<ScanTarget>),
    Failed(ScanError),
}

/// 이미지 하나에 대한 스캔 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ScanResultRecord", from = "ScanResultRecord")]
pub struct ScanResult {
    /// 결과 식별자
    pub scan_id: Uuid,
    /// 스캔한 이미지 참조
    pub image: String,
    /// 이미지 출처 런타임
    pub source: Provenance,
    /// 결과 기록 시각
    pub scan_time: DateTime<Utc>,
    pub outcome: ScanOutcome,
}

impl ScanResult {
    /// 현재 시각으로 성공 결과를 생성합니다.
    pub fn completed(image: impl Into<String>, source: Provenance, targets: Vec<ScanTarget>) -> Self {
        Self::new(image, source, ScanOutcome::Completed(targets))
    }

    /// 현재 시각으로 실패 결과를 생성합니다.
    pub fn failed(image: impl Into<String>, source: Provenance, error: ScanError) -> Self {
        Self::new(image, source, ScanOutcome::Failed(error))
    }

    fn new(image: impl Into<String>, source: Provenance, outcome: ScanOutcome) -> Self {
        Self {
            scan_id: Uuid::new_v4(),
            image: image.into(),
            source,
            scan_time: Utc::now(),
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ScanOutcome::Completed(_))
    }

    pub fn error(&self) -> Option<&ScanError> {
        match &self.outcome {
            ScanOutcome::Failed(e) => Some(e),
            ScanOutcome::Completed(_) => None,
        }
    }

    /// 스캔 대상 목록 (실패한 경우 빈 슬라이스)
    pub fn targets(&self) -> &[ScanTarget] {
        match &self.outcome {
            ScanOutcome::Completed(targets) => targets,
            ScanOutcome::Failed(_) => &[],
        }
    }

    /// 모든 대상의 취약점 수 합계
    pub fn finding_count(&self) -> usize {
        self.targets().iter().map(|t| t.vulnerabilities.len()).sum()
    }

    /// 모든 대상의 취약점을 순서대로 순회합니다.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.targets().iter().flat_map(|t| t.vulnerabilities.iter())
    }
}

/// 직렬화 형태: `error`/`results` 키가 항상 존재
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScanResultRecord {
    scan_id: Uuid,
    image: String,
    source: Provenance,
    scan_time: DateTime<Utc>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    results: Vec<ScanTarget>,
}

impl From<ScanResult> for ScanResultRecord {
    fn from(result: ScanResult) -> Self {
        let (error, results) = match result.outcome {
            ScanOutcome::Completed(targets) => (None, targets),
            ScanOutcome::Failed(e) => (Some(e.to_string()), Vec::new()),
        };
        Self {
            scan_id: result.scan_id,
            image: result.image,
            source: result.source,
            scan_time: result.scan_time,
            error,
            results,
        }
    }
}

impl From<ScanResultRecord> for ScanResult {
    fn from(record: ScanResultRecord) -> Self {
        let outcome = match record.error {
            Some(message) => ScanOutcome::Failed(ScanError::Reported(message)),
            None => ScanOutcome::Completed(record.results),
        };
        Self {
            scan_id: record.scan_id,
            image: record.image,
            source: record.source,
            scan_time: record.scan_time,
            outcome,
        }
    }
}

/// 스캐너 출력의 두 가지 형태
#[derive(Deserialize)]
#[serde(untagged)]
enum ScannerOutput {
    /// 현재 형식: `{"SchemaVersion": 2, "Results": [...]}`
    Document {
        #[serde(rename = "Results", default, deserialize_with = "null_as_empty")]
        results: Vec<ScanTarget>,
    },
    /// 구 형식: 최상위 대상 배열
    Targets(Vec<ScanTarget>),
}

/// 스캐너 JSON 출력을 대상 목록으로 파싱합니다.
///
/// `Results`가 없거나 `null`이면 취약점이 없는 것으로 봅니다.
///
/// # Errors
///
/// JSON이 아니거나 어느 형식에도 맞지 않으면 `ScanError::Parse`.
pub fn parse_report(stdout: &str) -> Result<Vec<ScanTarget>, ScanError> {
    match serde_json::from_str::<ScannerOutput>(stdout.trim()) {
        Ok(ScannerOutput::Document { results }) => Ok(results),
        Ok(ScannerOutput::Targets(targets)) => Ok(targets),
        Err(e) => Err(ScanError::Parse(e.to_string())),
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIVY_DOCUMENT: &str = r#"{
        "SchemaVersion": 2,
        "ArtifactName": "app:1.0",
        "Results": [
            {
                "Target": "app:1.0 (alpine 3.19.1)",
                "Class": "os-pkgs",
                "Type": "alpine",
                "Vulnerabilities": [
                    {
                        "VulnerabilityID": "CVE-2024-0001",
                        "PkgName": "openssl",
                        "InstalledVersion": "3.1.4-r2",
                        "FixedVersion": "3.1.4-r5",
                        "Severity": "HIGH",
                        "Title": "openssl: excessive time spent checking DH keys",
                        "Description": "long text"
                    },
                    {
                        "VulnerabilityID": "CVE-2024-0002",
                        "PkgName": "busybox",
                        "InstalledVersion": "1.36.1-r15",
                        "Severity": "low"
                    }
                ]
            },
            { "Target": "usr/lib/app/package-lock.json", "Class": "lang-pkgs", "Vulnerabilities": null }
        ]
    }"#;

    #[test]
    fn parses_current_document_format() {
        let targets = parse_report(TRIVY_DOCUMENT).unwrap();
        assert_eq!(targets.len(), 2);

        let os = &targets[0];
        assert_eq!(os.target, "app:1.0 (alpine 3.19.1)");
        assert_eq!(os.extra["Class"], "os-pkgs");
        assert_eq!(os.vulnerabilities.len(), 2);

        let first = &os.vulnerabilities[0];
        assert_eq!(first.vulnerability_id, "CVE-2024-0001");
        assert_eq!(first.severity, Severity::High);
        assert!(first.is_fixable());
        assert_eq!(first.extra["Description"], "long text");

        let second = &os.vulnerabilities[1];
        assert_eq!(second.severity, Severity::Low);
        assert_eq!(second.fixed_version, None);
        assert_eq!(second.title, None);
        assert!(!second.is_fixable());

        assert!(targets[1].vulnerabilities.is_empty());
    }

    #[test]
    fn parses_legacy_target_array() {
        let stdout = r#"[{"Target":"img","Vulnerabilities":[{"VulnerabilityID":"CVE-1","PkgName":"p","InstalledVersion":"1","Severity":"CRITICAL"}]}]"#;
        let targets = parse_report(stdout).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].vulnerabilities[0].severity, Severity::Critical);
    }

    #[test]
    fn null_or_missing_results_mean_no_targets() {
        assert!(parse_report(r#"{"SchemaVersion":2,"Results":null}"#).unwrap().is_empty());
        assert!(parse_report(r#"{"SchemaVersion":2}"#).unwrap().is_empty());
    }

    #[test]
    fn missing_or_unknown_severity_becomes_unknown() {
        let stdout = r#"[{"Target":"t","Vulnerabilities":[
            {"VulnerabilityID":"A","PkgName":"p","InstalledVersion":"1"},
            {"VulnerabilityID":"B","PkgName":"p","InstalledVersion":"1","Severity":"NEGLIGIBLE"},
            {"VulnerabilityID":"C","PkgName":"p","InstalledVersion":"1","Severity":null}
        ]}]"#;
        let targets = parse_report(stdout).unwrap();
        assert!(
            targets[0]
                .vulnerabilities
                .iter()
                .all(|f| f.severity == Severity::Unknown)
        );
    }

    #[test]
    fn garbage_is_parse_error() {
        assert!(matches!(parse_report("FATAL: db"), Err(ScanError::Parse(_))));
        assert!(matches!(parse_report(""), Err(ScanError::Parse(_))));
        assert!(matches!(parse_report("42"), Err(ScanError::Parse(_))));
    }

    #[test]
    fn failed_result_keeps_both_keys() {
        let result = ScanResult::failed(
            "app:1.0",
            Provenance::Podman,
            ScanError::Export("no such image".to_owned()),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["image"], "app:1.0");
        assert_eq!(json["source"], "podman");
        assert!(json["error"].as_str().unwrap().contains("exporting"));
        assert_eq!(json["results"], serde_json::json!([]));
        assert!(json["scan_time"].is_string());
    }

    #[test]
    fn completed_result_has_null_error() {
        let targets = parse_report(TRIVY_DOCUMENT).unwrap();
        let result = ScanResult::completed("app:1.0", Provenance::Docker, targets);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["error"].is_null());
        assert_eq!(json["results"].as_array().unwrap().len(), 2);
        assert_eq!(
            json["results"][0]["Vulnerabilities"][1]["Severity"],
            "LOW"
        );
        assert_eq!(result.finding_count(), 2);
    }

    #[test]
    fn stored_result_reads_back() {
        let original = ScanResult::failed(
            "abcdef123456",
            Provenance::Docker,
            ScanError::Invocation("exit status 1".to_owned()),
        );
        let text = serde_json::to_string(&original).unwrap();
        let restored: ScanResult = serde_json::from_str(&text).unwrap();

        assert_eq!(restored.scan_id, original.scan_id);
        assert_eq!(restored.scan_time, original.scan_time);
        assert!(!restored.is_success());
        assert_eq!(
            restored.error().map(ToString::to_string),
            original.error().map(ToString::to_string)
        );
        assert!(restored.targets().is_empty());
    }
}
