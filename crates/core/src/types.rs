//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 런타임 출처([`Provenance`]), 정규화된 이미지 레코드([`ImageRecord`]),
//! 취약점 심각도([`Severity`])를 정의합니다.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 런타임이 이름을 보고하지 않을 때 사용하는 자리표시자
pub const NONE_PLACEHOLDER: &str = "<none>";

/// 짧은 이미지 ID 길이
pub const SHORT_ID_LEN: usize = 12;

/// 이미지 출처 런타임
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// 참조로 직접 스캔 가능한 런타임
    Docker,
    /// 스캔 전 아카이브 내보내기가 필요한 런타임
    Podman,
}

impl Provenance {
    /// 열거 순서 (docker가 항상 먼저)
    pub const ALL: [Provenance; 2] = [Provenance::Docker, Provenance::Podman];

    /// 문자열에서 출처를 파싱합니다 (대소문자 구분 없음).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "docker" => Some(Self::Docker),
            "podman" => Some(Self::Podman),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 열거 대상 런타임 필터
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RuntimeFilter {
    Docker,
    Podman,
    #[default]
    All,
}

impl RuntimeFilter {
    /// 필터가 해당 런타임을 포함하는지 여부
    pub fn includes(&self, provenance: Provenance) -> bool {
        match self {
            Self::All => true,
            Self::Docker => provenance == Provenance::Docker,
            Self::Podman => provenance == Provenance::Podman,
        }
    }

    /// 필터에 포함되는 런타임을 열거 순서대로 반환합니다.
    pub fn runtimes(&self) -> Vec<Provenance> {
        Provenance::ALL
            .into_iter()
            .filter(|p| self.includes(*p))
            .collect()
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Some(Self::All),
            other => Provenance::from_str_loose(other).map(Self::from),
        }
    }
}

impl From<Provenance> for RuntimeFilter {
    fn from(p: Provenance) -> Self {
        match p {
            Provenance::Docker => Self::Docker,
            Provenance::Podman => Self::Podman,
        }
    }
}

impl fmt::Display for RuntimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Docker => write!(f, "docker"),
            Self::Podman => write!(f, "podman"),
            Self::All => write!(f, "all"),
        }
    }
}

/// 정규화된 컨테이너 이미지 레코드
///
/// 두 런타임의 서로 다른 목록 형식을 하나의 형태로 통합합니다.
/// 필드명은 영속화 파일과 호환되도록 런타임 원본 키(`Repository`, `Tag`, ...)를 유지합니다.
/// 열거할 때마다 새로 생성되며, 실행 간 중복 제거는 하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// 저장소 이름 (없으면 `<none>`)
    #[serde(rename = "Repository")]
    pub repository: String,
    /// 태그 (없으면 `<none>`)
    #[serde(rename = "Tag")]
    pub tag: String,
    /// 짧은 이미지 ID (12자)
    #[serde(rename = "ID")]
    pub id: String,
    /// 생성 시각 (런타임 원본 문자열)
    #[serde(rename = "CreatedAt")]
    pub created_at: String,
    /// 사람이 읽기 쉬운 크기
    #[serde(rename = "Size")]
    pub size: String,
    /// 출처 런타임
    pub source: Provenance,
}

impl ImageRecord {
    /// 저장소와 태그가 모두 알려져 있는지 여부
    pub fn is_named(&self) -> bool {
        self.repository != NONE_PLACEHOLDER && self.tag != NONE_PLACEHOLDER
    }

    /// `repository:tag` 형식의 참조를 반환합니다.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }

    /// ID 또는 `repository:tag`가 주어진 참조와 일치하는지 확인합니다.
    pub fn matches_reference(&self, reference: &str) -> bool {
        self.id == reference || self.reference() == reference
    }
}

impl fmt::Display for ImageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}:{} ({}, {})",
            self.id, self.repository, self.tag, self.size, self.source
        )
    }
}

/// 긴 네이티브 ID를 12자 짧은 형식으로 자릅니다.
///
/// `sha256:` 다이제스트 접두어가 있으면 먼저 제거합니다.
pub fn short_id(raw: &str) -> String {
    let trimmed = raw.trim();
    let hex = trimmed.strip_prefix("sha256:").unwrap_or(trimmed);
    hex.chars().take(SHORT_ID_LEN).collect()
}

/// 취약점 심각도
///
/// 표시 우선순위 순서로 선언됩니다 (`CRITICAL`이 가장 먼저).
/// 입력은 대소문자를 구분하지 않으며, 없거나 알 수 없는 값은 [`Severity::Unknown`]으로 변환됩니다.
/// 직렬화 시에는 항상 대문자 레이블을 사용합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    #[default]
    Unknown,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Unknown,
    ];

    /// 정렬 우선순위 (CRITICAL=0 ... UNKNOWN=4)
    pub fn rank(&self) -> u16 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
            Self::Unknown => 4,
        }
    }

    /// 레이블을 엄격하게 파싱합니다. 인식할 수 없으면 `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "CRITICAL" => Some(Self::Critical),
            "HIGH" => Some(Self::High),
            "MEDIUM" => Some(Self::Medium),
            "LOW" => Some(Self::Low),
            "UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// 레이블을 관대하게 파싱합니다. 인식할 수 없으면 `Unknown`.
    pub fn from_label(label: &str) -> Self {
        Self::parse(label).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.as_deref().map(Self::from_label).unwrap_or_default())
    }
}
