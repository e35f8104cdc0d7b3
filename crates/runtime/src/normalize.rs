//! 런타임 원본 목록 → [`ImageRecord`] 정규화
//!
//! 두 런타임은 이미지 목록을 서로 다른 형태로 출력합니다.
//!
//! | 런타임 | 명령 | 형태 |
//! |--------|------|------|
//! | docker | `docker images --format {{json .}}` | 줄마다 JSON 객체 하나 |
//! | podman | `podman images --format json` | 전체 이미지의 JSON 배열 |
//!
//! docker 출력은 이미 사람이 읽는 형태(`Repository`, `Tag`, `Size` 문자열)이므로
//! 거의 그대로 옮기고, podman 출력은 이름 분리, 바이트 크기 변환, ID 축약을 거칩니다.

use serde::Deserialize;
use stowage_core::types::{ImageRecord, NONE_PLACEHOLDER, Provenance, short_id};

use crate::error::RuntimeError;

/// 크기 단위 (PB 는 더 나누지 않음)
const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// 바이트 수를 두 자리 소수의 사람이 읽기 쉬운 크기로 변환합니다.
///
/// 1024로 반복해서 나누며 값이 1024 미만이 되는 첫 단위를 사용합니다.
///
/// ```
/// use stowage_runtime::format_size;
///
/// assert_eq!(format_size(0), "0.00B");
/// assert_eq!(format_size(1024), "1.00KB");
/// assert_eq!(format_size(1_125_899_906_842_624), "1.00PB");
/// ```
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in SIZE_UNITS {
        if size < 1024.0 {
            return format!("{size:.2}{unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2}PB")
}

/// 숫자 또는 문자열로 올 수 있는 값
///
/// podman 버전에 따라 `Size`, `Created`가 숫자 또는 문자열로 출력됩니다.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseScalar {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
}

impl LooseScalar {
    /// 원본 표현 그대로 문자열로 변환합니다.
    pub fn to_text(&self) -> String {
        match self {
            Self::Unsigned(n) => n.to_string(),
            Self::Signed(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    /// 바이트 수로 해석합니다.
    pub fn to_bytes(&self) -> Result<u64, String> {
        match self {
            Self::Unsigned(n) => Ok(*n),
            Self::Signed(n) => u64::try_from(*n).map_err(|_| format!("negative size {n}")),
            Self::Float(f) if f.is_finite() && *f >= 0.0 => Ok(*f as u64),
            Self::Float(f) => Err(format!("invalid size {f}")),
            Self::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|e| format!("invalid size '{s}': {e}")),
        }
    }
}

/// `docker images --format {{json .}}` 의 한 줄
///
/// 그 외 필드(`Containers`, `Digest`, ...)는 무시합니다.
#[derive(Debug, Clone, Deserialize)]
pub struct DockerImageLine {
    #[serde(rename = "Repository", default)]
    pub repository: String,
    #[serde(rename = "Tag", default)]
    pub tag: String,
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "CreatedAt", default)]
    pub created_at: String,
    #[serde(rename = "Size", default)]
    pub size: String,
}

impl DockerImageLine {
    pub fn into_record(self) -> ImageRecord {
        ImageRecord {
            repository: or_placeholder(self.repository),
            tag: or_placeholder(self.tag),
            id: short_id(&self.id),
            created_at: self.created_at,
            size: self.size,
            source: Provenance::Docker,
        }
    }
}

/// `podman images --format json` 배열의 원소
#[derive(Debug, Clone, Deserialize)]
pub struct PodmanImage {
    /// 태그 별칭 목록 (첫 번째만 사용)
    #[serde(rename = "Names", default)]
    pub names: Option<Vec<String>>,
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Created", default)]
    pub created: Option<LooseScalar>,
    /// 바이트 수
    #[serde(rename = "Size", default)]
    pub size: Option<LooseScalar>,
}

impl PodmanImage {
    pub fn into_record(self) -> Result<ImageRecord, String> {
        let (repository, tag) = self
            .names
            .as_deref()
            .and_then(<[String]>::first)
            .map(|name| split_name(name))
            .unwrap_or_else(|| (NONE_PLACEHOLDER.to_owned(), NONE_PLACEHOLDER.to_owned()));

        let bytes = match &self.size {
            Some(size) => size.to_bytes()?,
            None => 0,
        };

        Ok(ImageRecord {
            repository,
            tag,
            id: short_id(&self.id),
            created_at: self.created.as_ref().map(LooseScalar::to_text).unwrap_or_default(),
            size: format_size(bytes),
            source: Provenance::Podman,
        })
    }
}

/// 이미지 이름을 마지막 `:` 기준으로 저장소와 태그로 나눕니다.
///
/// 레지스트리 포트(`localhost:5000/app`)처럼 마지막 `:` 뒤에 `/`가 있으면 태그가
/// 없는 것으로 보고, 다이제스트 참조(`app@sha256:...`)도 태그 없이 저장소만 남깁니다.
pub fn split_name(name: &str) -> (String, String) {
    let name = name.trim();
    if name.is_empty() {
        return (NONE_PLACEHOLDER.to_owned(), NONE_PLACEHOLDER.to_owned());
    }
    if let Some((repository, _digest)) = name.split_once('@') {
        return (or_placeholder(repository.to_owned()), NONE_PLACEHOLDER.to_owned());
    }
    match name.rsplit_once(':') {
        Some((repository, tag)) if !repository.is_empty() && !tag.is_empty() && !tag.contains('/') => {
            (repository.to_owned(), tag.to_owned())
        }
        _ => (name.to_owned(), NONE_PLACEHOLDER.to_owned()),
    }
}

/// docker 출력(줄 단위 JSON)을 정규화합니다.
///
/// 빈 줄은 건너뛰며, 한 줄이라도 해석에 실패하면 전체가 실패합니다.
pub fn normalize_docker(stdout: &str) -> Result<Vec<ImageRecord>, RuntimeError> {
    stdout
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<DockerImageLine>(line)
                .map(DockerImageLine::into_record)
                .map_err(|e| RuntimeError::Parse {
                    runtime: Provenance::Docker,
                    reason: format!("line {}: {e}", idx + 1),
                })
        })
        .collect()
}

/// podman 출력(JSON 배열)을 정규화합니다.
///
/// 출력이 비어 있으면 이미지가 없는 것으로 봅니다.
pub fn normalize_podman(stdout: &str) -> Result<Vec<ImageRecord>, RuntimeError> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }

    let images: Vec<PodmanImage> =
        serde_json::from_str(stdout).map_err(|e| RuntimeError::Parse {
            runtime: Provenance::Podman,
            reason: e.to_string(),
        })?;

    images
        .into_iter()
        .enumerate()
        .map(|(idx, image)| {
            image.into_record().map_err(|reason| RuntimeError::Parse {
                runtime: Provenance::Podman,
                reason: format!("entry {idx}: {reason}"),
            })
        })
        .collect()
}

fn or_placeholder(value: String) -> String {
    if value.trim().is_empty() {
        NONE_PLACEHOLDER.to_owned()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_known_values() {
        assert_eq!(format_size(0), "0.00B");
        assert_eq!(format_size(1), "1.00B");
        assert_eq!(format_size(1023), "1023.00B");
        assert_eq!(format_size(1024), "1.00KB");
        assert_eq!(format_size(1536), "1.50KB");
        assert_eq!(format_size(2048), "2.00KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00MB");
        assert_eq!(format_size(1024u64.pow(3)), "1.00GB");
        assert_eq!(format_size(1024u64.pow(4)), "1.00TB");
        assert_eq!(format_size(1_125_899_906_842_624), "1.00PB");
    }

    #[test]
    fn format_size_never_divides_past_petabytes() {
        assert_eq!(format_size(2048 * 1024u64.pow(5)), "2048.00PB");
        assert!(format_size(u64::MAX).ends_with("PB"));
    }

    #[test]
    fn split_name_on_last_colon() {
        assert_eq!(split_name("app:1.0"), ("app".to_owned(), "1.0".to_owned()));
        assert_eq!(
            split_name("localhost:5000/team/app:2.1"),
            ("localhost:5000/team/app".to_owned(), "2.1".to_owned())
        );
    }

    #[test]
    fn split_name_without_tag() {
        assert_eq!(
            split_name("app"),
            ("app".to_owned(), NONE_PLACEHOLDER.to_owned())
        );
        assert_eq!(
            split_name("localhost:5000/app"),
            ("localhost:5000/app".to_owned(), NONE_PLACEHOLDER.to_owned())
        );
        assert_eq!(
            split_name("app@sha256:abcdef"),
            ("app".to_owned(), NONE_PLACEHOLDER.to_owned())
        );
        assert_eq!(
            split_name(""),
            (NONE_PLACEHOLDER.to_owned(), NONE_PLACEHOLDER.to_owned())
        );
    }

    #[test]
    fn loose_scalar_accepts_numbers_and_strings() {
        let v: LooseScalar = serde_json::from_str("2048").unwrap();
        assert_eq!(v.to_bytes(), Ok(2048));
        let v: LooseScalar = serde_json::from_str("\"2048\"").unwrap();
        assert_eq!(v.to_bytes(), Ok(2048));
        let v: LooseScalar = serde_json::from_str("1700000000").unwrap();
        assert_eq!(v.to_text(), "1700000000");
        let v: LooseScalar = serde_json::from_str("-5").unwrap();
        assert!(v.to_bytes().is_err());
        let v: LooseScalar = serde_json::from_str("\"big\"").unwrap();
        assert!(v.to_bytes().is_err());
    }

    #[test]
    fn docker_line_keeps_native_strings() {
        let line = r#"{"Containers":"N/A","CreatedAt":"2024-01-01 10:00:00 +0000 UTC","ID":"0123456789ab","Repository":"nginx","Size":"187MB","Tag":"latest"}"#;
        let records = normalize_docker(line).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.repository, "nginx");
        assert_eq!(r.tag, "latest");
        assert_eq!(r.id, "0123456789ab");
        assert_eq!(r.size, "187MB");
        assert_eq!(r.created_at, "2024-01-01 10:00:00 +0000 UTC");
        assert_eq!(r.source, Provenance::Docker);
    }

    #[test]
    fn docker_untruncated_id_is_shortened() {
        let line = r#"{"Repository":"","Tag":"","ID":"sha256:0123456789abcdef0123","CreatedAt":"x","Size":"1MB"}"#;
        let r = &normalize_docker(line).unwrap()[0];
        assert_eq!(r.id, "0123456789ab");
        assert_eq!(r.repository, NONE_PLACEHOLDER);
        assert_eq!(r.tag, NONE_PLACEHOLDER);
    }

    #[test]
    fn docker_bad_line_fails_whole_listing() {
        let stdout = "{\"Repository\":\"a\",\"Tag\":\"1\",\"ID\":\"1\",\"CreatedAt\":\"\",\"Size\":\"\"}\nnot json\n";
        let err = normalize_docker(stdout).unwrap_err();
        assert!(matches!(err, RuntimeError::Parse { runtime: Provenance::Docker, .. }));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn docker_blank_output_is_empty() {
        assert!(normalize_docker("").unwrap().is_empty());
        assert!(normalize_docker("\n\n").unwrap().is_empty());
    }

    #[test]
    fn podman_entry_normalizes() {
        let stdout = r#"[{"Names":["app:1.0"],"Id":"abcdef1234567890","Created":"0","Size":"2048"}]"#;
        let records = normalize_podman(stdout).unwrap();
        assert_eq!(
            records,
            vec![ImageRecord {
                repository: "app".to_owned(),
                tag: "1.0".to_owned(),
                id: "abcdef123456".to_owned(),
                created_at: "0".to_owned(),
                size: "2.00KB".to_owned(),
                source: Provenance::Podman,
            }]
        );
    }

    #[test]
    fn podman_missing_or_empty_names_use_placeholder() {
        let stdout = r#"[
            {"Id":"1111111111111111","Created":1,"Size":1},
            {"Names":null,"Id":"2222222222222222","Created":2,"Size":2},
            {"Names":[],"Id":"3333333333333333","Created":3,"Size":3}
        ]"#;
        let records = normalize_podman(stdout).unwrap();
        assert_eq!(records.len(), 3);
        for r in &records {
            assert_eq!(r.repository, NONE_PLACEHOLDER);
            assert_eq!(r.tag, NONE_PLACEHOLDER);
        }
    }

    #[test]
    fn podman_uses_first_alias_only() {
        let stdout = r#"[{"Names":["localhost/app:2","localhost/app:latest"],"Id":"abcdef1234567890","Created":1700000000,"Size":1048576}]"#;
        let r = &normalize_podman(stdout).unwrap()[0];
        assert_eq!(r.repository, "localhost/app");
        assert_eq!(r.tag, "2");
        assert_eq!(r.created_at, "1700000000");
        assert_eq!(r.size, "1.00MB");
    }

    #[test]
    fn podman_invalid_size_is_parse_error() {
        let stdout = r#"[{"Names":["app:1"],"Id":"abc","Created":"0","Size":"huge"}]"#;
        let err = normalize_podman(stdout).unwrap_err();
        assert!(matches!(err, RuntimeError::Parse { runtime: Provenance::Podman, .. }));
        assert!(err.to_string().contains("huge"));
    }

    #[test]
    fn podman_non_array_is_parse_error() {
        assert!(normalize_podman(r#"{"Names":["a:1"]}"#).is_err());
        assert!(normalize_podman("garbage").is_err());
        assert!(normalize_podman("   ").unwrap().is_empty());
        assert!(normalize_podman("[]").unwrap().is_empty());
    }
}
