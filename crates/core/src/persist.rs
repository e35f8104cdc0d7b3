//! 레코드 컬렉션 영속화 — 추가(append) 병합과 원자적 쓰기
//!
//! 영속화 파일은 항상 UTF-8, pretty-print된 JSON 배열입니다.
//! 하나의 파일에는 한 종류의 레코드(이미지 레코드 또는 스캔 결과)만 저장합니다.
//!
//! # 병합 규칙
//!
//! | append | 기존 파일          | 동작                                       |
//! |--------|--------------------|--------------------------------------------|
//! | false  | 무관               | 새 배치만 기록                             |
//! | true   | 없음 / 비어 있음   | 새 배치만 기록                             |
//! | true   | 객체 배열          | 기존 요소 뒤에 새 배치를 이어 붙여 기록    |
//! | true   | 그 외 (잘못된 형태) | 경고 후 새 배치만 기록 (새 배치는 유실되지 않음) |
//!
//! 기존 요소는 `serde_json::Value`로 읽어 그대로 다시 씁니다. 알 수 없는 필드도 보존됩니다.
//!
//! 쓰기는 같은 디렉토리의 임시 파일에 기록한 뒤 rename 하므로,
//! 읽는 쪽은 부분적으로 기록된 파일을 볼 수 없습니다.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::PersistError;
use crate::metrics::PERSIST_WRITES_TOTAL;

/// 영속화 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// 새 파일 생성 또는 덮어쓰기
    Written { records: usize },
    /// 기존 레코드 뒤에 추가
    Appended { existing: usize, added: usize },
    /// 기존 내용이 레코드 배열이 아니어서 새 배치로 대체
    Replaced { records: usize, discarded: String },
}

impl PersistOutcome {
    /// 기록 후 파일의 전체 레코드 수
    pub fn total_records(&self) -> usize {
        match self {
            Self::Written { records } | Self::Replaced { records, .. } => *records,
            Self::Appended { existing, added } => existing + added,
        }
    }
}

/// 레코드 컬렉션을 파일에 기록합니다.
///
/// `append`가 `true`이고 기존 파일이 객체 배열이면 기존 내용 뒤에 이어 붙입니다.
/// 기존 내용이 배열이 아니거나 JSON이 아니면 경고를 남기고 새 배치로 대체합니다.
///
/// 블로킹 파일 I/O를 수행하므로 비동기 문맥에서는 `tokio::task::spawn_blocking`으로 호출합니다.
///
/// # Errors
///
/// - `PersistError::Serialize`: 새 배치 직렬화 실패
/// - `PersistError::Io`: 읽기/임시 파일 생성/rename 실패
pub fn persist<T: Serialize>(
    records: &[T],
    path: impl AsRef<Path>,
    append: bool,
) -> Result<PersistOutcome, PersistError> {
    let path = path.as_ref();
    let batch = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<Value>, _>>()?;
    let added = batch.len();

    let existing = if append {
        read_existing(path)?
    } else {
        None
    };

    let (document, outcome) = match existing {
        None => (batch, PersistOutcome::Written { records: added }),
        Some(content) => match parse_collection(path, &content) {
            Ok(mut merged) => {
                let existing = merged.len();
                merged.extend(batch);
                (merged, PersistOutcome::Appended { existing, added })
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "existing file is not a JSON array of records, replacing it with the new batch"
                );
                let outcome = PersistOutcome::Replaced {
                    records: added,
                    discarded: e.to_string(),
                };
                (batch, outcome)
            }
        },
    };

    write_atomic(path, &document)?;
    metrics::counter!(PERSIST_WRITES_TOTAL).increment(1);

    info!(
        path = %path.display(),
        records = outcome.total_records(),
        ?outcome,
        "records persisted"
    );
    Ok(outcome)
}

/// 영속화 파일을 타입이 지정된 레코드 목록으로 읽습니다.
///
/// # Errors
///
/// - `PersistError::Io`: 파일 읽기 실패
/// - `PersistError::ShapeMismatch`: 배열이 아니거나 레코드 형태가 다름
pub fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>, PersistError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| PersistError::Io {
        path: path.display().to_string(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&content).map_err(|e| PersistError::ShapeMismatch {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// 병합 대상 기존 내용을 읽습니다. 파일이 없거나 비어 있으면 `None`.
fn read_existing(path: &Path) -> Result<Option<String>, PersistError> {
    match std::fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(None),
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            // UTF-8이 아닌 파일은 형태 불일치로 처리
            Ok(Some(String::new()))
        }
        Err(source) => Err(PersistError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

fn parse_collection(path: &Path, content: &str) -> Result<Vec<Value>, PersistError> {
    let mismatch = |reason: String| PersistError::ShapeMismatch {
        path: path.display().to_string(),
        reason,
    };

    let value: Value =
        serde_json::from_str(content).map_err(|e| mismatch(format!("invalid JSON: {e}")))?;

    let Value::Array(items) = value else {
        return Err(mismatch(format!(
            "top-level value is {}, expected an array",
            json_kind(&value)
        )));
    };

    if let Some((index, item)) = items.iter().enumerate().find(|(_, v)| !v.is_object()) {
        return Err(mismatch(format!(
            "element {index} is {}, expected an object",
            json_kind(item)
        )));
    }

    Ok(items)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn write_atomic(path: &Path, document: &[Value]) -> Result<(), PersistError> {
    let io_err = |source: std::io::Error| PersistError::Io {
        path: path.display().to_string(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // rename은 임시 파일의 모드를 그대로 가져가므로 기존 파일의 권한을 미리 읽어 둡니다.
    let existing_permissions = match std::fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(io_err(e)),
    };

    let mut builder = tempfile::Builder::new();
    // 새 파일은 일반 생성과 같은 0o666 & !umask (tempfile 기본값은 0o600)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let mut tmp = builder.tempfile_in(dir).map_err(io_err)?;
    {
        let mut writer = std::io::BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, document)?;
        writer.write_all(b"\n").map_err(io_err)?;
        writer.flush().map_err(io_err)?;
    }
    if let Some(permissions) = existing_permissions {
        tmp.as_file().set_permissions(permissions).map_err(io_err)?;
    }
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        name: String,
        n: u32,
    }

    fn items(prefix: &str, count: u32) -> Vec<Item> {
        (0..count)
            .map(|n| Item {
                name: format!("{prefix}{n}"),
                n,
            })
            .collect()
    }

    #[test]
    fn fresh_write_creates_pretty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");

        let outcome = persist(&items("a", 2), &path, false).unwrap();
        assert_eq!(outcome, PersistOutcome::Written { records: 2 });

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("[\n  {"));
        assert_eq!(load::<Item>(&path).unwrap(), items("a", 2));
    }

    #[test]
    fn overwrite_without_append_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        persist(&items("a", 3), &path, false).unwrap();

        let outcome = persist(&items("b", 1), &path, false).unwrap();
        assert_eq!(outcome, PersistOutcome::Written { records: 1 });
        assert_eq!(load::<Item>(&path).unwrap(), items("b", 1));
    }

    #[test]
    fn append_to_missing_or_empty_file_writes_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");

        let outcome = persist(&items("a", 1), &path, true).unwrap();
        assert_eq!(outcome, PersistOutcome::Written { records: 1 });

        std::fs::write(&path, "").unwrap();
        let outcome = persist(&items("b", 2), &path, true).unwrap();
        assert_eq!(outcome, PersistOutcome::Written { records: 2 });
        assert_eq!(load::<Item>(&path).unwrap(), items("b", 2));
    }

    #[test]
    fn append_concatenates_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        persist(&items("a", 2), &path, false).unwrap();

        let outcome = persist(&items("b", 2), &path, true).unwrap();
        assert_eq!(
            outcome,
            PersistOutcome::Appended {
                existing: 2,
                added: 2
            }
        );
        assert_eq!(outcome.total_records(), 4);

        let mut expected = items("a", 2);
        expected.extend(items("b", 2));
        assert_eq!(load::<Item>(&path).unwrap(), expected);
    }

    #[test]
    fn append_preserves_unknown_fields_of_existing_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, r#"[{"name":"old","n":9,"Digest":"sha256:aa"}]"#).unwrap();

        persist(&items("new", 1), &path, true).unwrap();

        let raw: Vec<Value> = load(&path).unwrap();
        assert_eq!(raw[0]["Digest"], json!("sha256:aa"));
        assert_eq!(raw[1]["name"], json!("new0"));
    }

    #[test]
    fn append_onto_object_replaces_with_new_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, r#"{"name":"not-a-list"}"#).unwrap();

        let outcome = persist(&items("b", 2), &path, true).unwrap();
        match outcome {
            PersistOutcome::Replaced { records, discarded } => {
                assert_eq!(records, 2);
                assert!(discarded.contains("an object"));
            }
            other => panic!("expected Replaced, got {other:?}"),
        }
        assert_eq!(load::<Item>(&path).unwrap(), items("b", 2));
    }

    #[test]
    fn append_onto_invalid_json_replaces_with_new_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, "[{\"name\": ").unwrap();

        let outcome = persist(&items("b", 1), &path, true).unwrap();
        assert!(matches!(outcome, PersistOutcome::Replaced { .. }));
        assert_eq!(load::<Item>(&path).unwrap(), items("b", 1));
    }

    #[test]
    fn append_onto_array_of_scalars_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let outcome = persist(&items("b", 1), &path, true).unwrap();
        match outcome {
            PersistOutcome::Replaced { discarded, .. } => {
                assert!(discarded.contains("element 0"));
            }
            other => panic!("expected Replaced, got {other:?}"),
        }
    }

    #[test]
    fn write_leaves_no_temporary_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        persist(&items("a", 1), &path, false).unwrap();
        persist(&items("b", 1), &path, true).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn rewrite_keeps_existing_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inv.json");
        std::fs::write(&path, "[]").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        persist(&[json!({"a": 1})], &path, true).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644, "append changed the file mode");

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();
        persist(&items("b", 1), &path, false).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640, "overwrite changed the file mode");
    }

    #[cfg(unix)]
    #[test]
    fn new_file_gets_default_create_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().join("plain.json");
        std::fs::write(&reference, "[]").unwrap();
        let expected = std::fs::metadata(&reference).unwrap().permissions().mode() & 0o777;

        let path = dir.path().join("fresh.json");
        persist(&items("a", 1), &path, false).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, expected);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = load::<Item>("/nonexistent/stowage/out.json").unwrap_err();
        assert!(matches!(err, PersistError::Io { .. }));
    }

    #[test]
    fn empty_batch_writes_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        persist::<Item>(&[], &path, false).unwrap();
        assert!(load::<Item>(&path).unwrap().is_empty());
    }
}
