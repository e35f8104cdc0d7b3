//! 에러 타입 — 도메인별 에러 정의

/// Stowage 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum StowageError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 외부 프로세스 실행 에러
    #[error("process error: {0}")]
    Process(#[from] ProcessError),

    /// 영속화 에러
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 외부 프로세스 실행 에러
///
/// `Spawn`은 바이너리를 실행조차 할 수 없는 경우(도구 부재)이며,
/// 종료 코드가 0이 아닌 경우는 에러가 아니라 [`CommandOutput`](crate::process::CommandOutput)으로 반환됩니다.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// 프로세스 실행 실패 (바이너리 없음, 권한 없음 등)
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// 제한 시간 초과
    #[error("'{program}' timed out after {secs}s")]
    Timeout { program: String, secs: u64 },

    /// 실행 중 출력 수집 실패
    #[error("io error while running '{program}': {source}")]
    Io {
        program: String,
        source: std::io::Error,
    },
}

impl ProcessError {
    /// 도구 자체를 실행할 수 없었는지 여부
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, Self::Spawn { .. })
    }
}

/// 영속화 에러
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// 파일 I/O 실패
    #[error("io error: {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// 레코드 직렬화 실패
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// 기존 파일이 레코드 배열 형태가 아님
    #[error("unexpected content in {path}: {reason}")]
    ShapeMismatch { path: String, reason: String },
}
