//! 스캔 실패 타입
//!
//! [`ScanError`]는 전파되는 에러가 아니라 [`ScanResult`](crate::report::ScanResult)에
//! 담기는 데이터입니다. 한 이미지의 실패가 배치 전체를 중단시키지 않도록
//! 스캐너는 모든 실패를 이 타입으로 기록하고 결과를 반환합니다.

/// 스캔 실패 원인
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// 스캐너 바이너리를 실행할 수 없음
    #[error("{0} scanner not available")]
    ToolUnavailable(String),

    /// podman 이미지 아카이브 내보내기 실패
    #[error("error exporting podman image: {0}")]
    Export(String),

    /// 스캐너가 출력 없이 실패
    #[error("error scanning image: {0}")]
    Invocation(String),

    /// 스캐너 출력을 해석할 수 없음
    #[error("could not parse scanner output: {0}")]
    Parse(String),

    /// 그 외 예상하지 못한 실패 (임시 디렉토리 생성 실패 등)
    #[error("error during scan: {0}")]
    Unexpected(String),

    /// 저장된 결과에서 읽어온 에러 메시지
    #[error("{0}")]
    Reported(String),
}

impl ScanError {
    /// 메트릭 레이블용 실패 종류
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolUnavailable(_) => "tool_unavailable",
            Self::Export(_) => "export",
            Self::Invocation(_) => "invocation",
            Self::Parse(_) => "parse",
            Self::Unexpected(_) => "unexpected",
            Self::Reported(_) => "reported",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_error_names_the_export() {
        let err = ScanError::Export("image not known".to_owned());
        let msg = err.to_string();
        assert!(msg.contains("exporting"));
        assert!(msg.contains("image not known"));
    }

    #[test]
    fn tool_unavailable_display() {
        let err = ScanError::ToolUnavailable("trivy".to_owned());
        assert_eq!(err.to_string(), "trivy scanner not available");
    }

    #[test]
    fn reported_error_is_verbatim() {
        let err = ScanError::Reported("Trivy scanner not available".to_owned());
        assert_eq!(err.to_string(), "Trivy scanner not available");
    }

    #[test]
    fn kinds_match_metric_labels() {
        assert_eq!(ScanError::Invocation(String::new()).kind(), "invocation");
        assert_eq!(ScanError::Unexpected(String::new()).kind(), "unexpected");
    }
}
