//! 런타임 열거 에러 타입
//!
//! [`RuntimeError`]는 한 런타임의 이미지 목록 조회가 실패한 이유를 나타냅니다.
//! [`ImageInventory::list_images`](crate::ImageInventory::list_images)는 이 에러를
//! 로그로만 남기고 빈 목록으로 대체하며, 타입 있는 에러가 필요한 호출자는
//! [`ImageInventory::try_list`](crate::ImageInventory::try_list)를 사용합니다.

use stowage_core::types::Provenance;

/// 런타임 열거 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// 런타임 바이너리를 실행할 수 없음
    #[error("tool unavailable: {0}")]
    ToolUnavailable(String),

    /// 목록 조회 명령 실패 (0이 아닌 종료 코드, 제한 시간 초과 등)
    #[error("{runtime} listing failed: {reason}")]
    Command {
        runtime: Provenance,
        reason: String,
    },

    /// 목록 출력을 해석할 수 없음
    #[error("failed to parse {runtime} listing: {reason}")]
    Parse {
        runtime: Provenance,
        reason: String,
    },
}

impl RuntimeError {
    /// 메트릭 레이블용 실패 종류
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolUnavailable(_) => "tool_unavailable",
            Self::Command { .. } => "command",
            Self::Parse { .. } => "parse",
        }
    }
}
