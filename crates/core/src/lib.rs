#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;
pub mod persist;
pub mod probe;
pub mod process;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, PersistError, ProcessError, StowageError};

// 설정
pub use config::StowageConfig;

// 외부 프로세스
pub use probe::{ToolAvailability, is_available};
pub use process::{CommandOutput, CommandRunner, SystemCommandRunner};

// 영속화
pub use persist::{PersistOutcome, load, persist};

// 도메인 타입
pub use types::{ImageRecord, NONE_PLACEHOLDER, Provenance, RuntimeFilter, Severity};
