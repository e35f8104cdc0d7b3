//! 설정 관리 — stowage.toml 파싱 및 런타임 설정
//!
//! [`StowageConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`STOWAGE_SCANNER_TIMEOUT_SECS=900` 형식)
//! 3. 설정 파일 (`stowage.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), stowage_core::error::StowageError> {
//! use stowage_core::config::StowageConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드 (파일이 없으면 기본값)
//! let config = StowageConfig::load_or_default("stowage.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = StowageConfig::parse("[scanner]\ntimeout_secs = 900")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, StowageError};
use crate::types::Provenance;

/// 외부 명령 제한 시간 상한 (24시간)
const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Stowage 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StowageConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 컨테이너 런타임 설정
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// 취약점 스캐너 설정
    #[serde(default)]
    pub scanner: ScannerConfig,
}

impl StowageConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StowageError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 파일이 없으면 기본값에서 시작한다는 점만 [`load`](Self::load)와 다릅니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, StowageError> {
        let path = path.as_ref();
        let mut config = match Self::from_file(path).await {
            Ok(config) => config,
            Err(StowageError::Config(ConfigError::FileNotFound { .. })) => {
                debug!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, StowageError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StowageError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                StowageError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, StowageError> {
        toml::from_str(toml_str).map_err(|e| {
            StowageError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `STOWAGE_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "STOWAGE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "STOWAGE_GENERAL_LOG_FORMAT");

        // Runtime
        override_string(&mut self.runtime.docker_bin, "STOWAGE_RUNTIME_DOCKER_BIN");
        override_string(&mut self.runtime.podman_bin, "STOWAGE_RUNTIME_PODMAN_BIN");
        override_u64(
            &mut self.runtime.command_timeout_secs,
            "STOWAGE_RUNTIME_COMMAND_TIMEOUT_SECS",
        );

        // Scanner
        override_string(&mut self.scanner.scanner_bin, "STOWAGE_SCANNER_SCANNER_BIN");
        override_u64(&mut self.scanner.timeout_secs, "STOWAGE_SCANNER_TIMEOUT_SECS");
        override_string(&mut self.scanner.archive_name, "STOWAGE_SCANNER_ARCHIVE_NAME");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), StowageError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        for (field, value) in [
            ("runtime.docker_bin", &self.runtime.docker_bin),
            ("runtime.podman_bin", &self.runtime.podman_bin),
            ("scanner.scanner_bin", &self.scanner.scanner_bin),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: "binary name must not be empty".to_owned(),
                }
                .into());
            }
        }

        for (field, secs) in [
            (
                "runtime.command_timeout_secs",
                self.runtime.command_timeout_secs,
            ),
            ("scanner.timeout_secs", self.scanner.timeout_secs),
        ] {
            if secs == 0 || secs > MAX_TIMEOUT_SECS {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: format!("must be 1-{MAX_TIMEOUT_SECS}"),
                }
                .into());
            }
        }

        // 아카이브는 임시 디렉토리 안에만 생성되어야 함
        let archive = &self.scanner.archive_name;
        if archive.is_empty()
            || archive.contains('/')
            || archive.contains('\\')
            || archive == "."
            || archive == ".."
        {
            return Err(ConfigError::InvalidValue {
                field: "scanner.archive_name".to_owned(),
                reason: "must be a plain file name".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 컨테이너 런타임 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// docker 바이너리
    pub docker_bin: String,
    /// podman 바이너리
    pub podman_bin: String,
    /// 목록 조회/내보내기 명령 제한 시간 (초)
    pub command_timeout_secs: u64,
}

impl RuntimeConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// 런타임에 해당하는 바이너리
    pub fn bin(&self, provenance: Provenance) -> &str {
        match provenance {
            Provenance::Docker => &self.docker_bin,
            Provenance::Podman => &self.podman_bin,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            docker_bin: "docker".to_owned(),
            podman_bin: "podman".to_owned(),
            command_timeout_secs: 300,
        }
    }
}

/// 취약점 스캐너 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// 스캐너 바이너리 (trivy 호환)
    pub scanner_bin: String,
    /// 이미지 하나당 스캔 제한 시간 (초)
    pub timeout_secs: u64,
    /// podman 이미지 내보내기 아카이브 파일명
    pub archive_name: String,
}

impl ScannerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            scanner_bin: "trivy".to_owned(),
            timeout_secs: 1800,
            archive_name: "image.tar".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
