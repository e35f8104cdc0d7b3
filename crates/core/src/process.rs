//! 외부 프로세스 실행 추상화
//!
//! [`CommandRunner`] trait은 docker/podman/스캐너 호출을 추상화합니다.
//! 운영 코드는 [`SystemCommandRunner`]를, 테스트는 `testing::FakeRunner`를 사용합니다.
//!
//! ```text
//!   ImageInventory   ImageScanner
//!          \             /
//!           ▼           ▼
//!          CommandRunner (trait)
//!            │        │
//!            ▼        ▼
//!   SystemCommandRunner  FakeRunner
//!            │
//!            ▼
//!   docker / podman / trivy
//! ```
//!
//! 종료 코드가 0이 아니어도 에러가 아닙니다. 스캐너는 취약점을 발견하면
//! 0이 아닌 코드로 종료하므로, 해석은 호출자가 [`CommandOutput`]을 보고 결정합니다.

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use tracing::debug;

use crate::error::ProcessError;

/// 완료된 외부 프로세스의 출력
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// 종료 코드 (시그널로 종료된 경우 `None`)
    pub code: Option<i32>,
    /// 표준 출력 (UTF-8 손실 변환)
    pub stdout: String,
    /// 표준 에러 (UTF-8 손실 변환)
    pub stderr: String,
}

impl CommandOutput {
    /// 종료 코드 0과 주어진 stdout으로 출력을 생성합니다.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// 주어진 종료 코드와 stderr로 실패 출력을 생성합니다.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// stdout을 교체합니다.
    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout이 공백뿐인지 여부
    pub fn stdout_is_empty(&self) -> bool {
        self.stdout.trim().is_empty()
    }

    /// 로그/에러 메시지용으로 정리된 stderr
    pub fn stderr_summary(&self) -> String {
        let trimmed = self.stderr.trim();
        if trimmed.is_empty() {
            match self.code {
                Some(code) => format!("exit status {code}"),
                None => "terminated by signal".to_owned(),
            }
        } else {
            trimmed.to_owned()
        }
    }
}

impl From<std::process::Output> for CommandOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// 외부 명령 실행 trait
///
/// 모든 외부 도구 호출은 이 trait을 거치며, 테스트에서는 스크립트된 응답으로 대체됩니다.
/// 하나의 호출은 프로세스가 끝날 때까지 완료되지 않으며, 호출자는 다음 명령 전에 반드시 await 합니다.
///
/// # Errors
///
/// - `ProcessError::Spawn`: 바이너리를 실행할 수 없음 (도구 부재)
/// - `ProcessError::Timeout`: `timeout` 내에 종료되지 않음 (프로세스는 종료됨)
/// - `ProcessError::Io`: 출력 수집 실패
pub trait CommandRunner: Send + Sync + 'static {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> impl Future<Output = Result<CommandOutput, ProcessError>> + Send;
}

/// `tokio::process` 기반 운영 구현
///
/// 자식 프로세스는 `kill_on_drop(true)`로 생성되므로, 제한 시간 초과나
/// 상위 작업 취소(Ctrl-C) 시 future가 drop 되면서 함께 종료됩니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, ProcessError> {
        debug!(program, ?args, "spawning external command");

        let child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: program.to_owned(),
                source,
            })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| ProcessError::Timeout {
                program: program.to_owned(),
                secs: timeout.as_secs(),
            })?
            .map_err(|source| ProcessError::Io {
                program: program.to_owned(),
                source,
            })?;

        let output = CommandOutput::from(output);
        debug!(program, code = ?output.code, "external command finished");
        Ok(output)
    }
}

/// 테스트용 스크립트 러너
///
/// `(프로그램, 첫 번째 인자)` 쌍으로 응답을 등록합니다. 등록되지 않은 `--version`
/// 호출은 성공으로, 그 외의 등록되지 않은 호출은 종료 코드 127로 응답합니다.
/// 모든 호출은 기록되어 "스캐너가 호출되지 않았음" 같은 검증에 사용됩니다.
#[cfg(any(test, feature = "test-util"))]
pub mod testing {
    use std::collections::{HashMap, HashSet};
    use std::sync::{Mutex, PoisonError};
    use std::time::Duration;

    use super::{CommandOutput, CommandRunner};
    use crate::error::ProcessError;

    /// 기록된 단일 호출
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Invocation {
        pub program: String,
        pub args: Vec<String>,
    }

    impl Invocation {
        /// `flag` 바로 뒤의 인자를 반환합니다.
        pub fn arg_after(&self, flag: &str) -> Option<&str> {
            self.args
                .iter()
                .position(|a| a == flag)
                .and_then(|i| self.args.get(i + 1))
                .map(String::as_str)
        }
    }

    #[derive(Debug, Clone)]
    enum FakeResponse {
        Output(CommandOutput),
        Timeout,
    }

    /// 스크립트된 응답을 반환하는 [`CommandRunner`]
    #[derive(Debug, Default)]
    pub struct FakeRunner {
        missing: HashSet<String>,
        responses: HashMap<(String, String), FakeResponse>,
        calls: Mutex<Vec<Invocation>>,
    }

    impl FakeRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// 해당 프로그램의 모든 호출이 실행 실패(바이너리 없음)하도록 설정합니다.
        pub fn without_tool(mut self, program: &str) -> Self {
            self.missing.insert(program.to_owned());
            self
        }

        /// `program subcommand ...` 호출에 대한 응답을 등록합니다.
        pub fn respond(mut self, program: &str, subcommand: &str, output: CommandOutput) -> Self {
            self.responses.insert(
                (program.to_owned(), subcommand.to_owned()),
                FakeResponse::Output(output),
            );
            self
        }

        /// `program subcommand ...` 호출이 제한 시간을 초과하도록 설정합니다.
        pub fn time_out(mut self, program: &str, subcommand: &str) -> Self {
            self.responses.insert(
                (program.to_owned(), subcommand.to_owned()),
                FakeResponse::Timeout,
            );
            self
        }

        /// 지금까지 기록된 모든 호출
        pub fn calls(&self) -> Vec<Invocation> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// 특정 `program subcommand` 호출만 반환합니다.
        pub fn calls_to(&self, program: &str, subcommand: &str) -> Vec<Invocation> {
            self.calls()
                .into_iter()
                .filter(|c| {
                    c.program == program && c.args.first().map(String::as_str) == Some(subcommand)
                })
                .collect()
        }
    }

    impl CommandRunner for FakeRunner {
        async fn run(
            &self,
            program: &str,
            args: &[&str],
            timeout: Duration,
        ) -> Result<CommandOutput, ProcessError> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Invocation {
                    program: program.to_owned(),
                    args: args.iter().map(|a| (*a).to_owned()).collect(),
                });

            if self.missing.contains(program) {
                return Err(ProcessError::Spawn {
                    program: program.to_owned(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                });
            }

            let subcommand = args.first().copied().unwrap_or_default();
            match self
                .responses
                .get(&(program.to_owned(), subcommand.to_owned()))
            {
                Some(FakeResponse::Output(output)) => Ok(output.clone()),
                Some(FakeResponse::Timeout) => Err(ProcessError::Timeout {
                    program: program.to_owned(),
                    secs: timeout.as_secs(),
                }),
                None if subcommand == "--version" => Ok(CommandOutput::ok(format!("{program} 1.0"))),
                None => Ok(CommandOutput::failed(
                    127,
                    format!("no scripted response for {program} {subcommand}"),
                )),
            }
        }
    }
}
