//! Shell execution service backing `Execute` (spec.md §4.D Source-read family).

use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct ExecConfig {
    pub command: String,
    pub working_directory: Option<String>,
    pub environment: HashMap<String, String>,
    pub timeout_ms: Option<u64>,
    pub shell: Option<String>,
    pub capture_stderr: bool,
}

#[derive(Debug, Clone)]
pub struct ExecResult {
    pub error: bool,
    pub message: String,
    pub output: String,
    pub exit_code: i32,
    pub command: String,
}

#[async_trait::async_trait]
pub trait ShellService: Send + Sync {
    async fn execute(&self, config: ExecConfig) -> ExecResult;
}

pub struct TokioShellService;

const DEFAULT_EXECUTE_TIMEOUT_MS: u64 = 30_000;

#[async_trait::async_trait]
impl ShellService for TokioShellService {
    async fn execute(&self, config: ExecConfig) -> ExecResult {
        let shell = config.shell.clone().unwrap_or_else(|| "/bin/sh".to_string());
        let mut command = tokio::process::Command::new(shell);
        command.arg("-c").arg(&config.command);
        if let Some(dir) = &config.working_directory {
            command.current_dir(dir);
        }
        for (k, v) in &config.environment {
            command.env(k, v);
        }
        command.stdout(std::process::Stdio::piped());
        command.stderr(std::process::Stdio::piped());

        let timeout = Duration::from_millis(config.timeout_ms.unwrap_or(DEFAULT_EXECUTE_TIMEOUT_MS));
        let raced = tokio::time::timeout(timeout, command.output()).await;

        match raced {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                let exit_code = output.status.code().unwrap_or(-1);
                let error = !output.status.success();
                let message = if error && config.capture_stderr {
                    stderr.clone()
                } else if error {
                    format!("exited with code {exit_code}")
                } else {
                    String::new()
                };
                ExecResult {
                    error,
                    message,
                    output: stdout,
                    exit_code,
                    command: config.command,
                }
            }
            Ok(Err(e)) => ExecResult {
                error: true,
                message: e.to_string(),
                output: String::new(),
                exit_code: -1,
                command: config.command,
            },
            Err(_elapsed) => ExecResult {
                error: true,
                message: "timed out".to_string(),
                output: String::new(),
                exit_code: -1,
                command: config.command,
            },
        }
    }
}
