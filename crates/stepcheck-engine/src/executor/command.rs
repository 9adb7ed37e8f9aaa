use std::process::Stdio;

use stepcheck_types::{CommandAssertion, CommandResult, CommandStep, Variables};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::block::extract_block;
use crate::jq::run_stdout_query;
use crate::template::substitute;

// ---------------------------------------------------------------------------
// ShellConfig
// ---------------------------------------------------------------------------

/// Interpreter used to run command steps: `program flag <command>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub program: String,
    pub flag: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        if cfg!(windows) {
            Self {
                program: "powershell".into(),
                flag: "-Command".into(),
            }
        } else {
            Self {
                program: "sh".into(),
                flag: "-c".into(),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CommandExecutor: runs a command step through the host shell
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CommandExecutor {
    shell: ShellConfig,
    locale: String,
}

impl CommandExecutor {
    pub fn new(shell: ShellConfig, locale: impl Into<String>) -> Self {
        Self {
            shell,
            locale: locale.into(),
        }
    }

    /// Run `step` with the current variables.
    ///
    /// stdout and stderr are merged in arrival order. Trailing whitespace is
    /// trimmed, then the step's block filter (if any) is applied before the
    /// stdout jq queries run.
    pub async fn run(&self, step: &CommandStep, vars: &Variables) -> CommandResult {
        let final_command = substitute(&step.command, vars);
        tracing::info!(command = %final_command, shell = %self.shell.program, "Executing command step");

        let (exit_code, output) = match self.spawn_and_collect(&final_command).await {
            Ok(done) => done,
            Err(e) => {
                tracing::warn!(command = %final_command, error = %e, "Failed to run command");
                (CommandResult::SPAWN_FAILURE_EXIT_CODE, Vec::new())
            }
        };

        let mut stdout = String::from_utf8_lossy(&output)
            .trim_end_matches([' ', '\n', '\t', '\r'])
            .to_string();
        if let Some(filter) = &step.stdout_filter {
            stdout = extract_block(&stdout, filter);
        }

        let jq_outputs = step
            .tests
            .iter()
            .filter_map(|test| match test {
                CommandAssertion::StdoutJq(jq) => Some(run_stdout_query(&stdout, jq, vars)),
                _ => None,
            })
            .collect();

        tracing::info!(
            exit_code = exit_code,
            stdout_len = stdout.len(),
            "Command step completed"
        );

        CommandResult {
            exit_code,
            final_command,
            stdout,
            variables: vars.snapshot(),
            jq_outputs,
        }
    }

    async fn spawn_and_collect(&self, command: &str) -> std::io::Result<(i32, Vec<u8>)> {
        let mut cmd = Command::new(&self.shell.program);
        cmd.arg(&self.shell.flag).arg(command);
        cmd.env("LANG", &self.locale);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        let output = collect_combined(child.stdout.take(), child.stderr.take()).await?;
        let status = child.wait().await?;

        // No code means the process was killed by a signal.
        let exit_code = status
            .code()
            .unwrap_or(CommandResult::SPAWN_FAILURE_EXIT_CODE);
        Ok((exit_code, output))
    }
}

async fn read_chunk<R>(pipe: &mut Option<R>, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match pipe {
        Some(reader) => reader.read(buf).await,
        None => Ok(0),
    }
}

/// Drain both pipes into one buffer, interleaving chunks as they arrive.
async fn collect_combined<O, E>(mut stdout: Option<O>, mut stderr: Option<E>) -> std::io::Result<Vec<u8>>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut combined = Vec::new();
    let mut out_buf = [0u8; 8192];
    let mut err_buf = [0u8; 8192];

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            read = read_chunk(&mut stdout, &mut out_buf), if stdout.is_some() => {
                match read? {
                    0 => stdout = None,
                    n => combined.extend_from_slice(&out_buf[..n]),
                }
            }
            read = read_chunk(&mut stderr, &mut err_buf), if stderr.is_some() => {
                match read? {
                    0 => stderr = None,
                    n => combined.extend_from_slice(&err_buf[..n]),
                }
            }
        }
    }
    Ok(combined)
}
