use crate::core::error::AishError;
use crate::system::{ShellKind, SystemInfo};
use std::process::{Command, Stdio};

/// Outcome of running a proposed command through the local shell.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
}

/// Run the literal command text through the detected shell.
///
/// stdout and stderr are inherited so the command's output reaches the
/// terminal unmodified.
pub fn execute_command(command: &str, system: &SystemInfo) -> Result<ExecutionOutcome, AishError> {
    let mut cmd = Command::new(&system.shell_path);
    match system.shell_kind {
        ShellKind::Cmd => cmd.arg("/C").arg(command),
        ShellKind::PowerShell => cmd.arg("-Command").arg(command),
        ShellKind::UnixLike | ShellKind::Fish => cmd.arg("-c").arg(command),
    };

    cmd.stdout(Stdio::inherit());
    cmd.stderr(Stdio::inherit());

    let status = cmd
        .status()
        .map_err(|e| AishError::Execution(format!("Failed to spawn shell: {}", e)))?;

    Ok(ExecutionOutcome {
        success: status.success(),
        exit_code: status.code(),
    })
}
