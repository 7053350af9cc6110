use std::env;
use std::path::Path;

/// Shell families that need different invocation arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    Cmd,
    PowerShell,
    UnixLike,
    Fish,
}

/// Snapshot of the environment used both for invoking commands and for
/// filling role template placeholders.
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub os: String,
    pub shell_path: String,
    pub shell_name: String,
    pub shell_kind: ShellKind,
}

impl SystemInfo {
    pub fn detect() -> Self {
        let info = os_info::get();
        let os = format!("{} {}", info.os_type(), info.version());

        let (shell_path, shell_kind) = detect_shell();
        let shell_name = Path::new(&shell_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("sh")
            .to_string();

        SystemInfo {
            os,
            shell_path,
            shell_name,
            shell_kind,
        }
    }
}

fn detect_shell() -> (String, ShellKind) {
    if cfg!(target_os = "windows") {
        if env::var("PSModulePath").is_ok() {
            return ("powershell.exe".to_string(), ShellKind::PowerShell);
        }
        return (
            env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string()),
            ShellKind::Cmd,
        );
    }

    let shell_path = env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
    let shell_name = Path::new(&shell_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("sh")
        .to_lowercase();

    if shell_name == "fish" {
        (shell_path, ShellKind::Fish)
    } else {
        (shell_path, ShellKind::UnixLike)
    }
}
