use crate::core::error::AishError;
use crate::executor::{execute_command, ExecutionOutcome};
use crate::system::SystemInfo;

/// Discrete external signal driving the gate. How the signal is obtained
/// (keyboard, flag, scripted input) is the caller's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateSignal {
    Execute,
    Describe,
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Command text received from the pipeline, nothing run yet.
    Proposed,
    /// Terminal: the shell was invoked with the proposed text.
    Executed { success: bool },
    /// Terminal: nothing was executed.
    Aborted,
}

/// What the caller should do after a signal was applied.
#[derive(Debug)]
pub enum GateStep {
    Ran(ExecutionOutcome),
    /// Fetch a non-executing explanation of the command, then signal again.
    NeedsDescription,
    Aborted,
}

/// Confirmation gate around a model-generated shell command.
///
/// Every Proposed → Executed transition requires an explicit Execute
/// signal; nothing is remembered across invocations. Describe is
/// re-entrant and leaves the command Proposed.
pub struct ShellExecutionGate {
    command: String,
    state: GateState,
}

impl ShellExecutionGate {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            state: GateState::Proposed,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn apply(
        &mut self,
        signal: GateSignal,
        system: &SystemInfo,
    ) -> Result<GateStep, AishError> {
        if self.state != GateState::Proposed {
            return Err(AishError::Execution(
                "command already resolved, gate accepts no further signals".to_string(),
            ));
        }

        match signal {
            GateSignal::Execute => {
                let outcome = execute_command(&self.command, system)?;
                self.state = GateState::Executed {
                    success: outcome.success,
                };
                Ok(GateStep::Ran(outcome))
            }
            GateSignal::Describe => Ok(GateStep::NeedsDescription),
            GateSignal::Abort => {
                self.state = GateState::Aborted;
                Ok(GateStep::Aborted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::ShellKind;

    #[cfg(unix)]
    fn sh() -> SystemInfo {
        SystemInfo {
            os: "test".to_string(),
            shell_path: "/bin/sh".to_string(),
            shell_name: "sh".to_string(),
            shell_kind: ShellKind::UnixLike,
        }
    }

    #[cfg(unix)]
    #[test]
    fn abort_is_terminal_and_never_executes() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let mut gate = ShellExecutionGate::new(format!("touch {}", marker.display()));
        assert_eq!(gate.state(), GateState::Proposed);

        let step = gate.apply(GateSignal::Abort, &sh()).unwrap();
        assert!(matches!(step, GateStep::Aborted));
        assert_eq!(gate.state(), GateState::Aborted);
        assert!(!marker.exists());

        // Terminal state rejects everything, including a late Execute
        assert!(gate.apply(GateSignal::Execute, &sh()).is_err());
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[test]
    fn describe_is_reentrant_and_leaves_proposed() {
        let mut gate = ShellExecutionGate::new("ls");
        for _ in 0..3 {
            let step = gate.apply(GateSignal::Describe, &sh()).unwrap();
            assert!(matches!(step, GateStep::NeedsDescription));
            assert_eq!(gate.state(), GateState::Proposed);
        }
    }

    #[cfg(unix)]
    #[test]
    fn execute_transitions_to_terminal_with_status() {
        let mut gate = ShellExecutionGate::new("true");
        let step = gate.apply(GateSignal::Execute, &sh()).unwrap();
        assert!(matches!(step, GateStep::Ran(ref o) if o.success));
        assert_eq!(gate.state(), GateState::Executed { success: true });
        assert!(gate.apply(GateSignal::Describe, &sh()).is_err());
    }
}
