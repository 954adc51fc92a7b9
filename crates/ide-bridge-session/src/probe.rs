//! Process liveness checks.

use std::sync::{Mutex, PoisonError};

use ide_bridge_core::ProcessId;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Answers whether a process id refers to a running process.
pub trait ProcessProbe: Send + Sync {
    fn is_alive(&self, pid: ProcessId) -> bool;
}

/// Probe backed by the operating system process table.
pub struct SysinfoProbe {
    system: Mutex<System>,
}

impl SysinfoProbe {
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for SysinfoProbe {
    fn is_alive(&self, pid: ProcessId) -> bool {
        let pid = Pid::from_u32(pid);
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::new(),
        );
        system.process(pid).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_process_is_alive() {
        let probe = SysinfoProbe::new();
        assert!(probe.is_alive(std::process::id()));
    }

    #[test]
    fn test_unused_pid_is_dead() {
        let probe = SysinfoProbe::new();
        assert!(!probe.is_alive(u32::MAX - 1));
    }
}
