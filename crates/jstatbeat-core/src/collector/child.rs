//! Owned subprocess handle with guaranteed termination.

use std::process::{Child, ChildStdout};

use tracing::{debug, error};

/// Owns a spawned tool process for the length of a session.
///
/// `terminate()` kills the process if it is still running and reaps it.
/// It runs at most once in effect: later calls, and the call made from
/// `Drop`, are no-ops. Failures are logged and never returned.
pub struct ChildGuard {
    name: String,
    child: Option<Child>,
}

impl ChildGuard {
    pub fn new(name: impl Into<String>, child: Child) -> Self {
        Self {
            name: name.into(),
            child: Some(child),
        }
    }

    /// Takes the piped stdout of the child, if still available.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.as_mut().and_then(|c| c.stdout.take())
    }

    /// OS process id, or `None` once terminated.
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Kills the child if it is still running, then reaps it.
    pub fn terminate(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        let pid = child.id();

        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("{} (pid {}) already exited: {}", self.name, pid, status);
                return;
            }
            Ok(None) => {}
            Err(e) => {
                debug!("{} (pid {}): try_wait failed: {}", self.name, pid, e);
            }
        }

        if let Err(e) = child.kill() {
            error!("Error killing {} process (pid {}): {}", self.name, pid, e);
        }
        match child.wait() {
            Ok(status) => debug!("{} (pid {}) terminated: {}", self.name, pid, status),
            Err(e) => error!("Error reaping {} process (pid {}): {}", self.name, pid, e),
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::collector::ToolCommand;

    #[test]
    fn test_terminate_running_child() {
        let child = ToolCommand::new("sleep").spawn_piped(&["30"]).unwrap();
        let mut guard = ChildGuard::new("sleep", child);
        assert!(guard.id().is_some());

        guard.terminate();
        assert!(guard.id().is_none());
    }

    #[test]
    fn test_terminate_is_idempotent_on_exited_child() {
        let child = ToolCommand::new("true").spawn_piped(&[]).unwrap();
        let mut guard = ChildGuard::new("true", child);
        std::thread::sleep(std::time::Duration::from_millis(100));

        for _ in 0..5 {
            guard.terminate();
            assert!(guard.id().is_none());
        }
        assert!(guard.take_stdout().is_none());
    }

    #[test]
    fn test_drop_terminates() {
        let child = ToolCommand::new("sleep").spawn_piped(&["30"]).unwrap();
        let guard = ChildGuard::new("sleep", child);
        let pid = guard.id().unwrap();
        drop(guard);

        // Reaped: the pid no longer names our child in /proc.
        #[cfg(target_os = "linux")]
        {
            let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid));
            assert!(stat.map(|s| !s.contains("(sleep)")).unwrap_or(true));
        }
        #[cfg(not(target_os = "linux"))]
        let _ = pid;
    }
}
