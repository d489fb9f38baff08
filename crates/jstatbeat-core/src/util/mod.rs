//! Utility functions for jstatbeat.

use std::process;

/// Kernel-provided host name on Linux.
const KERNEL_HOSTNAME_PATH: &str = "/proc/sys/kernel/hostname";

/// Returns the host name for event metadata.
///
/// Reads `/proc/sys/kernel/hostname`, falls back to the `hostname` command,
/// and finally to `"unknown"`.
pub fn hostname() -> String {
    if let Ok(name) = std::fs::read_to_string(KERNEL_HOSTNAME_PATH) {
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }

    process::Command::new("hostname")
        .output()
        .ok()
        .and_then(|out| {
            if out.status.success() {
                String::from_utf8(out.stdout)
                    .ok()
                    .map(|s| s.trim().to_string())
            } else {
                None
            }
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
