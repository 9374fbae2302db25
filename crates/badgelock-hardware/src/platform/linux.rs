//! systemd-logind session control through `loginctl`.

use std::time::Duration;

use tokio::process::Command;

use crate::{HardwareError, Result};

/// Session to query: the caller's own unless logind exported an id.
fn session_id() -> String {
    std::env::var("XDG_SESSION_ID").unwrap_or_else(|_| "self".to_string())
}

pub(super) async fn is_session_locked(timeout: Duration) -> Result<bool> {
    let session = session_id();
    let query = Command::new("loginctl")
        .args(["show-session", &session, "--property=LockedHint", "--value"])
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(timeout, query)
        .await
        .map_err(|_| HardwareError::timeout(timeout.as_millis() as u64))??;

    if !output.status.success() {
        return Err(HardwareError::communication(format!(
            "loginctl show-session exited with {}",
            output.status
        )));
    }

    Ok(parse_locked_hint(&String::from_utf8_lossy(&output.stdout)))
}

pub(super) async fn lock_session() -> Result<()> {
    let status = Command::new("loginctl").arg("lock-session").status().await?;

    if status.success() {
        Ok(())
    } else {
        Err(HardwareError::lock_failed(format!(
            "loginctl lock-session exited with {}",
            status
        )))
    }
}

fn parse_locked_hint(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locked_hint() {
        assert!(parse_locked_hint("yes\n"));
        assert!(!parse_locked_hint("no\n"));
        assert!(!parse_locked_hint(""));
    }
}
