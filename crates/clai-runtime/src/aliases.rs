use std::process::Command;
use std::time::Duration;

use tracing::debug;

use clai_normalize::AliasMap;

/// Capture the alias table of a shell with a one-shot interactive
/// invocation. Failure is an empty map; alias expansion is best-effort.
pub fn capture_shell_aliases(shell: &str, timeout: Duration) -> AliasMap {
    let (tx, rx) = std::sync::mpsc::channel();
    let shell = shell.to_string();

    std::thread::Builder::new()
        .name("clai-alias-capture".to_string())
        .spawn(move || {
            let output = Command::new(&shell).args(["-ic", "alias"]).output();
            let _ = tx.send(output);
        })
        .ok();

    match rx.recv_timeout(timeout) {
        Ok(Ok(output)) if output.status.success() => {
            let text = String::from_utf8_lossy(&output.stdout);
            AliasMap::parse_alias_output(&text)
        }
        Ok(_) | Err(_) => {
            debug!("alias capture failed or timed out");
            AliasMap::default()
        }
    }
}
