use std::process::{Command, Stdio};

/// Terminates the backend process tree.
///
/// Windows has no graceful signal, so the whole tree is force-killed;
/// elsewhere the backend gets a TERM and is expected to wind down on its
/// own.
#[cfg(target_os = "windows")]
pub fn terminate_backend(pid: u32) {
    let _ = Command::new("taskkill")
        .args(["/pid", &pid.to_string(), "/t", "/f"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

#[cfg(not(target_os = "windows"))]
pub fn terminate_backend(pid: u32) {
    let _ = Command::new("kill")
        .args(["-TERM", &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}
