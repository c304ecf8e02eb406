use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Local;

use crate::{
    app_constants::{BACKEND_LOG_FILE, SHELL_LOG_FILE},
    events::StreamChannel,
    runtime_paths,
};

/// Log files live under `<root>/logs/`; without a resolvable root they land
/// next to the executable's working directory.
pub fn resolve_log_path(root_dir: Option<PathBuf>, file_name: &str) -> PathBuf {
    match root_dir {
        Some(root) => root.join("logs").join(file_name),
        None => PathBuf::from("logs").join(file_name),
    }
}

/// Where forwarded backend output is mirrored; the crash dialog points the
/// user here.
pub fn backend_log_path() -> PathBuf {
    resolve_log_path(runtime_paths::resolve_root_dir(), BACKEND_LOG_FILE)
}

pub fn append_shell_log(message: &str) {
    let path = resolve_log_path(runtime_paths::resolve_root_dir(), SHELL_LOG_FILE);
    if let Err(error) = append_line(&path, message) {
        eprintln!("shinydesk: {error}");
    }
}

/// Mirrors one backend stream line into the backend log file.
pub fn append_backend_log(channel: StreamChannel, line: &str) {
    let tag = match channel {
        StreamChannel::Stdout => "stdout",
        StreamChannel::Stderr => "stderr",
    };
    let path = backend_log_path();
    if let Err(error) = append_line(&path, &format!("{tag}: {line}")) {
        eprintln!("shinydesk: {error}");
    }
}

fn append_line(path: &Path, message: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| {
            format!(
                "Failed to create log directory {}: {}",
                parent.display(),
                error
            )
        })?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|error| format!("Failed to open log file {}: {}", path.display(), error))?;
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    writeln!(file, "[{timestamp}] {message}")
        .map_err(|error| format!("Failed to write log file {}: {}", path.display(), error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_path_is_rooted_when_a_root_exists() {
        let path = resolve_log_path(Some(PathBuf::from("/srv/desk")), SHELL_LOG_FILE);
        assert_eq!(path, PathBuf::from("/srv/desk/logs/desktop.log"));
    }

    #[test]
    fn append_line_creates_the_directory_and_stamps_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("desktop.log");

        append_line(&path, "first").unwrap();
        append_line(&path, "second").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("first"));
        assert!(lines[1].ends_with("second"));
    }
}
