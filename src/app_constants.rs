/// Restart bound for backend startup; 3 retries means 4 total attempts.
pub const MAX_STARTUP_RETRIES: u32 = 3;

/// Connectivity probe iterations per attempt, `i = 0..=10`.
pub const PROBE_ITERATIONS: u32 = 11;

/// Linear backoff step between probe iterations.
pub const PROBE_BACKOFF_STEP_MS: u64 = 1000;

/// The backend announces its listen address with this banner on stderr.
pub const READINESS_BANNER_PREFIX: &str = "Listening on ";

/// Evaluated against the loaded page; truthy once the Shiny session is live.
pub const READINESS_EXPRESSION: &str = "window.Shiny.shinyapp.isConnected()";

/// Registered once per run, right after the first successful readiness
/// check, so the app can react when the desktop session goes away.
pub const EXIT_HOOK_SCRIPT: &str = "$(document).on('shiny:sessioninitialized', function(event) {\n  window.Shiny.setInputValue('TerminateOnExit', true);\n});\nnull;";

/// Shiny input names receiving forwarded backend output after connection.
pub const STDOUT_INPUT_NAME: &str = "backend_stdout";
pub const STDERR_INPUT_NAME: &str = "backend_stderr";

/// Marker the backend can read to detect it runs embedded in the shell.
pub const EMBEDDED_MARKER_ENV: &str = "SHINYDESK_CLIENT";

pub const BACKEND_CMD_ENV: &str = "SHINYDESK_BACKEND_CMD";
pub const BACKEND_CWD_ENV: &str = "SHINYDESK_BACKEND_CWD";
pub const ROOT_DIR_ENV: &str = "SHINYDESK_ROOT";
pub const APP_DIR_ENV: &str = "SHINYDESK_APP_DIR";

pub const SHELL_LOG_FILE: &str = "desktop.log";
pub const BACKEND_LOG_FILE: &str = "backend.log";
