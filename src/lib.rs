//! Launches a bundled Shiny web backend as a child process and keeps a
//! desktop shell window synchronized with its lifecycle.
//!
//! The crate owns the supervision core: bounded-retry startup, discovery of
//! the backend's listen address from its log stream, a backoff-based
//! connectivity probe against the loaded page, crash classification, and the
//! state machine the shell follows. Window creation, dialogs, and the
//! single-instance claim are collaborators of the shell package under
//! `src-tauri/`, reached only through the [`surface::DisplaySurface`] seam.

pub mod app_constants;
pub mod app_types;
pub mod backend_probe;
pub mod backend_process;
pub mod backend_readiness;
pub mod events;
pub mod launch_guard;
pub mod launch_plan;
pub mod log_bridge;
pub mod logging;
pub mod process_control;
pub mod runtime_paths;
pub mod shell_state;
pub mod supervisor;
pub mod surface;

pub use app_types::{ConnectionState, ConnectionStateCell, ShutdownFlag};
pub use backend_process::{BackendHandle, BackendLauncher, ProcessEvent, ProcessLauncher};
pub use events::{LaunchOutcome, ProgressPhase, StartupProgress, StreamChannel, SupervisorEvent};
pub use launch_plan::{resolve_launch_plan, LaunchPlan};
pub use shell_state::{ShellDirective, ShellState, ShellStateMachine};
pub use supervisor::{supervise, SupervisorContext};
pub use surface::DisplaySurface;
