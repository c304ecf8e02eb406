use shinydesk::{
    launch_guard::{self, SecondLaunchAction, WAIT_WARNING_MESSAGE},
    logging::{append_shell_log, backend_log_path},
    shell_state::ShellState,
    ShellDirective,
};
use tauri::{AppHandle, Emitter, Manager, WebviewUrl, WebviewWindowBuilder};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};

use crate::app_runtime::ShellSupervisor;

pub const MAIN_WINDOW: &str = "main";
pub const LOADING_WINDOW: &str = "loading";
pub const FAILED_WINDOW: &str = "failed";

/// Event the loading splash listens on for supervisor progress.
pub const PROGRESS_EVENT: &str = "startup-progress";

/// Applies one state-machine directive to the real windows and dialogs.
pub fn apply_directive(app_handle: &AppHandle, directive: ShellDirective) {
    match directive {
        ShellDirective::RelayProgress(progress) => {
            if let Some(splash) = app_handle.get_webview_window(LOADING_WINDOW) {
                if let Err(error) = splash.emit(PROGRESS_EVENT, progress) {
                    append_shell_log(&format!("failed to relay startup progress: {error}"));
                }
            }
        }
        ShellDirective::CloseLoadingIndicator => {
            if let Some(splash) = app_handle.get_webview_window(LOADING_WINDOW) {
                let _ = splash.close();
            }
        }
        ShellDirective::RevealMainSurface => {
            if let Some(window) = app_handle.get_webview_window(MAIN_WINDOW) {
                let _ = window.show();
                let _ = window.set_focus();
            }
        }
        ShellDirective::ShowErrorIndicator => {
            let built = WebviewWindowBuilder::new(
                app_handle,
                FAILED_WINDOW,
                WebviewUrl::App("failed.html".into()),
            )
            .title("shinydesk")
            .inner_size(800.0, 600.0)
            .build();
            if let Err(error) = built {
                append_shell_log(&format!("failed to open the error screen: {error}"));
            }
        }
        ShellDirective::NotifyCrash { code, signal } => {
            let message = format!(
                "The Shiny backend quit unexpectedly with {}.\nCheck the logs under {}",
                exit_summary(code, signal),
                backend_log_path().display()
            );
            append_shell_log(&message);
            app_handle
                .dialog()
                .message(message)
                .title("The Shiny backend quit unexpectedly")
                .kind(MessageDialogKind::Error)
                .blocking_show();
        }
        ShellDirective::DestroyMainSurface => {
            if let Some(window) = app_handle.get_webview_window(MAIN_WINDOW) {
                let _ = window.destroy();
            }
        }
        ShellDirective::QuitApplication => {
            app_handle.exit(1);
        }
    }
}

/// Inbound signal from the single-instance plugin: someone tried to start a
/// second copy.
pub fn handle_second_launch(app_handle: &AppHandle) {
    let state = app_handle
        .try_state::<ShellSupervisor>()
        .and_then(|shell| shell.machine.lock().ok().map(|machine| machine.state()))
        .unwrap_or(ShellState::Launching);

    match launch_guard::second_launch_action(state) {
        SecondLaunchAction::ShowWaitWarning => {
            app_handle
                .dialog()
                .message(WAIT_WARNING_MESSAGE)
                .title("shinydesk")
                .kind(MessageDialogKind::Warning)
                .show(|_| {});
        }
        SecondLaunchAction::FocusExisting => {
            if let Some(window) = app_handle.get_webview_window(MAIN_WINDOW) {
                if window.is_minimized().unwrap_or(false) {
                    let _ = window.unminimize();
                }
                let _ = window.set_focus();
            }
        }
    }
}

fn exit_summary(code: Option<i32>, signal: Option<i32>) -> String {
    match (code, signal) {
        (Some(code), Some(signal)) => format!("code {code} and signal {signal}"),
        (Some(code), None) => format!("code {code}"),
        (None, Some(signal)) => format!("signal {signal}"),
        (None, None) => "no exit record".to_string(),
    }
}
