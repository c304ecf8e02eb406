use std::sync::{Arc, Mutex};

use shinydesk::{
    logging::append_shell_log, resolve_launch_plan, supervise, LaunchPlan, ProcessLauncher,
    ShellStateMachine, SupervisorContext, SupervisorEvent,
};
use tauri::{AppHandle, Manager, RunEvent};
use tokio::sync::mpsc;

use crate::{surface_bridge, ui_dispatch};

/// Shell-side handle on the running supervision: the context shared with the
/// supervisor task and the UI state machine its events drive.
pub struct ShellSupervisor {
    pub ctx: Arc<SupervisorContext>,
    pub machine: Mutex<ShellStateMachine>,
}

pub(crate) fn run() {
    append_shell_log("desktop shell starting");

    tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app_handle, _args, _cwd| {
            ui_dispatch::handle_second_launch(app_handle);
        }))
        .plugin(tauri_plugin_dialog::init())
        .manage(surface_bridge::EvalRegistry::default())
        .invoke_handler(tauri::generate_handler![surface_bridge::surface_eval_result])
        .setup(|app| {
            let app_handle = app.handle().clone();
            let (events_tx, events_rx) = mpsc::unbounded_channel();
            let ctx = Arc::new(SupervisorContext::new(events_tx));
            app.manage(ShellSupervisor {
                ctx: ctx.clone(),
                machine: Mutex::new(ShellStateMachine::new()),
            });

            spawn_event_pump(app_handle.clone(), events_rx);

            let resource_dir = app_handle.path().resource_dir().ok();
            match resolve_launch_plan(resource_dir.as_deref()) {
                Ok(plan) => spawn_supervisor_task(app_handle, ctx, plan),
                Err(error) => {
                    append_shell_log(&format!(
                        "failed to resolve a backend launch plan: {error}"
                    ));
                    fail_startup(&app_handle);
                }
            }
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app_handle, event| match event {
            RunEvent::ExitRequested { .. } | RunEvent::Exit => {
                shutdown(app_handle);
            }
            _ => {}
        });
}

fn spawn_supervisor_task(app_handle: AppHandle, ctx: Arc<SupervisorContext>, plan: LaunchPlan) {
    tauri::async_runtime::spawn(async move {
        let Some(window) = app_handle.get_webview_window(ui_dispatch::MAIN_WINDOW) else {
            append_shell_log("main window is unavailable; cannot start the backend");
            fail_startup(&app_handle);
            return;
        };
        let surface = surface_bridge::WebviewSurface::new(window);
        let outcome = supervise(&ProcessLauncher, &surface, &plan, &ctx, 0).await;
        append_shell_log(&format!("launch resolved: {outcome:?}"));
    });
}

/// Relays supervisor events into the state machine and applies whatever the
/// transitions demand.
fn spawn_event_pump(
    app_handle: AppHandle,
    mut events_rx: mpsc::UnboundedReceiver<SupervisorEvent>,
) {
    tauri::async_runtime::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let directives = {
                let shell = app_handle.state::<ShellSupervisor>();
                let mut machine = match shell.machine.lock() {
                    Ok(machine) => machine,
                    Err(_) => break,
                };
                machine.on_event(&event)
            };
            for directive in directives {
                ui_dispatch::apply_directive(&app_handle, directive);
            }
        }
    });
}

/// Drives the state machine to the error surface when supervision could not
/// even begin.
fn fail_startup(app_handle: &AppHandle) {
    let directives = {
        let shell = app_handle.state::<ShellSupervisor>();
        match shell.machine.lock() {
            Ok(mut machine) => machine.on_event(&SupervisorEvent::StartupExhausted { attempts: 0 }),
            Err(_) => return,
        }
    };
    for directive in directives {
        ui_dispatch::apply_directive(app_handle, directive);
    }
}

fn shutdown(app_handle: &AppHandle) {
    let Some(shell) = app_handle.try_state::<ShellSupervisor>() else {
        return;
    };
    if let Ok(mut machine) = shell.machine.lock() {
        machine.begin_shutdown();
    }
    shell.ctx.shutdown.set();
    shell.ctx.terminate_backend();
    if let Ok(mut machine) = shell.machine.lock() {
        machine.finish_shutdown();
    }
    append_shell_log("desktop shell stopped");
}
