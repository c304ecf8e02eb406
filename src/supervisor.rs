use std::{future::Future, pin::Pin, sync::Mutex};

use tokio::sync::mpsc;

use crate::{
    app_constants::MAX_STARTUP_RETRIES,
    app_types::{ConnectionStateCell, ShutdownFlag},
    backend_probe,
    backend_process::{BackendHandle, BackendLauncher, ProcessEvent},
    backend_readiness::ReadinessDetector,
    events::{LaunchOutcome, ProgressPhase, StartupProgress, StreamChannel, SupervisorEvent},
    launch_plan::LaunchPlan,
    log_bridge, logging, process_control,
    surface::DisplaySurface,
};

/// Mutable launch state threaded through the supervision loop instead of
/// process-wide globals: connection progress, the shutdown flag, the pid of
/// the currently live backend, and the event channel to the shell.
pub struct SupervisorContext {
    pub connection: ConnectionStateCell,
    pub shutdown: ShutdownFlag,
    backend_pid: Mutex<Option<u32>>,
    events: mpsc::UnboundedSender<SupervisorEvent>,
}

impl SupervisorContext {
    pub fn new(events: mpsc::UnboundedSender<SupervisorEvent>) -> Self {
        Self {
            connection: ConnectionStateCell::new(),
            shutdown: ShutdownFlag::new(),
            backend_pid: Mutex::new(None),
            events,
        }
    }

    fn emit(&self, event: SupervisorEvent) {
        let _ = self.events.send(event);
    }

    fn emit_progress(&self, attempt: u32, phase: ProgressPhase) {
        self.emit(SupervisorEvent::Progress(StartupProgress { attempt, phase }));
    }

    pub fn backend_pid(&self) -> Option<u32> {
        self.backend_pid.lock().ok().and_then(|guard| *guard)
    }

    fn set_backend_pid(&self, pid: Option<u32>) {
        if let Ok(mut guard) = self.backend_pid.lock() {
            *guard = pid;
        }
    }

    /// Terminates the live backend, if any. Used by the shutdown path after
    /// the flag is set.
    pub fn terminate_backend(&self) {
        if let Some(pid) = self.backend_pid() {
            process_control::terminate_backend(pid);
        }
    }
}

/// Follow-up for an observed backend exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDisposition {
    /// Shutdown supersedes recovery; take no action.
    Ignore,
    /// Died before ever connecting; eligible for another attempt.
    Retry,
    /// Died after having been reachable; not recoverable within this run.
    Fatal,
}

pub fn classify_exit(connected: bool, shutdown: bool) -> ExitDisposition {
    if shutdown {
        ExitDisposition::Ignore
    } else if connected {
        ExitDisposition::Fatal
    } else {
        ExitDisposition::Retry
    }
}

/// Runs the bounded startup/restart loop until the launch resolves.
///
/// Attempts are strictly sequential: the next one starts only after the
/// previous attempt's process has been observed to exit. A crash after the
/// backend was reachable is never retried. Terminal outcomes are also
/// emitted on the event channel for the shell's state machine.
pub async fn supervise<L, S>(
    launcher: &L,
    surface: &S,
    plan: &LaunchPlan,
    ctx: &SupervisorContext,
    first_attempt: u32,
) -> LaunchOutcome
where
    L: BackendLauncher + ?Sized,
    S: DisplaySurface + ?Sized,
{
    let mut attempt = first_attempt;
    loop {
        if ctx.shutdown.is_set() {
            return LaunchOutcome::ShutDown;
        }
        if attempt > MAX_STARTUP_RETRIES {
            ctx.emit_progress(attempt, ProgressPhase::Failed);
            ctx.emit(SupervisorEvent::StartupExhausted { attempts: attempt });
            return LaunchOutcome::StartupExhausted { attempts: attempt };
        }
        if ctx.backend_pid().is_some() {
            // Unreachable by construction; bail out rather than spawn a
            // duplicate backend.
            logging::append_shell_log("startup attempted while a backend is still registered");
            ctx.emit(SupervisorEvent::StartupExhausted { attempts: attempt });
            return LaunchOutcome::StartupExhausted { attempts: attempt };
        }

        ctx.emit_progress(attempt, ProgressPhase::Starting);
        ctx.connection.reset();

        let handle = match launcher.launch(plan).await {
            Ok(handle) => handle,
            Err(error) => {
                logging::append_shell_log(&format!(
                    "backend spawn failed on attempt {attempt}: {error}"
                ));
                attempt += 1;
                continue;
            }
        };
        ctx.set_backend_pid(handle.pid());
        ctx.emit_progress(attempt, ProgressPhase::NotResponding);

        let (code, signal) = run_attempt(handle, surface, ctx).await;
        ctx.set_backend_pid(None);

        match classify_exit(ctx.connection.is_connected(), ctx.shutdown.is_set()) {
            ExitDisposition::Ignore => return LaunchOutcome::ShutDown,
            ExitDisposition::Retry => {
                logging::append_shell_log(&format!(
                    "backend exited before connecting (code {code:?}, signal {signal:?}); retrying"
                ));
                attempt += 1;
            }
            ExitDisposition::Fatal => {
                logging::append_shell_log(&format!(
                    "backend quit unexpectedly with code {code:?} and signal {signal:?}"
                ));
                ctx.emit(SupervisorEvent::RuntimeCrash { code, signal });
                return LaunchOutcome::RuntimeCrash { code, signal };
            }
        }
    }
}

type ProbeFuture<'a> = Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

/// Dispatches one attempt's events on a single control flow: child output
/// lines, the exit record, and the in-flight probe all multiplex here.
/// Returns the child's exit record.
async fn run_attempt<'a, S>(
    mut handle: BackendHandle,
    surface: &'a S,
    ctx: &SupervisorContext,
) -> (Option<i32>, Option<i32>)
where
    S: DisplaySurface + ?Sized,
{
    let detector = ReadinessDetector::new(ctx.connection.clone());
    let process_alive = handle.liveness();
    let mut probe: Option<ProbeFuture<'a>> = None;

    loop {
        let mut start_probe: Option<String> = None;

        tokio::select! {
            event = handle.next_event() => match event {
                Some(ProcessEvent::Line { channel, text }) => {
                    logging::append_backend_log(channel, &text);
                    if channel == StreamChannel::Stderr {
                        if let Some(listen_url) = detector.observe(&text) {
                            start_probe = Some(listen_url);
                        }
                    }
                    if ctx.connection.is_connected() {
                        log_bridge::forward_line(surface, channel, &text).await;
                    }
                }
                Some(ProcessEvent::Exited { code, signal }) => return (code, signal),
                // Stream closed without an exit record; treat as gone.
                None => return (None, None),
            },
            _ = async {
                match probe.as_mut() {
                    Some(running) => running.await,
                    None => false,
                }
            }, if probe.is_some() => {
                probe = None;
            }
        }

        if let Some(listen_url) = start_probe {
            let connection = ctx.connection.clone();
            let alive = process_alive.clone();
            let events = ctx.events.clone();
            probe = Some(Box::pin(async move {
                backend_probe::probe_until_connected(
                    surface,
                    &listen_url,
                    &connection,
                    &alive,
                    &events,
                )
                .await
            }));
        }
    }
}
