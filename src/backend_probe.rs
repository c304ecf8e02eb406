use std::sync::atomic::{AtomicBool, Ordering};

use tokio::{
    sync::mpsc,
    time::{sleep, Duration},
};

use crate::{
    app_constants::{
        EXIT_HOOK_SCRIPT, PROBE_BACKOFF_STEP_MS, PROBE_ITERATIONS, READINESS_EXPRESSION,
    },
    app_types::ConnectionStateCell,
    events::SupervisorEvent,
    logging,
    surface::DisplaySurface,
};

/// Delay before the connectivity check of probe iteration `i`: a linear
/// backoff so early iterations fail fast and later ones tolerate a slower
/// backend start.
pub fn backoff_delay(iteration: u32) -> Duration {
    Duration::from_millis(u64::from(iteration) * PROBE_BACKOFF_STEP_MS)
}

/// Polls the display surface until the backend page reports a live session.
///
/// Each iteration loads the announced URL, waits out the backoff, then
/// evaluates the readiness expression. Evaluation errors and falsy results
/// are expected while the server is still warming up and are swallowed
/// here. The first truthy result marks the attempt connected, announces it
/// on the event channel, registers the exit-notification hook on the page,
/// and brings the surface to the front; after that, remaining iterations do
/// nothing. Running out of iterations declares nothing; the attempt outcome
/// is decided by process exit.
///
/// Returns whether the attempt reached the connected state.
pub async fn probe_until_connected<S>(
    surface: &S,
    url: &str,
    connection: &ConnectionStateCell,
    process_alive: &AtomicBool,
    events: &mpsc::UnboundedSender<SupervisorEvent>,
) -> bool
where
    S: DisplaySurface + ?Sized,
{
    for iteration in 0..PROBE_ITERATIONS {
        if !process_alive.load(Ordering::Relaxed) {
            break;
        }
        if connection.is_connected() {
            break;
        }

        if let Err(error) = surface.load(url).await {
            logging::append_shell_log(&format!("failed to load {url}: {error}"));
        }
        sleep(backoff_delay(iteration)).await;

        match surface.evaluate_script(READINESS_EXPRESSION).await {
            Ok(value) if value.as_bool() == Some(true) => {
                if connection.mark_connected() {
                    // The follow-ups below suspend; announce first so an
                    // exit observed in between still finds the event.
                    let _ = events.send(SupervisorEvent::Connected {
                        url: url.to_string(),
                    });
                    if let Err(error) = surface.evaluate_script(EXIT_HOOK_SCRIPT).await {
                        logging::append_shell_log(&format!(
                            "failed to register the exit hook: {error}"
                        ));
                    }
                    let _ = surface.maximize().await;
                    let _ = surface.focus().await;
                }
                return true;
            }
            // Not ready yet; keep polling.
            Ok(_) | Err(_) => {}
        }
    }

    connection.is_connected()
}
