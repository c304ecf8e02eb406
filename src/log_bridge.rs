use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::{
    app_constants::{STDERR_INPUT_NAME, STDOUT_INPUT_NAME},
    events::StreamChannel,
    logging,
    surface::DisplaySurface,
};

/// Builds the page script delivering one backend output line as a Shiny
/// input event. The content travels base64-encoded and is decoded by `atob`
/// on the page: the script-evaluation channel cannot safely embed raw text
/// with quotes or control characters.
pub fn injection_script(channel: StreamChannel, line: &str) -> String {
    let input_name = match channel {
        StreamChannel::Stdout => STDOUT_INPUT_NAME,
        StreamChannel::Stderr => STDERR_INPUT_NAME,
    };
    let encoded = STANDARD.encode(line.as_bytes());
    format!(
        "window.Shiny.setInputValue('{input_name}', atob('{encoded}'), {{priority: \"event\"}});null;"
    )
}

/// Fire-and-forget delivery of one line into the connected page. Failures
/// are logged and never retried; they do not affect supervision.
pub async fn forward_line<S>(surface: &S, channel: StreamChannel, line: &str)
where
    S: DisplaySurface + ?Sized,
{
    if let Err(error) = surface
        .evaluate_script(&injection_script(channel, line))
        .await
    {
        logging::append_shell_log(&format!("failed to forward backend output: {error}"));
    }
}
