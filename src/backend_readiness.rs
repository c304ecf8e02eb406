use url::Url;

use crate::{app_constants::READINESS_BANNER_PREFIX, app_types::ConnectionStateCell};

/// Watches the backend's stderr for the listen-address announcement.
///
/// The backend prints its operational banner on stderr once it starts
/// serving; the first matching line per attempt decides the probe target.
pub struct ReadinessDetector {
    connection: ConnectionStateCell,
}

impl ReadinessDetector {
    pub fn new(connection: ConnectionStateCell) -> Self {
        Self { connection }
    }

    /// Returns the announced URL the first time the banner is seen while the
    /// attempt is still disconnected. Repeated banners, and banners arriving
    /// once probing has begun, return `None` — the probe trigger is
    /// idempotent per attempt.
    pub fn observe(&self, line: &str) -> Option<String> {
        let listen_url = extract_listen_url(line)?;
        if self.connection.begin_probing() {
            Some(listen_url)
        } else {
            None
        }
    }
}

/// Extracts the URL token following the `Listening on` banner.
pub fn extract_listen_url(line: &str) -> Option<String> {
    let start = line.find(READINESS_BANNER_PREFIX)? + READINESS_BANNER_PREFIX.len();
    let token = line[start..].split_whitespace().next()?;
    let parsed = Url::parse(token).ok()?;
    match parsed.scheme() {
        "http" | "https" => Some(token.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_the_announced_url() {
        assert_eq!(
            extract_listen_url("Listening on http://127.0.0.1:9999"),
            Some("http://127.0.0.1:9999".to_string())
        );
    }

    #[test]
    fn ignores_surrounding_text() {
        assert_eq!(
            extract_listen_url("[shiny] Listening on http://127.0.0.1:3838 (open in browser)"),
            Some("http://127.0.0.1:3838".to_string())
        );
    }

    #[test]
    fn rejects_lines_without_the_banner() {
        assert_eq!(extract_listen_url("loading required packages"), None);
        assert_eq!(extract_listen_url("Listening on "), None);
    }

    #[test]
    fn rejects_non_http_tokens() {
        assert_eq!(extract_listen_url("Listening on ftp://127.0.0.1:21"), None);
        assert_eq!(extract_listen_url("Listening on port 3838"), None);
    }

    #[test]
    fn first_banner_wins_and_later_ones_are_ignored() {
        let detector = ReadinessDetector::new(ConnectionStateCell::new());

        assert_eq!(
            detector.observe("Listening on http://127.0.0.1:9999"),
            Some("http://127.0.0.1:9999".to_string())
        );
        // A duplicate banner must not start a second probe.
        assert_eq!(detector.observe("Listening on http://127.0.0.1:9999"), None);
        assert_eq!(detector.observe("Listening on http://127.0.0.1:4000"), None);
    }

    #[test]
    fn banner_after_connection_is_ignored() {
        let connection = ConnectionStateCell::new();
        connection.begin_probing();
        connection.mark_connected();

        let detector = ReadinessDetector::new(connection);
        assert_eq!(detector.observe("Listening on http://127.0.0.1:9999"), None);
    }
}
