use serde::Serialize;

/// Startup progress phase relayed into the loading splash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPhase {
    /// A new attempt is about to spawn the backend.
    Starting,
    /// The backend is up but has not announced a listen address yet.
    NotResponding,
    /// The attempt bound was reached without ever connecting.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartupProgress {
    pub attempt: u32,
    pub phase: ProgressPhase,
}

/// Which child stream a line arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamChannel {
    Stdout,
    Stderr,
}

/// Events the supervisor emits while a launch is in flight. The shell's
/// state machine treats this stream as the sole source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SupervisorEvent {
    Progress(StartupProgress),
    /// The backend page reported a live session for the first time.
    Connected { url: String },
    /// The attempt bound was reached without ever connecting.
    StartupExhausted { attempts: u32 },
    /// The backend exited after having been reachable.
    RuntimeCrash {
        code: Option<i32>,
        signal: Option<i32>,
    },
}

/// Terminal resolution of one supervised launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    StartupExhausted { attempts: u32 },
    RuntimeCrash {
        code: Option<i32>,
        signal: Option<i32>,
    },
    /// Shutdown superseded recovery; nothing was reported to the user.
    ShutDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_phases_serialize_lowercase() {
        let json = serde_json::to_string(&StartupProgress {
            attempt: 2,
            phase: ProgressPhase::NotResponding,
        })
        .unwrap();
        assert!(json.contains("\"attempt\":2"));
        assert!(json.contains("\"notresponding\""));
    }

    #[test]
    fn supervisor_events_carry_a_type_tag() {
        let json = serde_json::to_string(&SupervisorEvent::Connected {
            url: "http://127.0.0.1:9999".to_string(),
        })
        .unwrap();
        assert!(json.contains("\"type\":\"connected\""));
        assert!(json.contains("http://127.0.0.1:9999"));
    }

    #[test]
    fn stream_channels_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&StreamChannel::Stderr).unwrap(),
            "\"stderr\""
        );
    }
}
