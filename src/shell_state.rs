use crate::events::{StartupProgress, SupervisorEvent};

/// Shell-visible lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellState {
    /// The loading indicator is up and supervisor progress is relayed into it.
    Launching,
    /// The backend is reachable and the main surface is revealed.
    Connected,
    /// A fatal outcome is on display.
    Error,
    /// The user initiated termination; every later event is suppressed.
    ShuttingDown,
    Terminated,
}

/// Side effects the shell must apply for one transition, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellDirective {
    /// Deliver a progress update into the loading indicator.
    RelayProgress(StartupProgress),
    CloseLoadingIndicator,
    RevealMainSurface,
    /// Show the startup-failure surface; the application stays open and the
    /// user closes it manually.
    ShowErrorIndicator,
    /// Blocking crash notification carrying the exit record.
    NotifyCrash {
        code: Option<i32>,
        signal: Option<i32>,
    },
    DestroyMainSurface,
    QuitApplication,
}

/// Maps supervisor events onto shell states and the actions each transition
/// requires. Pure bookkeeping: applying the directives is the shell's job.
#[derive(Debug)]
pub struct ShellStateMachine {
    state: ShellState,
}

impl Default for ShellStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellStateMachine {
    pub fn new() -> Self {
        Self {
            state: ShellState::Launching,
        }
    }

    pub fn state(&self) -> ShellState {
        self.state
    }

    pub fn on_event(&mut self, event: &SupervisorEvent) -> Vec<ShellDirective> {
        match (self.state, event) {
            (ShellState::ShuttingDown | ShellState::Terminated, _) => Vec::new(),
            (ShellState::Launching, SupervisorEvent::Progress(progress)) => {
                vec![ShellDirective::RelayProgress(*progress)]
            }
            (ShellState::Launching, SupervisorEvent::Connected { .. }) => {
                self.state = ShellState::Connected;
                vec![
                    ShellDirective::CloseLoadingIndicator,
                    ShellDirective::RevealMainSurface,
                ]
            }
            (ShellState::Launching, SupervisorEvent::StartupExhausted { .. }) => {
                self.state = ShellState::Error;
                vec![
                    ShellDirective::CloseLoadingIndicator,
                    ShellDirective::ShowErrorIndicator,
                ]
            }
            (ShellState::Connected, SupervisorEvent::RuntimeCrash { code, signal }) => {
                self.state = ShellState::Error;
                vec![
                    ShellDirective::NotifyCrash {
                        code: *code,
                        signal: *signal,
                    },
                    ShellDirective::DestroyMainSurface,
                    ShellDirective::QuitApplication,
                ]
            }
            _ => Vec::new(),
        }
    }

    /// User-initiated termination. Once entered, `on_event` goes quiet and
    /// restarts stay suppressed via the shutdown flag the shell sets
    /// alongside this.
    pub fn begin_shutdown(&mut self) {
        if self.state != ShellState::Terminated {
            self.state = ShellState::ShuttingDown;
        }
    }

    pub fn finish_shutdown(&mut self) {
        self.state = ShellState::Terminated;
    }
}

#[cfg(test)]
mod tests {
    use crate::events::ProgressPhase;

    use super::*;

    fn progress(attempt: u32, phase: ProgressPhase) -> SupervisorEvent {
        SupervisorEvent::Progress(StartupProgress { attempt, phase })
    }

    #[test]
    fn progress_is_relayed_while_launching() {
        let mut machine = ShellStateMachine::new();
        let directives = machine.on_event(&progress(0, ProgressPhase::Starting));
        assert_eq!(
            directives,
            vec![ShellDirective::RelayProgress(StartupProgress {
                attempt: 0,
                phase: ProgressPhase::Starting,
            })]
        );
        assert_eq!(machine.state(), ShellState::Launching);
    }

    #[test]
    fn connection_reveals_the_main_surface() {
        let mut machine = ShellStateMachine::new();
        let directives = machine.on_event(&SupervisorEvent::Connected {
            url: "http://127.0.0.1:9999".to_string(),
        });
        assert_eq!(
            directives,
            vec![
                ShellDirective::CloseLoadingIndicator,
                ShellDirective::RevealMainSurface,
            ]
        );
        assert_eq!(machine.state(), ShellState::Connected);
    }

    #[test]
    fn exhausted_startup_keeps_the_application_open() {
        let mut machine = ShellStateMachine::new();
        let directives = machine.on_event(&SupervisorEvent::StartupExhausted { attempts: 4 });
        assert_eq!(machine.state(), ShellState::Error);
        assert!(directives.contains(&ShellDirective::ShowErrorIndicator));
        assert!(!directives.contains(&ShellDirective::QuitApplication));
    }

    #[test]
    fn a_crash_after_connecting_notifies_then_terminates() {
        let mut machine = ShellStateMachine::new();
        machine.on_event(&SupervisorEvent::Connected {
            url: "http://127.0.0.1:9999".to_string(),
        });

        let directives = machine.on_event(&SupervisorEvent::RuntimeCrash {
            code: Some(1),
            signal: None,
        });
        assert_eq!(
            directives,
            vec![
                ShellDirective::NotifyCrash {
                    code: Some(1),
                    signal: None,
                },
                ShellDirective::DestroyMainSurface,
                ShellDirective::QuitApplication,
            ]
        );
        assert_eq!(machine.state(), ShellState::Error);
    }

    #[test]
    fn shutdown_silences_every_later_event() {
        let mut machine = ShellStateMachine::new();
        machine.begin_shutdown();
        assert_eq!(machine.state(), ShellState::ShuttingDown);

        assert!(machine
            .on_event(&SupervisorEvent::RuntimeCrash {
                code: Some(1),
                signal: None,
            })
            .is_empty());
        assert!(machine
            .on_event(&progress(1, ProgressPhase::Starting))
            .is_empty());

        machine.finish_shutdown();
        assert_eq!(machine.state(), ShellState::Terminated);
    }

    #[test]
    fn a_crash_without_a_prior_connection_is_not_a_crash_path() {
        // The supervisor never emits RuntimeCrash while Launching, so the
        // machine drops it rather than tearing the application down.
        let mut machine = ShellStateMachine::new();
        let directives = machine.on_event(&SupervisorEvent::RuntimeCrash {
            code: Some(9),
            signal: None,
        });
        assert!(directives.is_empty());
        assert_eq!(machine.state(), ShellState::Launching);
    }
}
