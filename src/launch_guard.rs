use crate::shell_state::ShellState;

/// Response to a second launch attempt while this instance holds the
/// single-instance claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondLaunchAction {
    /// Mid-shutdown: tell the user to wait, start nothing.
    ShowWaitWarning,
    /// Otherwise: restore and focus the surface that already exists.
    FocusExisting,
}

pub const WAIT_WARNING_MESSAGE: &str =
    "Please wait a moment for the application to shut down before opening it again";

/// The claim mechanics belong to the shell's single-instance plugin; only
/// the policy for the inbound signal is decided here.
pub fn second_launch_action(state: ShellState) -> SecondLaunchAction {
    match state {
        ShellState::ShuttingDown => SecondLaunchAction::ShowWaitWarning,
        _ => SecondLaunchAction::FocusExisting,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_second_launch_mid_shutdown_warns_and_starts_nothing() {
        assert_eq!(
            second_launch_action(ShellState::ShuttingDown),
            SecondLaunchAction::ShowWaitWarning
        );
    }

    #[test]
    fn a_second_launch_otherwise_focuses_the_running_instance() {
        for state in [
            ShellState::Launching,
            ShellState::Connected,
            ShellState::Error,
        ] {
            assert_eq!(
                second_launch_action(state),
                SecondLaunchAction::FocusExisting
            );
        }
    }
}
