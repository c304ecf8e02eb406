use std::{env, path::PathBuf};

use crate::app_constants::ROOT_DIR_ENV;

/// Root of the per-user packaged state (`~/.shinydesk`): logs, cached data,
/// anything the shell persists between runs.
pub fn default_packaged_root_dir() -> Option<PathBuf> {
    home::home_dir().map(|h| h.join(".shinydesk"))
}

/// The packaged root, honoring the `SHINYDESK_ROOT` override.
pub fn resolve_root_dir() -> Option<PathBuf> {
    root_dir_from(env::var(ROOT_DIR_ENV).ok().as_deref())
}

pub(crate) fn root_dir_from(override_value: Option<&str>) -> Option<PathBuf> {
    if let Some(raw) = override_value {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    default_packaged_root_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_takes_precedence() {
        assert_eq!(
            root_dir_from(Some("/opt/shinydesk-state")),
            Some(PathBuf::from("/opt/shinydesk-state"))
        );
    }

    #[test]
    fn blank_override_falls_back_to_the_default() {
        assert_eq!(root_dir_from(Some("   ")), default_packaged_root_dir());
        assert_eq!(root_dir_from(None), default_packaged_root_dir());
    }
}
