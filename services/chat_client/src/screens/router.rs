//! services/chat_client/src/screens/router.rs
//!
//! Maps the session state onto the screen set that should be mounted.

use chat_sync_core::domain::SessionState;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenSet {
    /// Loading indicator only; neither screen set is mounted yet.
    Splash,
    /// Login and signup.
    Auth,
    Chat,
}

pub fn select_screen(state: &SessionState) -> ScreenSet {
    match state {
        SessionState::Initializing => ScreenSet::Splash,
        SessionState::Unauthenticated => ScreenSet::Auth,
        SessionState::Authenticated(_) => ScreenSet::Chat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_sync_core::domain::Identity;

    #[test]
    fn each_state_selects_one_screen_set() {
        assert_eq!(select_screen(&SessionState::Initializing), ScreenSet::Splash);
        assert_eq!(select_screen(&SessionState::Unauthenticated), ScreenSet::Auth);
        assert_eq!(
            select_screen(&SessionState::Authenticated(Identity::new("u@x.com"))),
            ScreenSet::Chat
        );
    }
}
