use std::sync::Arc;

use crate::api::model::RepeatMode;
use crate::api::{ApiError, PlaybackApi, PlayerCommand};

use super::poller::{lock, SharedSession};

/// Playback controls. Every command is a single best-effort request: an
/// unauthorized response refreshes the credential, anything else is logged
/// and dropped. Nothing is retried.
pub struct Controller<A> {
    api: Arc<A>,
    session: SharedSession,
}

impl<A: PlaybackApi> Controller<A> {
    pub fn new(api: Arc<A>, session: SharedSession) -> Self {
        Self { api, session }
    }

    pub fn skip(&self) {
        self.send(PlayerCommand::Skip);
    }

    pub fn previous(&self) {
        self.send(PlayerCommand::Previous);
    }

    pub fn pause(&self) {
        self.send(PlayerCommand::Pause);
    }

    pub fn resume(&self) {
        self.send(PlayerCommand::Resume);
    }

    pub fn set_shuffle(&self, on: bool) {
        lock(&self.session).set_shuffle(on);
        self.send(PlayerCommand::Shuffle(on));
    }

    /// Seed the published repeat mode from the player. An unauthorized read
    /// refreshes the credential and reads once more; `Ok(None)` means nothing
    /// is playing and the mode is left as it was.
    pub fn load_repeat(&self) -> Result<Option<RepeatMode>, ApiError> {
        let state = match self.api.playback_state() {
            Err(ApiError::Unauthorized) => {
                log::warn!("Player state unauthorized; refreshing access token");
                self.api.refresh_credential()?;
                self.api.playback_state()?
            }
            other => other?,
        };
        let Some(state) = state else {
            return Ok(None);
        };
        lock(&self.session).set_repeat(state.repeat_state);
        Ok(Some(state.repeat_state))
    }

    /// Advance repeat through off, context and track. The published mode
    /// changes before the request goes out.
    pub fn toggle_repeat(&self) -> RepeatMode {
        let next = {
            let mut session = lock(&self.session);
            let next = session.repeat().cycled();
            session.set_repeat(next);
            next
        };
        self.send(PlayerCommand::Repeat(next));
        next
    }

    fn send(&self, command: PlayerCommand) {
        match self.api.send_command(command) {
            Ok(()) => log::debug!("Sent {:?}", command),
            Err(ApiError::Unauthorized) => {
                log::warn!("{:?} unauthorized; refreshing access token", command);
                if let Err(err) = self.api.refresh_credential() {
                    log::warn!("Token refresh failed: {}", err);
                }
            }
            Err(err) => log::debug!("{:?} failed: {}", command, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::session::Session;
    use crate::sync::testing::{playing, Calls, ScriptedApi};
    use std::sync::Mutex;

    fn controller() -> (Controller<ScriptedApi>, Arc<ScriptedApi>, SharedSession) {
        let api = Arc::new(ScriptedApi::new());
        let session = Arc::new(Mutex::new(Session::new(10)));
        (
            Controller::new(Arc::clone(&api), Arc::clone(&session)),
            api,
            session,
        )
    }

    #[test]
    fn maps_commands_to_requests() {
        let (control, api, _) = controller();
        control.skip();
        control.previous();
        control.pause();
        control.resume();
        control.set_shuffle(true);
        assert_eq!(
            *api.calls.commands.lock().unwrap(),
            vec![
                PlayerCommand::Skip,
                PlayerCommand::Previous,
                PlayerCommand::Pause,
                PlayerCommand::Resume,
                PlayerCommand::Shuffle(true),
            ]
        );
    }

    #[test]
    fn repeat_cycles_and_publishes_optimistically() {
        let (control, api, session) = controller();
        assert_eq!(control.toggle_repeat(), RepeatMode::Context);
        assert_eq!(lock(&session).repeat(), RepeatMode::Context);
        assert_eq!(control.toggle_repeat(), RepeatMode::Track);
        assert_eq!(control.toggle_repeat(), RepeatMode::Off);
        assert_eq!(
            api.calls.commands.lock().unwrap().last(),
            Some(&PlayerCommand::Repeat(RepeatMode::Off))
        );
    }

    #[test]
    fn repeat_cycles_from_the_players_mode_after_refresh() {
        let (control, api, session) = controller();
        let mut state = playing("a", 0.0);
        state.repeat_state = RepeatMode::Track;
        api.script(Err(ApiError::Unauthorized));
        api.script(Ok(Some(state)));

        assert_eq!(control.load_repeat(), Ok(Some(RepeatMode::Track)));
        assert_eq!(Calls::get(&api.calls.refresh), 1);
        assert_eq!(Calls::get(&api.calls.player), 2);
        assert_eq!(lock(&session).repeat(), RepeatMode::Track);
        assert_eq!(control.toggle_repeat(), RepeatMode::Off);
    }

    #[test]
    fn load_repeat_fails_when_refresh_fails() {
        let (control, api, session) = controller();
        api.script(Err(ApiError::Unauthorized));
        *api.refresh.lock().unwrap() = Err(ApiError::Network("down".into()));

        assert_eq!(control.load_repeat(), Err(ApiError::Network("down".into())));
        assert_eq!(Calls::get(&api.calls.player), 1);
        assert_eq!(lock(&session).repeat(), RepeatMode::Off);
    }

    #[test]
    fn unauthorized_command_refreshes_without_retry() {
        let (control, api, _) = controller();
        *api.command.lock().unwrap() = Err(ApiError::Unauthorized);
        control.skip();
        assert_eq!(Calls::get(&api.calls.refresh), 1);
        assert_eq!(api.calls.commands.lock().unwrap().len(), 1);
    }

    #[test]
    fn other_failures_are_swallowed() {
        let (control, api, _) = controller();
        *api.command.lock().unwrap() = Err(ApiError::TransientService(503));
        control.pause();
        assert_eq!(Calls::get(&api.calls.refresh), 0);
    }
}
