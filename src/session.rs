use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::player::{PlayerSnapshot, ScenarioPlayer, Transition};

/// Stimuli the presentation layer can send to a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    Start,
    MediaEnded,
    SelectOption(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("scenario session is closed")]
    Closed,
}

/// A player running on its own task.
///
/// Commands and the auto-advance timer are handled by one loop, so they are
/// applied strictly in arrival order. Every change is published as a
/// [`PlayerSnapshot`]. Dropping the session aborts the task and with it any
/// pending timer.
pub struct ScenarioSession {
    commands: mpsc::UnboundedSender<PlayerCommand>,
    state: watch::Receiver<PlayerSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl ScenarioSession {
    /// Must be called from within a tokio runtime.
    pub fn spawn(player: ScenarioPlayer) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (tx, state) = watch::channel(player.snapshot());
        let task = tokio::spawn(drive(player, rx, tx));

        Self {
            commands,
            state,
            task: Some(task),
        }
    }

    pub fn send(&self, command: PlayerCommand) -> Result<(), SessionError> {
        self.commands.send(command).map_err(|_| SessionError::Closed)
    }

    /// A receiver that sees a new snapshot after every command or timer firing.
    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.state.clone()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.state.borrow().clone()
    }

    /// Stop accepting commands and wait for the loop to exit.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            // Replacing the sender closes the channel the loop is reading.
            let (closed, _) = mpsc::unbounded_channel();
            drop(std::mem::replace(&mut self.commands, closed));
            if let Err(e) = task.await {
                warn!("Scenario session task did not exit cleanly: {e}");
            }
        }
    }
}

impl Drop for ScenarioSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn drive(
    mut player: ScenarioPlayer,
    mut commands: mpsc::UnboundedReceiver<PlayerCommand>,
    state: watch::Sender<PlayerSnapshot>,
) {
    loop {
        let deadline = player.pending_deadline();

        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                let transition = apply(&mut player, &command);
                debug!("{command:?} -> {transition:?}");
            }
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                let transition = player.advance_if_due(Instant::now());
                debug!("Auto-advance -> {transition:?}");
            }
        }

        state.send_replace(player.snapshot());
    }

    player.cancel_pending();
    info!("Scenario session closed");
}

fn apply(player: &mut ScenarioPlayer, command: &PlayerCommand) -> Transition {
    match command {
        PlayerCommand::Start => player.start_scenario(),
        PlayerCommand::MediaEnded => player.handle_media_end(),
        PlayerCommand::SelectOption(id) => player.handle_option_select(id),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::player::PlayerConfig;
    use crate::scenario::story::cyberbullying_scenario;

    fn session() -> ScenarioSession {
        let player = ScenarioPlayer::new(Arc::new(cyberbullying_scenario()), PlayerConfig::default());
        ScenarioSession::spawn(player)
    }

    fn node_id(snapshot: &PlayerSnapshot) -> Option<&str> {
        snapshot.current_node.as_ref().map(|n| n.id.as_str())
    }

    #[tokio::test(start_paused = true)]
    async fn test_plays_through_to_choice() {
        let session = session();
        let mut state = session.subscribe();
        assert!(!state.borrow().started);

        session.send(PlayerCommand::Start).unwrap();
        state.changed().await.unwrap();
        assert_eq!(node_id(&state.borrow_and_update()), Some("A001"));

        let ended_at = Instant::now();
        session.send(PlayerCommand::MediaEnded).unwrap();
        state.changed().await.unwrap();
        assert!(state.borrow_and_update().advancing);

        // The paused clock jumps straight to the auto-advance deadline.
        state.changed().await.unwrap();
        {
            let snap = state.borrow_and_update();
            assert_eq!(node_id(&snap), Some("A002"));
            assert!(!snap.show_options);
        }
        assert!(Instant::now() >= ended_at + Duration::from_millis(2000));

        session.send(PlayerCommand::MediaEnded).unwrap();
        state.changed().await.unwrap();
        assert!(state.borrow_and_update().show_options);

        session.send(PlayerCommand::SelectOption("option_A".into())).unwrap();
        state.changed().await.unwrap();
        let snap = state.borrow_and_update().clone();
        assert_eq!(node_id(&snap), Some("A004"));
        assert!(!snap.show_options);
        assert_eq!(snap.choices_made, 1);

        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_media_end_does_not_skip() {
        let session = session();
        let mut state = session.subscribe();

        session.send(PlayerCommand::Start).unwrap();
        session.send(PlayerCommand::MediaEnded).unwrap();
        session.send(PlayerCommand::MediaEnded).unwrap();

        let snap = state
            .wait_for(|s| s.current_node.as_ref().is_some_and(|n| n.id == "A002"))
            .await
            .unwrap()
            .clone();
        assert!(!snap.advancing);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(node_id(&session.snapshot()), Some("A002"));
        assert_eq!(session.snapshot().history, ["A001", "A002"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_cancels_pending_advance() {
        let session = session();

        session.send(PlayerCommand::Start).unwrap();
        session.send(PlayerCommand::MediaEnded).unwrap();
        session.send(PlayerCommand::Start).unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        let snap = session.snapshot();
        assert_eq!(node_id(&snap), Some("A001"));
        assert_eq!(snap.history, ["A001"]);
        assert!(!snap.advancing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_after_task_gone_fails() {
        let mut session = session();
        let task = session.task.take().unwrap();
        task.abort();
        let _ = task.await;
        assert_eq!(session.send(PlayerCommand::Start), Err(SessionError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_tolerates_failed_task() {
        let session = session();
        let state = session.subscribe();
        session.send(PlayerCommand::Start).unwrap();
        if let Some(task) = session.task.as_ref() {
            task.abort();
        }

        // The join error is logged rather than propagated.
        session.shutdown().await;
        assert!(state.has_changed().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_pending_timer() {
        let session = session();
        let mut state = session.subscribe();
        session.send(PlayerCommand::Start).unwrap();
        session.send(PlayerCommand::MediaEnded).unwrap();
        state.wait_for(|s| s.advancing).await.unwrap();
        drop(session);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(node_id(&state.borrow()), Some("A001"));
    }
}
