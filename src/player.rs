use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use tokio::time::Instant;

use crate::scenario::{NodeType, ScenarioGraph, ScenarioNode};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// How long a caption stays up after a linear node's media ends.
    pub auto_advance_delay: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            auto_advance_delay: Duration::from_millis(2000),
        }
    }
}

// ---------------------------------------------------------------------------
// Player state
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlayerError {
    #[error("node not found: {0}")]
    UnknownNode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    /// The current node's media is on screen.
    PlayingMedia,
    /// Media finished on a linear node; `target` is entered at `due`.
    AdvancePending { target: String, due: Instant },
    /// Options of the current decision node are visible.
    AwaitingChoice,
    /// The current node is an ending and its media is done.
    Terminal,
}

/// What a stimulus did to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Moved to this node.
    Entered(String),
    OptionsShown,
    AdvanceScheduled { target: String, due: Instant },
    Ended,
    /// The stimulus did not apply in the current phase.
    Ignored,
    /// The target node does not exist; the player stays where it is.
    Stalled(String),
}

/// Read-only view of the player handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub started: bool,
    pub current_node: Option<ScenarioNode>,
    pub show_options: bool,
    pub caption: Option<String>,
    pub advancing: bool,
    pub finished: bool,
    /// Node ids visited this playthrough, in order.
    pub history: Vec<String>,
    pub choices_made: usize,
}

/// Walks a [`ScenarioGraph`] in response to "media finished" and "option
/// selected" stimuli.
///
/// The auto-advance after a linear node is kept as a deadline inside the
/// phase. Whoever drives the player calls [`ScenarioPlayer::advance_if_due`]
/// once [`ScenarioPlayer::pending_deadline`] has passed. Any other node
/// change replaces the phase, which drops the pending advance with it.
pub struct ScenarioPlayer {
    graph: Arc<ScenarioGraph>,
    config: PlayerConfig,
    started: bool,
    current_node_id: Option<String>,
    phase: Phase,
    caption: Option<String>,
    history: Vec<String>,
    choices_made: usize,
}

impl ScenarioPlayer {
    pub fn new(graph: Arc<ScenarioGraph>, config: PlayerConfig) -> Self {
        Self {
            graph,
            config,
            started: false,
            current_node_id: None,
            phase: Phase::NotStarted,
            caption: None,
            history: Vec::new(),
            choices_made: 0,
        }
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn show_options(&self) -> bool {
        self.phase == Phase::AwaitingChoice
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn current_node_id(&self) -> Option<&str> {
        self.current_node_id.as_deref()
    }

    pub fn current_node(&self) -> Option<&ScenarioNode> {
        self.current_node_id.as_deref().and_then(|id| self.graph.get(id))
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn choices_made(&self) -> usize {
        self.choices_made
    }

    pub fn graph(&self) -> &ScenarioGraph {
        &self.graph
    }

    /// Begin (or restart) the playthrough at the entry node.
    pub fn start_scenario(&mut self) -> Transition {
        if matches!(self.phase, Phase::AdvancePending { .. }) {
            debug!("Restart cancels pending auto-advance");
        }

        self.started = true;
        self.phase = Phase::NotStarted;
        self.current_node_id = None;
        self.caption = None;
        self.history.clear();
        self.choices_made = 0;

        let entry = self.graph.entry_node_id().to_string();
        info!("Scenario started. Entry node: {entry}");

        match self.go_to_node(&entry) {
            Ok(()) => Transition::Entered(entry),
            Err(_) => Transition::Stalled(entry),
        }
    }

    /// The current node's media finished playing (or the image loaded).
    pub fn handle_media_end(&mut self) -> Transition {
        if self.phase != Phase::PlayingMedia {
            debug!("Media end ignored in phase {:?}", self.phase);
            return Transition::Ignored;
        }
        let Some(node) = self.current_node() else {
            return Transition::Ignored;
        };

        match &node.node_type {
            NodeType::Decision(options) => {
                info!("Node {} awaiting choice ({} options)", node.id, options.len());
                self.phase = Phase::AwaitingChoice;
                Transition::OptionsShown
            }
            NodeType::Linear(next) => {
                let target = next.clone();
                let due = Instant::now() + self.config.auto_advance_delay;
                debug!(
                    "Auto-advance {} -> {target} in {:?}",
                    node.id, self.config.auto_advance_delay
                );
                self.phase = Phase::AdvancePending {
                    target: target.clone(),
                    due,
                };
                Transition::AdvanceScheduled { target, due }
            }
            NodeType::Terminal => {
                info!("Scenario ended at node: {}", node.id);
                self.phase = Phase::Terminal;
                Transition::Ended
            }
        }
    }

    /// The user picked one of the visible options.
    pub fn handle_option_select(&mut self, option_id: &str) -> Transition {
        if self.phase != Phase::AwaitingChoice {
            debug!("Option '{option_id}' ignored in phase {:?}", self.phase);
            return Transition::Ignored;
        }
        let Some(node) = self.current_node() else {
            return Transition::Ignored;
        };
        let Some(option) = node.option(option_id) else {
            debug!("Node {} has no option '{option_id}'", node.id);
            return Transition::Ignored;
        };

        let from = node.id.clone();
        let target = option.next_node_id.clone();
        info!("Choice: {from} -> {target} (option: {option_id})");

        match self.go_to_node(&target) {
            Ok(()) => {
                self.choices_made += 1;
                Transition::Entered(target)
            }
            Err(_) => Transition::Stalled(target),
        }
    }

    /// Move to `id` and start its media. Entering a node counts as starting
    /// the story. An unknown id is logged and leaves every piece of state as
    /// it was.
    pub fn go_to_node(&mut self, id: &str) -> Result<(), PlayerError> {
        let Some(node) = self.graph.get(id) else {
            error!(
                "Cannot go to node '{id}': not in scenario (staying on {:?})",
                self.current_node_id
            );
            return Err(PlayerError::UnknownNode(id.to_string()));
        };

        self.started = true;
        self.caption = node.caption.clone();
        self.current_node_id = Some(node.id.clone());
        self.history.push(node.id.clone());
        self.phase = Phase::PlayingMedia;
        info!("Current node: {} ({} {})", node.id, node.media.kind, node.media.source);
        Ok(())
    }

    pub fn pending_deadline(&self) -> Option<Instant> {
        match &self.phase {
            Phase::AdvancePending { due, .. } => Some(*due),
            _ => None,
        }
    }

    /// Fire the scheduled auto-advance if its deadline is at or before `now`.
    pub fn advance_if_due(&mut self, now: Instant) -> Transition {
        let target = match &self.phase {
            Phase::AdvancePending { target, due } if *due <= now => target.clone(),
            _ => return Transition::Ignored,
        };

        // Back to the pre-schedule phase so a failed advance stalls on the
        // last valid node.
        self.phase = Phase::PlayingMedia;
        match self.go_to_node(&target) {
            Ok(()) => Transition::Entered(target),
            Err(_) => Transition::Stalled(target),
        }
    }

    /// Drop a scheduled auto-advance without moving.
    pub fn cancel_pending(&mut self) {
        if let Phase::AdvancePending { target, .. } = &self.phase {
            debug!("Cancelled pending auto-advance to {target}");
            self.phase = Phase::PlayingMedia;
        }
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            started: self.started,
            current_node: self.current_node().cloned(),
            show_options: self.show_options(),
            caption: self.caption.clone(),
            advancing: matches!(self.phase, Phase::AdvancePending { .. }),
            finished: self.phase == Phase::Terminal,
            history: self.history.clone(),
            choices_made: self.choices_made,
        }
    }
}
