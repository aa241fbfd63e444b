//! Branching scenario player for a cyberbullying-awareness story.
//!
//! The story is a [`ScenarioGraph`] of video and image beats. A
//! [`ScenarioPlayer`] walks it as media finishes and choices are made, and a
//! [`ScenarioSession`] runs a player on a tokio task with its auto-advance
//! timer.

pub mod player;
pub mod scenario;
pub mod session;

pub use player::{Phase, PlayerConfig, PlayerError, PlayerSnapshot, ScenarioPlayer, Transition};
pub use scenario::{ScenarioError, ScenarioGraph, ScenarioNode, ScenarioOption};
pub use session::{PlayerCommand, ScenarioSession, SessionError};
