//! Round data and the per-round oracle steps.
//!
//! Covers the data model of a contest round, the player action step and
//! the judgement pipeline that turns actions into new positions,
//! statuses and a narrative.

pub mod actions;
pub mod judgement;
pub mod model;

pub use actions::{describe_round_for_player, generate_player_action, ArenaContext};
pub use judgement::{
    judge_actions, judge_round, merge_statuses, narrate_round, resolve_player_status,
    resolve_positions, resolve_statuses, Judgement,
};
pub use model::{
    ContestRound, JudgeResult, PlayerAction, PlayerResult, PlayerStatus, StatusMap,
    STARTING_HEALTH, STARTING_STATUS,
};
