//! Player action step.

use tracing::info;

use super::model::{ContestRound, PlayerAction, PlayerStatus};
use crate::oracle::{generate, Oracle, OracleError};

/// Shared context for a contest's prompts.
#[derive(Debug, Clone, Copy)]
pub struct ArenaContext<'a> {
    pub arena_description: &'a str,
    /// Notes for this round (the rules on round 1, empty afterwards).
    pub extra_instructions: &'a str,
}

/// Describes the situation to one player.
///
/// `round` is the round being played: it still holds the positions and
/// status carried over from the previous round, and the narrative of it.
pub fn describe_round_for_player(
    ctx: ArenaContext<'_>,
    player_id: &str,
    status: &PlayerStatus,
    round: &ContestRound,
    round_number: u32,
) -> String {
    let mut lines = vec![
        format!("This arena is: \"{}\"", ctx.arena_description),
        format!("The arena notes are: {}", ctx.extra_instructions),
        format!("The current round is {round_number}"),
        format!("You are player {player_id}"),
        format!("Your status is: {}", to_json(status)),
        format!("The objects and players on the grid are: {}", to_json(&round.positions)),
    ];
    if !round.narrative.is_empty() {
        lines.push(format!("Previously: {}", round.narrative));
    }
    lines.join("\n")
}

/// Asks a player for this round's action.
pub fn generate_player_action<O: Oracle + ?Sized>(
    player_oracle: &O,
    ctx: ArenaContext<'_>,
    player_id: &str,
    round: &ContestRound,
    round_number: u32,
) -> Result<PlayerAction, OracleError> {
    let fresh = PlayerStatus::fresh();
    let status = round.status.get(player_id).unwrap_or(&fresh);
    let prompt = [
        describe_round_for_player(ctx, player_id, status, round, round_number),
        "Please respond with your action in the following json format: \
         {\"action\": <action>, \"target\" (optional): {\"x\": <number>, \"y\": <number>}, \
         \"narration\": <narration>}"
            .to_string(),
    ]
    .join("\n");

    let action: PlayerAction = generate(player_oracle, &prompt)?;
    info!(player = %player_id, action = %action.action, "player acted");
    Ok(action)
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> String {
    // Round data is plain maps and strings; serialization cannot fail.
    serde_json::to_string(value).unwrap_or_default()
}
