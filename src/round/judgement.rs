//! Judgement pipeline.
//!
//! Flow for one round:
//! - `judge_actions`: one judge call producing a verdict per acting player
//! - `resolve_positions` and `resolve_statuses`, run concurrently; the
//!   status side fans out one call per verdict
//! - `narrate_round`: summary handed to the next round
//!
//! Every concurrent call works on borrowed, read-only round data and
//! results are merged by player id once all calls have returned, so
//! completion order never matters.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::actions::{to_json, ArenaContext};
use super::model::{ContestRound, JudgeResult, PlayerResult, PlayerStatus, StatusMap};
use crate::grid::{player_key, Point, Positions, FEATURE_PREFIX, PLAYER_PREFIX};
use crate::oracle::{generate, Oracle, OracleError};

/// Everything judgement produces for a round, narrative aside.
#[derive(Debug, Clone, PartialEq)]
pub struct Judgement {
    pub results: BTreeMap<String, PlayerResult>,
    pub positions: Positions,
    pub status: StatusMap,
}

/// Asks the judge for a verdict on every submitted action.
///
/// The judge is trusted to cover every player; a verdict list missing a
/// player is passed through as is.
pub fn judge_actions<O: Oracle + ?Sized>(
    judge: &O,
    ctx: ArenaContext<'_>,
    round: &ContestRound,
) -> Result<Vec<JudgeResult>, OracleError> {
    let prompt = [
        format!("This arena is \"{}\"", ctx.arena_description),
        format!("The arena notes are: {}", ctx.extra_instructions),
        format!("The current objects and players on the grid are: {}", to_json(&round.positions)),
        format!("Players have submitted the following actions: {}", to_json(&round.actions)),
        format!("Players have the following statuses: {}", to_json(&round.status)),
        "Please judge the actions for each player".to_string(),
        "Return the results in json format: \
         [{\"playerId\": <playerId>, \"result\": <result text>, \"reason\": <reason text>}]"
            .to_string(),
    ]
    .join("\n");

    let results: Vec<JudgeResult> = generate(judge, &prompt)?;
    info!(verdicts = results.len(), actions = round.actions.len(), "judge ruled");
    Ok(results)
}

/// Asks for new player positions and merges them into a copy of the
/// round's positions. Unmentioned keys are kept.
///
/// Keys without a namespace prefix are taken to be player ids. Only
/// players of the round can move: feature keys and unknown players are
/// dropped.
pub fn resolve_positions<O: Oracle + ?Sized>(
    judge: &O,
    arena_description: &str,
    judge_results: &[JudgeResult],
    round: &ContestRound,
) -> Result<Positions, OracleError> {
    let prompt = [
        format!("This arena is \"{arena_description}\""),
        format!("Previously, the arena has objects and players at {}", to_json(&round.positions)),
        format!("The judge has returned the following results: {}", to_json(&judge_results)),
        "Please generate the new positions for the players as a JSON object \
         mapping player id to {\"x\": <number>, \"y\": <number>}"
            .to_string(),
    ]
    .join("\n");

    let updates: BTreeMap<String, Point> = generate(judge, &prompt)?;
    debug!(updates = updates.len(), "position updates");

    let mut positions = round.positions.clone();
    positions.merge(
        updates
            .into_iter()
            .filter_map(|(key, point)| {
                let player_id = player_id_of(&key);
                match player_id {
                    Some(id) if round.status.contains_key(id) => Some((player_key(id), point)),
                    _ => {
                        warn!(key = %key, "position update for non-player ignored");
                        None
                    }
                }
            })
            .collect(),
    );
    Ok(positions)
}

/// Player id named by a position key, or `None` for feature keys.
fn player_id_of(key: &str) -> Option<&str> {
    if let Some(id) = key.strip_prefix(PLAYER_PREFIX) {
        Some(id)
    } else if key.starts_with(FEATURE_PREFIX) {
        None
    } else {
        Some(key)
    }
}

/// Asks for one player's complete replacement status.
pub fn resolve_player_status<O: Oracle + ?Sized>(
    judge: &O,
    judgement: &JudgeResult,
    current: &PlayerStatus,
) -> Result<PlayerResult, OracleError> {
    let prompt = [
        format!("The judge has returned the following result: {}", to_json(judgement)),
        format!("The player has the following status: {}", to_json(current)),
        "Please generate an updated status for the player in the same format as the current status"
            .to_string(),
    ]
    .join("\n");

    let status: PlayerStatus = generate(judge, &prompt)?;
    debug!(player = %judgement.player_id, status = %status.status, health = status.health, "status resolved");
    Ok(PlayerResult::new(judgement.clone(), status))
}

/// Resolves a status for every verdict concurrently.
///
/// Returns only the resolved players, keyed by id. Verdicts naming a
/// player with no prior status are skipped; merging into the full status
/// map is left to [`merge_statuses`].
pub fn resolve_statuses<O: Oracle + ?Sized>(
    judge: &O,
    judge_results: &[JudgeResult],
    round: &ContestRound,
) -> Result<BTreeMap<String, PlayerResult>, OracleError> {
    let known: Vec<(&JudgeResult, &PlayerStatus)> = judge_results
        .iter()
        .filter_map(|judgement| match round.status.get(&judgement.player_id) {
            Some(status) => Some((judgement, status)),
            None => {
                warn!(player = %judgement.player_id, "verdict for unknown player ignored");
                None
            }
        })
        .collect();

    let resolved = known
        .par_iter()
        .map(|(judgement, status)| resolve_player_status(judge, judgement, status))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(resolved
        .into_iter()
        .map(|result| (result.player_id.clone(), result))
        .collect())
}

/// Copies `prior` and overwrites the statuses of resolved players.
pub fn merge_statuses(prior: &StatusMap, resolved: &BTreeMap<String, PlayerResult>) -> StatusMap {
    let mut merged = prior.clone();
    for (player_id, result) in resolved {
        merged.insert(player_id.clone(), result.status.clone());
    }
    merged
}

/// Runs the verdict step, then positions and statuses side by side.
pub fn judge_round<O: Oracle + ?Sized>(
    judge: &O,
    ctx: ArenaContext<'_>,
    round: &ContestRound,
) -> Result<(Vec<JudgeResult>, Judgement), OracleError> {
    let verdicts = judge_actions(judge, ctx, round)?;

    let (positions, resolved) = rayon::join(
        || resolve_positions(judge, ctx.arena_description, &verdicts, round),
        || resolve_statuses(judge, &verdicts, round),
    );
    let positions = positions?;
    let results = resolved?;
    let status = merge_statuses(&round.status, &results);

    Ok((verdicts, Judgement { results, positions, status }))
}

/// Summarizes the judged round for the players of the next one.
pub fn narrate_round<O: Oracle + ?Sized>(
    arena: &O,
    ctx: ArenaContext<'_>,
    judge_results: &[JudgeResult],
    round: &ContestRound,
) -> Result<String, OracleError> {
    let prompt = [
        format!("The previous round arena description is \"{}\"", ctx.arena_description),
        format!("The arena notes are: {}", ctx.extra_instructions),
        format!("The objects and players are positioned: {}", to_json(&round.positions)),
        format!("Players have submitted the following actions: {}", to_json(&round.actions)),
        format!("The judge has returned the following results: {}", to_json(&judge_results)),
        "Please generate a narrative to give to the players in the next round, \
         summarizing the results of the previous round in a contest announcer style"
            .to_string(),
    ]
    .join("\n");

    let narrative: String = generate(arena, &prompt)?;
    info!(chars = narrative.len(), "round narrated");
    Ok(narrative)
}
