//! Round state machine.
//!
//! State flow:
//! - Setup    -> Complete   (`setup`: grid generated, round 0 recorded)
//! - Complete -> Collecting (`start_round`: fresh round from the last one)
//! - Collecting -> Judging  (`collect_actions`: one action per player)
//! - Judging  -> Judging    (`judge`: verdicts, positions, statuses)
//! - Judging  -> Complete   (`complete`: narrative; the round is appended
//!   to history)
//!
//! Any failure moves the machine to Aborted. The round in progress is
//! only appended once `complete` succeeds, so history never holds a partial
//! round. There is no terminal state; the caller decides when to stop.

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use tracing::{error, info};

use super::config::ContestConfig;
use super::registry::AgentRegistry;
use super::ContestError;
use crate::grid::generate_grid;
use crate::oracle::{Oracle, OracleError};
use crate::round::{
    generate_player_action, judge_round, narrate_round, ArenaContext, ContestRound, JudgeResult,
    PlayerStatus,
};

/// Where a contest is in its round cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContestState {
    /// Agents resolved, no grid yet.
    Setup,
    /// A round is open and collecting player actions.
    Collecting,
    /// All actions are in; awaiting judgement.
    Judging,
    /// The last round is in history; ready for the next.
    Complete,
    /// A phase failed; the contest cannot continue.
    Aborted,
}

impl fmt::Display for ContestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContestState::Setup => "setup",
            ContestState::Collecting => "collecting",
            ContestState::Judging => "judging",
            ContestState::Complete => "complete",
            ContestState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// A running contest: its agents, its history and the round in progress.
pub struct Contest {
    config: ContestConfig,
    arena: Arc<dyn Oracle>,
    judge: Arc<dyn Oracle>,
    players: Vec<(String, Arc<dyn Oracle>)>,
    state: ContestState,
    arena_description: String,
    /// Completed rounds; index 0 is the setup round.
    history: Vec<ContestRound>,
    /// Round being played, not yet in history.
    pending: Option<ContestRound>,
    /// Verdicts of the pending round once judged, kept for narration.
    verdicts: Option<Vec<JudgeResult>>,
    /// Narrative seeding the next round.
    next_narrative: String,
}

impl fmt::Debug for Contest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contest")
            .field("state", &self.state)
            .field("players", &self.player_ids())
            .field("rounds", &self.history.len())
            .finish()
    }
}

impl Contest {
    /// Resolves every agent the config names. An unknown id is fatal.
    pub fn new(config: ContestConfig, registry: &AgentRegistry) -> Result<Self, ContestError> {
        config.validate()?;
        let arena = registry.get(&config.arena)?;
        let judge = registry.get(&config.judge)?;
        let players = config
            .players
            .iter()
            .map(|id| Ok((id.clone(), registry.get(id)?)))
            .collect::<Result<Vec<_>, ContestError>>()?;

        Ok(Contest {
            arena_description: config.arena_description.clone(),
            config,
            arena,
            judge,
            players,
            state: ContestState::Setup,
            history: Vec::new(),
            pending: None,
            verdicts: None,
            next_narrative: String::new(),
        })
    }

    /// Resolves agents and runs setup with the config's seed.
    pub fn start(config: ContestConfig, registry: &AgentRegistry) -> Result<Self, ContestError> {
        let mut rng = config.rng();
        let mut contest = Contest::new(config, registry)?;
        contest.setup(&mut rng)?;
        Ok(contest)
    }

    pub fn config(&self) -> &ContestConfig {
        &self.config
    }

    pub fn state(&self) -> ContestState {
        self.state
    }

    /// Completed rounds in order; `history()[n]` is round `n`.
    pub fn history(&self) -> &[ContestRound] {
        &self.history
    }

    /// Number of the last completed round (0 after setup).
    pub fn round_number(&self) -> u32 {
        self.history.len().saturating_sub(1) as u32
    }

    pub fn last_round(&self) -> Option<&ContestRound> {
        self.history.last()
    }

    /// The round in progress, if any.
    pub fn pending_round(&self) -> Option<&ContestRound> {
        self.pending.as_ref()
    }

    /// Narrative that will seed the next round.
    pub fn next_narrative(&self) -> &str {
        &self.next_narrative
    }

    /// Description of the generated arena used in every prompt.
    pub fn arena_description(&self) -> &str {
        &self.arena_description
    }

    pub fn player_ids(&self) -> Vec<&str> {
        self.players.iter().map(|(id, _)| id.as_str()).collect()
    }

    fn expect_state(&self, expected: ContestState, operation: &'static str) -> Result<(), ContestError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ContestError::InvalidTransition { operation, state: self.state })
        }
    }

    fn abort(&mut self, err: impl Into<ContestError>) -> ContestError {
        let err = err.into();
        error!(error = %err, round = self.round_number() + 1, "contest aborted");
        self.state = ContestState::Aborted;
        self.pending = None;
        self.verdicts = None;
        err
    }

    /// Generates the grid and records round 0: initial positions and a
    /// fresh status for every player.
    pub fn setup(&mut self, rng: &mut impl Rng) -> Result<(), ContestError> {
        self.expect_state(ContestState::Setup, "set up")?;

        let player_ids: Vec<String> = self.players.iter().map(|(id, _)| id.clone()).collect();
        let spec = self.config.grid_spec();
        let grid = match generate_grid(&spec, &player_ids, self.arena.as_ref(), rng) {
            Ok(grid) => grid,
            Err(e) => return Err(self.abort(e)),
        };

        self.arena_description = grid.description;
        let round = ContestRound {
            arena_description: self.arena_description.clone(),
            positions: grid.features,
            status: player_ids.into_iter().map(|id| (id, PlayerStatus::fresh())).collect(),
            ..ContestRound::default()
        };
        info!(
            players = self.players.len(),
            positions = round.positions.len(),
            "contest set up"
        );
        self.history.push(round);
        self.state = ContestState::Complete;
        Ok(())
    }

    /// Opens the next round, carrying positions and status forward and
    /// seeding the narrative from the last judgement.
    pub fn start_round(&mut self) -> Result<u32, ContestError> {
        self.expect_state(ContestState::Complete, "start a round")?;
        let Some(last) = self.history.last() else {
            return Err(ContestError::InvalidTransition {
                operation: "start a round",
                state: self.state,
            });
        };
        let narrative = std::mem::take(&mut self.next_narrative);
        self.pending = Some(ContestRound::following(last, &self.arena_description, narrative));
        self.state = ContestState::Collecting;

        let number = self.round_number() + 1;
        info!(round = number, "round started");
        Ok(number)
    }

    /// Asks every player, in order, for an action.
    pub fn collect_actions(&mut self) -> Result<(), ContestError> {
        self.expect_state(ContestState::Collecting, "collect actions")?;
        let Some(mut round) = self.pending.take() else {
            return Err(self.abort(ContestError::InvalidTransition {
                operation: "collect actions",
                state: ContestState::Collecting,
            }));
        };

        if let Err(e) = self.gather_actions(&mut round) {
            return Err(self.abort(e));
        }
        self.pending = Some(round);
        self.state = ContestState::Judging;
        Ok(())
    }

    fn gather_actions(&self, round: &mut ContestRound) -> Result<(), OracleError> {
        let number = self.round_number() + 1;
        let extra = self.config.extra_instructions(number);
        let ctx = ArenaContext {
            arena_description: &self.arena_description,
            extra_instructions: &extra,
        };
        for (player_id, oracle) in &self.players {
            let action = generate_player_action(oracle.as_ref(), ctx, player_id, round, number)?;
            round.actions.insert(player_id.clone(), action);
        }
        Ok(())
    }

    /// Judges the collected actions: verdicts, then positions and
    /// statuses. The round stays pending until [`Contest::complete`].
    pub fn judge(&mut self) -> Result<&ContestRound, ContestError> {
        self.expect_state(ContestState::Judging, "judge")?;
        if self.verdicts.is_some() {
            return Err(ContestError::InvalidTransition { operation: "judge twice", state: self.state });
        }
        let Some(mut round) = self.pending.take() else {
            return Err(self.abort(ContestError::InvalidTransition {
                operation: "judge",
                state: ContestState::Judging,
            }));
        };

        let extra = self.config.extra_instructions(self.round_number() + 1);
        let ctx = ArenaContext {
            arena_description: &self.arena_description,
            extra_instructions: &extra,
        };
        let judged = judge_round(self.judge.as_ref(), ctx, &round);
        let (verdicts, judgement) = match judged {
            Ok(judged) => judged,
            Err(e) => return Err(self.abort(e)),
        };
        round.results = judgement.results;
        round.positions = judgement.positions;
        round.status = judgement.status;

        self.verdicts = Some(verdicts);
        let round: &ContestRound = self.pending.insert(round);
        Ok(round)
    }

    /// Narrates the judged round, appends it to history and stores the
    /// narrative for the next round.
    pub fn complete(&mut self) -> Result<&ContestRound, ContestError> {
        self.expect_state(ContestState::Judging, "complete")?;
        if self.verdicts.is_none() {
            return Err(ContestError::InvalidTransition {
                operation: "complete an unjudged round",
                state: self.state,
            });
        }
        let (Some(round), Some(verdicts)) = (self.pending.take(), self.verdicts.take()) else {
            return Err(self.abort(ContestError::InvalidTransition {
                operation: "complete",
                state: ContestState::Judging,
            }));
        };

        let extra = self.config.extra_instructions(self.round_number() + 1);
        let ctx = ArenaContext {
            arena_description: &self.arena_description,
            extra_instructions: &extra,
        };
        let narrated = narrate_round(self.arena.as_ref(), ctx, &verdicts, &round);
        let narrative = match narrated {
            Ok(narrative) => narrative,
            Err(e) => return Err(self.abort(e)),
        };

        info!(round = self.round_number() + 1, results = round.results.len(), "round complete");
        self.next_narrative = narrative;
        self.state = ContestState::Complete;
        self.history.push(round);
        self.history
            .last()
            .ok_or(ContestError::InvalidTransition { operation: "complete", state: self.state })
    }

    /// Plays one full round.
    pub fn play_round(&mut self) -> Result<&ContestRound, ContestError> {
        self.start_round()?;
        self.collect_actions()?;
        self.judge()?;
        self.complete()
    }

    /// Plays `rounds` full rounds, stopping at the first failure.
    pub fn play(&mut self, rounds: u32) -> Result<(), ContestError> {
        for _ in 0..rounds {
            self.play_round()?;
        }
        Ok(())
    }
}
