//! Integration tests for the arena engine.
//!
//! Runs whole contests against scripted oracles through the public API,
//! checks the placement properties with proptest, and drives the `arena`
//! binary end to end with a shell-script oracle.

use std::process::Command;
use std::sync::Arc;

use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use serde_json::json;

use arena_engine::contest::{AgentRegistry, Contest, ContestConfig, ContestError, ContestState};
use arena_engine::grid::{
    generate_grid, place_feature, random_position, GridError, GridFeature, GridSpec, Point, Positions,
};
use arena_engine::oracle::{OracleError, ScriptedOracle};
use arena_engine::round::{judge_round, ArenaContext, ContestRound, PlayerStatus};

/// Replays fixed unit-interval draws through `gen::<f64>()`.
struct FixedDraws {
    draws: Vec<f64>,
    next: usize,
}

impl FixedDraws {
    fn new(draws: &[f64]) -> Self {
        FixedDraws { draws: draws.to_vec(), next: 0 }
    }
}

impl RngCore for FixedDraws {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        let v = self.draws[self.next % self.draws.len()];
        self.next += 1;
        // f64 sampling keeps the top 53 bits.
        ((v * (1u64 << 53) as f64) as u64) << 11
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

// =========================================================================
// Grid scenarios
// =========================================================================

#[test]
fn required_rock_without_players() {
    let oracle = ScriptedOracle::new();
    let mut spec = GridSpec::new(10, 10, "A square arena");
    spec.required_features = vec![GridFeature::point("rock", Point::new(2, 3))];

    let grid = generate_grid(&spec, &[], &oracle, &mut SmallRng::seed_from_u64(1)).unwrap();
    let expected: Positions = [("feature:rock".to_string(), Point::new(2, 3))].into_iter().collect();
    assert_eq!(grid.features, expected);
}

#[test]
fn wall_is_rasterized_into_indexed_cells() {
    let mut positions = Positions::new();
    place_feature(&mut positions, &GridFeature::line("wall", Point::new(0, 0), Point::new(2, 0)));
    let expected: Positions = [
        ("feature:wall.0".to_string(), Point::new(0, 0)),
        ("feature:wall.1".to_string(), Point::new(1, 0)),
        ("feature:wall.2".to_string(), Point::new(2, 0)),
    ]
    .into_iter()
    .collect();
    assert_eq!(positions, expected);
}

#[test]
fn fixed_draws_place_players_in_order() {
    let oracle = ScriptedOracle::new();
    let spec = GridSpec::new(10, 10, "A square arena");
    let players = vec!["p1".to_string(), "p2".to_string()];
    let mut rng = FixedDraws::new(&[0.01, 0.02, 0.03, 0.11]);

    let grid = generate_grid(&spec, &players, &oracle, &mut rng).unwrap();
    assert_eq!(grid.features.player("p1"), Some(Point::new(0, 0)));
    assert_eq!(grid.features.player("p2"), Some(Point::new(0, 1)));
    assert_eq!(grid.features.len(), 2);
}

#[test]
fn occupied_draw_is_redrawn() {
    let mut occupied = Positions::new();
    occupied.insert("feature:rock", Point::new(0, 0));
    // First draw hits the rock, the second lands on (5, 5).
    let mut rng = FixedDraws::new(&[0.01, 0.02, 0.5, 0.5]);
    let point = random_position(10, 10, &occupied, 100, &mut rng).unwrap();
    assert_eq!(point, Point::new(5, 5));
}

#[test]
fn full_field_exhausts_placement() {
    let mut occupied = Positions::new();
    for x in 0..2 {
        for y in 0..2 {
            occupied.insert(format!("feature:block{x}{y}"), Point::new(x, y));
        }
    }
    let err = random_position(2, 2, &occupied, 40, &mut SmallRng::seed_from_u64(9)).unwrap_err();
    assert_eq!(err, GridError::PlacementExhausted { attempts: 40, width: 2, height: 2 });
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// A line writes max(|dx|, |dy|) + 1 cells including both endpoints.
    #[test]
    fn prop_line_cell_count(x0 in -20i32..20, y0 in -20i32..20, x1 in -20i32..20, y1 in -20i32..20) {
        prop_assume!((x0, y0) != (x1, y1));
        let start = Point::new(x0, y0);
        let end = Point::new(x1, y1);
        let mut positions = Positions::new();
        place_feature(&mut positions, &GridFeature::line("wall", start, end));

        let expected = (x1 - x0).abs().max((y1 - y0).abs()) as usize + 1;
        prop_assert_eq!(positions.len(), expected);
        let cells: Vec<Point> = positions.iter().map(|(_, p)| *p).collect();
        prop_assert!(cells.contains(&start));
        prop_assert!(cells.contains(&end));
    }

    /// A point feature writes exactly one key.
    #[test]
    fn prop_point_feature_single_key(x in 0i32..50, y in 0i32..50) {
        let mut positions = Positions::new();
        place_feature(&mut positions, &GridFeature::point("rock", Point::new(x, y)));
        prop_assert_eq!(positions.len(), 1);
        prop_assert_eq!(positions.get("feature:rock"), Some(Point::new(x, y)));
    }

    /// Placement never returns an occupied cell while any cell is free.
    #[test]
    fn prop_random_position_avoids_occupied(
        width in 1u32..8,
        height in 1u32..8,
        taken in proptest::collection::vec((0i32..8, 0i32..8), 0..30),
        seed in any::<u64>(),
    ) {
        let mut occupied = Positions::new();
        for (i, (x, y)) in taken.iter().enumerate() {
            let point = Point::new(x % width as i32, y % height as i32);
            occupied.insert(format!("feature:t.{i}"), point);
        }
        let free = (0..width as i32)
            .flat_map(|x| (0..height as i32).map(move |y| Point::new(x, y)))
            .filter(|p| !occupied.is_occupied(*p))
            .count();
        prop_assume!(free > 0);

        let mut rng = SmallRng::seed_from_u64(seed);
        let budget = 1_000 * (width * height) as u64;
        let point = random_position(height, width, &occupied, budget, &mut rng).unwrap();
        prop_assert!(!occupied.is_occupied(point));
        prop_assert!(point.within(width, height));
    }
}

// =========================================================================
// Judgement scenario
// =========================================================================

#[test]
fn two_verdicts_yield_two_complete_results() {
    let judge = ScriptedOracle::new();
    judge
        .on_prompt("Please judge", json!([
            {"playerId": "red", "result": "hit", "reason": "clean swing"},
            {"playerId": "blue", "result": "miss", "reason": "too slow"},
        ]))
        .on_prompt("new positions", json!({"blue": {"x": 1, "y": 1}}))
        .on_prompt("\"playerId\":\"red\"", json!({"status": "smug", "health": 100, "inventory": ["sword"]}))
        .on_prompt("\"playerId\":\"blue\"", json!({"status": "bruised", "health": 80, "inventory": []}));

    let mut round = ContestRound::default();
    for (id, x) in [("red", 0), ("blue", 4)] {
        round.status.insert(id.to_string(), PlayerStatus::fresh());
        round.positions.insert(format!("player:{id}"), Point::new(x, 0));
    }
    let ctx = ArenaContext { arena_description: "A ring", extra_instructions: "" };
    let (_, judgement) = judge_round(&judge, ctx, &round).unwrap();

    assert_eq!(judgement.results.len(), 2);
    let red = &judgement.results["red"];
    assert_eq!((red.result.as_str(), red.reason.as_str()), ("hit", "clean swing"));
    assert_eq!(red.status.inventory, vec!["sword".to_string()]);
    let blue = &judgement.results["blue"];
    assert_eq!((blue.result.as_str(), blue.reason.as_str()), ("miss", "too slow"));
    assert_eq!(blue.status.health, 80.0);
    assert_eq!(judgement.positions.player("blue"), Some(Point::new(1, 1)));
    assert_eq!(judgement.positions.player("red"), Some(Point::new(0, 0)));
}

// =========================================================================
// Full contests
// =========================================================================

/// One oracle per role, scripted to answer any number of rounds.
fn scripted_registry() -> (AgentRegistry, Arc<ScriptedOracle>) {
    let arena = Arc::new(ScriptedOracle::new());
    arena.on_prompt("contest announcer", json!("And the crowd goes wild!"));

    let judge = Arc::new(ScriptedOracle::new());
    judge
        .on_prompt("Please judge", json!([
            {"playerId": "knight", "result": "advances", "reason": "bold"},
            {"playerId": "rogue", "result": "hides", "reason": "sneaky"},
        ]))
        .on_prompt("new positions", json!({"knight": {"x": 4, "y": 4}}))
        .on_prompt("\"playerId\":\"knight\"", json!({"status": "tired", "health": 95, "inventory": []}))
        .on_prompt("\"playerId\":\"rogue\"", json!({"status": "hidden", "health": 100, "inventory": []}));

    let player = Arc::new(ScriptedOracle::new());
    player.on_prompt("You are player", json!({"action": "act", "narration": "Here I go"}));

    let mut registry = AgentRegistry::new();
    registry
        .register_shared("arena", arena.clone())
        .register_shared("judge", judge)
        .register_shared("knight", player.clone())
        .register_shared("rogue", player);
    (registry, arena)
}

fn knight_and_rogue() -> ContestConfig {
    ContestConfig {
        players: vec!["knight".to_string(), "rogue".to_string()],
        arena_description: "A castle courtyard".to_string(),
        required_features: vec![GridFeature::line("moat", Point::new(0, 9), Point::new(9, 9))],
        seed: 77,
        ..ContestConfig::default()
    }
}

#[test]
fn history_grows_by_one_per_round() {
    let (registry, _) = scripted_registry();
    let mut contest = Contest::start(knight_and_rogue(), &registry).unwrap();
    assert_eq!(contest.history().len(), 1);

    for n in 1..=4u32 {
        contest.play_round().unwrap();
        assert_eq!(contest.history().len(), n as usize + 1);
        assert_eq!(contest.round_number(), n);
    }
    assert_eq!(contest.state(), ContestState::Complete);
}

#[test]
fn completed_contest_history_is_consistent() {
    let (registry, _) = scripted_registry();
    let mut contest = Contest::start(knight_and_rogue(), &registry).unwrap();
    contest.play(2).unwrap();

    let history = contest.history();
    let setup = &history[0];
    assert_eq!(setup.arena_description, "A castle courtyard a (10x10) grid");
    assert_eq!(setup.positions.len(), 12);
    for player in ["knight", "rogue"] {
        let at = setup.positions.player(player).unwrap();
        assert!(at.y < 9, "{player} placed on the moat at {at}");
    }

    for round in &history[1..] {
        assert_eq!(round.actions.len(), 2);
        assert_eq!(round.results.len(), 2);
        assert_eq!(round.status["knight"].status, "tired");
        assert_eq!(round.positions.player("knight"), Some(Point::new(4, 4)));
        assert_eq!(round.positions.player("rogue"), setup.positions.player("rogue"));
        assert!(round.positions.contains_key("feature:moat.9"));
    }
    assert_eq!(history[1].narrative, "");
    assert_eq!(history[2].narrative, "And the crowd goes wild!");
}

#[test]
fn same_seed_same_setup() {
    let (registry, _) = scripted_registry();
    let a = Contest::start(knight_and_rogue(), &registry).unwrap();
    let b = Contest::start(knight_and_rogue(), &registry).unwrap();
    assert_eq!(a.history()[0], b.history()[0]);
}

#[test]
fn failing_player_aborts_round_without_commit() {
    let (mut registry, _) = scripted_registry();
    let flaky = ScriptedOracle::new();
    flaky.push_object(json!({"action": "act", "narration": ""}));
    flaky.push_error(OracleError::Validation("missing field `action`".to_string()));
    registry.register("rogue", flaky);

    let mut contest = Contest::start(knight_and_rogue(), &registry).unwrap();
    contest.play_round().unwrap();
    let err = contest.play_round().unwrap_err();

    assert_eq!(err, ContestError::Oracle(OracleError::Validation("missing field `action`".to_string())));
    assert_eq!(contest.state(), ContestState::Aborted);
    assert_eq!(contest.history().len(), 2);
    assert!(matches!(contest.play_round(), Err(ContestError::InvalidTransition { .. })));
}

#[test]
fn unresolvable_agent_fails_setup() {
    let (registry, _) = scripted_registry();
    let config = ContestConfig { judge: "referee".to_string(), ..knight_and_rogue() };
    let err = Contest::start(config, &registry).unwrap_err();
    assert_eq!(err, ContestError::UnknownAgent("referee".to_string()));
}

// =========================================================================
// Binary
// =========================================================================

fn arena_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_arena"))
}

fn write_config(name: &str, body: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("arena-{}-{}.json", name, std::process::id()));
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn help_lists_options() {
    let output = arena_bin().arg("--help").output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    for flag in ["--config", "--oracle-cmd", "--rounds", "--seed", "--timeout-ms", "--output"] {
        assert!(text.contains(flag), "missing {flag} in help");
    }
}

#[test]
fn invalid_config_exits_non_zero() {
    let config = write_config("invalid", r#"{"players": ["a", "a"]}"#);
    let output = arena_bin()
        .args(["--config", config.to_str().unwrap(), "--oracle-cmd", "true"])
        .output()
        .unwrap();
    let _ = std::fs::remove_file(&config);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[cfg(unix)]
#[test]
fn binary_writes_history_jsonl() {
    const ORACLE: &str = r#"input=$(cat)
case "$ARENA_ROLE" in
  arena) echo "Round over, folks." ;;
  player) echo "{\"action\": \"wait\", \"narration\": \"$ARENA_AGENT waits\"}" ;;
  judge)
    case "$input" in
      *"Please judge"*) echo '[{"playerId":"p1","result":"ok","reason":"waited"},{"playerId":"p2","result":"ok","reason":"waited"}]' ;;
      *"new positions"*) echo '```json
{"p1": {"x": 0, "y": 0}}
```' ;;
      *) echo '{"status":"calm","health":100,"inventory":[]}' ;;
    esac ;;
esac"#;

    let config = write_config(
        "run",
        r#"{"players": ["p1", "p2"], "arenaWidth": 5, "arenaHeight": 5, "seed": 3}"#,
    );
    let output = arena_bin()
        .args(["--config", config.to_str().unwrap(), "--oracle-cmd", ORACLE, "--rounds", "2"])
        .args(["--timeout-ms", "10000"])
        .output()
        .unwrap();
    let _ = std::fs::remove_file(&config);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    let rounds: Vec<ContestRound> =
        stdout.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(rounds.len(), 3);
    assert_eq!(rounds[1].actions["p2"].narration, "p2 waits");
    assert_eq!(rounds[2].results["p1"].status.status, "calm");
    assert_eq!(rounds[2].positions.player("p1"), Some(Point::new(0, 0)));
    assert_eq!(rounds[2].narrative, "Round over, folks.");
}
