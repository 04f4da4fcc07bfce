//! Contest history export.

use std::io::{self, Write};

use crate::round::ContestRound;

/// Writes rounds as JSONL (one JSON object per round, one per line).
pub fn write_history_jsonl<W: Write>(rounds: &[ContestRound], out: &mut W) -> io::Result<()> {
    for round in rounds {
        write_round_json(round, out)?;
        writeln!(out)?;
    }
    out.flush()
}

/// Writes a single round as a JSON object.
pub fn write_round_json<W: Write>(round: &ContestRound, out: &mut W) -> io::Result<()> {
    serde_json::to_writer(&mut *out, round).map_err(io::Error::from)
}
