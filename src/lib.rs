//! Arena contest engine library.
//!
//! Exposes the grid model and generator, the oracle abstraction, the
//! per-round judgement pipeline and the contest state machine for use by
//! integration tests and the binary entry point.

pub mod contest;
pub mod grid;
pub mod oracle;
pub mod round;
