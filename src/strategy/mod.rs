//! Decision support for spending power-ups.
//!
//! Everything here reads a match and never mutates it: the match worker
//! applies whatever action is finally chosen.

pub mod advisor;
pub mod memory;
pub mod probability;
pub mod registry;

pub use advisor::{advise, Advice};
pub use memory::{has_known_pair, Memory};
pub use probability::{expected_pairs_from_reveal, random_match_prob};
pub use registry::{EvalContext, HeuristicRegistry, PowerUpHeuristic, NOT_EVALUABLE};
