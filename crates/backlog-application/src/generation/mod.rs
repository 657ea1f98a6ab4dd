//! Generation post-processing and commit.
//!
//! - `normalizer`: raw generator output to typed candidates
//! - `persistence`: selective, bounded-concurrency commit of reviewed candidates

mod normalizer;
mod persistence;

pub use normalizer::{CandidateNormalizer, candidate_id};
pub use persistence::SelectivePersistenceEngine;
