//! Heuristic classification of scan series into BIDS datatypes.

pub mod engine;
pub mod error;
pub mod patterns;

pub use engine::{Matcher, Unmatched};
pub use error::MatchError;
pub use patterns::UNSPECIFIED_TASK;
