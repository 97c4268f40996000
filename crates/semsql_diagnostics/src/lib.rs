//! Error Analyzer: classifies a failed execution's raw error, extracts the
//! offending identifier and affected table, and ranks spelling-alternative
//! candidates. Used by the Agent to build retry context; never executes
//! SQL or calls an LLM itself.

mod alias;
mod analyze;
mod edit_distance;
mod extract;
mod model;

pub use analyze::analyze;
pub use edit_distance::{closest_matches, damerau_levenshtein};
pub use model::{ErrorKind, ErrorReport};
