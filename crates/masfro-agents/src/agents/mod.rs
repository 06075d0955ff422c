//! Concrete agents.

pub mod flood;
pub mod hazard;
pub mod router;
pub mod scout;

pub use flood::FloodAgent;
pub use hazard::HazardAgent;
pub use router::RouterAgent;
pub use scout::{Gazetteer, RuleClassifier, ScoutAgent};
