// Core matching exports
pub mod coordinator;
pub mod locks;
pub mod matcher;
pub mod scoring;
pub mod store;

pub use coordinator::{CoordinatorOptions, MatchCoordinator, MatchError};
pub use locks::PairLocks;
pub use matcher::{rank_candidates, sort_and_truncate};
pub use scoring::CompatibilityScorer;
pub use store::{MatchStore, ProfileStore, StoreError};
