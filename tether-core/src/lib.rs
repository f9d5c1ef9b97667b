pub mod arbiter;
pub mod model;
pub mod utils;

pub use arbiter::{Claim, ClaimBroadcaster, NoBroadcast, OwnershipArbiter};
pub use model::*;
