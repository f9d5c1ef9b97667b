//! Browser-side pieces of a tether surface.

pub mod claims;
pub mod logger;

pub use claims::{BroadcastChannelClaims, CLAIM_CHANNEL, TabOwnership};
pub use logger::Logger;
