//! Native client side: bus adapter, peer connection manager and call sessions.

pub mod backoff;
pub mod bus;
pub mod call;
pub mod claims;
pub mod config;
pub mod error;
pub mod peer;

pub use backoff::BackoffPolicy;
pub use bus::*;
pub use call::*;
pub use claims::LocalClaimHub;
pub use config::{BusConfig, CallConfig};
pub use error::{BusError, CallError, NegotiationError};
pub use peer::*;
