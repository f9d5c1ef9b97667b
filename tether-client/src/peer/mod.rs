mod negotiation;
mod peer_manager;
mod peer_transport;
mod rtc;

pub use negotiation::*;
pub use peer_manager::*;
pub use peer_transport::*;
pub use rtc::*;
