pub use tether_core::{Claim, ClaimBroadcaster, NoBroadcast, OwnershipArbiter, RoomId};

pub mod model {
    pub use tether_core::model::*;
}

pub mod utils {
    pub use tether_core::utils::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use tether_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use tether_client::*;
}

#[cfg(feature = "web")]
pub mod web {
    pub use tether_web::*;
}
