mod connection;
mod control;
mod router;
mod subscription;

pub use connection::*;
pub use control::*;
pub use router::*;
pub use subscription::*;
