mod bus_client;
mod bus_worker;
mod stats;

pub use bus_client::*;
pub use stats::*;
