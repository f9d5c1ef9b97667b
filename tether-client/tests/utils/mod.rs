pub mod faulty_net;
pub mod relay_server;

pub use faulty_net::*;
pub use mock_peer::*;
pub use mock_terminator::*;
pub use relay_server::*;
