mod connection;
mod frame;
mod peer;
mod room;
mod signaling;

pub use connection::ConnectionId;
pub use frame::{ControlAction, ControlMessage, DataFrame, Frame, FrameError};
pub use peer::{PeerIdentity, PeerRole};
pub use room::RoomId;
pub use signaling::{IceCandidate, SignalFrame, SignalKind};
