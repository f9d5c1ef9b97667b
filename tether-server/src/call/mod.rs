mod call_tracker;
mod room_phase;
mod signaling_relay;

pub use call_tracker::*;
pub use room_phase::*;
pub use signaling_relay::*;
