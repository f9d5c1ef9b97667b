mod call_phase;
mod call_session;
mod terminator;

pub use call_phase::*;
pub use call_session::*;
pub use terminator::*;
