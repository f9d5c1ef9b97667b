use tether_core::{ControlAction, ControlMessage};
use tracing::{debug, warn};

use crate::bus::Subscriptions;

/// Apply one control frame to a connection's registry.
///
/// Returns the ack to send back to that connection, or `None` when the frame
/// did not mutate anything (unknown action, or a stray ack from a client).
pub fn apply_control(msg: ControlMessage, subs: &mut Subscriptions) -> Option<ControlMessage> {
    let ControlMessage::Control { action, topics } = msg else {
        warn!("Ignoring ack frame sent by a client");
        return None;
    };

    match action {
        ControlAction::Subscribe => subs.subscribe(&topics),
        ControlAction::Unsubscribe => subs.unsubscribe(&topics),
        ControlAction::Clear => subs.clear(),
        ControlAction::Unknown => {
            warn!("Ignoring control frame with unknown action");
            return None;
        }
    }

    debug!("{:?} {:?} -> {:?}", action, topics, subs.current());

    Some(ControlMessage::Ack {
        action,
        current_subscriptions: subs.current(),
    })
}
