use tether_core::ConnectionId;

use crate::bus::Connection;

/// Select the live connections that opted into `topic`.
pub fn route<'a, I>(topic: &str, connections: I) -> Vec<ConnectionId>
where
    I: IntoIterator<Item = &'a Connection>,
{
    connections
        .into_iter()
        .filter(|conn| conn.is_alive() && conn.subscriptions().matches(topic))
        .map(Connection::id)
        .collect()
}
