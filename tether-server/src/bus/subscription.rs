use std::collections::BTreeSet;
use tether_core::utils::WILDCARD_TOPIC;

/// Topics one connection has opted into.
///
/// Empty means nothing is delivered. The reserved `"*"` topic toggles the
/// wildcard flag instead of being stored as a name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Subscriptions {
    topics: BTreeSet<String>,
    wildcard: bool,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<S: AsRef<str>>(&mut self, topics: &[S]) {
        for topic in topics {
            match topic.as_ref() {
                WILDCARD_TOPIC => self.wildcard = true,
                name => {
                    self.topics.insert(name.to_owned());
                }
            }
        }
    }

    pub fn unsubscribe<S: AsRef<str>>(&mut self, topics: &[S]) {
        for topic in topics {
            match topic.as_ref() {
                WILDCARD_TOPIC => self.wildcard = false,
                name => {
                    self.topics.remove(name);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.topics.clear();
        self.wildcard = false;
    }

    /// Sole delivery condition for a routed frame.
    pub fn matches(&self, topic: &str) -> bool {
        self.wildcard || self.topics.contains(topic)
    }

    /// Sorted snapshot, with `"*"` first when the wildcard is on.
    pub fn current(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.topics.len() + 1);
        if self.wildcard {
            out.push(WILDCARD_TOPIC.to_owned());
        }
        out.extend(self.topics.iter().cloned());
        out
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    pub fn is_empty(&self) -> bool {
        !self.wildcard && self.topics.is_empty()
    }
}
