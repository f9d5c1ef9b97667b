use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::utils::LEGACY_TOPIC;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("malformed control frame: {0}")]
    InvalidControl(serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Subscribe,
    Unsubscribe,
    Clear,
    /// Any action name the relay does not understand.
    #[serde(other)]
    Unknown,
}

/// Subscription control protocol, both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Client -> relay.
    Control {
        action: ControlAction,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        topics: Vec<String>,
    },
    /// Relay -> originating client, after every mutation.
    Ack {
        action: ControlAction,
        #[serde(rename = "currentSubscriptions")]
        current_subscriptions: Vec<String>,
    },
}

impl ControlMessage {
    pub fn subscribe<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Control {
            action: ControlAction::Subscribe,
            topics: topics.into_iter().map(Into::into).collect(),
        }
    }

    pub fn unsubscribe<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Control {
            action: ControlAction::Unsubscribe,
            topics: topics.into_iter().map(Into::into).collect(),
        }
    }

    pub fn clear() -> Self {
        Self::Control {
            action: ControlAction::Clear,
            topics: Vec::new(),
        }
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Routed payload frame: `{"topic": ..., "source": ..., ...payload}`.
///
/// The body is kept as an untyped JSON object; the bus never interprets
/// payload fields beyond `topic`, `source` and `type`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    topic: String,
    body: Map<String, Value>,
}

impl DataFrame {
    pub fn new(topic: impl Into<String>, source: impl Into<String>) -> Self {
        let topic = topic.into();
        let mut body = Map::new();
        body.insert("topic".to_owned(), Value::String(topic.clone()));
        body.insert("source".to_owned(), Value::String(source.into()));
        Self { topic, body }
    }

    /// Wrap a decoded object. A missing or non-string `topic` routes as legacy.
    pub fn from_object(body: Map<String, Value>) -> Self {
        let topic = body
            .get("topic")
            .and_then(Value::as_str)
            .unwrap_or(LEGACY_TOPIC)
            .to_owned();
        Self { topic, body }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Merge every field of `payload` into the body. `topic` is never overwritten.
    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        for (key, value) in payload {
            if key != "topic" {
                self.body.insert(key, value);
            }
        }
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        if key == "topic" {
            return;
        }
        self.body.insert(key, value.into());
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn source(&self) -> Option<&str> {
        self.body.get("source").and_then(Value::as_str)
    }

    /// The `type` discriminator, when the payload carries one.
    pub fn kind(&self) -> Option<&str> {
        self.body.get("type").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.body)
    }
}

/// Any text frame travelling over the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Control(ControlMessage),
    Data(DataFrame),
}

impl Frame {
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(body) = value else {
            return Err(FrameError::NotAnObject);
        };

        match body.get("type").and_then(Value::as_str) {
            Some("control") | Some("ack") => {
                let msg = serde_json::from_value(Value::Object(body))
                    .map_err(FrameError::InvalidControl)?;
                Ok(Frame::Control(msg))
            }
            _ => Ok(Frame::Data(DataFrame::from_object(body))),
        }
    }
}
