use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::frame::DataFrame;
use crate::model::peer::PeerIdentity;

/// Network reachability descriptor in the browser's `RTCIceCandidateInit` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", default)]
    pub sdp_m_line_index: Option<u16>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
        }
    }
}

/// Call signaling frames, carried as data frames on a room topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalFrame {
    /// Initiator is listening and wants a `waiting` announcement now.
    Ready { from: PeerIdentity },
    /// Responder is idle and can take a call.
    Waiting { from: PeerIdentity },
    Offer {
        from: PeerIdentity,
        sdp: String,
    },
    Answer {
        from: PeerIdentity,
        sdp: String,
    },
    Candidate {
        from: PeerIdentity,
        candidate: IceCandidate,
    },
    Hangup { from: PeerIdentity },
    /// The room already hosts a call; the offer was not admitted.
    Occupied { from: PeerIdentity },
    MuteState {
        from: PeerIdentity,
        #[serde(rename = "audioMuted")]
        audio_muted: bool,
        #[serde(rename = "videoMuted")]
        video_muted: bool,
    },
}

impl SignalFrame {
    pub fn from(&self) -> &PeerIdentity {
        match self {
            Self::Ready { from }
            | Self::Waiting { from }
            | Self::Offer { from, .. }
            | Self::Answer { from, .. }
            | Self::Candidate { from, .. }
            | Self::Hangup { from }
            | Self::Occupied { from }
            | Self::MuteState { from, .. } => from,
        }
    }

    pub fn kind(&self) -> SignalKind {
        match self {
            Self::Ready { .. } => SignalKind::Ready,
            Self::Waiting { .. } => SignalKind::Waiting,
            Self::Offer { .. } => SignalKind::Offer,
            Self::Answer { .. } => SignalKind::Answer,
            Self::Candidate { .. } => SignalKind::Candidate,
            Self::Hangup { .. } => SignalKind::Hangup,
            Self::Occupied { .. } => SignalKind::Occupied,
            Self::MuteState { .. } => SignalKind::MuteState,
        }
    }

    /// Wrap into a routable data frame on `topic`.
    pub fn to_data_frame(
        &self,
        topic: &str,
        source: &str,
    ) -> Result<DataFrame, serde_json::Error> {
        let payload = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Ok(DataFrame::new(topic, source).with_payload(payload))
    }

    pub fn from_data_frame(frame: &DataFrame) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(frame.body().clone()))
    }
}

/// Discriminator of a [`SignalFrame`], readable without decoding the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Ready,
    Waiting,
    Offer,
    Answer,
    Candidate,
    Hangup,
    Occupied,
    MuteState,
}

impl SignalKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ready" => Some(Self::Ready),
            "waiting" => Some(Self::Waiting),
            "offer" => Some(Self::Offer),
            "answer" => Some(Self::Answer),
            "candidate" => Some(Self::Candidate),
            "hangup" => Some(Self::Hangup),
            "occupied" => Some(Self::Occupied),
            "mute-state" => Some(Self::MuteState),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Waiting => "waiting",
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Candidate => "candidate",
            Self::Hangup => "hangup",
            Self::Occupied => "occupied",
            Self::MuteState => "mute-state",
        }
    }
}
