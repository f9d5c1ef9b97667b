use thiserror::Error;

use crate::peer::{NegotiationOp, NegotiationState};

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus worker has stopped")]
    Closed,

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("cannot {op:?} while {state:?}")]
    InvalidTransition {
        state: NegotiationState,
        op: NegotiationOp,
    },

    #[error("peer transport failed: {0:#}")]
    Transport(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error("device termination vetoed: a call is still active")]
    Vetoed,

    #[error("device service request failed: {0}")]
    Device(#[from] reqwest::Error),

    #[error("device service answered with status {0}")]
    DeviceStatus(u16),

    #[error("call session has ended")]
    Ended,
}
