use std::sync::Arc;
use tether_core::{
    Claim, ClaimBroadcaster, DataFrame, NoBroadcast, OwnershipArbiter, PeerIdentity, PeerRole,
    RoomId, SignalFrame, SignalKind,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::bus::BusClient;
use crate::call::{CallInput, CallPhase, DeviceTerminator};
use crate::claims::LocalClaimHub;
use crate::config::CallConfig;
use crate::error::CallError;
use crate::peer::{PeerConnectionManager, PeerEvent, PeerFactory, PeerState};

pub type BoxedBroadcaster = Box<dyn ClaimBroadcaster + Send + Sync>;

/// Decides whether this surface may power the room's device down.
pub struct Ownership {
    arbiter: OwnershipArbiter<BoxedBroadcaster>,
    incoming: Option<broadcast::Receiver<Claim>>,
}

impl Ownership {
    /// Share claims with every other surface on `hub`.
    pub fn local(hub: &LocalClaimHub) -> Self {
        Self {
            arbiter: OwnershipArbiter::with_broadcaster(Box::new(hub.clone())),
            incoming: Some(hub.subscribe()),
        }
    }

    /// No cross-surface channel: this surface always owns.
    pub fn fail_open() -> Self {
        Self {
            arbiter: OwnershipArbiter::with_broadcaster(Box::new(NoBroadcast)),
            incoming: None,
        }
    }

    pub fn tab_id(&self) -> &str {
        self.arbiter.tab_id()
    }
}

pub struct CallOptions {
    pub config: CallConfig,
    pub ownership: Ownership,
    pub terminator: Option<Arc<dyn DeviceTerminator>>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            config: CallConfig::default(),
            ownership: Ownership::fail_open(),
            terminator: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    Phase(CallPhase),
    /// The room already hosts someone else's call.
    Occupied,
    /// No `waiting`/`answer` in time. Retry or hang up.
    NegotiationTimeout,
    RemoteMute {
        audio_muted: bool,
        video_muted: bool,
    },
    PeerState(PeerState),
    /// Another surface claimed the room.
    OwnershipLost,
    DevicePoweredOff,
    DeviceOffFailed(String),
}

#[derive(Debug)]
enum CallCommand {
    Hangup,
    Retry,
    SetMute { audio_muted: bool, video_muted: bool },
}

/// Control side of a running [`CallSession`].
#[derive(Clone)]
pub struct CallHandle {
    room_id: RoomId,
    commands: mpsc::UnboundedSender<CallCommand>,
    phase: watch::Receiver<CallPhase>,
}

impl CallHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn phase(&self) -> CallPhase {
        *self.phase.borrow()
    }

    pub fn hangup(&self) -> Result<(), CallError> {
        self.send(CallCommand::Hangup)
    }

    /// Start a fresh attempt after [`CallEvent::NegotiationTimeout`].
    pub fn retry(&self) -> Result<(), CallError> {
        self.send(CallCommand::Retry)
    }

    pub fn set_mute(&self, audio_muted: bool, video_muted: bool) -> Result<(), CallError> {
        self.send(CallCommand::SetMute {
            audio_muted,
            video_muted,
        })
    }

    pub async fn wait_for_phase(&self, wanted: CallPhase) -> Result<(), CallError> {
        let mut phase = self.phase.clone();
        phase
            .wait_for(|p| *p == wanted)
            .await
            .map(|_| ())
            .map_err(|_| CallError::Ended)
    }

    fn send(&self, cmd: CallCommand) -> Result<(), CallError> {
        self.commands.send(cmd).map_err(|_| CallError::Ended)
    }
}

/// One surface's side of a call in one room, driven over the bus.
///
/// The initiator announces `ready`, offers once the responder says
/// `waiting`, and gives up after the negotiation timeout. The responder
/// repeats `waiting` until an offer arrives, answers it, and goes back to
/// announcing after the remote hangs up.
pub struct CallSession {
    config: CallConfig,
    room_id: RoomId,
    topic: String,
    role: PeerRole,
    identity: PeerIdentity,
    bus: BusClient,
    peer: PeerConnectionManager,
    peer_events: mpsc::UnboundedReceiver<PeerEvent>,
    ownership: Ownership,
    terminator: Option<Arc<dyn DeviceTerminator>>,
    phase: CallPhase,
    phase_tx: watch::Sender<CallPhase>,
    events: mpsc::UnboundedSender<CallEvent>,
    commands: mpsc::UnboundedReceiver<CallCommand>,
    offer_sent: bool,
    /// Peer whose offer or answer we accepted for the current call.
    remote: Option<PeerIdentity>,
}

impl CallSession {
    pub fn spawn(
        bus: BusClient,
        room_id: RoomId,
        role: PeerRole,
        factory: Arc<dyn PeerFactory>,
        options: CallOptions,
    ) -> (CallHandle, mpsc::UnboundedReceiver<CallEvent>) {
        let (peer_tx, peer_events) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::unbounded_channel();
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (phase_tx, phase_rx) = watch::channel(CallPhase::Idle);

        let session = Self {
            topic: room_id.topic(&options.config.room_prefix),
            config: options.config,
            room_id: room_id.clone(),
            role,
            identity: PeerIdentity::generate(role),
            bus,
            peer: PeerConnectionManager::new(factory, peer_tx),
            peer_events,
            ownership: options.ownership,
            terminator: options.terminator,
            phase: CallPhase::Idle,
            phase_tx,
            events,
            commands,
            offer_sent: false,
            remote: None,
        };
        tokio::spawn(session.run());

        let handle = CallHandle {
            room_id,
            commands: command_tx,
            phase: phase_rx,
        };
        (handle, event_rx)
    }

    async fn run(mut self) {
        let mut frames = self.bus.frames();
        if let Err(e) = self.bus.subscribe([self.topic.clone()]) {
            error!("Cannot join {}: {}", self.topic, e);
            self.set_phase(CallPhase::Ended);
            return;
        }

        self.ownership.arbiter.claim(self.room_id.as_str());
        info!(
            "Call session {} joined {} as {}",
            self.identity,
            self.topic,
            self.role.as_str()
        );

        self.apply(CallInput::Start);
        match self.role {
            PeerRole::Initiator => self.send_signal(SignalFrame::Ready {
                from: self.identity.clone(),
            }),
            PeerRole::Responder => self.send_signal(SignalFrame::Waiting {
                from: self.identity.clone(),
            }),
        }

        let period = self.config.waiting_interval;
        let mut waiting = tokio::time::interval_at(Instant::now() + period, period);
        waiting.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = tokio::time::sleep(self.config.negotiation_timeout);
        tokio::pin!(deadline);

        while self.phase != CallPhase::Ended {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    None | Some(CallCommand::Hangup) => self.hang_up().await,
                    Some(CallCommand::Retry) => {
                        if self.retry().await {
                            deadline
                                .as_mut()
                                .reset(Instant::now() + self.config.negotiation_timeout);
                        }
                    }
                    Some(CallCommand::SetMute { audio_muted, video_muted }) => {
                        self.send_signal(SignalFrame::MuteState {
                            from: self.identity.clone(),
                            audio_muted,
                            video_muted,
                        });
                    }
                },

                frame = frames.recv() => match frame {
                    Ok(frame) if frame.topic() == self.topic => self.handle_frame(frame).await,
                    Ok(_) => {}
                    Err(RecvError::Lagged(n)) => warn!("Call session skipped {} frame(s)", n),
                    Err(RecvError::Closed) => {
                        warn!("Bus closed under call session");
                        self.peer.reset().await;
                        self.set_phase(CallPhase::Ended);
                    }
                },

                Some(event) = self.peer_events.recv() => self.handle_peer_event(event),

                _ = waiting.tick(), if self.phase == CallPhase::Announcing => {
                    self.send_signal(SignalFrame::Waiting { from: self.identity.clone() });
                }

                _ = &mut deadline, if self.phase.is_negotiating() => {
                    warn!("No answer in {} within {:?}", self.topic, self.config.negotiation_timeout);
                    if self.apply(CallInput::Timeout) {
                        self.emit(CallEvent::NegotiationTimeout);
                    }
                }

                claim = next_claim(self.ownership.incoming.as_mut()) => self.on_claim(claim),
            }
        }

        let _ = self.bus.unsubscribe([self.topic.clone()]);
        info!("Call session {} left {}", self.identity, self.topic);
    }

    async fn handle_frame(&mut self, frame: DataFrame) {
        let signal = match SignalFrame::from_data_frame(&frame) {
            Ok(signal) => signal,
            Err(e) => {
                debug!("Ignoring non-signal frame on {}: {}", self.topic, e);
                return;
            }
        };
        let from = signal.from().clone();
        if from == self.identity {
            return;
        }
        let bound_only = matches!(
            signal.kind(),
            SignalKind::Candidate | SignalKind::Hangup | SignalKind::MuteState
        );
        if bound_only && self.remote.as_ref() != Some(&from) {
            debug!(
                "Ignoring {} from {}, not our remote peer",
                signal.kind().as_str(),
                from
            );
            return;
        }

        match signal {
            SignalFrame::Ready { .. } => {
                if self.phase == CallPhase::Announcing {
                    self.send_signal(SignalFrame::Waiting {
                        from: self.identity.clone(),
                    });
                }
            }

            SignalFrame::Waiting { .. } => {
                if self.apply(CallInput::PeerWaiting) {
                    self.send_offer().await;
                }
            }

            SignalFrame::Offer { sdp, .. } => {
                if self.phase.next(self.role, CallInput::OfferReceived).is_none() {
                    debug!("Ignoring offer while {:?}", self.phase);
                    return;
                }
                if self.remote.as_ref().is_some_and(|remote| remote != &from) {
                    debug!("Ignoring offer from {} during a call with another peer", from);
                    return;
                }
                match self.peer.handle_offer(&sdp).await {
                    Ok(answer) => {
                        self.send_signal(SignalFrame::Answer {
                            from: self.identity.clone(),
                            sdp: answer,
                        });
                        self.remote = Some(from);
                        self.apply(CallInput::OfferReceived);
                    }
                    Err(e) => {
                        warn!("Failed to answer offer: {}", e);
                        self.peer.reset().await;
                    }
                }
            }

            SignalFrame::Answer { sdp, .. } => {
                if self.phase.next(self.role, CallInput::AnswerReceived).is_none() {
                    debug!("Ignoring answer while {:?}", self.phase);
                    return;
                }
                match self.peer.handle_answer(&sdp).await {
                    Ok(()) => {
                        self.remote = Some(from);
                        self.apply(CallInput::AnswerReceived);
                    }
                    Err(e) => warn!("Failed to apply answer: {}", e),
                }
            }

            SignalFrame::Candidate { candidate, .. } => {
                if let Err(e) = self.peer.add_ice_candidate(candidate).await {
                    warn!("Failed to add remote candidate: {}", e);
                }
            }

            SignalFrame::Hangup { .. } => self.on_remote_hangup().await,

            SignalFrame::Occupied { .. } => {
                if self.apply(CallInput::Occupied) {
                    info!("Room {} is occupied", self.room_id);
                    self.emit(CallEvent::Occupied);
                    self.remote = None;
                    self.peer.reset().await;
                }
            }

            SignalFrame::MuteState {
                audio_muted,
                video_muted,
                ..
            } => self.emit(CallEvent::RemoteMute {
                audio_muted,
                video_muted,
            }),
        }
    }

    fn handle_peer_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::LocalCandidate(candidate) => self.send_signal(SignalFrame::Candidate {
                from: self.identity.clone(),
                candidate,
            }),
            PeerEvent::StateChanged(state) => {
                self.peer.observe_state(state);
                self.emit(CallEvent::PeerState(state));
            }
        }
    }

    async fn send_offer(&mut self) {
        match self.peer.create_offer().await {
            Ok(sdp) => {
                self.offer_sent = true;
                self.send_signal(SignalFrame::Offer {
                    from: self.identity.clone(),
                    sdp,
                });
            }
            Err(e) => warn!("Failed to create offer: {}", e),
        }
    }

    async fn on_remote_hangup(&mut self) {
        let Some(next) = self.phase.next(self.role, CallInput::RemoteHangup) else {
            debug!("Ignoring hangup while {:?}", self.phase);
            return;
        };
        info!("Remote hung up in {}", self.room_id);
        self.peer.reset().await;
        self.offer_sent = false;
        self.remote = None;
        self.set_phase(next);
        if next == CallPhase::Ended {
            self.terminate(false).await;
        }
    }

    async fn hang_up(&mut self) {
        let had_call = self.offer_sent || self.phase == CallPhase::InCall;
        if had_call {
            self.send_signal(SignalFrame::Hangup {
                from: self.identity.clone(),
            });
        }
        self.peer.reset().await;
        self.remote = None;
        self.apply(CallInput::LocalHangup);
        // Our own hangup may still be in flight to the relay.
        self.terminate(had_call).await;
    }

    async fn retry(&mut self) -> bool {
        if self.phase.next(self.role, CallInput::Retry).is_none() {
            debug!("Ignoring retry while {:?}", self.phase);
            return false;
        }
        if self.offer_sent {
            self.send_signal(SignalFrame::Hangup {
                from: self.identity.clone(),
            });
        }
        self.peer.reset().await;
        self.offer_sent = false;
        self.remote = None;
        self.identity = PeerIdentity::generate(self.role);
        self.apply(CallInput::Retry);
        self.send_signal(SignalFrame::Ready {
            from: self.identity.clone(),
        });
        true
    }

    async fn terminate(&mut self, force: bool) {
        let room = self.room_id.as_str();
        let owner = self.ownership.arbiter.is_owner(room);
        self.ownership.arbiter.release(room);

        let Some(terminator) = self.terminator.clone() else {
            return;
        };
        if !owner {
            info!("Another surface owns {}; leaving device on", self.room_id);
            return;
        }

        match terminator.power_off(&self.room_id, force).await {
            Ok(()) => self.emit(CallEvent::DevicePoweredOff),
            Err(e) => {
                warn!("Could not power off {}: {}", self.room_id, e);
                self.emit(CallEvent::DeviceOffFailed(e.to_string()));
            }
        }
    }

    fn on_claim(&mut self, claim: Result<Claim, RecvError>) {
        match claim {
            Ok(claim) => {
                let room = self.room_id.as_str();
                let was_owner = self.ownership.arbiter.is_owner(room);
                self.ownership.arbiter.observe(&claim);
                if was_owner && !self.ownership.arbiter.is_owner(room) {
                    info!("Tab {} took over {}", claim.tab_id, room);
                    self.emit(CallEvent::OwnershipLost);
                }
            }
            Err(RecvError::Lagged(n)) => warn!("Missed {} ownership claim(s)", n),
            Err(RecvError::Closed) => self.ownership.incoming = None,
        }
    }

    fn apply(&mut self, input: CallInput) -> bool {
        match self.phase.next(self.role, input) {
            Some(next) => {
                self.set_phase(next);
                true
            }
            None => {
                debug!("{:?} does not apply while {:?}", input, self.phase);
                false
            }
        }
    }

    fn set_phase(&mut self, next: CallPhase) {
        if self.phase == next {
            return;
        }
        info!("Call in {}: {:?} -> {:?}", self.room_id, self.phase, next);
        self.phase = next;
        self.phase_tx.send_replace(next);
        self.emit(CallEvent::Phase(next));
    }

    fn emit(&self, event: CallEvent) {
        let _ = self.events.send(event);
    }

    fn send_signal(&self, signal: SignalFrame) {
        let frame = match signal.to_data_frame(&self.topic, self.bus.source()) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode {} frame: {}", signal.kind().as_str(), e);
                return;
            }
        };
        if let Err(e) = self.bus.publish(&frame) {
            warn!("Failed to publish {} frame: {}", signal.kind().as_str(), e);
        }
    }
}

async fn next_claim(incoming: Option<&mut broadcast::Receiver<Claim>>) -> Result<Claim, RecvError> {
    match incoming {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
