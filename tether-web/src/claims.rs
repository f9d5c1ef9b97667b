use std::cell::RefCell;
use std::rc::Rc;
use tether_core::{Claim, ClaimBroadcaster, OwnershipArbiter};
use wasm_bindgen::prelude::*;
use web_sys::{BroadcastChannel, MessageEvent};

use crate::logger::Logger;

/// Channel name shared by every tab of the same origin.
pub const CLAIM_CHANNEL: &str = "tether-ownership";

/// Claims carried over a same-origin `BroadcastChannel` as JSON strings.
pub struct BroadcastChannelClaims {
    channel: Option<BroadcastChannel>,
}

impl BroadcastChannelClaims {
    /// Falls back to an unavailable broadcaster when the browser has no
    /// `BroadcastChannel`, which makes every tab an owner.
    pub fn open(name: &str) -> Self {
        match BroadcastChannel::new(name) {
            Ok(channel) => Self {
                channel: Some(channel),
            },
            Err(err) => {
                Logger::warn("BroadcastChannel unavailable; this tab owns every room");
                Logger::error(&err);
                Self { channel: None }
            }
        }
    }

    pub fn channel(&self) -> Option<&BroadcastChannel> {
        self.channel.as_ref()
    }
}

impl ClaimBroadcaster for BroadcastChannelClaims {
    fn is_available(&self) -> bool {
        self.channel.is_some()
    }

    fn post(&self, claim: &Claim) {
        let Some(channel) = &self.channel else {
            return;
        };
        match serde_json::to_string(claim) {
            Ok(text) => {
                if let Err(err) = channel.post_message(&JsValue::from_str(&text)) {
                    Logger::error(&err);
                }
            }
            Err(e) => Logger::warn(&format!("Failed to encode claim: {}", e)),
        }
    }
}

/// Ownership of rooms for one browser tab.
#[wasm_bindgen]
pub struct TabOwnership {
    arbiter: Rc<RefCell<OwnershipArbiter<BroadcastChannelClaims>>>,
    on_message: Option<Closure<dyn FnMut(MessageEvent)>>,
}

#[wasm_bindgen]
impl TabOwnership {
    #[wasm_bindgen(constructor)]
    pub fn new() -> TabOwnership {
        Self::on_channel(CLAIM_CHANNEL)
    }

    #[wasm_bindgen(js_name = onChannel)]
    pub fn on_channel(name: &str) -> TabOwnership {
        let arbiter = Rc::new(RefCell::new(OwnershipArbiter::with_broadcaster(
            BroadcastChannelClaims::open(name),
        )));

        let on_message = arbiter.borrow().broadcaster().channel().map(|channel| {
            let arbiter = arbiter.clone();
            let callback = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
                let Some(text) = event.data().as_string() else {
                    return;
                };
                match serde_json::from_str::<Claim>(&text) {
                    Ok(claim) => {
                        Logger::debug(&format!(
                            "Tab {} claimed {}",
                            claim.tab_id, claim.room_id
                        ));
                        arbiter.borrow_mut().observe(&claim);
                    }
                    Err(e) => Logger::warn(&format!("Ignoring malformed claim: {}", e)),
                }
            });
            channel.set_onmessage(Some(callback.as_ref().unchecked_ref()));
            callback
        });

        TabOwnership {
            arbiter,
            on_message,
        }
    }

    #[wasm_bindgen(js_name = tabId)]
    pub fn tab_id(&self) -> String {
        self.arbiter.borrow().tab_id().to_owned()
    }

    pub fn claim(&self, room_id: &str) {
        self.arbiter.borrow_mut().claim(room_id);
        Logger::info(&format!("Claimed {}", room_id));
    }

    #[wasm_bindgen(js_name = isOwner)]
    pub fn is_owner(&self, room_id: &str) -> bool {
        self.arbiter.borrow().is_owner(room_id)
    }

    pub fn release(&self, room_id: &str) {
        self.arbiter.borrow_mut().release(room_id);
    }
}

impl Default for TabOwnership {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TabOwnership {
    fn drop(&mut self) {
        if let Some(channel) = self.arbiter.borrow().broadcaster().channel() {
            channel.set_onmessage(None);
            channel.close();
        }
        self.on_message.take();
    }
}
