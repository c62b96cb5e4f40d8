//! The current browsing context as a framelink [`LocalContext`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use framelink_runtime::{
    next_subscription_id, InboundMessage, LocalContext, MessagePort, PeerTarget, PortListener,
    Result, SubscriptionId,
};
use serde_json::Value;
use tracing::{trace, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{MessageEvent, Window};

use crate::js::{from_js, to_js, transport_error};

/// A window and the `message` events it receives.
#[derive(Clone)]
pub struct WindowContext {
    window: Window,
}

impl WindowContext {
    pub fn new(window: Window) -> Self {
        console_error_panic_hook::set_once();
        Self { window }
    }

    /// The global `window`.
    pub fn current() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| framelink_runtime::Error::Transport("no global window".into()))?;
        Ok(Self::new(window))
    }

    pub fn window(&self) -> &Window {
        &self.window
    }
}

impl LocalContext for WindowContext {
    fn origin(&self) -> String {
        self.window
            .location()
            .origin()
            .unwrap_or_else(|_| "null".to_string())
    }

    fn launch_address(&self) -> Option<String> {
        self.window.location().href().ok()
    }

    fn port(&self) -> Rc<dyn MessagePort> {
        Rc::new(WindowPort::new(self.window.clone()))
    }

    fn parent(&self) -> Option<Rc<dyn PeerTarget>> {
        let parent = self.window.parent().ok().flatten()?;
        // A top-level window is its own parent.
        if AsRef::<JsValue>::as_ref(&parent) == AsRef::<JsValue>::as_ref(&self.window) {
            return None;
        }
        Some(Rc::new(WindowPeer { target: parent }))
    }
}

type MessageClosure = Closure<dyn FnMut(MessageEvent)>;

/// `message` event subscriptions on one window.
///
/// Each subscription owns its JS closure; unsubscribing removes the event
/// listener and frees the closure.
pub struct WindowPort {
    window: Window,
    handlers: RefCell<HashMap<SubscriptionId, MessageClosure>>,
}

impl WindowPort {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            handlers: RefCell::new(HashMap::new()),
        }
    }

    fn detach(&self, closure: &MessageClosure) {
        if let Err(err) = self
            .window
            .remove_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
        {
            warn!(error = ?err, "failed to remove message listener");
        }
    }
}

impl MessagePort for WindowPort {
    fn subscribe(&self, listener: PortListener) -> SubscriptionId {
        let id = next_subscription_id();
        let closure = MessageClosure::new(move |event: MessageEvent| {
            let Some(data) = from_js(event.data()) else {
                trace!(origin = %event.origin(), "ignoring message that is not JSON");
                return;
            };
            listener(&InboundMessage::new(event.origin(), data));
        });

        match self
            .window
            .add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
        {
            Ok(()) => {
                self.handlers.borrow_mut().insert(id, closure);
            }
            Err(err) => warn!(error = ?err, "failed to add message listener"),
        }
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let removed = self.handlers.borrow_mut().remove(&id);
        if let Some(closure) = removed {
            self.detach(&closure);
        }
    }
}

impl Drop for WindowPort {
    fn drop(&mut self) {
        for (_, closure) in self.handlers.take() {
            self.detach(&closure);
        }
    }
}

/// Posts to another window, such as `window.parent`.
pub(crate) struct WindowPeer {
    target: Window,
}

impl PeerTarget for WindowPeer {
    fn post_message(&self, message: &Value, target_origin: &str) -> Result<()> {
        self.target
            .post_message(&to_js(message)?, target_origin)
            .map_err(|err| transport_error("postMessage failed", err))
    }
}
