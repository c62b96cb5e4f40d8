//! Hidden iframe launcher.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use framelink_runtime::{ContextLauncher, EmbeddedContext, Error, PeerTarget, Result};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;
use url::Url;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlIFrameElement, Window};

use crate::js::{to_js, transport_error};

/// Keeps the frame out of layout and out of sight while still loading it.
const HIDDEN_STYLE: &[(&str, &str)] = &[
    ("position", "fixed"),
    ("top", "-2000px"),
    ("left", "-2000px"),
    ("width", "1px"),
    ("height", "1px"),
    ("opacity", "0"),
    ("border", "none"),
    ("outline", "none"),
];

type Settle = Rc<RefCell<Option<oneshot::Sender<Result<()>>>>>;

fn settle(slot: &Settle, outcome: Result<()>) {
    if let Some(tx) = slot.borrow_mut().take() {
        let _ = tx.send(outcome);
    }
}

/// Mounts embedded contexts as hidden iframes appended to a document body.
pub struct IframeLauncher {
    window: Window,
    document: Document,
    ready_timeout: Option<Duration>,
}

impl IframeLauncher {
    pub fn new(window: &Window) -> Result<Self> {
        let document = window
            .document()
            .ok_or_else(|| Error::Transport("window has no document".into()))?;
        Ok(Self {
            window: window.clone(),
            document,
            ready_timeout: None,
        })
    }

    /// Fails readiness with [`Error::Timeout`] when the frame has not loaded in time.
    ///
    /// Runs on the window's timers, so it works without an async runtime.
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = Some(timeout);
        self
    }

    fn create_hidden_frame(&self) -> Result<HtmlIFrameElement> {
        let iframe: HtmlIFrameElement = self
            .document
            .create_element("iframe")
            .map_err(|err| transport_error("failed to create iframe", err))?
            .dyn_into()
            .map_err(|_| Error::Transport("created element is not an iframe".into()))?;

        let style = iframe.style();
        for (property, value) in HIDDEN_STYLE {
            style
                .set_property(property, value)
                .map_err(|err| transport_error("failed to style iframe", err))?;
        }
        Ok(iframe)
    }
}

impl ContextLauncher for IframeLauncher {
    fn mount(&self, address: &Url) -> Result<Box<dyn EmbeddedContext>> {
        let body = self
            .document
            .body()
            .ok_or_else(|| Error::Transport("document has no body".into()))?;
        let iframe = self.create_hidden_frame()?;
        let (tx, rx) = oneshot::channel();
        let slot: Settle = Rc::new(RefCell::new(Some(tx)));

        let onload = {
            let slot = Rc::clone(&slot);
            Closure::<dyn FnMut()>::new(move || settle(&slot, Ok(())))
        };
        let onerror = {
            let slot = Rc::clone(&slot);
            Closure::<dyn FnMut()>::new(move || {
                settle(&slot, Err(Error::Transport("embedded context failed to load".into())))
            })
        };
        iframe.set_onload(Some(onload.as_ref().unchecked_ref()));
        iframe.set_onerror(Some(onerror.as_ref().unchecked_ref()));

        let timer = match self.ready_timeout {
            Some(limit) => {
                let slot = Rc::clone(&slot);
                let callback = Closure::<dyn FnMut()>::new(move || settle(&slot, Err(Error::Timeout(limit))));
                let millis = i32::try_from(limit.as_millis()).unwrap_or(i32::MAX);
                let handle = self
                    .window
                    .set_timeout_with_callback_and_timeout_and_arguments_0(
                        callback.as_ref().unchecked_ref(),
                        millis,
                    )
                    .map_err(|err| transport_error("failed to arm readiness timer", err))?;
                Some(Timer { handle, _callback: callback })
            }
            None => None,
        };

        iframe.set_src(address.as_str());
        body.append_child(&iframe)
            .map_err(|err| transport_error("failed to mount iframe", err))?;

        debug!(origin = %address.origin().ascii_serialization(), "iframe mounted");
        Ok(Box::new(IframeContext {
            window: self.window.clone(),
            iframe,
            address: address.to_string(),
            ready: Some(rx),
            timer,
            _onload: onload,
            _onerror: onerror,
        }))
    }
}

struct Timer {
    handle: i32,
    _callback: Closure<dyn FnMut()>,
}

struct IframeContext {
    window: Window,
    iframe: HtmlIFrameElement,
    address: String,
    ready: Option<oneshot::Receiver<Result<()>>>,
    timer: Option<Timer>,
    _onload: Closure<dyn FnMut()>,
    _onerror: Closure<dyn FnMut()>,
}

impl IframeContext {
    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            self.window.clear_timeout_with_handle(timer.handle);
        }
    }
}

#[async_trait(?Send)]
impl EmbeddedContext for IframeContext {
    async fn ready(&mut self) -> Result<()> {
        let rx = self
            .ready
            .take()
            .ok_or_else(|| Error::Usage("iframe readiness already awaited".into()))?;
        let outcome = rx
            .await
            .unwrap_or_else(|_| Err(Error::Transport("iframe was removed before loading".into())));
        self.disarm();
        outcome
    }

    fn peer(&self) -> Rc<dyn PeerTarget> {
        Rc::new(FramePeer {
            iframe: self.iframe.clone(),
        })
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn destroy(mut self: Box<Self>) {
        self.disarm();
        self.iframe.set_onload(None);
        self.iframe.set_onerror(None);
        self.iframe.remove();
    }
}

/// Posts into an iframe's current content window.
struct FramePeer {
    iframe: HtmlIFrameElement,
}

impl PeerTarget for FramePeer {
    fn post_message(&self, message: &Value, target_origin: &str) -> Result<()> {
        let target = self
            .iframe
            .content_window()
            .ok_or_else(|| Error::Transport("embedded context has no window".into()))?;
        target
            .post_message(&to_js(message)?, target_origin)
            .map_err(|err| transport_error("postMessage failed", err))
    }
}
