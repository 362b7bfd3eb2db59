// WebSocket transport and URL derivation
use wasm_bindgen::prelude::*;
use web_sys::{BinaryType, CloseEvent, MessageEvent, WebSocket};
use js_sys::{ArrayBuffer, Uint8Array};

pub mod state;

pub use state::{Action, ConnectionManager, ConnectionState, TransportEvent};

/// Build the socket URL for a page served from `page_protocol`//`host`.
///
/// `page_protocol` is `location.protocol`, e.g. `"https:"`.
pub fn socket_url(page_protocol: &str, host: &str, path: &str) -> String {
    let scheme = if page_protocol == "https:" { "wss" } else { "ws" };
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    format!("{scheme}://{host}{path}")
}

/// Socket URL on the current page's own origin.
pub fn page_socket_url(path: &str) -> Result<String, JsValue> {
    let location = web_sys::window().ok_or("No window")?.location();
    Ok(socket_url(&location.protocol()?, &location.host()?, path))
}

type MessageHandler = Closure<dyn FnMut(MessageEvent)>;
type SignalHandler = Closure<dyn FnMut(JsValue)>;
type CloseHandler = Closure<dyn FnMut(CloseEvent)>;

/// One WebSocket plus the callbacks bound to it.
///
/// Callbacks only forward [`TransportEvent`]s tagged with this transport's
/// epoch; the handlers live as long as the transport does.
pub struct Transport {
    ws: WebSocket,
    _onmessage: MessageHandler,
    _onopen: SignalHandler,
    _onerror: SignalHandler,
    _onclose: CloseHandler,
}

impl Transport {
    pub fn open(
        url: &str,
        epoch: u32,
        mut forward: impl FnMut(TransportEvent) + Clone + 'static,
    ) -> Result<Self, JsValue> {
        let ws = WebSocket::new(url)?;
        ws.set_binary_type(BinaryType::Arraybuffer);

        let mut on_message = forward.clone();
        let onmessage = Closure::wrap(Box::new(move |event: MessageEvent| {
            // Text frames are not part of the protocol.
            if let Ok(buffer) = event.data().dyn_into::<ArrayBuffer>() {
                let data = Uint8Array::new(&buffer).to_vec();
                on_message(TransportEvent::Message { epoch, data });
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));

        let mut on_open = forward.clone();
        let onopen = Closure::wrap(Box::new(move |_event: JsValue| {
            on_open(TransportEvent::Opened { epoch });
        }) as Box<dyn FnMut(JsValue)>);
        ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));

        let mut on_error = forward.clone();
        let onerror = Closure::wrap(Box::new(move |_event: JsValue| {
            on_error(TransportEvent::Errored { epoch });
        }) as Box<dyn FnMut(JsValue)>);
        ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));

        let onclose = Closure::wrap(Box::new(move |event: CloseEvent| {
            forward(TransportEvent::Closed {
                epoch,
                code: event.code(),
            });
        }) as Box<dyn FnMut(CloseEvent)>);
        ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));

        Ok(Self {
            ws,
            _onmessage: onmessage,
            _onopen: onopen,
            _onerror: onerror,
            _onclose: onclose,
        })
    }

    /// Detach callbacks and close the socket.
    pub fn close(&self) {
        self.ws.set_onopen(None);
        self.ws.set_onmessage(None);
        self.ws.set_onerror(None);
        self.ws.set_onclose(None);
        let _ = self.ws.close();
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}
