// WASM viewer entry point for evo-view
// Streams population snapshots over a WebSocket and draws them onto a canvas.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use wasm_bindgen::prelude::*;
use web_sys::window;

// Module structure - each module handles a specific concern
#[macro_use]
mod utils;       // Timing, console logging
mod network;     // WebSocket transport, connection state machine
mod render;      // Canvas drawing of terrain, food and creatures
mod session;     // Viewer configuration and per-page context
mod stats;       // Population counters, fps, uptime
mod terrain;     // Map fetch and terrain rasterization
mod ui;          // DOM stat labels and connection indicator
mod viewport;    // World-to-canvas transform

use network::{page_socket_url, Action, ConnectionState, Transport, TransportEvent};
pub use session::{ElementIds, Session, ViewerConfig};

type SharedSession = Rc<RefCell<Session>>;
type EventQueue = Rc<RefCell<VecDeque<TransportEvent>>>;

/// Initialize panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Handle held by the page. Dropping it from JS does not stop the viewer;
/// call `shutdown` for that.
#[wasm_bindgen]
pub struct Viewer {
    session: SharedSession,
    events: EventQueue,
}

#[wasm_bindgen]
impl Viewer {
    /// Create a viewer and start connecting. `options` may be omitted.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<Viewer, JsValue> {
        init();

        let config: ViewerConfig = if options.is_undefined() || options.is_null() {
            ViewerConfig::default()
        } else {
            serde_wasm_bindgen::from_value(options).unwrap_or_else(|e| {
                console_warn!("Ignoring invalid viewer options: {e}");
                ViewerConfig::default()
            })
        };
        let map_path = config.map_path.clone();

        let session = Rc::new(RefCell::new(Session::new(config)?));
        let events: EventQueue = Rc::new(RefCell::new(VecDeque::new()));

        setup_resize_handler(&session)?;
        setup_stats_ticker(&session)?;
        load_terrain(Rc::downgrade(&session), map_path);

        let actions = session.borrow_mut().manager.start();
        apply(&session, &events, actions);
        pump(&session, &events);

        Ok(Viewer { session, events })
    }

    /// Stop reconnecting, close the socket and detach page listeners.
    pub fn shutdown(&self) {
        dispatch(&Rc::downgrade(&self.session), &self.events, TransportEvent::Shutdown);

        let mut session = self.session.borrow_mut();
        if let Some(win) = window() {
            if let Some((handle, _ticker)) = session.stats_ticker.take() {
                win.clear_interval_with_handle(handle);
            }
            if let Some(listener) = session.resize_listener.take() {
                win.remove_event_listener_with_callback("resize", listener.as_ref().unchecked_ref())
                    .ok();
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.borrow().manager.state() == ConnectionState::Connected
    }

    /// Connection attempts made so far.
    pub fn attempts(&self) -> f64 {
        self.session.borrow().manager.attempts() as f64
    }

    /// Snapshot rate over the last completed one-second window.
    pub fn fps(&self) -> Option<u32> {
        let now = utils::now();
        self.session.borrow().stats().view(now).fps
    }
}

/// Queue an event and drain the queue unless a drain is already running.
fn dispatch(session: &Weak<RefCell<Session>>, events: &EventQueue, event: TransportEvent) {
    events.borrow_mut().push_back(event);
    if let Some(session) = session.upgrade() {
        pump(&session, events);
    }
}

fn pump(session: &SharedSession, events: &EventQueue) {
    loop {
        let Some(event) = events.borrow_mut().pop_front() else {
            return;
        };
        let actions = match session.try_borrow_mut() {
            Ok(mut s) => s.manager.handle(event),
            Err(_) => {
                // Whoever holds the borrow drains the rest.
                events.borrow_mut().push_front(event);
                return;
            }
        };
        apply(session, events, actions);
    }
}

fn apply(session: &SharedSession, events: &EventQueue, actions: Vec<Action>) {
    for action in actions {
        match action {
            Action::Open { epoch } => open_transport(session, events, epoch),
            Action::Close => session.borrow().close_transport(),
            Action::ScheduleReconnect { delay_ms } => schedule_reconnect(session, events, delay_ms),
            Action::CancelReconnect => {
                if let Some(handle) = session.borrow_mut().reconnect_timer.take() {
                    if let Some(win) = window() {
                        win.clear_timeout_with_handle(handle);
                    }
                }
            }
            Action::Indicator(connected) => {
                if connected {
                    console_log!("Connected");
                }
                session.borrow().display().set_connected(connected);
            }
            Action::Present(snapshot) => session.borrow_mut().present(&snapshot),
            Action::Discard(err) => console_warn!("Dropped snapshot: {err}"),
        }
    }
}

fn open_transport(session: &SharedSession, events: &EventQueue, epoch: u32) {
    let path = session.borrow().config().socket_path.clone();
    let weak = Rc::downgrade(session);
    let queue = events.clone();
    let forward = move |event: TransportEvent| dispatch(&weak, &queue, event);

    let opened = page_socket_url(&path).and_then(|url| {
        console_log!("Connecting to {url}");
        Transport::open(&url, epoch, forward)
    });
    match opened {
        Ok(transport) => session.borrow_mut().replace_transport(transport),
        Err(e) => {
            console_error!("Failed to open socket: {e:?}");
            // Treated like an immediate close so the retry loop keeps going.
            events
                .borrow_mut()
                .push_back(TransportEvent::Closed { epoch, code: 1006 });
        }
    }
}

fn schedule_reconnect(session: &SharedSession, events: &EventQueue, delay_ms: u32) {
    let Some(win) = window() else {
        return;
    };
    console_log!("Disconnected, retrying in {delay_ms} ms");

    let weak = Rc::downgrade(session);
    let queue = events.clone();
    let callback = Closure::once_into_js(move || {
        if let Some(session) = weak.upgrade() {
            if let Ok(mut s) = session.try_borrow_mut() {
                s.reconnect_timer = None;
            }
        }
        dispatch(&weak, &queue, TransportEvent::ReconnectDue);
    });

    match win.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.unchecked_ref(),
        delay_ms.min(i32::MAX as u32) as i32,
    ) {
        Ok(handle) => session.borrow_mut().reconnect_timer = Some(handle),
        Err(e) => console_error!("Failed to schedule reconnect: {e:?}"),
    }
}

/// Refit the viewport when the browser window is resized.
fn setup_resize_handler(session: &SharedSession) -> Result<(), JsValue> {
    let win = window().ok_or("No window")?;
    let weak = Rc::downgrade(session);

    let closure = Closure::wrap(Box::new(move || {
        let Some(session) = weak.upgrade() else {
            return;
        };
        if let Ok(mut s) = session.try_borrow_mut() {
            if let Err(e) = s.resize() {
                console_error!("Resize failed: {e:?}");
            }
        }
    }) as Box<dyn FnMut()>);

    win.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())?;
    session.borrow_mut().resize_listener = Some(closure);
    Ok(())
}

/// Keep fps and uptime moving even when no snapshots arrive.
fn setup_stats_ticker(session: &SharedSession) -> Result<(), JsValue> {
    let win = window().ok_or("No window")?;
    let interval = session.borrow().config().stats_interval_ms.clamp(16, 60_000) as i32;
    let weak = Rc::downgrade(session);

    let closure = Closure::wrap(Box::new(move || {
        if let Some(session) = weak.upgrade() {
            if let Ok(mut s) = session.try_borrow_mut() {
                s.tick_stats();
            }
        }
    }) as Box<dyn FnMut()>);

    let handle = win.set_interval_with_callback_and_timeout_and_arguments_0(
        closure.as_ref().unchecked_ref(),
        interval,
    )?;
    session.borrow_mut().stats_ticker = Some((handle, closure));
    Ok(())
}

/// Fetch and cache the terrain in the background. Until it arrives, or if it
/// never does, the renderer draws the world outline instead.
fn load_terrain(session: Weak<RefCell<Session>>, map_path: String) {
    wasm_bindgen_futures::spawn_local(async move {
        let map = match terrain::fetch_map(&map_path).await {
            Ok(map) => map,
            Err(e) => {
                console_warn!("Map unavailable, drawing world outline: {e:?}");
                return;
            }
        };
        let Some(session) = session.upgrade() else {
            return;
        };
        let installed = session.borrow_mut().install_terrain(&map);
        match installed {
            Ok(true) => console_log!("Terrain loaded ({}x{} cells)", map.width, map.height),
            Ok(false) => {}
            Err(e) => console_warn!("Map rejected, drawing world outline: {e}"),
        }
    });
}
