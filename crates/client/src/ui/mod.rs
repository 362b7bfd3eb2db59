// DOM display - stat labels and the connection indicator
use web_sys::{Document, Element};
use wasm_bindgen::JsValue;

use crate::session::ElementIds;
use crate::stats::{format_uptime, StatsView};

const CONNECTED_CLASS: &str = "connected";

/// Write-only handles to the host page's display elements.
///
/// Missing elements are skipped silently.
pub struct StatsDisplay {
    alive: Option<Element>,
    food: Option<Element>,
    fps: Option<Element>,
    uptime: Option<Element>,
    status: Option<Element>,
}

impl StatsDisplay {
    pub fn new(document: &Document, ids: &ElementIds) -> Self {
        Self {
            alive: document.get_element_by_id(&ids.alive),
            food: document.get_element_by_id(&ids.food),
            fps: document.get_element_by_id(&ids.fps),
            uptime: document.get_element_by_id(&ids.uptime),
            status: document.get_element_by_id(&ids.status),
        }
    }

    /// Update the population counters.
    pub fn update_counts(&self, view: &StatsView) {
        set_text(&self.alive, &view.alive.to_string());
        set_text(&self.food, &view.food.to_string());
    }

    /// Update fps and uptime.
    pub fn update_timing(&self, view: &StatsView) {
        if let Some(fps) = view.fps {
            set_text(&self.fps, &fps.to_string());
        }
        set_text(&self.uptime, &format_uptime(view.uptime_secs));
    }

    pub fn set_connected(&self, connected: bool) {
        let Some(status) = &self.status else {
            return;
        };
        let classes = js_sys::Array::of1(&JsValue::from(CONNECTED_CLASS));
        if connected {
            status.class_list().add(&classes).ok();
        } else {
            status.class_list().remove(&classes).ok();
        }
    }
}

fn set_text(el: &Option<Element>, text: &str) {
    if let Some(el) = el {
        el.set_text_content(Some(text));
    }
}
