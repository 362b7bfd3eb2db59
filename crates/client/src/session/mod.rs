// Viewer session - configuration and the per-page context object
use protocol::{MapData, ProtocolVariant, Snapshot};
use serde::Deserialize;
use wasm_bindgen::prelude::*;
use web_sys::{window, HtmlCanvasElement};

use crate::network::{ConnectionManager, Transport};
use crate::render::{CanvasSurface, Renderer};
use crate::stats::SessionStats;
use crate::terrain::TerrainRaster;
use crate::ui::StatsDisplay;
use crate::utils;
use crate::viewport::Viewport;

/// Options accepted by the JS constructor. Every field is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    pub canvas_id: String,
    /// Socket path on the page's own host.
    pub socket_path: String,
    pub map_path: String,
    /// Snapshot format spoken by the server.
    pub protocol: ProtocolVariant,
    pub reconnect_delay_ms: u32,
    /// Total CSS-pixel margin kept around the world on each axis.
    pub padding: f32,
    pub stats_interval_ms: u32,
    pub elements: ElementIds,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            canvas_id: "sim-canvas".to_string(),
            socket_path: "/ws".to_string(),
            map_path: "/api/map".to_string(),
            protocol: ProtocolVariant::Full,
            reconnect_delay_ms: 2000,
            padding: 0.0,
            stats_interval_ms: 250,
            elements: ElementIds::default(),
        }
    }
}

/// Ids of the host page's display elements.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ElementIds {
    pub alive: String,
    pub food: String,
    pub fps: String,
    pub uptime: String,
    pub status: String,
}

impl Default for ElementIds {
    fn default() -> Self {
        Self {
            alive: "stat-alive".to_string(),
            food: "stat-food".to_string(),
            fps: "stat-fps".to_string(),
            uptime: "stat-uptime".to_string(),
            status: "connection-status".to_string(),
        }
    }
}

/// Everything one viewer owns: connection state, drawing surface, cached
/// terrain, viewport and stats. Created by the JS wrapper and torn down by
/// `shutdown`.
pub struct Session {
    config: ViewerConfig,
    pub(crate) manager: ConnectionManager,
    renderer: Renderer<CanvasSurface>,
    viewport: Viewport,
    stats: SessionStats,
    display: StatsDisplay,

    transport: Option<Transport>,
    // Kept one generation so a socket is never dropped inside its own callback.
    _retired: Option<Transport>,

    pub(crate) reconnect_timer: Option<i32>,
    pub(crate) stats_ticker: Option<(i32, Closure<dyn FnMut()>)>,
    pub(crate) resize_listener: Option<Closure<dyn FnMut()>>,
}

impl Session {
    pub fn new(config: ViewerConfig) -> Result<Self, JsValue> {
        let window = window().ok_or("No window")?;
        let document = window.document().ok_or("No document")?;
        let canvas = document
            .get_element_by_id(&config.canvas_id)
            .ok_or("Canvas not found")?
            .dyn_into::<HtmlCanvasElement>()?;

        let renderer = Renderer::new(CanvasSurface::new(canvas)?, config.protocol);
        let display = StatsDisplay::new(&document, &config.elements);
        let manager = ConnectionManager::new(config.protocol, config.reconnect_delay_ms);

        let mut session = Self {
            manager,
            renderer,
            viewport: Viewport::default(),
            stats: SessionStats::new(utils::now()),
            display,
            transport: None,
            _retired: None,
            reconnect_timer: None,
            stats_ticker: None,
            resize_listener: None,
            config,
        };
        session.resize()?;
        Ok(session)
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn display(&self) -> &StatsDisplay {
        &self.display
    }

    /// Re-measure the canvas container and refit the world.
    pub fn resize(&mut self) -> Result<(), JsValue> {
        let window = window().ok_or("No window")?;
        let dpr = window.device_pixel_ratio() as f32;
        let (width, height) = match self.renderer.surface().canvas().parent_element() {
            Some(parent) => (parent.client_width() as f32, parent.client_height() as f32),
            None => (
                window.inner_width()?.as_f64().unwrap_or(0.0) as f32,
                window.inner_height()?.as_f64().unwrap_or(0.0) as f32,
            ),
        };

        self.viewport = Viewport::fit(width, height, dpr, self.config.padding);
        self.renderer.surface().resize(&self.viewport)
    }

    /// Draw one snapshot and fold it into the stats. The snapshot is not kept.
    pub fn present(&mut self, snapshot: &Snapshot) {
        self.renderer.render(snapshot, &self.viewport);

        let now = utils::now();
        let flushed = self.stats.record_frame(snapshot, now);
        let view = self.stats.view(now);
        self.display.update_counts(&view);
        if flushed {
            self.display.update_timing(&view);
        }
    }

    /// Periodic fps/uptime refresh, independent of incoming snapshots.
    pub fn tick_stats(&mut self) {
        let now = utils::now();
        self.stats.poll(now);
        self.display.update_timing(&self.stats.view(now));
    }

    /// Rasterize and cache the terrain. Later maps are ignored.
    pub fn install_terrain(&mut self, map: &MapData) -> Result<bool, String> {
        if self.renderer.has_terrain() {
            return Ok(false);
        }
        let raster = TerrainRaster::rasterize(map).map_err(|e| e.to_string())?;
        let layer = self
            .renderer
            .surface()
            .upload_layer(&raster)
            .map_err(|e| format!("{e:?}"))?;
        Ok(self.renderer.install_terrain(layer))
    }

    pub(crate) fn replace_transport(&mut self, transport: Transport) {
        self._retired = self.transport.replace(transport);
    }

    pub(crate) fn close_transport(&self) {
        if let Some(transport) = &self.transport {
            transport.close();
        }
    }
}
