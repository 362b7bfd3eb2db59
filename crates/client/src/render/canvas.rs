// Browser canvas backend for the render pipeline
use wasm_bindgen::{Clamped, prelude::*};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};
use std::f64::consts::TAU;

use super::Surface;
use crate::terrain::TerrainRaster;
use crate::viewport::Viewport;

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = context_2d(&canvas)?;
        Ok(Self { canvas, ctx })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    /// Size the backing store to `css * dpr` while the element stays at `css`.
    pub fn resize(&self, viewport: &Viewport) -> Result<(), JsValue> {
        let (w, h) = viewport.backing_size();
        self.canvas.set_width(w);
        self.canvas.set_height(h);
        let style = self.canvas.style();
        style.set_property("width", &format!("{}px", viewport.css_size.x))?;
        style.set_property("height", &format!("{}px", viewport.css_size.y))?;
        // Resizing resets context state; terrain cells should stay crisp.
        self.ctx.set_image_smoothing_enabled(false);
        Ok(())
    }

    /// Copy a terrain raster into an offscreen canvas.
    pub fn upload_layer(&self, raster: &TerrainRaster) -> Result<HtmlCanvasElement, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or("No document")?;
        let layer = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()?;
        layer.set_width(raster.width);
        layer.set_height(raster.height);

        let image = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(&raster.pixels),
            raster.width,
            raster.height,
        )?;
        context_2d(&layer)?.put_image_data(&image, 0.0, 0.0)?;
        Ok(layer)
    }
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, JsValue> {
    canvas
        .get_context("2d")?
        .ok_or("Failed to get 2d context")?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(JsValue::from)
}

impl Surface for CanvasSurface {
    type Layer = HtmlCanvasElement;

    #[inline]
    fn set_transform(&self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        let _ = self.ctx.set_transform(a, b, c, d, e, f);
    }

    #[inline]
    fn translate(&self, x: f64, y: f64) {
        let _ = self.ctx.translate(x, y);
    }

    #[inline]
    fn scale(&self, s: f64) {
        let _ = self.ctx.scale(s, s);
    }

    fn save(&self) {
        self.ctx.save();
    }

    fn restore(&self) {
        self.ctx.restore();
    }

    #[inline]
    fn set_fill(&self, color: &str) {
        self.ctx.set_fill_style_str(color);
    }

    #[inline]
    fn set_stroke(&self, color: &str, width: f64) {
        self.ctx.set_stroke_style_str(color);
        self.ctx.set_line_width(width);
    }

    #[inline]
    fn set_shadow(&self, blur: f64, color: &str) {
        self.ctx.set_shadow_blur(blur);
        self.ctx.set_shadow_color(color);
    }

    fn fill_rect(&self, x: f64, y: f64, w: f64, h: f64) {
        self.ctx.fill_rect(x, y, w, h);
    }

    fn stroke_rect(&self, x: f64, y: f64, w: f64, h: f64) {
        self.ctx.stroke_rect(x, y, w, h);
    }

    #[inline]
    fn fill_circle(&self, x: f64, y: f64, r: f64) {
        self.ctx.begin_path();
        let _ = self.ctx.arc(x, y, r, 0.0, TAU);
        self.ctx.fill();
    }

    #[inline]
    fn stroke_circle(&self, x: f64, y: f64, r: f64) {
        self.ctx.begin_path();
        let _ = self.ctx.arc(x, y, r, 0.0, TAU);
        self.ctx.stroke();
    }

    fn draw_layer(&self, layer: &HtmlCanvasElement, x: f64, y: f64) {
        let _ = self.ctx.draw_image_with_html_canvas_element(layer, x, y);
    }
}
