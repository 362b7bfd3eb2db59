// Viewport transform - fits the fixed world rectangle into the canvas
//
// scale  = min(available_w / WORLD_WIDTH, available_h / WORLD_HEIGHT)
// offset = (container - world * scale) / 2
//
// All values are in CSS pixels; the backing store is `css * dpr` and the
// renderer applies the dpr scale itself.
use glam::Vec2;
use protocol::{WORLD_HEIGHT, WORLD_WIDTH};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Container size in CSS pixels.
    pub css_size: Vec2,
    pub device_pixel_ratio: f32,
    /// Uniform world -> CSS pixel scale.
    pub scale: f32,
    /// CSS pixel offset of the world origin.
    pub offset: Vec2,
}

impl Viewport {
    /// Compute the transform for a container of `css_width` x `css_height`.
    ///
    /// `padding` is the total margin reserved across each axis (half on each
    /// side). Degenerate sizes collapse to a zero scale rather than going
    /// negative.
    pub fn fit(css_width: f32, css_height: f32, device_pixel_ratio: f32, padding: f32) -> Self {
        let css_width = css_width.max(0.0);
        let css_height = css_height.max(0.0);
        let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };

        let available_w = (css_width - padding).max(0.0);
        let available_h = (css_height - padding).max(0.0);
        let scale = (available_w / WORLD_WIDTH).min(available_h / WORLD_HEIGHT);

        let offset = Vec2::new(
            (css_width - WORLD_WIDTH * scale) / 2.0,
            (css_height - WORLD_HEIGHT * scale) / 2.0,
        );

        Self {
            css_size: Vec2::new(css_width, css_height),
            device_pixel_ratio: dpr,
            scale,
            offset,
        }
    }

    /// Backing-store size in physical pixels.
    pub fn backing_size(&self) -> (u32, u32) {
        (
            (self.css_size.x * self.device_pixel_ratio).round() as u32,
            (self.css_size.y * self.device_pixel_ratio).round() as u32,
        )
    }
}

#[cfg(test)]
impl Viewport {
    /// Map a world position to CSS pixels.
    fn world_to_css(&self, world: Vec2) -> Vec2 {
        world * self.scale + self.offset
    }

    /// Size of the world rectangle on screen, in CSS pixels.
    fn world_rect_size(&self) -> Vec2 {
        Vec2::new(WORLD_WIDTH, WORLD_HEIGHT) * self.scale
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::fit(WORLD_WIDTH, WORLD_HEIGHT, 1.0, 0.0)
    }
}
