// Terrain loader - fetches the static map once and rasterizes it
use protocol::{MapData, TerrainKind};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

/// RGBA color of a terrain cell.
pub fn terrain_color(kind: TerrainKind) -> [u8; 4] {
    match kind {
        TerrainKind::Water => [28, 63, 110, 255],
        TerrainKind::Sand => [194, 178, 128, 255],
        TerrainKind::Grass => [38, 92, 52, 255],
    }
}

/// Map grid rendered to RGBA pixels in world-pixel space.
///
/// Built once per session; the renderer keeps the uploaded copy.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainRaster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TerrainRaster {
    /// Fill a `scale` x `scale` block at `(x * scale, y * scale)` for every cell.
    ///
    /// Block edges are floored so fractional scales tile without gaps.
    pub fn rasterize(map: &MapData) -> Result<Self, protocol::ProtocolError> {
        map.validate()?;
        let (w, h) = map.pixel_size();
        let (width, height) = (w as u32, h as u32);
        let mut pixels = vec![0u8; width as usize * height as usize * 4];

        for gy in 0..map.height {
            let y0 = (gy as f64 * map.scale).floor() as u32;
            let y1 = block_end(gy, map.height, map.scale, height);
            for gx in 0..map.width {
                let x0 = (gx as f64 * map.scale).floor() as u32;
                let x1 = block_end(gx, map.width, map.scale, width);
                let color = terrain_color(map.kind_at(gx, gy));
                for py in y0..y1 {
                    let row = py as usize * width as usize;
                    for px in x0..x1 {
                        let i = (row + px as usize) * 4;
                        pixels[i..i + 4].copy_from_slice(&color);
                    }
                }
            }
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }
}

#[cfg(test)]
impl TerrainRaster {
    /// RGBA at pixel `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.pixels[i..i + 4]);
        Some(out)
    }
}

// The last block in a row/column absorbs the ceil() remainder.
fn block_end(cell: u32, cells: u32, scale: f64, limit: u32) -> u32 {
    if cell + 1 == cells {
        limit
    } else {
        (((cell + 1) as f64 * scale).floor() as u32).min(limit)
    }
}

/// Fetch and parse the map payload.
pub async fn fetch_map(path: &str) -> Result<MapData, JsValue> {
    let window = web_sys::window().ok_or("No window")?;
    let response: Response = JsFuture::from(window.fetch_with_str(path))
        .await?
        .dyn_into()?;
    if !response.ok() {
        return Err(JsValue::from_str(&format!(
            "map request failed with status {}",
            response.status()
        )));
    }
    let text = JsFuture::from(response.text()?)
        .await?
        .as_string()
        .ok_or("map body is not text")?;
    serde_json::from_str(&text).map_err(|e| JsValue::from_str(&format!("bad map JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(width: u32, height: u32, scale: f64, cells: Vec<u8>) -> MapData {
        MapData {
            width,
            height,
            scale,
            cells,
        }
    }

    #[test]
    fn two_by_one_grid() {
        let raster = TerrainRaster::rasterize(&map(2, 1, 10.0, vec![0, 2])).unwrap();
        assert_eq!((raster.width, raster.height), (20, 10));

        let water = terrain_color(TerrainKind::Water);
        let grass = terrain_color(TerrainKind::Grass);
        for y in 0..10 {
            for x in 0..10 {
                assert_eq!(raster.pixel(x, y), Some(water), "({x},{y})");
            }
            for x in 10..20 {
                assert_eq!(raster.pixel(x, y), Some(grass), "({x},{y})");
            }
        }
        assert_eq!(raster.pixel(20, 0), None);
    }

    #[test]
    fn rows_are_row_major() {
        let raster = TerrainRaster::rasterize(&map(1, 2, 4.0, vec![1, 0])).unwrap();
        assert_eq!(raster.pixel(3, 3), Some(terrain_color(TerrainKind::Sand)));
        assert_eq!(raster.pixel(0, 4), Some(terrain_color(TerrainKind::Water)));
    }

    #[test]
    fn fractional_scale_leaves_no_gaps() {
        let raster = TerrainRaster::rasterize(&map(3, 1, 2.5, vec![2, 2, 2])).unwrap();
        assert_eq!(raster.width, 8);
        assert!(raster.pixels.chunks(4).all(|px| px[3] == 255));
    }

    #[test]
    fn invalid_map_is_rejected() {
        assert!(TerrainRaster::rasterize(&map(2, 2, 10.0, vec![0])).is_err());
    }
}
