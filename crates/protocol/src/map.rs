//! Static terrain map served once at `/api/map`.
//!
//! ```json
//! { "Width": 40, "Height": 30, "Scale": 20.0, "Cells": "AAECAQ..." }
//! ```
//!
//! `Cells` is row-major, one byte per cell, either as a JSON array of
//! numbers or as a base64 string.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer};

use crate::ProtocolError;

/// Largest accepted rasterized edge, in world pixels.
pub const MAX_RASTER_EDGE: f64 = 8192.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainKind {
    Water,
    Sand,
    Grass,
}

impl From<u8> for TerrainKind {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Water,
            1 => Self::Sand,
            _ => Self::Grass,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapData {
    /// Grid width in cells.
    #[serde(rename = "Width")]
    pub width: u32,
    /// Grid height in cells.
    #[serde(rename = "Height")]
    pub height: u32,
    /// World units per cell.
    #[serde(rename = "Scale")]
    pub scale: f64,
    #[serde(rename = "Cells", deserialize_with = "deserialize_cells")]
    pub cells: Vec<u8>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CellsPayload {
    Raw(Vec<u8>),
    Base64(String),
}

fn deserialize_cells<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    match CellsPayload::deserialize(deserializer)? {
        CellsPayload::Raw(bytes) => Ok(bytes),
        CellsPayload::Base64(encoded) => STANDARD
            .decode(encoded.trim())
            .map_err(serde::de::Error::custom),
    }
}

impl MapData {
    /// Check the grid against its declared dimensions.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let Some(expected) = self.cell_count() else {
            return Err(ProtocolError::InvalidMap(format!(
                "{}x{} grid is too large",
                self.width, self.height
            )));
        };
        if self.cells.len() != expected {
            return Err(ProtocolError::InvalidMap(format!(
                "{}x{} grid needs {} cells, got {}",
                self.width,
                self.height,
                expected,
                self.cells.len()
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(ProtocolError::InvalidMap(format!("bad scale {}", self.scale)));
        }
        let (w, h) = self.pixel_size();
        if w > MAX_RASTER_EDGE || h > MAX_RASTER_EDGE {
            return Err(ProtocolError::InvalidMap(format!(
                "raster {w}x{h} exceeds {MAX_RASTER_EDGE} px"
            )));
        }
        Ok(())
    }

    /// Rasterized footprint in world pixels.
    pub fn pixel_size(&self) -> (f64, f64) {
        (
            (self.width as f64 * self.scale).ceil(),
            (self.height as f64 * self.scale).ceil(),
        )
    }

    /// `width * height`, or `None` when it does not fit in `usize`.
    pub fn cell_count(&self) -> Option<usize> {
        (self.width as usize).checked_mul(self.height as usize)
    }

    /// Terrain at grid cell `(x, y)`. Cells outside the grid read as water.
    #[inline]
    pub fn kind_at(&self, x: u32, y: u32) -> TerrainKind {
        let idx = (y as usize)
            .checked_mul(self.width as usize)
            .and_then(|row| row.checked_add(x as usize));
        TerrainKind::from(idx.and_then(|i| self.cells.get(i).copied()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_array_cells() {
        let map: MapData =
            serde_json::from_str(r#"{"Width":2,"Height":1,"Scale":10,"Cells":[0,2]}"#).unwrap();
        assert_eq!(map.width, 2);
        assert_eq!(map.height, 1);
        assert_eq!(map.scale, 10.0);
        assert_eq!(map.cells, vec![0, 2]);
        assert!(map.validate().is_ok());
        assert_eq!(map.kind_at(0, 0), TerrainKind::Water);
        assert_eq!(map.kind_at(1, 0), TerrainKind::Grass);
    }

    #[test]
    fn parses_base64_cells() {
        // [0, 1, 2, 1] -> "AAECAQ=="
        let map: MapData =
            serde_json::from_str(r#"{"Width":2,"Height":2,"Scale":20.0,"Cells":"AAECAQ=="}"#)
                .unwrap();
        assert_eq!(map.cells, vec![0, 1, 2, 1]);
        assert_eq!(map.kind_at(1, 0), TerrainKind::Sand);
        assert_eq!(map.kind_at(0, 1), TerrainKind::Grass);
        assert_eq!(map.pixel_size(), (40.0, 40.0));
    }

    #[test]
    fn rejects_garbage_base64() {
        let res: Result<MapData, _> =
            serde_json::from_str(r#"{"Width":1,"Height":1,"Scale":1,"Cells":"***"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn validate_catches_bad_grids() {
        let short = MapData {
            width: 3,
            height: 2,
            scale: 5.0,
            cells: vec![0; 5],
        };
        assert!(matches!(short.validate(), Err(ProtocolError::InvalidMap(_))));

        let zero_scale = MapData {
            width: 1,
            height: 1,
            scale: 0.0,
            cells: vec![0],
        };
        assert!(zero_scale.validate().is_err());

        let huge = MapData {
            width: 2,
            height: 1,
            scale: 10_000.0,
            cells: vec![0, 0],
        };
        assert!(huge.validate().is_err());
    }

    #[test]
    fn unknown_codes_are_grass() {
        assert_eq!(TerrainKind::from(7), TerrainKind::Grass);
        assert_eq!(TerrainKind::from(255), TerrainKind::Grass);
    }

    #[test]
    fn oversized_grid_with_no_cells_is_rejected() {
        let sparse = MapData {
            width: 65_536,
            height: 65_536,
            scale: 0.0001,
            cells: Vec::new(),
        };
        assert!(matches!(sparse.validate(), Err(ProtocolError::InvalidMap(_))));
    }

    #[test]
    fn cell_count_reports_overflow() {
        let grid = MapData {
            width: u32::MAX,
            height: u32::MAX,
            scale: 1.0,
            cells: Vec::new(),
        };
        let fits = (u32::MAX as u128 * u32::MAX as u128) <= usize::MAX as u128;
        assert_eq!(grid.cell_count().is_some(), fits);
        assert!(grid.validate().is_err());
        assert_eq!(grid.kind_at(u32::MAX - 1, u32::MAX - 1), TerrainKind::Water);
    }
}
