//! Shared protocol crate for evo-view.
//!
//! This crate contains:
//! - Binary reading/writing utilities
//! - The world snapshot codec (creatures + food)
//! - The static map payload served by `/api/map`

mod binary;
mod error;
pub mod map;
pub mod snapshot;

pub use binary::{BinaryReader, BinaryWriter};
pub use error::ProtocolError;
pub use map::{MapData, TerrainKind};
pub use snapshot::{
    decode_snapshot, encode_snapshot, Creature, CreatureTraits, Food, ProtocolVariant, Snapshot,
};

/// Represents a 2D position using glam's Vec2.
pub type Position = glam::Vec2;

/// Width of the simulated world in logical units.
pub const WORLD_WIDTH: f32 = 800.0;
/// Height of the simulated world in logical units.
pub const WORLD_HEIGHT: f32 = 600.0;
