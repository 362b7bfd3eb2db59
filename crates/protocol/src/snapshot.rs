//! World snapshot codec.
//!
//! Layout (little-endian):
//!
//! ```text
//! u16 creature_count
//! creature_count x { u16 id, f32 x, f32 y, [u8 is_carnivore, f32 size] }
//! -- optional, only if bytes remain --
//! u16 food_count
//! food_count x { f32 x, f32 y }
//! ```
//!
//! The bracketed creature fields exist only in [`ProtocolVariant::Full`].

use serde::{Deserialize, Serialize};

use crate::{BinaryReader, BinaryWriter, Position, ProtocolError};

const FOOD_RECORD_LEN: usize = 8;

/// Snapshot format capability, fixed for the lifetime of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVariant {
    /// Creatures carry diet flag and size.
    #[default]
    Full,
    /// Creatures are `id, x, y` only.
    Reduced,
}

impl ProtocolVariant {
    /// Size in bytes of one creature record.
    #[inline]
    pub const fn creature_record_len(self) -> usize {
        match self {
            Self::Full => 15,
            Self::Reduced => 10,
        }
    }

    /// Whether creatures carry [`CreatureTraits`].
    #[inline]
    pub const fn has_traits(self) -> bool {
        matches!(self, Self::Full)
    }
}

/// Diet and size, present only in the full protocol variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreatureTraits {
    pub is_carnivore: bool,
    pub size: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Creature {
    /// Server-assigned id; only meaningful within one snapshot.
    pub id: u16,
    pub position: Position,
    pub traits: Option<CreatureTraits>,
}

impl Creature {
    /// Size multiplier used when the variant carries no size.
    pub const DEFAULT_SIZE: f32 = 1.0;

    /// Diet flag, `None` in the reduced variant.
    #[inline]
    pub fn is_carnivore(&self) -> Option<bool> {
        self.traits.map(|t| t.is_carnivore)
    }

    /// Size multiplier, [`Self::DEFAULT_SIZE`] when absent or not a finite
    /// positive number.
    #[inline]
    pub fn size(&self) -> f32 {
        match self.traits {
            Some(t) if t.size.is_finite() && t.size > 0.0 => t.size,
            _ => Self::DEFAULT_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Food {
    pub position: Position,
}

/// One decoded world-state update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub creatures: Vec<Creature>,
    pub food: Vec<Food>,
}

/// Decode a snapshot message.
///
/// Section lengths are checked against the remaining buffer before any
/// record is read, so a bad count fails fast with
/// [`ProtocolError::MalformedSnapshot`]. Bytes after the food section are
/// ignored.
pub fn decode_snapshot(data: &[u8], variant: ProtocolVariant) -> Result<Snapshot, ProtocolError> {
    let mut reader = BinaryReader::new(data.to_vec());

    let creature_count = reader.read_u16()?;
    check_section(
        &reader,
        "creatures",
        creature_count,
        variant.creature_record_len(),
    )?;

    let mut creatures = Vec::with_capacity(creature_count as usize);
    for _ in 0..creature_count {
        let id = reader.read_u16()?;
        let x = reader.read_f32()?;
        let y = reader.read_f32()?;
        let traits = if variant.has_traits() {
            let is_carnivore = reader.read_u8()? == 1;
            let size = reader.read_f32()?;
            Some(CreatureTraits { is_carnivore, size })
        } else {
            None
        };
        creatures.push(Creature {
            id,
            position: Position::new(x, y),
            traits,
        });
    }

    // The food section is optional: the server drops it when there is nothing to send.
    if reader.is_exhausted() {
        return Ok(Snapshot {
            creatures,
            food: Vec::new(),
        });
    }

    let food_count = reader.read_u16().map_err(|_| ProtocolError::MalformedSnapshot {
        section: "food",
        declared: 0,
        needed: 2,
        available: reader.remaining(),
    })?;
    check_section(&reader, "food", food_count, FOOD_RECORD_LEN)?;

    let mut food = Vec::with_capacity(food_count as usize);
    for _ in 0..food_count {
        let x = reader.read_f32()?;
        let y = reader.read_f32()?;
        food.push(Food {
            position: Position::new(x, y),
        });
    }

    Ok(Snapshot { creatures, food })
}

fn check_section(
    reader: &BinaryReader,
    section: &'static str,
    declared: u16,
    record_len: usize,
) -> Result<(), ProtocolError> {
    let needed = declared as usize * record_len;
    let available = reader.remaining();
    if needed > available {
        return Err(ProtocolError::MalformedSnapshot {
            section,
            declared,
            needed,
            available,
        });
    }
    Ok(())
}

/// Encode a snapshot in the given variant.
///
/// The food section is always written, even when empty. Creature traits are
/// dropped for [`ProtocolVariant::Reduced`] and defaulted (herbivore, size 1)
/// for [`ProtocolVariant::Full`] when missing. Sections longer than a `u16`
/// count can express are rejected.
pub fn encode_snapshot(
    snapshot: &Snapshot,
    variant: ProtocolVariant,
) -> Result<BinaryWriter, ProtocolError> {
    let creature_count = section_count("creatures", snapshot.creatures.len())?;
    let food_count = section_count("food", snapshot.food.len())?;

    let capacity = 4
        + snapshot.creatures.len() * variant.creature_record_len()
        + snapshot.food.len() * FOOD_RECORD_LEN;
    let mut w = BinaryWriter::with_capacity(capacity);

    w.put_u16(creature_count);
    for creature in &snapshot.creatures {
        w.put_u16(creature.id);
        w.put_f32(creature.position.x);
        w.put_f32(creature.position.y);
        if variant.has_traits() {
            w.put_u8(u8::from(creature.is_carnivore().unwrap_or(false)));
            w.put_f32(creature.size());
        }
    }

    w.put_u16(food_count);
    for food in &snapshot.food {
        w.put_f32(food.position.x);
        w.put_f32(food.position.y);
    }
    Ok(w)
}

fn section_count(section: &'static str, count: usize) -> Result<u16, ProtocolError> {
    u16::try_from(count).map_err(|_| ProtocolError::TooManyEntries { section, count })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creature(id: u16, x: f32, y: f32, is_carnivore: bool, size: f32) -> Creature {
        Creature {
            id,
            position: Position::new(x, y),
            traits: Some(CreatureTraits { is_carnivore, size }),
        }
    }

    #[test]
    fn empty_world_without_food_section() {
        let snapshot = decode_snapshot(&[0, 0], ProtocolVariant::Full).unwrap();
        assert!(snapshot.creatures.is_empty());
        assert!(snapshot.food.is_empty());
    }

    #[test]
    fn full_variant_decodes_every_field_exactly() {
        let mut w = BinaryWriter::new();
        w.put_u16(2);
        w.put_u16(7);
        w.put_f32(12.5);
        w.put_f32(-3.25);
        w.put_u8(1);
        w.put_f32(1.75);
        w.put_u16(65535);
        w.put_f32(799.999);
        w.put_f32(0.1);
        w.put_u8(0);
        w.put_f32(0.6);
        w.put_u16(3);
        for (x, y) in [(1.0f32, 2.0f32), (3.5, 4.5), (f32::MIN_POSITIVE, 600.0)] {
            w.put_f32(x);
            w.put_f32(y);
        }

        let snapshot = decode_snapshot(w.as_slice(), ProtocolVariant::Full).unwrap();
        assert_eq!(snapshot.creatures.len(), 2);
        assert_eq!(snapshot.food.len(), 3);

        let a = snapshot.creatures[0];
        assert_eq!(a.id, 7);
        assert_eq!(a.position.x.to_bits(), 12.5f32.to_bits());
        assert_eq!(a.position.y.to_bits(), (-3.25f32).to_bits());
        assert_eq!(a.is_carnivore(), Some(true));
        assert_eq!(a.size().to_bits(), 1.75f32.to_bits());

        let b = snapshot.creatures[1];
        assert_eq!(b.id, 65535);
        assert_eq!(b.position.x.to_bits(), 799.999f32.to_bits());
        assert_eq!(b.position.y.to_bits(), 0.1f32.to_bits());
        assert_eq!(b.is_carnivore(), Some(false));
        assert_eq!(b.size().to_bits(), 0.6f32.to_bits());

        assert_eq!(snapshot.food[2].position.x.to_bits(), f32::MIN_POSITIVE.to_bits());
        assert_eq!(snapshot.food[2].position.y, 600.0);
    }

    #[test]
    fn encoder_output_matches_decoder() {
        let sent = Snapshot {
            creatures: vec![creature(1, 10.0, 20.0, false, 1.2), creature(2, 30.0, 40.0, true, 2.0)],
            food: vec![Food {
                position: Position::new(5.0, 6.0),
            }],
        };
        let bytes = encode_snapshot(&sent, ProtocolVariant::Full).unwrap().finish();
        assert_eq!(bytes.len(), 2 + 2 * 15 + 2 + 8);
        assert_eq!(decode_snapshot(&bytes, ProtocolVariant::Full).unwrap(), sent);
    }

    #[test]
    fn reduced_variant_has_no_traits_and_defaults_size() {
        let sent = Snapshot {
            creatures: vec![creature(9, 100.0, 200.0, true, 3.0)],
            food: Vec::new(),
        };
        let bytes = encode_snapshot(&sent, ProtocolVariant::Reduced).unwrap().finish();
        assert_eq!(bytes.len(), 2 + 10 + 2);

        let snapshot = decode_snapshot(&bytes, ProtocolVariant::Reduced).unwrap();
        let c = snapshot.creatures[0];
        assert_eq!(c.id, 9);
        assert_eq!(c.position, Position::new(100.0, 200.0));
        assert_eq!(c.traits, None);
        assert_eq!(c.is_carnivore(), None);
        assert_eq!(c.size(), Creature::DEFAULT_SIZE);
        assert!(snapshot.food.is_empty());
    }

    #[test]
    fn truncated_creature_record_is_malformed() {
        // Declares one creature, supplies only the id and x.
        let data = [1, 0, 5, 0, 0, 0, 0x80, 0x3f];
        let err = decode_snapshot(&data, ProtocolVariant::Full).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::MalformedSnapshot {
                section: "creatures",
                declared: 1,
                needed: 15,
                available: 6,
            }
        );
    }

    #[test]
    fn reduced_buffer_read_as_full_is_malformed() {
        let sent = Snapshot {
            creatures: vec![creature(1, 1.0, 1.0, false, 1.0)],
            food: Vec::new(),
        };
        let bytes = encode_snapshot(&sent, ProtocolVariant::Reduced).unwrap().finish();
        assert!(decode_snapshot(&bytes, ProtocolVariant::Full).is_err());
    }

    #[test]
    fn food_count_beyond_buffer_is_malformed() {
        let mut w = BinaryWriter::new();
        w.put_u16(0);
        w.put_u16(2);
        w.put_f32(1.0);
        w.put_f32(2.0);
        let err = decode_snapshot(w.as_slice(), ProtocolVariant::Full).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::MalformedSnapshot {
                section: "food",
                declared: 2,
                needed: 16,
                available: 8,
            }
        ));
    }

    #[test]
    fn dangling_byte_after_creatures_is_malformed() {
        let err = decode_snapshot(&[0, 0, 7], ProtocolVariant::Full).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedSnapshot { section: "food", .. }));
    }

    #[test]
    fn empty_buffer_is_an_error() {
        assert_eq!(
            decode_snapshot(&[], ProtocolVariant::Full),
            Err(ProtocolError::UnexpectedEof)
        );
    }

    #[test]
    fn trailing_bytes_after_food_are_ignored() {
        let mut w = encode_snapshot(&Snapshot::default(), ProtocolVariant::Full).unwrap();
        w.put_slice(&[0xde, 0xad]);
        let snapshot = decode_snapshot(w.as_slice(), ProtocolVariant::Full).unwrap();
        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn oversized_sections_are_rejected_by_the_encoder() {
        let creatures = vec![
            Creature {
                id: 0,
                position: Position::ZERO,
                traits: None,
            };
            u16::MAX as usize + 2
        ];
        let crowded = Snapshot {
            creatures,
            food: Vec::new(),
        };
        assert_eq!(
            encode_snapshot(&crowded, ProtocolVariant::Reduced).err(),
            Some(ProtocolError::TooManyEntries {
                section: "creatures",
                count: 65537,
            })
        );

        let food = vec![
            Food {
                position: Position::ZERO
            };
            u16::MAX as usize + 1
        ];
        let err = encode_snapshot(&Snapshot { creatures: Vec::new(), food }, ProtocolVariant::Full)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::TooManyEntries { section: "food", .. }));
    }

    #[test]
    fn largest_section_still_encodes() {
        let food = vec![
            Food {
                position: Position::new(1.0, 2.0)
            };
            u16::MAX as usize
        ];
        let sent = Snapshot { creatures: Vec::new(), food };
        let bytes = encode_snapshot(&sent, ProtocolVariant::Reduced).unwrap().finish();
        let decoded = decode_snapshot(&bytes, ProtocolVariant::Reduced).unwrap();
        assert_eq!(decoded.food.len(), u16::MAX as usize);
    }

    #[test]
    fn unusable_sizes_fall_back_to_the_default() {
        for size in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let c = creature(1, 0.0, 0.0, true, size);
            assert_eq!(c.size(), Creature::DEFAULT_SIZE, "size {size}");
        }
        assert_eq!(creature(1, 0.0, 0.0, true, 2.5).size(), 2.5);
    }
}
