// Render pipeline - full repaint of terrain, food and creatures per snapshot
//
// Frame order:
//   1. trail overlay over the whole backing store (physical pixels)
//   2. dpr -> offset -> scale, everything after is in world units
//   3. terrain layer, or the world outline when no map was loaded
//   4. food, 5. creatures
use protocol::{Creature, ProtocolVariant, Snapshot, WORLD_HEIGHT, WORLD_WIDTH};

use crate::viewport::Viewport;

mod canvas;

pub use canvas::CanvasSurface;

/// Low-alpha fill so the previous frames fade out as motion trails.
pub const BACKGROUND_TRAIL: &str = "rgba(11, 13, 20, 0.35)";
pub const WORLD_BORDER: &str = "#333";
pub const WORLD_BORDER_WIDTH: f64 = 2.0;

pub const FOOD_COLOR: &str = "#ffe100";
pub const FOOD_RADIUS: f64 = 3.0;
pub const GLOW_BLUR: f64 = 8.0;

pub const HERBIVORE_COLOR: &str = "#00ff9d";
pub const CARNIVORE_COLOR: &str = "#ff4d4d";
pub const CARNIVORE_OUTLINE: &str = "#fff";
pub const CARNIVORE_OUTLINE_WIDTH: f64 = 1.0;
/// Color shared by every creature when the protocol carries no diet.
pub const UNIFORM_CREATURE_COLOR: &str = "#4dc3ff";
/// Radius of a size 1.0 creature, in world units.
pub const CREATURE_BASE_RADIUS: f64 = 5.0;

/// The 2D drawing operations the pipeline needs.
///
/// Implemented by [`CanvasSurface`] in the browser.
pub trait Surface {
    /// Pre-rendered terrain image.
    type Layer;

    fn set_transform(&self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64);
    fn translate(&self, x: f64, y: f64);
    fn scale(&self, s: f64);
    fn save(&self);
    fn restore(&self);

    fn set_fill(&self, color: &str);
    fn set_stroke(&self, color: &str, width: f64);
    /// `blur == 0.0` disables the shadow.
    fn set_shadow(&self, blur: f64, color: &str);

    fn fill_rect(&self, x: f64, y: f64, w: f64, h: f64);
    fn stroke_rect(&self, x: f64, y: f64, w: f64, h: f64);
    fn fill_circle(&self, x: f64, y: f64, r: f64);
    fn stroke_circle(&self, x: f64, y: f64, r: f64);
    fn draw_layer(&self, layer: &Self::Layer, x: f64, y: f64);
}

/// How a creature is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreatureStyle {
    pub color: &'static str,
    pub radius: f64,
    pub outline: bool,
}

impl CreatureStyle {
    pub fn for_creature(creature: &Creature, variant: ProtocolVariant) -> Self {
        match (variant, creature.is_carnivore()) {
            (ProtocolVariant::Full, Some(is_carnivore)) => Self {
                color: if is_carnivore { CARNIVORE_COLOR } else { HERBIVORE_COLOR },
                radius: CREATURE_BASE_RADIUS * creature.size() as f64,
                outline: is_carnivore,
            },
            _ => Self {
                color: UNIFORM_CREATURE_COLOR,
                radius: CREATURE_BASE_RADIUS,
                outline: false,
            },
        }
    }
}

pub struct Renderer<S: Surface> {
    surface: S,
    variant: ProtocolVariant,
    terrain: Option<S::Layer>,
}

impl<S: Surface> Renderer<S> {
    pub fn new(surface: S, variant: ProtocolVariant) -> Self {
        Self {
            surface,
            variant,
            terrain: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn has_terrain(&self) -> bool {
        self.terrain.is_some()
    }

    /// Cache the terrain layer. Only the first layer is kept.
    pub fn install_terrain(&mut self, layer: S::Layer) -> bool {
        if self.terrain.is_some() {
            return false;
        }
        self.terrain = Some(layer);
        true
    }

    /// Repaint the whole frame from `snapshot`.
    pub fn render(&self, snapshot: &Snapshot, viewport: &Viewport) {
        let s = &self.surface;
        let (backing_w, backing_h) = viewport.backing_size();

        s.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
        s.set_shadow(0.0, "transparent");
        s.set_fill(BACKGROUND_TRAIL);
        s.fill_rect(0.0, 0.0, backing_w as f64, backing_h as f64);

        let dpr = viewport.device_pixel_ratio as f64;
        s.save();
        s.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);
        s.translate(viewport.offset.x as f64, viewport.offset.y as f64);
        s.scale(viewport.scale as f64);

        match &self.terrain {
            Some(layer) => s.draw_layer(layer, 0.0, 0.0),
            None => {
                s.set_stroke(WORLD_BORDER, WORLD_BORDER_WIDTH);
                s.stroke_rect(0.0, 0.0, WORLD_WIDTH as f64, WORLD_HEIGHT as f64);
            }
        }

        s.set_shadow(GLOW_BLUR, FOOD_COLOR);
        s.set_fill(FOOD_COLOR);
        for food in &snapshot.food {
            s.fill_circle(food.position.x as f64, food.position.y as f64, FOOD_RADIUS);
        }

        for creature in &snapshot.creatures {
            let style = CreatureStyle::for_creature(creature, self.variant);
            let (x, y) = (creature.position.x as f64, creature.position.y as f64);
            s.set_shadow(GLOW_BLUR, style.color);
            s.set_fill(style.color);
            s.fill_circle(x, y, style.radius);
            if style.outline {
                s.set_stroke(CARNIVORE_OUTLINE, CARNIVORE_OUTLINE_WIDTH);
                s.stroke_circle(x, y, style.radius);
            }
        }

        s.restore();
    }
}
