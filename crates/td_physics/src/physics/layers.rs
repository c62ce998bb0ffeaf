//! Collision layer system for filtering collision detection
//!
//! Broad-phase pairs are filtered through layer/mask bit tests before any
//! geometry runs: projectiles must not collide with each other, enemies must
//! not collide with pickups, and so on.

/// Collision layer definitions for efficient pair filtering
pub struct CollisionLayers;

impl CollisionLayers {
    /// No collision layer
    pub const NONE: u32 = 0;

    /// All collision layers
    pub const ALL: u32 = 0xFFFF_FFFF;

    /// Placed tower structures
    pub const TOWER: u32 = 1 << 0;

    /// Enemy units walking the lanes
    pub const ENEMY: u32 = 1 << 1;

    /// Projectiles (bullets, arrows, shells)
    pub const PROJECTILE: u32 = 1 << 2;

    /// Static terrain and obstacles
    pub const TERRAIN: u32 = 1 << 3;

    /// Pickups and dropped resources
    pub const PICKUP: u32 = 1 << 4;

    /// First bit free for game-specific layers
    pub const CUSTOM_START: u32 = 1 << 8;

    /// Check if two bodies should collide based on their layers and masks
    ///
    /// A's layer must be in B's mask AND B's layer must be in A's mask.
    pub fn should_collide(layer_a: u32, mask_a: u32, layer_b: u32, mask_b: u32) -> bool {
        (layer_a & mask_b) != 0 && (layer_b & mask_a) != 0
    }

    /// Helper to create a mask from multiple layers
    pub fn mask(layers: &[u32]) -> u32 {
        layers.iter().fold(0, |acc, &layer| acc | layer)
    }
}
