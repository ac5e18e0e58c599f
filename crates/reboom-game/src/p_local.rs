// p_local.rs -- shared simulation definitions: flags, handles, level context

use bitflags::bitflags;
use thiserror::Error;

use reboom_common::fixed::{Fixed, FIXED_MAX, FIXED_MIN, FRACBITS, FRACUNIT};

use crate::info::{MobjInfo, MobjType, Sfx, State, StateNum};
use crate::m_random::SimRng;
use crate::p_map::SecNodePool;
use crate::p_maputl::Blockmap;
use crate::p_mobj::{Mobj, MobjArena, RespawnQueue};
use crate::p_setup::{Line, Sector};
use crate::p_tick::ThinkerList;

// =============================================================================
// Simulation constants
// =============================================================================

/// Simulation tics per second.
pub const TICRATE: u32 = 35;

/// Default downward acceleration per tic for things not flagged NOGRAVITY.
pub const GRAVITY: Fixed = Fixed(FRACUNIT.0);

/// Momentum clamp per axis per tic.
pub const MAXMOVE: Fixed = Fixed(30 * FRACUNIT.0);

/// Below this speed, ground friction stops a thing outright.
pub const STOPSPEED: Fixed = Fixed(0x1000);

/// Ground friction multiplier applied to momentum each tic.
pub const FRICTION: Fixed = Fixed(0xe800);

/// Vertical speed for FLOAT things homing toward their target's altitude.
pub const FLOATSPEED: Fixed = Fixed(4 * FRACUNIT.0);

/// Largest ledge a walking thing can step up in one move.
pub const MAXSTEP: Fixed = Fixed(24 * FRACUNIT.0);

/// Largest collision radius any thing may have; bounds blockmap searches.
pub const MAXRADIUS: Fixed = Fixed(32 * FRACUNIT.0);

pub const MELEERANGE: Fixed = Fixed(64 * FRACUNIT.0);
pub const MISSILERANGE: Fixed = Fixed(32 * 64 * FRACUNIT.0);

/// Eye height above the feet for players and hitscan origins.
pub const VIEWHEIGHT: Fixed = Fixed(41 * FRACUNIT.0);

/// Spawn-height codes stored in a thing's z until its sector is known.
pub const ONFLOORZ: Fixed = FIXED_MIN;
pub const ONCEILINGZ: Fixed = FIXED_MAX;

/// Tics a monster keeps attacking its current target before switching.
pub const BASETHRESHOLD: i16 = 100;

/// Ring capacity of the item respawn queue.
pub const ITEMQUESIZE: usize = 128;

/// movedir value meaning "no current direction".
pub const DI_NODIR: u8 = 8;

// =============================================================================
// Thing flags
// =============================================================================

bitflags! {
    /// Behavioral flags carried by every map object.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MobjFlags: u64 {
        /// Calls touch_special when a PICKUP thing overlaps it.
        const SPECIAL       = 0x0000_0001;
        /// Blocks other SOLID things.
        const SOLID         = 0x0000_0002;
        /// Can be damaged.
        const SHOOTABLE     = 0x0000_0004;
        /// Never linked into a sector thing list; invisible to sector sweeps.
        const NOSECTOR      = 0x0000_0008;
        /// Never linked into the blockmap; invisible to spatial queries.
        const NOBLOCKMAP    = 0x0000_0010;
        /// Only wakes on sight, never on sound.
        const AMBUSH        = 0x0000_0020;
        /// Took damage this tic; will try to fight back.
        const JUSTHIT       = 0x0000_0040;
        /// Just attacked; take at least one step before attacking again.
        const JUSTATTACKED  = 0x0000_0080;
        /// Spawns hanging from the ceiling.
        const SPAWNCEILING  = 0x0000_0100;
        const NOGRAVITY     = 0x0000_0200;
        /// May walk off ledges of any height.
        const DROPOFF       = 0x0000_0400;
        /// Picks up SPECIAL things it touches.
        const PICKUP        = 0x0000_0800;
        /// Ignores all collision.
        const NOCLIP        = 0x0000_1000;
        /// Slides along walls instead of stopping dead.
        const SLIDE         = 0x0000_2000;
        /// Floats vertically toward its target.
        const FLOAT         = 0x0000_4000;
        /// Next move is unclipped (spawn-time placement).
        const TELEPORT      = 0x0000_8000;
        /// In-flight projectile; explodes on contact.
        const MISSILE       = 0x0001_0000;
        /// Dropped by a dying thing; never respawns.
        const DROPPED       = 0x0002_0000;
        /// Fuzzy render; aimed attacks jitter.
        const SHADOW        = 0x0004_0000;
        /// Bleeds puffs instead of blood.
        const NOBLOOD       = 0x0008_0000;
        /// Dead; slides off ledges instead of stopping at them.
        const CORPSE        = 0x0010_0000;
        /// Mid float-adjust; skip target altitude homing this tic.
        const INFLOAT       = 0x0020_0000;
        /// Counts toward the level kill total.
        const COUNTKILL     = 0x0040_0000;
        /// Counts toward the level item total.
        const COUNTITEM     = 0x0080_0000;
        /// Airborne charge attack in progress.
        const SKULLFLY      = 0x0100_0000;
        /// Not spawned in deathmatch.
        const NOTDMATCH     = 0x0200_0000;
        /// Palette translation sub-field, bit 0 of 2.
        const TRANSLATION1  = 0x0400_0000;
        /// Palette translation sub-field, bit 1 of 2.
        const TRANSLATION2  = 0x0800_0000;
        /// Drawn half opaque.
        const TRANSLUCENT   = 0x4000_0000;
    }
}

/// First bit of the palette translation sub-field.
pub const TRANSLATION_SHIFT: u32 = 26;

impl MobjFlags {
    /// Palette translation index, 0..=3.
    pub fn translation(self) -> u32 {
        ((self.bits() >> TRANSLATION_SHIFT) & 3) as u32
    }

    /// Replaces the palette translation index. Values above 3 are masked.
    pub fn with_translation(self, index: u32) -> Self {
        let cleared = self.bits() & !(3 << TRANSLATION_SHIFT);
        Self::from_bits_retain(cleared | ((index as u64 & 3) << TRANSLATION_SHIFT))
    }
}

// =============================================================================
// Handles
// =============================================================================

/// Generational reference to a map object slot. Stale handles resolve to
/// nothing after the slot is reused, so holders never observe a recycled
/// thing through an old reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MobjHandle {
    pub(crate) slot: u32,
    pub(crate) gen: u32,
}

impl MobjHandle {
    pub fn slot(self) -> usize {
        self.slot as usize
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpawnError {
    #[error("mobj arena full ({0} slots)")]
    ArenaFull(usize),
    #[error("unknown mobj type index {0}")]
    BadType(usize),
}

// =============================================================================
// Configuration
// =============================================================================

/// Tunables fixed at level setup.
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    pub gravity: Fixed,
    pub deathmatch: bool,
    /// Re-spawn picked-up items after `item_respawn_delay` tics.
    pub respawn_items: bool,
    pub item_respawn_delay: u32,
    pub max_mobjs: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            deathmatch: false,
            respawn_items: false,
            item_respawn_delay: 30 * TICRATE,
            max_mobjs: 1024,
        }
    }
}

/// Sound cue emitted during a tic, drained by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundEvent {
    pub source: Option<MobjHandle>,
    pub sfx: Sfx,
}

// =============================================================================
// Level context
// =============================================================================

/// All mutable simulation state for one level. Owns the map geometry, the
/// object arena, the spatial indexes, and the per-level counters; every
/// simulation routine takes `&mut Level` instead of touching globals.
pub struct Level {
    pub config: SimConfig,
    /// Animation state table driving every thing's behavior.
    pub states: &'static [State],
    /// Per-type static attributes.
    pub mobjinfo: &'static [MobjInfo],

    pub sectors: Vec<Sector>,
    pub lines: Vec<Line>,
    pub blockmap: Blockmap,

    pub mobjs: MobjArena,
    pub thinkers: ThinkerList,
    pub secnodes: SecNodePool,
    pub respawn_queue: RespawnQueue,

    pub rng: SimRng,
    pub validcount: u32,
    pub leveltime: u32,
    /// Set by the last try_move: the move failed only because of height,
    /// so a floater could make it by adjusting z.
    pub floatok: bool,

    pub player: Option<MobjHandle>,
    pub total_kills: i32,
    pub kills: i32,
    pub total_items: i32,
    pub items: i32,

    /// Sound cues from the current tic.
    pub sounds: Vec<SoundEvent>,
}

impl Level {
    /// Advances the traversal epoch. Callers stamp visited lines and things
    /// with the returned value so each is visited at most once per query.
    pub fn bump_validcount(&mut self) -> u32 {
        self.validcount = self.validcount.wrapping_add(1);
        self.validcount
    }

    pub fn state(&self, st: StateNum) -> Option<&'static State> {
        self.states.get(st)
    }

    pub fn info(&self, t: MobjType) -> &'static MobjInfo {
        &self.mobjinfo[t as usize]
    }

    pub fn mobj(&self, h: MobjHandle) -> Option<&Mobj> {
        self.mobjs.get(h)
    }

    pub fn mobj_mut(&mut self, h: MobjHandle) -> Option<&mut Mobj> {
        self.mobjs.get_mut(h)
    }

    /// True when the handle still refers to a live thing; the live-or-dead
    /// check every held reference goes through before use.
    pub fn deref(&self, r: Option<MobjHandle>) -> Option<MobjHandle> {
        r.filter(|&h| self.mobjs.get(h).is_some())
    }

    pub fn is_player(&self, h: MobjHandle) -> bool {
        self.player == Some(h)
    }

    pub fn post_sound(&mut self, source: Option<MobjHandle>, sfx: Sfx) {
        self.sounds.push(SoundEvent { source, sfx });
    }
}

/// Widens map units to fixed point.
pub const fn map_units(n: i32) -> Fixed {
    Fixed(n << FRACBITS)
}
