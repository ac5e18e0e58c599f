// p_saveg.rs -- snapshot and restore of the live simulation state

use tracing::warn;

use reboom_common::fixed::Fixed;
use reboom_common::tables::Angle;

use crate::info::{MobjType, SpriteNum, StateNum};
use crate::p_local::{Level, MobjFlags, MobjHandle, SpawnError};
use crate::p_map;
use crate::p_mobj::spawn_mobj;
use crate::p_setup::MapThing;

/// One map object, with cross-references flattened to indexes into the
/// snapshot's own `mobjs` list.
#[derive(Debug, Clone, Copy)]
pub struct MobjSnapshot {
    pub mtype: MobjType,
    pub x: Fixed,
    pub y: Fixed,
    pub z: Fixed,
    pub angle: Angle,
    pub sprite: SpriteNum,
    pub frame: i32,
    pub radius: Fixed,
    pub height: Fixed,
    pub momx: Fixed,
    pub momy: Fixed,
    pub momz: Fixed,
    pub state: StateNum,
    pub tics: i32,
    pub flags: u64,
    pub health: i32,
    pub movedir: u8,
    pub movecount: i16,
    pub reactiontime: i16,
    pub threshold: i16,
    pub target: Option<u32>,
    pub tracer: Option<u32>,
    pub lastenemy: Option<u32>,
    pub above_thing: Option<u32>,
    pub below_thing: Option<u32>,
    pub spawnpoint: Option<MapThing>,
}

/// Everything the simulation needs beyond the static geometry.
#[derive(Debug, Clone)]
pub struct LevelSnapshot {
    pub leveltime: u32,
    pub rng_index: u8,
    pub total_kills: i32,
    pub kills: i32,
    pub total_items: i32,
    pub items: i32,
    pub mobjs: Vec<MobjSnapshot>,
    pub player: Option<u32>,
    pub respawn_queue: Vec<(MapThing, u32)>,
}

/// Captures the live things in thinker order. Stale handles flatten to
/// `None`, so a snapshot never carries a dangling reference.
pub fn snapshot_level(level: &Level) -> LevelSnapshot {
    let live: Vec<MobjHandle> = level
        .thinkers
        .iter()
        .filter(|&h| level.mobjs.get(h).is_some())
        .collect();
    let index_of = |h: Option<MobjHandle>| -> Option<u32> {
        let h = level.deref(h)?;
        live.iter().position(|&o| o == h).map(|i| i as u32)
    };

    let mobjs = live
        .iter()
        .filter_map(|&h| level.mobjs.get(h))
        .map(|m| {
            MobjSnapshot {
                mtype: m.mtype,
                x: m.x,
                y: m.y,
                z: m.z,
                angle: m.angle,
                sprite: m.sprite,
                frame: m.frame,
                radius: m.radius,
                height: m.height,
                momx: m.momx,
                momy: m.momy,
                momz: m.momz,
                state: m.state,
                tics: m.tics,
                flags: m.flags.bits(),
                health: m.health,
                movedir: m.movedir,
                movecount: m.movecount,
                reactiontime: m.reactiontime,
                threshold: m.threshold,
                target: index_of(m.target),
                tracer: index_of(m.tracer),
                lastenemy: index_of(m.lastenemy),
                above_thing: index_of(m.above_thing),
                below_thing: index_of(m.below_thing),
                spawnpoint: m.spawnpoint,
            }
        })
        .collect();

    LevelSnapshot {
        leveltime: level.leveltime,
        rng_index: level.rng.index(),
        total_kills: level.total_kills,
        kills: level.kills,
        total_items: level.total_items,
        items: level.items,
        mobjs,
        player: index_of(level.player),
        respawn_queue: level.respawn_queue.iter().collect(),
    }
}

/// Rebuilds the dynamic state into a level that already has its geometry
/// set up but no things. Spawns each thing at its saved spot, overlays the
/// saved fields, then stitches the cross-references back together.
pub fn restore_level(level: &mut Level, snap: &LevelSnapshot) -> Result<(), SpawnError> {
    if !level.mobjs.is_empty() {
        warn!("restoring over live things");
    }

    let mut handles: Vec<MobjHandle> = Vec::with_capacity(snap.mobjs.len());
    for ms in &snap.mobjs {
        let h = spawn_mobj(level, ms.x, ms.y, ms.z, ms.mtype)?;
        handles.push(h);
    }

    for (i, ms) in snap.mobjs.iter().enumerate() {
        let h = handles[i];
        // flags may differ from the spawn defaults, so relink around them
        p_map::unset_thing_position(level, h);
        if let Some(m) = level.mobjs.get_mut(h) {
            m.z = ms.z;
            m.angle = ms.angle;
            m.sprite = ms.sprite;
            m.frame = ms.frame;
            m.radius = ms.radius;
            m.height = ms.height;
            m.momx = ms.momx;
            m.momy = ms.momy;
            m.momz = ms.momz;
            m.state = ms.state;
            m.tics = ms.tics;
            m.flags = MobjFlags::from_bits_truncate(ms.flags);
            m.health = ms.health;
            m.movedir = ms.movedir;
            m.movecount = ms.movecount;
            m.reactiontime = ms.reactiontime;
            m.threshold = ms.threshold;
            m.spawnpoint = ms.spawnpoint;
        }
        p_map::set_thing_position(level, h);

        let deref_idx = |idx: Option<u32>| idx.and_then(|i| handles.get(i as usize).copied());
        let (target, tracer, lastenemy) =
            (deref_idx(ms.target), deref_idx(ms.tracer), deref_idx(ms.lastenemy));
        let (above, below) = (deref_idx(ms.above_thing), deref_idx(ms.below_thing));
        let sector = level.mobjs.get(h).map(|m| m.sector);
        let heights = sector.map(|s| (level.sectors[s].floor, level.sectors[s].ceiling));
        if let Some(m) = level.mobjs.get_mut(h) {
            m.target = target;
            m.tracer = tracer;
            m.lastenemy = lastenemy;
            m.above_thing = above;
            m.below_thing = below;
            if let Some((floor, ceiling)) = heights {
                m.floorz = floor;
                m.ceilingz = ceiling;
                m.dropoffz = floor;
            }
        }
    }

    level.leveltime = snap.leveltime;
    level.rng.set_index(snap.rng_index);
    level.total_kills = snap.total_kills;
    level.kills = snap.kills;
    level.total_items = snap.total_items;
    level.items = snap.items;
    level.player = snap.player.and_then(|i| handles.get(i as usize).copied());
    for &(mt, time) in &snap.respawn_queue {
        level.respawn_queue.push(mt, time);
    }
    Ok(())
}
