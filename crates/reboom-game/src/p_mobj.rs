// p_mobj.rs -- map objects: arena storage, state machine, spawn and motion

use tracing::{debug, warn};

use reboom_common::fixed::{approx_dist, Fixed, FRACUNIT, ZERO};
use reboom_common::tables::{point_to_angle, Angle, ANG0};

use crate::dispatch;
use crate::info::{MobjType, SpriteNum, StateNum, S_BLOOD2, S_BLOOD3, S_NULL};
use crate::p_local::{
    Level, MobjFlags, MobjHandle, SpawnError, DI_NODIR, FLOATSPEED, ITEMQUESIZE, MAXMOVE,
    ONCEILINGZ, ONFLOORZ, STOPSPEED,
};
use crate::p_local::FRICTION;
use crate::p_map;
use crate::p_setup::{MapThing, Skill, ThingOptions};

/// Give up on a zero-tic state chain after this many hops and force a
/// one-tic delay instead of spinning forever.
pub const SET_STATE_LOOP_CAP: usize = 64;

// =============================================================================
// The map object
// =============================================================================

/// One simulated entity. Positions and momenta are 16.16 fixed point;
/// relational fields hold generational handles that read as dead once the
/// referenced thing is removed.
#[derive(Debug, Clone)]
pub struct Mobj {
    pub mtype: MobjType,

    pub x: Fixed,
    pub y: Fixed,
    pub z: Fixed,
    pub angle: Angle,
    pub sprite: SpriteNum,
    pub frame: i32,

    /// Highest floor of all sectors the collision box touches.
    pub floorz: Fixed,
    /// Lowest ceiling of all sectors the collision box touches.
    pub ceilingz: Fixed,
    /// Lowest floor reachable from here; gates ledge walks.
    pub dropoffz: Fixed,

    pub radius: Fixed,
    pub height: Fixed,
    pub momx: Fixed,
    pub momy: Fixed,
    pub momz: Fixed,

    pub state: StateNum,
    /// Tics left in the current state; -1 holds forever.
    pub tics: i32,
    pub flags: MobjFlags,
    pub health: i32,

    /// Compass direction of travel, 0..=7, or DI_NODIR.
    pub movedir: u8,
    /// Steps left before choosing a new direction.
    pub movecount: i16,
    /// Tics before first attack after waking.
    pub reactiontime: i16,
    /// While positive, keep the current target despite new damage.
    pub threshold: i16,

    pub target: Option<MobjHandle>,
    pub tracer: Option<MobjHandle>,
    pub lastenemy: Option<MobjHandle>,
    /// Thing this one is standing on top of.
    pub above_thing: Option<MobjHandle>,
    /// Thing standing on top of this one.
    pub below_thing: Option<MobjHandle>,

    /// Sector containing the origin.
    pub sector: usize,
    pub(crate) snext: Option<MobjHandle>,
    pub(crate) sprev: Option<MobjHandle>,
    pub(crate) bnext: Option<MobjHandle>,
    pub(crate) bprev: Option<MobjHandle>,
    /// Blockmap cell currently linked into, if any.
    pub(crate) block: Option<usize>,
    /// Head of this thing's chain of touched-sector nodes.
    pub(crate) touching: Option<u32>,

    /// Original placement, kept for item respawn.
    pub spawnpoint: Option<MapThing>,
}

impl Mobj {
    pub fn top(&self) -> Fixed {
        self.z + self.height
    }
}

// =============================================================================
// Arena
// =============================================================================

#[derive(Debug, Clone)]
struct Slot {
    gen: u32,
    mobj: Option<Mobj>,
}

/// Slot storage for every live thing. Handles carry the generation of the
/// slot they were issued from; a freed or reused slot no longer matches, so
/// dangling handles resolve to nothing instead of to the new occupant.
pub struct MobjArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    capacity: usize,
}

impl MobjArena {
    pub fn new(capacity: usize) -> Self {
        Self { slots: Vec::new(), free: Vec::new(), live: 0, capacity }
    }

    pub fn insert(&mut self, mobj: Mobj) -> Result<MobjHandle, SpawnError> {
        let h = if let Some(slot) = self.free.pop() {
            self.slots[slot as usize].mobj = Some(mobj);
            MobjHandle { slot, gen: self.slots[slot as usize].gen }
        } else if self.slots.len() < self.capacity {
            self.slots.push(Slot { gen: 0, mobj: Some(mobj) });
            MobjHandle { slot: (self.slots.len() - 1) as u32, gen: 0 }
        } else {
            return Err(SpawnError::ArenaFull(self.capacity));
        };
        self.live += 1;
        Ok(h)
    }

    pub fn get(&self, h: MobjHandle) -> Option<&Mobj> {
        let slot = self.slots.get(h.slot())?;
        if slot.gen != h.gen {
            return None;
        }
        slot.mobj.as_ref()
    }

    pub fn get_mut(&mut self, h: MobjHandle) -> Option<&mut Mobj> {
        let slot = self.slots.get_mut(h.slot())?;
        if slot.gen != h.gen {
            return None;
        }
        slot.mobj.as_mut()
    }

    pub fn remove(&mut self, h: MobjHandle) -> Option<Mobj> {
        let slot = self.slots.get_mut(h.slot())?;
        if slot.gen != h.gen || slot.mobj.is_none() {
            return None;
        }
        let m = slot.mobj.take();
        slot.gen = slot.gen.wrapping_add(1);
        self.free.push(h.slot);
        self.live -= 1;
        m
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = (MobjHandle, &Mobj)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.mobj
                .as_ref()
                .map(|m| (MobjHandle { slot: i as u32, gen: s.gen }, m))
        })
    }
}

// =============================================================================
// State machine
// =============================================================================

/// Moves a thing into a new state, running entry actions and chaining
/// through zero-tic states immediately. Returns false if the thing removed
/// itself along the way.
pub fn set_mobj_state(level: &mut Level, h: MobjHandle, st: StateNum) -> bool {
    let mut st = st;
    for _ in 0..SET_STATE_LOOP_CAP {
        if st == S_NULL {
            remove_mobj(level, h);
            return false;
        }
        let Some(&state) = level.states.get(st) else {
            warn!(state = st, "state index out of table, holding current state");
            return level.mobjs.get(h).is_some();
        };
        match level.mobjs.get_mut(h) {
            Some(m) => {
                m.state = st;
                m.tics = state.tics;
                m.sprite = state.sprite;
                m.frame = state.frame;
            }
            None => return false,
        }
        if let Some(action) = state.action {
            dispatch::run_action(level, h, action);
            match level.mobjs.get(h) {
                None => return false,
                // the action may have jumped to another state itself
                Some(m) if m.state != st => return true,
                Some(_) => {}
            }
        }
        if state.tics != 0 {
            return true;
        }
        st = state.next;
    }
    warn!(state = st, "zero-tic state cycle, forcing a one-tic delay");
    if let Some(m) = level.mobjs.get_mut(h) {
        m.tics = 1;
    }
    true
}

// =============================================================================
// Spawning and removal
// =============================================================================

pub fn spawn_mobj(
    level: &mut Level,
    x: Fixed,
    y: Fixed,
    z: Fixed,
    t: MobjType,
) -> Result<MobjHandle, SpawnError> {
    let info = level.info(t);
    let state = level.states[info.spawnstate];

    let mobj = Mobj {
        mtype: t,
        x,
        y,
        z,
        angle: ANG0,
        sprite: state.sprite,
        frame: state.frame,
        floorz: ZERO,
        ceilingz: ZERO,
        dropoffz: ZERO,
        radius: info.radius,
        height: info.height,
        momx: ZERO,
        momy: ZERO,
        momz: ZERO,
        state: info.spawnstate,
        tics: state.tics,
        flags: info.flags,
        health: info.spawnhealth,
        movedir: DI_NODIR,
        movecount: 0,
        reactiontime: info.reactiontime,
        threshold: 0,
        target: None,
        tracer: None,
        lastenemy: None,
        above_thing: None,
        below_thing: None,
        sector: 0,
        snext: None,
        sprev: None,
        bnext: None,
        bprev: None,
        block: None,
        touching: None,
        spawnpoint: None,
    };

    let h = level.mobjs.insert(mobj)?;
    p_map::set_thing_position(level, h);
    if let Some(m) = level.mobjs.get_mut(h) {
        let sec = &level.sectors[m.sector];
        m.floorz = sec.floor;
        m.ceilingz = sec.ceiling;
        m.dropoffz = sec.floor;
        m.z = if z == ONFLOORZ {
            m.floorz
        } else if z == ONCEILINGZ {
            m.ceilingz - m.height
        } else {
            z
        };
    }
    level.thinkers.add(h);
    Ok(h)
}

/// Spawns one placement record, honoring skill and deathmatch filters.
pub fn spawn_map_thing(
    level: &mut Level,
    mt: &MapThing,
    skill: Skill,
) -> Result<Option<MobjHandle>, SpawnError> {
    if !mt.options.allows_skill(skill) {
        return Ok(None);
    }
    let info = level.info(mt.mtype);
    if level.config.deathmatch && info.flags.contains(MobjFlags::NOTDMATCH) {
        return Ok(None);
    }

    let z = if info.flags.contains(MobjFlags::SPAWNCEILING) {
        ONCEILINGZ
    } else {
        ONFLOORZ
    };
    let h = spawn_mobj(level, mt.x, mt.y, z, mt.mtype)?;

    let jitter = level.rng.p_random();
    if let Some(m) = level.mobjs.get_mut(h) {
        m.angle = mt.angle;
        m.spawnpoint = Some(*mt);
        // desync idle animations across the map
        if m.tics > 0 {
            m.tics = 1 + (jitter % m.tics);
        }
        if mt.options.contains(ThingOptions::AMBUSH) {
            m.flags.insert(MobjFlags::AMBUSH);
        }
        if m.flags.contains(MobjFlags::COUNTKILL) {
            level.total_kills += 1;
        }
        if m.flags.contains(MobjFlags::COUNTITEM) {
            level.total_items += 1;
        }
    }
    if mt.mtype == MobjType::Player {
        level.player = Some(h);
    }
    Ok(Some(h))
}

/// Unlinks a thing from every index and frees its slot. Handles held by
/// others go stale rather than being chased down; holders observe the
/// removal the next time they dereference.
pub fn remove_mobj(level: &mut Level, h: MobjHandle) {
    let Some(m) = level.mobjs.get(h) else {
        return;
    };
    let respawnable = m.flags.contains(MobjFlags::SPECIAL) && !m.flags.contains(MobjFlags::DROPPED);
    let spawnpoint = m.spawnpoint;
    let (above, below) = (m.above_thing, m.below_thing);

    if respawnable && level.config.respawn_items {
        if let Some(sp) = spawnpoint {
            level.respawn_queue.push(sp, level.leveltime);
        }
    }

    // break stacking pairs so the partner does not point at a free slot
    if let Some(o) = above {
        if let Some(om) = level.mobjs.get_mut(o) {
            om.below_thing = None;
        }
    }
    if let Some(o) = below {
        if let Some(om) = level.mobjs.get_mut(o) {
            om.above_thing = None;
        }
    }

    p_map::unset_thing_position(level, h);
    p_map::free_touching(level, h);
    level.mobjs.remove(h);
}

// =============================================================================
// Item respawn queue
// =============================================================================

/// Fixed ring of pending item respawns. Overflow drops the oldest entry.
pub struct RespawnQueue {
    que: [Option<(MapThing, u32)>; ITEMQUESIZE],
    head: usize,
    tail: usize,
}

impl RespawnQueue {
    pub fn new() -> Self {
        Self { que: [None; ITEMQUESIZE], head: 0, tail: 0 }
    }

    pub fn push(&mut self, mt: MapThing, time: u32) {
        self.que[self.head] = Some((mt, time));
        self.head = (self.head + 1) % ITEMQUESIZE;
        if self.head == self.tail {
            self.tail = (self.tail + 1) % ITEMQUESIZE;
        }
    }

    pub fn front(&self) -> Option<(MapThing, u32)> {
        self.que[self.tail]
    }

    pub fn pop(&mut self) -> Option<(MapThing, u32)> {
        let e = self.que[self.tail].take()?;
        self.tail = (self.tail + 1) % ITEMQUESIZE;
        Some(e)
    }

    pub fn is_empty(&self) -> bool {
        self.que[self.tail].is_none()
    }

    /// Pending entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (MapThing, u32)> + '_ {
        (0..ITEMQUESIZE)
            .map(move |i| self.que[(self.tail + i) % ITEMQUESIZE])
            .take_while(|e| e.is_some())
            .flatten()
    }
}

impl Default for RespawnQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-spawns the oldest queued item once its delay has elapsed. At most one
/// item comes back per tic.
pub fn respawn_specials(level: &mut Level) {
    if !level.config.respawn_items {
        return;
    }
    let Some((mt, time)) = level.respawn_queue.front() else {
        return;
    };
    if level.leveltime.wrapping_sub(time) < level.config.item_respawn_delay {
        return;
    }
    level.respawn_queue.pop();

    level.post_sound(None, crate::info::Sfx::ItemRespawn);
    match spawn_mobj(level, mt.x, mt.y, ONFLOORZ, mt.mtype) {
        Ok(h) => {
            if let Some(m) = level.mobjs.get_mut(h) {
                m.angle = mt.angle;
                m.spawnpoint = Some(mt);
            }
        }
        Err(e) => warn!(error = %e, "item respawn failed"),
    }
}

// =============================================================================
// Thinker
// =============================================================================

/// Drops relational handles whose referent has been removed since the last
/// time this thing acted.
pub(crate) fn sanitize_refs(level: &mut Level, h: MobjHandle) {
    let target = level.deref(level.mobjs.get(h).and_then(|m| m.target));
    let tracer = level.deref(level.mobjs.get(h).and_then(|m| m.tracer));
    let lastenemy = level.deref(level.mobjs.get(h).and_then(|m| m.lastenemy));
    let above = level.deref(level.mobjs.get(h).and_then(|m| m.above_thing));
    let below = level.deref(level.mobjs.get(h).and_then(|m| m.below_thing));
    if let Some(m) = level.mobjs.get_mut(h) {
        m.target = target;
        m.tracer = tracer;
        m.lastenemy = lastenemy;
        m.above_thing = above;
        m.below_thing = below;
    }
}

/// Per-tic update for one thing: momentum, gravity, then state tics.
pub fn mobj_thinker(level: &mut Level, h: MobjHandle) {
    sanitize_refs(level, h);

    let Some(m) = level.mobjs.get(h) else {
        return;
    };
    if m.momx != ZERO || m.momy != ZERO || m.flags.contains(MobjFlags::SKULLFLY) {
        xy_movement(level, h);
        if level.mobjs.get(h).is_none() {
            return;
        }
    }

    let Some(m) = level.mobjs.get(h) else {
        return;
    };
    if m.z != m.floorz || m.momz != ZERO {
        z_movement(level, h);
        if level.mobjs.get(h).is_none() {
            return;
        }
    }

    let Some(m) = level.mobjs.get_mut(h) else {
        return;
    };
    if m.tics == -1 {
        return;
    }
    m.tics -= 1;
    if m.tics <= 0 {
        let next = level.states[m.state].next;
        set_mobj_state(level, h, next);
    }
}

// =============================================================================
// Horizontal movement
// =============================================================================

fn xy_movement(level: &mut Level, h: MobjHandle) {
    let Some(m) = level.mobjs.get_mut(h) else {
        return;
    };

    if m.momx == ZERO && m.momy == ZERO {
        if m.flags.contains(MobjFlags::SKULLFLY) {
            // charge ran out against a wall or a slam
            m.flags.remove(MobjFlags::SKULLFLY);
            m.momz = ZERO;
            let mt = m.mtype;
            let spawn = level.info(mt).spawnstate;
            set_mobj_state(level, h, spawn);
        }
        return;
    }

    m.momx = m.momx.clamp(-MAXMOVE, MAXMOVE);
    m.momy = m.momy.clamp(-MAXMOVE, MAXMOVE);
    let mut xmove = m.momx;
    let mut ymove = m.momy;

    loop {
        let Some(m) = level.mobjs.get(h) else {
            return;
        };
        // cut long moves in half so nothing tunnels through a thin wall
        let (ptryx, ptryy) = if xmove.abs() > MAXMOVE.half() || ymove.abs() > MAXMOVE.half() {
            let step = (m.x + xmove.half(), m.y + ymove.half());
            xmove = xmove.half();
            ymove = ymove.half();
            step
        } else {
            let step = (m.x + xmove, m.y + ymove);
            xmove = ZERO;
            ymove = ZERO;
            step
        };

        if !p_map::try_move(level, h, ptryx, ptryy) {
            let Some(m) = level.mobjs.get(h) else {
                return;
            };
            if m.flags.contains(MobjFlags::SLIDE) {
                p_map::slide_move(level, h, ptryx, ptryy);
            } else if m.flags.contains(MobjFlags::MISSILE) {
                explode_missile(level, h);
                return;
            } else {
                let Some(m) = level.mobjs.get_mut(h) else {
                    return;
                };
                m.momx = ZERO;
                m.momy = ZERO;
            }
        }

        if xmove == ZERO && ymove == ZERO {
            break;
        }
    }

    // friction
    let Some(m) = level.mobjs.get_mut(h) else {
        return;
    };
    if m.flags.intersects(MobjFlags::MISSILE | MobjFlags::SKULLFLY) {
        return;
    }
    if m.z > m.floorz {
        return;
    }
    if m.flags.contains(MobjFlags::CORPSE) && m.z != m.floorz {
        // corpses keep sliding until they settle
        return;
    }
    if m.momx.abs() < STOPSPEED && m.momy.abs() < STOPSPEED {
        m.momx = ZERO;
        m.momy = ZERO;
    } else {
        m.momx = m.momx.mul(FRICTION);
        m.momy = m.momy.mul(FRICTION);
    }
}

// =============================================================================
// Vertical movement
// =============================================================================

fn z_movement(level: &mut Level, h: MobjHandle) {
    let gravity = level.config.gravity;

    // floaters drift toward their target's altitude
    let (do_float, float_delta) = {
        let Some(m) = level.mobjs.get(h) else {
            return;
        };
        let target = level.deref(m.target);
        if m.flags.contains(MobjFlags::FLOAT)
            && !m.flags.intersects(MobjFlags::SKULLFLY | MobjFlags::INFLOAT)
        {
            if let Some(t) = target.and_then(|t| level.mobjs.get(t)) {
                let dist = approx_dist(m.x - t.x, m.y - t.y);
                let delta = (t.z + m.height.half()) - m.z;
                if delta < ZERO && dist < -(delta * 3) {
                    (true, -FLOATSPEED)
                } else if delta > ZERO && dist < delta * 3 {
                    (true, FLOATSPEED)
                } else {
                    (false, ZERO)
                }
            } else {
                (false, ZERO)
            }
        } else {
            (false, ZERO)
        }
    };

    let mut exploded = false;
    let mut oof = false;
    {
        let is_player = level.is_player(h);
        let Some(m) = level.mobjs.get_mut(h) else {
            return;
        };
        if do_float {
            m.z = m.z + float_delta;
        }
        m.z = m.z + m.momz;

        if m.z <= m.floorz {
            if m.momz < ZERO {
                if is_player && m.momz < -(gravity * 8) {
                    // hard landing
                    oof = true;
                }
                if m.flags.contains(MobjFlags::SKULLFLY) {
                    m.momz = -m.momz;
                } else {
                    m.momz = ZERO;
                }
            }
            m.z = m.floorz;
            if m.flags.contains(MobjFlags::MISSILE) && !m.flags.contains(MobjFlags::NOCLIP) {
                exploded = true;
            }
        } else if !m.flags.contains(MobjFlags::NOGRAVITY) {
            if m.momz == ZERO {
                m.momz = -(gravity + gravity);
            } else {
                m.momz = m.momz - gravity;
            }
        }

        if m.top() > m.ceilingz {
            m.z = m.ceilingz - m.height;
            if m.momz > ZERO {
                if m.flags.contains(MobjFlags::SKULLFLY) {
                    m.momz = -m.momz;
                } else {
                    m.momz = ZERO;
                }
            }
            if m.flags.contains(MobjFlags::MISSILE) && !m.flags.contains(MobjFlags::NOCLIP) {
                exploded = true;
            }
        }
    }

    if oof {
        level.post_sound(Some(h), crate::info::Sfx::Oof);
    }
    if exploded {
        explode_missile(level, h);
    }
}

// =============================================================================
// Derived spawns
// =============================================================================

pub fn spawn_puff(level: &mut Level, x: Fixed, y: Fixed, z: Fixed) {
    let jitter = Fixed(level.rng.p_sub_random() << 10);
    match spawn_mobj(level, x, y, z + jitter, MobjType::Puff) {
        Ok(h) => {
            let cut = level.rng.p_random() & 3;
            if let Some(m) = level.mobjs.get_mut(h) {
                m.momz = FRACUNIT;
                m.tics = (m.tics - cut).max(1);
            }
        }
        Err(e) => debug!(error = %e, "no room for puff"),
    }
}

pub fn spawn_blood(level: &mut Level, x: Fixed, y: Fixed, z: Fixed, damage: i32) {
    let jitter = Fixed(level.rng.p_sub_random() << 10);
    match spawn_mobj(level, x, y, z + jitter, MobjType::Blood) {
        Ok(h) => {
            let cut = level.rng.p_random() & 3;
            if let Some(m) = level.mobjs.get_mut(h) {
                m.momz = FRACUNIT * 2;
                m.tics = (m.tics - cut).max(1);
            }
            // lighter wounds start on a smaller drop
            if (9..=12).contains(&damage) {
                set_mobj_state(level, h, S_BLOOD2);
            } else if damage < 9 {
                set_mobj_state(level, h, S_BLOOD3);
            }
        }
        Err(e) => debug!(error = %e, "no room for blood"),
    }
}

/// Launches a missile from `source` toward `dest`. The missile's target
/// field records the shooter for blame and species checks.
pub fn spawn_missile(
    level: &mut Level,
    source: MobjHandle,
    dest: MobjHandle,
    t: MobjType,
) -> Option<MobjHandle> {
    let (sx, sy, sz) = {
        let s = level.mobjs.get(source)?;
        (s.x, s.y, s.z + Fixed(32 * FRACUNIT.0))
    };
    let (dx, dy, dz, shadow) = {
        let d = level.mobjs.get(dest)?;
        (d.x, d.y, d.z, d.flags.contains(MobjFlags::SHADOW))
    };

    let h = match spawn_mobj(level, sx, sy, sz, t) {
        Ok(h) => h,
        Err(e) => {
            warn!(error = %e, "missile spawn failed");
            return None;
        }
    };

    let info = level.info(t);
    if let Some(sfx) = info.seesound {
        level.post_sound(Some(h), sfx);
    }

    let mut an = point_to_angle(dx - sx, dy - sy);
    if shadow {
        // fuzzy targets are hard to aim at
        an = an + Angle((level.rng.p_sub_random() << 20) as u32);
    }
    let speed = info.speed;
    let dist = approx_dist(dx - sx, dy - sy);
    let travel = dist.div(speed).to_int().max(1);

    if let Some(m) = level.mobjs.get_mut(h) {
        m.target = Some(source);
        m.angle = an;
        m.momx = speed.mul(an.cos());
        m.momy = speed.mul(an.sin());
        m.momz = Fixed((dz - sz).0 / travel);
    }
    check_missile_spawn(level, h);
    level.deref(Some(h))
}

/// Fires a missile straight along the shooter's facing.
pub fn spawn_player_missile(level: &mut Level, source: MobjHandle, t: MobjType) -> Option<MobjHandle> {
    let (sx, sy, sz, an) = {
        let s = level.mobjs.get(source)?;
        (s.x, s.y, s.z + Fixed(32 * FRACUNIT.0), s.angle)
    };
    let h = match spawn_mobj(level, sx, sy, sz, t) {
        Ok(h) => h,
        Err(e) => {
            warn!(error = %e, "missile spawn failed");
            return None;
        }
    };
    let info = level.info(t);
    if let Some(sfx) = info.seesound {
        level.post_sound(Some(h), sfx);
    }
    if let Some(m) = level.mobjs.get_mut(h) {
        m.target = Some(source);
        m.angle = an;
        m.momx = info.speed.mul(an.cos());
        m.momy = info.speed.mul(an.sin());
    }
    check_missile_spawn(level, h);
    level.deref(Some(h))
}

/// Moves a fresh missile a half step so point-blank shots detonate at once,
/// and desyncs its animation.
fn check_missile_spawn(level: &mut Level, h: MobjHandle) {
    let cut = level.rng.p_random() & 3;
    let Some(m) = level.mobjs.get_mut(h) else {
        return;
    };
    if m.tics > 0 {
        m.tics = (m.tics - cut).max(1);
    }
    m.x = m.x + m.momx.half();
    m.y = m.y + m.momy.half();
    m.z = m.z + m.momz.half();
    let (x, y) = (m.x, m.y);
    if !p_map::try_move(level, h, x, y) {
        explode_missile(level, h);
    }
}

/// Stops a missile and begins its death animation.
pub fn explode_missile(level: &mut Level, h: MobjHandle) {
    let Some(m) = level.mobjs.get_mut(h) else {
        return;
    };
    m.momx = ZERO;
    m.momy = ZERO;
    m.momz = ZERO;
    let mt = m.mtype;
    let death = level.info(mt).deathstate;
    let sound = level.info(mt).deathsound;

    if !set_mobj_state(level, h, death) {
        return;
    }
    let cut = level.rng.p_random() & 3;
    if let Some(m) = level.mobjs.get_mut(h) {
        if m.tics > 0 {
            m.tics = (m.tics - cut).max(1);
        }
        m.flags.remove(MobjFlags::MISSILE);
    }
    if let Some(sfx) = sound {
        level.post_sound(Some(h), sfx);
    }
}
