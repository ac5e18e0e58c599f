// p_map.rs -- collision resolution, spatial relinking, touch lists, attacks

use reboom_common::fixed::{Fixed, FRACUNIT, ZERO};
use reboom_common::tables::Angle;

use crate::info::MobjType;
use crate::p_inter;
use crate::p_local::{
    map_units, Level, MobjFlags, MobjHandle, MAXRADIUS, MAXSTEP,
};
use crate::p_maputl::{
    block_lines_iterator, block_things_iterator, box_on_line_side, line_opening,
    path_traverse, radius_things_iterator, BBox, InterceptTarget, PT_ADDLINES, PT_ADDTHINGS,
};
use crate::p_mobj::{set_mobj_state, spawn_blood, spawn_puff};
use crate::p_sight;

// =============================================================================
// Position checking
// =============================================================================

/// Outcome of testing a destination for one thing.
#[derive(Debug, Clone, Copy)]
pub struct PosCheck {
    pub ok: bool,
    /// Highest floor under the destination box.
    pub floorz: Fixed,
    /// Lowest ceiling over the destination box.
    pub ceilingz: Fixed,
    /// Lowest floor reachable over any crossed edge.
    pub dropoffz: Fixed,
    /// Solid thing whose top would support the mover at the destination.
    pub stand_on: Option<MobjHandle>,
    pub blocking_line: Option<usize>,
    pub blocking_thing: Option<MobjHandle>,
}

/// The mover's fields, copied out so visitors can run with `&mut Level`.
#[derive(Debug, Clone, Copy)]
struct MoveClip {
    thing: MobjHandle,
    x: Fixed,
    y: Fixed,
    z: Fixed,
    radius: Fixed,
    height: Fixed,
    flags: MobjFlags,
    bbox: BBox,
    /// Missile contact damage multiplier.
    damage: i32,
    /// Who fired this missile, if it is one.
    shooter: Option<MobjHandle>,
}

fn species_of(level: &Level, h: MobjHandle) -> Option<MobjType> {
    level.mobjs.get(h).map(|m| level.info(m.mtype).species)
}

/// Tests whether a thing could occupy (x, y), gathering the floor and
/// ceiling the destination would give it. Collisions with things and lines
/// run their side effects here: missiles detonate damage, charging things
/// slam, pickups trigger.
pub fn check_position(level: &mut Level, h: MobjHandle, x: Fixed, y: Fixed) -> PosCheck {
    let sec = level.point_in_sector(x, y);
    let mut pc = PosCheck {
        ok: true,
        floorz: level.sectors[sec].floor,
        ceilingz: level.sectors[sec].ceiling,
        dropoffz: level.sectors[sec].floor,
        stand_on: None,
        blocking_line: None,
        blocking_thing: None,
    };
    let Some(m) = level.mobjs.get(h) else {
        pc.ok = false;
        return pc;
    };
    let clip = MoveClip {
        thing: h,
        x,
        y,
        z: m.z,
        radius: m.radius,
        height: m.height,
        flags: m.flags,
        bbox: BBox::from_radius(x, y, m.radius),
        damage: level.info(m.mtype).damage,
        shooter: level.deref(m.target),
    };

    if clip.flags.contains(MobjFlags::NOCLIP) {
        return pc;
    }

    level.bump_validcount();

    // things first; the search box grows because things hang out of their
    // origin cell by up to their radius
    let xl = level.blockmap.block_x(clip.bbox.left - MAXRADIUS);
    let xh = level.blockmap.block_x(clip.bbox.right + MAXRADIUS);
    let yl = level.blockmap.block_y(clip.bbox.bottom - MAXRADIUS);
    let yh = level.blockmap.block_y(clip.bbox.top + MAXRADIUS);
    for by in yl..=yh {
        for bx in xl..=xh {
            let ok = block_things_iterator(level, bx, by, &mut |lv, other| {
                pit_check_thing(lv, &clip, &mut pc, other)
            });
            if !ok {
                pc.ok = false;
                return pc;
            }
        }
    }

    // then the static lines under the destination box
    let xl = level.blockmap.block_x(clip.bbox.left);
    let xh = level.blockmap.block_x(clip.bbox.right);
    let yl = level.blockmap.block_y(clip.bbox.bottom);
    let yh = level.blockmap.block_y(clip.bbox.top);
    for by in yl..=yh {
        for bx in xl..=xh {
            let ok = block_lines_iterator(level, bx, by, &mut |lv, li| {
                pit_check_line(lv, &clip, &mut pc, li)
            });
            if !ok {
                pc.ok = false;
                return pc;
            }
        }
    }

    pc
}

fn pit_check_thing(
    level: &mut Level,
    clip: &MoveClip,
    pc: &mut PosCheck,
    other: MobjHandle,
) -> bool {
    if other == clip.thing {
        return true;
    }
    let Some(o) = level.mobjs.get(other) else {
        return true;
    };
    if !o
        .flags
        .intersects(MobjFlags::SPECIAL | MobjFlags::SOLID | MobjFlags::SHOOTABLE)
    {
        return true;
    }
    let blockdist = o.radius + clip.radius;
    if (o.x - clip.x).abs() >= blockdist || (o.y - clip.y).abs() >= blockdist {
        return true;
    }
    let oflags = o.flags;
    let oz = o.z;
    let otop = o.top();

    if clip.flags.contains(MobjFlags::SKULLFLY) {
        // slam whatever we charged into, then fall out of the charge
        let damage = ((level.rng.p_random() % 8) + 1) * clip.damage;
        p_inter::damage_mobj(level, other, Some(clip.thing), Some(clip.thing), damage);
        let spawn = level
            .mobjs
            .get(clip.thing)
            .map(|m| level.info(m.mtype).spawnstate);
        if let Some(m) = level.mobjs.get_mut(clip.thing) {
            m.flags.remove(MobjFlags::SKULLFLY);
            m.momx = ZERO;
            m.momy = ZERO;
            m.momz = ZERO;
        }
        if let Some(spawn) = spawn {
            set_mobj_state(level, clip.thing, spawn);
        }
        pc.blocking_thing = Some(other);
        return false;
    }

    if clip.flags.contains(MobjFlags::MISSILE) {
        if clip.z >= otop {
            return true; // passes overhead
        }
        if clip.z + clip.height <= oz {
            return true; // passes underneath
        }
        if let Some(shooter) = clip.shooter {
            if shooter == other {
                return true; // never hits its own shooter
            }
            let same_kin = species_of(level, shooter) == species_of(level, other);
            let other_is_player = species_of(level, other) == Some(MobjType::Player);
            if same_kin && !other_is_player {
                // kin are transparent to each other's shots
                return true;
            }
        }
        if !oflags.contains(MobjFlags::SHOOTABLE) {
            return !oflags.contains(MobjFlags::SOLID);
        }
        let damage = ((level.rng.p_random() % 8) + 1) * clip.damage;
        p_inter::damage_mobj(level, other, Some(clip.thing), clip.shooter, damage);
        pc.blocking_thing = Some(other);
        return false;
    }

    if oflags.contains(MobjFlags::SPECIAL) {
        let solid = oflags.contains(MobjFlags::SOLID);
        if clip.flags.contains(MobjFlags::PICKUP) {
            p_inter::touch_special(level, other, clip.thing);
        }
        return !solid;
    }

    if oflags.contains(MobjFlags::SOLID) {
        // walkers may end up over or under a solid thing
        if clip.z >= otop {
            if otop > pc.floorz {
                pc.floorz = otop;
                pc.stand_on = Some(other);
            }
            return true;
        }
        if clip.z + clip.height <= oz {
            if oz < pc.ceilingz {
                pc.ceilingz = oz;
            }
            return true;
        }
        pc.blocking_thing = Some(other);
        return false;
    }

    true
}

fn pit_check_line(level: &mut Level, clip: &MoveClip, pc: &mut PosCheck, li: usize) -> bool {
    let line = &level.lines[li];
    if !clip.bbox.overlaps(&line.bbox) {
        return true;
    }
    if box_on_line_side(&clip.bbox, line) != -1 {
        return true;
    }
    if line.back_sector.is_none() {
        pc.blocking_line = Some(li);
        return false;
    }
    if !clip.flags.contains(MobjFlags::MISSILE) {
        if line.flags.contains(crate::p_setup::LineFlags::BLOCKING) {
            pc.blocking_line = Some(li);
            return false;
        }
        if !level.is_player(clip.thing)
            && line.flags.contains(crate::p_setup::LineFlags::BLOCK_MONSTERS)
        {
            pc.blocking_line = Some(li);
            return false;
        }
    }
    let open = line_opening(level, li);
    if open.top < pc.ceilingz {
        pc.ceilingz = open.top;
    }
    if open.bottom > pc.floorz {
        pc.floorz = open.bottom;
    }
    if open.lowfloor < pc.dropoffz {
        pc.dropoffz = open.lowfloor;
    }
    true
}

// =============================================================================
// Moving
// =============================================================================

/// Attempts to relocate a thing to (x, y), enforcing fit, step-up, and
/// dropoff rules, then atomically relinks it into the sector list, the
/// blockmap, and the touched-sector lists.
pub fn try_move(level: &mut Level, h: MobjHandle, x: Fixed, y: Fixed) -> bool {
    level.floatok = false;
    let pc = check_position(level, h, x, y);
    let Some(m) = level.mobjs.get(h) else {
        return false;
    };
    if !pc.ok {
        return false;
    }
    let flags = m.flags;
    let z = m.z;
    let height = m.height;

    if !flags.contains(MobjFlags::NOCLIP) {
        if pc.ceilingz - pc.floorz < height {
            return false; // does not fit at all
        }
        level.floatok = true;
        if !flags.contains(MobjFlags::TELEPORT) && pc.ceilingz - z < height {
            return false; // must lower itself first
        }
        if !flags.contains(MobjFlags::TELEPORT) && pc.floorz - z > MAXSTEP {
            return false; // step too high
        }
        if !flags.intersects(MobjFlags::DROPOFF | MobjFlags::FLOAT)
            && pc.floorz - pc.dropoffz > MAXSTEP
        {
            return false; // would walk off a ledge
        }
    }

    unset_thing_position(level, h);

    // the old stacking pair no longer holds
    let (above, below) = level
        .mobjs
        .get(h)
        .map(|m| (m.above_thing, m.below_thing))
        .unwrap_or((None, None));
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

    if let Some(m) = level.mobjs.get_mut(h) {
        m.floorz = pc.floorz;
        m.ceilingz = pc.ceilingz;
        m.dropoffz = pc.dropoffz;
        m.x = x;
        m.y = y;
        m.above_thing = None;
        m.below_thing = None;
    }
    set_thing_position(level, h);

    if let Some(support) = pc.stand_on {
        let standing = level.mobjs.get(h).map(|m| m.z == m.floorz).unwrap_or(false);
        if standing && level.mobjs.get(support).is_some() {
            if let Some(m) = level.mobjs.get_mut(h) {
                m.above_thing = Some(support);
            }
            if let Some(om) = level.mobjs.get_mut(support) {
                om.below_thing = Some(h);
            }
        }
    }
    true
}

/// Fallback for a rejected move by a sliding thing: keep whichever axis
/// components still work and kill the momentum of the ones that do not.
pub fn slide_move(level: &mut Level, h: MobjHandle, tryx: Fixed, tryy: Fixed) {
    let Some(m) = level.mobjs.get(h) else {
        return;
    };
    let cy = m.y;
    if !try_move(level, h, tryx, cy) {
        if let Some(m) = level.mobjs.get_mut(h) {
            m.momx = ZERO;
        }
    }
    let Some(m) = level.mobjs.get(h) else {
        return;
    };
    let cx = m.x;
    if !try_move(level, h, cx, tryy) {
        if let Some(m) = level.mobjs.get_mut(h) {
            m.momy = ZERO;
        }
    }
}

// =============================================================================
// Link maintenance
// =============================================================================

/// Links a thing into the sector thing list and the blockmap cell matching
/// its origin, then rebuilds its touched-sector list. NOSECTOR and
/// NOBLOCKMAP each suppress the corresponding index.
pub fn set_thing_position(level: &mut Level, h: MobjHandle) {
    let Some(m) = level.mobjs.get(h) else {
        return;
    };
    let (x, y, flags) = (m.x, m.y, m.flags);
    let sec = level.point_in_sector(x, y);

    if let Some(m) = level.mobjs.get_mut(h) {
        m.sector = sec;
    }
    if !flags.contains(MobjFlags::NOSECTOR) {
        let head = level.sectors[sec].thing_list;
        if let Some(m) = level.mobjs.get_mut(h) {
            m.snext = head;
            m.sprev = None;
        }
        if let Some(old) = head {
            if let Some(om) = level.mobjs.get_mut(old) {
                om.sprev = Some(h);
            }
        }
        level.sectors[sec].thing_list = Some(h);
    }

    if !flags.contains(MobjFlags::NOBLOCKMAP) {
        match level.blockmap.cell_of(x, y) {
            Some(cell) => {
                let head = level.blockmap.thing_heads[cell];
                if let Some(m) = level.mobjs.get_mut(h) {
                    m.bnext = head;
                    m.bprev = None;
                    m.block = Some(cell);
                }
                if let Some(old) = head {
                    if let Some(om) = level.mobjs.get_mut(old) {
                        om.bprev = Some(h);
                    }
                }
                level.blockmap.thing_heads[cell] = Some(h);
            }
            None => {
                // off the grid; reachable by nothing spatial
                if let Some(m) = level.mobjs.get_mut(h) {
                    m.bnext = None;
                    m.bprev = None;
                    m.block = None;
                }
            }
        }
    }

    if !flags.contains(MobjFlags::NOSECTOR) {
        update_touching_sectors(level, h);
    }
}

/// Unlinks a thing from the sector list and blockmap in O(1) via its back
/// pointers. The touched-sector list is left alone; the next relink
/// reconciles it, and removal frees it explicitly.
pub fn unset_thing_position(level: &mut Level, h: MobjHandle) {
    let Some(m) = level.mobjs.get(h) else {
        return;
    };
    let (flags, sector, snext, sprev, bnext, bprev, block) =
        (m.flags, m.sector, m.snext, m.sprev, m.bnext, m.bprev, m.block);

    if !flags.contains(MobjFlags::NOSECTOR) {
        if let Some(n) = snext {
            if let Some(nm) = level.mobjs.get_mut(n) {
                nm.sprev = sprev;
            }
        }
        match sprev {
            Some(p) => {
                if let Some(pm) = level.mobjs.get_mut(p) {
                    pm.snext = snext;
                }
            }
            None => level.sectors[sector].thing_list = snext,
        }
        if let Some(m) = level.mobjs.get_mut(h) {
            m.snext = None;
            m.sprev = None;
        }
    }

    if !flags.contains(MobjFlags::NOBLOCKMAP) {
        if let Some(cell) = block {
            if let Some(n) = bnext {
                if let Some(nm) = level.mobjs.get_mut(n) {
                    nm.bprev = bprev;
                }
            }
            match bprev {
                Some(p) => {
                    if let Some(pm) = level.mobjs.get_mut(p) {
                        pm.bnext = bnext;
                    }
                }
                None => level.blockmap.thing_heads[cell] = bnext,
            }
            if let Some(m) = level.mobjs.get_mut(h) {
                m.bnext = None;
                m.bprev = None;
                m.block = None;
            }
        }
    }
}

// =============================================================================
// Touched-sector lists
// =============================================================================

/// One membership record: thing T touches sector S. Linked into two chains,
/// one per thing and one per sector, so either side can walk its
/// memberships without scanning the other.
#[derive(Debug, Clone)]
pub struct SecNode {
    pub sector: usize,
    pub thing: Option<MobjHandle>,
    t_prev: Option<u32>,
    t_next: Option<u32>,
    s_prev: Option<u32>,
    s_next: Option<u32>,
}

/// Node storage with a free list; capacity paid for once stays paid for.
pub struct SecNodePool {
    nodes: Vec<SecNode>,
    free: Vec<u32>,
}

impl SecNodePool {
    pub fn new() -> Self {
        Self { nodes: Vec::new(), free: Vec::new() }
    }

    fn alloc(&mut self, node: SecNode) -> u32 {
        if let Some(i) = self.free.pop() {
            self.nodes[i as usize] = node;
            i
        } else {
            self.nodes.push(node);
            (self.nodes.len() - 1) as u32
        }
    }

    pub fn node(&self, i: u32) -> &SecNode {
        &self.nodes[i as usize]
    }

    fn node_mut(&mut self, i: u32) -> &mut SecNode {
        &mut self.nodes[i as usize]
    }

    pub fn live_nodes(&self) -> usize {
        self.nodes.len() - self.free.len()
    }
}

impl Default for SecNodePool {
    fn default() -> Self {
        Self::new()
    }
}

/// Claims or creates the membership node (thing, sec).
fn add_sec_node(level: &mut Level, h: MobjHandle, sec: usize) {
    let Some(m) = level.mobjs.get(h) else {
        return;
    };
    let mut ni = m.touching;
    while let Some(i) = ni {
        let node = level.secnodes.node(i);
        if node.sector == sec {
            level.secnodes.node_mut(i).thing = Some(h);
            return;
        }
        ni = node.t_next;
    }

    let thing_head = m.touching;
    let sector_head = level.sectors[sec].touching;
    let idx = level.secnodes.alloc(SecNode {
        sector: sec,
        thing: Some(h),
        t_prev: None,
        t_next: thing_head,
        s_prev: None,
        s_next: sector_head,
    });
    if let Some(old) = thing_head {
        level.secnodes.node_mut(old).t_prev = Some(idx);
    }
    if let Some(old) = sector_head {
        level.secnodes.node_mut(old).s_prev = Some(idx);
    }
    if let Some(m) = level.mobjs.get_mut(h) {
        m.touching = Some(idx);
    }
    level.sectors[sec].touching = Some(idx);
}

fn unlink_sec_node(level: &mut Level, h: MobjHandle, idx: u32) {
    let node = level.secnodes.node(idx).clone();
    match node.t_prev {
        Some(p) => level.secnodes.node_mut(p).t_next = node.t_next,
        None => {
            if let Some(m) = level.mobjs.get_mut(h) {
                m.touching = node.t_next;
            }
        }
    }
    if let Some(n) = node.t_next {
        level.secnodes.node_mut(n).t_prev = node.t_prev;
    }
    match node.s_prev {
        Some(p) => level.secnodes.node_mut(p).s_next = node.s_next,
        None => level.sectors[node.sector].touching = node.s_next,
    }
    if let Some(n) = node.s_next {
        level.secnodes.node_mut(n).s_prev = node.s_prev;
    }
    level.secnodes.free.push(idx);
}

/// Rebuilds a thing's touched-sector memberships from its current box:
/// the origin sector plus the far side of every two-sided edge the box
/// straddles. Nodes for sectors no longer touched go back to the pool.
pub fn update_touching_sectors(level: &mut Level, h: MobjHandle) {
    let Some(m) = level.mobjs.get(h) else {
        return;
    };
    let (x, y, radius, sector) = (m.x, m.y, m.radius, m.sector);
    let bbox = BBox::from_radius(x, y, radius);

    // orphan everything, then re-claim what still applies
    let mut ni = m.touching;
    while let Some(i) = ni {
        level.secnodes.node_mut(i).thing = None;
        ni = level.secnodes.node(i).t_next;
    }

    add_sec_node(level, h, sector);

    level.bump_validcount();
    let xl = level.blockmap.block_x(bbox.left);
    let xh = level.blockmap.block_x(bbox.right);
    let yl = level.blockmap.block_y(bbox.bottom);
    let yh = level.blockmap.block_y(bbox.top);
    let mut touched: Vec<usize> = Vec::new();
    for by in yl..=yh {
        for bx in xl..=xh {
            block_lines_iterator(level, bx, by, &mut |lv, li| {
                let line = &lv.lines[li];
                if line.back_sector.is_none() {
                    return true;
                }
                if !bbox.overlaps(&line.bbox) {
                    return true;
                }
                if box_on_line_side(&bbox, line) != -1 {
                    return true;
                }
                touched.push(line.front_sector);
                if let Some(back) = line.back_sector {
                    touched.push(back);
                }
                true
            });
        }
    }
    for sec in touched {
        add_sec_node(level, h, sec);
    }

    // prune the orphans
    let mut ni = level.mobjs.get(h).and_then(|m| m.touching);
    while let Some(i) = ni {
        let next = level.secnodes.node(i).t_next;
        if level.secnodes.node(i).thing.is_none() {
            unlink_sec_node(level, h, i);
        }
        ni = next;
    }
}

/// Returns every node of a thing's touch chain to the pool.
pub fn free_touching(level: &mut Level, h: MobjHandle) {
    let mut ni = level.mobjs.get(h).and_then(|m| m.touching);
    while let Some(i) = ni {
        let next = level.secnodes.node(i).t_next;
        unlink_sec_node(level, h, i);
        ni = next;
    }
    if let Some(m) = level.mobjs.get_mut(h) {
        m.touching = None;
    }
}

/// Sectors a thing currently touches, origin sector included.
pub fn touching_sectors(level: &Level, h: MobjHandle) -> Vec<usize> {
    let mut out = Vec::new();
    let mut ni = level.mobjs.get(h).and_then(|m| m.touching);
    while let Some(i) = ni {
        let node = level.secnodes.node(i);
        out.push(node.sector);
        ni = node.t_next;
    }
    out
}

// =============================================================================
// Sector height changes
// =============================================================================

/// Refits one thing after its sector moved. Returns false when it no
/// longer fits between floor and ceiling.
pub fn thing_height_clip(level: &mut Level, h: MobjHandle) -> bool {
    let Some(m) = level.mobjs.get(h) else {
        return true;
    };
    let onfloor = m.z == m.floorz;
    let (x, y) = (m.x, m.y);
    let pc = check_position(level, h, x, y);
    let Some(m) = level.mobjs.get_mut(h) else {
        return true;
    };
    m.floorz = pc.floorz;
    m.ceilingz = pc.ceilingz;
    m.dropoffz = pc.dropoffz;
    if onfloor {
        m.z = m.floorz;
    } else if m.top() > m.ceilingz {
        m.z = m.ceilingz - m.height;
    }
    m.ceilingz - m.floorz >= m.height
}

/// Re-clips every thing touching a sector whose floor or ceiling moved.
/// Returns true if something no longer fits. With `crunch`, the squeezed
/// take periodic damage; crushed corpses and items disappear.
pub fn change_sector(level: &mut Level, sec: usize, crunch: bool) -> bool {
    let mut nofit = false;

    let mut things = Vec::new();
    let mut ni = level.sectors[sec].touching;
    while let Some(i) = ni {
        let node = level.secnodes.node(i);
        if let Some(h) = node.thing {
            things.push(h);
        }
        ni = node.s_next;
    }

    for h in things {
        if thing_height_clip(level, h) {
            continue;
        }
        let Some(m) = level.mobjs.get(h) else {
            continue;
        };
        if m.health <= 0 {
            // crush the corpse flat; it stops blocking height changes
            if let Some(m) = level.mobjs.get_mut(h) {
                m.height = ZERO;
                m.radius = ZERO;
            }
            continue;
        }
        if m.flags.contains(MobjFlags::DROPPED) || m.flags.contains(MobjFlags::SPECIAL) {
            crate::p_mobj::remove_mobj(level, h);
            continue;
        }
        nofit = true;
        if crunch && level.leveltime & 3 == 0 {
            let (x, y, z, height) = {
                let m = level.mobjs.get(h).map(|m| (m.x, m.y, m.z, m.height));
                match m {
                    Some(v) => v,
                    None => continue,
                }
            };
            p_inter::damage_mobj(level, h, None, None, 10);
            let jx = Fixed(level.rng.p_sub_random() << 12);
            let jy = Fixed(level.rng.p_sub_random() << 12);
            spawn_blood(level, x + jx, y + jy, z + height.half(), 10);
        }
    }
    nofit
}

// =============================================================================
// Attacks
// =============================================================================

/// Splash damage around an exploding thing. Damage falls off linearly with
/// the larger axis distance, and intervening walls shield entirely.
pub fn radius_attack(level: &mut Level, spot: MobjHandle, source: Option<MobjHandle>, damage: i32) {
    let Some(s) = level.mobjs.get(spot) else {
        return;
    };
    let (sx, sy) = (s.x, s.y);
    let range = map_units(damage);

    radius_things_iterator(level, sx, sy, range, &mut |lv, other| {
        if other == spot {
            return true;
        }
        let Some(o) = lv.mobjs.get(other) else {
            return true;
        };
        if !o.flags.contains(MobjFlags::SHOOTABLE) {
            return true;
        }
        let dx = (o.x - sx).abs();
        let dy = (o.y - sy).abs();
        let dist = (dx.max(dy) - o.radius).max(ZERO);
        if dist >= range {
            return true; // boundary is exclusive for damage
        }
        if p_sight::check_sight(lv, other, spot) {
            p_inter::damage_mobj(lv, other, Some(spot), source, damage - dist.to_int());
        }
        true
    });
}

/// Instant-hit attack along a facing. Damages the first shootable thing in
/// the way, or puffs against the first blocking wall.
pub fn line_attack(
    level: &mut Level,
    shooter: MobjHandle,
    angle: Angle,
    range: Fixed,
    damage: i32,
) {
    let Some(s) = level.mobjs.get(shooter) else {
        return;
    };
    let (x1, y1) = (s.x, s.y);
    let shootz = s.z + s.height.half() + map_units(8);
    let x2 = x1 + angle.cos() * range.to_int();
    let y2 = y1 + angle.sin() * range.to_int();

    path_traverse(
        level,
        x1,
        y1,
        x2,
        y2,
        PT_ADDLINES | PT_ADDTHINGS,
        &mut |lv, ic| match ic.target {
            InterceptTarget::Line(li) => {
                let two_sided = lv.lines[li].back_sector.is_some();
                if two_sided {
                    let open = line_opening(lv, li);
                    if open.range > ZERO && open.bottom <= shootz && shootz <= open.top {
                        return true; // shot passes through the gap
                    }
                }
                // wall hit: puff a little in front of the impact
                let back = Fixed(4 * FRACUNIT.0).div(range);
                let frac = (ic.frac - back).max(ZERO);
                let hx = x1 + (x2 - x1).mul(frac);
                let hy = y1 + (y2 - y1).mul(frac);
                spawn_puff(lv, hx, hy, shootz);
                false
            }
            InterceptTarget::Thing(th) => {
                if th == shooter {
                    return true;
                }
                let Some(o) = lv.mobjs.get(th) else {
                    return true;
                };
                if !o.flags.contains(MobjFlags::SHOOTABLE) {
                    return true;
                }
                if shootz > o.top() || shootz < o.z {
                    return true; // over or under
                }
                let (ox, oy, noblood) = (o.x, o.y, o.flags.contains(MobjFlags::NOBLOOD));
                if noblood {
                    spawn_puff(lv, ox, oy, shootz);
                } else {
                    spawn_blood(lv, ox, oy, shootz, damage);
                }
                p_inter::damage_mobj(lv, th, Some(shooter), Some(shooter), damage);
                false
            }
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use reboom_common::event::TicCmd;
    use reboom_common::tables::ANG0;

    use crate::info::MobjType;
    use crate::p_local::map_units;
    use crate::p_mobj::{mobj_thinker, remove_mobj, spawn_mobj};
    use crate::p_setup::{LineFlags, MapData, Vertex};
    use crate::p_tick::run_tic;

    fn one_room() -> Level {
        MapData::single_sector(-512, -512, 512, 512, ZERO, map_units(256)).build()
    }

    /// Two rooms split at x = 0 by a two-sided line; right floor is raised.
    fn step_map(right_floor: i32) -> Level {
        let mut map = MapData::new();
        let left = map.add_sector(ZERO, map_units(256));
        let right = map.add_sector(map_units(right_floor), map_units(256));
        let v = |x: i32, y: i32| Vertex { x: map_units(x), y: map_units(y) };
        // left room border
        map.add_line(v(-512, -256), v(0, -256), LineFlags::BLOCKING, left, None);
        map.add_line(v(0, 256), v(-512, 256), LineFlags::BLOCKING, left, None);
        map.add_line(v(-512, 256), v(-512, -256), LineFlags::BLOCKING, left, None);
        // right room border
        map.add_line(v(0, -256), v(512, -256), LineFlags::BLOCKING, right, None);
        map.add_line(v(512, -256), v(512, 256), LineFlags::BLOCKING, right, None);
        map.add_line(v(512, 256), v(0, 256), LineFlags::BLOCKING, right, None);
        // shared edge
        map.add_line(v(0, -256), v(0, 256), LineFlags::empty(), left, Some(right));
        map.build()
    }

    fn cells_holding(level: &Level, h: MobjHandle) -> Vec<usize> {
        let mut out = Vec::new();
        for (cell, head) in level.blockmap.thing_heads.iter().enumerate() {
            let mut link = *head;
            while let Some(o) = link {
                if o == h {
                    out.push(cell);
                }
                link = level.mobjs.get(o).and_then(|m| m.bnext);
            }
        }
        out
    }

    #[test]
    fn thing_lives_in_exactly_one_cell() {
        let mut level = one_room();
        let h = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Trooper).unwrap();
        assert_eq!(cells_holding(&level, h).len(), 1);
        // hop across several cell boundaries, staying clear of the east
        // wall at 512 (radius 20 box must not touch it)
        for step in 1..6 {
            let x = map_units(step * 96);
            assert!(try_move(&mut level, h, x, ZERO));
            let cells = cells_holding(&level, h);
            assert_eq!(cells.len(), 1, "after move {step}");
            assert_eq!(
                cells[0],
                level.blockmap.cell_of(x, ZERO).unwrap(),
                "cell must match the new origin"
            );
        }
    }

    #[test]
    fn random_walk_stays_inside_a_sealed_room() {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut level = one_room();
        let h = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Trooper).unwrap();
        let mut rng = StdRng::seed_from_u64(0xd00d);
        for _ in 0..500 {
            let (x, y) = {
                let m = level.mobjs.get(h).unwrap();
                // hops under the body diameter, so no step can skip a wall
                let dx = map_units(rng.gen_range(-32..=32));
                let dy = map_units(rng.gen_range(-32..=32));
                (m.x + dx, m.y + dy)
            };
            try_move(&mut level, h, x, y);
            let m = level.mobjs.get(h).unwrap();
            assert!(m.x.abs() <= map_units(512) && m.y.abs() <= map_units(512));
            assert_eq!(cells_holding(&level, h).len(), 1);
        }
    }

    #[test]
    fn removal_unlinks_from_blockmap() {
        let mut level = one_room();
        let a = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Trooper).unwrap();
        let b = spawn_mobj(&mut level, Fixed(1), Fixed(1), ZERO, MobjType::Trooper).unwrap();
        // same cell, so the bucket is a two-entry chain
        remove_mobj(&mut level, a);
        assert!(cells_holding(&level, a).is_empty());
        assert_eq!(cells_holding(&level, b).len(), 1);
    }

    #[test]
    fn radius_query_returns_self() {
        let mut level = one_room();
        let h = spawn_mobj(&mut level, map_units(37), map_units(-101), ZERO, MobjType::Trooper)
            .unwrap();
        let (x, y, r) = {
            let m = level.mobj(h).unwrap();
            (m.x, m.y, m.radius)
        };
        let mut found = false;
        radius_things_iterator(&mut level, x, y, r, &mut |_lv, o| {
            if o == h {
                found = true;
            }
            true
        });
        assert!(found);
    }

    #[test]
    fn solid_things_block_each_other() {
        let mut level = one_room();
        let a = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Trooper).unwrap();
        let _b = spawn_mobj(&mut level, map_units(128), ZERO, ZERO, MobjType::Trooper).unwrap();
        assert!(!try_move(&mut level, a, map_units(128), ZERO));
        // overlap threshold is the sum of radii; just outside is fine
        assert!(try_move(&mut level, a, map_units(128 + 41), ZERO));
    }

    #[test]
    fn step_up_within_limit_only() {
        let mut level = step_map(16);
        let h = spawn_mobj(&mut level, map_units(-64), ZERO, ZERO, MobjType::Trooper).unwrap();
        assert!(try_move(&mut level, h, map_units(64), ZERO));
        assert_eq!(level.mobj(h).unwrap().floorz, map_units(16));

        let mut level = step_map(32);
        let h = spawn_mobj(&mut level, map_units(-64), ZERO, ZERO, MobjType::Trooper).unwrap();
        assert!(!try_move(&mut level, h, map_units(64), ZERO), "32-unit step is beyond the limit");
    }

    #[test]
    fn dropoff_gates_ledge_walks() {
        let mut level = step_map(64);
        // start on the high side
        let h =
            spawn_mobj(&mut level, map_units(64), ZERO, crate::p_local::ONFLOORZ, MobjType::Trooper)
                .unwrap();
        assert_eq!(level.mobj(h).unwrap().z, map_units(64));
        // destination box straddles the edge; the 64-unit drop is refused
        assert!(!try_move(&mut level, h, map_units(8), ZERO));
        // things allowed over dropoffs may go
        level
            .mobj_mut(h)
            .unwrap()
            .flags
            .insert(MobjFlags::DROPOFF);
        assert!(try_move(&mut level, h, map_units(8), ZERO));
    }

    #[test]
    fn slide_keeps_the_open_axis() {
        let mut level = one_room();
        let h = spawn_mobj(&mut level, map_units(490), ZERO, ZERO, MobjType::Player).unwrap();
        level.player = Some(h);
        {
            let m = level.mobj_mut(h).unwrap();
            // deep enough that the box crosses the east wall; an exact
            // edge touch is still a legal position
            m.momx = map_units(12);
            m.momy = map_units(8); // along it
        }
        mobj_thinker(&mut level, h);
        let m = level.mobj(h).unwrap();
        assert_eq!(m.momx, ZERO, "wall-normal momentum dies");
        assert_eq!(m.x, map_units(490), "no progress into the wall");
        assert!(m.y > ZERO, "parallel momentum survives");
    }

    #[test]
    fn missile_passes_through_kin() {
        let mut level = one_room();
        let shooter = spawn_mobj(&mut level, map_units(-200), ZERO, ZERO, MobjType::Trooper).unwrap();
        let kin = spawn_mobj(&mut level, map_units(100), ZERO, ZERO, MobjType::Trooper).unwrap();
        let missile =
            spawn_mobj(&mut level, map_units(60), ZERO, map_units(20), MobjType::TrooperShot)
                .unwrap();
        level.mobj_mut(missile).unwrap().target = Some(shooter);
        let before = level.mobj(kin).unwrap().health;
        assert!(try_move(&mut level, missile, map_units(100), ZERO));
        assert_eq!(level.mobj(kin).unwrap().health, before, "kin take no damage");
    }

    #[test]
    fn missile_hits_other_species() {
        let mut level = one_room();
        let shooter =
            spawn_mobj(&mut level, map_units(-200), ZERO, ZERO, MobjType::Sergeant).unwrap();
        let victim = spawn_mobj(&mut level, map_units(100), ZERO, ZERO, MobjType::Trooper).unwrap();
        let missile =
            spawn_mobj(&mut level, map_units(60), ZERO, map_units(20), MobjType::TrooperShot)
                .unwrap();
        level.mobj_mut(missile).unwrap().target = Some(shooter);
        let before = level.mobj(victim).unwrap().health;
        assert!(!try_move(&mut level, missile, map_units(100), ZERO));
        assert!(level.mobj(victim).unwrap().health < before);
    }

    #[test]
    fn missile_always_hits_players() {
        let mut level = one_room();
        let shooter =
            spawn_mobj(&mut level, map_units(-200), ZERO, ZERO, MobjType::Player).unwrap();
        let victim = spawn_mobj(&mut level, map_units(100), ZERO, ZERO, MobjType::Player).unwrap();
        level.player = Some(victim);
        let missile =
            spawn_mobj(&mut level, map_units(60), ZERO, map_units(20), MobjType::TrooperShot)
                .unwrap();
        level.mobj_mut(missile).unwrap().target = Some(shooter);
        let before = level.mobj(victim).unwrap().health;
        assert!(!try_move(&mut level, missile, map_units(100), ZERO));
        assert!(level.mobj(victim).unwrap().health < before);
    }

    #[test]
    fn touch_list_tracks_straddled_edges() {
        let mut level = step_map(0);
        let h = spawn_mobj(&mut level, map_units(-100), ZERO, ZERO, MobjType::Trooper).unwrap();
        assert_eq!(touching_sectors(&level, h), vec![0]);
        // stand on the boundary: box overlaps both rooms
        assert!(try_move(&mut level, h, map_units(4), ZERO));
        let mut secs = touching_sectors(&level, h);
        secs.sort();
        assert_eq!(secs, vec![0, 1]);
        // step well inside the right room again
        assert!(try_move(&mut level, h, map_units(100), ZERO));
        assert_eq!(touching_sectors(&level, h), vec![1]);
    }

    #[test]
    fn touch_nodes_return_to_pool() {
        let mut level = step_map(0);
        let h = spawn_mobj(&mut level, map_units(4), ZERO, ZERO, MobjType::Trooper).unwrap();
        let peak = level.secnodes.live_nodes();
        assert!(peak >= 2);
        remove_mobj(&mut level, h);
        assert_eq!(level.secnodes.live_nodes(), 0);
        // a new straddler reuses the freed nodes
        let h2 = spawn_mobj(&mut level, map_units(4), ZERO, ZERO, MobjType::Trooper).unwrap();
        assert_eq!(level.secnodes.live_nodes(), touching_sectors(&level, h2).len());
    }

    #[test]
    fn crushing_sector_damages_the_squeezed() {
        let mut level = one_room();
        let h = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Trooper).unwrap();
        level.sectors[0].ceiling = map_units(40); // below the trooper's 56
        let nofit = change_sector(&mut level, 0, true);
        assert!(nofit);
        assert!(level.mobj(h).unwrap().health < 20);
    }

    #[test]
    fn radius_attack_boundary_is_exclusive() {
        let mut level = one_room();
        let bomb = spawn_mobj(&mut level, ZERO, ZERO, map_units(32), MobjType::TrooperShot).unwrap();
        // radius 128 blast; victim center distance minus radius lands
        // exactly on 128, so it must be spared
        let spared = spawn_mobj(&mut level, map_units(148), ZERO, ZERO, MobjType::Trooper).unwrap();
        let hurt = spawn_mobj(&mut level, ZERO, map_units(100), ZERO, MobjType::Trooper).unwrap();
        radius_attack(&mut level, bomb, None, 128);
        assert_eq!(level.mobj(spared).unwrap().health, 20);
        assert!(level.mobj(hurt).unwrap().health < 20);
    }

    #[test]
    fn hitscan_stops_at_walls_and_bodies() {
        let mut level = one_room();
        let shooter = spawn_mobj(&mut level, map_units(-200), ZERO, ZERO, MobjType::Player).unwrap();
        level.player = Some(shooter);
        // no target: the east wall takes the shot, leaving a puff
        line_attack(&mut level, shooter, ANG0, map_units(2048), 5);
        assert!(level
            .mobjs
            .iter()
            .any(|(_, m)| m.mtype == MobjType::Puff));

        let victim = spawn_mobj(&mut level, map_units(100), ZERO, ZERO, MobjType::Trooper).unwrap();
        line_attack(&mut level, shooter, ANG0, map_units(2048), 5);
        assert_eq!(level.mobj(victim).unwrap().health, 15);
        run_tic(&mut level, &TicCmd::default());
    }
}
