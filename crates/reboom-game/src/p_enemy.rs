// p_enemy.rs -- monster thinking: waking, chasing, attacking

use tracing::warn;

use reboom_common::fixed::{approx_dist, Fixed, FRACUNIT, ZERO};
use reboom_common::tables::{point_to_angle, Angle, ANG180, ANG270, ANG45, ANG90};

use crate::info::{MobjType, StateNum, S_NULL};
use crate::p_inter;
use crate::p_local::{
    map_units, Level, MobjFlags, MobjHandle, DI_NODIR, FLOATSPEED, MELEERANGE, MISSILERANGE,
};
use crate::p_map;
use crate::p_maputl::{line_opening, radius_things_iterator};
use crate::p_mobj::{set_mobj_state, spawn_mobj, spawn_missile};
use crate::p_setup::LineFlags;
use crate::p_sight::check_sight;

/// Charging lost soul flight speed, map units per tic.
const SKULLSPEED: Fixed = Fixed(20 * FRACUNIT.0);

// movement deltas per compass direction, diagonals foreshortened
const XSPEED: [Fixed; 8] = [
    FRACUNIT,
    Fixed(47000),
    ZERO,
    Fixed(-47000),
    Fixed(-FRACUNIT.0),
    Fixed(-47000),
    ZERO,
    Fixed(47000),
];
const YSPEED: [Fixed; 8] = [
    ZERO,
    Fixed(47000),
    FRACUNIT,
    Fixed(47000),
    ZERO,
    Fixed(-47000),
    Fixed(-FRACUNIT.0),
    Fixed(-47000),
];

const OPPOSITE: [u8; 9] = [4, 5, 6, 7, 0, 1, 2, 3, DI_NODIR];
const DIAGS: [u8; 4] = [3, 1, 5, 7];

// =============================================================================
// Movement helpers
// =============================================================================

/// Takes one step in the current movement direction. Floaters that fail
/// only on height adjust vertically instead.
fn p_move(level: &mut Level, h: MobjHandle) -> bool {
    let Some(m) = level.mobjs.get(h) else {
        return false;
    };
    if m.movedir == DI_NODIR {
        return false;
    }
    let dir = m.movedir as usize;
    let speed = level.info(m.mtype).speed.to_int();
    let tryx = m.x + XSPEED[dir] * speed;
    let tryy = m.y + YSPEED[dir] * speed;
    let floats = m.flags.contains(MobjFlags::FLOAT);

    if !p_map::try_move(level, h, tryx, tryy) {
        if floats && level.floatok {
            // stuck on height alone; drift toward the opening
            let destfloor = p_map::check_position(level, h, tryx, tryy).floorz;
            if let Some(m) = level.mobjs.get_mut(h) {
                if m.z < destfloor {
                    m.z = m.z + FLOATSPEED;
                } else {
                    m.z = m.z - FLOATSPEED;
                }
                m.flags.insert(MobjFlags::INFLOAT);
            }
            return true;
        }
        return false;
    }
    if let Some(m) = level.mobjs.get_mut(h) {
        m.flags.remove(MobjFlags::INFLOAT);
        if !m.flags.contains(MobjFlags::FLOAT) {
            m.z = m.floorz;
        }
    }
    true
}

/// A step that also commits to the direction for a random while.
fn try_walk(level: &mut Level, h: MobjHandle) -> bool {
    if !p_move(level, h) {
        return false;
    }
    let n = (level.rng.p_random() & 15) as i16;
    if let Some(m) = level.mobjs.get_mut(h) {
        m.movecount = n;
    }
    true
}

fn set_movedir(level: &mut Level, h: MobjHandle, dir: u8) {
    if let Some(m) = level.mobjs.get_mut(h) {
        m.movedir = dir;
    }
}

/// Picks a fresh movement direction toward the target, preferring the
/// diagonal, falling back through the axes, old direction, and finally a
/// sweep of everything but a reversal.
fn new_chase_dir(level: &mut Level, h: MobjHandle) {
    let Some(m) = level.mobjs.get(h) else {
        return;
    };
    let Some(tg) = level.deref(m.target) else {
        return;
    };
    let t = level.mobjs.get(tg).map(|t| (t.x, t.y));
    let Some((tx, ty)) = t else {
        return;
    };
    let deltax = tx - m.x;
    let deltay = ty - m.y;
    let olddir = m.movedir;
    let turnaround = OPPOSITE[olddir as usize];

    let ten = map_units(10);
    let d1: u8 = if deltax > ten {
        0 // east
    } else if deltax < -ten {
        4 // west
    } else {
        DI_NODIR
    };
    let d2: u8 = if deltay < -ten {
        6 // south
    } else if deltay > ten {
        2 // north
    } else {
        DI_NODIR
    };

    if d1 != DI_NODIR && d2 != DI_NODIR {
        let idx = (((deltay < ZERO) as usize) << 1) | ((deltax > ZERO) as usize);
        let dir = DIAGS[idx];
        if dir != turnaround {
            set_movedir(level, h, dir);
            if try_walk(level, h) {
                return;
            }
        }
    }

    let (mut d1, mut d2) = if level.rng.p_random() > 200 || deltay.abs() > deltax.abs() {
        (d2, d1)
    } else {
        (d1, d2)
    };
    if d1 == turnaround {
        d1 = DI_NODIR;
    }
    if d2 == turnaround {
        d2 = DI_NODIR;
    }
    if d1 != DI_NODIR {
        set_movedir(level, h, d1);
        if try_walk(level, h) {
            return;
        }
    }
    if d2 != DI_NODIR {
        set_movedir(level, h, d2);
        if try_walk(level, h) {
            return;
        }
    }
    if olddir != DI_NODIR {
        set_movedir(level, h, olddir);
        if try_walk(level, h) {
            return;
        }
    }

    // desperate: sweep the compass, skipping only the reversal
    if level.rng.p_random() & 1 != 0 {
        for tdir in 0..8u8 {
            if tdir != turnaround {
                set_movedir(level, h, tdir);
                if try_walk(level, h) {
                    return;
                }
            }
        }
    } else {
        for tdir in (0..8u8).rev() {
            if tdir != turnaround {
                set_movedir(level, h, tdir);
                if try_walk(level, h) {
                    return;
                }
            }
        }
    }

    if turnaround != DI_NODIR {
        set_movedir(level, h, turnaround);
        if try_walk(level, h) {
            return;
        }
    }
    set_movedir(level, h, DI_NODIR);
}

// =============================================================================
// Target selection
// =============================================================================

/// Acquires the player as a target if visible. Without `allaround` the
/// looker only notices what is in front of it, unless close enough to hear
/// breathing.
fn look_for_player(level: &mut Level, h: MobjHandle, allaround: bool) -> bool {
    let Some(p) = level.deref(level.player) else {
        return false;
    };
    if level.mobjs.get(p).map_or(true, |pm| pm.health <= 0) {
        return false;
    }
    if !check_sight(level, h, p) {
        return false;
    }
    if !allaround {
        let Some(m) = level.mobjs.get(h) else {
            return false;
        };
        let Some(pm) = level.mobjs.get(p) else {
            return false;
        };
        let an = point_to_angle(pm.x - m.x, pm.y - m.y) - m.angle;
        if an > ANG90 && an < ANG270 {
            let dist = approx_dist(pm.x - m.x, pm.y - m.y);
            if dist > MELEERANGE {
                return false; // behind its back
            }
        }
    }
    if let Some(m) = level.mobjs.get_mut(h) {
        m.target = Some(p);
    }
    true
}

fn check_melee_range(level: &mut Level, h: MobjHandle) -> bool {
    let Some(m) = level.mobjs.get(h) else {
        return false;
    };
    let Some(tg) = level.deref(m.target) else {
        return false;
    };
    let Some(t) = level.mobjs.get(tg) else {
        return false;
    };
    let dist = approx_dist(t.x - m.x, t.y - m.y);
    if dist >= MELEERANGE - map_units(20) + t.radius {
        return false;
    }
    check_sight(level, h, tg)
}

/// Probabilistic ranged-attack decision: the further away, the less eager.
fn check_missile_range(level: &mut Level, h: MobjHandle) -> bool {
    let Some(m) = level.mobjs.get(h) else {
        return false;
    };
    let Some(tg) = level.deref(m.target) else {
        return false;
    };
    if !check_sight(level, h, tg) {
        return false;
    }
    let Some(m) = level.mobjs.get(h) else {
        return false;
    };
    if m.flags.contains(MobjFlags::JUSTHIT) {
        // fight back immediately after taking a hit
        if let Some(m) = level.mobjs.get_mut(h) {
            m.flags.remove(MobjFlags::JUSTHIT);
        }
        return true;
    }
    if m.reactiontime > 0 {
        return false;
    }
    let Some(t) = level.mobjs.get(tg) else {
        return false;
    };
    let mut dist = (approx_dist(t.x - m.x, t.y - m.y) - map_units(64)).to_int();
    if level.info(m.mtype).meleestate == S_NULL {
        dist -= 128; // no melee fallback, so shoot sooner
    }
    if m.mtype == MobjType::LostSoul {
        dist >>= 1;
    }
    let dist = dist.min(200);
    level.rng.p_random() >= dist
}

// =============================================================================
// Sound propagation
// =============================================================================

/// Floods a wake-up call outward from `sector`, crossing open two-sided
/// edges. A sound-blocking line eats the sound after one crossing.
pub fn noise_alert(level: &mut Level, target: Option<MobjHandle>, sector: usize) {
    // lowest block count a sector has been reached with so far
    let mut traversed: Vec<u32> = vec![u32::MAX; level.sectors.len()];
    let mut stack: Vec<(usize, u32)> = vec![(sector, 0)];
    while let Some((sec, soundblocks)) = stack.pop() {
        if traversed[sec] <= soundblocks {
            continue;
        }
        traversed[sec] = soundblocks;
        level.sectors[sec].sound_target = target;

        let lines: Vec<u16> = level.sectors[sec].lines.clone();
        for li in lines {
            let li = li as usize;
            let Some(back) = level.lines[li].back_sector else {
                continue;
            };
            let front = level.lines[li].front_sector;
            let open = line_opening(level, li);
            if open.range <= ZERO {
                continue; // shut tight
            }
            let other = if front == sec { back } else { front };
            if level.lines[li].flags.contains(LineFlags::SOUND_BLOCK) {
                if soundblocks == 0 {
                    stack.push((other, 1));
                }
            } else {
                stack.push((other, soundblocks));
            }
        }
    }
}

// =============================================================================
// Actions
// =============================================================================

/// Reads the parameter pair carried by the actor's current state.
fn state_args(level: &Level, h: MobjHandle) -> (i32, i32) {
    level
        .mobjs
        .get(h)
        .and_then(|m| level.state(m.state))
        .map(|s| (s.misc1, s.misc2))
        .unwrap_or((0, 0))
}

/// State transition requested by a parameterized action. The null state and
/// out-of-table indexes are refused; removal is never implicit here.
fn state_jump(level: &mut Level, h: MobjHandle, st: i32) {
    if st <= 0 || st as usize >= level.states.len() {
        warn!(state = st, "action jump to unknown state ignored");
        return;
    }
    set_mobj_state(level, h, st as StateNum);
}

/// Stand watch until something shootable shows up or makes noise.
pub fn a_look(level: &mut Level, h: MobjHandle) {
    let Some(m) = level.mobjs.get(h) else {
        return;
    };
    let sector = m.sector;
    let ambush = m.flags.contains(MobjFlags::AMBUSH);
    if let Some(mm) = level.mobjs.get_mut(h) {
        mm.threshold = 0; // any shooter is fair game
    }

    let mut woke = false;
    let noisy = level.deref(level.sectors[sector].sound_target).filter(|&t| {
        level
            .mobjs
            .get(t)
            .map_or(false, |tm| tm.flags.contains(MobjFlags::SHOOTABLE))
    });
    if let Some(t) = noisy {
        if let Some(m) = level.mobjs.get_mut(h) {
            m.target = Some(t);
        }
        // ambushers only break cover for what they can see
        woke = !ambush || check_sight(level, h, t);
    }
    if !woke && !look_for_player(level, h, false) {
        return;
    }

    let Some(m) = level.mobjs.get(h) else {
        return;
    };
    let info = level.info(m.mtype);
    if let Some(sfx) = info.seesound {
        level.post_sound(Some(h), sfx);
    }
    if info.seestate != S_NULL {
        set_mobj_state(level, h, info.seestate);
    }
}

/// Close in on the target, attacking when the ranges allow.
pub fn a_chase(level: &mut Level, h: MobjHandle) {
    let snapshot = level.mobjs.get(h).map(|m| (m.reactiontime, m.threshold, m.target));
    let Some((reactiontime, threshold, target)) = snapshot else {
        return;
    };
    if reactiontime > 0 {
        if let Some(m) = level.mobjs.get_mut(h) {
            m.reactiontime -= 1;
        }
    }

    // a fresh grudge wears off unless refreshed
    if threshold > 0 {
        let still_mad = level
            .deref(target)
            .and_then(|t| level.mobjs.get(t))
            .map_or(false, |t| t.health > 0);
        if let Some(m) = level.mobjs.get_mut(h) {
            if still_mad {
                m.threshold -= 1;
            } else {
                m.threshold = 0;
            }
        }
    }

    // square the facing up with the walk direction
    let Some(m) = level.mobjs.get_mut(h) else {
        return;
    };
    if m.movedir < 8 {
        let current = Angle(m.angle.0 & (7 << 29));
        let wanted = Angle::from_movedir(m.movedir);
        let delta = (current - wanted).0 as i32;
        if delta > 0 {
            m.angle = current - ANG45;
        } else if delta < 0 {
            m.angle = current + ANG45;
        }
    }

    let target = level.deref(level.mobjs.get(h).and_then(|m| m.target));
    let target_alive = target
        .and_then(|t| level.mobjs.get(t))
        .map_or(false, |t| t.flags.contains(MobjFlags::SHOOTABLE));
    if !target_alive {
        // fall back on an older grudge before giving up
        let lastenemy = level.deref(level.mobjs.get(h).and_then(|m| m.lastenemy));
        let lastenemy_alive = lastenemy
            .and_then(|t| level.mobjs.get(t))
            .map_or(false, |t| t.health > 0);
        if lastenemy_alive {
            if let Some(m) = level.mobjs.get_mut(h) {
                m.target = m.lastenemy.take();
            }
            return;
        }
        if look_for_player(level, h, true) {
            return;
        }
        let spawnstate = level.mobjs.get(h).map(|m| level.info(m.mtype).spawnstate);
        if let Some(st) = spawnstate {
            set_mobj_state(level, h, st);
        }
        return;
    }

    // never attack twice without a step between
    if level
        .mobjs
        .get(h)
        .map_or(false, |m| m.flags.contains(MobjFlags::JUSTATTACKED))
    {
        if let Some(m) = level.mobjs.get_mut(h) {
            m.flags.remove(MobjFlags::JUSTATTACKED);
        }
        new_chase_dir(level, h);
        return;
    }

    let (meleestate, missilestate, attacksound) = {
        let Some(m) = level.mobjs.get(h) else {
            return;
        };
        let info = level.info(m.mtype);
        (info.meleestate, info.missilestate, info.attacksound)
    };

    if meleestate != S_NULL && check_melee_range(level, h) {
        if let Some(sfx) = attacksound {
            level.post_sound(Some(h), sfx);
        }
        set_mobj_state(level, h, meleestate);
        return;
    }

    if missilestate != S_NULL {
        let stale_step = level.mobjs.get(h).map_or(false, |m| m.movecount != 0);
        if !stale_step && check_missile_range(level, h) {
            set_mobj_state(level, h, missilestate);
            if let Some(m) = level.mobjs.get_mut(h) {
                m.flags.insert(MobjFlags::JUSTATTACKED);
            }
            return;
        }
    }

    // keep walking
    let step_spent = {
        let Some(m) = level.mobjs.get_mut(h) else {
            return;
        };
        m.movecount -= 1;
        m.movecount < 0
    };
    if step_spent || !p_move(level, h) {
        new_chase_dir(level, h);
    }

    // occasional idle growl
    if level.rng.p_random() < 3 {
        let active = level.mobjs.get(h).and_then(|m| level.info(m.mtype).activesound);
        if let Some(sfx) = active {
            level.post_sound(Some(h), sfx);
        }
    }
}

/// Snap the facing onto the target. Fuzzy targets pull the aim off a bit.
pub fn a_face_target(level: &mut Level, h: MobjHandle) {
    let Some(m) = level.mobjs.get(h) else {
        return;
    };
    let Some(tg) = level.deref(m.target) else {
        return;
    };
    let Some(t) = level.mobjs.get(tg) else {
        return;
    };
    let shadow = t.flags.contains(MobjFlags::SHADOW);
    let mut an = point_to_angle(t.x - m.x, t.y - m.y);
    if shadow {
        an = an + Angle((level.rng.p_sub_random() << 21) as u32);
    }
    if let Some(m) = level.mobjs.get_mut(h) {
        m.flags.remove(MobjFlags::AMBUSH);
        m.angle = an;
    }
}

pub fn a_pain(level: &mut Level, h: MobjHandle) {
    let sfx = level.mobjs.get(h).and_then(|m| level.info(m.mtype).painsound);
    if let Some(sfx) = sfx {
        level.post_sound(Some(h), sfx);
    }
}

pub fn a_scream(level: &mut Level, h: MobjHandle) {
    let sfx = level.mobjs.get(h).and_then(|m| level.info(m.mtype).deathsound);
    if let Some(sfx) = sfx {
        level.post_sound(Some(h), sfx);
    }
}

/// Corpse hits the ground; stop blocking traffic.
pub fn a_fall(level: &mut Level, h: MobjHandle) {
    if let Some(m) = level.mobjs.get_mut(h) {
        m.flags.remove(MobjFlags::SOLID);
    }
}

pub fn a_explode(level: &mut Level, h: MobjHandle) {
    let source = level.deref(level.mobjs.get(h).and_then(|m| m.target));
    p_map::radius_attack(level, h, source, 128);
}

/// Launch into a straight-line charge at the target.
pub fn a_skull_attack(level: &mut Level, h: MobjHandle) {
    let Some(m) = level.mobjs.get(h) else {
        return;
    };
    let Some(tg) = level.deref(m.target) else {
        return;
    };
    let attacksound = level.info(m.mtype).attacksound;
    if let Some(sfx) = attacksound {
        level.post_sound(Some(h), sfx);
    }
    a_face_target(level, h);

    let dest = level.mobjs.get(tg).map(|t| (t.x, t.y, t.z + t.height.half()));
    let Some((dx, dy, dz)) = dest else {
        return;
    };
    let Some(m) = level.mobjs.get_mut(h) else {
        return;
    };
    m.flags.insert(MobjFlags::SKULLFLY);
    let an = m.angle;
    m.momx = SKULLSPEED.mul(an.cos());
    m.momy = SKULLSPEED.mul(an.sin());
    let dist = approx_dist(dx - m.x, dy - m.y).div(SKULLSPEED).to_int().max(1);
    m.momz = Fixed((dz - m.z).0 / dist);
}

/// Parameterized: spawn the type in misc1 at a misc2 height offset.
pub fn a_spawn_object(level: &mut Level, h: MobjHandle) {
    let (misc1, misc2) = state_args(level, h);
    let Some(t) = MobjType::from_index(misc1 as usize) else {
        warn!(index = misc1, "spawn action names unknown type");
        return;
    };
    let pos = level.mobjs.get(h).map(|m| (m.x, m.y, m.z));
    let Some((x, y, z)) = pos else {
        return;
    };
    if let Ok(child) = spawn_mobj(level, x, y, z + map_units(misc2), t) {
        let target = level.mobjs.get(h).and_then(|m| m.target);
        if let Some(c) = level.mobjs.get_mut(child) {
            c.target = target;
        }
    }
}

/// Parameterized: fire a misc1-type missile at the current target.
pub fn a_monster_projectile(level: &mut Level, h: MobjHandle) {
    let (misc1, _) = state_args(level, h);
    let Some(t) = MobjType::from_index(misc1 as usize) else {
        warn!(index = misc1, "projectile action names unknown type");
        return;
    };
    let Some(tg) = level.deref(level.mobjs.get(h).and_then(|m| m.target)) else {
        return;
    };
    a_face_target(level, h);
    spawn_missile(level, h, tg, t);
}

/// Parameterized hitscan volley: misc1 bullets, misc2 base damage each.
pub fn a_monster_bullet_attack(level: &mut Level, h: MobjHandle) {
    let (bullets, base) = state_args(level, h);
    if level.deref(level.mobjs.get(h).and_then(|m| m.target)).is_none() {
        return;
    }
    a_face_target(level, h);
    let sfx = level.mobjs.get(h).and_then(|m| level.info(m.mtype).attacksound);
    if let Some(sfx) = sfx {
        level.post_sound(Some(h), sfx);
    }
    for _ in 0..bullets.max(1) {
        let Some(m) = level.mobjs.get(h) else {
            return;
        };
        let an = m.angle + Angle((level.rng.p_sub_random() << 20) as u32);
        let damage = ((level.rng.p_random() % 5) + 1) * base;
        p_map::line_attack(level, h, an, MISSILERANGE, damage);
    }
}

/// Parameterized bite: damage is (1 + roll % misc2) * misc1, melee only.
pub fn a_monster_melee_attack(level: &mut Level, h: MobjHandle) {
    let (base, modulus) = state_args(level, h);
    let Some(tg) = level.deref(level.mobjs.get(h).and_then(|m| m.target)) else {
        return;
    };
    a_face_target(level, h);
    if !check_melee_range(level, h) {
        return;
    }
    let sfx = level.mobjs.get(h).and_then(|m| level.info(m.mtype).attacksound);
    if let Some(sfx) = sfx {
        level.post_sound(Some(h), sfx);
    }
    let damage = ((level.rng.p_random() % modulus.max(1)) + 1) * base;
    p_inter::damage_mobj(level, tg, Some(h), Some(h), damage);
}

/// Parameterized: splash damage of misc1 around the actor.
pub fn a_radius_damage(level: &mut Level, h: MobjHandle) {
    let (damage, _) = state_args(level, h);
    let source = level.deref(level.mobjs.get(h).and_then(|m| m.target));
    p_map::radius_attack(level, h, source, damage);
}

/// Wakes every monster within earshot of the actor, on behalf of its
/// target.
pub fn a_noise_alert(level: &mut Level, h: MobjHandle) {
    let Some(m) = level.mobjs.get(h) else {
        return;
    };
    let sector = m.sector;
    let target = level.deref(m.target).or(Some(h));
    noise_alert(level, target, sector);
}

/// Parameterized: revive a nearby corpse and jump to misc1, otherwise keep
/// chasing.
pub fn a_heal_chase(level: &mut Level, h: MobjHandle) {
    let (jumpstate, _) = state_args(level, h);
    let pos = level.mobjs.get(h).map(|m| (m.x, m.y));
    let Some((x, y)) = pos else {
        return;
    };

    let mut corpse: Option<MobjHandle> = None;
    radius_things_iterator(level, x, y, MELEERANGE, &mut |lv, other| {
        if other == h {
            return true;
        }
        let Some(o) = lv.mobjs.get(other) else {
            return true;
        };
        if !o.flags.contains(MobjFlags::CORPSE) {
            return true;
        }
        if lv.info(o.mtype).seestate == S_NULL {
            return true; // nothing to come back as
        }
        let blockdist = o.radius + lv.mobjs.get(h).map_or(ZERO, |m| m.radius);
        if (o.x - x).abs() >= blockdist || (o.y - y).abs() >= blockdist {
            return true;
        }
        corpse = Some(other);
        false
    });

    let Some(c) = corpse else {
        a_chase(level, h);
        return;
    };

    // back from the dead
    let revived = level.mobjs.get(c).map(|o| {
        let info = *level.info(o.mtype);
        (info.spawnhealth, info.flags, info.height, info.radius, info.seestate)
    });
    if let Some((health, flags, height, radius, seestate)) = revived {
        let healer_target = level.mobjs.get(h).and_then(|m| m.target);
        if let Some(o) = level.mobjs.get_mut(c) {
            o.health = health;
            o.flags = flags;
            o.height = height;
            o.radius = radius;
            o.target = healer_target;
        }
        set_mobj_state(level, c, seestate);
    }
    state_jump(level, h, jumpstate);
}

/// Parameterized homing: bend the course toward the tracer, capped per tic
/// by misc1 degrees.
pub fn a_seek_tracer(level: &mut Level, h: MobjHandle) {
    let (maxturn_deg, _) = state_args(level, h);
    let Some(tr) = level.deref(level.mobjs.get(h).and_then(|m| m.tracer)) else {
        return;
    };
    let alive = level
        .mobjs
        .get(tr)
        .map_or(false, |t| t.flags.contains(MobjFlags::SHOOTABLE));
    if !alive {
        if let Some(m) = level.mobjs.get_mut(h) {
            m.tracer = None;
        }
        return;
    }
    let dest = level.mobjs.get(tr).map(|t| (t.x, t.y, t.z + t.height.half()));
    let cur = level.mobjs.get(h).map(|m| (m.x, m.y, m.z, m.angle, level.info(m.mtype).speed));
    let (Some((tx, ty, tz)), Some((x, y, z, angle, speed))) = (dest, cur) else {
        return;
    };

    let exact = point_to_angle(tx - x, ty - y);
    let cap = Angle(((maxturn_deg.clamp(1, 180) as i64 * ANG45.0 as i64) / 45) as u32);
    let diff = exact - angle;
    let new_angle = if diff.0 <= ANG180.0 {
        // turning left
        if diff.0 > cap.0 {
            angle + cap
        } else {
            exact
        }
    } else if (-diff).0 > cap.0 {
        angle - cap
    } else {
        exact
    };

    let dist = approx_dist(tx - x, ty - y).div(speed).to_int().max(1);
    if let Some(m) = level.mobjs.get_mut(h) {
        m.angle = new_angle;
        m.momx = speed.mul(new_angle.cos());
        m.momy = speed.mul(new_angle.sin());
        m.momz = Fixed((tz - z).0 / dist);
    }
}

/// Parameterized: latch the nearest shootable thing (other than the
/// shooter) within misc2 blocks as the tracer.
pub fn a_find_tracer(level: &mut Level, h: MobjHandle) {
    let (_, rangeblocks) = state_args(level, h);
    let already = level.mobjs.get(h).and_then(|m| m.tracer);
    if level.deref(already).is_some() {
        return;
    }
    let snapshot = level
        .mobjs
        .get(h)
        .map(|m| (m.x, m.y, level.deref(m.target)));
    let Some((x, y, shooter)) = snapshot else {
        return;
    };
    let range = map_units(rangeblocks.clamp(1, 32) * 128);

    let mut best: Option<(Fixed, MobjHandle)> = None;
    radius_things_iterator(level, x, y, range, &mut |lv, other| {
        if other == h || Some(other) == shooter {
            return true;
        }
        let Some(o) = lv.mobjs.get(other) else {
            return true;
        };
        if !o.flags.contains(MobjFlags::SHOOTABLE) {
            return true;
        }
        let dist = approx_dist(o.x - x, o.y - y);
        if best.map_or(true, |(bd, _)| dist < bd) {
            best = Some((dist, other));
        }
        true
    });

    if let Some((_, found)) = best {
        if check_sight(level, h, found) {
            if let Some(m) = level.mobjs.get_mut(h) {
                m.tracer = Some(found);
            }
        }
    }
}

pub fn a_clear_tracer(level: &mut Level, h: MobjHandle) {
    if let Some(m) = level.mobjs.get_mut(h) {
        m.tracer = None;
    }
}

/// Parameterized: jump to misc1 when health drops below misc2.
pub fn a_jump_if_health_below(level: &mut Level, h: MobjHandle) {
    let (jumpstate, threshold) = state_args(level, h);
    let below = level.mobjs.get(h).map_or(false, |m| m.health < threshold);
    if below {
        state_jump(level, h, jumpstate);
    }
}

pub fn a_jump_if_target_in_sight(level: &mut Level, h: MobjHandle) {
    let (jumpstate, _) = state_args(level, h);
    let Some(tg) = level.deref(level.mobjs.get(h).and_then(|m| m.target)) else {
        return;
    };
    if check_sight(level, h, tg) {
        state_jump(level, h, jumpstate);
    }
}

/// Parameterized: jump to misc1 when the target is within misc2 map units.
pub fn a_jump_if_target_closer(level: &mut Level, h: MobjHandle) {
    let (jumpstate, range) = state_args(level, h);
    let Some(tg) = level.deref(level.mobjs.get(h).and_then(|m| m.target)) else {
        return;
    };
    let close = {
        let (Some(m), Some(t)) = (level.mobjs.get(h), level.mobjs.get(tg)) else {
            return;
        };
        approx_dist(t.x - m.x, t.y - m.y) < map_units(range)
    };
    if close {
        state_jump(level, h, jumpstate);
    }
}

pub fn a_jump_if_tracer_in_sight(level: &mut Level, h: MobjHandle) {
    let (jumpstate, _) = state_args(level, h);
    let Some(tr) = level.deref(level.mobjs.get(h).and_then(|m| m.tracer)) else {
        return;
    };
    if check_sight(level, h, tr) {
        state_jump(level, h, jumpstate);
    }
}

pub fn a_jump_if_tracer_closer(level: &mut Level, h: MobjHandle) {
    let (jumpstate, range) = state_args(level, h);
    let Some(tr) = level.deref(level.mobjs.get(h).and_then(|m| m.tracer)) else {
        return;
    };
    let close = {
        let (Some(m), Some(t)) = (level.mobjs.get(h), level.mobjs.get(tr)) else {
            return;
        };
        approx_dist(t.x - m.x, t.y - m.y) < map_units(range)
    };
    if close {
        state_jump(level, h, jumpstate);
    }
}

/// Parameterized: jump to misc1 when all of the misc2 flag bits are set.
pub fn a_jump_if_flags_set(level: &mut Level, h: MobjHandle) {
    let (jumpstate, bits) = state_args(level, h);
    let mask = MobjFlags::from_bits_truncate(bits as u32 as u64);
    let set = level.mobjs.get(h).map_or(false, |m| m.flags.contains(mask));
    if set {
        state_jump(level, h, jumpstate);
    }
}

/// Parameterized: set the misc1 flag bits on the actor.
pub fn a_add_flags(level: &mut Level, h: MobjHandle) {
    let (bits, _) = state_args(level, h);
    let mask = MobjFlags::from_bits_truncate(bits as u32 as u64);
    if let Some(m) = level.mobjs.get_mut(h) {
        m.flags.insert(mask);
    }
}

/// Parameterized: clear the misc1 flag bits on the actor.
pub fn a_remove_flags(level: &mut Level, h: MobjHandle) {
    let (bits, _) = state_args(level, h);
    let mask = MobjFlags::from_bits_truncate(bits as u32 as u64);
    if let Some(m) = level.mobjs.get_mut(h) {
        m.flags.remove(mask);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reboom_common::fixed::ZERO;
    use reboom_common::tables::ANG0;

    use crate::dispatch::ActionId;
    use crate::info::{
        MobjType, Sfx, SpriteNum, State, S_POSS_ATK2, S_POSS_RUN1, S_POSS_STND, S_SARG_ATK1,
        S_SARG_REFIRE, S_SARG_RUN1, S_SKUL_FLY1,
    };
    use crate::p_local::map_units;
    use crate::p_mobj::spawn_mobj;
    use crate::p_setup::{MapData, Vertex};

    fn one_room() -> Level {
        MapData::single_sector(-1024, -1024, 1024, 1024, ZERO, map_units(256)).build()
    }

    fn add_player(level: &mut Level, x: i32, y: i32) -> MobjHandle {
        let p = spawn_mobj(level, map_units(x), map_units(y), ZERO, MobjType::Player).unwrap();
        level.player = Some(p);
        p
    }

    #[test]
    fn look_wakes_on_visible_player() {
        let mut level = one_room();
        let p = add_player(&mut level, 300, 0);
        let m = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Trooper).unwrap();
        a_look(&mut level, m);
        let mm = level.mobj(m).unwrap();
        assert_eq!(level.deref(mm.target), Some(p));
        assert_eq!(mm.state, S_POSS_RUN1);
        assert!(level.sounds.iter().any(|s| s.sfx == Sfx::PosSit));
    }

    #[test]
    fn look_ignores_player_behind_wall() {
        let v = |x: i32, y: i32| Vertex { x: map_units(x), y: map_units(y) };
        let mut map = MapData::single_sector(-1024, -1024, 1024, 1024, ZERO, map_units(256));
        map.add_line(v(100, -1024), v(100, 1024), crate::p_setup::LineFlags::BLOCKING, 0, None);
        let mut level = map.build();
        add_player(&mut level, 300, 0);
        let m = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Trooper).unwrap();
        a_look(&mut level, m);
        let mm = level.mobj(m).unwrap();
        assert_eq!(mm.target, None);
        assert_eq!(mm.state, S_POSS_STND);
    }

    #[test]
    fn ambusher_breaks_cover_for_noise_it_can_see() {
        let mut level = one_room();
        let p = add_player(&mut level, 300, 0);
        let m = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Trooper).unwrap();
        level.mobj_mut(m).unwrap().flags.insert(MobjFlags::AMBUSH);
        // noise reached the sector, but the line of sight also happens to be
        // clear here, so the ambusher still breaks cover
        level.sectors[0].sound_target = Some(p);
        a_look(&mut level, m);
        assert_eq!(level.mobj(m).unwrap().state, S_POSS_RUN1);
    }

    #[test]
    fn noise_floods_open_edges_and_stops_after_two_blocks() {
        // three rooms in a row, both shared edges flagged sound-blocking
        let mut map = MapData::new();
        let a = map.add_sector(ZERO, map_units(256));
        let b = map.add_sector(ZERO, map_units(256));
        let c = map.add_sector(ZERO, map_units(256));
        let v = |x: i32, y: i32| Vertex { x: map_units(x), y: map_units(y) };
        let block = crate::p_setup::LineFlags::BLOCKING;
        let sound = crate::p_setup::LineFlags::SOUND_BLOCK;
        map.add_line(v(-768, -256), v(768, -256), block, a, None);
        map.add_line(v(768, 256), v(-768, 256), block, c, None);
        map.add_line(v(-768, 256), v(-768, -256), block, a, None);
        map.add_line(v(768, -256), v(768, 256), block, c, None);
        map.add_line(v(-256, -256), v(-256, 256), sound, a, Some(b));
        map.add_line(v(256, -256), v(256, 256), sound, b, Some(c));
        let mut level = map.build();
        let shouter = spawn_mobj(&mut level, map_units(-500), ZERO, ZERO, MobjType::Player).unwrap();

        noise_alert(&mut level, Some(shouter), 0);
        assert_eq!(level.sectors[0].sound_target, Some(shouter));
        // one blocking line lets the sound through once
        assert_eq!(level.sectors[1].sound_target, Some(shouter));
        // the second eats it
        assert_eq!(level.sectors[2].sound_target, None);
    }

    #[test]
    fn chase_closes_the_distance() {
        let mut level = one_room();
        let p = add_player(&mut level, 600, 0);
        let m = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Sergeant).unwrap();
        {
            let mm = level.mobj_mut(m).unwrap();
            mm.target = Some(p);
            mm.reactiontime = 0;
        }
        let start = {
            let mm = level.mobj(m).unwrap();
            approx_dist(map_units(600) - mm.x, -mm.y)
        };
        for _ in 0..20 {
            a_chase(&mut level, m);
        }
        let mm = level.mobj(m).unwrap();
        let end = approx_dist(map_units(600) - mm.x, -mm.y);
        assert!(end < start, "sergeant should close in: {start:?} -> {end:?}");
    }

    #[test]
    fn chase_reverts_to_watch_when_target_dies() {
        let mut level = one_room();
        let p = add_player(&mut level, 300, 0);
        let m = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Trooper).unwrap();
        level.mobj_mut(m).unwrap().target = Some(p);
        // dead player, no lastenemy, nothing visible to hunt
        level.mobj_mut(p).unwrap().health = 0;
        level.mobj_mut(p).unwrap().flags.remove(MobjFlags::SHOOTABLE);
        a_chase(&mut level, m);
        assert_eq!(level.mobj(m).unwrap().state, S_POSS_STND);
    }

    #[test]
    fn face_target_turns_east() {
        let mut level = one_room();
        let p = add_player(&mut level, 400, 0);
        let m = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Trooper).unwrap();
        {
            let mm = level.mobj_mut(m).unwrap();
            mm.target = Some(p);
            mm.angle = ANG90;
        }
        a_face_target(&mut level, m);
        assert_eq!(level.mobj(m).unwrap().angle, ANG0);
    }

    #[test]
    fn skull_attack_charges_at_target() {
        let mut level = one_room();
        let p = add_player(&mut level, 500, 0);
        let m = spawn_mobj(&mut level, ZERO, ZERO, map_units(64), MobjType::LostSoul).unwrap();
        level.mobj_mut(m).unwrap().target = Some(p);
        a_skull_attack(&mut level, m);
        let mm = level.mobj(m).unwrap();
        assert!(mm.flags.contains(MobjFlags::SKULLFLY));
        assert_eq!(mm.momx, SKULLSPEED);
        assert_eq!(mm.momy, ZERO);
        assert!(mm.momz < ZERO, "diving toward a floor-level target");
    }

    #[test]
    fn refire_jump_depends_on_range() {
        let mut level = one_room();
        let p = add_player(&mut level, 64, 0);
        let m = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Sergeant).unwrap();
        level.mobj_mut(m).unwrap().target = Some(p);
        // close: the zero-tic refire state jumps straight back to attack
        set_mobj_state(&mut level, m, S_SARG_REFIRE);
        assert_eq!(level.mobj(m).unwrap().state, S_SARG_ATK1);

        // far: it falls through to the run loop
        assert!(p_map::try_move(&mut level, p, map_units(600), ZERO));
        set_mobj_state(&mut level, m, S_SARG_REFIRE);
        assert_eq!(level.mobj(m).unwrap().state, S_SARG_RUN1);
    }

    #[test]
    fn bullet_volley_hurts_the_target() {
        let mut level = one_room();
        // close enough that the aim jitter cannot miss a player-width target
        let p = add_player(&mut level, 36, 0);
        let m = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Trooper).unwrap();
        level.mobj_mut(m).unwrap().target = Some(p);
        let before = level.mobj(p).unwrap().health;
        // the attack state fires on entry
        set_mobj_state(&mut level, m, S_POSS_ATK2);
        assert!(level.mobj(p).unwrap().health < before);
        assert!(level.sounds.iter().any(|s| s.sfx == Sfx::Pistol));
    }

    #[test]
    fn melee_attack_needs_range() {
        let mut level = one_room();
        let p = add_player(&mut level, 600, 0);
        let m = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Sergeant).unwrap();
        level.mobj_mut(m).unwrap().target = Some(p);
        let before = level.mobj(p).unwrap().health;
        level.mobj_mut(m).unwrap().state = S_SARG_ATK1 + 1;
        a_monster_melee_attack(&mut level, m);
        assert_eq!(level.mobj(p).unwrap().health, before, "far away, the bite whiffs");

        assert!(p_map::try_move(&mut level, p, map_units(50), ZERO));
        a_monster_melee_attack(&mut level, m);
        assert!(level.mobj(p).unwrap().health < before);
    }

    const fn pstate(action: Option<ActionId>, misc1: i32, misc2: i32) -> State {
        State {
            sprite: SpriteNum::Poss,
            frame: 0,
            tics: -1,
            action,
            next: 0,
            misc1,
            misc2,
        }
    }

    // states crafted to exercise the flag parameterizations
    static PARAM_STATES: [State; 4] = [
        pstate(None, 0, 0),
        // add NOGRAVITY (bit 9)
        pstate(Some(ActionId::AddFlags), 0x200, 0),
        // jump to state 3 when NOGRAVITY is set
        pstate(Some(ActionId::JumpIfFlagsSet), 3, 0x200),
        pstate(None, 0, 0),
    ];

    #[test]
    fn flag_actions_read_state_args() {
        let mut level = one_room();
        let m = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Trooper).unwrap();
        level.states = &PARAM_STATES;
        level.mobj_mut(m).unwrap().state = 1;
        a_add_flags(&mut level, m);
        assert!(level.mobj(m).unwrap().flags.contains(MobjFlags::NOGRAVITY));

        level.mobj_mut(m).unwrap().state = 2;
        a_jump_if_flags_set(&mut level, m);
        assert_eq!(level.mobj(m).unwrap().state, 3);

        level.mobj_mut(m).unwrap().state = 1;
        a_remove_flags(&mut level, m);
        assert!(!level.mobj(m).unwrap().flags.contains(MobjFlags::NOGRAVITY));
    }

    #[test]
    fn heal_chase_revives_a_corpse() {
        let mut level = one_room();
        let healer = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Sergeant).unwrap();
        let victim = spawn_mobj(&mut level, map_units(30), ZERO, ZERO, MobjType::Trooper).unwrap();
        crate::p_inter::damage_mobj(&mut level, victim, None, None, 1000);
        assert!(level.mobj(victim).unwrap().flags.contains(MobjFlags::CORPSE));

        // park the healer in a state whose misc1 is a valid jump target
        level.mobj_mut(healer).unwrap().state = S_SARG_REFIRE;
        a_heal_chase(&mut level, healer);
        let v = level.mobj(victim).unwrap();
        assert!(v.health > 0);
        assert!(v.flags.contains(MobjFlags::SHOOTABLE));
        assert!(!v.flags.contains(MobjFlags::CORPSE));
        assert_eq!(level.mobj(healer).unwrap().state, S_SARG_ATK1);
    }

    #[test]
    fn skull_charge_resolves_in_full_tics() {
        use crate::p_tick::run_tic;
        use reboom_common::event::TicCmd;

        let mut level = one_room();
        let p = add_player(&mut level, 400, 0);
        let m = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::LostSoul).unwrap();
        {
            let mm = level.mobj_mut(m).unwrap();
            mm.target = Some(p);
            mm.state = S_SKUL_FLY1;
        }
        a_skull_attack(&mut level, m);
        let before = level.mobj(p).unwrap().health;
        for _ in 0..40 {
            run_tic(&mut level, &TicCmd::default());
            if level.mobj(p).map_or(true, |pm| pm.health < before) {
                break;
            }
        }
        // the charge either slammed the player or spent itself on a wall
        let mm = level.mobj(m).unwrap();
        let slammed = level.mobj(p).map_or(true, |pm| pm.health < before);
        assert!(slammed || !mm.flags.contains(MobjFlags::SKULLFLY));
    }
}
