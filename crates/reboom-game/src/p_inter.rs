// p_inter.rs -- damage, death, and item pickup

use tracing::debug;

use reboom_common::fixed::{Fixed, FRACUNIT, ZERO};
use reboom_common::tables::{point_to_angle, ANG180};

use crate::info::{Sfx, StateNum, S_NULL};
use crate::p_local::{Level, MobjFlags, MobjHandle, BASETHRESHOLD};
use crate::p_mobj::{remove_mobj, set_mobj_state, spawn_mobj};

/// Hurts `target` for `damage` points. `inflictor` is the thing doing the
/// hurting (missile, slamming skull) and sources the knockback; `source` is
/// the responsible party and becomes the retaliation target. Either may be
/// absent, as with crushers.
pub fn damage_mobj(
    level: &mut Level,
    target: MobjHandle,
    inflictor: Option<MobjHandle>,
    source: Option<MobjHandle>,
    damage: i32,
) {
    let Some(t) = level.mobjs.get(target) else {
        return;
    };
    if !t.flags.contains(MobjFlags::SHOOTABLE) {
        return;
    }
    if t.health <= 0 {
        return;
    }
    let tflags = t.flags;
    let (tx, ty) = (t.x, t.y);
    let mass = level.info(t.mtype).mass.max(1);
    let painchance = level.info(t.mtype).painchance;
    let painstate = level.info(t.mtype).painstate;
    let painsound = level.info(t.mtype).painsound;

    if tflags.contains(MobjFlags::SKULLFLY) {
        // getting hit knocks a charging skull out of its charge
        if let Some(m) = level.mobjs.get_mut(target) {
            m.momx = ZERO;
            m.momy = ZERO;
            m.momz = ZERO;
        }
    }

    // knockback from the inflictor, inversely scaled by mass
    if let Some(infl) = inflictor {
        if !tflags.contains(MobjFlags::NOGRAVITY) {
            if let Some(i) = level.mobjs.get(infl) {
                let mut ang = point_to_angle(tx - i.x, ty - i.y);
                let thrust = Fixed(damage.saturating_mul(FRACUNIT.0 >> 3).saturating_mul(100) / mass);
                // fall forward of a killing blow from below, sometimes
                if damage < 40
                    && level.mobjs.get(target).map_or(false, |m| {
                        damage > m.health && m.z - i.z > Fixed(64 * FRACUNIT.0)
                    })
                    && level.rng.p_random() & 1 != 0
                {
                    ang = ang + ANG180;
                }
                if let Some(m) = level.mobjs.get_mut(target) {
                    m.momx = m.momx + ang.cos().mul(thrust);
                    m.momy = m.momy + ang.sin().mul(thrust);
                }
            }
        }
    }

    let dead = {
        let Some(m) = level.mobjs.get_mut(target) else {
            return;
        };
        m.health -= damage;
        m.health <= 0
    };
    if dead {
        kill_mobj(level, source, target);
        return;
    }

    if level.rng.p_random() < painchance && !tflags.contains(MobjFlags::SKULLFLY) {
        if let Some(m) = level.mobjs.get_mut(target) {
            m.flags.insert(MobjFlags::JUSTHIT); // fight back next think
        }
        if painstate != S_NULL {
            set_mobj_state(level, target, painstate);
        }
        if let Some(sfx) = painsound {
            level.post_sound(Some(target), sfx);
        }
    }

    if let Some(m) = level.mobjs.get_mut(target) {
        m.reactiontime = 0;
    }

    // anything hurt picks a grudge against the source
    let retaliate = source
        .filter(|&s| s != target)
        .filter(|&s| {
            level
                .mobjs
                .get(target)
                .map_or(false, |m| level.deref(m.target) != Some(s))
        });
    if let Some(s) = retaliate {
        let snapshot = level.mobjs.get(target).map(|m| {
            let info = level.info(m.mtype);
            (m.threshold, m.state, info.spawnstate, info.seestate)
        });
        if let Some((threshold, state, spawnstate, seestate)) = snapshot {
            if threshold == 0 {
                if let Some(m) = level.mobjs.get_mut(target) {
                    m.target = Some(s);
                    m.threshold = BASETHRESHOLD;
                }
                if state == spawnstate && seestate != S_NULL {
                    set_mobj_state(level, target, seestate);
                }
            }
        }
    }
}

/// Transitions `target` into its death sequence.
pub fn kill_mobj(level: &mut Level, source: Option<MobjHandle>, target: MobjHandle) {
    let Some(t) = level.mobjs.get(target) else {
        return;
    };
    let info = *level.info(t.mtype);
    let (x, y, z) = (t.x, t.y, t.z);
    let overkill = t.health < -info.spawnhealth;
    debug!(slot = target.slot(), "killed");

    if t.flags.contains(MobjFlags::COUNTKILL) {
        level.kills += 1;
    }

    if let Some(m) = level.mobjs.get_mut(target) {
        m.flags
            .remove(MobjFlags::SHOOTABLE | MobjFlags::FLOAT | MobjFlags::SKULLFLY);
        m.flags.insert(MobjFlags::CORPSE | MobjFlags::DROPOFF);
        m.height = Fixed(m.height.0 >> 2);
        if let Some(s) = source {
            m.target = Some(s);
        }
    }

    let deathstate: StateNum = if overkill && info.xdeathstate != S_NULL {
        info.xdeathstate
    } else {
        info.deathstate
    };
    if deathstate != S_NULL {
        set_mobj_state(level, target, deathstate);
        // desynchronize corpse animations
        let jitter = level.rng.p_random() & 3;
        if let Some(m) = level.mobjs.get_mut(target) {
            if m.tics > 0 {
                m.tics = (m.tics - jitter).max(1);
            }
        }
    } else {
        remove_mobj(level, target);
        return;
    }

    // some things leave their ammo behind
    if let Some(drop) = info.dropped_item {
        if let Ok(h) = spawn_mobj(level, x, y, z, drop) {
            if let Some(m) = level.mobjs.get_mut(h) {
                m.flags.insert(MobjFlags::DROPPED);
            }
        }
    }
}

/// A thing with PICKUP walked into a SPECIAL item.
pub fn touch_special(level: &mut Level, special: MobjHandle, toucher: MobjHandle) {
    let Some(s) = level.mobjs.get(special) else {
        return;
    };
    let Some(t) = level.mobjs.get(toucher) else {
        return;
    };
    // out of vertical reach
    if t.z > s.top() || t.top() < s.z {
        return;
    }
    // the toucher may already be dying this tic
    if t.health <= 0 {
        return;
    }
    if s.flags.contains(MobjFlags::COUNTITEM) {
        level.items += 1;
    }
    level.post_sound(Some(toucher), Sfx::ItemUp);
    remove_mobj(level, special);
}

#[cfg(test)]
mod tests {
    use super::*;
    use reboom_common::event::TicCmd;
    use reboom_common::fixed::ZERO;

    use crate::info::{MobjType, S_POSS_PAIN1, S_POSS_RUN1};
    use crate::p_local::map_units;
    use crate::p_mobj::spawn_mobj;
    use crate::p_setup::MapData;
    use crate::p_tick::run_tic;

    fn one_room() -> Level {
        MapData::single_sector(-512, -512, 512, 512, ZERO, map_units(256)).build()
    }

    #[test]
    fn damage_reduces_health_and_kills() {
        let mut level = one_room();
        let h = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Trooper).unwrap();
        damage_mobj(&mut level, h, None, None, 12);
        assert_eq!(level.mobj(h).unwrap().health, 8);
        damage_mobj(&mut level, h, None, None, 12);
        let m = level.mobj(h).unwrap();
        assert!(m.health <= 0);
        assert!(m.flags.contains(MobjFlags::CORPSE));
        assert!(!m.flags.contains(MobjFlags::SHOOTABLE));
        assert_eq!(level.kills, 1);
    }

    #[test]
    fn corpse_height_collapses() {
        let mut level = one_room();
        let h = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Trooper).unwrap();
        let tall = level.mobj(h).unwrap().height;
        damage_mobj(&mut level, h, None, None, 1000);
        assert_eq!(level.mobj(h).unwrap().height, Fixed(tall.0 >> 2));
    }

    #[test]
    fn hurt_monster_turns_on_attacker() {
        let mut level = one_room();
        let victim = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Sergeant).unwrap();
        let attacker =
            spawn_mobj(&mut level, map_units(200), ZERO, ZERO, MobjType::Trooper).unwrap();
        damage_mobj(&mut level, victim, Some(attacker), Some(attacker), 5);
        let m = level.mobj(victim).unwrap();
        assert_eq!(level.deref(m.target), Some(attacker));
        assert_eq!(m.threshold, BASETHRESHOLD);
    }

    #[test]
    fn knockback_pushes_away_from_inflictor() {
        let mut level = one_room();
        let victim = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Trooper).unwrap();
        let west = spawn_mobj(&mut level, map_units(-100), ZERO, ZERO, MobjType::Trooper).unwrap();
        damage_mobj(&mut level, victim, Some(west), Some(west), 5);
        assert!(level.mobj(victim).unwrap().momx > ZERO, "pushed east");
    }

    #[test]
    fn only_high_victims_fall_toward_the_inflictor() {
        // the fall-forward flip needs the victim well above the inflictor;
        // a victim far below keeps its knockback pointing away
        let mut level = one_room();
        let victim = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Trooper).unwrap();
        let above =
            spawn_mobj(&mut level, map_units(100), ZERO, map_units(200), MobjType::Trooper).unwrap();
        level.mobj_mut(victim).unwrap().health = 10;
        damage_mobj(&mut level, victim, Some(above), None, 30);
        assert!(level.mobj(victim).unwrap().momx < ZERO, "pushed away, not under");
    }

    #[test]
    fn heavier_things_take_less_knockback() {
        let mut level = one_room();
        let light = spawn_mobj(&mut level, ZERO, map_units(-200), ZERO, MobjType::Trooper).unwrap();
        let heavy =
            spawn_mobj(&mut level, ZERO, map_units(200), ZERO, MobjType::Sergeant).unwrap();
        let west = spawn_mobj(&mut level, map_units(-100), map_units(-200), ZERO, MobjType::Trooper)
            .unwrap();
        let west2 = spawn_mobj(&mut level, map_units(-100), map_units(200), ZERO, MobjType::Trooper)
            .unwrap();
        damage_mobj(&mut level, light, Some(west), Some(west), 5);
        damage_mobj(&mut level, heavy, Some(west2), Some(west2), 5);
        assert!(level.mobj(light).unwrap().momx > level.mobj(heavy).unwrap().momx);
    }

    #[test]
    fn pain_state_interrupts() {
        let mut level = one_room();
        // lost soul painchance is 256, so a hit always flinches
        let h = spawn_mobj(&mut level, ZERO, ZERO, map_units(64), MobjType::LostSoul).unwrap();
        damage_mobj(&mut level, h, None, None, 1);
        assert_eq!(level.mobj(h).unwrap().state, crate::info::S_SKUL_PAIN);
    }

    #[test]
    fn trooper_drops_a_clip() {
        let mut level = one_room();
        let h = spawn_mobj(&mut level, map_units(50), ZERO, ZERO, MobjType::Trooper).unwrap();
        damage_mobj(&mut level, h, None, None, 1000);
        let dropped: Vec<_> = level
            .mobjs
            .iter()
            .filter(|(_, m)| m.mtype == MobjType::Clip)
            .collect();
        assert_eq!(dropped.len(), 1);
        assert!(dropped[0].1.flags.contains(MobjFlags::DROPPED));
    }

    #[test]
    fn pickup_counts_and_removes() {
        let mut level = one_room();
        let clip = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Clip).unwrap();
        let player = spawn_mobj(&mut level, map_units(100), ZERO, ZERO, MobjType::Player).unwrap();
        level.player = Some(player);
        level.total_items = 1;
        assert!(crate::p_map::try_move(&mut level, player, ZERO, ZERO));
        assert!(level.mobj(clip).is_none(), "item consumed");
        assert_eq!(level.items, 1);
        assert!(level
            .sounds
            .iter()
            .any(|s| s.sfx == Sfx::ItemUp));
        run_tic(&mut level, &TicCmd::default());
    }

    #[test]
    fn woken_monster_leaves_spawn_state() {
        let mut level = one_room();
        let victim = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Trooper).unwrap();
        let attacker =
            spawn_mobj(&mut level, map_units(300), ZERO, ZERO, MobjType::Sergeant).unwrap();
        damage_mobj(&mut level, victim, Some(attacker), Some(attacker), 1);
        let st = level.mobj(victim).unwrap().state;
        assert!(st == S_POSS_RUN1 || st == S_POSS_PAIN1, "no longer idling");
    }
}
