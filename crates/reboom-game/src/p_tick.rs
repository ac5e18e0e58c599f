// p_tick.rs -- thinker list and the per-tic simulation driver

use reboom_common::event::TicCmd;

use crate::p_local::{Level, MobjHandle};
use crate::p_mobj;
use crate::p_user;

/// Ordered list of every active thing. Entries for removed things linger as
/// tombstones until the end-of-tic sweep; iteration skips them, so a thing
/// removed mid-tic stops acting immediately but keeps its slot until the
/// tic finishes.
#[derive(Debug, Default)]
pub struct ThinkerList {
    pub(crate) order: Vec<MobjHandle>,
}

impl ThinkerList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, h: MobjHandle) {
        self.order.push(h);
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Live handles in think order.
    pub fn iter(&self) -> impl Iterator<Item = MobjHandle> + '_ {
        self.order.iter().copied()
    }
}

/// Advances the level one tic: runs every thinker that was registered when
/// the pass began, sweeps out tombstones, then services the item respawn
/// queue. Things spawned during the pass first think on the next tic.
pub fn run_tic(level: &mut Level, cmd: &TicCmd) {
    level.sounds.clear();

    let count = level.thinkers.order.len();
    for i in 0..count {
        let h = level.thinkers.order[i];
        if level.mobjs.get(h).is_none() {
            continue;
        }
        if level.is_player(h) {
            p_user::player_think(level, h, cmd);
        }
        if level.mobjs.get(h).is_some() {
            p_mobj::mobj_thinker(level, h);
        }
    }

    let mobjs = &level.mobjs;
    level.thinkers.order.retain(|&h| mobjs.get(h).is_some());

    p_mobj::respawn_specials(level);
    level.leveltime = level.leveltime.wrapping_add(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use reboom_common::fixed::ZERO;

    use crate::info::MobjType;
    use crate::p_local::map_units;
    use crate::p_mobj::{remove_mobj, spawn_mobj};
    use crate::p_setup::MapData;

    fn empty_level() -> crate::p_local::Level {
        MapData::single_sector(-512, -512, 512, 512, ZERO, map_units(256)).build()
    }

    #[test]
    fn spawn_registers_thinker() {
        let mut level = empty_level();
        let h = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Trooper).unwrap();
        assert!(level.thinkers.iter().any(|t| t == h));
    }

    #[test]
    fn tombstones_swept_after_tic() {
        let mut level = empty_level();
        let a = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Trooper).unwrap();
        let b = spawn_mobj(&mut level, map_units(64), ZERO, ZERO, MobjType::Trooper).unwrap();
        remove_mobj(&mut level, a);
        // tombstone still occupies the list until the sweep
        assert_eq!(level.thinkers.len(), 2);
        run_tic(&mut level, &TicCmd::default());
        assert_eq!(level.thinkers.len(), 1);
        assert!(level.thinkers.iter().any(|t| t == b));
        assert!(level.mobj(a).is_none());
    }

    #[test]
    fn leveltime_advances_per_tic() {
        let mut level = empty_level();
        assert_eq!(level.leveltime, 0);
        for _ in 0..5 {
            run_tic(&mut level, &TicCmd::default());
        }
        assert_eq!(level.leveltime, 5);
    }
}
