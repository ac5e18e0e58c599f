// p_user.rs -- player thinking driven by tic commands

use reboom_common::event::{Buttons, TicCmd};
use reboom_common::fixed::Fixed;
use reboom_common::tables::{Angle, ANG90};

use crate::info::MobjType;
use crate::p_local::{Level, MobjHandle};
use crate::p_mobj::spawn_player_missile;

/// One keyboard/joystick unit of thrust, in momentum per move unit.
const MOVE_SCALE: i32 = 2048;

fn thrust(level: &mut Level, h: MobjHandle, angle: Angle, amount: Fixed) {
    if let Some(m) = level.mobjs.get_mut(h) {
        m.momx = m.momx + amount.mul(angle.cos());
        m.momy = m.momy + amount.mul(angle.sin());
    }
}

/// Applies one tic command to the player's map object. Turning is free;
/// thrust only bites when standing on the ground.
pub fn player_think(level: &mut Level, h: MobjHandle, cmd: &TicCmd) {
    let Some(m) = level.mobjs.get_mut(h) else {
        return;
    };
    if m.health <= 0 {
        // dead players stop steering; momentum and gravity still apply
        return;
    }

    m.angle = m.angle + Angle(((cmd.angleturn as i32) << 16) as u32);
    let angle = m.angle;
    let onground = m.z <= m.floorz;

    if onground {
        if cmd.forwardmove != 0 {
            let amount = Fixed(cmd.forwardmove as i32 * MOVE_SCALE);
            thrust(level, h, angle, amount);
        }
        if cmd.sidemove != 0 {
            let amount = Fixed(cmd.sidemove as i32 * MOVE_SCALE);
            thrust(level, h, angle - ANG90, amount);
        }
    }

    if cmd.buttons.contains(Buttons::ATTACK) {
        spawn_player_missile(level, h, MobjType::TrooperShot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reboom_common::fixed::ZERO;
    use reboom_common::tables::ANG0;

    use crate::p_local::map_units;
    use crate::p_mobj::spawn_mobj;
    use crate::p_setup::MapData;
    use crate::p_tick::run_tic;

    fn level_with_player() -> (Level, MobjHandle) {
        let mut level =
            MapData::single_sector(-1024, -1024, 1024, 1024, ZERO, map_units(256)).build();
        let p = spawn_mobj(&mut level, ZERO, ZERO, ZERO, MobjType::Player).unwrap();
        level.player = Some(p);
        (level, p)
    }

    #[test]
    fn forward_thrust_moves_along_facing() {
        let (mut level, p) = level_with_player();
        level.mobj_mut(p).unwrap().angle = ANG0;
        let cmd = TicCmd { forwardmove: 25, ..TicCmd::default() };
        run_tic(&mut level, &cmd);
        let m = level.mobj(p).unwrap();
        assert!(m.momx > ZERO || m.x > ZERO, "pushed east");
        assert_eq!(m.y, ZERO);
    }

    #[test]
    fn strafe_is_perpendicular() {
        let (mut level, p) = level_with_player();
        level.mobj_mut(p).unwrap().angle = ANG0;
        let cmd = TicCmd { sidemove: 25, ..TicCmd::default() };
        run_tic(&mut level, &cmd);
        let m = level.mobj(p).unwrap();
        assert_eq!(m.x, ZERO);
        assert!(m.y < ZERO, "positive sidemove slips right of the facing");
    }

    #[test]
    fn turning_accumulates() {
        let (mut level, p) = level_with_player();
        level.mobj_mut(p).unwrap().angle = ANG0;
        let cmd = TicCmd { angleturn: 512, ..TicCmd::default() };
        run_tic(&mut level, &cmd);
        run_tic(&mut level, &cmd);
        assert_eq!(level.mobj(p).unwrap().angle, Angle(2 << 25));
    }

    #[test]
    fn friction_bleeds_momentum_off() {
        let (mut level, p) = level_with_player();
        let cmd = TicCmd { forwardmove: 25, ..TicCmd::default() };
        run_tic(&mut level, &cmd);
        let moving = level.mobj(p).unwrap().momx;
        assert!(moving > ZERO);
        // coast without input until friction stops the slide
        for _ in 0..80 {
            run_tic(&mut level, &TicCmd::default());
        }
        assert_eq!(level.mobj(p).unwrap().momx, ZERO);
    }

    #[test]
    fn attack_button_fires_a_missile() {
        let (mut level, p) = level_with_player();
        level.mobj_mut(p).unwrap().angle = ANG0;
        let cmd = TicCmd { buttons: Buttons::ATTACK, ..TicCmd::default() };
        run_tic(&mut level, &cmd);
        let shots: Vec<_> = level
            .mobjs
            .iter()
            .filter(|(_, m)| m.mtype == MobjType::TrooperShot)
            .collect();
        assert_eq!(shots.len(), 1);
        let (_, shot) = shots[0];
        assert!(shot.momx > ZERO, "flies out along the facing");
        assert_eq!(level.deref(shot.target), Some(p));
    }

    #[test]
    fn dead_player_ignores_input() {
        let (mut level, p) = level_with_player();
        crate::p_inter::damage_mobj(&mut level, p, None, None, 1000);
        let cmd = TicCmd { forwardmove: 25, angleturn: 512, ..TicCmd::default() };
        let angle = level.mobj(p).unwrap().angle;
        run_tic(&mut level, &cmd);
        let m = level.mobj(p).unwrap();
        assert_eq!(m.angle, angle);
        assert_eq!(m.momx, ZERO);
    }
}
