// p_sight.rs -- line of sight checks

use reboom_common::fixed::{Fixed, ZERO};

use crate::p_local::{Level, MobjHandle};
use crate::p_maputl::{line_opening, path_traverse, InterceptTarget, PT_ADDLINES};

/// True if an unobstructed sight line runs from `looker`'s eyes to any part
/// of `target`. One-sided walls block outright; at a two-sided edge the
/// vertical window narrows the pair of slopes that must stay open.
pub fn check_sight(level: &mut Level, looker: MobjHandle, target: MobjHandle) -> bool {
    let Some(l) = level.mobjs.get(looker) else {
        return false;
    };
    let Some(t) = level.mobjs.get(target) else {
        return false;
    };
    let (x1, y1) = (l.x, l.y);
    let (x2, y2) = (t.x, t.y);
    // eyes sit a quarter height below the top
    let sightz = l.z + l.height - Fixed(l.height.0 >> 2);
    let mut bottom_slope = t.z - sightz;
    let mut top_slope = t.z + t.height - sightz;

    path_traverse(level, x1, y1, x2, y2, PT_ADDLINES, &mut |lv, ic| {
        let InterceptTarget::Line(li) = ic.target else {
            return true;
        };
        let Some(back) = lv.lines[li].back_sector else {
            return false;
        };
        let open = line_opening(lv, li);
        if open.range <= ZERO {
            return false; // closed door
        }
        let front = lv.lines[li].front_sector;
        let (ffloor, bfloor) = (lv.sectors[front].floor, lv.sectors[back].floor);
        let (fceil, bceil) = (lv.sectors[front].ceiling, lv.sectors[back].ceiling);
        if ffloor == bfloor && fceil == bceil {
            return true; // no silhouette, nothing to narrow
        }
        if ic.frac <= ZERO {
            return true;
        }
        if ffloor != bfloor {
            let slope = (open.bottom - sightz).div(ic.frac);
            if slope > bottom_slope {
                bottom_slope = slope;
            }
        }
        if fceil != bceil {
            let slope = (open.top - sightz).div(ic.frac);
            if slope < top_slope {
                top_slope = slope;
            }
        }
        // window squeezed shut
        top_slope > bottom_slope
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reboom_common::fixed::ZERO;

    use crate::info::MobjType;
    use crate::p_local::map_units;
    use crate::p_mobj::spawn_mobj;
    use crate::p_setup::{LineFlags, MapData, Vertex};

    #[test]
    fn open_room_has_sight() {
        let mut level =
            MapData::single_sector(-512, -512, 512, 512, ZERO, map_units(256)).build();
        let a = spawn_mobj(&mut level, map_units(-300), ZERO, ZERO, MobjType::Trooper).unwrap();
        let b = spawn_mobj(&mut level, map_units(300), map_units(100), ZERO, MobjType::Trooper)
            .unwrap();
        assert!(check_sight(&mut level, a, b));
        assert!(check_sight(&mut level, b, a));
    }

    #[test]
    fn interior_wall_blocks_sight() {
        let mut map = MapData::single_sector(-512, -512, 512, 512, ZERO, map_units(256));
        let v = |x: i32, y: i32| Vertex { x: map_units(x), y: map_units(y) };
        // full-height one-sided partition at x = 0
        map.add_line(v(0, -512), v(0, 512), LineFlags::BLOCKING, 0, None);
        let mut level = map.build();
        let a = spawn_mobj(&mut level, map_units(-300), ZERO, ZERO, MobjType::Trooper).unwrap();
        let b = spawn_mobj(&mut level, map_units(300), ZERO, ZERO, MobjType::Trooper).unwrap();
        assert!(!check_sight(&mut level, a, b));
    }

    #[test]
    fn sill_visibility_depends_on_angle() {
        let mut map = MapData::new();
        let left = map.add_sector(ZERO, map_units(256));
        let right = map.add_sector(map_units(128), map_units(256));
        let v = |x: i32, y: i32| Vertex { x: map_units(x), y: map_units(y) };
        map.add_line(v(-512, -256), v(0, -256), LineFlags::BLOCKING, left, None);
        map.add_line(v(0, 256), v(-512, 256), LineFlags::BLOCKING, left, None);
        map.add_line(v(-512, 256), v(-512, -256), LineFlags::BLOCKING, left, None);
        map.add_line(v(0, -256), v(512, -256), LineFlags::BLOCKING, right, None);
        map.add_line(v(512, -256), v(512, 256), LineFlags::BLOCKING, right, None);
        map.add_line(v(512, 256), v(0, 256), LineFlags::BLOCKING, right, None);
        map.add_line(v(0, -256), v(0, 256), LineFlags::empty(), left, Some(right));
        let mut level = map.build();

        // target stands on the raised floor just past the sill
        let b = spawn_mobj(&mut level, map_units(16), ZERO, crate::p_local::ONFLOORZ, MobjType::Trooper)
            .unwrap();
        assert_eq!(level.mobj(b).unwrap().z, map_units(128));

        // from deep in the low room the sight line clears the sill edge
        let far = spawn_mobj(&mut level, map_units(-400), ZERO, ZERO, MobjType::Trooper).unwrap();
        assert!(check_sight(&mut level, far, b));

        // pressed against the sill the line over the edge is too steep
        let near = spawn_mobj(&mut level, map_units(-16), map_units(60), ZERO, MobjType::Trooper)
            .unwrap();
        assert!(!check_sight(&mut level, near, b));
    }

    #[test]
    fn closed_vertical_gap_blocks() {
        let mut map = MapData::new();
        let left = map.add_sector(ZERO, map_units(256));
        // right sector floor meets its ceiling: a shut door
        let right = map.add_sector(map_units(128), map_units(128));
        let v = |x: i32, y: i32| Vertex { x: map_units(x), y: map_units(y) };
        map.add_line(v(-512, -256), v(0, -256), LineFlags::BLOCKING, left, None);
        map.add_line(v(0, 256), v(-512, 256), LineFlags::BLOCKING, left, None);
        map.add_line(v(-512, 256), v(-512, -256), LineFlags::BLOCKING, left, None);
        map.add_line(v(0, -256), v(512, -256), LineFlags::BLOCKING, right, None);
        map.add_line(v(512, -256), v(512, 256), LineFlags::BLOCKING, right, None);
        map.add_line(v(512, 256), v(0, 256), LineFlags::BLOCKING, right, None);
        map.add_line(v(0, -256), v(0, 256), LineFlags::empty(), left, Some(right));
        let mut level = map.build();
        let a = spawn_mobj(&mut level, map_units(-300), ZERO, ZERO, MobjType::Trooper).unwrap();
        let b = spawn_mobj(&mut level, map_units(300), ZERO, map_units(128), MobjType::Trooper)
            .unwrap();
        assert!(!check_sight(&mut level, a, b));
    }
}
