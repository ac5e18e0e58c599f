// p_maputl.rs -- spatial queries: bounding boxes, line sides, blockmap walks

use reboom_common::fixed::{Fixed, FIXED_MAX, FRACBITS, FRACUNIT, ZERO};

use crate::p_local::{Level, MobjHandle, MAXRADIUS};
use crate::p_setup::{Line, SlopeType};

/// Blockmap cell edge length in map units.
pub const MAPBLOCKUNITS: i32 = 128;
/// Shift from raw fixed-point coordinates to cell coordinates.
pub const MAPBLOCKSHIFT: u32 = FRACBITS + 7;
/// Shift from raw fixed-point coordinates to a cell-relative fraction.
const MAPBTOFRAC: u32 = MAPBLOCKSHIFT - FRACBITS;

// =============================================================================
// Bounding boxes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
    pub left: Fixed,
    pub bottom: Fixed,
    pub right: Fixed,
    pub top: Fixed,
}

impl BBox {
    /// Inverted extents; grows to fit via `add`.
    pub fn cleared() -> Self {
        Self { left: FIXED_MAX, bottom: FIXED_MAX, right: Fixed(i32::MIN), top: Fixed(i32::MIN) }
    }

    pub fn from_radius(x: Fixed, y: Fixed, radius: Fixed) -> Self {
        Self { left: x - radius, bottom: y - radius, right: x + radius, top: y + radius }
    }

    pub fn add(&mut self, x: Fixed, y: Fixed) {
        self.left = self.left.min(x);
        self.right = self.right.max(x);
        self.bottom = self.bottom.min(y);
        self.top = self.top.max(y);
    }

    pub fn overlaps(&self, other: &BBox) -> bool {
        self.right > other.left
            && self.left < other.right
            && self.top > other.bottom
            && self.bottom < other.top
    }

    pub fn contains(&self, x: Fixed, y: Fixed) -> bool {
        x >= self.left && x <= self.right && y >= self.bottom && y <= self.top
    }
}

// =============================================================================
// Line side tests
// =============================================================================

/// Which side of a line a point falls on: 0 front, 1 back.
pub fn point_on_line_side(x: Fixed, y: Fixed, line: &Line) -> i32 {
    let dx = (x - line.v1.x).0 as i64;
    let dy = (y - line.v1.y).0 as i64;
    let left = line.dy.0 as i64 * dx;
    let right = dy * line.dx.0 as i64;
    if right < left {
        0
    } else {
        1
    }
}

/// Which side of a line a whole box lies on: 0, 1, or -1 if it straddles.
pub fn box_on_line_side(tmbox: &BBox, line: &Line) -> i32 {
    let (p1, p2) = match line.slope {
        SlopeType::Horizontal => {
            let p1 = (tmbox.top > line.v1.y) as i32;
            let p2 = (tmbox.bottom > line.v1.y) as i32;
            if line.dx < ZERO {
                (p1 ^ 1, p2 ^ 1)
            } else {
                (p1, p2)
            }
        }
        SlopeType::Vertical => {
            let p1 = (tmbox.right < line.v1.x) as i32;
            let p2 = (tmbox.left < line.v1.x) as i32;
            if line.dy < ZERO {
                (p1 ^ 1, p2 ^ 1)
            } else {
                (p1, p2)
            }
        }
        SlopeType::Positive => (
            point_on_line_side(tmbox.left, tmbox.top, line),
            point_on_line_side(tmbox.right, tmbox.bottom, line),
        ),
        SlopeType::Negative => (
            point_on_line_side(tmbox.right, tmbox.top, line),
            point_on_line_side(tmbox.left, tmbox.bottom, line),
        ),
    };
    if p1 == p2 {
        p1
    } else {
        -1
    }
}

/// A trace for side tests and intercept math.
#[derive(Debug, Clone, Copy)]
pub struct Divline {
    pub x: Fixed,
    pub y: Fixed,
    pub dx: Fixed,
    pub dy: Fixed,
}

impl Divline {
    pub fn from_line(line: &Line) -> Self {
        Self { x: line.v1.x, y: line.v1.y, dx: line.dx, dy: line.dy }
    }
}

/// 0 front, 1 back.
pub fn point_on_divline_side(x: Fixed, y: Fixed, div: &Divline) -> i32 {
    let dx = (x - div.x).0 as i64;
    let dy = (y - div.y).0 as i64;
    let left = div.dy.0 as i64 * dx;
    let right = dy * div.dx.0 as i64;
    if right < left {
        0
    } else {
        1
    }
}

/// Fraction along `v2` at which `v1` crosses it. Parallel traces yield 0.
pub fn intercept_vector(v2: &Divline, v1: &Divline) -> Fixed {
    let den = Fixed(v1.dy.0 >> 8).mul(v2.dx) - Fixed(v1.dx.0 >> 8).mul(v2.dy);
    if den == ZERO {
        return ZERO;
    }
    let num = Fixed((v1.x - v2.x).0 >> 8).mul(v1.dy) + Fixed((v2.y - v1.y).0 >> 8).mul(v1.dx);
    num.div(den)
}

// =============================================================================
// Line openings
// =============================================================================

/// Vertical gap a two-sided line leaves between its sectors.
#[derive(Debug, Clone, Copy)]
pub struct Opening {
    pub top: Fixed,
    pub bottom: Fixed,
    pub range: Fixed,
    pub lowfloor: Fixed,
}

pub fn line_opening(level: &Level, li: usize) -> Opening {
    let line = &level.lines[li];
    let Some(back) = line.back_sector else {
        // one-sided lines have no gap
        return Opening { top: ZERO, bottom: ZERO, range: ZERO, lowfloor: ZERO };
    };
    let front = &level.sectors[line.front_sector];
    let back = &level.sectors[back];
    let top = front.ceiling.min(back.ceiling);
    let bottom = front.floor.max(back.floor);
    let lowfloor = front.floor.min(back.floor);
    Opening { top, bottom, range: top - bottom, lowfloor }
}

// =============================================================================
// Blockmap
// =============================================================================

/// Uniform grid over the map. Each cell holds the static lines whose
/// bounding box touches it and an intrusive list of the things whose origin
/// currently falls inside it.
pub struct Blockmap {
    pub org_x: Fixed,
    pub org_y: Fixed,
    pub width: i32,
    pub height: i32,
    pub thing_heads: Vec<Option<MobjHandle>>,
    pub line_cells: Vec<Vec<u16>>,
}

impl Blockmap {
    pub fn new(org_x: Fixed, org_y: Fixed, width: i32, height: i32) -> Self {
        let n = (width.max(1) * height.max(1)) as usize;
        Self {
            org_x,
            org_y,
            width: width.max(1),
            height: height.max(1),
            thing_heads: vec![None; n],
            line_cells: vec![Vec::new(); n],
        }
    }

    pub fn block_x(&self, x: Fixed) -> i32 {
        (x.0.wrapping_sub(self.org_x.0)) >> MAPBLOCKSHIFT
    }

    pub fn block_y(&self, y: Fixed) -> i32 {
        (y.0.wrapping_sub(self.org_y.0)) >> MAPBLOCKSHIFT
    }

    pub fn index(&self, bx: i32, by: i32) -> Option<usize> {
        if bx < 0 || by < 0 || bx >= self.width || by >= self.height {
            None
        } else {
            Some((by * self.width + bx) as usize)
        }
    }

    /// Cell containing a map point, if inside the grid.
    pub fn cell_of(&self, x: Fixed, y: Fixed) -> Option<usize> {
        self.index(self.block_x(x), self.block_y(y))
    }
}

/// Visits every thing whose origin lies in cell (bx, by). The next link is
/// captured before each call, so the visitor may unlink or remove the
/// current thing. Returns false if the visitor stopped the walk.
pub fn block_things_iterator(
    level: &mut Level,
    bx: i32,
    by: i32,
    f: &mut dyn FnMut(&mut Level, MobjHandle) -> bool,
) -> bool {
    let Some(cell) = level.blockmap.index(bx, by) else {
        return true;
    };
    let mut link = level.blockmap.thing_heads[cell];
    while let Some(h) = link {
        let next = level.mobjs.get(h).and_then(|m| m.bnext);
        if !f(level, h) {
            return false;
        }
        link = next;
    }
    true
}

/// Visits every line indexed in cell (bx, by) that has not already been
/// stamped with the current validcount.
pub fn block_lines_iterator(
    level: &mut Level,
    bx: i32,
    by: i32,
    f: &mut dyn FnMut(&mut Level, usize) -> bool,
) -> bool {
    let Some(cell) = level.blockmap.index(bx, by) else {
        return true;
    };
    for i in 0..level.blockmap.line_cells[cell].len() {
        let li = level.blockmap.line_cells[cell][i] as usize;
        if level.lines[li].validcount == level.validcount {
            continue;
        }
        level.lines[li].validcount = level.validcount;
        if !f(level, li) {
            return false;
        }
    }
    true
}

/// Broad-phase query: visits candidate things near (x, y). The search box
/// grows by the largest thing radius because things live in the cell of
/// their origin, not of their extents. Visitors re-check real distance.
pub fn radius_things_iterator(
    level: &mut Level,
    x: Fixed,
    y: Fixed,
    radius: Fixed,
    f: &mut dyn FnMut(&mut Level, MobjHandle) -> bool,
) -> bool {
    let reach = radius + MAXRADIUS;
    let xl = level.blockmap.block_x(x - reach);
    let xh = level.blockmap.block_x(x + reach);
    let yl = level.blockmap.block_y(y - reach);
    let yh = level.blockmap.block_y(y + reach);
    for by in yl..=yh {
        for bx in xl..=xh {
            if !block_things_iterator(level, bx, by, f) {
                return false;
            }
        }
    }
    true
}

// =============================================================================
// Path traversal
// =============================================================================

pub const PT_ADDLINES: u32 = 1;
pub const PT_ADDTHINGS: u32 = 2;
pub const PT_EARLYOUT: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptTarget {
    Line(usize),
    Thing(MobjHandle),
}

#[derive(Debug, Clone, Copy)]
pub struct Intercept {
    pub frac: Fixed,
    pub target: InterceptTarget,
}

/// Walks the blockmap cells crossed by the segment (x1, y1) -> (x2, y2),
/// collects line and thing crossings, then reports them to the visitor in
/// ascending order of fraction along the trace. Stops early and returns
/// false when the visitor does.
pub fn path_traverse(
    level: &mut Level,
    mut x1: Fixed,
    mut y1: Fixed,
    x2: Fixed,
    y2: Fixed,
    flags: u32,
    f: &mut dyn FnMut(&mut Level, &Intercept) -> bool,
) -> bool {
    level.bump_validcount();

    let block_mask = (MAPBLOCKUNITS << FRACBITS) - 1;
    // nudge off exact cell boundaries so the divide below never sees zero
    if (x1 - level.blockmap.org_x).0 & block_mask == 0 {
        x1 = x1 + FRACUNIT;
    }
    if (y1 - level.blockmap.org_y).0 & block_mask == 0 {
        y1 = y1 + FRACUNIT;
    }

    let trace = Divline { x: x1, y: y1, dx: x2 - x1, dy: y2 - y1 };
    let mut intercepts: Vec<Intercept> = Vec::new();
    let mut early_out_hit = false;

    let rx1 = x1 - level.blockmap.org_x;
    let ry1 = y1 - level.blockmap.org_y;
    let rx2 = x2 - level.blockmap.org_x;
    let ry2 = y2 - level.blockmap.org_y;
    let xt1 = rx1.0 >> MAPBLOCKSHIFT;
    let yt1 = ry1.0 >> MAPBLOCKSHIFT;
    let xt2 = rx2.0 >> MAPBLOCKSHIFT;
    let yt2 = ry2.0 >> MAPBLOCKSHIFT;

    let (mapxstep, xpartial, ystep) = if xt2 > xt1 {
        let partial = Fixed(FRACUNIT.0 - ((rx1.0 >> MAPBTOFRAC) & (FRACUNIT.0 - 1)));
        (1, partial, (ry2 - ry1).div((rx2 - rx1).abs()))
    } else if xt2 < xt1 {
        let partial = Fixed((rx1.0 >> MAPBTOFRAC) & (FRACUNIT.0 - 1));
        (-1, partial, (ry2 - ry1).div((rx2 - rx1).abs()))
    } else {
        (0, FRACUNIT, Fixed(256 * FRACUNIT.0))
    };
    let mut yintercept = Fixed(ry1.0 >> MAPBTOFRAC) + xpartial.mul(ystep);

    let (mapystep, ypartial, xstep) = if yt2 > yt1 {
        let partial = Fixed(FRACUNIT.0 - ((ry1.0 >> MAPBTOFRAC) & (FRACUNIT.0 - 1)));
        (1, partial, (rx2 - rx1).div((ry2 - ry1).abs()))
    } else if yt2 < yt1 {
        let partial = Fixed((ry1.0 >> MAPBTOFRAC) & (FRACUNIT.0 - 1));
        (-1, partial, (rx2 - rx1).div((ry2 - ry1).abs()))
    } else {
        (0, FRACUNIT, Fixed(256 * FRACUNIT.0))
    };
    let mut xintercept = Fixed(rx1.0 >> MAPBTOFRAC) + ypartial.mul(xstep);

    let mut mapx = xt1;
    let mut mapy = yt1;
    for _ in 0..64 {
        if flags & PT_ADDLINES != 0 {
            add_line_intercepts(level, mapx, mapy, &trace, flags, &mut intercepts, &mut early_out_hit);
            if early_out_hit {
                return false;
            }
        }
        if flags & PT_ADDTHINGS != 0 {
            add_thing_intercepts(level, mapx, mapy, &trace, &mut intercepts);
        }
        if mapx == xt2 && mapy == yt2 {
            break;
        }
        if (yintercept.0 >> FRACBITS) == mapy {
            yintercept = yintercept + ystep;
            mapx += mapxstep;
        } else if (xintercept.0 >> FRACBITS) == mapx {
            xintercept = xintercept + xstep;
            mapy += mapystep;
        } else {
            break;
        }
    }

    traverse_intercepts(level, &mut intercepts, f)
}

fn add_line_intercepts(
    level: &mut Level,
    bx: i32,
    by: i32,
    trace: &Divline,
    flags: u32,
    intercepts: &mut Vec<Intercept>,
    early_out_hit: &mut bool,
) {
    let Some(cell) = level.blockmap.index(bx, by) else {
        return;
    };
    for i in 0..level.blockmap.line_cells[cell].len() {
        let li = level.blockmap.line_cells[cell][i] as usize;
        if level.lines[li].validcount == level.validcount {
            continue;
        }
        level.lines[li].validcount = level.validcount;

        let line = &level.lines[li];
        let s1 = point_on_divline_side(line.v1.x, line.v1.y, trace);
        let s2 = point_on_divline_side(line.v2.x, line.v2.y, trace);
        if s1 == s2 {
            continue;
        }
        let dl = Divline::from_line(line);
        let frac = intercept_vector(trace, &dl);
        if frac < ZERO {
            continue;
        }
        if flags & PT_EARLYOUT != 0 && frac < FRACUNIT && line.back_sector.is_none() {
            *early_out_hit = true;
            return;
        }
        intercepts.push(Intercept { frac, target: InterceptTarget::Line(li) });
    }
}

fn add_thing_intercepts(
    level: &mut Level,
    bx: i32,
    by: i32,
    trace: &Divline,
    intercepts: &mut Vec<Intercept>,
) {
    let Some(cell) = level.blockmap.index(bx, by) else {
        return;
    };
    let mut link = level.blockmap.thing_heads[cell];
    while let Some(h) = link {
        let Some(m) = level.mobjs.get(h) else {
            break;
        };
        link = m.bnext;

        // present the thing as the diagonal facing the trace
        let tracepositive = (trace.dx.0 ^ trace.dy.0) > 0;
        let (x1, y1, x2, y2) = if tracepositive {
            (m.x - m.radius, m.y + m.radius, m.x + m.radius, m.y - m.radius)
        } else {
            (m.x - m.radius, m.y - m.radius, m.x + m.radius, m.y + m.radius)
        };
        let s1 = point_on_divline_side(x1, y1, trace);
        let s2 = point_on_divline_side(x2, y2, trace);
        if s1 == s2 {
            continue;
        }
        let dl = Divline { x: x1, y: y1, dx: x2 - x1, dy: y2 - y1 };
        let frac = intercept_vector(trace, &dl);
        if frac >= ZERO {
            intercepts.push(Intercept { frac, target: InterceptTarget::Thing(h) });
        }
    }
}

fn traverse_intercepts(
    level: &mut Level,
    intercepts: &mut [Intercept],
    f: &mut dyn FnMut(&mut Level, &Intercept) -> bool,
) -> bool {
    let mut remaining = intercepts.len();
    while remaining > 0 {
        let mut dist = FIXED_MAX;
        let mut pick = usize::MAX;
        for (i, ic) in intercepts.iter().enumerate() {
            if ic.frac < dist {
                dist = ic.frac;
                pick = i;
            }
        }
        if dist > FRACUNIT {
            // beyond the endpoint
            return true;
        }
        let ic = intercepts[pick];
        if !f(level, &ic) {
            return false;
        }
        intercepts[pick].frac = FIXED_MAX;
        remaining -= 1;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::p_local::map_units;
    use crate::p_setup::{LineFlags, MapData, Vertex};

    fn box_level() -> Level {
        MapData::single_sector(-512, -512, 512, 512, ZERO, map_units(128)).build()
    }

    #[test]
    fn point_side_matches_geometry() {
        // line pointing +x along y=0: front is y<0 by convention here
        let line = Line::new(
            Vertex { x: ZERO, y: ZERO },
            Vertex { x: map_units(64), y: ZERO },
            LineFlags::empty(),
            0,
            None,
        );
        assert_eq!(point_on_line_side(map_units(32), map_units(-16), &line), 0);
        assert_eq!(point_on_line_side(map_units(32), map_units(16), &line), 1);
    }

    #[test]
    fn box_side_detects_straddle() {
        let line = Line::new(
            Vertex { x: ZERO, y: map_units(-256) },
            Vertex { x: ZERO, y: map_units(256) },
            LineFlags::empty(),
            0,
            None,
        );
        let west = BBox::from_radius(map_units(-64), ZERO, map_units(16));
        let east = BBox::from_radius(map_units(64), ZERO, map_units(16));
        let across = BBox::from_radius(ZERO, ZERO, map_units(16));
        let w = box_on_line_side(&west, &line);
        let e = box_on_line_side(&east, &line);
        assert_ne!(w, -1);
        assert_ne!(e, -1);
        assert_ne!(w, e);
        assert_eq!(box_on_line_side(&across, &line), -1);
    }

    #[test]
    fn blockmap_cell_resolution() {
        let level = box_level();
        let c1 = level.blockmap.cell_of(ZERO, ZERO);
        assert!(c1.is_some());
        // one full cell east lands in a different cell
        let c2 = level.blockmap.cell_of(map_units(MAPBLOCKUNITS), ZERO);
        assert!(c2.is_some());
        assert_ne!(c1, c2);
        // far outside the grid resolves to no cell
        assert_eq!(level.blockmap.cell_of(map_units(100_000), ZERO), None);
    }

    #[test]
    fn path_traverse_reports_border_wall() {
        let mut level = box_level();
        let mut hits = Vec::new();
        let done = path_traverse(
            &mut level,
            ZERO,
            ZERO,
            map_units(2000),
            ZERO,
            PT_ADDLINES,
            &mut |_lv, ic| {
                hits.push(ic.target);
                true
            },
        );
        assert!(done);
        assert!(
            hits.iter().any(|t| matches!(t, InterceptTarget::Line(_))),
            "trace out of the box must cross the east wall"
        );
    }

    #[test]
    fn intercept_fraction_orders_crossings() {
        let mut level = box_level();
        let mut fracs = Vec::new();
        path_traverse(
            &mut level,
            map_units(-400),
            ZERO,
            map_units(2000),
            ZERO,
            PT_ADDLINES,
            &mut |_lv, ic| {
                fracs.push(ic.frac);
                true
            },
        );
        let mut sorted = fracs.clone();
        sorted.sort();
        assert_eq!(fracs, sorted);
    }
}
