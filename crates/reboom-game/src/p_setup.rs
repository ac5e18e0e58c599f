// p_setup.rs -- level construction from map geometry and thing placements

use bitflags::bitflags;
use tracing::{debug, warn};

use reboom_common::fixed::{Fixed, ZERO};
use reboom_common::tables::Angle;

use crate::info::{MobjInfo, MobjType, State, MOBJINFO, STATES};
use crate::m_random::SimRng;
use crate::p_local::{map_units, Level, MobjHandle, SimConfig, MAXRADIUS};
use crate::p_map::SecNodePool;
use crate::p_maputl::{BBox, Blockmap, MAPBLOCKSHIFT};
use crate::p_mobj::{self, MobjArena, RespawnQueue};
use crate::p_tick::ThinkerList;

// =============================================================================
// Geometry
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vertex {
    pub x: Fixed,
    pub y: Fixed,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LineFlags: u16 {
        /// Blocks all walkers.
        const BLOCKING       = 0x0001;
        /// Blocks monsters but not players.
        const BLOCK_MONSTERS = 0x0002;
        /// Has a back sector.
        const TWO_SIDED      = 0x0004;
        /// Sound flood crosses at most one of these per alert.
        const SOUND_BLOCK    = 0x0040;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlopeType {
    Horizontal,
    Vertical,
    Positive,
    Negative,
}

#[derive(Debug, Clone)]
pub struct Line {
    pub v1: Vertex,
    pub v2: Vertex,
    pub dx: Fixed,
    pub dy: Fixed,
    pub flags: LineFlags,
    pub front_sector: usize,
    pub back_sector: Option<usize>,
    pub bbox: BBox,
    pub slope: SlopeType,
    pub validcount: u32,
}

impl Line {
    pub fn new(
        v1: Vertex,
        v2: Vertex,
        mut flags: LineFlags,
        front_sector: usize,
        back_sector: Option<usize>,
    ) -> Self {
        let dx = v2.x - v1.x;
        let dy = v2.y - v1.y;
        let slope = if dx == ZERO {
            SlopeType::Vertical
        } else if dy == ZERO {
            SlopeType::Horizontal
        } else if (dx.0 < 0) == (dy.0 < 0) {
            SlopeType::Positive
        } else {
            SlopeType::Negative
        };
        let mut bbox = BBox::cleared();
        bbox.add(v1.x, v1.y);
        bbox.add(v2.x, v2.y);
        flags.set(LineFlags::TWO_SIDED, back_sector.is_some());
        Self { v1, v2, dx, dy, flags, front_sector, back_sector, bbox, slope, validcount: 0 }
    }
}

/// A floor/ceiling volume. Carries the heads of the two per-sector thing
/// structures: the intrusive origin list and the pooled touching list.
#[derive(Debug, Clone)]
pub struct Sector {
    pub floor: Fixed,
    pub ceiling: Fixed,
    pub bbox: BBox,
    pub lines: Vec<u16>,
    /// Head of the intrusive list of things whose origin is here.
    pub thing_list: Option<MobjHandle>,
    /// Head of the by-sector chain of touching nodes.
    pub touching: Option<u32>,
    /// Last noise-maker heard here; monsters at rest investigate it.
    pub sound_target: Option<MobjHandle>,
    pub validcount: u32,
}

// =============================================================================
// Thing placements
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skill {
    Baby,
    Easy,
    Medium,
    Hard,
    Nightmare,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ThingOptions: u16 {
        const EASY   = 0x0001;
        const NORMAL = 0x0002;
        const HARD   = 0x0004;
        /// Spawns deaf: wakes on sight only.
        const AMBUSH = 0x0008;
    }
}

impl ThingOptions {
    pub fn allows_skill(self, skill: Skill) -> bool {
        match skill {
            Skill::Baby | Skill::Easy => self.contains(ThingOptions::EASY),
            Skill::Medium => self.contains(ThingOptions::NORMAL),
            Skill::Hard | Skill::Nightmare => self.contains(ThingOptions::HARD),
        }
    }
}

/// One spawn record from the map. Kept verbatim on spawned items so the
/// respawn queue can re-create them later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapThing {
    pub x: Fixed,
    pub y: Fixed,
    pub angle: Angle,
    pub mtype: MobjType,
    pub options: ThingOptions,
}

// =============================================================================
// Map data
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct SectorDef {
    pub floor: Fixed,
    pub ceiling: Fixed,
}

#[derive(Debug, Clone, Copy)]
pub struct LineDef {
    pub v1: Vertex,
    pub v2: Vertex,
    pub flags: LineFlags,
    pub front_sector: usize,
    pub back_sector: Option<usize>,
}

/// Raw level description handed over by the map loader.
#[derive(Debug, Clone, Default)]
pub struct MapData {
    pub sectors: Vec<SectorDef>,
    pub lines: Vec<LineDef>,
    pub things: Vec<MapThing>,
}

impl MapData {
    pub fn new() -> Self {
        Self::default()
    }

    /// One rectangular sector fenced by four one-sided walls. Coordinates
    /// are map units.
    pub fn single_sector(left: i32, bottom: i32, right: i32, top: i32, floor: Fixed, ceiling: Fixed) -> Self {
        let mut map = Self::new();
        let s = map.add_sector(floor, ceiling);
        let bl = Vertex { x: map_units(left), y: map_units(bottom) };
        let br = Vertex { x: map_units(right), y: map_units(bottom) };
        let tr = Vertex { x: map_units(right), y: map_units(top) };
        let tl = Vertex { x: map_units(left), y: map_units(top) };
        map.add_line(bl, br, LineFlags::BLOCKING, s, None);
        map.add_line(br, tr, LineFlags::BLOCKING, s, None);
        map.add_line(tr, tl, LineFlags::BLOCKING, s, None);
        map.add_line(tl, bl, LineFlags::BLOCKING, s, None);
        map
    }

    pub fn add_sector(&mut self, floor: Fixed, ceiling: Fixed) -> usize {
        self.sectors.push(SectorDef { floor, ceiling });
        self.sectors.len() - 1
    }

    pub fn add_line(
        &mut self,
        v1: Vertex,
        v2: Vertex,
        flags: LineFlags,
        front_sector: usize,
        back_sector: Option<usize>,
    ) {
        self.lines.push(LineDef { v1, v2, flags, front_sector, back_sector });
    }

    pub fn add_thing(&mut self, x: Fixed, y: Fixed, angle: Angle, mtype: MobjType, options: ThingOptions) {
        self.things.push(MapThing { x, y, angle, mtype, options });
    }

    /// Builds a level with the standard tables and default config.
    pub fn build(&self) -> Level {
        self.build_with(SimConfig::default(), Skill::Medium, &STATES, &MOBJINFO)
    }

    pub fn build_with(
        &self,
        config: SimConfig,
        skill: Skill,
        states: &'static [State],
        mobjinfo: &'static [MobjInfo],
    ) -> Level {
        setup_level(self, config, skill, states, mobjinfo)
    }
}

// =============================================================================
// Level setup
// =============================================================================

/// Builds the runtime level: sectors with their line lists and bounds, the
/// blockmap over all lines, then every map thing spawned in place.
pub fn setup_level(
    map: &MapData,
    config: SimConfig,
    skill: Skill,
    states: &'static [State],
    mobjinfo: &'static [MobjInfo],
) -> Level {
    let mut sectors: Vec<Sector> = map
        .sectors
        .iter()
        .map(|sd| Sector {
            floor: sd.floor,
            ceiling: sd.ceiling,
            bbox: BBox::cleared(),
            lines: Vec::new(),
            thing_list: None,
            touching: None,
            sound_target: None,
            validcount: 0,
        })
        .collect();

    let mut map_bbox = BBox::cleared();
    let lines: Vec<Line> = map
        .lines
        .iter()
        .map(|ld| Line::new(ld.v1, ld.v2, ld.flags, ld.front_sector, ld.back_sector))
        .collect();
    for (li, line) in lines.iter().enumerate() {
        map_bbox.add(line.v1.x, line.v1.y);
        map_bbox.add(line.v2.x, line.v2.y);
        sectors[line.front_sector].lines.push(li as u16);
        sectors[line.front_sector].bbox.add(line.v1.x, line.v1.y);
        sectors[line.front_sector].bbox.add(line.v2.x, line.v2.y);
        if let Some(back) = line.back_sector {
            sectors[back].lines.push(li as u16);
            sectors[back].bbox.add(line.v1.x, line.v1.y);
            sectors[back].bbox.add(line.v2.x, line.v2.y);
        }
    }

    let blockmap = build_blockmap(&lines, &map_bbox);

    let mut level = Level {
        config,
        states,
        mobjinfo,
        sectors,
        lines,
        blockmap,
        mobjs: MobjArena::new(config.max_mobjs),
        thinkers: ThinkerList::new(),
        secnodes: SecNodePool::new(),
        respawn_queue: RespawnQueue::new(),
        rng: SimRng::new(),
        validcount: 0,
        leveltime: 0,
        floatok: false,
        player: None,
        total_kills: 0,
        kills: 0,
        total_items: 0,
        items: 0,
        sounds: Vec::new(),
    };

    for mt in &map.things {
        match p_mobj::spawn_map_thing(&mut level, mt, skill) {
            Ok(Some(h)) => debug!(thing = ?mt.mtype, slot = h.slot(), "spawned map thing"),
            Ok(None) => {}
            Err(e) => warn!(thing = ?mt.mtype, error = %e, "map thing not spawned"),
        }
    }

    level
}

fn build_blockmap(lines: &[Line], map_bbox: &BBox) -> Blockmap {
    let (org_x, org_y, width, height) = if lines.is_empty() {
        (ZERO, ZERO, 1, 1)
    } else {
        let org_x = map_bbox.left - MAXRADIUS;
        let org_y = map_bbox.bottom - MAXRADIUS;
        let w = (((map_bbox.right + MAXRADIUS) - org_x).0 >> MAPBLOCKSHIFT) + 1;
        let h = (((map_bbox.top + MAXRADIUS) - org_y).0 >> MAPBLOCKSHIFT) + 1;
        (org_x, org_y, w, h)
    };
    let mut bm = Blockmap::new(org_x, org_y, width, height);
    for (li, line) in lines.iter().enumerate() {
        // index the line into every cell its bounding box touches
        let xl = bm.block_x(line.bbox.left).max(0);
        let xh = bm.block_x(line.bbox.right).min(bm.width - 1);
        let yl = bm.block_y(line.bbox.bottom).max(0);
        let yh = bm.block_y(line.bbox.top).min(bm.height - 1);
        for by in yl..=yh {
            for bx in xl..=xh {
                if let Some(cell) = bm.index(bx, by) {
                    bm.line_cells[cell].push(li as u16);
                }
            }
        }
    }
    bm
}

impl Level {
    /// Sector containing a map point. Picks the smallest sector whose
    /// bounds contain the point so inner sectors win over the rooms around
    /// them; falls back to sector 0 for points outside everything.
    pub fn point_in_sector(&self, x: Fixed, y: Fixed) -> usize {
        let mut best: Option<(usize, i64)> = None;
        for (si, sec) in self.sectors.iter().enumerate() {
            if !sec.bbox.contains(x, y) {
                continue;
            }
            let area = ((sec.bbox.right - sec.bbox.left).0 as i64)
                * ((sec.bbox.top - sec.bbox.bottom).0 as i64);
            if best.map_or(true, |(_, a)| area < a) {
                best = Some((si, area));
            }
        }
        best.map(|(si, _)| si).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::p_local::MobjFlags;
    use reboom_common::tables::ANG0;

    #[test]
    fn single_sector_geometry() {
        let level = MapData::single_sector(-256, -256, 256, 256, ZERO, map_units(128)).build();
        assert_eq!(level.sectors.len(), 1);
        assert_eq!(level.lines.len(), 4);
        assert!(level.lines.iter().all(|l| l.back_sector.is_none()));
        assert_eq!(level.point_in_sector(ZERO, ZERO), 0);
    }

    #[test]
    fn inner_sector_wins_point_lookup() {
        let mut map = MapData::single_sector(-512, -512, 512, 512, ZERO, map_units(256));
        let inner = map.add_sector(map_units(32), map_units(256));
        // a raised platform in the middle, joined by two-sided lines
        let a = Vertex { x: map_units(-64), y: map_units(-64) };
        let b = Vertex { x: map_units(64), y: map_units(-64) };
        let c = Vertex { x: map_units(64), y: map_units(64) };
        let d = Vertex { x: map_units(-64), y: map_units(64) };
        map.add_line(a, b, LineFlags::empty(), inner, Some(0));
        map.add_line(b, c, LineFlags::empty(), inner, Some(0));
        map.add_line(c, d, LineFlags::empty(), inner, Some(0));
        map.add_line(d, a, LineFlags::empty(), inner, Some(0));
        let level = map.build();
        assert_eq!(level.point_in_sector(ZERO, ZERO), inner);
        assert_eq!(level.point_in_sector(map_units(300), ZERO), 0);
    }

    #[test]
    fn map_things_spawn_and_count() {
        let mut map = MapData::single_sector(-512, -512, 512, 512, ZERO, map_units(256));
        map.add_thing(ZERO, ZERO, ANG0, MobjType::Player, ThingOptions::all());
        map.add_thing(map_units(128), ZERO, ANG0, MobjType::Trooper, ThingOptions::all());
        map.add_thing(map_units(-128), ZERO, ANG0, MobjType::Clip, ThingOptions::all());
        let level = map.build();
        assert!(level.player.is_some());
        assert_eq!(level.mobjs.len(), 3);
        assert_eq!(level.total_kills, 1);
        assert_eq!(level.total_items, 1);
    }

    #[test]
    fn skill_filter_drops_hard_only_things() {
        let mut map = MapData::single_sector(-512, -512, 512, 512, ZERO, map_units(256));
        map.add_thing(ZERO, ZERO, ANG0, MobjType::Trooper, ThingOptions::HARD);
        let level = map.build_with(
            SimConfig::default(),
            Skill::Easy,
            &crate::info::STATES,
            &crate::info::MOBJINFO,
        );
        assert_eq!(level.mobjs.len(), 0);
        assert_eq!(level.total_kills, 0);
    }

    #[test]
    fn ambush_option_sets_flag() {
        let mut map = MapData::single_sector(-512, -512, 512, 512, ZERO, map_units(256));
        map.add_thing(
            ZERO,
            ZERO,
            ANG0,
            MobjType::Trooper,
            ThingOptions::all(),
        );
        let level = map.build();
        let (_, m) = level.mobjs.iter().next().unwrap();
        assert!(m.flags.contains(MobjFlags::AMBUSH));
    }
}
