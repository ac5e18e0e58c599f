// info.rs -- static per-type attributes and the animation state tables

use reboom_common::fixed::{Fixed, ZERO};

use crate::dispatch::ActionId;
use crate::p_local::{map_units, MobjFlags};

/// Index into a state table.
pub type StateNum = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteNum {
    Play,
    Poss,
    Sarg,
    Skul,
    Bal1,
    Puff,
    Blud,
    Clip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sfx {
    PosSit,
    PosPain,
    PosDeath,
    PosAct,
    SargSit,
    SargAttack,
    SargDeath,
    SkullAttack,
    FireShot,
    FireExplode,
    Pistol,
    PlayerPain,
    PlayerDeath,
    Oof,
    ItemUp,
    ItemRespawn,
}

/// One cell of the animation table. A thing in this state shows
/// `sprite`/`frame`, runs `action` on entry, and after `tics` tics moves to
/// `next`. `tics` of -1 holds forever; 0 chains immediately. `misc1`/`misc2`
/// parameterize the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    pub sprite: SpriteNum,
    pub frame: i32,
    pub tics: i32,
    pub action: Option<ActionId>,
    pub next: StateNum,
    pub misc1: i32,
    pub misc2: i32,
}

const fn st(sprite: SpriteNum, frame: i32, tics: i32, action: Option<ActionId>, next: StateNum) -> State {
    State { sprite, frame, tics, action, next, misc1: 0, misc2: 0 }
}

const fn st_args(
    sprite: SpriteNum,
    frame: i32,
    tics: i32,
    action: Option<ActionId>,
    next: StateNum,
    misc1: i32,
    misc2: i32,
) -> State {
    State { sprite, frame, tics, action, next, misc1, misc2 }
}

// Entering S_NULL removes the thing.
pub const S_NULL: StateNum = 0;

pub const S_PLAY: StateNum = 1;
pub const S_PLAY_PAIN: StateNum = 2;
pub const S_PLAY_DIE1: StateNum = 3;
pub const S_PLAY_DIE2: StateNum = 4;
pub const S_PLAY_DEAD: StateNum = 5;

pub const S_POSS_STND: StateNum = 6;
pub const S_POSS_RUN1: StateNum = 7;
pub const S_POSS_RUN2: StateNum = 8;
pub const S_POSS_RUN3: StateNum = 9;
pub const S_POSS_RUN4: StateNum = 10;
pub const S_POSS_ATK1: StateNum = 11;
pub const S_POSS_ATK2: StateNum = 12;
pub const S_POSS_PAIN1: StateNum = 13;
pub const S_POSS_PAIN2: StateNum = 14;
pub const S_POSS_DIE1: StateNum = 15;
pub const S_POSS_DIE2: StateNum = 16;
pub const S_POSS_DIE3: StateNum = 17;
pub const S_POSS_DEAD: StateNum = 18;

pub const S_SARG_STND: StateNum = 19;
pub const S_SARG_RUN1: StateNum = 20;
pub const S_SARG_RUN2: StateNum = 21;
pub const S_SARG_RUN3: StateNum = 22;
pub const S_SARG_RUN4: StateNum = 23;
pub const S_SARG_ATK1: StateNum = 24;
pub const S_SARG_ATK2: StateNum = 25;
pub const S_SARG_REFIRE: StateNum = 26;
pub const S_SARG_PAIN1: StateNum = 27;
pub const S_SARG_PAIN2: StateNum = 28;
pub const S_SARG_DIE1: StateNum = 29;
pub const S_SARG_DIE2: StateNum = 30;
pub const S_SARG_DEAD: StateNum = 31;

pub const S_SKUL_STND: StateNum = 32;
pub const S_SKUL_RUN1: StateNum = 33;
pub const S_SKUL_RUN2: StateNum = 34;
pub const S_SKUL_ATK1: StateNum = 35;
pub const S_SKUL_ATK2: StateNum = 36;
pub const S_SKUL_FLY1: StateNum = 37;
pub const S_SKUL_FLY2: StateNum = 38;
pub const S_SKUL_PAIN: StateNum = 39;
pub const S_SKUL_DIE1: StateNum = 40;
pub const S_SKUL_DIE2: StateNum = 41;
pub const S_SKUL_DIE3: StateNum = 42;
pub const S_SKUL_GONE: StateNum = 43;

pub const S_TBALL1: StateNum = 44;
pub const S_TBALL2: StateNum = 45;
pub const S_TBALLX1: StateNum = 46;
pub const S_TBALLX2: StateNum = 47;
pub const S_TBALLX3: StateNum = 48;
pub const S_TBALL_GONE: StateNum = 49;

pub const S_PUFF1: StateNum = 50;
pub const S_PUFF2: StateNum = 51;
pub const S_PUFF3: StateNum = 52;
pub const S_PUFF4: StateNum = 53;
pub const S_PUFF_GONE: StateNum = 54;

pub const S_BLOOD1: StateNum = 55;
pub const S_BLOOD2: StateNum = 56;
pub const S_BLOOD3: StateNum = 57;
pub const S_BLOOD_GONE: StateNum = 58;

pub const S_CLIP: StateNum = 59;

pub static STATES: [State; 60] = [
    // S_NULL
    st(SpriteNum::Play, 0, -1, None, S_NULL),
    // player
    st(SpriteNum::Play, 0, -1, None, S_PLAY),
    st(SpriteNum::Play, 6, 4, None, S_PLAY),
    st(SpriteNum::Play, 7, 10, Some(ActionId::Scream), S_PLAY_DIE2),
    st(SpriteNum::Play, 8, 10, Some(ActionId::Fall), S_PLAY_DEAD),
    st(SpriteNum::Play, 13, -1, None, S_PLAY_DEAD),
    // trooper
    st(SpriteNum::Poss, 0, 10, Some(ActionId::Look), S_POSS_STND),
    st(SpriteNum::Poss, 0, 4, Some(ActionId::Chase), S_POSS_RUN2),
    st(SpriteNum::Poss, 1, 4, Some(ActionId::Chase), S_POSS_RUN3),
    st(SpriteNum::Poss, 2, 4, Some(ActionId::Chase), S_POSS_RUN4),
    st(SpriteNum::Poss, 3, 4, Some(ActionId::Chase), S_POSS_RUN1),
    st(SpriteNum::Poss, 4, 8, Some(ActionId::FaceTarget), S_POSS_ATK2),
    st_args(SpriteNum::Poss, 5, 8, Some(ActionId::MonsterBulletAttack), S_POSS_RUN1, 1, 3),
    st(SpriteNum::Poss, 6, 3, None, S_POSS_PAIN2),
    st(SpriteNum::Poss, 6, 3, Some(ActionId::Pain), S_POSS_RUN1),
    st(SpriteNum::Poss, 7, 5, Some(ActionId::Scream), S_POSS_DIE2),
    st(SpriteNum::Poss, 8, 5, Some(ActionId::Fall), S_POSS_DIE3),
    st(SpriteNum::Poss, 9, 5, None, S_POSS_DEAD),
    st(SpriteNum::Poss, 10, -1, None, S_POSS_DEAD),
    // sergeant
    st(SpriteNum::Sarg, 0, 10, Some(ActionId::Look), S_SARG_STND),
    st(SpriteNum::Sarg, 0, 2, Some(ActionId::Chase), S_SARG_RUN2),
    st(SpriteNum::Sarg, 1, 2, Some(ActionId::Chase), S_SARG_RUN3),
    st(SpriteNum::Sarg, 2, 2, Some(ActionId::Chase), S_SARG_RUN4),
    st(SpriteNum::Sarg, 3, 2, Some(ActionId::Chase), S_SARG_RUN1),
    st(SpriteNum::Sarg, 4, 8, Some(ActionId::FaceTarget), S_SARG_ATK2),
    st_args(SpriteNum::Sarg, 5, 8, Some(ActionId::MonsterMeleeAttack), S_SARG_REFIRE, 4, 10),
    st_args(SpriteNum::Sarg, 4, 0, Some(ActionId::JumpIfTargetCloser), S_SARG_RUN1, S_SARG_ATK1 as i32, 96),
    st(SpriteNum::Sarg, 6, 2, None, S_SARG_PAIN2),
    st(SpriteNum::Sarg, 6, 2, Some(ActionId::Pain), S_SARG_RUN1),
    st(SpriteNum::Sarg, 7, 8, Some(ActionId::Scream), S_SARG_DIE2),
    st(SpriteNum::Sarg, 8, 8, Some(ActionId::Fall), S_SARG_DEAD),
    st(SpriteNum::Sarg, 9, -1, None, S_SARG_DEAD),
    // lost soul
    st(SpriteNum::Skul, 0, 10, Some(ActionId::Look), S_SKUL_STND),
    st(SpriteNum::Skul, 0, 3, Some(ActionId::Chase), S_SKUL_RUN2),
    st(SpriteNum::Skul, 1, 3, Some(ActionId::Chase), S_SKUL_RUN1),
    st(SpriteNum::Skul, 2, 10, Some(ActionId::FaceTarget), S_SKUL_ATK2),
    st(SpriteNum::Skul, 2, 4, Some(ActionId::SkullAttack), S_SKUL_FLY1),
    st(SpriteNum::Skul, 3, 4, None, S_SKUL_FLY2),
    st(SpriteNum::Skul, 4, 4, None, S_SKUL_FLY1),
    st(SpriteNum::Skul, 5, 3, Some(ActionId::Pain), S_SKUL_RUN1),
    st(SpriteNum::Skul, 6, 6, Some(ActionId::Scream), S_SKUL_DIE2),
    st(SpriteNum::Skul, 7, 6, Some(ActionId::Fall), S_SKUL_DIE3),
    st(SpriteNum::Skul, 8, 6, None, S_SKUL_GONE),
    st(SpriteNum::Skul, 8, -1, Some(ActionId::Remove), S_SKUL_GONE),
    // trooper shot
    st(SpriteNum::Bal1, 0, 4, None, S_TBALL2),
    st(SpriteNum::Bal1, 1, 4, None, S_TBALL1),
    st(SpriteNum::Bal1, 2, 6, None, S_TBALLX2),
    st(SpriteNum::Bal1, 3, 6, None, S_TBALLX3),
    st(SpriteNum::Bal1, 4, 6, None, S_TBALL_GONE),
    st(SpriteNum::Bal1, 4, -1, Some(ActionId::Remove), S_TBALL_GONE),
    // puff
    st(SpriteNum::Puff, 0, 4, None, S_PUFF2),
    st(SpriteNum::Puff, 1, 4, None, S_PUFF3),
    st(SpriteNum::Puff, 2, 4, None, S_PUFF4),
    st(SpriteNum::Puff, 3, 4, None, S_PUFF_GONE),
    st(SpriteNum::Puff, 3, -1, Some(ActionId::Remove), S_PUFF_GONE),
    // blood
    st(SpriteNum::Blud, 2, 8, None, S_BLOOD2),
    st(SpriteNum::Blud, 1, 8, None, S_BLOOD3),
    st(SpriteNum::Blud, 0, 8, None, S_BLOOD_GONE),
    st(SpriteNum::Blud, 0, -1, Some(ActionId::Remove), S_BLOOD_GONE),
    // clip
    st(SpriteNum::Clip, 0, -1, None, S_CLIP),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MobjType {
    Player = 0,
    Trooper,
    Sergeant,
    LostSoul,
    TrooperShot,
    Puff,
    Blood,
    Clip,
}

impl MobjType {
    pub const fn from_index(i: usize) -> Option<MobjType> {
        match i {
            0 => Some(MobjType::Player),
            1 => Some(MobjType::Trooper),
            2 => Some(MobjType::Sergeant),
            3 => Some(MobjType::LostSoul),
            4 => Some(MobjType::TrooperShot),
            5 => Some(MobjType::Puff),
            6 => Some(MobjType::Blood),
            7 => Some(MobjType::Clip),
            _ => None,
        }
    }
}

/// Static attributes shared by every thing of one type.
#[derive(Debug, Clone, Copy)]
pub struct MobjInfo {
    pub name: &'static str,
    pub spawnhealth: i32,
    pub spawnstate: StateNum,
    pub seestate: StateNum,
    pub painstate: StateNum,
    /// Chance in 0..=255 of flinching when damaged; 256 always flinches.
    pub painchance: i32,
    pub meleestate: StateNum,
    pub missilestate: StateNum,
    pub deathstate: StateNum,
    pub xdeathstate: StateNum,
    /// Walkers: map units per step (integer part). Missiles: units per tic.
    pub speed: Fixed,
    pub radius: Fixed,
    pub height: Fixed,
    pub mass: i32,
    /// Missile contact damage multiplier.
    pub damage: i32,
    pub flags: MobjFlags,
    pub reactiontime: i16,
    pub seesound: Option<Sfx>,
    pub attacksound: Option<Sfx>,
    pub painsound: Option<Sfx>,
    pub deathsound: Option<Sfx>,
    pub activesound: Option<Sfx>,
    /// Same-species missiles pass through each other's kin.
    pub species: MobjType,
    pub dropped_item: Option<MobjType>,
}

pub static MOBJINFO: [MobjInfo; 8] = [
    MobjInfo {
        name: "player",
        spawnhealth: 100,
        spawnstate: S_PLAY,
        seestate: S_NULL,
        painstate: S_PLAY_PAIN,
        painchance: 255,
        meleestate: S_NULL,
        missilestate: S_NULL,
        deathstate: S_PLAY_DIE1,
        xdeathstate: S_NULL,
        speed: ZERO,
        radius: map_units(16),
        height: map_units(56),
        mass: 100,
        damage: 0,
        flags: MobjFlags::SOLID
            .union(MobjFlags::SHOOTABLE)
            .union(MobjFlags::DROPOFF)
            .union(MobjFlags::PICKUP)
            .union(MobjFlags::SLIDE),
        reactiontime: 0,
        seesound: None,
        attacksound: Some(Sfx::Pistol),
        painsound: Some(Sfx::PlayerPain),
        deathsound: Some(Sfx::PlayerDeath),
        activesound: None,
        species: MobjType::Player,
        dropped_item: None,
    },
    MobjInfo {
        name: "trooper",
        spawnhealth: 20,
        spawnstate: S_POSS_STND,
        seestate: S_POSS_RUN1,
        painstate: S_POSS_PAIN1,
        painchance: 200,
        meleestate: S_NULL,
        missilestate: S_POSS_ATK1,
        deathstate: S_POSS_DIE1,
        xdeathstate: S_NULL,
        speed: Fixed::from_int(8),
        radius: map_units(20),
        height: map_units(56),
        mass: 100,
        damage: 0,
        flags: MobjFlags::SOLID
            .union(MobjFlags::SHOOTABLE)
            .union(MobjFlags::COUNTKILL),
        reactiontime: 8,
        seesound: Some(Sfx::PosSit),
        attacksound: Some(Sfx::Pistol),
        painsound: Some(Sfx::PosPain),
        deathsound: Some(Sfx::PosDeath),
        activesound: Some(Sfx::PosAct),
        species: MobjType::Trooper,
        dropped_item: Some(MobjType::Clip),
    },
    MobjInfo {
        name: "sergeant",
        spawnhealth: 150,
        spawnstate: S_SARG_STND,
        seestate: S_SARG_RUN1,
        painstate: S_SARG_PAIN1,
        painchance: 180,
        meleestate: S_SARG_ATK1,
        missilestate: S_NULL,
        deathstate: S_SARG_DIE1,
        xdeathstate: S_NULL,
        speed: Fixed::from_int(10),
        radius: map_units(30),
        height: map_units(56),
        mass: 400,
        damage: 0,
        flags: MobjFlags::SOLID
            .union(MobjFlags::SHOOTABLE)
            .union(MobjFlags::COUNTKILL),
        reactiontime: 8,
        seesound: Some(Sfx::SargSit),
        attacksound: Some(Sfx::SargAttack),
        painsound: Some(Sfx::PosPain),
        deathsound: Some(Sfx::SargDeath),
        activesound: Some(Sfx::PosAct),
        species: MobjType::Sergeant,
        dropped_item: None,
    },
    MobjInfo {
        name: "lost soul",
        spawnhealth: 100,
        spawnstate: S_SKUL_STND,
        seestate: S_SKUL_RUN1,
        painstate: S_SKUL_PAIN,
        painchance: 256,
        meleestate: S_NULL,
        missilestate: S_SKUL_ATK1,
        deathstate: S_SKUL_DIE1,
        xdeathstate: S_NULL,
        speed: Fixed::from_int(8),
        radius: map_units(16),
        height: map_units(56),
        mass: 50,
        damage: 3,
        flags: MobjFlags::SOLID
            .union(MobjFlags::SHOOTABLE)
            .union(MobjFlags::FLOAT)
            .union(MobjFlags::NOGRAVITY),
        reactiontime: 8,
        seesound: None,
        attacksound: Some(Sfx::SkullAttack),
        painsound: Some(Sfx::PosPain),
        deathsound: Some(Sfx::FireExplode),
        activesound: None,
        species: MobjType::LostSoul,
        dropped_item: None,
    },
    MobjInfo {
        name: "trooper shot",
        spawnhealth: 1000,
        spawnstate: S_TBALL1,
        seestate: S_NULL,
        painstate: S_NULL,
        painchance: 0,
        meleestate: S_NULL,
        missilestate: S_NULL,
        deathstate: S_TBALLX1,
        xdeathstate: S_NULL,
        speed: map_units(10),
        radius: map_units(6),
        height: map_units(8),
        mass: 100,
        damage: 3,
        flags: MobjFlags::MISSILE
            .union(MobjFlags::DROPOFF)
            .union(MobjFlags::NOGRAVITY),
        reactiontime: 8,
        seesound: Some(Sfx::FireShot),
        attacksound: None,
        painsound: None,
        deathsound: Some(Sfx::FireExplode),
        activesound: None,
        species: MobjType::TrooperShot,
        dropped_item: None,
    },
    MobjInfo {
        name: "puff",
        spawnhealth: 1000,
        spawnstate: S_PUFF1,
        seestate: S_NULL,
        painstate: S_NULL,
        painchance: 0,
        meleestate: S_NULL,
        missilestate: S_NULL,
        deathstate: S_NULL,
        xdeathstate: S_NULL,
        speed: ZERO,
        radius: map_units(20),
        height: map_units(16),
        mass: 100,
        damage: 0,
        flags: MobjFlags::NOBLOCKMAP.union(MobjFlags::NOGRAVITY),
        reactiontime: 8,
        seesound: None,
        attacksound: None,
        painsound: None,
        deathsound: None,
        activesound: None,
        species: MobjType::Puff,
        dropped_item: None,
    },
    MobjInfo {
        name: "blood",
        spawnhealth: 1000,
        spawnstate: S_BLOOD1,
        seestate: S_NULL,
        painstate: S_NULL,
        painchance: 0,
        meleestate: S_NULL,
        missilestate: S_NULL,
        deathstate: S_NULL,
        xdeathstate: S_NULL,
        speed: ZERO,
        radius: map_units(20),
        height: map_units(16),
        mass: 100,
        damage: 0,
        flags: MobjFlags::NOBLOCKMAP,
        reactiontime: 8,
        seesound: None,
        attacksound: None,
        painsound: None,
        deathsound: None,
        activesound: None,
        species: MobjType::Blood,
        dropped_item: None,
    },
    MobjInfo {
        name: "clip",
        spawnhealth: 1000,
        spawnstate: S_CLIP,
        seestate: S_NULL,
        painstate: S_NULL,
        painchance: 0,
        meleestate: S_NULL,
        missilestate: S_NULL,
        deathstate: S_NULL,
        xdeathstate: S_NULL,
        speed: ZERO,
        radius: map_units(20),
        height: map_units(16),
        mass: 100,
        damage: 0,
        flags: MobjFlags::SPECIAL.union(MobjFlags::COUNTITEM),
        reactiontime: 8,
        seesound: None,
        attacksound: None,
        painsound: None,
        deathsound: None,
        activesound: None,
        species: MobjType::Clip,
        dropped_item: None,
    },
];
