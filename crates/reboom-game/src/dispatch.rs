// dispatch.rs -- action routine registry
//
// States name their entry behavior by id rather than by function pointer,
// which keeps the state table plain data and lets snapshots store actions
// as small integers.

use crate::p_enemy;
use crate::p_local::{Level, MobjHandle};
use crate::p_mobj;

/// Every action routine a state can run on entry. The JumpIf* family reads
/// `misc1` as the destination state and jumps when its condition holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionId {
    Look,
    Chase,
    FaceTarget,
    Pain,
    Scream,
    Fall,
    SkullAttack,
    Explode,
    Remove,
    SpawnObject,
    MonsterProjectile,
    MonsterBulletAttack,
    MonsterMeleeAttack,
    RadiusDamage,
    NoiseAlert,
    HealChase,
    SeekTracer,
    FindTracer,
    ClearTracer,
    JumpIfHealthBelow,
    JumpIfTargetInSight,
    JumpIfTargetCloser,
    JumpIfTracerInSight,
    JumpIfTracerCloser,
    JumpIfFlagsSet,
    AddFlags,
    RemoveFlags,
}

/// Runs one action for the thing that just entered a state. The thing may
/// remove itself; callers re-check the handle afterward.
pub fn run_action(level: &mut Level, h: MobjHandle, action: ActionId) {
    match action {
        ActionId::Look => p_enemy::a_look(level, h),
        ActionId::Chase => p_enemy::a_chase(level, h),
        ActionId::FaceTarget => p_enemy::a_face_target(level, h),
        ActionId::Pain => p_enemy::a_pain(level, h),
        ActionId::Scream => p_enemy::a_scream(level, h),
        ActionId::Fall => p_enemy::a_fall(level, h),
        ActionId::SkullAttack => p_enemy::a_skull_attack(level, h),
        ActionId::Explode => p_enemy::a_explode(level, h),
        ActionId::Remove => p_mobj::remove_mobj(level, h),
        ActionId::SpawnObject => p_enemy::a_spawn_object(level, h),
        ActionId::MonsterProjectile => p_enemy::a_monster_projectile(level, h),
        ActionId::MonsterBulletAttack => p_enemy::a_monster_bullet_attack(level, h),
        ActionId::MonsterMeleeAttack => p_enemy::a_monster_melee_attack(level, h),
        ActionId::RadiusDamage => p_enemy::a_radius_damage(level, h),
        ActionId::NoiseAlert => p_enemy::a_noise_alert(level, h),
        ActionId::HealChase => p_enemy::a_heal_chase(level, h),
        ActionId::SeekTracer => p_enemy::a_seek_tracer(level, h),
        ActionId::FindTracer => p_enemy::a_find_tracer(level, h),
        ActionId::ClearTracer => p_enemy::a_clear_tracer(level, h),
        ActionId::JumpIfHealthBelow => p_enemy::a_jump_if_health_below(level, h),
        ActionId::JumpIfTargetInSight => p_enemy::a_jump_if_target_in_sight(level, h),
        ActionId::JumpIfTargetCloser => p_enemy::a_jump_if_target_closer(level, h),
        ActionId::JumpIfTracerInSight => p_enemy::a_jump_if_tracer_in_sight(level, h),
        ActionId::JumpIfTracerCloser => p_enemy::a_jump_if_tracer_closer(level, h),
        ActionId::JumpIfFlagsSet => p_enemy::a_jump_if_flags_set(level, h),
        ActionId::AddFlags => p_enemy::a_add_flags(level, h),
        ActionId::RemoveFlags => p_enemy::a_remove_flags(level, h),
    }
}
