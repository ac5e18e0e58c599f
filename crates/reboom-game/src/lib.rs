// reboom-game -- map object simulation: thinkers, movement, combat AI

pub mod dispatch;
pub mod info;
pub mod m_random;
pub mod p_enemy;
pub mod p_inter;
pub mod p_local;
pub mod p_map;
pub mod p_maputl;
pub mod p_mobj;
pub mod p_saveg;
pub mod p_setup;
pub mod p_sight;
pub mod p_tick;
pub mod p_user;
