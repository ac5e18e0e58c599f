// reboom-common -- engine-independent leaf utilities shared by the
// simulation core and the presentation layers.

pub mod event;
pub mod fixed;
pub mod tables;
