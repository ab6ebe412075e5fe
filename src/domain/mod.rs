pub mod agent;
pub mod ai;
pub mod avatar;
pub mod entity;
pub mod hole;
pub mod path;
pub mod physics;
pub mod terrain;
pub mod tile;

#[cfg(test)]
pub(crate) mod testutil;
