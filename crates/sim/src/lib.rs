//! Growable block-structure water containment simulation.
//!
//! Blocks are placed on a 2D grid one at a time and never removed. As walls
//! close up, enclosed empty regions ("containers") form, each tracking its
//! capacity, its fluid content, and the boundary points where fluid would
//! still leak out. Placing a block can:
//! - seal a leak of the container below it,
//! - make new cells containable and create/extend/merge containers, or
//! - land inside an existing container and split it apart.
//!
//! This crate is framework-agnostic - it handles the containment model only.
//! Rendering, tile updates, and game logic live with the caller.

pub mod container;
pub mod row;
pub mod structure;

pub use container::{Container, ContainerId, IdAlloc, Slice};
pub use row::Row;
pub use structure::Structure;
