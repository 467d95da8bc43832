//! Scene data structures: models, textures and instances.
//!
//! This module contains the core data types for scene representation:
//!
//! - `model` contains mesh and material definitions, GPU resources for 3D models
//! - `texture` contains GPU texture wrapper and creation utilities
//! - `instance` holds per-instance transformation and shadow flags
//! - `block` is the instanced tower of blocks
//! - `floor` is the plane the tower stands on

pub mod block;
pub mod floor;
pub mod instance;
pub mod model;
pub mod texture;
