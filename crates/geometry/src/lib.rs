//! Mesh geometry for track-length scoring
#![doc = include_str!("../readme.md")]

// Split into subfiles for development, but anything important is re-exported
mod error;
mod hex;
mod intersect;
mod mesh;
mod tet;

pub mod vtk;

/// Identifier of a single mesh element
pub type ElementId = u64;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use hex::StructuredHexMesh;

#[doc(inline)]
pub use tet::{tet_volume, TetMesh};

#[doc(inline)]
pub use mesh::Mesh;

#[doc(inline)]
pub use intersect::{
    segment_box_intersection, segment_tet_intersection, segment_tet_interval, GEOMETRIC_TOLERANCE,
};
