//! Common interface over the supported mesh types

// crate modules
use crate::error::Result;
use crate::hex::StructuredHexMesh;
use crate::tet::TetMesh;
use crate::ElementId;

// external crates
use serde::{Deserialize, Serialize};

/// Any mesh that track-length estimators can score on
///
/// Dispatches to the structured hexahedral or tetrahedral implementations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mesh {
    /// Rectilinear mesh of hexahedra
    Hex(StructuredHexMesh),
    /// Unstructured mesh of linear tetrahedra
    Tet(TetMesh),
}

impl Mesh {
    /// Short name of the element type
    pub fn element_name(&self) -> &'static str {
        match self {
            Mesh::Hex(_) => "hexahedral",
            Mesh::Tet(_) => "tetrahedral",
        }
    }

    /// Total number of elements
    pub fn number_of_elements(&self) -> usize {
        match self {
            Mesh::Hex(mesh) => mesh.number_of_elements(),
            Mesh::Tet(mesh) => mesh.number_of_elements(),
        }
    }

    /// Every element id in order
    pub fn element_ids(&self) -> Vec<ElementId> {
        (0..self.number_of_elements() as ElementId).collect()
    }

    /// Volume of a single element
    pub fn volume(&self, id: ElementId) -> Result<f64> {
        match self {
            Mesh::Hex(mesh) => mesh.volume(id),
            Mesh::Tet(mesh) => mesh.volume(id),
        }
    }

    /// Find the element containing a point
    pub fn element_containing(&self, point: [f64; 3]) -> Option<ElementId> {
        match self {
            Mesh::Hex(mesh) => mesh.element_containing(point),
            Mesh::Tet(mesh) => mesh.element_containing(point),
        }
    }

    /// Lengths of a segment inside each element it crosses, one entry per element
    pub fn track_lengths(&self, start: [f64; 3], end: [f64; 3]) -> Vec<(ElementId, f64)> {
        match self {
            Mesh::Hex(mesh) => mesh.track_lengths(start, end),
            Mesh::Tet(mesh) => mesh.track_lengths(start, end),
        }
    }
}

impl From<StructuredHexMesh> for Mesh {
    fn from(mesh: StructuredHexMesh) -> Self {
        Mesh::Hex(mesh)
    }
}

impl From<TetMesh> for Mesh {
    fn from(mesh: TetMesh) -> Self {
        Mesh::Tet(mesh)
    }
}
