//! Conversion of per-element mesh results to VTK formats for plotting
//!
//! Structured hexahedral meshes are written as rectilinear grids and
//! tetrahedral meshes as unstructured grids of `Tetra` cells. Results are
//! attached as cell data, one array per [CellData] entry.
//!
//! ```rust, no_run
//! # use ntally_geometry::{Mesh, StructuredHexMesh};
//! # use ntally_geometry::vtk::{write_vtk, CellData, MeshToVtk, VtkFormat};
//! let mesh = Mesh::Hex(
//!     StructuredHexMesh::new(vec![0.0, 1.0], vec![0.0, 1.0], vec![0.0, 1.0, 2.0]).unwrap(),
//! );
//!
//! let data = vec![CellData::new("flux", vec![1.0, 2.0]).with_errors(vec![0.1, 0.2])];
//! let vtk = MeshToVtk::builder().include_errors(true).build().convert(&mesh, &data);
//!
//! write_vtk(vtk, "./flux.vtr", VtkFormat::Xml).unwrap();
//! ```

// Split into subfiles for development, but anything important is re-exported
mod builder;
mod convert;

// standard library
use std::path::Path;

// crate modules
use crate::error::Result;

// external crates
use log::debug;
use vtkio::model::Vtk;

#[doc(inline)]
pub use builder::MeshToVtkBuilder;

#[doc(inline)]
pub use convert::{CellData, MeshToVtk};

#[doc(inline)]
pub use vtkio::model::ByteOrder;

/// Supported VTK output formats
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum VtkFormat {
    /// Modern XML format, `.vtr` for hex meshes and `.vtu` for tet meshes
    #[default]
    Xml,
    /// Legacy `.vtk` ASCII text format
    LegacyAscii,
    /// Legacy `.vtk` binary format using the byte order of the [Vtk]
    LegacyBinary,
}

/// Write a [Vtk] to a file in any of the supported formats
///
/// For the XML format the file extension decides the dataset flavour, so it
/// should be `.vtr` for rectilinear grids and `.vtu` for unstructured grids.
/// Legacy formats should use `.vtk`.
pub fn write_vtk<P: AsRef<Path>>(vtk: Vtk, path: P, format: VtkFormat) -> Result<()> {
    let path = path.as_ref();
    debug!("Writing {format:?} vtk to {}", path.display());

    match format {
        VtkFormat::LegacyAscii => vtk.export_ascii(path)?,
        VtkFormat::Xml | VtkFormat::LegacyBinary => vtk.export(path)?,
    }

    Ok(())
}
