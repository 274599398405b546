//! Result and Error types for ntally-geometry

/// Type alias for Result<T, geometry::Error>
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `ntally-geometry` crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed input/output stream")]
    IOError(#[from] std::io::Error),

    #[error("vtkio error")]
    VtkioError(#[from] vtkio::Error),

    #[error("invalid {axis} planes: {reason}")]
    InvalidPlanes { axis: char, reason: String },

    #[error("element {0} is degenerate (zero volume)")]
    DegenerateElement(u64),

    #[error("element {element} references vertex {vertex} but only {available} vertices exist")]
    VertexOutOfRange {
        element: u64,
        vertex: usize,
        available: usize,
    },

    #[error("element {0} is not part of the mesh")]
    ElementOutOfRange(u64),
}
