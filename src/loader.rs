//! Mesh loading with staged fallback.
//!
//! Loading tries a chain of [`MeshSource`] stages in order; a stage either
//! produces a mesh, declines the data (`Ok(None)`, try the next stage), or
//! fails the whole load. When every stage declines, the bytes are decoded
//! as the raw serialized format from [`crate::io`]. A stage failure is
//! never silently papered over by falling through to the raw decode.

use std::path::Path;

use thiserror::Error;

use crate::io;
use crate::nav_mesh::NavMesh;
use crate::status::Status;

/// Error produced while loading a mesh.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Reading the input failed
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The data was recognized but decoding it failed
    #[error("mesh decode failed: {0}")]
    Decode(#[from] Status),
}

/// A loading stage that may recognize a serialized mesh format.
pub trait MeshSource {
    /// Name of the stage, used in log output
    fn name(&self) -> &str;

    /// Attempts to load a mesh from the data.
    ///
    /// `Ok(None)` means the data is not in this source's format and the
    /// next stage should be tried; any error aborts the load.
    fn load(&self, data: &[u8]) -> std::result::Result<Option<NavMesh>, LoadError>;
}

/// Loads a mesh from bytes, trying `sources` in order and ending with the
/// raw serialized format.
pub fn load_mesh(
    data: &[u8],
    sources: &[&dyn MeshSource],
) -> std::result::Result<NavMesh, LoadError> {
    for source in sources {
        match source.load(data)? {
            Some(mesh) => {
                log::info!(
                    "loaded mesh via source '{}', {} tiles",
                    source.name(),
                    mesh.tile_count()
                );
                return Ok(mesh);
            }
            None => log::debug!("source '{}' declined the data", source.name()),
        }
    }

    let mesh = io::decode(data)?;
    log::info!("loaded mesh from raw data, {} tiles", mesh.tile_count());
    Ok(mesh)
}

/// Loads a mesh from a file through [`load_mesh`].
pub fn load_mesh_file(
    path: impl AsRef<Path>,
    sources: &[&dyn MeshSource],
) -> std::result::Result<NavMesh, LoadError> {
    let data = std::fs::read(path.as_ref())?;
    load_mesh(&data, sources)
}
