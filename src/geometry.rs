//! Loading the switch model from a scene-description file.
//!
//! The model is read once, flattened into a non-indexed triangle list of
//! `(position, normal)` records and never modified afterwards. The format is
//! picked from the file extension:
//!
//! | Format | Extensions | Notes                                               |
//! |--------|------------|-----------------------------------------------------|
//! | STL    | `.stl`     | Binary and ASCII; each face carries its own normal |
//! | USD    | `.usda`    | ASCII layers; every `def Mesh` prim is merged       |
//!
//! Loading is all-or-nothing: a file that cannot be read or parsed, or that
//! holds no triangles, is an error and no geometry is produced.

mod usda;

use crate::mesh::Vertex;
use glam::Vec3;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// File could not be read.
    #[error("cannot read '{path}': {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// File format could not be determined from extension.
    #[error("unknown geometry format: '{0}'")]
    UnknownFormat(String),
    /// The geometry data was invalid or corrupt.
    #[error("parse error: {0}")]
    Parse(String),
    /// The file parsed but contains no triangles.
    #[error("asset contains no triangles")]
    Empty,
    /// The vertex list does not describe whole triangles.
    #[error("vertex count {0} is not a multiple of 3")]
    PartialTriangle(usize),
}

/// Immutable switch geometry: a triangle list with per-vertex normals.
#[derive(Clone, Debug)]
pub struct SceneGeometry {
    vertices: Vec<Vertex>,
}

impl SceneGeometry {
    /// Loads geometry from a file, detecting format from extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GeometryError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        let io_error = |source| GeometryError::Io {
            path: path.to_path_buf(),
            source,
        };

        let geometry = match ext.as_str() {
            "stl" => Self::from_stl_bytes(&std::fs::read(path).map_err(io_error)?),
            "usda" => Self::from_usda_str(&std::fs::read_to_string(path).map_err(io_error)?),
            _ => Err(GeometryError::UnknownFormat(ext)),
        }?;

        tracing::info!(
            path = %path.display(),
            vertices = geometry.vertex_count(),
            "loaded switch geometry"
        );
        Ok(geometry)
    }

    /// Parses binary or ASCII STL data.
    pub fn from_stl_bytes(bytes: &[u8]) -> Result<Self, GeometryError> {
        let mut cursor = std::io::Cursor::new(bytes);
        let stl = stl_io::read_stl(&mut cursor)
            .map_err(|e| GeometryError::Parse(format!("STL parse error: {e}")))?;

        let mut vertices = Vec::with_capacity(stl.faces.len() * 3);
        for face in &stl.faces {
            let mut corners = [Vec3::ZERO; 3];
            for (corner, &vertex_idx) in corners.iter_mut().zip(&face.vertices) {
                let vertex = stl.vertices.get(vertex_idx).ok_or_else(|| {
                    GeometryError::Parse(format!("STL face references vertex {vertex_idx}"))
                })?;
                let position: [f32; 3] = (*vertex).into();
                *corner = Vec3::from(position);
            }

            // Some exporters leave the facet normal zeroed.
            let stored: [f32; 3] = face.normal.into();
            let normal = Vec3::from(stored)
                .try_normalize()
                .unwrap_or_else(|| face_normal(corners));

            for corner in corners {
                vertices.push(Vertex::new(corner.into(), normal.into()));
            }
        }

        Self::from_vertices(vertices)
    }

    /// Parses a USD ASCII layer.
    pub fn from_usda_str(source: &str) -> Result<Self, GeometryError> {
        Self::from_vertices(usda::parse(source)?)
    }

    /// Wraps an already flattened triangle list.
    pub fn from_vertices(vertices: Vec<Vertex>) -> Result<Self, GeometryError> {
        if vertices.is_empty() {
            return Err(GeometryError::Empty);
        }
        if vertices.len() % 3 != 0 {
            return Err(GeometryError::PartialTriangle(vertices.len()));
        }
        Ok(Self { vertices })
    }

    /// The triangle list.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Number of vertices, a multiple of 3.
    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    /// Computes the axis-aligned bounding box.
    ///
    /// Returns `(min, max)` corners of the bounding box.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for v in &self.vertices {
            let p = Vec3::from(v.position);
            min = min.min(p);
            max = max.max(p);
        }

        (min, max)
    }
}

/// Unit normal of a counter-clockwise triangle, or zero for a degenerate one.
pub(crate) fn face_normal([p0, p1, p2]: [Vec3; 3]) -> Vec3 {
    (p1 - p0).cross(p2 - p0).normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASCII_STL: &str = "solid plate
  facet normal 0 1 0
    outer loop
      vertex 0 0 0
      vertex 0 0 1
      vertex 1 0 0
    endloop
  endfacet
  facet normal 0 0 0
    outer loop
      vertex 1 0 0
      vertex 0 0 1
      vertex 1 0 1
    endloop
  endfacet
endsolid plate
";

    #[test]
    fn ascii_stl_flattens_faces() {
        let geometry = SceneGeometry::from_stl_bytes(ASCII_STL.as_bytes()).unwrap();
        assert_eq!(geometry.vertex_count(), 6);

        for v in geometry.vertices() {
            assert!((Vec3::from(v.normal) - Vec3::Y).length() < 1e-6);
        }
    }

    #[test]
    fn stl_bounds() {
        let geometry = SceneGeometry::from_stl_bytes(ASCII_STL.as_bytes()).unwrap();
        let (min, max) = geometry.bounds();
        assert_eq!(min, Vec3::ZERO);
        assert_eq!(max, Vec3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(SceneGeometry::from_stl_bytes(b"not a mesh").is_err());
    }

    #[test]
    fn empty_and_partial_lists_are_rejected() {
        assert!(matches!(
            SceneGeometry::from_vertices(Vec::new()),
            Err(GeometryError::Empty)
        ));

        let v = Vertex::new([0.0; 3], [0.0, 1.0, 0.0]);
        assert!(matches!(
            SceneGeometry::from_vertices(vec![v; 4]),
            Err(GeometryError::PartialTriangle(4))
        ));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(matches!(
            SceneGeometry::load("switch.obj"),
            Err(GeometryError::UnknownFormat(ext)) if ext == "obj"
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            SceneGeometry::load("does/not/exist/switch.stl"),
            Err(GeometryError::Io { .. })
        ));
    }

    #[test]
    fn bundled_asset_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/switch.stl");
        let geometry = SceneGeometry::load(path).unwrap();
        assert_eq!(geometry.vertex_count() % 3, 0);

        // Fits inside one grid cell so neighbours never overlap while turning.
        let (min, max) = geometry.bounds();
        let reach = min.abs().max(max.abs());
        assert!(reach.x.hypot(reach.z) < 52.5);
    }

    #[test]
    fn face_normal_follows_winding() {
        let ccw = [Vec3::ZERO, Vec3::Z, Vec3::X];
        assert_eq!(face_normal(ccw), Vec3::Y);
        assert_eq!(face_normal([Vec3::ZERO; 3]), Vec3::ZERO);
    }
}
