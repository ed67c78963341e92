//! A reader for the subset of USD ASCII layers that carries mesh data.
//!
//! Only `def Mesh` prims are considered. From each one the `points`,
//! `faceVertexCounts`, `faceVertexIndices` and, when present, `normals` or
//! `primvars:normals` arrays are read; everything else (transforms, materials,
//! metadata) is skipped. Polygons are fan-triangulated.
//!
//! Normals follow their `interpolation` metadata (`faceVarying`, `vertex`,
//! `varying` or `uniform`). Without it they are per-point when there is one
//! per point, otherwise face-varying when there is one per face-vertex.
//! Normals that fit neither fall back to flat face normals.

use super::{GeometryError, face_normal};
use crate::mesh::Vertex;
use glam::Vec3;

/// Flattens every mesh prim of `source` into one triangle list.
pub(super) fn parse(source: &str) -> Result<Vec<Vertex>, GeometryError> {
    let mut vertices = Vec::new();
    let mut meshes = 0;

    for (start, _) in source.match_indices("def Mesh") {
        let block = prim_body(&source[start..])
            .ok_or_else(|| GeometryError::Parse("unterminated Mesh prim".into()))?;
        MeshPrim::read(block)?.triangulate(&mut vertices)?;
        meshes += 1;
    }

    tracing::debug!(meshes, vertices = vertices.len(), "parsed usda layer");
    Ok(vertices)
}

struct MeshPrim {
    points: Vec<Vec3>,
    counts: Vec<usize>,
    indices: Vec<usize>,
    normals: Option<(Vec<Vec3>, Option<String>)>,
    left_handed: bool,
}

impl MeshPrim {
    fn read(block: &str) -> Result<Self, GeometryError> {
        let require = |name: &str| {
            array_attribute(block, name)
                .map(|attribute| attribute.values)
                .ok_or_else(|| GeometryError::Parse(format!("Mesh prim without '{name}'")))
        };

        let normals = match array_attribute(block, "normals") {
            Some(attribute) => Some((
                parse_vec3s(attribute.values)?,
                attribute.interpolation().map(str::to_owned),
            )),
            None => None,
        };

        Ok(Self {
            points: parse_vec3s(require("points")?)?,
            counts: parse_indices(require("faceVertexCounts")?)?,
            indices: parse_indices(require("faceVertexIndices")?)?,
            normals,
            left_handed: block.contains("\"leftHanded\""),
        })
    }

    fn triangulate(&self, out: &mut Vec<Vertex>) -> Result<(), GeometryError> {
        let corner_count: usize = self.counts.iter().sum();
        if corner_count != self.indices.len() {
            return Err(GeometryError::Parse(format!(
                "faceVertexCounts covers {corner_count} corners but faceVertexIndices has {}",
                self.indices.len()
            )));
        }

        let normal_mode = match &self.normals {
            Some((n, interpolation)) => self.normal_mode(n, interpolation.as_deref()),
            None => NormalMode::Flat,
        };

        let mut face_start = 0;
        for (face, &count) in self.counts.iter().enumerate() {
            for k in 1..count.saturating_sub(1) {
                let mut corners = [face_start, face_start + k, face_start + k + 1];
                if self.left_handed {
                    corners.swap(1, 2);
                }

                let mut positions = [Vec3::ZERO; 3];
                for (position, &corner) in positions.iter_mut().zip(&corners) {
                    *position = self.point(self.indices[corner])?;
                }
                let flat = face_normal(positions);

                for (position, corner) in positions.into_iter().zip(corners) {
                    let normal = match normal_mode {
                        NormalMode::FaceVarying(n) => n[corner],
                        NormalMode::Vertex(n) => n[self.indices[corner]],
                        NormalMode::Uniform(n) => n[face],
                        NormalMode::Flat => flat,
                    };
                    out.push(Vertex::new(position.into(), normal.normalize_or_zero().into()));
                }
            }
            face_start += count;
        }
        Ok(())
    }

    fn normal_mode<'a>(&self, normals: &'a [Vec3], interpolation: Option<&str>) -> NormalMode<'a> {
        let face_varying = normals.len() == self.indices.len();
        let per_point = normals.len() == self.points.len();
        let per_face = normals.len() == self.counts.len();

        match interpolation {
            Some("faceVarying") if face_varying => NormalMode::FaceVarying(normals),
            Some("vertex" | "varying") if per_point => NormalMode::Vertex(normals),
            Some("uniform") if per_face => NormalMode::Uniform(normals),
            // Unannotated normals default to per-point.
            None if per_point => NormalMode::Vertex(normals),
            None if face_varying => NormalMode::FaceVarying(normals),
            _ => {
                tracing::warn!(
                    normals = normals.len(),
                    ?interpolation,
                    "normals do not match mesh topology, using face normals"
                );
                NormalMode::Flat
            }
        }
    }

    fn point(&self, index: usize) -> Result<Vec3, GeometryError> {
        self.points.get(index).copied().ok_or_else(|| {
            GeometryError::Parse(format!(
                "face index {index} out of range for {} points",
                self.points.len()
            ))
        })
    }
}

enum NormalMode<'a> {
    FaceVarying(&'a [Vec3]),
    Vertex(&'a [Vec3]),
    Uniform(&'a [Vec3]),
    Flat,
}

/// An array-valued attribute and the metadata block that may follow it.
struct ArrayAttribute<'a> {
    values: &'a str,
    metadata: Option<&'a str>,
}

impl<'a> ArrayAttribute<'a> {
    /// The quoted value of `interpolation = "..."` in the metadata, if any.
    fn interpolation(&self) -> Option<&'a str> {
        let metadata = self.metadata?;
        let rest = &metadata[metadata.find("interpolation")? + "interpolation".len()..];
        let rest = rest.trim_start().strip_prefix('=')?.trim_start().strip_prefix('"')?;
        Some(&rest[..rest.find('"')?])
    }
}

/// The text between a prim's opening brace and its matching closing brace.
///
/// The prim's `( ... )` metadata is skipped even when it holds dictionaries of
/// its own. Brackets inside quoted strings do not count.
fn prim_body(source: &str) -> Option<&str> {
    let mut parens = 0usize;
    let mut braces = 0usize;
    let mut body_start = None;
    let mut quoted = false;
    let mut escaped = false;

    for (offset, c) in source.char_indices() {
        if quoted {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => quoted = false,
                _ => {}
            }
            continue;
        }

        match (c, body_start) {
            ('"', _) => quoted = true,
            ('(', None) => parens += 1,
            (')', None) => parens = parens.saturating_sub(1),
            ('{', None) if parens == 0 => {
                body_start = Some(offset + 1);
                braces = 1;
            }
            ('{', Some(_)) => braces += 1,
            ('}', Some(start)) => {
                braces -= 1;
                if braces == 0 {
                    return Some(&source[start..offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// The contents of the `[...]` assigned to attribute `name`, if any.
///
/// Matches `name = [` as well as namespaced spellings such as
/// `primvars:name = [`, but not `name.timeSamples` or `name:indices`.
fn array_attribute<'a>(block: &'a str, name: &str) -> Option<ArrayAttribute<'a>> {
    for (at, _) in block.match_indices(name) {
        let preceded_ok = block[..at]
            .chars()
            .next_back()
            .is_none_or(|c| c.is_whitespace() || c == ':');
        if !preceded_ok {
            continue;
        }

        let rest = block[at + name.len()..].trim_start();
        let Some(rest) = rest.strip_prefix('=') else {
            continue;
        };
        let Some(rest) = rest.trim_start().strip_prefix('[') else {
            continue;
        };
        let end = rest.find(']')?;
        let metadata = rest[end + 1..]
            .trim_start()
            .strip_prefix('(')
            .and_then(|meta| meta.find(')').map(|close| &meta[..close]));
        return Some(ArrayAttribute {
            values: &rest[..end],
            metadata,
        });
    }
    None
}

fn parse_vec3s(body: &str) -> Result<Vec<Vec3>, GeometryError> {
    let numbers = body
        .split(|c: char| c == ',' || c == '(' || c == ')' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<f32>()
                .map_err(|e| GeometryError::Parse(format!("bad number '{token}': {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if numbers.len() % 3 != 0 {
        return Err(GeometryError::Parse(format!(
            "{} components do not form 3-vectors",
            numbers.len()
        )));
    }
    Ok(numbers
        .chunks_exact(3)
        .map(|c| Vec3::new(c[0], c[1], c[2]))
        .collect())
}

fn parse_indices(body: &str) -> Result<Vec<usize>, GeometryError> {
    body.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<usize>()
                .map_err(|e| GeometryError::Parse(format!("bad index '{token}': {e}")))
        })
        .collect()
}
