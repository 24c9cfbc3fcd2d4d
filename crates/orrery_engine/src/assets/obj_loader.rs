//! OBJ file loader for 3D models

use crate::render::mesh::{MeshData, Vertex};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// OBJ parsing errors
#[derive(Error, Debug)]
pub enum ObjError {
    /// Underlying read failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed number or index
    #[error("Parse error on line {line}: {message}")]
    ParseError {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },
    /// Structurally invalid file
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Minimal OBJ reader: positions, normals, texture coordinates and polygon
/// faces (fan-triangulated). Materials and groups are ignored.
pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file from disk
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<MeshData, ObjError> {
        let file = File::open(path.as_ref())?;
        let mesh = Self::parse(BufReader::new(file))?;
        log::info!(
            "Loaded {:?}: {} vertices, {} triangles",
            path.as_ref(),
            mesh.vertices.len(),
            mesh.indices.len() / 3
        );
        Ok(mesh)
    }

    /// Parse OBJ text from any buffered reader
    pub fn parse<R: BufRead>(reader: R) -> Result<MeshData, ObjError> {
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut tex_coords: Vec<[f32; 2]> = Vec::new();
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        let mut used_tex_coords = false;

        for (line_index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = line_index + 1;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            let parse_err = |message: &str| ObjError::ParseError {
                line: line_no,
                message: message.to_string(),
            };
            let float = |s: &str, what: &str| s.parse::<f32>().map_err(|_| parse_err(what));

            match parts[0] {
                "v" if parts.len() >= 4 => positions.push([
                    float(parts[1], "invalid vertex x")?,
                    float(parts[2], "invalid vertex y")?,
                    float(parts[3], "invalid vertex z")?,
                ]),
                "vn" if parts.len() >= 4 => normals.push([
                    float(parts[1], "invalid normal x")?,
                    float(parts[2], "invalid normal y")?,
                    float(parts[3], "invalid normal z")?,
                ]),
                "vt" if parts.len() >= 3 => tex_coords.push([
                    float(parts[1], "invalid tex coord u")?,
                    float(parts[2], "invalid tex coord v")?,
                ]),
                "f" if parts.len() >= 4 => {
                    let mut face_indices = Vec::with_capacity(parts.len() - 1);

                    for corner in &parts[1..] {
                        let mut fields = corner.split('/');
                        let index = |field: Option<&str>| -> Option<usize> {
                            field
                                .filter(|s| !s.is_empty())
                                .and_then(|s| s.parse::<usize>().ok())
                                .and_then(|i| i.checked_sub(1))
                        };

                        let pos_idx = index(fields.next()).ok_or_else(|| parse_err("invalid position index"))?;
                        let tex_idx = index(fields.next());
                        let normal_idx = index(fields.next());

                        let position = positions
                            .get(pos_idx)
                            .ok_or_else(|| ObjError::InvalidFormat(format!("position index out of bounds on line {line_no}")))?;
                        let tex_coord = tex_idx.and_then(|i| tex_coords.get(i));
                        used_tex_coords |= tex_coord.is_some();

                        vertices.push(Vertex::new(
                            *position,
                            *normal_idx.and_then(|i| normals.get(i)).unwrap_or(&[0.0, 1.0, 0.0]),
                            *tex_coord.unwrap_or(&[0.0, 0.0]),
                        ));
                        face_indices.push((vertices.len() - 1) as u32);
                    }

                    for i in 1..(face_indices.len() - 1) {
                        indices.extend_from_slice(&[face_indices[0], face_indices[i], face_indices[i + 1]]);
                    }
                }
                _ => {}
            }
        }

        if vertices.is_empty() {
            return Err(ObjError::InvalidFormat("No vertices found in OBJ file".to_string()));
        }

        Ok(MeshData::new(vertices, indices).with_tex_coords(used_tex_coords))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const QUAD: &str = "\
# unit quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn quad_is_fan_triangulated() {
        let mesh = ObjLoader::parse(Cursor::new(QUAD)).expect("parse");
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert!(mesh.has_tex_coords);
        assert_eq!(mesh.vertices[2].tex_coord, [1.0, 1.0]);
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn faces_without_uvs_mark_mesh_untextured() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = ObjLoader::parse(Cursor::new(src)).expect("parse");
        assert!(!mesh.has_tex_coords);
        assert_eq!(mesh.indices.len(), 3);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let src = "v 0 0 0\nf 1 2 3\n";
        let err = ObjLoader::parse(Cursor::new(src)).unwrap_err();
        assert!(matches!(err, ObjError::InvalidFormat(_)));
    }

    #[test]
    fn empty_file_is_rejected() {
        assert!(ObjLoader::parse(Cursor::new("# nothing\n")).is_err());
    }
}
