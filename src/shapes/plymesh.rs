//! Read triangle meshes from PLY files.
//!
//! Vertices need `x`, `y`, `z` properties; `nx`, `ny`, `nz` and
//! `u`, `v` (or `s`, `t`) are picked up when present. Faces are read
//! from a `vertex_indices` (or `vertex_index`) list, quads are split
//! into two triangles.

// std
use std::fs::File;
use std::io::{BufReader, Error, ErrorKind, Result};
use std::path::Path;
// others
use log::{info, warn};
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};
// pbrt
use crate::core::geometry::{Normal3f, Point2f, Point3f};
use crate::core::pbrt::Float;
use crate::shapes::triangle::TriangleMesh;

fn scalar(element: &DefaultElement, name: &str) -> Option<Float> {
    match element.get(name)? {
        Property::Char(v) => Some(*v as Float),
        Property::UChar(v) => Some(*v as Float),
        Property::Short(v) => Some(*v as Float),
        Property::UShort(v) => Some(*v as Float),
        Property::Int(v) => Some(*v as Float),
        Property::UInt(v) => Some(*v as Float),
        Property::Float(v) => Some(*v),
        Property::Double(v) => Some(*v as Float),
        _ => None,
    }
}

fn index_list(element: &DefaultElement) -> Option<Vec<i64>> {
    let property = element
        .get("vertex_indices")
        .or_else(|| element.get("vertex_index"))?;
    match property {
        Property::ListChar(v) => Some(v.iter().map(|&i| i as i64).collect()),
        Property::ListUChar(v) => Some(v.iter().map(|&i| i as i64).collect()),
        Property::ListShort(v) => Some(v.iter().map(|&i| i as i64).collect()),
        Property::ListUShort(v) => Some(v.iter().map(|&i| i as i64).collect()),
        Property::ListInt(v) => Some(v.iter().map(|&i| i as i64).collect()),
        Property::ListUInt(v) => Some(v.iter().map(|&i| i as i64).collect()),
        _ => None,
    }
}

fn invalid_data(msg: String) -> Error {
    Error::new(ErrorKind::InvalidData, msg)
}

/// Load the triangles of the PLY file at *path*.
pub fn read_ply_mesh(path: &Path) -> Result<TriangleMesh> {
    let f: File = File::open(path)?;
    let mut reader = BufReader::new(f);
    let parser = Parser::<DefaultElement>::new();
    let ply = parser.read_ply(&mut reader)?;
    let vertices: &Vec<DefaultElement> = ply
        .payload
        .get("vertex")
        .ok_or_else(|| invalid_data(format!("{:?}: no vertex element", path)))?;
    let faces: &Vec<DefaultElement> = ply
        .payload
        .get("face")
        .ok_or_else(|| invalid_data(format!("{:?}: no face element", path)))?;
    // positions
    let mut p: Vec<Point3f> = Vec::with_capacity(vertices.len());
    for (i, v) in vertices.iter().enumerate() {
        match (scalar(v, "x"), scalar(v, "y"), scalar(v, "z")) {
            (Some(x), Some(y), Some(z)) => p.push(Point3f { x, y, z }),
            _ => {
                return Err(invalid_data(format!(
                    "{:?}: vertex {} lacks a position",
                    path, i
                )));
            }
        }
    }
    // optional normals and texture coordinates
    let n: Vec<Normal3f> = vertices
        .iter()
        .map(|v| match (scalar(v, "nx"), scalar(v, "ny"), scalar(v, "nz")) {
            (Some(x), Some(y), Some(z)) => Some(Normal3f { x, y, z }),
            _ => None,
        })
        .collect::<Option<Vec<Normal3f>>>()
        .unwrap_or_default();
    let uv: Vec<Point2f> = vertices
        .iter()
        .map(|v| {
            let u = scalar(v, "u").or_else(|| scalar(v, "s"));
            let w = scalar(v, "v").or_else(|| scalar(v, "t"));
            match (u, w) {
                (Some(x), Some(y)) => Some(Point2f { x, y }),
                _ => None,
            }
        })
        .collect::<Option<Vec<Point2f>>>()
        .unwrap_or_default();
    // faces
    let mut vertex_indices: Vec<usize> = Vec::with_capacity(faces.len() * 3);
    let mut skipped: usize = 0;
    for (i, face) in faces.iter().enumerate() {
        let indices: Vec<i64> = index_list(face)
            .ok_or_else(|| invalid_data(format!("{:?}: face {} has no index list", path, i)))?;
        if let Some(bad) = indices
            .iter()
            .find(|&&vi| vi < 0 || vi as usize >= p.len())
        {
            return Err(invalid_data(format!(
                "{:?}: face {} references vertex {} (only {} vertices)",
                path,
                i,
                bad,
                p.len()
            )));
        }
        match indices.len() {
            3 => {
                vertex_indices.extend(indices.iter().map(|&vi| vi as usize));
            }
            4 => {
                for &k in &[0_usize, 1, 2, 0, 2, 3] {
                    vertex_indices.push(indices[k] as usize);
                }
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(
            "{:?}: skipped {} faces that are neither triangles nor quads",
            path, skipped
        );
    }
    if vertex_indices.is_empty() {
        return Err(invalid_data(format!("{:?}: no triangles", path)));
    }
    info!(
        "{:?}: {} vertices, {} triangles",
        path,
        p.len(),
        vertex_indices.len() / 3
    );
    Ok(TriangleMesh::new(vertex_indices, p, n, uv))
}
