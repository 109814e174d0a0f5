use anyhow::{bail, Result};
use glam::Vec3;

use crate::scene::Mesh;

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;

/// Parses binary or ASCII STL into raw triangle geometry.
///
/// STL carries no materials; the caller wraps the returned geometry in a
/// mesh leaf and assigns a color.
pub fn load_stl(data: &[u8]) -> Result<Mesh> {
    if looks_binary(data) {
        load_binary(data)
    } else if data.trim_ascii_start().starts_with(b"solid") {
        load_ascii(data)
    } else {
        bail!("not a recognizable STL file (bad header)");
    }
}

/// Binary STL is unambiguous: the declared triangle count must match the
/// file length exactly.
fn looks_binary(data: &[u8]) -> bool {
    if data.len() < HEADER_LEN + 4 {
        return false;
    }
    let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
    data.len() == HEADER_LEN + 4 + count * TRIANGLE_LEN
}

fn load_binary(data: &[u8]) -> Result<Mesh> {
    let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;

    let mut positions = Vec::with_capacity(count * 3);
    let mut normals = Vec::with_capacity(count * 3);

    let mut offset = HEADER_LEN + 4;
    for _ in 0..count {
        let normal = read_vec3(data, offset);
        offset += 12;
        for _ in 0..3 {
            positions.push(read_vec3(data, offset));
            normals.push(normal);
            offset += 12;
        }
        offset += 2; // attribute byte count
    }

    finish(positions, normals)
}

fn load_ascii(data: &[u8]) -> Result<Mesh> {
    let text = std::str::from_utf8(data)?;

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut facet_normal = Vec3::ZERO;

    for line in text.lines() {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("facet") => {
                // "facet normal nx ny nz"
                words.next();
                facet_normal = parse_vec3(&mut words)?;
            }
            Some("vertex") => {
                positions.push(parse_vec3(&mut words)?);
                normals.push(facet_normal);
            }
            _ => {}
        }
    }

    if positions.len() % 3 != 0 {
        bail!("ASCII STL has {} vertices, not a multiple of 3", positions.len());
    }

    finish(positions, normals)
}

fn finish(positions: Vec<Vec3>, normals: Vec<Vec3>) -> Result<Mesh> {
    if positions.is_empty() {
        bail!("STL file contains no triangles");
    }
    let indices = (0..positions.len() as u32).collect();
    Ok(Mesh::new(positions, normals, indices))
}

fn read_vec3(data: &[u8], offset: usize) -> Vec3 {
    let f = |o: usize| {
        f32::from_le_bytes([data[o], data[o + 1], data[o + 2], data[o + 3]])
    };
    Vec3::new(f(offset), f(offset + 4), f(offset + 8))
}

fn parse_vec3<'a>(words: &mut impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let mut component = || -> Result<f32> {
        match words.next() {
            Some(w) => Ok(w.parse()?),
            None => bail!("truncated coordinate triple in ASCII STL"),
        }
    };
    Ok(Vec3::new(component()?, component()?, component()?))
}

#[cfg(test)]
pub(crate) fn binary_stl_fixture(triangles: &[[Vec3; 3]]) -> Vec<u8> {
    let mut data = vec![0u8; HEADER_LEN];
    data.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
    for tri in triangles {
        let normal = (tri[1] - tri[0]).cross(tri[2] - tri[0]).normalize_or_zero();
        for v in std::iter::once(normal).chain(tri.iter().copied()) {
            data.extend_from_slice(&v.x.to_le_bytes());
            data.extend_from_slice(&v.y.to_le_bytes());
            data.extend_from_slice(&v.z.to_le_bytes());
        }
        data.extend_from_slice(&0u16.to_le_bytes());
    }
    data
}
