//! Shared fixtures for the integration tests.

use glam::Vec3;

/// Build a binary STL byte buffer from triangles.
pub fn binary_stl(triangles: &[[Vec3; 3]]) -> Vec<u8> {
    let mut data = vec![0u8; 80];
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

/// STL spanning the box (-1,-1,-1)..(1,1,1).
pub fn unit_cube_stl() -> Vec<u8> {
    binary_stl(&[
        [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
        ],
        [
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
        ],
    ])
}

/// A 4x1x2 box offset from the origin.
pub fn offset_box_stl() -> Vec<u8> {
    binary_stl(&[
        [
            Vec3::new(3.0, 5.0, 7.0),
            Vec3::new(7.0, 5.0, 7.0),
            Vec3::new(7.0, 6.0, 9.0),
        ],
        [
            Vec3::new(3.0, 5.0, 7.0),
            Vec3::new(7.0, 6.0, 9.0),
            Vec3::new(3.0, 6.0, 9.0),
        ],
    ])
}
