use bytemuck::cast_slice_mut;
use glam::Vec3;

/// Axis aligned bounding box.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

// How many whole vertexes of `stride` floats actually fit in the buffer.
fn usable_count(len: usize, count: usize, stride: usize) -> usize {
    if stride < 3 {
        return 0;
    }
    // The last vertex only needs its position, not the full stride.
    let fitting = if len < 3 { 0 } else { (len - 3) / stride + 1 };
    count.min(fitting)
}

/// Rewrites the position (first three floats) of each of the `count` vertexes
/// in `data`, spaced `stride` floats apart. Returns how many were visited.
pub fn apply_per_vertex<F>(data: &mut [f32], count: usize, stride: usize, mut transform: F) -> usize
where
    F: FnMut(Vec3) -> Vec3,
{
    let usable = usable_count(data.len(), count, stride);
    if usable < count {
        log::warn!(
            "Vertex buffer of {} floats holds {} of {} vertexes with stride {}",
            data.len(),
            usable,
            count,
            stride
        );
    }

    if stride == 3 {
        // Tightly packed positions can be viewed as Vec3 directly.
        let positions: &mut [Vec3] = cast_slice_mut(&mut data[..usable * 3]);
        for position in positions {
            *position = transform(*position);
        }
    } else {
        for vertex in 0..usable {
            let start = vertex * stride;
            let position = &mut data[start..start + 3];
            transform(Vec3::from_slice(position)).write_to_slice(position);
        }
    }

    usable
}

/// Bounding box of the positions in a strided vertex buffer. An empty buffer
/// gives the default (zero sized) box.
pub fn compute_bounding_box(data: &[f32], count: usize, stride: usize) -> Aabb {
    let usable = usable_count(data.len(), count, stride);
    if usable == 0 {
        return Aabb::default();
    }

    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    for vertex in 0..usable {
        let start = vertex * stride;
        let position = Vec3::from_slice(&data[start..start + 3]);
        min = min.min(position);
        max = max.max(position);
    }

    Aabb { min, max }
}
