use glam::Vec3;
use wgpu::util::DeviceExt;
use bytemuck::NoUninit;

#[repr(C)]
#[derive(Debug, Clone, Copy, NoUninit)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Append `other`, rebasing its indices onto our vertex list
    pub fn append(&mut self, other: &Mesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| base + i));
    }

    pub fn translate(&mut self, offset: Vec3) {
        for v in self.vertices.iter_mut() {
            v.pos[0] += offset.x;
            v.pos[1] += offset.y;
            v.pos[2] += offset.z;
        }
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {

        let vertices = bytemuck::cast_slice(&self.vertices);
        let indices = bytemuck::cast_slice(&self.indices);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: indices,
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

/// Push one quad (two CCW triangles seen from the `normal` side)
fn push_quad(mesh: &mut Mesh, corners: [Vec3; 4], normal: Vec3, color: [f32; 4]) {
    let base = mesh.vertices.len() as u32;
    for c in corners {
        mesh.vertices.push(Vertex { pos: c.to_array(), normal: normal.to_array(), color });
    }
    mesh.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
}

/// Axis-aligned box centred at the origin
pub fn create_box_mesh(size: Vec3, color: [f32; 4]) -> Mesh {
    let h = size * 0.5;
    let mut mesh = Mesh::empty();

    // +X
    push_quad(&mut mesh, [
        Vec3::new(h.x, -h.y, h.z), Vec3::new(h.x, -h.y, -h.z),
        Vec3::new(h.x, h.y, -h.z), Vec3::new(h.x, h.y, h.z),
    ], Vec3::X, color);
    // -X
    push_quad(&mut mesh, [
        Vec3::new(-h.x, -h.y, -h.z), Vec3::new(-h.x, -h.y, h.z),
        Vec3::new(-h.x, h.y, h.z), Vec3::new(-h.x, h.y, -h.z),
    ], Vec3::NEG_X, color);
    // +Y
    push_quad(&mut mesh, [
        Vec3::new(-h.x, h.y, h.z), Vec3::new(h.x, h.y, h.z),
        Vec3::new(h.x, h.y, -h.z), Vec3::new(-h.x, h.y, -h.z),
    ], Vec3::Y, color);
    // -Y
    push_quad(&mut mesh, [
        Vec3::new(-h.x, -h.y, -h.z), Vec3::new(h.x, -h.y, -h.z),
        Vec3::new(h.x, -h.y, h.z), Vec3::new(-h.x, -h.y, h.z),
    ], Vec3::NEG_Y, color);
    // +Z
    push_quad(&mut mesh, [
        Vec3::new(-h.x, -h.y, h.z), Vec3::new(h.x, -h.y, h.z),
        Vec3::new(h.x, h.y, h.z), Vec3::new(-h.x, h.y, h.z),
    ], Vec3::Z, color);
    // -Z
    push_quad(&mut mesh, [
        Vec3::new(h.x, -h.y, -h.z), Vec3::new(-h.x, -h.y, -h.z),
        Vec3::new(-h.x, h.y, -h.z), Vec3::new(h.x, h.y, -h.z),
    ], Vec3::NEG_Z, color);

    mesh
}

/// Flat ground plane on y = 0, facing up
pub fn create_ground_mesh(width: f32, depth: f32, color: [f32; 4]) -> Mesh {
    let (hw, hd) = (width * 0.5, depth * 0.5);
    let mut mesh = Mesh::empty();
    push_quad(&mut mesh, [
        Vec3::new(-hw, 0.0, hd), Vec3::new(hw, 0.0, hd),
        Vec3::new(hw, 0.0, -hd), Vec3::new(-hw, 0.0, -hd),
    ], Vec3::Y, color);
    mesh
}

/// Quad in the local XY plane facing +Z, centred at the origin
pub fn create_panel_mesh(width: f32, height: f32, color: [f32; 4]) -> Mesh {
    let (hw, hh) = (width * 0.5, height * 0.5);
    let mut mesh = Mesh::empty();
    push_quad(&mut mesh, [
        Vec3::new(-hw, -hh, 0.0), Vec3::new(hw, -hh, 0.0),
        Vec3::new(hw, hh, 0.0), Vec3::new(-hw, hh, 0.0),
    ], Vec3::Z, color);
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_has_six_faces() {
        let mesh = create_box_mesh(Vec3::splat(2.0), [1.0; 4]);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert!(mesh.vertices.iter().all(|v| v.pos.iter().all(|c| c.abs() == 1.0)));
    }

    #[test]
    fn append_rebases_indices() {
        let mut mesh = create_ground_mesh(10.0, 10.0, [1.0; 4]);
        let panel = create_panel_mesh(2.0, 1.0, [0.0, 0.0, 0.0, 1.0]);
        mesh.append(&panel);
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(&mesh.indices[6..], &[4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn translate_moves_every_vertex() {
        let mut mesh = create_box_mesh(Vec3::splat(2.0), [1.0; 4]);
        mesh.translate(Vec3::new(0.0, 1.0, 0.0));
        let min_y = mesh.vertices.iter().map(|v| v.pos[1]).fold(f32::MAX, f32::min);
        assert_eq!(min_y, 0.0);
    }
}
