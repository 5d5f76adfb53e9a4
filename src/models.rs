// src/models.rs
use bytemuck::{Pod, Zeroable};

// --- Standard 2D Vertex (unit quad that circle instances expand) ---
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex2D {
    pub position: [f32; 2],
}

impl Vertex2D {
    pub const QUAD_VERTICES: [Self; 4] = [
        Vertex2D { position: [-0.5, -0.5] },
        Vertex2D { position: [ 0.5, -0.5] },
        Vertex2D { position: [ 0.5,  0.5] },
        Vertex2D { position: [-0.5,  0.5] },
    ];

    pub const QUAD_INDICES: [u16; 6] = [
        0, 1, 2,
        0, 2, 3,
    ];

    pub fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            }],
        }
    }
}

// --- Instance data for discs, rings and soft glows ---
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct CircleInstance {
    pub position: [f32; 2], // center, logical px
    pub radius: f32,
    pub color: [f32; 4],    // linear RGBA
    /// 0 draws a filled disc, anything else a ring of this width.
    pub ring_width: f32,
    /// Extra soft falloff outside the edge, used for glows.
    pub feather: f32,
}

impl CircleInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        1 => Float32x2,
        2 => Float32,
        3 => Float32x4,
        4 => Float32,
        5 => Float32,
    ];

    pub fn disc(position: [f32; 2], radius: f32, color: [f32; 4]) -> Self {
        Self { position, radius, color, ring_width: 0.0, feather: 0.0 }
    }

    pub fn ring(position: [f32; 2], radius: f32, width: f32, color: [f32; 4]) -> Self {
        Self { position, radius, color, ring_width: width.max(f32::EPSILON), feather: 0.0 }
    }

    pub fn glow(position: [f32; 2], radius: f32, blur: f32, color: [f32; 4]) -> Self {
        Self { position, radius, color, ring_width: 0.0, feather: blur }
    }

    pub fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

// --- Vertex data for lines (hub links) ---
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 2],
    pub color: [f32; 4], // linear RGBA
}

impl LineVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2,
        1 => Float32x4,
    ];

    pub fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}
