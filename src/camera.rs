// src/camera.rs
// Maps logical (CSS) pixels, origin top-left and y down, onto clip space.
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2};

// Camera uniform as the shaders see it.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub needs_srgb_output_conversion: u32, // 0 for false, 1 for true
    pub _padding: [u32; 3], // pads the struct to 80 bytes
}

#[derive(Debug)]
pub struct Camera {
    /// Surface size in physical pixels.
    pub physical_size: Vec2,
    /// Physical pixels per logical pixel, never below 1.
    pub scale_factor: f32,
}

impl Camera {
    pub fn new(physical_width: u32, physical_height: u32, scale_factor: f64) -> Self {
        Self {
            physical_size: Vec2::new(physical_width as f32, physical_height as f32),
            scale_factor: clamp_scale(scale_factor),
        }
    }

    /// Called on resize and on scale factor changes.
    pub fn update_viewport(&mut self, physical_width: u32, physical_height: u32, scale_factor: f64) {
        if physical_width > 0 && physical_height > 0 {
            self.physical_size = Vec2::new(physical_width as f32, physical_height as f32);
        }
        self.scale_factor = clamp_scale(scale_factor);
    }

    /// Surface size in logical pixels; what the effects lay out against.
    pub fn logical_size(&self) -> Vec2 {
        self.physical_size / self.scale_factor
    }

    pub fn logical_to_physical(&self, logical: Vec2) -> Vec2 {
        logical * self.scale_factor
    }

    pub fn build_view_projection_matrix(&self) -> Mat4 {
        let size = self.logical_size();
        // left, right, bottom, top: flips y so that +y points down the screen.
        Mat4::orthographic_rh(0.0, size.x.max(1.0), size.y.max(1.0), 0.0, -100.0, 100.0)
    }
}

fn clamp_scale(scale_factor: f64) -> f32 {
    if scale_factor.is_finite() { (scale_factor as f32).max(1.0) } else { 1.0 }
}
