// src/color.rs
// Palette shared by both effects, stored as sRGB and converted on demand.
use bevy_color::{Alpha, ColorToComponents, ColorToPacked, LinearRgba, Srgba};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(Srgba);

impl Color {
    /// Signal yellow used for digits, ripples and highlights (#f0db4f).
    pub const ACCENT: Color = Color(Srgba::rgb(240.0 / 255.0, 219.0 / 255.0, 79.0 / 255.0));
    pub const BACKGROUND: Color = Color(Srgba::rgb(18.0 / 255.0, 18.0 / 255.0, 18.0 / 255.0));
    pub const NODE_FILL: Color = Color(Srgba::rgb(0.0, 93.0 / 255.0, 93.0 / 255.0));
    pub const LINK: Color = Color(Srgba::rgb(110.0 / 255.0, 110.0 / 255.0, 110.0 / 255.0));
    pub const LABEL: Color = Color(Srgba::rgb(230.0 / 255.0, 230.0 / 255.0, 230.0 / 255.0));

    pub fn with_alpha(self, alpha: f32) -> Self {
        Color(self.0.with_alpha(alpha.clamp(0.0, 1.0)))
    }

    pub fn into_linear_rgba(self) -> [f32; 4] {
        LinearRgba::from(self.0).to_f32_array()
    }

    pub fn into_srgba_u8(self) -> [u8; 4] {
        self.0.to_u8_array()
    }

    pub fn into_linear_wgpu_color(self) -> wgpu::Color {
        let [r, g, b, a] = LinearRgba::from(self.0).to_f32_array();
        wgpu::Color { r: r as f64, g: g as f64, b: b as f64, a: a as f64 }
    }
}
