// src/frame.rs
// Frame timing and the per-frame draw list handed to the renderer.
use crate::color::Color;
use crate::models::{CircleInstance, LineVertex};
use crate::scene::text_label::TextLabel;

/// Longest step a single frame may advance, guards against tab suspension.
pub const MAX_FRAME_MS: f64 = 50.0;
/// Step used when no previous timestamp exists.
pub const FIRST_FRAME_MS: f64 = 16.0;

/// Elapsed time for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDelta {
    pub millis: f32,
}

impl FrameDelta {
    pub fn from_millis(millis: f32) -> Self {
        Self { millis: millis.max(0.0) }
    }

    pub fn seconds(self) -> f32 {
        self.millis / 1000.0
    }
}

/// Turns monotonically increasing timestamps into clamped frame deltas.
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, now_ms: f64) -> FrameDelta {
        let millis = match self.last_ms {
            Some(last) => {
                let elapsed = (now_ms - last).min(MAX_FRAME_MS);
                if elapsed > 0.0 { elapsed } else { FIRST_FRAME_MS }
            }
            None => FIRST_FRAME_MS,
        };
        self.last_ms = Some(now_ms);
        FrameDelta::from_millis(millis as f32)
    }
}

/// Everything one effect wants drawn this frame, in logical pixels.
#[derive(Debug, Clone)]
pub struct FrameBatch {
    pub clear_color: Color,
    pub lines: Vec<LineVertex>,
    /// Drawn before text.
    pub circles: Vec<CircleInstance>,
    pub labels: Vec<TextLabel>,
    /// Drawn after text, for rings that sit on top of labels.
    pub overlay_circles: Vec<CircleInstance>,
}

impl Default for FrameBatch {
    fn default() -> Self {
        Self {
            clear_color: Color::BACKGROUND,
            lines: Vec::new(),
            circles: Vec::new(),
            labels: Vec::new(),
            overlay_circles: Vec::new(),
        }
    }
}

impl FrameBatch {
    pub fn clear(&mut self) {
        self.lines.clear();
        self.circles.clear();
        self.labels.clear();
        self.overlay_circles.clear();
    }

    pub fn push_line(&mut self, from: [f32; 2], to: [f32; 2], color: Color) {
        let color = color.into_linear_rgba();
        self.lines.push(LineVertex { position: from, color });
        self.lines.push(LineVertex { position: to, color });
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
            && self.circles.is_empty()
            && self.labels.is_empty()
            && self.overlay_circles.is_empty()
    }
}
