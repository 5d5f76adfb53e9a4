use std::borrow::Cow;

/// How a label's position relates to the rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    /// Position is the left end of the baseline, like canvas `fillText`.
    Baseline,
    /// Position is the center of the text block.
    Center,
    /// Position is the left-middle of the text block.
    MiddleLeft,
}

/// A run of text to draw this frame, in logical pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    /// Static for the rain digits, owned for member names.
    pub content: Cow<'static, str>,
    pub font_size: f32,
    pub position: [f32; 2],
    /// sRGB color with alpha.
    pub color: [u8; 4],
    pub anchor: TextAnchor,
}

/// Font family a surface draws all its labels with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelFamily {
    Monospace,
    SansSerif,
}
