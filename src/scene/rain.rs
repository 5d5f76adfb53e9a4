//! Horizontal rows of scrolling binary digits with click shockwaves.
//!
//! The field owns a set of [`Row`]s laid out for the current surface size and
//! a list of live [`Impulse`]s. Pointer presses speed up nearby rows and start
//! a ring that flips every digit it passes through.

use std::borrow::Cow;

use glam::Vec2;
use rand::{Rng, SeedableRng, rngs::SmallRng};

use crate::color::Color;
use crate::config::RainConfig;
use crate::frame::{FrameBatch, FrameDelta};
use crate::models::CircleInstance;
use crate::scene::impulse::Impulse;
use crate::scene::text_label::{TextAnchor, TextLabel};

/// Halo strength relative to the canvas shadow it stands in for.
const GLOW_STRENGTH: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub y: f32,
    pub font_size: f32,
    /// px/sec, the sign is the scroll direction.
    pub base_speed: f32,
    pub spacing: f32,
    /// Phase in `[0, spacing)`.
    pub offset: f32,
    pub boost: f32,
}

impl Row {
    /// +1 for rows moving right, -1 otherwise. Stationary rows count as
    /// moving left.
    pub fn direction(&self) -> f32 {
        if self.base_speed > 0.0 { 1.0 } else { -1.0 }
    }

    fn first_column_x(&self) -> f32 {
        let phase = if self.base_speed > 0.0 { -self.offset } else { self.offset };
        -self.spacing + phase
    }
}

/// One digit ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphSprite {
    /// Left end of the baseline.
    pub position: Vec2,
    pub bit: bool,
    pub font_size: f32,
    pub alpha: f32,
    /// 0 when no shockwave touches the digit, up to 1 on the ring.
    pub glow: f32,
}

impl GlyphSprite {
    pub fn as_str(&self) -> &'static str {
        if self.bit { "1" } else { "0" }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RippleRing {
    pub center: Vec2,
    pub radius: f32,
    pub alpha: f32,
}

pub struct RainField {
    config: RainConfig,
    reduced_motion: bool,
    size: Vec2,
    rows: Vec<Row>,
    impulses: Vec<Impulse>,
    scroll_offset: f32,
    rng: SmallRng,
}

impl RainField {
    pub fn new(config: RainConfig, reduced_motion: bool, seed: u64) -> Self {
        Self {
            config,
            reduced_motion,
            size: Vec2::ZERO,
            rows: Vec::new(),
            impulses: Vec::new(),
            scroll_offset: 0.0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn impulses(&self) -> &[Impulse] {
        &self.impulses
    }

    fn has_area(&self) -> bool {
        self.size.x > 0.0 && self.size.y > 0.0
    }

    /// Row height and count for a surface of `height` px.
    pub fn row_metrics(config: &RainConfig, height: f32) -> (f32, usize) {
        let row_height = (height / config.row_density)
            .floor()
            .clamp(config.min_row_height, config.max_row_height);
        let count = ((height / row_height).floor() as usize).max(config.min_rows);
        (row_height, count)
    }

    /// Rebuilds every row for a new surface size. Zero-area surfaces keep no
    /// rows.
    pub fn layout(&mut self, width: f32, height: f32) {
        self.size = Vec2::new(width.max(0.0), height.max(0.0));
        self.rows.clear();
        if !self.has_area() {
            log::debug!("Rain field has no area, skipping layout");
            return;
        }

        let (_, count) = Self::row_metrics(&self.config, height);
        let band = height / count as f32;
        let config = &self.config;
        self.rows = (0..count)
            .map(|i| {
                let y = ((i as f32 + 0.5) * band).round();
                let font_size = uniform(&mut self.rng, config.font_size_range);
                let direction = if i % 2 == 0 { 1.0 } else { -1.0 };
                let speed = uniform(&mut self.rng, config.speed_range);
                let base_speed = if self.reduced_motion { 0.0 } else { direction * speed };
                let spacing = (font_size * config.spacing_factor).max(config.min_spacing);
                let offset = wrap_offset(uniform(&mut self.rng, [0.0, spacing]), spacing);
                Row { y, font_size, base_speed, spacing, offset, boost: 0.0 }
            })
            .collect();
        log::debug!("Rain field laid out {} rows for {}x{}", count, width, height);
    }

    pub fn set_scroll_offset(&mut self, offset: f32) {
        self.scroll_offset = offset;
    }

    /// Boosts rows near `point` and starts a shockwave there.
    pub fn register_impulse(&mut self, point: Vec2) {
        let config = &self.config;
        for row in &mut self.rows {
            let dy = (row.y - point.y).abs();
            if dy <= config.impulse_reach {
                let amount = 1.0 - dy / config.impulse_reach;
                row.boost = (row.boost + amount * config.impulse_gain).min(config.max_boost);
            }
        }
        self.impulses.push(Impulse::new(point));
    }

    pub fn advance(&mut self, delta: FrameDelta) {
        let dt = delta.seconds();
        let config = &self.config;
        let parallax = self.scroll_offset * config.scroll_parallax;

        for row in &mut self.rows {
            row.boost = (row.boost - dt * config.boost_decay).max(0.0);
            let speed = row.base_speed * (1.0 + row.boost) + parallax * row.direction();
            row.offset = wrap_offset(row.offset + speed * dt, row.spacing);
        }

        for impulse in &mut self.impulses {
            impulse.advance(delta, config.ring_growth, config.life_decay);
        }
        self.impulses.retain(Impulse::is_alive);
    }

    /// Every digit visible this frame, row by row.
    pub fn glyphs(&self) -> Vec<GlyphSprite> {
        if !self.has_area() {
            return Vec::new();
        }
        let config = &self.config;
        let mut out = Vec::new();

        for row in &self.rows {
            let columns = (self.size.x / row.spacing).ceil() as usize + 3;
            let start_x = row.first_column_x();
            let row_parity = row.y.floor() as i64;

            for col in 0..columns {
                let x = start_x + col as f32 * row.spacing;
                let base_bit = (col as i64 + row_parity).rem_euclid(2) == 1;
                let accent = config.accent_every > 0 && col % config.accent_every == 0;
                let mut sprite = GlyphSprite {
                    position: Vec2::new(x, row.y),
                    bit: base_bit,
                    font_size: row.font_size,
                    alpha: if accent { config.accent_alpha } else { config.base_alpha },
                    glow: 0.0,
                };

                let mut size_bump: f32 = 0.0;
                for impulse in &self.impulses {
                    if let Some(proximity) =
                        impulse.band_proximity(sprite.position, config.band_half_width)
                    {
                        sprite.bit = !base_bit;
                        size_bump = size_bump.max(proximity * config.max_size_bump);
                        sprite.glow = sprite.glow.max(proximity);
                        sprite.alpha = (sprite.alpha + 0.35 * proximity).min(1.0);
                    }
                }
                sprite.font_size += size_bump;
                out.push(sprite);
            }
        }
        out
    }

    pub fn ripples(&self) -> impl Iterator<Item = RippleRing> + '_ {
        let max_alpha = self.config.ring_max_alpha;
        self.impulses.iter().map(move |impulse| RippleRing {
            center: impulse.origin,
            radius: impulse.radius,
            alpha: impulse.life.clamp(0.0, max_alpha),
        })
    }

    pub fn draw(&self, batch: &mut FrameBatch) {
        batch.clear_color = Color::BACKGROUND;
        if !self.has_area() {
            return;
        }

        for glyph in self.glyphs() {
            if glyph.glow > 0.0 {
                let halo_alpha = (0.5 + glyph.glow * 0.5).min(0.85) * GLOW_STRENGTH;
                let center = glyph.position + Vec2::new(glyph.font_size * 0.3, -glyph.font_size * 0.35);
                batch.circles.push(CircleInstance::glow(
                    center.into(),
                    glyph.font_size * 0.35,
                    8.0 + glyph.glow * 12.0,
                    Color::ACCENT.with_alpha(halo_alpha).into_linear_rgba(),
                ));
            }
            batch.labels.push(TextLabel {
                content: Cow::Borrowed(glyph.as_str()),
                font_size: glyph.font_size,
                position: glyph.position.into(),
                color: Color::ACCENT.with_alpha(glyph.alpha).into_srgba_u8(),
                anchor: TextAnchor::Baseline,
            });
        }

        for ring in self.ripples() {
            batch.overlay_circles.push(CircleInstance::ring(
                ring.center.into(),
                ring.radius,
                self.config.ring_width,
                Color::ACCENT.with_alpha(ring.alpha).into_linear_rgba(),
            ));
        }
    }
}

/// Wraps `value` into `[0, spacing)`.
fn wrap_offset(value: f32, spacing: f32) -> f32 {
    if spacing <= 0.0 {
        return 0.0;
    }
    let wrapped = value.rem_euclid(spacing);
    // rem_euclid can round up to `spacing` for tiny negative inputs.
    if wrapped >= spacing { 0.0 } else { wrapped }
}

fn uniform(rng: &mut SmallRng, [lo, hi]: [f32; 2]) -> f32 {
    if hi > lo { rng.random_range(lo..hi) } else { lo }
}
