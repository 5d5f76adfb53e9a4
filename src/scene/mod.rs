pub mod impulse;
pub mod member;
pub mod network;
pub mod node;
pub mod rain;
pub mod text_label;

use glam::Vec2;

use crate::frame::{FrameBatch, FrameDelta};
use network::{NetworkKey, RadialNetwork};
use rain::RainField;
use text_label::LabelFamily;

/// One visual effect bound to one surface. The effects never share state.
pub enum Effect {
    Rain(RainField),
    Network(RadialNetwork),
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::Rain(_) => "binary rain",
            Effect::Network(_) => "team network",
        }
    }

    pub fn label_family(&self) -> LabelFamily {
        match self {
            Effect::Rain(_) => LabelFamily::Monospace,
            Effect::Network(_) => LabelFamily::SansSerif,
        }
    }

    /// Surface size changed, in logical pixels.
    pub fn resize(&mut self, width: f32, height: f32) {
        match self {
            Effect::Rain(rain) => rain.layout(width, height),
            Effect::Network(network) => network.layout(width, height),
        }
    }

    pub fn advance(&mut self, delta: FrameDelta) {
        match self {
            Effect::Rain(rain) => rain.advance(delta),
            Effect::Network(network) => network.advance(delta),
        }
    }

    pub fn draw(&self, batch: &mut FrameBatch) {
        batch.clear();
        match self {
            Effect::Rain(rain) => rain.draw(batch),
            Effect::Network(network) => network.draw(batch),
        }
    }

    pub fn pointer_moved(&mut self, point: Vec2) {
        if let Effect::Network(network) = self {
            network.pointer_moved(point);
        }
    }

    pub fn pointer_left(&mut self) {
        if let Effect::Network(network) = self {
            network.pointer_left();
        }
    }

    pub fn pointer_pressed(&mut self, point: Vec2) {
        match self {
            Effect::Rain(rain) => rain.register_impulse(point),
            Effect::Network(network) => network.pointer_pressed(point),
        }
    }

    /// The surface lost input focus.
    pub fn focus_lost(&mut self) {
        if let Effect::Network(network) = self {
            network.clear_focus();
        }
    }

    pub fn key_pressed(&mut self, key: NetworkKey) {
        if let Effect::Network(network) = self {
            network.key_pressed(key);
        }
    }

    pub fn set_scroll_offset(&mut self, offset: f32) {
        if let Effect::Rain(rain) = self {
            rain.set_scroll_offset(offset);
        }
    }

    pub fn take_announcement(&mut self) -> Option<String> {
        match self {
            Effect::Network(network) => network.take_announcement(),
            Effect::Rain(_) => None,
        }
    }
}
