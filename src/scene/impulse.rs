use glam::Vec2;

use crate::frame::FrameDelta;

/// An expanding shockwave started by a pointer press.
#[derive(Debug, Clone, PartialEq)]
pub struct Impulse {
    pub origin: Vec2,
    pub radius: f32,
    /// 1 at birth, removed once it reaches 0.
    pub life: f32,
}

impl Impulse {
    pub fn new(origin: Vec2) -> Self {
        Self { origin, radius: 0.0, life: 1.0 }
    }

    /// Grows the ring by `ring_growth` px per millisecond and ages it by
    /// `life_decay` per second.
    pub fn advance(&mut self, delta: FrameDelta, ring_growth: f32, life_decay: f32) {
        self.radius += delta.millis * ring_growth;
        self.life = (self.life - delta.seconds() * life_decay).clamp(0.0, 1.0);
    }

    pub fn is_alive(&self) -> bool {
        self.life > 0.0
    }

    /// Signed distance from `point` to the ring.
    pub fn band_offset(&self, point: Vec2) -> f32 {
        point.distance(self.origin) - self.radius
    }

    /// Linear falloff across a band of `half_width` around the ring: 1 on the
    /// ring, 0 at the band edge, `None` outside.
    pub fn band_proximity(&self, point: Vec2, half_width: f32) -> Option<f32> {
        let off = self.band_offset(point).abs();
        (off < half_width).then(|| 1.0 - (off / half_width).min(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_and_ages() {
        let mut impulse = Impulse::new(Vec2::new(10.0, 10.0));
        impulse.advance(FrameDelta::from_millis(20.0), 0.6, 0.9);
        assert!((impulse.radius - 12.0).abs() < 1e-5);
        assert!((impulse.life - 0.982).abs() < 1e-5);
        assert!(impulse.is_alive());
    }

    #[test]
    fn life_never_goes_negative() {
        let mut impulse = Impulse::new(Vec2::ZERO);
        for _ in 0..100 {
            impulse.advance(FrameDelta::from_millis(50.0), 0.6, 0.9);
        }
        assert_eq!(impulse.life, 0.0);
        assert!(!impulse.is_alive());
    }

    #[test]
    fn proximity_peaks_on_ring() {
        let impulse = Impulse { origin: Vec2::ZERO, radius: 100.0, life: 1.0 };
        assert_eq!(impulse.band_proximity(Vec2::new(100.0, 0.0), 24.0), Some(1.0));
        let half = impulse.band_proximity(Vec2::new(0.0, 112.0), 24.0).unwrap();
        assert!((half - 0.5).abs() < 1e-5);
        assert_eq!(impulse.band_proximity(Vec2::new(0.0, 124.0), 24.0), None);
        assert_eq!(impulse.band_proximity(Vec2::new(50.0, 0.0), 24.0), None);
    }
}
