// src/host.rs
// Read-only signals from whatever hosts the effects: a browser page on wasm,
// a desktop session otherwise.
use crate::config::HostSignals;

pub trait HostEnvironment {
    fn prefers_reduced_motion(&self) -> bool;
    fn pointer_is_coarse(&self) -> bool;
    /// Vertical scroll offset of the page in CSS pixels.
    fn scroll_offset(&self) -> f32;
    /// Hides the "click the header" hint after the first interaction.
    fn dismiss_hint(&self) {}
    /// Passes a label to assistive technology.
    fn announce(&self, message: &str) {
        log::debug!("announce: {}", message);
    }
}

/// Dismisses the page hint at most once.
#[derive(Debug, Default)]
pub struct HintLatch {
    dismissed: bool,
}

impl HintLatch {
    /// Returns true when this call hid the hint.
    pub fn dismiss(&mut self, host: &impl HostEnvironment) -> bool {
        if self.dismissed {
            return false;
        }
        host.dismiss_hint();
        self.dismissed = true;
        true
    }

    pub fn is_dismissed(&self) -> bool {
        self.dismissed
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        pub use web::WebHost as Host;
    } else {
        pub use native::NativeHost as Host;
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use super::*;

    /// Desktop host: preferences come from config, the mouse wheel stands in
    /// for page scrolling.
    #[derive(Debug, Default)]
    pub struct NativeHost {
        signals: HostSignals,
        scroll_offset: f32,
    }

    impl NativeHost {
        pub fn new(signals: HostSignals) -> Self {
            Self { signals, scroll_offset: 0.0 }
        }

        pub fn scroll_by(&mut self, delta: f32) {
            self.scroll_offset = (self.scroll_offset + delta).max(0.0);
        }
    }

    impl HostEnvironment for NativeHost {
        fn prefers_reduced_motion(&self) -> bool {
            self.signals.reduced_motion
        }

        fn pointer_is_coarse(&self) -> bool {
            self.signals.coarse_pointer
        }

        fn scroll_offset(&self) -> f32 {
            self.scroll_offset
        }

        fn announce(&self, message: &str) {
            log::info!("Focus: {}", message);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn wheel_scroll_never_goes_negative() {
            let mut host = NativeHost::new(HostSignals::default());
            host.scroll_by(120.0);
            host.scroll_by(-500.0);
            assert_eq!(host.scroll_offset(), 0.0);
            host.scroll_by(40.0);
            assert_eq!(host.scroll_offset(), 40.0);
        }

        #[test]
        fn signals_come_from_config() {
            let host = NativeHost::new(HostSignals { reduced_motion: true, coarse_pointer: false });
            assert!(host.prefers_reduced_motion());
            assert!(!host.pointer_is_coarse());
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod web {
    use super::*;

    pub const HINT_ID: &str = "heroHint";

    /// Browser host backed by `window.matchMedia` and the page scroll position.
    pub struct WebHost {
        window: web_sys::Window,
        /// Config overrides, OR-ed with the media queries.
        signals: HostSignals,
    }

    impl WebHost {
        pub fn new(signals: HostSignals) -> Option<Self> {
            let window = web_sys::window()?;
            Some(Self { window, signals })
        }

        fn media_matches(&self, query: &str) -> bool {
            match self.window.match_media(query) {
                Ok(Some(list)) => list.matches(),
                _ => false,
            }
        }

        pub fn document(&self) -> Option<web_sys::Document> {
            self.window.document()
        }
    }

    impl HostEnvironment for WebHost {
        fn prefers_reduced_motion(&self) -> bool {
            self.signals.reduced_motion || self.media_matches("(prefers-reduced-motion: reduce)")
        }

        fn pointer_is_coarse(&self) -> bool {
            self.signals.coarse_pointer || self.media_matches("(pointer: coarse)")
        }

        fn scroll_offset(&self) -> f32 {
            self.window.scroll_y().unwrap_or(0.0) as f32
        }

        fn dismiss_hint(&self) {
            let Some(hint) = self.document().and_then(|d| d.get_element_by_id(HINT_ID)) else {
                return;
            };
            if let Err(e) = hint.class_list().add_1("hint-hidden") {
                log::warn!("Could not hide hint: {:?}", e);
            }
        }

        fn announce(&self, message: &str) {
            let Some(canvas) = self
                .document()
                .and_then(|d| d.get_element_by_id(crate::NETWORK_CANVAS_ID))
            else {
                return;
            };
            let _ = canvas.set_attribute("aria-label", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[derive(Default)]
    struct CountingHost {
        hint_calls: Cell<u32>,
    }

    impl HostEnvironment for CountingHost {
        fn prefers_reduced_motion(&self) -> bool {
            false
        }

        fn pointer_is_coarse(&self) -> bool {
            false
        }

        fn scroll_offset(&self) -> f32 {
            0.0
        }

        fn dismiss_hint(&self) {
            self.hint_calls.set(self.hint_calls.get() + 1);
        }
    }

    #[test]
    fn hint_is_dismissed_once() {
        let host = CountingHost::default();
        let mut latch = HintLatch::default();
        assert!(!latch.is_dismissed());
        assert!(latch.dismiss(&host));
        assert!(!latch.dismiss(&host));
        assert!(latch.is_dismissed());
        assert_eq!(host.hint_calls.get(), 1);
    }
}

/// Seed for the per-instance RNGs.
#[cfg(target_arch = "wasm32")]
pub fn entropy_seed() -> u64 {
    (js_sys::Math::random() * u64::MAX as f64) as u64
}

/// Seed for the per-instance RNGs.
#[cfg(not(target_arch = "wasm32"))]
pub fn entropy_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5eed)
}
