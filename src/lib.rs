use std::{collections::HashMap, sync::Arc, sync::Mutex, sync::MutexGuard};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
    window::{Window, WindowId},
};
use instant::Instant;
use glam::Vec2;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;
#[cfg(target_arch = "wasm32")]
use winit::event_loop::EventLoopProxy;
#[cfg(target_arch = "wasm32")]
use once_cell::sync::OnceCell;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen_futures::future_to_promise;
#[cfg(target_arch = "wasm32")]
use js_sys::Promise;

pub mod color;
pub mod config;
pub mod error;
pub mod frame;
pub mod host;
pub mod scene;
mod models;
mod camera;
mod ui_events;
mod app_state;

use app_state::State;
use config::Config;
use frame::{FrameBatch, FrameClock};
use host::{HintLatch, Host, HostEnvironment};
use scene::Effect;
use scene::member::Member;
use scene::network::{NetworkKey, RadialNetwork};
use scene::rain::RainField;
use ui_events::UserCommand;

/// Canvas that hosts the binary rain on the page.
pub const RAIN_CANVAS_ID: &str = "binaryCanvas";
/// Canvas that hosts the team network; its `data-members` attribute holds the roster.
pub const NETWORK_CANVAS_ID: &str = "teamNetworkCanvas";

#[cfg(target_arch = "wasm32")]
static WASM_API_INSTANCE: OnceCell<WasmApi> = OnceCell::new();

#[cfg(target_arch = "wasm32")]
static WASM_READY_FLUME_CHANNEL: OnceCell<(flume::Sender<()>, flume::Receiver<()>)> = OnceCell::new();

/// Where an effect draws and what it needs to start.
struct EffectLaunch {
    effect: Effect,
    attributes: winit::window::WindowAttributes,
}

/// One effect together with the window it draws into.
struct EffectView {
    window: Arc<Window>,
    effect: Effect,
    clock: FrameClock,
    batch: FrameBatch,
    state: Arc<Mutex<Option<State>>>, // Filled asynchronously on wasm
    cursor: Option<Vec2>,
}

impl EffectView {
    fn scale_factor(&self) -> f64 {
        self.window.scale_factor().max(1.0)
    }

    fn to_logical(&self, x: f64, y: f64) -> Vec2 {
        let scale = self.scale_factor();
        Vec2::new((x / scale) as f32, (y / scale) as f32)
    }

    fn resize(&mut self, width: u32, height: u32) {
        let scale = self.scale_factor();
        self.effect.resize((width as f64 / scale) as f32, (height as f64 / scale) as f32);
        if let Some(state) = lock_state(&self.state).as_mut() {
            state.resize(width, height, scale);
        }
    }

    fn redraw(&mut self, now_ms: f64, scroll_offset: f32) -> Result<(), wgpu::SurfaceError> {
        let delta = self.clock.tick(now_ms);
        self.effect.set_scroll_offset(scroll_offset);
        self.effect.advance(delta);
        self.effect.draw(&mut self.batch);

        let mut guard = lock_state(&self.state);
        let Some(state) = guard.as_mut() else {
            return Ok(());
        };
        state.update();
        state.upload(&self.batch);
        state.render(&self.batch)
    }
}

fn lock_state(state: &Mutex<Option<State>>) -> MutexGuard<'_, Option<State>> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct App {
    config: Config,
    host: Host,
    views: HashMap<WindowId, EffectView>,
    started: Instant,
    modifiers: ModifiersState,
    hint: HintLatch,
    /// Fonts handed in through the page API, replayed into late renderers.
    fonts: Vec<Vec<u8>>,
    #[cfg(target_arch = "wasm32")]
    proxy: Option<EventLoopProxy<UserCommand>>,
}

impl App {
    fn new(
        config: Config,
        host: Host,
        #[cfg(target_arch = "wasm32")] event_loop: &EventLoop<UserCommand>,
    ) -> Self {
        #[cfg(target_arch = "wasm32")]
        let app_proxy = event_loop.create_proxy();

        #[cfg(target_arch = "wasm32")]
        {
            let wasm_api_instance = WasmApi { proxy: app_proxy.clone() };
            if WASM_API_INSTANCE.set(wasm_api_instance).is_err() {
                log::warn!("WASM_API_INSTANCE was already set. This should only happen once.");
            }
        }

        Self {
            config,
            host,
            views: HashMap::new(),
            started: Instant::now(),
            modifiers: ModifiersState::empty(),
            hint: HintLatch::default(),
            fonts: Vec::new(),
            #[cfg(target_arch = "wasm32")]
            proxy: Some(app_proxy),
        }
    }

    fn now_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    fn rain_effect(&self) -> Effect {
        Effect::Rain(RainField::new(
            self.config.rain.clone(),
            self.host.prefers_reduced_motion(),
            host::entropy_seed(),
        ))
    }

    fn network_effect(&self, members: Vec<Member>) -> Effect {
        Effect::Network(RadialNetwork::new(
            self.config.network.clone(),
            members,
            self.host.prefers_reduced_motion(),
            self.host.pointer_is_coarse(),
        ))
    }

    /// Desktop: one window per effect. The network needs a roster from config.
    #[cfg(not(target_arch = "wasm32"))]
    fn effect_launches(&self) -> Vec<EffectLaunch> {
        use winit::dpi::LogicalSize;

        let mut launches = vec![EffectLaunch {
            effect: self.rain_effect(),
            attributes: Window::default_attributes()
                .with_title("eventfx: binary rain")
                .with_inner_size(LogicalSize::new(960.0, 360.0)),
        }];

        match scene::member::members_from_records(self.config.members.clone()) {
            Ok(members) => launches.push(EffectLaunch {
                effect: self.network_effect(members),
                attributes: Window::default_attributes()
                    .with_title("eventfx: team network")
                    .with_inner_size(LogicalSize::new(520.0, 480.0)),
            }),
            Err(e) => log::warn!("Team network disabled: {}", e),
        }
        launches
    }

    /// Browser: effects bind to their anchor canvases; a missing canvas skips that effect.
    #[cfg(target_arch = "wasm32")]
    fn effect_launches(&self) -> Vec<EffectLaunch> {
        use wasm_bindgen::JsCast;
        use winit::platform::web::WindowAttributesExtWebSys;
        use crate::error::FxError;

        let Some(document) = self.host.document() else {
            log::error!("No document available, effects disabled.");
            return Vec::new();
        };

        let canvas_attributes = |id: &str| -> Result<(web_sys::Element, winit::window::WindowAttributes), FxError> {
            let element = document
                .get_element_by_id(id)
                .ok_or_else(|| FxError::missing_anchor(id))?;
            let canvas = element
                .clone()
                .dyn_into::<web_sys::HtmlCanvasElement>()
                .map_err(|_| FxError::missing_anchor(id))?;
            let attributes = Window::default_attributes()
                .with_canvas(Some(canvas))
                .with_prevent_default(false)
                .with_focusable(true);
            Ok((element, attributes))
        };

        let mut launches = Vec::new();
        match canvas_attributes(RAIN_CANVAS_ID) {
            Ok((_, attributes)) => launches.push(EffectLaunch { effect: self.rain_effect(), attributes }),
            Err(e) => log::warn!("Binary rain skipped: {}", e),
        }
        match canvas_attributes(NETWORK_CANVAS_ID) {
            Ok((element, attributes)) => {
                let claim_keys = Closure::<dyn FnMut(web_sys::KeyboardEvent)>::new(|event: web_sys::KeyboardEvent| {
                    if claims_key(&event.code()) {
                        event.prevent_default();
                    }
                });
                if let Err(e) = element.add_event_listener_with_callback("keydown", claim_keys.as_ref().unchecked_ref()) {
                    log::warn!("Could not capture network keys: {:?}", e);
                }
                // Lives as long as the page.
                claim_keys.forget();
                let members = element
                    .get_attribute("data-members")
                    .map(|raw| scene::member::parse_members_or_empty(&raw))
                    .unwrap_or_default();
                launches.push(EffectLaunch { effect: self.network_effect(members), attributes });
            }
            Err(e) => log::warn!("Team network skipped: {}", e),
        }
        launches
    }

    fn spawn_view(&mut self, event_loop: &ActiveEventLoop, launch: EffectLaunch) -> anyhow::Result<()> {
        let EffectLaunch { mut effect, attributes } = launch;
        let window = Arc::new(event_loop.create_window(attributes)?);
        let window_id = window.id();
        let family = effect.label_family();

        let size = window.inner_size();
        let scale = window.scale_factor().max(1.0);
        effect.resize((size.width as f64 / scale) as f32, (size.height as f64 / scale) as f32);
        log::info!("Starting {} ({}x{} @{})", effect.name(), size.width, size.height, scale);

        let state = Arc::new(Mutex::new(None));

        #[cfg(not(target_arch = "wasm32"))]
        {
            let mut state_instance = pollster::block_on(State::new(window.clone(), family))?;
            state_instance.resize(size.width, size.height, scale);
            for font in &self.fonts {
                state_instance.load_font(font.clone());
            }
            lock_state(&state).replace(state_instance);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let state_arc_for_spawn = state.clone();
            let window_for_state_new = window.clone();
            let Some(proxy_for_init_notification) = self.proxy.clone() else {
                return Err(anyhow::anyhow!("event loop proxy missing"));
            };

            wasm_bindgen_futures::spawn_local(async move {
                match State::new(window_for_state_new.clone(), family).await {
                    Ok(mut state_instance) => {
                        let initial_size = window_for_state_new.inner_size();
                        state_instance.resize(
                            initial_size.width,
                            initial_size.height,
                            window_for_state_new.scale_factor(),
                        );
                        lock_state(&state_arc_for_spawn).replace(state_instance);
                        log::info!("WASM State assigned. Sending initialization notification.");
                        if proxy_for_init_notification.send_event(UserCommand::StateInitialized(window_id)).is_err() {
                            log::error!("Failed to send StateInitialized event.");
                        }
                    }
                    Err(e) => log::error!("Failed to create State in WASM: {:?}", e),
                }
            });
        }

        window.request_redraw();
        self.views.insert(window_id, EffectView {
            window,
            effect,
            clock: FrameClock::new(),
            batch: FrameBatch::default(),
            state,
            cursor: None,
        });
        Ok(())
    }

    fn announce_changes(&mut self) {
        for view in self.views.values_mut() {
            if let Some(message) = view.effect.take_announcement() {
                self.host.announce(&message);
            }
        }
    }
}

fn network_key(code: KeyCode, shift: bool) -> Option<NetworkKey> {
    match code {
        // On a page Tab moves focus out of the canvas.
        KeyCode::Tab if cfg!(target_arch = "wasm32") => None,
        KeyCode::Tab if shift => Some(NetworkKey::FocusPrevious),
        KeyCode::Tab | KeyCode::ArrowRight => Some(NetworkKey::FocusNext),
        KeyCode::ArrowLeft => Some(NetworkKey::FocusPrevious),
        KeyCode::Enter | KeyCode::NumpadEnter | KeyCode::Space => Some(NetworkKey::Activate),
        KeyCode::Escape => Some(NetworkKey::Escape),
        _ => None,
    }
}

/// `KeyboardEvent.code` values whose browser default is suppressed on the
/// network canvas. Tab is left alone.
#[cfg(any(target_arch = "wasm32", test))]
fn claims_key(code: &str) -> bool {
    matches!(code, "ArrowLeft" | "ArrowRight" | "Enter" | "NumpadEnter" | "Space" | "Escape")
}

impl ApplicationHandler<UserCommand> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !self.views.is_empty() {
            return;
        }
        for launch in self.effect_launches() {
            let name = launch.effect.name();
            if let Err(e) = self.spawn_view(event_loop, launch) {
                log::error!("Could not start {}: {:#}", name, e);
            }
        }
        if self.views.is_empty() {
            log::warn!("No effects could be started.");
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: UserCommand) {
        match event {
            UserCommand::StateInitialized(window_id) => {
                log::info!("WASM State initialized and ready.");
                // Signal to the promise resolver
                #[cfg(target_arch = "wasm32")]
                if let Some((sender, _)) = WASM_READY_FLUME_CHANNEL.get() {
                    if let Err(e) = sender.send(()) {
                        log::error!("Failed to send WASM ready signal: {:?}", e);
                    }
                }
                if let Some(view) = self.views.get(&window_id) {
                    if let Some(state) = lock_state(&view.state).as_mut() {
                        for font in &self.fonts {
                            state.load_font(font.clone());
                        }
                    }
                    view.window.request_redraw();
                }
            }
            UserCommand::LoadFont(bytes) => {
                for view in self.views.values() {
                    if let Some(state) = lock_state(&view.state).as_mut() {
                        state.load_font(bytes.clone());
                    }
                }
                self.fonts.push(bytes);
            }
            command => {
                let mut handled = false;
                for view in self.views.values_mut() {
                    if view.effect.process_command(&command) {
                        handled = true;
                        view.window.request_redraw();
                    }
                }
                if !handled {
                    log::warn!("No effect accepted command, ignoring: {:?}", command);
                } else if command.dismisses_hint() {
                    self.hint.dismiss(&self.host);
                }
                self.announce_changes();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let now_ms = self.now_ms();
        let scroll_offset = self.host.scroll_offset();
        let Some(view) = self.views.get_mut(&window_id) else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Closing {}", view.effect.name());
                self.views.remove(&window_id);
                if self.views.is_empty() {
                    event_loop.exit();
                }
                return;
            }
            WindowEvent::Resized(size) => {
                view.resize(size.width, size.height);
                view.window.request_redraw();
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = view.window.inner_size();
                view.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                match view.redraw(now_ms, scroll_offset) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = view.window.inner_size();
                        view.resize(size.width, size.height);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of GPU memory, stopping.");
                        event_loop.exit();
                        return;
                    }
                    Err(e) => log::error!("{:?}", e),
                }
                // Keeps the frame loop going.
                view.window.request_redraw();
            }
            WindowEvent::CursorMoved { position, .. } => {
                let point = view.to_logical(position.x, position.y);
                view.cursor = Some(point);
                view.effect.pointer_moved(point);
            }
            WindowEvent::CursorLeft { .. } => {
                view.cursor = None;
                view.effect.pointer_left();
            }
            WindowEvent::Focused(false) => {
                view.effect.focus_lost();
            }
            WindowEvent::MouseInput { state: ElementState::Pressed, button: MouseButton::Left, .. } => {
                if let Some(point) = view.cursor {
                    view.effect.pointer_pressed(point);
                    if matches!(view.effect, Effect::Rain(_)) {
                        self.hint.dismiss(&self.host);
                    }
                }
            }
            WindowEvent::Touch(Touch { phase: TouchPhase::Started, location, .. }) => {
                let point = view.to_logical(location.x, location.y);
                view.effect.pointer_pressed(point);
                if matches!(view.effect, Effect::Rain(_)) {
                    self.hint.dismiss(&self.host);
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                if key_state.is_pressed() {
                    if let Some(key) = network_key(code, self.modifiers.shift_key()) {
                        view.effect.key_pressed(key);
                    } else if code == KeyCode::KeyR {
                        if let Some(state) = lock_state(&view.state).as_ref() {
                            log::info!("{}: {} fps", view.effect.name(), state.current_fps);
                        }
                    }
                }
            }
            #[cfg(not(target_arch = "wasm32"))]
            WindowEvent::MouseWheel { delta, .. } => {
                // The wheel stands in for page scrolling; down is positive.
                let y_scroll_delta = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y * 40.0,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
                };
                self.host.scroll_by(-y_scroll_delta);
            }
            _ => {}
        }

        self.announce_changes();
    }
}

fn init_logging() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }
    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        // Fails only when a logger is already installed.
        let _ = console_log::init_with_level(log::Level::Info);
    }
}

/// Desktop host preferences come from config; the page supplies its own.
#[cfg(not(target_arch = "wasm32"))]
fn create_host(config: &Config) -> anyhow::Result<Host> {
    Ok(Host::new(config.host.clone()))
}

#[cfg(target_arch = "wasm32")]
fn create_host(config: &Config) -> anyhow::Result<Host> {
    Host::new(config.host.clone()).ok_or_else(|| anyhow::anyhow!("no browser window available"))
}

pub fn run() -> anyhow::Result<()> {
    init_logging();

    #[cfg(not(target_arch = "wasm32"))]
    let config = Config::from_env()?;
    #[cfg(target_arch = "wasm32")]
    let config = Config::default();

    #[cfg(target_arch = "wasm32")]
    {
        log::info!("Starting eventfx.");
        let (sender, receiver) = flume::unbounded();
        if WASM_READY_FLUME_CHANNEL.set((sender, receiver)).is_err() {
            log::warn!("WASM ready channel was already created.");
        }
    }

    let host = create_host(&config)?;
    let event_loop = EventLoop::with_user_event().build()?;
    let mut app = App::new(
        config,
        host,
        #[cfg(target_arch = "wasm32")]
        &event_loop,
    );
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), wasm_bindgen::JsValue> {
    run().map_err(|e| JsValue::from_str(&format!("{e:#}")))
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
#[derive(Clone, Debug)]
pub struct WasmApi {
    proxy: EventLoopProxy<UserCommand>,
}

#[cfg(target_arch = "wasm32")]
impl WasmApi {
    fn send(&self, command: UserCommand) -> Result<(), JsValue> {
        self.proxy
            .send_event(command)
            .map_err(|_| JsValue::from_str("Failed to send command to event loop."))
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
impl WasmApi {
    /// Replaces the roster with a JSON array of `{name, role}`. Invalid or
    /// empty input disables the network and is reported back.
    #[wasm_bindgen(js_name = setMembers)]
    pub fn set_members(&self, members_json: &str) -> Result<(), JsValue> {
        match scene::member::parse_members(members_json) {
            Ok(members) => self.send(UserCommand::SetMembers(members)),
            Err(e) => {
                log::warn!("Rejected member list: {}", e);
                self.send(UserCommand::SetMembers(Vec::new()))?;
                Err(JsValue::from_str(&e.to_string()))
            }
        }
    }

    /// Negative indices clear the selection.
    #[wasm_bindgen(js_name = selectMember)]
    pub fn select_member(&self, index: i32) -> Result<(), JsValue> {
        self.send(UserCommand::SelectMember(usize::try_from(index).ok()))
    }

    #[wasm_bindgen(js_name = clearSelection)]
    pub fn clear_selection(&self) -> Result<(), JsValue> {
        self.send(UserCommand::SelectMember(None))
    }

    /// Impulse at a point in CSS pixels relative to the rain canvas.
    pub fn pulse(&self, x: f32, y: f32) -> Result<(), JsValue> {
        self.send(UserCommand::Pulse(Vec2::new(x, y)))
    }

    #[wasm_bindgen(js_name = loadFont)]
    pub fn load_font(&self, bytes: Vec<u8>) -> Result<(), JsValue> {
        self.send(UserCommand::LoadFont(bytes))
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = getWasmApi)]
pub fn get_wasm_api() -> Result<WasmApi, JsValue> {
    WASM_API_INSTANCE.get()
        .cloned()
        .ok_or_else(|| JsValue::from_str("WasmApi is not initialized. Call run_web() first."))
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = getWasmReadyPromise)]
pub fn get_wasm_ready_promise() -> Result<Promise, JsValue> {
    let (_, receiver) = WASM_READY_FLUME_CHANNEL.get()
        .ok_or_else(|| JsValue::from_str("WASM ready channel is not initialized. Call run_web() first."))?;
    let receiver = receiver.clone();

    // Resolves once the first renderer reports in.
    let ready_promise = future_to_promise(async move {
        receiver
            .recv_async()
            .await
            .map_err(|e| JsValue::from_str(&format!("ready channel closed: {e}")))?;
        Ok(JsValue::NULL)
    });

    Ok(ready_promise)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_network_navigation() {
        assert_eq!(network_key(KeyCode::Tab, false), Some(NetworkKey::FocusNext));
        assert_eq!(network_key(KeyCode::Tab, true), Some(NetworkKey::FocusPrevious));
        assert_eq!(network_key(KeyCode::ArrowRight, true), Some(NetworkKey::FocusNext));
        assert_eq!(network_key(KeyCode::ArrowLeft, false), Some(NetworkKey::FocusPrevious));
        assert_eq!(network_key(KeyCode::Space, false), Some(NetworkKey::Activate));
        assert_eq!(network_key(KeyCode::NumpadEnter, false), Some(NetworkKey::Activate));
        assert_eq!(network_key(KeyCode::Escape, false), Some(NetworkKey::Escape));
        assert_eq!(network_key(KeyCode::KeyR, false), None);
    }

    #[test]
    fn claimed_keys_all_drive_the_network() {
        let codes = [
            ("ArrowLeft", KeyCode::ArrowLeft),
            ("ArrowRight", KeyCode::ArrowRight),
            ("Enter", KeyCode::Enter),
            ("NumpadEnter", KeyCode::NumpadEnter),
            ("Space", KeyCode::Space),
            ("Escape", KeyCode::Escape),
        ];
        for (name, code) in codes {
            assert!(claims_key(name), "{name}");
            assert!(network_key(code, false).is_some(), "{name}");
        }
        assert!(!claims_key("Tab"));
        assert!(!claims_key("KeyR"));
    }
}
