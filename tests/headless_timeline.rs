//! Drives both effects frame by frame with synthetic timestamps, the way the
//! event loop does, without opening a window.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_3};

use glam::Vec2;

use eventfx::config::{Config, NetworkConfig, RainConfig};
use eventfx::frame::{FrameBatch, FrameClock};
use eventfx::scene::Effect;
use eventfx::scene::member::{parse_members, parse_members_or_empty};
use eventfx::scene::network::{NetworkKey, RadialNetwork};
use eventfx::scene::node::FocusTarget;
use eventfx::scene::rain::RainField;

const FRAME_MS: f64 = 16.0;

/// Ticks `effect` through `frames` frames starting at `start_ms`, drawing each one.
fn run_frames(effect: &mut Effect, clock: &mut FrameClock, batch: &mut FrameBatch, start_ms: f64, frames: usize) -> f64 {
    let mut now = start_ms;
    for _ in 0..frames {
        now += FRAME_MS;
        let delta = clock.tick(now);
        effect.advance(delta);
        effect.draw(batch);
    }
    now
}

fn rain(width: f32, height: f32) -> Effect {
    let mut effect = Effect::Rain(RainField::new(RainConfig::default(), false, 42));
    effect.resize(width, height);
    effect
}

fn team(json: &str) -> Effect {
    let members = parse_members(json).unwrap();
    let mut network = RadialNetwork::new(NetworkConfig::default(), members, false, false);
    network.layout(600.0, 400.0);
    Effect::Network(network)
}

const SIX: &str = r#"[
    {"name": "Ada", "role": "Lead"},
    {"name": "Brook", "role": "Design"},
    {"name": "Cy", "role": "Venues"},
    {"name": "Dee", "role": "Sponsors"},
    {"name": "Eli", "role": "Tickets"},
    {"name": "Fen", "role": "Ops"}
]"#;

#[test]
fn small_surface_gets_seven_rows_of_alternating_direction() {
    let effect = rain(320.0, 200.0);
    let Effect::Rain(field) = &effect else { unreachable!() };
    assert_eq!(RainField::row_metrics(&RainConfig::default(), 200.0).0, 28.0);
    assert_eq!(field.rows().len(), 7);
    for (i, row) in field.rows().iter().enumerate() {
        assert_eq!(row.direction(), if i % 2 == 0 { 1.0 } else { -1.0 });
        assert!(row.spacing >= 18.0);
        assert!((0.0..row.spacing).contains(&row.offset));
    }
}

#[test]
fn pulse_boost_decays_and_shockwave_expires() {
    let mut effect = rain(320.0, 200.0);
    let mut clock = FrameClock::new();
    let mut batch = FrameBatch::default();

    let Effect::Rain(field) = &effect else { unreachable!() };
    let target_y = field.rows()[3].y;
    effect.pointer_pressed(Vec2::new(160.0, target_y));

    let Effect::Rain(field) = &effect else { unreachable!() };
    let peak = field.rows()[3].boost;
    assert!((peak - 1.2).abs() < 1e-5);
    assert_eq!(field.impulses().len(), 1);

    let mut now = run_frames(&mut effect, &mut clock, &mut batch, 0.0, 1);
    assert!(!batch.overlay_circles.is_empty(), "shockwave ring is drawn");

    let mut previous = peak;
    for _ in 0..40 {
        now = run_frames(&mut effect, &mut clock, &mut batch, now, 1);
        let Effect::Rain(field) = &effect else { unreachable!() };
        let boost = field.rows()[3].boost;
        assert!(boost <= previous);
        previous = boost;
    }

    // boost / 0.8 = 1.5 s, life / 0.9 < 1.2 s
    run_frames(&mut effect, &mut clock, &mut batch, now, 100);
    let Effect::Rain(field) = &effect else { unreachable!() };
    assert!(field.rows().iter().all(|row| row.boost == 0.0));
    assert!(field.impulses().is_empty());
    assert!(batch.overlay_circles.is_empty());
}

#[test]
fn offsets_stay_wrapped_through_a_long_stall() {
    let mut effect = rain(640.0, 480.0);
    let mut clock = FrameClock::new();
    let mut batch = FrameBatch::default();
    effect.set_scroll_offset(4_000.0);
    effect.pointer_pressed(Vec2::new(100.0, 100.0));

    let mut now = run_frames(&mut effect, &mut clock, &mut batch, 0.0, 10);
    // A suspended tab resumes after a minute; the step is capped.
    now += 60_000.0;
    assert_eq!(clock.tick(now).millis, 50.0);
    run_frames(&mut effect, &mut clock, &mut batch, now, 10);

    let Effect::Rain(field) = &effect else { unreachable!() };
    for row in field.rows() {
        assert!(row.offset >= 0.0 && row.offset < row.spacing, "offset {} spacing {}", row.offset, row.spacing);
    }
    assert!(batch.labels.iter().all(|l| l.content == "0" || l.content == "1"));
}

#[test]
fn reduced_motion_rain_only_moves_with_impulses() {
    let mut effect = Effect::Rain(RainField::new(RainConfig::default(), true, 1));
    effect.resize(320.0, 200.0);
    let Effect::Rain(field) = &effect else { unreachable!() };
    let before: Vec<f32> = field.rows().iter().map(|r| r.offset).collect();

    let mut clock = FrameClock::new();
    let mut batch = FrameBatch::default();
    run_frames(&mut effect, &mut clock, &mut batch, 0.0, 30);

    let Effect::Rain(field) = &effect else { unreachable!() };
    let after: Vec<f32> = field.rows().iter().map(|r| r.offset).collect();
    assert!(field.rows().iter().all(|r| r.base_speed == 0.0));
    assert_eq!(before, after);
}

#[test]
fn six_members_sit_at_sixty_degree_steps() {
    let mut effect = team(SIX);
    let Effect::Network(network) = &mut effect else { unreachable!() };
    network.set_base_rotation(-FRAC_PI_2);

    assert!((network.angle_step() - FRAC_PI_3).abs() < 1e-6);
    let geometry = *network.geometry();
    let first = network.node_position(0).unwrap();
    assert!(first.distance(geometry.center - Vec2::new(0.0, geometry.radius)) < 1e-3);
    for i in 0..6 {
        let p = network.node_position(i).unwrap();
        assert!((p.distance(geometry.center) - geometry.radius).abs() < 1e-3);
    }
}

#[test]
fn rotation_advances_and_layout_is_reproducible() {
    let mut a = team(SIX);
    let mut b = team(SIX);
    let mut clock_a = FrameClock::new();
    let mut clock_b = FrameClock::new();
    let mut batch = FrameBatch::default();

    run_frames(&mut a, &mut clock_a, &mut batch, 0.0, 20);
    run_frames(&mut b, &mut clock_b, &mut batch, 0.0, 20);

    let (Effect::Network(a), Effect::Network(b)) = (&a, &b) else { unreachable!() };
    assert!(a.base_rotation() > -FRAC_PI_2);
    assert_eq!(a.base_rotation(), b.base_rotation());
    for i in 0..6 {
        assert_eq!(a.node_position(i), b.node_position(i));
    }
}

#[test]
fn clicking_nodes_keeps_a_single_selection() {
    let mut effect = team(SIX);
    let mut clock = FrameClock::new();
    let mut batch = FrameBatch::default();
    let now = run_frames(&mut effect, &mut clock, &mut batch, 0.0, 5);

    let Effect::Network(network) = &effect else { unreachable!() };
    let second = network.node_position(1).unwrap();
    let fourth = network.node_position(3).unwrap();
    let center = network.geometry().center;

    effect.pointer_pressed(second);
    effect.pointer_pressed(fourth);
    let Effect::Network(network) = &effect else { unreachable!() };
    assert_eq!(network.selected(), Some(3));
    assert_eq!(network.tooltip().map(|t| t.member.name.as_str()), Some("Dee"));

    run_frames(&mut effect, &mut clock, &mut batch, now, 1);
    assert!(batch.labels.iter().any(|l| l.content == "Sponsors"));
    assert_eq!(batch.overlay_circles.len(), 1);

    effect.pointer_pressed(center);
    let Effect::Network(network) = &effect else { unreachable!() };
    assert_eq!(network.selected(), None);
}

#[test]
fn keyboard_walks_hub_then_members() {
    let mut effect = team(SIX);
    effect.key_pressed(NetworkKey::FocusNext);
    assert_eq!(effect.take_announcement().as_deref(), Some("Planning team hub"));

    effect.key_pressed(NetworkKey::FocusNext);
    effect.key_pressed(NetworkKey::Activate);
    let Effect::Network(network) = &effect else { unreachable!() };
    assert_eq!(network.focus(), Some(FocusTarget::Node(0)));
    assert_eq!(network.selected(), Some(0));
    assert_eq!(effect.take_announcement().as_deref(), Some("Ada \u{2014} Lead"));

    effect.key_pressed(NetworkKey::Escape);
    let Effect::Network(network) = &effect else { unreachable!() };
    assert_eq!(network.selected(), None);
}

#[test]
fn malformed_roster_leaves_network_inactive() {
    assert!(parse_members("{not json").is_err());
    assert!(parse_members("[]").is_err());
    let members = parse_members_or_empty("[{\"name\": 3}]");
    let mut network = RadialNetwork::new(NetworkConfig::default(), members, false, false);
    network.layout(400.0, 300.0);
    let mut effect = Effect::Network(network);

    let mut batch = FrameBatch::default();
    run_frames(&mut effect, &mut FrameClock::new(), &mut batch, 0.0, 3);
    assert!(batch.is_empty());
}

#[test]
fn config_members_feed_the_network() {
    let config = Config::from_json(r#"{ "members": [{ "name": "Ada &amp; Co", "role": "Lead" }] }"#).unwrap();
    let members = eventfx::scene::member::members_from_records(config.members).unwrap();
    assert_eq!(members[0].name, "Ada & Co");
}
