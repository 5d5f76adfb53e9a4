//! Team members orbiting a hub, with hover/focus highlight and a single
//! selection that shows a tooltip next to the selected node.

use std::f32::consts::TAU;

use glam::Vec2;

use crate::color::Color;
use crate::config::NetworkConfig;
use crate::frame::{FrameBatch, FrameDelta};
use crate::models::CircleInstance;
use crate::scene::member::Member;
use crate::scene::node::{FocusTarget, HitTarget, MemberNode};
use crate::scene::text_label::{TextAnchor, TextLabel};

const NAME_FONT_SIZE: f32 = 11.0;
const ROLE_FONT_SIZE: f32 = 9.0;
const HUB_FONT_SIZE: f32 = 12.0;
const TOOLTIP_NAME_FONT_SIZE: f32 = 15.0;
const TOOLTIP_ROLE_FONT_SIZE: f32 = 12.0;
const TOOLTIP_GAP: f32 = 12.0;
/// Average advance of a glyph relative to its font size.
const GLYPH_ADVANCE: f32 = 0.6;
const TOOLTIP_PADDING: f32 = 4.0;

/// Container-derived measurements, recomputed on every resize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkGeometry {
    pub width: f32,
    pub height: f32,
    pub center: Vec2,
    pub radius: f32,
    pub hub_radius: f32,
}

impl NetworkGeometry {
    pub fn new(config: &NetworkConfig, container_width: f32, container_height: f32) -> Self {
        let width = container_width.floor().max(config.min_width);
        let height = container_height.floor().max(config.min_height);
        let short_side = width.min(height);
        let [hub_min, hub_max] = config.hub_radius_range;
        Self {
            width,
            height,
            center: Vec2::new(width / 2.0, height / 2.0),
            radius: short_side * config.orbit_ratio,
            hub_radius: (short_side * config.hub_ratio).floor().min(hub_max).max(hub_min),
        }
    }

    /// Point on the orbit at `angle` radians.
    pub fn position(&self, angle: f32) -> Vec2 {
        self.center + self.radius * Vec2::new(angle.cos(), angle.sin())
    }
}

/// Tooltip content and anchor for the selected member.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tooltip<'a> {
    pub index: usize,
    pub member: &'a Member,
    pub anchor: Vec2,
}

/// Keys the diagram reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkKey {
    FocusNext,
    FocusPrevious,
    Activate,
    Escape,
}

pub struct RadialNetwork {
    config: NetworkConfig,
    reduced_motion: bool,
    coarse_pointer: bool,
    nodes: Vec<MemberNode>,
    geometry: NetworkGeometry,
    base_rotation: f32,
    selected: Option<usize>,
    hovered: Option<usize>,
    focus: Option<FocusTarget>,
    announcement: Option<String>,
}

impl RadialNetwork {
    pub fn new(config: NetworkConfig, members: Vec<Member>, reduced_motion: bool, coarse_pointer: bool) -> Self {
        let geometry = NetworkGeometry::new(&config, 0.0, 0.0);
        let base_rotation = config.initial_rotation;
        let mut network = Self {
            config,
            reduced_motion,
            coarse_pointer,
            nodes: Vec::new(),
            geometry,
            base_rotation,
            selected: None,
            hovered: None,
            focus: None,
            announcement: None,
        };
        network.set_members(members);
        network
    }

    /// Replaces the roster. Selection, hover and focus are dropped because
    /// indices no longer refer to the same people.
    pub fn set_members(&mut self, members: Vec<Member>) {
        self.nodes = members
            .into_iter()
            .enumerate()
            .map(|(angle_index, member)| MemberNode { member, angle_index })
            .collect();
        self.selected = None;
        self.hovered = None;
        self.focus = None;
        if self.nodes.is_empty() {
            log::info!("Team network has no members and stays inactive");
        } else {
            log::info!("Team network showing {} members", self.nodes.len());
        }
    }

    /// An empty roster disables the diagram.
    pub fn is_active(&self) -> bool {
        !self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[MemberNode] {
        &self.nodes
    }

    pub fn geometry(&self) -> &NetworkGeometry {
        &self.geometry
    }

    pub fn base_rotation(&self) -> f32 {
        self.base_rotation
    }

    pub fn set_base_rotation(&mut self, rotation: f32) {
        self.base_rotation = rotation;
    }

    pub fn layout(&mut self, container_width: f32, container_height: f32) {
        self.geometry = NetworkGeometry::new(&self.config, container_width, container_height);
        log::debug!(
            "Team network laid out at {}x{}, orbit radius {}",
            self.geometry.width,
            self.geometry.height,
            self.geometry.radius
        );
    }

    pub fn angle_step(&self) -> f32 {
        if self.nodes.is_empty() { 0.0 } else { TAU / self.nodes.len() as f32 }
    }

    pub fn node_angle(&self, index: usize) -> Option<f32> {
        self.nodes
            .get(index)
            .map(|node| self.base_rotation + node.angle_index as f32 * self.angle_step())
    }

    pub fn node_position(&self, index: usize) -> Option<Vec2> {
        self.node_angle(index).map(|angle| self.geometry.position(angle))
    }

    pub fn advance(&mut self, delta: FrameDelta) {
        if self.reduced_motion || !self.is_active() {
            return;
        }
        self.base_rotation += delta.seconds() * self.config.rotation_speed;
    }

    /// Selects `index` exclusively, or clears the selection when `None` or
    /// out of range.
    pub fn select(&mut self, index: Option<usize>) {
        match index.filter(|&i| i < self.nodes.len()) {
            Some(i) => {
                if self.selected != Some(i) {
                    self.announcement = Some(self.nodes[i].member.label());
                }
                self.selected = Some(i);
            }
            None => self.clear_selection(),
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn tooltip(&self) -> Option<Tooltip<'_>> {
        let index = self.selected?;
        Some(Tooltip {
            index,
            member: &self.nodes.get(index)?.member,
            anchor: self.node_position(index)?,
        })
    }

    /// Estimated box around the tooltip text as `(min, max)` corners.
    pub fn tooltip_bounds(&self) -> Option<(Vec2, Vec2)> {
        let tooltip = self.tooltip()?;
        let left = tooltip.anchor.x + self.config.node_radius + TOOLTIP_GAP;
        let name_width = tooltip.member.name.chars().count() as f32 * TOOLTIP_NAME_FONT_SIZE;
        let role_width = tooltip.member.role.chars().count() as f32 * TOOLTIP_ROLE_FONT_SIZE;
        let width = name_width.max(role_width) * GLYPH_ADVANCE;
        let top = tooltip.anchor.y - TOOLTIP_NAME_FONT_SIZE * 1.2;
        let bottom = tooltip.anchor.y + TOOLTIP_ROLE_FONT_SIZE * 1.3;
        Some((
            Vec2::new(left - TOOLTIP_PADDING, top - TOOLTIP_PADDING),
            Vec2::new(left + width + TOOLTIP_PADDING, bottom + TOOLTIP_PADDING),
        ))
    }

    pub fn focus(&self) -> Option<FocusTarget> {
        self.focus
    }

    /// Hover and focus highlight independently; either one lights the node.
    pub fn is_highlighted(&self, index: usize) -> bool {
        self.hovered == Some(index) || self.focus == Some(FocusTarget::Node(index))
    }

    fn pointer_slop(&self) -> f32 {
        if self.coarse_pointer {
            self.config.coarse_pointer_slop
        } else {
            self.config.fine_pointer_slop
        }
    }

    pub fn hit_test(&self, point: Vec2) -> HitTarget {
        if !self.is_active() {
            return HitTarget::Background;
        }
        // The tooltip is drawn over everything else.
        if let Some((min, max)) = self.tooltip_bounds() {
            if point.cmpge(min).all() && point.cmple(max).all() {
                return HitTarget::Tooltip;
            }
        }
        let reach = self.config.node_radius + self.pointer_slop();
        let nearest = (0..self.nodes.len())
            .filter_map(|i| self.node_position(i).map(|p| (i, p.distance(point))))
            .filter(|&(_, dist)| dist <= reach)
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((index, _)) = nearest {
            return HitTarget::Node(index);
        }
        if point.distance(self.geometry.center) <= self.geometry.hub_radius {
            return HitTarget::Hub;
        }
        HitTarget::Background
    }

    pub fn pointer_moved(&mut self, point: Vec2) {
        self.hovered = match self.hit_test(point) {
            HitTarget::Node(index) => Some(index),
            _ => None,
        };
    }

    pub fn pointer_left(&mut self) {
        self.hovered = None;
    }

    /// Clicking a node selects it; the hub and the background clear.
    /// Presses on the tooltip leave the selection alone.
    pub fn pointer_pressed(&mut self, point: Vec2) {
        match self.hit_test(point) {
            HitTarget::Node(index) => self.select(Some(index)),
            HitTarget::Tooltip => {}
            HitTarget::Hub | HitTarget::Background => self.clear_selection(),
        }
    }

    /// Drops keyboard focus and hover when the surface loses focus.
    pub fn clear_focus(&mut self) {
        self.focus = None;
        self.hovered = None;
    }

    pub fn key_pressed(&mut self, key: NetworkKey) {
        if !self.is_active() {
            return;
        }
        match key {
            NetworkKey::FocusNext => self.move_focus(1),
            NetworkKey::FocusPrevious => self.move_focus(-1),
            NetworkKey::Activate => match self.focus {
                Some(FocusTarget::Node(index)) => self.select(Some(index)),
                Some(FocusTarget::Hub) => self.clear_selection(),
                None => {}
            },
            NetworkKey::Escape => self.clear_selection(),
        }
    }

    fn move_focus(&mut self, step: isize) {
        // Tab order: hub, then nodes by slot.
        let stops = self.nodes.len() as isize + 1;
        let current = match self.focus {
            None => if step > 0 { -1 } else { 0 },
            Some(FocusTarget::Hub) => 0,
            Some(FocusTarget::Node(i)) => i as isize + 1,
        };
        let next = (current + step).rem_euclid(stops);
        self.focus = Some(if next == 0 {
            FocusTarget::Hub
        } else {
            FocusTarget::Node(next as usize - 1)
        });
        self.announcement = Some(match self.focus {
            Some(FocusTarget::Node(i)) => self.nodes[i].member.label(),
            _ => "Planning team hub".to_string(),
        });
    }

    /// Text for assistive tech after focus or selection changed.
    pub fn take_announcement(&mut self) -> Option<String> {
        self.announcement.take()
    }

    pub fn draw(&self, batch: &mut FrameBatch) {
        batch.clear_color = Color::BACKGROUND;
        if !self.is_active() {
            return;
        }
        let center: [f32; 2] = self.geometry.center.into();
        let node_radius = self.config.node_radius;

        for index in 0..self.nodes.len() {
            let Some(position) = self.node_position(index) else { continue };
            let link_color = if self.is_highlighted(index) { Color::ACCENT } else { Color::LINK };
            batch.push_line(center, position.into(), link_color);
        }

        batch.circles.push(CircleInstance::disc(
            center,
            self.geometry.hub_radius,
            Color::ACCENT.into_linear_rgba(),
        ));
        if self.focus == Some(FocusTarget::Hub) {
            batch.circles.push(CircleInstance::ring(
                center,
                self.geometry.hub_radius + 4.0,
                2.0,
                Color::LABEL.into_linear_rgba(),
            ));
        }
        batch.labels.push(TextLabel {
            content: self.config.hub_label.clone().into(),
            font_size: HUB_FONT_SIZE,
            position: center,
            color: Color::BACKGROUND.into_srgba_u8(),
            anchor: TextAnchor::Center,
        });

        for (index, node) in self.nodes.iter().enumerate() {
            let Some(position) = self.node_position(index) else { continue };
            let highlighted = self.is_highlighted(index);
            batch.circles.push(CircleInstance::disc(
                position.into(),
                node_radius,
                Color::NODE_FILL.into_linear_rgba(),
            ));
            batch.circles.push(CircleInstance::ring(
                position.into(),
                node_radius,
                if highlighted { 2.5 } else { 1.5 },
                (if highlighted { Color::ACCENT } else { Color::LINK }).into_linear_rgba(),
            ));
            let label_color = if highlighted { Color::ACCENT } else { Color::LABEL };
            batch.labels.push(TextLabel {
                content: node.member.name.clone().into(),
                font_size: NAME_FONT_SIZE,
                position: [position.x, position.y - NAME_FONT_SIZE * 0.2],
                color: label_color.into_srgba_u8(),
                anchor: TextAnchor::Center,
            });
            batch.labels.push(TextLabel {
                content: node.member.role.clone().into(),
                font_size: ROLE_FONT_SIZE,
                position: [position.x, position.y + NAME_FONT_SIZE * 1.1],
                color: label_color.with_alpha(0.8).into_srgba_u8(),
                anchor: TextAnchor::Center,
            });
        }

        if let Some(tooltip) = self.tooltip() {
            batch.overlay_circles.push(CircleInstance::ring(
                tooltip.anchor.into(),
                node_radius + 5.0,
                2.0,
                Color::ACCENT.into_linear_rgba(),
            ));
            let left = tooltip.anchor.x + node_radius + TOOLTIP_GAP;
            batch.labels.push(TextLabel {
                content: tooltip.member.name.clone().into(),
                font_size: TOOLTIP_NAME_FONT_SIZE,
                position: [left, tooltip.anchor.y - TOOLTIP_NAME_FONT_SIZE * 0.6],
                color: Color::ACCENT.into_srgba_u8(),
                anchor: TextAnchor::MiddleLeft,
            });
            batch.labels.push(TextLabel {
                content: tooltip.member.role.clone().into(),
                font_size: TOOLTIP_ROLE_FONT_SIZE,
                position: [left, tooltip.anchor.y + TOOLTIP_ROLE_FONT_SIZE * 0.7],
                color: Color::LABEL.into_srgba_u8(),
                anchor: TextAnchor::MiddleLeft,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_3};

    fn members(n: usize) -> Vec<Member> {
        (0..n).map(|i| Member::new(format!("M{i}"), format!("Role {i}"))).collect()
    }

    fn network(n: usize, reduced_motion: bool) -> RadialNetwork {
        let mut network = RadialNetwork::new(NetworkConfig::default(), members(n), reduced_motion, false);
        network.layout(600.0, 400.0);
        network
    }

    fn close(a: Vec2, b: Vec2) -> bool {
        a.distance(b) < 1e-3
    }

    #[test]
    fn geometry_respects_minimums() {
        let geometry = NetworkGeometry::new(&NetworkConfig::default(), 100.0, 50.0);
        assert_eq!(geometry.width, 320.0);
        assert_eq!(geometry.height, 260.0);
        assert_eq!(geometry.center, Vec2::new(160.0, 130.0));
        assert!((geometry.radius - 260.0 * 0.33).abs() < 1e-4);
        assert_eq!(geometry.hub_radius, 18.0);

        let big = NetworkGeometry::new(&NetworkConfig::default(), 1200.0, 900.0);
        assert_eq!(big.hub_radius, 24.0);
        let mid = NetworkGeometry::new(&NetworkConfig::default(), 800.0, 520.0);
        assert_eq!(mid.hub_radius, 20.0);
    }

    #[test]
    fn six_members_start_at_the_top() {
        let net = network(6, false);
        assert!((net.angle_step() - FRAC_PI_3).abs() < 1e-6);
        assert!((net.base_rotation() + FRAC_PI_2).abs() < 1e-6);
        let g = *net.geometry();
        assert!(close(net.node_position(0).unwrap(), Vec2::new(g.center.x, g.center.y - g.radius)));
        assert!(close(net.node_position(3).unwrap(), Vec2::new(g.center.x, g.center.y + g.radius)));
    }

    #[test]
    fn positions_are_pure() {
        let net = network(5, false);
        for i in 0..5 {
            assert_eq!(net.node_position(i), net.node_position(i));
        }
        assert_eq!(net.node_position(5), None);
    }

    #[test]
    fn rotation_advances_unless_reduced() {
        let mut net = network(4, false);
        net.advance(FrameDelta::from_millis(1000.0));
        assert!((net.base_rotation() - (-FRAC_PI_2 + 0.15)).abs() < 1e-5);

        let mut frozen = network(4, true);
        let before = frozen.node_position(1);
        frozen.advance(FrameDelta::from_millis(1000.0));
        assert_eq!(frozen.node_position(1), before);
    }

    #[test]
    fn selection_is_exclusive() {
        let mut net = network(6, false);
        net.select(Some(1));
        net.select(Some(4));
        assert_eq!(net.selected(), Some(4));
        let tooltip = net.tooltip().unwrap();
        assert_eq!(tooltip.index, 4);
        assert_eq!(tooltip.member.name, "M4");
        assert_eq!(tooltip.member.role, "Role 4");
        assert_eq!(Some(tooltip.anchor), net.node_position(4));
    }

    #[test]
    fn out_of_range_clears() {
        let mut net = network(3, false);
        net.select(Some(2));
        net.select(Some(3));
        assert_eq!(net.selected(), None);
        assert!(net.tooltip().is_none());
    }

    #[test]
    fn tooltip_follows_rotation_and_resize() {
        let mut net = network(6, false);
        net.select(Some(2));
        let before = net.tooltip().unwrap().anchor;
        net.advance(FrameDelta::from_millis(50.0));
        let after = net.tooltip().unwrap().anchor;
        assert!(!close(before, after));
        assert_eq!(Some(after), net.node_position(2));

        net.layout(1000.0, 800.0);
        assert_eq!(net.selected(), Some(2));
        assert_eq!(Some(net.tooltip().unwrap().anchor), net.node_position(2));
    }

    #[test]
    fn clicks_select_nodes_and_clear_elsewhere() {
        let mut net = network(6, true);
        let target = net.node_position(2).unwrap();
        net.pointer_pressed(target + Vec2::new(5.0, -5.0));
        assert_eq!(net.selected(), Some(2));

        net.pointer_pressed(net.geometry().center);
        assert_eq!(net.selected(), None);

        net.select(Some(1));
        net.pointer_pressed(Vec2::new(1.0, 1.0));
        assert_eq!(net.selected(), None);
    }

    #[test]
    fn coarse_pointers_get_more_slop() {
        let config = NetworkConfig::default();
        let mut fine = RadialNetwork::new(config.clone(), members(4), true, false);
        let mut coarse = RadialNetwork::new(config, members(4), true, true);
        fine.layout(600.0, 400.0);
        coarse.layout(600.0, 400.0);
        let edge = fine.node_position(0).unwrap() + Vec2::new(25.0, 0.0);
        assert_eq!(fine.hit_test(edge), HitTarget::Background);
        assert_eq!(coarse.hit_test(edge), HitTarget::Node(0));
    }

    #[test]
    fn hover_and_focus_highlight_independently() {
        let mut net = network(4, true);
        net.pointer_moved(net.node_position(1).unwrap());
        net.key_pressed(NetworkKey::FocusNext); // hub
        net.key_pressed(NetworkKey::FocusNext); // node 0
        assert!(net.is_highlighted(0));
        assert!(net.is_highlighted(1));
        assert!(!net.is_highlighted(2));
        net.pointer_left();
        assert!(!net.is_highlighted(1));
        assert!(net.is_highlighted(0));
    }

    #[test]
    fn keyboard_focus_cycles_and_activates() {
        let mut net = network(3, true);
        net.key_pressed(NetworkKey::FocusPrevious);
        assert_eq!(net.focus(), Some(FocusTarget::Node(2)));
        net.key_pressed(NetworkKey::FocusNext);
        assert_eq!(net.focus(), Some(FocusTarget::Hub));
        assert_eq!(net.take_announcement().as_deref(), Some("Planning team hub"));

        net.key_pressed(NetworkKey::FocusNext);
        net.key_pressed(NetworkKey::Activate);
        assert_eq!(net.selected(), Some(0));
        assert_eq!(net.take_announcement(), Some(net.nodes()[0].member.label()));

        net.key_pressed(NetworkKey::Escape);
        assert_eq!(net.selected(), None);

        net.select(Some(1));
        net.key_pressed(NetworkKey::FocusPrevious); // hub
        net.key_pressed(NetworkKey::Activate);
        assert_eq!(net.selected(), None);
    }

    #[test]
    fn empty_roster_is_inert() {
        let mut net = RadialNetwork::new(NetworkConfig::default(), Vec::new(), false, false);
        net.layout(600.0, 400.0);
        assert!(!net.is_active());
        net.advance(FrameDelta::from_millis(16.0));
        net.key_pressed(NetworkKey::FocusNext);
        assert_eq!(net.focus(), None);
        let mut batch = FrameBatch::default();
        net.draw(&mut batch);
        assert!(batch.is_empty());
    }

    #[test]
    fn draw_covers_links_nodes_and_tooltip() {
        let mut net = network(5, true);
        let mut batch = FrameBatch::default();
        net.draw(&mut batch);
        assert_eq!(batch.lines.len(), 10);
        // hub + fill and outline per node
        assert_eq!(batch.circles.len(), 1 + 10);
        // hub label + name and role per node
        assert_eq!(batch.labels.len(), 1 + 10);
        assert!(batch.overlay_circles.is_empty());

        net.select(Some(3));
        batch.clear();
        net.draw(&mut batch);
        assert_eq!(batch.overlay_circles.len(), 1);
        assert_eq!(batch.labels.len(), 1 + 10 + 2);
        assert!(batch.labels.iter().any(|l| l.content == "M3" && l.anchor == TextAnchor::MiddleLeft));
    }

    #[test]
    fn new_roster_resets_selection() {
        let mut net = network(4, false);
        net.select(Some(3));
        net.set_members(members(2));
        assert_eq!(net.selected(), None);
        assert_eq!(net.nodes().len(), 2);
    }

    #[test]
    fn pressing_the_tooltip_keeps_the_selection() {
        let mut net = network(6, true);
        net.select(Some(2));
        let (min, max) = net.tooltip_bounds().unwrap();
        let anchor = net.node_position(2).unwrap();
        assert!(min.x > anchor.x + net.config.node_radius);

        let inside = (min + max) / 2.0;
        assert_eq!(net.hit_test(inside), HitTarget::Tooltip);
        net.pointer_pressed(inside);
        assert_eq!(net.selected(), Some(2));

        net.pointer_moved(inside);
        assert!(!net.is_highlighted(2));

        net.pointer_pressed(Vec2::new(max.x + 40.0, max.y + 40.0));
        assert_eq!(net.selected(), None);
        assert_eq!(net.tooltip_bounds(), None);
    }

    #[test]
    fn losing_focus_drops_the_highlight() {
        let mut net = network(3, true);
        net.key_pressed(NetworkKey::FocusNext);
        net.key_pressed(NetworkKey::FocusNext);
        net.pointer_moved(net.node_position(1).unwrap());
        assert!(net.is_highlighted(0));
        assert!(net.is_highlighted(1));

        net.clear_focus();
        assert_eq!(net.focus(), None);
        assert!(!net.is_highlighted(0));
        assert!(!net.is_highlighted(1));

        let mut batch = FrameBatch::default();
        net.draw(&mut batch);
        assert!(batch.lines.iter().all(|line| line.color != Color::ACCENT.into_linear_rgba()));
    }
}
