use glam::Vec2;
use winit::window::WindowId;

use crate::scene::Effect;
use crate::scene::member::Member;

/// Commands delivered to the event loop through its proxy, from the page
/// API or from async renderer setup.
#[allow(unused)]
#[derive(Debug, Clone)]
pub enum UserCommand {
    /// Replaces the team roster; an empty list disables the network.
    SetMembers(Vec<Member>),
    /// Selects a member by slot, `None` clears.
    SelectMember(Option<usize>),
    /// Starts a rain impulse at a logical point on the rain canvas.
    Pulse(Vec2),
    /// Raw font file bytes for the text renderer.
    LoadFont(Vec<u8>),
    StateInitialized(WindowId), // Notifies App that a window's State setup is complete
}

impl UserCommand {
    /// Commands that count as the visitor interacting with the rain header.
    pub fn dismisses_hint(&self) -> bool {
        matches!(self, UserCommand::Pulse(_))
    }
}

impl Effect {
    /// Applies a command to this effect. Returns false when the command is
    /// meant for another kind of effect or for the renderer.
    pub fn process_command(&mut self, command: &UserCommand) -> bool {
        match (self, command) {
            (Effect::Network(network), UserCommand::SetMembers(members)) => {
                log::info!("Setting {} team members.", members.len());
                network.set_members(members.clone());
                true
            }
            (Effect::Network(network), UserCommand::SelectMember(index)) => {
                network.select(*index);
                true
            }
            (Effect::Rain(rain), UserCommand::Pulse(point)) => {
                rain.register_impulse(*point);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NetworkConfig, RainConfig};
    use crate::scene::network::RadialNetwork;
    use crate::scene::rain::RainField;

    fn network() -> Effect {
        let mut network = RadialNetwork::new(
            NetworkConfig::default(),
            vec![Member::new("Ada", "Lead"), Member::new("Brook", "Design")],
            false,
            false,
        );
        network.layout(400.0, 400.0);
        Effect::Network(network)
    }

    fn rain() -> Effect {
        let mut rain = RainField::new(RainConfig::default(), false, 7);
        rain.layout(320.0, 200.0);
        Effect::Rain(rain)
    }

    #[test]
    fn commands_route_to_matching_effect() {
        let mut rain = rain();
        let mut network = network();

        let pulse = UserCommand::Pulse(Vec2::new(10.0, 20.0));
        assert!(rain.process_command(&pulse));
        assert!(!network.process_command(&pulse));

        let select = UserCommand::SelectMember(Some(1));
        assert!(!rain.process_command(&select));
        assert!(network.process_command(&select));

        assert!(!rain.process_command(&UserCommand::LoadFont(vec![0, 1])));
        assert!(!network.process_command(&UserCommand::LoadFont(vec![0, 1])));

        let Effect::Rain(field) = &rain else { unreachable!() };
        assert_eq!(field.impulses().len(), 1);
        let Effect::Network(net) = &network else { unreachable!() };
        assert_eq!(net.selected(), Some(1));
    }

    #[test]
    fn only_pulses_count_as_interaction() {
        assert!(UserCommand::Pulse(Vec2::ZERO).dismisses_hint());
        assert!(!UserCommand::SelectMember(None).dismisses_hint());
        assert!(!UserCommand::LoadFont(Vec::new()).dismisses_hint());
    }

    #[test]
    fn empty_roster_deactivates_network() {
        let mut network = network();
        network.process_command(&UserCommand::SelectMember(Some(0)));
        network.process_command(&UserCommand::SetMembers(Vec::new()));
        let Effect::Network(net) = &network else { unreachable!() };
        assert!(!net.is_active());
        assert_eq!(net.selected(), None);
    }

    #[test]
    fn out_of_range_selection_clears() {
        let mut network = network();
        network.process_command(&UserCommand::SelectMember(Some(0)));
        network.process_command(&UserCommand::SelectMember(Some(9)));
        let Effect::Network(net) = &network else { unreachable!() };
        assert_eq!(net.selected(), None);
    }
}
