//! The settings hub: one owned settings object, many subscribers.
//!
//! The hub replaces a shared mutable settings global with an explicit owner.
//! Components subscribe and receive [`SettingsEvent`]s over bounded-free
//! channels; publishing walks a snapshot of the current senders, and a peer
//! that has gone away is dropped without disturbing the rest of the fan-out.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::EnhancementParameters;

/// A change broadcast to every subscriber.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingsEvent {
    /// Wholesale replacement of the parameter triple.
    Parameters(EnhancementParameters),
    /// Global enable/disable of enhancement.
    Enabled(bool),
}

/// Owns the current enhancement settings and fans changes out to peers.
pub struct SettingsHub {
    parameters: EnhancementParameters,
    enabled: bool,
    peers: Vec<Sender<SettingsEvent>>,
}

impl SettingsHub {
    pub fn new(parameters: EnhancementParameters) -> Self {
        Self {
            parameters,
            enabled: true,
            peers: Vec::new(),
        }
    }

    pub fn parameters(&self) -> EnhancementParameters {
        self.parameters
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Registers a new subscriber. The receiver sees every event published
    /// after this call; it never sees a half-updated parameter set because
    /// events carry the full value.
    pub fn subscribe(&mut self) -> Receiver<SettingsEvent> {
        let (tx, rx) = unbounded();
        self.peers.push(tx);
        rx
    }

    /// Replaces the parameter triple and notifies all subscribers.
    pub fn replace_parameters(&mut self, parameters: EnhancementParameters) {
        let parameters = parameters.clamped();
        self.parameters = parameters;
        self.publish(SettingsEvent::Parameters(parameters));
    }

    /// Flips the global enable flag and notifies all subscribers.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        self.publish(SettingsEvent::Enabled(enabled));
    }

    fn publish(&mut self, event: SettingsEvent) {
        let mut dead = 0usize;
        // Walk a snapshot; a disconnected peer never aborts delivery to the rest.
        self.peers.retain(|peer| match peer.send(event) {
            Ok(()) => true,
            Err(_) => {
                dead += 1;
                false
            }
        });
        if dead > 0 {
            tracing::debug!(dead, "pruned disconnected settings subscribers");
        }
    }
}

impl Default for SettingsHub {
    fn default() -> Self {
        Self::new(EnhancementParameters::DISABLED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fans_out_to_every_live_subscriber() {
        let mut hub = SettingsHub::default();
        let first = hub.subscribe();
        let second = hub.subscribe();

        let params = EnhancementParameters::new(0.5, 0.3, 0.15);
        hub.replace_parameters(params);

        assert_eq!(first.try_recv().unwrap(), SettingsEvent::Parameters(params));
        assert_eq!(
            second.try_recv().unwrap(),
            SettingsEvent::Parameters(params)
        );
    }

    #[test]
    fn dead_peer_does_not_abort_the_batch() {
        let mut hub = SettingsHub::default();
        let dead = hub.subscribe();
        let live = hub.subscribe();
        drop(dead);

        hub.set_enabled(false);
        assert_eq!(live.try_recv().unwrap(), SettingsEvent::Enabled(false));

        // The dead sender is pruned; later publishes still reach the survivor.
        hub.set_enabled(true);
        assert_eq!(live.try_recv().unwrap(), SettingsEvent::Enabled(true));
    }

    #[test]
    fn replacement_is_wholesale_and_clamped() {
        let mut hub = SettingsHub::default();
        let rx = hub.subscribe();
        hub.replace_parameters(EnhancementParameters {
            debanding: 7.0,
            smoothing: -2.0,
            sharpening: 0.4,
        });
        match rx.try_recv().unwrap() {
            SettingsEvent::Parameters(p) => {
                assert_eq!(p.debanding, 1.0);
                assert_eq!(p.smoothing, 0.0);
                assert_eq!(p.sharpening, 0.4);
                assert_eq!(p, hub.parameters());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn enable_flag_is_edge_triggered() {
        let mut hub = SettingsHub::default();
        let rx = hub.subscribe();
        hub.set_enabled(true);
        assert!(rx.try_recv().is_err(), "already enabled; no event expected");
        hub.set_enabled(false);
        assert_eq!(rx.try_recv().unwrap(), SettingsEvent::Enabled(false));
    }
}
