//! Live arena state and the snapshot provider the display sessions read
//!
//! [`Arena`] owns the current [`ArenaStatus`]. Every mutation publishes
//! [`Topic::Status`] on the hub so connected displays pull a fresh snapshot.

pub mod status;

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;

use crate::hub::{Topic, TopicHub};

pub use status::{AllianceStation, ArenaStatus, MatchState, StationStatus, StationUpdate};

/// Source of full-state snapshots
pub trait SnapshotProvider: Send + Sync {
    /// Current state as an owned, immutable value. Must not mutate anything.
    fn current_state(&self) -> ArenaStatus;
}

/// The field: current status plus the hub used to announce changes
pub struct Arena {
    status: RwLock<ArenaStatus>,
    hub: Arc<TopicHub>,
}

impl Arena {
    pub fn new(hub: Arc<TopicHub>) -> Self {
        Self {
            status: RwLock::new(ArenaStatus::default()),
            hub,
        }
    }

    pub fn hub(&self) -> &Arc<TopicHub> {
        &self.hub
    }

    /// Put a team in a station (or clear it with `None`).
    pub fn assign_team(&self, station: AllianceStation, team: Option<u16>) {
        self.mutate(|status| {
            let slot = status.station_mut(station);
            *slot = StationStatus {
                team,
                ..StationStatus::default()
            };
        });
    }

    /// Apply a partial update to one station; returns the resulting station.
    pub fn update_station(&self, station: AllianceStation, update: &StationUpdate) -> StationStatus {
        self.mutate(|status| {
            let slot = status.station_mut(station);
            update.apply_to(slot);
            slot.clone()
        })
    }

    pub fn set_match_state(&self, state: MatchState, match_number: Option<u32>) {
        self.mutate(|status| {
            status.match_state = state;
            if let Some(number) = match_number {
                status.match_number = number;
            }
        });
    }

    /// Ask every connected display to reload.
    pub fn reload_displays(&self) -> usize {
        self.hub.publish(Topic::Reload)
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut ArenaStatus) -> T) -> T {
        let result = {
            let mut status = self.status.write();
            let result = f(&mut status);
            status.updated_at = Utc::now();
            result
        };
        let delivered = self.hub.publish(Topic::Status);
        debug!(delivered, "arena status changed");
        result
    }
}

impl SnapshotProvider for Arena {
    fn current_state(&self) -> ArenaStatus {
        self.status.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> (Arena, Arc<TopicHub>) {
        let hub = Arc::new(TopicHub::new());
        (Arena::new(hub.clone()), hub)
    }

    #[tokio::test]
    async fn mutations_publish_status() {
        let (arena, hub) = arena();
        let mut listener = hub.subscribe(Topic::Status);

        arena.assign_team(AllianceStation::R1, Some(254));
        arena.set_match_state(MatchState::AutoPeriod, Some(12));

        assert_eq!(listener.try_recv().map(|n| n.sequence), Some(1));
        assert_eq!(listener.try_recv().map(|n| n.sequence), Some(2));
        assert!(listener.try_recv().is_none());
    }

    #[test]
    fn snapshot_is_detached_from_later_updates() {
        let (arena, _hub) = arena();
        arena.assign_team(AllianceStation::B2, Some(1114));
        let before = arena.current_state();

        arena.update_station(
            AllianceStation::B2,
            &StationUpdate {
                robot_linked: Some(true),
                ..StationUpdate::default()
            },
        );

        assert!(!before.station(AllianceStation::B2).unwrap().robot_linked);
        assert!(
            arena
                .current_state()
                .station(AllianceStation::B2)
                .unwrap()
                .robot_linked
        );
    }

    #[test]
    fn assign_team_resets_link_state() {
        let (arena, _hub) = arena();
        arena.update_station(
            AllianceStation::R3,
            &StationUpdate {
                ds_linked: Some(true),
                battery_voltage: Some(12.6),
                ..StationUpdate::default()
            },
        );
        arena.assign_team(AllianceStation::R3, Some(971));

        let station = arena
            .current_state()
            .station(AllianceStation::R3)
            .cloned()
            .unwrap();
        assert_eq!(station.team, Some(971));
        assert!(!station.ds_linked);
        assert_eq!(station.battery_voltage, 0.0);
    }

    #[test]
    fn reload_only_reaches_reload_listeners() {
        let (arena, hub) = arena();
        let mut status = hub.subscribe(Topic::Status);
        let mut reload = hub.subscribe(Topic::Reload);

        assert_eq!(arena.reload_displays(), 1);
        assert!(status.try_recv().is_none());
        assert!(reload.try_recv().is_some());
    }
}
