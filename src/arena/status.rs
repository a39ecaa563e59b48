use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the six driver stations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AllianceStation {
    R1,
    R2,
    R3,
    B1,
    B2,
    B3,
}

impl AllianceStation {
    pub const ALL: [AllianceStation; 6] = [
        AllianceStation::R1,
        AllianceStation::R2,
        AllianceStation::R3,
        AllianceStation::B1,
        AllianceStation::B2,
        AllianceStation::B3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AllianceStation::R1 => "R1",
            AllianceStation::R2 => "R2",
            AllianceStation::R3 => "R3",
            AllianceStation::B1 => "B1",
            AllianceStation::B2 => "B2",
            AllianceStation::B3 => "B3",
        }
    }
}

impl fmt::Display for AllianceStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AllianceStation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|station| station.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown alliance station: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchState {
    #[default]
    PreMatch,
    StartMatch,
    WarmupPeriod,
    AutoPeriod,
    PausePeriod,
    TeleopPeriod,
    PostMatch,
    TimeoutActive,
    PostTimeout,
}

/// Health of one driver station and its robot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StationStatus {
    pub team: Option<u16>,
    pub ds_linked: bool,
    pub radio_linked: bool,
    pub robot_linked: bool,
    pub battery_voltage: f64,
    pub ds_trip_time_ms: u32,
    pub missed_packets: u32,
    pub bypass: bool,
    pub estop: bool,
}

/// Partial station update; `None` fields are left alone
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StationUpdate {
    pub ds_linked: Option<bool>,
    pub radio_linked: Option<bool>,
    pub robot_linked: Option<bool>,
    pub battery_voltage: Option<f64>,
    pub ds_trip_time_ms: Option<u32>,
    pub missed_packets: Option<u32>,
    pub bypass: Option<bool>,
    pub estop: Option<bool>,
}

impl StationUpdate {
    pub fn apply_to(&self, station: &mut StationStatus) {
        if let Some(v) = self.ds_linked {
            station.ds_linked = v;
        }
        if let Some(v) = self.radio_linked {
            station.radio_linked = v;
        }
        if let Some(v) = self.robot_linked {
            station.robot_linked = v;
        }
        if let Some(v) = self.battery_voltage {
            station.battery_voltage = v;
        }
        if let Some(v) = self.ds_trip_time_ms {
            station.ds_trip_time_ms = v;
        }
        if let Some(v) = self.missed_packets {
            station.missed_packets = v;
        }
        if let Some(v) = self.bypass {
            station.bypass = v;
        }
        if let Some(v) = self.estop {
            station.estop = v;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == StationUpdate::default()
    }
}

/// Full, self-contained snapshot of the field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaStatus {
    pub match_number: u32,
    pub match_state: MatchState,
    pub stations: BTreeMap<AllianceStation, StationStatus>,
    pub updated_at: DateTime<Utc>,
}

impl ArenaStatus {
    pub fn station(&self, station: AllianceStation) -> Option<&StationStatus> {
        self.stations.get(&station)
    }

    pub(crate) fn station_mut(&mut self, station: AllianceStation) -> &mut StationStatus {
        self.stations.entry(station).or_default()
    }
}

impl Default for ArenaStatus {
    fn default() -> Self {
        Self {
            match_number: 0,
            match_state: MatchState::default(),
            stations: AllianceStation::ALL
                .into_iter()
                .map(|station| (station, StationStatus::default()))
                .collect(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_parses_case_insensitively() {
        assert_eq!("b3".parse::<AllianceStation>(), Ok(AllianceStation::B3));
        assert_eq!("R1".parse::<AllianceStation>(), Ok(AllianceStation::R1));
        assert!("G1".parse::<AllianceStation>().is_err());
    }

    #[test]
    fn update_touches_only_given_fields() {
        let mut station = StationStatus {
            team: Some(33),
            battery_voltage: 12.1,
            ..StationStatus::default()
        };
        StationUpdate {
            robot_linked: Some(true),
            ..StationUpdate::default()
        }
        .apply_to(&mut station);

        assert!(station.robot_linked);
        assert_eq!(station.team, Some(33));
        assert_eq!(station.battery_voltage, 12.1);
    }

    #[test]
    fn default_status_has_all_stations() {
        let status = ArenaStatus::default();
        assert_eq!(status.stations.len(), 6);
        let json = serde_json::to_value(&status).unwrap();
        assert!(json["stations"]["B2"].is_object());
        assert_eq!(json["match_state"], "pre_match");
    }
}
