use serde::Deserialize;
use thiserror::Error;

pub const SETPOINT_MIN: f32 = 17.0;
pub const SETPOINT_MAX: f32 = 30.0;

/// Setpoint shown before the first snapshot arrives, matching the
/// controller's own initial value.
pub const PROVISIONAL_SETPOINT: f32 = 22.0;

/// A desired temperature that is guaranteed to lie within the range the
/// controller accepts.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Setpoint(f32);

impl Setpoint {
    pub fn new(value: f32) -> Option<Setpoint> {
        (SETPOINT_MIN..=SETPOINT_MAX)
            .contains(&value)
            .then(|| Setpoint(value))
    }

    pub fn step(self, delta: f32) -> Option<Setpoint> {
        Setpoint::new(self.0 + delta)
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Could not decode snapshot frame: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A complete state report pushed by the controller. All three core fields
/// are required; a frame missing any of them is rejected wholesale.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub current_temp: f32,
    pub desired_temp: f32,
    pub ac_state: bool,
    #[serde(default)]
    pub current_humidity: Option<f32>,
}

impl Snapshot {
    pub fn decode(frame: &str) -> Result<Snapshot, SnapshotError> {
        serde_json::from_str(frame).map_err(SnapshotError::from)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ThermostatState {
    pub current_temp: Option<f32>,
    pub desired_temp: f32,
    pub ac_state: bool,
    pub current_humidity: Option<f32>,
}

/// Owns the last known thermostat state. All mutation goes through here;
/// nothing else in the process holds a copy of these values.
#[derive(Debug)]
pub struct StateStore {
    state: ThermostatState,
}

impl StateStore {
    pub fn new() -> StateStore {
        StateStore {
            state: ThermostatState {
                current_temp: None,
                desired_temp: PROVISIONAL_SETPOINT,
                ac_state: false,
                current_humidity: None,
            },
        }
    }

    pub fn state(&self) -> &ThermostatState {
        &self.state
    }

    /// Overwrites every field with the snapshot's values. Snapshots are
    /// authoritative: an optimistic edit still in flight loses to whichever
    /// write lands last.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        self.state = ThermostatState {
            current_temp: Some(snapshot.current_temp),
            desired_temp: snapshot.desired_temp,
            ac_state: snapshot.ac_state,
            // the controller reports a negative humidity when the sensor
            // read fails
            current_humidity: snapshot.current_humidity.filter(|h| *h >= 0.0),
        };
    }

    pub fn set_desired(&mut self, setpoint: Setpoint) {
        self.state.desired_temp = setpoint.value();
    }

    pub fn set_ac_state(&mut self, on: bool) {
        self.state.ac_state = on;
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        Snapshot {
            current_temp: 21.5,
            desired_temp: 23.0,
            ac_state: false,
            current_humidity: None,
        }
    }

    #[test]
    fn setpoint_steps_within_range() {
        let setpoint = Setpoint::new(22.0).unwrap();
        assert_eq!(setpoint.step(1.0).unwrap().value(), 23.0);
        assert_eq!(setpoint.step(-5.0).unwrap().value(), 17.0);
        assert_eq!(setpoint.step(8.0).unwrap().value(), 30.0);
    }

    #[test]
    fn setpoint_rejects_out_of_range() {
        assert!(Setpoint::new(30.0).unwrap().step(1.0).is_none());
        assert!(Setpoint::new(17.0).unwrap().step(-0.5).is_none());
        assert!(Setpoint::new(16.9).is_none());
        assert!(Setpoint::new(30.1).is_none());
    }

    #[test]
    fn decodes_valid_frame() {
        let snap =
            Snapshot::decode(r#"{"currentTemp":21.5,"desiredTemp":23,"acState":false}"#).unwrap();
        assert_eq!(snap, snapshot());
    }

    #[test]
    fn decodes_controller_extras() {
        let snap = Snapshot::decode(
            r#"{"currentTemp":21.5,"desiredTemp":23,"acState":false,"currentHumidity":55.2,"uptime":123}"#,
        )
        .unwrap();
        assert_eq!(snap.current_humidity, Some(55.2));
    }

    #[test]
    fn rejects_frame_missing_a_field() {
        for frame in [
            r#"{"desiredTemp":23,"acState":false}"#,
            r#"{"currentTemp":21.5,"acState":false}"#,
            r#"{"currentTemp":21.5,"desiredTemp":23}"#,
        ] {
            assert!(Snapshot::decode(frame).is_err(), "accepted {}", frame);
        }
    }

    #[test]
    fn rejects_non_json_frame() {
        assert!(Snapshot::decode("hello").is_err());
    }

    #[test]
    fn store_starts_with_provisional_setpoint() {
        let store = StateStore::new();
        assert_eq!(store.state().current_temp, None);
        assert_eq!(store.state().desired_temp, PROVISIONAL_SETPOINT);
        assert!(!store.state().ac_state);
    }

    #[test]
    fn snapshot_overwrites_every_field() {
        let mut store = StateStore::new();
        store.set_ac_state(true);
        store.apply_snapshot(&snapshot());
        assert_eq!(
            store.state(),
            &ThermostatState {
                current_temp: Some(21.5),
                desired_temp: 23.0,
                ac_state: false,
                current_humidity: None,
            }
        );
    }

    #[test]
    fn snapshot_application_is_idempotent() {
        let mut store = StateStore::new();
        store.apply_snapshot(&snapshot());
        let once = store.state().clone();
        store.apply_snapshot(&snapshot());
        assert_eq!(store.state(), &once);
    }

    #[test]
    fn failed_humidity_reading_is_dropped() {
        let mut store = StateStore::new();
        let mut snap = snapshot();
        snap.current_humidity = Some(-1.0);
        store.apply_snapshot(&snap);
        assert_eq!(store.state().current_humidity, None);
    }
}
