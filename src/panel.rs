use crate::channel::LinkEvent;
use crate::control::{AcToggleAck, ControlClient, ControlError};
use crate::state::{Setpoint, Snapshot, StateStore, SETPOINT_MAX, SETPOINT_MIN};
use crate::view::{self, ViewSink};

/// Reconciles pushed snapshots, optimistic edits and control responses into
/// the store, re-rendering the view after every accepted mutation.
pub struct Panel<V> {
    store: StateStore,
    control: ControlClient,
    view: V,
    link_up: bool,
}

impl<V: ViewSink> Panel<V> {
    pub fn new(control: ControlClient, view: V) -> Panel<V> {
        Panel {
            store: StateStore::new(),
            control,
            view,
            link_up: false,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn link_up(&self) -> bool {
        self.link_up
    }

    pub fn handle_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Connected => {
                self.link_up = true;
                info!("connected to thermostat controller");
            }
            LinkEvent::Disconnected => {
                self.link_up = false;
                warn!("lost connection to thermostat controller, reconnecting");
            }
            LinkEvent::Snapshot(snapshot) => self.apply_snapshot(&snapshot),
        }
    }

    /// Server snapshots always win, even over an optimistic edit still in
    /// flight.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        self.store.apply_snapshot(snapshot);
        self.render();
    }

    /// Nudges the setpoint by `delta`. In-range edits apply and render
    /// before the request goes out; a failed request is logged but never
    /// rolled back, the next snapshot corrects the view instead.
    pub async fn request_setpoint_change(&mut self, delta: f32) {
        let candidate = self.store.state().desired_temp + delta;
        let Some(setpoint) = Setpoint::new(candidate) else {
            info!(
                "setpoint {:.1} out of range ({:.0}-{:.0}), not sending",
                candidate, SETPOINT_MIN, SETPOINT_MAX
            );
            return;
        };

        self.store.set_desired(setpoint);
        self.render();

        match self.control.send_desired_temp(setpoint).await {
            Ok(echo) => debug!("setpoint change acknowledged: {}", echo),
            Err(e) => error!("Could not send desired temperature: {}", e),
        }
    }

    /// Toggles the AC. The switch is never guessed locally; the store only
    /// changes once the controller confirms which state it landed in.
    pub async fn request_ac_toggle(&mut self) {
        match self.control.toggle_ac().await {
            Ok(ack) => self.apply_toggle_ack(ack),
            Err(e) => error!("Could not toggle ac: {}", e),
        }
    }

    pub fn apply_toggle_ack(&mut self, ack: AcToggleAck) {
        match ack.ac_state {
            Some(on) => {
                debug!("ac toggled {}", if on { "on" } else { "off" });
                self.store.set_ac_state(on);
                self.render();
            }
            None => error!("{}", ControlError::MissingAcState),
        }
    }

    fn render(&mut self) {
        let frame = view::project(self.store.state());
        self.view.render(&frame);
    }
}
