use crate::state::ThermostatState;

pub const AC_ON_LABEL: &str = "On";
pub const AC_OFF_LABEL: &str = "Off";
pub const AC_ON_CLASS: &str = "ac-button on";
pub const AC_OFF_CLASS: &str = "ac-button";

const TEMP_PLACEHOLDER: &str = "--";

/// One fully rendered projection of the store. Temperatures carry one
/// decimal place; the AC control carries both its label and its style class.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewFrame {
    pub current_temp: String,
    pub desired_temp: String,
    pub humidity: Option<String>,
    pub ac_label: &'static str,
    pub ac_class: &'static str,
}

pub fn project(state: &ThermostatState) -> ViewFrame {
    let (ac_label, ac_class) = if state.ac_state {
        (AC_ON_LABEL, AC_ON_CLASS)
    } else {
        (AC_OFF_LABEL, AC_OFF_CLASS)
    };
    ViewFrame {
        current_temp: state
            .current_temp
            .map_or_else(|| TEMP_PLACEHOLDER.to_string(), |t| format!("{:.1}", t)),
        desired_temp: format!("{:.1}", state.desired_temp),
        humidity: state.current_humidity.map(|h| format!("{:.1}", h)),
        ac_label,
        ac_class,
    }
}

pub trait ViewSink {
    fn render(&mut self, frame: &ViewFrame);
}

pub struct ConsoleView;

impl ViewSink for ConsoleView {
    fn render(&mut self, frame: &ViewFrame) {
        match &frame.humidity {
            Some(humidity) => println!(
                "current: {}°C  humidity: {}%  desired: {}°C  ac: {}",
                frame.current_temp, humidity, frame.desired_temp, frame.ac_label
            ),
            None => println!(
                "current: {}°C  desired: {}°C  ac: {}",
                frame.current_temp, frame.desired_temp, frame.ac_label
            ),
        }
    }
}
