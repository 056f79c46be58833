#[macro_use]
extern crate log;

pub mod channel;
pub mod control;
pub mod panel;
pub mod state;
pub mod view;
