//! Push channel to the thermostat controller with automatic reconnection.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::state::Snapshot;

/// Delay between losing the connection and the next attempt. Fixed, no
/// backoff growth.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

const EVENT_BUFFER: usize = 16;

pub fn endpoint(addr: &str) -> String {
    format!("ws://{}/ws", addr)
}

#[derive(Clone, Debug)]
pub enum LinkEvent {
    /// Connection established.
    Connected,
    /// A validated state report arrived.
    Snapshot(Snapshot),
    /// Connection lost; a reconnect is scheduled.
    Disconnected,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LinkState {
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Clone, Copy, Debug)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    /// `None` retries forever, assuming eventual network recovery.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            delay: RECONNECT_DELAY,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    fn retries_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(false, |max| attempts >= max)
    }
}

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Could not communicate over push channel: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Handle to the connection task. Dropping it, or calling [`stop`], also
/// cancels a pending reconnect timer.
///
/// [`stop`]: PushChannel::stop
pub struct PushChannel {
    stop_sender: watch::Sender<bool>,
}

impl PushChannel {
    /// Spawns the connection task. Events arrive on the returned receiver;
    /// the stream ends only when the channel is stopped or retries are
    /// exhausted.
    pub fn start(url: String, policy: ReconnectPolicy) -> (PushChannel, mpsc::Receiver<LinkEvent>) {
        let (event_sender, event_receiver) = mpsc::channel(EVENT_BUFFER);
        let (stop_sender, stop_receiver) = watch::channel(false);
        tokio::spawn(connection_loop(url, policy, event_sender, stop_receiver));
        (PushChannel { stop_sender }, event_receiver)
    }

    pub fn stop(&self) {
        if self.stop_sender.send(true).is_err() {
            debug!("push channel task already gone");
        }
    }
}

async fn connection_loop(
    url: String,
    policy: ReconnectPolicy,
    event_sender: mpsc::Sender<LinkEvent>,
    mut stop_receiver: watch::Receiver<bool>,
) {
    let mut attempts = 0u32;
    loop {
        debug!("link {:?}: {}", LinkState::Connecting, url);
        if let Err(e) = run_connection(&url, &event_sender, &mut stop_receiver).await {
            warn!("push channel closed: {}", e);
        }
        if stopped(&stop_receiver) {
            break;
        }
        debug!("link {:?}", LinkState::Disconnected);
        if event_sender.send(LinkEvent::Disconnected).await.is_err() {
            break;
        }

        attempts += 1;
        if policy.retries_exhausted(attempts) {
            warn!(
                "could not reach thermostat controller after {} attempts, giving up",
                attempts
            );
            break;
        }

        // exactly one reconnect attempt per closure, after a fixed delay
        tokio::select! {
            _ = tokio::time::sleep(policy.delay) => {}
            _ = stop_receiver.changed() => {}
        }
        if stopped(&stop_receiver) {
            break;
        }
    }
}

fn stopped(stop_receiver: &watch::Receiver<bool>) -> bool {
    *stop_receiver.borrow() || stop_receiver.has_changed().is_err()
}

/// Runs a single connection to completion. Returns `Ok` on any orderly end
/// (close frame, stream end, stop signal, consumer gone); transport errors
/// bubble up for logging and land in the same reconnect path.
async fn run_connection(
    url: &str,
    event_sender: &mpsc::Sender<LinkEvent>,
    stop_receiver: &mut watch::Receiver<bool>,
) -> Result<(), ChannelError> {
    let (stream, _) = connect_async(url).await?;
    debug!("link {:?}", LinkState::Connected);
    if event_sender.send(LinkEvent::Connected).await.is_err() {
        return Ok(());
    }

    let (mut write, mut read) = stream.split();
    loop {
        tokio::select! {
            message = read.next() => match message {
                Some(Ok(Message::Text(frame))) => match Snapshot::decode(&frame) {
                    Ok(snapshot) => {
                        if event_sender.send(LinkEvent::Snapshot(snapshot)).await.is_err() {
                            return Ok(());
                        }
                    }
                    // bad frame is non-fatal, the connection stays open
                    Err(e) => warn!("dropping frame: {}", e),
                },
                Some(Ok(Message::Ping(payload))) => {
                    let _ = write.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            _ = stop_receiver.changed() => return Ok(()),
        }
    }
}
