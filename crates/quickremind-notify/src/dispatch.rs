use quickremind_core::WakeEvent;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::receiver::{AlarmReceiver, PushReceiver};

/// Routes [`WakeEvent`]s from the alarm engine and the push boundary to the
/// matching receiver.
pub struct WakeDispatcher {
    alarms: AlarmReceiver,
    push: PushReceiver,
}

impl WakeDispatcher {
    pub fn new(alarms: AlarmReceiver, push: PushReceiver) -> Self {
        Self { alarms, push }
    }

    /// Handle one event. Receiver failures are logged, never propagated.
    pub async fn dispatch(&self, event: WakeEvent) {
        let result = match &event {
            WakeEvent::Alarm(payload) => self.alarms.on_alarm(payload).await,
            WakeEvent::Push(message) => self.push.on_message(message).await,
            WakeEvent::PushToken { token } => {
                self.push.on_new_token(token);
                Ok(true)
            }
        };
        if let Err(e) = result {
            warn!(error = %e, ?event, "wake event not delivered");
        }
    }

    /// Drain `events` until the channel closes or `shutdown` broadcasts `true`.
    pub async fn run(self, mut events: mpsc::Receiver<WakeEvent>, mut shutdown: watch::Receiver<bool>) {
        info!("wake dispatcher started");
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event).await,
                    None => {
                        info!("wake channel closed");
                        break;
                    }
                },
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("wake dispatcher shutting down");
                        break;
                    }
                }
            }
        }
    }
}
