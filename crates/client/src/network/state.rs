// Connection lifecycle state machine
//
//   Disconnected -> Connecting -> Connected -> Disconnected -(delay)-> Connecting ...
//
// Pure: transport callbacks are turned into `TransportEvent`s and the
// returned `Action`s are carried out by the browser glue. Every transport
// gets an epoch so late callbacks from a replaced socket are ignored.
use protocol::{decode_snapshot, ProtocolError, ProtocolVariant, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened { epoch: u32 },
    Message { epoch: u32, data: Vec<u8> },
    Errored { epoch: u32 },
    Closed { epoch: u32, code: u16 },
    /// The reconnect delay elapsed.
    ReconnectDue,
    /// The viewer is being torn down.
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Open a new transport tagged with `epoch`.
    Open { epoch: u32 },
    /// Close the current transport.
    Close,
    ScheduleReconnect { delay_ms: u32 },
    CancelReconnect,
    /// Show or clear the connection indicator.
    Indicator(bool),
    Present(Snapshot),
    /// A message failed to decode and was dropped.
    Discard(ProtocolError),
}

#[derive(Debug)]
pub struct ConnectionManager {
    state: ConnectionState,
    variant: ProtocolVariant,
    reconnect_delay_ms: u32,
    epoch: u32,
    reconnect_pending: bool,
    shut_down: bool,
    attempts: u64,
}

impl ConnectionManager {
    pub fn new(variant: ProtocolVariant, reconnect_delay_ms: u32) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            variant,
            reconnect_delay_ms,
            epoch: 0,
            reconnect_pending: false,
            shut_down: false,
            attempts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Connection attempts made so far, including the first.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Begin connecting. No-op unless disconnected and not shut down.
    pub fn start(&mut self) -> Vec<Action> {
        if self.shut_down || self.state != ConnectionState::Disconnected {
            return Vec::new();
        }
        self.epoch = self.epoch.wrapping_add(1);
        self.attempts += 1;
        self.state = ConnectionState::Connecting;
        vec![Action::Open { epoch: self.epoch }]
    }

    pub fn handle(&mut self, event: TransportEvent) -> Vec<Action> {
        match event {
            TransportEvent::Opened { epoch } if self.is_current(epoch) => {
                if self.state != ConnectionState::Connecting {
                    return Vec::new();
                }
                self.state = ConnectionState::Connected;
                vec![Action::Indicator(true)]
            }
            TransportEvent::Message { epoch, data } if self.is_current(epoch) => {
                if self.state != ConnectionState::Connected {
                    return Vec::new();
                }
                match decode_snapshot(&data, self.variant) {
                    Ok(snapshot) => vec![Action::Present(snapshot)],
                    Err(err) => vec![Action::Discard(err)],
                }
            }
            TransportEvent::Errored { epoch } if self.is_current(epoch) => {
                if self.state == ConnectionState::Disconnected {
                    return Vec::new();
                }
                let mut actions = vec![Action::Close];
                actions.extend(self.disconnect());
                actions
            }
            TransportEvent::Closed { epoch, .. } if self.is_current(epoch) => {
                if self.state == ConnectionState::Disconnected {
                    return Vec::new();
                }
                self.disconnect()
            }
            TransportEvent::ReconnectDue => {
                self.reconnect_pending = false;
                self.start()
            }
            TransportEvent::Shutdown => self.shutdown(),
            // Stale epoch.
            _ => Vec::new(),
        }
    }

    #[inline]
    fn is_current(&self, epoch: u32) -> bool {
        epoch == self.epoch
    }

    fn disconnect(&mut self) -> Vec<Action> {
        self.state = ConnectionState::Disconnected;
        let mut actions = vec![Action::Indicator(false)];
        if !self.shut_down && !self.reconnect_pending {
            self.reconnect_pending = true;
            actions.push(Action::ScheduleReconnect {
                delay_ms: self.reconnect_delay_ms,
            });
        }
        actions
    }

    fn shutdown(&mut self) -> Vec<Action> {
        if self.shut_down {
            return Vec::new();
        }
        self.shut_down = true;
        let mut actions = Vec::new();
        if self.reconnect_pending {
            self.reconnect_pending = false;
            actions.push(Action::CancelReconnect);
        }
        if self.state != ConnectionState::Disconnected {
            actions.push(Action::Close);
        }
        self.state = ConnectionState::Disconnected;
        actions.push(Action::Indicator(false));
        actions
    }
}

#[cfg(test)]
impl ConnectionManager {
    pub fn epoch(&self) -> u32 {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use protocol::{encode_snapshot, Food};

    fn connected() -> ConnectionManager {
        let mut m = ConnectionManager::new(ProtocolVariant::Full, 2000);
        assert_eq!(m.start(), vec![Action::Open { epoch: 1 }]);
        assert_eq!(m.state(), ConnectionState::Connecting);
        assert_eq!(
            m.handle(TransportEvent::Opened { epoch: 1 }),
            vec![Action::Indicator(true)]
        );
        assert_eq!(m.state(), ConnectionState::Connected);
        m
    }

    #[test]
    fn close_schedules_a_reconnect_after_the_fixed_delay() {
        let mut m = connected();
        assert_eq!(
            m.handle(TransportEvent::Closed { epoch: 1, code: 1006 }),
            vec![
                Action::Indicator(false),
                Action::ScheduleReconnect { delay_ms: 2000 }
            ]
        );
        assert_eq!(m.state(), ConnectionState::Disconnected);
        assert_eq!(
            m.handle(TransportEvent::ReconnectDue),
            vec![Action::Open { epoch: 2 }]
        );
        assert_eq!(m.state(), ConnectionState::Connecting);
    }

    #[test]
    fn retries_forever_with_the_same_delay() {
        let mut m = ConnectionManager::new(ProtocolVariant::Full, 2000);
        m.start();
        for attempt in 1..=500u32 {
            let actions = m.handle(TransportEvent::Closed {
                epoch: attempt,
                code: 1006,
            });
            assert!(actions.contains(&Action::ScheduleReconnect { delay_ms: 2000 }));
            assert_eq!(
                m.handle(TransportEvent::ReconnectDue),
                vec![Action::Open { epoch: attempt + 1 }]
            );
        }
        assert_eq!(m.attempts(), 501);
    }

    #[test]
    fn error_forces_a_close_and_the_following_close_is_not_double_scheduled() {
        let mut m = connected();
        assert_eq!(
            m.handle(TransportEvent::Errored { epoch: 1 }),
            vec![
                Action::Close,
                Action::Indicator(false),
                Action::ScheduleReconnect { delay_ms: 2000 }
            ]
        );
        assert!(m.handle(TransportEvent::Closed { epoch: 1, code: 1006 }).is_empty());
    }

    #[test]
    fn failure_while_connecting_also_reconnects() {
        let mut m = ConnectionManager::new(ProtocolVariant::Full, 750);
        m.start();
        let actions = m.handle(TransportEvent::Closed { epoch: 1, code: 1006 });
        assert!(actions.contains(&Action::ScheduleReconnect { delay_ms: 750 }));
    }

    #[test]
    fn messages_are_decoded_in_order_while_connected() {
        let mut m = connected();
        let snapshot = protocol::Snapshot {
            creatures: Vec::new(),
            food: vec![Food {
                position: Vec2::new(1.0, 2.0),
            }],
        };
        let data = encode_snapshot(&snapshot, ProtocolVariant::Full).unwrap().finish().to_vec();
        assert_eq!(
            m.handle(TransportEvent::Message { epoch: 1, data }),
            vec![Action::Present(snapshot)]
        );
    }

    #[test]
    fn malformed_message_is_discarded_and_connection_survives() {
        let mut m = connected();
        let actions = m.handle(TransportEvent::Message {
            epoch: 1,
            data: vec![5, 0, 1],
        });
        assert!(matches!(
            actions.as_slice(),
            [Action::Discard(ProtocolError::MalformedSnapshot { .. })]
        ));
        assert_eq!(m.state(), ConnectionState::Connected);

        let ok = m.handle(TransportEvent::Message {
            epoch: 1,
            data: vec![0, 0],
        });
        assert_eq!(ok, vec![Action::Present(protocol::Snapshot::default())]);
    }

    #[test]
    fn stale_transport_events_are_ignored() {
        let mut m = connected();
        m.handle(TransportEvent::Closed { epoch: 1, code: 1000 });
        m.handle(TransportEvent::ReconnectDue);
        assert_eq!(m.epoch(), 2);

        assert!(m.handle(TransportEvent::Opened { epoch: 1 }).is_empty());
        assert!(m.handle(TransportEvent::Errored { epoch: 1 }).is_empty());
        assert!(m.handle(TransportEvent::Closed { epoch: 1, code: 1000 }).is_empty());
        assert_eq!(m.state(), ConnectionState::Connecting);

        assert!(m.handle(TransportEvent::Message {
            epoch: 2,
            data: vec![0, 0],
        })
        .is_empty());
    }

    #[test]
    fn shutdown_cancels_the_pending_reconnect() {
        let mut m = connected();
        m.handle(TransportEvent::Closed { epoch: 1, code: 1006 });
        assert_eq!(
            m.handle(TransportEvent::Shutdown),
            vec![Action::CancelReconnect, Action::Indicator(false)]
        );
        assert!(m.handle(TransportEvent::ReconnectDue).is_empty());
        assert!(m.start().is_empty());
    }

    #[test]
    fn shutdown_while_connected_closes_without_rescheduling() {
        let mut m = connected();
        assert_eq!(
            m.handle(TransportEvent::Shutdown),
            vec![Action::Close, Action::Indicator(false)]
        );
        assert!(m.handle(TransportEvent::Closed { epoch: 1, code: 1000 }).is_empty());
        assert!(m.handle(TransportEvent::Shutdown).is_empty());
    }
}
