//! Single-threaded processing queue around a [`Dispatcher`].
//!
//! Every inbound message, command completion and timer expiry is handled on
//! one dedicated thread in arrival order, so the dispatcher never needs locks.

use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender, select};

use crate::config::AppConfig;
use crate::dispatcher::{DispatchMode, Dispatcher};
use crate::events::PrimitiveEvent;
use crate::wire::InboundMessage;

#[derive(Debug)]
pub enum EngineMessage {
    Token(String),
    Inbound(InboundMessage),
    Event(PrimitiveEvent),
    Reload(Box<AppConfig>),
    Focus(bool),
    Mode(DispatchMode),
    Shutdown,
}

pub struct Engine {
    sender: Sender<EngineMessage>,
    thread: Option<JoinHandle<()>>,
}

impl Engine {
    pub fn spawn(dispatcher: Dispatcher) -> Result<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let thread = thread::Builder::new()
            .name("dispatch_thread".to_string())
            .spawn(move || run(dispatcher, receiver))
            .map_err(|e| anyhow::anyhow!("Failed to start dispatch thread: {}", e))?;

        Ok(Self {
            sender,
            thread: Some(thread),
        })
    }

    /// Handle for producers on other threads.
    pub fn sender(&self) -> Sender<EngineMessage> {
        self.sender.clone()
    }

    /// Queues a message. Returns `false` once the engine has stopped.
    pub fn send(&self, message: EngineMessage) -> bool {
        self.sender.send(message).is_ok()
    }

    #[inline]
    pub fn send_token(&self, token: impl Into<String>) -> bool {
        self.send(EngineMessage::Token(token.into()))
    }

    /// Swaps in new bindings; events already queued see the old tables.
    pub fn reload(&self, config: AppConfig) -> bool {
        self.send(EngineMessage::Reload(Box::new(config)))
    }

    /// Stops the queue after everything already sent and waits for it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.sender.send(EngineMessage::Shutdown);
            if thread.join().is_err() {
                tracing::error!("dispatch thread panicked");
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(mut dispatcher: Dispatcher, receiver: Receiver<EngineMessage>) {
    let settled = dispatcher.settled_receiver();
    tracing::debug!("dispatch thread started");

    loop {
        let timeout = match dispatcher.next_deadline() {
            Some(deadline) => crossbeam_channel::at(deadline),
            None => crossbeam_channel::never(),
        };

        select! {
            recv(receiver) -> message => {
                let Ok(message) = message else { break };
                let now = Instant::now();
                // Timers that elapsed before this message arrived go first.
                dispatcher.poll_timers(now);
                if !handle(&mut dispatcher, message, now) {
                    break;
                }
            }
            recv(settled) -> result => {
                if let Ok(result) = result {
                    dispatcher.on_settled(result);
                }
            }
            recv(timeout) -> _ => {
                dispatcher.poll_timers(Instant::now());
            }
        }
    }

    tracing::debug!("dispatch thread stopped");
}

fn handle(dispatcher: &mut Dispatcher, message: EngineMessage, now: Instant) -> bool {
    match message {
        EngineMessage::Token(token) => {
            let _ = dispatcher.on_token(&token, now);
        }
        EngineMessage::Inbound(inbound) => match inbound.into_primitive() {
            Ok(primitive) => {
                dispatcher.on_event(primitive, now);
            }
            Err(err) => tracing::warn!(%err, "dropping inbound message"),
        },
        EngineMessage::Event(primitive) => {
            dispatcher.on_event(primitive, now);
        }
        EngineMessage::Reload(config) => {
            dispatcher.reload(&config);
        }
        EngineMessage::Focus(focused) => dispatcher.set_focused(focused, now),
        EngineMessage::Mode(mode) => dispatcher.set_mode(mode),
        EngineMessage::Shutdown => return false,
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::CommandRef;
    use crate::config::{EventBinding, EventKind, SequenceBinding};
    use crate::dispatcher::{CommandInvoker, Completion, ContextMenuSink};
    use std::time::Duration;

    struct ChannelInvoker(Sender<String>);

    impl CommandInvoker for ChannelInvoker {
        fn invoke(&self, command: &CommandRef, completion: Completion) {
            let _ = self.0.send(command.to_string());
            completion.settle(Ok(()));
        }
    }

    struct NoMenu;

    impl ContextMenuSink for NoMenu {
        fn suppress_next(&self) {}
        fn reset(&self) {}
    }

    fn engine() -> (Engine, Receiver<String>) {
        let config = AppConfig {
            long_press_ms: 60,
            sequence_timeout_ms: 200,
            events: vec![EventBinding {
                kind: EventKind::LongPress,
                button: Some("secondary".to_string()),
                buttons_down: vec![],
                command: "reloadPage".to_string(),
            }],
            sequences: vec![SequenceBinding {
                sequence: "s1,s0".to_string(),
                command: "resetZoom".to_string(),
            }],
            ..AppConfig::default()
        };
        let (tx, rx) = crossbeam_channel::unbounded();
        let dispatcher = Dispatcher::new(&config, Box::new(ChannelInvoker(tx)), Box::new(NoMenu));
        (Engine::spawn(dispatcher).unwrap(), rx)
    }

    #[test]
    fn test_long_press_fires_from_timer() {
        let (engine, commands) = engine();
        assert!(engine.send_token("c12"));

        let fired = commands.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(fired, "reloadPage");

        engine.send_token("c02");
        engine.shutdown();
        assert!(commands.try_recv().is_err());
    }

    #[test]
    fn test_sequence_through_queue() {
        let (engine, commands) = engine();
        engine.send(EngineMessage::Inbound(InboundMessage::Token("s1".into())));
        engine.send(EngineMessage::Event(PrimitiveEvent::ScrollDown));

        let fired = commands.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(fired, "resetZoom");
        engine.shutdown();
    }

    #[test]
    fn test_send_after_shutdown_fails() {
        let (engine, _commands) = engine();
        let sender = engine.sender();
        engine.shutdown();
        assert!(sender.send(EngineMessage::Focus(false)).is_err());
    }
}
