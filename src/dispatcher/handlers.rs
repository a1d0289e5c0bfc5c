use std::time::Instant;

use smallvec::SmallVec;

use crate::bindings::CommandRef;
use crate::events::{Button, ClassifiedEvent, DecodeError, PrimitiveEvent};
use crate::sequence_matcher::Advance;

use super::types::*;
use super::Dispatcher;

impl Dispatcher {
    /// Decodes and handles one transport token. Malformed tokens are dropped
    /// without touching any state.
    pub fn on_token(&mut self, token: &str, now: Instant) -> Result<Dispatch, DecodeError> {
        let primitive = PrimitiveEvent::decode(token).inspect_err(|err| {
            tracing::warn!(%err, "dropping transport token");
        })?;
        Ok(self.on_event(primitive, now))
    }

    pub fn on_event(&mut self, primitive: PrimitiveEvent, now: Instant) -> Dispatch {
        let classified = self.tracker.classify(primitive, now);
        tracing::debug!(%primitive, held = self.tracker.held().bits(), "primitive event");

        if primitive == PrimitiveEvent::ButtonUp(Button::Secondary) {
            self.context_menu.reset();
        }

        match classified {
            Some(event) => self.dispatch(event, now),
            None => Dispatch::Suppressed,
        }
    }

    /// Fires every timer whose deadline is at or before `now`, in deadline
    /// order. Returns the dispatch result of each synthesized long press.
    pub fn poll_timers(&mut self, now: Instant) -> SmallVec<[Dispatch; 2]> {
        let mut fired = SmallVec::new();

        while let Some(deadline) = self.next_deadline().filter(|d| *d <= now) {
            if self.sequence_reset.take_due(deadline) {
                tracing::debug!("sequence timed out");
                self.matcher.reset();
                self.recorded.clear();
            } else if self.idle_disconnect.take_due(deadline) {
                self.disconnect();
            } else if let Some(event) = self.tracker.fire_due(deadline) {
                fired.push(self.dispatch(event, deadline));
            } else {
                break;
            }
        }

        fired
    }

    /// Handles a finished command. A successful command that ends with the
    /// secondary button still held asks the page to swallow its context menu.
    pub fn on_settled(&mut self, settled: Settled) {
        match settled.result {
            Ok(()) => {
                if self.tracker.held().is_held(Button::Secondary) {
                    tracing::debug!(command = %settled.command, "suppressing next context menu");
                    self.context_menu.suppress_next();
                }
            }
            Err(err) => {
                tracing::warn!(command = %settled.command, %err, "command failed");
            }
        }
    }

    /// Drains completions that are already available.
    pub fn drain_settled(&mut self) {
        while let Ok(settled) = self.settled_receiver.try_recv() {
            self.on_settled(settled);
        }
    }

    /// Tracks focus. After the configured time without focus all gesture
    /// state is dropped.
    pub fn set_focused(&mut self, focused: bool, now: Instant) {
        self.focused = focused;
        self.idle_disconnect.cancel();
        if !focused && let Some(timeout) = self.no_focus_timeout {
            self.idle_disconnect.arm(now, timeout);
        }
    }

    /// Drops held buttons, timers and sequence progress.
    pub fn disconnect(&mut self) {
        tracing::info!("dropping gesture state");
        self.tracker.reset();
        self.matcher.reset();
        self.sequence_reset.cancel();
        self.recorded.clear();
    }

    fn dispatch(&mut self, event: ClassifiedEvent, now: Instant) -> Dispatch {
        if !self.focused {
            return Dispatch::Unfocused;
        }
        self.sequence_reset.cancel();

        let outcome = match self.mode {
            DispatchMode::Execute => self.execute(event, now),
            DispatchMode::RecordEvents => self.record_event(event),
            DispatchMode::RecordSequence => self.record_sequence(event, now),
        };
        self.drain_settled();
        outcome
    }

    fn execute(&mut self, event: ClassifiedEvent, now: Instant) -> Dispatch {
        if let Some(command) = self.bindings.resolve(event, self.tracker.held()).cloned() {
            self.matcher.reset();
            self.invoke(&command);
            return Dispatch::Binding(command);
        }

        match self.matcher.advance(event) {
            Advance::Completed(command) => {
                self.invoke(&command);
                Dispatch::Sequence(command)
            }
            Advance::Progressed | Advance::Reset => {
                self.sequence_reset.arm(now, self.sequence_timeout);
                tracing::debug!(%event, at_root = self.matcher.is_at_root(), "no command");
                Dispatch::NoMatch
            }
        }
    }

    fn invoke(&self, command: &CommandRef) {
        tracing::info!(%command, "invoking command");
        let completion = Completion::new(command.clone(), self.settled_sender.clone());
        self.invoker.invoke(command, completion);
    }

    fn record_event(&mut self, event: ClassifiedEvent) -> Dispatch {
        let held = self.tracker.held();
        let command = self.bindings.resolve(event, held).cloned();
        self.report(DebugReport::Event {
            event,
            held,
            command,
        });
        Dispatch::Recorded
    }

    fn record_sequence(&mut self, event: ClassifiedEvent, now: Instant) -> Dispatch {
        self.recorded.push(event);
        let command = match self.matcher.advance(event) {
            Advance::Completed(command) => Some(command),
            Advance::Progressed | Advance::Reset => None,
        };
        self.report(DebugReport::Sequence {
            recorded: self.recorded.clone(),
            command,
        });
        self.sequence_reset.arm(now, self.sequence_timeout);
        Dispatch::Recorded
    }

    fn report(&self, report: DebugReport) {
        if let Some(sink) = &self.debug_sink {
            sink.report(report);
        }
    }
}
