//! Event dispatching: classification, direct bindings and gesture sequences.
//!
//! The [`Dispatcher`] owns all mutable gesture state. It is driven from a
//! single queue (see [`crate::engine`]) and never blocks: commands report
//! completion through a channel and timers are deadlines polled by the owner.

pub mod handlers;
pub mod parsing;
pub mod types;

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use crate::bindings::BindingTable;
use crate::config::AppConfig;
use crate::events::{ButtonsDown, EventSequence};
use crate::sequence_matcher::SequenceMatcher;
use crate::timer::{Timer, earliest};
use crate::tracker::ButtonStateTracker;

pub use parsing::{CompiledTables, ConfigIssue, compile};
pub use types::*;

pub const EVENT_SEQUENCE_TIMEOUT: Duration = Duration::from_millis(350);

pub struct Dispatcher {
    tracker: ButtonStateTracker,
    bindings: BindingTable,
    matcher: SequenceMatcher,
    sequence_reset: Timer,
    idle_disconnect: Timer,
    sequence_timeout: Duration,
    no_focus_timeout: Option<Duration>,
    focused: bool,
    mode: DispatchMode,
    recorded: EventSequence,
    invoker: Box<dyn CommandInvoker>,
    context_menu: Box<dyn ContextMenuSink>,
    debug_sink: Option<Box<dyn DebugSink>>,
    settled_sender: Sender<Settled>,
    settled_receiver: Receiver<Settled>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("held", &self.tracker.held())
            .field("bindings", &self.bindings.len())
            .field("sequences", &self.matcher.len())
            .field("focused", &self.focused)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        config: &AppConfig,
        invoker: Box<dyn CommandInvoker>,
        context_menu: Box<dyn ContextMenuSink>,
    ) -> Self {
        let (settled_sender, settled_receiver) = crossbeam_channel::unbounded();

        let mut dispatcher = Self {
            tracker: ButtonStateTracker::new(config.long_press_duration()),
            bindings: BindingTable::new(),
            matcher: SequenceMatcher::new(),
            sequence_reset: Timer::new(),
            idle_disconnect: Timer::new(),
            sequence_timeout: config.sequence_timeout(),
            no_focus_timeout: config.no_focus_timeout(),
            focused: true,
            mode: DispatchMode::Execute,
            recorded: EventSequence::new(),
            invoker,
            context_menu,
            debug_sink: None,
            settled_sender,
            settled_receiver,
        };
        dispatcher.reload(config);
        dispatcher
    }

    pub fn with_debug_sink(mut self, sink: Box<dyn DebugSink>) -> Self {
        self.debug_sink = Some(sink);
        self
    }

    /// Replaces the binding table and sequence matcher wholesale. Held
    /// buttons survive; partial sequence progress does not.
    pub fn reload(&mut self, config: &AppConfig) -> Vec<ConfigIssue> {
        let CompiledTables {
            bindings,
            sequences,
            issues,
        } = compile(config);

        for issue in &issues {
            tracing::warn!(%issue, "skipping configuration entry");
        }
        tracing::info!(
            bindings = bindings.len(),
            sequences = sequences.len(),
            "bindings loaded"
        );

        self.bindings = bindings;
        self.matcher = sequences;
        self.sequence_reset.cancel();
        self.recorded.clear();
        self.tracker
            .set_long_press_duration(config.long_press_duration());
        self.sequence_timeout = config.sequence_timeout();
        self.no_focus_timeout = config.no_focus_timeout();
        issues
    }

    /// Receiver of command completions; the owner's queue selects on it.
    pub fn settled_receiver(&self) -> Receiver<Settled> {
        self.settled_receiver.clone()
    }

    #[inline(always)]
    pub fn held(&self) -> ButtonsDown {
        self.tracker.held()
    }

    pub fn tracker(&self) -> &ButtonStateTracker {
        &self.tracker
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn sequences(&self) -> &SequenceMatcher {
        &self.matcher
    }

    #[inline(always)]
    pub fn is_sequence_at_root(&self) -> bool {
        self.matcher.is_at_root()
    }

    pub fn is_sequence_reset_pending(&self) -> bool {
        self.sequence_reset.is_armed()
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Switches mode, discarding partial sequence progress.
    pub fn set_mode(&mut self, mode: DispatchMode) {
        if self.mode != mode {
            tracing::debug!(?mode, "dispatch mode changed");
        }
        self.mode = mode;
        self.matcher.reset();
        self.sequence_reset.cancel();
        self.recorded.clear();
    }

    /// Earliest pending timer across the tracker and the dispatcher.
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest(
            self.tracker.next_deadline(),
            earliest(self.sequence_reset.deadline(), self.idle_disconnect.deadline()),
        )
    }
}
