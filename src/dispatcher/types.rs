//! Collaborator traits and value types used by the dispatcher.

use crossbeam_channel::Sender;
use thiserror::Error;

use crate::bindings::CommandRef;
use crate::events::{ButtonsDown, ClassifiedEvent, EventSequence};

/// Runs commands by name. Implementations must call [`Completion::settle`]
/// once the command finishes, from any thread, possibly before returning.
pub trait CommandInvoker: Send {
    fn invoke(&self, command: &CommandRef, completion: Completion);
}

/// Page-side collaborator that can swallow the next context menu.
pub trait ContextMenuSink: Send {
    fn suppress_next(&self);
    /// Drops a pending suppression.
    fn reset(&self);
}

/// Observer for record modes. Must not feed back into the dispatcher.
pub trait DebugSink: Send {
    fn report(&self, report: DebugReport);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Resolve and invoke commands.
    #[default]
    Execute,
    /// Report each event and its direct binding without invoking anything.
    RecordEvents,
    /// Report the running sequence and any completed sequence command.
    RecordSequence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugReport {
    Event {
        event: ClassifiedEvent,
        held: ButtonsDown,
        command: Option<CommandRef>,
    },
    Sequence {
        recorded: EventSequence,
        command: Option<CommandRef>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("command {command} failed: {reason}")]
    Failed { command: String, reason: String },
}

/// Outcome of a finished command, delivered back to the processing queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled {
    pub command: CommandRef,
    pub result: Result<(), CommandError>,
}

/// Handle an invoker uses to report that a command has finished.
#[derive(Debug)]
pub struct Completion {
    command: CommandRef,
    sender: Sender<Settled>,
}

impl Completion {
    pub(crate) fn new(command: CommandRef, sender: Sender<Settled>) -> Self {
        Self { command, sender }
    }

    pub fn settle(self, result: Result<(), CommandError>) {
        // The dispatcher may already be gone during shutdown.
        let _ = self.sender.send(Settled {
            command: self.command,
            result,
        });
    }
}

/// What the dispatcher did with one classified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A release swallowed because its long press already fired.
    Suppressed,
    /// No focus; held state was updated but nothing was dispatched.
    Unfocused,
    /// A direct binding fired.
    Binding(CommandRef),
    /// A gesture sequence completed.
    Sequence(CommandRef),
    /// Nothing fired; the sequence reset timer was rearmed.
    NoMatch,
    /// Record mode; reported to the debug sink only.
    Recorded,
}

impl Dispatch {
    pub fn command(&self) -> Option<&CommandRef> {
        match self {
            Dispatch::Binding(command) | Dispatch::Sequence(command) => Some(command),
            _ => None,
        }
    }
}
