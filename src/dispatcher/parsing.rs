//! Compiles configuration entries into the binding table and sequence trie.

use std::sync::Arc;

use thiserror::Error;

use crate::bindings::{BindingTable, CommandRef};
use crate::config::{AppConfig, EventBinding, EventKind};
use crate::events::{Button, ButtonsDown, ClassifiedEvent, DecodeError, parse_sequence};
use crate::sequence_matcher::{BindError, SequenceMatcher};

/// A configuration entry that could not be bound. Other entries still bind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigIssue {
    #[error("event #{index}: {message}")]
    InvalidEvent { index: usize, message: String },
    #[error("sequence #{index} {sequence:?}: {source}")]
    InvalidSequence {
        index: usize,
        sequence: String,
        source: DecodeError,
    },
    #[error("sequence #{index} {sequence:?} rejected: {source}")]
    RejectedSequence {
        index: usize,
        sequence: String,
        source: BindError,
    },
    #[error("{kind} #{index} has no command")]
    MissingCommand { kind: &'static str, index: usize },
}

#[derive(Debug, Clone, Default)]
pub struct CompiledTables {
    pub bindings: BindingTable,
    pub sequences: SequenceMatcher,
    pub issues: Vec<ConfigIssue>,
}

/// Resolves the classified event a configured binding triggers on.
pub fn binding_event(binding: &EventBinding) -> Result<ClassifiedEvent, String> {
    let button = || -> Result<Button, String> {
        let name = binding
            .button
            .as_deref()
            .ok_or_else(|| format!("{} requires a button", binding.kind.as_str()))?;
        Button::from_name(name).ok_or_else(|| format!("Unknown button: {}", name))
    };

    Ok(match binding.kind {
        EventKind::MouseUp => ClassifiedEvent::ButtonUp(button()?),
        EventKind::MouseDown => ClassifiedEvent::ButtonDown(button()?),
        EventKind::LongPress => ClassifiedEvent::LongPress(button()?),
        EventKind::ScrollUp => ClassifiedEvent::ScrollUp,
        EventKind::ScrollDown => ClassifiedEvent::ScrollDown,
    })
}

fn command_ref(name: &str) -> Option<CommandRef> {
    let name = name.trim();
    (!name.is_empty()).then(|| Arc::from(name))
}

/// Builds fresh tables from `config`. Invalid entries are skipped and
/// reported in [`CompiledTables::issues`].
pub fn compile(config: &AppConfig) -> CompiledTables {
    let mut tables = CompiledTables::default();

    for (index, binding) in config.events.iter().enumerate() {
        let Some(command) = command_ref(&binding.command) else {
            tables.issues.push(ConfigIssue::MissingCommand { kind: "event", index });
            continue;
        };
        let resolved = binding_event(binding).and_then(|event| {
            ButtonsDown::from_names(&binding.buttons_down).map(|required| (event, required))
        });
        match resolved {
            Ok((event, required)) => tables.bindings.bind(event, required, command),
            Err(message) => tables.issues.push(ConfigIssue::InvalidEvent { index, message }),
        }
    }

    for (index, binding) in config.sequences.iter().enumerate() {
        let Some(command) = command_ref(&binding.command) else {
            tables.issues.push(ConfigIssue::MissingCommand { kind: "sequence", index });
            continue;
        };
        let events = match parse_sequence(&binding.sequence) {
            Ok(events) => events,
            Err(source) => {
                tables.issues.push(ConfigIssue::InvalidSequence {
                    index,
                    sequence: binding.sequence.clone(),
                    source,
                });
                continue;
            }
        };
        if let Err(source) = tables.sequences.bind(&events, command) {
            tables.issues.push(ConfigIssue::RejectedSequence {
                index,
                sequence: binding.sequence.clone(),
                source,
            });
        }
    }

    tables
}
