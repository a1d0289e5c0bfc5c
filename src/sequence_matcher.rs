//! Sequence matching for multi-event mouse gestures.
//!
//! Bound sequences are compiled into a trie. Matching walks one event at a
//! time from the root; a mismatch discards the partial progress and a
//! completed path fires its command and returns to the root.

use thiserror::Error;

use crate::bindings::CommandRef;
use crate::events::{ClassifiedEvent, EVENT_COUNT};

pub const MAX_SEQUENCE_LENGTH: usize = 16;

const ROOT: usize = 0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("sequence cannot be empty")]
    EmptySequence,
    #[error("sequence too long (max {MAX_SEQUENCE_LENGTH} events)")]
    TooLong,
    #[error("sequence overlaps a shorter or longer bound sequence")]
    AmbiguousPrefix,
    #[error("sequence is already bound")]
    AlreadyBound,
}

#[derive(Debug, Clone)]
enum Node {
    Continuation([Option<usize>; EVENT_COUNT]),
    Terminal(CommandRef),
}

/// Result of feeding one event to the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Moved further along a bound sequence.
    Progressed,
    /// No bound sequence continues with this event; back at the root.
    Reset,
    /// A sequence completed. The matcher is back at the root.
    Completed(CommandRef),
}

#[derive(Debug, Clone)]
pub struct SequenceMatcher {
    nodes: Vec<Node>,
    current: usize,
    bound: usize,
}

impl SequenceMatcher {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::Continuation([None; EVENT_COUNT])],
            current: ROOT,
            bound: 0,
        }
    }

    #[inline(always)]
    fn child(&self, node: usize, event: ClassifiedEvent) -> Option<usize> {
        match &self.nodes[node] {
            Node::Continuation(children) => children[event.ordinal()],
            Node::Terminal(_) => None,
        }
    }

    fn attach(&mut self, parent: usize, event: ClassifiedEvent, node: Node) -> usize {
        let id = self.nodes.len();
        self.nodes.push(node);
        if let Node::Continuation(children) = &mut self.nodes[parent] {
            children[event.ordinal()] = Some(id);
        }
        id
    }

    /// Binds `sequence` to `command`. On error the matcher is left untouched;
    /// the first bound of two overlapping sequences keeps its place.
    pub fn bind(&mut self, sequence: &[ClassifiedEvent], command: CommandRef) -> Result<(), BindError> {
        let (&last, prefix) = sequence.split_last().ok_or(BindError::EmptySequence)?;
        if sequence.len() > MAX_SEQUENCE_LENGTH {
            return Err(BindError::TooLong);
        }

        let mut node = ROOT;
        let mut depth = 0;
        while depth < prefix.len() {
            match self.child(node, prefix[depth]) {
                Some(id) if matches!(self.nodes[id], Node::Terminal(_)) => {
                    return Err(BindError::AmbiguousPrefix);
                }
                Some(id) => {
                    node = id;
                    depth += 1;
                }
                None => break,
            }
        }

        if depth == prefix.len()
            && let Some(id) = self.child(node, last)
        {
            return Err(match self.nodes[id] {
                Node::Terminal(_) => BindError::AlreadyBound,
                Node::Continuation(_) => BindError::AmbiguousPrefix,
            });
        }

        for &event in &prefix[depth..] {
            node = self.attach(node, event, Node::Continuation([None; EVENT_COUNT]));
        }
        self.attach(node, last, Node::Terminal(command));
        self.bound += 1;
        Ok(())
    }

    /// Feeds one event. A mismatch part-way through a sequence drops the
    /// partial progress and evaluates the event again from the root.
    pub fn advance(&mut self, event: ClassifiedEvent) -> Advance {
        let next = match self.child(self.current, event) {
            Some(id) => Some(id),
            None if self.current != ROOT => {
                self.current = ROOT;
                self.child(ROOT, event)
            }
            None => None,
        };

        let Some(id) = next else {
            self.current = ROOT;
            return Advance::Reset;
        };

        match &self.nodes[id] {
            Node::Terminal(command) => {
                self.current = ROOT;
                Advance::Completed(command.clone())
            }
            Node::Continuation(_) => {
                self.current = id;
                Advance::Progressed
            }
        }
    }

    /// Returns to the root. Idempotent.
    #[inline(always)]
    pub fn reset(&mut self) {
        self.current = ROOT;
    }

    #[inline(always)]
    pub fn is_at_root(&self) -> bool {
        self.current == ROOT
    }

    /// Number of bound sequences.
    pub fn len(&self) -> usize {
        self.bound
    }

    pub fn is_empty(&self) -> bool {
        self.bound == 0
    }
}

impl Default for SequenceMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Button, parse_sequence};
    use std::sync::Arc;

    fn cmd(name: &str) -> CommandRef {
        Arc::from(name)
    }

    fn double_click(button: Button) -> [ClassifiedEvent; 4] {
        [
            ClassifiedEvent::ButtonDown(button),
            ClassifiedEvent::ButtonUp(button),
            ClassifiedEvent::ButtonDown(button),
            ClassifiedEvent::ButtonUp(button),
        ]
    }

    #[test]
    fn test_sequence_matching_basic() {
        let mut matcher = SequenceMatcher::new();
        matcher
            .bind(&double_click(Button::Secondary), cmd("closeCurrentTab"))
            .unwrap();

        let events = double_click(Button::Secondary);
        assert_eq!(matcher.advance(events[0]), Advance::Progressed);
        assert_eq!(matcher.advance(events[1]), Advance::Progressed);
        assert_eq!(matcher.advance(events[2]), Advance::Progressed);
        assert!(!matcher.is_at_root());
        assert_eq!(
            matcher.advance(events[3]),
            Advance::Completed(cmd("closeCurrentTab"))
        );
        assert!(matcher.is_at_root());
    }

    #[test]
    fn test_mismatch_discards_progress() {
        let mut matcher = SequenceMatcher::new();
        matcher
            .bind(&double_click(Button::Secondary), cmd("closeCurrentTab"))
            .unwrap();

        let events = double_click(Button::Secondary);
        matcher.advance(events[0]);
        matcher.advance(events[1]);
        assert_eq!(matcher.advance(ClassifiedEvent::ScrollDown), Advance::Reset);
        assert!(matcher.is_at_root());

        assert_eq!(matcher.advance(events[2]), Advance::Progressed);
        assert_eq!(matcher.advance(events[3]), Advance::Progressed);
        assert!(!matcher.is_at_root());
    }

    #[test]
    fn test_mismatching_event_restarts_from_root() {
        let mut matcher = SequenceMatcher::new();
        matcher
            .bind(&parse_sequence("c11,c01").unwrap(), cmd("a"))
            .unwrap();
        matcher
            .bind(&parse_sequence("s0,s0").unwrap(), cmd("b"))
            .unwrap();

        matcher.advance(ClassifiedEvent::ButtonDown(Button::Middle));
        assert_eq!(matcher.advance(ClassifiedEvent::ScrollDown), Advance::Progressed);
        assert_eq!(
            matcher.advance(ClassifiedEvent::ScrollDown),
            Advance::Completed(cmd("b"))
        );
    }

    #[test]
    fn test_shorter_prefix_blocks_longer() {
        let mut matcher = SequenceMatcher::new();
        let a = ClassifiedEvent::LongPress(Button::Primary);
        let b = ClassifiedEvent::ScrollUp;

        matcher.bind(&[a], cmd("cmd1")).unwrap();
        assert_eq!(matcher.bind(&[a, b], cmd("cmd2")), Err(BindError::AmbiguousPrefix));
        assert_eq!(matcher.len(), 1);
        assert_eq!(matcher.advance(a), Advance::Completed(cmd("cmd1")));
    }

    #[test]
    fn test_longer_blocks_shorter_prefix() {
        let mut matcher = SequenceMatcher::new();
        let a = ClassifiedEvent::ScrollUp;
        let b = ClassifiedEvent::ScrollDown;

        matcher.bind(&[a, b], cmd("long")).unwrap();
        assert_eq!(matcher.bind(&[a], cmd("short")), Err(BindError::AmbiguousPrefix));
        assert_eq!(matcher.advance(a), Advance::Progressed);
        assert_eq!(matcher.advance(b), Advance::Completed(cmd("long")));
    }

    #[test]
    fn test_duplicate_and_invalid_binds() {
        let mut matcher = SequenceMatcher::new();
        let seq = [ClassifiedEvent::ScrollUp, ClassifiedEvent::ScrollUp];
        matcher.bind(&seq, cmd("first")).unwrap();
        assert_eq!(matcher.bind(&seq, cmd("second")), Err(BindError::AlreadyBound));
        assert_eq!(matcher.bind(&[], cmd("none")), Err(BindError::EmptySequence));

        let too_long = [ClassifiedEvent::ScrollDown; MAX_SEQUENCE_LENGTH + 1];
        assert_eq!(matcher.bind(&too_long, cmd("long")), Err(BindError::TooLong));

        matcher.advance(ClassifiedEvent::ScrollUp);
        assert_eq!(
            matcher.advance(ClassifiedEvent::ScrollUp),
            Advance::Completed(cmd("first"))
        );
    }

    #[test]
    fn test_shared_prefixes() {
        let mut matcher = SequenceMatcher::new();
        matcher
            .bind(&parse_sequence("c10,c00,s1").unwrap(), cmd("up"))
            .unwrap();
        matcher
            .bind(&parse_sequence("c10,c00,s0").unwrap(), cmd("down"))
            .unwrap();
        assert_eq!(matcher.len(), 2);

        for event in parse_sequence("c10,c00").unwrap() {
            matcher.advance(event);
        }
        assert_eq!(
            matcher.advance(ClassifiedEvent::ScrollDown),
            Advance::Completed(cmd("down"))
        );
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut matcher = SequenceMatcher::new();
        matcher
            .bind(&double_click(Button::Primary), cmd("x"))
            .unwrap();

        matcher.reset();
        assert!(matcher.is_at_root());
        matcher.reset();
        assert!(matcher.is_at_root());

        matcher.advance(ClassifiedEvent::ButtonDown(Button::Primary));
        matcher.reset();
        matcher.reset();
        assert!(matcher.is_at_root());
    }

    #[test]
    fn test_empty_matcher_never_progresses() {
        let mut matcher = SequenceMatcher::new();
        assert!(matcher.is_empty());
        for event in ClassifiedEvent::ALL {
            assert_eq!(matcher.advance(event), Advance::Reset);
        }
    }
}
