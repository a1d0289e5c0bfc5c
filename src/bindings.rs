//! Direct event bindings.
//!
//! Each classified event owns an ordered list of bindings; the first one whose
//! held-button condition is satisfied wins.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::events::{ButtonsDown, ClassifiedEvent, EVENT_COUNT};

/// Name of a command implemented outside the core.
pub type CommandRef = Arc<str>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub required: ButtonsDown,
    pub command: CommandRef,
}

impl Binding {
    /// Checks the held-button condition against the buttons held besides the
    /// event's own button. An empty requirement matches only when no other
    /// button is held; otherwise any overlap is enough.
    #[inline]
    pub fn matches(&self, others: ButtonsDown) -> bool {
        if self.required.is_empty() {
            others.is_empty()
        } else {
            self.required.intersects(others)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    slots: [SmallVec<[Binding; 2]>; EVENT_COUNT],
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a binding; insertion order is priority order.
    pub fn bind(&mut self, event: ClassifiedEvent, required: ButtonsDown, command: CommandRef) {
        self.slots[event.ordinal()].push(Binding { required, command });
    }

    pub fn resolve(&self, event: ClassifiedEvent, held: ButtonsDown) -> Option<&CommandRef> {
        let mut others = held;
        if let Some(button) = event.button() {
            others.remove(button.mask());
        }

        self.slots[event.ordinal()]
            .iter()
            .find(|binding| binding.matches(others))
            .map(|binding| &binding.command)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().map(SmallVec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(SmallVec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Button;

    fn cmd(name: &str) -> CommandRef {
        Arc::from(name)
    }

    #[test]
    fn test_unbound_event_resolves_to_none() {
        let table = BindingTable::new();
        assert!(table.is_empty());
        assert_eq!(
            table.resolve(ClassifiedEvent::ScrollUp, ButtonsDown::empty()),
            None
        );
    }

    #[test]
    fn test_empty_requirement_needs_no_other_button() {
        let mut table = BindingTable::new();
        let up = ClassifiedEvent::ButtonUp(Button::Primary);
        table.bind(up, ButtonsDown::empty(), cmd("switchToNextTab"));

        assert_eq!(
            table.resolve(up, ButtonsDown::empty()).map(|c| &**c),
            Some("switchToNextTab")
        );
        assert_eq!(table.resolve(up, ButtonsDown::SECONDARY), None);
    }

    #[test]
    fn test_own_button_is_ignored() {
        let mut table = BindingTable::new();
        let down = ClassifiedEvent::ButtonDown(Button::Middle);
        table.bind(down, ButtonsDown::empty(), cmd("createNewTab"));

        assert!(table.resolve(down, ButtonsDown::MIDDLE).is_some());
    }

    #[test]
    fn test_any_required_button_satisfies() {
        let mut table = BindingTable::new();
        table.bind(
            ClassifiedEvent::ScrollDown,
            ButtonsDown::SECONDARY | ButtonsDown::MIDDLE,
            cmd("switchToNextTab"),
        );

        for held in [
            ButtonsDown::SECONDARY,
            ButtonsDown::MIDDLE,
            ButtonsDown::all(),
        ] {
            assert!(table.resolve(ClassifiedEvent::ScrollDown, held).is_some());
        }
        assert!(
            table
                .resolve(ClassifiedEvent::ScrollDown, ButtonsDown::PRIMARY)
                .is_none()
        );
        assert!(
            table
                .resolve(ClassifiedEvent::ScrollDown, ButtonsDown::empty())
                .is_none()
        );
    }

    #[test]
    fn test_first_bound_wins_deterministically() {
        let mut table = BindingTable::new();
        let event = ClassifiedEvent::ScrollUp;
        table.bind(event, ButtonsDown::SECONDARY, cmd("first"));
        table.bind(event, ButtonsDown::SECONDARY | ButtonsDown::PRIMARY, cmd("second"));
        table.bind(event, ButtonsDown::PRIMARY, cmd("third"));
        assert_eq!(table.len(), 3);

        for _ in 0..10 {
            assert_eq!(
                table.resolve(event, ButtonsDown::all()).map(|c| &**c),
                Some("first")
            );
        }
        assert_eq!(
            table.resolve(event, ButtonsDown::PRIMARY).map(|c| &**c),
            Some("second")
        );
    }
}
