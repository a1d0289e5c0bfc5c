//! Held-button bookkeeping and long-press synthesis.

use std::time::{Duration, Instant};

use crate::events::{Button, ButtonsDown, ClassifiedEvent, EventSet, PrimitiveEvent};
use crate::timer::{Timer, earliest};

pub const LONG_PRESS_DURATION: Duration = Duration::from_millis(300);

/// Tracks which buttons are held and turns raw events into classified ones.
///
/// A button held for the long-press duration produces a synthetic
/// [`ClassifiedEvent::LongPress`], and its eventual release is swallowed so
/// the same physical press never triggers twice.
#[derive(Debug, Clone)]
pub struct ButtonStateTracker {
    held: ButtonsDown,
    long_press_timers: [Timer; 3],
    suppressed: EventSet,
    long_press_duration: Duration,
}

impl ButtonStateTracker {
    pub fn new(long_press_duration: Duration) -> Self {
        Self {
            held: ButtonsDown::empty(),
            long_press_timers: [Timer::new(); 3],
            suppressed: EventSet::default(),
            long_press_duration,
        }
    }

    #[inline(always)]
    pub fn held(&self) -> ButtonsDown {
        self.held
    }

    pub fn set_long_press_duration(&mut self, duration: Duration) {
        self.long_press_duration = duration;
    }

    #[inline(always)]
    pub fn is_long_press_pending(&self, button: Button) -> bool {
        self.long_press_timers[button.index()].is_armed()
    }

    #[inline(always)]
    pub fn is_suppressed(&self, event: ClassifiedEvent) -> bool {
        self.suppressed.contains(event)
    }

    /// Applies a raw event to the held state. Returns `None` when the event
    /// is a release that a long press already accounted for.
    pub fn classify(&mut self, primitive: PrimitiveEvent, now: Instant) -> Option<ClassifiedEvent> {
        match primitive {
            PrimitiveEvent::ButtonDown(button) => {
                self.held |= button.mask();
                // A new press invalidates any suppression left by a lost release.
                self.suppressed.remove(ClassifiedEvent::ButtonUp(button));
                self.long_press_timers[button.index()].arm(now, self.long_press_duration);
                self.rearm_others(button, now);
                Some(ClassifiedEvent::ButtonDown(button))
            }
            PrimitiveEvent::ButtonUp(button) => {
                self.long_press_timers[button.index()].cancel();
                self.held.remove(button.mask());
                self.rearm_others(button, now);

                let up = ClassifiedEvent::ButtonUp(button);
                if self.suppressed.remove(up) {
                    tracing::debug!(%button, "release consumed by long press");
                    None
                } else {
                    Some(up)
                }
            }
            PrimitiveEvent::ScrollUp => Some(ClassifiedEvent::ScrollUp),
            PrimitiveEvent::ScrollDown => Some(ClassifiedEvent::ScrollDown),
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.long_press_timers
            .iter()
            .fold(None, |acc, timer| earliest(acc, timer.deadline()))
    }

    /// Fires the earliest elapsed long-press timer, if any.
    pub fn fire_due(&mut self, now: Instant) -> Option<ClassifiedEvent> {
        let button = Button::ALL
            .into_iter()
            .filter_map(|b| {
                self.long_press_timers[b.index()]
                    .deadline()
                    .filter(|deadline| *deadline <= now)
                    .map(|deadline| (deadline, b))
            })
            .min()
            .map(|(_, b)| b)?;

        self.long_press_timers[button.index()].cancel();
        self.suppressed.insert(ClassifiedEvent::ButtonUp(button));
        self.rearm_others(button, now);
        Some(ClassifiedEvent::LongPress(button))
    }

    /// Restarts the pending long-press timers of every other button.
    fn rearm_others(&mut self, button: Button, now: Instant) {
        for other in Button::ALL {
            if other == button {
                continue;
            }
            let timer = &mut self.long_press_timers[other.index()];
            if timer.is_armed() {
                timer.arm(now, self.long_press_duration);
            }
        }
    }

    /// Forgets all held buttons, pending timers and suppressions.
    pub fn reset(&mut self) {
        self.held = ButtonsDown::empty();
        for timer in &mut self.long_press_timers {
            timer.cancel();
        }
        self.suppressed.clear();
    }
}

impl Default for ButtonStateTracker {
    fn default() -> Self {
        Self::new(LONG_PRESS_DURATION)
    }
}
