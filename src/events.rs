//! Mouse event vocabulary and its compact token encoding.
//!
//! The transport delivers primitive events as short tokens: `c<type><button>`
//! for button events (`0` up, `1` down, `2` long press) and `s<dir>` for the
//! wheel (`1` up, `0` down). Persisted gesture sequences reuse the same tokens,
//! joined either by commas or back to back.

use std::fmt;

use smallvec::SmallVec;
use thiserror::Error;

/// Number of distinct classified events.
pub const EVENT_COUNT: usize = 11;

const CLICK_PREFIX: char = 'c';
const SCROLL_PREFIX: char = 's';

const TOKENS: [&str; EVENT_COUNT] = [
    "c10", "c11", "c12", "c00", "c01", "c02", "c20", "c21", "c22", "s1", "s0",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed event token: {0:?}")]
    MalformedToken(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Button {
    Primary,
    Middle,
    Secondary,
}

impl Button {
    pub const ALL: [Button; 3] = [Button::Primary, Button::Middle, Button::Secondary];

    #[inline(always)]
    pub const fn index(self) -> usize {
        match self {
            Button::Primary => 0,
            Button::Middle => 1,
            Button::Secondary => 2,
        }
    }

    #[inline(always)]
    pub const fn mask(self) -> ButtonsDown {
        match self {
            Button::Primary => ButtonsDown::PRIMARY,
            Button::Middle => ButtonsDown::MIDDLE,
            Button::Secondary => ButtonsDown::SECONDARY,
        }
    }

    /// Wire code used in tokens.
    pub const fn code(self) -> char {
        match self {
            Button::Primary => '0',
            Button::Middle => '1',
            Button::Secondary => '2',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            '0' => Some(Button::Primary),
            '1' => Some(Button::Middle),
            '2' => Some(Button::Secondary),
            _ => None,
        }
    }

    /// Configuration name (`primary`, `middle`, `secondary`).
    pub const fn name(self) -> &'static str {
        match self {
            Button::Primary => "primary",
            Button::Middle => "middle",
            Button::Secondary => "secondary",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "primary" | "left" => Some(Button::Primary),
            "middle" => Some(Button::Middle),
            "secondary" | "right" => Some(Button::Secondary),
            _ => None,
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Button::Primary => "Primary",
            Button::Middle => "Middle",
            Button::Secondary => "Secondary",
        };
        f.write_str(name)
    }
}

bitflags::bitflags! {
    /// Buttons physically held at a point in time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ButtonsDown: u8 {
        const PRIMARY = 1 << 0;
        const MIDDLE = 1 << 1;
        const SECONDARY = 1 << 2;
    }
}

impl ButtonsDown {
    /// Builds a mask from configuration button names.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, String> {
        let mut mask = ButtonsDown::empty();
        for name in names {
            let button = Button::from_name(name.as_ref())
                .ok_or_else(|| format!("Unknown button: {}", name.as_ref()))?;
            mask |= button.mask();
        }
        Ok(mask)
    }

    #[inline(always)]
    pub fn is_held(self, button: Button) -> bool {
        self.contains(button.mask())
    }
}

/// An event as received from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveEvent {
    ButtonDown(Button),
    ButtonUp(Button),
    ScrollUp,
    ScrollDown,
}

impl PrimitiveEvent {
    /// Decodes a transport token. Long-press tokens are rejected, the
    /// transport never produces them.
    pub fn decode(token: &str) -> Result<Self, DecodeError> {
        match ClassifiedEvent::decode(token)? {
            ClassifiedEvent::ButtonDown(b) => Ok(PrimitiveEvent::ButtonDown(b)),
            ClassifiedEvent::ButtonUp(b) => Ok(PrimitiveEvent::ButtonUp(b)),
            ClassifiedEvent::ScrollUp => Ok(PrimitiveEvent::ScrollUp),
            ClassifiedEvent::ScrollDown => Ok(PrimitiveEvent::ScrollDown),
            ClassifiedEvent::LongPress(_) => Err(DecodeError::MalformedToken(token.to_string())),
        }
    }
}

impl From<PrimitiveEvent> for ClassifiedEvent {
    fn from(event: PrimitiveEvent) -> Self {
        match event {
            PrimitiveEvent::ButtonDown(b) => ClassifiedEvent::ButtonDown(b),
            PrimitiveEvent::ButtonUp(b) => ClassifiedEvent::ButtonUp(b),
            PrimitiveEvent::ScrollUp => ClassifiedEvent::ScrollUp,
            PrimitiveEvent::ScrollDown => ClassifiedEvent::ScrollDown,
        }
    }
}

impl fmt::Display for PrimitiveEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ClassifiedEvent::from(*self).fmt(f)
    }
}

/// The closed vocabulary the core reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassifiedEvent {
    ButtonDown(Button),
    ButtonUp(Button),
    LongPress(Button),
    ScrollUp,
    ScrollDown,
}

impl ClassifiedEvent {
    pub const ALL: [ClassifiedEvent; EVENT_COUNT] = [
        ClassifiedEvent::ButtonDown(Button::Primary),
        ClassifiedEvent::ButtonDown(Button::Middle),
        ClassifiedEvent::ButtonDown(Button::Secondary),
        ClassifiedEvent::ButtonUp(Button::Primary),
        ClassifiedEvent::ButtonUp(Button::Middle),
        ClassifiedEvent::ButtonUp(Button::Secondary),
        ClassifiedEvent::LongPress(Button::Primary),
        ClassifiedEvent::LongPress(Button::Middle),
        ClassifiedEvent::LongPress(Button::Secondary),
        ClassifiedEvent::ScrollUp,
        ClassifiedEvent::ScrollDown,
    ];

    /// Position in [`ClassifiedEvent::ALL`], used to index fixed-size tables.
    #[inline(always)]
    pub const fn ordinal(self) -> usize {
        match self {
            ClassifiedEvent::ButtonDown(b) => b.index(),
            ClassifiedEvent::ButtonUp(b) => 3 + b.index(),
            ClassifiedEvent::LongPress(b) => 6 + b.index(),
            ClassifiedEvent::ScrollUp => 9,
            ClassifiedEvent::ScrollDown => 10,
        }
    }

    #[inline(always)]
    pub const fn button(self) -> Option<Button> {
        match self {
            ClassifiedEvent::ButtonDown(b)
            | ClassifiedEvent::ButtonUp(b)
            | ClassifiedEvent::LongPress(b) => Some(b),
            ClassifiedEvent::ScrollUp | ClassifiedEvent::ScrollDown => None,
        }
    }

    pub fn encode(self) -> &'static str {
        TOKENS[self.ordinal()]
    }

    pub fn decode(token: &str) -> Result<Self, DecodeError> {
        let malformed = || DecodeError::MalformedToken(token.to_string());
        let mut chars = token.chars();

        match (chars.next(), chars.next(), chars.next(), chars.next()) {
            (Some(CLICK_PREFIX), Some(kind), Some(code), None) => {
                let button = Button::from_code(code).ok_or_else(malformed)?;
                match kind {
                    '0' => Ok(ClassifiedEvent::ButtonUp(button)),
                    '1' => Ok(ClassifiedEvent::ButtonDown(button)),
                    '2' => Ok(ClassifiedEvent::LongPress(button)),
                    _ => Err(malformed()),
                }
            }
            (Some(SCROLL_PREFIX), Some('1'), None, None) => Ok(ClassifiedEvent::ScrollUp),
            (Some(SCROLL_PREFIX), Some('0'), None, None) => Ok(ClassifiedEvent::ScrollDown),
            _ => Err(malformed()),
        }
    }
}

impl fmt::Display for ClassifiedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifiedEvent::ButtonDown(b) => write!(f, "{} Down", b),
            ClassifiedEvent::ButtonUp(b) => write!(f, "{} Up", b),
            ClassifiedEvent::LongPress(b) => write!(f, "{} Long Press", b),
            ClassifiedEvent::ScrollUp => f.write_str("Scroll Up"),
            ClassifiedEvent::ScrollDown => f.write_str("Scroll Down"),
        }
    }
}

/// Small set of classified events backed by a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventSet(u16);

impl EventSet {
    #[inline(always)]
    pub fn insert(&mut self, event: ClassifiedEvent) {
        self.0 |= 1 << event.ordinal();
    }

    /// Removes `event`, returning whether it was present.
    #[inline(always)]
    pub fn remove(&mut self, event: ClassifiedEvent) -> bool {
        let bit = 1 << event.ordinal();
        let present = self.0 & bit != 0;
        self.0 &= !bit;
        present
    }

    #[inline(always)]
    pub fn contains(&self, event: ClassifiedEvent) -> bool {
        self.0 & (1 << event.ordinal()) != 0
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

pub type EventSequence = SmallVec<[ClassifiedEvent; 8]>;

/// Parses a persisted sequence string such as `c12,c02` or `c12c02`.
/// A blank string yields an empty sequence; binding rejects it.
pub fn parse_sequence(s: &str) -> Result<EventSequence, DecodeError> {
    let s = s.trim();
    let mut sequence = EventSequence::new();

    if s.contains(',') {
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            sequence.push(ClassifiedEvent::decode(part)?);
        }
    } else {
        let mut rest = s;
        while !rest.is_empty() {
            let width = match rest.as_bytes()[0] {
                b'c' => 3,
                b's' => 2,
                _ => return Err(DecodeError::MalformedToken(rest.to_string())),
            };
            if rest.len() < width || !rest.is_char_boundary(width) {
                return Err(DecodeError::MalformedToken(rest.to_string()));
            }
            let (token, tail) = rest.split_at(width);
            sequence.push(ClassifiedEvent::decode(token)?);
            rest = tail;
        }
    }

    Ok(sequence)
}

/// Comma-joined persistence form of a sequence.
pub fn encode_sequence(events: &[ClassifiedEvent]) -> String {
    events
        .iter()
        .map(|e| e.encode())
        .collect::<Vec<_>>()
        .join(",")
}

fn is_click(events: &[ClassifiedEvent], i: usize, button: Button) -> bool {
    matches!(
        (events.get(i), events.get(i + 1)),
        (Some(ClassifiedEvent::ButtonDown(d)), Some(ClassifiedEvent::ButtonUp(u)))
            if *d == button && *u == button
    )
}

/// Human readable summary; down/up pairs collapse into clicks and double clicks.
pub fn describe_sequence(events: &[ClassifiedEvent]) -> String {
    let mut parts = Vec::with_capacity(events.len());
    let mut i = 0;

    while i < events.len() {
        let event = events[i];
        match event.button() {
            Some(button) if is_click(events, i, button) && is_click(events, i + 2, button) => {
                parts.push(format!("{} Double Click", button));
                i += 4;
            }
            Some(button) if is_click(events, i, button) => {
                parts.push(format!("{} Click", button));
                i += 2;
            }
            _ => {
                parts.push(event.to_string());
                i += 1;
            }
        }
    }

    parts.join(" → ")
}
