//! Mouse gesture core: button tracking, long presses, direct bindings and
//! gesture sequences resolved to named commands.
//!
//! The binary in `main.rs` wires these modules to stdin; embedders drive a
//! [`Dispatcher`] directly or through an [`Engine`].

pub mod bindings;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod events;
pub mod logging;
pub mod sequence_matcher;
pub mod timer;
pub mod tracker;
pub mod wire;

pub use bindings::{BindingTable, CommandRef};
pub use config::AppConfig;
pub use dispatcher::{
    CommandError, CommandInvoker, Completion, ContextMenuSink, DebugReport, DebugSink, Dispatch,
    DispatchMode, Dispatcher,
};
pub use engine::{Engine, EngineMessage};
pub use events::{Button, ButtonsDown, ClassifiedEvent, PrimitiveEvent};
pub use sequence_matcher::SequenceMatcher;
pub use tracker::ButtonStateTracker;
