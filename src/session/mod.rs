//! Quiz session state machine
//!
//! A pure transition function over [`SessionState`] plus an async controller that
//! drives it and talks to the generation source.

mod controller;
pub mod event;
mod state;
mod transition;
pub mod view;

#[cfg(test)]
mod proptests;

pub use controller::QuizController;
pub use event::{Effect, Event};
pub use state::{Phase, SessionState};
pub use transition::{transition, Transition};
pub use view::{OptionMark, QuizSummary};
