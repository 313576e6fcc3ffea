//! The event-driven core.
//!
//! Everything in here runs on the Reactor's single task. Host callbacks and
//! network completions only ever reach this state through the loop's channels.

pub mod debounce;
pub mod event;
pub mod language;
pub mod notice;
pub mod orchestrator;
pub mod reactor;
pub mod telemetry;
