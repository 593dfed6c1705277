#![forbid(unsafe_code)]

//! Presentation bindings for Lodestone.
//!
//! Everything here consumes the core through its public seams
//! ([`Watch`](lode_core::Watch), [`Connector`](lode_core::Connector)) and
//! adds the concerns a view layer needs on top of a source of truth:
//!
//! - [`Format`]: pure value transformation, yielding a derived watchable
//!   cell.
//! - [`Manager`]: deduplicating presenter delivering on a chosen context.
//! - [`LogicGate`]: boolean branch dispatch.
//! - [`dispatch`]: the delivery-context abstraction (inline, or a
//!   dedicated delivery thread).

pub mod dispatch;
pub mod format;
pub mod logic;
pub mod manager;

pub use dispatch::{DispatchThread, Dispatcher, InlineDispatcher};
pub use format::{Format, Formatted};
pub use logic::LogicGate;
pub use manager::Manager;
