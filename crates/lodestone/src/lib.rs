#![forbid(unsafe_code)]

//! Lodestone public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub mod prelude {
    pub use lode_bind as bind;
    pub use lode_core as core;

    pub use lode_bind::{
        DispatchThread, Dispatcher, Format, Formatted, InlineDispatcher, LogicGate, Manager,
    };
    pub use lode_core::{
        Action, Cancellation, Connector, ErrorSink, Feed, Kernel, ProducerError, Register,
        RegisterError, SetValueConnector, Subscription, Updates, Watch,
    };
}
