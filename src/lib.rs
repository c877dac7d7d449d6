#![deny(warnings)]
#![deny(clippy::dbg_macro)]
//! Reports errors and panics to [Airbrake](https://airbrake.io) and services
//! speaking its XML notifier API.
//!
//! Reporting never blocks on the network: a [`Notifier`] assembles a
//! [`Notice`] (error class, message, backtrace, request and server metadata)
//! on the calling thread and queues it for a background worker that renders
//! and posts it. Delivery is best effort; failures are logged and dropped.
//!
//! ```no_run
//! use airbrake::prelude::*;
//!
//! let _guard = airbrake::configure(airbrake::Notifier::new(
//!     airbrake::Config::builder()
//!         .api_key("0123456789abcdef")
//!         .environment("production")
//!         .build(),
//! ));
//!
//! std::fs::read("settings.toml").airbrake_drop();
//!
//! airbrake::capture_panic(None, || {
//!     // panics escaping here are reported, then keep unwinding
//! });
//! ```
mod config;
mod dispatch;
mod error;
mod hub;
mod notice;
mod notifier;
mod panic_hook;
pub mod prelude;
mod render;
mod request;
mod result;
pub mod stack;
pub mod transport;

pub use config::Config;
pub use dispatch::ProcessingReceipt;
pub use error::{ConfigError, DeliveryError, FormError, RenderError};
pub use hub::{
    capture_panic, configure, configure_thread_local, notify, report_error,
    ConfiguredNotifierGuard,
};
pub use notice::{error_class, Notice, PANIC_CLASS};
pub use notifier::{Notifier, PanicGuard};
pub use render::render;
pub use request::{Request, RequestContext};
pub use stack::StackFrame;
