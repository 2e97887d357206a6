//! Long-running background processors.
//!
//! Each processor owns a periodic loop driven by a tick and a shared
//! shutdown watch channel. They are spawned once at startup and drain
//! in-flight work when the shutdown flag flips.

pub mod expiry_worker;
pub mod outbox_publisher;

pub use expiry_worker::ExpiryWorker;
pub use outbox_publisher::OutboxPublisher;
