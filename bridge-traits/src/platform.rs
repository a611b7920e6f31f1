//! Marker traits used to keep bridge trait bounds aligned with the threading
//! model of the core.
//!
//! Decode sources, audio devices and presentation surfaces are each moved
//! into exactly one worker thread, so they only need `Send`. Logger sinks
//! are shared by every thread that emits events and need `Send + Sync`.

/// Marker trait for bridges shared across threads.
pub trait PlatformSendSync: Send + Sync {}

impl<T> PlatformSendSync for T where T: Send + Sync {}

/// Marker trait for bridges handed over to a single worker thread.
pub trait PlatformSend: Send {}

impl<T> PlatformSend for T where T: Send {}
