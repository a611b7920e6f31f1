//! Workspace facade crate.
//!
//! Re-exports the individual workspace crates so host applications can depend
//! on `framepace` alone:
//!
//! - [`bridge`] - collaborator contracts (decode sources, audio device, surface)
//! - [`runtime`] - logging initialisation and configuration
//! - [`playback`] - bounded frame queue, byte ring, playback controller and
//!   the pipeline workers built on them

pub use bridge_traits as bridge;
pub use core_playback as playback;
pub use core_runtime as runtime;
