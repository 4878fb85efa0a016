//! beatgrid: a step-sequencer drum machine.
//!
//! The core is a grid of tracks by steps (`pipeline`), a tempo-driven
//! scheduler that walks its columns, and a renderer that turns hits into
//! voices on the audio engine (`audio`). `session` ties them to a kit set
//! and a composition file; the `beatgrid` binary puts a terminal UI on top.

pub mod audio;
pub mod audio_api;
pub mod config;
pub mod loader;
pub mod pipeline;
pub mod session;
pub mod shared;
