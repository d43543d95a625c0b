//! Rendering: composition preparation and CPU rasterization.

/// Frame type shared with sinks.
pub mod backend;
/// CPU rasterizer built on `vello_cpu`.
pub(crate) mod cpu;
/// Composition preparation (template decode, font load, label shaping).
pub mod prepare;
