//! Job lifecycle: build, render, deliver, and the request boundary around them.

/// Request validation and response shaping for the web-facing layer.
pub mod boundary;
/// Artifact hand-off.
pub mod delivery;
/// Immutable per-request job description.
pub mod job;
/// Render orchestration: rasterizer pool, encoder thread, partial-output commit.
pub mod orchestrator;
