//! Declarative description of the three-layer template composition.

/// `object-fit: cover` placement math.
pub mod fit;
/// Canvas size, video window and label placement.
pub mod geometry;
/// Label validation and display-case normalization.
pub mod label;
/// Tagged, z-ordered layer list.
pub mod layers;
