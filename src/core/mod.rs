//! Geometry, numeric helpers, random numbers, the parameter set, and
//! the camera and film used by the diagnostic renderer.

pub mod camera;
pub mod film;
pub mod geometry;
pub mod interaction;
pub mod paramset;
pub mod pbrt;
pub mod rng;
