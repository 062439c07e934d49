//! # rs_sbvh
//!
//! [Rust][rust] crate implementing a bounding volume hierarchy (BVH)
//! over triangle meshes in the style of the [PBRT book][book]'s
//! accelerators, extended by spatial splits and an optimization pass
//! reinserting badly placed nodes.
//!
//! The hierarchy itself lives in [accelerators::bvh]; the two ray
//! queries are [hit] (any hit) and [intersect] (closest hit).
//!
//! [rust]: https://www.rust-lang.org
//! [book]: http://www.pbrt.org
//! [hit]: accelerators/bvh/struct.BVHAccel.html#method.hit
//! [intersect]: accelerators/bvh/struct.BVHAccel.html#method.intersect

#[macro_use]
extern crate impl_ops;

pub mod accelerators;
pub mod blockqueue;
pub mod core;
pub mod integrators;
pub mod shapes;
