//! Triangle meshes, the only geometry the acceleration structure
//! handles, plus ways to create them.

pub mod boxes;
pub mod plymesh;
pub mod triangle;
