// Type definitions for the link stripping pipeline

pub mod document;
pub mod geometry;

pub use document::*;
pub use geometry::*;
