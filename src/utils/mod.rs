pub mod coordinate;
pub mod files;
pub mod geometry;
pub mod image;
