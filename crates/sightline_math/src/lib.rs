// Re-export glam for convenience
pub use glam::*;

// Sightline math types
mod aabb;
mod ray;
mod triangle;

pub use aabb::Aabb;
pub use ray::Ray;
pub use triangle::Triangle;
