//! Grid fields: 3D scalar fields with location tags, 2D metric fields, regions.

pub mod field2d;
pub mod field3d;
pub mod location;
pub mod region;

pub use field2d::Field2D;
pub use field3d::Field3D;
pub use location::CellLoc;
pub use region::{Region, max_abs, mean};
