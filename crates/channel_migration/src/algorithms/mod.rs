pub mod cleaning;
pub mod skeleton;
pub mod pruning;
pub mod edges;
pub mod migration;
pub mod geometry;

pub use cleaning::*;
pub use skeleton::*;
pub use pruning::*;
pub use edges::*;
pub use migration::*;
pub use geometry::*;
