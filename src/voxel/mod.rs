pub mod grid;
pub mod predict;

pub use grid::{VoxelCell, VoxelGrid, VoxelGridBuilder, VoxelKey};
pub use predict::{Predictor, QueryParams};
