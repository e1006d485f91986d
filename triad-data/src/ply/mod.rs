//! PLY file loading and parsing

mod loader;

pub use loader::load_gaussians_from_ply;
