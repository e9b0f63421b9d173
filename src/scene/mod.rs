pub mod assembler;

pub use assembler::{SceneAssembler, SceneGeometry};
