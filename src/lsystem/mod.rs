// lsystem/mod.rs
// L-系统：文法重写与海龟解释
pub mod grammar;
pub mod turtle;

pub use grammar::{LSystemGrammar, Production, WeightedProduction};
pub use turtle::{draw_lsystem_2d, draw_lsystem_3d};
