// geometry/mod.rs
// 导出几何、变换与程序化生成相关模块
pub mod clipping;
pub mod figure;
pub mod fractal;
pub mod line;
pub mod primitives;
pub mod transform;
pub mod triangulate;
