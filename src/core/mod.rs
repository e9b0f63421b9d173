pub mod frame_buffer;
pub mod line_rasterizer;
pub mod projection;
pub mod rasterizer;
pub mod renderer;
pub mod shadow_map;
