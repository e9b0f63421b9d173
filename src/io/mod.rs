pub mod config_loader;
pub mod image_output;
pub mod lsystem_loader;
pub mod render_settings;
pub mod scene_loader;
pub mod simple_cli;
