pub mod presets;
pub mod render_config;
