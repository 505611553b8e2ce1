pub mod app;
pub mod config;
pub mod engine;
pub mod logging;
pub mod params;
pub mod properties;
pub mod property_feed;
pub mod render;
pub mod shader;
pub mod terminal;
pub mod uniforms;
