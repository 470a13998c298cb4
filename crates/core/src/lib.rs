pub mod captioning;
pub mod config;
pub mod pipeline;
pub mod rendering;
pub mod shared;
pub mod video;
