pub mod color;
pub mod constants;
pub mod frame;
pub mod layer;
pub mod rotation;
pub mod timestamp;
pub mod video_metadata;
