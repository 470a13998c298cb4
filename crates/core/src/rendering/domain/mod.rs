pub mod caption_font;
pub mod caption_style;
pub mod highlight_mode;
pub mod layer_blurrer;
pub mod layer_compositor;
