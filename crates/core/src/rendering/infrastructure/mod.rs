pub mod block_font;
pub mod cpu_layer_blurrer;
pub mod font_loader;
pub mod fontdue_font;
pub mod gaussian;
