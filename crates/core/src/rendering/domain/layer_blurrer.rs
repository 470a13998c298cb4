use crate::shared::layer::Layer;

/// Softens an overlay layer in place, used for caption drop shadows.
pub trait LayerBlurrer: Send {
    fn blur(&self, layer: &mut Layer) -> Result<(), Box<dyn std::error::Error>>;
}
