pub mod segment;
pub mod segment_packer;
pub mod text_measurer;
pub mod timeline;
pub mod token_grouper;
pub mod transcript_reconciler;
pub mod word;
