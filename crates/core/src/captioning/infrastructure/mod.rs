pub mod transcript_json;
