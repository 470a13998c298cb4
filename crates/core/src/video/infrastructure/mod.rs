pub mod ffmpeg_cli_remuxer;
pub mod ffmpeg_reader;
pub mod ffmpeg_writer;
