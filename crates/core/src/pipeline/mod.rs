pub mod caption_video_use_case;
pub mod pipeline_logger;
pub mod render_error;
pub mod render_job;
pub mod render_session;

#[cfg(test)]
pub(crate) mod test_doubles;
