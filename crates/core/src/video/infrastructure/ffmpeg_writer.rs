use std::path::Path;

use ffmpeg_next::Rational;

use crate::shared::constants::FALLBACK_FPS;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

const VIDEO_STREAM_INDEX: usize = 0;

/// Encodes silent MPEG-4 video via ffmpeg-next.
///
/// The encoder frame rate follows the source: NTSC rates such as 29.97 are
/// kept as `n*1000/1001`, integral rates as `n/1`, anything else to the
/// nearest millihertz.
pub struct FfmpegWriter {
    state: Option<EncodeState>,
    frame_count: usize,
}

struct EncodeState {
    octx: ffmpeg_next::format::context::Output,
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    scaler: ffmpeg_next::software::scaling::Context,
    time_base: Rational,
    width: u32,
    height: u32,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            state: None,
            frame_count: 0,
        }
    }

    /// Number of frames accepted since the last `open`.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        if metadata.width == 0 || metadata.height == 0 {
            return Err(format!(
                "cannot encode {}x{} video",
                metadata.width, metadata.height
            )
            .into());
        }

        let mut octx = ffmpeg_next::format::output(path)?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;

        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        let frame_rate = encoder_frame_rate(metadata.fps);
        let time_base = Rational(frame_rate.denominator(), frame_rate.numerator());

        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(time_base);
        encoder_ctx.set_frame_rate(Some(frame_rate));

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        ost.set_time_base(time_base);

        octx.write_header()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ffmpeg_next::format::Pixel::YUV420P,
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::debug!(
            "Encoding {}x{} MPEG-4 at {}/{} fps to {}",
            metadata.width,
            metadata.height,
            frame_rate.numerator(),
            frame_rate.denominator(),
            path.display()
        );

        self.state = Some(EncodeState {
            octx,
            encoder,
            scaler,
            time_base,
            width: metadata.width,
            height: metadata.height,
        });
        self.frame_count = 0;

        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let state = self.state.as_mut().ok_or("FfmpegWriter: not opened")?;

        if frame.width() != state.width || frame.height() != state.height {
            return Err(format!(
                "frame {} is {}x{}, writer expects {}x{}",
                frame.index(),
                frame.width(),
                frame.height(),
                state.width,
                state.height
            )
            .into());
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            state.width,
            state.height,
        );

        let stride = rgb_frame.stride(0);
        let row_bytes = state.width as usize * Frame::CHANNELS;
        let dst = rgb_frame.data_mut(0);
        for (row, src_row) in frame.data().chunks_exact(row_bytes).enumerate() {
            let dst_start = row * stride;
            dst[dst_start..dst_start + row_bytes].copy_from_slice(src_row);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        state.scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(self.frame_count as i64));

        state.encoder.send_frame(&yuv_frame)?;
        state.drain_packets()?;

        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(mut state) = self.state.take() else {
            return Ok(());
        };

        state.encoder.send_eof()?;
        state.drain_packets()?;
        state.octx.write_trailer()?;

        log::debug!("Encoder closed after {} frames", self.frame_count);
        Ok(())
    }
}

impl EncodeState {
    fn drain_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let ost_time_base = self
            .octx
            .stream(VIDEO_STREAM_INDEX)
            .ok_or("output video stream missing")?
            .time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(VIDEO_STREAM_INDEX);
            encoded.rescale_ts(self.time_base, ost_time_base);
            encoded.write_interleaved(&mut self.octx)?;
        }
        Ok(())
    }
}

/// Picks an exact rational encoder rate for a measured source frame rate.
fn encoder_frame_rate(fps: f64) -> Rational {
    const TOLERANCE: f64 = 1e-3;

    let fps = if fps.is_finite() && fps > 0.0 {
        fps
    } else {
        FALLBACK_FPS
    };

    if (fps - fps.round()).abs() < TOLERANCE {
        return Rational(fps.round() as i32, 1);
    }

    let ntsc = fps * 1.001;
    if (ntsc - ntsc.round()).abs() < TOLERANCE {
        return Rational(ntsc.round() as i32 * 1000, 1001);
    }

    let millis = (fps * 1000.0).round() as i32;
    let divisor = gcd(millis, 1000);
    Rational(millis / divisor, 1000 / divisor)
}

fn gcd(mut a: i32, mut b: i32) -> i32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.abs().max(1)
}
