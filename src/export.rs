//! Animated GIF export from captured frame images.
//!
//! Frames arrive as raw bytes or base64 (optionally a `data:` URL), are
//! decoded and resized onto one canvas, then encoded as an infinitely
//! looping GIF. Work happens frame by frame with a caller-provided yield
//! between frames so a single-threaded host keeps handling input.

use std::borrow::Cow;
use std::cell::Cell;
use std::future::Future;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::imageops::FilterType;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::InteractionConfig;
use crate::error::{Error, Result};
use crate::message::{EventSink, GifStatus, OutboundMessage};

pub const DEFAULT_FPS: f64 = 6.0;
pub const DEFAULT_WIDTH: u32 = 600;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Millisecond time source used for the generation timeout.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Wall clock. Uses `Date.now()` under `web`, where `Instant` is unavailable.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    #[cfg(not(feature = "web"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            #[cfg(not(feature = "web"))]
            start: std::time::Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    #[cfg(not(feature = "web"))]
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    #[cfg(feature = "web")]
    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityTier {
    /// Color quantizer sampling speed; lower samples more pixels.
    pub fn sampling_speed(self) -> i32 {
        match self {
            QualityTier::High => 1,
            QualityTier::Medium => 10,
            QualityTier::Low => 20,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TargetHeight {
    /// Keep the first frame's aspect ratio
    #[default]
    Auto,
    Fixed(u32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GifOptions {
    pub frame_delay_ms: u64,
    pub width: u32,
    pub height: TargetHeight,
    pub quality: QualityTier,
}

impl Default for GifOptions {
    fn default() -> Self {
        Self::from_fps(DEFAULT_FPS)
    }
}

impl GifOptions {
    /// Options for a frame rate, with default size and quality.
    ///
    /// ```rust
    /// use flipbook_core_view::GifOptions;
    ///
    /// assert_eq!(GifOptions::from_fps(6.0).frame_delay_ms, 167);
    /// assert_eq!(GifOptions::from_fps(0.0).frame_delay_ms, 167);
    /// ```
    pub fn from_fps(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { DEFAULT_FPS };
        Self {
            frame_delay_ms: (1000.0 / fps).round() as u64,
            width: DEFAULT_WIDTH,
            height: TargetHeight::Auto,
            quality: QualityTier::Medium,
        }
    }

    /// GIF frame delays are in hundredths of a second.
    fn delay_centis(&self) -> u16 {
        ((self.frame_delay_ms + 5) / 10).min(u16::MAX as u64) as u16
    }

    fn canvas_for(&self, source_width: u32, source_height: u32) -> Result<(u16, u16)> {
        let width = self.width.max(1);
        let height = match self.height {
            TargetHeight::Fixed(h) => h.max(1),
            TargetHeight::Auto if source_width == 0 => width,
            TargetHeight::Auto => {
                ((width as f64 * source_height as f64 / source_width as f64).round() as u32).max(1)
            }
        };
        let to_u16 = |v: u32| {
            u16::try_from(v).map_err(|_| Error::InvalidInput(format!("GIF dimension {v} too large")))
        };
        Ok((to_u16(width)?, to_u16(height)?))
    }
}

/// One frame's encoded image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    Bytes(Vec<u8>),
    /// Base64 payload, with or without a `data:...;base64,` prefix
    Base64(String),
}

impl ImageSource {
    fn bytes(&self, index: usize) -> Result<Cow<'_, [u8]>> {
        match self {
            ImageSource::Bytes(bytes) if bytes.is_empty() => Err(Error::frame(index, "empty data")),
            ImageSource::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
            ImageSource::Base64(text) => {
                let text = text.trim();
                let payload = match text.strip_prefix("data:") {
                    Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(""),
                    None => text,
                };
                if payload.is_empty() {
                    return Err(Error::frame(index, "empty data"));
                }
                STANDARD
                    .decode(payload)
                    .map(Cow::Owned)
                    .map_err(|e| Error::frame(index, format!("invalid base64: {e}")))
            }
        }
    }
}

/// Backend that turns RGBA canvases into an animated image.
pub trait FrameEncoder {
    /// Start a new animation, discarding anything from a previous run.
    fn begin(&mut self, width: u16, height: u16) -> Result<()>;

    /// `rgba` is exactly `width * height * 4` bytes.
    fn add_frame(&mut self, rgba: &mut [u8], delay_centis: u16, speed: i32) -> Result<()>;

    fn finish(&mut self) -> Result<Vec<u8>>;
}

/// [`FrameEncoder`] backed by the `gif` crate.
#[derive(Default)]
pub struct GifCrateEncoder {
    inner: Option<(gif::Encoder<Vec<u8>>, u16, u16)>,
}

impl FrameEncoder for GifCrateEncoder {
    fn begin(&mut self, width: u16, height: u16) -> Result<()> {
        let mut encoder =
            gif::Encoder::new(Vec::new(), width, height, &[]).map_err(|e| Error::encoder(e.to_string()))?;
        encoder
            .set_repeat(gif::Repeat::Infinite)
            .map_err(|e| Error::encoder(e.to_string()))?;
        self.inner = Some((encoder, width, height));
        Ok(())
    }

    fn add_frame(&mut self, rgba: &mut [u8], delay_centis: u16, speed: i32) -> Result<()> {
        let (encoder, width, height) = self
            .inner
            .as_mut()
            .ok_or_else(|| Error::encoder("encoder not started"))?;
        let expected = *width as usize * *height as usize * 4;
        if rgba.len() != expected {
            return Err(Error::encoder(format!(
                "frame buffer is {} bytes, expected {expected}",
                rgba.len()
            )));
        }
        let mut frame = gif::Frame::from_rgba_speed(*width, *height, rgba, speed.clamp(1, 30));
        frame.delay = delay_centis;
        encoder.write_frame(&frame).map_err(|e| Error::encoder(e.to_string()))
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        let (encoder, _, _) = self
            .inner
            .take()
            .ok_or_else(|| Error::encoder("encoder not started"))?;
        encoder.into_inner().map_err(|e| Error::encoder(e.to_string()))
    }
}

/// Decodes, resizes and encodes frames under a time limit.
#[derive(Debug)]
pub struct GifAssembler<C = SystemClock> {
    clock: C,
    timeout_ms: u64,
}

impl Default for GifAssembler<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock::default())
    }
}

impl<C: Clock> GifAssembler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Assembler bounded by `config.gif_timeout_ms`.
    pub fn from_config(clock: C, config: &InteractionConfig) -> Self {
        Self::new(clock).with_timeout_ms(config.gif_timeout_ms)
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Encode `sources` in order into one GIF.
    ///
    /// `yield_fn` is awaited after every frame. The timeout is checked
    /// before each frame and once more before the encoder is finished.
    ///
    /// The bound is cooperative: a decode, resize or encode step that is
    /// already running is never interrupted, so a single slow frame can
    /// overrun the limit before [`Error::Timeout`] is returned.
    pub async fn assemble<E, Y, F>(
        &self,
        encoder: &mut E,
        sources: &[ImageSource],
        options: &GifOptions,
        yield_fn: Y,
    ) -> Result<Vec<u8>>
    where
        E: FrameEncoder + ?Sized,
        Y: Fn() -> F,
        F: Future<Output = ()>,
    {
        if sources.is_empty() {
            return Err(Error::EmptySelection {
                required: 1,
                actual: 0,
            });
        }

        let started = self.clock.now_ms();
        let mut canvas: Option<(u16, u16)> = None;

        for (index, source) in sources.iter().enumerate() {
            self.check_deadline(started)?;

            let decoded = image::load_from_memory(&source.bytes(index)?)
                .map_err(|e| Error::frame(index, format!("failed to load: {e}")))?
                .to_rgba8();

            let (width, height) = match canvas {
                Some(dims) => dims,
                None => {
                    let dims = options.canvas_for(decoded.width(), decoded.height())?;
                    encoder.begin(dims.0, dims.1)?;
                    canvas = Some(dims);
                    dims
                }
            };

            let mut rgba = image::imageops::resize(&decoded, width as u32, height as u32, FilterType::Triangle)
                .into_raw();
            encoder
                .add_frame(&mut rgba, options.delay_centis(), options.quality.sampling_speed())
                .map_err(|e| match e {
                    Error::EncodingFailure { frame: None, reason } => Error::frame(index, reason),
                    other => other,
                })?;
            debug!(frame = index, total = sources.len(), "gif frame encoded");

            yield_fn().await;
        }

        self.check_deadline(started)?;
        encoder.finish()
    }

    fn check_deadline(&self, started: u64) -> Result<()> {
        if self.clock.now_ms().saturating_sub(started) > self.timeout_ms {
            return Err(Error::Timeout {
                limit_ms: self.timeout_ms,
            });
        }
        Ok(())
    }
}

/// Turns finished GIF bytes into something a browser can download.
pub trait DownloadUrlFactory {
    fn create_url(&self, gif: &[u8]) -> Result<String>;
}

/// Inline `data:image/gif;base64,...` URLs.
#[derive(Clone, Copy, Debug, Default)]
pub struct DataUrlFactory;

impl DownloadUrlFactory for DataUrlFactory {
    fn create_url(&self, gif: &[u8]) -> Result<String> {
        Ok(format!("data:image/gif;base64,{}", STANDARD.encode(gif)))
    }
}

/// `start_gif_generation` payload.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GifRequest {
    #[serde(default)]
    pub frames: Option<Vec<GifRequestFrame>>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub options: Option<GifRequestOptions>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GifRequestFrame {
    #[serde(default)]
    pub image_data: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GifRequestOptions {
    #[serde(default)]
    pub framerate: Option<f64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<HeightField>,
    #[serde(default)]
    pub quality: Option<QualityTier>,
}

/// `"auto"` or a pixel count.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum HeightField {
    Pixels(u32),
    Keyword(String),
}

impl GifRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn sources(&self) -> Vec<ImageSource> {
        self.frames
            .iter()
            .flatten()
            .map(|f| ImageSource::Base64(f.image_data.clone().unwrap_or_default()))
            .collect()
    }

    /// Explicit `fps` wins over `options.framerate`; zero counts as unset.
    pub fn options(&self) -> GifOptions {
        let opts = self.options.clone().unwrap_or_default();
        let positive = |v: &f64| v.is_finite() && *v > 0.0;
        let fps = self
            .fps
            .filter(positive)
            .or(opts.framerate.filter(positive))
            .unwrap_or(DEFAULT_FPS);

        let mut options = GifOptions::from_fps(fps);
        if let Some(width) = opts.width.filter(|w| *w > 0) {
            options.width = width;
        }
        options.height = match opts.height {
            Some(HeightField::Pixels(h)) if h > 0 => TargetHeight::Fixed(h),
            _ => TargetHeight::Auto,
        };
        options.quality = opts.quality.unwrap_or_default();
        options
    }
}

/// Client-side GIF generation for one element: at most one run at a time.
pub struct GifSession<C = SystemClock, U = DataUrlFactory> {
    assembler: GifAssembler<C>,
    urls: U,
    generating: Cell<bool>,
}

impl Default for GifSession {
    fn default() -> Self {
        Self::new(GifAssembler::default(), DataUrlFactory)
    }
}

/// Clears the busy flag however a run ends.
struct Busy<'a>(&'a Cell<bool>);

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<C: Clock, U: DownloadUrlFactory> GifSession<C, U> {
    pub fn new(assembler: GifAssembler<C>, urls: U) -> Self {
        Self {
            assembler,
            urls,
            generating: Cell::new(false),
        }
    }

    pub fn is_generating(&self) -> bool {
        self.generating.get()
    }

    /// Report encoder readiness when the hook mounts.
    ///
    /// The encoder is linked in, so loading completes immediately; the pair
    /// is still sent because the server tracks these statuses.
    pub fn announce_ready<S: EventSink + ?Sized>(&self, sink: &mut S) {
        sink.push(&OutboundMessage::GifStatusUpdate {
            status: GifStatus::EncoderLoading,
            message: "Loading GIF encoder...".to_string(),
        });
        sink.push(&OutboundMessage::GifStatusUpdate {
            status: GifStatus::EncoderReady,
            message: "GIF encoder ready".to_string(),
        });
    }

    /// Handle one `start_gif_generation` request, reporting progress and
    /// the result through `sink`.
    pub async fn generate<E, S, Y, F>(&self, request: &GifRequest, encoder: &mut E, sink: &mut S, yield_fn: Y)
    where
        E: FrameEncoder + ?Sized,
        S: EventSink + ?Sized,
        Y: Fn() -> F,
        F: Future<Output = ()>,
    {
        if self.generating.get() {
            debug!("gif generation already in progress");
            return;
        }

        let sources = request.sources();
        if sources.is_empty() {
            sink.push(&OutboundMessage::gif_error("No frames provided"));
            return;
        }

        self.generating.set(true);
        let _busy = Busy(&self.generating);

        sink.push(&OutboundMessage::GifStatusUpdate {
            status: GifStatus::Generating,
            message: format!("Generating GIF from {} frames...", sources.len()),
        });

        let options = request.options();
        let result = match self.assembler.assemble(encoder, &sources, &options, yield_fn).await {
            Ok(bytes) => self.urls.create_url(&bytes),
            Err(e) => Err(e),
        };

        match result {
            Ok(download_url) => {
                debug!(frames = sources.len(), "gif generation complete");
                sink.push(&OutboundMessage::GifGenerationComplete { download_url });
            }
            Err(e) => {
                warn!(error = %e, "gif generation failed");
                sink.push(&OutboundMessage::gif_error(format!("GIF generation failed: {e}")));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::RecordingSink;
    use futures::executor::block_on;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use serde_json::json;
    use std::io::Cursor;

    fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    fn base64_png(width: u32, height: u32, color: [u8; 4]) -> String {
        STANDARD.encode(png(width, height, color))
    }

    fn small_options() -> GifOptions {
        GifOptions {
            width: 8,
            ..GifOptions::default()
        }
    }

    fn gif_info(bytes: &[u8]) -> (u16, u16, usize) {
        let mut decoder = gif::DecodeOptions::new().read_info(bytes).unwrap();
        let (w, h) = (decoder.width(), decoder.height());
        let mut frames = 0;
        while decoder.read_next_frame().unwrap().is_some() {
            frames += 1;
        }
        (w, h, frames)
    }

    #[test]
    fn test_assembles_looping_gif_with_auto_height() {
        let sources = vec![
            ImageSource::Bytes(png(16, 8, [255, 0, 0, 255])),
            ImageSource::Base64(format!("data:image/png;base64,{}", base64_png(16, 8, [0, 0, 255, 255]))),
        ];
        let assembler = GifAssembler::new(ManualClock::new());
        let mut encoder = GifCrateEncoder::default();
        let bytes = block_on(assembler.assemble(&mut encoder, &sources, &small_options(), || async {}))
            .unwrap();

        assert_eq!(&bytes[..6], b"GIF89a");
        assert_eq!(gif_info(&bytes), (8, 4, 2));
    }

    #[test]
    fn test_configured_timeout() {
        let clock = ManualClock::new();
        let config = InteractionConfig {
            gif_timeout_ms: 2_000,
            ..InteractionConfig::default()
        };
        let sources: Vec<_> = (0..2).map(|_| ImageSource::Bytes(png(4, 4, [0, 0, 0, 255]))).collect();
        let assembler = GifAssembler::from_config(&clock, &config);
        let result = block_on(assembler.assemble(
            &mut GifCrateEncoder::default(),
            &sources,
            &small_options(),
            || {
                clock.advance(2_001);
                async {}
            },
        ));
        assert_eq!(result.unwrap_err().to_string(), "GIF generation timed out after 2 seconds");
    }

    #[test]
    fn test_slow_last_frame_caught_before_finish() {
        let clock = ManualClock::new();
        let sources = vec![ImageSource::Bytes(png(4, 4, [1, 2, 3, 255]))];
        let assembler = GifAssembler::new(&clock);
        let result = block_on(assembler.assemble(
            &mut GifCrateEncoder::default(),
            &sources,
            &small_options(),
            || {
                clock.advance(DEFAULT_TIMEOUT_MS + 1);
                async {}
            },
        ));
        assert!(matches!(result, Err(Error::Timeout { limit_ms: 30_000 })));
    }

    #[test]
    fn test_fixed_height() {
        let sources = vec![ImageSource::Bytes(png(10, 10, [0, 255, 0, 255]))];
        let options = GifOptions {
            width: 6,
            height: TargetHeight::Fixed(3),
            quality: QualityTier::Low,
            ..GifOptions::default()
        };
        let assembler = GifAssembler::new(ManualClock::new());
        let bytes = block_on(assembler.assemble(&mut GifCrateEncoder::default(), &sources, &options, || async {}))
            .unwrap();
        assert_eq!(gif_info(&bytes), (6, 3, 1));
    }

    #[test]
    fn test_timeout_between_frames() {
        let clock = ManualClock::new();
        let sources: Vec<_> = (0..3).map(|_| ImageSource::Bytes(png(4, 4, [9, 9, 9, 255]))).collect();
        let assembler = GifAssembler::new(&clock);
        let result = block_on(assembler.assemble(
            &mut GifCrateEncoder::default(),
            &sources,
            &small_options(),
            || {
                clock.advance(20_000);
                async {}
            },
        ));
        assert!(matches!(result, Err(Error::Timeout { limit_ms: 30_000 })));
    }

    #[test]
    fn test_empty_and_bad_frames() {
        let assembler = GifAssembler::new(ManualClock::new());
        let result = block_on(assembler.assemble(&mut GifCrateEncoder::default(), &[], &small_options(), || async {}));
        assert!(matches!(result, Err(Error::EmptySelection { required: 1, actual: 0 })));

        let sources = vec![
            ImageSource::Bytes(png(4, 4, [1, 2, 3, 255])),
            ImageSource::Base64("  ".into()),
        ];
        let err = block_on(assembler.assemble(&mut GifCrateEncoder::default(), &sources, &small_options(), || async {}))
            .unwrap_err();
        assert_eq!(err.to_string(), "Frame 1: empty data");

        let sources = vec![ImageSource::Bytes(b"not an image".to_vec())];
        let err = block_on(assembler.assemble(&mut GifCrateEncoder::default(), &sources, &small_options(), || async {}))
            .unwrap_err();
        assert!(matches!(err, Error::EncodingFailure { frame: Some(0), .. }));
    }

    #[test]
    fn test_request_options() {
        let request: GifRequest = serde_json::from_value(json!({
            "frames": [{"image_data": "abc"}],
            "options": {"framerate": 10, "width": 320, "height": "auto", "quality": "high"}
        }))
        .unwrap();
        let options = request.options();
        assert_eq!(options.frame_delay_ms, 100);
        assert_eq!(options.width, 320);
        assert_eq!(options.height, TargetHeight::Auto);
        assert_eq!(options.quality.sampling_speed(), 1);

        let request = GifRequest::from_json(r#"{"frames": [], "fps": 4, "options": {"height": 200}}"#).unwrap();
        let options = request.options();
        assert_eq!(options.frame_delay_ms, 250);
        assert_eq!(options.height, TargetHeight::Fixed(200));
        assert_eq!(options.quality, QualityTier::Medium);
    }

    #[test]
    fn test_session_reports_progress_and_url() {
        let request = GifRequest::from_json(
            &json!({"frames": [{"image_data": base64_png(4, 2, [200, 10, 10, 255])}], "options": {"width": 4}})
                .to_string(),
        )
        .unwrap();
        let session = GifSession::new(GifAssembler::new(ManualClock::new()), DataUrlFactory);
        let mut sink = RecordingSink::default();
        block_on(session.generate(&request, &mut GifCrateEncoder::default(), &mut sink, || async {}));

        assert_eq!(sink.events.len(), 2);
        assert_eq!(
            sink.events[0],
            (
                "gif_status_update".to_string(),
                json!({"status": "generating", "message": "Generating GIF from 1 frames..."})
            )
        );
        assert_eq!(sink.events[1].0, "gif_generation_complete");
        let url = sink.events[1].1["download_url"].as_str().unwrap();
        assert!(url.starts_with("data:image/gif;base64,"));
        assert!(!session.is_generating());
    }

    #[test]
    fn test_session_announces_encoder_on_mount() {
        let session = GifSession::default();
        let mut sink = RecordingSink::default();
        session.announce_ready(&mut sink);
        assert_eq!(
            sink.events,
            vec![
                (
                    "gif_status_update".to_string(),
                    json!({"status": "loading_ffmpeg", "message": "Loading GIF encoder..."})
                ),
                (
                    "gif_status_update".to_string(),
                    json!({"status": "ffmpeg_ready", "message": "GIF encoder ready"})
                ),
            ]
        );
        assert!(!session.is_generating());
    }

    #[test]
    fn test_session_errors() {
        let session = GifSession::new(GifAssembler::new(ManualClock::new()), DataUrlFactory);
        let mut sink = RecordingSink::default();
        block_on(session.generate(&GifRequest::default(), &mut GifCrateEncoder::default(), &mut sink, || async {}));
        assert_eq!(
            sink.events,
            vec![(
                "gif_status_update".to_string(),
                json!({"status": "error", "message": "No frames provided"})
            )]
        );

        let request = GifRequest::from_json(r#"{"frames": [{"image_data": ""}]}"#).unwrap();
        let mut sink = RecordingSink::default();
        block_on(session.generate(&request, &mut GifCrateEncoder::default(), &mut sink, || async {}));
        assert_eq!(sink.events.len(), 2);
        assert_eq!(
            sink.events[1].1,
            json!({"status": "error", "message": "GIF generation failed: Frame 0: empty data"})
        );
        assert!(!session.is_generating());
    }

    #[test]
    fn test_session_ignores_overlapping_run() {
        let session = GifSession::new(GifAssembler::new(ManualClock::new()), DataUrlFactory);
        session.generating.set(true);
        let request = GifRequest::from_json(r#"{"frames": [{"image_data": "abc"}]}"#).unwrap();
        let mut sink = RecordingSink::default();
        block_on(session.generate(&request, &mut GifCrateEncoder::default(), &mut sink, || async {}));
        assert!(sink.events.is_empty());
    }
}
