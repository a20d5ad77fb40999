// Pipeline module - ties decoder, compositor, encoder, scheduler and cache together

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use image::RgbaImage;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::cache::{CacheStats, CachedResult, Fingerprint, ProcessingCache};
use crate::codec::{DecodeError, FrameDecoder, FrameEncoder};
use crate::config::Config;
use crate::scheduler::{FrameProgress, Job, JobHandle, JobState, Scheduler};
use crate::watermark::{compositor, CompositorError, WatermarkDescriptor};

pub use crate::codec::is_animated;
pub use crate::error::PipelineError;

/// Per-job options for [`Orchestrator::watermark_gif`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GifJobOptions {
    /// Look up and store the result in the processing cache.
    pub use_cache: bool,
    /// No-progress interval for each codec backend attempt and for
    /// compositing. `None` waits forever.
    pub watchdog: Option<Duration>,
}

impl Default for GifJobOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            watchdog: Some(Duration::from_secs(crate::constants::DEFAULT_WATCHDOG_SECS)),
        }
    }
}

/// Final result of a GIF job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkOutput {
    pub bytes: Bytes,
    /// Animation was lost and only the first frame was written.
    pub degraded: bool,
    /// The source had more than one frame.
    pub is_animated: bool,
    pub from_cache: bool,
    pub frame_count: usize,
}

impl WatermarkOutput {
    /// `data:` URI suitable for an `<img>` preview.
    pub fn preview_data_uri(&self) -> String {
        format!("data:image/gif;base64,{}", STANDARD.encode(&self.bytes))
    }

    fn from_cached(cached: CachedResult) -> Self {
        Self {
            bytes: cached.bytes,
            degraded: cached.degraded,
            is_animated: cached.frame_count > 1,
            from_cache: true,
            frame_count: cached.frame_count,
        }
    }
}

/// Runs watermarking jobs and owns the processing cache.
#[derive(Debug)]
pub struct Orchestrator {
    scheduler: Scheduler,
    cache: Arc<Mutex<ProcessingCache>>,
    defaults: GifJobOptions,
}

impl Orchestrator {
    pub fn new(config: &Config) -> Self {
        let decoder = Arc::new(FrameDecoder::new(config.decoder.limits()));
        let encoder = Arc::new(FrameEncoder::new(config.encoder.quantizer_speed));
        let scheduler = Scheduler::new(config.pipeline.workers, decoder, encoder);

        let capacity = if config.pipeline.cache_enabled {
            config.pipeline.cache_capacity
        } else {
            0
        };
        let defaults = GifJobOptions {
            use_cache: config.pipeline.cache_enabled,
            watchdog: config.pipeline.watchdog(),
        };

        tracing::info!(
            workers = scheduler.workers(),
            cache_capacity = capacity,
            watchdog_secs = config.pipeline.watchdog_secs,
            "orchestrator ready"
        );

        Self::with_scheduler(scheduler, capacity, defaults)
    }

    /// Assemble from parts, e.g. a scheduler with custom codec backends.
    pub fn with_scheduler(
        scheduler: Scheduler,
        cache_capacity: usize,
        defaults: GifJobOptions,
    ) -> Self {
        Self {
            scheduler,
            cache: Arc::new(Mutex::new(ProcessingCache::new(cache_capacity))),
            defaults,
        }
    }

    /// Options taken from the configuration.
    pub fn default_options(&self) -> GifJobOptions {
        self.defaults
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    /// Start watermarking an animated GIF.
    ///
    /// Returns immediately; the work runs on the scheduler's worker pool.
    /// A cache hit produces a job that is already `Done`. Must be called
    /// from within a Tokio runtime.
    pub fn watermark_gif(
        &self,
        bytes: impl Into<Bytes>,
        descriptor: impl Into<Arc<WatermarkDescriptor>>,
        options: GifJobOptions,
    ) -> GifJob {
        let source = bytes.into();
        let descriptor = descriptor.into();

        let fingerprint = options
            .use_cache
            .then(|| Fingerprint::compute(&source, &descriptor));

        if let Some(fingerprint) = &fingerprint {
            if let Some(hit) = self.cache.lock().get(fingerprint) {
                tracing::info!(fingerprint = %fingerprint, "serving watermark from cache");
                return GifJob::cached(WatermarkOutput::from_cached(hit));
            }
        }

        let job = Job::new(source, descriptor).with_watchdog(options.watchdog);
        let handle = self.scheduler.submit(job);
        GifJob {
            inner: GifJobInner::Running(handle),
            commit: fingerprint.map(|fp| (fp, self.cache.clone())),
        }
    }

    /// Watermark a still image. Runs inline; no job, no cache.
    pub fn watermark_static_image(
        &self,
        bitmap: &RgbaImage,
        descriptor: &WatermarkDescriptor,
    ) -> Result<RgbaImage, CompositorError> {
        compositor::watermark_image(bitmap, descriptor)
    }
}

#[derive(Debug)]
enum GifJobInner {
    Running(JobHandle),
    Finished(WatermarkOutput),
}

/// A GIF watermarking job started by [`Orchestrator::watermark_gif`].
#[derive(Debug)]
pub struct GifJob {
    inner: GifJobInner,
    commit: Option<(Fingerprint, Arc<Mutex<ProcessingCache>>)>,
}

impl GifJob {
    fn cached(output: WatermarkOutput) -> Self {
        Self {
            inner: GifJobInner::Finished(output),
            commit: None,
        }
    }

    /// Scheduler job id; `None` for cache hits.
    pub fn id(&self) -> Option<u64> {
        match &self.inner {
            GifJobInner::Running(handle) => Some(handle.id()),
            GifJobInner::Finished(_) => None,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self.inner, GifJobInner::Finished(_))
    }

    pub fn state(&self) -> JobState {
        match &self.inner {
            GifJobInner::Running(handle) => handle.state(),
            GifJobInner::Finished(_) => JobState::Done,
        }
    }

    pub fn progress(&self) -> watch::Receiver<JobState> {
        match &self.inner {
            GifJobInner::Running(handle) => handle.progress(),
            GifJobInner::Finished(_) => watch::channel(JobState::Done).1,
        }
    }

    pub fn frame_progress(&self) -> FrameProgress {
        match &self.inner {
            GifJobInner::Running(handle) => handle.frame_progress(),
            GifJobInner::Finished(output) => FrameProgress {
                processed: output.frame_count,
                total: output.frame_count,
            },
        }
    }

    pub fn cancel(&self) {
        if let GifJobInner::Running(handle) = &self.inner {
            handle.cancel();
        }
    }

    /// Wait for the output and cache it on success.
    pub async fn wait(self) -> Result<WatermarkOutput, PipelineError> {
        let handle = match self.inner {
            GifJobInner::Finished(output) => return Ok(output),
            GifJobInner::Running(handle) => handle,
        };

        let output = handle.wait().await?;

        if let Some((fingerprint, cache)) = self.commit {
            cache.lock().put(
                fingerprint,
                CachedResult::new(output.bytes.clone(), output.degraded, output.frame_count),
            );
        }

        Ok(WatermarkOutput {
            bytes: output.bytes,
            degraded: output.degraded,
            is_animated: output.frame_count > 1,
            from_cache: false,
            frame_count: output.frame_count,
        })
    }
}

/// Output file name for a watermarked copy of `original`.
///
/// GIF results (degraded ones included) get `.gif`; static images are
/// written as PNG.
pub fn suggested_filename(original: &Path, is_gif: bool) -> String {
    let stem = original
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");
    let extension = if is_gif { "gif" } else { "png" };
    format!("{}-watermarked.{}", stem, extension)
}

/// Short human-readable status for a finished job.
pub fn status_message(result: &Result<WatermarkOutput, PipelineError>) -> String {
    match result {
        Ok(output) if output.from_cache => "Done (cached)".to_string(),
        Ok(output) if output.degraded => {
            "Done, but only the first frame could be kept".to_string()
        }
        Ok(output) => format!("Done ({} frames)", output.frame_count),
        Err(PipelineError::Cancelled) => "Cancelled".to_string(),
        Err(PipelineError::Timeout { stage, .. }) => format!("Timed out while {}", stage),
        Err(PipelineError::Decode(DecodeError::InvalidFormat)) => "Not a GIF file".to_string(),
        Err(PipelineError::Decode(_)) => "Could not read this GIF".to_string(),
        Err(PipelineError::Compositor(CompositorError::MissingImage)) => {
            "Watermark image is missing".to_string()
        }
        Err(PipelineError::Compositor(_)) => "Could not draw the watermark".to_string(),
        Err(PipelineError::Encode(_)) => "Could not write the GIF".to_string(),
        Err(PipelineError::Worker(_)) => "Internal error".to_string(),
    }
}
