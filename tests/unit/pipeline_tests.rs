// Pipeline module unit tests
// End-to-end runs through the orchestrator: decode, composite, encode, cache

use super::common::*;
use gifstamp::codec::{DecodeError, DecodeLimits, FrameDecoder, FrameEncoder};
use gifstamp::pipeline::{
    is_animated, status_message, GifJobOptions, Orchestrator, PipelineError,
};
use gifstamp::scheduler::{JobState, Scheduler, Stage};
use gifstamp::watermark::{
    CompositorError, DescriptorError, WatermarkDescriptor, WatermarkKind,
};
use image::{Rgba, RgbaImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn no_watchdog() -> GifJobOptions {
    GifJobOptions {
        use_cache: true,
        watchdog: None,
    }
}

fn orchestrator_with(decoder: FrameDecoder, encoder: FrameEncoder) -> Orchestrator {
    Orchestrator::with_scheduler(
        Scheduler::new(2, Arc::new(decoder), Arc::new(encoder)),
        8,
        no_watchdog(),
    )
}

fn default_orchestrator() -> Orchestrator {
    orchestrator_with(FrameDecoder::default(), FrameEncoder::default())
}

fn draft_scene() -> WatermarkDescriptor {
    WatermarkDescriptor::builder(WatermarkKind::Text)
        .text("DRAFT")
        .anchor(50.0, 50.0)
        .rotation_deg(-30.0)
        .opacity(0.4)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_draft_scenario_keeps_animation_and_marks_center() {
    let source = solid_gif(100, 100, 10, 10, gif::Repeat::Infinite);
    let orchestrator = default_orchestrator();

    let output = orchestrator
        .watermark_gif(source.clone(), draft_scene(), no_watchdog())
        .wait()
        .await
        .unwrap();

    assert!(!output.degraded);
    assert!(output.is_animated);
    assert!(!output.from_cache);
    assert_eq!(output.frame_count, 10);

    let decoder = FrameDecoder::default();
    let before = decoder.decode(&source).unwrap();
    let after = decoder.decode(&output.bytes).unwrap();

    assert_eq!(after.frame_count(), 10);
    assert_eq!(after.loop_count(), 0);
    assert_eq!((after.width(), after.height()), (100, 100));

    let before_frames = before.coalesce();
    let after_frames = after.coalesce();
    for (i, (a, b)) in before_frames.iter().zip(after_frames.iter()).enumerate() {
        assert_eq!(b.delay_centiseconds, 10, "frame {i} delay");
        // Corners are far from the text, so frame order is visible there.
        assert!(channel_delta(*a.pixels.get_pixel(1, 1), *b.pixels.get_pixel(1, 1)) <= 12);
        assert!(
            channel_delta(*a.pixels.get_pixel(50, 50), *b.pixels.get_pixel(50, 50)) > 20,
            "frame {i} center unchanged"
        );
    }
}

/// Solid blue first frame, then a fully transparent frame over it.
fn blue_then_clear_gif(width: u16, height: u16) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = gif::Encoder::new(&mut out, width, height, &[]).unwrap();
        encoder.set_repeat(gif::Repeat::Infinite).unwrap();
        for color in [[0u8, 0, 255, 255], [0, 0, 0, 0]] {
            let mut rgba: Vec<u8> = (0..usize::from(width) * usize::from(height))
                .flat_map(|_| color)
                .collect();
            let mut frame = gif::Frame::from_rgba_speed(width, height, &mut rgba, 10);
            frame.delay = 10;
            frame.dispose = gif::DisposalMethod::Keep;
            encoder.write_frame(&frame).unwrap();
        }
    }
    out
}

#[tokio::test]
async fn test_transparent_frame_keeps_showing_the_watermarked_frame_below() {
    let source = blue_then_clear_gif(160, 80);
    let wm = WatermarkDescriptor::builder(WatermarkKind::Text)
        .text("DRAFT")
        .font_size_px(40.0)
        .opacity(0.4)
        .build()
        .unwrap();

    let output = default_orchestrator()
        .watermark_gif(source, wm, no_watchdog())
        .wait()
        .await
        .unwrap();
    assert!(!output.degraded);

    let screens = FrameDecoder::default()
        .decode(&output.bytes)
        .unwrap()
        .coalesce();
    assert_eq!(screens.len(), 2);
    let differing = screens[0]
        .pixels
        .pixels()
        .zip(screens[1].pixels.pixels())
        .filter(|(a, b)| a != b)
        .count();
    assert_eq!(differing, 0);
    // The watermark did land on the first frame.
    assert!(screens[0]
        .pixels
        .pixels()
        .any(|p| *p != Rgba([0, 0, 255, 255])));
}

#[tokio::test]
async fn test_not_a_gif_is_rejected_before_any_backend() {
    let calls = Arc::new(AtomicUsize::new(0));
    let decoder = FrameDecoder::with_backends(
        vec![Box::new(CountingBackend {
            calls: calls.clone(),
        })],
        DecodeLimits::default(),
    );
    let orchestrator = orchestrator_with(decoder, FrameEncoder::default());

    let result = orchestrator
        .watermark_gif(&b"not a gif"[..], draft(16.0), no_watchdog())
        .wait()
        .await;

    assert_eq!(
        result,
        Err(PipelineError::Decode(DecodeError::InvalidFormat))
    );
    assert_eq!(status_message(&result), "Not a GIF file");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_image_watermark_without_source_is_rejected() {
    let err = WatermarkDescriptor::builder(WatermarkKind::Image)
        .build()
        .unwrap_err();
    assert_eq!(err, DescriptorError::MissingImage);

    // Even an unvalidated descriptor never reaches the pixels.
    let orchestrator = default_orchestrator();
    let wm = WatermarkDescriptor::builder(WatermarkKind::Image).build_unvalidated();
    let result = orchestrator
        .watermark_gif(
            solid_gif(8, 8, 2, 5, gif::Repeat::Infinite),
            wm,
            no_watchdog(),
        )
        .wait()
        .await;
    assert_eq!(
        result,
        Err(PipelineError::Compositor(CompositorError::MissingImage))
    );
}

#[tokio::test]
async fn test_second_run_is_served_from_cache() {
    let orchestrator = default_orchestrator();
    let source = solid_gif(24, 24, 3, 5, gif::Repeat::Infinite);
    let wm = Arc::new(draft(10.0));

    let first = orchestrator
        .watermark_gif(source.clone(), wm.clone(), no_watchdog())
        .wait()
        .await
        .unwrap();

    let job = orchestrator.watermark_gif(source, wm, no_watchdog());
    assert!(job.is_cached());
    assert_eq!(job.state(), JobState::Done);
    assert_eq!(job.frame_progress().processed, 3);
    let second = job.wait().await.unwrap();

    assert!(second.from_cache);
    assert_eq!(second.bytes, first.bytes);
    assert_eq!(second.frame_count, 3);
    assert_eq!(status_message(&Ok(second)), "Done (cached)");

    let stats = orchestrator.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entries, 1);
}

#[tokio::test]
async fn test_cache_can_be_bypassed() {
    let orchestrator = default_orchestrator();
    let source = solid_gif(16, 16, 2, 5, gif::Repeat::Infinite);
    let options = GifJobOptions {
        use_cache: false,
        watchdog: None,
    };

    orchestrator
        .watermark_gif(source.clone(), draft(8.0), options)
        .wait()
        .await
        .unwrap();
    let job = orchestrator.watermark_gif(source, draft(8.0), options);
    assert!(!job.is_cached());
    assert!(!job.wait().await.unwrap().from_cache);
    assert_eq!(orchestrator.cache_stats().entries, 0);
}

#[tokio::test]
async fn test_different_watermark_misses_cache() {
    let orchestrator = default_orchestrator();
    let source = solid_gif(16, 16, 2, 5, gif::Repeat::Infinite);

    orchestrator
        .watermark_gif(source.clone(), draft(8.0), no_watchdog())
        .wait()
        .await
        .unwrap();
    let job = orchestrator.watermark_gif(source, draft(9.0), no_watchdog());
    assert!(!job.is_cached());
    job.wait().await.unwrap();
    assert_eq!(orchestrator.cache_stats().entries, 2);
}

#[tokio::test]
async fn test_failing_encoders_degrade_to_first_frame() {
    let orchestrator = orchestrator_with(
        FrameDecoder::default(),
        FrameEncoder::with_backends(vec![Box::new(BrokenEncoder)]),
    );
    let source = solid_gif(20, 20, 4, 5, gif::Repeat::Infinite);

    let result = orchestrator
        .watermark_gif(source, draft(8.0), no_watchdog())
        .wait()
        .await;
    let output = result.clone().unwrap();

    assert!(output.degraded);
    assert_eq!(output.frame_count, 4);
    assert!(status_message(&result).contains("first frame"));
    assert!(!is_animated(&output.bytes));

    let decoded = FrameDecoder::default().decode(&output.bytes).unwrap();
    assert_eq!(decoded.frame_count(), 1);
}

#[tokio::test]
async fn test_watchdog_fails_stalled_job_and_caches_nothing() {
    let gate = Gate::new();
    let orchestrator = Orchestrator::with_scheduler(
        Scheduler::new(1, gated_decoder(&gate), Arc::new(FrameEncoder::default())),
        4,
        no_watchdog(),
    );
    let options = GifJobOptions {
        use_cache: true,
        watchdog: Some(Duration::from_millis(50)),
    };

    let job = orchestrator.watermark_gif(
        solid_gif(8, 8, 2, 5, gif::Repeat::Infinite),
        draft(8.0),
        options,
    );
    gate.wait_entered(1).await;
    let result = job.wait().await;

    assert!(matches!(
        result,
        Err(PipelineError::Timeout {
            stage: Stage::Decoding,
            ..
        })
    ));
    assert_eq!(status_message(&result), "Timed out while decoding");
    assert_eq!(orchestrator.cache_stats().entries, 0);

    gate.open();
}

#[tokio::test]
async fn test_cancelled_job_is_not_cached() {
    let gate = Gate::new();
    let orchestrator = Orchestrator::with_scheduler(
        Scheduler::new(1, gated_decoder(&gate), Arc::new(FrameEncoder::default())),
        4,
        no_watchdog(),
    );

    let job = orchestrator.watermark_gif(
        solid_gif(8, 8, 2, 5, gif::Repeat::Infinite),
        draft(8.0),
        no_watchdog(),
    );
    gate.wait_entered(1).await;
    job.cancel();
    gate.open();

    let result = job.wait().await;
    assert_eq!(result, Err(PipelineError::Cancelled));
    assert_eq!(status_message(&result), "Cancelled");
    assert_eq!(orchestrator.cache_stats().entries, 0);
}

#[test]
fn test_static_image_is_watermarked_in_place() {
    let orchestrator = default_orchestrator();
    let bitmap = RgbaImage::from_pixel(120, 80, Rgba([10, 10, 10, 255]));
    let out = orchestrator
        .watermark_static_image(&bitmap, &draft_scene())
        .unwrap();

    assert_eq!(out.dimensions(), bitmap.dimensions());
    assert!(channel_delta(*out.get_pixel(60, 40), *bitmap.get_pixel(60, 40)) > 20);
    assert_eq!(out.get_pixel(0, 0), bitmap.get_pixel(0, 0));
}

#[test]
fn test_is_animated_helper() {
    assert!(is_animated(&solid_gif(4, 4, 2, 5, gif::Repeat::Infinite)));
    assert!(!is_animated(&solid_gif(4, 4, 1, 5, gif::Repeat::Infinite)));
    assert!(!is_animated(b"not a gif"));
}
