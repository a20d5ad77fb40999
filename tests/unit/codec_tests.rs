// Codec module unit tests
// Decode/encode chains against GIFs written by the gif crate directly

use super::common::*;
use bytes::Bytes;
use gifstamp::codec::{
    DecodeError, DecodeLimits, DisposalMethod, EncodeBackend, FlattenedEncoder, Frame,
    FrameDecoder, FrameEncoder, GifDocument, Heartbeat, NativeEncoder, STATIC_FALLBACK,
};
use image::{Rgba, RgbaImage};
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;

fn mixed_document() -> GifDocument {
    let frames = vec![
        Frame::new(
            RgbaImage::from_pixel(12, 12, Rgba([200, 0, 0, 255])),
            3,
            DisposalMethod::DoNotDispose,
        ),
        Frame::new(
            RgbaImage::from_pixel(4, 4, Rgba([0, 200, 0, 255])),
            0,
            DisposalMethod::RestoreToBackground,
        )
        .with_offset(2, 3),
        Frame::new(
            RgbaImage::from_pixel(6, 5, Rgba([0, 0, 200, 255])),
            25,
            DisposalMethod::RestoreToPrevious,
        )
        .with_offset(6, 7),
    ];
    GifDocument::new(12, 12, 3, frames).unwrap()
}

#[rstest]
#[case(gif::Repeat::Infinite, 0)]
#[case(gif::Repeat::Finite(1), 2)]
#[case(gif::Repeat::Finite(4), 5)]
fn test_decoder_reports_play_count(#[case] repeat: gif::Repeat, #[case] expected: u16) {
    let bytes = solid_gif(8, 8, 2, 5, repeat);
    let doc = FrameDecoder::default().decode(&bytes).unwrap();
    assert_eq!(doc.loop_count(), expected);
}

#[test]
fn test_decoder_keeps_frame_order_and_delay() {
    let bytes = solid_gif(10, 10, 6, 7, gif::Repeat::Infinite);
    let doc = FrameDecoder::default().decode(&bytes).unwrap();

    assert_eq!(doc.frame_count(), 6);
    for (i, frame) in doc.frames().iter().enumerate() {
        assert_eq!(frame.delay_centiseconds, 7);
        assert_eq!(*frame.pixels.get_pixel(5, 5), frame_color(i));
    }
}

#[test]
fn test_native_chain_preserves_document_structure() {
    let doc = mixed_document();
    let encoded = FrameEncoder::default().encode(&doc).unwrap();
    assert!(!encoded.degraded);

    let decoded = FrameDecoder::default().decode(&encoded.bytes).unwrap();
    assert_eq!(decoded.loop_count(), 3);
    assert_eq!(decoded.frame_count(), 3);

    let expected: Vec<_> = doc
        .frames()
        .iter()
        .map(|f| (f.delay_centiseconds, f.disposal, f.x_offset, f.y_offset, f.width(), f.height()))
        .collect();
    let actual: Vec<_> = decoded
        .frames()
        .iter()
        .map(|f| (f.delay_centiseconds, f.disposal, f.x_offset, f.y_offset, f.width(), f.height()))
        .collect();
    assert_eq!(actual, expected);
}

#[test]
fn test_flattened_encoder_matches_visible_animation() {
    let doc = mixed_document();
    let bytes = FlattenedEncoder::new(10)
        .encode(&doc, &Heartbeat::new())
        .unwrap();
    let decoded = FrameDecoder::default().decode(&bytes).unwrap();

    assert_eq!(decoded.frame_count(), doc.frame_count());
    let expected = doc.coalesce();
    let actual = decoded.coalesce();
    for (want, got) in expected.iter().zip(actual.iter()) {
        assert_eq!(got.delay_centiseconds, want.delay_centiseconds);
        for (x, y) in [(0, 0), (3, 4), (8, 9), (11, 11)] {
            let delta = channel_delta(*want.pixels.get_pixel(x, y), *got.pixels.get_pixel(x, y));
            assert!(delta <= 12, "pixel ({x}, {y}) off by {delta}");
        }
    }
}

#[test]
fn test_truncated_gif_is_reported_per_backend() {
    let bytes = solid_gif(8, 8, 2, 5, gif::Repeat::Infinite);
    let truncated = &bytes[..20];

    match FrameDecoder::default().decode(truncated) {
        Err(DecodeError::AllBackendsFailed(failures)) => {
            let names: Vec<_> = failures.iter().map(|f| f.backend).collect();
            assert_eq!(names, vec!["native", "coalescing", "still"]);
        }
        other => panic!("expected every backend to fail, got {other:?}"),
    }
}

#[test]
fn test_frame_limit_applies_to_whole_chain() {
    let bytes = solid_gif(4, 4, 5, 5, gif::Repeat::Infinite);
    let decoder = FrameDecoder::new(DecodeLimits {
        max_frames: 3,
        ..DecodeLimits::default()
    });

    // Only the still-frame backend can satisfy a three-frame cap.
    let doc = decoder.decode(&bytes).unwrap();
    assert_eq!(doc.frame_count(), 1);
}

#[test]
fn test_static_fallback_keeps_first_frame_pixels() {
    let doc = GifDocument::new(
        6,
        6,
        0,
        vec![
            Frame::new(
                RgbaImage::from_pixel(6, 6, Rgba([255, 255, 255, 255])),
                5,
                DisposalMethod::None,
            ),
            Frame::new(
                RgbaImage::from_pixel(6, 6, Rgba([0, 0, 0, 255])),
                5,
                DisposalMethod::None,
            ),
        ],
    )
    .unwrap();

    let result = FrameEncoder::with_backends(vec![Box::new(BrokenEncoder)])
        .encode(&doc)
        .unwrap();
    assert!(result.degraded);
    assert_eq!(result.backend, "static-fallback");

    let decoded = FrameDecoder::default().decode(&result.bytes).unwrap();
    assert_eq!(decoded.frame_count(), 1);
    assert_eq!(
        *decoded.frames()[0].pixels.get_pixel(3, 3),
        Rgba([255, 255, 255, 255])
    );
}

#[test]
fn test_native_encoder_name() {
    assert_eq!(NativeEncoder::new(10).name(), "native");
    assert_eq!(
        FrameEncoder::default().backend_names(),
        vec!["native", "flattened"]
    );
}

#[test]
fn test_watched_decode_skips_a_hanging_backend() {
    let gate = Gate::new();
    let decoder = gated_then_native_decoder(&gate);
    let bytes = Bytes::from(solid_gif(8, 8, 3, 5, gif::Repeat::Infinite));

    let doc = decoder
        .decode_watched(bytes, Duration::from_millis(300))
        .unwrap();
    assert_eq!(doc.frame_count(), 3);
    assert_eq!(doc.loop_count(), 0);
    assert_eq!(gate.entered(), 1);

    gate.open();
}

#[test]
fn test_watched_encode_moves_past_a_hanging_backend() {
    let gate = Gate::new();
    let encoder = FrameEncoder::with_backends(vec![
        Box::new(GatedEncoder { gate: gate.clone() }),
        Box::new(NativeEncoder::default()),
    ]);

    let result = encoder
        .encode_watched(Arc::new(mixed_document()), Duration::from_millis(100))
        .unwrap();
    assert_eq!(result.backend, "native");
    assert!(!result.degraded);

    gate.open();
}

#[test]
fn test_watched_encode_of_stalled_chain_is_degraded() {
    let gate = Gate::new();
    let encoder = FrameEncoder::with_backends(vec![Box::new(GatedEncoder { gate: gate.clone() })]);

    let result = encoder
        .encode_watched(Arc::new(mixed_document()), Duration::from_millis(50))
        .unwrap();
    assert!(result.degraded);
    assert_eq!(result.backend, STATIC_FALLBACK);

    gate.open();
}

#[test]
fn test_paced_encoder_survives_a_shorter_watchdog() {
    let frames = (0..6)
        .map(|i| {
            Frame::new(
                RgbaImage::from_pixel(8, 8, frame_color(i)),
                4,
                DisposalMethod::None,
            )
        })
        .collect();
    let doc = Arc::new(GifDocument::new(8, 8, 0, frames).unwrap());
    let encoder = FrameEncoder::with_backends(vec![Box::new(PacedEncoder {
        per_frame: Duration::from_millis(100),
    })]);

    let result = encoder
        .encode_watched(doc, Duration::from_millis(300))
        .unwrap();
    assert_eq!(result.backend, "paced");
    assert!(!result.degraded);
}
