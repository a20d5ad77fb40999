// Watermark descriptor unit tests
// Construction-time validation and settings conversion

use gifstamp::watermark::{
    parse_hex_color, Anchor, AnchorBounds, DescriptorError, WatermarkDescriptor, WatermarkKind,
    WatermarkSettings,
};
use image::{Rgba, RgbaImage};
use rstest::rstest;

#[rstest]
#[case(WatermarkKind::Text, "")]
#[case(WatermarkKind::Text, "   ")]
#[case(WatermarkKind::TiledText, "\n")]
fn test_blank_text_is_rejected(#[case] kind: WatermarkKind, #[case] text: &str) {
    let err = WatermarkDescriptor::builder(kind).text(text).build().unwrap_err();
    assert_eq!(err, DescriptorError::EmptyText);
}

#[rstest]
#[case(f32::NAN)]
#[case(f32::INFINITY)]
#[case(0.0)]
#[case(-4.0)]
fn test_bad_font_size_is_rejected(#[case] size: f32) {
    let err = WatermarkDescriptor::builder(WatermarkKind::Text)
        .text("x")
        .font_size_px(size)
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        DescriptorError::InvalidValue {
            field: "font_size_px",
            ..
        }
    ));
}

#[test]
fn test_anchor_clamps_to_custom_bounds() {
    let wm = WatermarkDescriptor::builder(WatermarkKind::Text)
        .text("x")
        .anchor(-50.0, 500.0)
        .anchor_bounds(AnchorBounds {
            min_pct: 0.0,
            max_pct: 100.0,
        })
        .build()
        .unwrap();
    assert_eq!(wm.anchor(), Anchor::new(0.0, 100.0));
}

#[test]
fn test_default_bounds_allow_partial_overscan() {
    let wm = WatermarkDescriptor::builder(WatermarkKind::Text)
        .text("x")
        .anchor(-10.0, 115.0)
        .build()
        .unwrap();
    assert_eq!(wm.anchor(), Anchor::new(-10.0, 115.0));
}

#[test]
fn test_nan_anchor_bounds_are_rejected() {
    let err = WatermarkDescriptor::builder(WatermarkKind::Text)
        .text("x")
        .anchor_bounds(AnchorBounds {
            min_pct: f32::NAN,
            max_pct: 100.0,
        })
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        DescriptorError::InvalidValue {
            field: "anchor_bounds",
            ..
        }
    ));
}

#[test]
fn test_descriptor_equality_is_by_value() {
    let make = || {
        WatermarkDescriptor::builder(WatermarkKind::Image)
            .image_source(RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 255])))
            .build()
            .unwrap()
    };
    assert_eq!(make(), make());
}

#[rstest]
#[case("#fff", Rgba([255, 255, 255, 255]))]
#[case("#00FF7f", Rgba([0, 255, 127, 255]))]
#[case("#11223344", Rgba([0x11, 0x22, 0x33, 0x44]))]
fn test_hex_colors(#[case] input: &str, #[case] expected: Rgba<u8>) {
    assert_eq!(parse_hex_color(input).unwrap(), expected);
}

#[test]
fn test_settings_round_trip_through_yaml() {
    let settings = WatermarkSettings {
        text: "SAMPLE".to_string(),
        rotation_deg: 45.0,
        anchor: Anchor::new(25.0, 75.0),
        ..Default::default()
    };
    let yaml = serde_yaml::to_string(&settings).unwrap();
    let parsed: WatermarkSettings = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed, settings);

    let wm = parsed.to_descriptor(AnchorBounds::default()).unwrap();
    assert_eq!(wm.text_content(), "SAMPLE");
    assert_eq!(wm.rotation_deg(), 45.0);
    assert_eq!(wm.anchor(), Anchor::new(25.0, 75.0));
}

#[test]
fn test_text_settings_ignore_image_path() {
    let settings = WatermarkSettings {
        text: "x".to_string(),
        image_path: Some("/does/not/exist.png".into()),
        ..Default::default()
    };
    assert!(settings.to_descriptor(AnchorBounds::default()).is_ok());
}
