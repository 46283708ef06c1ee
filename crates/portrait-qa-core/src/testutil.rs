//! Fixtures shared by unit tests.

#![allow(
    clippy::expect_used,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss
)]

use std::collections::BTreeMap;
use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage};

use crate::domain::{
    AgeEstimate, BoundingBox, EmotionLikelihoods, FaceFeatures, FeatureReport, FeatureSource,
    ImageInput, LabelGuess, Likelihood, Point3, PoseAngles,
};

/// Textured synthetic portrait: a skin-toned ellipse over a graded, noisy background.
pub fn portrait(width: u32, height: u32) -> RgbImage {
    let mut state: u32 = 0x1234_5678;
    let (w, h) = (f64::from(width), f64::from(height));
    RgbImage::from_fn(width, height, |x, y| {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let noise = i32::from((state >> 24) as u8 % 25) - 12;

        let dx = (f64::from(x) - w * 0.5) / (w * 0.22);
        let dy = (f64::from(y) - h * 0.45) / (h * 0.3);
        let base: [i32; 3] = if dx * dx + dy * dy <= 1.0 {
            [205, 155, 125]
        } else {
            let stripe = if (x / 6 + y / 9) % 2 == 0 { 18 } else { 0 };
            let grade = (f64::from(y) / h * 60.0) as i32;
            [60 + grade / 2 + stripe, 90 + stripe, 130 - grade / 3 + stripe]
        };
        image::Rgb(base.map(|c| (c + noise).clamp(0, 255) as u8))
    })
}

/// Encodes an image as JPEG at quality 90.
pub fn jpeg_bytes(image: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 90)
        .encode_image(image)
        .expect("encode jpeg");
    bytes
}

/// Decoded JPEG portrait of the given size.
pub fn jpeg_input(width: u32, height: u32) -> ImageInput {
    ImageInput::decode(jpeg_bytes(&portrait(width, height)), None).expect("decode jpeg")
}

/// Decoded portrait encoded in an arbitrary format.
pub fn encoded_input(width: u32, height: u32, format: ImageFormat) -> ImageInput {
    let img = DynamicImage::ImageRgb8(portrait(width, height));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), format)
        .expect("encode image");
    ImageInput::decode(bytes, None).expect("decode image")
}

/// Clear, frontal face with a full landmark set.
pub fn clear_face(bbox: BoundingBox) -> FaceFeatures {
    let names = [
        "LEFT_EYE",
        "RIGHT_EYE",
        "LEFT_EYE_PUPIL",
        "RIGHT_EYE_PUPIL",
        "LEFT_EYE_TOP_BOUNDARY",
        "RIGHT_EYE_TOP_BOUNDARY",
        "LEFT_EYE_BOTTOM_BOUNDARY",
        "RIGHT_EYE_BOTTOM_BOUNDARY",
        "NOSE_TIP",
        "UPPER_LIP",
        "LOWER_LIP",
        "MOUTH_LEFT",
        "MOUTH_RIGHT",
        "MOUTH_CENTER",
        "CHIN_GNATHION",
        "FOREHEAD_GLABELLA",
    ];
    let (cx, cy) = bbox.center();
    let landmarks = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            (
                (*name).to_string(),
                Point3 {
                    x: cx as f32 + i as f32,
                    y: cy as f32,
                    z: None,
                },
            )
        })
        .collect::<BTreeMap<_, _>>();
    FaceFeatures {
        bbox,
        landmarks,
        detection_confidence: 0.98,
        landmarking_confidence: 0.9,
        pose: PoseAngles::default(),
        headwear: Likelihood::VeryUnlikely,
        eyewear: Likelihood::VeryUnlikely,
        blurred: Likelihood::VeryUnlikely,
        under_exposed: Likelihood::VeryUnlikely,
        emotions: EmotionLikelihoods {
            joy: Likelihood::Likely,
            ..EmotionLikelihoods::default()
        },
        age: Some(AgeEstimate {
            years: 30,
            confidence: 0.85,
        }),
        gender: None,
    }
}

/// Report with `count` clear faces side by side on a 640×640 image.
pub fn report_with_faces(count: usize) -> FeatureReport {
    let faces = (0..count)
        .map(|i| clear_face(BoundingBox::new(180 + 40 * i as u32, 120, 280, 300)))
        .collect();
    FeatureReport {
        faces,
        body: Some(BoundingBox::new(100, 80, 440, 560)),
        hair: vec![LabelGuess::new("brown", 0.85)],
        clothing: vec![LabelGuess::new("t-shirt", 0.7)],
        ..FeatureReport::empty(FeatureSource::Primary, 640, 640)
    }
}
