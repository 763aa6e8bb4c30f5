//! End-to-end tests of the classify → enhance → evaluate pipeline.
//!
//! Most tests substitute a fixed classifier so they run without model
//! files. `test_clip_classifier_on_white_image` uses the real CLIP
//! encoders and skips itself when they have not been downloaded.

use std::sync::Arc;

use image::{ColorType, DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use lumen_core::enhance::color::rgb_to_hsv_pixel;
use lumen_core::{
    Classification, Classify, Config, Domain, DomainClassifier, DomainScore, ErrorKind, Pipeline,
    PipelineError, RunOptions, Stage,
};

/// Always answers with the same domain.
struct FixedClassifier(Domain);

impl Classify for FixedClassifier {
    fn classify(&self, _image: &DynamicImage) -> Result<Classification, PipelineError> {
        let scores: Vec<DomainScore> = Domain::ALL
            .iter()
            .map(|&domain| DomainScore {
                domain,
                probability: if domain == self.0 { 0.8 } else { 0.1 },
            })
            .collect();
        Ok(Classification {
            domain: self.0,
            confidence: 0.8,
            scores,
        })
    }
}

fn pipeline(domain: Domain) -> Pipeline {
    Pipeline::new(Arc::new(FixedClassifier(domain)), &Config::default())
}

fn street_photo() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(64, 48, |x, y| {
        let sky = y < 20;
        if sky {
            Rgb([90, 140, (200 + x / 4) as u8])
        } else {
            Rgb([(60 + x) as u8, (100 + y) as u8, 40])
        }
    }))
}

#[test]
fn test_pipeline_is_deterministic() {
    for domain in Domain::ALL {
        let p = pipeline(domain);
        let first = p.run(&street_photo(), &RunOptions::default()).unwrap();
        let second = p.run(&street_photo(), &RunOptions::default()).unwrap();
        assert_eq!(first.enhanced, second.enhanced, "{domain} output differs");
        assert_eq!(first.metrics, second.metrics);
    }
}

#[test]
fn test_scores_sum_to_one_and_match_domain() {
    let result = pipeline(Domain::Landscape)
        .run(&street_photo(), &RunOptions::default())
        .unwrap();
    let total: f32 = result.scores.iter().map(|s| s.probability).sum();
    assert!((total - 1.0).abs() < 1e-5);
    assert_eq!(result.domain, Domain::Landscape);
    assert_eq!(result.summary(), "Detected: landscape (Confidence: 80.00%)");
}

#[test]
fn test_one_pixel_image_with_and_without_evaluation() {
    let tiny = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([120, 60, 30])));
    for domain in Domain::ALL {
        let p = pipeline(domain);

        let err = p.run(&tiny, &RunOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert_eq!(err.stage(), Some(Stage::Evaluate));

        let result = p.run(&tiny, &RunOptions::without_metrics()).unwrap();
        assert_eq!((result.enhanced.width(), result.enhanced.height()), (1, 1));
        assert!(result.metrics.is_none());
    }
}

#[test]
fn test_document_output_is_single_channel() {
    let p = pipeline(Domain::Document);
    let rgba = DynamicImage::ImageRgba8(RgbaImage::from_fn(40, 30, |x, _| {
        let v = if x % 5 == 0 { 20 } else { 230 };
        Rgba([v, v, v, 255])
    }));
    for input in [street_photo(), rgba] {
        let result = p.run(&input, &RunOptions::default()).unwrap();
        assert_eq!(result.enhanced.color(), ColorType::L8);
        assert_eq!(
            (result.enhanced.width(), result.enhanced.height()),
            (input.width(), input.height())
        );
    }
}

#[test]
fn test_saturated_landscape_stays_saturated() {
    let saturated = DynamicImage::ImageRgb8(RgbImage::from_fn(32, 32, |x, _| match x % 3 {
        0 => Rgb([255, 0, 0]),
        1 => Rgb([0, 255, 0]),
        _ => Rgb([0, 0, 255]),
    }));
    let result = pipeline(Domain::Landscape)
        .run(&saturated, &RunOptions::default())
        .unwrap();
    assert_eq!(result.enhanced.color(), ColorType::Rgb8);
    assert_eq!((result.enhanced.width(), result.enhanced.height()), (32, 32));
    for p in result.enhanced.to_rgb8().pixels() {
        assert!(rgb_to_hsv_pixel(p.0)[1] >= 250, "saturation dropped: {:?}", p.0);
    }
}

#[test]
fn test_uniform_gray_product_stays_uniform() {
    let gray = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 100, Rgb([128, 128, 128])));
    let result = pipeline(Domain::Product)
        .run(&gray, &RunOptions::default())
        .unwrap();

    let out = result.enhanced.to_rgb8();
    assert_eq!(out.dimensions(), (100, 100));
    assert_eq!(result.enhanced.color(), ColorType::Rgb8);
    let first = *out.get_pixel(0, 0);
    assert!(out.pixels().all(|p| *p == first));
}

#[test]
fn test_input_is_not_modified() {
    let original = street_photo();
    let copy = original.clone();
    for domain in Domain::ALL {
        let _ = pipeline(domain).run(&original, &RunOptions::default()).unwrap();
    }
    assert_eq!(original, copy);
}

#[test]
fn test_clip_classifier_on_white_image() {
    let config = Config::default();
    let model_dir = config.model_dir();
    if !DomainClassifier::model_exists(&config.classifier, &model_dir) {
        eprintln!("Skipping: CLIP model files not found under {:?}", model_dir);
        return;
    }

    let classifier = DomainClassifier::load(&config.classifier, &model_dir).unwrap();
    let white = DynamicImage::ImageRgb8(RgbImage::from_pixel(224, 224, Rgb([255, 255, 255])));

    let first = classifier.classify(&white).unwrap();
    let second = classifier.classify(&white).unwrap();
    assert_eq!(first.domain, second.domain);
    assert_eq!(first.confidence, second.confidence);
    assert!(first.confidence > 0.0 && first.confidence < 1.0);
    assert!(Domain::ALL.contains(&first.domain));

    let total: f32 = first.scores.iter().map(|s| s.probability).sum();
    assert!((total - 1.0).abs() < 1e-4);
}
