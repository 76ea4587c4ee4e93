use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use image::{Rgb, RgbImage};
use inference::OutputLayout;
use inference::processing::{TransformParams, post::PostProcessor, pre::PreProcessor};
use ndarray::{Array, IxDyn};

const NUM_ANCHORS: usize = 8400;

/// Create mock YOLO raw output (`[1, 5, 8400]`, one class) with N confident anchors
fn create_mock_yolo_output(num_detections: usize) -> ndarray::ArrayD<f32> {
    let mut output = Array::zeros(IxDyn(&[1, 5, NUM_ANCHORS]));

    for i in 0..NUM_ANCHORS {
        output[[0, 4, i]] = 0.01;
    }

    for i in 0..num_detections.min(NUM_ANCHORS) {
        // Spread boxes on a grid so NMS has both overlapping and disjoint pairs
        let col = (i % 20) as f32;
        let row = (i / 20) as f32;
        output[[0, 0, i]] = 16.0 + col * 30.0;
        output[[0, 1, i]] = 16.0 + row * 30.0;
        output[[0, 2, i]] = 40.0;
        output[[0, 3, i]] = 40.0;
        output[[0, 4, i]] = 0.9 - (i as f32) * 0.001;
    }

    output
}

fn benchmark_preprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocessing");

    let resolutions = [(640, 480), (1280, 720), (1920, 1080)];

    for (width, height) in resolutions.iter() {
        let image = RgbImage::from_pixel(*width, *height, Rgb([128, 128, 128]));
        let mut preprocessor = PreProcessor::default();

        group.bench_with_input(
            BenchmarkId::new("letterbox", format!("{}x{}", width, height)),
            &image,
            |b, image| {
                b.iter(|| preprocessor.preprocess_image(black_box(image)).unwrap());
            },
        );
    }

    group.finish();
}

fn benchmark_postprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("postprocessing");

    let post_processor = PostProcessor::new(0.3, 0.7, 10, OutputLayout::Raw);
    let transform = TransformParams {
        orig_width: 1920,
        orig_height: 1080,
        input_width: 640,
        input_height: 640,
        scale: 1.0 / 3.0,
        offset_x: 0.0,
        offset_y: 140.0,
    };

    for num_detections in [0, 10, 100, 400] {
        let output = create_mock_yolo_output(num_detections);

        group.bench_with_input(
            BenchmarkId::new("parse_detections", num_detections),
            &output,
            |b, output| {
                b.iter(|| {
                    post_processor
                        .parse_detections(black_box(&output.view()), black_box(&transform))
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_preprocessing, benchmark_postprocessing);
criterion_main!(benches);
