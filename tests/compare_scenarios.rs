//! Comparison engine properties over in-memory rasters

use image::{Rgba, RgbaImage};
use pagediff::compare::{compare_rasters, encode_png};
use pagediff::{compare, Comparison, Error};

fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(color))
}

fn pixel_count(result: &Comparison) -> Option<u64> {
    match result {
        Comparison::Different { pixels, .. } => Some(*pixels),
        _ => None,
    }
}

#[test]
fn block_difference_counts_every_pixel() {
    let base = solid(10, 10, [255, 255, 255, 255]);
    let mut changed = base.clone();
    for y in 4..6 {
        for x in 4..6 {
            changed.put_pixel(x, y, Rgba([0, 0, 0, 255]));
        }
    }

    let result = compare_rasters(&base, &changed).unwrap();
    assert_eq!(pixel_count(&result), Some(4));
}

#[test]
fn variant_and_count_are_commutative() {
    let a = solid(8, 8, [255, 255, 255, 255]);
    let mut b = a.clone();
    b.put_pixel(2, 3, Rgba([200, 0, 0, 255]));
    b.put_pixel(6, 1, Rgba([0, 0, 200, 255]));

    let forward = compare_rasters(&a, &b).unwrap();
    let backward = compare_rasters(&b, &a).unwrap();

    assert_eq!(pixel_count(&forward), Some(2));
    assert_eq!(pixel_count(&forward), pixel_count(&backward));

    let tall = solid(8, 9, [255, 255, 255, 255]);
    assert_eq!(
        compare_rasters(&a, &tall).unwrap(),
        compare_rasters(&tall, &a).unwrap()
    );
}

#[test]
fn repeated_comparisons_are_byte_identical() {
    let base = encode_png(&solid(6, 6, [250, 250, 250, 255])).unwrap();
    let mut changed_img = solid(6, 6, [250, 250, 250, 255]);
    changed_img.put_pixel(0, 5, Rgba([10, 200, 40, 255]));
    let changed = encode_png(&changed_img).unwrap();

    let first = compare(&base, &changed).unwrap();
    let second = compare(&base, &changed).unwrap();

    match (first, second) {
        (
            Comparison::Different { pixels: p1, diff: d1 },
            Comparison::Different { pixels: p2, diff: d2 },
        ) => {
            assert_eq!(p1, p2);
            assert_eq!(d1, d2, "diff images must be byte-identical run-to-run");
        }
        other => panic!("expected two Different results, got {other:?}"),
    }
}

#[test]
fn identical_encoded_buffers_are_identical() {
    let png = encode_png(&solid(5, 3, [12, 34, 56, 255])).unwrap();
    assert_eq!(compare(&png, &png).unwrap(), Comparison::Identical);
}

#[test]
fn mismatched_dimensions_never_reach_the_pixel_walk() {
    let small = encode_png(&solid(4, 4, [0, 0, 0, 255])).unwrap();
    let wide = encode_png(&solid(5, 4, [0, 0, 0, 255])).unwrap();
    assert_eq!(
        compare(&small, &wide).unwrap(),
        Comparison::DimensionMismatch
    );
}

#[test]
fn malformed_buffer_is_a_decode_error() {
    let good = encode_png(&solid(2, 2, [0, 0, 0, 255])).unwrap();
    let err = compare(b"definitely not a png", &good).unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "got {err:?}");
}
