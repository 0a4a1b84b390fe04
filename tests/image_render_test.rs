#![cfg(feature = "integration-tests")]

mod common;

use common::test_utils::{BLUE, GREEN, RED, TRANSPARENT, WHITE, pixel, with_gpu};
use flat_ngin::{DrawImageOptions, Filter, Image, ImagePart, Rect, Rgba};

#[test]
fn new_images_are_transparent() {
    let pixels = with_gpu(|gpu| Image::new(gpu, 5, 3, Filter::Nearest)?.pixels());
    assert_eq!(pixels.len(), 5 * 3 * 4);
    assert!(pixels.iter().all(|&b| b == 0));
}

#[test]
fn fill_covers_the_logical_area() {
    let pixels = with_gpu(|gpu| {
        let mut image = Image::new(gpu, 10, 6, Filter::Nearest)?;
        image.fill(RED)?;
        image.pixels()
    });
    assert_eq!(pixels.len(), 10 * 6 * 4);
    for y in 0..6 {
        for x in 0..10 {
            assert_eq!(pixel(&pixels, 10, x, y), RED, "at ({}, {})", x, y);
        }
    }
}

#[test]
fn clear_after_fill_is_transparent() {
    let corner = with_gpu(|gpu| {
        let mut image = Image::new(gpu, 4, 4, Filter::Nearest)?;
        image.fill(BLUE)?;
        image.clear()?;
        image.at(3, 3)
    });
    assert_eq!(corner, TRANSPARENT);
}

#[test]
fn filled_rect_only_touches_its_pixels() {
    let pixels = with_gpu(|gpu| {
        let mut image = Image::new(gpu, 8, 8, Filter::Nearest)?;
        image.draw_filled_rect(2, 2, 3, 3, GREEN)?;
        image.pixels()
    });
    assert_eq!(pixel(&pixels, 8, 2, 2), GREEN);
    assert_eq!(pixel(&pixels, 8, 4, 4), GREEN);
    assert_eq!(pixel(&pixels, 8, 1, 1), TRANSPARENT);
    assert_eq!(pixel(&pixels, 8, 5, 5), TRANSPARENT);
    assert_eq!(pixel(&pixels, 8, 5, 2), TRANSPARENT);
}

#[test]
fn horizontal_line_runs_through_its_row() {
    let pixels = with_gpu(|gpu| {
        let mut image = Image::new(gpu, 8, 4, Filter::Nearest)?;
        image.draw_line(0, 1, 7, 1, WHITE)?;
        image.pixels()
    });
    assert_eq!(pixel(&pixels, 8, 0, 1), WHITE);
    assert_eq!(pixel(&pixels, 8, 3, 1), WHITE);
    assert_eq!(pixel(&pixels, 8, 3, 0), TRANSPARENT);
    assert_eq!(pixel(&pixels, 8, 3, 2), TRANSPARENT);
}

#[test]
fn draw_image_scales_with_the_geometry_matrix() {
    let pixels = with_gpu(|gpu| {
        let mut src = Image::new(gpu, 2, 2, Filter::Nearest)?;
        src.fill(BLUE)?;
        let mut dst = Image::new(gpu, 8, 8, Filter::Nearest)?;
        let mut options = DrawImageOptions::default();
        options.geo.scale(2.0, 2.0);
        dst.draw_image(&src, &options)?;
        dst.pixels()
    });
    assert_eq!(pixel(&pixels, 8, 0, 0), BLUE);
    assert_eq!(pixel(&pixels, 8, 3, 3), BLUE);
    assert_eq!(pixel(&pixels, 8, 4, 4), TRANSPARENT);
    assert_eq!(pixel(&pixels, 8, 4, 0), TRANSPARENT);
}

#[test]
fn draw_image_translates() {
    let pixels = with_gpu(|gpu| {
        let mut src = Image::new(gpu, 2, 2, Filter::Nearest)?;
        src.fill(RED)?;
        let mut dst = Image::new(gpu, 8, 8, Filter::Nearest)?;
        let mut options = DrawImageOptions::default();
        options.geo.translate(5.0, 1.0);
        dst.draw_image(&src, &options)?;
        dst.pixels()
    });
    assert_eq!(pixel(&pixels, 8, 5, 1), RED);
    assert_eq!(pixel(&pixels, 8, 6, 2), RED);
    assert_eq!(pixel(&pixels, 8, 0, 0), TRANSPARENT);
    assert_eq!(pixel(&pixels, 8, 7, 3), TRANSPARENT);
}

#[test]
fn parts_copy_a_source_region() {
    let pixels = with_gpu(|gpu| {
        let mut src = Image::new(gpu, 4, 4, Filter::Nearest)?;
        src.fill(RED)?;
        src.draw_filled_rect(2, 0, 2, 4, GREEN)?;
        let mut dst = Image::new(gpu, 4, 4, Filter::Nearest)?;
        let options = DrawImageOptions {
            parts: Some(vec![ImagePart {
                dst: Rect::new(0, 0, 2, 2),
                src: Rect::new(2, 0, 2, 2),
            }]),
            ..Default::default()
        };
        dst.draw_image(&src, &options)?;
        dst.pixels()
    });
    assert_eq!(pixel(&pixels, 4, 0, 0), GREEN);
    assert_eq!(pixel(&pixels, 4, 1, 1), GREEN);
    assert_eq!(pixel(&pixels, 4, 2, 2), TRANSPARENT);
}

#[test]
fn color_matrix_is_applied_per_texel() {
    let color = with_gpu(|gpu| {
        let mut src = Image::new(gpu, 2, 2, Filter::Nearest)?;
        src.fill(WHITE)?;
        let mut dst = Image::new(gpu, 2, 2, Filter::Nearest)?;
        let mut options = DrawImageOptions::default();
        options.color.scale(0.0, 1.0, 1.0, 1.0);
        dst.draw_image(&src, &options)?;
        dst.at(1, 1)
    });
    assert_eq!(color, Rgba([0, 255, 255, 255]));
}

#[test]
fn empty_batches_leave_the_image_alone() {
    let pixels = with_gpu(|gpu| {
        let src = Image::new(gpu, 2, 2, Filter::Nearest)?;
        let mut dst = Image::new(gpu, 2, 2, Filter::Nearest)?;
        dst.fill(RED)?;
        let options = DrawImageOptions {
            parts: Some(Vec::new()),
            ..Default::default()
        };
        dst.draw_image(&src, &options)?;
        dst.pixels()
    });
    assert!(pixels.chunks(4).all(|p| p == [255, 0, 0, 255]));
}

#[test]
fn out_of_bounds_pixels_are_errors() {
    let result = with_gpu(|gpu| {
        let image = Image::new(gpu, 2, 2, Filter::Nearest)?;
        Ok(image.at(2, 0).is_err())
    });
    assert!(result);
}
