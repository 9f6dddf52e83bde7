//! Frame annotation

use camera_capture::VideoFrame;
use dms::{DmsAnalysis, EyeContour};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

const EYE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const ALERT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const GAUGE_FRAME: Rgb<u8> = Rgb([255, 255, 255]);
const GAUGE_LOW: Rgb<u8> = Rgb([255, 140, 0]);

/// EAR mapped to a full gauge
const GAUGE_FULL_SCALE: f32 = 0.5;
const GAUGE_WIDTH: u32 = 120;
const GAUGE_HEIGHT: u32 = 12;
const MARGIN: u32 = 10;
const BANNER_HEIGHT: u32 = 20;
const BORDER: u32 = 3;

/// Draw eye contours, the EAR gauge, and the drowsiness alert
pub fn annotate(frame: &VideoFrame, analysis: &DmsAnalysis, ear_threshold: f32) -> RgbImage {
    let mut image = frame.image.clone();

    for face in &analysis.faces {
        if let Some((left, right)) = &face.eyes {
            draw_contour(&mut image, left);
            draw_contour(&mut image, right);
        }
    }

    draw_gauge(&mut image, analysis.last_ear(), ear_threshold);

    if analysis.is_alarmed() {
        draw_alert(&mut image);
    }

    image
}

fn draw_contour(image: &mut RgbImage, eye: &EyeContour) {
    let points = eye.points();
    for (i, start) in points.iter().enumerate() {
        let end = &points[(i + 1) % points.len()];
        draw_line_segment_mut(image, (start.x, start.y), (end.x, end.y), EYE_COLOR);
    }
}

/// Top-right bar: fill is the EAR, the tick is the threshold
fn draw_gauge(image: &mut RgbImage, ear: Option<f32>, ear_threshold: f32) {
    if image.width() < GAUGE_WIDTH + 2 * MARGIN || image.height() < GAUGE_HEIGHT + 2 * MARGIN {
        return;
    }

    let x = (image.width() - GAUGE_WIDTH - MARGIN) as i32;
    let y = MARGIN as i32;
    let scale = |value: f32| {
        ((value / GAUGE_FULL_SCALE).clamp(0.0, 1.0) * GAUGE_WIDTH as f32).round() as u32
    };

    if let Some(ear) = ear {
        let fill = scale(ear);
        if fill > 0 {
            let color = if ear < ear_threshold { GAUGE_LOW } else { EYE_COLOR };
            draw_filled_rect_mut(image, Rect::at(x, y).of_size(fill, GAUGE_HEIGHT), color);
        }
    }

    draw_hollow_rect_mut(
        image,
        Rect::at(x, y).of_size(GAUGE_WIDTH, GAUGE_HEIGHT),
        GAUGE_FRAME,
    );

    let tick = x as f32 + scale(ear_threshold) as f32;
    draw_line_segment_mut(
        image,
        (tick, (y - 2) as f32),
        (tick, (y + GAUGE_HEIGHT as i32 + 1) as f32),
        ALERT_COLOR,
    );
}

/// Red banner top-left plus a red frame border
fn draw_alert(image: &mut RgbImage) {
    let (width, height) = image.dimensions();

    for inset in 0..BORDER.min(width / 2).min(height / 2) {
        draw_hollow_rect_mut(
            image,
            Rect::at(inset as i32, inset as i32).of_size(width - 2 * inset, height - 2 * inset),
            ALERT_COLOR,
        );
    }

    let banner_width = (width / 2).saturating_sub(MARGIN);
    if banner_width > 0 && height > BANNER_HEIGHT + MARGIN {
        draw_filled_rect_mut(
            image,
            Rect::at(MARGIN as i32, MARGIN as i32).of_size(banner_width, BANNER_HEIGHT),
            ALERT_COLOR,
        );
    }
}
