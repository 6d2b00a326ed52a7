use anyhow::{anyhow, Result};
use image::{Rgba, RgbaImage};
use tray_icon::Icon;

use crate::status::IconColor;

pub const ICON_SIZE: u32 = 64;
/// Gap between the glyph and the icon edge, in pixels.
const MARGIN: u32 = 8;

fn rgba(color: IconColor) -> Rgba<u8> {
    match color {
        IconColor::Red => Rgba([255, 0, 0, 255]),
        IconColor::Green => Rgba([0, 128, 0, 255]),
        IconColor::Orange => Rgba([255, 165, 0, 255]),
    }
}

/// Filled circle of `color` on a transparent background.
pub fn circle(color: IconColor) -> RgbaImage {
    let fill = rgba(color);
    let center = ICON_SIZE as f32 / 2.0;
    let radius = center - MARGIN as f32;
    RgbaImage::from_fn(ICON_SIZE, ICON_SIZE, |x, y| {
        let dx = x as f32 + 0.5 - center;
        let dy = y as f32 + 0.5 - center;
        if dx * dx + dy * dy <= radius * radius {
            fill
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

pub fn tray_icon(color: IconColor) -> Result<Icon> {
    let img = circle(color);
    let (width, height) = img.dimensions();
    Icon::from_rgba(img.into_raw(), width, height)
        .map_err(|e| anyhow!("Failed to create tray icon: {e:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_has_fixed_size() {
        assert_eq!(circle(IconColor::Red).dimensions(), (ICON_SIZE, ICON_SIZE));
    }

    #[test]
    fn center_is_filled_and_corners_are_transparent() {
        let img = circle(IconColor::Green);
        assert_eq!(*img.get_pixel(32, 32), Rgba([0, 128, 0, 255]));
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(ICON_SIZE - 1, ICON_SIZE - 1)[3], 0);
        // Inside the margin but outside the circle.
        assert_eq!(img.get_pixel(MARGIN, MARGIN)[3], 0);
    }

    #[test]
    fn each_state_has_a_distinct_colour() {
        let red = *circle(IconColor::Red).get_pixel(32, 32);
        let green = *circle(IconColor::Green).get_pixel(32, 32);
        let orange = *circle(IconColor::Orange).get_pixel(32, 32);
        assert_ne!(red, green);
        assert_ne!(red, orange);
        assert_ne!(green, orange);
    }

    #[test]
    fn tray_icon_accepts_generated_pixels() {
        assert!(tray_icon(IconColor::Orange).is_ok());
    }
}
