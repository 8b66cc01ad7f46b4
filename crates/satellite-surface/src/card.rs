//! Status card rendering for bitmap decks.
//!
//! A bitmap deck has no text primitive, so connection status is shown by
//! filling the whole key grid with a generated card. Rendering runs on the
//! blocking pool; generators are plain synchronous code.

use image::{ImageBuffer, Rgba, RgbaImage};
use satellite_core::{
    Error, Result,
    constants::{STATUS_CONNECTED, STATUS_DISCONNECTED},
};

/// Produces a full-panel RGBA status image.
pub trait CardGenerator: Send + Sync + std::fmt::Debug {
    /// Render a `width × height` RGBA card for `host_label` / `status_text`.
    fn generate_status_bitmap(
        &self,
        width: u32,
        height: u32,
        host_label: &str,
        status_text: &str,
    ) -> Result<Vec<u8>>;
}

/// Default generator: a solid panel tinted by connection state with a
/// lighter band along the top edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicCardGenerator;

impl BasicCardGenerator {
    fn background(status_text: &str) -> Rgba<u8> {
        match status_text {
            STATUS_CONNECTED => Rgba([0x10, 0x40, 0x18, 0xff]),
            STATUS_DISCONNECTED => Rgba([0x50, 0x10, 0x10, 0xff]),
            _ => Rgba([0x20, 0x20, 0x28, 0xff]),
        }
    }
}

impl CardGenerator for BasicCardGenerator {
    fn generate_status_bitmap(
        &self,
        width: u32,
        height: u32,
        host_label: &str,
        status_text: &str,
    ) -> Result<Vec<u8>> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidCommand(format!(
                "Cannot render a {width}x{height} status card"
            )));
        }

        let background = Self::background(status_text);
        let band = Rgba([
            background[0].saturating_add(0x30),
            background[1].saturating_add(0x30),
            background[2].saturating_add(0x30),
            0xff,
        ]);
        // Band width tracks the host label so a changed host is visible
        let band_height = (height / 8).max(1);
        let band_width = if host_label.is_empty() {
            0
        } else {
            width.min(host_label.len() as u32 * (width / 16).max(1))
        };

        let card: RgbaImage = ImageBuffer::from_fn(width, height, |x, y| {
            if y < band_height && x < band_width {
                band
            } else {
                background
            }
        });
        Ok(card.into_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satellite_core::constants::RGBA_CHANNELS;

    #[test]
    fn test_card_size() {
        let card = BasicCardGenerator
            .generate_status_bitmap(360, 216, "10.0.0.5", STATUS_CONNECTED)
            .unwrap();
        assert_eq!(card.len(), 360 * 216 * RGBA_CHANNELS);
    }

    #[test]
    fn test_card_tint_depends_on_status() {
        let connected = BasicCardGenerator
            .generate_status_bitmap(8, 8, "", STATUS_CONNECTED)
            .unwrap();
        let disconnected = BasicCardGenerator
            .generate_status_bitmap(8, 8, "", STATUS_DISCONNECTED)
            .unwrap();
        assert_ne!(connected[..4], disconnected[..4]);
    }

    #[test]
    fn test_card_rejects_empty_panel() {
        let result = BasicCardGenerator.generate_status_bitmap(0, 72, "host", "Connecting");
        assert!(matches!(result, Err(Error::InvalidCommand(_))));
    }
}
