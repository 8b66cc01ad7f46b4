use crate::{
    Result,
    constants::{AUTO_ID_WIDTH, QUICK_KEYS_PER_ROW, QUICK_KEYS_TOTAL},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a device as reported to the remote controller.
///
/// Bitmap devices use their hardware serial number. Hybrid devices have no
/// stable serial, so the manager synthesizes `<prefix>-<sequence>` ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build a synthesized id such as `xencelabs-quick-keys-001`.
    #[must_use]
    pub fn synthesized(prefix: &str, sequence: usize) -> Self {
        Self(format!("{prefix}-{sequence:0width$}", width = AUTO_ID_WIDTH))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DeviceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Capability descriptor announced to the remote controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProps {
    pub keys_total: u8,
    pub keys_per_row: u8,
    pub bitmaps: bool,
    pub colours: bool,
    pub text: bool,
}

impl RegisterProps {
    /// Props of a bitmap-only key grid.
    #[must_use]
    pub fn bitmap_grid(keys_total: u8, keys_per_row: u8) -> Self {
        Self {
            keys_total,
            keys_per_row,
            bitmaps: true,
            colours: false,
            text: false,
        }
    }

    /// Props of the Quick Keys text/color panel.
    #[must_use]
    pub fn quick_keys() -> Self {
        Self {
            keys_total: QUICK_KEYS_TOTAL,
            keys_per_row: QUICK_KEYS_PER_ROW,
            bitmaps: false,
            colours: true,
            text: true,
        }
    }
}

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Split a packed `0xRRGGBB` value into channels. Bits above 24 are ignored.
    #[must_use]
    pub const fn from_u32(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xff) as u8,
            g: ((value >> 8) & 0xff) as u8,
            b: (value & 0xff) as u8,
        }
    }

    #[must_use]
    pub const fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl std::str::FromStr for Rgb {
    type Err = Error;

    /// Parse `#rrggbb` (the leading `#` is optional).
    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(Error::InvalidColor(s.to_string()));
        }
        let value = u32::from_str_radix(hex, 16).map_err(|_| Error::InvalidColor(s.to_string()))?;
        Ok(Self::from_u32(value))
    }
}

/// A draw request addressed at one logical key.
///
/// Which fields matter depends on the device: bitmap devices need `image`,
/// hybrid devices use `text` and, on the wheel key, `color`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DrawCommand {
    pub key_index: u8,
    pub image: Option<Vec<u8>>,
    pub color: Option<Rgb>,
    pub text: Option<String>,
}

impl DrawCommand {
    #[must_use]
    pub fn new(key_index: u8) -> Self {
        Self {
            key_index,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Lifecycle state of a wrapped device.
///
/// Valid transitions:
/// - Discovered → Opening → Initializing → Ready, or Disconnected when the link is down
/// - Ready ⇄ Disconnected (hybrid devices only)
/// - Opening, Initializing, Ready or Disconnected → Closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceState {
    Discovered,
    Opening,
    Initializing,
    Ready,
    Disconnected,
    Closed,
}

impl DeviceState {
    /// Check whether moving to `next` is a legal lifecycle step.
    #[must_use]
    pub fn can_transition_to(self, next: DeviceState) -> bool {
        use DeviceState::*;
        matches!(
            (self, next),
            (Discovered, Opening)
                | (Opening, Initializing)
                | (Opening, Closed)
                | (Initializing, Ready)
                | (Initializing, Disconnected)
                | (Initializing, Closed)
                | (Ready, Disconnected)
                | (Disconnected, Ready)
                | (Ready, Closed)
                | (Disconnected, Closed)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == DeviceState::Closed
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            DeviceState::Discovered => "discovered",
            DeviceState::Opening => "opening",
            DeviceState::Initializing => "initializing",
            DeviceState::Ready => "ready",
            DeviceState::Disconnected => "disconnected",
            DeviceState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Events delivered by the remote-controller client.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RemoteEvent {
    Connected,
    Disconnected,
    HostAddressChanged,
    SetBrightness { device_id: DeviceId, percent: u8 },
    Blank { device_id: DeviceId },
    Draw { device_id: DeviceId, command: DrawCommand },
    DeviceAcknowledged { device_id: DeviceId },
}

impl RemoteEvent {
    /// The device a command is addressed to, if any.
    #[must_use]
    pub fn device_id(&self) -> Option<&DeviceId> {
        match self {
            RemoteEvent::SetBrightness { device_id, .. }
            | RemoteEvent::Blank { device_id }
            | RemoteEvent::Draw { device_id, .. }
            | RemoteEvent::DeviceAcknowledged { device_id } => Some(device_id),
            RemoteEvent::Connected
            | RemoteEvent::Disconnected
            | RemoteEvent::HostAddressChanged => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, "xencelabs-quick-keys-001")]
    #[case(42, "xencelabs-quick-keys-042")]
    #[case(1234, "xencelabs-quick-keys-1234")]
    fn test_synthesized_device_id(#[case] sequence: usize, #[case] expected: &str) {
        let id = DeviceId::synthesized("xencelabs-quick-keys", sequence);
        assert_eq!(id.as_str(), expected);
    }

    #[rstest]
    #[case("#ff8000", Rgb::new(255, 128, 0))]
    #[case("00ff00", Rgb::new(0, 255, 0))]
    #[case("#000000", Rgb::BLACK)]
    fn test_rgb_parse(#[case] input: &str, #[case] expected: Rgb) {
        let color: Rgb = input.parse().unwrap();
        assert_eq!(color, expected);
    }

    #[rstest]
    #[case("#fff")]
    #[case("#gg0000")]
    #[case("")]
    fn test_rgb_parse_invalid(#[case] input: &str) {
        let result: Result<Rgb> = input.parse();
        assert!(matches!(result, Err(Error::InvalidColor(_))));
    }

    #[test]
    fn test_rgb_from_u32() {
        let color = Rgb::from_u32(0x12_34_56);
        assert_eq!(color, Rgb::new(0x12, 0x34, 0x56));
        assert_eq!(color.to_u32(), 0x12_34_56);
        assert_eq!(Rgb::from_u32(0xff_00_00_00), Rgb::BLACK);
        assert_eq!(color.to_string(), "#123456");
    }

    #[test]
    fn test_register_props_serialization() {
        let json = serde_json::to_string(&RegisterProps::quick_keys()).unwrap();
        assert_eq!(
            json,
            r#"{"keysTotal":12,"keysPerRow":6,"bitmaps":false,"colours":true,"text":true}"#
        );
    }

    #[test]
    fn test_draw_command_builder() {
        let command = DrawCommand::new(11)
            .with_color(Rgb::new(1, 2, 3))
            .with_text("MUTE");
        assert_eq!(command.key_index, 11);
        assert_eq!(command.color, Some(Rgb::new(1, 2, 3)));
        assert_eq!(command.text.as_deref(), Some("MUTE"));
        assert!(command.image.is_none());
    }

    #[test]
    fn test_device_state_transitions() {
        use DeviceState::*;
        assert!(Discovered.can_transition_to(Opening));
        assert!(Opening.can_transition_to(Initializing));
        assert!(Initializing.can_transition_to(Ready));
        assert!(Initializing.can_transition_to(Disconnected));
        assert!(Ready.can_transition_to(Disconnected));
        assert!(Disconnected.can_transition_to(Ready));
        assert!(Ready.can_transition_to(Closed));
        assert!(!Closed.can_transition_to(Ready));
        assert!(!Closed.can_transition_to(Initializing));
        assert!(!Discovered.can_transition_to(Ready));
        assert!(Closed.is_terminal());
    }

    #[test]
    fn test_remote_event_device_id() {
        let id = DeviceId::new("AL12H1A00001");
        let event = RemoteEvent::Blank {
            device_id: id.clone(),
        };
        assert_eq!(event.device_id(), Some(&id));
        assert_eq!(RemoteEvent::Connected.device_id(), None);
    }
}
