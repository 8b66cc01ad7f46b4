//! Bitmap deck wrapper (Elgato Stream Deck family).
//!
//! Keys take raw RGB images. The remote controller always sends images at the
//! source icon size; decks with a different native size get every image
//! resampled through an [`ImageWriteQueue`], decks that match are written
//! directly. Status is shown as a full-panel card from a [`CardGenerator`].

use std::sync::Arc;

use image::{
    RgbImage,
    imageops::{self, FilterType},
};
use satellite_core::{
    DeviceId, DeviceState, DrawCommand, Error, RegisterProps, Result,
    constants::RGB_CHANNELS,
};
use satellite_hardware::{AnyDeck, DeckDevice, SurfaceEvent};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::card::CardGenerator;
use crate::generation::Generation;
use crate::write_queue::{ImageWriteQueue, KeyImageSink};
use crate::wrappers::{KeyAction, RemoteContext, Surface, spawn_input_forwarder, transition};

/// Resample a square RGB key image from `from` to `to` pixels per edge.
///
/// # Errors
///
/// Returns [`Error::TransformFailure`] when `source` is not a `from × from`
/// RGB buffer.
pub fn resample_key(key: u8, source: Vec<u8>, from: u32, to: u32) -> Result<Vec<u8>> {
    let expected = from as usize * from as usize * RGB_CHANNELS;
    if source.len() != expected {
        return Err(Error::transform(
            key,
            format!("expected {} bytes, got {}", expected, source.len()),
        ));
    }
    let image = RgbImage::from_raw(from, from, source)
        .ok_or_else(|| Error::transform(key, "buffer does not fit image dimensions"))?;
    Ok(imageops::resize(&image, to, to, FilterType::Triangle).into_raw())
}

/// Queue stages for one deck: resample on the blocking pool, then write if
/// the generation is still current.
#[derive(Debug)]
struct DeckKeySink {
    device_id: DeviceId,
    deck: Arc<AnyDeck>,
    generation: Generation,
    source_size: u32,
}

impl KeyImageSink for DeckKeySink {
    async fn transform(&self, key: u8, image: Vec<u8>) -> Result<Vec<u8>> {
        let (from, to) = (self.source_size, self.deck.info().icon_size);
        tokio::task::spawn_blocking(move || resample_key(key, image, from, to))
            .await
            .map_err(|e| Error::transform(key, e.to_string()))?
    }

    async fn write(&self, key: u8, generation: u64, image: Vec<u8>) -> Result<()> {
        if !self.generation.is_current(generation) {
            trace!(device_id = %self.device_id, key, generation, "Dropped stale key image");
            return Ok(());
        }
        self.deck.fill_key(key, &image).await?;
        Ok(())
    }

    fn report(&self, key: u8, error: &Error) {
        warn!(device_id = %self.device_id, key, error = %error, "Key image update failed");
    }
}

/// Wrapper around an opened bitmap deck.
///
/// The device id is the deck's serial number.
#[derive(Debug)]
pub struct BitmapDevice {
    device_id: DeviceId,
    deck: Arc<AnyDeck>,
    cards: Arc<dyn CardGenerator>,
    generation: Generation,
    queue: Option<ImageWriteQueue<DeckKeySink>>,
    input_task: Option<JoinHandle<()>>,
    status_task: Option<JoinHandle<()>>,
    state: DeviceState,
}

impl BitmapDevice {
    /// Wrap an opened deck.
    ///
    /// A write queue is created only when the deck's icon size differs from
    /// `source_icon_size`. Must be called from within a Tokio runtime.
    pub fn new(deck: AnyDeck, cards: Arc<dyn CardGenerator>, source_icon_size: u32) -> Self {
        let device_id = DeviceId::new(deck.info().serial_number.clone());
        let deck = Arc::new(deck);
        let generation = Generation::new();

        let queue = (deck.info().icon_size != source_icon_size).then(|| {
            ImageWriteQueue::new(Arc::new(DeckKeySink {
                device_id: device_id.clone(),
                deck: Arc::clone(&deck),
                generation: generation.clone(),
                source_size: source_icon_size,
            }))
        });

        Self {
            device_id,
            deck,
            cards,
            generation,
            queue,
            input_task: None,
            status_task: None,
            state: DeviceState::Initializing,
        }
    }

    /// Render counter; exposed for diagnostics.
    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Whether draws go through the resampling queue.
    pub fn resamples(&self) -> bool {
        self.queue.is_some()
    }

    fn abort_queue(&self) {
        if let Some(queue) = &self.queue {
            queue.abort();
        }
    }

    fn stop_tasks(&mut self) {
        for task in [self.input_task.take(), self.status_task.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
    }

    fn forward_key(event: &SurfaceEvent) -> Option<KeyAction> {
        match event {
            SurfaceEvent::KeyDown(key) => Some(KeyAction::Down(*key)),
            SurfaceEvent::KeyUp(key) => Some(KeyAction::Up(*key)),
            _ => None,
        }
    }
}

impl Surface for BitmapDevice {
    fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    fn product_name(&self) -> String {
        format!("Satellite StreamDeck: {}", self.deck.info().model)
    }

    fn register_props(&self) -> RegisterProps {
        let info = self.deck.info();
        RegisterProps::bitmap_grid(info.key_count, info.key_columns)
    }

    fn state(&self) -> DeviceState {
        self.state
    }

    async fn initialize(&mut self, context: RemoteContext, initial_status: &str) -> Result<()> {
        debug!(device_id = %self.device_id, "Registering key events");
        if let Some(events) = self.deck.take_events() {
            self.input_task = Some(spawn_input_forwarder(
                self.device_id.clone(),
                events,
                context.clone(),
                Self::forward_key,
            ));
        }

        let host = context.host();
        let result = async {
            self.blank().await?;
            self.show_status(&host, initial_status).await
        }
        .await;

        if let Err(error) = result {
            self.stop_tasks();
            return Err(error);
        }

        transition(&self.device_id, &mut self.state, DeviceState::Ready);
        info!(device_id = %self.device_id, model = %self.deck.info().model, "Bitmap deck initialized");
        Ok(())
    }

    async fn device_added(&mut self) -> Result<()> {
        self.generation.bump();
        Ok(())
    }

    async fn set_brightness(&mut self, percent: u8) -> Result<()> {
        self.deck.set_brightness(percent.min(100)).await?;
        Ok(())
    }

    async fn blank(&mut self) -> Result<()> {
        self.generation.bump();
        self.abort_queue();
        self.deck.clear_panel().await?;
        Ok(())
    }

    async fn draw(&mut self, command: DrawCommand) -> Result<()> {
        let Some(image) = command.image else {
            return Err(Error::InvalidCommand(format!(
                "Cannot draw key {} of {} without an image",
                command.key_index, self.device_id
            )));
        };
        if command.key_index >= self.deck.info().key_count {
            return Err(Error::InvalidCommand(format!(
                "Key {} out of range for {}",
                command.key_index, self.device_id
            )));
        }

        match &self.queue {
            Some(queue) => {
                queue.submit(command.key_index, self.generation.current(), image);
            }
            None => self.deck.fill_key(command.key_index, &image).await?,
        }
        Ok(())
    }

    async fn show_status(&mut self, host_label: &str, status_text: &str) -> Result<()> {
        self.abort_queue();
        let generation = self.generation.bump();
        if let Some(previous) = self.status_task.take() {
            previous.abort();
        }

        let (width, height) = self.deck.info().panel_size();
        let deck = Arc::clone(&self.deck);
        let cards = Arc::clone(&self.cards);
        let current = self.generation.clone();
        let device_id = self.device_id.clone();
        let host_label = host_label.to_string();
        let status_text = status_text.to_string();

        self.status_task = Some(tokio::spawn(async move {
            let rendered = tokio::task::spawn_blocking(move || {
                cards.generate_status_bitmap(width, height, &host_label, &status_text)
            })
            .await;

            let card = match rendered {
                Ok(Ok(card)) => card,
                Ok(Err(error)) => {
                    warn!(device_id = %device_id, error = %error, "Status card render failed");
                    return;
                }
                Err(error) => {
                    warn!(device_id = %device_id, error = %error, "Status card task failed");
                    return;
                }
            };

            if !current.is_current(generation) {
                trace!(device_id = %device_id, generation, "Dropped stale status card");
                return;
            }
            if let Err(error) = deck.fill_panel(&card).await {
                warn!(device_id = %device_id, error = %error, "Failed to fill panel");
            }
        }));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.abort_queue();
        self.generation.bump();
        self.stop_tasks();
        transition(&self.device_id, &mut self.state, DeviceState::Closed);
        self.deck.close().await?;
        Ok(())
    }
}

impl Drop for BitmapDevice {
    fn drop(&mut self) {
        self.stop_tasks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::BasicCardGenerator;
    use crate::remote::RecordingRemote;
    use satellite_core::constants::source_image_len;
    use satellite_hardware::mock::{DeckWrite, MockDeck, MockDeckHandle};
    use satellite_hardware::types::DeckInfo;
    use std::time::Duration;

    fn wrap(icon_size: u32) -> (BitmapDevice, MockDeckHandle) {
        let (deck, handle) = MockDeck::new(DeckInfo::new("Stream Deck", "AL01", 15, 5, icon_size));
        let device = BitmapDevice::new(AnyDeck::Mock(deck), Arc::new(BasicCardGenerator), 72);
        (device, handle)
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not met in time");
    }

    #[test]
    fn test_resample_key_size() {
        let scaled = resample_key(0, vec![128; source_image_len()], 72, 96).unwrap();
        assert_eq!(scaled.len(), 96 * 96 * 3);
        assert!(scaled.iter().all(|&b| b == 128));
    }

    #[test]
    fn test_resample_rejects_short_buffer() {
        let result = resample_key(4, vec![0; 10], 72, 96);
        assert!(matches!(result, Err(Error::TransformFailure { key: 4, .. })));
    }

    #[tokio::test]
    async fn test_identity() {
        let (device, _handle) = wrap(72);
        assert_eq!(device.device_id().as_str(), "AL01");
        assert_eq!(device.product_name(), "Satellite StreamDeck: Stream Deck");
        assert_eq!(device.register_props(), RegisterProps::bitmap_grid(15, 5));
        assert_eq!(device.state(), DeviceState::Initializing);
        assert!(!device.resamples());
    }

    #[tokio::test]
    async fn test_draw_without_image_fails() {
        let (mut device, handle) = wrap(72);
        let result = device.draw(DrawCommand::new(2).with_text("nope")).await;
        assert!(matches!(result, Err(Error::InvalidCommand(_))));
        assert!(handle.writes().is_empty());
    }

    #[tokio::test]
    async fn test_draw_native_size_writes_directly() {
        let (mut device, handle) = wrap(72);
        let image = vec![9; source_image_len()];

        device
            .draw(DrawCommand::new(3).with_image(image.clone()))
            .await
            .unwrap();

        assert_eq!(handle.key_fills(), vec![(3, image)]);
    }

    #[tokio::test]
    async fn test_draw_resampled_through_queue() {
        let (mut device, handle) = wrap(96);
        assert!(device.resamples());

        device
            .draw(DrawCommand::new(3).with_image(vec![50; source_image_len()]))
            .await
            .unwrap();

        wait_for(|| !handle.key_fills().is_empty()).await;
        let fills = handle.key_fills();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].0, 3);
        assert_eq!(fills[0].1.len(), 96 * 96 * 3);
    }

    #[tokio::test]
    async fn test_blank_discards_queued_draws() {
        let (mut device, handle) = wrap(96);

        device
            .draw(DrawCommand::new(1).with_image(vec![1; source_image_len()]))
            .await
            .unwrap();
        device.blank().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(handle.key_fills().is_empty());
        assert!(handle.writes().contains(&DeckWrite::ClearPanel));
    }

    #[tokio::test]
    async fn test_device_added_bumps_generation() {
        let (mut device, _handle) = wrap(96);
        let before = device.generation().current();
        device.device_added().await.unwrap();
        assert!(device.generation().current() > before);
    }

    #[tokio::test]
    async fn test_show_status_fills_panel() {
        let (mut device, handle) = wrap(72);
        device.show_status("10.0.0.5", "Connected").await.unwrap();
        wait_for(|| handle.panel_fill_count() == 1).await;
    }

    #[tokio::test]
    async fn test_superseded_status_is_dropped() {
        let (mut device, handle) = wrap(72);
        device.show_status("10.0.0.5", "Connecting").await.unwrap();
        device.blank().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handle.panel_fill_count(), 0);
    }

    #[tokio::test]
    async fn test_initialize_blanks_and_forwards_keys() {
        let (mut device, handle) = wrap(72);
        let remote = RecordingRemote::new("10.0.0.5");
        let context = RemoteContext::new(Arc::new(remote.clone()));

        device.initialize(context, "Connecting").await.unwrap();
        assert_eq!(device.state(), DeviceState::Ready);
        assert!(device.is_ready());
        assert_eq!(handle.writes()[0], DeckWrite::ClearPanel);

        handle.press(7).await.unwrap();
        wait_for(|| !remote.key_events().is_empty()).await;
        assert_eq!(
            remote.key_events(),
            vec![crate::remote::RemoteCall::KeyDown(DeviceId::new("AL01"), 7)]
        );
    }

    #[tokio::test]
    async fn test_initialize_failure_stops_forwarding() {
        let (mut device, handle) = wrap(72);
        let remote = RecordingRemote::new("10.0.0.5");
        handle.fail_writes(true);

        let result = device
            .initialize(RemoteContext::new(Arc::new(remote.clone())), "Connecting")
            .await;

        assert!(matches!(result, Err(Error::HardwareWriteFailure(_))));
        assert!(device.input_task.is_none());
        assert!(handle.press(1).await.is_err() || remote.key_events().is_empty());
    }

    #[tokio::test]
    async fn test_close_releases_deck() {
        let (mut device, handle) = wrap(96);
        device.close().await.unwrap();
        assert!(handle.is_closed());
        assert_eq!(device.state(), DeviceState::Closed);
    }
}
