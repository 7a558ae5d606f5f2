//! Wiring of the core services, done once at startup.

use crate::capture::Snapshotter;
use crate::config::{get_unauthorized_cache_max_size, get_unauthorized_cooldown, Settings};
use crate::detection::DetectionScheduler;
use crate::dispatch::{ActionRegistry, DenialThrottle, Dispatcher, MenuModel, RegistryError};
use crate::hardware::{Camera, MotionSensor};
use crate::transport::Messenger;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Shared handles to the dispatcher and the detection job
///
/// Both hold the same [`Snapshotter`], so commands and alarms never use
/// the camera at the same time.
#[derive(Clone)]
pub struct AppContext {
    /// Command and callback router
    pub dispatcher: Arc<Dispatcher>,
    /// Periodic motion check
    pub detection: Arc<DetectionScheduler>,
}

impl AppContext {
    /// Build the context from settings and the hardware/transport collaborators.
    ///
    /// Detection starts disabled; the caller decides when to enable it.
    ///
    /// # Errors
    ///
    /// Returns a `RegistryError` if a routing table in the settings is
    /// invalid or the menu references an unregistered callback.
    pub fn new(
        settings: &Settings,
        messenger: Arc<dyn Messenger>,
        sensor: Arc<dyn MotionSensor>,
        camera: Arc<dyn Camera>,
    ) -> Result<Self, RegistryError> {
        let registry = ActionRegistry::from_settings(settings)?;
        let menu = MenuModel::default();
        registry.validate_menu(&menu)?;

        let snapshots = Arc::new(Snapshotter::new(camera, messenger.clone()));
        let detection = Arc::new(DetectionScheduler::new(
            sensor,
            snapshots.clone(),
            settings.photo_chat_id(),
            settings.detection_period(),
        ));

        let mut dispatcher = Dispatcher::new(
            registry,
            menu,
            settings.owner_id,
            settings.photo_chat_id(),
            messenger,
            snapshots,
            detection.clone(),
        );

        let cooldown = get_unauthorized_cooldown();
        if cooldown > 0 {
            let max_size = get_unauthorized_cache_max_size();
            info!(
                "Throttling rejection messages (cooldown: {}s, max senders: {})",
                cooldown, max_size
            );
            dispatcher = dispatcher
                .with_denial_throttle(DenialThrottle::new(Duration::from_secs(cooldown), max_size));
        }

        Ok(Self {
            dispatcher: Arc::new(dispatcher),
            detection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_settings;
    use crate::dispatch::ActionKind;
    use crate::testing::{FakeCamera, FakeSensor, RecordingMessenger};
    use std::collections::HashMap;

    fn build(settings: &Settings) -> Result<AppContext, RegistryError> {
        AppContext::new(
            settings,
            Arc::new(RecordingMessenger::default()),
            Arc::new(FakeSensor::always(false)),
            Arc::new(FakeCamera::default()),
        )
    }

    #[test]
    fn test_defaults_build_disabled_detection() -> Result<(), RegistryError> {
        let ctx = build(&test_settings())?;
        assert!(!ctx.detection.is_enabled());
        assert_eq!(ctx.detection.period().as_secs(), 5);
        assert!(ctx.dispatcher.registry().command("photo").is_some());
        Ok(())
    }

    #[test]
    fn test_command_table_override() -> Result<(), RegistryError> {
        let mut settings = test_settings();
        settings.commands = Some(HashMap::from([(
            "snap".to_string(),
            ActionKind::CaptureAndSend,
        )]));

        let ctx = build(&settings)?;
        let registry = ctx.dispatcher.registry();
        assert!(registry.command("snap").is_some());
        assert!(registry.command("photo").is_none());
        // Menu callbacks are unaffected
        assert!(registry.callback("photo").is_some());
        Ok(())
    }

    #[test]
    fn test_callback_table_must_cover_menu() {
        let mut settings = test_settings();
        settings.callbacks = Some(HashMap::from([
            ("menu".to_string(), ActionKind::ShowMenu),
            ("photo".to_string(), ActionKind::CaptureAndSend),
        ]));

        assert!(matches!(
            build(&settings),
            Err(RegistryError::UnresolvedMenuToken(_))
        ));
    }

    #[test]
    fn test_denial_throttle_is_off_by_default() -> Result<(), RegistryError> {
        let ctx = build(&test_settings())?;
        assert!(ctx.dispatcher.denial_throttle().is_none());
        Ok(())
    }

    #[test]
    fn test_invalid_command_name_is_rejected() {
        let mut settings = test_settings();
        settings.commands = Some(HashMap::from([(
            "Take Photo".to_string(),
            ActionKind::CaptureAndSend,
        )]));

        assert!(matches!(
            build(&settings),
            Err(RegistryError::InvalidCommandName(_))
        ));
    }
}
