//! Owner-gated execution of routed actions.

use super::menu::MenuModel;
use super::messages;
use super::registry::{ActionKind, ActionRegistry, Route};
use super::denial_throttle::{Denial, DenialThrottle};
use crate::capture::{CaptureReason, Snapshotter};
use crate::detection::DetectionScheduler;
use crate::error::ActionError;
use crate::transport::Messenger;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Sender and reply chat of an inbound command or callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// User who sent the command or pressed the button
    pub sender_id: i64,
    /// Display name, for logs only
    pub sender_name: String,
    /// Chat the event came from, where replies go
    pub chat_id: i64,
}

impl InboundEvent {
    /// Create an event
    #[must_use]
    pub fn new(sender_id: i64, sender_name: impl Into<String>, chat_id: i64) -> Self {
        Self {
            sender_id,
            sender_name: sender_name.into(),
            chat_id,
        }
    }
}

/// What happened to an inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The action ran to completion
    Executed(ActionKind),
    /// The sender is not the owner; the action did not run
    Denied,
    /// No route matched; silently ignored
    Ignored,
}

/// Routes commands and callbacks to actions, enforcing single-owner access
pub struct Dispatcher {
    registry: ActionRegistry,
    menu: MenuModel,
    owner_id: i64,
    owner_chat: i64,
    messenger: Arc<dyn Messenger>,
    snapshots: Arc<Snapshotter>,
    detection: Arc<DetectionScheduler>,
    denials: Option<DenialThrottle>,
}

impl Dispatcher {
    /// Create a dispatcher.
    ///
    /// `owner_chat` receives every photo regardless of where the command
    /// came from.
    #[must_use]
    pub fn new(
        registry: ActionRegistry,
        menu: MenuModel,
        owner_id: i64,
        owner_chat: i64,
        messenger: Arc<dyn Messenger>,
        snapshots: Arc<Snapshotter>,
        detection: Arc<DetectionScheduler>,
    ) -> Self {
        Self {
            registry,
            menu,
            owner_id,
            owner_chat,
            messenger,
            snapshots,
            detection,
            denials: None,
        }
    }

    /// Throttle repeated rejection messages to the same sender
    #[must_use]
    pub fn with_denial_throttle(mut self, throttle: DenialThrottle) -> Self {
        self.denials = Some(throttle);
        self
    }

    /// Routing tables
    #[must_use]
    pub const fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Interactive menu
    #[must_use]
    pub const fn menu(&self) -> &MenuModel {
        &self.menu
    }

    /// Denial throttle, if enabled
    #[must_use]
    pub const fn denial_throttle(&self) -> Option<&DenialThrottle> {
        self.denials.as_ref()
    }

    /// Handle a text command (without the leading slash).
    ///
    /// # Errors
    ///
    /// Returns an `ActionError` if the action, or the rejection message,
    /// fails.
    pub async fn handle_command(
        &self,
        command: &str,
        event: &InboundEvent,
    ) -> Result<Dispatch, ActionError> {
        let Some(route) = self.registry.command(command) else {
            debug!(command, "Ignoring unknown command");
            return Ok(Dispatch::Ignored);
        };
        self.dispatch(route, event).await
    }

    /// Handle a menu button callback token.
    ///
    /// # Errors
    ///
    /// Returns an `ActionError` if the action, or the rejection message,
    /// fails.
    pub async fn handle_callback(
        &self,
        token: &str,
        event: &InboundEvent,
    ) -> Result<Dispatch, ActionError> {
        let Some(route) = self.registry.callback(token) else {
            debug!(token, "Ignoring unknown callback");
            return Ok(Dispatch::Ignored);
        };
        self.dispatch(route, event).await
    }

    async fn dispatch(&self, route: Route, event: &InboundEvent) -> Result<Dispatch, ActionError> {
        if route.require_owner && event.sender_id != self.owner_id {
            self.access_denied(event).await?;
            return Ok(Dispatch::Denied);
        }

        info!(
            action = route.action.name(),
            sender = event.sender_id,
            "Executing action"
        );
        self.execute(route.action, event).await?;
        Ok(Dispatch::Executed(route.action))
    }

    async fn execute(&self, action: ActionKind, event: &InboundEvent) -> Result<(), ActionError> {
        match action {
            ActionKind::ShowMenu => self.show_menu(event.chat_id).await,
            ActionKind::CaptureAndSend => self.capture_and_send(event.chat_id).await,
            ActionKind::StartDetection => {
                let text = if self.detection.start() {
                    messages::DETECTION_ENABLED
                } else {
                    messages::DETECTION_ALREADY_ENABLED
                };
                self.messenger.send_text(event.chat_id, text).await?;
                Ok(())
            }
            ActionKind::StopDetection => {
                let text = if self.detection.stop() {
                    messages::DETECTION_DISABLED
                } else {
                    messages::DETECTION_ALREADY_DISABLED
                };
                self.messenger.send_text(event.chat_id, text).await?;
                Ok(())
            }
        }
    }

    /// Send the greeting with the menu to `chat_id`.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Transport` if the message cannot be sent.
    pub async fn show_menu(&self, chat_id: i64) -> Result<(), ActionError> {
        self.messenger
            .send_menu(chat_id, messages::GREETING, &self.menu)
            .await?;
        Ok(())
    }

    /// Take a picture and send it to the owner's chat.
    ///
    /// On camera failure a short notice goes to `reply_chat` and the error
    /// is still returned to the caller.
    ///
    /// # Errors
    ///
    /// Returns the `ActionError` of the capture or the upload.
    pub async fn capture_and_send(&self, reply_chat: i64) -> Result<(), ActionError> {
        match self
            .snapshots
            .capture_and_send(self.owner_chat, CaptureReason::Requested)
            .await
        {
            Ok(_) => Ok(()),
            Err(e @ ActionError::Capture(_)) => {
                if let Err(notice) = self
                    .messenger
                    .send_text(reply_chat, messages::CAPTURE_FAILED)
                    .await
                {
                    error!("Failed to send capture failure notice: {notice}");
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn access_denied(&self, event: &InboundEvent) -> Result<(), ActionError> {
        if let Some(throttle) = &self.denials {
            if throttle.check(event.sender_id, &event.sender_name).await == Denial::Silence {
                return Ok(());
            }
        }

        info!(
            "⛔️ Unauthorized access from user {} ({}). Sending denial message.",
            event.sender_id, event.sender_name
        );
        let sent = self
            .messenger
            .send_text(event.chat_id, messages::ACCESS_DENIED)
            .await;
        if sent.is_err() {
            // Nothing reached the sender, so the next attempt replies again
            if let Some(throttle) = &self.denials {
                throttle.forget(event.sender_id).await;
            }
        }
        sent.map_err(ActionError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::registry::{AccessPolicy, DEFAULT_CALLBACKS, DEFAULT_COMMANDS};
    use crate::hardware::MockCamera;
    use crate::testing::{FakeCamera, FakeSensor, RecordingMessenger, Sent};
    use crate::transport::{MockMessenger, TransportError};
    use std::path::PathBuf;
    use std::time::Duration;

    const OWNER: i64 = 42;
    const STRANGER: i64 = 666;

    struct Harness {
        dispatcher: Dispatcher,
        camera: Arc<FakeCamera>,
        messenger: Arc<RecordingMessenger>,
        detection: Arc<DetectionScheduler>,
    }

    fn harness(policy: AccessPolicy) -> Harness {
        let camera = Arc::new(FakeCamera::default());
        let messenger = Arc::new(RecordingMessenger::default());
        let snapshots = Arc::new(Snapshotter::new(camera.clone(), messenger.clone()));
        let detection = Arc::new(DetectionScheduler::new(
            Arc::new(FakeSensor::always(false)),
            snapshots.clone(),
            OWNER,
            Duration::from_secs(5),
        ));
        let dispatcher = Dispatcher::new(
            ActionRegistry::with_defaults(policy),
            MenuModel::default(),
            OWNER,
            OWNER,
            messenger.clone(),
            snapshots,
            detection.clone(),
        );
        Harness {
            dispatcher,
            camera,
            messenger,
            detection,
        }
    }

    fn owner() -> InboundEvent {
        InboundEvent::new(OWNER, "owner", OWNER)
    }

    fn stranger() -> InboundEvent {
        InboundEvent::new(STRANGER, "stranger", STRANGER)
    }

    #[tokio::test]
    async fn test_every_command_runs_its_mapped_action() -> Result<(), ActionError> {
        for (name, action) in DEFAULT_COMMANDS {
            let h = harness(AccessPolicy::default());
            let outcome = h.dispatcher.handle_command(name, &owner()).await?;
            assert_eq!(outcome, Dispatch::Executed(*action), "command {name}");
            h.detection.stop();
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_every_callback_runs_its_mapped_action() -> Result<(), ActionError> {
        for (token, action) in DEFAULT_CALLBACKS {
            let h = harness(AccessPolicy::default());
            let outcome = h.dispatcher.handle_callback(token, &owner()).await?;
            assert_eq!(outcome, Dispatch::Executed(*action), "callback {token}");
            h.detection.stop();
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_photo_command_captures_once_and_sends_to_owner() -> Result<(), ActionError> {
        let h = harness(AccessPolicy::default());

        h.dispatcher.handle_command("photo", &owner()).await?;

        assert_eq!(h.camera.captures(), 1);
        assert_eq!(h.messenger.sent(), vec![Sent::Photo(OWNER)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_menu_sends_greeting_with_menu() -> Result<(), ActionError> {
        let h = harness(AccessPolicy::default());

        h.dispatcher.handle_command("hello", &owner()).await?;

        assert_eq!(
            h.messenger.sent(),
            vec![Sent::Menu(OWNER, messages::GREETING.to_string())]
        );
        assert_eq!(h.camera.captures(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_stranger_is_rejected_and_action_never_runs() -> Result<(), ActionError> {
        let h = harness(AccessPolicy::default());

        for name in ["photo", "start", "stop", "menu"] {
            let outcome = h.dispatcher.handle_command(name, &stranger()).await?;
            assert_eq!(outcome, Dispatch::Denied);
        }
        let outcome = h.dispatcher.handle_callback("photo", &stranger()).await?;
        assert_eq!(outcome, Dispatch::Denied);

        assert_eq!(h.camera.captures(), 0);
        assert!(!h.detection.is_enabled());
        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 5);
        assert!(sent
            .iter()
            .all(|s| *s == Sent::Text(STRANGER, messages::ACCESS_DENIED.to_string())));
        Ok(())
    }

    #[tokio::test]
    async fn test_ungated_callbacks_skip_owner_check() -> Result<(), ActionError> {
        let h = harness(AccessPolicy {
            commands: true,
            callbacks: false,
        });

        let outcome = h.dispatcher.handle_callback("photo", &stranger()).await?;
        assert_eq!(outcome, Dispatch::Executed(ActionKind::CaptureAndSend));
        // The photo still goes to the owner
        assert_eq!(h.messenger.sent(), vec![Sent::Photo(OWNER)]);

        let outcome = h.dispatcher.handle_command("photo", &stranger()).await?;
        assert_eq!(outcome, Dispatch::Denied);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_command_is_ignored_silently() -> Result<(), ActionError> {
        let h = harness(AccessPolicy::default());

        assert_eq!(
            h.dispatcher.handle_command("reboot", &stranger()).await?,
            Dispatch::Ignored
        );
        assert_eq!(
            h.dispatcher.handle_callback("PHOTO", &owner()).await?,
            Dispatch::Ignored
        );
        assert!(h.messenger.sent().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_start_and_stop_confirm() -> Result<(), ActionError> {
        let h = harness(AccessPolicy::default());

        h.dispatcher.handle_command("start", &owner()).await?;
        assert!(h.detection.is_enabled());
        h.dispatcher.handle_command("start", &owner()).await?;
        h.dispatcher.handle_command("stop", &owner()).await?;
        assert!(!h.detection.is_enabled());
        h.dispatcher.handle_command("stop", &owner()).await?;

        assert_eq!(
            h.messenger.sent(),
            vec![
                Sent::Text(OWNER, messages::DETECTION_ENABLED.to_string()),
                Sent::Text(OWNER, messages::DETECTION_ALREADY_ENABLED.to_string()),
                Sent::Text(OWNER, messages::DETECTION_DISABLED.to_string()),
                Sent::Text(OWNER, messages::DETECTION_ALREADY_DISABLED.to_string()),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_camera_failure_propagates_with_notice() {
        let mut camera = MockCamera::new();
        camera.expect_capture().times(1).returning(|| {
            Err(crate::hardware::HardwareError::MissingOutput(PathBuf::from(
                "media/tmp_photo.jpg",
            )))
        });

        let mut messenger = MockMessenger::new();
        messenger.expect_send_photo().never();
        messenger
            .expect_send_text()
            .withf(|chat, text| *chat == OWNER && text == messages::CAPTURE_FAILED)
            .times(1)
            .returning(|_, _| Ok(()));
        let messenger: Arc<dyn Messenger> = Arc::new(messenger);

        let snapshots = Arc::new(Snapshotter::new(Arc::new(camera), messenger.clone()));
        let detection = Arc::new(DetectionScheduler::new(
            Arc::new(FakeSensor::always(false)),
            snapshots.clone(),
            OWNER,
            Duration::from_secs(5),
        ));
        let dispatcher = Dispatcher::new(
            ActionRegistry::with_defaults(AccessPolicy::default()),
            MenuModel::default(),
            OWNER,
            OWNER,
            messenger,
            snapshots,
            detection,
        );

        let result = dispatcher.handle_command("capture", &owner()).await;
        assert!(matches!(result, Err(ActionError::Capture(_))));
    }

    #[tokio::test]
    async fn test_undelivered_rejection_does_not_start_cooldown() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_send_text()
            .withf(|chat, text| *chat == STRANGER && text == messages::ACCESS_DENIED)
            .times(2)
            .returning(|_, _| Err(TransportError::Send("network down".to_string())));
        let messenger: Arc<dyn Messenger> = Arc::new(messenger);

        let snapshots = Arc::new(Snapshotter::new(
            Arc::new(FakeCamera::default()),
            messenger.clone(),
        ));
        let detection = Arc::new(DetectionScheduler::new(
            Arc::new(FakeSensor::always(false)),
            snapshots.clone(),
            OWNER,
            Duration::from_secs(5),
        ));
        let dispatcher = Dispatcher::new(
            ActionRegistry::with_defaults(AccessPolicy::default()),
            MenuModel::default(),
            OWNER,
            OWNER,
            messenger,
            snapshots,
            detection,
        )
        .with_denial_throttle(DenialThrottle::new(Duration::from_secs(60), 100));

        for _ in 0..2 {
            let result = dispatcher.handle_command("photo", &stranger()).await;
            assert!(matches!(result, Err(ActionError::Transport(_))));
        }
        assert_eq!(
            dispatcher.denial_throttle().map(DenialThrottle::silenced_total),
            Some(0)
        );
    }

    #[tokio::test]
    async fn test_denial_throttle_sends_once_per_cooldown() -> Result<(), ActionError> {
        let camera = Arc::new(FakeCamera::default());
        let messenger = Arc::new(RecordingMessenger::default());
        let snapshots = Arc::new(Snapshotter::new(camera.clone(), messenger.clone()));
        let detection = Arc::new(DetectionScheduler::new(
            Arc::new(FakeSensor::always(false)),
            snapshots.clone(),
            OWNER,
            Duration::from_secs(5),
        ));
        let dispatcher = Dispatcher::new(
            ActionRegistry::with_defaults(AccessPolicy::default()),
            MenuModel::default(),
            OWNER,
            OWNER,
            messenger.clone(),
            snapshots,
            detection,
        )
        .with_denial_throttle(DenialThrottle::new(Duration::from_secs(60), 100));

        for _ in 0..3 {
            let outcome = dispatcher.handle_command("photo", &stranger()).await?;
            assert_eq!(outcome, Dispatch::Denied);
        }

        assert_eq!(camera.captures(), 0);
        assert_eq!(messenger.sent().len(), 1);
        assert_eq!(
            dispatcher.denial_throttle().map(DenialThrottle::silenced_total),
            Some(2)
        );
        Ok(())
    }
}
