//! Core reconciliation logic
//!
//! The reconciler owns an instance table keyed by button id. Toggles are
//! optimistic (the keystroke is assumed to land) and arm a grace window
//! during which polling results are ignored; outside that window the
//! periodic poll is authoritative. An in-flight flag keeps slow probes
//! from piling up behind the poll timer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::adapters::{AdapterError, AdapterRegistry, SttAdapter};
use crate::events::{DisplayUpdate, SurfaceEvent};
use crate::render;
use crate::settings::ButtonSettings;

/// After a toggle, polling results are ignored for this long
const GRACE_PERIOD: Duration = Duration::from_millis(4000);

/// Error states from toggles auto-clear after this delay
const ERROR_CLEAR_DELAY: Duration = Duration::from_millis(2000);

const MIN_POLL_INTERVAL_MS: u64 = 500;
const MAX_POLL_INTERVAL_MS: u64 = 5000;

/// Displayed state of one button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    /// Target app running, not recording
    Idle,
    /// Target app recording (observed or optimistic)
    Recording,
    /// Target app not running or not integrated
    Unavailable,
    /// A toggle or probe failed
    Error,
}

impl Default for ButtonState {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for ButtonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ButtonState::Idle => write!(f, "idle"),
            ButtonState::Recording => write!(f, "recording"),
            ButtonState::Unavailable => write!(f, "unavailable"),
            ButtonState::Error => write!(f, "error"),
        }
    }
}

/// Per-button cache, owned exclusively by the reconciler
struct ButtonInstance {
    settings: ButtonSettings,
    /// Last displayed state; `None` means unknown, render unconditionally
    state: Option<ButtonState>,
    /// While in the future, poll-driven updates are suppressed
    grace_until: Option<Instant>,
    /// Set while a poll's probes are outstanding; overlapping ticks drop
    poll_in_flight: bool,
    poll_task: Option<JoinHandle<()>>,
}

impl ButtonInstance {
    fn new(settings: ButtonSettings) -> Self {
        Self {
            settings,
            state: None,
            grace_until: None,
            poll_in_flight: false,
            poll_task: None,
        }
    }
}

/// The button state reconciler
///
/// Cheap to clone; clones share the instance table and display channel.
#[derive(Clone)]
pub struct Reconciler {
    registry: Arc<AdapterRegistry>,
    buttons: Arc<Mutex<HashMap<String, ButtonInstance>>>,
    display_tx: mpsc::Sender<DisplayUpdate>,
}

impl Reconciler {
    pub fn new(registry: Arc<AdapterRegistry>, display_tx: mpsc::Sender<DisplayUpdate>) -> Self {
        Self {
            registry,
            buttons: Arc::new(Mutex::new(HashMap::new())),
            display_tx,
        }
    }

    /// Process host-surface events until the channel closes.
    pub async fn run(&self, mut events: mpsc::Receiver<SurfaceEvent>) {
        info!("reconciler started");

        while let Some(event) = events.recv().await {
            debug!(%event, "surface event");
            self.handle_event(event).await;
        }

        info!("reconciler stopped");
    }

    /// Dispatch one host-surface event
    pub async fn handle_event(&self, event: SurfaceEvent) {
        let result = match event {
            SurfaceEvent::WillAppear { id, settings } => self.on_appear(&id, &settings).await,
            SurfaceEvent::WillDisappear { id } => {
                self.on_disappear(&id).await;
                Ok(())
            }
            SurfaceEvent::KeyDown { id, settings } | SurfaceEvent::DialDown { id, settings } => {
                self.on_toggle(&id, &settings).await
            }
            SurfaceEvent::DidReceiveSettings { id, settings } => {
                self.on_settings_changed(&id, &settings).await
            }
        };

        if let Err(e) = result {
            error!(error = %e, "event handling failed");
        }
    }

    /// Button appeared: initialize the display, then poll periodically.
    pub async fn on_appear(&self, id: &str, settings: &ButtonSettings) -> Result<()> {
        info!(id, app = %settings.stt_application, "button appeared");

        {
            let mut buttons = self.buttons.lock().await;
            // A reappearing id starts from scratch; nothing survives the gap
            if let Some(old) = buttons.insert(id.to_string(), ButtonInstance::new(settings.clone()))
            {
                if let Some(task) = old.poll_task {
                    task.abort();
                }
            }
        }

        self.reconcile(id, settings).await?;
        self.start_polling(id, settings).await;
        Ok(())
    }

    /// Button left the screen: drop everything cached for it. Terminal.
    pub async fn on_disappear(&self, id: &str) {
        info!(id, "button disappeared");

        if let Some(instance) = self.buttons.lock().await.remove(id) {
            if let Some(task) = instance.poll_task {
                task.abort();
            }
        }
    }

    /// User intent: flip the recording state of the target application.
    pub async fn on_toggle(&self, id: &str, settings: &ButtonSettings) -> Result<()> {
        debug!(id, app = %settings.stt_application, "toggle");

        let Some(adapter) = self.registry.get(&settings.stt_application) else {
            error!(id, app = %settings.stt_application, "no adapter registered");
            self.ensure_instance(id, settings).await;
            self.show_state(id, ButtonState::Error, settings).await?;
            self.schedule_error_clear(id, settings);
            return Ok(());
        };

        let shortcut = settings.effective_shortcut(adapter.default_shortcut());

        // Arm the grace window before dispatch so a poll firing during the
        // keystroke's send latency cannot contradict the optimistic state.
        let last_state = {
            let mut buttons = self.buttons.lock().await;
            let instance = buttons
                .entry(id.to_string())
                .or_insert_with(|| ButtonInstance::new(settings.clone()));
            instance.grace_until = Some(Instant::now() + GRACE_PERIOD);
            instance.state.unwrap_or_default()
        };

        let outcome = if last_state == ButtonState::Recording {
            // Optimistic flip; polling corrects later if the keystroke missed
            adapter
                .deactivate(&shortcut)
                .await
                .map(|()| ButtonState::Idle)
        } else {
            match adapter.is_available().await {
                Ok(false) => {
                    self.clear_grace(id).await;
                    return self.show_state(id, ButtonState::Unavailable, settings).await;
                }
                Ok(true) => adapter
                    .activate(&shortcut)
                    .await
                    .map(|()| ButtonState::Recording),
                Err(e) => Err(e),
            }
        };

        match outcome {
            Ok(state) => self.show_state(id, state, settings).await,
            Err(e) => {
                error!(id, error = %e, "toggle failed");
                self.clear_grace(id).await;
                self.show_state(id, ButtonState::Error, settings).await?;
                self.schedule_error_clear(id, settings);
                Ok(())
            }
        }
    }

    /// Settings replaced: re-read under the new settings and re-arm the
    /// poll timer. Cached state and grace deadline deliberately survive.
    pub async fn on_settings_changed(&self, id: &str, settings: &ButtonSettings) -> Result<()> {
        info!(id, app = %settings.stt_application, "settings changed");

        self.stop_polling(id).await;
        {
            let mut buttons = self.buttons.lock().await;
            match buttons.get_mut(id) {
                Some(instance) => instance.settings = settings.clone(),
                None => {
                    buttons.insert(id.to_string(), ButtonInstance::new(settings.clone()));
                }
            }
        }

        self.reconcile(id, settings).await?;
        self.start_polling(id, settings).await;
        Ok(())
    }

    /// Read the observable truth and display it. Also the poll body.
    async fn reconcile(&self, id: &str, settings: &ButtonSettings) -> Result<()> {
        {
            let mut buttons = self.buttons.lock().await;
            if let Some(instance) = buttons.get_mut(id) {
                if let Some(deadline) = instance.grace_until {
                    if Instant::now() < deadline {
                        debug!(id, "within toggle grace period, skipping");
                        return Ok(());
                    }
                    instance.grace_until = None;
                }
            }
        }

        let Some(adapter) = self.registry.get(&settings.stt_application) else {
            debug!(id, app = %settings.stt_application, "no adapter registered");
            return self.show_state(id, ButtonState::Unavailable, settings).await;
        };

        let state = match Self::probe_state(adapter.as_ref()).await {
            Ok(state) => state,
            Err(e) => {
                // no auto-clear here; the next poll tick self-corrects
                warn!(id, error = %e, "probe failed");
                ButtonState::Error
            }
        };

        self.show_state(id, state, settings).await
    }

    async fn probe_state(adapter: &dyn SttAdapter) -> Result<ButtonState, AdapterError> {
        if !adapter.is_available().await? {
            return Ok(ButtonState::Unavailable);
        }
        if adapter.is_recording().await? {
            Ok(ButtonState::Recording)
        } else {
            Ok(ButtonState::Idle)
        }
    }

    /// Cache the state and push a rendered icon, de-duplicating repeats.
    /// A result landing after teardown finds no instance and is dropped.
    async fn show_state(&self, id: &str, state: ButtonState, settings: &ButtonSettings) -> Result<()> {
        {
            let mut buttons = self.buttons.lock().await;
            let Some(instance) = buttons.get_mut(id) else {
                return Ok(());
            };
            if instance.state == Some(state) {
                return Ok(());
            }
            instance.state = Some(state);
        }

        debug!(id, %state, "state changed");
        let image = render::render_state_image(state, settings);
        self.display_tx
            .send(DisplayUpdate {
                id: id.to_string(),
                image,
            })
            .await
            .map_err(|_| anyhow!("display channel closed"))
    }

    /// (Re)start the poll timer for an instance.
    async fn start_polling(&self, id: &str, settings: &ButtonSettings) {
        self.stop_polling(id).await;

        let period = effective_poll_interval(settings.polling_interval);
        let reconciler = self.clone();
        let task_id = id.to_string();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                reconciler.poll_tick(&task_id).await;
            }
        });

        let mut buttons = self.buttons.lock().await;
        match buttons.get_mut(id) {
            Some(instance) => instance.poll_task = Some(task),
            // instance vanished while we were reconciling; don't leak the timer
            None => task.abort(),
        }
    }

    /// Cancel the poll timer if one exists; idempotent.
    async fn stop_polling(&self, id: &str) {
        let mut buttons = self.buttons.lock().await;
        if let Some(instance) = buttons.get_mut(id) {
            if let Some(task) = instance.poll_task.take() {
                task.abort();
            }
        }
    }

    /// One poll timer tick. Drops itself when the previous poll's probes
    /// are still outstanding (lsof scans can outlast the poll interval).
    async fn poll_tick(&self, id: &str) {
        let settings = {
            let mut buttons = self.buttons.lock().await;
            let Some(instance) = buttons.get_mut(id) else {
                return;
            };
            if instance.poll_in_flight {
                debug!(id, "poll tick dropped; previous poll still in flight");
                return;
            }
            instance.poll_in_flight = true;
            instance.settings.clone()
        };

        if let Err(e) = self.reconcile(id, &settings).await {
            warn!(id, error = %e, "poll reconcile failed");
        }

        let mut buttons = self.buttons.lock().await;
        if let Some(instance) = buttons.get_mut(id) {
            instance.poll_in_flight = false;
        }
    }

    /// Forget an error state after a fixed delay and re-read. Best-effort;
    /// a failed recovery is logged and left to the next poll.
    fn schedule_error_clear(&self, id: &str, settings: &ButtonSettings) {
        let reconciler = self.clone();
        let id = id.to_string();
        let settings = settings.clone();

        tokio::spawn(async move {
            tokio::time::sleep(ERROR_CLEAR_DELAY).await;

            {
                let mut buttons = reconciler.buttons.lock().await;
                let Some(instance) = buttons.get_mut(&id) else {
                    return;
                };
                // next reconcile treats the state as unknown
                instance.state = None;
            }

            if let Err(e) = reconciler.reconcile(&id, &settings).await {
                warn!(id, error = %e, "error recovery failed");
            }
        });
    }

    async fn ensure_instance(&self, id: &str, settings: &ButtonSettings) {
        let mut buttons = self.buttons.lock().await;
        buttons
            .entry(id.to_string())
            .or_insert_with(|| ButtonInstance::new(settings.clone()));
    }

    async fn clear_grace(&self, id: &str) {
        let mut buttons = self.buttons.lock().await;
        if let Some(instance) = buttons.get_mut(id) {
            instance.grace_until = None;
        }
    }
}

fn effective_poll_interval(ms: u64) -> Duration {
    Duration::from_millis(ms.clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::KeystrokeError;

    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct MockState {
        available: bool,
        recording: bool,
        fail_activate: bool,
        fail_deactivate: bool,
        activate_calls: usize,
        deactivate_calls: usize,
        probe_calls: usize,
    }

    struct MockAdapter {
        key: &'static str,
        state: Arc<StdMutex<MockState>>,
    }

    #[async_trait]
    impl SttAdapter for MockAdapter {
        fn name(&self) -> &'static str {
            "Mock"
        }

        fn key(&self) -> &'static str {
            self.key
        }

        fn default_shortcut(&self) -> &'static str {
            "f4"
        }

        async fn activate(&self, _shortcut: &str) -> Result<(), AdapterError> {
            let mut state = self.state.lock().unwrap();
            state.activate_calls += 1;
            if state.fail_activate {
                return Err(KeystrokeError::Script {
                    stderr: "activate failed".to_string(),
                }
                .into());
            }
            Ok(())
        }

        async fn deactivate(&self, _shortcut: &str) -> Result<(), AdapterError> {
            let mut state = self.state.lock().unwrap();
            state.deactivate_calls += 1;
            if state.fail_deactivate {
                return Err(KeystrokeError::Script {
                    stderr: "deactivate failed".to_string(),
                }
                .into());
            }
            Ok(())
        }

        async fn is_recording(&self) -> Result<bool, AdapterError> {
            let mut state = self.state.lock().unwrap();
            state.probe_calls += 1;
            Ok(state.recording)
        }

        async fn is_available(&self) -> Result<bool, AdapterError> {
            let mut state = self.state.lock().unwrap();
            state.probe_calls += 1;
            Ok(state.available)
        }
    }

    fn harness() -> (
        Reconciler,
        mpsc::Receiver<DisplayUpdate>,
        Arc<StdMutex<MockState>>,
    ) {
        let state = Arc::new(StdMutex::new(MockState {
            available: true,
            ..Default::default()
        }));
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(MockAdapter {
            key: "superwhisper",
            state: Arc::clone(&state),
        }));

        let (display_tx, display_rx) = mpsc::channel(32);
        (
            Reconciler::new(Arc::new(registry), display_tx),
            display_rx,
            state,
        )
    }

    fn drain(rx: &mut mpsc::Receiver<DisplayUpdate>) -> Vec<DisplayUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = rx.try_recv() {
            updates.push(update);
        }
        updates
    }

    async fn current_state(reconciler: &Reconciler, id: &str) -> Option<ButtonState> {
        reconciler.buttons.lock().await.get(id).and_then(|i| i.state)
    }

    async fn seed_state(reconciler: &Reconciler, id: &str, state: Option<ButtonState>) {
        let mut buttons = reconciler.buttons.lock().await;
        let instance = buttons
            .entry(id.to_string())
            .or_insert_with(|| ButtonInstance::new(ButtonSettings::default()));
        instance.state = state;
    }

    #[tokio::test]
    async fn test_toggle_from_idle_starts_recording() {
        let (reconciler, mut rx, mock) = harness();
        let settings = ButtonSettings::default();

        reconciler.on_toggle("btn1", &settings).await.unwrap();

        assert_eq!(
            current_state(&reconciler, "btn1").await,
            Some(ButtonState::Recording)
        );
        assert_eq!(mock.lock().unwrap().activate_calls, 1);
        assert_eq!(drain(&mut rx).len(), 1);

        // grace window armed for the optimistic state
        let buttons = reconciler.buttons.lock().await;
        assert!(buttons.get("btn1").unwrap().grace_until.is_some());
    }

    #[tokio::test]
    async fn test_toggle_from_recording_stops_without_probing() {
        let (reconciler, mut rx, mock) = harness();
        let settings = ButtonSettings::default();
        seed_state(&reconciler, "btn1", Some(ButtonState::Recording)).await;

        reconciler.on_toggle("btn1", &settings).await.unwrap();

        assert_eq!(
            current_state(&reconciler, "btn1").await,
            Some(ButtonState::Idle)
        );
        let mock = mock.lock().unwrap();
        assert_eq!(mock.deactivate_calls, 1);
        assert_eq!(mock.probe_calls, 0);
        drop(mock);
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_unavailable_short_circuits() {
        let (reconciler, mut rx, mock) = harness();
        mock.lock().unwrap().available = false;
        let settings = ButtonSettings::default();

        reconciler.on_toggle("btn1", &settings).await.unwrap();

        assert_eq!(
            current_state(&reconciler, "btn1").await,
            Some(ButtonState::Unavailable)
        );
        assert_eq!(mock.lock().unwrap().activate_calls, 0);
        assert_eq!(drain(&mut rx).len(), 1);

        // grace must not linger when nothing was dispatched
        let buttons = reconciler.buttons.lock().await;
        assert!(buttons.get("btn1").unwrap().grace_until.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_adapter_renders_error_then_reevaluates() {
        let (reconciler, mut rx, _mock) = harness();
        let settings = ButtonSettings {
            stt_application: "mystery".to_string(),
            ..Default::default()
        };

        reconciler.on_toggle("btn1", &settings).await.unwrap();

        assert_eq!(
            current_state(&reconciler, "btn1").await,
            Some(ButtonState::Error)
        );
        assert_eq!(drain(&mut rx).len(), 1);

        // after the clear delay the state is re-read; still no adapter
        tokio::time::sleep(ERROR_CLEAR_DELAY + Duration::from_millis(1)).await;
        assert_eq!(
            current_state(&reconciler, "btn1").await,
            Some(ButtonState::Unavailable)
        );
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deactivate_failure_recovers_after_delay() {
        let (reconciler, mut rx, mock) = harness();
        let settings = ButtonSettings::default();
        seed_state(&reconciler, "btn1", Some(ButtonState::Recording)).await;
        mock.lock().unwrap().fail_deactivate = true;

        reconciler.on_toggle("btn1", &settings).await.unwrap();

        assert_eq!(
            current_state(&reconciler, "btn1").await,
            Some(ButtonState::Error)
        );
        {
            let buttons = reconciler.buttons.lock().await;
            assert!(buttons.get("btn1").unwrap().grace_until.is_none());
        }
        assert_eq!(drain(&mut rx).len(), 1);

        // the scheduled recovery re-reads the real state
        tokio::time::sleep(ERROR_CLEAR_DELAY + Duration::from_millis(1)).await;
        assert_eq!(
            current_state(&reconciler, "btn1").await,
            Some(ButtonState::Idle)
        );
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_suppresses_reconcile_until_deadline() {
        let (reconciler, mut rx, mock) = harness();
        let settings = ButtonSettings::default();

        reconciler.on_toggle("btn1", &settings).await.unwrap();
        assert_eq!(
            current_state(&reconciler, "btn1").await,
            Some(ButtonState::Recording)
        );
        drain(&mut rx);

        // the app never actually started recording
        mock.lock().unwrap().recording = false;
        let probes_before = mock.lock().unwrap().probe_calls;

        reconciler.reconcile("btn1", &settings).await.unwrap();
        assert_eq!(mock.lock().unwrap().probe_calls, probes_before);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(
            current_state(&reconciler, "btn1").await,
            Some(ButtonState::Recording)
        );

        tokio::time::advance(GRACE_PERIOD).await;
        reconciler.reconcile("btn1", &settings).await.unwrap();
        assert_eq!(
            current_state(&reconciler, "btn1").await,
            Some(ButtonState::Idle)
        );
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn test_show_state_deduplicates_renders() {
        let (reconciler, mut rx, _mock) = harness();
        let settings = ButtonSettings::default();
        seed_state(&reconciler, "btn1", None).await;

        reconciler
            .show_state("btn1", ButtonState::Idle, &settings)
            .await
            .unwrap();
        reconciler
            .show_state("btn1", ButtonState::Idle, &settings)
            .await
            .unwrap();

        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn test_poll_tick_dropped_while_in_flight() {
        let (reconciler, mut rx, mock) = harness();
        seed_state(&reconciler, "btn1", Some(ButtonState::Idle)).await;
        {
            let mut buttons = reconciler.buttons.lock().await;
            buttons.get_mut("btn1").unwrap().poll_in_flight = true;
        }

        reconciler.poll_tick("btn1").await;

        assert_eq!(mock.lock().unwrap().probe_calls, 0);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(
            current_state(&reconciler, "btn1").await,
            Some(ButtonState::Idle)
        );
    }

    #[tokio::test]
    async fn test_poll_tick_probes_and_clears_flag() {
        let (reconciler, mut rx, mock) = harness();
        mock.lock().unwrap().recording = true;
        seed_state(&reconciler, "btn1", Some(ButtonState::Idle)).await;

        reconciler.poll_tick("btn1").await;

        assert!(mock.lock().unwrap().probe_calls > 0);
        assert_eq!(
            current_state(&reconciler, "btn1").await,
            Some(ButtonState::Recording)
        );
        assert_eq!(drain(&mut rx).len(), 1);

        let buttons = reconciler.buttons.lock().await;
        assert!(!buttons.get("btn1").unwrap().poll_in_flight);
    }

    #[tokio::test]
    async fn test_disappear_drops_instance_and_late_results() {
        let (reconciler, mut rx, _mock) = harness();
        let settings = ButtonSettings::default();

        reconciler.on_appear("btn1", &settings).await.unwrap();
        drain(&mut rx);

        reconciler.on_disappear("btn1").await;
        assert!(reconciler.buttons.lock().await.is_empty());

        // a probe result arriving after teardown must not resurrect state
        reconciler
            .show_state("btn1", ButtonState::Recording, &settings)
            .await
            .unwrap();
        assert!(drain(&mut rx).is_empty());
        assert!(reconciler.buttons.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_appear_initializes_display_and_polling() {
        let (reconciler, mut rx, _mock) = harness();
        let settings = ButtonSettings::default();

        reconciler.on_appear("btn1", &settings).await.unwrap();

        assert_eq!(
            current_state(&reconciler, "btn1").await,
            Some(ButtonState::Idle)
        );
        assert_eq!(drain(&mut rx).len(), 1);

        let buttons = reconciler.buttons.lock().await;
        assert!(buttons.get("btn1").unwrap().poll_task.is_some());
    }

    #[tokio::test]
    async fn test_settings_change_keeps_state_and_grace() {
        let (reconciler, mut rx, _mock) = harness();
        let settings = ButtonSettings::default();
        seed_state(&reconciler, "btn1", Some(ButtonState::Recording)).await;
        {
            let mut buttons = reconciler.buttons.lock().await;
            buttons.get_mut("btn1").unwrap().grace_until =
                Some(Instant::now() + GRACE_PERIOD);
        }

        let new_settings = ButtonSettings {
            polling_interval: 2000,
            ..Default::default()
        };
        reconciler
            .on_settings_changed("btn1", &new_settings)
            .await
            .unwrap();

        // inside the grace window the immediate re-read is suppressed
        assert!(drain(&mut rx).is_empty());
        let buttons = reconciler.buttons.lock().await;
        let instance = buttons.get("btn1").unwrap();
        assert_eq!(instance.state, Some(ButtonState::Recording));
        assert!(instance.grace_until.is_some());
        assert_eq!(instance.settings.polling_interval, 2000);
        assert!(instance.poll_task.is_some());
    }

    #[test]
    fn test_poll_interval_clamping() {
        assert_eq!(effective_poll_interval(50), Duration::from_millis(500));
        assert_eq!(effective_poll_interval(99999), Duration::from_millis(5000));
        assert_eq!(effective_poll_interval(1000), Duration::from_millis(1000));
    }
}
