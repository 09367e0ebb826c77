use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use waker_core::notifications::{NotificationContent, SNOOZE_ACTION_ID};
use waker_core::{AlarmRecord, AlarmStore};

use crate::notifier::{NotifierEvent, TimerNotifier};

const AUTHORIZATION_ALERT: &str = "Alarms don't work without notifications, and it looks like \
you haven't granted us permission to send you those. Please grant notification permissions in \
your system settings.";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("WAKER_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }
        Ok(config)
    }

    pub fn slot_path(&self) -> PathBuf {
        self.data_dir.join("scheduled_alarm")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            data_dir: home.join(".waker"),
        }
    }
}

/// Notification-center delegate: reacts to the notifier's events on behalf
/// of the store. A presenting notification spends the alarm, so the slot is
/// released before display; a snooze action schedules a fresh alarm nine
/// minutes out.
pub async fn run_notification_delegate(
    store: Arc<AlarmStore>,
    mut events: mpsc::UnboundedReceiver<NotifierEvent>,
    presented_tx: mpsc::UnboundedSender<NotificationContent>,
) {
    while let Some(event) = events.recv().await {
        match event {
            NotifierEvent::WillPresent { id, content } => {
                info!(id = %id, "notification presenting; releasing the slot");
                store.clear();
                let _ = presented_tx.send(content);
            }
            NotifierEvent::ActionInvoked { action_id } if action_id == SNOOZE_ACTION_ID => {
                let snooze = AlarmRecord::snooze_from(Local::now().naive_local());
                if !store.schedule(&snooze).await {
                    warn!("can't schedule snooze because notification permissions were revoked");
                }
            }
            NotifierEvent::ActionInvoked { action_id } => {
                debug!(action_id = %action_id, "ignoring unknown notification action");
            }
        }
    }
}

struct WakerApp {
    store: Arc<AlarmStore>,
    notifier: Arc<TimerNotifier>,
    runtime: tokio::runtime::Runtime,
    changed_rx: broadcast::Receiver<()>,
    presented_rx: mpsc::UnboundedReceiver<NotificationContent>,
    schedule_rx: Option<oneshot::Receiver<bool>>,
    current: Option<AlarmRecord>,
    ringing: Option<NotificationContent>,
    auth_alert: bool,
    pick_year: i32,
    pick_month: u32,
    pick_day: u32,
    pick_hour: u32,
    pick_minute: u32,
}

impl WakerApp {
    fn new(
        store: Arc<AlarmStore>,
        notifier: Arc<TimerNotifier>,
        runtime: tokio::runtime::Runtime,
        presented_rx: mpsc::UnboundedReceiver<NotificationContent>,
    ) -> Self {
        let changed_rx = store.subscribe();
        let current = store.current_alarm();
        let suggestion = Local::now().naive_local() + Duration::minutes(1);
        Self {
            store,
            notifier,
            runtime,
            changed_rx,
            presented_rx,
            schedule_rx: None,
            current,
            ringing: None,
            auth_alert: false,
            pick_year: suggestion.year(),
            pick_month: suggestion.month(),
            pick_day: suggestion.day(),
            pick_hour: suggestion.hour(),
            pick_minute: suggestion.minute(),
        }
    }

    fn picked_datetime(&self) -> NaiveDateTime {
        let date = NaiveDate::from_ymd_opt(self.pick_year, self.pick_month, self.pick_day)
            .unwrap_or_else(|| Local::now().date_naive());
        date.and_hms_opt(self.pick_hour, self.pick_minute, 0)
            .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
    }

    fn begin_schedule(&mut self) {
        let record = AlarmRecord::new(None, self.picked_datetime());
        info!(id = record.id(), trigger_at = %record.trigger_at, "scheduling alarm");
        let store = Arc::clone(&self.store);
        let (tx, rx) = oneshot::channel();
        self.runtime.spawn(async move {
            let _ = tx.send(store.schedule(&record).await);
        });
        self.schedule_rx = Some(rx);
    }

    fn drain_events(&mut self) {
        let mut changed = false;
        loop {
            match self.changed_rx.try_recv() {
                Ok(()) | Err(broadcast::error::TryRecvError::Lagged(_)) => changed = true,
                Err(_) => break,
            }
        }
        if changed {
            self.current = self.store.current_alarm();
        }

        while let Ok(content) = self.presented_rx.try_recv() {
            self.ringing = Some(content);
        }

        if let Some(rx) = &mut self.schedule_rx {
            match rx.try_recv() {
                Ok(granted) => {
                    self.schedule_rx = None;
                    if !granted {
                        self.auth_alert = true;
                    }
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => self.schedule_rx = None,
            }
        }
    }

    fn show_alerts(&mut self, ctx: &egui::Context) {
        if self.auth_alert {
            let mut dismissed = false;
            egui::Window::new("Authorization Needed")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label(AUTHORIZATION_ALERT);
                    if ui.button("Okay").clicked() {
                        dismissed = true;
                    }
                });
            if dismissed {
                self.auth_alert = false;
            }
        }

        let mut snooze_clicked = false;
        let mut dismiss_clicked = false;
        if let Some(content) = &self.ringing {
            egui::Window::new(content.title.clone())
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label(content.body.clone());
                    ui.horizontal(|ui| {
                        if ui.button("Snooze").clicked() {
                            snooze_clicked = true;
                        }
                        if ui.button("Dismiss").clicked() {
                            dismiss_clicked = true;
                        }
                    });
                });
        }
        if snooze_clicked {
            self.notifier.invoke_action(SNOOZE_ACTION_ID);
        }
        if snooze_clicked || dismiss_clicked {
            self.ringing = None;
        }
    }
}

impl eframe::App for WakerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Waker");
            ui.add_space(8.0);

            match &self.current {
                Some(alarm) => {
                    ui.label(format!(
                        "Your alarm is scheduled for {}",
                        alarm.trigger_at.format("%Y-%m-%d %H:%M")
                    ));
                }
                None => {
                    ui.label("Set an alarm below");
                }
            }
            ui.add_space(8.0);

            let in_flight = self.schedule_rx.is_some();
            // picker locked while an alarm is set, same as the button label flip
            ui.add_enabled_ui(self.current.is_none() && !in_flight, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Date");
                    ui.add(egui::DragValue::new(&mut self.pick_year).range(2000..=2100));
                    ui.add(egui::DragValue::new(&mut self.pick_month).range(1..=12));
                    ui.add(egui::DragValue::new(&mut self.pick_day).range(1..=31));
                });
                ui.horizontal(|ui| {
                    ui.label("Time");
                    ui.add(egui::DragValue::new(&mut self.pick_hour).range(0..=23));
                    ui.add(egui::DragValue::new(&mut self.pick_minute).range(0..=59));
                });
            });
            ui.add_space(8.0);

            let label = if self.current.is_some() {
                "Remove Alarm"
            } else {
                "Set Alarm"
            };
            if ui
                .add_enabled(!in_flight, egui::Button::new(label))
                .clicked()
            {
                match self.current.clone() {
                    Some(alarm) => self.store.unschedule(&alarm),
                    None => self.begin_schedule(),
                }
            }
        });

        self.show_alerts(ctx);
        ctx.request_repaint_after(std::time::Duration::from_millis(250));
    }
}

pub fn run(config: AppConfig) -> Result<()> {
    fs::create_dir_all(&config.data_dir).with_context(|| {
        format!(
            "failed to create data directory {}",
            config.data_dir.display()
        )
    })?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let (notifier, notifier_events) = TimerNotifier::new();
    let store = Arc::new(AlarmStore::new(config.slot_path(), notifier.clone()));

    let (presented_tx, presented_rx) = mpsc::unbounded_channel();
    runtime.spawn(run_notification_delegate(
        Arc::clone(&store),
        notifier_events,
        presented_tx,
    ));

    let app = WakerApp::new(store, notifier, runtime, presented_rx);
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([360.0, 320.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Waker",
        native_options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
    .map_err(|err| anyhow!("eframe terminated: {err}"))
}
