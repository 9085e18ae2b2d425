#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

use std::{path::Path, sync::mpsc::Sender, time::Duration};

use chrono::{Local, NaiveDateTime, Timelike};
use config::{Config, Theme};
use eframe::egui::{
    self, Button, CentralPanel, Color32, ComboBox, Layout, RichText, ScrollArea, Slider,
    TopBottomPanel, Window,
};

use communication::Message;
use editor::{DoseBuilder, EditorAction};
use engine::{Countdown, DoseAlert, DoseState, NextDose};
use i18n::{format_date, tr, Language};
use reminder::Reminder;
use schedule::{MedicationEntry, ScheduleError};

pub mod audio;
pub mod communication;
pub mod config;
/// the schedule editor window
pub mod editor;
pub mod engine;
pub mod i18n;
pub mod radio;
pub mod reminder;
pub mod schedule;
pub mod widgets;

const TAKEN_COLOR: Color32 = Color32::from_rgb(0x4c, 0xaf, 0x50);
const DUE_COLOR: Color32 = Color32::from_rgb(0xff, 0x98, 0x00);

pub struct ReminderApp {
    config: Config,
    reminder: Reminder,
    sender: Sender<Message>,
    in_config: bool,
    editor: Option<DoseBuilder>,
    editor_error: Option<String>,
    /// alerts still waiting for someone to press "Taken"
    ringing: Vec<DoseAlert>,
    last_tick: Option<NaiveDateTime>,
    status: Option<String>,
    music_playing: bool,
}

impl ReminderApp {
    /// `schedule` is usually `config.schedule_file`, but can be pointed elsewhere without
    /// that ending up in the saved config
    #[must_use]
    pub fn new(config: Config, schedule: &Path, sender: Sender<Message>) -> Self {
        let now = Local::now().naive_local();
        let reminder = Reminder::open(schedule, now);
        log::info!(
            "loaded {} medications from {}",
            reminder.store().entries().len(),
            reminder.store().path().display()
        );
        Self {
            config,
            reminder,
            sender,
            in_config: false,
            editor: None,
            editor_error: None,
            ringing: Vec::new(),
            last_tick: None,
            status: None,
            music_playing: false,
        }
    }

    fn send(&self, message: Message) {
        if self.sender.send(message).is_err() {
            log::warn!("audio thread is gone, message dropped");
        }
    }

    /// drives the engine once per wall clock second
    fn tick(&mut self, now: NaiveDateTime) {
        let second = now.with_nanosecond(0).unwrap_or(now);
        if self.last_tick == Some(second) {
            return;
        }
        self.last_tick = Some(second);
        let report = self.reminder.tick(now);
        if report.rolled_over && !self.ringing.is_empty() {
            log::info!("new day, dropping {} unacknowledged alerts", self.ringing.len());
            self.ringing.clear();
            self.send(Message::AlertStopped);
        }
        for alert in report.alerts {
            self.send(Message::AlertTriggered {
                dose: alert.name.clone(),
                volume: self.config.volume,
                sound_path: self.config.alert_sound.clone(),
            });
            self.ringing.push(alert);
        }
    }

    fn save_config(&mut self) {
        if let Err(e) = self.config.save(&Config::config_path()) {
            log::error!("{e}");
            self.status = Some(e.to_string());
        }
    }

    fn toggle_music(&mut self) {
        if self.music_playing {
            self.send(Message::StopMusic);
            self.music_playing = false;
            return;
        }
        let Some(dir) = self.config.music_path() else {
            self.status = Some(tr(self.config.language, "No music found in").to_string());
            return;
        };
        let tracks = audio::collect_tracks(&dir);
        if tracks.is_empty() {
            self.status = Some(format!(
                "{} {}",
                tr(self.config.language, "No music found in"),
                dir.display()
            ));
            return;
        }
        log::info!("playing {} tracks from {}", tracks.len(), dir.display());
        self.send(Message::PlayMusic {
            tracks,
            volume: self.config.volume,
        });
        self.music_playing = true;
    }

    fn render_settings(&mut self, ctx: &egui::Context) {
        let language = self.config.language;
        let mut open = self.in_config;
        let mut changed = false;
        Window::new(tr(language, "Settings"))
            .open(&mut open)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(tr(language, "Language"));
                    ComboBox::from_id_salt("language")
                        .selected_text(self.config.language.to_string())
                        .show_ui(ui, |ui| {
                            for option in Language::ALL {
                                changed |= ui
                                    .selectable_value(
                                        &mut self.config.language,
                                        option,
                                        option.to_string(),
                                    )
                                    .changed();
                            }
                        });
                });
                ui.horizontal(|ui| {
                    ui.label(tr(language, "Alert sound"));
                    ui.label(self.config.alert_sound.display().to_string());
                    if ui.button(tr(language, "Choose")).clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("audio", &["mp3", "wav", "ogg", "flac"])
                            .pick_file()
                        {
                            self.config.alert_sound = path;
                            changed = true;
                        }
                    }
                });
                ui.horizontal(|ui| {
                    ui.label(tr(language, "Music folder"));
                    if let Some(dir) = self.config.music_path() {
                        ui.label(dir.display().to_string());
                    }
                    if ui.button(tr(language, "Choose")).clicked() {
                        if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                            self.config.music_dir = Some(dir);
                            changed = true;
                        }
                    }
                });
                let volume = ui.add(
                    Slider::new(&mut self.config.volume, 0.0..=100.0).text(tr(language, "Volume")),
                );
                if volume.changed() {
                    self.send(Message::SetVolume(self.config.volume));
                }
                // only write once the slider is let go
                changed |= volume.drag_stopped() || (volume.changed() && !volume.dragged());
            });
        self.in_config = open;
        if changed {
            self.save_config();
        }
    }

    fn render_header(&mut self, ctx: &egui::Context, now: NaiveDateTime) {
        let language = self.config.language;
        let mut toggle_theme = false;
        let mut toggle_music = false;
        TopBottomPanel::top("time_and_ctrl").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let theme_btn = ui.add(Button::new(if self.config.theme == Theme::Dark {
                    "🌞"
                } else {
                    "🌙"
                }));
                toggle_theme = theme_btn.clicked();
                ui.heading(tr(language, "Medication Reminder"));
                ui.with_layout(Layout::right_to_left(eframe::emath::Align::Min), |ui| {
                    if ui
                        .button("⚙")
                        .on_hover_text(tr(language, "Settings"))
                        .clicked()
                    {
                        self.in_config = true;
                    }
                    if ui
                        .button("✏")
                        .on_hover_text(tr(language, "Manage Medications"))
                        .clicked()
                        && self.editor.is_none()
                    {
                        self.editor = Some(DoseBuilder::default());
                    }
                    let music_label = if self.music_playing {
                        tr(language, "Stop Music")
                    } else {
                        tr(language, "Play Music")
                    };
                    toggle_music = ui.button("♫").on_hover_text(music_label).clicked();
                });
            });
            ui.horizontal(|ui| {
                ui.label(format_date(language, now.date()));
                ui.label(now.format(&self.config.time_format).to_string());
            });
            if let Some(status) = &self.status {
                ui.colored_label(DUE_COLOR, status);
            }
        });
        if toggle_theme {
            self.config.theme = !self.config.theme;
            self.save_config();
        }
        if toggle_music {
            self.toggle_music();
        }
    }

    fn render_editor(&mut self, ctx: &egui::Context, now: NaiveDateTime) {
        let Some(editor) = &mut self.editor else {
            return;
        };
        let language = self.config.language;
        let action = editor.render_editor(
            ctx,
            language,
            self.reminder.store().entries(),
            self.editor_error.as_deref(),
        );
        match action {
            EditorAction::Editing => {}
            EditorAction::Close => {
                self.editor = None;
                self.editor_error = None;
            }
            EditorAction::Add => {
                match self.reminder.add(
                    &editor.name,
                    &editor.time_string(),
                    editor.day.canonical_name(),
                    now,
                ) {
                    Ok(change) => {
                        log::info!("{change:?} {} at {}", editor.name, editor.time_string());
                        editor.name.clear();
                        self.editor_error = None;
                    }
                    Err(ScheduleError::Invalid(e)) => self.editor_error = Some(e.to_string()),
                    Err(ScheduleError::Storage(e)) => {
                        self.editor_error =
                            Some(format!("{} {e}", tr(language, "Saved only until restart:")));
                    }
                }
            }
            EditorAction::Remove(name, time) => {
                match self.reminder.remove_dose(&name, time, now) {
                    Ok(_) => self.editor_error = None,
                    Err(e) => {
                        self.editor_error =
                            Some(format!("{} {e}", tr(language, "Saved only until restart:")));
                    }
                }
                self.ringing.retain(|alert| !(alert.name == name && alert.time == time));
                if self.ringing.is_empty() {
                    self.send(Message::AlertStopped);
                }
            }
        }
    }

    fn render_alerts(&mut self, ctx: &egui::Context) {
        if self.ringing.is_empty() {
            return;
        }
        let language = self.config.language;
        let mut taken = None;
        Window::new(tr(language, "Time to take"))
            .collapsible(false)
            .auto_sized()
            .show(ctx, |ui| {
                for (i, alert) in self.ringing.iter().enumerate() {
                    ui.horizontal(|ui| {
                        ui.label(
                            RichText::new(format!(
                                "{} - {}",
                                alert.name,
                                alert.time.format("%H:%M")
                            ))
                            .heading(),
                        );
                        if ui.button(tr(language, "Taken")).clicked() {
                            taken = Some(i);
                        }
                    });
                }
            });
        if let Some(i) = taken {
            let alert = self.ringing.remove(i);
            if self.reminder.acknowledge(&alert.name, alert.time) {
                log::info!("{} at {} taken", alert.name, alert.time.format("%H:%M"));
            }
            if self.ringing.is_empty() {
                self.send(Message::AlertStopped);
            }
        }
    }

    fn render_doses(&self, ui: &mut egui::Ui, now: NaiveDateTime) {
        let language = self.config.language;
        let engine = self.reminder.engine();
        let countdown = match engine.next_dose(now) {
            NextDose::Upcoming {
                entry,
                seconds_remaining,
            } => format!(
                "{} {} ({})",
                tr(language, "Next medication in:"),
                Countdown(seconds_remaining),
                entry.name
            ),
            NextDose::NoMoreToday => tr(language, "No more medications today").to_string(),
            NextDose::NothingScheduled => tr(language, "No medications configured").to_string(),
        };
        ui.vertical_centered(|ui| {
            ui.heading(countdown);
        });
        ui.separator();

        let view = engine.partition_today(now);
        let row = |ui: &mut egui::Ui, entry: &MedicationEntry| {
            let text = RichText::new(format!("{} - {}", entry.name, entry.time_label()));
            let text = match engine.state_of(&entry.name, entry.time) {
                Some(DoseState::Acknowledged) => text.color(TAKEN_COLOR),
                Some(DoseState::Due) => text.color(DUE_COLOR),
                _ => text,
            };
            ui.label(text);
        };
        ui.columns(2, |columns| {
            columns[0].heading(tr(language, "Future Medications"));
            ScrollArea::vertical()
                .id_salt("future")
                .show(&mut columns[0], |ui| {
                    for &entry in &view.future {
                        row(ui, entry);
                    }
                });
            columns[1].heading(tr(language, "Past Medications"));
            ScrollArea::vertical()
                .id_salt("past")
                .show(&mut columns[1], |ui| {
                    for &entry in &view.past {
                        row(ui, entry);
                    }
                });
        });
    }
}

impl eframe::App for ReminderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Local::now().naive_local();
        self.tick(now);
        // keep the clock and the countdown moving without input
        ctx.request_repaint_after(Duration::from_millis(250));

        ctx.set_visuals(self.config.theme.into());
        if self.in_config {
            self.render_settings(ctx);
        }
        self.render_editor(ctx, now);
        self.render_alerts(ctx);
        self.render_header(ctx, now);
        CentralPanel::default().show(ctx, |ui| self.render_doses(ui, now));
    }
}
