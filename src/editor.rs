use chrono::{Local, NaiveTime, Timelike};
use eframe::egui::{self, Button, Color32, ComboBox, Grid, ScrollArea, TextEdit, Window};

use crate::{
    i18n::{tr, Language},
    schedule::{MedicationEntry, Weekday},
    widgets::Knob,
};

// on screen keyboard for the kitchen tablet, no physical keyboard attached
const KEYS: [&str; 35] = [
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s",
    "t", "u", "v", "w", "x", "y", "z", "1", "2", "3", "4", "5", "6", "7", "8", "9",
];
const KEYS_PER_ROW: usize = 4;

/// What the caregiver did in the editor this frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorAction {
    Editing,
    Add,
    Remove(String, NaiveTime),
    Close,
}

/// In progress dose in the schedule editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoseBuilder {
    pub name: String,
    pub hour: u8,
    pub minute: u8,
    pub day: Weekday,
    /// dose picked in the list for removal
    pub selected: Option<(String, NaiveTime)>,
}

impl Default for DoseBuilder {
    fn default() -> Self {
        let now = Local::now().naive_local();
        Self::starting_at(now.time(), Weekday::of(now.date()))
    }
}

impl DoseBuilder {
    #[must_use]
    pub fn starting_at(time: NaiveTime, day: Weekday) -> Self {
        Self {
            name: String::new(),
            // both always fit, hours < 24 and minutes < 60
            hour: u8::try_from(time.hour()).unwrap_or_default(),
            minute: u8::try_from(time.minute()).unwrap_or_default(),
            day,
            selected: None,
        }
    }

    /// `HH:MM`, the form the schedule takes
    #[must_use]
    pub fn time_string(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }

    /// Moves the time by `delta` minutes, wrapping around midnight.
    pub fn adjust_minutes(&mut self, delta: i32) {
        let total = (i32::from(self.hour) * 60 + i32::from(self.minute) + delta).rem_euclid(24 * 60);
        self.hour = u8::try_from(total / 60).unwrap_or_default();
        self.minute = u8::try_from(total % 60).unwrap_or_default();
    }

    pub fn render_editor(
        &mut self,
        ctx: &egui::Context,
        language: Language,
        entries: &[MedicationEntry],
        error: Option<&str>,
    ) -> EditorAction {
        let mut action = EditorAction::Editing;
        let mut open = true;
        Window::new(tr(language, "Medication Manager"))
            .open(&mut open)
            .collapsible(false)
            .show(ctx, |ui| {
                ui.horizontal_top(|ui| {
                    ui.group(|ui| {
                        ui.vertical(|ui| {
                            ui.label(tr(language, "Keyboard"));
                            self.render_keyboard(ui);
                        });
                    });
                    ui.vertical(|ui| {
                        self.render_dose_list(ui, language, entries);
                        self.render_name_input(ui, language);
                        self.render_time_editor(ui, language);
                        self.render_day_selector(ui, language);
                        ui.horizontal(|ui| {
                            if ui.button(tr(language, "Add Medication")).clicked() {
                                action = EditorAction::Add;
                            }
                            let remove = ui.add_enabled(
                                self.selected.is_some(),
                                Button::new(tr(language, "Remove Medication")),
                            );
                            if remove.clicked() {
                                if let Some((name, time)) = self.selected.take() {
                                    action = EditorAction::Remove(name, time);
                                }
                            }
                        });
                        if let Some(error) = error {
                            ui.colored_label(Color32::RED, error);
                        }
                    });
                });
            });
        if open {
            action
        } else {
            EditorAction::Close
        }
    }

    fn render_keyboard(&mut self, ui: &mut egui::Ui) {
        ScrollArea::vertical().id_salt("keyboard").show(ui, |ui| {
            Grid::new("keyboard_keys").show(ui, |ui| {
                for (i, key) in KEYS.iter().enumerate() {
                    if ui.add_sized([48., 48.], Button::new(*key)).clicked() {
                        self.name.push_str(key);
                    }
                    if i % KEYS_PER_ROW == KEYS_PER_ROW - 1 {
                        ui.end_row();
                    }
                }
                ui.end_row();
                if ui.add_sized([48., 48.], Button::new("␣")).clicked() {
                    self.name.push(' ');
                }
                if ui.add_sized([48., 48.], Button::new("⌫")).clicked() {
                    self.name.pop();
                }
            });
        });
    }

    fn render_dose_list(&mut self, ui: &mut egui::Ui, language: Language, entries: &[MedicationEntry]) {
        ScrollArea::vertical()
            .id_salt("doses")
            .max_height(200.)
            .show(ui, |ui| {
                for entry in entries {
                    let days = entry
                        .days
                        .iter()
                        .map(|day| day.display_name(language))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let label = format!("{} - {} ({days})", entry.name, entry.time_label());
                    ui.selectable_value(
                        &mut self.selected,
                        Some((entry.name.clone(), entry.time)),
                        label,
                    );
                }
            });
    }

    fn render_name_input(&mut self, ui: &mut egui::Ui, language: Language) {
        ui.horizontal(|ui| {
            ui.add(TextEdit::singleline(&mut self.name).hint_text(tr(language, "Medication Name")));
            if ui.button(tr(language, "Clear")).clicked() {
                self.name.clear();
            }
        });
    }

    fn render_time_editor(&mut self, ui: &mut egui::Ui, language: Language) {
        ui.horizontal(|ui| {
            ui.vertical(|ui| {
                ui.label(tr(language, "Hour"));
                ui.add(Knob::new(&mut self.hour, 24).label_every(3).radius(60.));
            });
            ui.vertical(|ui| {
                ui.label(tr(language, "Minute"));
                ui.add(Knob::new(&mut self.minute, 60).label_every(5).radius(60.));
            });
        });
        ui.horizontal(|ui| {
            ui.heading(self.time_string());
            if ui.button(tr(language, "+20 Min")).clicked() {
                self.adjust_minutes(20);
            }
            if ui.button(tr(language, "-20 Min")).clicked() {
                self.adjust_minutes(-20);
            }
        });
    }

    fn render_day_selector(&mut self, ui: &mut egui::Ui, language: Language) {
        ComboBox::from_id_salt("dose_day")
            .selected_text(self.day.display_name(language))
            .show_ui(ui, |ui| {
                for day in Weekday::ALL {
                    ui.selectable_value(&mut self.day, day, day.display_name(language));
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(h: u32, m: u32) -> DoseBuilder {
        DoseBuilder::starting_at(
            NaiveTime::from_hms_opt(h, m, 42).expect("valid time"),
            Weekday::Wednesday,
        )
    }

    #[test]
    fn starts_at_the_given_minute() {
        let b = builder(7, 5);
        assert_eq!(b.time_string(), "07:05");
        assert_eq!(b.day, Weekday::Wednesday);
        assert!(b.name.is_empty());
    }

    #[test]
    fn adjusting_wraps_around_midnight() {
        let mut b = builder(23, 50);
        b.adjust_minutes(20);
        assert_eq!(b.time_string(), "00:10");
        b.adjust_minutes(-20);
        assert_eq!(b.time_string(), "23:50");

        let mut b = builder(0, 5);
        b.adjust_minutes(-20);
        assert_eq!(b.time_string(), "23:45");

        let mut b = builder(9, 50);
        b.adjust_minutes(20);
        assert_eq!(b.time_string(), "10:10");
    }

    #[test]
    fn built_time_is_accepted_by_the_schedule() {
        let b = builder(0, 0);
        assert!(crate::schedule::parse_time(&b.time_string()).is_ok());
    }
}
