//! Display strings for the ui.
//!
//! Stored data never goes through here: weekdays are kept as [`Weekday`] and only turned into
//! text at the edge.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::schedule::Weekday;

#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    #[default]
    English,
    Hebrew,
}

impl Language {
    pub const ALL: [Self; 2] = [Self::English, Self::Hebrew];
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::English => "English",
            Self::Hebrew => "עברית",
        })
    }
}

const HEBREW_LABELS: &[(&str, &str)] = &[
    ("Medication Reminder", "תזכורת תרופות"),
    ("Future Medications", "תרופות הבאות"),
    ("Past Medications", "תרופות שעברו"),
    ("Next medication in:", "זמן לתרופה הבאה:"),
    ("No more medications today", "אין תרופות נוספות היום"),
    ("No medications configured", "לא הוגדרו תרופות"),
    ("Medication Manager", "ניהול תרופות"),
    ("Medication Name", "שם התרופה"),
    ("Keyboard", "מקלדת"),
    ("Clear", "נקה"),
    ("Add Medication", "הוסף תרופה"),
    ("Remove Medication", "הסר תרופה"),
    ("+20 Min", "+20 דק׳"),
    ("-20 Min", "-20 דק׳"),
    ("Hour", "שעה"),
    ("Minute", "דקה"),
    ("Time to take", "הגיע הזמן לקחת"),
    ("Taken", "נלקח"),
    ("Settings", "הגדרות"),
    ("Language", "שפה"),
    ("Alert sound", "צליל התראה"),
    ("Music folder", "תיקיית מוזיקה"),
    ("Volume", "עוצמה"),
    ("Play Music", "נגן מוזיקה"),
    ("Stop Music", "עצור מוזיקה"),
    ("Choose", "בחר"),
    ("Saved only until restart:", "נשמר רק עד להפעלה מחדש:"),
    ("No music found in", "לא נמצאה מוזיקה ב"),
    ("Manage Medications", "ניהול תרופות"),
];

const HEBREW_DAYS: [(Weekday, &str); 7] = [
    (Weekday::Monday, "שני"),
    (Weekday::Tuesday, "שלישי"),
    (Weekday::Wednesday, "רביעי"),
    (Weekday::Thursday, "חמישי"),
    (Weekday::Friday, "שישי"),
    (Weekday::Saturday, "שבת"),
    (Weekday::Sunday, "ראשון"),
];

const HEBREW_MONTHS: [&str; 12] = [
    "ינואר", "פברואר", "מרץ", "אפריל", "מאי", "יוני", "יולי", "אוגוסט", "ספטמבר", "אוקטובר",
    "נובמבר", "דצמבר",
];

/// Looks up a ui label.
///
/// A label missing from the language's table comes back as the english key itself, so a
/// half translated language still renders.
#[must_use]
pub fn tr(language: Language, key: &'static str) -> &'static str {
    match language {
        Language::English => key,
        Language::Hebrew => HEBREW_LABELS
            .iter()
            .find_map(|&(k, v)| (k == key).then_some(v))
            .unwrap_or(key),
    }
}

impl Weekday {
    #[must_use]
    pub fn display_name(self, language: Language) -> &'static str {
        match language {
            Language::English => self.canonical_name(),
            Language::Hebrew => HEBREW_DAYS
                .iter()
                .find_map(|&(day, name)| (day == self).then_some(name))
                .unwrap_or_else(|| self.canonical_name()),
        }
    }

    /// Reverse of [`Weekday::display_name`]; unknown text is `None`, never passed through.
    #[must_use]
    pub fn from_display(language: Language, text: &str) -> Option<Self> {
        let text = text.trim();
        Self::ALL
            .into_iter()
            .find(|day| day.display_name(language) == text)
    }
}

/// `Monday, 01 January 2024` in the chosen language.
#[must_use]
pub fn format_date(language: Language, date: NaiveDate) -> String {
    match language {
        Language::English => date.format("%A, %d %B %Y").to_string(),
        Language::Hebrew => format!(
            "{}, {:02} {} {}",
            Weekday::of(date).display_name(language),
            date.day(),
            HEBREW_MONTHS[date.month0() as usize],
            date.year()
        ),
    }
}
