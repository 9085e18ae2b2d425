use std::{
    collections::BTreeSet,
    fmt, fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Day of the week a dose is active on.
///
/// Always stored by its english name, whatever language the ui shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Self; 7] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];

    #[must_use]
    pub const fn canonical_name(self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        }
    }

    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

impl FromStr for Weekday {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|day| day.canonical_name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ValidationError::UnknownWeekday(s.to_string()))
    }
}

impl TryFrom<String> for Weekday {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Weekday> for String {
    fn from(day: Weekday) -> Self {
        day.canonical_name().to_string()
    }
}

/// Parses a strict `HH:MM` time of day.
///
/// # Errors
/// if the text is not two digit hours (0-23) and minutes (0-59) separated by a colon
pub fn parse_time(text: &str) -> Result<NaiveTime, ValidationError> {
    let malformed = || ValidationError::MalformedTime(text.to_string());
    let bytes = text.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(malformed());
    }
    let hour: u32 = parse_two_digits(&text[..2]).ok_or_else(malformed)?;
    let minute: u32 = parse_two_digits(&text[3..]).ok_or_else(malformed)?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(malformed)
}

fn parse_two_digits(text: &str) -> Option<u32> {
    if text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().ok()
    } else {
        None
    }
}

/// serde adapter keeping dose times as `HH:MM` in the schedule file
mod hh_mm {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_time(&text).map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationEntry {
    pub name: String,
    #[serde(with = "hh_mm")]
    pub time: NaiveTime,
    pub days: BTreeSet<Weekday>,
}

impl MedicationEntry {
    #[must_use]
    pub fn new(name: impl Into<String>, time: NaiveTime, days: impl IntoIterator<Item = Weekday>) -> Self {
        Self {
            name: name.into(),
            time,
            days: days.into_iter().collect(),
        }
    }

    /// (name, time) is what makes two entries the same dose
    #[must_use]
    pub fn is_dose(&self, name: &str, time: NaiveTime) -> bool {
        self.name == name && self.time == time
    }

    #[must_use]
    pub fn is_active_on(&self, day: Weekday) -> bool {
        self.days.contains(&day)
    }

    #[must_use]
    pub fn time_label(&self) -> String {
        self.time.format("%H:%M").to_string()
    }
}

impl fmt::Display for MedicationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = self
            .days
            .iter()
            .map(|day| day.canonical_name())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} - {} ({days})", self.name, self.time_label())
    }
}

/// On disk layout of the schedule file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ScheduleFile {
    medications: Vec<MedicationEntry>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("medication name is empty")]
    EmptyName,
    #[error("`{0}` is not a valid HH:MM time")]
    MalformedTime(String),
    #[error("`{0}` is not a day of the week")]
    UnknownWeekday(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("couldn't write schedule file {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("couldn't serialize schedule: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    /// the change was kept in memory but won't survive a restart
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What an `add` did to the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Created,
    Merged,
    Unchanged,
}

/// Durable list of medication entries backed by a json file.
#[derive(Debug)]
pub struct ScheduleStore {
    path: PathBuf,
    entries: Vec<MedicationEntry>,
}

impl ScheduleStore {
    /// Reads the schedule at `path`.
    ///
    /// Never fails: a missing or unreadable file gives an empty schedule so there is always
    /// something to render.
    #[must_use]
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<ScheduleFile>(&contents) {
                Ok(file) => merge_duplicates(file.medications),
                Err(e) => {
                    log::warn!("schedule {} is malformed, starting empty: {e}", path.display());
                    Vec::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("no schedule at {}, starting empty", path.display());
                Vec::new()
            }
            Err(e) => {
                log::warn!("couldn't read schedule {}, starting empty: {e}", path.display());
                Vec::new()
            }
        };
        Self { path, entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[MedicationEntry] {
        &self.entries
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds `day` to the dose (`name`, `time`), creating it if needed, then persists.
    ///
    /// # Errors
    /// [`ScheduleError::Invalid`] leaves the schedule untouched,
    /// [`ScheduleError::Storage`] means the change is only in memory
    pub fn add(&mut self, name: &str, time: &str, day: &str) -> Result<Change, ScheduleError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let time = parse_time(time.trim())?;
        let day: Weekday = day.parse()?;

        let change = match self.entries.iter_mut().find(|e| e.is_dose(name, time)) {
            Some(existing) => {
                if existing.days.insert(day) {
                    Change::Merged
                } else {
                    Change::Unchanged
                }
            }
            None => {
                self.entries.push(MedicationEntry::new(name, time, [day]));
                Change::Created
            }
        };
        if change != Change::Unchanged {
            self.persist()?;
        }
        Ok(change)
    }

    /// Removes every entry for the dose (`name`, `time`), returning how many went.
    ///
    /// # Errors
    /// if the schedule file couldn't be rewritten, nothing is written when nothing matched
    pub fn remove(&mut self, name: &str, time: NaiveTime) -> Result<usize, StorageError> {
        let before = self.entries.len();
        self.entries.retain(|e| !e.is_dose(name, time));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Writes the whole schedule, replacing the file in one rename.
    ///
    /// # Errors
    /// if serializing or any of the file operations fail
    pub fn persist(&self) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        let contents = serde_json::to_string_pretty(&ScheduleFile {
            medications: self.entries.clone(),
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, contents).map_err(io_err)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                log::warn!("couldn't remove {}: {cleanup}", tmp.display());
            }
            return Err(io_err(e));
        }
        log::debug!("saved {} entries to {}", self.entries.len(), self.path.display());
        Ok(())
    }
}

/// folds hand edited duplicates of the same dose into one entry
fn merge_duplicates(entries: Vec<MedicationEntry>) -> Vec<MedicationEntry> {
    let mut merged: Vec<MedicationEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        match merged.iter_mut().find(|e| e.is_dose(&entry.name, entry.time)) {
            Some(existing) => existing.days.extend(entry.days),
            None => merged.push(entry),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, ScheduleStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ScheduleStore::load(dir.path().join("medications.json"));
        (dir, store)
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    #[test]
    fn parse_time_accepts_only_hh_mm() {
        assert_eq!(parse_time("09:05"), Ok(at(9, 5)));
        assert_eq!(parse_time("23:59"), Ok(at(23, 59)));
        assert_eq!(parse_time("00:00"), Ok(at(0, 0)));
        for bad in ["9:05", "24:00", "12:60", "12-30", "ab:cd", "12:3 ", "+1:30", ""] {
            assert_eq!(
                parse_time(bad),
                Err(ValidationError::MalformedTime(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn weekday_parses_case_insensitively() {
        assert_eq!("monday".parse::<Weekday>(), Ok(Weekday::Monday));
        assert_eq!(" SUNDAY ".parse::<Weekday>(), Ok(Weekday::Sunday));
        assert_eq!(
            "Funday".parse::<Weekday>(),
            Err(ValidationError::UnknownWeekday("Funday".to_string()))
        );
    }

    #[test]
    fn weekday_from_chrono() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
        assert_eq!(Weekday::of(date), Weekday::Monday);
        assert_eq!(Weekday::from(chrono::Weekday::Sun), Weekday::Sunday);
    }

    #[test]
    fn missing_file_loads_empty() {
        let (_dir, store) = store();
        assert!(store.is_empty());
    }

    #[test]
    fn malformed_file_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("medications.json");
        fs::write(&path, "{\"medications\": [{\"name\": 3}]").expect("write");
        assert!(ScheduleStore::load(&path).is_empty());

        fs::write(
            &path,
            r#"{"medications": [{"name": "a", "time": "25:00", "days": ["Monday"]}]}"#,
        )
        .expect("write");
        assert!(ScheduleStore::load(&path).is_empty());
    }

    #[test]
    fn load_merges_duplicate_doses() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("medications.json");
        fs::write(
            &path,
            r#"{"medications": [
                {"name": "Aspirin", "time": "09:00", "days": ["Monday"]},
                {"name": "Aspirin", "time": "09:00", "days": ["friday", "Monday"]}
            ]}"#,
        )
        .expect("write");
        let store = ScheduleStore::load(&path);
        assert_eq!(store.entries().len(), 1);
        assert_eq!(
            store.entries()[0].days,
            BTreeSet::from([Weekday::Monday, Weekday::Friday])
        );
    }

    #[test]
    fn add_rejects_bad_input_without_mutating() {
        let (_dir, mut store) = store();
        assert!(matches!(
            store.add("   ", "09:00", "Monday"),
            Err(ScheduleError::Invalid(ValidationError::EmptyName))
        ));
        assert!(matches!(
            store.add("Aspirin", "9am", "Monday"),
            Err(ScheduleError::Invalid(ValidationError::MalformedTime(_)))
        ));
        assert!(matches!(
            store.add("Aspirin", "09:00", "Someday"),
            Err(ScheduleError::Invalid(ValidationError::UnknownWeekday(_)))
        ));
        assert!(store.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn add_merges_days_for_same_dose() {
        let (_dir, mut store) = store();
        assert_eq!(store.add("Aspirin", "09:00", "Monday").expect("add"), Change::Created);
        assert_eq!(store.add(" Aspirin ", "09:00", "Friday").expect("add"), Change::Merged);
        assert_eq!(store.add("Aspirin", "09:00", "monday").expect("add"), Change::Unchanged);
        assert_eq!(store.entries().len(), 1);
        assert_eq!(
            store.entries()[0].days,
            BTreeSet::from([Weekday::Monday, Weekday::Friday])
        );
    }

    #[test]
    fn different_time_or_name_is_a_different_dose() {
        let (_dir, mut store) = store();
        store.add("Aspirin", "09:00", "Monday").expect("add");
        store.add("Aspirin", "21:00", "Monday").expect("add");
        store.add("Vitamin D", "09:00", "Monday").expect("add");
        assert_eq!(store.entries().len(), 3);
    }

    #[test]
    fn file_uses_canonical_layout() {
        let (_dir, mut store) = store();
        store.add("Aspirin", "09:00", "tuesday").expect("add");
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).expect("read")).expect("json");
        assert_eq!(
            written,
            serde_json::json!({
                "medications": [{"name": "Aspirin", "time": "09:00", "days": ["Tuesday"]}]
            })
        );
    }

    #[test]
    fn remove_deletes_matching_dose() {
        let (_dir, mut store) = store();
        store.add("Aspirin", "09:00", "Monday").expect("add");
        store.add("Aspirin", "21:00", "Monday").expect("add");
        assert_eq!(store.remove("Aspirin", at(9, 0)).expect("remove"), 1);
        assert_eq!(store.entries().len(), 1);
        assert_eq!(ScheduleStore::load(store.path()).entries(), store.entries());
    }

    #[test]
    fn remove_unknown_dose_leaves_file_alone() {
        let (_dir, mut store) = store();
        store.add("Aspirin", "09:00", "Monday").expect("add");
        // hand formatted so a rewrite would be visible
        let original = r#"{"medications":[{"name":"Aspirin","time":"09:00","days":["Monday"]}]}"#;
        fs::write(store.path(), original).expect("write");

        assert_eq!(store.remove("Aspirin", at(10, 0)).expect("remove"), 0);
        assert_eq!(store.remove("Ibuprofen", at(9, 0)).expect("remove"), 0);
        assert_eq!(fs::read_to_string(store.path()).expect("read"), original);
    }

    #[test]
    fn persist_failure_keeps_memory_change() {
        let dir = tempfile::tempdir().expect("tempdir");
        // the parent "directory" is a file, so the write can't succeed
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").expect("write");
        let mut store = ScheduleStore::load(blocker.join("medications.json"));

        assert!(matches!(
            store.add("Aspirin", "09:00", "Monday"),
            Err(ScheduleError::Storage(StorageError::Io { .. }))
        ));
        assert_eq!(store.entries().len(), 1);
    }

    #[test]
    fn failed_rename_cleans_up_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        // a non empty directory where the schedule file should be
        let path = dir.path().join("medications.json");
        fs::create_dir(&path).expect("mkdir");
        fs::write(path.join("keep"), "").expect("write");
        let mut store = ScheduleStore::load(&path);

        assert!(matches!(
            store.add("Aspirin", "09:00", "Monday"),
            Err(ScheduleError::Storage(StorageError::Io { .. }))
        ));
        assert!(!dir.path().join("medications.json.tmp").exists());
    }
}
