use std::path::PathBuf;

use chrono::{NaiveDateTime, NaiveTime};

use crate::{
    engine::{AlertEngine, TickReport},
    schedule::{Change, ScheduleError, ScheduleStore, StorageError},
};

/// Single owner of the schedule and the alert engine.
///
/// Every mutation and every tick takes `&mut self`, so the engine never sees a half applied
/// edit. Wrap it in a mutex if the ui and the ticking ever end up on different threads.
#[derive(Debug)]
pub struct Reminder {
    store: ScheduleStore,
    engine: AlertEngine,
}

impl Reminder {
    #[must_use]
    pub fn open(path: impl Into<PathBuf>, now: NaiveDateTime) -> Self {
        let store = ScheduleStore::load(path);
        let engine = AlertEngine::new(store.entries(), now);
        Self { store, engine }
    }

    /// Adds a dose and rebuilds today's states.
    ///
    /// # Errors
    /// validation errors leave everything untouched, on storage errors the dose is still
    /// scheduled but won't survive a restart
    pub fn add(
        &mut self,
        name: &str,
        time: &str,
        day: &str,
        now: NaiveDateTime,
    ) -> Result<Change, ScheduleError> {
        let result = self.store.add(name, time, day);
        match &result {
            Err(ScheduleError::Invalid(_)) | Ok(Change::Unchanged) => {}
            _ => self.engine.rebuild(self.store.entries(), now),
        }
        if let Err(e) = &result {
            log::warn!("couldn't add {name} at {time}: {e}");
        }
        result
    }

    /// Removes a dose, `time` in `HH:MM`.
    ///
    /// # Errors
    /// on a malformed time or if the schedule couldn't be written
    pub fn remove(
        &mut self,
        name: &str,
        time: &str,
        now: NaiveDateTime,
    ) -> Result<usize, ScheduleError> {
        let time: NaiveTime = crate::schedule::parse_time(time.trim())?;
        self.remove_dose(name, time, now).map_err(Into::into)
    }

    /// # Errors
    /// if the schedule couldn't be written, the dose is gone from memory regardless
    pub fn remove_dose(
        &mut self,
        name: &str,
        time: NaiveTime,
        now: NaiveDateTime,
    ) -> Result<usize, StorageError> {
        let before = self.store.entries().len();
        let result = self.store.remove(name, time);
        if self.store.entries().len() != before {
            self.engine.rebuild(self.store.entries(), now);
        }
        if let Err(e) = &result {
            log::warn!("couldn't remove {name}: {e}");
        }
        result
    }

    pub fn tick(&mut self, now: NaiveDateTime) -> TickReport {
        self.engine.tick(now)
    }

    pub fn acknowledge(&mut self, name: &str, time: NaiveTime) -> bool {
        self.engine.acknowledge(name, time)
    }

    #[must_use]
    pub const fn engine(&self) -> &AlertEngine {
        &self.engine
    }

    #[must_use]
    pub const fn store(&self) -> &ScheduleStore {
        &self.store
    }
}
