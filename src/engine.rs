use std::{collections::HashMap, fmt};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::schedule::{MedicationEntry, Weekday};

/// Where a dose is in its day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoseState {
    /// its time hasn't come yet today
    Pending,
    /// its time came and the alert went off
    Due,
    /// someone confirmed it was taken
    Acknowledged,
}

/// Emitted once when a dose becomes due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoseAlert {
    pub name: String,
    pub time: NaiveTime,
    pub fired_at: NaiveDateTime,
}

/// Today's active doses split around the current time.
#[derive(Debug, PartialEq, Eq)]
pub struct TodayView<'a> {
    /// ascending by time
    pub future: Vec<&'a MedicationEntry>,
    /// in schedule order
    pub past: Vec<&'a MedicationEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextDose<'a> {
    Upcoming {
        entry: &'a MedicationEntry,
        seconds_remaining: u32,
    },
    /// doses exist, just none left today
    NoMoreToday,
    /// the schedule is empty
    NothingScheduled,
}

/// Seconds until the next dose, shown as `HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown(pub u32);

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hours, rest) = (self.0 / 3600, self.0 % 3600);
        write!(f, "{hours:02}:{:02}:{:02}", rest / 60, rest % 60)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub rolled_over: bool,
    pub alerts: Vec<DoseAlert>,
    /// seconds until the next dose, if any is left today
    pub next: Option<Countdown>,
}

type DoseKey = (String, NaiveTime);

fn key(entry: &MedicationEntry) -> DoseKey {
    (entry.name.clone(), entry.time)
}

/// Turns the schedule plus an injected wall clock into today's view and alerts.
///
/// Keeps one [`DoseState`] per dose active on `date`; nothing else is remembered between ticks.
#[derive(Debug)]
pub struct AlertEngine {
    entries: Vec<MedicationEntry>,
    date: NaiveDate,
    status: HashMap<DoseKey, DoseState>,
    /// a rebuild crossed midnight before any tick did
    unreported_rollover: bool,
}

impl AlertEngine {
    #[must_use]
    pub fn new(entries: &[MedicationEntry], now: NaiveDateTime) -> Self {
        let mut engine = Self {
            entries: Vec::new(),
            date: now.date(),
            status: HashMap::new(),
            unreported_rollover: false,
        };
        engine.rebuild(entries, now);
        engine
    }

    /// Replaces the schedule after a mutation and recomputes today's states.
    ///
    /// Doses that were already tracked today keep their state, so one whose time passed since
    /// the last tick still alerts on the next one. Newly seen doses at or past `now` start out
    /// due without alerting.
    pub fn rebuild(&mut self, entries: &[MedicationEntry], now: NaiveDateTime) {
        if now.date() != self.date {
            self.roll_over(now.date());
            self.unreported_rollover = true;
        }
        let previous = std::mem::take(&mut self.status);
        self.entries = entries.to_vec();
        let today = Weekday::of(self.date);
        let time = now.time();
        for entry in self.entries.iter().filter(|e| e.is_active_on(today)) {
            let key = key(entry);
            let state = match previous.get(&key) {
                Some(&state) => state,
                None if entry.time > time => DoseState::Pending,
                None => DoseState::Due,
            };
            self.status.insert(key, state);
        }
        log::debug!("rebuilt {} dose states for {}", self.status.len(), self.date);
    }

    /// Advances the engine to `now`: day rollover, then due transitions, then the countdown.
    pub fn tick(&mut self, now: NaiveDateTime) -> TickReport {
        let mut rolled_over = std::mem::take(&mut self.unreported_rollover);
        if now.date() != self.date {
            self.roll_over(now.date());
            rolled_over = true;
        }

        let time = now.time();
        let mut alerts = Vec::new();
        for entry in &self.entries {
            let Some(state) = self.status.get_mut(&key(entry)) else {
                continue;
            };
            if *state == DoseState::Pending && time >= entry.time {
                *state = DoseState::Due;
                log::info!("{} at {} is due", entry.name, entry.time_label());
                alerts.push(DoseAlert {
                    name: entry.name.clone(),
                    time: entry.time,
                    fired_at: now,
                });
            }
        }

        let next = match self.next_dose(now) {
            NextDose::Upcoming {
                seconds_remaining, ..
            } => Some(Countdown(seconds_remaining)),
            _ => None,
        };
        TickReport {
            rolled_over,
            alerts,
            next,
        }
    }

    fn roll_over(&mut self, date: NaiveDate) {
        log::info!("new day {date}, resetting doses");
        self.date = date;
        let today = Weekday::of(date);
        self.status = self
            .entries
            .iter()
            .filter(|e| e.is_active_on(today))
            .map(|e| (key(e), DoseState::Pending))
            .collect();
    }

    #[must_use]
    pub fn partition_today(&self, now: NaiveDateTime) -> TodayView<'_> {
        let today = Weekday::of(now.date());
        let time = now.time();
        let (mut future, past): (Vec<_>, Vec<_>) = self
            .entries
            .iter()
            .filter(|e| e.is_active_on(today))
            .partition(|e| e.time > time);
        // stable, so equal times keep schedule order
        future.sort_by_key(|e| e.time);
        TodayView { future, past }
    }

    #[must_use]
    pub fn next_dose(&self, now: NaiveDateTime) -> NextDose<'_> {
        if self.entries.is_empty() {
            return NextDose::NothingScheduled;
        }
        match self.partition_today(now).future.first() {
            Some(&entry) => NextDose::Upcoming {
                entry,
                seconds_remaining: entry.time.num_seconds_from_midnight()
                    - now.time().num_seconds_from_midnight(),
            },
            None => NextDose::NoMoreToday,
        }
    }

    /// Marks a due dose as taken, returns false if it wasn't due.
    pub fn acknowledge(&mut self, name: &str, time: NaiveTime) -> bool {
        match self.status.get_mut(&(name.to_string(), time)) {
            Some(state) if *state == DoseState::Due => {
                *state = DoseState::Acknowledged;
                true
            }
            _ => false,
        }
    }

    /// State of a dose today, `None` when it isn't active today.
    #[must_use]
    pub fn state_of(&self, name: &str, time: NaiveTime) -> Option<DoseState> {
        self.status.get(&(name.to_string(), time)).copied()
    }

    #[must_use]
    pub fn entries(&self) -> &[MedicationEntry] {
        &self.entries
    }

    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }
}
