#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions)]

use std::{
    error::Error,
    path::{Path, PathBuf},
    sync::mpsc,
    time::Duration,
};

use chrono::{Local, NaiveDateTime, Utc};
use clap::{command, Parser, Subcommand};
use dose_clock::{
    audio,
    communication::Message,
    config::Config,
    engine::{Countdown, NextDose},
    i18n::format_date,
    radio::{load_catalog, RadioBrowser, RadioPaths},
    reminder::Reminder,
    schedule::{MedicationEntry, Weekday},
    ReminderApp,
};
use eframe::{egui::ViewportBuilder, run_native};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// medication schedule to use instead of the configured one
    #[clap(long, global = true)]
    schedule: Option<PathBuf>,
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// write the default config and alert sound
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// schedule a dose, e.g. `add Aspirin 08:00 Monday`
    Add {
        name: String,
        /// HH:MM, 24 hour clock
        time: String,
        day: String,
    },
    /// drop a dose on every day it is scheduled
    Remove { name: String, time: String },
    /// print the whole schedule
    List,
    /// print today's doses and the time until the next one
    Today,
    /// list internet radio stations, refreshing the weekly cache when needed
    Radio {
        /// only this country
        country: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_file_logger::init_logger!("dose_clock").expect("couldn't initialize logger");

    let args = Args::parse();
    let config = Config::load(&Config::config_path());
    let schedule = args
        .schedule
        .unwrap_or_else(|| config.schedule_file.clone());
    let now = Local::now().naive_local();

    match args.command {
        Some(Command::Init { force }) => init(force),
        Some(Command::Add { name, time, day }) => {
            let mut reminder = Reminder::open(&schedule, now);
            // accept the day in the configured language too
            let day = Weekday::from_display(config.language, &day)
                .map_or(day.as_str(), |d| d.canonical_name());
            let change = reminder.add(&name, &time, day, now)?;
            println!("{change:?}: {name} at {time} on {day}");
            Ok(())
        }
        Some(Command::Remove { name, time }) => {
            let mut reminder = Reminder::open(&schedule, now);
            match reminder.remove(&name, &time, now)? {
                0 => println!("no dose of {name} at {time}"),
                removed => println!("removed {removed} dose(s) of {name} at {time}"),
            }
            Ok(())
        }
        Some(Command::List) => {
            let reminder = Reminder::open(&schedule, now);
            for entry in reminder.store().entries() {
                println!("{}", describe(entry, &config));
            }
            Ok(())
        }
        Some(Command::Today) => {
            today(&Reminder::open(&schedule, now), &config, now);
            Ok(())
        }
        Some(Command::Radio { country }) => radio(country.as_deref()),
        None => run_gui(config, &schedule),
    }
}

fn init(force: bool) -> Result<(), Box<dyn Error>> {
    if force || !Config::is_config_present() {
        let config = Config::new();
        config.save(&Config::config_path())?;
        audio::write_default_alert(&config.alert_sound)?;
        println!("wrote {}", Config::config_path().display());
    } else {
        println!(
            "{} already exists, use --force to overwrite it",
            Config::config_path().display()
        );
    }
    Ok(())
}

fn describe(entry: &MedicationEntry, config: &Config) -> String {
    let days = entry
        .days
        .iter()
        .map(|day| day.display_name(config.language))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} {} ({days})", entry.time_label(), entry.name)
}

fn today(reminder: &Reminder, config: &Config, now: NaiveDateTime) {
    let engine = reminder.engine();
    println!("{}", format_date(config.language, now.date()));
    let view = engine.partition_today(now);
    println!("upcoming:");
    for entry in view.future {
        println!("  {}", describe(entry, config));
    }
    println!("earlier:");
    for entry in view.past {
        println!("  {}", describe(entry, config));
    }
    match engine.next_dose(now) {
        NextDose::Upcoming {
            entry,
            seconds_remaining,
        } => println!("{} in {}", entry.name, Countdown(seconds_remaining)),
        NextDose::NoMoreToday => println!("no more medications today"),
        NextDose::NothingScheduled => println!("no medications configured"),
    }
}

fn radio(country: Option<&str>) -> Result<(), Box<dyn Error>> {
    let source = RadioBrowser::new(Duration::from_secs(15))?;
    let catalog = load_catalog(&source, &RadioPaths::in_dir(&Config::data_path()), Utc::now());
    for (name, stations) in &catalog {
        if country.is_some_and(|c| !c.eq_ignore_ascii_case(name)) {
            continue;
        }
        println!("{name}:");
        for station in stations {
            println!("  {} {}", station.name, station.url);
        }
    }
    Ok(())
}

fn run_gui(config: Config, schedule: &Path) -> Result<(), Box<dyn Error>> {
    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_title("Dose Clock")
            .with_inner_size([480.0, 800.0]),
        ..Default::default()
    };

    let (tx, rx) = mpsc::channel();
    let audio = audio::spawn(rx);
    let shutdown = tx.clone();
    let result = run_native(
        "Dose Clock",
        native_options,
        Box::new(|_| Ok(Box::new(ReminderApp::new(config, schedule, tx)))),
    );
    // the app may still hold its sender, so ask the thread to stop instead of waiting for it
    if shutdown.send(Message::Shutdown).is_ok() && audio.join().is_err() {
        log::error!("audio thread panicked");
    }
    result.map_err(Into::into)
}
