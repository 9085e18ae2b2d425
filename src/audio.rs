//! The audio thread: alert sounds and the local music playlist.
//!
//! The ui only ever sends [`Message`]s; playback problems are logged here and never reported
//! back, the on screen alert is what counts.

use std::{
    ffi::OsStr,
    fs, io,
    path::{Path, PathBuf},
    sync::mpsc::{Receiver, RecvTimeoutError},
    thread::{self, JoinHandle},
    time::Duration,
};

use rand::seq::SliceRandom;
use thiserror::Error;

use crate::communication::Message;

const AUDIO_EXTENSIONS: [&str; 4] = ["mp3", "wav", "ogg", "flac"];

#[derive(Debug, Error)]
pub enum PlaybackUnavailable {
    #[error("sound file {} not found", .0.display())]
    MissingSound(PathBuf),
    #[error("no audio output: {0}")]
    Device(String),
    #[error("couldn't decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },
    #[error("built without sound support")]
    Disabled,
}

/// Starts the audio thread. It runs until every sender is dropped, then stops whatever is
/// still playing.
#[must_use]
pub fn spawn(receiver: Receiver<Message>) -> JoinHandle<()> {
    thread::spawn(move || run(&receiver))
}

fn run(receiver: &Receiver<Message>) {
    let mut player = match Player::open() {
        Ok(player) => Some(player),
        Err(e) => {
            log::warn!("alerts will be silent: {e}");
            None
        }
    };
    loop {
        if let Some(player) = &mut player {
            player.refill_music();
        }
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(Message::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(message) => match &mut player {
                Some(player) => handle(player, message),
                None => log::debug!("no audio output, skipping {message:?}"),
            },
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
    if let Some(player) = &mut player {
        player.stop_alert();
        player.stop_music();
    }
    log::info!("audio thread stopped");
}

fn handle(player: &mut Player, message: Message) {
    match message {
        Message::AlertTriggered {
            dose,
            volume,
            sound_path,
        } => {
            log::info!("ringing for {dose}");
            if let Err(e) = player.play_alert(&sound_path, volume) {
                log::warn!("alert for {dose} is silent: {e}");
            }
        }
        Message::AlertStopped => player.stop_alert(),
        Message::PlayMusic { tracks, volume } => player.play_music(tracks, volume),
        Message::StopMusic => player.stop_music(),
        Message::SetVolume(volume) => player.set_volume(volume),
        Message::Shutdown => {}
    }
}

/// Writes the stock alert: three short 880 Hz beeps as 16 bit mono wav.
///
/// # Errors
/// if the file or its folder can't be written
pub fn write_default_alert(path: &Path) -> io::Result<()> {
    const SAMPLE_RATE: u32 = 22_050;
    const BEEP: u32 = SAMPLE_RATE / 5;
    const GAP: u32 = SAMPLE_RATE / 10;

    let mut samples = Vec::new();
    for _ in 0..3 {
        samples.extend((0..BEEP).map(|n| {
            let t = f64::from(n) / f64::from(SAMPLE_RATE);
            // 0.4 of full scale
            (f64::sin(2. * std::f64::consts::PI * 880. * t) * 13_000.) as i16
        }));
        samples.extend(std::iter::repeat(0).take(GAP as usize));
    }
    let data_len = u32::try_from(samples.len() * 2).map_err(io::Error::other)?;

    let mut wav = Vec::with_capacity(44 + samples.len() * 2);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    // pcm, mono
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        wav.extend_from_slice(&sample.to_le_bytes());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, wav)
}

/// Audio files directly inside `dir`, sorted by path.
#[must_use]
pub fn collect_tracks(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("couldn't read music folder {}: {e}", dir.display());
            return Vec::new();
        }
    };
    let mut tracks: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_audio(path))
        .collect();
    tracks.sort();
    tracks
}

fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| AUDIO_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}

#[must_use]
pub fn shuffled(tracks: &[PathBuf]) -> Vec<PathBuf> {
    let mut tracks = tracks.to_vec();
    tracks.shuffle(&mut rand::thread_rng());
    tracks
}

#[cfg(feature = "sound")]
use output::Player;

#[cfg(feature = "sound")]
mod output {
    use std::{
        fs::File,
        io::BufReader,
        path::{Path, PathBuf},
    };

    use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};

    use super::{shuffled, PlaybackUnavailable};

    struct Playlist {
        tracks: Vec<PathBuf>,
        sink: Sink,
    }

    pub struct Player {
        stream: OutputStream,
        alert: Option<Sink>,
        music: Option<Playlist>,
    }

    fn decode(path: &Path) -> Result<Decoder<BufReader<File>>, PlaybackUnavailable> {
        let file =
            File::open(path).map_err(|_| PlaybackUnavailable::MissingSound(path.to_path_buf()))?;
        Decoder::new(BufReader::new(file)).map_err(|e| PlaybackUnavailable::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    impl Player {
        pub fn open() -> Result<Self, PlaybackUnavailable> {
            let stream = OutputStreamBuilder::open_default_stream()
                .map_err(|e| PlaybackUnavailable::Device(e.to_string()))?;
            Ok(Self {
                stream,
                alert: None,
                music: None,
            })
        }

        /// plays the sound once, cutting off an alert that is still ringing
        pub fn play_alert(&mut self, path: &Path, volume: f32) -> Result<(), PlaybackUnavailable> {
            let source = decode(path)?;
            self.stop_alert();
            let sink = Sink::connect_new(self.stream.mixer());
            sink.set_volume(volume / 100.0);
            sink.append(source);
            sink.play();
            self.alert = Some(sink);
            Ok(())
        }

        pub fn stop_alert(&mut self) {
            if let Some(sink) = self.alert.take() {
                sink.stop();
            }
        }

        pub fn play_music(&mut self, tracks: Vec<PathBuf>, volume: f32) {
            self.stop_music();
            let sink = Sink::connect_new(self.stream.mixer());
            sink.set_volume(volume / 100.0);
            self.music = Some(Playlist { tracks, sink });
            self.refill_music();
        }

        pub fn stop_music(&mut self) {
            if let Some(playlist) = self.music.take() {
                playlist.sink.stop();
            }
        }

        /// queues a fresh shuffle once the playlist has run out
        pub fn refill_music(&mut self) {
            let Some(playlist) = &self.music else {
                return;
            };
            if !playlist.sink.empty() {
                return;
            }
            let mut queued = 0;
            for track in shuffled(&playlist.tracks) {
                match decode(&track) {
                    Ok(source) => {
                        playlist.sink.append(source);
                        queued += 1;
                    }
                    Err(e) => log::warn!("skipping track: {e}"),
                }
            }
            if queued == 0 {
                log::warn!("nothing in the playlist can be played, stopping music");
                self.music = None;
            }
        }

        pub fn set_volume(&mut self, volume: f32) {
            let volume = volume / 100.0;
            if let Some(sink) = &self.alert {
                sink.set_volume(volume);
            }
            if let Some(playlist) = &self.music {
                playlist.sink.set_volume(volume);
            }
        }
    }
}

#[cfg(not(feature = "sound"))]
use silent::Player;

#[cfg(not(feature = "sound"))]
mod silent {
    use std::path::{Path, PathBuf};

    use super::PlaybackUnavailable;

    /// can't be constructed, every build without sound support is silent
    pub enum Player {}

    impl Player {
        pub const fn open() -> Result<Self, PlaybackUnavailable> {
            Err(PlaybackUnavailable::Disabled)
        }

        pub fn play_alert(&mut self, _: &Path, _: f32) -> Result<(), PlaybackUnavailable> {
            match *self {}
        }

        pub fn stop_alert(&mut self) {
            match *self {}
        }

        pub fn play_music(&mut self, _: Vec<PathBuf>, _: f32) {
            match *self {}
        }

        pub fn stop_music(&mut self) {
            match *self {}
        }

        pub fn refill_music(&mut self) {
            match *self {}
        }

        pub fn set_volume(&mut self, _: f32) {
            match *self {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_only_audio_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b.MP3", "a.wav", "notes.txt", "cover.jpg", "c.flac"] {
            fs::write(dir.path().join(name), b"").expect("write");
        }
        fs::create_dir(dir.path().join("nested.ogg")).expect("mkdir");

        let names: Vec<_> = collect_tracks(dir.path())
            .iter()
            .filter_map(|p| p.file_name().and_then(OsStr::to_str).map(str::to_string))
            .collect();
        assert_eq!(names, ["a.wav", "b.MP3", "c.flac"]);
    }

    #[test]
    fn missing_music_folder_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(collect_tracks(&dir.path().join("nope")).is_empty());
    }

    #[test]
    fn shuffle_keeps_every_track() {
        let tracks: Vec<PathBuf> = (0..20).map(|i| PathBuf::from(format!("{i}.mp3"))).collect();
        let mut shuffled = shuffled(&tracks);
        assert_eq!(shuffled.len(), tracks.len());
        shuffled.sort();
        let mut sorted = tracks;
        sorted.sort();
        assert_eq!(shuffled, sorted);
    }

    #[test]
    fn audio_thread_stops_when_senders_drop() {
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = spawn(rx);
        tx.send(Message::AlertTriggered {
            dose: "Aspirin".to_string(),
            volume: 50.0,
            sound_path: PathBuf::from("/definitely/not/here.wav"),
        })
        .expect("send");
        drop(tx);
        handle.join().expect("audio thread panicked");
    }

    #[test]
    fn audio_thread_stops_on_shutdown() {
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = spawn(rx);
        tx.send(Message::Shutdown).expect("send");
        handle.join().expect("audio thread panicked");
        // the sender is still alive, the thread ended because it was told to
        drop(tx);
    }

    #[test]
    fn default_alert_is_a_wav_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sounds").join("alert.wav");
        write_default_alert(&path).expect("write alert");
        let bytes = fs::read(&path).expect("read alert");
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        let data_len = u32::from_le_bytes(bytes[40..44].try_into().expect("4 bytes"));
        assert_eq!(bytes.len(), 44 + data_len as usize);
        assert!(is_audio(&path));
    }
}
