use std::path::PathBuf;

/// What the ui asks of the audio thread. Nothing is sent back.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// a dose became due
    AlertTriggered {
        dose: String,
        volume: f32,
        sound_path: PathBuf,
    },
    /// the dose was taken (or the alert is no longer relevant)
    AlertStopped,
    PlayMusic {
        tracks: Vec<PathBuf>,
        volume: f32,
    },
    StopMusic,
    SetVolume(f32),
    /// the window closed, stop everything and end the thread
    Shutdown,
}
