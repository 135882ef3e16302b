use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, TryRecvError};

use mpeg_player::input::KeyboardState;
use mpeg_player::{
    CancelSpec, CpalBackend, InputDevices, InputSnapshot, Key, PatternDescriptor, PatternSource,
    PlayOutcome, Player, PlayerOptions, SoftwareGraphics,
};

/// Keyboard backed by stdin: every line read counts as one Enter press.
struct StdinKeyboard {
    presses: Receiver<()>,
    open: bool,
}

impl StdinKeyboard {
    fn spawn() -> Result<Self> {
        let (tx, rx) = crossbeam_channel::bounded(4);
        std::thread::Builder::new()
            .name("stdin-keys".into())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    if line.is_err() || tx.send(()).is_err() {
                        break;
                    }
                }
            })
            .context("Failed to spawn stdin reader")?;
        Ok(Self {
            presses: rx,
            open: true,
        })
    }
}

impl InputDevices for StdinKeyboard {
    fn poll(&mut self, snapshot: &mut InputSnapshot) {
        snapshot.clear();
        let mut kb = KeyboardState::default();
        if self.open {
            match self.presses.try_recv() {
                Ok(()) => kb.press(Key::ENTER),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    // stdin closed (e.g. piped input); keep playing.
                    self.open = false;
                }
            }
        }
        snapshot.keyboards.push(kb);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut pattern: Option<PathBuf> = None;
    let mut looping = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--loop" => looping = Some(true),
            "--no-loop" => looping = Some(false),
            _ => pattern = Some(PathBuf::from(arg)),
        }
    }

    let mut options = PlayerOptions::load(&PlayerOptions::config_path());
    if let Some(looping) = looping {
        options.looping = looping;
    }

    let mut audio = CpalBackend::new();
    let graphics = SoftwareGraphics::default();
    let mut player: Player<PatternSource, _, _> = match &pattern {
        Some(path) => Player::from_file_with_options(path, graphics, &mut audio, options)
            .with_context(|| format!("Failed to open {}", path.display()))?,
        None => {
            let desc = serde_json::to_vec(&PatternDescriptor::default())?;
            Player::from_memory_with_options(desc, graphics, &mut audio, options)
                .context("Failed to open built-in test pattern")?
        }
    };

    let (w, h) = player.dimensions();
    let (tw, th) = player.texture_dimensions();
    log::info!("Playing {w}x{h} (texture {tw}x{th}), press Enter to stop");

    let mut keyboard = StdinKeyboard::spawn()?;
    let cancel = CancelSpec {
        keys_any: Some(vec![Key::ENTER]),
        ..Default::default()
    };
    let outcome = player.play_with(&mut keyboard, &cancel);

    let stats = player.graphics().stats();
    log::info!(
        "Converted {} frames ({} blocks, {} fillers), {} scenes, {} audio underruns",
        stats.frames_converted,
        stats.blocks,
        stats.fillers,
        stats.scenes,
        player.audio_underruns()
    );
    player.destroy();

    match outcome {
        Ok(PlayOutcome::Finished) => log::info!("Finished"),
        Ok(PlayOutcome::Cancelled) => log::info!("Stopped by user"),
        Ok(PlayOutcome::Reset) => log::info!("Reset requested"),
        Err(e) => return Err(e).context("Playback failed"),
    }
    Ok(())
}
