//! Materialized audio resources and local playback.
//!
//! The browser front-end this replaces kept synthesized blobs in the
//! object-URL registry and never let go of them. Here every resolved
//! exchange owns a file under the media directory, tracked by the store and
//! released on demand or at session teardown.
//!
//! Playback degrades gracefully: a preferred player from config, falling
//! back to whatever is on PATH (aplay, paplay, ffplay), and if none is
//! found the resource simply stays on disk for manual playback.

use crate::Result;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Handle to one materialized audio resource. Clones refer to the same file.
#[derive(Clone, Debug)]
pub struct AudioHandle {
    id: String,
    path: PathBuf,
}

impl AudioHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Registry of materialized audio files for one session.
pub struct AudioStore {
    dir: PathBuf,
    registry: Mutex<HashMap<String, PathBuf>>,
}

impl AudioStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            registry: Mutex::new(HashMap::new()),
        }
    }

    /// Write the payload to a per-exchange file and register it.
    pub fn materialize(&self, id: &str, payload: &[u8]) -> Result<AudioHandle> {
        let path = self.dir.join(format!("tts_{id}.wav"));
        fs::write(&path, payload)?;
        self.lock_registry().insert(id.to_string(), path.clone());
        debug!(
            target = "audio",
            id,
            path = ?path,
            bytes = payload.len(),
            "materialized audio resource"
        );
        Ok(AudioHandle {
            id: id.to_string(),
            path,
        })
    }

    /// Drop one resource. Unknown ids are ignored.
    pub fn release(&self, id: &str) {
        if let Some(path) = self.lock_registry().remove(id) {
            remove_quietly(&path);
        }
    }

    /// Drop every resource this session materialized.
    pub fn release_all(&self) {
        let drained: Vec<PathBuf> = self.lock_registry().drain().map(|(_, p)| p).collect();
        if !drained.is_empty() {
            debug!(target = "audio", count = drained.len(), "releasing audio resources");
        }
        for path in drained {
            remove_quietly(&path);
        }
    }

    pub fn len(&self) -> usize {
        self.lock_registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_registry().is_empty()
    }

    fn lock_registry(&self) -> std::sync::MutexGuard<'_, HashMap<String, PathBuf>> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for AudioStore {
    fn drop(&mut self) {
        self.release_all();
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(target = "audio", path = ?path, error = %e, "failed to remove audio file");
    }
}

/// Attempt to start playback of a materialized resource.
/// Best effort: a missing player or a refused spawn is logged and discarded,
/// never propagated; the file stays available for manual playback.
pub fn try_play(handle: &AudioHandle, preferred: Option<&str>) {
    let Some(player) = select_player(preferred) else {
        info!(
            target = "audio",
            path = ?handle.path(),
            "no audio player found; resource kept on disk"
        );
        return;
    };
    if let Err(e) = play_with(&player, handle.path()) {
        warn!(target = "audio", player = ?player, error = %e, "playback refused");
    }
}

fn play_with(player_bin: &Path, path: &Path) -> std::io::Result<()> {
    let name = player_bin.file_name().and_then(|s| s.to_str()).unwrap_or("");
    match name {
        "ffplay" => {
            Command::new(player_bin)
                .arg("-autoexit")
                .arg("-nodisp")
                .arg(path)
                .status()?;
        }
        _ => {
            Command::new(player_bin).arg(path).status()?;
        }
    }
    Ok(())
}

fn select_player(pref: Option<&str>) -> Option<PathBuf> {
    if let Some(p) = pref {
        if let Some(bin) = find_in_path(p) {
            return Some(bin);
        }
    }
    find_in_path("aplay")
        .or_else(|| find_in_path("paplay"))
        .or_else(|| find_in_path("ffplay"))
}

fn find_in_path(bin: &str) -> Option<PathBuf> {
    // If a path-like string is provided, respect it directly
    if bin.contains(std::path::MAIN_SEPARATOR) {
        let p = PathBuf::from(bin);
        return if p.exists() { Some(p) } else { None };
    }

    // Search PATH portably
    if let Some(paths_os) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&paths_os) {
            let candidate = dir.join(bin);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }
    None
}
