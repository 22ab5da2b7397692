//! Opening movies on disk.
//!
//! A movie is either a directory of frame images played in file-name order,
//! or a single image shown as a one-frame movie. A directory may carry a
//! `movie.toml` manifest:
//!
//! ```toml
//! fps = 12.0
//! audio = "narration.ogg"
//! frames = ["0001.png", "0002.png"]   # optional explicit order
//! ```
//!
//! Without a manifest entry, an `audio.<ext>` file next to the frames (or a
//! `<stem>.<ext>` file next to a single image) is taken as the audio track.

use crate::config::MovieConfig;
use crate::core::error::{MovieError, MovieResult};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

const MANIFEST: &str = "movie.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    fps: Option<f32>,
    audio: Option<String>,
    frames: Option<Vec<String>>,
}

/// An opened movie: frame list, geometry and audio track.
#[derive(Debug, Clone)]
pub struct MovieSource {
    path: PathBuf,
    frames: Vec<PathBuf>,
    width: u32,
    height: u32,
    fps: f32,
    audio: Option<PathBuf>,
}

impl MovieSource {
    pub fn open(path: impl AsRef<Path>, config: &MovieConfig) -> MovieResult<Self> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        if !path.exists() {
            return Err(MovieError::NotFound(shown));
        }

        let (frames, fps, audio) = if path.is_dir() {
            open_directory(path, config)?
        } else {
            open_single(path, config)?
        };
        let first = frames
            .first()
            .ok_or_else(|| MovieError::NoFrames(shown.clone()))?;
        let (width, height) =
            image::image_dimensions(first).map_err(|e| MovieError::Decode {
                path: first.display().to_string(),
                reason: e.to_string(),
            })?;
        if width == 0 || height == 0 {
            return Err(MovieError::NoFrames(shown));
        }

        tracing::debug!(
            target: "movie",
            path = %shown,
            frames = frames.len(),
            width,
            height,
            fps,
            audio = audio.is_some(),
            "opened movie"
        );
        Ok(Self {
            path: path.to_path_buf(),
            frames,
            width,
            height,
            fps,
            audio,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames(&self) -> &[PathBuf] {
        &self.frames
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn audio_track(&self) -> Option<&Path> {
        self.audio.as_deref()
    }
}

fn extension_of(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

fn read_manifest(dir: &Path) -> MovieResult<Manifest> {
    let path = dir.join(MANIFEST);
    if !path.is_file() {
        return Ok(Manifest::default());
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| MovieError::Manifest {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// 清单中的条目必须位于影片目录之内
fn manifest_entry(dir: &Path, name: &str) -> MovieResult<PathBuf> {
    let inside = Path::new(name)
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    if name.is_empty() || !inside {
        return Err(MovieError::Manifest {
            path: dir.join(MANIFEST).display().to_string(),
            reason: format!("entry '{name}' escapes the movie directory"),
        });
    }
    Ok(dir.join(name))
}

fn open_directory(
    dir: &Path,
    config: &MovieConfig,
) -> MovieResult<(Vec<PathBuf>, f32, Option<PathBuf>)> {
    let manifest = read_manifest(dir)?;

    let frames = match &manifest.frames {
        Some(names) => names
            .iter()
            .map(|name| manifest_entry(dir, name))
            .collect::<MovieResult<Vec<_>>>()?,
        None => {
            let mut frames = Vec::new();
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if path.is_file() && extension_of(&path).is_some_and(|ext| config.is_frame_file(ext)) {
                    frames.push(path);
                }
            }
            frames.sort();
            frames
        }
    };

    let fps = match manifest.fps {
        Some(fps) if fps > 0.0 && fps.is_finite() => fps,
        Some(fps) => {
            return Err(MovieError::Manifest {
                path: dir.join(MANIFEST).display().to_string(),
                reason: format!("invalid fps {fps}"),
            })
        }
        None => config.default_fps,
    };

    let audio = match &manifest.audio {
        Some(name) => {
            let path = manifest_entry(dir, name)?;
            if path.is_file() {
                Some(path)
            } else {
                tracing::warn!(target: "movie", path = %path.display(), "manifest audio track is missing");
                None
            }
        }
        None => find_audio(dir, "audio", config),
    };

    Ok((frames, fps, audio))
}

fn open_single(
    path: &Path,
    config: &MovieConfig,
) -> MovieResult<(Vec<PathBuf>, f32, Option<PathBuf>)> {
    if !extension_of(path).is_some_and(|ext| config.is_frame_file(ext)) {
        return Err(MovieError::Decode {
            path: path.display().to_string(),
            reason: "unsupported file type".to_string(),
        });
    }
    let audio = match (path.parent(), path.file_stem().and_then(|s| s.to_str())) {
        (Some(dir), Some(stem)) => find_audio(dir, stem, config),
        _ => None,
    };
    Ok((vec![path.to_path_buf()], config.default_fps, audio))
}

fn find_audio(dir: &Path, stem: &str, config: &MovieConfig) -> Option<PathBuf> {
    config
        .audio_extensions
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|candidate| candidate.is_file())
}
