//! 原生影片播放
//!
//! 影片以帧图片序列的形式存放在磁盘上，由后台线程解码，
//! `MoviePlayer` 对外提供同步的 load/play/refresh/stop/unload 控制。

pub mod decoder;
pub mod picture;
pub mod player;
pub mod source;

pub use decoder::{DecodeWorker, DecodedFrame, FrameStep};
pub use picture::{Picture, Rect};
pub use player::MoviePlayer;
pub use source::MovieSource;

use serde::{Deserialize, Serialize};

/// 播放状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Unloaded,
    Loaded,
    Playing,
    Stopped,
}

impl PlaybackState {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackState::Unloaded => "unloaded",
            PlaybackState::Loaded => "loaded",
            PlaybackState::Playing => "playing",
            PlaybackState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
