/// 影片播放配置

use serde::{Deserialize, Serialize};
use super::{ConfigResult, ConfigError};

/// 影片播放配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieConfig {
    /// 解码线程预取的帧数 (通道容量)
    pub frame_queue_depth: usize,

    /// 清单未指定时的帧率
    pub default_fps: f32,

    /// refresh() 是否按播放时钟推进帧；关闭时每次 refresh() 推进一帧
    pub sync_to_clock: bool,

    /// 不按时钟推进时，等待下一帧的最长时间 (毫秒)
    pub frame_wait_ms: u64,

    /// 视为视频帧的文件扩展名
    pub frame_extensions: Vec<String>,

    /// 视为音轨的文件扩展名
    pub audio_extensions: Vec<String>,
}

impl Default for MovieConfig {
    fn default() -> Self {
        Self {
            frame_queue_depth: 8,
            default_fps: 15.0,
            sync_to_clock: true,
            frame_wait_ms: 250,
            frame_extensions: vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()],
            audio_extensions: vec![
                "wav".to_string(),
                "ogg".to_string(),
                "mp3".to_string(),
                "flac".to_string(),
            ],
        }
    }
}

impl MovieConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.frame_queue_depth == 0 {
            return Err(ConfigError::ValidationError("Frame queue depth must be at least 1".to_string()));
        }
        if !(self.default_fps > 0.0 && self.default_fps <= 240.0) {
            return Err(ConfigError::ValidationError("Invalid default frame rate".to_string()));
        }
        if self.frame_extensions.is_empty() {
            return Err(ConfigError::ValidationError("No frame extensions configured".to_string()));
        }
        Ok(())
    }

    pub fn is_frame_file(&self, extension: &str) -> bool {
        self.frame_extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    pub fn is_audio_file(&self, extension: &str) -> bool {
        self.audio_extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}
