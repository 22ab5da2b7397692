//! 原生影片播放器
//!
//! 绑定层驱动的原生对象。所有控制调用都是同步的，解码线程由播放器自己持有。

use super::decoder::{DecodeWorker, FrameStep};
use super::picture::{Picture, Rect};
use super::source::MovieSource;
use super::PlaybackState;
use crate::config::MovieConfig;
use crate::core::error::{MovieError, MovieResult};
use std::time::{Duration, Instant};

pub struct MoviePlayer {
    config: MovieConfig,
    state: PlaybackState,
    source: Option<MovieSource>,
    worker: Option<DecodeWorker>,
    picture: Option<Picture>,
    destination: Option<Rect>,
    started_at: Option<Instant>,
    frames_presented: u64,
    last_error: Option<String>,
}

impl MoviePlayer {
    pub fn new(config: MovieConfig) -> Self {
        Self {
            config,
            state: PlaybackState::Unloaded,
            source: None,
            worker: None,
            picture: None,
            destination: None,
            started_at: None,
            frames_presented: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// 打开影片。已有影片会先被卸载；失败时保持 Unloaded 并记录错误
    pub fn load(&mut self, path: &str) -> MovieResult<()> {
        self.unload();
        match MovieSource::open(path, &self.config) {
            Ok(source) => {
                tracing::info!(
                    target: "movie",
                    path,
                    width = source.width(),
                    height = source.height(),
                    "movie loaded"
                );
                self.source = Some(source);
                self.state = PlaybackState::Loaded;
                Ok(())
            }
            Err(e) => Err(self.record(e)),
        }
    }

    /// 开始播放到目标矩形；播放中再次调用只更新矩形
    pub fn play(&mut self, rect: Rect) -> MovieResult<()> {
        match self.state {
            PlaybackState::Loaded | PlaybackState::Playing if rect.is_empty() => {
                Err(self.record(MovieError::InvalidRect {
                    width: rect.width,
                    height: rect.height,
                }))
            }
            PlaybackState::Playing => {
                self.destination = Some(rect);
                Ok(())
            }
            PlaybackState::Loaded => {
                let Some(source) = self.source.as_ref() else {
                    return Err(self.invalid_state("play"));
                };
                let worker = DecodeWorker::spawn(
                    source.frames().to_vec(),
                    source.width(),
                    source.height(),
                    source.fps(),
                    self.config.frame_queue_depth,
                );
                match worker {
                    Ok(worker) => {
                        self.worker = Some(worker);
                        self.destination = Some(rect);
                        self.started_at = Some(Instant::now());
                        self.state = PlaybackState::Playing;
                        tracing::debug!(target: "movie", ?rect, "playback started");
                        Ok(())
                    }
                    Err(e) => Err(self.record(e)),
                }
            }
            PlaybackState::Unloaded | PlaybackState::Stopped => Err(self.invalid_state("play")),
        }
    }

    /// 把下一帧写入帧缓冲。返回是否有新帧呈现；影片结束时转入 Stopped
    pub fn refresh(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        let Some(worker) = self.worker.as_mut() else {
            return false;
        };
        let step = if self.config.sync_to_clock {
            let elapsed = self.started_at.map(|t| t.elapsed()).unwrap_or_default();
            worker.next_due(elapsed)
        } else {
            worker.next_blocking(Duration::from_millis(self.config.frame_wait_ms))
        };

        match step {
            FrameStep::Present(frame) => {
                let presented = match self.picture.as_mut() {
                    Some(picture) => picture.present(&frame),
                    None => {
                        tracing::trace!(target: "movie", frame = frame.index, "no picture allocated, frame dropped");
                        false
                    }
                };
                if presented {
                    self.frames_presented += 1;
                }
                presented
            }
            FrameStep::Wait => false,
            FrameStep::End => {
                tracing::debug!(target: "movie", frames = self.frames_presented, "end of movie");
                self.worker = None;
                self.started_at = None;
                self.state = PlaybackState::Stopped;
                false
            }
        }
    }

    /// 停止播放，非播放状态下无效果
    pub fn stop(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        self.worker = None;
        self.started_at = None;
        self.state = PlaybackState::Stopped;
        tracing::debug!(target: "movie", frames = self.frames_presented, "playback stopped");
    }

    /// 释放所有解码资源，任何状态下都可调用
    pub fn unload(&mut self) {
        let was_loaded = self.state != PlaybackState::Unloaded;
        self.worker = None;
        self.source = None;
        self.picture = None;
        self.destination = None;
        self.started_at = None;
        self.frames_presented = 0;
        self.last_error = None;
        self.state = PlaybackState::Unloaded;
        if was_loaded {
            tracing::debug!(target: "movie", "movie unloaded");
        }
    }

    /// 按影片原始尺寸分配帧缓冲，已分配时不做任何事
    pub fn allocate_picture(&mut self) -> MovieResult<()> {
        let Some(source) = self.source.as_ref() else {
            return Err(self.invalid_state("allocatePicture"));
        };
        let (width, height) = (source.width(), source.height());
        if self.picture.as_ref().is_some_and(|p| p.fits(width, height)) {
            return Ok(());
        }
        self.picture = Some(Picture::new(width, height));
        tracing::debug!(target: "movie", width, height, "picture allocated");
        Ok(())
    }

    pub fn native_width(&self) -> i32 {
        self.source
            .as_ref()
            .map_or(0, |s| i32::try_from(s.width()).unwrap_or(i32::MAX))
    }

    pub fn native_height(&self) -> i32 {
        self.source
            .as_ref()
            .map_or(0, |s| i32::try_from(s.height()).unwrap_or(i32::MAX))
    }

    pub fn has_audio_track(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|s| s.audio_track().is_some())
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// 最近一次失败的描述，没有时为空串
    pub fn last_error(&self) -> String {
        self.last_error.clone().unwrap_or_default()
    }

    pub fn clear_last_error(&mut self) {
        self.last_error = None;
    }

    pub fn picture(&self) -> Option<&Picture> {
        self.picture.as_ref()
    }

    pub fn destination(&self) -> Option<Rect> {
        self.destination
    }

    pub fn source(&self) -> Option<&MovieSource> {
        self.source.as_ref()
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    fn invalid_state(&mut self, operation: &'static str) -> MovieError {
        let err = MovieError::InvalidState {
            operation,
            state: self.state.as_str(),
        };
        self.record(err)
    }

    fn record(&mut self, err: MovieError) -> MovieError {
        tracing::warn!(target: "movie", error = %err, "movie operation failed");
        self.last_error = Some(err.to_string());
        err
    }
}

impl Drop for MoviePlayer {
    fn drop(&mut self) {
        self.unload();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::path::Path;

    fn write_movie(dir: &Path, frames: usize) {
        for i in 0..frames {
            RgbaImage::from_pixel(4, 2, Rgba([i as u8, 1, 2, 255]))
                .save(dir.join(format!("{i:04}.png")))
                .unwrap();
        }
    }

    fn stepping_config() -> MovieConfig {
        MovieConfig {
            sync_to_clock: false,
            frame_wait_ms: 5_000,
            ..MovieConfig::default()
        }
    }

    #[test]
    fn test_fresh_player_queries() {
        let player = MoviePlayer::new(MovieConfig::default());
        assert_eq!(player.state(), PlaybackState::Unloaded);
        assert_eq!(player.native_width(), 0);
        assert_eq!(player.native_height(), 0);
        assert!(!player.has_audio_track());
        assert_eq!(player.last_error(), "");
    }

    #[test]
    fn test_load_missing_path() {
        let mut player = MoviePlayer::new(MovieConfig::default());
        assert!(matches!(player.load("missing/path"), Err(MovieError::NotFound(_))));
        assert_eq!(player.state(), PlaybackState::Unloaded);
        assert_eq!(player.native_width(), 0);
        assert!(!player.last_error().is_empty());
        player.clear_last_error();
        assert_eq!(player.last_error(), "");
    }

    #[test]
    fn test_play_refresh_to_end() {
        let dir = tempfile::tempdir().unwrap();
        write_movie(dir.path(), 3);
        let mut player = MoviePlayer::new(stepping_config());
        player.load(&dir.path().to_string_lossy()).unwrap();
        assert_eq!((player.native_width(), player.native_height()), (4, 2));
        assert_eq!(player.source().map(|s| s.frames().len()), Some(3));

        player.allocate_picture().unwrap();
        player.play(Rect::new(0, 0, 320, 240)).unwrap();
        assert!(player.is_playing());

        let mut presented = 0;
        while player.is_playing() {
            if player.refresh() {
                presented += 1;
            }
        }
        assert_eq!(presented, 3);
        assert_eq!(player.frames_presented(), 3);
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(player.picture().and_then(|p| p.frame_index()), Some(2));
    }

    #[test]
    fn test_play_requires_loaded() {
        let mut player = MoviePlayer::new(MovieConfig::default());
        assert!(matches!(
            player.play(Rect::new(0, 0, 10, 10)),
            Err(MovieError::InvalidState { operation: "play", state: "unloaded" })
        ));
        assert_eq!(player.state(), PlaybackState::Unloaded);
    }

    #[test]
    fn test_play_rejects_empty_rect() {
        let dir = tempfile::tempdir().unwrap();
        write_movie(dir.path(), 1);
        let mut player = MoviePlayer::new(MovieConfig::default());
        player.load(&dir.path().to_string_lossy()).unwrap();
        assert!(matches!(
            player.play(Rect::new(0, 0, 0, 240)),
            Err(MovieError::InvalidRect { .. })
        ));
        assert_eq!(player.state(), PlaybackState::Loaded);
    }

    #[test]
    fn test_play_while_playing_moves_rect() {
        let dir = tempfile::tempdir().unwrap();
        write_movie(dir.path(), 2);
        let mut player = MoviePlayer::new(MovieConfig::default());
        player.load(&dir.path().to_string_lossy()).unwrap();
        player.play(Rect::new(0, 0, 10, 10)).unwrap();
        player.play(Rect::new(5, 5, 20, 20)).unwrap();
        assert_eq!(player.destination(), Some(Rect::new(5, 5, 20, 20)));
        assert!(player.is_playing());
    }

    #[test]
    fn test_stop_and_unload_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_movie(dir.path(), 2);
        let mut player = MoviePlayer::new(MovieConfig::default());
        player.load(&dir.path().to_string_lossy()).unwrap();
        player.play(Rect::new(0, 0, 10, 10)).unwrap();
        player.stop();
        player.stop();
        assert_eq!(player.state(), PlaybackState::Stopped);
        player.unload();
        player.unload();
        assert_eq!(player.state(), PlaybackState::Unloaded);
        assert_eq!(player.native_width(), 0);
    }

    #[test]
    fn test_allocate_picture_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_movie(dir.path(), 1);
        let mut player = MoviePlayer::new(MovieConfig::default());
        assert!(player.allocate_picture().is_err());

        player.load(&dir.path().to_string_lossy()).unwrap();
        player.allocate_picture().unwrap();
        let first = player.picture().map(|p| p.pixels().as_ptr());
        player.allocate_picture().unwrap();
        let second = player.picture().map(|p| p.pixels().as_ptr());
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_refresh_outside_playing_is_noop() {
        let mut player = MoviePlayer::new(MovieConfig::default());
        assert!(!player.refresh());
        assert_eq!(player.state(), PlaybackState::Unloaded);
    }

    #[test]
    fn test_frames_without_picture_are_not_counted() {
        let dir = tempfile::tempdir().unwrap();
        write_movie(dir.path(), 2);
        let mut player = MoviePlayer::new(stepping_config());
        player.load(&dir.path().to_string_lossy()).unwrap();
        player.play(Rect::new(0, 0, 4, 2)).unwrap();

        while player.is_playing() {
            assert!(!player.refresh());
        }
        assert_eq!(player.frames_presented(), 0);

        player.unload();
        assert!(player.source().is_none());
    }
}
