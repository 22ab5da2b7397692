//! 后台解码线程
//!
//! 解码线程把帧图片解码为 RGBA 并送入有界通道。通道容量即预取深度，
//! 满时解码线程阻塞，播放端消费后才继续。停止时先丢弃接收端，
//! 阻塞中的发送随即失败，线程退出后再 join。

use crate::core::error::{MovieError, MovieResult};
use crossbeam_channel::{bounded, Receiver, Sender};
use image::imageops::{self, FilterType};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// 一帧解码结果
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub index: u64,
    /// 相对影片开始的呈现时间
    pub pts: Duration,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug)]
pub enum DecoderEvent {
    Frame(DecodedFrame),
    EndOfStream,
}

/// 消费端一次取帧的结果
#[derive(Debug)]
pub enum FrameStep {
    Present(DecodedFrame),
    Wait,
    End,
}

pub struct DecodeWorker {
    receiver: Option<Receiver<DecoderEvent>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    pending: Option<DecodedFrame>,
    end_of_stream: bool,
}

impl DecodeWorker {
    /// 启动解码线程，帧按 `fps` 赋予呈现时间，并缩放到 `width`x`height`
    pub fn spawn(
        frames: Vec<PathBuf>,
        width: u32,
        height: u32,
        fps: f32,
        depth: usize,
    ) -> MovieResult<Self> {
        let (tx, rx) = bounded(depth.max(1));
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let frame_interval = 1.0 / f64::from(fps.max(f32::EPSILON));

        let handle = thread::Builder::new()
            .name("movie-decode".to_string())
            .spawn(move || {
                decode_loop(frames, width, height, frame_interval, &tx, &worker_stop);
            })
            .map_err(MovieError::Io)?;

        Ok(Self {
            receiver: Some(rx),
            stop,
            handle: Some(handle),
            pending: None,
            end_of_stream: false,
        })
    }

    /// 取出呈现时间不晚于 `elapsed` 的最新一帧，跳过落后的帧
    pub fn next_due(&mut self, elapsed: Duration) -> FrameStep {
        let mut due: Option<DecodedFrame> = None;
        loop {
            if self.pending.is_none() && !self.fill_pending(None) {
                break;
            }
            match self.pending.take() {
                Some(frame) if frame.pts <= elapsed => {
                    if let Some(skipped) = due.replace(frame) {
                        tracing::trace!(target: "movie", frame = skipped.index, "dropping late frame");
                    }
                }
                other => {
                    self.pending = other;
                    break;
                }
            }
        }
        self.step(due)
    }

    /// 不看时钟，最多等待 `timeout` 取下一帧
    pub fn next_blocking(&mut self, timeout: Duration) -> FrameStep {
        if self.pending.is_none() {
            self.fill_pending(Some(timeout));
        }
        let frame = self.pending.take();
        self.step(frame)
    }

    pub fn is_finished(&self) -> bool {
        self.end_of_stream && self.pending.is_none()
    }

    /// 停止解码线程并等待其退出，可重复调用
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.receiver = None;
        self.pending = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!(target: "movie", "decode thread panicked");
            }
        }
    }

    fn step(&self, frame: Option<DecodedFrame>) -> FrameStep {
        match frame {
            Some(frame) => FrameStep::Present(frame),
            None if self.is_finished() => FrameStep::End,
            None => FrameStep::Wait,
        }
    }

    fn fill_pending(&mut self, timeout: Option<Duration>) -> bool {
        if self.end_of_stream {
            return false;
        }
        let Some(rx) = self.receiver.as_ref() else {
            self.end_of_stream = true;
            return false;
        };
        // Err(true) 表示发送端已断开
        let event = match timeout {
            None => rx.try_recv().map_err(|e| e.is_disconnected()),
            Some(timeout) => rx.recv_timeout(timeout).map_err(|e| e.is_disconnected()),
        };
        match event {
            Ok(DecoderEvent::Frame(frame)) => {
                self.pending = Some(frame);
                true
            }
            Ok(DecoderEvent::EndOfStream) | Err(true) => {
                self.end_of_stream = true;
                false
            }
            Err(false) => false,
        }
    }
}

impl Drop for DecodeWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn decode_loop(
    frames: Vec<PathBuf>,
    width: u32,
    height: u32,
    frame_interval: f64,
    tx: &Sender<DecoderEvent>,
    stop: &AtomicBool,
) {
    tracing::debug!(target: "movie", frames = frames.len(), "decode thread started");
    for (index, path) in frames.iter().enumerate() {
        if stop.load(Ordering::Acquire) {
            return;
        }
        let image = match image::open(path) {
            Ok(image) => image.to_rgba8(),
            Err(e) => {
                tracing::warn!(target: "movie", path = %path.display(), error = %e, "skipping undecodable frame");
                continue;
            }
        };
        let image = if image.dimensions() == (width, height) {
            image
        } else {
            imageops::resize(&image, width, height, FilterType::Triangle)
        };
        let index = index as u64;
        let frame = DecodedFrame {
            index,
            pts: Duration::from_secs_f64(index as f64 * frame_interval),
            width,
            height,
            pixels: image.into_raw(),
        };
        if tx.send(DecoderEvent::Frame(frame)).is_err() {
            return;
        }
    }
    let _ = tx.send(DecoderEvent::EndOfStream);
    tracing::debug!(target: "movie", "decode thread finished");
}
