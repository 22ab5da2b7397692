//! 帧缓冲与目标矩形

use super::decoder::DecodedFrame;
use serde::{Deserialize, Serialize};

/// 渲染目标矩形 (屏幕坐标)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// 供 refresh() 写入的 RGBA 帧缓冲
#[derive(Debug)]
pub struct Picture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    frame: Option<u64>,
}

impl Picture {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
            frame: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// 最近一次写入的帧序号
    pub fn frame_index(&self) -> Option<u64> {
        self.frame
    }

    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    /// 把解码帧复制进缓冲，尺寸不符时返回 false
    pub fn present(&mut self, frame: &DecodedFrame) -> bool {
        if !self.fits(frame.width, frame.height) || frame.pixels.len() != self.pixels.len() {
            return false;
        }
        self.pixels.copy_from_slice(&frame.pixels);
        self.frame = Some(frame.index);
        true
    }
}
