//! 脚本可见的 "moviePlayer" 类
//!
//! 构造函数不接受脚本参数，每次构造都会立即分配一个原生播放器。
//! 句柄被回收时调用 `unload`，无论是否加载过都安全。

use crate::bindings::handle::TypeTag;
use crate::bindings::registry::ClassRegistryBuilder;
use crate::config::MovieConfig;
use crate::core::error::{BindingResult, MovieResult};
use crate::media::{MoviePlayer, Rect};

/// 脚本中的类名
pub const MOVIE_CLASS: &str = "moviePlayer";

/// 影片播放器的类型标签
pub const MOVIE_TYPE: TypeTag = TypeTag::new(1, "Movie");

/// 注册 "moviePlayer" 类及其方法表
pub fn register_movie_class(
    builder: &mut ClassRegistryBuilder,
    config: &MovieConfig,
) -> BindingResult<()> {
    let config = config.clone();
    builder
        .register_class(MOVIE_CLASS, MOVIE_TYPE, move || {
            Ok(MoviePlayer::new(config.clone()))
        })?
        .on_release(MoviePlayer::unload)?
        .method("stop", stop)?
        .method("allocatePicture", allocate_picture)?
        .method("refresh", refresh)?
        .method("load", load)?
        .method("unload", unload)?
        .method("play", play)?
        .method("getNativeWidth", native_width)?
        .method("getNativeHeight", native_height)?
        .method("hasAudioTrack", has_audio_track)?
        .method("isPlaying", is_playing)?
        .method("getLastError", last_error)?
        .method("clearLastError", clear_last_error)?
        .finalize()
}

fn stop(player: &mut MoviePlayer) {
    player.stop();
}

fn allocate_picture(player: &mut MoviePlayer) -> MovieResult<()> {
    player.allocate_picture()
}

fn refresh(player: &mut MoviePlayer) {
    player.refresh();
}

fn load(player: &mut MoviePlayer, path: String) -> MovieResult<()> {
    player.load(&path)
}

fn unload(player: &mut MoviePlayer) {
    player.unload();
}

fn play(player: &mut MoviePlayer, x: i32, y: i32, width: i32, height: i32) -> MovieResult<()> {
    player.play(Rect::new(x, y, width, height))
}

fn native_width(player: &mut MoviePlayer) -> i32 {
    player.native_width()
}

fn native_height(player: &mut MoviePlayer) -> i32 {
    player.native_height()
}

fn has_audio_track(player: &mut MoviePlayer) -> bool {
    player.has_audio_track()
}

fn is_playing(player: &mut MoviePlayer) -> bool {
    player.is_playing()
}

fn last_error(player: &mut MoviePlayer) -> String {
    player.last_error()
}

fn clear_last_error(player: &mut MoviePlayer) {
    player.clear_last_error();
}
