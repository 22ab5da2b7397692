use image::{Rgba, RgbaImage};
use movie_bindings::config::{BindingConfig, MovieConfig};
use movie_bindings::scripting::build_js_adapter;
use movie_bindings::ScriptValue;

fn stepping_config() -> BindingConfig {
    BindingConfig {
        movie: MovieConfig {
            sync_to_clock: false,
            frame_wait_ms: 5_000,
            ..MovieConfig::default()
        },
        ..BindingConfig::default()
    }
}

fn movie_dir(frames: usize) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..frames {
        RgbaImage::from_pixel(64, 48, Rgba([0, i as u8, 0, 255]))
            .save(dir.path().join(format!("{i:04}.png")))
            .unwrap();
    }
    dir
}

#[test]
fn test_script_drives_full_playback() {
    let dir = movie_dir(3);
    let js = build_js_adapter(&stepping_config()).unwrap();
    let path = serde_json::to_string(&dir.path().to_string_lossy()).unwrap();

    js.execute_script(&format!(
        r#"
        var movie = new moviePlayer();
        movie.load({path});
        var size = [movie.getNativeWidth(), movie.getNativeHeight()];
        movie.allocatePicture();
        movie.allocatePicture();
        movie.play(0, 0, 320, 240);
        var frames = 0;
        while (movie.isPlaying()) {{
            movie.refresh();
            frames++;
        }}
        movie.stop();
        movie.unload();
        movie.unload();
        var after = [movie.getNativeWidth(), movie.getNativeHeight(), movie.hasAudioTrack()];
        "#
    ))
    .unwrap();

    assert_eq!(js.evaluate("size[0]").unwrap(), ScriptValue::Int(64));
    assert_eq!(js.evaluate("size[1]").unwrap(), ScriptValue::Int(48));
    assert_eq!(js.evaluate("frames").unwrap(), ScriptValue::Int(4));
    assert_eq!(
        js.evaluate("after.join(',')").unwrap(),
        ScriptValue::String("0,0,false".to_string())
    );
}

#[test]
fn test_script_catches_native_failures() {
    let js = build_js_adapter(&BindingConfig::default()).unwrap();
    js.execute_script(
        r#"
        var movie = new moviePlayer();
        var caught = null;
        try {
            movie.load("missing/path");
        } catch (e) {
            caught = e;
        }
        var width = movie.getNativeWidth();
        var kind = caught && caught.kind;
        var isNative = caught instanceof NativeError;
        var message = movie.getLastError();
        movie.clearLastError();
        var cleared = movie.getLastError();
        "#,
    )
    .unwrap();

    assert_eq!(
        js.evaluate("kind").unwrap(),
        ScriptValue::String("NativeOperationFailure".to_string())
    );
    assert_eq!(js.evaluate("isNative").unwrap(), ScriptValue::Bool(true));
    assert_eq!(js.evaluate("width").unwrap(), ScriptValue::Int(0));
    assert!(matches!(js.evaluate("message").unwrap(), ScriptValue::String(s) if s.contains("missing/path")));
    assert_eq!(js.evaluate("cleared").unwrap(), ScriptValue::String(String::new()));
}

#[test]
fn test_script_argument_errors() {
    let js = build_js_adapter(&BindingConfig::default()).unwrap();
    js.execute_script(
        r#"
        var movie = new moviePlayer();
        var errors = [];
        try { movie.play(0, 0, "320", 240); } catch (e) { errors.push(e.kind + ":" + e.message); }
        try { movie.load(42); } catch (e) { errors.push(e.kind); }
        try { movie.load({ path: "x" }); } catch (e) { errors.push(e.kind); }
        "#,
    )
    .unwrap();

    let first = js.evaluate("errors[0]").unwrap();
    assert!(matches!(&first, ScriptValue::String(s) if s.starts_with("ArgumentTypeMismatch") && s.contains("#2")));
    assert_eq!(
        js.evaluate("errors.slice(1).join(',')").unwrap(),
        ScriptValue::String("ArgumentTypeMismatch,ArgumentTypeMismatch".to_string())
    );
}

#[test]
fn test_script_release_and_reclaim() -> anyhow::Result<()> {
    let mut js = build_js_adapter(&BindingConfig::default())?;
    js.execute_script(
        r#"
        var kept = new moviePlayer();
        var gone = new moviePlayer();
        var first = gone.release();
        var second = gone.release();
        var kind = null;
        try { gone.stop(); } catch (e) { kind = e.kind; }
        "#,
    )?;

    assert_eq!(js.evaluate("first")?, ScriptValue::Bool(true));
    assert_eq!(js.evaluate("second")?, ScriptValue::Bool(false));
    assert_eq!(js.evaluate("kind")?, ScriptValue::String("NullHandle".to_string()));
    assert_eq!(js.live_handles(), 1);
    assert_eq!(js.shutdown(), 1);
    assert_eq!(js.live_handles(), 0);
    Ok(())
}

#[test]
fn test_unreachable_players_are_collected() -> anyhow::Result<()> {
    let dir = movie_dir(2);
    let js = build_js_adapter(&stepping_config())?;
    let path = serde_json::to_string(&dir.path().to_string_lossy())?;

    js.execute_script(&format!(
        r#"
        var kept = new moviePlayer();
        for (let i = 0; i < 8; i++) {{
            let movie = new moviePlayer();
            movie.load({path});
            movie.play(0, 0, 64, 48);
        }}
        var cycle = new moviePlayer();
        cycle.self = cycle;
        cycle = null;
        "#
    ))?;

    assert_eq!(js.collect_garbage(), 1);
    assert_eq!(js.live_handles(), 1);
    assert_eq!(js.evaluate("kept.isPlaying()")?, ScriptValue::Bool(false));
    Ok(())
}
