//! 脚本系统
//!
//! 把原生类注册进绑定层，并为宿主准备好安装了这些类的 JavaScript 运行时。
//!
//! ```ignore
//! let config = BindingConfig::load_or_default();
//! let js = build_js_adapter(&config)?;
//! js.execute_script(r#"
//!     const movie = new moviePlayer();
//!     movie.load("assets/intro");
//!     movie.allocatePicture();
//!     movie.play(0, 0, 320, 240);
//! "#)?;
//! ```

pub mod movie;

pub use movie::{register_movie_class, MOVIE_CLASS, MOVIE_TYPE};

use crate::bindings::host::BindingHost;
use crate::bindings::js::JsBindingAdapter;
use crate::bindings::registry::{ClassRegistry, ClassRegistryBuilder};
use crate::config::BindingConfig;
use crate::core::error::BindingResult;
use std::sync::Arc;

/// 构建包含全部内置类的只读注册表
pub fn build_registry(config: &BindingConfig) -> BindingResult<Arc<ClassRegistry>> {
    let mut builder = ClassRegistryBuilder::new();
    register_movie_class(&mut builder, &config.movie)?;
    Ok(builder.build())
}

pub fn build_host(config: &BindingConfig) -> BindingResult<BindingHost> {
    Ok(BindingHost::new(build_registry(config)?))
}

/// 创建已安装全部内置类的 QuickJS 运行时
pub fn build_js_adapter(config: &BindingConfig) -> BindingResult<JsBindingAdapter> {
    let host = build_host(config)?;
    let adapter = JsBindingAdapter::new(host, &config.scripting)?;
    tracing::info!(
        target: "script",
        memory_limit = config.scripting.memory_limit,
        "script runtime ready"
    );
    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::value::ScriptValue;

    #[test]
    fn test_build_host_constructs_movie() {
        let mut host = build_host(&BindingConfig::default()).unwrap();
        let movie = host.construct_by_name(MOVIE_CLASS).unwrap();
        assert_eq!(
            host.call(&movie, "getNativeWidth", &[]).unwrap(),
            vec![ScriptValue::Int(0)]
        );
        assert!(host.release(&movie).unwrap());
        assert_eq!(host.live_handles(), 0);
    }

    #[test]
    fn test_js_adapter_exposes_movie_player() {
        let js = build_js_adapter(&BindingConfig::default()).unwrap();
        js.execute_script("var m = new moviePlayer(); var playing = m.isPlaying();")
            .unwrap();
        assert_eq!(js.evaluate("playing").unwrap(), ScriptValue::Bool(false));
        assert_eq!(js.live_handles(), 1);
    }
}
