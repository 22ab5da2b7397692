//! # Movie Bindings
//!
//! Scripting bindings for a native movie player.
//!
//! ## Features
//!
//! - **Class Registration**: native types registered once into an immutable class table
//! - **Handles**: generational, type-tagged handles with at-most-once release
//! - **Dispatch**: named method calls with argument marshalling and type checking
//! - **JavaScript**: QuickJS runtime exposing every registered class as a constructor
//! - **Movie Player**: frame-sequence movies decoded on a background thread
//!
//! ### Example
//!
//! ```ignore
//! use movie_bindings::config::BindingConfig;
//! use movie_bindings::scripting::build_js_adapter;
//!
//! let js = build_js_adapter(&BindingConfig::default())?;
//! js.execute_script("const m = new moviePlayer(); m.load('intro');")?;
//! ```
//!
//! ## Modules
//!
//! - [`core`]: errors, logging and shared macros
//! - [`config`]: configuration files and environment overrides
//! - [`bindings`]: class registry, handles, dispatcher and the JS adapter
//! - [`media`]: the native movie player
//! - [`scripting`]: built-in classes and runtime construction

/// Core infrastructure: errors, logging, macros
pub mod core;
/// Configuration system
pub mod config;
/// Language bindings for scripting
pub mod bindings;
/// Native movie playback
pub mod media;
/// Built-in script classes
pub mod scripting;

pub use bindings::{BindingHost, ClassRegistry, JsBindingAdapter, ScriptValue, TypeTag};
pub use config::BindingConfig;
pub use core::error::{BindingError, BindingResult, MovieError, MovieResult};
pub use media::{MoviePlayer, PlaybackState, Rect};
