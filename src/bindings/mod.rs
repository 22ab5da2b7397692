//! Language Binding Layer
//!
//! Exposes native classes to an embedded scripting runtime. Scripts hold
//! opaque handles; every call is resolved, type checked and forwarded to the
//! native instance behind the handle.
//!
//! Architecture:
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Script (JavaScript)                      │
//! │        new moviePlayer()   m.play(0, 0, 320, 240)           │
//! │                          │                                  │
//! │                          v                                  │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │          JsBindingAdapter (per-language)            │   │
//! │  └───────────────────────┬─────────────────────────────┘   │
//! │                          │  ScriptValue + handle ids       │
//! │                          v                                  │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │   BindingHost: Dispatcher + HandleTable             │   │
//! │  │   class → method → handle → arguments → invoke      │   │
//! │  └───────────────────────┬─────────────────────────────┘   │
//! │                          │                                  │
//! │                          v                                  │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │   ClassRegistry (immutable, indexed by TypeTag)     │   │
//! │  │   constructor, release hook, method table           │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod class;
pub mod dispatch;
pub mod handle;
pub mod host;
pub mod js;
pub mod registry;
pub mod value;

pub use class::{ClassDescriptor, ClassInfo, IntoNativeMethod, MethodId, MethodInfo, NativeClass, Signature};
pub use dispatch::Dispatcher;
pub use handle::{HandleId, HandleTable, NativeHandle, Ownership, SharedInstance, TypeTag};
pub use host::BindingHost;
pub use js::{JsBindingAdapter, ScriptHandle, SharedHost};
pub use registry::{ClassBuilder, ClassRegistry, ClassRegistryBuilder};
pub use value::{ArgType, FromScript, IntoReturn, IntoScript, ScriptValue};
