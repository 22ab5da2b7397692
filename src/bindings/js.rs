//! JavaScript Binding Adapter using rquickjs
//!
//! Every class in the registry becomes a JavaScript constructor. Method ids
//! are resolved once when the prelude installs the prototypes; each call then
//! crosses into Rust as `(class, handle, method id, JSON arguments)`.
//!
//! Failures come back as a JSON envelope and are rethrown by the prelude as
//! `NativeError` objects whose `kind` is the binding error kind, so scripts can
//! catch them like any other exception.
//!
//! Every script object also carries a hidden [`ScriptHandle`] class instance.
//! When the garbage collector finalizes it, the native handle is released.

use super::class::MethodId;
use super::handle::HandleId;
use super::host::BindingHost;
use super::value::{ArgType, ScriptValue};
use crate::config::ScriptingConfig;
use crate::core::error::{BindingError, BindingResult};
use parking_lot::{Mutex, MutexGuard};
use rquickjs::class::{ClassId, JsClass, Readable, Trace, Tracer};
use rquickjs::function::Constructor;
use rquickjs::{Class, Context, Ctx, Function, IntoJs, Object, Runtime, Value};
use serde::Serialize;
use std::sync::Arc;

const PRELUDE: &str = r#"
(function (native) {
    "use strict";

    class NativeError extends Error {
        constructor(kind, message) {
            super(message);
            this.name = "NativeError";
            this.kind = kind;
        }
    }

    function unwrap(reply) {
        const r = JSON.parse(reply);
        if (r.err !== undefined) {
            throw new NativeError(r.err.kind, r.err.message);
        }
        return r.ok;
    }

    function handleOf(self) {
        if (self !== null && typeof self === "object" && "__handle" in self) {
            return JSON.stringify(self.__handle);
        }
        return "null";
    }

    for (const cls of unwrap(native.classes())) {
        const ctor = function () {
            if (!new.target) {
                return new ctor();
            }
            const handle = unwrap(native.construct(cls.tag))[0];
            Object.defineProperty(this, "__handle", { value: handle });
            Object.defineProperty(this, "__owner", { value: native.track(JSON.stringify(handle)) });
        };
        ctor.prototype.release = function () {
            return unwrap(native.release(handleOf(this)))[0];
        };
        ctor.prototype.toJSON = function () {
            return this.__handle;
        };
        for (const m of cls.methods) {
            const id = m.id;
            ctor.prototype[m.name] = function (...args) {
                const values = unwrap(native.call(cls.tag, handleOf(this), id, JSON.stringify(args)));
                if (values.length === 0) {
                    return undefined;
                }
                return values.length === 1 ? values[0] : values;
            };
        }
        Object.defineProperty(globalThis, cls.name, { value: ctor });
    }

    globalThis.NativeError = NativeError;
    const format = (args) => args.map((a) => (typeof a === "string" ? a : JSON.stringify(a))).join(" ");
    globalThis.console = {
        log: (...args) => native.log("info", format(args)),
        info: (...args) => native.log("info", format(args)),
        debug: (...args) => native.log("debug", format(args)),
        warn: (...args) => native.log("warn", format(args)),
        error: (...args) => native.log("error", format(args)),
    };
})(__native);
"#;

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum Envelope {
    Ok(Vec<ScriptValue>),
    Err { kind: &'static str, message: String },
}

fn envelope(result: BindingResult<Vec<ScriptValue>>) -> String {
    let reply = match result {
        Ok(values) => Envelope::Ok(values),
        Err(err) => {
            tracing::debug!(target: "bindings", kind = err.kind(), "{}", err);
            Envelope::Err {
                kind: err.kind(),
                message: err.to_string(),
            }
        }
    };
    serde_json::to_string(&reply).unwrap_or_else(|e| {
        format!(
            r#"{{"err":{{"kind":"ScriptError","message":"failed to encode reply: {}"}}}}"#,
            e.to_string().replace('"', "'")
        )
    })
}

/// The binding host shared between the adapter and its script functions.
///
/// Collected handles that arrive while the host is locked are queued and
/// released on the next [`SharedHost::lock`].
pub struct SharedHost {
    host: Mutex<BindingHost>,
    collected: Mutex<Vec<HandleId>>,
}

impl SharedHost {
    fn new(host: BindingHost) -> Self {
        Self {
            host: Mutex::new(host),
            collected: Mutex::new(Vec::new()),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, BindingHost> {
        let mut host = self.host.lock();
        let collected = std::mem::take(&mut *self.collected.lock());
        for id in collected {
            host.release_id(id);
        }
        host
    }

    fn release_collected(&self, id: HandleId) {
        match self.host.try_lock() {
            Some(mut host) => {
                host.release_id(id);
            }
            None => self.collected.lock().push(id),
        }
    }

    /// Collected handles not yet released.
    pub fn pending_releases(&self) -> usize {
        self.collected.lock().len()
    }
}

/// Hidden companion of every script object; releases the native handle when
/// the garbage collector finalizes it.
pub struct ScriptHandle {
    id: HandleId,
    host: Arc<SharedHost>,
}

impl Drop for ScriptHandle {
    fn drop(&mut self) {
        tracing::trace!(target: "bindings", handle = %self.id, "script object collected");
        self.host.release_collected(self.id);
    }
}

impl<'js> Trace<'js> for ScriptHandle {
    fn trace<'a>(&self, _tracer: Tracer<'a, 'js>) {}
}

impl<'js> JsClass<'js> for ScriptHandle {
    const NAME: &'static str = "NativeHandle";

    type Mutable = Readable;

    fn class_id() -> &'static ClassId {
        static ID: ClassId = ClassId::new();
        &ID
    }

    fn prototype(ctx: &Ctx<'js>) -> rquickjs::Result<Option<Object<'js>>> {
        Ok(Some(Object::new(ctx.clone())?))
    }

    fn constructor(_ctx: &Ctx<'js>) -> rquickjs::Result<Option<Constructor<'js>>> {
        Ok(None)
    }
}

impl<'js> IntoJs<'js> for ScriptHandle {
    fn into_js(self, ctx: &Ctx<'js>) -> rquickjs::Result<Value<'js>> {
        Class::instance(ctx.clone(), self).into_js(ctx)
    }
}

fn parse_target(target: &str) -> ScriptValue {
    serde_json::from_str(target).unwrap_or(ScriptValue::Nil)
}

fn parse_args(args: &str, params: &[ArgType]) -> BindingResult<Vec<ScriptValue>> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(args)
        .map_err(|e| BindingError::Script(format!("malformed argument list: {e}")))?;
    raw.into_iter()
        .enumerate()
        .map(|(index, value)| {
            let found = match &value {
                serde_json::Value::Array(_) => "array",
                _ => "object",
            };
            serde_json::from_value::<ScriptValue>(value).map_err(|_| {
                BindingError::ArgumentTypeMismatch {
                    index,
                    expected: params.get(index).copied().unwrap_or(ArgType::Any),
                    found: found.to_string(),
                }
            })
        })
        .collect()
}

fn call_native(
    host: &SharedHost,
    class: i32,
    target: &str,
    method: i32,
    args: &str,
) -> BindingResult<Vec<ScriptValue>> {
    let mut host = host.lock();
    let class_id =
        u16::try_from(class).map_err(|_| BindingError::UnknownClass(format!("#{class}")))?;
    let descriptor = host.registry().class_by_id(class_id)?;
    let tag = descriptor.tag();
    let method_id = u16::try_from(method)
        .map(MethodId)
        .map_err(|_| BindingError::MethodNotFound {
            class: descriptor.name().to_string(),
            method: format!("#{method}"),
        })?;
    let params = descriptor
        .signature(method_id)
        .map(|sig| sig.params.clone())
        .unwrap_or_default();
    let args = parse_args(args, &params)?;
    host.dispatch_id(tag, &parse_target(target), method_id, &args)
}

fn describe_js_error(ctx: &Ctx<'_>, err: rquickjs::Error) -> BindingError {
    if let rquickjs::Error::Exception = err {
        let value = ctx.catch();
        if let Some(exception) = value.as_exception() {
            return BindingError::Script(exception.message().unwrap_or_default());
        }
        return BindingError::Script(format!("uncaught exception: {value:?}"));
    }
    BindingError::Script(err.to_string())
}

/// QuickJS runtime with the registered classes installed as globals.
pub struct JsBindingAdapter {
    runtime: Runtime,
    context: Context,
    host: Arc<SharedHost>,
}

impl JsBindingAdapter {
    pub fn new(host: BindingHost, config: &ScriptingConfig) -> BindingResult<Self> {
        let runtime = Runtime::new().map_err(|e| BindingError::Script(e.to_string()))?;
        runtime.set_memory_limit(config.memory_limit);
        runtime.set_max_stack_size(config.max_stack_size);
        let context = Context::full(&runtime).map_err(|e| BindingError::Script(e.to_string()))?;

        let adapter = Self {
            runtime,
            context,
            host: Arc::new(SharedHost::new(host)),
        };
        adapter.bind_native_api()?;
        Ok(adapter)
    }

    fn bind_native_api(&self) -> BindingResult<()> {
        self.context.with(|ctx| {
            let installed = (|| -> rquickjs::Result<()> {
                let native = Object::new(ctx.clone())?;

                // __native.classes() -> JSON envelope with the class table
                let host = Arc::clone(&self.host);
                native.set(
                    "classes",
                    Function::new(ctx.clone(), move || -> String {
                        let classes = host.lock().describe();
                        match serde_json::to_value(&classes) {
                            Ok(value) => format!(r#"{{"ok":{value}}}"#),
                            Err(e) => envelope(Err(BindingError::Script(e.to_string()))),
                        }
                    })?,
                )?;

                // __native.construct(tag) -> [handle]
                let host = Arc::clone(&self.host);
                native.set(
                    "construct",
                    Function::new(ctx.clone(), move |class: i32| -> String {
                        let result = u16::try_from(class)
                            .map_err(|_| BindingError::UnknownClass(format!("#{class}")))
                            .and_then(|id| host.lock().construct_by_id(id))
                            .map(|handle| vec![handle]);
                        envelope(result)
                    })?,
                )?;

                // __native.call(tag, handle, methodId, args) -> [results...]
                let host = Arc::clone(&self.host);
                native.set(
                    "call",
                    Function::new(
                        ctx.clone(),
                        move |class: i32, target: String, method: i32, args: String| -> String {
                            envelope(call_native(&host, class, &target, method, &args))
                        },
                    )?,
                )?;

                // __native.track(handle) -> companion released on collection
                let host = Arc::clone(&self.host);
                native.set(
                    "track",
                    Function::new(ctx.clone(), move |target: String| -> Option<ScriptHandle> {
                        match parse_target(&target) {
                            ScriptValue::Handle(id) => Some(ScriptHandle {
                                id,
                                host: Arc::clone(&host),
                            }),
                            _ => None,
                        }
                    })?,
                )?;

                // __native.release(handle) -> [released]
                let host = Arc::clone(&self.host);
                native.set(
                    "release",
                    Function::new(ctx.clone(), move |target: String| -> String {
                        let result = host
                            .lock()
                            .release(&parse_target(&target))
                            .map(|released| vec![ScriptValue::Bool(released)]);
                        envelope(result)
                    })?,
                )?;

                // __native.log(level, msg)
                native.set(
                    "log",
                    Function::new(ctx.clone(), |level: String, msg: String| {
                        match level.as_str() {
                            "error" => tracing::error!(target: "script", "{}", msg),
                            "warn" => tracing::warn!(target: "script", "{}", msg),
                            "debug" => tracing::debug!(target: "script", "{}", msg),
                            _ => tracing::info!(target: "script", "{}", msg),
                        }
                    })?,
                )?;

                ctx.globals().set("__native", native)?;
                ctx.eval::<(), _>(PRELUDE)
            })();
            installed.map_err(|e| describe_js_error(&ctx, e))
        })
    }

    /// Runs a script for its side effects.
    pub fn execute_script(&self, code: &str) -> BindingResult<()> {
        self.context.with(|ctx| {
            ctx.eval::<(), _>(code)
                .map_err(|e| describe_js_error(&ctx, e))
        })
    }

    /// Evaluates an expression in global scope and marshals its value back.
    /// Values without a script-value representation come back as an error.
    pub fn evaluate(&self, code: &str) -> BindingResult<ScriptValue> {
        let source = serde_json::to_string(code).map_err(|e| BindingError::Script(e.to_string()))?;
        let wrapped = format!("JSON.stringify((0, eval)({source}))");
        let json = self.context.with(|ctx| {
            ctx.eval::<Option<String>, _>(wrapped)
                .map_err(|e| describe_js_error(&ctx, e))
        })?;
        match json {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| BindingError::Script(format!("unsupported result {json}: {e}"))),
            None => Ok(ScriptValue::Nil),
        }
    }

    pub fn host(&self) -> Arc<SharedHost> {
        Arc::clone(&self.host)
    }

    /// Runs a full garbage collection; objects found unreachable release
    /// their native handles.
    pub fn collect_garbage(&self) -> usize {
        self.runtime.run_gc();
        let host = self.host.lock();
        host.live_handles()
    }

    pub fn live_handles(&self) -> usize {
        self.host.lock().live_handles()
    }

    /// Reclaims every handle script still holds.
    pub fn shutdown(&mut self) -> usize {
        self.host.lock().release_all()
    }
}

impl Drop for JsBindingAdapter {
    fn drop(&mut self) {
        let released = self.shutdown();
        if released > 0 {
            tracing::debug!(target: "bindings", released, "reclaimed script handles on shutdown");
        }
    }
}
