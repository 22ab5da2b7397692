//! Binding host: the registry plus the handles created from it.

use super::class::{ClassInfo, MethodId};
use super::dispatch::Dispatcher;
use super::handle::{HandleId, HandleTable, NativeHandle, SharedInstance, TypeTag};
use super::registry::ClassRegistry;
use super::value::ScriptValue;
use crate::core::error::{BindingError, BindingResult};
use std::sync::Arc;

/// Owns every handle created by script and the registry they were built from.
///
/// Dropping the host reclaims all handles that script never released.
pub struct BindingHost {
    registry: Arc<ClassRegistry>,
    handles: HandleTable,
}

impl BindingHost {
    pub fn new(registry: Arc<ClassRegistry>) -> Self {
        Self {
            registry,
            handles: HandleTable::new(),
        }
    }

    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    /// Runs the registered constructor of `tag` and returns the new handle
    /// as a script value.
    pub fn construct(&mut self, tag: TypeTag) -> BindingResult<ScriptValue> {
        let class = self.registry.class(tag)?;
        let handle = class.construct()?;
        let id = self.handles.insert(handle);
        tracing::debug!(target: "bindings", class = class.name(), handle = %id, "constructed");
        Ok(ScriptValue::Handle(id))
    }

    pub fn construct_by_name(&mut self, name: &str) -> BindingResult<ScriptValue> {
        let tag = self.registry.by_name(name)?.tag();
        self.construct(tag)
    }

    pub fn construct_by_id(&mut self, id: u16) -> BindingResult<ScriptValue> {
        let tag = self.registry.class_by_id(id)?.tag();
        self.construct(tag)
    }

    /// Exposes an externally owned instance to script without transferring
    /// ownership.
    pub fn adopt_borrowed(&mut self, tag: TypeTag, instance: SharedInstance) -> BindingResult<ScriptValue> {
        self.registry.class(tag)?;
        Ok(ScriptValue::Handle(
            self.handles.insert(NativeHandle::borrowing(tag, instance)),
        ))
    }

    pub fn dispatch(
        &mut self,
        class: TypeTag,
        target: &ScriptValue,
        method: &str,
        args: &[ScriptValue],
    ) -> BindingResult<Vec<ScriptValue>> {
        Dispatcher::new(&self.registry, &mut self.handles).dispatch(class, target, method, args)
    }

    pub fn dispatch_id(
        &mut self,
        class: TypeTag,
        target: &ScriptValue,
        id: MethodId,
        args: &[ScriptValue],
    ) -> BindingResult<Vec<ScriptValue>> {
        Dispatcher::new(&self.registry, &mut self.handles).dispatch_id(class, target, id, args)
    }

    /// Calls a method on whatever class the handle belongs to.
    pub fn call(
        &mut self,
        target: &ScriptValue,
        method: &str,
        args: &[ScriptValue],
    ) -> BindingResult<Vec<ScriptValue>> {
        let tag = self.tag_of(target)?;
        self.dispatch(tag, target, method, args)
    }

    fn tag_of(&self, target: &ScriptValue) -> BindingResult<TypeTag> {
        match target {
            ScriptValue::Handle(id) => self.handles.tag_of(*id).ok_or(BindingError::NullHandle),
            other => Err(BindingError::TypeMismatch {
                expected: "handle".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    /// Releases the native object behind `target`. Repeated requests are
    /// no-ops; non-handle values are rejected.
    pub fn release(&mut self, target: &ScriptValue) -> BindingResult<bool> {
        match target {
            ScriptValue::Handle(id) => Ok(self.release_id(*id)),
            other => Err(BindingError::TypeMismatch {
                expected: "handle".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    pub fn release_id(&mut self, id: HandleId) -> bool {
        let released = self.handles.release(id);
        if released {
            tracing::debug!(target: "bindings", handle = %id, "released");
        }
        released
    }

    /// Reclaims every live handle.
    pub fn release_all(&mut self) -> usize {
        let released = self.handles.release_all();
        tracing::debug!(target: "bindings", released, "released all handles");
        released
    }

    pub fn live_handles(&self) -> usize {
        self.handles.live()
    }

    pub fn describe(&self) -> Vec<ClassInfo> {
        self.registry.describe()
    }
}
