//! Native object handles and the generational table that owns them.
//!
//! A handle is the script-visible token for exactly one native instance.
//! The table replaces garbage-collector reclamation with explicit single-owner
//! release: a handle is released at most once, whether the request comes from
//! script, from host shutdown, or from the table going out of scope.

use super::value::ScriptValue;
use crate::core::error::{BindingError, BindingResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type tag attached to every handle at allocation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeTag {
    id: u16,
    name: &'static str,
}

impl TypeTag {
    pub const fn new(id: u16, name: &'static str) -> Self {
        Self { id, name }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Whether a handle frees its native instance on release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owning,
    Borrowing,
}

/// Identifier of a handle slot. Stale ids (released or reused slots) never
/// resolve to a live handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandleId {
    #[serde(rename = "__slot")]
    slot: u32,
    #[serde(rename = "__gen")]
    generation: u32,
}

impl HandleId {
    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.slot, self.generation)
    }
}

/// Hook run against an owned instance right before it is dropped.
pub type ReleaseHook = Arc<dyn Fn(&mut dyn Any) + Send + Sync>;

pub type SharedInstance = Arc<Mutex<dyn Any + Send>>;

enum Instance {
    Owned(Box<dyn Any + Send>),
    Borrowed(SharedInstance),
}

/// Script-visible handle wrapping one native instance.
pub struct NativeHandle {
    tag: TypeTag,
    instance: Option<Instance>,
    release_hook: Option<ReleaseHook>,
}

impl NativeHandle {
    /// Wraps an instance the handle owns and frees on release.
    pub fn owning<T: Any + Send>(tag: TypeTag, instance: T) -> Self {
        Self::owning_boxed(tag, Box::new(instance), None)
    }

    pub(crate) fn owning_boxed(
        tag: TypeTag,
        instance: Box<dyn Any + Send>,
        release_hook: Option<ReleaseHook>,
    ) -> Self {
        Self {
            tag,
            instance: Some(Instance::Owned(instance)),
            release_hook,
        }
    }

    /// Wraps an externally managed instance; release only drops the reference.
    pub fn borrowing(tag: TypeTag, instance: SharedInstance) -> Self {
        Self {
            tag,
            instance: Some(Instance::Borrowed(instance)),
            release_hook: None,
        }
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn ownership(&self) -> Option<Ownership> {
        match self.instance {
            Some(Instance::Owned(_)) => Some(Ownership::Owning),
            Some(Instance::Borrowed(_)) => Some(Ownership::Borrowing),
            None => None,
        }
    }

    pub fn is_released(&self) -> bool {
        self.instance.is_none()
    }

    /// Runs `f` against the native instance.
    pub fn with_instance<R>(
        &mut self,
        f: impl FnOnce(&mut dyn Any) -> BindingResult<R>,
    ) -> BindingResult<R> {
        match self.instance.as_mut() {
            Some(Instance::Owned(boxed)) => f(boxed.as_mut()),
            Some(Instance::Borrowed(shared)) => {
                let mut guard = shared.lock();
                f(&mut *guard)
            }
            None => Err(BindingError::NullHandle),
        }
    }

    /// Releases the native instance. Returns `false` when it was already gone.
    pub fn release(&mut self) -> bool {
        match self.instance.take() {
            Some(Instance::Owned(mut boxed)) => {
                if let Some(hook) = self.release_hook.take() {
                    hook(boxed.as_mut());
                }
                drop(boxed);
                tracing::trace!(target: "bindings", tag = %self.tag, "released owned instance");
                true
            }
            Some(Instance::Borrowed(shared)) => {
                drop(shared);
                tracing::trace!(target: "bindings", tag = %self.tag, "dropped borrowed instance");
                true
            }
            None => false,
        }
    }
}

impl Drop for NativeHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("tag", &self.tag)
            .field("ownership", &self.ownership())
            .finish()
    }
}

#[derive(Default)]
struct Slot {
    generation: u32,
    handle: Option<NativeHandle>,
}

/// Generational table of live handles.
#[derive(Default)]
pub struct HandleTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a handle and returns its id. The handle is fully typed before
    /// the id exists.
    pub fn insert(&mut self, handle: NativeHandle) -> HandleId {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let entry = &mut self.slots[slot as usize];
        entry.handle = Some(handle);
        self.live += 1;
        HandleId {
            slot,
            generation: entry.generation,
        }
    }

    fn lookup(&mut self, id: HandleId) -> Option<&mut NativeHandle> {
        self.slots
            .get_mut(id.slot as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.handle.as_mut())
    }

    /// Tag of a live handle.
    pub fn tag_of(&self, id: HandleId) -> Option<TypeTag> {
        self.slots
            .get(id.slot as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.handle.as_ref())
            .map(NativeHandle::tag)
    }

    /// Validates that `value` is a live handle of type `expected`.
    pub fn extract_typed(
        &mut self,
        value: &ScriptValue,
        expected: TypeTag,
    ) -> BindingResult<&mut NativeHandle> {
        let id = match value {
            ScriptValue::Handle(id) => *id,
            other => {
                return Err(BindingError::TypeMismatch {
                    expected: expected.name().to_string(),
                    found: other.type_name().to_string(),
                })
            }
        };
        let handle = self.lookup(id).ok_or(BindingError::NullHandle)?;
        if handle.tag() != expected {
            return Err(BindingError::TypeMismatch {
                expected: expected.name().to_string(),
                found: handle.tag().name().to_string(),
            });
        }
        if handle.is_released() {
            return Err(BindingError::NullHandle);
        }
        Ok(handle)
    }

    /// Releases the handle and frees its slot. Unknown or stale ids are a
    /// no-op, so repeated release requests are harmless.
    pub fn release(&mut self, id: HandleId) -> bool {
        let Some(slot) = self
            .slots
            .get_mut(id.slot as usize)
            .filter(|slot| slot.generation == id.generation)
        else {
            return false;
        };
        let Some(mut handle) = slot.handle.take() else {
            return false;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.slot);
        self.live -= 1;
        handle.release()
    }

    /// Reclaims every live handle, returning how many were released.
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;
        for index in 0..self.slots.len() {
            let slot = &mut self.slots[index];
            if let Some(mut handle) = slot.handle.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                if handle.release() {
                    released += 1;
                }
            }
        }
        self.live = 0;
        released
    }

    pub fn live(&self) -> usize {
        self.live
    }
}

impl Drop for HandleTable {
    fn drop(&mut self) {
        let released = self.release_all();
        if released > 0 {
            tracing::debug!(target: "bindings", released, "reclaimed handles on table drop");
        }
    }
}
