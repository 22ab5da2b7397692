//! Method dispatch from script calls into native instances.

use super::class::MethodId;
use super::handle::{HandleTable, TypeTag};
use super::registry::ClassRegistry;
use super::value::ScriptValue;
use crate::core::error::{BindingError, BindingResult};

/// Resolves script calls against the registry and invokes them on the
/// handles stored in a table.
pub struct Dispatcher<'a> {
    registry: &'a ClassRegistry,
    handles: &'a mut HandleTable,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a ClassRegistry, handles: &'a mut HandleTable) -> Self {
        Self { registry, handles }
    }

    /// Calls `method` by name on `target`, which must be a handle of `class`.
    pub fn dispatch(
        &mut self,
        class: TypeTag,
        target: &ScriptValue,
        method: &str,
        args: &[ScriptValue],
    ) -> BindingResult<Vec<ScriptValue>> {
        let descriptor = self.registry.class(class)?;
        let id = descriptor
            .resolve(method)
            .ok_or_else(|| BindingError::MethodNotFound {
                class: descriptor.name().to_string(),
                method: method.to_string(),
            })?;
        self.dispatch_id(class, target, id, args)
    }

    /// Calls a method by its pre-resolved id.
    ///
    /// Order of checks: method id, handle type, handle liveness, then each
    /// argument left to right. Native code only runs once all of them pass.
    pub fn dispatch_id(
        &mut self,
        class: TypeTag,
        target: &ScriptValue,
        id: MethodId,
        args: &[ScriptValue],
    ) -> BindingResult<Vec<ScriptValue>> {
        let descriptor = self.registry.class(class)?;
        let name = descriptor
            .method_name(id)
            .ok_or_else(|| BindingError::MethodNotFound {
                class: descriptor.name().to_string(),
                method: format!("#{}", id.0),
            })?;
        let handle = self.handles.extract_typed(target, class)?;

        tracing::trace!(target: "bindings", class = descriptor.name(), method = name, argc = args.len(), "dispatch");
        handle.with_instance(|instance| descriptor.invoke(id, instance, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::handle::NativeHandle;
    use crate::bindings::value::ArgType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const ADDER: TypeTag = TypeTag::new(1, "Adder");
    const OTHER: TypeTag = TypeTag::new(2, "Other");

    struct Adder {
        total: i64,
        calls: Arc<AtomicUsize>,
    }

    fn setup(calls: Arc<AtomicUsize>) -> Arc<ClassRegistry> {
        let mut builder = ClassRegistry::builder();
        let ctor_calls = calls.clone();
        builder
            .register_class("adder", ADDER, move || {
                Ok(Adder {
                    total: 0,
                    calls: ctor_calls.clone(),
                })
            })
            .unwrap()
            .method("add", |a: &mut Adder, n: i64| {
                a.calls.fetch_add(1, Ordering::SeqCst);
                a.total += n;
                a.total
            })
            .unwrap()
            .method("total", |a: &mut Adder| a.total)
            .unwrap()
            .finalize()
            .unwrap();
        builder
            .register_class("other", OTHER, || Ok(0u8))
            .unwrap()
            .finalize()
            .unwrap();
        builder.build()
    }

    fn construct(registry: &ClassRegistry, table: &mut HandleTable, tag: TypeTag) -> ScriptValue {
        let handle = registry.class(tag).unwrap().construct().unwrap();
        ScriptValue::Handle(table.insert(handle))
    }

    #[test]
    fn test_dispatch_by_name() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = setup(calls.clone());
        let mut table = HandleTable::new();
        let adder = construct(&registry, &mut table, ADDER);

        let mut dispatcher = Dispatcher::new(&registry, &mut table);
        dispatcher
            .dispatch(ADDER, &adder, "add", &[ScriptValue::Int(2)])
            .unwrap();
        let result = dispatcher
            .dispatch(ADDER, &adder, "add", &[ScriptValue::Float(3.0)])
            .unwrap();
        assert_eq!(result, vec![ScriptValue::Int(5)]);
        assert_eq!(
            dispatcher.dispatch(ADDER, &adder, "total", &[]).unwrap(),
            vec![ScriptValue::Int(5)]
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unknown_method() {
        let registry = setup(Arc::new(AtomicUsize::new(0)));
        let mut table = HandleTable::new();
        let adder = construct(&registry, &mut table, ADDER);

        let err = Dispatcher::new(&registry, &mut table)
            .dispatch(ADDER, &adder, "subtract", &[])
            .unwrap_err();
        assert_eq!(err.kind(), "MethodNotFound");
    }

    #[test]
    fn test_wrong_handle_type_runs_no_native_code() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = setup(calls.clone());
        let mut table = HandleTable::new();
        let other = construct(&registry, &mut table, OTHER);

        let err = Dispatcher::new(&registry, &mut table)
            .dispatch(ADDER, &other, "add", &[ScriptValue::Int(1)])
            .unwrap_err();
        assert_eq!(
            err,
            BindingError::TypeMismatch {
                expected: "Adder".to_string(),
                found: "Other".to_string(),
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_released_handle_runs_no_native_code() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = setup(calls.clone());
        let mut table = HandleTable::new();
        let adder = construct(&registry, &mut table, ADDER);
        if let ScriptValue::Handle(id) = adder {
            table.release(id);
        }

        let err = Dispatcher::new(&registry, &mut table)
            .dispatch(ADDER, &adder, "add", &[ScriptValue::Int(1)])
            .unwrap_err();
        assert_eq!(err, BindingError::NullHandle);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_argument_mismatch_reports_index() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = setup(calls.clone());
        let mut table = HandleTable::new();
        let adder = construct(&registry, &mut table, ADDER);

        let err = Dispatcher::new(&registry, &mut table)
            .dispatch(ADDER, &adder, "add", &[ScriptValue::Bool(true)])
            .unwrap_err();
        assert_eq!(
            err,
            BindingError::ArgumentTypeMismatch {
                index: 0,
                expected: ArgType::Int,
                found: "boolean".to_string(),
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_borrowed_instance_dispatch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = setup(calls.clone());
        let shared = Arc::new(parking_lot::Mutex::new(Adder {
            total: 10,
            calls: calls.clone(),
        }));
        let mut table = HandleTable::new();
        let id = table.insert(NativeHandle::borrowing(ADDER, shared.clone()));

        Dispatcher::new(&registry, &mut table)
            .dispatch(ADDER, &ScriptValue::Handle(id), "add", &[ScriptValue::Int(1)])
            .unwrap();
        table.release(id);
        assert_eq!(shared.lock().total, 11);
    }
}
