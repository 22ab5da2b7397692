//! Class registration: constructor, release hook and method table of one
//! native type.

use super::handle::{NativeHandle, ReleaseHook, TypeTag};
use super::value::{convert_arg, ArgType, FromScript, IntoReturn, ScriptValue};
use crate::core::error::{BindingError, BindingResult};
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Enumerated operation id: the index of a method in its class table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MethodId(pub u16);

/// Declared argument and return types of a method.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signature {
    pub params: Vec<ArgType>,
    pub returns: Vec<ArgType>,
}

/// Type-erased native callable bound to instances of `T`.
pub type NativeFn<T> = Box<dyn Fn(&mut T, &[ScriptValue]) -> BindingResult<Vec<ScriptValue>> + Send + Sync>;

pub type Constructor<T> = Box<dyn Fn() -> BindingResult<T> + Send + Sync>;

/// Anything that can be registered as a method of `T`.
///
/// Implemented for closures and function items taking `&mut T` followed by up
/// to six [`FromScript`] parameters. `Marker` is the plain function-pointer
/// shape of the method and only drives impl selection. All arguments are
/// converted before the native function runs.
pub trait IntoNativeMethod<T, Marker>: Send + Sync + 'static {
    fn signature() -> Signature;

    fn into_native(self) -> NativeFn<T>;
}

macro_rules! impl_into_native_method {
    ($($arg:ident $var:ident => $idx:tt),*) => {
        impl<T, F, R, $($arg,)*> IntoNativeMethod<T, fn($($arg),*) -> R> for F
        where
            T: 'static,
            F: Fn(&mut T, $($arg),*) -> R + Send + Sync + 'static,
            R: IntoReturn,
            $($arg: FromScript,)*
        {
            fn signature() -> Signature {
                Signature {
                    params: vec![$(<$arg as FromScript>::KIND),*],
                    returns: R::RETURNS.to_vec(),
                }
            }

            #[allow(unused_variables)]
            fn into_native(self) -> NativeFn<T> {
                Box::new(move |target: &mut T, args: &[ScriptValue]| {
                    $(let $var = convert_arg::<$arg>(args, $idx)?;)*
                    (self)(target, $($var),*).into_return()
                })
            }
        }
    };
}

impl_into_native_method!();
impl_into_native_method!(A0 a0 => 0);
impl_into_native_method!(A0 a0 => 0, A1 a1 => 1);
impl_into_native_method!(A0 a0 => 0, A1 a1 => 1, A2 a2 => 2);
impl_into_native_method!(A0 a0 => 0, A1 a1 => 1, A2 a2 => 2, A3 a3 => 3);
impl_into_native_method!(A0 a0 => 0, A1 a1 => 1, A2 a2 => 2, A3 a3 => 3, A4 a4 => 4);
impl_into_native_method!(A0 a0 => 0, A1 a1 => 1, A2 a2 => 2, A3 a3 => 3, A4 a4 => 4, A5 a5 => 5);

/// One entry of a class method table.
pub struct MethodEntry<T> {
    pub name: String,
    pub signature: Signature,
    callable: NativeFn<T>,
}

impl<T> MethodEntry<T> {
    pub fn call(&self, target: &mut T, args: &[ScriptValue]) -> BindingResult<Vec<ScriptValue>> {
        (self.callable)(target, args)
    }
}

/// Serializable description of a method, used by host adapters.
#[derive(Debug, Clone, Serialize)]
pub struct MethodInfo {
    pub name: String,
    pub id: MethodId,
    pub params: Vec<ArgType>,
    pub returns: Vec<ArgType>,
}

/// Serializable description of a registered class.
#[derive(Debug, Clone, Serialize)]
pub struct ClassInfo {
    pub name: String,
    pub tag: u16,
    pub type_name: String,
    pub methods: Vec<MethodInfo>,
}

/// Constructor, release hook and method table of one native type.
pub struct ClassDescriptor<T> {
    name: String,
    tag: TypeTag,
    constructor: Constructor<T>,
    methods: Vec<MethodEntry<T>>,
    index: HashMap<String, MethodId>,
    release_hook: Option<ReleaseHook>,
    finalized: bool,
}

impl<T: Any + Send> ClassDescriptor<T> {
    pub fn new(
        name: impl Into<String>,
        tag: TypeTag,
        constructor: impl Fn() -> BindingResult<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            tag,
            constructor: Box::new(constructor),
            methods: Vec::new(),
            index: HashMap::new(),
            release_hook: None,
            finalized: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn ensure_open(&self) -> BindingResult<()> {
        if self.finalized {
            Err(BindingError::ClassFinalized(self.name.clone()))
        } else {
            Ok(())
        }
    }

    /// Appends a method to the table. Names must be unique within the class.
    pub fn add_method<Marker, M>(&mut self, name: &str, method: M) -> BindingResult<MethodId>
    where
        M: IntoNativeMethod<T, Marker>,
    {
        self.ensure_open()?;
        if self.index.contains_key(name) {
            return Err(BindingError::DuplicateMethod {
                class: self.name.clone(),
                method: name.to_string(),
            });
        }
        let id = MethodId(self.methods.len() as u16);
        self.methods.push(MethodEntry {
            name: name.to_string(),
            signature: M::signature(),
            callable: method.into_native(),
        });
        self.index.insert(name.to_string(), id);
        Ok(id)
    }

    /// Installs the hook run on the native instance before an owning handle
    /// drops it.
    pub fn set_release_hook(&mut self, hook: impl Fn(&mut T) + Send + Sync + 'static) -> BindingResult<()> {
        self.ensure_open()?;
        self.release_hook = Some(Arc::new(move |instance: &mut dyn Any| {
            if let Some(target) = instance.downcast_mut::<T>() {
                hook(target);
            }
        }));
        Ok(())
    }

    /// Closes registration. The class shape is immutable afterwards.
    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    pub fn resolve(&self, name: &str) -> Option<MethodId> {
        self.index.get(name).copied()
    }

    pub fn method(&self, id: MethodId) -> Option<&MethodEntry<T>> {
        self.methods.get(id.0 as usize)
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodEntry<T>> {
        self.methods.iter()
    }
}

/// Object-safe view of a finalized class, stored by the registry.
pub trait NativeClass: Send + Sync {
    fn name(&self) -> &str;

    fn tag(&self) -> TypeTag;

    /// Allocates a native instance and wraps it in an owning handle.
    fn construct(&self) -> BindingResult<NativeHandle>;

    fn resolve(&self, name: &str) -> Option<MethodId>;

    fn method_name(&self, id: MethodId) -> Option<&str>;

    fn signature(&self, id: MethodId) -> Option<&Signature>;

    fn invoke(
        &self,
        id: MethodId,
        instance: &mut dyn Any,
        args: &[ScriptValue],
    ) -> BindingResult<Vec<ScriptValue>>;

    fn info(&self) -> ClassInfo;
}

impl<T: Any + Send> NativeClass for ClassDescriptor<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn tag(&self) -> TypeTag {
        self.tag
    }

    fn construct(&self) -> BindingResult<NativeHandle> {
        let instance = (self.constructor)()?;
        Ok(NativeHandle::owning_boxed(
            self.tag,
            Box::new(instance),
            self.release_hook.clone(),
        ))
    }

    fn resolve(&self, name: &str) -> Option<MethodId> {
        ClassDescriptor::resolve(self, name)
    }

    fn method_name(&self, id: MethodId) -> Option<&str> {
        self.method(id).map(|entry| entry.name.as_str())
    }

    fn signature(&self, id: MethodId) -> Option<&Signature> {
        self.method(id).map(|entry| &entry.signature)
    }

    fn invoke(
        &self,
        id: MethodId,
        instance: &mut dyn Any,
        args: &[ScriptValue],
    ) -> BindingResult<Vec<ScriptValue>> {
        let entry = self.method(id).ok_or_else(|| BindingError::MethodNotFound {
            class: self.name.clone(),
            method: format!("#{}", id.0),
        })?;
        let target = instance
            .downcast_mut::<T>()
            .ok_or_else(|| BindingError::TypeMismatch {
                expected: self.tag.name().to_string(),
                found: "foreign instance".to_string(),
            })?;
        entry.call(target, args)
    }

    fn info(&self) -> ClassInfo {
        ClassInfo {
            name: self.name.clone(),
            tag: self.tag.id(),
            type_name: self.tag.name().to_string(),
            methods: self
                .methods
                .iter()
                .enumerate()
                .map(|(i, entry)| MethodInfo {
                    name: entry.name.clone(),
                    id: MethodId(i as u16),
                    params: entry.signature.params.clone(),
                    returns: entry.signature.returns.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POINT: TypeTag = TypeTag::new(3, "Point");

    #[derive(Default)]
    struct Point {
        x: i32,
        y: i32,
    }

    impl Point {
        fn reset(&mut self) {
            self.x = 0;
            self.y = 0;
        }
    }

    fn point_class() -> ClassDescriptor<Point> {
        ClassDescriptor::new("point", POINT, || Ok(Point::default()))
    }

    #[test]
    fn test_signature_from_closure() {
        let mut class = point_class();
        let id = class
            .add_method("moveTo", |p: &mut Point, x: i32, y: i32| {
                p.x = x;
                p.y = y;
            })
            .unwrap();
        let id2 = class
            .add_method("length", |p: &mut Point| ((p.x * p.x + p.y * p.y) as f64).sqrt())
            .unwrap();

        assert_eq!(id, MethodId(0));
        assert_eq!(id2, MethodId(1));
        assert_eq!(
            class.method(id).unwrap().signature,
            Signature {
                params: vec![ArgType::Int, ArgType::Int],
                returns: vec![],
            }
        );
        assert_eq!(class.method(id2).unwrap().signature.returns, vec![ArgType::Float]);
    }

    #[test]
    fn test_duplicate_method_rejected() {
        let mut class = point_class();
        class.add_method("reset", Point::reset).unwrap();
        let err = class.add_method("reset", Point::reset).unwrap_err();
        assert!(matches!(err, BindingError::DuplicateMethod { .. }));
    }

    #[test]
    fn test_finalized_class_is_closed() {
        let mut class = point_class();
        class.add_method("reset", Point::reset).unwrap();
        class.finalize();

        let err = class.add_method("other", Point::reset).unwrap_err();
        assert_eq!(err, BindingError::ClassFinalized("point".to_string()));
        assert!(class.set_release_hook(Point::reset).is_err());
        assert_eq!(class.resolve("reset"), Some(MethodId(0)));
    }

    #[test]
    fn test_argument_mismatch_skips_native_call() {
        let mut class = point_class();
        let id = class
            .add_method("moveTo", |p: &mut Point, x: i32, y: i32| {
                p.x = x;
                p.y = y;
            })
            .unwrap();

        let mut point = Point { x: 1, y: 1 };
        let err = class
            .invoke(
                id,
                &mut point,
                &[ScriptValue::Int(5), ScriptValue::String("up".into())],
            )
            .unwrap_err();
        assert_eq!(
            err,
            BindingError::ArgumentTypeMismatch {
                index: 1,
                expected: ArgType::Int,
                found: "string".to_string(),
            }
        );
        assert_eq!((point.x, point.y), (1, 1));
    }

    #[test]
    fn test_multiple_returns_in_declared_order() {
        let mut class = point_class();
        let id = class
            .add_method("position", |p: &mut Point| (p.x, p.y))
            .unwrap();

        let mut point = Point { x: 4, y: -2 };
        let values = class.invoke(id, &mut point, &[]).unwrap();
        assert_eq!(values, vec![ScriptValue::Int(4), ScriptValue::Int(-2)]);
    }
}
