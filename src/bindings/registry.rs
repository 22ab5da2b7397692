//! Process-wide class table, populated once and immutable afterwards.

use super::class::{ClassDescriptor, ClassInfo, IntoNativeMethod, NativeClass};
use super::handle::TypeTag;
use crate::core::error::{BindingError, BindingResult};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Collects finalized classes before the registry is frozen.
#[derive(Default)]
pub struct ClassRegistryBuilder {
    classes: Vec<Box<dyn NativeClass>>,
}

impl ClassRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts registering a class under `name` with the given type tag.
    /// `constructor` allocates the native instance for every script-side
    /// construction.
    pub fn register_class<T>(
        &mut self,
        name: &str,
        tag: TypeTag,
        constructor: impl Fn() -> BindingResult<T> + Send + Sync + 'static,
    ) -> BindingResult<ClassBuilder<'_, T>>
    where
        T: Any + Send,
    {
        let clash = self
            .classes
            .iter()
            .any(|class| class.name() == name || class.tag().id() == tag.id());
        if clash {
            return Err(BindingError::DuplicateClass(name.to_string()));
        }
        Ok(ClassBuilder {
            registry: self,
            descriptor: ClassDescriptor::new(name, tag, constructor),
        })
    }

    /// Adds an already finalized descriptor.
    pub fn add_class<T: Any + Send>(&mut self, descriptor: ClassDescriptor<T>) -> BindingResult<()> {
        if !descriptor.is_finalized() {
            return Err(BindingError::Script(format!(
                "class '{}' must be finalized before registration",
                descriptor.name()
            )));
        }
        let clash = self.classes.iter().any(|class| {
            class.name() == descriptor.name() || class.tag().id() == descriptor.tag().id()
        });
        if clash {
            return Err(BindingError::DuplicateClass(descriptor.name().to_string()));
        }
        tracing::debug!(
            target: "bindings",
            class = descriptor.name(),
            tag = %descriptor.tag(),
            methods = descriptor.methods().count(),
            "registered class"
        );
        self.classes.push(Box::new(descriptor));
        Ok(())
    }

    pub fn build(self) -> Arc<ClassRegistry> {
        let by_tag = self
            .classes
            .iter()
            .enumerate()
            .map(|(i, class)| (class.tag().id(), i))
            .collect();
        let by_name = self
            .classes
            .iter()
            .enumerate()
            .map(|(i, class)| (class.name().to_string(), i))
            .collect();
        Arc::new(ClassRegistry {
            classes: self.classes,
            by_tag,
            by_name,
        })
    }
}

/// Fluent registration of one class. Dropping the builder without calling
/// [`ClassBuilder::finalize`] discards the class.
pub struct ClassBuilder<'a, T> {
    registry: &'a mut ClassRegistryBuilder,
    descriptor: ClassDescriptor<T>,
}

impl<'a, T: Any + Send> ClassBuilder<'a, T> {
    pub fn method<Marker, M>(mut self, name: &str, method: M) -> BindingResult<Self>
    where
        M: IntoNativeMethod<T, Marker>,
    {
        self.descriptor.add_method(name, method)?;
        Ok(self)
    }

    pub fn on_release(mut self, hook: impl Fn(&mut T) + Send + Sync + 'static) -> BindingResult<Self> {
        self.descriptor.set_release_hook(hook)?;
        Ok(self)
    }

    /// Closes the class and hands it to the registry.
    pub fn finalize(mut self) -> BindingResult<()> {
        self.descriptor.finalize();
        self.registry.add_class(self.descriptor)
    }
}

/// Immutable table of registered classes indexed by type tag.
pub struct ClassRegistry {
    classes: Vec<Box<dyn NativeClass>>,
    by_tag: HashMap<u16, usize>,
    by_name: HashMap<String, usize>,
}

impl ClassRegistry {
    pub fn builder() -> ClassRegistryBuilder {
        ClassRegistryBuilder::new()
    }

    pub fn class(&self, tag: TypeTag) -> BindingResult<&dyn NativeClass> {
        self.by_tag
            .get(&tag.id())
            .map(|&i| self.classes[i].as_ref())
            .ok_or_else(|| BindingError::UnknownClass(tag.name().to_string()))
    }

    pub fn class_by_id(&self, id: u16) -> BindingResult<&dyn NativeClass> {
        self.by_tag
            .get(&id)
            .map(|&i| self.classes[i].as_ref())
            .ok_or_else(|| BindingError::UnknownClass(format!("#{id}")))
    }

    pub fn by_name(&self, name: &str) -> BindingResult<&dyn NativeClass> {
        self.by_name
            .get(name)
            .map(|&i| self.classes[i].as_ref())
            .ok_or_else(|| BindingError::UnknownClass(name.to_string()))
    }

    pub fn describe(&self) -> Vec<ClassInfo> {
        self.classes.iter().map(|class| class.info()).collect()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER: TypeTag = TypeTag::new(1, "Counter");

    #[derive(Default)]
    struct Counter(i64);

    fn registry() -> Arc<ClassRegistry> {
        let mut builder = ClassRegistry::builder();
        builder
            .register_class("counter", COUNTER, || Ok(Counter::default()))
            .unwrap()
            .method("add", |c: &mut Counter, n: i64| c.0 += n)
            .unwrap()
            .method("get", |c: &mut Counter| c.0)
            .unwrap()
            .finalize()
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_lookup_by_tag_and_name() {
        let registry = registry();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.class(COUNTER).unwrap().name(), "counter");
        assert_eq!(registry.by_name("counter").unwrap().tag(), COUNTER);
        assert!(registry.by_name("missing").is_err());
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let mut builder = ClassRegistry::builder();
        builder
            .register_class("counter", COUNTER, || Ok(Counter::default()))
            .unwrap()
            .finalize()
            .unwrap();
        let err = builder
            .register_class("counter", TypeTag::new(2, "Other"), || Ok(Counter::default()))
            .err()
            .unwrap();
        assert_eq!(err, BindingError::DuplicateClass("counter".to_string()));
    }

    #[test]
    fn test_describe_lists_methods_in_order() {
        let info = registry().describe();
        let names: Vec<_> = info[0].methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["add", "get"]);
        assert_eq!(info[0].tag, 1);
    }
}
