//! Host objects and their property providers.
//!
//! Expressions reach into application data only through members a
//! [`TypeProvider`] registered for the value's type. There is no
//! reflection: a member the provider does not list is a resolution miss.
//!
//! ```ignore
//! let user = TypeProvider::<User>::new("User")
//!     .field("name", |u| Value::string(&u.name))
//!     .method("greet", 1, |u, args| Ok(format!("{} {}", args[0], u.name).into()))
//!     .build();
//! let value = Value::object(User::default(), &user);
//! ```

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::errors::host_error;
use crate::{EvalResult, Value};

type AnyRef<'a> = &'a (dyn Any + Send + Sync);

pub(crate) type FieldFn = Arc<dyn Fn(AnyRef<'_>) -> Option<Value> + Send + Sync>;
pub(crate) type MethodFn = Arc<dyn Fn(AnyRef<'_>, &[Value]) -> EvalResult + Send + Sync>;
pub(crate) type StaticFieldFn = Arc<dyn Fn() -> Value + Send + Sync>;
pub(crate) type StaticMethodFn = Arc<dyn Fn(&[Value]) -> EvalResult + Send + Sync>;
type LookupFn = Arc<dyn Fn(AnyRef<'_>, &str) -> Option<Value> + Send + Sync>;
type IterateFn = Arc<dyn Fn(AnyRef<'_>) -> Option<Vec<Value>> + Send + Sync>;
type DisplayFn = Arc<dyn Fn(AnyRef<'_>) -> Option<String> + Send + Sync>;

/// Type-erased member table of one host type.
///
/// Also the runtime value of a type token (`Value::Type`), whose members
/// are the static ones.
pub struct HostType {
    /// Unique per built provider, never reused.
    id: u64,
    name: Box<str>,
    fields: FxHashMap<Box<str>, FieldFn>,
    methods: FxHashMap<(Box<str>, usize), MethodFn>,
    static_fields: FxHashMap<Box<str>, StaticFieldFn>,
    static_methods: FxHashMap<(Box<str>, usize), StaticMethodFn>,
    lookup: Option<LookupFn>,
    iterate: Option<IterateFn>,
    display: Option<DisplayFn>,
}

impl HostType {
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether property access goes through a key lookup instead of fields.
    #[inline]
    pub fn is_map_like(&self) -> bool {
        self.lookup.is_some()
    }

    pub(crate) fn field(&self, name: &str) -> Option<FieldFn> {
        self.fields.get(name).cloned()
    }

    pub(crate) fn method(&self, name: &str, arity: usize) -> Option<MethodFn> {
        self.methods.get(&(name.into(), arity)).cloned()
    }

    pub(crate) fn static_field(&self, name: &str) -> Option<StaticFieldFn> {
        self.static_fields.get(name).cloned()
    }

    pub(crate) fn static_method(&self, name: &str, arity: usize) -> Option<StaticMethodFn> {
        self.static_methods.get(&(name.into(), arity)).cloned()
    }

    pub(crate) fn lookup(&self, object: &HostObject, key: &str) -> Option<Value> {
        self.lookup.as_ref().and_then(|lookup| lookup(object.inner(), key))
    }

    pub(crate) fn iterate(&self, object: &HostObject) -> Option<Vec<Value>> {
        self.iterate.as_ref().and_then(|iterate| iterate(object.inner()))
    }

    pub(crate) fn display(&self, object: &HostObject) -> Option<String> {
        self.display.as_ref().and_then(|display| display(object.inner()))
    }
}

impl fmt::Debug for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostType")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Builder registering the members of host type `T`.
pub struct TypeProvider<T> {
    ty: HostType,
    marker: PhantomData<fn(&T)>,
}

impl<T: Any + Send + Sync> TypeProvider<T> {
    pub fn new(name: &str) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        TypeProvider {
            ty: HostType {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                name: name.into(),
                fields: FxHashMap::default(),
                methods: FxHashMap::default(),
                static_fields: FxHashMap::default(),
                static_methods: FxHashMap::default(),
                lookup: None,
                iterate: None,
                display: None,
            },
            marker: PhantomData,
        }
    }

    /// Readable as `value.name`.
    #[must_use]
    pub fn field<F>(mut self, name: &str, get: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let erased: FieldFn = Arc::new(move |any: AnyRef<'_>| any.downcast_ref::<T>().map(&get));
        self.ty.fields.insert(name.into(), erased);
        self
    }

    /// Callable as `value.name(a, b, ...)` with exactly `arity` arguments.
    #[must_use]
    pub fn method<F>(mut self, name: &str, arity: usize, call: F) -> Self
    where
        F: Fn(&T, &[Value]) -> EvalResult + Send + Sync + 'static,
    {
        let type_name = self.ty.name.clone();
        let erased: MethodFn = Arc::new(move |any: AnyRef<'_>, args: &[Value]| {
            match any.downcast_ref::<T>() {
                Some(receiver) => call(receiver, args),
                None => Err(host_error(format!("receiver is not a {type_name}"))),
            }
        });
        self.ty.methods.insert((name.into(), arity), erased);
        self
    }

    /// Readable on the type token as `Type.name`.
    #[must_use]
    pub fn static_field<F>(mut self, name: &str, get: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.ty.static_fields.insert(name.into(), Arc::new(get));
        self
    }

    #[must_use]
    pub fn static_method<F>(mut self, name: &str, arity: usize, call: F) -> Self
    where
        F: Fn(&[Value]) -> EvalResult + Send + Sync + 'static,
    {
        self.ty.static_methods.insert((name.into(), arity), Arc::new(call));
        self
    }

    /// Make values of this type map-like: property access calls `lookup`
    /// with the property name and registered fields are not consulted.
    #[must_use]
    pub fn lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&T, &str) -> Option<Value> + Send + Sync + 'static,
    {
        self.ty.lookup = Some(Arc::new(move |any: AnyRef<'_>, key: &str| {
            any.downcast_ref::<T>().and_then(|value| lookup(value, key))
        }));
        self
    }

    /// Elements produced when a value of this type is streamed.
    #[must_use]
    pub fn iterable<F>(mut self, items: F) -> Self
    where
        F: Fn(&T) -> Vec<Value> + Send + Sync + 'static,
    {
        self.ty.iterate = Some(Arc::new(move |any: AnyRef<'_>| {
            any.downcast_ref::<T>().map(&items)
        }));
        self
    }

    #[must_use]
    pub fn display<F>(mut self, render: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.ty.display = Some(Arc::new(move |any: AnyRef<'_>| {
            any.downcast_ref::<T>().map(&render)
        }));
        self
    }

    pub fn build(self) -> Arc<HostType> {
        Arc::new(self.ty)
    }
}

/// A host value paired with the type describing its members.
#[derive(Clone)]
pub struct HostObject {
    value: Arc<dyn Any + Send + Sync>,
    ty: Arc<HostType>,
}

impl HostObject {
    pub fn new<T: Any + Send + Sync>(value: T, ty: Arc<HostType>) -> Self {
        HostObject {
            value: Arc::new(value),
            ty,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.value).downcast_ref::<T>()
    }

    #[inline]
    pub fn host_type(&self) -> &Arc<HostType> {
        &self.ty
    }

    #[inline]
    pub(crate) fn inner(&self) -> AnyRef<'_> {
        &*self.value
    }

    /// Identity of the wrapped value.
    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.value).cast::<()>() as usize
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostObject({})", self.ty.name)
    }
}
