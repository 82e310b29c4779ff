//! Interned identifiers and their resolver caches.
//!
//! Every occurrence of one (name, arity) pair in a template file shares a
//! single [`Identifier`]. The first time it is evaluated against a receiver
//! of some shape, the member is looked up and the chosen strategy
//! ([`Resolver`]) is cached under that shape; later evaluations against the
//! same shape skip the lookup. Entries are never invalidated.
//!
//! Resolution order:
//! 1. property on a map, or on a map-like host object: key lookup
//! 2. type token: static field (property) or static method (call)
//! 3. host object: registered field (property) or method by arity (call)
//! 4. builtin value: builtin method (a property reads the zero-argument
//!    method of the same name)

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use stirrup_ir::IdentKey;

use crate::builtins::{self, BuiltinFn};
use crate::host::{FieldFn, MethodFn, StaticFieldFn, StaticMethodFn};
use crate::{EvalResult, Value};

/// Runtime shape of a value, as far as member resolution cares.
///
/// Host objects and type tokens are distinguished by their provider's id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Null,
    Bool,
    Int,
    Double,
    Str,
    List,
    Map,
    Set,
    Range,
    Stream,
    Regex,
    Object(u64),
    Type(u64),
}

impl Shape {
    pub fn of(value: &Value) -> Shape {
        match value {
            Value::Null => Shape::Null,
            Value::Bool(_) => Shape::Bool,
            Value::Int(_) => Shape::Int,
            Value::Double(_) => Shape::Double,
            Value::Str(_) => Shape::Str,
            Value::List(_) => Shape::List,
            Value::Map(_) => Shape::Map,
            Value::Set(_) => Shape::Set,
            Value::Range(_) => Shape::Range,
            Value::Stream(_) => Shape::Stream,
            Value::Regex(_) => Shape::Regex,
            Value::Object(object) => Shape::Object(object.host_type().id()),
            Value::Type(ty) => Shape::Type(ty.id()),
        }
    }
}

/// Resolver cache key: receiver shape plus argument shapes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShapeKey {
    receiver: Shape,
    args: SmallVec<[Shape; 4]>,
}

impl ShapeKey {
    pub fn new(receiver: &Value, args: &[Value]) -> Self {
        ShapeKey {
            receiver: Shape::of(receiver),
            args: args.iter().map(Shape::of).collect(),
        }
    }
}

/// The strategy chosen for one receiver shape.
#[derive(Clone)]
pub(crate) enum Resolver {
    MapLookup,
    HostLookup,
    Builtin(BuiltinFn),
    Field(FieldFn),
    Method(MethodFn),
    StaticField(StaticFieldFn),
    StaticMethod(StaticMethodFn),
    Missing,
}

/// Which kind of strategy an identifier resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolverKind {
    MapLookup,
    Builtin,
    Field,
    Method,
    StaticField,
    StaticMethod,
    Missing,
}

impl Resolver {
    fn kind(&self) -> ResolverKind {
        match self {
            Resolver::MapLookup | Resolver::HostLookup => ResolverKind::MapLookup,
            Resolver::Builtin(_) => ResolverKind::Builtin,
            Resolver::Field(_) => ResolverKind::Field,
            Resolver::Method(_) => ResolverKind::Method,
            Resolver::StaticField(_) => ResolverKind::StaticField,
            Resolver::StaticMethod(_) => ResolverKind::StaticMethod,
            Resolver::Missing => ResolverKind::Missing,
        }
    }
}

pub struct Identifier {
    key: IdentKey,
    /// The name as a map key.
    map_key: Value,
    resolvers: DashMap<ShapeKey, Resolver, FxBuildHasher>,
}

impl Identifier {
    pub fn new(key: IdentKey) -> Self {
        Identifier {
            map_key: Value::string(&key.name),
            key,
            resolvers: DashMap::with_hasher(FxBuildHasher),
        }
    }

    #[inline]
    pub fn key(&self) -> &IdentKey {
        &self.key
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// Number of receiver shapes with a cached resolver.
    pub fn cached_shapes(&self) -> usize {
        self.resolvers.len()
    }

    /// The strategy used for this receiver shape, resolving it if needed.
    pub fn resolver_kind(&self, receiver: &Value, args: &[Value]) -> ResolverKind {
        self.resolver(receiver, args).kind()
    }

    /// Read or call this member on `receiver`.
    ///
    /// `None` is a miss: nothing by this name exists on the receiver, and
    /// an unstated lookup moves on to the next frame. A member that exists
    /// but fails when invoked yields `Some(Null)`.
    pub fn get(&self, receiver: &Value, args: &[Value]) -> Option<Value> {
        let resolver = self.resolver(receiver, args);
        let invoked: EvalResult = match (&resolver, receiver) {
            (Resolver::MapLookup, Value::Map(entries)) => return entries.get(&self.map_key).cloned(),
            (Resolver::HostLookup, Value::Object(object)) => {
                return object.host_type().lookup(object, self.name());
            }
            (Resolver::Field(field), Value::Object(object)) => return field(object.inner()),
            (Resolver::StaticField(field), Value::Type(_)) => return Some(field()),
            (Resolver::Builtin(builtin), _) => builtin(receiver, args),
            (Resolver::Method(method), Value::Object(object)) => method(object.inner(), args),
            (Resolver::StaticMethod(method), Value::Type(_)) => method(args),
            _ => return None,
        };
        match invoked {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::debug!(identifier = %self.key, %error, "member invocation failed");
                Some(Value::Null)
            }
        }
    }

    fn resolver(&self, receiver: &Value, args: &[Value]) -> Resolver {
        let shape = ShapeKey::new(receiver, args);
        let cached = self.resolvers.get(&shape).map(|entry| entry.value().clone());
        if let Some(resolver) = cached {
            return resolver;
        }
        let resolver = resolve(&self.key, receiver, args.len());
        tracing::trace!(
            identifier = %self.key,
            receiver = %receiver.type_name(),
            kind = ?resolver.kind(),
            "resolver cached"
        );
        // A concurrent render may have raced us here; either entry is valid.
        self.resolvers.entry(shape).or_insert(resolver).value().clone()
    }
}

impl std::fmt::Debug for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Identifier({})", self.key)
    }
}

fn resolve(key: &IdentKey, receiver: &Value, arg_count: usize) -> Resolver {
    let name = &*key.name;
    let property = key.arity.is_none();
    let found = match receiver {
        Value::Map(_) if property => Some(Resolver::MapLookup),
        Value::Object(object) if property && object.host_type().is_map_like() => {
            Some(Resolver::HostLookup)
        }
        Value::Object(object) if property => object.host_type().field(name).map(Resolver::Field),
        Value::Object(object) => object
            .host_type()
            .method(name, arg_count)
            .map(Resolver::Method),
        Value::Type(ty) if property => ty.static_field(name).map(Resolver::StaticField),
        Value::Type(ty) => ty
            .static_method(name, arg_count)
            .map(Resolver::StaticMethod),
        Value::Null => None,
        _ => builtins::lookup(receiver, name, arg_count).map(Resolver::Builtin),
    };
    found.unwrap_or(Resolver::Missing)
}
