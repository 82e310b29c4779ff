//! Template-file scoped parse state.
//!
//! One [`ParseState`] lives for the whole load of a template file. It is
//! shared by every tag in that file (and by inline partials), so that
//! identifiers are interned once, named expressions defined in one tag are
//! callable from later tags, and template bindings keep their slots.

use rustc_hash::FxHashMap;
use stirrup_ir::{Extensions, IdentKey, TemplateId};

/// What the parser hands out for identifiers and named expressions.
///
/// The parser only stores and clones these; the evaluator decides what they
/// are. Keeping them abstract lets the parser live below the runtime.
pub trait Artifacts {
    /// Interned identifier; every occurrence of one key shares one value.
    type Identifier: Clone;
    /// A finished named expression.
    type Expression: Clone;

    fn identifier(key: &IdentKey) -> Self::Identifier;
}

/// Entry in the named-expression table.
#[derive(Clone, Debug)]
pub(crate) enum Named<E> {
    /// Body currently being compiled; calls from inside it recurse.
    Pending,
    Defined(E),
}

pub struct ParseState<A: Artifacts> {
    extensions: Extensions,
    identifiers: FxHashMap<IdentKey, A::Identifier>,
    named: FxHashMap<Box<str>, Named<A::Expression>>,
    /// Binding slots per template, kept after the template's scope is popped
    /// so re-entering it sees the same layout.
    bindings: FxHashMap<TemplateId, FxHashMap<Box<str>, u32>>,
    scopes: Vec<TemplateId>,
}

impl<A: Artifacts> ParseState<A> {
    /// State with every extension enabled and the root template scope open.
    pub fn new() -> Self {
        Self::with_extensions(Extensions::default())
    }

    pub fn with_extensions(extensions: Extensions) -> Self {
        let mut bindings = FxHashMap::default();
        bindings.insert(TemplateId::ROOT, FxHashMap::default());
        ParseState {
            extensions,
            identifiers: FxHashMap::default(),
            named: FxHashMap::default(),
            bindings,
            scopes: vec![TemplateId::ROOT],
        }
    }

    #[inline]
    pub fn extensions(&self) -> Extensions {
        self.extensions
    }

    /// Enter the binding scope of a template or inline partial.
    pub fn push_template_scope(&mut self, id: TemplateId) {
        self.bindings.entry(id).or_default();
        self.scopes.push(id);
    }

    /// Leave the innermost template scope. The root scope is never popped.
    pub fn pop_template_scope(&mut self) -> Option<TemplateId> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    /// Number of binding slots declared for `id`.
    pub fn binding_count(&self, id: TemplateId) -> u32 {
        self.bindings
            .get(&id)
            .map_or(0, |slots| u32::try_from(slots.len()).unwrap_or(u32::MAX))
    }

    /// The shared identifier for `key`, created on first use.
    pub fn intern(&mut self, key: &IdentKey) -> A::Identifier {
        if let Some(existing) = self.identifiers.get(key) {
            return existing.clone();
        }
        let identifier = A::identifier(key);
        self.identifiers.insert(key.clone(), identifier.clone());
        identifier
    }

    /// Whether `name` has been defined or is being defined.
    pub fn is_named(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    /// The finished named expression called `name`.
    pub fn named_expression(&self, name: &str) -> Option<&A::Expression> {
        match self.named.get(name) {
            Some(Named::Defined(expression)) => Some(expression),
            _ => None,
        }
    }

    /// Store the finished expression for a definition begun by the parser.
    pub fn complete_definition(&mut self, name: &str, expression: A::Expression) {
        tracing::trace!(name, "named expression defined");
        self.named.insert(name.into(), Named::Defined(expression));
    }

    /// Drop the placeholder of a definition that failed to compile.
    pub fn abandon_definition(&mut self, name: &str) {
        if matches!(self.named.get(name), Some(Named::Pending)) {
            self.named.remove(name);
        }
    }

    pub(crate) fn begin_definition(&mut self, name: &str) {
        self.named.insert(name.into(), Named::Pending);
    }

    pub(crate) fn named(&self, name: &str) -> Option<&Named<A::Expression>> {
        self.named.get(name)
    }

    /// Innermost template binding called `name`.
    pub(crate) fn find_binding(&self, name: &str) -> Option<(TemplateId, u32)> {
        self.scopes.iter().rev().find_map(|id| {
            self.bindings
                .get(id)
                .and_then(|slots| slots.get(name))
                .map(|&slot| (*id, slot))
        })
    }

    /// Declare (or reuse) `name` in the innermost template scope.
    pub(crate) fn declare_binding(&mut self, name: &str) -> (TemplateId, u32) {
        let id = self.scopes.last().copied().unwrap_or(TemplateId::ROOT);
        let slots = self.bindings.entry(id).or_default();
        let next = u32::try_from(slots.len()).unwrap_or(u32::MAX);
        let slot = *slots.entry(name.into()).or_insert(next);
        (id, slot)
    }
}

impl<A: Artifacts> Default for ParseState<A> {
    fn default() -> Self {
        Self::new()
    }
}
