//! Language feature set selected by the template loader.

use bitflags::bitflags;

bitflags! {
    /// Optional expression-language features.
    ///
    /// Disabled features are rejected (or, for interpolation, treated as
    /// plain text) at parse time.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Extensions: u8 {
        /// `name(params) -> body` definitions and calls.
        const NAMED_EXPRESSIONS = 1 << 0;
        /// `@name` / `@name(args)` annotation calls.
        const ANNOTATIONS = 1 << 1;
        /// `${expr}` and `$name` inside string literals.
        const INTERPOLATION = 1 << 2;
        /// `name := value` persistent template bindings.
        const TEMPLATE_BINDINGS = 1 << 3;
    }
}

impl Default for Extensions {
    fn default() -> Self {
        Extensions::all()
    }
}
