//! The loader-facing compile entry point.

use std::sync::Arc;

use stirrup_ir::IdentKey;
use stirrup_parse::{parse, Artifacts, ParseError, ParseErrorKind, ParseState};

use crate::cache::ExpressionCache;
use crate::expression::{CompiledExpression, ExpressionInner};
use crate::identifier::Identifier;

/// Runtime types handed to the parser for identifiers and named
/// expressions.
pub struct EvalArtifacts;

impl Artifacts for EvalArtifacts {
    type Identifier = Arc<Identifier>;
    type Expression = CompiledExpression;

    fn identifier(key: &IdentKey) -> Arc<Identifier> {
        Arc::new(Identifier::new(key.clone()))
    }
}

/// Parse state shared by every tag of one template file.
pub type TemplateParseState = ParseState<EvalArtifacts>;

/// Compiles expression text into [`CompiledExpression`]s, interning
/// programs in a shared [`ExpressionCache`].
#[derive(Clone, Default)]
pub struct ExpressionCompiler {
    cache: Arc<ExpressionCache>,
}

impl ExpressionCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A compiler interning into an existing cache.
    pub fn with_cache(cache: Arc<ExpressionCache>) -> Self {
        ExpressionCompiler { cache }
    }

    #[inline]
    pub fn cache(&self) -> &Arc<ExpressionCache> {
        &self.cache
    }

    /// Compile `text`, which starts at byte `offset` of its template.
    ///
    /// A named-expression definition is registered in `state` under its
    /// name once compiled, and is callable from later expressions.
    pub fn compile(
        &self,
        text: &str,
        offset: u32,
        state: &mut TemplateParseState,
    ) -> Result<CompiledExpression, ParseError> {
        let parsed = parse(text, offset, state)?;
        let executable = match self.cache.get_or_lower(&parsed.node) {
            Ok(executable) => executable,
            Err(error) => {
                if let Some(name) = &parsed.name {
                    state.abandon_definition(name);
                }
                return Err(ParseError::new(
                    ParseErrorKind::InvalidLiteral {
                        message: error.to_string(),
                    },
                    parsed.span,
                ));
            }
        };

        let call_name: Box<str> = match &parsed.name {
            Some(name) => format!("{name}/{}", parsed.params).into(),
            None => text.trim().into(),
        };
        let expression = CompiledExpression::new(ExpressionInner {
            name: parsed.name,
            call_name,
            span: parsed.span,
            params: parsed.params,
            local_count: parsed.local_count,
            output: parsed.output,
            identifiers: parsed.identifiers,
            expressions: parsed.expressions,
            executable,
        });
        if let Some(name) = expression.name() {
            state.complete_definition(name, expression.clone());
        }
        tracing::debug!(
            expression = expression.call_name(),
            span = %expression.span(),
            "compiled expression"
        );
        Ok(expression)
    }
}
