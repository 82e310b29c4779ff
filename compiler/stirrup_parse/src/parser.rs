//! Shunting-yard expression compiler.
//!
//! Tokens are pulled one at a time; the lexer mode alternates between
//! operand and operator positions. Operands go on the operand stack as IR
//! fragments, operators wait on the operator stack until something of lower
//! binding strength arrives (see [`Operator::yields_to`]), and containers
//! wait for their closer.
//!
//! Two constructs bypass the stacks: navigation (`.`/`?.`) binds tighter
//! than anything and is applied to the top operand at once, and a ternary
//! `:` converts the innermost unmatched `?` into a three-operand operator.

use stirrup_ir::{
    Extensions, IdentKey, InternalName, Literal, Lookup, Node, OpKind, OperandType, Operator,
    OutputMode, Span, TemplateId,
};
use stirrup_lexer::{
    next_token, regex_pattern, scan_definition, scan_lambda_binding, split_interpolated,
    unescape, Definition, Ident, IdentKind, LexMode, Segment, TokenKind,
};
use stirrup_stack::{ensure_sufficient_stack, Stack};

use crate::operand::Operand;
use crate::state::Named;
use crate::unit::{Parsed, Unit};
use crate::{Artifacts, ParseError, ParseErrorKind, ParseState};

mod apply;

/// Compile one expression.
///
/// `offset` is the position of `text` within the template; all error spans
/// are absolute. A leading `name(params) ->` or `=>` signature makes the
/// expression a named-expression definition: the name is reserved in
/// `state` before the body compiles so the body can call itself, and the
/// caller must finish the definition with
/// [`ParseState::complete_definition`] once it has built the expression.
pub fn parse<A: Artifacts>(
    text: &str,
    offset: u32,
    state: &mut ParseState<A>,
) -> Result<Parsed<A>, ParseError> {
    let span = Span::from_range(0..text.len()).shift(offset);
    let mut unit = Unit::new();

    if state.extensions().contains(Extensions::NAMED_EXPRESSIONS) {
        if let Some(definition) = scan_definition(text) {
            return parse_definition(text, offset, state, unit, &definition, span);
        }
    }

    let operand = Parser::new(state, &mut unit, text, offset).run(0)?;
    let output = if operand.binds {
        OutputMode::Discard
    } else {
        OutputMode::Render
    };
    Ok(unit.finish(operand.node, operand.ty, None, 0, output, span))
}

fn parse_definition<A: Artifacts>(
    text: &str,
    offset: u32,
    state: &mut ParseState<A>,
    mut unit: Unit<A>,
    definition: &Definition<'_>,
    span: Span,
) -> Result<Parsed<A>, ParseError> {
    let name = definition.name;
    if state.is_named(name) {
        return Err(ParseError::new(
            ParseErrorKind::DuplicateDefinition { name: name.into() },
            definition.name_span.shift(offset),
        ));
    }
    for (i, &(param, param_span)) in definition.params.iter().enumerate() {
        if definition.params[..i].iter().any(|&(other, _)| other == param) {
            return Err(ParseError::new(
                ParseErrorKind::DuplicateParameter { name: param.into() },
                param_span.shift(offset),
            ));
        }
        unit.declare_local(param);
    }

    state.begin_definition(name);
    unit.defining = Some(name.into());
    let body = Parser::new(state, &mut unit, text, offset).run(definition.body_start);
    let body = match body {
        Ok(body) => body,
        Err(error) => {
            state.abandon_definition(name);
            return Err(error);
        }
    };

    let output = if definition.discard {
        OutputMode::Discard
    } else {
        OutputMode::Render
    };
    let params = u32::try_from(definition.params.len()).unwrap_or(u32::MAX);
    Ok(unit.finish(body.node, body.ty, Some(name.into()), params, output, span))
}

/// An operator waiting on the operator stack.
#[derive(Debug)]
pub(crate) struct Pending {
    op: &'static Operator,
    span: Span,
    /// Operand stack height when pushed; containers own everything above.
    base: usize,
    commas: u32,
    extra: Extra,
}

/// Per-occurrence data carried by an operator instance.
#[derive(Debug)]
enum Extra {
    None,
    /// A `?` whose `:` has been seen; applies to three operands.
    Else,
    /// `name(` resolved against locals, named expressions or the sections.
    Bare { name: Box<str>, lookup: Lookup },
    /// `receiver.name(`
    Method { name: Box<str>, safe: bool },
    Annotation(Box<str>),
    AssignLocal(u32),
    AssignBinding(TemplateId, u32),
    Stream { binding: Option<u32>, mark: usize },
}

/// Call target of a named expression.
enum Target {
    Recurse,
    Expression(u32),
}

pub(crate) struct Parser<'p, 't, A: Artifacts> {
    state: &'p mut ParseState<A>,
    unit: &'p mut Unit<A>,
    text: &'t str,
    base: u32,
    operands: Stack<Operand>,
    operators: Stack<Pending>,
}

impl<'p, 't, A: Artifacts> Parser<'p, 't, A> {
    pub(crate) fn new(
        state: &'p mut ParseState<A>,
        unit: &'p mut Unit<A>,
        text: &'t str,
        base: u32,
    ) -> Self {
        Parser {
            state,
            unit,
            text,
            base,
            operands: Stack::new(),
            operators: Stack::new(),
        }
    }

    /// Compile from byte `start` to the end of the text.
    pub(crate) fn run(mut self, start: usize) -> Result<Operand, ParseError> {
        let mut pos = start;
        let mut mode = LexMode::Operand;
        loop {
            let token = next_token(self.text, pos, mode)
                .map_err(|error| ParseError::from_lex(error, self.base))?;
            let span = token.span.shift(self.base);
            pos = token.end();

            mode = match mode {
                LexMode::Operand => self.operand(token.kind, span)?,
                _ => match token.kind {
                    TokenKind::End => return self.finish(),
                    TokenKind::Comma => {
                        self.comma(span)?;
                        LexMode::Operand
                    }
                    TokenKind::Operator(symbol) => self.operator(symbol, span, &mut pos)?,
                    _ => return Err(unexpected(&self.text[token.span.start as usize..pos], "an operator", span)),
                },
            };
        }
    }

    fn push(&mut self, operand: Operand) -> LexMode {
        self.operands.push(operand);
        LexMode::Operator
    }

    fn open(&mut self, op: &'static Operator, span: Span, extra: Extra) -> LexMode {
        self.operators.push(Pending {
            op,
            span,
            base: self.operands.len(),
            commas: 0,
            extra,
        });
        LexMode::Operand
    }

    fn enabled(&self, feature: Extensions, name: &'static str, span: Span) -> Result<(), ParseError> {
        if self.state.extensions().contains(feature) {
            Ok(())
        } else {
            Err(ParseError::new(
                ParseErrorKind::ExtensionDisabled { feature: name },
                span,
            ))
        }
    }

    /// Handle a token in operand position.
    fn operand(&mut self, kind: TokenKind<'t>, span: Span) -> Result<LexMode, ParseError> {
        let literal = |literal, ty| Operand::new(Node::Literal(literal), ty, span);
        Ok(match kind {
            TokenKind::Null => self.push(literal(Literal::Null, OperandType::Object)),
            TokenKind::Bool(value) => self.push(literal(Literal::Bool(value), OperandType::Boolean)),
            TokenKind::Int(value) => self.push(literal(Literal::Int(value), OperandType::Integral)),
            TokenKind::Double(value) => {
                self.push(literal(Literal::double(value), OperandType::Floating))
            }
            TokenKind::Str { raw, double_quoted } => {
                let operand = self.string(raw, double_quoted, span)?;
                self.push(operand)
            }
            TokenKind::Regex(raw) => {
                let node = Node::Regex(regex_pattern(raw).into());
                self.push(Operand::object(node, span))
            }
            TokenKind::EmptyMap => self.push(Operand::object(Node::Map(Vec::new()), span)),
            TokenKind::Ident(ident) => self.identifier(ident, span)?,
            TokenKind::Operator(symbol @ (")" | "]" | "}")) => {
                self.close_without_operand(symbol, span)?;
                LexMode::Operator
            }
            TokenKind::Operator(symbol) => {
                let op = Operator::prefix(symbol)
                    .ok_or_else(|| unexpected(symbol, "an operand", span))?;
                self.open(op, span, Extra::None)
            }
            TokenKind::Comma => return Err(unexpected(",", "an operand", span)),
            TokenKind::End => {
                let kind = if self.operands.is_empty() && self.operators.is_empty() {
                    ParseErrorKind::EmptyExpression
                } else {
                    ParseErrorKind::UnexpectedEnd
                };
                return Err(ParseError::new(kind, span));
            }
        })
    }

    fn identifier(&mut self, ident: Ident<'t>, span: Span) -> Result<LexMode, ParseError> {
        let Ident { lookup, kind, call } = ident;
        match kind {
            IdentKind::Current(backreach) => {
                Ok(self.push(Operand::object(Node::Current { backreach }, span)))
            }
            IdentKind::Internal(name) => {
                let internal = InternalName::from_name(name).ok_or_else(|| {
                    ParseError::new(
                        ParseErrorKind::UnknownInternalName { name: name.into() },
                        span,
                    )
                })?;
                if call {
                    return Err(unexpected("(", "an operator", span));
                }
                let ty = match internal {
                    InternalName::Index => OperandType::Integral,
                    InternalName::HasNext | InternalName::IsFirst => OperandType::Boolean,
                };
                let node = Node::Internal {
                    lookup,
                    name: internal,
                };
                Ok(self.push(Operand::new(node, ty, span)))
            }
            IdentKind::Annotation(name) => {
                self.enabled(Extensions::ANNOTATIONS, "annotations", span)?;
                if call {
                    Ok(self.open(Operator::call(), span, Extra::Annotation(name.into())))
                } else {
                    let node = Node::Annotation {
                        name: name.into(),
                        args: Vec::new(),
                    };
                    Ok(self.push(Operand::object(node, span)))
                }
            }
            IdentKind::Name(name) if call => Ok(self.open(
                Operator::call(),
                span,
                Extra::Bare {
                    name: name.into(),
                    lookup,
                },
            )),
            IdentKind::Name(name) => {
                let operand = self.resolve_name(name, lookup, span);
                Ok(self.push(operand))
            }
        }
    }

    /// Resolve a bare name: local slot, then template binding, then named
    /// expression, then a lookup against the render context's sections.
    fn resolve_name(&mut self, name: &str, lookup: Lookup, span: Span) -> Operand {
        if lookup != Lookup::Unstated {
            let ident = self.unit.identifier(self.state, IdentKey::property(name));
            return Operand::object(Node::Identifier { ident, lookup }, span);
        }

        let node = if let Some(slot) = self.unit.local(name) {
            Node::Local(slot)
        } else if let Some((template, slot)) = self.state.find_binding(name) {
            Node::Binding { template, slot }
        } else if let Some(target) = self.named_target(name) {
            named_call(target, Vec::new())
        } else {
            let ident = self.unit.identifier(self.state, IdentKey::property(name));
            Node::Identifier { ident, lookup }
        };
        Operand::object(node, span).named(name)
    }

    fn named_target(&mut self, name: &str) -> Option<Target> {
        if !self
            .state
            .extensions()
            .contains(Extensions::NAMED_EXPRESSIONS)
        {
            return None;
        }
        match self.state.named(name)? {
            Named::Pending => (self.unit.defining.as_deref() == Some(name)).then_some(Target::Recurse),
            Named::Defined(expression) => {
                Some(Target::Expression(self.unit.expression(name, expression)))
            }
        }
    }

    /// Compile a string literal, splitting out interpolated expressions.
    fn string(&mut self, raw: &'t str, double_quoted: bool, span: Span) -> Result<Operand, ParseError> {
        let raw_base = span.start + 1;
        let lex_error = |error| ParseError::from_lex(error, raw_base);

        if !double_quoted || !self.state.extensions().contains(Extensions::INTERPOLATION) {
            let text = unescape(raw).map_err(lex_error)?;
            return Ok(Operand::new(Node::string(&text), OperandType::StringBuilder, span));
        }

        let segments = split_interpolated(raw).map_err(lex_error)?;
        if let [Segment::Text(text)] = segments.as_slice() {
            return Ok(Operand::new(Node::string(text), OperandType::StringBuilder, span));
        }

        let mut parts = Vec::with_capacity(segments.len());
        for segment in segments {
            match segment {
                Segment::Text(text) => parts.push(Node::string(&text)),
                Segment::Expr { source, offset } => {
                    let base = raw_base + u32::try_from(offset).unwrap_or(u32::MAX);
                    let mark = self.unit.scope_mark();
                    let nested = ensure_sufficient_stack(|| {
                        Parser::new(&mut *self.state, &mut *self.unit, source, base).run(0)
                    });
                    self.unit.end_scope(mark);
                    let nested = nested?;
                    if nested.is_pair() {
                        return Err(ParseError::new(
                            ParseErrorKind::PairOutsideContainer,
                            nested.span,
                        ));
                    }
                    parts.push(nested.node);
                }
                Segment::Name { name, offset } => {
                    let start = raw_base + u32::try_from(offset).unwrap_or(u32::MAX);
                    let name_span = Span::new(start, start + u32::try_from(name.len()).unwrap_or(0));
                    parts.push(self.resolve_name(name, Lookup::Unstated, name_span).node);
                }
            }
        }
        Ok(Operand::new(
            Node::Concat(parts),
            OperandType::StringBuilder,
            span,
        ))
    }

    /// Handle an operator token after a complete operand.
    fn operator(&mut self, symbol: &'t str, span: Span, pos: &mut usize) -> Result<LexMode, ParseError> {
        if matches!(symbol, ")" | "]" | "}") {
            self.close(symbol, span)?;
            return Ok(LexMode::Operator);
        }
        let op = Operator::infix(symbol).ok_or_else(|| unexpected(symbol, "an operator", span))?;

        if op.is_navigation() {
            return self.navigate(op, span, pos);
        }
        if op.kind == OpKind::Colon {
            self.colon(op, span)?;
            return Ok(LexMode::Operand);
        }

        self.reduce_for(op)?;
        let extra = match op.kind {
            OpKind::Assign => self.assignment_target()?,
            OpKind::Bind => self.binding_target(span)?,
            OpKind::Stream(_) => self.stream_binding(pos),
            _ => Extra::None,
        };
        Ok(self.open(op, span, extra))
    }

    /// Apply every waiting operator that binds at least as tightly as `op`.
    fn reduce_for(&mut self, op: &Operator) -> Result<(), ParseError> {
        while self.operators.peek().is_some_and(|top| top.op.yields_to(op)) {
            if let Some(top) = self.operators.pop() {
                self.apply(top)?;
            }
        }
        Ok(())
    }

    /// Apply operators down to (not including) the innermost container.
    fn reduce_to_container(&mut self) -> Result<Option<&mut Pending>, ParseError> {
        while self.operators.peek().is_some_and(|top| !top.op.is_container()) {
            if let Some(top) = self.operators.pop() {
                self.apply(top)?;
            }
        }
        Ok(self.operators.peek_mut())
    }

    fn navigate(&mut self, op: &'static Operator, span: Span, pos: &mut usize) -> Result<LexMode, ParseError> {
        let token = next_token(self.text, *pos, LexMode::Member)
            .map_err(|error| ParseError::from_lex(error, self.base))?;
        let member_span = token.span.shift(self.base);
        *pos = token.end();

        let TokenKind::Ident(Ident {
            kind: IdentKind::Name(name),
            call,
            ..
        }) = token.kind
        else {
            return Err(ParseError::new(ParseErrorKind::UnexpectedEnd, member_span));
        };

        if call {
            let extra = Extra::Method {
                name: name.into(),
                safe: op.is_safe(),
            };
            return Ok(self.open(Operator::call(), span.merge(member_span), extra));
        }

        let receiver = self.pop_value(span)?;
        let ident = self.unit.identifier(self.state, IdentKey::property(name));
        let node = Node::Member {
            receiver: Box::new(receiver.node),
            ident,
            safe: op.is_safe(),
        };
        Ok(self.push(Operand::object(node, receiver.span.merge(member_span))))
    }

    /// `:` either completes the innermost open ternary or builds a pair.
    fn colon(&mut self, op: &'static Operator, span: Span) -> Result<(), ParseError> {
        self.reduce_for(op)?;

        let open_ternary = self
            .operators
            .iter()
            .take_while(|pending| !pending.op.is_container())
            .position(|pending| pending.op.kind == OpKind::Ternary && matches!(pending.extra, Extra::None));

        if let Some(depth) = open_ternary {
            for _ in 0..depth {
                if let Some(top) = self.operators.pop() {
                    self.apply(top)?;
                }
            }
            if let Some(question) = self.operators.peek_mut() {
                question.extra = Extra::Else;
            }
            return Ok(());
        }

        let in_map_container = self
            .operators
            .iter()
            .find(|pending| pending.op.is_container())
            .is_some_and(|pending| matches!(pending.op.kind, OpKind::ListLiteral | OpKind::SetLiteral));
        if !in_map_container {
            return Err(ParseError::new(ParseErrorKind::PairOutsideContainer, span));
        }
        self.open(op, span, Extra::None);
        Ok(())
    }

    fn comma(&mut self, span: Span) -> Result<(), ParseError> {
        let height = {
            self.reduce_to_container()?;
            self.operands.len()
        };
        let Some(container) = self.operators.peek_mut() else {
            return Err(unexpected(",", "an operator", span));
        };
        if !container.op.is_variadic() {
            return Err(unexpected(",", "an operator", span));
        }
        if height - container.base != container.commas as usize + 1 {
            return Err(ParseError::new(ParseErrorKind::MissingElement, span));
        }
        container.commas += 1;
        Ok(())
    }

    /// A closer in operand position is only valid right after its opener or
    /// after a comma; anything else leaves an operator without its operand.
    fn close_without_operand(&mut self, symbol: &str, span: Span) -> Result<(), ParseError> {
        if let Some(top) = self.operators.peek() {
            let dangling = !top.op.is_container()
                || self.operands.len() != top.base + top.commas as usize;
            if dangling {
                return Err(unexpected(symbol, "an operand", span));
            }
        }
        self.close(symbol, span)
    }

    fn close(&mut self, symbol: &str, span: Span) -> Result<(), ParseError> {
        if self.reduce_to_container()?.is_none() {
            return Err(ParseError::new(
                ParseErrorKind::UnexpectedCloser {
                    closer: symbol.into(),
                },
                span,
            ));
        }
        let Some(pending) = self.operators.pop() else {
            return Ok(());
        };
        if pending.op.closing != Some(symbol) {
            return Err(ParseError::new(
                ParseErrorKind::UnmatchedOpener {
                    opener: pending.op.token,
                },
                pending.span,
            ));
        }

        let count = self.operands.len() - pending.base;
        let elements = self.operands.pop_n(count).unwrap_or_default();
        let commas = pending.commas as usize;
        if commas > 0 && elements.len() == commas && !pending.op.allows_trailing_comma() {
            return Err(ParseError::new(ParseErrorKind::TrailingComma, span));
        }
        self.apply_container(pending, elements, span)
    }

    fn finish(mut self) -> Result<Operand, ParseError> {
        while let Some(top) = self.operators.pop() {
            self.apply(top)?;
        }
        let end = Span::point(self.base + u32::try_from(self.text.len()).unwrap_or(u32::MAX));
        let operand = self
            .operands
            .pop()
            .ok_or_else(|| ParseError::new(ParseErrorKind::EmptyExpression, end))?;
        if !self.operands.is_empty() {
            return Err(ParseError::new(ParseErrorKind::UnexpectedEnd, end));
        }
        if operand.is_pair() {
            return Err(ParseError::new(
                ParseErrorKind::PairOutsideContainer,
                operand.span,
            ));
        }
        Ok(operand)
    }

    /// Pop an operand that must be a plain value.
    ///
    /// Operands below the innermost open container belong to the enclosing
    /// expression and are never taken.
    fn pop_value(&mut self, span: Span) -> Result<Operand, ParseError> {
        let floor = self
            .operators
            .iter()
            .find(|pending| pending.op.is_container())
            .map_or(0, |container| container.base);
        if self.operands.len() <= floor {
            return Err(ParseError::new(ParseErrorKind::UnexpectedEnd, span));
        }
        let operand = self
            .operands
            .pop()
            .ok_or_else(|| ParseError::new(ParseErrorKind::UnexpectedEnd, span))?;
        if operand.is_pair() {
            return Err(ParseError::new(
                ParseErrorKind::PairOutsideContainer,
                operand.span,
            ));
        }
        Ok(operand)
    }

    fn assignment_target(&mut self) -> Result<Extra, ParseError> {
        let Some(target) = self.operands.peek() else {
            return Err(ParseError::new(
                ParseErrorKind::InvalidAssignmentTarget,
                Span::point(self.base),
            ));
        };
        match (&target.node, &target.name) {
            (Node::Local(slot), _) => Ok(Extra::AssignLocal(*slot)),
            (Node::Binding { template, slot }, _) => Ok(Extra::AssignBinding(*template, *slot)),
            (_, Some(name)) => {
                let name = name.clone();
                Ok(Extra::AssignLocal(self.unit.declare_local(&name)))
            }
            (_, None) => Err(ParseError::new(
                ParseErrorKind::InvalidAssignmentTarget,
                target.span,
            )),
        }
    }

    fn binding_target(&mut self, span: Span) -> Result<Extra, ParseError> {
        self.enabled(Extensions::TEMPLATE_BINDINGS, "template bindings", span)?;
        let name = match self.operands.peek() {
            Some(Operand {
                name: Some(name), ..
            }) => name.clone(),
            Some(target) => {
                return Err(ParseError::new(
                    ParseErrorKind::InvalidAssignmentTarget,
                    target.span,
                ))
            }
            None => {
                return Err(ParseError::new(
                    ParseErrorKind::InvalidAssignmentTarget,
                    span,
                ))
            }
        };
        let (template, slot) = self.state.declare_binding(&name);
        Ok(Extra::AssignBinding(template, slot))
    }

    /// Consume an optional `name ->` after a streaming operator.
    fn stream_binding(&mut self, pos: &mut usize) -> Extra {
        let mark = self.unit.scope_mark();
        let binding = scan_lambda_binding(self.text, *pos).map(|lambda| {
            *pos = lambda.end;
            self.unit.declare_local(lambda.name)
        });
        Extra::Stream { binding, mark }
    }
}

fn named_call(target: Target, args: Vec<Node>) -> Node {
    match target {
        Target::Recurse => Node::Recurse { args },
        Target::Expression(target) => Node::Named { target, args },
    }
}

fn unexpected(found: &str, expected: &'static str, span: Span) -> ParseError {
    ParseError::new(
        ParseErrorKind::UnexpectedToken {
            found: found.into(),
            expected,
        },
        span,
    )
}
