//! Operator application: turning stacked operands into IR.

use stirrup_ir::{
    BinaryOp, IdentKey, Literal, Lookup, Node, OpKind, OperandType, Span, StreamOp, UnaryOp,
};

use super::{named_call, Extra, Parser, Pending};
use crate::operand::Operand;
use crate::{Artifacts, ParseError, ParseErrorKind};

const BITWISE_REJECTS: &[OperandType] = &[
    OperandType::Boolean,
    OperandType::Floating,
    OperandType::StringBuilder,
];

impl<A: Artifacts> Parser<'_, '_, A> {
    pub(super) fn apply(&mut self, pending: Pending) -> Result<(), ParseError> {
        let span = pending.span;
        match pending.op.kind {
            OpKind::Unary(op) => self.apply_unary(op, span),
            OpKind::Binary(op) => self.apply_binary(op, span),
            OpKind::Ternary => {
                if !matches!(pending.extra, Extra::Else) {
                    return Err(ParseError::new(ParseErrorKind::UnmatchedTernary, span));
                }
                let otherwise = self.pop_value(span)?;
                let then = self.pop_value(span)?;
                let condition = self.pop_value(span)?;
                let ty = if then.ty == otherwise.ty {
                    then.ty
                } else {
                    OperandType::Object
                };
                let node = Node::Ternary {
                    condition: Box::new(condition.node),
                    then: Box::new(then.node),
                    otherwise: Box::new(otherwise.node),
                };
                self.push(Operand::new(node, ty, condition.span.merge(otherwise.span)));
                Ok(())
            }
            OpKind::Colon => {
                let value = self.pop_value(span)?;
                let key = self.pop_value(span)?;
                self.push(Operand::pair(key, value));
                Ok(())
            }
            OpKind::Assign | OpKind::Bind => {
                let value = self.pop_value(span)?;
                let target = self.pop_value(span)?;
                let node = match pending.extra {
                    Extra::AssignLocal(slot) => Node::AssignLocal {
                        slot,
                        value: Box::new(value.node),
                    },
                    Extra::AssignBinding(template, slot) => Node::AssignBinding {
                        template,
                        slot,
                        value: Box::new(value.node),
                    },
                    _ => {
                        return Err(ParseError::new(
                            ParseErrorKind::InvalidAssignmentTarget,
                            target.span,
                        ))
                    }
                };
                let mut operand = Operand::new(node, value.ty, target.span.merge(value.span));
                operand.binds = pending.op.kind == OpKind::Bind;
                self.push(operand);
                Ok(())
            }
            OpKind::Stream(op) => {
                let Extra::Stream { binding, mark } = pending.extra else {
                    return Err(ParseError::new(ParseErrorKind::UnexpectedEnd, span));
                };
                let body = self.pop_value(span)?;
                let source = self.pop_value(span)?;
                self.unit.end_scope(mark);
                let ty = match op {
                    StreamOp::Filter | StreamOp::Remap | StreamOp::FlatRemap => OperandType::Object,
                    StreamOp::Reduce | StreamOp::Return => body.ty,
                };
                let node = Node::Stream {
                    op,
                    source: Box::new(source.node),
                    binding,
                    body: Box::new(body.node),
                };
                self.push(Operand::new(node, ty, source.span.merge(body.span)));
                Ok(())
            }
            OpKind::Sequence => {
                let right = self.pop_value(span)?;
                let left = self.pop_value(span)?;
                let node = match left.node {
                    Node::Sequence(mut items) => {
                        items.push(right.node);
                        Node::Sequence(items)
                    }
                    first => Node::Sequence(vec![first, right.node]),
                };
                let mut operand = Operand::new(node, right.ty, left.span.merge(right.span));
                operand.binds = right.binds;
                self.push(operand);
                Ok(())
            }
            OpKind::Group
            | OpKind::ListLiteral
            | OpKind::SetLiteral
            | OpKind::Call
            | OpKind::Lookup
            | OpKind::Navigate => Err(ParseError::new(
                ParseErrorKind::UnmatchedOpener {
                    opener: pending.op.token,
                },
                span,
            )),
        }
    }

    fn apply_unary(&mut self, op: UnaryOp, span: Span) -> Result<(), ParseError> {
        let operand = self.pop_value(span)?;
        let full = span.merge(operand.span);
        let ty = match op {
            UnaryOp::Not => OperandType::Boolean,
            UnaryOp::Negate | UnaryOp::Plus => {
                reject(op.as_symbol(), &operand, &[OperandType::Boolean])?;
                if let Some(folded) = fold_sign(op, &operand.node) {
                    self.push(Operand::new(Node::Literal(folded), operand.ty, full));
                    return Ok(());
                }
                // Folding aside, a sign always coerces to floating.
                OperandType::Floating
            }
            UnaryOp::BitNot => {
                reject(op.as_symbol(), &operand, BITWISE_REJECTS)?;
                OperandType::Integral
            }
            UnaryOp::Die => OperandType::Object,
        };
        self.push(Operand::new(Node::unary(op, operand.node), ty, full));
        Ok(())
    }

    fn apply_binary(&mut self, op: BinaryOp, span: Span) -> Result<(), ParseError> {
        let right = self.pop_value(span)?;
        let left = self.pop_value(span)?;
        let symbol = op.as_symbol();

        let ty = match op {
            BinaryOp::Add
                if left.ty == OperandType::StringBuilder
                    || right.ty == OperandType::StringBuilder =>
            {
                OperandType::StringBuilder
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => {
                reject(symbol, &left, &[OperandType::Boolean])?;
                reject(symbol, &right, &[OperandType::Boolean])?;
                left.ty.arithmetic(right.ty)
            }
            BinaryOp::Div | BinaryOp::Mod | BinaryOp::Pow => {
                reject(symbol, &left, &[OperandType::Boolean])?;
                reject(symbol, &right, &[OperandType::Boolean])?;
                OperandType::Floating
            }
            _ if op.is_bitwise() => {
                reject(symbol, &left, BITWISE_REJECTS)?;
                reject(symbol, &right, BITWISE_REJECTS)?;
                OperandType::Integral
            }
            BinaryOp::Compare => OperandType::Integral,
            BinaryOp::Range | BinaryOp::RangeExclusive => OperandType::Object,
            BinaryOp::Coalesce | BinaryOp::Elvis | BinaryOp::IfPresent | BinaryOp::IfTruthy => {
                if left.ty == right.ty {
                    left.ty
                } else {
                    OperandType::Object
                }
            }
            _ => OperandType::Boolean,
        };

        let full = left.span.merge(right.span);
        self.push(Operand::new(Node::binary(op, left.node, right.node), ty, full));
        Ok(())
    }

    pub(super) fn apply_container(
        &mut self,
        pending: Pending,
        elements: Vec<Operand>,
        close: Span,
    ) -> Result<(), ParseError> {
        let span = pending.span.merge(close);
        let opener = pending.op.token;

        match pending.op.kind {
            OpKind::Group => {
                let Ok([element]) = <[Operand; 1]>::try_from(elements) else {
                    return Err(ParseError::new(ParseErrorKind::EmptyExpression, span));
                };
                if element.is_pair() {
                    return Err(ParseError::new(
                        ParseErrorKind::PairOutsideContainer,
                        element.span,
                    ));
                }
                let mut operand = Operand::new(element.node, element.ty, span);
                operand.binds = element.binds;
                self.push(operand);
            }
            OpKind::ListLiteral | OpKind::SetLiteral => {
                let pairs = elements.iter().filter(|element| element.is_pair()).count();
                let node = if pairs == 0 {
                    let items = elements.into_iter().map(|element| element.node).collect();
                    if pending.op.kind == OpKind::ListLiteral {
                        Node::List(items)
                    } else {
                        Node::Set(items)
                    }
                } else if pairs == elements.len() {
                    let mut entries = Vec::with_capacity(pairs);
                    for element in elements {
                        if let Some(value) = element.pair_value {
                            entries.push((element.node, value));
                        }
                    }
                    Node::Map(entries)
                } else {
                    return Err(ParseError::new(ParseErrorKind::MixedContainer, span));
                };
                self.push(Operand::object(node, span));
            }
            OpKind::Lookup => {
                let index = match <[Operand; 1]>::try_from(elements) {
                    Ok([index]) if !index.is_pair() => index,
                    _ => return Err(ParseError::new(ParseErrorKind::ElementCount { opener }, span)),
                };
                let receiver = self.pop_value(span)?;
                let node = Node::Index {
                    receiver: Box::new(receiver.node),
                    index: Box::new(index.node),
                    safe: pending.op.is_safe(),
                };
                self.push(Operand::object(node, receiver.span.merge(close)));
            }
            OpKind::Call => {
                let arity = u32::try_from(elements.len()).unwrap_or(u32::MAX);
                let args: Vec<Node> = elements.into_iter().map(|element| element.node).collect();
                let node = match pending.extra {
                    Extra::Bare { name, lookup } => {
                        let target = if lookup == Lookup::Unstated {
                            self.named_target(&name)
                        } else {
                            None
                        };
                        match target {
                            Some(target) => named_call(target, args),
                            None => Node::Call {
                                ident: self.unit.identifier(self.state, IdentKey::method(&name, arity)),
                                lookup,
                                args,
                            },
                        }
                    }
                    Extra::Method { name, safe } => {
                        let receiver = self.pop_value(span)?;
                        let ident = self.unit.identifier(self.state, IdentKey::method(&name, arity));
                        let node = Node::MethodCall {
                            receiver: Box::new(receiver.node),
                            ident,
                            args,
                            safe,
                        };
                        self.push(Operand::object(node, receiver.span.merge(close)));
                        return Ok(());
                    }
                    Extra::Annotation(name) => Node::Annotation { name, args },
                    _ => return Err(ParseError::new(ParseErrorKind::UnmatchedOpener { opener }, span)),
                };
                self.push(Operand::object(node, span));
            }
            _ => return Err(ParseError::new(ParseErrorKind::UnmatchedOpener { opener }, span)),
        }
        Ok(())
    }
}

fn reject(symbol: &'static str, operand: &Operand, rejected: &[OperandType]) -> Result<(), ParseError> {
    if rejected.contains(&operand.ty) {
        return Err(ParseError::new(
            ParseErrorKind::InvalidOperand {
                op: symbol,
                operand: operand.ty,
            },
            operand.span,
        ));
    }
    Ok(())
}

/// Fold a sign applied directly to a numeric literal.
fn fold_sign(op: UnaryOp, node: &Node) -> Option<Literal> {
    match (op, node) {
        (UnaryOp::Plus, Node::Literal(literal @ (Literal::Int(_) | Literal::Double(_)))) => {
            Some(literal.clone())
        }
        (UnaryOp::Negate, Node::Literal(Literal::Int(value))) => value.checked_neg().map(Literal::Int),
        (UnaryOp::Negate, Node::Literal(Literal::Double(bits))) => Some(Literal::double(-bits.get())),
        _ => None,
    }
}
