// Expression evaluation
//
// A deliberately narrow recursive-descent evaluator used by
// evaluate_expression and the watch expressions. The grammar covers
// literals, `this`, bare names and dot-chains of field reads and calls;
// there are no operators. Anything richer belongs in the debuggee.

use crate::error::{DebugError, DebugResult};
use crate::thread_ops::find_object_by_id;
use debug_adapter::{
    DebugTarget, FrameRef, InvokeOutcome, MethodRef, ObjectRef, ThreadRef, TypeRef, Value,
};
use std::future::Future;
use std::pin::Pin;

// Expressions beyond this length are rejected before parsing.
const MAX_EXPRESSION_LEN: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Dec(f64),
    Str(String),
    CharLit(char),
    Dot,
    Comma,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Null,
    Bool(bool),
    Int(i64),
    Dec(f64),
    Str(String),
    Char(char),
    This,
    Name(String),
    Field {
        base: Box<Expr>,
        name: String,
    },
    Call {
        /// None means an implicit call on `this`.
        base: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
    },
}

fn lex(input: &str) -> DebugResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '.' => {
                // A dot may also start a decimal; the grammar's decimals
                // always carry a leading digit, so '.' here is chaining.
                chars.next();
                tokens.push(Token::Dot);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '"' {
                        closed = true;
                        break;
                    }
                    s.push(c);
                }
                if !closed {
                    return Err(DebugError::InvalidExpression(
                        "unterminated string literal".to_string(),
                    ));
                }
                tokens.push(Token::Str(s));
            }
            '\'' => {
                chars.next();
                let c = chars
                    .next()
                    .map(|(_, c)| c)
                    .ok_or_else(|| DebugError::InvalidExpression(
                        "unterminated char literal".to_string(),
                    ))?;
                match chars.next() {
                    Some((_, '\'')) => tokens.push(Token::CharLit(c)),
                    _ => {
                        return Err(DebugError::InvalidExpression(
                            "unterminated char literal".to_string(),
                        ))
                    }
                }
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut end = start;
                let mut is_decimal = false;
                chars.next();
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_digit() {
                        end = i;
                        chars.next();
                    } else if c == '.' && !is_decimal {
                        // Only consume the dot when a digit follows;
                        // otherwise it is a chain on an integer.
                        let mut ahead = chars.clone();
                        ahead.next();
                        match ahead.peek() {
                            Some(&(_, d)) if d.is_ascii_digit() => {
                                is_decimal = true;
                                end = i;
                                chars.next();
                            }
                            _ => break,
                        }
                    } else {
                        break;
                    }
                }
                let text = &input[start..=end.max(start)];
                if is_decimal {
                    let value = text.parse::<f64>().map_err(|_| {
                        DebugError::InvalidExpression(format!("bad number: {}", text))
                    })?;
                    tokens.push(Token::Dec(value));
                } else {
                    let value = text.parse::<i64>().map_err(|_| {
                        DebugError::InvalidExpression(format!("bad number: {}", text))
                    })?;
                    tokens.push(Token::Int(value));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' || c == '@' => {
                let mut end = start;
                chars.next();
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                        end = i;
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(input[start..=end].to_string()));
            }
            other => {
                return Err(DebugError::InvalidExpression(format!(
                    "unexpected character '{}'",
                    other
                )));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_expr(&mut self) -> DebugResult<Expr> {
        let mut expr = self.parse_primary()?;

        while self.eat(&Token::Dot) {
            let name = match self.next() {
                Some(Token::Ident(name)) => name,
                _ => {
                    return Err(DebugError::InvalidExpression(
                        "expected member name after '.'".to_string(),
                    ))
                }
            };
            if self.eat(&Token::LParen) {
                let args = self.parse_args()?;
                expr = Expr::Call {
                    base: Some(Box::new(expr)),
                    name,
                    args,
                };
            } else {
                expr = Expr::Field {
                    base: Box::new(expr),
                    name,
                };
            }
        }

        Ok(expr)
    }

    fn parse_args(&mut self) -> DebugResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            if self.eat(&Token::RParen) {
                return Ok(args);
            }
            return Err(DebugError::InvalidExpression(
                "expected ',' or ')' in argument list".to_string(),
            ));
        }
    }

    fn parse_primary(&mut self) -> DebugResult<Expr> {
        match self.next() {
            Some(Token::Int(v)) => Ok(Expr::Int(v)),
            Some(Token::Dec(v)) => Ok(Expr::Dec(v)),
            Some(Token::Str(v)) => Ok(Expr::Str(v)),
            Some(Token::CharLit(v)) => Ok(Expr::Char(v)),
            Some(Token::Ident(name)) => match name.as_str() {
                "null" => Ok(Expr::Null),
                "true" => Ok(Expr::Bool(true)),
                "false" => Ok(Expr::Bool(false)),
                "this" => Ok(Expr::This),
                _ => {
                    if self.eat(&Token::LParen) {
                        let args = self.parse_args()?;
                        Ok(Expr::Call {
                            base: None,
                            name,
                            args,
                        })
                    } else {
                        Ok(Expr::Name(name))
                    }
                }
            },
            other => Err(DebugError::InvalidExpression(format!(
                "unexpected token: {:?}",
                other
            ))),
        }
    }
}

fn parse(input: &str) -> DebugResult<Expr> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DebugError::InvalidExpression("empty expression".to_string()));
    }
    if trimmed.len() > MAX_EXPRESSION_LEN {
        return Err(DebugError::InvalidExpression(format!(
            "expression longer than {} bytes",
            MAX_EXPRESSION_LEN
        )));
    }

    let tokens = lex(trimmed)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(DebugError::InvalidExpression(
            "trailing input after expression".to_string(),
        ));
    }
    Ok(expr)
}

/// Evaluates expressions against a suspended thread's frame.
pub struct Evaluator<'a> {
    target: &'a dyn DebugTarget,
    thread: &'a ThreadRef,
    frame: &'a FrameRef,
}

type EvalFuture<'a> = Pin<Box<dyn Future<Output = DebugResult<Value>> + Send + 'a>>;

impl<'a> Evaluator<'a> {
    pub fn new(target: &'a dyn DebugTarget, thread: &'a ThreadRef, frame: &'a FrameRef) -> Self {
        Self {
            target,
            thread,
            frame,
        }
    }

    pub async fn evaluate(&self, input: &str) -> DebugResult<Value> {
        let expr = parse(input)?;
        self.eval(&expr).await
    }

    fn eval<'b>(&'b self, expr: &'b Expr) -> EvalFuture<'b> {
        Box::pin(async move {
            match expr {
                Expr::Null => Ok(Value::Null),
                Expr::Bool(v) => Ok(Value::Boolean(*v)),
                Expr::Int(v) => Ok(int_value(*v)),
                Expr::Dec(v) => Ok(Value::Double(*v)),
                Expr::Str(v) => Ok(Value::Str(v.clone())),
                Expr::Char(v) => Ok(Value::Char(*v)),
                Expr::This => {
                    let this = self.target.this_object(self.frame).await?;
                    this.map(Value::Object).ok_or_else(|| {
                        DebugError::InvalidExpression("no 'this' in static context".to_string())
                    })
                }
                Expr::Name(name) => self.resolve_name(name).await,
                Expr::Field { base, name } => {
                    let value = self.eval(base).await?;
                    self.read_member(value, name).await
                }
                Expr::Call { base, name, args } => {
                    let receiver = match base {
                        Some(base) => self.eval(base).await?,
                        None => {
                            let this = self.target.this_object(self.frame).await?;
                            this.map(Value::Object).ok_or_else(|| {
                                DebugError::InvalidExpression(
                                    "cannot call method without object context".to_string(),
                                )
                            })?
                        }
                    };

                    let object = match &receiver {
                        Value::Null => return Err(DebugError::NullDereference(name.clone())),
                        Value::Object(o) | Value::Array(o) => o.clone(),
                        _ => {
                            return Err(DebugError::InvalidExpression(format!(
                                "cannot call '{}' on primitive value",
                                name
                            )))
                        }
                    };

                    let mut arg_values = Vec::with_capacity(args.len());
                    for arg in args {
                        let value = self.eval(arg).await?;
                        arg_values.push(self.resolve_handle_argument(value).await?);
                    }

                    self.invoke(&object, name, arg_values).await
                }
            }
        })
    }

    /// Bare names resolve local-first, then as a field on `this`.
    async fn resolve_name(&self, name: &str) -> DebugResult<Value> {
        let locals = self.target.visible_locals(self.frame).await?;
        let arguments = self.target.arguments(self.frame).await?;
        if locals.iter().chain(arguments.iter()).any(|v| v.name == name) {
            return Ok(self.target.get_local(self.frame, name).await?);
        }

        if let Some(this) = self.target.this_object(self.frame).await? {
            if let Some(value) = self.try_read_field(&this, name).await? {
                return Ok(value);
            }
        }

        Err(DebugError::InvalidExpression(format!(
            "Cannot resolve: {}",
            name
        )))
    }

    async fn read_member(&self, base: Value, name: &str) -> DebugResult<Value> {
        let object = match &base {
            Value::Null => return Err(DebugError::NullDereference(name.to_string())),
            Value::Object(o) | Value::Array(o) => o.clone(),
            _ => {
                return Err(DebugError::InvalidExpression(format!(
                    "cannot access '{}' on primitive value",
                    name
                )))
            }
        };

        match self.try_read_field(&object, name).await? {
            Some(value) => Ok(value),
            None => Err(DebugError::InvalidExpression(format!(
                "Cannot resolve: {} on {}",
                name, object.type_name
            ))),
        }
    }

    async fn try_read_field(&self, object: &ObjectRef, name: &str) -> DebugResult<Option<Value>> {
        let Some(type_ref) = self.type_of(object).await? else {
            return Ok(None);
        };
        let Some(field) = self.target.field_by_name(&type_ref, name).await? else {
            return Ok(None);
        };
        Ok(Some(self.target.get_field(object, &field).await?))
    }

    async fn type_of(&self, object: &ObjectRef) -> DebugResult<Option<TypeRef>> {
        Ok(self
            .target
            .classes_by_name(&object.type_name)
            .await?
            .into_iter()
            .next())
    }

    async fn invoke(
        &self,
        object: &ObjectRef,
        name: &str,
        args: Vec<Value>,
    ) -> DebugResult<Value> {
        let type_ref = self.type_of(object).await?.ok_or_else(|| {
            DebugError::ClassNotFound(object.type_name.clone())
        })?;

        let methods = self.target.methods_by_name(&type_ref, name).await?;
        if methods.is_empty() {
            return Err(DebugError::MethodNotFound {
                class: object.type_name.clone(),
                method: name.to_string(),
            });
        }

        let method = pick_overload(&methods, args.len()).ok_or_else(|| {
            DebugError::OverloadAmbiguous(format!(
                "no overload of {} takes {} arguments",
                name,
                args.len()
            ))
        })?;

        match self
            .target
            .invoke_instance(self.thread, object, method, args)
            .await?
        {
            InvokeOutcome::Returned(value) => Ok(value),
            InvokeOutcome::Thrown {
                exception_type,
                exception_id,
            } => Err(DebugError::Thrown {
                exception_type,
                exception_id,
            }),
        }
    }

    /// String arguments of the form "@1234" refer to live objects.
    async fn resolve_handle_argument(&self, value: Value) -> DebugResult<Value> {
        let Value::Str(s) = &value else {
            return Ok(value);
        };
        let Some(id_text) = s.strip_prefix('@') else {
            return Ok(value);
        };
        let id: u64 = id_text
            .parse()
            .map_err(|_| DebugError::InvalidExpression(format!("bad object handle: {}", s)))?;
        let object = find_object_by_id(self.target, id)
            .await?
            .ok_or(DebugError::ObjectNotFound(id))?;
        Ok(Value::Object(object))
    }
}

/// Overload choice is coarse on purpose: first arity match, declaration
/// order breaks ties.
fn pick_overload(methods: &[MethodRef], arity: usize) -> Option<&MethodRef> {
    methods
        .iter()
        .find(|m| m.arg_type_names.len() == arity)
        .or_else(|| {
            if methods.len() == 1 {
                Some(&methods[0])
            } else {
                None
            }
        })
}

fn int_value(v: i64) -> Value {
    if let Ok(small) = i32::try_from(v) {
        Value::Int(small)
    } else {
        Value::Long(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debug_adapter::testkit::ScriptedTarget;
    use pretty_assertions::assert_eq;

    struct Fixture {
        target: ScriptedTarget,
        thread: ThreadRef,
        frame: FrameRef,
    }

    async fn fixture() -> Fixture {
        let target = ScriptedTarget::new();
        target.add_class("com.example.Cart", &[10]);
        target.add_field("com.example.Cart", "total", "int");
        target.add_method("com.example.Cart", "size", &[], "int");
        target.add_method("com.example.Cart", "add", &["int"], "void");

        let thread = target.add_thread(1, "main", true);
        target.push_frame(1, "com.example.Cart", "checkout", 10);

        let cart = target.add_object(500, "com.example.Cart");
        target.add_object_field(500, "total", Value::Int(7));
        target.set_this(1, 0, cart);
        target.add_local(1, 0, "count", Value::Int(3));
        target.add_local(1, 0, "label", Value::Str("order".into()));

        let frame = target.frames(&thread).await.unwrap().remove(0);
        Fixture {
            target,
            thread,
            frame,
        }
    }

    #[tokio::test]
    async fn literals() {
        let f = fixture().await;
        let eval = Evaluator::new(&f.target, &f.thread, &f.frame);
        assert_eq!(eval.evaluate("null").await.unwrap(), Value::Null);
        assert_eq!(eval.evaluate("true").await.unwrap(), Value::Boolean(true));
        assert_eq!(eval.evaluate("42").await.unwrap(), Value::Int(42));
        assert_eq!(eval.evaluate("-3").await.unwrap(), Value::Int(-3));
        assert_eq!(eval.evaluate("2.5").await.unwrap(), Value::Double(2.5));
        assert_eq!(
            eval.evaluate("\"hi\"").await.unwrap(),
            Value::Str("hi".into())
        );
        assert_eq!(eval.evaluate("'x'").await.unwrap(), Value::Char('x'));
    }

    #[tokio::test]
    async fn name_resolution_prefers_locals_then_this_fields() {
        let f = fixture().await;
        let eval = Evaluator::new(&f.target, &f.thread, &f.frame);
        assert_eq!(eval.evaluate("count").await.unwrap(), Value::Int(3));
        assert_eq!(eval.evaluate("total").await.unwrap(), Value::Int(7));
    }

    #[tokio::test]
    async fn unresolved_name_is_an_invalid_expression() {
        let f = fixture().await;
        let eval = Evaluator::new(&f.target, &f.thread, &f.frame);
        let err = eval.evaluate("ghost").await.unwrap_err();
        assert!(matches!(err, DebugError::InvalidExpression(_)));
    }

    #[tokio::test]
    async fn field_chain_on_this() {
        let f = fixture().await;
        let eval = Evaluator::new(&f.target, &f.thread, &f.frame);
        assert_eq!(eval.evaluate("this.total").await.unwrap(), Value::Int(7));
    }

    #[tokio::test]
    async fn null_dereference_is_reported() {
        let f = fixture().await;
        f.target.add_local(1, 0, "nothing", Value::Null);
        let eval = Evaluator::new(&f.target, &f.thread, &f.frame);
        let err = eval.evaluate("nothing.f").await.unwrap_err();
        assert!(matches!(err, DebugError::NullDereference(_)));
    }

    #[tokio::test]
    async fn method_call_returns_scripted_result() {
        let f = fixture().await;
        f.target.set_invoke_result(
            "com.example.Cart",
            "size",
            InvokeOutcome::Returned(Value::Int(3)),
        );
        let eval = Evaluator::new(&f.target, &f.thread, &f.frame);
        assert_eq!(eval.evaluate("this.size()").await.unwrap(), Value::Int(3));
        // Bare calls resolve against `this`
        assert_eq!(eval.evaluate("size()").await.unwrap(), Value::Int(3));
    }

    #[tokio::test]
    async fn thrown_invocation_surfaces_exception() {
        let f = fixture().await;
        f.target.set_invoke_result(
            "com.example.Cart",
            "size",
            InvokeOutcome::Thrown {
                exception_type: "java.lang.IllegalStateException".into(),
                exception_id: 900,
            },
        );
        let eval = Evaluator::new(&f.target, &f.thread, &f.frame);
        let err = eval.evaluate("size()").await.unwrap_err();
        assert!(matches!(err, DebugError::Thrown { .. }));
    }

    #[tokio::test]
    async fn overlong_expression_is_rejected() {
        let f = fixture().await;
        let eval = Evaluator::new(&f.target, &f.thread, &f.frame);
        let long = "a".repeat(MAX_EXPRESSION_LEN + 1);
        let err = eval.evaluate(&long).await.unwrap_err();
        assert!(matches!(err, DebugError::InvalidExpression(_)));
    }

    #[tokio::test]
    async fn trailing_garbage_is_rejected() {
        let f = fixture().await;
        let eval = Evaluator::new(&f.target, &f.thread, &f.frame);
        assert!(eval.evaluate("count count").await.is_err());
        assert!(eval.evaluate("count +").await.is_err());
    }
}
