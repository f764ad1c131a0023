//! Syntax tree of the reference language lowered by [`crate::lowering`].
//!
//! The language is deliberately small: functions, blocks, loops, conditionals
//! and expression statements over numbers, strings, short-circuit logic,
//! arithmetic, comparisons and member-access chains. There is no parser;
//! trees are built directly, usually through the helper constructors below.

use crate::operation::Span;

/// An identifier with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    /// The name
    pub name: String,
    /// Where it appears
    pub span: Span,
}

impl Ident {
    /// Creates an identifier with an empty span.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            span: Span::default(),
        }
    }
}

/// A function definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Function name
    pub name: Ident,
    /// Parameter names, in order
    pub params: Vec<Ident>,
    /// The body
    pub body: Block,
    /// Location of the whole definition
    pub span: Span,
}

impl Function {
    /// Creates a function with an empty span.
    pub fn new(name: &str, params: &[&str], statements: Vec<Stmt>) -> Self {
        Self {
            name: Ident::new(name),
            params: params.iter().map(|p| Ident::new(*p)).collect(),
            body: Block::new(statements),
            span: Span::default(),
        }
    }
}

/// A braced statement list.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// The statements
    pub statements: Vec<Stmt>,
    /// Location
    pub span: Span,
}

impl Block {
    /// Creates a block with an empty span.
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self {
            statements,
            span: Span::default(),
        }
    }
}

/// Statements.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// A nested block
    Block(Block),
    /// An expression evaluated for its side effects
    Expr(Expr),
    /// `while (condition) body`
    While {
        /// Loop condition
        condition: Expr,
        /// Loop body
        body: Block,
        /// Location
        span: Span,
    },
    /// `if (condition) then else otherwise`
    If {
        /// Condition
        condition: Expr,
        /// Then branch
        then_branch: Block,
        /// Optional else branch
        else_branch: Option<Block>,
        /// Location
        span: Span,
    },
    /// `break`
    Break(Span),
    /// `continue`
    Continue(Span),
    /// `return value?`
    Return {
        /// The returned value; `null` when absent
        value: Option<Expr>,
        /// Location
        span: Span,
    },
    /// `debugger`
    Debugger(Span),
}

impl Stmt {
    /// Source location of the statement.
    pub fn span(&self) -> Span {
        match self {
            Stmt::Block(block) => block.span,
            Stmt::Expr(expr) => expr.span(),
            Stmt::While { span, .. } | Stmt::If { span, .. } | Stmt::Return { span, .. } => *span,
            Stmt::Break(span) | Stmt::Continue(span) | Stmt::Debugger(span) => *span,
        }
    }

    /// `while (condition) { body }`
    pub fn while_loop(condition: Expr, body: Vec<Stmt>) -> Self {
        Stmt::While {
            condition,
            body: Block::new(body),
            span: Span::default(),
        }
    }

    /// `if (condition) { then_branch }`
    pub fn if_then(condition: Expr, then_branch: Vec<Stmt>) -> Self {
        Stmt::If {
            condition,
            then_branch: Block::new(then_branch),
            else_branch: None,
            span: Span::default(),
        }
    }

    /// `if (condition) { then_branch } else { else_branch }`
    pub fn if_else(condition: Expr, then_branch: Vec<Stmt>, else_branch: Vec<Stmt>) -> Self {
        Stmt::If {
            condition,
            then_branch: Block::new(then_branch),
            else_branch: Some(Block::new(else_branch)),
            span: Span::default(),
        }
    }

    /// `return value`
    pub fn ret(value: Expr) -> Self {
        Stmt::Return {
            value: Some(value),
            span: Span::default(),
        }
    }
}

/// Short-circuit operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// `||`
    Or,
    /// `&&`
    And,
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
}

/// Expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal, kept as written
    Number {
        /// Decimal digits
        literal: String,
        /// Location
        span: Span,
    },
    /// String literal
    String {
        /// The contents
        value: String,
        /// Location
        span: Span,
    },
    /// `a || b || c` or `a && b && c`
    Logical {
        /// The operator
        op: LogicalOp,
        /// Terms, left to right
        terms: Vec<Expr>,
        /// Location
        span: Span,
    },
    /// Binary arithmetic
    Arithmetic {
        /// The operator
        op: ArithmeticOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
        /// Location
        span: Span,
    },
    /// Binary comparison
    Compare {
        /// The operator
        op: CompareOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
        /// Location
        span: Span,
    },
    /// An identifier followed by postfix accessors
    Member {
        /// The base identifier
        base: Ident,
        /// Accessors, left to right
        chain: Vec<Accessor>,
        /// Location
        span: Span,
    },
}

impl Expr {
    /// Source location of the expression.
    pub fn span(&self) -> Span {
        match self {
            Expr::Number { span, .. }
            | Expr::String { span, .. }
            | Expr::Logical { span, .. }
            | Expr::Arithmetic { span, .. }
            | Expr::Compare { span, .. }
            | Expr::Member { span, .. } => *span,
        }
    }

    /// A numeric literal.
    pub fn number(literal: impl Into<String>) -> Self {
        Expr::Number {
            literal: literal.into(),
            span: Span::default(),
        }
    }

    /// A string literal.
    pub fn string(value: impl Into<String>) -> Self {
        Expr::String {
            value: value.into(),
            span: Span::default(),
        }
    }

    /// A bare name.
    pub fn name(name: &str) -> Self {
        Expr::member(name, Vec::new())
    }

    /// A name followed by accessors.
    pub fn member(name: &str, chain: Vec<Accessor>) -> Self {
        Expr::Member {
            base: Ident::new(name),
            chain,
            span: Span::default(),
        }
    }

    /// `name = value`
    pub fn assign(name: &str, value: Expr) -> Self {
        Expr::member(name, vec![Accessor::assign(value)])
    }

    /// `f(args)`
    pub fn call(name: &str, args: Vec<Expr>) -> Self {
        Expr::member(name, vec![Accessor::call(args)])
    }

    /// `t0 || t1 || ...`
    pub fn or(terms: Vec<Expr>) -> Self {
        Expr::logical(LogicalOp::Or, terms)
    }

    /// `t0 && t1 && ...`
    pub fn and(terms: Vec<Expr>) -> Self {
        Expr::logical(LogicalOp::And, terms)
    }

    fn logical(op: LogicalOp, terms: Vec<Expr>) -> Self {
        Expr::Logical {
            op,
            terms,
            span: Span::default(),
        }
    }

    /// Binary arithmetic.
    pub fn arithmetic(op: ArithmeticOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Arithmetic {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            span: Span::default(),
        }
    }

    /// Binary comparison.
    pub fn compare(op: CompareOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            span: Span::default(),
        }
    }
}

/// A postfix accessor in a member chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    /// `(args)`
    Call {
        /// Arguments
        args: Vec<Expr>,
        /// Location
        span: Span,
    },
    /// `.name`
    Field(Ident),
    /// `[expr]`
    Index(Box<Expr>),
    /// `= value`
    Assign {
        /// The assigned value
        value: Box<Expr>,
        /// Location
        span: Span,
    },
}

impl Accessor {
    /// `(args)`
    pub fn call(args: Vec<Expr>) -> Self {
        Accessor::Call {
            args,
            span: Span::default(),
        }
    }

    /// `.name`
    pub fn field(name: &str) -> Self {
        Accessor::Field(Ident::new(name))
    }

    /// `[index]`
    pub fn index(index: Expr) -> Self {
        Accessor::Index(Box::new(index))
    }

    /// `= value`
    pub fn assign(value: Expr) -> Self {
        Accessor::Assign {
            value: Box::new(value),
            span: Span::default(),
        }
    }
}
