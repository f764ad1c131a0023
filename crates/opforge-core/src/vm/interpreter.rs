//! Tree-walking evaluation of published programs.

use std::cmp::Ordering;
use std::rc::Rc;
use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::Zero;
use rustc_hash::FxHashMap;
use tracing::trace;

use super::stack::ensure_sufficient_stack;
use super::value::Value;
use crate::builder::Label;
use crate::error::RuntimeError;
use crate::lowering::{Intrinsic, LanguageOps};
use crate::operation::Operation;
use crate::program::Program;

/// Maximum nesting of calls.
pub const MAX_CALL_DEPTH: usize = 512;

/// A host function callable from programs.
pub type Builtin = Rc<dyn Fn(&[Value]) -> Result<Value, RuntimeError>>;

/// How evaluation of an operation completed.
#[derive(Debug)]
enum Flow {
    /// Normally, with a value
    Value(Value),
    /// By branching to a label not yet found
    Branch(Label),
    /// By returning from the program
    Return(Value),
}

/// Evaluates an operand, passing branches and returns through.
macro_rules! value {
    ($flow:expr) => {
        match $flow? {
            Flow::Value(value) => value,
            other => return Ok(other),
        }
    };
}

struct Frame {
    locals: Vec<Value>,
    args: Vec<Value>,
}

/// Runs programs lowered with [`LanguageOps`].
pub struct Interpreter {
    ops: LanguageOps,
    programs: FxHashMap<String, Rc<Program>>,
    builtins: FxHashMap<String, Builtin>,
    depth: usize,
}

impl Interpreter {
    /// Creates an interpreter with the `new` builtin registered.
    pub fn new(ops: &LanguageOps) -> Self {
        let mut interpreter = Self {
            ops: ops.clone(),
            programs: FxHashMap::default(),
            builtins: FxHashMap::default(),
            depth: 0,
        };
        interpreter.register_builtin("new", |_| Ok(Value::new_object()));
        interpreter
    }

    /// Makes `program` callable under its name.
    ///
    /// The program must have been built over this interpreter's operation
    /// set, since custom operations are dispatched by id.
    pub fn register_program(&mut self, program: Program) -> Result<(), RuntimeError> {
        self.check_operations(&program)?;
        let name = program
            .name()
            .ok_or(RuntimeError::UnnamedProgram)?
            .to_string();
        self.programs.insert(name, Rc::new(program));
        Ok(())
    }

    /// Registers a host function.
    pub fn register_builtin(
        &mut self,
        name: &str,
        func: impl Fn(&[Value]) -> Result<Value, RuntimeError> + 'static,
    ) {
        self.builtins.insert(name.to_string(), Rc::new(func));
    }

    /// Calls a registered program or builtin by name.
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        self.invoke(Value::Function(name.to_string()), args)
    }

    /// Runs `program` with `args`.
    pub fn execute(&mut self, program: &Program, args: Vec<Value>) -> Result<Value, RuntimeError> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::StackOverflow(MAX_CALL_DEPTH));
        }
        self.check_operations(program)?;
        trace!(program = program.name().unwrap_or("<anonymous>"), depth = self.depth, "execute");

        let mut frame = Frame {
            locals: vec![Value::Null; program.local_count()],
            args,
        };
        self.depth += 1;
        let flow = self.sequence(&mut frame, program.body());
        self.depth -= 1;

        match flow? {
            Flow::Value(value) | Flow::Return(value) => Ok(value),
            Flow::Branch(label) => Err(RuntimeError::UnresolvedBranch(label)),
        }
    }

    fn check_operations(&self, program: &Program) -> Result<(), RuntimeError> {
        if Arc::ptr_eq(program.operations(), self.ops.operations()) {
            Ok(())
        } else {
            Err(RuntimeError::ForeignOperations(
                program.name().unwrap_or("<anonymous>").to_string(),
            ))
        }
    }

    fn invoke(&mut self, target: Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let Value::Function(name) = target else {
            return Err(RuntimeError::NotCallable(target.type_name()));
        };
        if let Some(program) = self.programs.get(&name).cloned() {
            return self.execute(&program, args);
        }
        if let Some(builtin) = self.builtins.get(&name).cloned() {
            return (*builtin)(&args);
        }
        Err(RuntimeError::UndefinedFunction(name))
    }

    /// Runs a sequence; a branch resumes after the matching label child or
    /// leaves the sequence if the label is elsewhere.
    fn sequence(&mut self, frame: &mut Frame, body: &[Operation]) -> Result<Flow, RuntimeError> {
        let mut result = Value::Null;
        let mut pc = 0;
        while let Some(op) = body.get(pc) {
            match self.eval(frame, op)? {
                Flow::Value(value) => {
                    result = value;
                    pc += 1;
                }
                Flow::Branch(label) => {
                    let target = body
                        .iter()
                        .position(|op| matches!(op, Operation::Label(l) if *l == label));
                    match target {
                        Some(index) => {
                            result = Value::Null;
                            pc = index + 1;
                        }
                        None => return Ok(Flow::Branch(label)),
                    }
                }
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Value(result))
    }

    fn eval(&mut self, frame: &mut Frame, op: &Operation) -> Result<Flow, RuntimeError> {
        ensure_sufficient_stack(|| self.eval_operation(frame, op))
    }

    fn eval_operation(&mut self, frame: &mut Frame, op: &Operation) -> Result<Flow, RuntimeError> {
        let value = match op {
            Operation::Block(body)
            | Operation::Tag { body, .. }
            | Operation::SourceSection { body, .. } => return self.sequence(frame, body),
            Operation::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                if value!(self.eval(frame, condition)).to_boolean() {
                    return self.eval(frame, then_value);
                }
                return self.eval(frame, else_value);
            }
            Operation::IfThen {
                condition,
                then_branch,
            } => {
                if value!(self.eval(frame, condition)).to_boolean() {
                    value!(self.eval(frame, then_branch));
                }
                Value::Null
            }
            Operation::IfThenElse {
                condition,
                then_branch,
                else_branch,
            } => {
                let branch = if value!(self.eval(frame, condition)).to_boolean() {
                    then_branch
                } else {
                    else_branch
                };
                value!(self.eval(frame, branch));
                Value::Null
            }
            Operation::While { condition, body } => {
                while value!(self.eval(frame, condition)).to_boolean() {
                    value!(self.eval(frame, body));
                }
                Value::Null
            }
            Operation::Label(_) => Value::Null,
            Operation::Branch(label) => return Ok(Flow::Branch(*label)),
            Operation::LoadLocal(slot) => frame
                .locals
                .get(slot.index())
                .cloned()
                .ok_or(RuntimeError::MissingLocal(*slot))?,
            Operation::StoreLocal { slot, value } => {
                let value = value!(self.eval(frame, value));
                let local = frame
                    .locals
                    .get_mut(slot.index())
                    .ok_or(RuntimeError::MissingLocal(*slot))?;
                *local = value.clone();
                value
            }
            Operation::LoadArgument(index) => frame.args.get(*index).cloned().unwrap_or(Value::Null),
            Operation::Constant(constant) => Value::from(constant),
            Operation::Return(value) => {
                let value = value!(self.eval(frame, value));
                return Ok(Flow::Return(value));
            }
            Operation::Custom { op, children } => {
                let intrinsic = self
                    .ops
                    .intrinsic(*op)
                    .ok_or(RuntimeError::UnsupportedOperation(*op))?;
                let mut operands = Vec::with_capacity(children.len());
                for child in children {
                    operands.push(value!(self.eval(frame, child)));
                }
                self.apply(intrinsic, operands)?
            }
        };
        Ok(Flow::Value(value))
    }

    fn apply(&mut self, intrinsic: Intrinsic, operands: Vec<Value>) -> Result<Value, RuntimeError> {
        let mut operands = operands.into_iter();
        let mut next = || operands.next().unwrap_or(Value::Null);

        match intrinsic {
            Intrinsic::ToBoolean => Ok(Value::Bool(next().to_boolean())),
            Intrinsic::LogicalNot => Ok(Value::Bool(!next().to_boolean())),
            Intrinsic::Add | Intrinsic::Sub | Intrinsic::Mul | Intrinsic::Div => {
                let (lhs, rhs) = (next(), next());
                arithmetic(intrinsic, lhs, rhs)
            }
            Intrinsic::LessThan => {
                let (lhs, rhs) = (next(), next());
                Ok(Value::Bool(compare(&lhs, &rhs)? == Ordering::Less))
            }
            Intrinsic::LessOrEqual => {
                let (lhs, rhs) = (next(), next());
                Ok(Value::Bool(compare(&lhs, &rhs)? != Ordering::Greater))
            }
            Intrinsic::Equal => {
                let (lhs, rhs) = (next(), next());
                Ok(Value::Bool(lhs == rhs))
            }
            Intrinsic::FunctionLiteral => match next() {
                Value::String(name) => Ok(Value::Function(name)),
                other => Err(RuntimeError::TypeError(format!(
                    "function name must be a string, got {}",
                    other.type_name()
                ))),
            },
            Intrinsic::ReadProperty => {
                let (receiver, key) = (next(), next());
                let object = as_object(&receiver)?;
                let key = property_key(&key)?;
                let value = object.borrow().get(&key).cloned().unwrap_or(Value::Null);
                Ok(value)
            }
            Intrinsic::WriteProperty => {
                let (receiver, key, value) = (next(), next(), next());
                let object = as_object(&receiver)?;
                object.borrow_mut().insert(property_key(&key)?, value.clone());
                Ok(value)
            }
            Intrinsic::Invoke => {
                let target = next();
                let args = operands.collect();
                self.invoke(target, args)
            }
        }
    }
}

fn arithmetic(intrinsic: Intrinsic, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    if intrinsic == Intrinsic::Add {
        if let (Value::String(_), _) | (_, Value::String(_)) = (&lhs, &rhs) {
            return Ok(Value::String(format!("{}{}", lhs, rhs)));
        }
    }

    if let (Value::Long(a), Value::Long(b)) = (&lhs, &rhs) {
        let checked = match intrinsic {
            Intrinsic::Add => a.checked_add(*b),
            Intrinsic::Sub => a.checked_sub(*b),
            Intrinsic::Mul => a.checked_mul(*b),
            _ if *b == 0 => return Err(RuntimeError::DivisionByZero),
            _ => a.checked_div(*b),
        };
        if let Some(n) = checked {
            return Ok(Value::Long(n));
        }
    }

    let (Some(a), Some(b)) = (lhs.to_bigint(), rhs.to_bigint()) else {
        return Err(RuntimeError::TypeError(format!(
            "{} expects numbers, got {} and {}",
            intrinsic.name(),
            lhs.type_name(),
            rhs.type_name()
        )));
    };
    let result: BigInt = match intrinsic {
        Intrinsic::Add => a + b,
        Intrinsic::Sub => a - b,
        Intrinsic::Mul => a * b,
        _ if b.is_zero() => return Err(RuntimeError::DivisionByZero),
        _ => a / b,
    };
    Ok(Value::from_bigint(result))
}

fn compare(lhs: &Value, rhs: &Value) -> Result<Ordering, RuntimeError> {
    match (lhs, rhs) {
        (Value::Long(a), Value::Long(b)) => Ok(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ => match (lhs.to_bigint(), rhs.to_bigint()) {
            (Some(a), Some(b)) => Ok(a.cmp(&b)),
            _ => Err(RuntimeError::TypeError(format!(
                "cannot compare {} with {}",
                lhs.type_name(),
                rhs.type_name()
            ))),
        },
    }
}

fn as_object(value: &Value) -> Result<&super::value::ObjectRef, RuntimeError> {
    match value {
        Value::Object(object) => Ok(object),
        other => Err(RuntimeError::TypeError(format!(
            "{} has no properties",
            other.type_name()
        ))),
    }
}

fn property_key(key: &Value) -> Result<String, RuntimeError> {
    key.to_property_key().ok_or_else(|| {
        RuntimeError::TypeError(format!("{} is not a valid property key", key.type_name()))
    })
}
