use banana_core::{Decision, stats};
use rand::Rng;
use std::collections::HashMap;

use super::ScriptError;
use super::parser::{BinaryOp, Expr, Function, Stmt, UnaryOp};

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Number(f64),
    Bool(bool),
    List(Vec<f64>),
    Decision(Decision),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Decision(_) => "decision",
        }
    }
}

enum Flow {
    Continue,
    Return(Value),
}

fn runtime<T>(message: impl Into<String>) -> Result<T, ScriptError> {
    Err(ScriptError::Runtime(message.into()))
}

/// Evaluates one call of a compiled `decide` function
///
/// The only state visible to the script is its two arguments, its own
/// local variables and the random generator behind `random()`.
pub struct Interpreter<'a, R: Rng + ?Sized> {
    scopes: Vec<HashMap<String, Value>>,
    rng: &'a mut R,
}

impl<'a, R: Rng + ?Sized> Interpreter<'a, R> {
    pub fn new(rng: &'a mut R) -> Self {
        Self {
            scopes: Vec::new(),
            rng,
        }
    }

    pub fn call(
        &mut self,
        function: &Function,
        history: &[f64],
        price: f64,
    ) -> Result<Decision, ScriptError> {
        let mut frame = HashMap::new();
        if let [history_name, price_name] = function.params.as_slice() {
            frame.insert(history_name.clone(), Value::List(history.to_vec()));
            frame.insert(price_name.clone(), Value::Number(price));
        } else {
            return Err(ScriptError::WrongArity(function.params.len()));
        }
        self.scopes = vec![frame];

        match self.block(&function.body)? {
            Flow::Return(Value::Decision(decision)) => Ok(decision),
            Flow::Return(other) => Err(ScriptError::MalformedResult(format!(
                "expected buy(..), sell(..) or hold(), got a {}",
                other.type_name()
            ))),
            Flow::Continue => Err(ScriptError::MalformedResult(
                "function finished without returning a decision".to_string(),
            )),
        }
    }

    fn block(&mut self, stmts: &[Stmt]) -> Result<Flow, ScriptError> {
        self.scopes.push(HashMap::new());
        let result = self.statements(stmts);
        self.scopes.pop();
        result
    }

    fn statements(&mut self, stmts: &[Stmt]) -> Result<Flow, ScriptError> {
        for stmt in stmts {
            match stmt {
                Stmt::Let(name, expr) => {
                    let value = self.eval(expr)?;
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.insert(name.clone(), value);
                    }
                }
                Stmt::Assign(name, expr) => {
                    let value = self.eval(expr)?;
                    match self.scopes.iter_mut().rev().find_map(|s| s.get_mut(name)) {
                        Some(slot) => *slot = value,
                        None => return runtime(format!("assignment to undeclared `{}`", name)),
                    }
                }
                Stmt::If {
                    condition,
                    then_branch,
                    else_branch,
                } => {
                    let flow = if self.truthy(condition)? {
                        self.block(then_branch)?
                    } else {
                        self.block(else_branch)?
                    };
                    if let Flow::Return(value) = flow {
                        return Ok(Flow::Return(value));
                    }
                }
                Stmt::Return(expr) => return Ok(Flow::Return(self.eval(expr)?)),
            }
        }
        Ok(Flow::Continue)
    }

    fn truthy(&mut self, expr: &Expr) -> Result<bool, ScriptError> {
        match self.eval(expr)? {
            Value::Bool(b) => Ok(b),
            other => runtime(format!("condition must be a bool, got a {}", other.type_name())),
        }
    }

    fn number(&mut self, expr: &Expr) -> Result<f64, ScriptError> {
        match self.eval(expr)? {
            Value::Number(n) => Ok(n),
            other => runtime(format!("expected a number, got a {}", other.type_name())),
        }
    }

    fn list(&mut self, expr: &Expr) -> Result<Vec<f64>, ScriptError> {
        match self.eval(expr)? {
            Value::List(values) => Ok(values),
            other => runtime(format!("expected a list, got a {}", other.type_name())),
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, ScriptError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Var(name) => self
                .scopes
                .iter()
                .rev()
                .find_map(|s| s.get(name))
                .cloned()
                .map_or_else(|| runtime(format!("unknown variable `{}`", name)), Ok),
            Expr::Unary(UnaryOp::Neg, operand) => Ok(Value::Number(-self.number(operand)?)),
            Expr::Unary(UnaryOp::Not, operand) => Ok(Value::Bool(!self.truthy(operand)?)),
            Expr::Binary(BinaryOp::And, lhs, rhs) => {
                Ok(Value::Bool(self.truthy(lhs)? && self.truthy(rhs)?))
            }
            Expr::Binary(BinaryOp::Or, lhs, rhs) => {
                Ok(Value::Bool(self.truthy(lhs)? || self.truthy(rhs)?))
            }
            Expr::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs),
            Expr::Index(target, index) => {
                let values = self.list(target)?;
                let index = self.number(index)?;
                if index.fract() != 0.0 {
                    return runtime(format!("index {} is not an integer", index));
                }
                let len = values.len() as f64;
                let resolved = if index < 0.0 { len + index } else { index };
                if resolved < 0.0 || resolved >= len {
                    return runtime(format!("index {} out of range for length {}", index, len));
                }
                Ok(Value::Number(values[resolved as usize]))
            }
            Expr::Call(name, args) => self.call_builtin(name, args),
        }
    }

    fn binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Value, ScriptError> {
        let left = self.eval(lhs)?;
        let right = self.eval(rhs)?;

        let (a, b) = match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => (*a, *b),
            (Value::Bool(a), Value::Bool(b)) => match op {
                BinaryOp::Eq => return Ok(Value::Bool(a == b)),
                BinaryOp::NotEq => return Ok(Value::Bool(a != b)),
                _ => return runtime(format!("operator {:?} is not defined on bools", op)),
            },
            _ => {
                return runtime(format!(
                    "operator {:?} needs two numbers, got {} and {}",
                    op,
                    left.type_name(),
                    right.type_name()
                ));
            }
        };

        let number = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div | BinaryOp::Rem if b == 0.0 => return runtime("division by zero"),
            BinaryOp::Div => a / b,
            BinaryOp::Rem => a % b,
            BinaryOp::Lt => return Ok(Value::Bool(a < b)),
            BinaryOp::Le => return Ok(Value::Bool(a <= b)),
            BinaryOp::Gt => return Ok(Value::Bool(a > b)),
            BinaryOp::Ge => return Ok(Value::Bool(a >= b)),
            BinaryOp::Eq => return Ok(Value::Bool(a == b)),
            BinaryOp::NotEq => return Ok(Value::Bool(a != b)),
            BinaryOp::And | BinaryOp::Or => return runtime("logical operator on numbers"),
        };
        finite(number)
    }

    fn call_builtin(&mut self, name: &str, args: &[Expr]) -> Result<Value, ScriptError> {
        let arity = |n: usize| -> Result<(), ScriptError> {
            if args.len() == n {
                Ok(())
            } else {
                runtime(format!("{}() takes {} argument(s), got {}", name, n, args.len()))
            }
        };

        match name {
            "hold" => {
                arity(0)?;
                Ok(Value::Decision(Decision::hold()))
            }
            "buy" | "sell" => {
                arity(1)?;
                let amount = self.number(&args[0])?;
                if !amount.is_finite() || amount < 0.0 {
                    return Err(ScriptError::MalformedResult(format!(
                        "trade amount must be a non-negative number, got {}",
                        amount
                    )));
                }
                Ok(Value::Decision(if name == "buy" {
                    Decision::buy(amount)
                } else {
                    Decision::sell(amount)
                }))
            }
            "random" => {
                arity(0)?;
                Ok(Value::Number(self.rng.r#gen::<f64>()))
            }
            "len" => {
                arity(1)?;
                Ok(Value::Number(self.list(&args[0])?.len() as f64))
            }
            "last" => {
                arity(2)?;
                let values = self.list(&args[0])?;
                let n = self.number(&args[1])?.max(0.0) as usize;
                Ok(Value::List(stats::trailing(&values, n).to_vec()))
            }
            "returns" => {
                arity(1)?;
                Ok(Value::List(stats::simple_returns(&self.list(&args[0])?)))
            }
            "mean" => {
                arity(1)?;
                match stats::mean(&self.list(&args[0])?) {
                    Some(m) => Ok(Value::Number(m)),
                    None => runtime("mean() of an empty list"),
                }
            }
            "stddev" => {
                arity(1)?;
                Ok(Value::Number(stats::population_std(&self.list(&args[0])?)))
            }
            "sum" => {
                arity(1)?;
                finite(self.list(&args[0])?.iter().sum())
            }
            "min" | "max" => self.extremum(name, args),
            "abs" | "sqrt" | "ln" | "exp" | "floor" | "ceil" | "round" => {
                arity(1)?;
                let x = self.number(&args[0])?;
                let y = match name {
                    "abs" => x.abs(),
                    "sqrt" if x < 0.0 => return runtime("sqrt() of a negative number"),
                    "sqrt" => x.sqrt(),
                    "ln" if x <= 0.0 => return runtime("ln() of a non-positive number"),
                    "ln" => x.ln(),
                    "exp" => x.exp(),
                    "floor" => x.floor(),
                    "ceil" => x.ceil(),
                    _ => x.round(),
                };
                finite(y)
            }
            "pow" => {
                arity(2)?;
                let base = self.number(&args[0])?;
                let exponent = self.number(&args[1])?;
                finite(base.powf(exponent))
            }
            "clamp" => {
                arity(3)?;
                let x = self.number(&args[0])?;
                let lo = self.number(&args[1])?;
                let hi = self.number(&args[2])?;
                if lo > hi {
                    return runtime("clamp() lower bound above upper bound");
                }
                Ok(Value::Number(x.clamp(lo, hi)))
            }
            _ => runtime(format!("unknown function `{}`", name)),
        }
    }

    /// `min(list)` / `max(list)` or `min(a, b)` / `max(a, b)`
    fn extremum(&mut self, name: &str, args: &[Expr]) -> Result<Value, ScriptError> {
        let values = match args {
            [single] => self.list(single)?,
            [a, b] => vec![self.number(a)?, self.number(b)?],
            _ => return runtime(format!("{}() takes a list or two numbers", name)),
        };
        let folded = if name == "min" {
            values.iter().copied().reduce(f64::min)
        } else {
            values.iter().copied().reduce(f64::max)
        };
        match folded {
            Some(v) => Ok(Value::Number(v)),
            None => runtime(format!("{}() of an empty list", name)),
        }
    }
}

fn finite(value: f64) -> Result<Value, ScriptError> {
    if value.is_finite() {
        Ok(Value::Number(value))
    } else {
        runtime("arithmetic produced a non-finite value")
    }
}
