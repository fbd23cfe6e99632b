use std::fmt;

use serde_json::Value;
use tmem_types::{display_path, Path, PathKey};

use crate::error::{Result, TxnError};
use crate::guard::Guard;
use crate::operation::OperationCall;

/// `if` / `unless` guard on a statement.
#[derive(Clone, Debug)]
pub enum Condition {
    If(Guard),
    Unless(Guard),
}

impl Condition {
    pub fn guard(&self) -> &Guard {
        match self {
            Condition::If(guard) | Condition::Unless(guard) => guard,
        }
    }

    /// Whether the guard's result lets the statement run.
    pub fn satisfied_by(&self, result: bool) -> bool {
        match self {
            Condition::If(_) => result,
            Condition::Unless(_) => !result,
        }
    }
}

/// One declarative step of a transaction.
///
/// Exists only while a transaction compiles; only the low-level instructions
/// it produces are recorded.
#[derive(Clone, Debug)]
pub struct Statement {
    /// Node the operation applies to. Empty selects the root.
    pub select: Path,
    pub condition: Option<Condition>,
    pub validate: Option<Guard>,
    /// `None` for statements that only select and check guards.
    pub operation: Option<OperationCall>,
}

impl Statement {
    pub fn new(operation: OperationCall) -> Self {
        Self {
            select: Path::new(),
            condition: None,
            validate: None,
            operation: Some(operation),
        }
    }

    /// A statement without an operation, e.g. a standalone validation.
    pub fn guard_only() -> Self {
        Self {
            select: Path::new(),
            condition: None,
            validate: None,
            operation: None,
        }
    }

    pub fn select<I, K>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<PathKey>,
    {
        self.select = path.into_iter().map(Into::into).collect();
        self
    }

    pub fn when(mut self, guard: Guard) -> Self {
        self.condition = Some(Condition::If(guard));
        self
    }

    pub fn unless(mut self, guard: Guard) -> Self {
        self.condition = Some(Condition::Unless(guard));
        self
    }

    pub fn validate(mut self, guard: Guard) -> Self {
        self.validate = Some(guard);
        self
    }

    /// Parse the JSON statement shape: either a bare `["op", args…]` array or
    /// an object with optional `select`, `if`, `unless`, `validate` and an
    /// `operation`.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Array(_) | Value::String(_) => Ok(Self::new(parse_operation(value)?)),
            Value::Object(fields) => {
                let mut statement = Self::guard_only();
                for (field, v) in fields {
                    match field.as_str() {
                        "select" => statement.select = parse_path(v)?,
                        "if" => {
                            if statement.condition.is_some() {
                                return Err(invalid("both `if` and `unless` given"));
                            }
                            statement.condition = Some(Condition::If(parse_guard(v)?));
                        }
                        "unless" => {
                            if statement.condition.is_some() {
                                return Err(invalid("both `if` and `unless` given"));
                            }
                            statement.condition = Some(Condition::Unless(parse_guard(v)?));
                        }
                        "validate" => statement.validate = Some(parse_guard(v)?),
                        "operation" => statement.operation = Some(parse_operation(v)?),
                        other => return Err(invalid(format!("unknown field {other:?}"))),
                    }
                }
                Ok(statement)
            }
            other => Err(invalid(format!("{other} is not a statement"))),
        }
    }
}

impl From<OperationCall> for Statement {
    fn from(operation: OperationCall) -> Self {
        Self::new(operation)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{select: {}", display_path(&self.select))?;
        match &self.condition {
            Some(Condition::If(guard)) => write!(f, ", if: {guard}")?,
            Some(Condition::Unless(guard)) => write!(f, ", unless: {guard}")?,
            None => {}
        }
        if let Some(guard) = &self.validate {
            write!(f, ", validate: {guard}")?;
        }
        if let Some(operation) = &self.operation {
            write!(f, ", operation: {operation}")?;
        }
        write!(f, "}}")
    }
}

/// Parse a whole transaction: a JSON array of statements.
pub fn parse_transaction(value: &Value) -> Result<Vec<Statement>> {
    let Value::Array(items) = value else {
        return Err(invalid("transaction should be an array of statements"));
    };
    items.iter().map(Statement::from_value).collect()
}

fn invalid(message: impl Into<String>) -> TxnError {
    TxnError::InvalidStatement(message.into())
}

fn parse_key(value: &Value) -> Result<PathKey> {
    PathKey::from_value(value).map_err(|e| invalid(e.to_string()))
}

fn parse_path(value: &Value) -> Result<Path> {
    match value {
        Value::Null => Ok(Path::new()),
        Value::Array(keys) => keys.iter().map(parse_key).collect(),
        single => Ok(vec![parse_key(single)?]),
    }
}

/// `"name"` or `["name", args…]`.
fn split_call(value: &Value, what: &str) -> Result<(String, Vec<Value>)> {
    match value {
        Value::String(name) => Ok((name.clone(), Vec::new())),
        Value::Array(items) => match items.split_first() {
            Some((Value::String(name), args)) => Ok((name.clone(), args.to_vec())),
            _ => Err(invalid(format!("{what} {value} should start with a name"))),
        },
        other => Err(invalid(format!("{what} {other} should be a name or an array"))),
    }
}

fn parse_guard(value: &Value) -> Result<Guard> {
    let (name, args) = split_call(value, "condition")?;
    Ok(Guard::builtin(name, args))
}

fn parse_operation(value: &Value) -> Result<OperationCall> {
    let (name, args) = split_call(value, "operation")?;
    Ok(OperationCall::new(name, args))
}
