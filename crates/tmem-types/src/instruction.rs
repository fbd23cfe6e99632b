use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;
use crate::path::PathKey;

/// Low-level opcodes. The wire names are part of the log format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    #[serde(rename = "select")]
    Select,
    #[serde(rename = "aSet")]
    ASet,
    #[serde(rename = "hSet")]
    HSet,
    #[serde(rename = "aAdd")]
    AAdd,
    #[serde(rename = "aDelete")]
    ADelete,
    #[serde(rename = "hDelete")]
    HDelete,
    #[serde(rename = "aSort")]
    ASort,
    #[serde(rename = "aSortBy")]
    ASortBy,
}

impl Opcode {
    pub const ALL: [Opcode; 8] = [
        Opcode::Select,
        Opcode::ASet,
        Opcode::HSet,
        Opcode::AAdd,
        Opcode::ADelete,
        Opcode::HDelete,
        Opcode::ASort,
        Opcode::ASortBy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Opcode::Select => "select",
            Opcode::ASet => "aSet",
            Opcode::HSet => "hSet",
            Opcode::AAdd => "aAdd",
            Opcode::ADelete => "aDelete",
            Opcode::HDelete => "hDelete",
            Opcode::ASort => "aSort",
            Opcode::ASortBy => "aSortBy",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Opcode {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Opcode::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| TypeError::UnknownOpcode(s.to_string()))
    }
}

/// One owned low-level instruction: an opcode and its arguments.
///
/// Instructions are pure and conditionless. On the wire they occupy
/// `2 + args.len()` tokens: `[opcode, argCount, args…]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub args: Vec<Value>,
}

impl Instruction {
    pub fn new(opcode: Opcode, args: Vec<Value>) -> Self {
        Self { opcode, args }
    }

    /// `select` with the full path as arguments. An empty path selects the root.
    pub fn select(path: &[PathKey]) -> Self {
        Self::new(Opcode::Select, path.iter().map(PathKey::to_value).collect())
    }

    /// Encode into flat tokens.
    pub fn to_tokens(&self) -> Vec<Value> {
        let mut tokens = Vec::with_capacity(self.args.len() + 2);
        self.write_tokens(&mut tokens);
        tokens
    }

    pub(crate) fn write_tokens(&self, out: &mut Vec<Value>) {
        out.push(Value::String(self.opcode.as_str().to_string()));
        out.push(Value::from(self.args.len() as u64));
        out.extend(self.args.iter().cloned());
    }
}

/// A borrowed view of one instruction inside a token stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstructionRef<'a> {
    pub opcode: Opcode,
    pub args: &'a [Value],
    /// Index of the opcode token in the stream.
    pub offset: usize,
}

impl InstructionRef<'_> {
    pub fn to_owned(&self) -> Instruction {
        Instruction::new(self.opcode, self.args.to_vec())
    }
}

/// Read the instruction starting at `index`; returns it and the index of the
/// next instruction.
pub fn read_instruction(tokens: &[Value], index: usize) -> crate::error::Result<(InstructionRef<'_>, usize)> {
    let name = tokens.get(index).ok_or_else(|| TypeError::Truncated {
        index,
        reason: "missing opcode".into(),
    })?;
    let opcode = match name {
        Value::String(s) => s.parse::<Opcode>()?,
        other => return Err(TypeError::UnknownOpcode(other.to_string())),
    };

    let count = tokens.get(index + 1).ok_or_else(|| TypeError::Truncated {
        index: index + 1,
        reason: format!("missing argument count for {opcode}"),
    })?;
    let count = count
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| TypeError::InvalidArgCount {
            index: index + 1,
            found: count.to_string(),
        })?;

    let start = index + 2;
    let end = start.checked_add(count).filter(|end| *end <= tokens.len());
    let end = end.ok_or_else(|| TypeError::Truncated {
        index: start,
        reason: format!("{opcode} declares {count} arguments, {} available", tokens.len() - start.min(tokens.len())),
    })?;

    Ok((
        InstructionRef {
            opcode,
            args: &tokens[start..end],
            offset: index,
        },
        end,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn opcode_names_round_trip() {
        for op in Opcode::ALL {
            assert_eq!(op.as_str().parse::<Opcode>().unwrap(), op);
        }
        assert!("aPush".parse::<Opcode>().is_err());
    }

    #[test]
    fn select_encodes_path() {
        let path = vec![PathKey::from("posts"), PathKey::Index(0)];
        assert_eq!(
            Instruction::select(&path).to_tokens(),
            vec![json!("select"), json!(2), json!("posts"), json!(0)]
        );
        assert_eq!(Instruction::select(&[]).to_tokens(), vec![json!("select"), json!(0)]);
    }

    #[test]
    fn reads_self_delimited_instructions() {
        let tokens = vec![json!("aAdd"), json!(1), json!("A"), json!("aSort"), json!(0)];
        let (first, next) = read_instruction(&tokens, 0).unwrap();
        assert_eq!(first.opcode, Opcode::AAdd);
        assert_eq!(first.args, &[json!("A")]);
        assert_eq!(next, 3);
        let (second, next) = read_instruction(&tokens, next).unwrap();
        assert_eq!(second.opcode, Opcode::ASort);
        assert!(second.args.is_empty());
        assert_eq!(next, tokens.len());
    }

    #[test]
    fn rejects_truncated_arguments() {
        let tokens = vec![json!("hSet"), json!(2), json!("k")];
        assert!(matches!(
            read_instruction(&tokens, 0),
            Err(TypeError::Truncated { .. })
        ));
    }

    #[test]
    fn rejects_bad_count() {
        let tokens = vec![json!("aAdd"), json!("one"), json!("A")];
        assert!(matches!(
            read_instruction(&tokens, 0),
            Err(TypeError::InvalidArgCount { index: 1, .. })
        ));
    }
}
