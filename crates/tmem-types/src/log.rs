use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::instruction::{read_instruction, Instruction, InstructionRef};

/// Append-only low-level operation log.
///
/// The log is a flat token sequence
/// `[opcode, argCount, arg1…argN, opcode, argCount, …]`; each instruction is
/// self-delimiting through its argument count. It serializes as a plain JSON
/// array of tokens.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpLog {
    tokens: Vec<Value>,
}

impl OpLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing tokens. Framing is not checked until decoded or replayed.
    pub fn from_tokens(tokens: Vec<Value>) -> Self {
        Self { tokens }
    }

    pub fn push(&mut self, instruction: &Instruction) {
        instruction.write_tokens(&mut self.tokens);
    }

    /// Append all tokens of another log.
    pub fn extend(&mut self, other: &OpLog) {
        self.tokens.extend(other.tokens.iter().cloned());
    }

    pub fn tokens(&self) -> &[Value] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<Value> {
        self.tokens
    }

    /// Number of tokens (not instructions).
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Decode the log instruction by instruction.
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions {
            tokens: &self.tokens,
            index: 0,
            failed: false,
        }
    }

    /// Verify framing of every instruction and return the instruction count.
    pub fn validate(&self) -> Result<usize> {
        self.instructions().try_fold(0, |count, item| item.map(|_| count + 1))
    }
}

impl From<Vec<Value>> for OpLog {
    fn from(tokens: Vec<Value>) -> Self {
        Self::from_tokens(tokens)
    }
}

/// Iterator over the instructions of an [`OpLog`]. Stops after the first
/// framing error.
pub struct Instructions<'a> {
    tokens: &'a [Value],
    index: usize,
    failed: bool,
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<InstructionRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.index >= self.tokens.len() {
            return None;
        }
        match read_instruction(self.tokens, self.index) {
            Ok((instruction, next)) => {
                self.index = next;
                Some(Ok(instruction))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TypeError;
    use crate::instruction::Opcode;
    use crate::path::PathKey;
    use serde_json::json;

    #[test]
    fn push_appends_flat_tokens() {
        let mut log = OpLog::new();
        log.push(&Instruction::select(&[PathKey::from("list")]));
        log.push(&Instruction::new(Opcode::AAdd, vec![json!("A")]));
        assert_eq!(
            log.tokens(),
            &[json!("select"), json!(1), json!("list"), json!("aAdd"), json!(1), json!("A")]
        );
        assert_eq!(log.validate().unwrap(), 2);
    }

    #[test]
    fn serializes_as_token_array() {
        let log = OpLog::from_tokens(vec![json!("aSort"), json!(0)]);
        assert_eq!(serde_json::to_value(&log).unwrap(), json!(["aSort", 0]));
        let back: OpLog = serde_json::from_value(json!(["aSort", 0])).unwrap();
        assert_eq!(back, log);
    }

    #[test]
    fn decoding_stops_at_first_error() {
        let log = OpLog::from_tokens(vec![json!("aSort"), json!(0), json!("bogus"), json!(0)]);
        let items: Vec<_> = log.instructions().collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(TypeError::UnknownOpcode(_))));
        assert!(log.validate().is_err());
    }
}
