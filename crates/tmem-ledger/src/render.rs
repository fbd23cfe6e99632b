//! Human-readable JSON rendering of operation logs.
//!
//! One instruction per line, opcode names padded so argument counts line up:
//!
//! ```text
//! [
//! "select",  1,  "posts",
//! "aAdd",    1,  {"text":"C"},
//! "select",  0
//! ]
//! ```
//!
//! The output is a plain JSON array, so any JSON parser reads it back into
//! the identical flat token sequence.

use serde::Serialize;
use tmem_types::OpLog;

use crate::error::{LedgerError, Result};

/// Column the argument count starts at.
const COUNT_COLUMN: usize = 11;

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| LedgerError::Render(e.to_string()))
}

/// Render a log as pretty JSON.
pub fn render(log: &OpLog) -> Result<String> {
    let mut lines = Vec::new();
    for instruction in log.instructions() {
        let instruction = instruction?;
        let mut line = to_json(instruction.opcode.as_str())?;
        line.push(',');
        let pad = COUNT_COLUMN.saturating_sub(line.len()).max(1);
        line.push_str(&" ".repeat(pad));
        line.push_str(&instruction.args.len().to_string());
        if !instruction.args.is_empty() {
            let args = instruction
                .args
                .iter()
                .map(to_json)
                .collect::<Result<Vec<_>>>()?;
            line.push_str(",  ");
            line.push_str(&args.join(", "));
        }
        lines.push(line);
    }

    if lines.is_empty() {
        return Ok("[\n]".to_string());
    }
    Ok(format!("[\n{}\n]", lines.join(",\n")))
}

/// Parse rendered (or any JSON) text back into a log, checking framing.
pub fn parse(text: &str) -> Result<OpLog> {
    let tokens: Vec<serde_json::Value> =
        serde_json::from_str(text).map_err(|e| LedgerError::Parse(e.to_string()))?;
    let log = OpLog::from_tokens(tokens);
    log.validate()?;
    Ok(log)
}
