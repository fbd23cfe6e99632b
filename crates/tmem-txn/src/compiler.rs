use serde_json::Value;
use tmem_ledger::{resolve, select, ReplayEngine};
use tmem_types::{display_path, OpLog, Path};
use tracing::{debug, info, warn};

use crate::error::{Result, TxnError};
use crate::operation::{compile, OperationKind};
use crate::rollback::Rollback;
use crate::statement::Statement;

/// Apply a transaction of statements to `document` and return the equivalent
/// low-level log.
///
/// Each statement is compiled to low-level instructions that are applied
/// immediately. If any statement fails, every applied instruction is undone
/// in reverse order and the document is left exactly as it was.
///
/// The caller provides single-writer discipline (see `tmem-gate`).
pub fn update(document: &mut Value, statements: &[Statement]) -> Result<OpLog> {
    let mut compilation = Compilation::default();

    for (index, statement) in statements.iter().enumerate() {
        debug!(index, statement = %statement, "compiling statement");
        if let Err(cause) = compilation.step(document, statement) {
            let undone = compilation.unwind(document);
            warn!(index, undone, error = %cause, "transaction aborted");
            return Err(TxnError::Aborted {
                index,
                statement: statement.to_string(),
                cause: Box::new(cause),
            });
        }
    }

    info!(
        statements = statements.len(),
        tokens = compilation.log.len(),
        "transaction committed"
    );
    Ok(compilation.log)
}

/// State owned by one `update` call.
#[derive(Default)]
struct Compilation {
    /// Path of the currently selected node; starts at the root.
    selection: Path,
    rollbacks: Vec<Rollback>,
    log: OpLog,
}

impl Compilation {
    fn step(&mut self, document: &mut Value, statement: &Statement) -> Result<()> {
        if statement.select != self.selection {
            let instruction = select(document, &statement.select).map_err(TxnError::Selection)?;
            self.selection = ReplayEngine::apply(document, self.selection.clone(), &instruction)?;
            self.log.push(&instruction);
        } else {
            debug!(path = %display_path(&self.selection), "select elided");
        }

        if let Some(condition) = &statement.condition {
            let selected = resolve(document, &self.selection)?;
            let result = condition.guard().evaluate(document, selected)?;
            if !condition.satisfied_by(result) {
                debug!("condition not satisfied, skipping operation");
                return Ok(());
            }
        }

        if let Some(validation) = &statement.validate {
            let selected = resolve(document, &self.selection)?;
            if !validation.evaluate(document, selected)? {
                return Err(TxnError::ValidationFailed);
            }
        }

        let Some(call) = &statement.operation else {
            return Ok(());
        };
        let kind: OperationKind = call.name.parse()?;
        let compiled = {
            let node = resolve(document, &self.selection)?;
            compile(kind, &self.selection, node, &call.args)?
        };

        if let Some(instruction) = compiled.instruction {
            self.selection = ReplayEngine::apply(document, self.selection.clone(), &instruction)?;
            self.rollbacks.push(compiled.rollback);
            self.log.push(&instruction);
        }
        Ok(())
    }

    /// Undo every applied instruction, newest first. Returns how many were
    /// undone.
    fn unwind(&mut self, document: &mut Value) -> usize {
        let mut undone = 0;
        while let Some(rollback) = self.rollbacks.pop() {
            match rollback.undo(document) {
                Ok(()) => undone += 1,
                Err(e) => warn!(error = %e, "rollback could not be applied"),
            }
        }
        undone
    }
}
