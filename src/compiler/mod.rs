//! Compiler collaborator: program source in, [`Program`] or diagnostics out.
//!
//! The loader only depends on the [`Compiler`] trait. [`ProgramCompiler`] is
//! the implementation the binary ships with.

mod parser;

use std::collections::HashMap;

use regex::Regex;
use thiserror::Error;

use crate::metrics::MetricStore;
use crate::vm::{Instr, Program};

use parser::Stmt;

/// One compile diagnostic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{file}:{line}:{column}: {message}")]
pub struct CompileError {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl CompileError {
    pub fn new(file: &str, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            file: file.to_string(),
            line,
            column,
            message: message.into(),
        }
    }
}

/// Either a program or a non-empty, line-ordered list of diagnostics.
pub type CompileOutcome = Result<Program, Vec<CompileError>>;

/// Turns program source into an executable [`Program`].
///
/// Implementations must not leave anything behind in `metrics` when they
/// return diagnostics.
pub trait Compiler: Send + Sync {
    fn compile(&self, name: &str, source: &[u8], metrics: &MetricStore) -> CompileOutcome;
}

/// Compiler for the line-oriented counter language.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProgramCompiler;

impl ProgramCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl Compiler for ProgramCompiler {
    fn compile(&self, name: &str, source: &[u8], metrics: &MetricStore) -> CompileOutcome {
        let text = std::str::from_utf8(source).map_err(|e| {
            vec![CompileError::new(
                name,
                1,
                1,
                format!("source is not valid UTF-8: {e}"),
            )]
        })?;

        let (stmts, mut errors) = parser::parse(name, text);
        if stmts.is_empty() && errors.is_empty() {
            errors.push(CompileError::new(name, 1, 1, "program has no statements"));
        }

        // Counter declarations are visible to every rule regardless of order.
        let mut declared: HashMap<&str, (usize, usize)> = HashMap::new();
        let mut counter_names: Vec<&str> = Vec::new();
        for stmt in &stmts {
            if let Stmt::Counter {
                name: counter,
                line,
                column,
            } = stmt
            {
                if let Some((first_line, _)) = declared.get(counter.as_str()) {
                    errors.push(CompileError::new(
                        name,
                        *line,
                        *column,
                        format!("counter `{counter}` already declared on line {first_line}"),
                    ));
                } else {
                    declared.insert(counter, (*line, counter_names.len()));
                    counter_names.push(counter);
                }
            }
        }

        let mut regexes = Vec::new();
        let mut code = Vec::new();
        for stmt in &stmts {
            let Stmt::Rule {
                pattern,
                line,
                column,
                actions,
            } = stmt
            else {
                continue;
            };

            let regex = match Regex::new(pattern) {
                Ok(regex) => regex,
                Err(e) => {
                    errors.push(CompileError::new(
                        name,
                        *line,
                        *column,
                        format!("invalid regex /{pattern}/: {e}"),
                    ));
                    continue;
                }
            };

            let mut incs = Vec::with_capacity(actions.len());
            for (counter, action_column) in actions {
                match declared.get(counter.as_str()) {
                    Some((_, index)) => incs.push(Instr::Inc(*index)),
                    None => errors.push(CompileError::new(
                        name,
                        *line,
                        *action_column,
                        format!("unknown counter `{counter}`"),
                    )),
                }
            }

            code.push(Instr::Match(regexes.len()));
            regexes.push(regex);
            let end = code.len() + 1 + incs.len();
            code.push(Instr::Jnm(end));
            code.extend(incs);
        }
        code.push(Instr::Stop);

        if !errors.is_empty() {
            errors.sort_by_key(|e| (e.line, e.column));
            return Err(errors);
        }

        let counters = counter_names
            .iter()
            .map(|counter| metrics.declare(counter, name))
            .collect();

        Ok(Program::new(name.to_string(), regexes, counters, code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "\
counter lines_total
counter errors_total

/./ { lines_total++ }
/ERROR/ { errors_total++ }
";

    #[test]
    fn test_compile_valid_program() {
        let store = MetricStore::new();
        let program = ProgramCompiler::new()
            .compile("ok.mtail", VALID.as_bytes(), &store)
            .unwrap();

        assert_eq!(program.name(), "ok.mtail");
        assert_eq!(
            program.code(),
            &[
                Instr::Match(0),
                Instr::Jnm(3),
                Instr::Inc(0),
                Instr::Match(1),
                Instr::Jnm(6),
                Instr::Inc(1),
                Instr::Stop,
            ]
        );
        assert_eq!(store.len(), 2);

        assert_eq!(program.process_line("ERROR boom"), 2);
        assert_eq!(program.process_line("fine"), 1);
        assert_eq!(store.get("lines_total").unwrap().value(), 2);
        assert_eq!(store.get("errors_total").unwrap().value(), 1);
    }

    #[test]
    fn test_compile_errors_leave_namespace_untouched() {
        let store = MetricStore::new();
        let source = "counter seen\n/(/ { seen++ }\n/x/ { missing++ }\ncounter seen\n";

        let errors = ProgramCompiler::new()
            .compile("bad.mtail", source.as_bytes(), &store)
            .unwrap_err();

        assert_eq!(errors.len(), 3);
        assert!(errors[0].message.starts_with("invalid regex"));
        assert_eq!(errors[1].message, "unknown counter `missing`");
        assert_eq!(errors[1].to_string(), "bad.mtail:3:7: unknown counter `missing`");
        assert!(errors[2].message.contains("already declared on line 1"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_compile_rejects_empty_and_non_utf8() {
        let store = MetricStore::new();
        let compiler = ProgramCompiler::new();

        let errors = compiler.compile("empty.mtail", b"# nothing\n", &store).unwrap_err();
        assert_eq!(errors[0].message, "program has no statements");

        let errors = compiler
            .compile("bin.mtail", &[0xff, 0xfe, 0x00], &store)
            .unwrap_err();
        assert!(errors[0].message.contains("not valid UTF-8"));
    }

    #[test]
    fn test_recompile_shares_counters() {
        let store = MetricStore::new();
        let compiler = ProgramCompiler::new();

        let first = compiler.compile("a.mtail", VALID.as_bytes(), &store).unwrap();
        first.process_line("ERROR");
        let second = compiler.compile("a.mtail", VALID.as_bytes(), &store).unwrap();
        second.process_line("ERROR");

        assert_eq!(store.get("errors_total").unwrap().value(), 2);
    }
}
