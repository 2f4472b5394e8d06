//! Compiled program instances.
//!
//! A [`Program`] is immutable once built. Reloading a file builds a new
//! `Program`; whoever still holds the old one keeps a valid instance.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::metrics::Counter;

/// Bytecode instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    /// Test the current line against a regex (index into the regex pool) and set the match flag
    Match(usize),
    /// Jump to the target if the last match failed
    Jnm(usize),
    /// Increment a counter (index into the counter pool)
    Inc(usize),
    /// End of program
    Stop,
}

/// Executable form of one program file.
#[derive(Debug)]
pub struct Program {
    name: String,
    regexes: Vec<Regex>,
    counters: Vec<Arc<Counter>>,
    code: Vec<Instr>,
}

impl Program {
    pub(crate) fn new(
        name: String,
        regexes: Vec<Regex>,
        counters: Vec<Arc<Counter>>,
        code: Vec<Instr>,
    ) -> Self {
        Self {
            name,
            regexes,
            counters,
            code,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> &[Instr] {
        &self.code
    }

    /// Counters this program increments, in declaration order.
    pub fn counters(&self) -> &[Arc<Counter>] {
        &self.counters
    }

    /// Run the program against one log line.
    ///
    /// Returns how many counter increments the line caused.
    pub fn process_line(&self, line: &str) -> usize {
        let mut pc = 0;
        let mut matched = false;
        let mut increments = 0;

        while let Some(instr) = self.code.get(pc) {
            match *instr {
                Instr::Match(re) => {
                    matched = self.regexes.get(re).is_some_and(|r| r.is_match(line));
                    pc += 1;
                }
                Instr::Jnm(target) => {
                    pc = if matched { pc + 1 } else { target };
                }
                Instr::Inc(counter) => {
                    if let Some(c) = self.counters.get(counter) {
                        c.inc();
                        increments += 1;
                    }
                    pc += 1;
                }
                Instr::Stop => break,
            }
        }

        increments
    }

    /// Human-readable bytecode listing, as rendered by `Display`.
    pub fn dump(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bytecode for {}:", self.name)?;
        for (pc, instr) in self.code.iter().enumerate() {
            match *instr {
                Instr::Match(re) => {
                    let pattern = self.regexes.get(re).map(|r| r.as_str()).unwrap_or("?");
                    writeln!(f, "  {pc:04} match  /{pattern}/")?;
                }
                Instr::Jnm(target) => writeln!(f, "  {pc:04} jnm    {target:04}")?,
                Instr::Inc(counter) => {
                    let name = self.counters.get(counter).map(|c| c.name()).unwrap_or("?");
                    writeln!(f, "  {pc:04} inc    {name}")?;
                }
                Instr::Stop => writeln!(f, "  {pc:04} stop")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricStore;

    fn error_counter_program(store: &MetricStore) -> Program {
        let errors = store.declare("errors_total", "t.mtail");
        Program::new(
            "t.mtail".to_string(),
            vec![Regex::new("ERROR").unwrap()],
            vec![errors],
            vec![Instr::Match(0), Instr::Jnm(3), Instr::Inc(0), Instr::Stop],
        )
    }

    #[test]
    fn test_process_line_increments_on_match() {
        let store = MetricStore::new();
        let program = error_counter_program(&store);

        assert_eq!(program.process_line("ERROR disk full"), 1);
        assert_eq!(program.process_line("INFO all good"), 0);
        assert_eq!(store.get("errors_total").unwrap().value(), 1);
    }

    #[test]
    fn test_dump_lists_every_instruction() {
        let store = MetricStore::new();
        let program = error_counter_program(&store);

        let dump = program.dump();
        assert!(dump.starts_with("Bytecode for t.mtail:"));
        assert!(dump.contains("0000 match  /ERROR/"));
        assert!(dump.contains("0001 jnm    0003"));
        assert!(dump.contains("0002 inc    errors_total"));
        assert!(dump.contains("0003 stop"));
        assert!(dump.ends_with("0003 stop\n"));
        assert_eq!(format!("{program}"), dump);
    }
}
