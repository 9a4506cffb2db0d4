use std::collections::BTreeMap;
use std::fmt;

use crate::command::Command;
use crate::error::{Error, Result};

/// Bidirectional loop-bracket pairing: every `LoopOpen` index maps to its
/// `LoopClose` index and back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JumpTable {
    pairs: BTreeMap<usize, usize>,
}

impl JumpTable {
    /// Match brackets innermost-first with a stack.
    ///
    /// Fails on the first `LoopClose` with nothing open, or if any
    /// `LoopOpen` is still open at the end.
    pub fn build(commands: &[Command]) -> Result<Self> {
        let mut pairs = BTreeMap::new();
        let mut stack = Vec::new();

        for (i, &cmd) in commands.iter().enumerate() {
            match cmd {
                Command::LoopOpen => stack.push(i),
                Command::LoopClose => {
                    let open = stack.pop().ok_or_else(|| {
                        Error::MalformedProgram(format!("unmatched loop-close at {i}"))
                    })?;
                    pairs.insert(open, i);
                    pairs.insert(i, open);
                }
                _ => {}
            }
        }

        if let Some(&open) = stack.last() {
            return Err(Error::MalformedProgram(format!(
                "unmatched loop-open at {open}"
            )));
        }
        Ok(Self { pairs })
    }

    /// Partner of the bracket at `index`.
    pub fn get(&self, index: usize) -> Option<usize> {
        self.pairs.get(&index).copied()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.pairs.iter().map(|(&a, &b)| (a, b))
    }
}

impl fmt::Display for JumpTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (from, to)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{from}=>{to}")?;
        }
        f.write_str("}")
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn any_command() -> impl Strategy<Value = Command> {
        (0usize..Command::ALL.len()).prop_map(|i| Command::ALL[i])
    }

    proptest! {
        #[test]
        fn table_is_symmetric(commands in prop::collection::vec(any_command(), 0..128)) {
            if let Ok(table) = JumpTable::build(&commands) {
                for (from, to) in table.iter() {
                    prop_assert_eq!(table.get(to), Some(from));
                    let (open, close) = if from < to { (from, to) } else { (to, from) };
                    prop_assert_eq!(commands[open], Command::LoopOpen);
                    prop_assert_eq!(commands[close], Command::LoopClose);
                }
            }
        }

        #[test]
        fn build_succeeds_iff_balanced(commands in prop::collection::vec(any_command(), 0..128)) {
            let mut depth: i64 = 0;
            let mut balanced = true;
            for &cmd in &commands {
                match cmd {
                    Command::LoopOpen => depth += 1,
                    Command::LoopClose => {
                        depth -= 1;
                        if depth < 0 {
                            balanced = false;
                        }
                    }
                    _ => {}
                }
            }
            balanced &= depth == 0;
            prop_assert_eq!(JumpTable::build(&commands).is_ok(), balanced);
        }
    }
}
