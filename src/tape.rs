use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// Cell storage for the machine.
///
/// `Bounded` enforces `0 <= offset < capacity` and non-negative values and
/// grows its backing vector lazily up to the highest written offset.
/// `Sparse` accepts any offset and any value; unset cells read as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tape {
    Bounded { cells: Vec<i64>, capacity: usize },
    Sparse { cells: BTreeMap<i64, i64>, capacity: usize },
}

impl Tape {
    pub fn new(capacity: usize, loose: bool) -> Self {
        if loose {
            Tape::Sparse {
                cells: BTreeMap::new(),
                capacity,
            }
        } else {
            Tape::Bounded {
                cells: Vec::new(),
                capacity,
            }
        }
    }

    /// Nominal capacity. Only `Bounded` enforces it.
    pub fn capacity(&self) -> usize {
        match self {
            Tape::Bounded { capacity, .. } | Tape::Sparse { capacity, .. } => *capacity,
        }
    }

    pub fn is_loose(&self) -> bool {
        matches!(self, Tape::Sparse { .. })
    }

    /// Fail if `offset` is not addressable.
    pub fn check(&self, offset: i64) -> Result<()> {
        match self {
            Tape::Bounded { capacity, .. } => {
                let limit = *capacity as i64;
                if offset < 0 || offset >= limit {
                    return Err(Error::Bounds {
                        what: "pointer",
                        index: offset,
                        limit,
                    });
                }
                Ok(())
            }
            Tape::Sparse { .. } => Ok(()),
        }
    }

    pub fn get(&self, offset: i64) -> Result<i64> {
        self.check(offset)?;
        Ok(match self {
            Tape::Bounded { cells, .. } => cells.get(offset as usize).copied().unwrap_or(0),
            Tape::Sparse { cells, .. } => cells.get(&offset).copied().unwrap_or(0),
        })
    }

    pub fn set(&mut self, offset: i64, value: i64) -> Result<()> {
        self.check(offset)?;
        match self {
            Tape::Bounded { cells, .. } => {
                if value < 0 {
                    return Err(Error::NegativeValue { what: "cell", value });
                }
                let idx = offset as usize;
                if idx >= cells.len() {
                    cells.resize(idx + 1, 0);
                }
                cells[idx] = value;
            }
            Tape::Sparse { cells, .. } => {
                cells.insert(offset, value);
            }
        }
        Ok(())
    }

    /// Every written cell as `(offset, value)`, in offset order.
    pub fn cells(&self) -> Vec<(i64, i64)> {
        match self {
            Tape::Bounded { cells, .. } => cells
                .iter()
                .enumerate()
                .map(|(i, &v)| (i as i64, v))
                .collect(),
            Tape::Sparse { cells, .. } => cells.iter().map(|(&k, &v)| (k, v)).collect(),
        }
    }
}

impl fmt::Display for Tape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tape::Bounded { cells, .. } => write!(f, "{cells:?}"),
            Tape::Sparse { cells, .. } => {
                f.write_str("{")?;
                for (i, (k, v)) in cells.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}=>{v}")?;
                }
                f.write_str("}")
            }
        }
    }
}
