//! Allocation bitmaps over inventory positions

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{identifier, GresError, GresResult};

/// Fixed-length bit vector; bit `i` refers to inventory position `i`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AllocationBitmap {
    bits: Vec<bool>,
}

impl AllocationBitmap {
    /// Create a cleared bitmap of `len` bits
    pub fn new(len: usize) -> Self {
        Self {
            bits: vec![false; len],
        }
    }

    /// Create a bitmap of `len` bits with the given positions set
    pub fn from_indices<I>(len: usize, indices: I) -> GresResult<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut bitmap = Self::new(len);
        for index in indices {
            bitmap.set(index)?;
        }
        Ok(bitmap)
    }

    /// Parse an index list such as `"0-2,5"` into a bitmap of `len` bits
    pub fn parse_list(len: usize, list: &str) -> GresResult<Self> {
        let mut indices = Vec::new();
        for token in identifier::expand(list)? {
            let index = token.parse::<usize>().map_err(|e| GresError::ConfigParse {
                identifier: list.to_string(),
                reason: format!("'{}' is not a bit index: {}", token, e),
            })?;
            indices.push(index);
        }
        Self::from_indices(len, indices)
    }

    /// Number of bits
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Whether the bitmap has zero bits
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Set bit `index`
    pub fn set(&mut self, index: usize) -> GresResult<()> {
        let len = self.bits.len();
        match self.bits.get_mut(index) {
            Some(bit) => {
                *bit = true;
                Ok(())
            }
            None => Err(GresError::BitOutOfRange { index, len }),
        }
    }

    /// Clear bit `index`
    pub fn clear(&mut self, index: usize) -> GresResult<()> {
        let len = self.bits.len();
        match self.bits.get_mut(index) {
            Some(bit) => {
                *bit = false;
                Ok(())
            }
            None => Err(GresError::BitOutOfRange { index, len }),
        }
    }

    /// Test bit `index`; out-of-range bits read as clear
    pub fn test(&self, index: usize) -> bool {
        self.bits.get(index).copied().unwrap_or(false)
    }

    /// Number of set bits
    pub fn count_set(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    /// Positions of set bits in ascending order
    pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, b)| **b)
            .map(|(i, _)| i)
    }
}

impl fmt::Display for AllocationBitmap {
    /// Compact index list, e.g. `0-2,5`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut set = self.iter_set().peekable();
        while let Some(start) = set.next() {
            let mut end = start;
            while set.peek() == Some(&(end + 1)) {
                end += 1;
                set.next();
            }
            if !first {
                f.write_str(",")?;
            }
            first = false;
            if start == end {
                write!(f, "{}", start)?;
            } else {
                write!(f, "{}-{}", start, end)?;
            }
        }
        Ok(())
    }
}
