//! Ordered set of processing-unit identifiers.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseCpuSetError {
    #[error("empty item in cpu list {0:?}")]
    EmptyItem(String),
    #[error("invalid cpu id {0:?}")]
    InvalidId(String),
    #[error("reversed cpu range {0:?}")]
    ReversedRange(String),
    #[error("cpu id out of range in {0:?}")]
    OutOfRange(String),
}

/// Highest accepted processing-unit id. Matches the kernel's `NR_CPUS` ceiling.
pub const MAX_CPU_ID: u32 = 8191;

/// Set of processing-unit ids, iterated in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CpuSet {
    ids: BTreeSet<u32>,
}

impl CpuSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(id: u32) -> Self {
        let mut set = Self::new();
        set.insert(id);
        set
    }

    pub fn insert(&mut self, id: u32) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.ids.iter().copied()
    }

    /// Lowest id of the set, used as a tie breaker when ordering nodes.
    pub fn first(&self) -> Option<u32> {
        self.ids.first().copied()
    }

    pub fn union_with(&mut self, other: &CpuSet) {
        self.ids.extend(other.ids.iter().copied());
    }

    pub fn is_disjoint(&self, other: &CpuSet) -> bool {
        self.ids.is_disjoint(&other.ids)
    }

    /// Parses the kernel/Docker list notation, e.g. `0-3,8`.
    /// Whitespace around items and a trailing newline (as read from sysfs) are tolerated.
    pub fn parse(s: &str) -> Result<Self, ParseCpuSetError> {
        let mut set = Self::new();
        let s = s.trim();
        if s.is_empty() {
            return Ok(set);
        }

        for item in s.split(',') {
            let item = item.trim();
            if item.is_empty() {
                return Err(ParseCpuSetError::EmptyItem(s.to_string()));
            }

            match item.split_once('-') {
                Some((lo, hi)) => {
                    let lo = parse_id(lo)?;
                    let hi = parse_id(hi)?;
                    if lo > hi {
                        return Err(ParseCpuSetError::ReversedRange(item.to_string()));
                    }
                    set.ids.extend(lo..=hi);
                }
                None => {
                    set.insert(parse_id(item)?);
                }
            }
        }

        Ok(set)
    }
}

fn parse_id(s: &str) -> Result<u32, ParseCpuSetError> {
    let id = s
        .trim()
        .parse::<u32>()
        .map_err(|_| ParseCpuSetError::InvalidId(s.to_string()))?;
    if id > MAX_CPU_ID {
        return Err(ParseCpuSetError::OutOfRange(s.to_string()));
    }
    Ok(id)
}

impl FromStr for CpuSet {
    type Err = ParseCpuSetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl FromIterator<u32> for CpuSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for CpuSet {
    /// Collapses consecutive ids into ranges: {0,1,2,3,8} -> "0-3,8".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.ids.iter().copied().peekable();
        let mut first = true;

        while let Some(start) = iter.next() {
            let mut end = start;
            while let Some(next) = end.checked_add(1).filter(|n| iter.peek() == Some(n)) {
                end = next;
                iter.next();
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
