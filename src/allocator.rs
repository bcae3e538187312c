//! Task id allocation
//!
//! The counter lives in `plan/next_id.txt` as a zero-padded decimal number
//! plus newline. It holds the next id to hand out and only ever increases;
//! an id burned by a failed create is never reissued.
//!
//! Callers must hold the plan lock: the read-modify-write is not atomic on
//! its own.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{IdsConfig, OverflowPolicy};
use crate::error::{Error, Result};
use crate::lock;
use crate::task::TaskId;

#[derive(Debug, Clone)]
pub struct IdAllocator {
    path: PathBuf,
    width: usize,
    overflow: OverflowPolicy,
}

impl IdAllocator {
    pub fn new(path: impl Into<PathBuf>, ids: &IdsConfig) -> Self {
        Self {
            path: path.into(),
            width: ids.width,
            overflow: ids.overflow,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the counter without advancing it. `None` if the file is missing.
    pub fn peek(&self) -> Result<Option<u64>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let trimmed = content.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(self.invalid(format!("expected a decimal counter, found '{trimmed}'")));
        }
        trimmed
            .parse::<u64>()
            .map(Some)
            .map_err(|err| self.invalid(err.to_string()))
    }

    /// Issue the next id, starting at 1 when no counter exists yet
    pub fn next_id(&self) -> Result<TaskId> {
        self.next_id_with_seed(|| Ok(1))
    }

    /// Issue the next id; `seed` supplies the starting value when the
    /// counter file does not exist.
    pub fn next_id_with_seed<F>(&self, seed: F) -> Result<TaskId>
    where
        F: FnOnce() -> Result<u64>,
    {
        let current = match self.peek()? {
            Some(value) => value,
            None => {
                let seeded = seed()?;
                tracing::debug!(path = %self.path.display(), seeded, "seeding id counter");
                seeded
            }
        };

        let id = TaskId::from_number(current, self.width);
        if id.as_str().len() > self.width && self.overflow == OverflowPolicy::Error {
            return Err(Error::IdSpaceExhausted {
                next: current,
                width: self.width,
            });
        }

        let next = current.checked_add(1).ok_or(Error::IdSpaceExhausted {
            next: current,
            width: self.width,
        })?;
        lock::write_atomic_str(&self.path, &self.render(next))?;
        tracing::debug!(id = %id, next, "allocated task id");
        Ok(id)
    }

    fn render(&self, value: u64) -> String {
        format!("{}\n", TaskId::from_number(value, self.width))
    }

    fn invalid(&self, message: String) -> Error {
        Error::InvalidState {
            path: self.path.clone(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn allocator(dir: &TempDir, overflow: OverflowPolicy) -> IdAllocator {
        IdAllocator::new(
            dir.path().join("next_id.txt"),
            &IdsConfig {
                width: 4,
                overflow,
            },
        )
    }

    #[test]
    fn sequential_ids_increment_by_one() {
        let dir = TempDir::new().unwrap();
        let alloc = allocator(&dir, OverflowPolicy::Error);
        fs::write(alloc.path(), "0004\n").unwrap();

        let ids: Vec<String> = (0..3)
            .map(|_| alloc.next_id().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["0004", "0005", "0006"]);
        assert_eq!(fs::read_to_string(alloc.path()).unwrap(), "0007\n");
        assert_eq!(alloc.peek().unwrap(), Some(7));
    }

    #[test]
    fn missing_counter_uses_seed() {
        let dir = TempDir::new().unwrap();
        let alloc = allocator(&dir, OverflowPolicy::Error);

        assert_eq!(alloc.peek().unwrap(), None);
        assert_eq!(alloc.next_id_with_seed(|| Ok(12)).unwrap().as_str(), "0012");
        assert_eq!(fs::read_to_string(alloc.path()).unwrap(), "0013\n");
    }

    #[test]
    fn unpadded_counter_is_padded_on_issue() {
        let dir = TempDir::new().unwrap();
        let alloc = allocator(&dir, OverflowPolicy::Error);
        fs::write(alloc.path(), "9").unwrap();

        assert_eq!(alloc.next_id().unwrap().as_str(), "0009");
        assert_eq!(fs::read_to_string(alloc.path()).unwrap(), "0010\n");
    }

    #[test]
    fn malformed_counter_is_invalid_state() {
        let dir = TempDir::new().unwrap();
        let alloc = allocator(&dir, OverflowPolicy::Error);
        fs::write(alloc.path(), "abc\n").unwrap();

        assert!(matches!(alloc.next_id(), Err(Error::InvalidState { .. })));
        assert_eq!(fs::read_to_string(alloc.path()).unwrap(), "abc\n");
    }

    #[test]
    fn overflow_error_policy_stops_at_width() {
        let dir = TempDir::new().unwrap();
        let alloc = allocator(&dir, OverflowPolicy::Error);
        fs::write(alloc.path(), "9999\n").unwrap();

        assert_eq!(alloc.next_id().unwrap().as_str(), "9999");
        assert_eq!(fs::read_to_string(alloc.path()).unwrap(), "10000\n");

        let err = alloc.next_id().expect_err("exhausted");
        assert!(matches!(err, Error::IdSpaceExhausted { next: 10000, width: 4 }));
        assert_eq!(fs::read_to_string(alloc.path()).unwrap(), "10000\n");
    }

    #[test]
    fn overflow_widen_policy_keeps_counting() {
        let dir = TempDir::new().unwrap();
        let alloc = allocator(&dir, OverflowPolicy::Widen);
        fs::write(alloc.path(), "9999\n").unwrap();

        assert_eq!(alloc.next_id().unwrap().as_str(), "9999");
        assert_eq!(alloc.next_id().unwrap().as_str(), "10000");
        assert_eq!(fs::read_to_string(alloc.path()).unwrap(), "10001\n");
    }
}
