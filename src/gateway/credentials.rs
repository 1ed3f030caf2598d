//! Rotating pool of provider credentials

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Ordered API keys with a cursor on the active one.
///
/// The cursor only moves through [`CredentialPool::rotate`], which advances
/// it circularly. It persists across gateway invocations.
pub struct CredentialPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    /// Build a pool, dropping blank entries and later duplicates
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for key in keys {
            let key = key.into().trim().to_string();
            if !key.is_empty() && !unique.contains(&key) {
                unique.push(key);
            }
        }
        Self {
            keys: unique,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    /// The active credential and its position, or None for an empty pool
    pub fn current(&self) -> Option<(usize, &str)> {
        let index = self.cursor();
        self.keys.get(index).map(|key| (index, key.as_str()))
    }

    /// Advance the cursor to the next credential, wrapping at the end.
    /// Returns the new cursor position.
    pub fn rotate(&self) -> usize {
        let len = self.keys.len();
        if len == 0 {
            return 0;
        }
        let previous = self
            .cursor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| Some((c + 1) % len))
            .unwrap_or_else(|c| c);
        (previous + 1) % len
    }
}

// Keys never end up in logs
impl fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPool")
            .field("len", &self.keys.len())
            .field("cursor", &self.cursor())
            .finish()
    }
}
