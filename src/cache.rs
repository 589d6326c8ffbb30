use crate::calc::ReportRow;
use crate::model::{Student, SubjectDefinition, TermId};
use anyhow::Context;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};

pub const DEFAULT_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportKey {
    pub grade: String,
    pub term: TermId,
    /// SHA-256 of the roster and curriculum snapshot.
    pub roster_version: String,
}

/// Hex SHA-256 over the canonical JSON of the inputs. Any change to a mark,
/// status, grade or subject definition yields a new version.
pub fn snapshot_version(
    roster: &[Student],
    curriculum: &[SubjectDefinition],
) -> anyhow::Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(curriculum).context("failed to serialize curriculum")?);
    hasher.update(b"\n");
    hasher.update(serde_json::to_vec(roster).context("failed to serialize roster")?);
    Ok(format!("{:x}", hasher.finalize()))
}

impl ReportKey {
    pub fn new(
        grade: &str,
        term: TermId,
        roster: &[Student],
        curriculum: &[SubjectDefinition],
    ) -> anyhow::Result<Self> {
        Ok(Self {
            grade: grade.trim().to_ascii_lowercase(),
            term,
            roster_version: snapshot_version(roster, curriculum)?,
        })
    }
}

/// Bounded memo of class reports, oldest entry evicted first.
#[derive(Debug)]
pub struct ReportCache {
    capacity: usize,
    entries: HashMap<ReportKey, Vec<ReportRow>>,
    order: VecDeque<ReportKey>,
}

impl Default for ReportCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ReportCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, key: &ReportKey) -> Option<&Vec<ReportRow>> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: ReportKey, rows: Vec<ReportRow>) {
        if self.entries.insert(key.clone(), rows).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.entries.remove(&old);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
