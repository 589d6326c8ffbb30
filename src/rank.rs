use crate::calc::ResultStatus;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Placed(u32),
    /// Serialized as `"-"`.
    Unranked,
}

impl Serialize for Rank {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Rank::Placed(n) => serializer.serialize_u32(*n),
            Rank::Unranked => serializer.serialize_str("-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortEntry {
    pub id: String,
    pub grand_total: f64,
    pub result: ResultStatus,
}

/// Distinct grand totals of the PASS population, highest first.
fn distinct_passing_totals(cohort: &[CohortEntry]) -> Vec<f64> {
    let mut totals: Vec<f64> = cohort
        .iter()
        .filter(|c| c.result == ResultStatus::Pass)
        .map(|c| c.grand_total)
        .collect();
    totals.sort_by(|a, b| b.total_cmp(a));
    totals.dedup();
    totals
}

fn place(totals: &[f64], grand_total: f64) -> Rank {
    totals
        .iter()
        .position(|t| *t == grand_total)
        .map(|i| Rank::Placed(i as u32 + 1))
        .unwrap_or(Rank::Unranked)
}

/// Dense rank over distinct totals: equal totals share a rank and the next
/// lower total gets the following integer, so [100, 100, 90] ranks [1, 1, 2].
/// Only PASS students are ranked; SIMPLE PASS and FAIL get `Unranked`, as does
/// an id missing from the cohort.
pub fn rank(target_id: &str, cohort: &[CohortEntry]) -> Rank {
    let Some(target) = cohort
        .iter()
        .find(|c| c.id == target_id && c.result == ResultStatus::Pass)
    else {
        return Rank::Unranked;
    };
    place(&distinct_passing_totals(cohort), target.grand_total)
}

/// Ranks the whole cohort in one pass.
pub fn rank_all(cohort: &[CohortEntry]) -> HashMap<String, Rank> {
    let totals = distinct_passing_totals(cohort);
    let mut out = HashMap::with_capacity(cohort.len());
    for c in cohort {
        let r = if c.result == ResultStatus::Pass {
            place(&totals, c.grand_total)
        } else {
            Rank::Unranked
        };
        out.entry(c.id.clone()).or_insert(r);
    }
    out
}
