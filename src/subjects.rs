use crate::model::{SubjectDefinition, SubjectMark};
use serde::Serialize;

/// Documented synonyms, stored in normalized form (lowercase, no whitespace).
/// Only these pairs are treated as the same subject; there is no fuzzy matching.
const ALIAS_GROUPS: &[&[&str]] = &[
    &["math", "maths", "mathematics"],
    &["english", "englishi", "eng-i"],
    &["englishii", "english-ii", "eng-ii"],
    &["socialstudies", "socialscience"],
    &["spelling", "spellings"],
    &["rhyme", "rhymes"],
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedSubjects {
    pub numeric_subjects: Vec<SubjectDefinition>,
    pub graded_subjects: Vec<SubjectDefinition>,
}

impl ClassifiedSubjects {
    pub fn all(&self) -> impl Iterator<Item = &SubjectDefinition> {
        self.numeric_subjects.iter().chain(self.graded_subjects.iter())
    }
}

pub fn normalize_subject(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

fn alias_group(key: &str) -> Option<&'static [&'static str]> {
    ALIAS_GROUPS.iter().copied().find(|g| g.contains(&key))
}

fn is_alias(a: &str, b: &str) -> bool {
    match alias_group(a) {
        Some(group) => group.contains(&b),
        None => false,
    }
}

/// True when two subject names refer to the same subject, either directly or
/// through the alias table.
pub fn names_match(a: &str, b: &str) -> bool {
    let a = normalize_subject(a);
    let b = normalize_subject(b);
    a == b || is_alias(&a, &b)
}

#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    pub mark: &'a SubjectMark,
    pub exact: bool,
    /// How many result rows matched the subject (exact or alias). More than one
    /// means the exam holds duplicate entries and the pick is first-wins.
    pub candidates: usize,
}

/// Finds the result row for `subject_name`. An exact (case/whitespace
/// insensitive) name match beats an alias match; within each pass the first
/// row in `results` order wins.
pub fn resolve_detailed<'a>(results: &'a [SubjectMark], subject_name: &str) -> Option<Resolution<'a>> {
    let key = normalize_subject(subject_name);
    let mut exact: Option<&SubjectMark> = None;
    let mut alias: Option<&SubjectMark> = None;
    let mut candidates = 0_usize;

    for r in results {
        let rk = normalize_subject(&r.subject);
        if rk.is_empty() {
            continue;
        }
        if rk == key {
            candidates += 1;
            if exact.is_none() {
                exact = Some(r);
            }
        } else if is_alias(&key, &rk) {
            candidates += 1;
            if alias.is_none() {
                alias = Some(r);
            }
        }
    }

    let res = match (exact, alias) {
        (Some(mark), _) => Some(Resolution {
            mark,
            exact: true,
            candidates,
        }),
        (None, Some(mark)) => Some(Resolution {
            mark,
            exact: false,
            candidates,
        }),
        (None, None) => None,
    };
    if let Some(r) = &res {
        if r.candidates > 1 {
            tracing::warn!(
                subject = subject_name,
                candidates = r.candidates,
                picked = %r.mark.subject,
                "ambiguous subject match, first entry wins"
            );
        }
    }
    res
}

pub fn resolve<'a>(results: &'a [SubjectMark], subject: &SubjectDefinition) -> Option<&'a SubjectMark> {
    resolve_detailed(results, &subject.name).map(|r| r.mark)
}

/// Splits a grade's curriculum into numeric and OABC subjects. Subjects that
/// only appear in `results` are added so no recorded mark is dropped: as OABC
/// when the row carries a grade letter, otherwise as numeric out of
/// `synthesized_full_marks`.
pub fn classify(
    curriculum: &[SubjectDefinition],
    results: &[SubjectMark],
    synthesized_full_marks: f64,
) -> ClassifiedSubjects {
    let mut out = ClassifiedSubjects::default();
    for def in curriculum {
        if def.is_graded() {
            out.graded_subjects.push(def.clone());
        } else {
            out.numeric_subjects.push(def.clone());
        }
    }

    for r in results {
        let name = r.subject.trim();
        if name.is_empty() {
            continue;
        }
        if out.all().any(|d| names_match(&d.name, name)) {
            continue;
        }
        tracing::debug!(subject = name, "synthesizing subject missing from curriculum");
        if r.has_grade() {
            out.graded_subjects.push(SubjectDefinition::graded(name));
        } else {
            out.numeric_subjects
                .push(SubjectDefinition::numeric(name, synthesized_full_marks, 0.0));
        }
    }
    out
}
