use serde::{Deserialize, Deserializer, Serialize};

/// Term identifiers. `FinalTerm` is the consolidated end-of-year exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TermId {
    #[serde(alias = "term1", alias = "first")]
    FirstTerm,
    #[serde(alias = "term2", alias = "second", alias = "halfYearly")]
    SecondTerm,
    #[serde(alias = "term3", alias = "third")]
    ThirdTerm,
    #[serde(alias = "final", alias = "annual")]
    FinalTerm,
}

impl TermId {
    pub fn as_str(self) -> &'static str {
        match self {
            TermId::FirstTerm => "firstTerm",
            TermId::SecondTerm => "secondTerm",
            TermId::ThirdTerm => "thirdTerm",
            TermId::FinalTerm => "finalTerm",
        }
    }

    pub fn is_final(self) -> bool {
        self == TermId::FinalTerm
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GradeBand {
    PrePrimary,
    /// Middle grades, everything that is neither pre-primary nor IX/X.
    Middle,
    BoardExam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GradingSystem {
    #[default]
    #[serde(alias = "numerical", alias = "Numeric", alias = "numeric")]
    Numerical,
    #[serde(rename = "OABC", alias = "oabc", alias = "Graded", alias = "graded")]
    Oabc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDefinition {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64_or_zero")]
    pub exam_full_marks: f64,
    #[serde(default, deserialize_with = "lenient_f64_or_zero")]
    pub activity_full_marks: f64,
    #[serde(default)]
    pub grading_system: GradingSystem,
}

impl SubjectDefinition {
    pub fn numeric(name: &str, exam_full_marks: f64, activity_full_marks: f64) -> Self {
        Self {
            name: name.to_string(),
            exam_full_marks,
            activity_full_marks,
            grading_system: GradingSystem::Numerical,
        }
    }

    pub fn graded(name: &str) -> Self {
        Self {
            name: name.to_string(),
            exam_full_marks: 0.0,
            activity_full_marks: 0.0,
            grading_system: GradingSystem::Oabc,
        }
    }

    pub fn is_graded(&self) -> bool {
        self.grading_system == GradingSystem::Oabc
    }
}

/// One stored result row. Several scoring regimes have written these over the
/// years, so every score field is optional and more than one may be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectMark {
    pub subject: String,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub marks: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub exam_marks: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub activity_marks: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub sa_marks: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub fa_marks: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
}

impl SubjectMark {
    pub fn has_grade(&self) -> bool {
        self.grade
            .as_deref()
            .map(|g| !g.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    #[serde(default, deserialize_with = "lenient_f64_or_zero")]
    pub total_working_days: f64,
    #[serde(default, deserialize_with = "lenient_f64_or_zero")]
    pub days_present: f64,
}

impl Attendance {
    pub fn percentage(&self) -> f64 {
        if self.total_working_days > 0.0 {
            100.0 * self.days_present / self.total_working_days
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: TermId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub results: Vec<SubjectMark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_remarks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendance: Option<Attendance>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StudentStatus {
    #[default]
    #[serde(alias = "active", alias = "ACTIVE")]
    Active,
    #[serde(alias = "inactive", alias = "INACTIVE")]
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub grade: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_i64", skip_serializing_if = "Option::is_none")]
    pub roll_no: Option<i64>,
    #[serde(default)]
    pub status: StudentStatus,
    #[serde(default)]
    pub academic_performance: Vec<Exam>,
}

impl Student {
    pub fn is_active(&self) -> bool {
        self.status == StudentStatus::Active
    }

    pub fn exam(&self, term: TermId) -> Option<&Exam> {
        self.academic_performance.iter().find(|e| e.id == term)
    }
}

/// Legacy imports stored marks as strings ("45", " 27.5 ", ""), so numbers
/// and numeric strings are both accepted. Anything else reads as absent.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(number_from_value))
}

fn lenient_f64_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?.unwrap_or(0.0))
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?
        .filter(|v| v.fract() == 0.0)
        .map(|v| v as i64))
}

pub fn number_from_value(v: &serde_json::Value) -> Option<f64> {
    match v {
        serde_json::Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}
