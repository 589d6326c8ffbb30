use crate::calc::CalcError;
use crate::model::GradeBand;
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};

pub const RULES_ENV: &str = "RESULTD_RULES";

/// Every threshold, letter set and cutoff the aggregator uses. Partial JSON
/// files are merged over the defaults field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulesConfig {
    pub activity: ActivityRules,
    pub sa_fa: SaFaRules,
    pub plain: PlainRules,
    pub graded: GradedRules,
    /// Full marks given to a subject that only shows up in result data.
    pub synthesized_full_marks: f64,
    pub division: Vec<DivisionTier>,
    pub academic_grade: AcademicGradeRules,
    pub remarks: RemarkRules,
    pub grade_bands: GradeBandTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityRules {
    pub exam_pass_marks: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaFaRules {
    pub sa_pass_marks: f64,
    pub sa_full_marks: f64,
    pub fa_full_marks: f64,
}

impl SaFaRules {
    pub fn full_marks(&self) -> f64 {
        self.sa_full_marks + self.fa_full_marks
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlainRules {
    pub board_pass_marks: f64,
    pub default_pass_marks: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GradedRules {
    pub accepted_letters: Vec<String>,
}

impl GradedRules {
    pub fn accepts(&self, grade: Option<&str>) -> bool {
        let Some(g) = grade else {
            return false;
        };
        let g = g.trim();
        self.accepted_letters.iter().any(|letter| letter == g)
    }
}

/// Division tiers match on `percentage >= min_percentage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DivisionTier {
    pub min_percentage: f64,
    pub label: String,
}

/// Grade tiers match on `percentage > above_percentage` (strict).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeTier {
    pub above_percentage: f64,
    pub grade: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AcademicGradeRules {
    pub tiers: Vec<GradeTier>,
    pub fallback: String,
    pub fail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemarkTier {
    pub min_percentage: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemarkRules {
    pub pass_tiers: Vec<RemarkTier>,
    pub pass_fallback: String,
    pub fail: String,
    pub simple_pass: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GradeBandTable {
    pub pre_primary: Vec<String>,
    pub board_exam: Vec<String>,
}

impl GradeBandTable {
    pub fn band_for(&self, grade: &str) -> GradeBand {
        let key = normalize_grade(grade);
        if self.pre_primary.iter().any(|g| normalize_grade(g) == key) {
            GradeBand::PrePrimary
        } else if self.board_exam.iter().any(|g| normalize_grade(g) == key) {
            GradeBand::BoardExam
        } else {
            GradeBand::Middle
        }
    }
}

fn normalize_grade(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ActivityRules {
    fn default() -> Self {
        Self {
            exam_pass_marks: 20.0,
        }
    }
}

impl Default for SaFaRules {
    fn default() -> Self {
        Self {
            sa_pass_marks: 27.0,
            sa_full_marks: 80.0,
            fa_full_marks: 20.0,
        }
    }
}

impl Default for PlainRules {
    fn default() -> Self {
        Self {
            board_pass_marks: 33.0,
            default_pass_marks: 35.0,
        }
    }
}

impl Default for GradedRules {
    fn default() -> Self {
        Self {
            accepted_letters: strings(&["O", "A", "B", "C"]),
        }
    }
}

impl Default for AcademicGradeRules {
    fn default() -> Self {
        let tier = |above: f64, grade: &str| GradeTier {
            above_percentage: above,
            grade: grade.to_string(),
        };
        Self {
            tiers: vec![tier(89.0, "O"), tier(79.0, "A"), tier(69.0, "B"), tier(59.0, "C")],
            fallback: "D".to_string(),
            fail: "E".to_string(),
        }
    }
}

impl Default for RemarkRules {
    fn default() -> Self {
        let tier = |min: f64, text: &str| RemarkTier {
            min_percentage: min,
            text: text.to_string(),
        };
        Self {
            pass_tiers: vec![
                tier(90.0, "Outstanding performance! Keep up the excellent work."),
                tier(75.0, "Excellent performance. Keep it up!"),
                tier(60.0, "Good performance. There is room for further improvement."),
                tier(45.0, "Satisfactory performance. More consistent effort is needed."),
            ],
            pass_fallback: "Needs to work harder to improve performance.".to_string(),
            fail: "Needs significant improvement".to_string(),
            simple_pass: "Simple Pass. Focus on improving in".to_string(),
        }
    }
}

impl Default for GradeBandTable {
    fn default() -> Self {
        Self {
            pre_primary: strings(&[
                "Nursery",
                "LKG",
                "UKG",
                "KG",
                "Kindergarten",
                "Pre-Primary",
                "PP",
            ]),
            board_exam: strings(&[
                "IX", "X", "9", "10", "Class IX", "Class X", "Class 9", "Class 10", "Grade IX",
                "Grade X", "Grade 9", "Grade 10",
            ]),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        let div = |min: f64, label: &str| DivisionTier {
            min_percentage: min,
            label: label.to_string(),
        };
        Self {
            activity: ActivityRules::default(),
            sa_fa: SaFaRules::default(),
            plain: PlainRules::default(),
            graded: GradedRules::default(),
            synthesized_full_marks: 100.0,
            division: vec![
                div(75.0, "Distinction"),
                div(60.0, "I Div"),
                div(45.0, "II Div"),
                div(35.0, "III Div"),
            ],
            academic_grade: AcademicGradeRules::default(),
            remarks: RemarkRules::default(),
            grade_bands: GradeBandTable::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RulesSource {
    Defaults,
    File(PathBuf),
    /// Sent over IPC with `rules.load`.
    Inline,
}

impl RulesSource {
    pub fn describe(&self) -> String {
        match self {
            RulesSource::Defaults => "defaults".to_string(),
            RulesSource::File(p) => p.to_string_lossy().to_string(),
            RulesSource::Inline => "inline".to_string(),
        }
    }
}

impl RulesConfig {
    pub fn band_for_grade(&self, grade: &str) -> GradeBand {
        self.grade_bands.band_for(grade)
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read rules file {}", path.to_string_lossy()))?;
        let rules: RulesConfig = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse rules file {}", path.to_string_lossy()))?;
        rules
            .validate()
            .map_err(|e| anyhow!("{}: {}", e.code, e.message))
            .with_context(|| format!("invalid rules file {}", path.to_string_lossy()))?;
        Ok(rules)
    }

    /// Resolution order: explicit `--rules` path, then `RESULTD_RULES`, then defaults.
    pub fn load(cli_path: Option<PathBuf>) -> anyhow::Result<(Self, RulesSource)> {
        let path = cli_path.or_else(|| {
            std::env::var_os(RULES_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        });
        match path {
            Some(p) => {
                let rules = Self::from_json_file(&p)?;
                Ok((rules, RulesSource::File(p)))
            }
            None => Ok((Self::default(), RulesSource::Defaults)),
        }
    }

    pub fn validate(&self) -> Result<(), CalcError> {
        let marks = [
            ("activity.examPassMarks", self.activity.exam_pass_marks),
            ("saFa.saPassMarks", self.sa_fa.sa_pass_marks),
            ("saFa.saFullMarks", self.sa_fa.sa_full_marks),
            ("saFa.faFullMarks", self.sa_fa.fa_full_marks),
            ("plain.boardPassMarks", self.plain.board_pass_marks),
            ("plain.defaultPassMarks", self.plain.default_pass_marks),
            ("synthesizedFullMarks", self.synthesized_full_marks),
        ];
        for (key, v) in marks {
            if !v.is_finite() || v < 0.0 {
                return Err(invalid(key, "must be a finite, non-negative number"));
            }
        }
        if self.sa_fa.sa_pass_marks > self.sa_fa.sa_full_marks {
            return Err(invalid("saFa.saPassMarks", "must not exceed saFa.saFullMarks"));
        }

        if self.graded.accepted_letters.is_empty()
            || self
                .graded
                .accepted_letters
                .iter()
                .any(|l| l.trim().is_empty())
        {
            return Err(invalid(
                "graded.acceptedLetters",
                "must contain at least one non-empty letter",
            ));
        }

        check_descending(
            "division",
            self.division.iter().map(|t| t.min_percentage),
        )?;
        check_descending(
            "academicGrade.tiers",
            self.academic_grade.tiers.iter().map(|t| t.above_percentage),
        )?;
        check_descending(
            "remarks.passTiers",
            self.remarks.pass_tiers.iter().map(|t| t.min_percentage),
        )?;

        for g in &self.grade_bands.pre_primary {
            let key = normalize_grade(g);
            if self
                .grade_bands
                .board_exam
                .iter()
                .any(|b| normalize_grade(b) == key)
            {
                return Err(CalcError {
                    code: "rules_invalid".to_string(),
                    message: format!("grade '{}' is listed in more than one grade band", g),
                    details: Some(json!({ "grade": g })),
                });
            }
        }
        Ok(())
    }
}

fn invalid(key: &str, why: &str) -> CalcError {
    CalcError {
        code: "rules_invalid".to_string(),
        message: format!("{} {}", key, why),
        details: Some(json!({ "key": key })),
    }
}

fn check_descending<I>(key: &str, values: I) -> Result<(), CalcError>
where
    I: IntoIterator<Item = f64>,
{
    let mut prev: Option<f64> = None;
    for v in values {
        if !v.is_finite() || !(0.0..=100.0).contains(&v) {
            return Err(invalid(key, "percentages must lie within 0..=100"));
        }
        if let Some(p) = prev {
            if v >= p {
                return Err(invalid(key, "tiers must be strictly descending"));
            }
        }
        prev = Some(v);
    }
    Ok(())
}
