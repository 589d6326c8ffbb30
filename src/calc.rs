use crate::config::RulesConfig;
use crate::model::{
    Attendance, GradeBand, GradingSystem, Student, SubjectDefinition, SubjectMark, TermId,
};
use crate::rank::{self, CohortEntry, Rank};
use crate::subjects::{self, ClassifiedSubjects};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize)]
pub struct CalcError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CalcError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "SIMPLE PASS")]
    SimplePass,
    #[serde(rename = "FAIL")]
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoringRegime {
    /// exam + activity, only the exam part can fail.
    ActivityBased,
    /// SA 80 + FA 20, only SA can fail.
    SaFa,
    /// A single `marks` field against the exam full marks.
    PlainNumeric,
}

impl ScoringRegime {
    pub fn select(band: GradeBand, term: TermId) -> Self {
        match band {
            GradeBand::PrePrimary => ScoringRegime::PlainNumeric,
            GradeBand::Middle => ScoringRegime::ActivityBased,
            GradeBand::BoardExam if term.is_final() => ScoringRegime::SaFa,
            GradeBand::BoardExam => ScoringRegime::PlainNumeric,
        }
    }
}

/// Round half away from zero, as the activity log totals have always been
/// rounded. Exam marks are never rounded.
pub fn round_half_away(x: f64) -> f64 {
    x.round()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericOutcome {
    pub subject: String,
    pub obtained: f64,
    pub exam_obtained: f64,
    pub activity_obtained: f64,
    pub full_marks: f64,
    pub failed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedOutcome {
    pub subject: String,
    pub grade: Option<String>,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SubjectOutcome {
    Numeric(NumericOutcome),
    Graded(GradedOutcome),
}

impl SubjectOutcome {
    pub fn subject(&self) -> &str {
        match self {
            SubjectOutcome::Numeric(n) => &n.subject,
            SubjectOutcome::Graded(g) => &g.subject,
        }
    }

    pub fn is_failure(&self) -> bool {
        match self {
            SubjectOutcome::Numeric(n) => n.failed,
            SubjectOutcome::Graded(g) => !g.passed,
        }
    }
}

pub fn score_numeric(
    result: Option<&SubjectMark>,
    def: &SubjectDefinition,
    band: GradeBand,
    term: TermId,
    rules: &RulesConfig,
) -> NumericOutcome {
    let field = |f: fn(&SubjectMark) -> Option<f64>| result.and_then(f).unwrap_or(0.0);

    let (exam_obtained, activity_obtained, full_marks, failed) =
        match ScoringRegime::select(band, term) {
            ScoringRegime::ActivityBased => {
                let exam = field(|r| r.exam_marks);
                let activity = round_half_away(field(|r| r.activity_marks));
                (
                    exam,
                    activity,
                    def.exam_full_marks + def.activity_full_marks,
                    exam < rules.activity.exam_pass_marks,
                )
            }
            ScoringRegime::SaFa => match result.and_then(|r| r.sa_marks) {
                Some(sa) => (
                    sa,
                    field(|r| r.fa_marks),
                    rules.sa_fa.full_marks(),
                    sa < rules.sa_fa.sa_pass_marks,
                ),
                None => {
                    // Rows written before the SA/FA split carry a single mark
                    // out of 100.
                    let marks = field(|r| r.marks);
                    (
                        marks,
                        0.0,
                        rules.sa_fa.full_marks(),
                        marks < rules.plain.board_pass_marks,
                    )
                }
            },
            ScoringRegime::PlainNumeric => {
                let marks = field(|r| r.marks);
                let pass_marks = if band == GradeBand::BoardExam {
                    rules.plain.board_pass_marks
                } else {
                    rules.plain.default_pass_marks
                };
                (marks, 0.0, def.exam_full_marks, marks < pass_marks)
            }
        };

    NumericOutcome {
        subject: def.name.clone(),
        obtained: exam_obtained + activity_obtained,
        exam_obtained,
        activity_obtained,
        full_marks,
        failed,
    }
}

pub fn score_graded(
    result: Option<&SubjectMark>,
    def: &SubjectDefinition,
    rules: &RulesConfig,
) -> GradedOutcome {
    let grade = result
        .and_then(|r| r.grade.as_deref())
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty());
    GradedOutcome {
        subject: def.name.clone(),
        passed: rules.graded.accepts(grade.as_deref()),
        grade,
    }
}

pub fn score(
    result: Option<&SubjectMark>,
    def: &SubjectDefinition,
    band: GradeBand,
    term: TermId,
    rules: &RulesConfig,
) -> SubjectOutcome {
    match def.grading_system {
        GradingSystem::Numerical => {
            SubjectOutcome::Numeric(score_numeric(result, def, band, term, rules))
        }
        GradingSystem::Oabc => SubjectOutcome::Graded(score_graded(result, def, rules)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermSummary {
    pub grand_total: f64,
    pub exam_total: f64,
    pub activity_total: f64,
    pub full_marks_total: f64,
    pub percentage: f64,
    pub result: ResultStatus,
    pub division: String,
    pub academic_grade: String,
    pub remark: String,
    pub rank: Rank,
    pub failed_subjects: Vec<String>,
}

pub fn decide_result(
    band: GradeBand,
    failed_numeric: usize,
    passed_graded: usize,
    total_graded: usize,
) -> ResultStatus {
    if passed_graded < total_graded {
        return ResultStatus::Fail;
    }
    match failed_numeric {
        0 => ResultStatus::Pass,
        // Pre-primary has no SIMPLE PASS tier.
        1 if band != GradeBand::PrePrimary => ResultStatus::SimplePass,
        _ => ResultStatus::Fail,
    }
}

pub fn division_for(percentage: f64, rules: &RulesConfig) -> String {
    rules
        .division
        .iter()
        .find(|t| percentage >= t.min_percentage)
        .map(|t| t.label.clone())
        .unwrap_or_else(|| "-".to_string())
}

/// Tier boundaries are strict: exactly 90% is O, exactly 89% is A.
pub fn academic_grade_for(result: ResultStatus, percentage: f64, rules: &RulesConfig) -> String {
    let g = &rules.academic_grade;
    if result == ResultStatus::Fail {
        return g.fail.clone();
    }
    g.tiers
        .iter()
        .find(|t| percentage > t.above_percentage)
        .map(|t| t.grade.clone())
        .unwrap_or_else(|| g.fallback.clone())
}

pub fn remark_for(
    result: ResultStatus,
    percentage: f64,
    failed_subjects: &[String],
    rules: &RulesConfig,
) -> String {
    let r = &rules.remarks;
    match result {
        ResultStatus::Fail if failed_subjects.is_empty() => format!("{}.", r.fail),
        ResultStatus::Fail => format!("{} in {}.", r.fail, failed_subjects.join(", ")),
        ResultStatus::SimplePass => {
            format!("{} {}.", r.simple_pass, failed_subjects.join(", "))
        }
        ResultStatus::Pass => r
            .pass_tiers
            .iter()
            .find(|t| percentage >= t.min_percentage)
            .map(|t| t.text.clone())
            .unwrap_or_else(|| r.pass_fallback.clone()),
    }
}

/// Folds subject outcomes into a summary. The rank is left `Unranked`; it
/// needs the cohort and is filled in by the callers below.
pub fn synthesize(
    outcomes: &[SubjectOutcome],
    band: GradeBand,
    term: TermId,
    rules: &RulesConfig,
) -> TermSummary {
    let mut grand_total = 0.0_f64;
    let mut exam_total = 0.0_f64;
    let mut activity_total = 0.0_f64;
    let mut full_marks_total = 0.0_f64;
    let mut failed_numeric = 0_usize;
    let mut passed_graded = 0_usize;
    let mut total_graded = 0_usize;
    let mut failed_subjects: Vec<String> = Vec::new();

    for o in outcomes {
        match o {
            SubjectOutcome::Numeric(n) => {
                grand_total += n.obtained;
                exam_total += n.exam_obtained;
                activity_total += n.activity_obtained;
                full_marks_total += n.full_marks;
                if n.failed {
                    failed_numeric += 1;
                }
            }
            SubjectOutcome::Graded(g) => {
                total_graded += 1;
                if g.passed {
                    passed_graded += 1;
                }
            }
        }
        if o.is_failure() {
            failed_subjects.push(o.subject().to_string());
        }
    }

    let percentage = if full_marks_total > 0.0 {
        100.0 * grand_total / full_marks_total
    } else {
        0.0
    };
    let result = decide_result(band, failed_numeric, passed_graded, total_graded);

    // Board classes grade every non-PASS result E; only the final term
    // carries a division.
    let (division, academic_grade) = match (band, result) {
        (GradeBand::BoardExam, ResultStatus::Pass) if term.is_final() => {
            (division_for(percentage, rules), "-".to_string())
        }
        (GradeBand::BoardExam, ResultStatus::SimplePass | ResultStatus::Fail) => {
            ("-".to_string(), rules.academic_grade.fail.clone())
        }
        _ => ("-".to_string(), academic_grade_for(result, percentage, rules)),
    };
    let remark = remark_for(result, percentage, &failed_subjects, rules);

    TermSummary {
        grand_total,
        exam_total,
        activity_total,
        full_marks_total,
        percentage,
        result,
        division,
        academic_grade,
        remark,
        rank: Rank::Unranked,
        failed_subjects,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermEvaluation {
    pub student_id: String,
    pub term_id: TermId,
    pub grade_band: GradeBand,
    pub regime: ScoringRegime,
    pub summary: TermSummary,
    pub subjects: Vec<SubjectOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_remarks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance: Option<Attendance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance_percentage: Option<f64>,
}

/// Scores one exam's results against a curriculum. No ranking.
pub fn evaluate_results(
    results: &[SubjectMark],
    curriculum: &[SubjectDefinition],
    band: GradeBand,
    term: TermId,
    rules: &RulesConfig,
) -> (ClassifiedSubjects, Vec<SubjectOutcome>, TermSummary) {
    let classified = subjects::classify(curriculum, results, rules.synthesized_full_marks);
    let outcomes: Vec<SubjectOutcome> = classified
        .all()
        .map(|def| score(subjects::resolve(results, def), def, band, term, rules))
        .collect();
    let summary = synthesize(&outcomes, band, term, rules);
    (classified, outcomes, summary)
}

/// Scores a student for one term. A student without a stored exam for the
/// term is scored against empty results.
pub fn evaluate_student(
    student: &Student,
    curriculum: &[SubjectDefinition],
    term: TermId,
    rules: &RulesConfig,
) -> TermEvaluation {
    let band = rules.band_for_grade(&student.grade);
    let exam = student.exam(term);
    let results = exam.map(|e| e.results.as_slice()).unwrap_or(&[]);
    let (_, subjects, summary) = evaluate_results(results, curriculum, band, term, rules);
    let attendance = exam.and_then(|e| e.attendance);
    TermEvaluation {
        student_id: student.id.clone(),
        term_id: term,
        grade_band: band,
        regime: ScoringRegime::select(band, term),
        summary,
        subjects,
        teacher_remarks: exam.and_then(|e| e.teacher_remarks.clone()),
        attendance,
        attendance_percentage: attendance.map(|a| a.percentage()),
    }
}

pub fn same_grade(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Ranking population: active students of the target's grade. The target's
/// own record replaces any roster entry with the same id.
fn cohort_members<'a>(target: &'a Student, classmates: &'a [Student]) -> Vec<&'a Student> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut members: Vec<&Student> = Vec::new();
    for s in std::iter::once(target).chain(classmates.iter()) {
        if !s.is_active() || !same_grade(&s.grade, &target.grade) {
            continue;
        }
        if seen.insert(s.id.as_str()) {
            members.push(s);
        }
    }
    members
}

pub fn cohort_entries(
    target: &Student,
    classmates: &[Student],
    curriculum: &[SubjectDefinition],
    term: TermId,
    rules: &RulesConfig,
) -> Vec<CohortEntry> {
    cohort_members(target, classmates)
        .into_iter()
        .map(|s| {
            let e = evaluate_student(s, curriculum, term, rules);
            CohortEntry {
                id: e.student_id,
                grand_total: e.summary.grand_total,
                result: e.summary.result,
            }
        })
        .collect()
}

/// Full summary for one student and term, ranked against `classmates`.
pub fn compute_term_summary(
    student: &Student,
    curriculum: &[SubjectDefinition],
    term: TermId,
    classmates: &[Student],
    rules: &RulesConfig,
) -> TermEvaluation {
    let mut eval = evaluate_student(student, curriculum, term, rules);
    let cohort = cohort_entries(student, classmates, curriculum, term, rules);
    eval.summary.rank = rank::rank(&student.id, &cohort);
    eval
}

/// One summary per exam stored on the student, in stored order.
pub fn compute_student_terms(
    student: &Student,
    curriculum: &[SubjectDefinition],
    classmates: &[Student],
    rules: &RulesConfig,
) -> Vec<TermEvaluation> {
    student
        .academic_performance
        .iter()
        .map(|exam| compute_term_summary(student, curriculum, exam.id, classmates, rules))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub name: String,
    pub roll_no: Option<i64>,
    #[serde(flatten)]
    pub evaluation: TermEvaluation,
}

fn roll_order(a: &Student, b: &Student) -> Ordering {
    match (a.roll_no, b.roll_no) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.name.cmp(&b.name))
    .then_with(|| a.id.cmp(&b.id))
}

/// Summaries for every active student of `grade`, ordered by roll number.
pub fn compute_class_report(
    grade: &str,
    curriculum: &[SubjectDefinition],
    term: TermId,
    roster: &[Student],
    rules: &RulesConfig,
) -> Vec<ReportRow> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut members: Vec<&Student> = Vec::new();
    for s in roster {
        if s.is_active() && same_grade(&s.grade, grade) && seen.insert(s.id.as_str()) {
            members.push(s);
        }
    }
    members.sort_by(|a, b| roll_order(a, b));

    let evaluations: Vec<TermEvaluation> = members
        .iter()
        .map(|s| evaluate_student(s, curriculum, term, rules))
        .collect();
    let cohort: Vec<CohortEntry> = evaluations
        .iter()
        .map(|e| CohortEntry {
            id: e.student_id.clone(),
            grand_total: e.summary.grand_total,
            result: e.summary.result,
        })
        .collect();
    let ranks = rank::rank_all(&cohort);

    members
        .into_iter()
        .zip(evaluations)
        .map(|(s, mut evaluation)| {
            evaluation.summary.rank = ranks
                .get(&s.id)
                .copied()
                .unwrap_or(Rank::Unranked);
            ReportRow {
                name: s.name.clone(),
                roll_no: s.roll_no,
                evaluation,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Exam, StudentStatus};
    use proptest::prelude::*;

    fn rules() -> RulesConfig {
        RulesConfig::default()
    }

    fn activity_mark(subject: &str, exam: f64, activity: f64) -> SubjectMark {
        SubjectMark {
            subject: subject.to_string(),
            exam_marks: Some(exam),
            activity_marks: Some(activity),
            ..Default::default()
        }
    }

    fn plain_mark(subject: &str, marks: f64) -> SubjectMark {
        SubjectMark {
            subject: subject.to_string(),
            marks: Some(marks),
            ..Default::default()
        }
    }

    fn graded_mark(subject: &str, grade: &str) -> SubjectMark {
        SubjectMark {
            subject: subject.to_string(),
            grade: Some(grade.to_string()),
            ..Default::default()
        }
    }

    fn student(id: &str, grade: &str, term: TermId, results: Vec<SubjectMark>) -> Student {
        Student {
            id: id.to_string(),
            grade: grade.to_string(),
            name: format!("Student {}", id),
            roll_no: None,
            status: StudentStatus::Active,
            academic_performance: vec![Exam {
                id: term,
                name: term.as_str().to_string(),
                results,
                teacher_remarks: None,
                attendance: None,
            }],
        }
    }

    fn numeric_outcome(subject: &str, obtained: f64, full: f64, failed: bool) -> SubjectOutcome {
        SubjectOutcome::Numeric(NumericOutcome {
            subject: subject.to_string(),
            obtained,
            exam_obtained: obtained,
            activity_obtained: 0.0,
            full_marks: full,
            failed,
        })
    }

    fn graded_outcome(subject: &str, passed: bool) -> SubjectOutcome {
        SubjectOutcome::Graded(GradedOutcome {
            subject: subject.to_string(),
            grade: None,
            passed,
        })
    }

    #[test]
    fn regime_selection_by_band_and_term() {
        use ScoringRegime::*;
        assert_eq!(ScoringRegime::select(GradeBand::Middle, TermId::FirstTerm), ActivityBased);
        assert_eq!(ScoringRegime::select(GradeBand::Middle, TermId::FinalTerm), ActivityBased);
        assert_eq!(ScoringRegime::select(GradeBand::BoardExam, TermId::FinalTerm), SaFa);
        assert_eq!(ScoringRegime::select(GradeBand::BoardExam, TermId::SecondTerm), PlainNumeric);
        assert_eq!(ScoringRegime::select(GradeBand::PrePrimary, TermId::FinalTerm), PlainNumeric);
    }

    #[test]
    fn activity_based_pass() {
        let def = SubjectDefinition::numeric("Science", 60.0, 40.0);
        let m = activity_mark("Science", 45.0, 30.0);
        let o = score_numeric(Some(&m), &def, GradeBand::Middle, TermId::FirstTerm, &rules());
        assert_eq!(o.obtained, 75.0);
        assert_eq!(o.full_marks, 100.0);
        assert!(!o.failed);
    }

    #[test]
    fn activity_marks_never_cause_failure() {
        let def = SubjectDefinition::numeric("Science", 60.0, 40.0);
        let m = activity_mark("Science", 20.0, 0.0);
        let o = score_numeric(Some(&m), &def, GradeBand::Middle, TermId::FirstTerm, &rules());
        assert!(!o.failed);
        let m = activity_mark("Science", 19.0, 40.0);
        let o = score_numeric(Some(&m), &def, GradeBand::Middle, TermId::FirstTerm, &rules());
        assert!(o.failed);
        assert_eq!(o.obtained, 59.0);
    }

    #[test]
    fn activity_totals_round_half_away_from_zero() {
        let def = SubjectDefinition::numeric("Science", 60.0, 40.0);
        let m = activity_mark("Science", 45.0, 12.5);
        let o = score_numeric(Some(&m), &def, GradeBand::Middle, TermId::FirstTerm, &rules());
        assert_eq!(o.activity_obtained, 13.0);
        assert_eq!(o.obtained, 58.0);
        assert!(!o.failed);
    }

    #[test]
    fn fractional_exam_mark_below_threshold_fails() {
        let def = SubjectDefinition::numeric("Science", 60.0, 40.0);
        let m = activity_mark("Science", 19.5, 0.0);
        let o = score_numeric(Some(&m), &def, GradeBand::Middle, TermId::FirstTerm, &rules());
        assert_eq!(o.exam_obtained, 19.5);
        assert_eq!(o.obtained, 19.5);
        assert!(o.failed);

        let m = activity_mark("Science", 20.5, 10.0);
        let o = score_numeric(Some(&m), &def, GradeBand::Middle, TermId::FirstTerm, &rules());
        assert_eq!(o.exam_obtained, 20.5);
        assert_eq!(o.obtained, 30.5);
        assert!(!o.failed);
    }

    #[test]
    fn missing_result_scores_zero() {
        let def = SubjectDefinition::numeric("Science", 60.0, 40.0);
        let o = score_numeric(None, &def, GradeBand::Middle, TermId::FirstTerm, &rules());
        assert_eq!(o.obtained, 0.0);
        assert_eq!(o.full_marks, 100.0);
        assert!(o.failed);
    }

    #[test]
    fn sa_fa_fails_on_sa_regardless_of_fa() {
        let def = SubjectDefinition::numeric("English", 80.0, 20.0);
        let m = SubjectMark {
            subject: "English".to_string(),
            sa_marks: Some(25.0),
            fa_marks: Some(20.0),
            ..Default::default()
        };
        let o = score_numeric(Some(&m), &def, GradeBand::BoardExam, TermId::FinalTerm, &rules());
        assert_eq!(o.obtained, 45.0);
        assert_eq!(o.full_marks, 100.0);
        assert!(o.failed);

        let m = SubjectMark {
            subject: "English".to_string(),
            sa_marks: Some(27.0),
            fa_marks: Some(0.0),
            ..Default::default()
        };
        let o = score_numeric(Some(&m), &def, GradeBand::BoardExam, TermId::FinalTerm, &rules());
        assert!(!o.failed);
    }

    #[test]
    fn sa_fa_falls_back_to_legacy_marks() {
        let def = SubjectDefinition::numeric("English", 80.0, 20.0);
        let m = plain_mark("English", 62.0);
        let o = score_numeric(Some(&m), &def, GradeBand::BoardExam, TermId::FinalTerm, &rules());
        assert_eq!(o.obtained, 62.0);
        assert_eq!(o.full_marks, 100.0);
        assert!(!o.failed);
    }

    #[test]
    fn plain_thresholds_depend_on_band() {
        let def = SubjectDefinition::numeric("Hindi", 100.0, 0.0);
        let m = plain_mark("Hindi", 34.0);
        let board = score_numeric(Some(&m), &def, GradeBand::BoardExam, TermId::FirstTerm, &rules());
        assert!(!board.failed);
        assert_eq!(board.full_marks, 100.0);
        let pre = score_numeric(Some(&m), &def, GradeBand::PrePrimary, TermId::FirstTerm, &rules());
        assert!(pre.failed);
        let m = plain_mark("Hindi", 35.0);
        let pre = score_numeric(Some(&m), &def, GradeBand::PrePrimary, TermId::FirstTerm, &rules());
        assert!(!pre.failed);
    }

    #[test]
    fn graded_requires_accepted_letter() {
        let def = SubjectDefinition::graded("Drawing");
        assert!(score_graded(Some(&graded_mark("Drawing", "C")), &def, &rules()).passed);
        assert!(!score_graded(Some(&graded_mark("Drawing", "D")), &def, &rules()).passed);
        assert!(!score_graded(Some(&plain_mark("Drawing", 90.0)), &def, &rules()).passed);
        assert!(!score_graded(None, &def, &rules()).passed);
    }

    #[test]
    fn result_decision_order() {
        use ResultStatus::*;
        assert_eq!(decide_result(GradeBand::Middle, 0, 2, 2), Pass);
        assert_eq!(decide_result(GradeBand::Middle, 1, 2, 2), SimplePass);
        assert_eq!(decide_result(GradeBand::Middle, 2, 2, 2), Fail);
        assert_eq!(decide_result(GradeBand::Middle, 0, 1, 2), Fail);
        assert_eq!(decide_result(GradeBand::PrePrimary, 1, 0, 0), Fail);
        assert_eq!(decide_result(GradeBand::PrePrimary, 0, 0, 0), Pass);
        assert_eq!(decide_result(GradeBand::BoardExam, 1, 0, 0), SimplePass);
    }

    #[test]
    fn oabc_failure_overrides_numeric_pass() {
        let outcomes = vec![
            numeric_outcome("Math", 90.0, 100.0, false),
            numeric_outcome("Science", 80.0, 100.0, false),
            graded_outcome("Drawing", false),
        ];
        let s = synthesize(&outcomes, GradeBand::Middle, TermId::FirstTerm, &rules());
        assert_eq!(s.result, ResultStatus::Fail);
        assert_eq!(s.academic_grade, "E");
        assert_eq!(s.failed_subjects, vec!["Drawing".to_string()]);
        assert_eq!(s.remark, "Needs significant improvement in Drawing.");
        // OABC subjects never touch numeric totals.
        assert_eq!(s.grand_total, 170.0);
        assert_eq!(s.full_marks_total, 200.0);
        assert_eq!(s.percentage, 85.0);
    }

    #[test]
    fn pre_primary_has_zero_tolerance() {
        let outcomes = vec![
            numeric_outcome("Rhymes", 90.0, 100.0, false),
            numeric_outcome("Spelling", 20.0, 100.0, true),
        ];
        let s = synthesize(&outcomes, GradeBand::PrePrimary, TermId::FinalTerm, &rules());
        assert_eq!(s.result, ResultStatus::Fail);
        let s = synthesize(&outcomes, GradeBand::Middle, TermId::FinalTerm, &rules());
        assert_eq!(s.result, ResultStatus::SimplePass);
        assert_eq!(s.remark, "Simple Pass. Focus on improving in Spelling.");
    }

    #[test]
    fn zero_full_marks_gives_zero_percentage() {
        let outcomes = vec![graded_outcome("Drawing", true)];
        let s = synthesize(&outcomes, GradeBand::Middle, TermId::FirstTerm, &rules());
        assert_eq!(s.percentage, 0.0);
        assert_eq!(s.result, ResultStatus::Pass);
        assert_eq!(s.academic_grade, "D");
        let s = synthesize(&[], GradeBand::Middle, TermId::FirstTerm, &rules());
        assert_eq!(s.percentage, 0.0);
    }

    #[test]
    fn academic_grade_boundaries_are_strict() {
        let r = rules();
        assert_eq!(academic_grade_for(ResultStatus::Pass, 90.0, &r), "O");
        assert_eq!(academic_grade_for(ResultStatus::Pass, 89.999, &r), "A");
        assert_eq!(academic_grade_for(ResultStatus::Pass, 89.0, &r), "A");
        assert_eq!(academic_grade_for(ResultStatus::Pass, 79.0, &r), "B");
        assert_eq!(academic_grade_for(ResultStatus::Pass, 69.5, &r), "B");
        assert_eq!(academic_grade_for(ResultStatus::Pass, 60.0, &r), "C");
        assert_eq!(academic_grade_for(ResultStatus::SimplePass, 59.0, &r), "D");
        assert_eq!(academic_grade_for(ResultStatus::Fail, 99.0, &r), "E");
    }

    #[test]
    fn division_tiers_are_inclusive() {
        let r = rules();
        assert_eq!(division_for(75.0, &r), "Distinction");
        assert_eq!(division_for(74.9, &r), "I Div");
        assert_eq!(division_for(60.0, &r), "I Div");
        assert_eq!(division_for(45.0, &r), "II Div");
        assert_eq!(division_for(35.0, &r), "III Div");
        assert_eq!(division_for(34.9, &r), "-");
    }

    #[test]
    fn board_final_uses_division_instead_of_grade() {
        let outcomes = vec![
            numeric_outcome("English", 80.0, 100.0, false),
            numeric_outcome("Math", 60.0, 100.0, false),
        ];
        let s = synthesize(&outcomes, GradeBand::BoardExam, TermId::FinalTerm, &rules());
        assert_eq!(s.result, ResultStatus::Pass);
        assert_eq!(s.division, "I Div");
        assert_eq!(s.academic_grade, "-");

        let outcomes = vec![
            numeric_outcome("English", 80.0, 100.0, false),
            numeric_outcome("Math", 20.0, 100.0, true),
        ];
        let s = synthesize(&outcomes, GradeBand::BoardExam, TermId::FinalTerm, &rules());
        assert_eq!(s.result, ResultStatus::SimplePass);
        assert_eq!(s.division, "-");
        assert_eq!(s.academic_grade, "E");

        let s = synthesize(&outcomes, GradeBand::BoardExam, TermId::FirstTerm, &rules());
        assert_eq!(s.result, ResultStatus::SimplePass);
        assert_eq!(s.division, "-");
        assert_eq!(s.academic_grade, "E");
    }

    #[test]
    fn board_earlier_terms_grade_passes_by_percentage() {
        let outcomes = vec![
            numeric_outcome("English", 80.0, 100.0, false),
            numeric_outcome("Math", 60.0, 100.0, false),
        ];
        let s = synthesize(&outcomes, GradeBand::BoardExam, TermId::SecondTerm, &rules());
        assert_eq!(s.result, ResultStatus::Pass);
        assert_eq!(s.division, "-");
        assert_eq!(s.academic_grade, "B");

        // Middle-grade SIMPLE PASS keeps its percentage grade.
        let outcomes = vec![
            numeric_outcome("English", 80.0, 100.0, false),
            numeric_outcome("Math", 10.0, 100.0, true),
        ];
        let s = synthesize(&outcomes, GradeBand::Middle, TermId::FirstTerm, &rules());
        assert_eq!(s.result, ResultStatus::SimplePass);
        assert_eq!(s.academic_grade, "D");
    }

    #[test]
    fn pass_remarks_follow_percentage_tiers() {
        let r = rules();
        let pass = |p: f64| remark_for(ResultStatus::Pass, p, &[], &r);
        assert_eq!(pass(90.0), "Outstanding performance! Keep up the excellent work.");
        assert_eq!(pass(89.9), "Excellent performance. Keep it up!");
        assert_eq!(pass(60.0), "Good performance. There is room for further improvement.");
        assert_eq!(pass(45.0), "Satisfactory performance. More consistent effort is needed.");
        assert_eq!(pass(44.9), "Needs to work harder to improve performance.");
        assert_eq!(
            remark_for(ResultStatus::Fail, 10.0, &[], &r),
            "Needs significant improvement."
        );
        assert_eq!(
            remark_for(
                ResultStatus::Fail,
                10.0,
                &["Math".to_string(), "Science".to_string()],
                &r
            ),
            "Needs significant improvement in Math, Science."
        );
    }

    #[test]
    fn evaluate_results_resolves_aliases_and_synthesizes() {
        let curriculum = vec![
            SubjectDefinition::numeric("Mathematics", 60.0, 40.0),
            SubjectDefinition::graded("Drawing"),
        ];
        let results = vec![
            activity_mark("Math", 50.0, 35.0),
            graded_mark("Drawing", "A"),
            activity_mark("Computer", 40.0, 0.0),
        ];
        let (classified, outcomes, summary) = evaluate_results(
            &results,
            &curriculum,
            GradeBand::Middle,
            TermId::FirstTerm,
            &rules(),
        );
        assert_eq!(classified.numeric_subjects.len(), 2);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(summary.grand_total, 125.0);
        assert_eq!(summary.full_marks_total, 200.0);
        assert_eq!(summary.percentage, 62.5);
        assert_eq!(summary.result, ResultStatus::Pass);
        assert_eq!(summary.academic_grade, "C");
    }

    #[test]
    fn term_summary_ranks_against_active_same_grade_classmates() {
        let curriculum = vec![SubjectDefinition::numeric("Math", 60.0, 40.0)];
        let term = TermId::FirstTerm;
        let target = student("t", "VII", term, vec![activity_mark("Math", 50.0, 30.0)]);
        let mut inactive = student("x", "VII", term, vec![activity_mark("Math", 60.0, 40.0)]);
        inactive.status = StudentStatus::Inactive;
        let classmates = vec![
            student("a", "VII", term, vec![activity_mark("Math", 55.0, 40.0)]),
            student("b", "VII", term, vec![activity_mark("Math", 55.0, 40.0)]),
            student("c", "VIII", term, vec![activity_mark("Math", 60.0, 40.0)]),
            student("d", "VII", term, vec![activity_mark("Math", 10.0, 40.0)]),
            inactive,
            target.clone(),
        ];
        let e = compute_term_summary(&target, &curriculum, term, &classmates, &rules());
        assert_eq!(e.summary.grand_total, 80.0);
        assert_eq!(e.summary.rank, Rank::Placed(2));

        let e = compute_term_summary(&classmates[3], &curriculum, term, &classmates, &rules());
        assert_eq!(e.summary.result, ResultStatus::SimplePass);
        assert_eq!(e.summary.rank, Rank::Unranked);
    }

    #[test]
    fn class_report_orders_by_roll_and_ranks_densely() {
        let curriculum = vec![SubjectDefinition::numeric("Math", 100.0, 0.0)];
        let term = TermId::SecondTerm;
        let mut a = student("a", "IX", term, vec![plain_mark("Math", 90.0)]);
        a.roll_no = Some(3);
        let mut b = student("b", "IX", term, vec![plain_mark("Math", 90.0)]);
        b.roll_no = Some(1);
        let mut c = student("c", "IX", term, vec![plain_mark("Math", 70.0)]);
        c.roll_no = Some(2);
        let d = student("d", "IX", term, vec![plain_mark("Math", 20.0)]);
        let rows = compute_class_report("ix", &curriculum, term, &[a, b, c, d], &rules());
        let ids: Vec<&str> = rows.iter().map(|r| r.evaluation.student_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a", "d"]);
        let ranks: Vec<Rank> = rows.iter().map(|r| r.evaluation.summary.rank).collect();
        assert_eq!(
            ranks,
            vec![Rank::Placed(1), Rank::Placed(2), Rank::Placed(1), Rank::Unranked]
        );
    }

    #[test]
    fn student_terms_follow_stored_exam_order() {
        let curriculum = vec![SubjectDefinition::numeric("Math", 100.0, 0.0)];
        let mut s = student("s", "X", TermId::SecondTerm, vec![plain_mark("Math", 50.0)]);
        s.academic_performance.insert(
            0,
            Exam {
                id: TermId::FinalTerm,
                name: "Final".to_string(),
                results: vec![SubjectMark {
                    subject: "Math".to_string(),
                    sa_marks: Some(60.0),
                    fa_marks: Some(18.0),
                    ..Default::default()
                }],
                teacher_remarks: Some("Steady".to_string()),
                attendance: Some(Attendance {
                    total_working_days: 100.0,
                    days_present: 90.0,
                }),
            },
        );
        let terms = compute_student_terms(&s, &curriculum, &[], &rules());
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].term_id, TermId::FinalTerm);
        assert_eq!(terms[0].regime, ScoringRegime::SaFa);
        assert_eq!(terms[0].summary.grand_total, 78.0);
        assert_eq!(terms[0].summary.division, "Distinction");
        assert_eq!(terms[0].summary.rank, Rank::Placed(1));
        assert_eq!(terms[0].attendance_percentage, Some(90.0));
        assert_eq!(terms[1].regime, ScoringRegime::PlainNumeric);
        assert_eq!(terms[1].summary.grand_total, 50.0);
    }

    proptest! {
        #[test]
        fn evaluation_is_idempotent(exam in 0u32..60, activity in 0u32..40, marks in 0u32..100) {
            let curriculum = vec![
                SubjectDefinition::numeric("Math", 60.0, 40.0),
                SubjectDefinition::numeric("Science", 100.0, 0.0),
                SubjectDefinition::graded("Drawing"),
            ];
            let results = vec![
                activity_mark("Maths", exam as f64, activity as f64),
                plain_mark("Science", marks as f64),
                graded_mark("Drawing", "B"),
            ];
            let s = student("s", "VI", TermId::ThirdTerm, results);
            let a = compute_term_summary(&s, &curriculum, TermId::ThirdTerm, &[], &rules());
            let b = compute_term_summary(&s, &curriculum, TermId::ThirdTerm, &[], &rules());
            prop_assert_eq!(
                serde_json::to_string(&a).unwrap(),
                serde_json::to_string(&b).unwrap()
            );
        }

        #[test]
        fn raising_exam_marks_never_lowers_totals(
            exam in 20u32..59,
            bump in 1u32..20,
            activity in 0u32..40,
        ) {
            let curriculum = vec![
                SubjectDefinition::numeric("Math", 60.0, 40.0),
                SubjectDefinition::numeric("Science", 60.0, 40.0),
            ];
            let before = vec![
                activity_mark("Math", exam as f64, activity as f64),
                activity_mark("Science", 30.0, 20.0),
            ];
            let after = vec![
                activity_mark("Math", (exam + bump) as f64, activity as f64),
                activity_mark("Science", 30.0, 20.0),
            ];
            let r = rules();
            let (_, _, s0) = evaluate_results(&before, &curriculum, GradeBand::Middle, TermId::FirstTerm, &r);
            let (_, _, s1) = evaluate_results(&after, &curriculum, GradeBand::Middle, TermId::FirstTerm, &r);
            prop_assert!(s1.grand_total >= s0.grand_total);
            prop_assert!(s1.percentage >= s0.percentage);
        }
    }
}
