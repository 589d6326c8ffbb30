use crate::cache::ReportKey;
use crate::calc::{self, ScoringRegime};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional, required, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{Student, SubjectDefinition, SubjectMark, TermId};
use crate::rank::{self, CohortEntry};
use serde_json::json;

fn classmates(req: &Request) -> Result<Vec<Student>, serde_json::Value> {
    optional(req, "classmates").map(|v| v.unwrap_or_default())
}

fn handle_score_subject(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject: SubjectDefinition = match required(req, "subject") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let result: Option<SubjectMark> = match optional(req, "result") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let grade = match required_str(req, "grade") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let term: TermId = match required(req, "termId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let band = state.rules.band_for_grade(&grade);
    let outcome = calc::score(result.as_ref(), &subject, band, term, &state.rules);
    ok(
        &req.id,
        json!({
            "gradeBand": band,
            "regime": ScoringRegime::select(band, term),
            "outcome": outcome,
        }),
    )
}

fn handle_rank(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let cohort: Vec<CohortEntry> = match required(req, "classmates") {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(&req.id, json!({ "rank": rank::rank(&student_id, &cohort) }))
}

fn handle_term_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student: Student = match required(req, "student") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let curriculum: Vec<SubjectDefinition> = match required(req, "curriculum") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let term: TermId = match required(req, "termId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let classmates = match classmates(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if student.exam(term).is_none() {
        return err(
            &req.id,
            "not_found",
            format!("student {} has no exam for {}", student.id, term.as_str()),
            Some(json!({ "studentId": student.id, "termId": term })),
        );
    }

    let eval = calc::compute_term_summary(&student, &curriculum, term, &classmates, &state.rules);
    ok(&req.id, json!(eval))
}

fn handle_student_terms(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student: Student = match required(req, "student") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let curriculum: Vec<SubjectDefinition> = match required(req, "curriculum") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let classmates = match classmates(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let terms = calc::compute_student_terms(&student, &curriculum, &classmates, &state.rules);
    ok(
        &req.id,
        json!({
            "studentId": student.id,
            "terms": terms,
        }),
    )
}

fn handle_class_report(state: &mut AppState, req: &Request) -> serde_json::Value {
    let grade = match required_str(req, "grade") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let curriculum: Vec<SubjectDefinition> = match required(req, "curriculum") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let term: TermId = match required(req, "termId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let roster: Vec<Student> = match required(req, "roster") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let key = match ReportKey::new(&grade, term, &roster, &curriculum) {
        Ok(k) => k,
        Err(e) => return err(&req.id, "bad_params", format!("{e:#}"), None),
    };
    let band = state.rules.band_for_grade(&grade);

    if let Some(rows) = state.reports.get(&key) {
        tracing::debug!(grade = %grade, term = term.as_str(), "class report cache hit");
        return ok(
            &req.id,
            json!({
                "grade": grade,
                "termId": term,
                "gradeBand": band,
                "rosterVersion": key.roster_version,
                "cached": true,
                "rows": rows,
            }),
        );
    }

    tracing::debug!(grade = %grade, term = term.as_str(), students = roster.len(), "class report cache miss");
    let rows = calc::compute_class_report(&grade, &curriculum, term, &roster, &state.rules);
    let resp = ok(
        &req.id,
        json!({
            "grade": grade,
            "termId": term,
            "gradeBand": band,
            "rosterVersion": key.roster_version,
            "cached": false,
            "rows": rows,
        }),
    );
    state.reports.insert(key, rows);
    resp
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "results.scoreSubject" => Some(handle_score_subject(state, req)),
        "results.rank" => Some(handle_rank(state, req)),
        "results.termSummary" => Some(handle_term_summary(state, req)),
        "results.studentTerms" => Some(handle_student_terms(state, req)),
        "results.classReport" => Some(handle_class_report(state, req)),
        _ => None,
    }
}
