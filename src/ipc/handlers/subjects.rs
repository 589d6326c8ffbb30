use crate::ipc::error::ok;
use crate::ipc::helpers::{optional, required, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{SubjectDefinition, SubjectMark};
use crate::subjects;
use serde_json::json;

fn handle_subjects_classify(state: &mut AppState, req: &Request) -> serde_json::Value {
    let curriculum: Vec<SubjectDefinition> = match required(req, "curriculum") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let results: Vec<SubjectMark> = match optional(req, "results") {
        Ok(v) => v.unwrap_or_default(),
        Err(e) => return e,
    };
    let classified = subjects::classify(&curriculum, &results, state.rules.synthesized_full_marks);
    ok(&req.id, json!(classified))
}

/// `subject` may be a plain name or a full subject definition.
fn handle_subjects_resolve(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let results: Vec<SubjectMark> = match required(req, "results") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = if req.params.get("subject").map(|v| v.is_object()).unwrap_or(false) {
        match required::<SubjectDefinition>(req, "subject") {
            Ok(def) => def.name,
            Err(e) => return e,
        }
    } else {
        match required_str(req, "subject") {
            Ok(v) => v,
            Err(e) => return e,
        }
    };

    match subjects::resolve_detailed(&results, &name) {
        Some(r) => ok(
            &req.id,
            json!({
                "match": r.mark,
                "exact": r.exact,
                "candidates": r.candidates,
            }),
        ),
        None => ok(
            &req.id,
            json!({
                "match": null,
                "exact": false,
                "candidates": 0,
            }),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "subjects.classify" => Some(handle_subjects_classify(state, req)),
        "subjects.resolve" => Some(handle_subjects_resolve(state, req)),
        _ => None,
    }
}
