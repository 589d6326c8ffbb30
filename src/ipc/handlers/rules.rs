use crate::config::{RulesConfig, RulesSource};
use crate::ipc::error::{calc_err, err, ok};
use crate::ipc::helpers::optional;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn rules_json(state: &AppState) -> serde_json::Value {
    json!({
        "source": state.rules_source.describe(),
        "rules": serde_json::to_value(&state.rules).unwrap_or_else(|_| json!({})),
    })
}

fn handle_rules_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, rules_json(state))
}

fn install(state: &mut AppState, rules: RulesConfig, source: RulesSource) {
    tracing::info!(source = %source.describe(), "rules reloaded");
    state.rules = rules;
    state.rules_source = source;
    // Cached reports were computed under the old thresholds.
    state.reports.clear();
}

/// Accepts either `path` (a JSON rules file) or an inline `rules` object.
/// Nothing changes unless the new table validates.
fn handle_rules_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let inline: Option<RulesConfig> = match optional(req, "rules") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Some(rules) = inline {
        if let Err(e) = rules.validate() {
            return calc_err(&req.id, e);
        }
        install(state, rules, RulesSource::Inline);
        return ok(&req.id, rules_json(state));
    }

    let Some(path) = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
    else {
        return err(&req.id, "bad_params", "missing params.path or params.rules", None);
    };
    match RulesConfig::from_json_file(&path) {
        Ok(rules) => {
            install(state, rules, RulesSource::File(path));
            ok(&req.id, rules_json(state))
        }
        Err(e) => {
            let message = format!("{e:#}");
            tracing::warn!(path = %path.to_string_lossy(), error = %message, "rules load failed");
            err(&req.id, "rules_load_failed", message, None)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "rules.get" => Some(handle_rules_get(state, req)),
        "rules.load" => Some(handle_rules_load(state, req)),
        _ => None,
    }
}
