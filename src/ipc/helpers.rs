use crate::calc::CalcError;
use crate::ipc::error::calc_err;
use crate::ipc::types::Request;
use serde::de::DeserializeOwned;
use serde_json::json;

fn parse_param<T: DeserializeOwned>(key: &str, v: &serde_json::Value) -> Result<T, CalcError> {
    serde_json::from_value(v.clone()).map_err(|e| CalcError {
        code: "bad_params".to_string(),
        message: format!("invalid {}: {}", key, e),
        details: Some(json!({ "param": key })),
    })
}

/// Deserializes `params[key]`, rejecting missing and null values.
pub fn required<T: DeserializeOwned>(req: &Request, key: &str) -> Result<T, serde_json::Value> {
    match req.params.get(key) {
        None => Err(calc_err(
            &req.id,
            CalcError::new("bad_params", format!("missing {}", key)),
        )),
        Some(v) if v.is_null() => Err(calc_err(
            &req.id,
            CalcError::new("bad_params", format!("missing {}", key)),
        )),
        Some(v) => parse_param(key, v).map_err(|e| calc_err(&req.id, e)),
    }
}

/// Like `required`, but a missing or null value yields `None`.
pub fn optional<T: DeserializeOwned>(
    req: &Request,
    key: &str,
) -> Result<Option<T>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => parse_param(key, v)
            .map(Some)
            .map_err(|e| calc_err(&req.id, e)),
    }
}

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            calc_err(
                &req.id,
                CalcError::new("bad_params", format!("missing {}", key)),
            )
        })
}
