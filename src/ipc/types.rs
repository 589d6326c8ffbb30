use crate::cache::ReportCache;
use crate::config::{RulesConfig, RulesSource};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub rules: RulesConfig,
    pub rules_source: RulesSource,
    pub reports: ReportCache,
}

impl AppState {
    pub fn new(rules: RulesConfig, rules_source: RulesSource) -> Self {
        Self {
            rules,
            rules_source,
            reports: ReportCache::default(),
        }
    }
}
