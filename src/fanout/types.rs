use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::error::FanOutError;
use super::labels::{QueryType, RoutingFormat};
use super::mode::Mode;

/// One user lookup, validated at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutRequest {
    query: String,
    mode: Mode,
}

impl FanOutRequest {
    pub fn new(query: &str, mode: Mode) -> Result<Self, FanOutError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(FanOutError::EmptyQuery);
        }
        Ok(Self {
            query: query.to_string(),
            mode,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}

/// The model's own count decision. Advisory only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationPlan {
    /// Whatever the model put there, for display.
    pub target_query_count: Option<Value>,
    pub reasoning_for_count: String,
}

impl GenerationPlan {
    /// The target, if the model gave a non-negative integer.
    pub fn target_count(&self) -> Option<u64> {
        self.target_query_count.as_ref().and_then(Value::as_u64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpandedQuery {
    pub query: String,
    #[serde(rename = "type")]
    pub query_type: QueryType,
    pub user_intent: String,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_format: Option<RoutingFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_reason: Option<String>,
    /// Keys the model added beyond the requested schema.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl ExpandedQuery {
    /// A row with an empty query is passed through but is not usable output.
    pub fn is_valid(&self) -> bool {
        !self.query.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FanOutResult {
    pub plan: GenerationPlan,
    /// Model output order.
    pub queries: Vec<ExpandedQuery>,
}

impl FanOutResult {
    /// `(target, actual)` when the model declared an integer target and
    /// produced a different number of items.
    pub fn count_mismatch(&self) -> Option<(u64, usize)> {
        let target = self.plan.target_count()?;
        let actual = self.queries.len();
        (target != actual as u64).then_some((target, actual))
    }
}
