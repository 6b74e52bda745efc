use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::FanOutError;
use super::mode::{Mode, PromptVariant};
use super::parser;
use super::prompt::build_prompt;
use super::types::{ExpandedQuery, FanOutRequest, FanOutResult};
use crate::gemini::TextGenerator;

/// Upper bound on one lookup (prompt + model call + parse).
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub mode: Mode,
    pub variant: PromptVariant,
    pub lookup_timeout: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            variant: PromptVariant::default(),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }
}

/// One expanded query, tagged with the lookup that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FanOutRow {
    pub lookup_query: String,
    #[serde(flatten)]
    pub query: ExpandedQuery,
}

/// Generation plan of one successful lookup, next to what was actually produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummary {
    pub lookup_query: String,
    pub target_query_count: Option<Value>,
    pub reasoning_for_count: String,
    pub generated_count: usize,
    pub count_mismatch: bool,
}

impl PlanSummary {
    /// The model's target as display text; a JSON string is shown unquoted.
    pub fn target_text(&self) -> Option<String> {
        self.target_query_count.as_ref().map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupError {
    pub lookup_query: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

/// Everything one run produced. Successes and failures coexist; a failed
/// lookup has an entry in `errors` and no entry in `plans`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub mode: Mode,
    pub variant: PromptVariant,
    pub total_lookups: usize,
    pub rows: Vec<FanOutRow>,
    pub plans: Vec<PlanSummary>,
    pub errors: Vec<LookupError>,
}

impl BatchOutcome {
    fn new(options: &BatchOptions, total_lookups: usize) -> Self {
        Self {
            mode: options.mode,
            variant: options.variant,
            total_lookups,
            rows: Vec::new(),
            plans: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// True when no expanded query was produced, for whatever reason.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when every lookup failed, as opposed to the model returning nothing.
    pub fn all_failed(&self) -> bool {
        self.total_lookups > 0 && self.errors.len() == self.total_lookups
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &PlanSummary> {
        self.plans.iter().filter(|p| p.count_mismatch)
    }

    pub fn invalid_rows(&self) -> usize {
        self.rows.iter().filter(|r| !r.query.is_valid()).count()
    }

    fn record_success(&mut self, lookup_query: &str, result: FanOutResult) {
        let count_mismatch = result.count_mismatch().is_some();
        let generated_count = result.queries.len();
        let FanOutResult { plan, queries } = result;

        self.plans.push(PlanSummary {
            lookup_query: lookup_query.to_string(),
            target_query_count: plan.target_query_count,
            reasoning_for_count: plan.reasoning_for_count,
            generated_count,
            count_mismatch,
        });
        self.rows.extend(queries.into_iter().map(|query| FanOutRow {
            lookup_query: lookup_query.to_string(),
            query,
        }));
    }

    fn record_failure(&mut self, lookup_query: &str, err: &FanOutError) {
        self.errors.push(LookupError {
            lookup_query: lookup_query.to_string(),
            error: err.to_string(),
            raw_response: err.raw_response().map(str::to_string),
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStatus {
    Succeeded { generated: usize },
    Failed,
}

/// Emitted after each lookup reaches a terminal state.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    pub completed: usize,
    pub total: usize,
    pub lookup_query: &'a str,
    pub status: LookupStatus,
}

impl Progress<'_> {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Builds the prompt, calls the model once and parses its answer.
pub async fn fan_out(
    generator: &impl TextGenerator,
    request: &FanOutRequest,
    variant: PromptVariant,
) -> Result<FanOutResult, FanOutError> {
    let prompt = build_prompt(request.query(), request.mode(), variant);
    debug!(query = %request.query(), bytes = prompt.len(), "prompt built");

    let raw = generator.generate(&prompt).await?;
    let result = parser::parse(&raw).inspect_err(|e| {
        debug!(raw = %e.raw, "unparseable model response");
    })?;

    if let Some((target, actual)) = result.count_mismatch() {
        warn!(query = %request.query(), target, actual, "model aimed for a different query count");
    }
    Ok(result)
}

/// Runs every lookup in input order, one at a time. A failing lookup is
/// recorded and the loop moves on; nothing escapes the batch.
pub async fn run_batch(
    generator: &impl TextGenerator,
    lookups: &[String],
    options: &BatchOptions,
    mut on_progress: impl FnMut(Progress<'_>),
) -> BatchOutcome {
    let total = lookups.len();
    let mut outcome = BatchOutcome::new(options, total);

    info!(lookups = total, mode = ?options.mode, variant = ?options.variant, "batch started");

    for (i, lookup) in lookups.iter().enumerate() {
        let attempt = match FanOutRequest::new(lookup, options.mode) {
            Ok(request) => {
                let result = tokio::time::timeout(
                    options.lookup_timeout,
                    fan_out(generator, &request, options.variant),
                )
                .await
                .unwrap_or_else(|_| Err(FanOutError::Timeout(options.lookup_timeout)));
                result.map(|r| (request, r))
            }
            Err(e) => Err(e),
        };

        let status = match attempt {
            Ok((request, result)) => {
                let generated = result.queries.len();
                info!(query = %request.query(), generated, "lookup processed");
                outcome.record_success(request.query(), result);
                LookupStatus::Succeeded { generated }
            }
            Err(e) => {
                warn!(query = %lookup, error = %e, "lookup failed (continuing with remaining lookups)");
                outcome.record_failure(lookup.trim(), &e);
                LookupStatus::Failed
            }
        };

        on_progress(Progress {
            completed: i + 1,
            total,
            lookup_query: lookup.trim(),
            status,
        });
    }

    info!(
        rows = outcome.rows.len(),
        failed = outcome.errors.len(),
        mismatched = outcome.mismatches().count(),
        "batch complete"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::GeminiError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted responses in call order and records the prompts it saw.
    struct MockGenerator {
        responses: Mutex<VecDeque<Result<String, GeminiError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl MockGenerator {
        fn new(responses: Vec<Result<String, GeminiError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn texts(texts: &[&str]) -> Self {
            Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
        }

        fn captured_prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl TextGenerator for MockGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GeminiError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(GeminiError::RateLimited))
        }
    }

    struct SlowGenerator;

    impl TextGenerator for SlowGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GeminiError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("{}".into())
        }
    }

    fn response_json(target: Option<u64>, queries: &[&str]) -> String {
        let items: Vec<Value> = queries
            .iter()
            .map(|q| {
                serde_json::json!({
                    "query": q,
                    "type": "related",
                    "user_intent": "learn",
                    "reasoning": "because",
                    "routing_format": "web_article",
                    "format_reason": "general reading"
                })
            })
            .collect();
        serde_json::json!({
            "generation_details": {
                "target_query_count": target,
                "reasoning_for_count": "test plan"
            },
            "expanded_queries": items
        })
        .to_string()
    }

    fn lookups(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn complex() -> BatchOptions {
        BatchOptions {
            mode: Mode::Complex,
            ..BatchOptions::default()
        }
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_batch() {
        let ok = response_json(Some(1), &["x"]);
        let mock = MockGenerator::new(vec![
            Ok(ok.clone()),
            Ok(ok.clone()),
            Err(GeminiError::Api {
                code: 500,
                message: "boom".into(),
            }),
            Ok(ok.clone()),
        ]);

        let outcome = run_batch(&mock, &lookups(&["a", "b", "c", "d"]), &complex(), |_| {}).await;

        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].lookup_query, "c");
        assert!(outcome.errors[0].error.contains("boom"));
        let tagged: Vec<_> = outcome.rows.iter().map(|r| r.lookup_query.as_str()).collect();
        assert_eq!(tagged, ["a", "b", "d"]);
        assert_eq!(outcome.plans.len(), 3);
        assert!(!outcome.all_failed());
    }

    #[tokio::test]
    async fn mixed_valid_and_malformed_responses() {
        let fenced = format!(
            "```json\n{}\n```",
            response_json(Some(5), &["q1", "q2", "q3", "q4", "q5"])
        );
        let mock = MockGenerator::texts(&[fenced.as_str(), "I cannot produce JSON today."]);

        let outcome = run_batch(&mock, &lookups(&["a", "b"]), &complex(), |_| {}).await;

        assert_eq!(outcome.rows.len(), 5);
        assert!(outcome.rows.iter().all(|r| r.lookup_query == "a"));
        let order: Vec<_> = outcome.rows.iter().map(|r| r.query.query.as_str()).collect();
        assert_eq!(order, ["q1", "q2", "q3", "q4", "q5"]);

        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].lookup_query, "b");
        assert_eq!(
            outcome.errors[0].raw_response.as_deref(),
            Some("I cannot produce JSON today.")
        );

        assert_eq!(outcome.plans.len(), 1);
        assert_eq!(outcome.plans[0].lookup_query, "a");
        assert!(!outcome.plans[0].count_mismatch);
    }

    #[tokio::test]
    async fn count_mismatch_is_flagged_in_summary() {
        let nine: Vec<String> = (0..9).map(|i| format!("q{i}")).collect();
        let nine: Vec<&str> = nine.iter().map(String::as_str).collect();
        let body = response_json(Some(12), &nine);
        let mock = MockGenerator::texts(&[body.as_str()]);

        let outcome = run_batch(&mock, &lookups(&["a"]), &complex(), |_| {}).await;

        let plan = &outcome.plans[0];
        assert_eq!(plan.target_query_count, Some(serde_json::json!(12)));
        assert_eq!(plan.generated_count, 9);
        assert!(plan.count_mismatch);
        assert_eq!(outcome.mismatches().count(), 1);
    }

    #[tokio::test]
    async fn plan_recorded_even_when_no_queries() {
        let body = response_json(Some(0), &[]);
        let mock = MockGenerator::texts(&[body.as_str()]);

        let outcome = run_batch(&mock, &lookups(&["a"]), &complex(), |_| {}).await;

        assert!(outcome.is_empty());
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.plans.len(), 1);
        assert_eq!(outcome.plans[0].generated_count, 0);
        assert!(!outcome.all_failed());
    }

    #[tokio::test]
    async fn model_key_cannot_retag_row() {
        let mock = MockGenerator::texts(&[
            r#"{"expanded_queries":[{"query":"x","lookup_query":"hijacked"}]}"#,
        ]);

        let outcome = run_batch(&mock, &lookups(&["real"]), &complex(), |_| {}).await;

        let json = serde_json::to_string(&outcome.rows[0]).unwrap();
        let row: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(row["lookup_query"], "real");
        assert_eq!(row["model_lookup_query"], "hijacked");
    }

    #[test]
    fn target_text_unquotes_strings() {
        let mut plan = PlanSummary {
            lookup_query: "a".into(),
            target_query_count: Some(serde_json::json!("twelve")),
            reasoning_for_count: String::new(),
            generated_count: 0,
            count_mismatch: false,
        };
        assert_eq!(plan.target_text().as_deref(), Some("twelve"));
        plan.target_query_count = Some(serde_json::json!(12));
        assert_eq!(plan.target_text().as_deref(), Some("12"));
        plan.target_query_count = None;
        assert_eq!(plan.target_text(), None);
    }

    #[tokio::test]
    async fn all_failed_is_distinguishable() {
        let mock = MockGenerator::texts(&["nope", "still nope"]);

        let outcome = run_batch(&mock, &lookups(&["a", "b"]), &complex(), |_| {}).await;

        assert!(outcome.is_empty());
        assert!(outcome.all_failed());
        assert!(outcome.plans.is_empty());
    }

    #[tokio::test]
    async fn progress_counts_completed_lookups() {
        let ok = response_json(Some(1), &["x"]);
        let mock = MockGenerator::texts(&[ok.as_str(), "bad", ok.as_str()]);
        let mut seen = Vec::new();

        run_batch(&mock, &lookups(&["a", "b", "c"]), &complex(), |p| {
            seen.push((p.completed, p.fraction(), p.lookup_query.to_string(), p.status));
        })
        .await;

        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].0, 1);
        assert_eq!(seen[1].2, "b");
        assert_eq!(seen[1].3, LookupStatus::Failed);
        assert_eq!(seen[2].3, LookupStatus::Succeeded { generated: 1 });
        assert!((seen[2].1 - 1.0).abs() < f64::EPSILON);
        assert!((seen[0].1 - 1.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn prompts_follow_input_order_and_mode() {
        let ok = response_json(Some(1), &["x"]);
        let mock = MockGenerator::texts(&[ok.as_str(), ok.as_str()]);
        let options = BatchOptions {
            mode: Mode::Simple,
            variant: PromptVariant::Standard,
            ..BatchOptions::default()
        };

        let outcome = run_batch(&mock, &lookups(&["first", "second"]), &options, |_| {}).await;

        let prompts = mock.captured_prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("\"first\""));
        assert!(prompts[1].contains("\"second\""));
        assert!(prompts[0].contains(Mode::Simple.label()));
        assert_eq!(outcome.variant, PromptVariant::Standard);
    }

    #[tokio::test]
    async fn blank_lookup_is_recorded_without_calling_model() {
        let ok = response_json(Some(1), &["x"]);
        let mock = MockGenerator::texts(&[ok.as_str()]);

        let outcome = run_batch(&mock, &lookups(&["   ", "a"]), &complex(), |_| {}).await;

        assert_eq!(mock.captured_prompts().len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].error.contains("empty"));
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].lookup_query, "a");
    }

    #[tokio::test]
    async fn lookup_timeout_is_a_per_item_failure() {
        let options = BatchOptions {
            lookup_timeout: Duration::from_millis(50),
            ..complex()
        };

        let outcome = run_batch(&SlowGenerator, &lookups(&["a"]), &options, |_| {}).await;

        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].error.contains("timed out"));
    }

    #[tokio::test]
    async fn empty_batch_completes_immediately() {
        let mock = MockGenerator::texts(&[]);
        let outcome = run_batch(&mock, &[], &complex(), |_| panic!("no progress expected")).await;
        assert_eq!(outcome.total_lookups, 0);
        assert!(!outcome.all_failed());
    }
}
