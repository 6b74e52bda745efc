use tracing::warn;

use super::client::GeminiError;
use super::types::GenerateContentResponse;

/// Concatenates the text parts of the first candidate.
///
/// A response with no text at all (blocked prompt, safety stop, empty
/// candidate list) is an error rather than an empty string, so the caller
/// never hands "" to the JSON parser.
pub fn extract_text(response: &GenerateContentResponse) -> Result<String, GeminiError> {
    let candidate = response.candidates.as_ref().and_then(|c| c.first());

    let text: String = candidate
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .map(|part| part.text.as_str())
                .collect()
        })
        .unwrap_or_default();

    if !text.trim().is_empty() {
        return Ok(text);
    }

    let reason = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.clone())
        .map(|r| format!("prompt blocked: {r}"))
        .or_else(|| {
            candidate
                .and_then(|c| c.finish_reason.clone())
                .map(|r| format!("finish reason: {r}"))
        })
        .unwrap_or_else(|| "no candidates returned".to_string());

    warn!(%reason, "Gemini returned empty answer");
    Err(GeminiError::EmptyResponse(reason))
}
