//! Response normalization: provider text → `AnalysisResult`.
//!
//! Two stages, kept separate: `strip_fences` removes a Markdown code fence
//! the model may have added despite instructions, `parse_result` parses the
//! remainder as strict JSON and validates its shape.
//!
//! Score policy: a JSON integer, a float (rounded half away from zero) or a
//! numeric string is accepted; anything outside 0..=100 after rounding is
//! rejected, never clamped.

use serde_json::Value;

use crate::analysis::{AnalysisError, AnalysisResult};

const FENCE: &str = "```";
const MAX_SCORE: f64 = 100.0;

/// Full normalization of a raw provider reply.
pub fn normalize(raw: &str) -> Result<AnalysisResult, AnalysisError> {
    parse_result(strip_fences(raw), raw)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text.strip_prefix(FENCE) else {
        return text;
    };

    let inner = match inner.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &inner[4..],
        _ => inner,
    };

    inner
        .trim_start()
        .strip_suffix(FENCE)
        .unwrap_or(inner)
        .trim()
}

/// Parses fence-free text into a validated result. `raw` is the untouched
/// provider reply, carried into `MalformedResponse` for diagnostics.
pub fn parse_result(cleaned: &str, raw: &str) -> Result<AnalysisResult, AnalysisError> {
    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| AnalysisError::malformed(raw, format!("not valid JSON: {e}")))?;

    let object = value
        .as_object()
        .ok_or_else(|| AnalysisError::malformed(raw, "expected a JSON object"))?;

    let score = object
        .get("score")
        .ok_or_else(|| AnalysisError::malformed(raw, "missing field `score`"))
        .and_then(|v| coerce_score(v).map_err(|reason| AnalysisError::malformed(raw, reason)))?;

    let feedback = match object.get("feedback") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(AnalysisError::malformed(raw, "`feedback` must be a string")),
        None => return Err(AnalysisError::malformed(raw, "missing field `feedback`")),
    };

    Ok(AnalysisResult { score, feedback })
}

fn coerce_score(value: &Value) -> Result<u8, String> {
    let number = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("`score` {n} is not representable"))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("`score` string {s:?} is not a number"))?,
        other => return Err(format!("`score` must be a number, got {other}")),
    };

    if !number.is_finite() {
        return Err(format!("`score` {number} is not finite"));
    }

    let rounded = number.round();
    if !(0.0..=MAX_SCORE).contains(&rounded) {
        return Err(format!("`score` {number} is outside 0..=100"));
    }

    Ok(rounded as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(err: AnalysisError) -> (String, String) {
        match err {
            AnalysisError::MalformedResponse { raw, reason } => (raw, reason),
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[test]
    fn test_strip_fences_with_json_tag() {
        let input = "```json\n{\"score\":80,\"feedback\":\"ok\"}\n```";
        assert_eq!(strip_fences(input), "{\"score\":80,\"feedback\":\"ok\"}");
    }

    #[test]
    fn test_strip_fences_with_uppercase_tag_and_padding() {
        let input = "  \n```JSON\n{\"a\": 1}\n```\n ";
        assert_eq!(strip_fences(input), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_fences_single_line() {
        assert_eq!(strip_fences("```json{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn test_strip_fences_unterminated_fence() {
        assert_eq!(strip_fences("```json\n{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_strip_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_fences(input), input);
    }

    #[test]
    fn test_normalize_fenced_reply() {
        let result = normalize("```json\n{\"score\":80,\"feedback\":\"ok\"}\n```").unwrap();
        assert_eq!(
            result,
            AnalysisResult {
                score: 80,
                feedback: "ok".to_string()
            }
        );
    }

    #[test]
    fn test_normalize_is_identity_on_serialized_results() {
        for (score, feedback) in [(0, ""), (42, "Solid \"backend\" match\nbut no Rust"), (100, "✓")] {
            let original = AnalysisResult {
                score,
                feedback: feedback.to_string(),
            };
            let json = serde_json::to_string(&original).unwrap();
            assert_eq!(normalize(&json).unwrap(), original);
        }
    }

    #[test]
    fn test_missing_score_is_rejected() {
        let (raw, why) = reason(normalize("{\"feedback\":\"ok\"}").unwrap_err());
        assert_eq!(raw, "{\"feedback\":\"ok\"}");
        assert!(why.contains("score"));
    }

    #[test]
    fn test_out_of_range_score_is_rejected_not_clamped() {
        let (_, why) = reason(normalize("{\"score\":150,\"feedback\":\"x\"}").unwrap_err());
        assert!(why.contains("outside"));
        assert!(normalize("{\"score\":-1,\"feedback\":\"x\"}").is_err());
        assert!(normalize("{\"score\":100.6,\"feedback\":\"x\"}").is_err());
    }

    #[test]
    fn test_float_and_string_scores_are_coerced() {
        assert_eq!(normalize("{\"score\":72.5,\"feedback\":\"\"}").unwrap().score, 73);
        assert_eq!(normalize("{\"score\":72.4,\"feedback\":\"\"}").unwrap().score, 72);
        assert_eq!(normalize("{\"score\":\" 64 \",\"feedback\":\"\"}").unwrap().score, 64);
        assert_eq!(normalize("{\"score\":-0.4,\"feedback\":\"\"}").unwrap().score, 0);
    }

    #[test]
    fn test_non_numeric_score_is_rejected() {
        assert!(normalize("{\"score\":\"high\",\"feedback\":\"x\"}").is_err());
        assert!(normalize("{\"score\":\"NaN\",\"feedback\":\"x\"}").is_err());
        assert!(normalize("{\"score\":null,\"feedback\":\"x\"}").is_err());
        assert!(normalize("{\"score\":true,\"feedback\":\"x\"}").is_err());
    }

    #[test]
    fn test_feedback_must_be_a_string() {
        assert!(normalize("{\"score\":50}").is_err());
        assert!(normalize("{\"score\":50,\"feedback\":null}").is_err());
        assert!(normalize("{\"score\":50,\"feedback\":[\"a\"]}").is_err());
    }

    #[test]
    fn test_prose_reply_is_malformed_and_keeps_raw_text() {
        let raw = "Sure! Here is my analysis: the candidate is great.";
        let (kept, why) = reason(normalize(raw).unwrap_err());
        assert_eq!(kept, raw);
        assert!(why.contains("not valid JSON"));
    }

    #[test]
    fn test_non_object_json_is_malformed() {
        assert!(normalize("[80, \"ok\"]").is_err());
        assert!(normalize("80").is_err());
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let result = normalize("{\"score\":90,\"feedback\":\"great\",\"strengths\":[]}").unwrap();
        assert_eq!(result.score, 90);
        assert_eq!(result.feedback, "great");
    }
}
