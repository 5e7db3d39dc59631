//! Response envelope inspection and idea extraction.
//!
//! Every response is inspected in full before it is declared a success:
//! 1. `promptFeedback.blockReason` -> blocked
//! 2. missing or empty `candidates` -> no candidates
//! 3. a policy `finishReason` on the first candidate -> blocked
//! 4. otherwise the first candidate's `content.parts` are examined

use serde_json::Value;

use crate::error::{AnalysisError, ExplorationError, GenerationError};
use crate::types::{EncodedImage, Idea};

const POLICY_FINISH_REASONS: [&str; 5] = [
    "SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
    "IMAGE_SAFETY",
];

/// Outcome of inspecting a `generateContent` response.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// The first candidate's parts (possibly empty).
    Parts(Vec<Value>),
    /// Refused for policy reasons; carries the reported reason.
    Blocked(String),
    /// No candidates at all.
    NoCandidates,
}

/// Classify a raw response body.
pub fn inspect(response: &Value) -> Envelope {
    if let Some(reason) = response
        .pointer("/promptFeedback/blockReason")
        .and_then(|v| v.as_str())
    {
        return Envelope::Blocked(reason.to_string());
    }

    let candidate = match response
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
    {
        Some(c) => c,
        None => return Envelope::NoCandidates,
    };

    if let Some(reason) = candidate.get("finishReason").and_then(|v| v.as_str()) {
        if POLICY_FINISH_REASONS.contains(&reason) {
            return Envelope::Blocked(reason.to_string());
        }
    }

    let parts = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .cloned()
        .unwrap_or_default();
    Envelope::Parts(parts)
}

/// Concatenated non-thought text parts, trimmed. `None` if there is no text.
pub fn text_of(parts: &[Value]) -> Option<String> {
    let text: String = parts
        .iter()
        .filter(|p| !p.get("thought").and_then(|t| t.as_bool()).unwrap_or(false))
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join("");
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// First inline image part, accepting both `inlineData` and `inline_data`.
pub fn inline_image_of(parts: &[Value]) -> Option<EncodedImage> {
    parts.iter().find_map(|p| {
        let inline = p.get("inlineData").or_else(|| p.get("inline_data"))?;
        let data = inline.get("data").and_then(|d| d.as_str())?;
        if data.is_empty() {
            return None;
        }
        let mime_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(|m| m.as_str())
            .unwrap_or("image/png");
        Some(EncodedImage::new(mime_type, data))
    })
}

/// Extract the analysis text from a response.
pub fn analysis_from_response(response: &Value) -> Result<String, AnalysisError> {
    match inspect(response) {
        Envelope::Blocked(reason) => Err(AnalysisError::Blocked(reason)),
        Envelope::NoCandidates => Err(AnalysisError::EmptyResponse),
        Envelope::Parts(parts) => text_of(&parts).ok_or(AnalysisError::EmptyResponse),
    }
}

/// Extract up to `limit` ideas from a response.
pub fn ideas_from_response(response: &Value, limit: usize) -> Result<Vec<Idea>, ExplorationError> {
    match inspect(response) {
        Envelope::Blocked(reason) => Err(ExplorationError::Blocked(reason)),
        Envelope::NoCandidates => Err(ExplorationError::EmptyResponse),
        Envelope::Parts(parts) => {
            let text = text_of(&parts).ok_or(ExplorationError::EmptyResponse)?;
            let mut ideas = parse_ideas(&text)?;
            ideas.truncate(limit);
            Ok(ideas)
        }
    }
}

/// Extract the generated image from a response.
pub fn image_from_response(response: &Value) -> Result<EncodedImage, GenerationError> {
    match inspect(response) {
        Envelope::Blocked(reason) => Err(GenerationError::Blocked(reason)),
        Envelope::NoCandidates => Err(GenerationError::NoCandidates),
        Envelope::Parts(parts) => {
            inline_image_of(&parts).ok_or_else(|| GenerationError::NoImageInResponse {
                text: text_of(&parts),
            })
        }
    }
}

/// Parse model text as a list of ideas with exactly `description` and
/// `suggestedPrompt` string fields.
///
/// Markdown code fences and surrounding chatter are tolerated; anything that
/// does not validate against the schema is a `MalformedResponse`.
pub fn parse_ideas(text: &str) -> Result<Vec<Idea>, ExplorationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExplorationError::EmptyResponse);
    }

    let candidate = extract_json_block(trimmed)
        .or_else(|| bracketed(trimmed))
        .unwrap_or_else(|| trimmed.to_string());

    let ideas: Vec<Idea> = serde_json::from_str(&candidate)
        .map_err(|e| ExplorationError::MalformedResponse(format!("{}: {}", e, preview(trimmed))))?;

    if let Some(pos) = ideas
        .iter()
        .position(|i| i.suggested_prompt.trim().is_empty())
    {
        return Err(ExplorationError::MalformedResponse(format!(
            "idea {} has an empty suggestedPrompt",
            pos
        )));
    }

    Ok(ideas)
}

/// Extract JSON from ```json ... ``` code blocks.
fn extract_json_block(text: &str) -> Option<String> {
    for marker in ["```json", "```JSON", "```"] {
        if let Some(start) = text.find(marker) {
            let content_start = start + marker.len();
            if let Some(end) = text[content_start..].find("```") {
                return Some(text[content_start..content_start + end].trim().to_string());
            }
        }
    }
    None
}

/// The span from the first `[` to the last `]` of prose wrapped around an array.
/// Text that is already JSON is left for the strict parse.
fn bracketed(text: &str) -> Option<String> {
    if text.starts_with('[') || text.starts_with('{') {
        return None;
    }
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    Some(text[start..=end].to_string())
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_response(text: &str) -> Value {
        json!({
            "candidates": [{
                "content": {"parts": [{"text": text}], "role": "model"},
                "finishReason": "STOP"
            }]
        })
    }

    // ── Envelope ──

    #[test]
    fn prompt_feedback_block_wins() {
        let resp = json!({
            "promptFeedback": {"blockReason": "SAFETY"},
            "candidates": []
        });
        assert_eq!(inspect(&resp), Envelope::Blocked("SAFETY".into()));
    }

    #[test]
    fn missing_candidates() {
        assert_eq!(inspect(&json!({})), Envelope::NoCandidates);
        assert_eq!(inspect(&json!({"candidates": []})), Envelope::NoCandidates);
    }

    #[test]
    fn policy_finish_reason_is_blocked() {
        let resp = json!({"candidates": [{"finishReason": "IMAGE_SAFETY"}]});
        assert_eq!(inspect(&resp), Envelope::Blocked("IMAGE_SAFETY".into()));
    }

    #[test]
    fn text_skips_thought_parts() {
        let parts = vec![
            json!({"text": "pondering", "thought": true}),
            json!({"text": "OBJECTS: "}),
            json!({"text": "cat"}),
        ];
        assert_eq!(text_of(&parts), Some("OBJECTS: cat".into()));
        assert_eq!(text_of(&[json!({"text": "   "})]), None);
    }

    // ── Analysis ──

    #[test]
    fn analysis_text_extracted() {
        let resp = text_response("OBJECTS:\n  MAIN_SUBJECT: cat");
        assert_eq!(
            analysis_from_response(&resp).unwrap(),
            "OBJECTS:\n  MAIN_SUBJECT: cat"
        );
    }

    #[test]
    fn analysis_empty_and_blocked_are_distinct() {
        assert_eq!(
            analysis_from_response(&text_response("")),
            Err(AnalysisError::EmptyResponse)
        );
        assert_eq!(
            analysis_from_response(&json!({"candidates": []})),
            Err(AnalysisError::EmptyResponse)
        );
        assert_eq!(
            analysis_from_response(&json!({"promptFeedback": {"blockReason": "OTHER"}})),
            Err(AnalysisError::Blocked("OTHER".into()))
        );
    }

    // ── Ideas ──

    #[test]
    fn ideas_direct_json() {
        let ideas = parse_ideas(
            r#"[{"description": "a face in the bark", "suggestedPrompt": "an ancient tree spirit"}]"#,
        )
        .unwrap();
        assert_eq!(ideas, vec![Idea::new("a face in the bark", "an ancient tree spirit")]);
    }

    #[test]
    fn ideas_empty_array_is_valid() {
        assert_eq!(parse_ideas("[]").unwrap(), Vec::<Idea>::new());
        let resp = text_response("[]");
        assert_eq!(ideas_from_response(&resp, 5).unwrap(), Vec::<Idea>::new());
    }

    #[test]
    fn ideas_in_code_block() {
        let text = "Here you go:\n```json\n[{\"description\": \"d\", \"suggestedPrompt\": \"p\"}]\n```";
        assert_eq!(parse_ideas(text).unwrap(), vec![Idea::new("d", "p")]);
    }

    #[test]
    fn ideas_with_surrounding_text() {
        let text = r#"Sure! [{"description": "d", "suggestedPrompt": "p"}] Enjoy."#;
        assert_eq!(parse_ideas(text).unwrap(), vec![Idea::new("d", "p")]);
    }

    #[test]
    fn ideas_schema_violations_are_malformed() {
        let cases = [
            r#"[{"description": "d"}]"#,
            r#"[{"description": "d", "suggestedPrompt": "p", "extra": 1}]"#,
            r#"[{"description": 3, "suggestedPrompt": "p"}]"#,
            r#"{"ideas": []}"#,
            "not json at all",
            r#"[{"description": "d", "suggestedPrompt": "   "}]"#,
        ];
        for case in cases {
            assert!(
                matches!(parse_ideas(case), Err(ExplorationError::MalformedResponse(_))),
                "expected malformed for {case}"
            );
        }
    }

    #[test]
    fn ideas_empty_text_is_empty_response() {
        assert_eq!(parse_ideas("  "), Err(ExplorationError::EmptyResponse));
        assert_eq!(
            ideas_from_response(&text_response(""), 3),
            Err(ExplorationError::EmptyResponse)
        );
    }

    #[test]
    fn ideas_truncated_to_limit() {
        let body: Vec<Value> = (0..6)
            .map(|i| json!({"description": format!("d{i}"), "suggestedPrompt": format!("p{i}")}))
            .collect();
        let resp = text_response(&serde_json::to_string(&body).unwrap());
        let ideas = ideas_from_response(&resp, 4).unwrap();
        assert_eq!(ideas.len(), 4);
        assert_eq!(ideas[3].suggested_prompt, "p3");
    }

    #[test]
    fn ideas_blocked() {
        let resp = json!({"candidates": [{"finishReason": "SAFETY"}]});
        assert_eq!(
            ideas_from_response(&resp, 3),
            Err(ExplorationError::Blocked("SAFETY".into()))
        );
    }

    // ── Images ──

    #[test]
    fn image_found_among_parts() {
        let resp = json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "Here is your image"},
                    {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
                ]}
            }]
        });
        let image = image_from_response(&resp).unwrap();
        assert_eq!(image, EncodedImage::new("image/png", "iVBORw0KGgo="));
    }

    #[test]
    fn image_snake_case_inline_data() {
        let resp = json!({
            "candidates": [{
                "content": {"parts": [{"inline_data": {"mime_type": "image/jpeg", "data": "/9j/"}}]}
            }]
        });
        assert_eq!(
            image_from_response(&resp).unwrap(),
            EncodedImage::new("image/jpeg", "/9j/")
        );
    }

    #[test]
    fn text_only_response_is_no_image() {
        let resp = text_response("I can't generate that image.");
        assert_eq!(
            image_from_response(&resp),
            Err(GenerationError::NoImageInResponse {
                text: Some("I can't generate that image.".into())
            })
        );
    }

    #[test]
    fn image_failures_are_distinct() {
        assert_eq!(
            image_from_response(&json!({"candidates": []})),
            Err(GenerationError::NoCandidates)
        );
        assert_eq!(
            image_from_response(&json!({"candidates": [{"content": {"parts": []}}]})),
            Err(GenerationError::NoImageInResponse { text: None })
        );
        assert_eq!(
            image_from_response(&json!({"promptFeedback": {"blockReason": "PROHIBITED_CONTENT"}})),
            Err(GenerationError::Blocked("PROHIBITED_CONTENT".into()))
        );
    }
}
