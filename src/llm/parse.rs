//! Response-shape parsers. Each parser recognises one wire shape; they are
//! tried in order against the raw JSON until one yields non-empty text.

use crate::error::{ProviderError, ProviderResult};
use crate::types::ModerationVerdict;
use serde_json::Value;

pub struct ResponseParser {
    pub name: &'static str,
    extract: fn(&Value) -> Option<String>,
}

pub static TEXT_PARSERS: &[ResponseParser] = &[
    ResponseParser {
        name: "chat-message",
        extract: chat_message,
    },
    ResponseParser {
        name: "chat-content-parts",
        extract: chat_content_parts,
    },
    ResponseParser {
        name: "legacy-completion",
        extract: legacy_completion,
    },
    ResponseParser {
        name: "responses-output-text",
        extract: responses_output_text,
    },
    ResponseParser {
        name: "responses-output",
        extract: responses_output,
    },
    ResponseParser {
        name: "generated-text-list",
        extract: generated_text_list,
    },
    ResponseParser {
        name: "generated-text",
        extract: generated_text,
    },
    ResponseParser {
        name: "bare-string",
        extract: bare_string,
    },
];

/// Run the parsers over `raw` and return the first non-empty text.
pub fn extract_text(raw: &Value) -> Option<(&'static str, String)> {
    TEXT_PARSERS.iter().find_map(|p| {
        (p.extract)(raw)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(|t| (p.name, t))
    })
}

/// Parse a response body and extract text, or explain why not.
pub fn parse_text_body(provider: &str, body: &str) -> ProviderResult<String> {
    let raw: Value = serde_json::from_str(body)
        .map_err(|e| ProviderError::parse(format!("{provider} response is not JSON: {e}")))?;
    if let Some(message) = api_error_message(&raw) {
        return Err(ProviderError::api(provider, message));
    }
    match extract_text(&raw) {
        Some((_, text)) => Ok(text),
        None if is_structurally_empty(&raw) => Err(ProviderError::EmptyResponse(provider.into())),
        None => Err(ProviderError::parse(format!(
            "no parser recognised {provider} response: {}",
            preview(body)
        ))),
    }
}

fn first_choice(raw: &Value) -> Option<&Value> {
    raw.get("choices")?.as_array()?.first()
}

fn chat_message(raw: &Value) -> Option<String> {
    first_choice(raw)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(String::from)
}

fn chat_content_parts(raw: &Value) -> Option<String> {
    let parts = first_choice(raw)?.get("message")?.get("content")?.as_array()?;
    join_text_parts(parts, &["text", "output_text"])
}

fn legacy_completion(raw: &Value) -> Option<String> {
    first_choice(raw)?.get("text")?.as_str().map(String::from)
}

fn responses_output_text(raw: &Value) -> Option<String> {
    raw.get("output_text")?.as_str().map(String::from)
}

fn responses_output(raw: &Value) -> Option<String> {
    let mut out = Vec::new();
    for item in raw.get("output")?.as_array()? {
        if let Some(parts) = item.get("content").and_then(Value::as_array)
            && let Some(text) = join_text_parts(parts, &["output_text"])
        {
            out.push(text);
        }
    }
    (!out.is_empty()).then(|| out.join("\n"))
}

fn generated_text_list(raw: &Value) -> Option<String> {
    raw.as_array()?
        .first()?
        .get("generated_text")?
        .as_str()
        .map(String::from)
}

fn generated_text(raw: &Value) -> Option<String> {
    raw.get("generated_text")?.as_str().map(String::from)
}

fn bare_string(raw: &Value) -> Option<String> {
    raw.as_str().map(String::from)
}

fn join_text_parts(parts: &[Value], types: &[&str]) -> Option<String> {
    let texts: Vec<&str> = parts
        .iter()
        .filter(|p| {
            p.get("type")
                .and_then(Value::as_str)
                .is_some_and(|t| types.contains(&t))
        })
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    (!texts.is_empty()).then(|| texts.join("\n"))
}

/// `{"error": {"message": ..}}` or `{"error": ".."}` returned with a 200.
fn api_error_message(raw: &Value) -> Option<String> {
    let err = raw.get("error")?;
    err.get("message")
        .and_then(Value::as_str)
        .or_else(|| err.as_str())
        .map(String::from)
}

/// A recognised shape that simply carried no text.
fn is_structurally_empty(raw: &Value) -> bool {
    raw.get("choices").is_some()
        || raw.get("output").is_some()
        || raw.get("output_text").is_some()
        || raw.get("generated_text").is_some()
        || raw.as_array().is_some_and(|a| a.is_empty())
        || raw.as_str().is_some()
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}

// -- Image payloads --

/// Image data found in a generation response.
#[derive(Debug, PartialEq, Eq)]
pub enum ImagePayload {
    Url(String),
    Base64(String),
}

/// Find a URL or base64 payload in any of the known image response shapes.
pub fn extract_image(raw: &Value) -> Option<ImagePayload> {
    let str_at = |v: &Value, key: &str| {
        v.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    // {"data": [{"url"|"b64_json"}]}
    if let Some(first) = raw
        .get("data")
        .and_then(Value::as_array)
        .and_then(|a| a.first())
    {
        if let Some(url) = str_at(first, "url") {
            return Some(ImagePayload::Url(url));
        }
        if let Some(b64) = str_at(first, "b64_json") {
            return Some(ImagePayload::Base64(b64));
        }
    }
    // {"image": ".."} / {"images": [".."]}
    if let Some(b64) = str_at(raw, "image") {
        return Some(ImagePayload::Base64(b64));
    }
    if let Some(b64) = raw
        .get("images")
        .and_then(Value::as_array)
        .and_then(|a| a.first())
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
    {
        return Some(ImagePayload::Base64(b64.to_string()));
    }
    // [{"b64_json"|"generated_image"}]
    if let Some(first) = raw.as_array().and_then(|a| a.first()) {
        if let Some(b64) = str_at(first, "b64_json").or_else(|| str_at(first, "generated_image"))
        {
            return Some(ImagePayload::Base64(b64));
        }
    }
    None
}

// -- Moderation --

/// `{"results": [{"flagged": bool, "categories": {name: bool}}]}` into a verdict
/// with one `flagged:<category>` issue per raised category.
pub fn parse_moderation(provider: &str, body: &str) -> ProviderResult<ModerationVerdict> {
    let raw: Value = serde_json::from_str(body)
        .map_err(|e| ProviderError::parse(format!("{provider} moderation is not JSON: {e}")))?;
    let result = raw
        .get("results")
        .and_then(Value::as_array)
        .and_then(|a| a.first())
        .ok_or_else(|| ProviderError::parse(format!("{provider} moderation has no results")))?;
    let flagged = result
        .get("flagged")
        .and_then(Value::as_bool)
        .ok_or_else(|| ProviderError::parse(format!("{provider} moderation lacks `flagged`")))?;

    let mut issues: Vec<String> = result
        .get("categories")
        .and_then(Value::as_object)
        .map(|cats| {
            cats.iter()
                .filter(|(_, v)| v.as_bool() == Some(true))
                .map(|(k, _)| format!("flagged:{k}"))
                .collect()
        })
        .unwrap_or_default();
    if flagged && issues.is_empty() {
        issues.push("flagged:unspecified".into());
    }
    if !flagged {
        issues.clear();
    }
    Ok(ModerationVerdict::from_issues(issues))
}
