use serde::Deserialize;
use serde_json::Value;

use crate::error::NavError;
use crate::result::ReleaseInfo;
use crate::types::{Action, Direction, PlannedAction, Viewport};

/// Removes a surrounding markdown code fence (with or without a language tag).
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.split_once('\n') {
        Some((tag, body)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => body,
        Some(_) => rest,
        None => rest.trim_start_matches("json"),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    #[serde(alias = "action")]
    action_type: String,
    #[serde(default)]
    target: Option<String>,
    #[serde(default, alias = "type_text")]
    value: Option<Value>,
    #[serde(default)]
    coordinates: Option<Vec<f64>>,
    #[serde(default)]
    direction: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Turns a navigation reply into a validated action.
pub fn planned_action(text: &str, viewport: Viewport) -> Result<PlannedAction, NavError> {
    let cleaned = strip_fences(text);
    let raw: RawDecision =
        serde_json::from_str(cleaned).map_err(|e| NavError::Decode(e.to_string()))?;

    let kind = raw.action_type.trim().to_ascii_lowercase();
    let action = match kind.as_str() {
        "click" => match raw.coordinates.as_deref() {
            Some([x, y]) => Action::click(*x, *y, viewport)?,
            _ => {
                return Err(NavError::InvalidAction(
                    "click needs exactly two coordinates".into(),
                ));
            }
        },
        "type" => match &raw.value {
            Some(Value::String(text)) => Action::type_text(text.clone())?,
            _ => return Err(NavError::InvalidAction("type action carries no text".into())),
        },
        "scroll" => {
            let requested = raw
                .direction
                .clone()
                .or_else(|| raw.value.as_ref().and_then(Value::as_str).map(str::to_string));
            let direction = match requested {
                None => Direction::Down,
                Some(dir) => Direction::parse(&dir).ok_or_else(|| {
                    NavError::InvalidAction(format!("unknown scroll direction '{dir}'"))
                })?,
            };
            Action::Scroll { direction }
        }
        "wait" => Action::Wait,
        "extract" => Action::Extract,
        "done" => Action::Done,
        other => return Err(NavError::InvalidAction(format!("unknown action '{other}'"))),
    };

    let payload = match action {
        Action::Extract | Action::Done => raw.value.as_ref().and_then(inline_release),
        _ => None,
    };

    Ok(PlannedAction {
        action,
        target: raw.target.filter(|t| !t.trim().is_empty()),
        reasoning: raw.reasoning.unwrap_or_default(),
        confidence: raw.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
        payload,
    })
}

fn inline_release(value: &Value) -> Option<ReleaseInfo> {
    let info: ReleaseInfo = match value {
        Value::Object(_) => serde_json::from_value(value.clone()).ok()?,
        Value::String(text) => serde_json::from_str(strip_fences(text)).ok()?,
        _ => return None,
    };
    info.is_complete().then_some(info)
}

#[derive(Debug, Deserialize)]
struct ExtractionReply {
    #[serde(default)]
    found: Option<bool>,
    #[serde(flatten)]
    info: ReleaseInfo,
}

/// Turns an extraction reply into release metadata.
pub fn release_info(text: &str) -> Result<ReleaseInfo, NavError> {
    let cleaned = strip_fences(text);
    let reply: ExtractionReply =
        serde_json::from_str(cleaned).map_err(|e| NavError::Decode(e.to_string()))?;
    if reply.found == Some(false) {
        return Err(NavError::Decode("model reported no release on the page".into()));
    }
    if !reply.info.is_complete() {
        return Err(NavError::Decode("release is missing a version or tag".into()));
    }
    Ok(reply.info)
}
