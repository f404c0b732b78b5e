use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use nutri_core::Session;
use nutri_core::UserSummary;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub access_token: String,
}

impl AuthResponse {
    pub fn into_session(self) -> Session {
        Session::new(
            UserSummary {
                id: self.id,
                email: self.email,
                full_name: self.full_name,
            },
            self.access_token,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MealLogRequest<'a> {
    pub description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AskRequest<'a> {
    pub question: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AiResponse {
    pub response: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Value,
}

// Error bodies carry `detail` as a plain string, or as a list of
// `{ "msg": ... }` entries for request validation errors.
pub fn error_detail(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok()?;
    match parsed.detail {
        Value::String(detail) => non_empty(detail),
        Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text.clone()),
                    Value::Object(fields) => fields
                        .get("msg")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    _ => None,
                })
                .collect();
            non_empty(messages.join("; "))
        }
        _ => None,
    }
}

pub fn failure_detail(body: &str, reason: Option<&str>) -> String {
    if let Some(detail) = error_detail(body) {
        return detail;
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() && !trimmed.starts_with('{') && !trimmed.starts_with('<') {
        return trimmed.to_string();
    }
    reason.unwrap_or_default().to_string()
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
