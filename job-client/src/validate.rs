use insight_core::{AnalysisResult, ResultError, SubmissionError};
use serde_json::Value;
use url::Url;

/// Checks that `raw` is an absolute http(s) URL with a host.
pub fn parse_app_url(raw: &str) -> Result<Url, SubmissionError> {
    let trimmed = raw.trim();
    let invalid = |reason: &str| SubmissionError::InvalidUrl {
        url: trimmed.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("URL is empty"));
    }

    let url = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("only http and https URLs are supported"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("URL has no host"));
    }

    Ok(url)
}

/// Play Store style `?id=com.example.app` package name.
pub fn app_id_from_url(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Structural checks on a results body followed by a typed decode.
pub fn parse_analysis_result(value: Value) -> Result<AnalysisResult, ResultError> {
    let invalid = |details: &str| ResultError::InvalidPayload {
        details: details.to_string(),
    };

    let body = value
        .as_object()
        .ok_or_else(|| invalid("data is not an object"))?;

    if !body.get("app").is_some_and(Value::is_object) {
        return Err(invalid("missing or invalid app info"));
    }
    for field in ["complaints", "praise", "feature_requests"] {
        if !body.get(field).is_some_and(Value::is_array) {
            return Err(invalid(&format!("{} is not an array", field)));
        }
    }
    if !body.get("kpi").is_some_and(Value::is_object) {
        return Err(invalid("missing or invalid KPI data"));
    }

    let result: AnalysisResult =
        serde_json::from_value(value).map_err(|e| invalid(&e.to_string()))?;
    result.validate()?;

    Ok(result)
}
