//! 웹 리서치 요청/응답 타입.

use crate::error::{ApiError, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 분석 요청.
///
/// 비밀번호는 요청 본문을 만들 때만 노출됩니다.
#[derive(Debug, Clone)]
pub struct ResearchRequest {
    pub urls: Vec<String>,
    pub prompt_template: Option<String>,
    pub password: SecretString,
}

/// 전송용 요청 본문.
#[derive(Debug, Serialize)]
pub(crate) struct WireRequest<'a> {
    urls: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt_template: Option<&'a str>,
    password: &'a str,
    stream: bool,
}

/// 줄바꿈/쉼표로 구분된 URL 목록 파싱.
pub fn parse_urls(input: &str) -> Vec<String> {
    input
        .split(|c| c == '\n' || c == ',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl ResearchRequest {
    pub fn new(urls: Vec<String>, password: impl Into<String>) -> Self {
        Self {
            urls,
            prompt_template: None,
            password: SecretString::new(password.into().into()),
        }
    }

    /// 프롬프트 템플릿 지정 (공백뿐이면 생략).
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.prompt_template = Some(prompt.trim().to_string()).filter(|p| !p.is_empty());
        self
    }

    /// 전송 전 검증.
    ///
    /// URL이 하나 이상이고 모두 http/https여야 하며, 비밀번호가 비어 있으면 안 됩니다.
    pub fn validate(&self) -> Result<()> {
        if self.urls.is_empty() {
            return Err(ApiError::InvalidRequest(
                "At least one URL is required".to_string(),
            ));
        }
        for url in &self.urls {
            let parsed = reqwest::Url::parse(url)
                .map_err(|_| ApiError::InvalidRequest(format!("Invalid URL: {}", url)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ApiError::InvalidRequest(format!(
                    "Only http/https URLs are supported: {}",
                    url
                )));
            }
        }
        if self.password.expose_secret().trim().is_empty() {
            return Err(ApiError::InvalidRequest("Password is required".to_string()));
        }
        Ok(())
    }

    pub(crate) fn to_wire(&self, stream: bool) -> WireRequest<'_> {
        WireRequest {
            urls: &self.urls,
            prompt_template: self.prompt_template.as_deref(),
            password: self.password.expose_secret(),
            stream,
        }
    }
}

/// 분석 출처.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchSource {
    #[serde(default)]
    pub url: String,
    pub title: Option<String>,
    pub snippet: Option<String>,
}

/// 중첩 결과 본문.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPayload {
    pub summary: Option<String>,
    pub analysis: Option<String>,
    pub content: Option<String>,
    pub insights: Option<Vec<Value>>,
    pub highlights: Option<Vec<Value>>,
    pub key_findings: Option<Vec<Value>>,
    pub sources: Option<Vec<ResearchSource>>,
}

/// `result` 필드: 문자열 또는 객체.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisResult {
    Text(String),
    Payload(ResultPayload),
    Other(Value),
}

/// 분석 응답.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchAnalysis {
    pub job_id: Option<String>,
    pub status: Option<String>,
    pub message: Option<String>,
    pub summary: Option<String>,
    pub analysis: Option<String>,
    pub insights: Option<Vec<Value>>,
    pub highlights: Option<Vec<Value>>,
    pub sources: Option<Vec<ResearchSource>>,
    pub result: Option<AnalysisResult>,
}

const ANALYSIS_FIELDS: [&str; 5] = ["summary", "analysis", "result", "insights", "sources"];

fn looks_like_analysis(value: &Value) -> bool {
    value
        .as_object()
        .map(|obj| ANALYSIS_FIELDS.iter().any(|field| obj.contains_key(*field)))
        .unwrap_or(false)
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty()).cloned()
}

fn insight_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl ResearchAnalysis {
    /// 스트림 이벤트 JSON에서 분석 결과 추출.
    ///
    /// 객체 자체나 그 `data` 필드가 분석 필드를 하나라도 가지면 해석합니다.
    pub fn from_event_json(value: &Value) -> Option<Self> {
        let candidate = if looks_like_analysis(value) {
            value
        } else {
            value.get("data").filter(|data| looks_like_analysis(data))?
        };
        serde_json::from_value(candidate.clone()).ok()
    }

    fn payload(&self) -> Option<&ResultPayload> {
        match &self.result {
            Some(AnalysisResult::Payload(payload)) => Some(payload),
            _ => None,
        }
    }

    /// 요약 본문.
    ///
    /// `analysis`, `summary`, 문자열 `result`, 중첩 `summary`/`analysis`/`content`
    /// 순으로 처음 비어 있지 않은 값을 씁니다.
    pub fn summary(&self) -> Option<String> {
        let text_result = match &self.result {
            Some(AnalysisResult::Text(text)) => Some(text),
            _ => None,
        };
        let payload = self.payload();
        non_blank(self.analysis.as_ref())
            .or_else(|| non_blank(self.summary.as_ref()))
            .or_else(|| non_blank(text_result))
            .or_else(|| non_blank(payload.and_then(|p| p.summary.as_ref())))
            .or_else(|| non_blank(payload.and_then(|p| p.analysis.as_ref())))
            .or_else(|| non_blank(payload.and_then(|p| p.content.as_ref())))
    }

    /// 인사이트 목록 (상위/중첩 필드 통합, 문자열이 아니면 JSON 문자열).
    pub fn insights(&self) -> Vec<String> {
        let payload = self.payload();
        [
            self.insights.as_ref(),
            self.highlights.as_ref(),
            payload.and_then(|p| p.insights.as_ref()),
            payload.and_then(|p| p.highlights.as_ref()),
            payload.and_then(|p| p.key_findings.as_ref()),
        ]
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(insight_text)
        .collect()
    }

    /// URL이 있는 출처 목록.
    pub fn sources(&self) -> Vec<ResearchSource> {
        self.sources
            .as_ref()
            .or_else(|| self.payload().and_then(|p| p.sources.as_ref()))
            .map(|sources| {
                sources
                    .iter()
                    .filter(|s| !s.url.trim().is_empty())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(urls: &[&str], password: &str) -> ResearchRequest {
        ResearchRequest::new(urls.iter().map(|u| u.to_string()).collect(), password)
    }

    #[test]
    fn test_validate() {
        assert!(request(&["https://example.com/a"], "pw").validate().is_ok());
        assert!(matches!(
            request(&[], "pw").validate(),
            Err(ApiError::InvalidRequest(_))
        ));
        assert!(request(&["ftp://example.com"], "pw").validate().is_err());
        assert!(request(&["not a url"], "pw").validate().is_err());
        assert!(request(&["https://example.com"], "  ").validate().is_err());
    }

    #[test]
    fn test_wire_body() {
        let req = request(&["https://example.com"], "pw").with_prompt("  ");
        let body = serde_json::to_value(req.to_wire(true)).unwrap();
        assert_eq!(
            body,
            json!({"urls": ["https://example.com"], "password": "pw", "stream": true})
        );

        let req = req.with_prompt("요약해줘");
        let body = serde_json::to_value(req.to_wire(false)).unwrap();
        assert_eq!(body["prompt_template"], "요약해줘");
        assert!(!format!("{:?}", req).contains("\"pw\""));
    }

    #[test]
    fn test_parse_urls() {
        assert_eq!(
            parse_urls("https://a.com\n https://b.com , \n"),
            vec!["https://a.com", "https://b.com"]
        );
    }

    #[test]
    fn test_summary_precedence() {
        let analysis: ResearchAnalysis = serde_json::from_value(json!({
            "summary": " ",
            "result": {"summary": "nested", "content": "raw"}
        }))
        .unwrap();
        assert_eq!(analysis.summary().as_deref(), Some("nested"));

        let analysis: ResearchAnalysis =
            serde_json::from_value(json!({"summary": "top", "result": "text"})).unwrap();
        assert_eq!(analysis.summary().as_deref(), Some("top"));

        let analysis: ResearchAnalysis = serde_json::from_value(json!({"result": "text"})).unwrap();
        assert_eq!(analysis.summary().as_deref(), Some("text"));
        assert_eq!(ResearchAnalysis::default().summary(), None);
    }

    #[test]
    fn test_insights_and_sources() {
        let analysis: ResearchAnalysis = serde_json::from_value(json!({
            "insights": ["a", ""],
            "highlights": [{"k": 1}],
            "result": {
                "keyFindings": ["b"],
                "sources": [{"url": "https://x.com", "title": "X"}, {"title": "no url"}]
            }
        }))
        .unwrap();
        assert_eq!(analysis.insights(), vec!["a", r#"{"k":1}"#, "b"]);
        let sources = analysis.sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].title.as_deref(), Some("X"));
    }

    #[test]
    fn test_from_event_json() {
        assert!(ResearchAnalysis::from_event_json(&json!({"summary": "s"})).is_some());
        let nested = ResearchAnalysis::from_event_json(&json!({"data": {"analysis": "a"}})).unwrap();
        assert_eq!(nested.summary().as_deref(), Some("a"));
        assert!(ResearchAnalysis::from_event_json(&json!({"status": "stream"})).is_none());
        assert!(ResearchAnalysis::from_event_json(&json!(["summary"])).is_none());
    }
}
