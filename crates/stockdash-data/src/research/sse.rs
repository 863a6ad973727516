//! Server-Sent Events 블록 해석.
//!
//! 이벤트 경계는 빈 줄(`\n\n`)입니다. 청크 경계가 UTF-8 문자 중간에 걸려도
//! 블록이 완성된 뒤에 디코딩하므로 깨지지 않습니다.

use serde_json::Value;
use std::fmt;

/// 하나의 SSE 이벤트.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    /// `event:` 필드 (없으면 기본 메시지)
    pub event: Option<String>,
    /// `data:` 줄을 줄바꿈으로 이은 값
    pub data: String,
    /// `data`가 JSON 객체/배열이면 해석 결과
    pub json: Option<Value>,
}

impl SseEvent {
    /// 빈 줄 없는 한 블록 해석.
    pub fn parse_block(block: &str) -> Self {
        let mut event = None;
        let mut data: Vec<&str> = Vec::new();

        for line in block.lines() {
            if let Some(rest) = line.strip_prefix("event:") {
                event = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("data:") {
                data.push(rest.trim_start());
            }
        }

        let data = data.join("\n");
        let trimmed = data.trim();
        let json = if trimmed.starts_with('{') || trimmed.starts_with('[') {
            serde_json::from_str(trimmed).ok()
        } else {
            None
        };

        Self { event, data, json }
    }

    /// 표시용 이벤트 이름.
    pub fn label(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }
}

impl fmt::Display for SseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.data)
    }
}

/// 바이트 청크를 이벤트로 바꾸는 디코더.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

fn boundary(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

fn decode_block(bytes: &[u8]) -> Option<SseEvent> {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(SseEvent::parse_block(trimmed))
    }
}

impl SseDecoder {
    /// 청크를 더하고 완성된 이벤트를 돌려줍니다.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(end) = boundary(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            events.extend(decode_block(&block[..end]));
        }
        events
    }

    /// 스트림 종료 시 남은 블록 처리.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        decode_block(&rest)
    }
}

/// 스트리밍 조각 텍스트 추출.
///
/// `status`가 `"stream"`인 이벤트에서만 `chunk.choices[].delta.content`
/// (없으면 `content`, `message.content`)를 이어 붙입니다.
pub fn stream_chunk(json: &Value) -> Option<String> {
    if json.get("status").and_then(Value::as_str) != Some("stream") {
        return None;
    }
    let choices = json.get("chunk")?.get("choices")?.as_array()?;
    let text: String = choices
        .iter()
        .map(|choice| {
            let delta = choice.get("delta").and_then(|d| d.get("content"));
            let content = choice.get("content");
            let message = choice.get("message").and_then(|m| m.get("content"));
            [delta, content, message]
                .into_iter()
                .flatten()
                .map(fragment_text)
                .find(|s| !s.is_empty())
                .unwrap_or_default()
        })
        .collect();
    Some(text).filter(|t| !t.is_empty())
}

/// 문자열, 배열, `{text}`/`{content}` 형태의 조각을 텍스트로.
fn fragment_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(fragment_text).collect(),
        Value::Object(obj) => obj
            .get("text")
            .or_else(|| obj.get("content"))
            .map(fragment_text)
            .unwrap_or_default(),
        _ => String::new(),
    }
}
