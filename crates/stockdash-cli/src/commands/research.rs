//! 웹 리서치 분석 명령.

use super::{invalid, OutputFormat};
use std::io::Write;
use stockdash_core::DashResult as Result;
use stockdash_data::research::stream_chunk;
use stockdash_data::{parse_urls, ResearchAnalysis, ResearchRequest, SseEvent, WebResearchClient};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// 분석 결과를 사람이 읽는 형식으로.
pub fn analysis_lines(analysis: &ResearchAnalysis) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(summary) = analysis.summary() {
        lines.push(summary);
    }
    let insights = analysis.insights();
    if !insights.is_empty() {
        lines.push(String::new());
        lines.push("인사이트:".to_string());
        lines.extend(insights.iter().map(|insight| format!("  • {}", insight)));
    }
    let sources = analysis.sources();
    if !sources.is_empty() {
        lines.push(String::new());
        lines.push("출처:".to_string());
        for source in &sources {
            match &source.title {
                Some(title) => lines.push(format!("  - {} ({})", title, source.url)),
                None => lines.push(format!("  - {}", source.url)),
            }
        }
    }
    if lines.is_empty() {
        lines.push("(분석 결과 없음)".to_string());
    }
    lines
}

/// 스트림 이벤트 출력. 조각 텍스트는 이어서, 나머지는 진행 상황으로.
fn print_event(event: &SseEvent) {
    if let Some(text) = event.json.as_ref().and_then(stream_chunk) {
        print!("{}", text);
        std::io::stdout().flush().ok();
    } else if event.json.as_ref().and_then(ResearchAnalysis::from_event_json).is_none() {
        eprintln!("[{}] {}", event.label(), event.data);
    }
}

fn print_analysis(analysis: &ResearchAnalysis, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(analysis)?),
        OutputFormat::Table => {
            for line in analysis_lines(analysis) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

/// URL 목록 분석.
///
/// `stream`이면 SSE로 진행 상황을 출력하고 토큰 취소 시 중단합니다.
pub async fn run_research(
    client: &WebResearchClient,
    urls: &str,
    password: &str,
    prompt: Option<&str>,
    stream: bool,
    token: &CancellationToken,
    format: OutputFormat,
) -> Result<()> {
    let urls = parse_urls(urls);
    if urls.is_empty() {
        return Err(invalid("At least one URL is required"));
    }
    let mut request = ResearchRequest::new(urls, password);
    if let Some(prompt) = prompt {
        request = request.with_prompt(prompt);
    }

    if !stream {
        let analysis = client.analyze(&request).await?;
        return print_analysis(&analysis, format);
    }

    let report = client
        .stream_analysis(&request, token, |event| {
            if format == OutputFormat::Table {
                print_event(event);
            }
        })
        .await?;
    info!(events = report.events, "리서치 스트림 완료");

    match &report.analysis {
        Some(analysis) => {
            if format == OutputFormat::Table {
                println!();
            }
            print_analysis(analysis, format)
        }
        None if format == OutputFormat::Json => {
            println!("{}", serde_json::json!({ "text": report.text }));
            Ok(())
        }
        None => {
            println!();
            Ok(())
        }
    }
}
