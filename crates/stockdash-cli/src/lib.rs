//! 주식 대시보드 CLI 도구 모음.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 시세/종목/차트 조회
//! - RPS 순위표 및 자금 흐름 조회
//! - 거래일 목록 조회
//! - 주기적 시세 갱신 (watch)
//! - 관심 종목, 환경설정, 보유 종목 관리
//! - 웹 리서치 분석 (단건/스트림)

pub mod commands;
