//! # Stockdash Core
//!
//! 주식 대시보드의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 대시보드 전반에서 사용되는 기본 타입을 제공합니다:
//! - 시세, 종목, 차트 데이터 구조체
//! - RPS(상대 가격 강도) 및 자금 흐름 레코드
//! - 조회 기간 정의
//! - 사용자 환경설정 (관심 종목, 화면 설정)
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
