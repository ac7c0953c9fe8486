//! Tapflow 도메인 모델.
//!
//! 자동화 요청, 화면 좌표, 접근성 노드 속성, 제스처 결과, 저장된 단축키 모델을 정의한다.
//! 외부로 나가는 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod element;
pub mod event;
pub mod geometry;
pub mod gesture;
pub mod node;
pub mod outcome;
pub mod request;
pub mod shortcut;
