//! 포트 인터페이스 (trait).
//!
//! Hexagonal Architecture의 포트 레이어.
//! 플랫폼(접근성 트리, 제스처 실행기, 오버레이, 앱 실행)과 저장소는
//! 모두 이 trait들을 통해서만 접근하며,
//! `tapflow-app`에서 `Arc<dyn T>`로 와이어링한다.
//!
//! 플랫폼 호출이 메인 스레드에서 즉시 반환되는 포트는 동기 trait,
//! I/O가 있는 포트는 `async_trait`을 사용한다.

pub mod accessibility;
pub mod gesture;
pub mod launcher;
pub mod overlay;
pub mod storage;
