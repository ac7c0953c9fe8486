//! # tapflow-storage
//!
//! 로컬 저장소 어댑터.
//! 단축키와 이벤트 그룹을 하나의 JSON 문서로 저장하는 `ShortcutStore` 포트 구현.

pub mod json_store;

pub use json_store::JsonShortcutStore;
