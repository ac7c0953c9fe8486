//! 시뮬레이터 기기 — 모든 플랫폼 포트의 메모리 구현.
//!
//! 실제 기기 없이 엔진을 구동/테스트하기 위한 어댑터.
//! JSON 픽스처에서 앱별 접근성 트리를 읽고, 제출된 제스처와 노드 액션,
//! 오버레이 조작을 기록한다. 노드 무효화로 트리 변경 상황도 재현한다.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info};

use tapflow_core::error::CoreError;
use tapflow_core::models::event::AccessibilityEvent;
use tapflow_core::models::geometry::{Point, Rect};
use tapflow_core::models::gesture::{Gesture, GestureOutcome};
use tapflow_core::models::node::{contains_ignore_case, NodeAction, NodeInfo};
use tapflow_core::ports::accessibility::{NodeHandle, UiNode, WindowAccessor};
use tapflow_core::ports::gesture::{GestureCallback, GestureExecutor};
use tapflow_core::ports::launcher::AppLauncher;
use tapflow_core::ports::overlay::{MarkerStyle, OverlayWindow};

// ============================================================
// 픽스처
// ============================================================

/// 노드 픽스처 (JSON 트리 한 노드)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeFixture {
    #[serde(flatten)]
    pub info: NodeInfo,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeFixture>,
}

impl NodeFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.info.text = Some(text.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.info.content_description = Some(description.into());
        self
    }

    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.info.class_name = Some(class_name.into());
        self
    }

    pub fn bounds(mut self, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        self.info.bounds = Rect::new(left, top, right, bottom);
        self
    }

    pub fn clickable(mut self, clickable: bool) -> Self {
        self.info.clickable = clickable;
        self
    }

    pub fn scrollable(mut self, scrollable: bool) -> Self {
        self.info.scrollable = scrollable;
        self
    }

    pub fn with_children(mut self, children: Vec<NodeFixture>) -> Self {
        self.children = children;
        self
    }
}

/// 화면 크기
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width: i32,
    pub height: i32,
}

impl Default for DisplaySize {
    fn default() -> Self {
        Self {
            width: 1_080,
            height: 2_400,
        }
    }
}

/// 기기 픽스처 (JSON 파일 하나)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceFixture {
    #[serde(default = "default_api_level")]
    pub api_level: u32,
    #[serde(default)]
    pub display: DisplaySize,
    /// 패키지 → 실행 시 보여줄 트리
    #[serde(default)]
    pub apps: BTreeMap<String, NodeFixture>,
    /// 시작 시 전면 앱
    #[serde(default)]
    pub foreground: Option<String>,
}

impl Default for DeviceFixture {
    fn default() -> Self {
        Self {
            api_level: default_api_level(),
            display: DisplaySize::default(),
            apps: BTreeMap::new(),
            foreground: None,
        }
    }
}

fn default_api_level() -> u32 {
    30
}

// ============================================================
// 기록 타입
// ============================================================

/// 제출된 제스처 기록
#[derive(Debug, Clone)]
pub struct DispatchedGesture {
    pub gesture: Gesture,
    /// 제출 시각 (tokio 시계)
    pub at: Instant,
}

/// 노드 액션 기록
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    pub text: Option<String>,
    pub action: NodeAction,
    pub accepted: bool,
}

/// 오버레이 조작 기록
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayOp {
    Added(Point),
    Removed,
}

/// 제스처 콜백 동작
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GestureBehavior {
    /// 제출 즉시 완료 콜백
    #[default]
    Complete,
    /// 제출 즉시 취소 콜백
    Cancel,
    /// 제출은 수락하지만 콜백 없음
    Silent,
    /// 제출 거부
    Reject,
}

// ============================================================
// MemoryNode — UiNode 구현
// ============================================================

/// 메모리 접근성 노드
pub struct MemoryNode {
    info: NodeInfo,
    me: Weak<MemoryNode>,
    parent: Weak<MemoryNode>,
    children: RwLock<Vec<Arc<MemoryNode>>>,
    valid: AtomicBool,
    actions: Arc<Mutex<Vec<ActionRecord>>>,
}

impl MemoryNode {
    fn create(
        fixture: &NodeFixture,
        package: &str,
        parent: Weak<MemoryNode>,
        actions: &Arc<Mutex<Vec<ActionRecord>>>,
    ) -> Arc<Self> {
        let mut info = fixture.info.clone();
        if info.package_name.is_none() {
            info.package_name = Some(package.to_string());
        }
        Arc::new_cyclic(|me| Self {
            info,
            me: me.clone(),
            parent,
            children: RwLock::new(Vec::new()),
            valid: AtomicBool::new(true),
            actions: Arc::clone(actions),
        })
    }

    /// 픽스처 트리를 노드 그래프로 구성 (반복)
    fn materialize(
        fixture: &NodeFixture,
        package: &str,
        actions: &Arc<Mutex<Vec<ActionRecord>>>,
    ) -> Arc<Self> {
        let root = Self::create(fixture, package, Weak::new(), actions);
        let mut stack = vec![(fixture, Arc::clone(&root))];
        while let Some((fixture, node)) = stack.pop() {
            let children: Vec<Arc<Self>> = fixture
                .children
                .iter()
                .map(|child| Self::create(child, package, Arc::downgrade(&node), actions))
                .collect();
            for (child_fixture, child) in fixture.children.iter().zip(&children) {
                stack.push((child_fixture, Arc::clone(child)));
            }
            *node.children.write() = children;
        }
        root
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    /// 자신을 포함한 하위 트리 전위 순회 (무효 노드 하위는 생략)
    fn for_each_valid(self: &Arc<Self>, mut visit: impl FnMut(&Arc<Self>)) {
        let mut stack = vec![Arc::clone(self)];
        while let Some(node) = stack.pop() {
            if !node.is_valid() {
                continue;
            }
            visit(&node);
            let children = node.children.read();
            stack.extend(children.iter().rev().cloned());
        }
    }
}

impl UiNode for MemoryNode {
    fn info(&self) -> Option<NodeInfo> {
        self.is_valid().then(|| self.info.clone())
    }

    fn child_count(&self) -> usize {
        if self.is_valid() {
            self.children.read().len()
        } else {
            0
        }
    }

    fn child(&self, index: usize) -> Option<NodeHandle> {
        if !self.is_valid() {
            return None;
        }
        let child = self.children.read().get(index).cloned()?;
        Some(child as NodeHandle)
    }

    fn parent(&self) -> Option<NodeHandle> {
        if !self.is_valid() {
            return None;
        }
        self.parent.upgrade().map(|parent| parent as NodeHandle)
    }

    fn find_by_text(&self, text: &str) -> Vec<NodeHandle> {
        let Some(me) = self.me.upgrade() else {
            return Vec::new();
        };
        if text.is_empty() {
            return Vec::new();
        }
        let mut matches: Vec<NodeHandle> = Vec::new();
        me.for_each_valid(|node| {
            if contains_ignore_case(node.info.text_or_empty(), text) {
                matches.push(Arc::clone(node) as NodeHandle);
            }
        });
        matches
    }

    fn perform_action(&self, action: NodeAction) -> bool {
        let accepted = self.is_valid()
            && match action {
                NodeAction::Click => self.info.clickable,
                NodeAction::ScrollBackward | NodeAction::ScrollForward => self.info.scrollable,
            };
        self.actions.lock().push(ActionRecord {
            text: self.info.text.clone(),
            action,
            accepted,
        });
        accepted
    }
}

// ============================================================
// SimulatedDevice
// ============================================================

struct DeviceState {
    api_level: u32,
    display: DisplaySize,
    gesture_behavior: GestureBehavior,
    overlay_allowed: bool,
    foreground: Option<Arc<MemoryNode>>,
    apps: HashMap<String, NodeFixture>,
    gestures: Vec<DispatchedGesture>,
    /// `Silent` 모드에서 보류된 완료 콜백
    held_callbacks: Vec<GestureCallback>,
    launches: Vec<String>,
    overlay_ops: Vec<OverlayOp>,
    marker: Option<Point>,
    markers_present: usize,
    max_markers_present: usize,
}

/// 시뮬레이터 기기 (복제 시 같은 기기를 공유)
#[derive(Clone)]
pub struct SimulatedDevice {
    state: Arc<Mutex<DeviceState>>,
    actions: Arc<Mutex<Vec<ActionRecord>>>,
    events: broadcast::Sender<AccessibilityEvent>,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDevice {
    /// 빈 기기 (API 30, 1080x2400, 전면 앱 없음)
    pub fn new() -> Self {
        Self::from_fixture(&DeviceFixture::default())
    }

    pub fn from_fixture(fixture: &DeviceFixture) -> Self {
        let (events, _) = broadcast::channel(64);
        let device = Self {
            state: Arc::new(Mutex::new(DeviceState {
                api_level: fixture.api_level,
                display: fixture.display,
                gesture_behavior: GestureBehavior::default(),
                overlay_allowed: true,
                foreground: None,
                apps: fixture
                    .apps
                    .iter()
                    .map(|(package, tree)| (package.clone(), tree.clone()))
                    .collect(),
                gestures: Vec::new(),
                held_callbacks: Vec::new(),
                launches: Vec::new(),
                overlay_ops: Vec::new(),
                marker: None,
                markers_present: 0,
                max_markers_present: 0,
            })),
            actions: Arc::new(Mutex::new(Vec::new())),
            events,
        };
        if let Some(package) = &fixture.foreground {
            if let Some(tree) = fixture.apps.get(package) {
                device.show(package, tree.clone());
            }
        }
        device
    }

    /// JSON 픽스처 파일에서 기기 생성
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        let fixture: DeviceFixture = serde_json::from_str(&content)?;
        info!(
            path = %path.display(),
            apps = fixture.apps.len(),
            "시뮬레이터 픽스처 로드"
        );
        Ok(Self::from_fixture(&fixture))
    }

    pub fn with_api_level(self, api_level: u32) -> Self {
        self.state.lock().api_level = api_level;
        self
    }

    pub fn with_display_size(self, width: i32, height: i32) -> Self {
        self.state.lock().display = DisplaySize { width, height };
        self
    }

    pub fn with_gesture_behavior(self, behavior: GestureBehavior) -> Self {
        self.state.lock().gesture_behavior = behavior;
        self
    }

    pub fn with_overlay_allowed(self, allowed: bool) -> Self {
        self.state.lock().overlay_allowed = allowed;
        self
    }

    /// 실행 가능한 앱 등록
    pub fn register_app(&self, package: impl Into<String>, tree: NodeFixture) {
        self.state.lock().apps.insert(package.into(), tree);
    }

    /// 트리를 전면에 표시 (이벤트 없음)
    pub fn show(&self, package: &str, tree: NodeFixture) {
        let root = MemoryNode::materialize(&tree, package, &self.actions);
        self.state.lock().foreground = Some(root);
    }

    /// 전면 창 제거
    pub fn clear_foreground(&self) {
        self.state.lock().foreground = None;
    }

    /// 조건에 맞는 전면 트리 노드 무효화 (하위 노드도 접근 불가가 된다)
    pub fn invalidate_where(&self, mut predicate: impl FnMut(&NodeInfo) -> bool) {
        let Some(root) = self.state.lock().foreground.clone() else {
            return;
        };
        let mut targets = Vec::new();
        root.for_each_valid(|node| {
            if predicate(&node.info) {
                targets.push(Arc::clone(node));
            }
        });
        for node in targets {
            node.valid.store(false, Ordering::SeqCst);
        }
    }

    /// 접근성 이벤트 구독
    pub fn subscribe_events(&self) -> broadcast::Receiver<AccessibilityEvent> {
        self.events.subscribe()
    }

    /// 접근성 이벤트 발생
    pub fn emit(&self, event: AccessibilityEvent) {
        let _ = self.events.send(event);
    }

    pub fn gestures(&self) -> Vec<DispatchedGesture> {
        self.state.lock().gestures.clone()
    }

    /// 제출된 단일 지점 탭 좌표 목록
    pub fn tap_points(&self) -> Vec<Point> {
        self.state
            .lock()
            .gestures
            .iter()
            .filter_map(|g| g.gesture.tap_point())
            .collect()
    }

    /// 보류된 제스처 콜백을 모두 호출
    pub fn release_held_gestures(&self, outcome: GestureOutcome) -> usize {
        let held = std::mem::take(&mut self.state.lock().held_callbacks);
        let count = held.len();
        for callback in held {
            callback(outcome);
        }
        count
    }

    pub fn actions(&self) -> Vec<ActionRecord> {
        self.actions.lock().clone()
    }

    pub fn launches(&self) -> Vec<String> {
        self.state.lock().launches.clone()
    }

    pub fn overlay_ops(&self) -> Vec<OverlayOp> {
        self.state.lock().overlay_ops.clone()
    }

    /// 현재 표시 중인 마커
    pub fn marker(&self) -> Option<Point> {
        self.state.lock().marker
    }

    /// 동시에 존재했던 마커 최대 수
    pub fn max_concurrent_markers(&self) -> usize {
        self.state.lock().max_markers_present
    }
}

impl WindowAccessor for SimulatedDevice {
    fn root_in_active_window(&self) -> Option<NodeHandle> {
        self.state
            .lock()
            .foreground
            .clone()
            .map(|root| root as NodeHandle)
    }
}

impl GestureExecutor for SimulatedDevice {
    fn api_level(&self) -> u32 {
        self.state.lock().api_level
    }

    fn display_size(&self) -> (i32, i32) {
        let display = self.state.lock().display;
        (display.width, display.height)
    }

    fn dispatch_gesture(&self, gesture: &Gesture, callback: GestureCallback) -> bool {
        let behavior = {
            let mut state = self.state.lock();
            if state.gesture_behavior == GestureBehavior::Reject {
                return false;
            }
            state.gestures.push(DispatchedGesture {
                gesture: gesture.clone(),
                at: Instant::now(),
            });
            state.gesture_behavior
        };

        match behavior {
            GestureBehavior::Complete => callback(GestureOutcome::Completed),
            GestureBehavior::Cancel => callback(GestureOutcome::Cancelled),
            GestureBehavior::Silent => self.state.lock().held_callbacks.push(callback),
            GestureBehavior::Reject => {}
        }
        true
    }
}

impl OverlayWindow for SimulatedDevice {
    fn add_marker(&self, point: Point, _style: &MarkerStyle) -> bool {
        let mut state = self.state.lock();
        if !state.overlay_allowed {
            return false;
        }
        state.overlay_ops.push(OverlayOp::Added(point));
        state.marker = Some(point);
        state.markers_present += 1;
        state.max_markers_present = state.max_markers_present.max(state.markers_present);
        true
    }

    fn remove_marker(&self) {
        let mut state = self.state.lock();
        if !state.overlay_allowed {
            return;
        }
        state.overlay_ops.push(OverlayOp::Removed);
        state.marker = None;
        state.markers_present = 0;
    }
}

#[async_trait]
impl AppLauncher for SimulatedDevice {
    async fn launch(&self, app_id: &str) -> Result<(), CoreError> {
        {
            let mut state = self.state.lock();
            let Some(tree) = state.apps.get(app_id) else {
                return Err(CoreError::LaunchFailed(format!("실행 intent 없음: {app_id}")));
            };
            let root = MemoryNode::materialize(tree, app_id, &self.actions);
            state.foreground = Some(root);
            state.launches.push(app_id.to_string());
        }
        debug!(app_id, "시뮬레이터 앱 실행");
        self.emit(AccessibilityEvent::window_state_changed(app_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "api_level": 29,
        "display": {"width": 720, "height": 1280},
        "foreground": "com.example.shop",
        "apps": {
            "com.example.shop": {
                "class_name": "android.widget.FrameLayout",
                "bounds": {"left": 0, "top": 0, "right": 720, "bottom": 1280},
                "children": [
                    {
                        "text": "Submit",
                        "clickable": true,
                        "bounds": {"left": 100, "top": 200, "right": 140, "bottom": 230}
                    }
                ]
            }
        }
    }"#;

    #[test]
    fn fixture_json_builds_foreground_tree() {
        let fixture: DeviceFixture = serde_json::from_str(FIXTURE).unwrap();
        let device = SimulatedDevice::from_fixture(&fixture);

        assert_eq!(device.api_level(), 29);
        assert_eq!(device.display_size(), (720, 1280));

        let root = device.root_in_active_window().unwrap();
        let info = root.info().unwrap();
        assert_eq!(info.package_name.as_deref(), Some("com.example.shop"));
        assert_eq!(root.child_count(), 1);

        let child = root.child(0).unwrap();
        assert_eq!(child.info().unwrap().text_or_empty(), "Submit");
        assert!(child.parent().is_some());
    }

    #[test]
    fn load_reads_fixture_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.json");
        std::fs::write(&path, FIXTURE).unwrap();

        let device = SimulatedDevice::load(&path).unwrap();
        assert_eq!(device.api_level(), 29);
        let root = device.root_in_active_window().unwrap();
        assert_eq!(root.find_by_text("Submit").len(), 1);
    }

    #[test]
    fn load_rejects_missing_or_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            SimulatedDevice::load(&missing),
            Err(CoreError::Io(_))
        ));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            SimulatedDevice::load(&broken),
            Err(CoreError::Serialization(_))
        ));
    }

    #[test]
    fn find_by_text_is_case_insensitive_contains_on_text() {
        let device = SimulatedDevice::new();
        device.show(
            "com.example",
            NodeFixture::new().with_children(vec![
                NodeFixture::new().text("Submit order"),
                NodeFixture::new().description("submit"),
                NodeFixture::new().text("SUBMIT"),
            ]),
        );
        let root = device.root_in_active_window().unwrap();
        let texts: Vec<String> = root
            .find_by_text("submit")
            .iter()
            .map(|n| n.info().unwrap().text_or_empty().to_string())
            .collect();
        assert_eq!(texts, vec!["Submit order", "SUBMIT"]);
    }

    #[test]
    fn invalidated_node_reports_stale() {
        let device = SimulatedDevice::new();
        device.show(
            "com.example",
            NodeFixture::new().with_children(vec![NodeFixture::new().text("gone").clickable(true)]),
        );
        let root = device.root_in_active_window().unwrap();
        let child = root.child(0).unwrap();

        device.invalidate_where(|info| info.text_or_empty() == "gone");
        assert!(child.info().is_none());
        assert!(!child.perform_action(NodeAction::Click));
        assert!(child.parent().is_none());
        assert!(!device.actions()[0].accepted);
    }

    #[tokio::test]
    async fn launch_brings_app_forward_and_emits_event() {
        let device = SimulatedDevice::new();
        device.register_app("com.example.app", NodeFixture::new().text("home"));
        let mut events = device.subscribe_events();

        device.launch("com.example.app").await.unwrap();
        let event = events.recv().await.unwrap();
        assert_eq!(event.package_name.as_deref(), Some("com.example.app"));
        assert_eq!(device.launches(), vec!["com.example.app".to_string()]);
        let root = device.root_in_active_window().unwrap();
        assert_eq!(root.info().unwrap().text_or_empty(), "home");
    }

    #[tokio::test]
    async fn launch_of_unknown_app_fails() {
        let device = SimulatedDevice::new();
        let result = device.launch("com.missing").await;
        assert!(matches!(result, Err(CoreError::LaunchFailed(_))));
        assert!(device.launches().is_empty());
    }
}
