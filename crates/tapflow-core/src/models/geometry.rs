//! 화면 좌표 모델.
//!
//! 플랫폼 화면 좌표계(좌상단 원점, 픽셀 단위)를 따른다.

use serde::{Deserialize, Serialize};

/// 화면 좌표 한 점
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// 오프셋을 더한 새 좌표
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// 두 좌표 모두 0 이상인지
    pub fn is_non_negative(&self) -> bool {
        self.x >= 0 && self.y >= 0
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// 화면 경계 사각형 (left/top 포함, right/bottom 제외)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    /// 너비/높이 중 하나라도 0 이하인지
    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// 중심 좌표 (홀수 크기는 내림, 극단값에서도 넘치지 않음)
    pub fn center(&self) -> Point {
        Point {
            x: midpoint(self.left, self.right),
            y: midpoint(self.top, self.bottom),
        }
    }

    /// 지정 좌표가 사각형 내부인지
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x < self.right && point.y >= self.top && point.y < self.bottom
    }

    /// `"left,top,right,bottom"` 문자열 표현
    pub fn to_bounds_string(&self) -> String {
        format!("{},{},{},{}", self.left, self.top, self.right, self.bottom)
    }
}

fn midpoint(a: i32, b: i32) -> i32 {
    // 두 i32의 평균은 항상 i32 범위 안이다
    ((i64::from(a) + i64::from(b)) >> 1) as i32
}
