use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

pub type Point = na::Point2<i32>;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Crossing {
    Entered,
    Exited,
}

/// Two independent horizontal lines: "in" counts downward crossings,
/// "out" counts upward ones.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DualLines {
    pub line_in_y: i32,
    pub line_out_y: i32,
}

impl DualLines {
    pub fn new(line_in_y: i32, line_out_y: i32) -> Self {
        Self {
            line_in_y,
            line_out_y,
        }
    }

    /// Lines at one and two thirds of the frame height
    pub fn for_height(height: i32) -> Self {
        Self::new(height / 3, 2 * height / 3)
    }

    pub fn classify(&self, prev: &Point, curr: &Point) -> Option<Crossing> {
        if downward(prev.y, self.line_in_y, curr.y) {
            Some(Crossing::Entered)
        } else if upward(prev.y, self.line_out_y, curr.y) {
            Some(Crossing::Exited)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineSet {
    Dual(DualLines),
    Polyline(Vec<Point>),
}

impl LineSet {
    /// A polyline needs at least one segment to be tested against
    #[inline]
    pub fn is_active(&self) -> bool {
        match self {
            LineSet::Dual(_) => true,
            LineSet::Polyline(points) => points.len() >= 2,
        }
    }

    /// Every crossing fired by the move `prev -> curr`. Dual lines fire at
    /// most once; a polyline may fire once per segment.
    pub fn crossings(&self, prev: &Point, curr: &Point) -> Vec<Crossing> {
        match self {
            LineSet::Dual(lines) => lines.classify(prev, curr).into_iter().collect(),
            LineSet::Polyline(points) => points
                .windows(2)
                .filter_map(|seg| classify_segment(&seg[0], &seg[1], prev, curr))
                .collect(),
        }
    }
}

fn classify_segment(p1: &Point, p2: &Point, prev: &Point, curr: &Point) -> Option<Crossing> {
    if downward(prev.y, p1.y, curr.y) || downward(prev.y, p2.y, curr.y) {
        Some(Crossing::Entered)
    } else if upward(prev.y, p1.y, curr.y) || upward(prev.y, p2.y, curr.y) {
        Some(Crossing::Exited)
    } else {
        None
    }
}

#[inline(always)]
fn downward(prev_y: i32, line_y: i32, curr_y: i32) -> bool {
    prev_y < line_y && line_y <= curr_y
}

#[inline(always)]
fn upward(prev_y: i32, line_y: i32, curr_y: i32) -> bool {
    prev_y > line_y && line_y >= curr_y
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: i32, y: i32) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn dual_lines_enter_downward() {
        let lines = LineSet::Dual(DualLines::new(100, 100));

        assert_eq!(
            lines.crossings(&pt(0, 90), &pt(0, 110)),
            vec![Crossing::Entered]
        );
        assert!(lines.crossings(&pt(0, 100), &pt(0, 110)).is_empty());
        assert_eq!(
            lines.crossings(&pt(0, 99), &pt(0, 100)),
            vec![Crossing::Entered]
        );
    }

    #[test]
    fn dual_lines_exit_upward() {
        let lines = LineSet::Dual(DualLines::new(100, 100));

        assert_eq!(
            lines.crossings(&pt(0, 110), &pt(0, 90)),
            vec![Crossing::Exited]
        );
        assert_eq!(
            lines.crossings(&pt(0, 101), &pt(0, 100)),
            vec![Crossing::Exited]
        );
    }

    #[test]
    fn dual_lines_are_independent() {
        let lines = DualLines::new(100, 300);

        // crosses "in" downward without touching "out"
        assert_eq!(
            lines.classify(&pt(0, 50), &pt(0, 150)),
            Some(Crossing::Entered)
        );
        // moving up over "in" is not an exit, only "out" counts exits
        assert_eq!(lines.classify(&pt(0, 150), &pt(0, 50)), None);
        assert_eq!(
            lines.classify(&pt(0, 350), &pt(0, 250)),
            Some(Crossing::Exited)
        );
        assert_eq!(lines.classify(&pt(0, 250), &pt(0, 350)), None);
    }

    #[test]
    fn dual_lines_for_height() {
        assert_eq!(DualLines::for_height(720), DualLines::new(240, 480));
    }

    #[test]
    fn polyline_fires_per_segment() {
        let lines = LineSet::Polyline(vec![pt(0, 100), pt(50, 105), pt(100, 200)]);

        // both segments have an endpoint in (90, 110]
        assert_eq!(
            lines.crossings(&pt(20, 90), &pt(20, 110)),
            vec![Crossing::Entered, Crossing::Entered]
        );
        // only the second segment reaches y=200
        assert_eq!(
            lines.crossings(&pt(20, 210), &pt(20, 150)),
            vec![Crossing::Exited]
        );
    }

    #[test]
    fn short_polyline_is_inactive() {
        let lines = LineSet::Polyline(vec![pt(0, 100)]);

        assert!(!lines.is_active());
        assert!(lines.crossings(&pt(0, 90), &pt(0, 110)).is_empty());
        assert!(LineSet::Polyline(vec![])
            .crossings(&pt(0, 90), &pt(0, 110))
            .is_empty());
    }
}
