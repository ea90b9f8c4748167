use crate::geometry::{DualLines, LineSet, Point};

/// How close (in px) a press must land to a dual line to grab it
pub const GRAB_DISTANCE: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handle {
    In,
    Out,
}

/// Interactive state behind the line configuration.
///
/// Pointer events come from whatever UI draws the frame; the editor only
/// keeps the resulting [`LineSet`] consistent. Dual line positions survive
/// a round trip through polyline mode.
#[derive(Debug, Clone)]
pub struct LineEditor {
    lines: LineSet,
    dual: DualLines,
    drawing: bool,
    dragging: Option<Handle>,
}

impl LineEditor {
    pub fn new(dual: DualLines) -> Self {
        Self {
            lines: LineSet::Dual(dual),
            dual,
            drawing: false,
            dragging: None,
        }
    }

    pub fn for_height(height: i32) -> Self {
        Self::new(DualLines::for_height(height))
    }

    #[inline]
    pub fn lines(&self) -> &LineSet {
        &self.lines
    }

    #[inline]
    pub fn is_polyline(&self) -> bool {
        matches!(self.lines, LineSet::Polyline(_))
    }

    pub fn use_polyline(&mut self) {
        self.drawing = false;
        self.dragging = None;
        self.lines = LineSet::Polyline(Vec::new());
    }

    pub fn use_dual(&mut self) {
        self.drawing = false;
        self.dragging = None;
        self.lines = LineSet::Dual(self.dual);
    }

    pub fn press(&mut self, p: Point) {
        match &mut self.lines {
            LineSet::Polyline(points) => {
                self.drawing = true;
                points.clear();
                points.push(p);
            }
            LineSet::Dual(lines) => {
                if (p.y - lines.line_in_y).abs() < GRAB_DISTANCE {
                    self.dragging = Some(Handle::In);
                } else if (p.y - lines.line_out_y).abs() < GRAB_DISTANCE {
                    self.dragging = Some(Handle::Out);
                }
            }
        }
    }

    pub fn motion(&mut self, p: Point) {
        match &mut self.lines {
            LineSet::Polyline(points) => {
                if self.drawing {
                    points.push(p);
                }
            }
            LineSet::Dual(lines) => {
                match self.dragging {
                    Some(Handle::In) => lines.line_in_y = p.y,
                    Some(Handle::Out) => lines.line_out_y = p.y,
                    None => return,
                }
                self.dual = *lines;
            }
        }
    }

    pub fn release(&mut self, p: Point) {
        match &mut self.lines {
            LineSet::Polyline(points) => {
                if self.drawing {
                    points.push(p);
                }
                self.drawing = false;
            }
            LineSet::Dual(_) => self.dragging = None,
        }
    }
}
