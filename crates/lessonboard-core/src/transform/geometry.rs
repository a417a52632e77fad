//! Pure bounding-box math for anchored resizing.

use super::{Corner, Edge, ResizeHandle, TransformError, TransformResult};
use kurbo::{Point, Rect};

/// Limits applied to the resized box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeConstraints {
    pub min_width: f64,
    pub min_height: f64,
    pub max_width: f64,
    pub max_height: f64,
    pub maintain_aspect_ratio: bool,
    /// Keep the result inside this rectangle. Takes priority over the aspect ratio.
    pub host_bounds: Option<Rect>,
}

impl Default for ResizeConstraints {
    fn default() -> Self {
        Self {
            min_width: 1.0,
            min_height: 1.0,
            max_width: f64::INFINITY,
            max_height: f64::INFINITY,
            maintain_aspect_ratio: false,
            host_bounds: None,
        }
    }
}

impl ResizeConstraints {
    /// No limits apart from rejecting collapsed boxes.
    pub fn unconstrained() -> Self {
        Self {
            min_width: 0.0,
            min_height: 0.0,
            ..Self::default()
        }
    }

    pub fn with_aspect_ratio(mut self, maintain: bool) -> Self {
        self.maintain_aspect_ratio = maintain;
        self
    }

    pub fn with_host_bounds(mut self, bounds: Rect) -> Self {
        self.host_bounds = Some(bounds);
        self
    }
}

impl Corner {
    /// Growth direction per axis when the pointer moves in positive x/y.
    pub fn direction(self) -> (f64, f64) {
        match self {
            Corner::TopLeft => (-1.0, -1.0),
            Corner::TopRight => (1.0, -1.0),
            Corner::BottomLeft => (-1.0, 1.0),
            Corner::BottomRight => (1.0, 1.0),
        }
    }
}

impl ResizeHandle {
    /// Where the handle sits on the box, as fractions of width and height.
    pub fn fraction(self) -> (f64, f64) {
        match self {
            ResizeHandle::Corner(Corner::TopLeft) => (0.0, 0.0),
            ResizeHandle::Corner(Corner::TopRight) => (1.0, 0.0),
            ResizeHandle::Corner(Corner::BottomLeft) => (0.0, 1.0),
            ResizeHandle::Corner(Corner::BottomRight) => (1.0, 1.0),
            ResizeHandle::Edge(Edge::Top) => (0.5, 0.0),
            ResizeHandle::Edge(Edge::Right) => (1.0, 0.5),
            ResizeHandle::Edge(Edge::Bottom) => (0.5, 1.0),
            ResizeHandle::Edge(Edge::Left) => (0.0, 0.5),
        }
    }

    /// Fractions of the point that stays fixed: the one opposite the handle.
    pub fn anchor_fraction(self) -> (f64, f64) {
        let (fx, fy) = self.fraction();
        (1.0 - fx, 1.0 - fy)
    }

    /// The fixed point of `bounds` while dragging this handle.
    pub fn anchor(self, bounds: Rect) -> Point {
        let (fx, fy) = self.anchor_fraction();
        Point::new(
            bounds.x0 + fx * bounds.width(),
            bounds.y0 + fy * bounds.height(),
        )
    }

    pub fn position(self, bounds: Rect) -> Point {
        let (fx, fy) = self.fraction();
        Point::new(
            bounds.x0 + fx * bounds.width(),
            bounds.y0 + fy * bounds.height(),
        )
    }
}

/// Resize `bounds` by dragging `handle` from `drag_start` to `pointer`.
///
/// The point opposite the handle stays fixed unless the host bounds force a
/// shift. A drag that collapses or flips the box is rejected before any
/// constraint runs.
pub fn resize_bounds(
    bounds: Rect,
    handle: ResizeHandle,
    pointer: Point,
    drag_start: Point,
    constraints: &ResizeConstraints,
) -> TransformResult<Rect> {
    let (w, h) = (bounds.width(), bounds.height());
    if !positive(w) || !positive(h) {
        return Err(TransformError::DegenerateScale {
            width: w,
            height: h,
        });
    }
    let anchor = handle.anchor(bounds);
    let delta = pointer - drag_start;

    let (mut new_w, mut new_h) = match handle {
        ResizeHandle::Corner(corner) => {
            let (dir_x, dir_y) = corner.direction();
            let new_w = w + delta.x * dir_x;
            let new_h = h + delta.y * dir_y;
            if constraints.maintain_aspect_ratio {
                keep_ratio(w, h, new_w, new_h)
            } else {
                (new_w, new_h)
            }
        }
        ResizeHandle::Edge(Edge::Top) => (w, h - delta.y),
        ResizeHandle::Edge(Edge::Bottom) => (w, h + delta.y),
        ResizeHandle::Edge(Edge::Left) => (w - delta.x, h),
        ResizeHandle::Edge(Edge::Right) => (w + delta.x, h),
    };

    if !positive(new_w) || !positive(new_h) {
        return Err(TransformError::DegenerateScale {
            width: new_w,
            height: new_h,
        });
    }

    new_w = new_w.max(constraints.min_width);
    new_h = new_h.max(constraints.min_height);
    new_w = new_w.min(constraints.max_width);
    new_h = new_h.min(constraints.max_height);
    if constraints.maintain_aspect_ratio {
        (new_w, new_h) = keep_ratio(w, h, new_w, new_h);
        // The ratio must not push either side back past its maximum.
        let shrink = (constraints.max_width / new_w)
            .min(constraints.max_height / new_h)
            .min(1.0);
        new_w *= shrink;
        new_h *= shrink;
    }

    let (fx, fy) = handle.anchor_fraction();
    let x0 = anchor.x - fx * new_w;
    let y0 = anchor.y - fy * new_h;
    let mut result = Rect::new(x0, y0, x0 + new_w, y0 + new_h);

    if let Some(host) = constraints.host_bounds {
        let (x0, x1) = fit_axis(result.x0, result.x1, anchor.x, host.x0, host.x1);
        let (y0, y1) = fit_axis(result.y0, result.y1, anchor.y, host.y0, host.y1);
        result = Rect::new(x0, y0, x1, y1);
    }

    if !positive(result.width()) || !positive(result.height()) {
        return Err(TransformError::DegenerateScale {
            width: result.width(),
            height: result.height(),
        });
    }
    Ok(result)
}

/// Scale `bounds` by `factor` about its centre.
pub fn scale_about_center(bounds: Rect, factor: f64) -> TransformResult<Rect> {
    if !positive(factor) {
        return Err(TransformError::DegenerateScale {
            width: bounds.width() * factor,
            height: bounds.height() * factor,
        });
    }
    let center = bounds.center();
    let half_w = bounds.width() * factor / 2.0;
    let half_h = bounds.height() * factor / 2.0;
    Ok(Rect::new(
        center.x - half_w,
        center.y - half_h,
        center.x + half_w,
        center.y + half_h,
    ))
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Derive the non-dominant dimension from the original ratio.
fn keep_ratio(w: f64, h: f64, new_w: f64, new_h: f64) -> (f64, f64) {
    let change_w = (new_w / w - 1.0).abs();
    let change_h = (new_h / h - 1.0).abs();
    if change_w >= change_h {
        (new_w, new_w * h / w)
    } else {
        (new_h * w / h, new_h)
    }
}

/// Fit `[lo, hi]` into `[min, max]`: shrink the side moving away from the
/// anchor first, then shift whatever still overflows.
fn fit_axis(lo: f64, hi: f64, anchor: f64, min: f64, max: f64) -> (f64, f64) {
    let (mut lo, mut hi) = (lo, hi);
    if hi > max && anchor < max {
        hi = max;
    }
    if lo < min && anchor > min {
        lo = min;
    }
    let span = max - min;
    if hi - lo > span {
        hi = lo + span;
    }
    if hi > max {
        let shift = hi - max;
        lo -= shift;
        hi -= shift;
    }
    if lo < min {
        let shift = min - lo;
        lo += shift;
        hi += shift;
    }
    (lo, hi)
}
