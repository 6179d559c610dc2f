//! Pointer-driven crop selection.
//!
//! [`CropEditor`] turns pointer events over a (possibly scaled) rendering of
//! the source image into a [`CropRect`] in source pixels. The interaction is a
//! small state machine:
//!
//! ```text
//!            press inside rect            move: x,y = pointer - offset
//!   Idle ────────────────────────▶ Moving ─────┐
//!    ▲  │                             │ ▲      │
//!    │  │ press on handle             │ └──────┘
//!    │  └─────────────────▶ Resizing(handle) ──┐
//!    │                        │ ▲              │ move: apply_resize(origin, Δ)
//!    │   up / leave           │ └──────────────┘
//!    └────────────────────────┴── (from Moving or Resizing)
//! ```
//!
//! `reset()` is accepted in any state and returns to `Idle`.
//!
//! Positions arrive in rendered coordinates (relative to the image element's
//! top-left corner). The rendered size is read from the [`Layout`] on every
//! call, since layout can change between two events.

use crate::geometry::{
    CropRect, Handle, Point, Size, apply_resize, centered_square, clamp_rect_to_bounds, constrain,
};

/// Reports how large the image is currently displayed.
pub trait Layout {
    fn rendered_size(&self) -> Size;
}

/// A layout whose rendered size never changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedLayout(pub Size);

impl Layout for FixedLayout {
    fn rendered_size(&self) -> Size {
        self.0
    }
}

/// No rendered view: pointer positions are taken as source pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unrendered;

impl Layout for Unrendered {
    fn rendered_size(&self) -> Size {
        Size::new(0.0, 0.0)
    }
}

impl<L: Layout + ?Sized> Layout for &L {
    fn rendered_size(&self) -> Size {
        (**self).rendered_size()
    }
}

/// What a pointer press landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Handle(Handle),
    Surface,
}

/// Current drag state. Moving and resizing at once cannot be expressed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interaction {
    Idle,
    /// `offset` is the pointer's distance from the rectangle origin, in
    /// source pixels, captured at press time.
    Moving { offset: Point },
    /// `anchor` is the raw (rendered) press position; `origin` the rectangle
    /// at press time. Each move resizes `origin` by the total displacement.
    Resizing {
        handle: Handle,
        anchor: Point,
        origin: CropRect,
    },
}

type ChangeListener = Box<dyn FnMut(&CropRect)>;

/// Interactive crop rectangle editor over one source image.
pub struct CropEditor<L: Layout> {
    layout: L,
    source: Size,
    min_dim: f64,
    handle_hit_size: f64,
    rect: CropRect,
    interaction: Interaction,
    on_change: Option<ChangeListener>,
}

impl<L: Layout> std::fmt::Debug for CropEditor<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CropEditor")
            .field("source", &self.source)
            .field("min_dim", &self.min_dim)
            .field("rect", &self.rect)
            .field("interaction", &self.interaction)
            .finish_non_exhaustive()
    }
}

impl<L: Layout> CropEditor<L> {
    /// Start editing a `source_width x source_height` image. The selection
    /// begins as the centered max square.
    pub fn new(layout: L, source_width: u32, source_height: u32, min_dim: f64) -> Self {
        let source = Size::new(f64::from(source_width), f64::from(source_height));
        Self {
            layout,
            source,
            min_dim,
            handle_hit_size: 28.0,
            rect: centered_square(source.width, source.height),
            interaction: Interaction::Idle,
            on_change: None,
        }
    }

    /// Side of the square hit box around each handle, in rendered pixels.
    pub fn with_handle_hit_size(mut self, size: f64) -> Self {
        self.handle_hit_size = size;
        self
    }

    /// Register the listener called after every change of the rectangle.
    pub fn set_on_change(&mut self, listener: impl FnMut(&CropRect) + 'static) {
        self.on_change = Some(Box::new(listener));
    }

    pub fn rect(&self) -> CropRect {
        self.rect
    }

    pub fn interaction(&self) -> Interaction {
        self.interaction
    }

    pub fn source_size(&self) -> Size {
        self.source
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }

    /// Minimum side length, capped so it always fits the source.
    fn effective_min(&self) -> f64 {
        self.min_dim.min(self.source.width).min(self.source.height)
    }

    /// Rendered-to-source scale per axis, read fresh from the layout.
    fn scale(&self) -> (f64, f64) {
        let rendered = self.layout.rendered_size();
        let axis = |native: f64, shown: f64| {
            if shown.is_finite() && shown > 0.0 {
                native / shown
            } else {
                1.0
            }
        };
        (
            axis(self.source.width, rendered.width),
            axis(self.source.height, rendered.height),
        )
    }

    fn to_source(&self, pos: Point) -> Point {
        let (sx, sy) = self.scale();
        Point::new(pos.x * sx, pos.y * sy)
    }

    /// Which handle (if any) sits under a rendered position.
    pub fn target_at(&self, pos: Point) -> PointerTarget {
        let (sx, sy) = self.scale();
        let half = self.handle_hit_size / 2.0;
        Handle::ALL
            .into_iter()
            .find(|handle| {
                let grip = handle.anchor_on(&self.rect);
                let (gx, gy) = (grip.x / sx, grip.y / sy);
                (pos.x - gx).abs() <= half && (pos.y - gy).abs() <= half
            })
            .map_or(PointerTarget::Surface, PointerTarget::Handle)
    }

    /// Begin a drag. Returns `true` when a move or resize started.
    pub fn on_pointer_down(&mut self, pos: Point, target: PointerTarget) -> bool {
        match target {
            PointerTarget::Handle(handle) => {
                self.interaction = Interaction::Resizing {
                    handle,
                    anchor: pos,
                    origin: self.rect,
                };
                true
            }
            PointerTarget::Surface => {
                let p = self.to_source(pos);
                if self.rect.contains_strictly(p) {
                    self.interaction = Interaction::Moving {
                        offset: Point::new(p.x - self.rect.x, p.y - self.rect.y),
                    };
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Hit-test `pos` and begin a drag from whatever is there.
    pub fn press_at(&mut self, pos: Point) -> bool {
        let target = self.target_at(pos);
        self.on_pointer_down(pos, target)
    }

    /// Continue the current drag. Returns `true` when the rectangle changed.
    pub fn on_pointer_move(&mut self, pos: Point) -> bool {
        let next = match self.interaction {
            Interaction::Idle => return false,
            Interaction::Moving { offset } => {
                let p = self.to_source(pos);
                let moved = CropRect {
                    x: p.x - offset.x,
                    y: p.y - offset.y,
                    ..self.rect
                };
                clamp_rect_to_bounds(moved, self.source.width, self.source.height)
            }
            Interaction::Resizing {
                handle,
                anchor,
                origin,
            } => {
                let (sx, sy) = self.scale();
                apply_resize(
                    origin,
                    handle,
                    (pos.x - anchor.x) * sx,
                    (pos.y - anchor.y) * sy,
                    self.effective_min(),
                    self.source.width,
                    self.source.height,
                )
            }
        };
        self.update(next)
    }

    pub fn on_pointer_up(&mut self) {
        self.interaction = Interaction::Idle;
    }

    pub fn on_pointer_leave(&mut self) {
        self.interaction = Interaction::Idle;
    }

    /// Back to the centered max square, from any state.
    pub fn reset(&mut self) -> bool {
        self.interaction = Interaction::Idle;
        self.update(centered_square(self.source.width, self.source.height))
    }

    /// Set the rectangle directly. Out-of-range values are constrained.
    pub fn place(&mut self, rect: CropRect) -> bool {
        self.interaction = Interaction::Idle;
        let next = constrain(
            rect,
            self.effective_min(),
            self.source.width,
            self.source.height,
        );
        self.update(next)
    }

    fn update(&mut self, next: CropRect) -> bool {
        if next == self.rect {
            return false;
        }
        self.rect = next;
        if let Some(listener) = self.on_change.as_mut() {
            listener(&self.rect);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Layout the test can resize between events.
    #[derive(Clone)]
    struct SharedLayout(Rc<Cell<Size>>);

    impl Layout for SharedLayout {
        fn rendered_size(&self) -> Size {
            self.0.get()
        }
    }

    fn editor(w: u32, h: u32) -> CropEditor<FixedLayout> {
        let shown = FixedLayout(Size::new(f64::from(w), f64::from(h)));
        CropEditor::new(shown, w, h, 50.0)
    }

    fn assert_invariant<L: Layout>(ed: &CropEditor<L>) {
        let s = ed.source_size();
        let min = 50.0_f64.min(s.width).min(s.height);
        assert!(
            ed.rect().is_valid_within(min, s.width, s.height),
            "invariant broken: {:?}",
            ed.rect()
        );
    }

    // =========================================================================
    // reset / initial state
    // =========================================================================

    #[test]
    fn starts_with_centered_square() {
        let ed = editor(400, 300);
        assert_eq!(ed.rect(), CropRect::new(50.0, 0.0, 300.0, 300.0));
        assert_eq!(ed.interaction(), Interaction::Idle);
    }

    #[test]
    fn reset_restores_centered_square_from_any_state() {
        let mut ed = editor(400, 300);
        ed.on_pointer_down(Point::new(200.0, 150.0), PointerTarget::Surface);
        ed.on_pointer_move(Point::new(150.0, 150.0));
        assert!(matches!(ed.interaction(), Interaction::Moving { .. }));

        assert!(ed.reset());
        assert_eq!(ed.rect(), CropRect::new(50.0, 0.0, 300.0, 300.0));
        assert_eq!(ed.interaction(), Interaction::Idle);
    }

    // =========================================================================
    // Moving
    // =========================================================================

    #[test]
    fn press_inside_starts_moving_with_offset() {
        let mut ed = editor(400, 300);
        assert!(ed.on_pointer_down(Point::new(60.0, 10.0), PointerTarget::Surface));
        assert_eq!(
            ed.interaction(),
            Interaction::Moving {
                offset: Point::new(10.0, 10.0)
            }
        );
    }

    #[test]
    fn press_outside_stays_idle() {
        let mut ed = editor(400, 300);
        assert!(!ed.on_pointer_down(Point::new(10.0, 10.0), PointerTarget::Surface));
        assert_eq!(ed.interaction(), Interaction::Idle);
        // Border is not "strictly inside".
        assert!(!ed.on_pointer_down(Point::new(50.0, 100.0), PointerTarget::Surface));
        assert_eq!(ed.interaction(), Interaction::Idle);
    }

    #[test]
    fn move_follows_pointer_minus_offset_and_clamps() {
        let mut ed = editor(400, 300);
        ed.on_pointer_down(Point::new(200.0, 150.0), PointerTarget::Surface);

        assert!(ed.on_pointer_move(Point::new(170.0, 150.0)));
        assert_eq!(ed.rect(), CropRect::new(20.0, 0.0, 300.0, 300.0));

        ed.on_pointer_move(Point::new(-500.0, 900.0));
        assert_eq!(ed.rect(), CropRect::new(0.0, 0.0, 300.0, 300.0));

        ed.on_pointer_move(Point::new(900.0, 150.0));
        assert_eq!(ed.rect(), CropRect::new(100.0, 0.0, 300.0, 300.0));
    }

    #[test]
    fn move_in_idle_is_noop() {
        let mut ed = editor(400, 300);
        let before = ed.rect();
        assert!(!ed.on_pointer_move(Point::new(10.0, 10.0)));
        assert_eq!(ed.rect(), before);
    }

    #[test]
    fn up_and_leave_end_the_drag() {
        let mut ed = editor(400, 300);
        ed.on_pointer_down(Point::new(200.0, 150.0), PointerTarget::Surface);
        ed.on_pointer_up();
        assert_eq!(ed.interaction(), Interaction::Idle);
        assert!(!ed.on_pointer_move(Point::new(100.0, 100.0)));

        ed.on_pointer_down(Point::new(200.0, 150.0), PointerTarget::Surface);
        ed.on_pointer_leave();
        assert_eq!(ed.interaction(), Interaction::Idle);
    }

    // =========================================================================
    // Resizing
    // =========================================================================

    #[test]
    fn handle_press_starts_resizing() {
        let mut ed = editor(400, 300);
        ed.on_pointer_down(Point::new(350.0, 300.0), PointerTarget::Handle(Handle::SE));
        assert_eq!(
            ed.interaction(),
            Interaction::Resizing {
                handle: Handle::SE,
                anchor: Point::new(350.0, 300.0),
                origin: CropRect::new(50.0, 0.0, 300.0, 300.0),
            }
        );
    }

    #[test]
    fn resize_uses_total_displacement_from_anchor() {
        let mut ed = editor(400, 300);
        ed.on_pointer_down(Point::new(350.0, 300.0), PointerTarget::Handle(Handle::SE));
        ed.on_pointer_move(Point::new(330.0, 290.0));
        ed.on_pointer_move(Point::new(300.0, 250.0));
        assert_eq!(ed.rect(), CropRect::new(50.0, 0.0, 250.0, 250.0));
    }

    #[test]
    fn se_resize_never_moves_nw_corner() {
        let mut ed = editor(1000, 800);
        ed.place(CropRect::new(200.0, 150.0, 300.0, 300.0));
        let origin = ed.rect().origin();
        ed.on_pointer_down(Point::new(500.0, 450.0), PointerTarget::Handle(Handle::SE));
        for (x, y) in [(520.0, 470.0), (260.0, 210.0), (900.0, 790.0), (10.0, 5.0)] {
            ed.on_pointer_move(Point::new(x, y));
            assert_eq!(ed.rect().origin(), origin);
            assert_invariant(&ed);
        }
    }

    #[test]
    fn invariant_holds_for_arbitrary_event_sequence() {
        let mut ed = editor(640, 360);
        let events: [(f64, f64); 8] = [
            (-100.0, -100.0),
            (5000.0, 10.0),
            (320.0, 180.0),
            (0.0, 360.0),
            (639.9, 0.1),
            (-3.0, 1e6),
            (100.5, 200.25),
            (320.0, 180.0),
        ];
        let targets = [
            PointerTarget::Surface,
            PointerTarget::Handle(Handle::NW),
            PointerTarget::Handle(Handle::E),
            PointerTarget::Handle(Handle::SW),
            PointerTarget::Handle(Handle::N),
        ];
        for target in targets {
            ed.reset();
            ed.on_pointer_down(Point::new(320.0, 180.0), target);
            for (x, y) in events {
                ed.on_pointer_move(Point::new(x, y));
                assert_invariant(&ed);
            }
            ed.on_pointer_up();
            assert_invariant(&ed);
        }
    }

    // =========================================================================
    // Coordinate conversion
    // =========================================================================

    #[test]
    fn converts_rendered_to_source_per_axis() {
        // 1000x500 source shown at 500x250 (scale 2 on both axes).
        let layout = FixedLayout(Size::new(500.0, 250.0));
        let mut ed = CropEditor::new(layout, 1000, 500, 50.0);
        assert_eq!(ed.rect(), CropRect::new(250.0, 0.0, 500.0, 500.0));

        ed.on_pointer_down(Point::new(250.0, 125.0), PointerTarget::Surface);
        ed.on_pointer_move(Point::new(200.0, 125.0));
        assert_eq!(ed.rect().x, 150.0);
    }

    #[test]
    fn scale_is_recomputed_on_every_event() {
        let size = Rc::new(Cell::new(Size::new(400.0, 300.0)));
        let mut ed = CropEditor::new(SharedLayout(size.clone()), 400, 300, 50.0);
        ed.on_pointer_down(Point::new(350.0, 300.0), PointerTarget::Handle(Handle::SE));

        // Display shrinks to half between press and move: 10 rendered px
        // now means 20 source px.
        size.set(Size::new(200.0, 150.0));
        ed.on_pointer_move(Point::new(340.0, 290.0));
        assert_eq!(ed.rect(), CropRect::new(50.0, 0.0, 280.0, 280.0));
    }

    #[test]
    fn non_uniform_render_scales_axes_independently() {
        let layout = FixedLayout(Size::new(400.0, 150.0));
        let mut ed = CropEditor::new(layout, 400, 300, 50.0);
        ed.on_pointer_down(Point::new(350.0, 150.0), PointerTarget::Handle(Handle::SE));
        ed.on_pointer_move(Point::new(340.0, 140.0));
        assert_eq!(ed.rect(), CropRect::new(50.0, 0.0, 290.0, 280.0));
    }

    #[test]
    fn unrendered_layout_uses_source_pixels() {
        let mut ed = CropEditor::new(Unrendered, 400, 300, 50.0);
        ed.on_pointer_down(Point::new(200.0, 150.0), PointerTarget::Surface);
        ed.on_pointer_move(Point::new(190.0, 150.0));
        assert_eq!(ed.rect().x, 40.0);
    }

    // =========================================================================
    // Hit testing, placement, listener
    // =========================================================================

    #[test]
    fn target_at_finds_corner_and_edge_handles() {
        let ed = editor(400, 300);
        assert_eq!(
            ed.target_at(Point::new(52.0, 2.0)),
            PointerTarget::Handle(Handle::NW)
        );
        assert_eq!(
            ed.target_at(Point::new(348.0, 298.0)),
            PointerTarget::Handle(Handle::SE)
        );
        assert_eq!(
            ed.target_at(Point::new(200.0, 296.0)),
            PointerTarget::Handle(Handle::S)
        );
        assert_eq!(ed.target_at(Point::new(200.0, 150.0)), PointerTarget::Surface);
    }

    #[test]
    fn press_at_resizes_from_handle() {
        let mut ed = editor(400, 300);
        assert!(ed.press_at(Point::new(50.0, 150.0)));
        assert!(matches!(
            ed.interaction(),
            Interaction::Resizing {
                handle: Handle::W,
                ..
            }
        ));
    }

    #[test]
    fn place_constrains_rect() {
        let mut ed = editor(400, 300);
        ed.place(CropRect::new(380.0, -20.0, 10.0, 500.0));
        assert_eq!(ed.rect(), CropRect::new(350.0, 0.0, 50.0, 300.0));
    }

    #[test]
    fn listener_sees_every_change() {
        let seen = Rc::new(Cell::new(0usize));
        let counter = seen.clone();
        let mut ed = editor(400, 300);
        ed.set_on_change(move |_| counter.set(counter.get() + 1));

        ed.on_pointer_down(Point::new(200.0, 150.0), PointerTarget::Surface);
        ed.on_pointer_move(Point::new(190.0, 150.0));
        ed.on_pointer_move(Point::new(180.0, 150.0));
        // Same position: no change, no notification.
        ed.on_pointer_move(Point::new(180.0, 150.0));
        ed.on_pointer_up();
        ed.reset();

        assert_eq!(seen.get(), 3);
    }

    #[test]
    fn tiny_source_keeps_whole_image_selected() {
        let mut ed = editor(30, 20);
        assert_eq!(ed.rect(), CropRect::new(5.0, 0.0, 20.0, 20.0));
        ed.on_pointer_down(Point::new(25.0, 20.0), PointerTarget::Handle(Handle::SE));
        ed.on_pointer_move(Point::new(0.0, 0.0));
        assert_invariant(&ed);
        assert_eq!(ed.rect(), CropRect::new(5.0, 0.0, 20.0, 20.0));
    }
}
