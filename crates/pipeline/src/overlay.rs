//! Output-surface placement over the source element.
//!
//! `SurfaceOverlay` keeps the output surface visually registered over its
//! playback element regardless of layout changes. It never renders; it only
//! moves geometry. Two rules hold throughout: the overlay is transparent to
//! input (it paints on top but never consumes events), and attaching must
//! not clobber an existing positioning context on the anchor.

/// Placement of the overlay surface in host coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// The element the overlay is registered against.
pub trait OverlayAnchor {
    /// Current on-screen placement of the element.
    fn display_rect(&self) -> Rect;

    /// Whether the element's containing context already establishes a
    /// positioning reference frame.
    fn has_positioning_context(&self) -> bool;

    /// Establishes a positioning reference frame. Only called when one is
    /// absent; an explicit existing setting is never overridden.
    fn establish_positioning_context(&mut self);
}

/// Host-provided surface the overlay positions. Pixel buffer sizing is not
/// handled here — that tracks the source's intrinsic decode resolution and
/// belongs to the renderer; the host environment scales for display.
pub trait OverlaySurface {
    fn set_rect(&mut self, rect: Rect);
    fn set_input_passthrough(&mut self, passthrough: bool);
    fn set_visible(&mut self, visible: bool);
    /// Removes the surface from the host for good.
    fn detach(&mut self);
}

/// Keeps one output surface registered over one anchor.
pub struct SurfaceOverlay {
    surface: Box<dyn OverlaySurface>,
    last_rect: Option<Rect>,
    attached: bool,
}

impl SurfaceOverlay {
    pub fn new(surface: Box<dyn OverlaySurface>) -> Self {
        Self {
            surface,
            last_rect: None,
            attached: false,
        }
    }

    /// Wires the surface to the anchor: ensures a positioning context,
    /// makes the surface input-transparent and visible, and applies the
    /// initial geometry.
    pub fn attach(&mut self, anchor: &mut dyn OverlayAnchor) {
        if !anchor.has_positioning_context() {
            anchor.establish_positioning_context();
        }
        self.surface.set_input_passthrough(true);
        self.surface.set_visible(true);
        self.sync(anchor);
        self.attached = true;
    }

    /// Re-applies geometry when the anchor moved. Lazy: the surface is only
    /// touched when the rect actually changed.
    pub fn sync(&mut self, anchor: &dyn OverlayAnchor) {
        let rect = anchor.display_rect();
        if self.last_rect != Some(rect) {
            self.surface.set_rect(rect);
            self.last_rect = Some(rect);
        }
    }

    /// Discards the surface. Safe to call more than once.
    pub fn detach(&mut self) {
        if self.attached {
            self.surface.detach();
            self.attached = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, PartialEq)]
    enum Event {
        Rect(Rect),
        Passthrough(bool),
        Visible(bool),
        Detach,
    }

    struct RecordingSurface {
        events: Rc<RefCell<Vec<Event>>>,
    }

    impl OverlaySurface for RecordingSurface {
        fn set_rect(&mut self, rect: Rect) {
            self.events.borrow_mut().push(Event::Rect(rect));
        }
        fn set_input_passthrough(&mut self, passthrough: bool) {
            self.events.borrow_mut().push(Event::Passthrough(passthrough));
        }
        fn set_visible(&mut self, visible: bool) {
            self.events.borrow_mut().push(Event::Visible(visible));
        }
        fn detach(&mut self) {
            self.events.borrow_mut().push(Event::Detach);
        }
    }

    struct Anchor {
        rect: Rect,
        has_context: bool,
        established: u32,
    }

    impl OverlayAnchor for Anchor {
        fn display_rect(&self) -> Rect {
            self.rect
        }
        fn has_positioning_context(&self) -> bool {
            self.has_context
        }
        fn establish_positioning_context(&mut self) {
            self.established += 1;
            self.has_context = true;
        }
    }

    fn overlay() -> (SurfaceOverlay, Rc<RefCell<Vec<Event>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let surface = RecordingSurface {
            events: events.clone(),
        };
        (SurfaceOverlay::new(Box::new(surface)), events)
    }

    #[test]
    fn attach_is_input_transparent_and_positions_once() {
        let (mut overlay, events) = overlay();
        let mut anchor = Anchor {
            rect: Rect::new(10, 20, 640, 360),
            has_context: false,
            established: 0,
        };

        overlay.attach(&mut anchor);
        assert_eq!(anchor.established, 1);
        assert_eq!(
            *events.borrow(),
            vec![
                Event::Passthrough(true),
                Event::Visible(true),
                Event::Rect(Rect::new(10, 20, 640, 360)),
            ]
        );
    }

    #[test]
    fn existing_positioning_context_is_left_alone() {
        let (mut overlay, _events) = overlay();
        let mut anchor = Anchor {
            rect: Rect::new(0, 0, 100, 100),
            has_context: true,
            established: 0,
        };
        overlay.attach(&mut anchor);
        assert_eq!(anchor.established, 0);
    }

    #[test]
    fn sync_only_touches_surface_on_change() {
        let (mut overlay, events) = overlay();
        let mut anchor = Anchor {
            rect: Rect::new(0, 0, 100, 100),
            has_context: true,
            established: 0,
        };
        overlay.attach(&mut anchor);
        events.borrow_mut().clear();

        overlay.sync(&anchor);
        overlay.sync(&anchor);
        assert!(events.borrow().is_empty(), "unchanged rect must be a no-op");

        anchor.rect = Rect::new(5, 5, 100, 100);
        overlay.sync(&anchor);
        assert_eq!(*events.borrow(), vec![Event::Rect(Rect::new(5, 5, 100, 100))]);
    }

    #[test]
    fn detach_is_idempotent() {
        let (mut overlay, events) = overlay();
        let mut anchor = Anchor {
            rect: Rect::new(0, 0, 1, 1),
            has_context: true,
            established: 0,
        };
        overlay.attach(&mut anchor);
        overlay.detach();
        overlay.detach();
        let detaches = events
            .borrow()
            .iter()
            .filter(|event| matches!(event, Event::Detach))
            .count();
        assert_eq!(detaches, 1);
    }
}
