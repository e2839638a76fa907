//! Mark editor: toggles circular "X" marks over a ticket image and keeps them
//! in device-local storage.

pub mod render;

pub use render::{Point, Rgba, Shape, Stroke, Surface, SvgSurface};

use crate::error::{Result, TambolaError};
use crate::storage::LocalStorage;
use crate::types::Mark;
use image::ImageFormat;
use std::sync::Arc;

pub const MARK_RADIUS: f64 = 18.0;
pub const MARK_COLOR: Rgba = Rgba {
    r: 231,
    g: 76,
    b: 60,
    a: 0.85,
};
pub const MARKS_STORAGE_KEY: &str = "tambola_marks";

const RING_STROKE: Stroke = Stroke {
    color: MARK_COLOR,
    width: 4.0,
};
const CROSS_STROKE: Stroke = Stroke {
    color: MARK_COLOR,
    width: 3.0,
};

/// A decoded ticket. Keeps the source bytes so surfaces can display them.
#[derive(Debug, Clone)]
pub struct TicketImage {
    width: u32,
    height: u32,
    format: ImageFormat,
    bytes: Arc<[u8]>,
}

impl TicketImage {
    /// Decodes on the blocking pool.
    pub async fn decode(bytes: Vec<u8>) -> Result<Self> {
        tokio::task::spawn_blocking(move || -> Result<Self> {
            let format = image::guess_format(&bytes)?;
            let decoded = image::load_from_memory_with_format(&bytes, format)?;
            Ok(Self {
                width: decoded.width(),
                height: decoded.height(),
                format,
                bytes: bytes.into(),
            })
        })
        .await
        .map_err(|e| TambolaError::internal(format!("Image decode task failed: {}", e)))?
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Toggle {
    Added(Mark),
    Removed(Mark),
}

pub struct MarkEditor<S: Surface> {
    storage: Arc<dyn LocalStorage>,
    surface: S,
    marks: Vec<Mark>,
    ticket: Option<TicketImage>,
    pointer_enabled: bool,
}

impl<S: Surface> MarkEditor<S> {
    pub fn new(storage: Arc<dyn LocalStorage>, surface: S) -> Self {
        Self {
            storage,
            surface,
            marks: Vec::new(),
            ticket: None,
            pointer_enabled: false,
        }
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn ticket(&self) -> Option<&TicketImage> {
        self.ticket.as_ref()
    }

    pub fn pointer_enabled(&self) -> bool {
        self.pointer_enabled
    }

    /// Shows a new ticket. Discards in-memory and saved marks first.
    pub async fn load_image(&mut self, bytes: Vec<u8>) -> Result<&TicketImage> {
        self.marks.clear();
        self.storage.remove_item(MARKS_STORAGE_KEY).await?;
        tracing::info!("Loading new ticket, cleared saved marks");

        self.open_image(bytes).await
    }

    /// Shows a ticket and restores whatever marks are saved for this device.
    /// Restoring only happens once decoding has finished.
    pub async fn open_image(&mut self, bytes: Vec<u8>) -> Result<&TicketImage> {
        let ticket = TicketImage::decode(bytes).await?;

        self.surface.resize(ticket.width, ticket.height);
        self.surface.show_image(&ticket);
        self.surface.set_pointer_enabled(true);
        self.pointer_enabled = true;
        tracing::debug!("Ticket decoded: {}x{}", ticket.width, ticket.height);
        self.ticket = Some(ticket);

        self.redraw();
        self.restore().await?;

        self.ticket
            .as_ref()
            .ok_or_else(|| TambolaError::internal("Ticket missing after decode"))
    }

    /// Pointer entry point. Clicks before a ticket is shown, or at a
    /// position that is not a finite number, are ignored.
    pub fn click(&mut self, x: f64, y: f64) -> Option<Toggle> {
        if !self.pointer_enabled {
            tracing::debug!("Ignoring click at ({}, {}) before ticket is ready", x, y);
            return None;
        }
        match self.toggle_mark_at(x, y) {
            Ok(toggle) => Some(toggle),
            Err(e) => {
                tracing::warn!("Ignoring click: {}", e);
                None
            }
        }
    }

    /// Removes the first mark within `MARK_RADIUS` of the point, or adds one.
    /// Non-finite coordinates are rejected and leave the list untouched.
    pub fn toggle_mark_at(&mut self, x: f64, y: f64) -> Result<Toggle> {
        if !x.is_finite() || !y.is_finite() {
            return Err(TambolaError::InvalidPoint { x, y });
        }

        let toggle = match self.find_mark(x, y) {
            Some(index) => Toggle::Removed(self.marks.remove(index)),
            None => {
                let mark = Mark::new(x, y);
                self.marks.push(mark);
                Toggle::Added(mark)
            }
        };

        self.redraw();
        Ok(toggle)
    }

    fn find_mark(&self, x: f64, y: f64) -> Option<usize> {
        self.marks
            .iter()
            .position(|mark| mark.distance_to(x, y) < MARK_RADIUS)
    }

    pub fn redraw(&mut self) {
        self.surface.clear();

        let arm = MARK_RADIUS / 1.5;
        for mark in &self.marks {
            self.surface
                .stroke_circle(Point::new(mark.x, mark.y), MARK_RADIUS, RING_STROKE);
            self.surface.stroke_segments(
                &[
                    (
                        Point::new(mark.x - arm, mark.y - arm),
                        Point::new(mark.x + arm, mark.y + arm),
                    ),
                    (
                        Point::new(mark.x + arm, mark.y - arm),
                        Point::new(mark.x - arm, mark.y + arm),
                    ),
                ],
                CROSS_STROKE,
            );
        }
    }

    /// Saves the whole list, replacing the previous value. Returns the count saved.
    pub async fn persist(&self) -> Result<usize> {
        let raw = serde_json::to_string(&self.marks)?;
        self.storage.set_item(MARKS_STORAGE_KEY, &raw).await?;

        tracing::info!("Saved {} marks", self.marks.len());
        Ok(self.marks.len())
    }

    /// Replaces the list with the saved one. Returns false when nothing is saved.
    /// Unreadable data is an error and leaves the current list as it was.
    pub async fn restore(&mut self) -> Result<bool> {
        let Some(raw) = self.storage.get_item(MARKS_STORAGE_KEY).await? else {
            return Ok(false);
        };

        let marks: Vec<Mark> = serde_json::from_str(&raw).map_err(|e| {
            tracing::warn!("Saved marks are malformed: {}", e);
            TambolaError::storage_read(e.to_string())
        })?;

        tracing::info!("Restored {} marks", marks.len());
        self.marks = marks;
        self.redraw();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryLocalStorage;

    fn ticket_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::new(width, height);
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn editor() -> (MarkEditor<SvgSurface>, Arc<MemoryLocalStorage>) {
        let storage = Arc::new(MemoryLocalStorage::new());
        (MarkEditor::new(storage.clone(), SvgSurface::new()), storage)
    }

    #[test]
    fn test_click_near_mark_removes_it() {
        let (mut editor, _) = editor();

        assert_eq!(
            editor.toggle_mark_at(50.0, 50.0).unwrap(),
            Toggle::Added(Mark::new(50.0, 50.0))
        );
        assert_eq!(editor.marks(), &[Mark::new(50.0, 50.0)]);

        // distance ~2.2
        assert_eq!(
            editor.toggle_mark_at(52.0, 51.0).unwrap(),
            Toggle::Removed(Mark::new(50.0, 50.0))
        );
        assert!(editor.marks().is_empty());
    }

    #[test]
    fn test_repeated_clicks_alternate() {
        let (mut editor, _) = editor();

        for i in 0..6 {
            editor.toggle_mark_at(120.5, 80.25).unwrap();
            assert_eq!(editor.marks().len(), if i % 2 == 0 { 1 } else { 0 });
        }
    }

    #[test]
    fn test_radius_boundary_is_exclusive() {
        let (mut editor, _) = editor();
        editor.toggle_mark_at(0.0, 0.0).unwrap();

        // exactly MARK_RADIUS away counts as a miss
        assert!(matches!(editor.toggle_mark_at(18.0, 0.0).unwrap(), Toggle::Added(_)));
        assert_eq!(editor.marks().len(), 2);

        // 17.999 from the first mark and 0.001 from the second: first in order wins
        assert_eq!(
            editor.toggle_mark_at(17.999, 0.0).unwrap(),
            Toggle::Removed(Mark::new(0.0, 0.0))
        );
        assert_eq!(editor.marks(), &[Mark::new(18.0, 0.0)]);
    }

    #[test]
    fn test_overlapping_marks_remove_one_at_a_time() {
        let (mut editor, _) = editor();
        editor.toggle_mark_at(10.0, 10.0).unwrap();
        editor.toggle_mark_at(40.0, 10.0).unwrap();

        // within radius of both, removes the earlier one only
        editor.toggle_mark_at(25.0, 10.0).unwrap();
        assert_eq!(editor.marks(), &[Mark::new(40.0, 10.0)]);
    }

    #[test]
    fn test_redraw_draws_ring_then_cross_per_mark() {
        let (mut editor, _) = editor();
        editor.toggle_mark_at(30.0, 30.0).unwrap();
        editor.toggle_mark_at(100.0, 30.0).unwrap();

        let shapes = editor.surface().shapes();
        assert_eq!(shapes.len(), 4);
        match &shapes[0] {
            Shape::Circle {
                center,
                radius,
                stroke,
            } => {
                assert_eq!(*center, Point::new(30.0, 30.0));
                assert_eq!(*radius, MARK_RADIUS);
                assert_eq!(stroke.width, 4.0);
            }
            other => panic!("expected ring, got {:?}", other),
        }
        match &shapes[1] {
            Shape::Segments { segments, stroke } => {
                assert_eq!(stroke.width, 3.0);
                assert_eq!(segments[0].0, Point::new(18.0, 18.0));
                assert_eq!(segments[0].1, Point::new(42.0, 42.0));
                assert_eq!(segments[1].0, Point::new(42.0, 18.0));
            }
            other => panic!("expected cross, got {:?}", other),
        }
        assert!(matches!(&shapes[2], Shape::Circle { center, .. } if center.x == 100.0));
    }

    #[test]
    fn test_click_ignored_until_ticket_decoded() {
        let (mut editor, _) = editor();
        assert_eq!(editor.click(5.0, 5.0), None);
        assert!(editor.marks().is_empty());
    }

    #[tokio::test]
    async fn test_persist_then_restore_round_trip() {
        let (mut editor, storage) = editor();
        editor.toggle_mark_at(12.5, 40.0).unwrap();
        editor.toggle_mark_at(300.0, 41.75).unwrap();
        editor.toggle_mark_at(90.0, 200.0).unwrap();
        assert_eq!(editor.persist().await.unwrap(), 3);

        let mut fresh = MarkEditor::new(storage, SvgSurface::new());
        assert!(fresh.restore().await.unwrap());
        assert_eq!(fresh.marks(), editor.marks());
        assert_eq!(fresh.surface().shapes().len(), 6);
    }

    #[tokio::test]
    async fn test_restore_without_saved_marks_keeps_list() {
        let (mut editor, _) = editor();
        editor.toggle_mark_at(1.0, 1.0).unwrap();

        assert!(!editor.restore().await.unwrap());
        assert_eq!(editor.marks().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_saved_marks_surface_error() {
        let (mut editor, storage) = editor();
        editor.toggle_mark_at(1.0, 1.0).unwrap();
        storage
            .set_item(MARKS_STORAGE_KEY, "{not json")
            .await
            .unwrap();

        let result = editor.restore().await;
        assert!(matches!(result, Err(TambolaError::StorageRead(_))));
        assert_eq!(editor.marks(), &[Mark::new(1.0, 1.0)]);
        assert_eq!(
            storage.get_item(MARKS_STORAGE_KEY).await.unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[tokio::test]
    async fn test_restore_accepts_integer_coordinates() {
        let (mut editor, storage) = editor();
        storage
            .set_item(MARKS_STORAGE_KEY, r#"[{"x":50,"y":60}]"#)
            .await
            .unwrap();

        editor.restore().await.unwrap();
        assert_eq!(editor.marks(), &[Mark::new(50.0, 60.0)]);
    }

    #[tokio::test]
    async fn test_load_image_resets_marks_and_sizes_surface() {
        let (mut editor, storage) = editor();
        editor.toggle_mark_at(5.0, 5.0).unwrap();
        editor.persist().await.unwrap();

        let ticket = editor.load_image(ticket_png(64, 32)).await.unwrap();
        assert_eq!((ticket.width(), ticket.height()), (64, 32));
        assert_eq!(ticket.mime_type(), "image/png");

        assert!(editor.marks().is_empty());
        assert_eq!(storage.get_item(MARKS_STORAGE_KEY).await.unwrap(), None);
        assert_eq!(editor.surface().size(), (64, 32));
        assert!(editor.surface().pointer_enabled());
        assert!(editor.surface().to_svg().contains("data:image/png;base64,"));

        assert!(matches!(editor.click(10.0, 10.0), Some(Toggle::Added(_))));
    }

    #[tokio::test]
    async fn test_open_image_restores_saved_marks() {
        let (mut editor, storage) = editor();
        editor.toggle_mark_at(20.0, 20.0).unwrap();
        editor.persist().await.unwrap();

        let mut reopened = MarkEditor::new(storage, SvgSurface::new());
        reopened.open_image(ticket_png(40, 40)).await.unwrap();
        assert_eq!(reopened.marks(), &[Mark::new(20.0, 20.0)]);
        assert_eq!(reopened.surface().shapes().len(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_image_keeps_pointer_disabled() {
        let (mut editor, _) = editor();

        let result = editor.load_image(b"not an image".to_vec()).await;
        assert!(matches!(result, Err(TambolaError::Image(_))));
        assert!(!editor.pointer_enabled());
        assert_eq!(editor.click(1.0, 1.0), None);
    }

    #[tokio::test]
    async fn test_non_finite_position_is_rejected() {
        let (mut editor, storage) = editor();
        editor.toggle_mark_at(10.0, 10.0).unwrap();

        for (x, y) in [(f64::NAN, 10.0), (f64::INFINITY, 10.0), (10.0, f64::NEG_INFINITY)] {
            let result = editor.toggle_mark_at(x, y);
            assert!(matches!(result, Err(TambolaError::InvalidPoint { .. })));
        }
        assert_eq!(editor.marks(), &[Mark::new(10.0, 10.0)]);

        editor.persist().await.unwrap();
        let mut reopened = MarkEditor::new(storage, SvgSurface::new());
        assert!(reopened.restore().await.unwrap());
        assert_eq!(reopened.marks(), &[Mark::new(10.0, 10.0)]);
    }

    #[tokio::test]
    async fn test_click_ignores_non_finite_position() {
        let (mut editor, _) = editor();
        editor.open_image(ticket_png(20, 20)).await.unwrap();

        assert_eq!(editor.click(f64::NAN, 10.0), None);
        assert_eq!(editor.click(f64::NAN, 10.0), None);
        assert!(editor.marks().is_empty());
        assert!(editor.surface().shapes().is_empty());
    }
}
