//! Snapshot-based undo/redo for the drawing surface.
//!
//! The log is linear: recording a new state while a redo branch exists
//! truncates everything after the cursor. Each entry is a whole-document
//! snapshot, so any entry can be restored on its own.

use crate::shapes::ShapeId;
use crate::shapes::ShapeTrait;
use crate::surface::{Surface, SurfaceDocument};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// History errors.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to capture canvas state: {0}")]
    Capture(#[source] serde_json::Error),
    #[error("History entry {index} is corrupt: {source}")]
    CorruptSnapshot {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for history operations.
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Serialized whole-document state at one instant. Immutable and cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(Arc<str>);

impl Snapshot {
    /// Serialize the surface's current document.
    pub fn capture(surface: &Surface) -> HistoryResult<Self> {
        surface
            .to_json()
            .map(|json| Self(json.into()))
            .map_err(HistoryError::Capture)
    }

    /// Wrap already-serialized document JSON.
    pub fn from_json(json: impl Into<Arc<str>>) -> Self {
        Self(json.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the snapshot back into a document.
    pub fn document(&self) -> Result<SurfaceDocument, serde_json::Error> {
        SurfaceDocument::from_json(&self.0)
    }
}

/// Whether a snapshot is currently being written back into the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayState {
    #[default]
    Idle,
    Replaying,
}

/// Which way a replay moved the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayDirection {
    Undo,
    Redo,
}

/// Result of a successful undo or redo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayOutcome {
    pub direction: ReplayDirection,
    /// Cursor after the replay.
    pub cursor: usize,
    /// Background reference after the replay.
    pub background: Option<ShapeId>,
}

/// History tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of snapshots kept (oldest dropped first). `None` = unbounded.
    pub max_entries: Option<usize>,
}

/// Owns the snapshot log, the cursor and the background reference.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    log: Vec<Snapshot>,
    cursor: usize,
    state: ReplayState,
    background: Option<ShapeId>,
    config: HistoryConfig,
}

impl HistoryManager {
    /// Create a history seeded with one snapshot.
    pub fn new(initial: Snapshot) -> Self {
        Self::with_config(initial, HistoryConfig::default())
    }

    pub fn with_config(initial: Snapshot, config: HistoryConfig) -> Self {
        Self {
            log: vec![initial],
            cursor: 0,
            state: ReplayState::Idle,
            background: None,
            config,
        }
    }

    /// Create a history seeded with the surface's current state.
    pub fn from_surface(surface: &Surface, config: HistoryConfig) -> HistoryResult<Self> {
        Ok(Self::with_config(Snapshot::capture(surface)?, config))
    }

    /// Drain the surface's structural events and record the resulting state.
    ///
    /// This is the surface's mutation listener. Everything drained together
    /// is one history step, so a batch of events appends a single snapshot.
    /// Returns whether a snapshot was appended; events drained during a
    /// replay are swallowed.
    pub fn observe(&mut self, surface: &mut Surface) -> HistoryResult<bool> {
        let events = surface.take_events();
        if events.is_empty() {
            return Ok(false);
        }
        if !self.record_if_not_replaying(surface)? {
            log::debug!("Swallowed {} events during replay", events.len());
            return Ok(false);
        }
        log::debug!(
            "Recorded {:?} at history position {}",
            events,
            self.cursor
        );
        Ok(true)
    }

    /// Append the surface's current state, truncating any redo branch.
    ///
    /// No-op while replaying. Returns whether a snapshot was appended.
    pub fn record_if_not_replaying(&mut self, surface: &Surface) -> HistoryResult<bool> {
        if self.state == ReplayState::Replaying {
            return Ok(false);
        }
        let snapshot = Snapshot::capture(surface)?;
        self.push(snapshot);
        Ok(true)
    }

    fn push(&mut self, snapshot: Snapshot) {
        self.log.truncate(self.cursor + 1);
        self.log.push(snapshot);
        self.cursor = self.log.len() - 1;

        if let Some(max) = self.config.max_entries {
            let max = max.max(1);
            if self.log.len() > max {
                let excess = self.log.len() - max;
                self.log.drain(..excess);
                self.cursor -= excess;
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.log.len()
    }

    /// Restore the previous snapshot. `Ok(None)` when there is nothing to undo.
    ///
    /// Mutations not yet observed are recorded first.
    pub fn undo(&mut self, surface: &mut Surface) -> HistoryResult<Option<ReplayOutcome>> {
        self.observe(surface)?;
        if !self.can_undo() {
            return Ok(None);
        }
        self.replay(surface, self.cursor - 1, ReplayDirection::Undo)
            .map(Some)
    }

    /// Restore the next snapshot. `Ok(None)` when there is nothing to redo.
    ///
    /// Mutations not yet observed are recorded first, which drops the redo branch.
    pub fn redo(&mut self, surface: &mut Surface) -> HistoryResult<Option<ReplayOutcome>> {
        self.observe(surface)?;
        if !self.can_redo() {
            return Ok(None);
        }
        self.replay(surface, self.cursor + 1, ReplayDirection::Redo)
            .map(Some)
    }

    fn replay(
        &mut self,
        surface: &mut Surface,
        target: usize,
        direction: ReplayDirection,
    ) -> HistoryResult<ReplayOutcome> {
        let snapshot = self.log[target].clone();

        self.state = ReplayState::Replaying;
        let loaded = surface.load_json(snapshot.as_str());
        // The load's own add/remove events must not re-enter the log.
        let drained = self.observe(surface);
        self.state = ReplayState::Idle;

        loaded.map_err(|source| HistoryError::CorruptSnapshot {
            index: target,
            source,
        })?;
        drained?;

        self.cursor = target;
        self.background = resolve_background(surface, self.background);
        surface.request_render();
        log::debug!(
            "{:?} restored history position {} of {}",
            direction,
            self.cursor,
            self.log.len()
        );

        Ok(ReplayOutcome {
            direction,
            cursor: self.cursor,
            background: self.background,
        })
    }

    /// Discard the whole log and start over from one snapshot.
    pub fn reset_with(&mut self, initial: Snapshot) {
        self.log.clear();
        self.log.push(initial);
        self.cursor = 0;
        self.state = ReplayState::Idle;
        self.background = None;
    }

    /// Declare which object is the background image.
    pub fn adopt_background(&mut self, id: ShapeId) {
        self.background = Some(id);
    }

    /// The protected background object, if any. May be stale.
    pub fn background(&self) -> Option<ShapeId> {
        self.background
    }

    pub fn is_background(&self, id: ShapeId) -> bool {
        self.background == Some(id)
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Snapshot at the cursor.
    pub fn current(&self) -> &Snapshot {
        &self.log[self.cursor]
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.log
    }
}

/// Keep the known background id if the restored objects still contain it as
/// an image; otherwise fall back to the first image. With no image at all the
/// previous reference is kept as-is.
fn resolve_background(surface: &Surface, current: Option<ShapeId>) -> Option<ShapeId> {
    if let Some(id) = current {
        if surface.get(id).is_some_and(|s| s.is_image()) {
            return Some(id);
        }
    }
    match surface.first_image() {
        Some(image) => Some(image.id()),
        None => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Image, ImageFormat, Rectangle, Shape, Text};
    use kurbo::Point;

    fn text(content: &str) -> Shape {
        Shape::Text(Text::new(Point::new(100.0, 100.0), content.to_string()))
    }

    fn setup() -> (Surface, HistoryManager) {
        let surface = Surface::default();
        let history = HistoryManager::from_surface(&surface, HistoryConfig::default()).unwrap();
        (surface, history)
    }

    #[test]
    fn test_seeded_with_one_snapshot() {
        let (_, history) = setup();
        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), 0);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_records_each_event() {
        let (mut surface, mut history) = setup();
        for i in 0..5 {
            surface.add(text(&i.to_string()));
            assert!(history.observe(&mut surface).unwrap());
        }
        assert_eq!(history.len(), 6);
        assert_eq!(history.cursor(), 5);
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let (mut surface, mut history) = setup();
        surface.add(text("a"));
        history.observe(&mut surface).unwrap();
        let before = surface.to_json().unwrap();

        history.undo(&mut surface).unwrap();
        assert!(surface.is_empty());
        history.redo(&mut surface).unwrap();
        assert_eq!(surface.to_json().unwrap(), before);
    }

    #[test]
    fn test_observe_without_events_records_nothing() {
        let (mut surface, mut history) = setup();
        assert!(!history.observe(&mut surface).unwrap());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_batch_is_one_step() {
        let (mut surface, mut history) = setup();
        surface.add(text("a"));
        surface.add(text("b"));
        assert!(history.observe(&mut surface).unwrap());
        assert_eq!(history.len(), 2);
        assert_ne!(history.snapshots()[0], history.snapshots()[1]);

        history.undo(&mut surface).unwrap();
        assert!(surface.is_empty());
    }

    #[test]
    fn test_consecutive_entries_differ() {
        let (mut surface, mut history) = setup();
        surface.add(text("a"));
        surface.add(text("b"));
        history.observe(&mut surface).unwrap();
        surface.add(text("c"));
        history.observe(&mut surface).unwrap();

        for pair in history.snapshots().windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_replay_does_not_record() {
        let (mut surface, mut history) = setup();
        surface.add(text("a"));
        surface.add(text("b"));
        history.observe(&mut surface).unwrap();
        assert_eq!(history.len(), 2);

        history.undo(&mut surface).unwrap();
        assert_eq!(history.len(), 2);
        assert!(!surface.has_pending_events());
        assert_eq!(history.state(), ReplayState::Idle);
    }

    #[test]
    fn test_undo_records_pending_mutation_first() {
        let (mut surface, mut history) = setup();
        surface.add(text("a"));
        history.observe(&mut surface).unwrap();
        let after_a = surface.to_json().unwrap();

        // Not observed yet.
        surface.add(text("b"));
        let outcome = history.undo(&mut surface).unwrap().unwrap();
        assert_eq!(outcome.cursor, 1);
        assert_eq!(history.len(), 3);
        assert_eq!(surface.to_json().unwrap(), after_a);

        history.redo(&mut surface).unwrap();
        assert_eq!(surface.len(), 2);
    }

    #[test]
    fn test_redo_after_pending_mutation_is_noop() {
        let (mut surface, mut history) = setup();
        surface.add(text("a"));
        history.observe(&mut surface).unwrap();
        history.undo(&mut surface).unwrap();
        assert!(history.can_redo());

        surface.add(text("b"));
        assert!(history.redo(&mut surface).unwrap().is_none());
        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), 1);
        assert_eq!(surface.len(), 1);
    }

    #[test]
    fn test_record_while_replaying_is_noop() {
        let (surface, mut history) = setup();
        history.state = ReplayState::Replaying;
        assert!(!history.record_if_not_replaying(&surface).unwrap());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_undo_at_start_is_noop() {
        let (mut surface, mut history) = setup();
        assert!(history.undo(&mut surface).unwrap().is_none());
        assert_eq!(history.cursor(), 0);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_redo_at_end_is_noop() {
        let (mut surface, mut history) = setup();
        surface.add(text("a"));
        history.observe(&mut surface).unwrap();
        assert!(history.redo(&mut surface).unwrap().is_none());
        assert_eq!(history.cursor(), 1);
    }

    #[test]
    fn test_corrupt_snapshot_leaves_state() {
        let (mut surface, mut history) = setup();
        surface.add(text("a"));
        history.observe(&mut surface).unwrap();
        history.log[0] = Snapshot::from_json("not json");
        let before = surface.to_json().unwrap();

        let err = history.undo(&mut surface).unwrap_err();
        assert!(matches!(err, HistoryError::CorruptSnapshot { index: 0, .. }));
        assert_eq!(history.cursor(), 1);
        assert_eq!(history.len(), 2);
        assert_eq!(history.state(), ReplayState::Idle);
        assert_eq!(surface.to_json().unwrap(), before);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut surface = Surface::default();
        let mut history = HistoryManager::from_surface(
            &surface,
            HistoryConfig {
                max_entries: Some(3),
            },
        )
        .unwrap();
        for i in 0..5 {
            surface.add(text(&i.to_string()));
            history.observe(&mut surface).unwrap();
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), 2);
        assert_eq!(history.current(), &Snapshot::capture(&surface).unwrap());
    }

    #[test]
    fn test_background_follows_stable_id() {
        let (mut surface, mut history) = setup();
        let sticker = Image::new(Point::ZERO, &[1, 2, 3], 4, 4, ImageFormat::Png);
        let base = Image::new(Point::ZERO, &[4, 5, 6], 8, 8, ImageFormat::Png);
        let base_id = base.id();
        // Sticker sits below the base image in z-order.
        surface.add(Shape::Image(sticker));
        surface.add(Shape::Image(base));
        history.observe(&mut surface).unwrap();
        history.adopt_background(base_id);
        surface.add(Shape::Rectangle(Rectangle::new(Point::ZERO, 1.0, 1.0)));
        history.observe(&mut surface).unwrap();

        let outcome = history.undo(&mut surface).unwrap().unwrap();
        assert_eq!(outcome.background, Some(base_id));
    }

    #[test]
    fn test_background_falls_back_to_first_image() {
        let (mut surface, mut history) = setup();
        let image = Image::new(Point::ZERO, &[1], 2, 2, ImageFormat::Png);
        let image_id = image.id();
        surface.add(Shape::Image(image));
        history.observe(&mut surface).unwrap();
        surface.add(text("a"));
        history.observe(&mut surface).unwrap();

        let outcome = history.undo(&mut surface).unwrap().unwrap();
        assert_eq!(outcome.background, Some(image_id));
    }

    #[test]
    fn test_background_left_stale_without_images() {
        let (mut surface, mut history) = setup();
        let stale = uuid::Uuid::new_v4();
        history.adopt_background(stale);
        surface.add(text("a"));
        history.observe(&mut surface).unwrap();

        history.undo(&mut surface).unwrap();
        assert_eq!(history.background(), Some(stale));
    }

    #[test]
    fn test_reset_with() {
        let (mut surface, mut history) = setup();
        surface.add(text("a"));
        surface.add(text("b"));
        history.observe(&mut surface).unwrap();
        history.adopt_background(uuid::Uuid::new_v4());

        history.reset_with(Snapshot::capture(&surface).unwrap());
        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), 0);
        assert_eq!(history.background(), None);
    }
}
