//! Shared fixtures for unit tests: a canvas and artists that record what
//! happens to them, and a messenger counting redraw requests.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ortelius_types::cartesian::Size;

use crate::error::OrteliusError;
use crate::messenger::Messenger;
use crate::render::{Artist, Canvas, Snapshot};
use crate::view::MapView;

pub type OpLog = Rc<RefCell<Vec<String>>>;

/// Takes the accumulated operations out of the log.
pub fn drain_log(log: &OpLog) -> Vec<String> {
    log.borrow_mut().drain(..).collect()
}

/// Counts operations equal to `name`.
pub fn ops_named(ops: &[String], name: &str) -> usize {
    ops.iter().filter(|op| op.as_str() == name).count()
}

/// Counts operations starting with `prefix`.
pub fn ops_with_prefix(ops: &[String], prefix: &str) -> usize {
    ops.iter().filter(|op| op.starts_with(prefix)).count()
}

pub struct TestCanvas {
    log: OpLog,
    size: Size,
    dpi_scale: f32,
    next_snapshot: usize,
}

impl TestCanvas {
    pub fn new(log: OpLog, size: Size) -> Self {
        Self {
            log,
            size,
            dpi_scale: 1.0,
            next_snapshot: 0,
        }
    }

    pub fn set_dpi_scale(&mut self, dpi_scale: f32) {
        self.dpi_scale = dpi_scale;
    }
}

impl Canvas for TestCanvas {
    fn size(&self) -> Size {
        self.size
    }

    fn dpi_scale(&self) -> f32 {
        self.dpi_scale
    }

    fn clear(&mut self) {
        self.log.borrow_mut().push("clear".to_string());
    }

    fn capture(&mut self) -> Snapshot {
        let id = self.next_snapshot;
        self.next_snapshot += 1;
        self.log.borrow_mut().push(format!("capture:{id}"));
        Snapshot::new(id)
    }

    fn restore(&mut self, snapshot: &Snapshot, opacity: f32) {
        let id = snapshot
            .as_any()
            .downcast_ref::<usize>()
            .copied()
            .unwrap_or(usize::MAX);
        self.log.borrow_mut().push(format!("restore:{id}@{opacity}"));
    }
}

pub struct TestArtist {
    name: String,
    log: OpLog,
}

impl TestArtist {
    pub fn new(name: impl Into<String>, log: OpLog) -> Self {
        Self {
            name: name.into(),
            log,
        }
    }
}

impl Artist for TestArtist {
    fn draw(&self, _view: &MapView, _canvas: &mut dyn Canvas) -> Result<(), OrteliusError> {
        self.log.borrow_mut().push(format!("draw:{}", self.name));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Artist whose draw always fails. Used to check that one broken artist
/// does not abort the redraw cycle.
pub struct BrokenArtist;

impl Artist for BrokenArtist {
    fn draw(&self, _view: &MapView, _canvas: &mut dyn Canvas) -> Result<(), OrteliusError> {
        Err(OrteliusError::Generic("broken artist".to_string()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Default)]
pub struct RecordingMessenger {
    redraws: Rc<Cell<usize>>,
}

impl RecordingMessenger {
    pub fn counter(&self) -> Rc<Cell<usize>> {
        self.redraws.clone()
    }
}

impl Messenger for RecordingMessenger {
    fn request_redraw(&self) {
        self.redraws.set(self.redraws.get() + 1);
    }
}
