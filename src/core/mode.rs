use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What the processing stage does with a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingMode {
    Raw,
    Edges,
}

impl ProcessingMode {
    pub fn from_edges(edges: bool) -> Self {
        if edges {
            Self::Edges
        } else {
            Self::Raw
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Raw => "Raw",
            Self::Edges => "Edges",
        }
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Process-wide edges on/off switch
///
/// Cloning shares the same flag. Only the input path writes it; the capture
/// thread reads one snapshot per frame.
#[derive(Debug, Clone)]
pub struct ModeFlag {
    edges: Arc<AtomicBool>,
}

impl ModeFlag {
    pub fn new(mode: ProcessingMode) -> Self {
        Self {
            edges: Arc::new(AtomicBool::new(mode == ProcessingMode::Edges)),
        }
    }

    pub fn snapshot(&self) -> ProcessingMode {
        ProcessingMode::from_edges(self.edges.load(Ordering::Acquire))
    }

    pub fn set(&self, mode: ProcessingMode) {
        self.edges.store(mode == ProcessingMode::Edges, Ordering::Release);
    }

    /// Flip the flag, returning the new mode
    pub fn toggle(&self) -> ProcessingMode {
        let was_edges = self.edges.fetch_xor(true, Ordering::AcqRel);
        ProcessingMode::from_edges(!was_edges)
    }
}

impl Default for ModeFlag {
    fn default() -> Self {
        Self::new(ProcessingMode::Edges)
    }
}
