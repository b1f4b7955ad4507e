use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

pub const MIN_ZOOM: f64 = 0.2;
pub const MAX_ZOOM: f64 = 3.0;
pub const ZOOM_STEP: f64 = 0.1;

const BASE_CANVAS: f64 = 800.0;
const BASE_FONT: f64 = 18.0;
const MIN_FONT: u32 = 10;
const MAX_FONT: u32 = 26;

/// Per-session render state threaded into the chart renderer
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderContext {
    pub zoom: f64,
}

impl Default for RenderContext {
    fn default() -> Self {
        RenderContext { zoom: 1.0 }
    }
}

impl RenderContext {
    pub fn with_zoom(zoom: f64) -> Self {
        RenderContext {
            zoom: clamp_zoom(zoom),
        }
    }

    pub fn zoom_in(&mut self) {
        self.zoom = clamp_zoom(self.zoom + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = clamp_zoom(self.zoom - ZOOM_STEP);
    }

    /// Square canvas side in pixels
    pub fn canvas_size(&self) -> u32 {
        (BASE_CANVAS * self.zoom) as u32
    }

    pub fn font_size(&self) -> u32 {
        ((BASE_FONT * self.zoom) as u32).clamp(MIN_FONT, MAX_FONT)
    }

    /// Zoom as a whole percentage for display
    pub fn percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }
}

// Rounded to one decimal so repeated steps do not drift
fn clamp_zoom(zoom: f64) -> f64 {
    let zoom = if zoom.is_finite() { zoom } else { 1.0 };
    ((zoom * 10.0).round() / 10.0).clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Sessions kept before the least recently used one is dropped
pub const MAX_SESSIONS: usize = 10_000;

#[derive(Default)]
struct Sessions {
    contexts: HashMap<String, (RenderContext, u64)>,
    clock: u64,
}

/// Render contexts keyed by session cookie
///
/// Holds at most `capacity` sessions; adding one more evicts the session
/// whose zoom changed least recently.
pub struct SessionStore {
    sessions: RwLock<Sessions>,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_capacity(MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        SessionStore {
            sessions: RwLock::new(Sessions::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .map(|sessions| sessions.contexts.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn context(&self, session_id: &str) -> RenderContext {
        self.sessions
            .read()
            .ok()
            .and_then(|sessions| sessions.contexts.get(session_id).map(|(context, _)| *context))
            .unwrap_or_default()
    }

    /// Applies `change` to the session's context and returns the result
    pub fn update<F>(&self, session_id: &str, change: F) -> RenderContext
    where
        F: FnOnce(&mut RenderContext),
    {
        let Ok(mut guard) = self.sessions.write() else {
            let mut context = RenderContext::default();
            change(&mut context);
            return context;
        };
        let sessions = &mut *guard;

        if !sessions.contexts.contains_key(session_id) && sessions.contexts.len() >= self.capacity {
            let oldest = sessions
                .contexts
                .iter()
                .min_by_key(|(_, (_, used))| *used)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                sessions.contexts.remove(&oldest);
            }
        }

        sessions.clock += 1;
        let clock = sessions.clock;
        let entry = sessions
            .contexts
            .entry(session_id.to_string())
            .or_insert_with(|| (RenderContext::default(), clock));
        change(&mut entry.0);
        entry.1 = clock;
        entry.0
    }
}
