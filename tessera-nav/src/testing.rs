//! In-memory native surface for tests and headless runs.
//!
//! [`RecordingSurface`] applies every call to a plain vector and keeps a log
//! of the calls, so tests can assert exactly what the bridge asked of the
//! platform. [`RecordingSurface::simulate_back_gesture`] pops a screen the way
//! a platform back gesture would, without going through the bridge.

use crate::{
    bridge::{NativeScreen, NativeSurface, ScreenId},
    chrome::ChromeSnapshot,
};

/// One call received by a [`RecordingSurface`].
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceCall {
    /// `push_screen`.
    Push {
        /// Pushed screen.
        id: ScreenId,
        /// Its route title.
        title: String,
        /// Animation flag.
        animated: bool,
    },
    /// `pop_to_screen`.
    PopTo {
        /// Target screen.
        id: ScreenId,
        /// Animation flag.
        animated: bool,
    },
    /// `clear_stack`.
    Clear,
    /// `replace_stack`.
    Replace {
        /// Number of bottom screens kept.
        retained: usize,
        /// Screens stacked above them.
        ids: Vec<ScreenId>,
        /// Animation flag.
        animated: bool,
    },
    /// `apply_chrome`.
    Chrome(ChromeSnapshot),
}

/// A native surface backed by a vector.
#[derive(Debug)]
pub struct RecordingSurface<S> {
    screens: Vec<NativeScreen<S>>,
    calls: Vec<SurfaceCall>,
}

impl<S> Default for RecordingSurface<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> RecordingSurface<S> {
    /// Create an empty surface.
    pub fn new() -> Self {
        Self {
            screens: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// Calls received so far.
    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    /// Drain the call log.
    pub fn take_calls(&mut self) -> Vec<SurfaceCall> {
        std::mem::take(&mut self.calls)
    }

    /// Screens currently on the surface, bottom first.
    pub fn screens(&self) -> &[NativeScreen<S>] {
        &self.screens
    }

    /// Ids currently on the surface, bottom first.
    pub fn screen_ids(&self) -> Vec<ScreenId> {
        self.screens.iter().map(|screen| screen.id).collect()
    }

    /// Titles currently on the surface, bottom first.
    pub fn titles(&self) -> Vec<&str> {
        self.screens
            .iter()
            .map(|screen| screen.title.as_str())
            .collect()
    }

    /// Last chrome handed to [`NativeSurface::apply_chrome`].
    pub fn painted_chrome(&self) -> Option<&ChromeSnapshot> {
        self.calls.iter().rev().find_map(|call| match call {
            SurfaceCall::Chrome(chrome) => Some(chrome),
            _ => None,
        })
    }

    /// Pop the top screen as a platform back gesture would.
    ///
    /// Returns the id of the newly visible screen, or `None` when fewer than
    /// two screens are present (the root cannot be swiped away). The pop is
    /// not recorded as a call.
    pub fn simulate_back_gesture(&mut self) -> Option<ScreenId> {
        if self.screens.len() < 2 {
            return None;
        }
        self.screens.pop();
        self.screens.last().map(|screen| screen.id)
    }
}

impl<S> NativeSurface for RecordingSurface<S> {
    type Screen = S;

    fn push_screen(&mut self, screen: NativeScreen<S>, animated: bool) {
        self.calls.push(SurfaceCall::Push {
            id: screen.id,
            title: screen.title.clone(),
            animated,
        });
        self.screens.push(screen);
    }

    fn pop_to_screen(&mut self, id: ScreenId, animated: bool) {
        self.calls.push(SurfaceCall::PopTo { id, animated });
        if let Some(index) = self.screens.iter().position(|screen| screen.id == id) {
            self.screens.truncate(index + 1);
        }
    }

    fn clear_stack(&mut self) {
        self.calls.push(SurfaceCall::Clear);
        self.screens.clear();
    }

    fn replace_stack(&mut self, retained: usize, screens: Vec<NativeScreen<S>>, animated: bool) {
        self.calls.push(SurfaceCall::Replace {
            retained,
            ids: screens.iter().map(|screen| screen.id).collect(),
            animated,
        });
        self.screens.truncate(retained);
        self.screens.extend(screens);
    }

    fn depth(&self) -> usize {
        self.screens.len()
    }

    fn apply_chrome(&mut self, chrome: &ChromeSnapshot) {
        self.calls.push(SurfaceCall::Chrome(chrome.clone()));
    }
}
