//! Two-way synchronization between the [`RouteStack`] and a native surface.
//!
//! The bridge keeps a mirror of the screens it has handed to the platform, in
//! stack order, one per route. Programmatic changes flow stack → mirror →
//! native calls. Platform-driven pops (back gesture, system back button) are
//! detected when the platform reports a finished transition with a native
//! depth smaller than the stack; they flow native → mirror → stack without
//! any native call being issued.
//!
//! # Loop suppression
//!
//! Each direction runs inside a [`BridgeState`] other than `Idle`, and a
//! transition signal is only interpreted while `Idle`. Because the mirror and
//! the stack are updated in the same step as the native call, a transition
//! finishing after a bridge-initiated change always sees matching depths and
//! is never mistaken for a system pop.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use tracing::{debug, warn};

use crate::{
    chrome::ChromeSnapshot,
    error::NavError,
    log::SharedLogSink,
    ownership::ChromeContext,
    route_stack::{Route, RouteStack, StackChange},
    screen::{MountedChrome, Screen},
};

static NEXT_SCREEN_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one mounted native screen.
///
/// Allocated per mount, so a route pushed twice yields two ids.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ScreenId(u64);

impl ScreenId {
    fn new() -> Self {
        Self(NEXT_SCREEN_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, for platform bookkeeping.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "screen#{}", self.0)
    }
}

/// A screen handed to the platform.
#[derive(Clone, Debug)]
pub struct NativeScreen<S> {
    /// Identity used by later `pop_to_screen` calls and transition signals.
    pub id: ScreenId,
    /// Route title, typically shown as the back-button label of the next
    /// screen.
    pub title: String,
    /// Rendered content.
    pub content: S,
}

/// What a platform navigation controller must provide.
///
/// Implementations wrap the platform widget and forward its "did finish
/// showing" notifications to
/// [`NavEngine::did_finish_showing`](crate::NavEngine::did_finish_showing).
pub trait NativeSurface {
    /// Platform-specific renderable produced by the screen factory.
    type Screen;

    /// Push a screen on top.
    fn push_screen(&mut self, screen: NativeScreen<Self::Screen>, animated: bool);

    /// Pop until `id` is the top screen.
    fn pop_to_screen(&mut self, id: ScreenId, animated: bool);

    /// Remove every screen.
    fn clear_stack(&mut self);

    /// Keep the bottom `retained` screens and stack `screens` above them.
    fn replace_stack(
        &mut self,
        retained: usize,
        screens: Vec<NativeScreen<Self::Screen>>,
        animated: bool,
    );

    /// Number of screens the platform currently holds.
    ///
    /// Must already reflect every call issued so far, even while an animated
    /// transition is still running.
    fn depth(&self) -> usize;

    /// Repaint the bar from the shared chrome.
    fn apply_chrome(&mut self, _chrome: &ChromeSnapshot) {}
}

/// Which direction of change the bridge is applying.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BridgeState {
    /// Waiting for either side to change.
    #[default]
    Idle,
    /// Replaying a route-stack change onto the native surface.
    ApplyingProgrammaticChange,
    /// Replaying a platform-driven pop onto the route stack.
    ApplyingSystemChange,
}

/// How a pop of `count` screens resolves against the mirror.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum PopPlan {
    Clear,
    PopTo(ScreenId),
}

/// Application-supplied screen factory.
pub type ScreenFactory<T, S> = Box<dyn Fn(&T) -> Screen<S>>;

struct MountedScreen {
    id: ScreenId,
    chrome: MountedChrome,
}

/// Adapter between a [`RouteStack`] and a [`NativeSurface`].
pub struct SyncBridge<T, N: NativeSurface> {
    surface: N,
    factory: ScreenFactory<T, N::Screen>,
    mirror: Vec<MountedScreen>,
    state: BridgeState,
    context: ChromeContext,
    sink: SharedLogSink,
}

impl<T, N: NativeSurface> SyncBridge<T, N> {
    /// Create a bridge with an empty mirror.
    pub fn new(
        surface: N,
        factory: ScreenFactory<T, N::Screen>,
        context: ChromeContext,
        sink: SharedLogSink,
    ) -> Self {
        Self {
            surface,
            factory,
            mirror: Vec::new(),
            state: BridgeState::Idle,
            context,
            sink,
        }
    }

    /// Current state.
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// The wrapped surface.
    pub fn surface(&self) -> &N {
        &self.surface
    }

    /// The wrapped surface, mutably.
    pub fn surface_mut(&mut self) -> &mut N {
        &mut self.surface
    }

    /// Ids of the mirrored native screens, bottom first.
    pub fn screen_ids(&self) -> Vec<ScreenId> {
        self.mirror.iter().map(|screen| screen.id).collect()
    }

    /// Id of the visible screen.
    pub fn top_screen(&self) -> Option<ScreenId> {
        self.mirror.last().map(|screen| screen.id)
    }

    /// Replay `routes` onto an empty surface as successive pushes.
    pub fn mount(&mut self, routes: &[Route<T>], animated: bool) {
        self.with_state(BridgeState::ApplyingProgrammaticChange, |bridge| {
            for route in routes {
                let screen = bridge.mount_screen(route);
                bridge.surface.push_screen(screen, animated);
            }
            bridge.reveal_top();
        });
    }

    /// Resolve a pop of `count` screens without touching anything.
    pub(crate) fn plan_pop(&self, count: usize) -> Result<PopPlan, NavError> {
        let size = self.mirror.len();
        if count == 0 || count > size {
            return Err(NavError::Desync {
                requested: count,
                mirrored: size,
            });
        }
        if count == size {
            return Ok(PopPlan::Clear);
        }
        Ok(PopPlan::PopTo(self.mirror[size - count - 1].id))
    }

    /// Replay a route-stack change onto the native surface.
    ///
    /// `routes` is the stack's post-state. System pops are never replayed.
    pub fn apply(&mut self, change: &StackChange<T>, routes: &[Route<T>]) -> Result<(), NavError> {
        match change {
            StackChange::Pushed { index } => {
                let Some(route) = routes.get(*index) else {
                    return Err(NavError::Desync {
                        requested: *index + 1,
                        mirrored: routes.len(),
                    });
                };
                self.with_state(BridgeState::ApplyingProgrammaticChange, |bridge| {
                    let screen = bridge.mount_screen(route);
                    bridge.surface.push_screen(screen, true);
                    let covered = bridge.mirror.len().checked_sub(2);
                    bridge.cover(covered);
                });
                Ok(())
            }
            StackChange::Popped { count, animated } => {
                let plan = self.plan_pop(*count)?;
                self.with_state(BridgeState::ApplyingProgrammaticChange, |bridge| {
                    bridge.unmount_top(*count);
                    match plan {
                        PopPlan::Clear => bridge.surface.clear_stack(),
                        PopPlan::PopTo(target) => bridge.surface.pop_to_screen(target, *animated),
                    }
                    bridge.reveal_top();
                });
                Ok(())
            }
            StackChange::Replaced {
                retained,
                inserted,
                animated,
            } => {
                if *retained > self.mirror.len() || retained + inserted != routes.len() {
                    return Err(NavError::Desync {
                        requested: retained + inserted,
                        mirrored: self.mirror.len(),
                    });
                }
                self.with_state(BridgeState::ApplyingProgrammaticChange, |bridge| {
                    let removed = bridge.mirror.len() - retained;
                    bridge.unmount_top(removed);
                    let screens: Vec<_> = routes[*retained..]
                        .iter()
                        .map(|route| bridge.mount_screen(route))
                        .collect();
                    bridge.surface.replace_stack(*retained, screens, *animated);
                    if *inserted > 0 {
                        bridge.cover(retained.checked_sub(1));
                    } else {
                        bridge.reveal_top();
                    }
                });
                Ok(())
            }
            StackChange::SystemPopped { .. } => {
                debug!("system pop is not replayed onto the native surface");
                Ok(())
            }
        }
    }

    /// Handle the platform's "did finish showing" signal.
    ///
    /// Returns how many routes were removed because the platform popped them
    /// on its own. A signal naming a screen other than the mirrored one at
    /// the platform's depth is rejected before the mirror or the stack
    /// change.
    pub fn did_finish_showing(
        &mut self,
        shown: ScreenId,
        animated: bool,
        stack: &mut RouteStack<T>,
    ) -> Result<usize, NavError> {
        if self.state != BridgeState::Idle {
            debug!(?shown, state = ?self.state, "transition signal ignored while applying a change");
            return Ok(0);
        }
        let depth = self.surface.depth();
        let expected = stack.len();
        if depth >= expected {
            return Ok(0);
        }

        // The platform keeps the bottom `depth` screens; the one it reports
        // must be the mirrored screen at that height.
        if depth > 0 {
            let expected_top = self.mirror.get(depth - 1).map(|screen| screen.id);
            if expected_top != Some(shown) {
                warn!(?shown, ?expected_top, depth, "finish signal does not match the mirror");
                return Err(NavError::UnexpectedScreen {
                    shown,
                    expected: expected_top,
                });
            }
        }

        let missing = expected - depth;
        self.sink.log(&format!(
            "platform popped {missing} screen(s) (animated: {animated}), showing {shown}"
        ));
        self.with_state(BridgeState::ApplyingSystemChange, |bridge| {
            for _ in 0..missing {
                bridge.unmount_top(1);
                stack.on_system_pop();
            }
            bridge.reveal_top();
        });
        Ok(missing)
    }

    /// Queue corrections for the visible screen's forced chrome values.
    pub fn refresh_visible(&mut self) -> usize {
        self.mirror
            .last_mut()
            .map_or(0, |screen| screen.chrome.refresh())
    }

    /// Hand the current chrome to the surface.
    pub fn repaint_chrome(&mut self, chrome: &ChromeSnapshot) {
        self.surface.apply_chrome(chrome);
    }

    /// Release every mounted screen and empty the native stack.
    pub fn teardown(&mut self) {
        if self.mirror.is_empty() {
            return;
        }
        self.with_state(BridgeState::ApplyingProgrammaticChange, |bridge| {
            let count = bridge.mirror.len();
            bridge.unmount_top(count);
            bridge.surface.clear_stack();
        });
    }

    fn mount_screen(&mut self, route: &Route<T>) -> NativeScreen<N::Screen> {
        let (content, declarations) = (self.factory)(route.key()).into_parts();
        let id = ScreenId::new();
        self.mirror.push(MountedScreen {
            id,
            chrome: MountedChrome::mount(declarations, &self.context),
        });
        NativeScreen {
            id,
            title: route.title().to_owned(),
            content,
        }
    }

    /// Releases the top `count` mirrored screens, topmost first.
    fn unmount_top(&mut self, count: usize) {
        for _ in 0..count {
            let Some(mut screen) = self.mirror.pop() else {
                break;
            };
            screen.chrome.release();
        }
    }

    fn reveal_top(&mut self) {
        if let Some(top) = self.mirror.last_mut() {
            top.chrome.appear();
        }
    }

    /// The incoming top appears before the covered screen leaves.
    fn cover(&mut self, covered: Option<usize>) {
        self.reveal_top();
        if let Some(screen) = covered.and_then(|index| self.mirror.get_mut(index)) {
            screen.chrome.disappear();
        }
    }

    fn with_state<R>(&mut self, state: BridgeState, f: impl FnOnce(&mut Self) -> R) -> R {
        debug_assert_eq!(self.state, BridgeState::Idle, "bridge re-entered");
        self.state = state;
        let result = f(self);
        self.state = BridgeState::Idle;
        result
    }
}
