//! Declarative stack of typed routes.
//!
//! The stack is plain data: it knows nothing about rendering or the native
//! surface. Every effective mutation bumps [`RouteStack::version`] and is
//! reported to listeners as a [`StackChange`] after the sequence has been
//! updated, so listeners always observe the post-state.
//!
//! # Responsibilities
//!
//! - Maintain an ordered stack of [`Route`]s, index 0 at the bottom.
//! - Expose push/pop/pop-to helpers plus replace/reset/clear.
//! - Record platform-driven pops without asking anyone to replay them.
//! - Log benign no-ops (pop on empty, pop-to without a match) to the sink.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use smallvec::SmallVec;

use crate::log::{SharedLogSink, SilentLog};

/// One entry of the stack: a typed key plus a display title.
///
/// Two routes are equal when their keys are equal; the title is not part of
/// the identity.
#[derive(Clone)]
pub struct Route<T> {
    key: T,
    title: String,
}

impl<T> Route<T> {
    /// Create a route.
    pub fn new(key: T, title: impl Into<String>) -> Self {
        Self {
            key,
            title: title.into(),
        }
    }

    /// The route key.
    pub fn key(&self) -> &T {
        &self.key
    }

    /// The display title.
    pub fn title(&self) -> &str {
        &self.title
    }
}

impl<T: PartialEq> PartialEq for Route<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T: Eq> Eq for Route<T> {}

impl<T: Hash> Hash for Route<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T: fmt::Debug> fmt::Debug for Route<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("key", &self.key)
            .field("title", &self.title)
            .finish()
    }
}

/// Delta reported after an effective mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum StackChange<T> {
    /// A route was appended at `index` (always the new top).
    Pushed {
        /// Position of the new route.
        index: usize,
    },
    /// `count` routes were removed from the top.
    Popped {
        /// Number of removed routes.
        count: usize,
        /// Whether the native transition should animate.
        animated: bool,
    },
    /// The platform popped the top route on its own (back gesture, system
    /// back button). Never replayed onto the native surface.
    SystemPopped {
        /// The removed route.
        route: Route<T>,
    },
    /// Everything above `retained` was replaced by `inserted` new routes.
    Replaced {
        /// Number of bottom routes that survived.
        retained: usize,
        /// Number of routes now stacked above them.
        inserted: usize,
        /// Whether the native transition should animate.
        animated: bool,
    },
}

/// Handle returned by [`RouteStack::subscribe`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SubscriptionId(u64);

type StackListener<T> = Box<dyn FnMut(&StackChange<T>, &[Route<T>])>;

/// Ordered stack of routes; the last entry is the visible screen.
pub struct RouteStack<T> {
    routes: Vec<Route<T>>,
    version: u64,
    listeners: SmallVec<[(SubscriptionId, StackListener<T>); 2]>,
    next_subscription: u64,
    sink: SharedLogSink,
}

impl<T> Default for RouteStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RouteStack<T> {
    /// Create an empty stack that logs nowhere.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(SilentLog))
    }

    /// Create an empty stack that reports no-ops to `sink`.
    pub fn with_sink(sink: SharedLogSink) -> Self {
        Self {
            routes: Vec::new(),
            version: 0,
            listeners: SmallVec::new(),
            next_subscription: 1,
            sink,
        }
    }

    /// Current routes, bottom first.
    pub fn routes(&self) -> &[Route<T>] {
        &self.routes
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Top (visible) route.
    pub fn last(&self) -> Option<&Route<T>> {
        self.routes.last()
    }

    /// Monotonic mutation counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Register a listener called after every effective mutation.
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&StackChange<T>, &[Route<T>]) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` when it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Append a route.
    pub fn push(&mut self, route: Route<T>) -> StackChange<T> {
        self.routes.push(route);
        let change = StackChange::Pushed {
            index: self.routes.len() - 1,
        };
        self.commit(&change);
        change
    }

    /// Remove the top route. No-op on an empty stack.
    pub fn pop(&mut self, animated: bool) -> Option<StackChange<T>> {
        if self.routes.is_empty() {
            self.sink.log("pop ignored: route stack is empty");
            return None;
        }
        Some(self.truncate_top(1, animated))
    }

    /// Remove every route above the bottom one.
    pub fn pop_to_root(&mut self, animated: bool) -> Option<StackChange<T>> {
        match self.routes.len() {
            0 => {
                self.sink.log("pop_to_root ignored: route stack is empty");
                None
            }
            1 => None,
            len => Some(self.truncate_top(len - 1, animated)),
        }
    }

    /// Remove every route.
    pub fn clear(&mut self, animated: bool) -> Option<StackChange<T>> {
        if self.routes.is_empty() {
            return None;
        }
        Some(self.truncate_top(self.routes.len(), animated))
    }

    /// Replace the top route, or push when the stack is empty.
    pub fn replace(&mut self, route: Route<T>, animated: bool) -> StackChange<T> {
        self.routes.pop();
        self.routes.push(route);
        let change = StackChange::Replaced {
            retained: self.routes.len() - 1,
            inserted: 1,
            animated,
        };
        self.commit(&change);
        change
    }

    /// Replace the whole stack. An empty `routes` clears it and reports a
    /// [`StackChange::Popped`] of every entry.
    pub fn reset_with(
        &mut self,
        routes: impl IntoIterator<Item = Route<T>>,
        animated: bool,
    ) -> Option<StackChange<T>> {
        let routes: Vec<_> = routes.into_iter().collect();
        if routes.is_empty() {
            return self.clear(animated);
        }
        self.routes = routes;
        let change = StackChange::Replaced {
            retained: 0,
            inserted: self.routes.len(),
            animated,
        };
        self.commit(&change);
        Some(change)
    }

    /// Record a pop the platform already performed.
    ///
    /// The returned [`StackChange::SystemPopped`] is informational: nothing
    /// downstream issues a native pop for it.
    pub fn on_system_pop(&mut self) -> Option<StackChange<T>> {
        let Some(route) = self.routes.pop() else {
            self.sink.log("system pop ignored: route stack is empty");
            return None;
        };
        self.sink.log(&format!(
            "system pop: '{}' removed, {} route(s) left",
            route.title(),
            self.routes.len()
        ));
        let change = StackChange::SystemPopped { route };
        self.commit(&change);
        Some(change)
    }

    fn truncate_top(&mut self, count: usize, animated: bool) -> StackChange<T> {
        let keep = self.routes.len() - count;
        self.routes.truncate(keep);
        let change = StackChange::Popped { count, animated };
        self.commit(&change);
        change
    }

    fn commit(&mut self, change: &StackChange<T>) {
        self.version = self.version.wrapping_add(1);
        let routes = &self.routes;
        for (_, listener) in self.listeners.iter_mut() {
            listener(change, routes);
        }
    }
}

impl<T: PartialEq + fmt::Debug> RouteStack<T> {
    /// Number of routes `pop_to` would remove, or `None` when `route` is not
    /// on the stack.
    ///
    /// The search starts at the top, so the last occurrence wins.
    pub fn plan_pop_to(&self, route: &Route<T>, inclusive: bool) -> Option<usize> {
        let index = self.routes.iter().rposition(|entry| entry == route)?;
        let cut = if inclusive { index } else { index + 1 };
        Some(self.routes.len() - cut)
    }

    /// Remove everything above the topmost occurrence of `route`, and the
    /// occurrence itself when `inclusive`.
    pub fn pop_to(
        &mut self,
        route: &Route<T>,
        inclusive: bool,
        animated: bool,
    ) -> Option<StackChange<T>> {
        let Some(count) = self.plan_pop_to(route, inclusive) else {
            self.sink
                .log(&format!("pop_to ignored: {:?} is not on the stack", route.key()));
            return None;
        };
        if count == 0 {
            self.sink
                .log(&format!("pop_to ignored: {:?} is already on top", route.key()));
            return None;
        }
        Some(self.truncate_top(count, animated))
    }
}
