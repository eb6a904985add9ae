//! The navigation host: route stack, shared chrome and native bridge under
//! one owner.
//!
//! ## Usage
//!
//! Build an engine around a platform surface and a screen factory, then drive
//! it from application code and from the platform's transition callbacks.
//!
//! ```
//! use tessera_nav::{NavEngine, Route, Screen, testing::RecordingSurface};
//!
//! let mut engine = NavEngine::builder(RecordingSurface::new(), |key: &&str| {
//!     Screen::new(key.to_string()).nav_title(key.to_uppercase())
//! })
//! .initial(Route::new("home", "Home"))
//! .build();
//!
//! engine.push(Route::new("detail", "Detail"));
//! assert_eq!(engine.chrome().title(), "DETAIL");
//!
//! engine.pop(true);
//! assert_eq!(engine.routes().len(), 1);
//! assert_eq!(engine.chrome().title(), "HOME");
//! ```

use std::{fmt, sync::Arc};

use tracing::{debug, error};

use crate::{
    bridge::{BridgeState, NativeSurface, ScreenFactory, ScreenId, SyncBridge},
    chrome::ChromeStyle,
    config::NavConfig,
    error::NavError,
    log::{LogSink, SharedLogSink, sink_for},
    ownership::ChromeContext,
    route_stack::{Route, RouteStack, StackChange, SubscriptionId},
    screen::Screen,
    ui_cycle::UiCycle,
};

/// Declarative navigation controller bound to one native surface.
///
/// The engine owns boxed callbacks that are neither `Send` nor `Sync`, so it
/// stays on the thread that built it; callers on other threads must
/// redispatch onto that thread.
///
/// ```compile_fail
/// fn assert_send<T: Send>() {}
/// assert_send::<tessera_nav::NavEngine<u8, tessera_nav::testing::RecordingSurface<u8>>>();
/// ```
pub struct NavEngine<T, N: NativeSurface> {
    stack: RouteStack<T>,
    bridge: SyncBridge<T, N>,
    context: ChromeContext,
    sink: SharedLogSink,
    painted_version: Option<u64>,
}

impl<T, N> NavEngine<T, N>
where
    T: PartialEq + fmt::Debug + 'static,
    N: NativeSurface,
{
    /// Start configuring an engine.
    pub fn builder(
        surface: N,
        factory: impl Fn(&T) -> Screen<N::Screen> + 'static,
    ) -> NavEngineBuilder<T, N> {
        NavEngineBuilder::new(surface, factory)
    }

    /// Build an engine with an optional initial route.
    pub fn new(
        surface: N,
        factory: impl Fn(&T) -> Screen<N::Screen> + 'static,
        initial: Option<Route<T>>,
        debug_logging: bool,
    ) -> Self {
        let mut builder = Self::builder(surface, factory).debug_logging(debug_logging);
        if let Some(route) = initial {
            builder = builder.initial(route);
        }
        builder.build()
    }

    /// Current routes, bottom first.
    pub fn routes(&self) -> &[Route<T>] {
        self.stack.routes()
    }

    /// The route stack, read-only.
    pub fn stack(&self) -> &RouteStack<T> {
        &self.stack
    }

    /// The shared chrome.
    pub fn chrome(&self) -> &ChromeStyle {
        self.context.chrome()
    }

    /// Context handed to mounted screens.
    pub fn chrome_context(&self) -> &ChromeContext {
        &self.context
    }

    /// Bridge state, `Idle` between calls.
    pub fn bridge_state(&self) -> BridgeState {
        self.bridge.state()
    }

    /// Ids of the mounted native screens, bottom first.
    pub fn screen_ids(&self) -> Vec<ScreenId> {
        self.bridge.screen_ids()
    }

    /// The native surface.
    pub fn surface(&self) -> &N {
        self.bridge.surface()
    }

    /// The native surface, mutably.
    pub fn surface_mut(&mut self) -> &mut N {
        self.bridge.surface_mut()
    }

    /// Observe route-stack changes.
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&StackChange<T>, &[Route<T>]) + 'static,
    ) -> SubscriptionId {
        self.stack.subscribe(listener)
    }

    /// Stop observing.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.stack.unsubscribe(id)
    }

    /// Push a route and its native screen.
    pub fn push(&mut self, route: Route<T>) {
        let change = self.stack.push(route);
        self.replay(change);
    }

    /// Pop the top route. No-op on an empty stack.
    pub fn pop(&mut self, animated: bool) {
        let count = (!self.stack.is_empty()).then_some(1);
        self.pop_checked(count, |stack| stack.pop(animated));
    }

    /// Pop to the topmost occurrence of `route`, removing it too when
    /// `inclusive`. No-op when the route is not on the stack.
    pub fn pop_to(&mut self, route: &Route<T>, inclusive: bool, animated: bool) {
        let count = self.stack.plan_pop_to(route, inclusive);
        self.pop_checked(count, |stack| stack.pop_to(route, inclusive, animated));
    }

    /// Pop everything above the root route.
    pub fn pop_to_root(&mut self, animated: bool) {
        let count = Some(self.stack.len().saturating_sub(1));
        self.pop_checked(count, |stack| stack.pop_to_root(animated));
    }

    /// Remove every route and empty the native stack.
    pub fn clear(&mut self, animated: bool) {
        let count = Some(self.stack.len());
        self.pop_checked(count, |stack| stack.clear(animated));
    }

    /// Replace the top route.
    pub fn replace(&mut self, route: Route<T>, animated: bool) {
        let change = self.stack.replace(route, animated);
        self.replay(change);
    }

    /// Replace the whole stack. An empty `routes` behaves like
    /// [`clear`](Self::clear).
    pub fn reset_with(&mut self, routes: impl IntoIterator<Item = Route<T>>, animated: bool) {
        let routes: Vec<_> = routes.into_iter().collect();
        if routes.is_empty() {
            self.clear(animated);
            return;
        }
        if let Some(change) = self.stack.reset_with(routes, animated) {
            self.replay(change);
        }
    }

    /// Forward the platform's "did finish showing" notification.
    ///
    /// When the platform holds fewer screens than the stack has routes, the
    /// difference was popped by the platform itself and is removed from the
    /// stack without any native call.
    pub fn did_finish_showing(&mut self, shown: ScreenId, animated: bool) {
        match self
            .bridge
            .did_finish_showing(shown, animated, &mut self.stack)
        {
            Ok(0) => {}
            Ok(removed) => debug!(removed, ?shown, "applied platform-driven pop"),
            Err(err) => self.report(err),
        }
    }

    /// Run one UI update cycle.
    ///
    /// Runs the chrome corrections queued during the previous cycle, lets the
    /// visible screen queue new ones, and repaints the bar when the chrome
    /// changed since the last repaint. Returns the number of corrections run.
    pub fn run_cycle(&mut self) -> usize {
        let ran = self.context.cycle().run_pending();
        self.bridge.refresh_visible();

        let version = self.context.chrome().version();
        if self.painted_version != Some(version) {
            let snapshot = self.context.chrome().snapshot();
            self.bridge.repaint_chrome(&snapshot);
            self.painted_version = Some(version);
        }
        ran
    }

    /// Validate a pop against the native mirror before mutating anything.
    fn pop_checked(
        &mut self,
        count: Option<usize>,
        mutate: impl FnOnce(&mut RouteStack<T>) -> Option<StackChange<T>>,
    ) {
        if let Some(count) = count.filter(|count| *count > 0) {
            if let Err(err) = self.bridge.plan_pop(count) {
                self.report(err);
                return;
            }
        }
        if let Some(change) = mutate(&mut self.stack) {
            self.replay(change);
        }
    }

    fn replay(&mut self, change: StackChange<T>) {
        if let Err(err) = self.bridge.apply(&change, self.stack.routes()) {
            self.report(err);
        }
    }

    fn report(&self, err: NavError) {
        error!(target: "tessera_nav", "navigation operation aborted: {err}");
        self.sink.log(&format!("desync: {err}"));
    }
}

impl<T, N: NativeSurface> Drop for NavEngine<T, N> {
    fn drop(&mut self) {
        self.bridge.teardown();
        self.stack.clear(false);
    }
}

/// Builder for [`NavEngine`].
pub struct NavEngineBuilder<T, N: NativeSurface> {
    surface: N,
    factory: ScreenFactory<T, N::Screen>,
    initial: Vec<Route<T>>,
    config: NavConfig,
    sink: Option<SharedLogSink>,
}

impl<T, N> NavEngineBuilder<T, N>
where
    T: PartialEq + fmt::Debug + 'static,
    N: NativeSurface,
{
    /// Start from a surface and a screen factory.
    pub fn new(surface: N, factory: impl Fn(&T) -> Screen<N::Screen> + 'static) -> Self {
        Self {
            surface,
            factory: Box::new(factory),
            initial: Vec::new(),
            config: NavConfig::default(),
            sink: None,
        }
    }

    /// Append a route to the initial stack.
    pub fn initial(mut self, route: Route<T>) -> Self {
        self.initial.push(route);
        self
    }

    /// Append several routes to the initial stack, bottom first.
    pub fn initial_stack(mut self, routes: impl IntoIterator<Item = Route<T>>) -> Self {
        self.initial.extend(routes);
        self
    }

    /// Replace the configuration.
    pub fn config(mut self, config: NavConfig) -> Self {
        self.config = config;
        self
    }

    /// Toggle the built-in console sink.
    pub fn debug_logging(mut self, enabled: bool) -> Self {
        self.config.debug_logging = enabled;
        self
    }

    /// Install a custom log sink.
    pub fn log_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Build the engine and mount the initial stack on the surface.
    pub fn build(self) -> NavEngine<T, N> {
        let sink = self
            .sink
            .unwrap_or_else(|| sink_for(self.config.debug_logging));
        let context = ChromeContext::new(
            ChromeStyle::new(self.config.default_chrome()),
            UiCycle::new(),
        );

        let mut stack = RouteStack::with_sink(sink.clone());
        for route in self.initial {
            stack.push(route);
        }
        let mut bridge = SyncBridge::new(self.surface, self.factory, context.clone(), sink.clone());
        bridge.mount(stack.routes(), self.config.animate_initial_mount);
        sink.log(&format!("mounted {} initial route(s)", stack.len()));

        NavEngine {
            stack,
            bridge,
            context,
            sink,
            painted_version: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc, sync::Arc};

    use parking_lot::Mutex;
    use tracing_subscriber::EnvFilter;

    use super::NavEngine;
    use crate::{
        bridge::{BridgeState, NativeSurface},
        color::Color,
        config::NavConfig,
        route_stack::{Route, StackChange},
        screen::Screen,
        testing::{RecordingSurface, SurfaceCall},
    };

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Page {
        Home,
        List,
        Detail,
        Settings,
    }

    type Engine = NavEngine<Page, RecordingSurface<Page>>;

    fn route(page: Page) -> Route<Page> {
        Route::new(page, format!("{page:?}"))
    }

    fn screen(page: &Page) -> Screen<Page> {
        let screen = Screen::new(*page).nav_title(format!("{page:?}"));
        match page {
            Page::Settings => screen.nav_bar_hidden(true).nav_back_tint(Color::RED),
            Page::List => Screen::new(*page),
            _ => screen,
        }
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("tessera_nav=debug"))
            .with_test_writer()
            .try_init();
    }

    fn engine_with(pages: &[Page]) -> Engine {
        init_tracing();
        NavEngine::builder(RecordingSurface::new(), screen)
            .initial_stack(pages.iter().copied().map(route))
            .build()
    }

    fn pages(engine: &Engine) -> Vec<Page> {
        engine.routes().iter().map(|route| *route.key()).collect()
    }

    #[test]
    fn initial_stack_is_replayed_as_pushes() {
        let mut engine = engine_with(&[Page::Home, Page::Detail]);

        let calls = engine.surface_mut().take_calls();
        assert_eq!(calls.len(), 2);
        assert!(
            calls
                .iter()
                .all(|call| matches!(call, SurfaceCall::Push { animated: false, .. }))
        );
        assert_eq!(engine.surface().titles(), ["Home", "Detail"]);
        assert_eq!(engine.chrome().title(), "Detail");
    }

    #[test]
    fn new_without_initial_route_starts_empty() {
        let engine: Engine = NavEngine::new(RecordingSurface::new(), screen, None, false);
        assert!(engine.routes().is_empty());
        assert_eq!(engine.surface().depth(), 0);
        assert_eq!(engine.bridge_state(), BridgeState::Idle);
    }

    #[test]
    fn push_and_pop_replay_natively() {
        let mut engine = engine_with(&[Page::Home]);
        let root = engine.screen_ids()[0];
        engine.surface_mut().take_calls();

        engine.push(route(Page::Detail));
        engine.pop(false);

        let calls = engine.surface_mut().take_calls();
        assert!(matches!(
            &calls[..],
            [
                SurfaceCall::Push { animated: true, .. },
                SurfaceCall::PopTo { id, animated: false },
            ] if *id == root
        ));
        assert_eq!(pages(&engine), [Page::Home]);
        assert_eq!(engine.surface().depth(), 1);
    }

    #[test]
    fn pop_to_resolves_target_below_removed_range() {
        let mut engine = engine_with(&[Page::Home, Page::List, Page::Detail, Page::Settings]);
        let ids = engine.screen_ids();
        engine.surface_mut().take_calls();

        engine.pop_to(&route(Page::List), false, true);

        assert_eq!(pages(&engine), [Page::Home, Page::List]);
        assert_eq!(
            engine.surface_mut().take_calls(),
            vec![SurfaceCall::PopTo {
                id: ids[1],
                animated: true
            }]
        );
    }

    #[test]
    fn pop_to_covering_every_entry_clears_natively() {
        let mut engine = engine_with(&[Page::Home, Page::Detail]);
        engine.surface_mut().take_calls();

        engine.pop_to(&route(Page::Home), true, true);

        assert!(engine.routes().is_empty());
        assert_eq!(engine.surface_mut().take_calls(), vec![SurfaceCall::Clear]);
        assert_eq!(engine.surface().depth(), 0);
        assert_eq!(engine.chrome().title(), "");
    }

    #[test]
    fn pop_to_missing_route_changes_nothing() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let captured = lines.clone();
        let mut engine: Engine = NavEngine::builder(RecordingSurface::new(), screen)
            .initial(route(Page::Home))
            .log_sink(move |line: &str| captured.lock().push(line.to_owned()))
            .build();
        let notified = Rc::new(RefCell::new(0));
        let counter = notified.clone();
        engine.subscribe(move |_, _| *counter.borrow_mut() += 1);
        engine.surface_mut().take_calls();
        lines.lock().clear();

        engine.pop_to(&route(Page::Settings), false, true);

        assert_eq!(pages(&engine), [Page::Home]);
        assert!(engine.surface().calls().is_empty());
        assert_eq!(*notified.borrow(), 0);
        assert_eq!(lines.lock().len(), 1);
    }

    #[test]
    fn back_gesture_pops_without_native_replay() {
        let mut engine = engine_with(&[Page::Home, Page::Detail, Page::Settings]);
        assert!(engine.chrome().bar_hidden());
        engine.surface_mut().take_calls();

        let shown = engine
            .surface_mut()
            .simulate_back_gesture()
            .expect("three screens mounted");
        engine.did_finish_showing(shown, true);

        assert_eq!(pages(&engine), [Page::Home, Page::Detail]);
        assert!(engine.surface().calls().is_empty());
        assert_eq!(engine.screen_ids().last(), Some(&shown));
        assert_eq!(engine.chrome().title(), "Detail");
        assert!(!engine.chrome().bar_hidden());
        assert_eq!(engine.chrome().back_button_tint(), Color::default());
    }

    #[test]
    fn system_pop_reaches_listeners_as_system_popped() {
        let mut engine = engine_with(&[Page::Home, Page::Detail]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        engine.subscribe(move |change: &StackChange<Page>, _| sink.borrow_mut().push(change.clone()));

        let shown = engine
            .surface_mut()
            .simulate_back_gesture()
            .expect("two screens mounted");
        engine.did_finish_showing(shown, true);
        engine.did_finish_showing(shown, false);

        assert_eq!(
            *seen.borrow(),
            vec![StackChange::SystemPopped {
                route: route(Page::Detail)
            }]
        );
    }

    #[test]
    fn rapid_back_gestures_are_reconciled_in_one_signal() {
        let mut engine = engine_with(&[Page::Home, Page::List, Page::Detail, Page::Settings]);
        engine.surface_mut().simulate_back_gesture();
        let shown = engine
            .surface_mut()
            .simulate_back_gesture()
            .expect("two screens left");

        engine.did_finish_showing(shown, true);

        assert_eq!(pages(&engine), [Page::Home, Page::List]);
        assert_eq!(engine.screen_ids(), engine.surface().screen_ids());
        // List declares nothing and Home never appeared.
        assert_eq!(engine.chrome().title(), "");
        assert!(!engine.chrome().bar_hidden());
    }

    #[test]
    fn title_unwinds_to_screen_underneath() {
        let mut engine = engine_with(&[Page::Home]);
        engine.push(route(Page::Detail));
        engine.push(route(Page::Settings));
        assert_eq!(engine.chrome().title(), "Settings");

        engine.pop(true);
        assert_eq!(engine.chrome().title(), "Detail");
        engine.pop_to_root(true);
        assert_eq!(engine.chrome().title(), "Home");
    }

    #[test]
    fn forced_chrome_is_corrected_on_the_next_cycle() {
        let mut engine = engine_with(&[Page::Home, Page::Detail]);
        engine.run_cycle();

        engine.chrome().set_title("Forced");
        assert_eq!(engine.run_cycle(), 0);
        assert_eq!(engine.chrome().title(), "Forced");

        assert_eq!(engine.run_cycle(), 1);
        assert_eq!(engine.chrome().title(), "Detail");
        assert_eq!(
            engine.surface().painted_chrome().map(|chrome| chrome.title.as_str()),
            Some("Detail")
        );
    }

    #[test]
    fn repaint_happens_only_when_chrome_changed() {
        let mut engine = engine_with(&[Page::Home]);
        engine.run_cycle();
        engine.run_cycle();
        let painted = |engine: &Engine| {
            engine
                .surface()
                .calls()
                .iter()
                .filter(|call| matches!(call, SurfaceCall::Chrome(_)))
                .count()
        };
        assert_eq!(painted(&engine), 1);

        engine.push(route(Page::Settings));
        engine.run_cycle();
        assert_eq!(painted(&engine), 2);
        assert!(
            engine
                .surface()
                .painted_chrome()
                .is_some_and(|chrome| chrome.bar_hidden)
        );
    }

    #[test]
    fn replace_and_reset_rebuild_the_native_top() {
        let mut engine = engine_with(&[Page::Home, Page::Detail]);
        let root = engine.screen_ids()[0];
        engine.surface_mut().take_calls();

        engine.replace(route(Page::Settings), true);
        assert_eq!(pages(&engine), [Page::Home, Page::Settings]);
        assert_eq!(engine.screen_ids()[0], root);
        assert_eq!(engine.surface().titles(), ["Home", "Settings"]);

        engine.reset_with([route(Page::List)], false);
        assert_eq!(pages(&engine), [Page::List]);
        assert_eq!(engine.surface().titles(), ["List"]);
        assert_eq!(engine.chrome().title(), "");
        assert!(!engine.chrome().bar_hidden());
    }

    #[test]
    fn defaults_come_from_config() {
        let engine: Engine = NavEngine::builder(RecordingSurface::new(), screen)
            .config(NavConfig {
                default_title: "App".into(),
                default_back_tint: Color::BLUE,
                animate_initial_mount: true,
                ..NavConfig::default()
            })
            .initial(route(Page::List))
            .build();

        assert_eq!(engine.chrome().title(), "App");
        assert_eq!(engine.chrome().back_button_tint(), Color::BLUE);
        assert!(matches!(
            engine.surface().calls(),
            [SurfaceCall::Push { animated: true, .. }]
        ));
    }

    #[test]
    fn duplicate_routes_get_distinct_screens() {
        let mut engine = engine_with(&[Page::Home]);
        engine.push(route(Page::Detail));
        engine.push(route(Page::Detail));

        let ids = engine.screen_ids();
        assert_eq!(ids.len(), 3);
        assert_ne!(ids[1], ids[2]);

        engine.pop_to(&route(Page::Detail), true, true);
        assert_eq!(pages(&engine), [Page::Home, Page::Detail]);
        assert_eq!(engine.screen_ids(), ids[..2]);
    }

    #[test]
    fn stale_finish_signal_after_a_push_is_rejected() {
        let mut engine = engine_with(&[Page::Home, Page::Detail]);
        let shown = engine
            .surface_mut()
            .simulate_back_gesture()
            .expect("two screens mounted");
        engine.push(route(Page::Settings));
        let notified = Rc::new(RefCell::new(0));
        let counter = notified.clone();
        engine.subscribe(move |_, _| *counter.borrow_mut() += 1);

        engine.did_finish_showing(shown, true);

        assert_eq!(pages(&engine), [Page::Home, Page::Detail, Page::Settings]);
        assert_eq!(engine.screen_ids().len(), 3);
        assert_eq!(*notified.borrow(), 0);
        assert_eq!(engine.chrome().title(), "Settings");
        assert_eq!(engine.bridge_state(), BridgeState::Idle);
    }

    #[test]
    fn reset_with_nothing_clears_natively() {
        let mut engine = engine_with(&[Page::Home, Page::Detail]);
        engine.surface_mut().take_calls();

        engine.reset_with([], true);

        assert!(engine.routes().is_empty());
        assert_eq!(engine.surface_mut().take_calls(), vec![SurfaceCall::Clear]);
        assert_eq!(engine.chrome().title(), "");
    }

    #[test]
    fn dropping_the_engine_restores_defaults() {
        let mut engine = engine_with(&[Page::Home, Page::Settings]);
        let chrome = engine.chrome().clone();
        engine.push(route(Page::Detail));
        assert_eq!(chrome.title(), "Detail");

        drop(engine);

        assert_eq!(chrome.title(), "");
        assert!(!chrome.bar_hidden());
        assert_eq!(chrome.back_button_tint(), Color::default());
    }
}
