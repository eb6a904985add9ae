//! tessera-nav keeps a declarative route stack in sync with a platform
//! navigation controller and lets the visible screen own the navigation bar.
//!
//! # Route stack
//!
//! Application code navigates by mutating a [`RouteStack`] through the
//! [`NavEngine`]. Every effective mutation is replayed onto the
//! [`NativeSurface`] by the [`SyncBridge`]:
//!
//! ```
//! use tessera_nav::{NavEngine, NativeSurface, Route, Screen, testing::RecordingSurface};
//!
//! let mut engine = NavEngine::builder(RecordingSurface::new(), |page: &u32| {
//!     Screen::new(*page)
//! })
//! .initial(Route::new(1, "One"))
//! .build();
//!
//! engine.push(Route::new(2, "Two"));
//! engine.push(Route::new(3, "Three"));
//! engine.pop_to(&Route::new(1, "One"), false, true);
//!
//! assert_eq!(engine.routes().len(), 1);
//! assert_eq!(engine.surface().depth(), 1);
//! ```
//!
//! Pops performed by the platform itself (back gesture, system back button)
//! are reported through [`NavEngine::did_finish_showing`]; the stack follows
//! the platform and no native call is issued.
//!
//! # Chrome ownership
//!
//! Screens declare bar properties with [`Screen::nav_title`],
//! [`Screen::nav_bar_hidden`] and [`Screen::nav_back_tint`]. Each declaration
//! becomes an [`OwnershipModifier`] that claims the property on
//! [`ChromeStyle`] while its screen is visible and hands the previous value
//! back when the screen is covered or torn down. A value forced by someone
//! else is corrected on the next [`NavEngine::run_cycle`].
//!
//! # Threading
//!
//! [`NavEngine`] is neither `Send` nor `Sync`, so it stays on the thread that
//! built it. Chrome handles
//! ([`ChromeStyle`], [`UiCycle`]) are `Send + Sync` and may be read anywhere,
//! but corrections always run on the UI cycle.
//!
//! # Logging
//!
//! Diagnostics go through `tracing` under the `tessera_nav` target.
//! Human-readable navigation lines additionally go to a [`LogSink`]; enable
//! [`ConsoleLog`] with [`NavEngineBuilder::debug_logging`].

#![deny(missing_docs, clippy::unwrap_used)]

pub mod bridge;
pub mod chrome;
pub mod color;
pub mod config;
pub mod engine;
pub mod error;
pub mod log;
pub mod ownership;
pub mod route_stack;
pub mod screen;
pub mod testing;
pub mod ui_cycle;

pub use crate::{
    bridge::{BridgeState, NativeScreen, NativeSurface, ScreenFactory, ScreenId, SyncBridge},
    chrome::{ChromeField, ChromeSnapshot, ChromeStyle, ChromeValue, ObserverId, OwnerToken},
    color::Color,
    config::NavConfig,
    engine::{NavEngine, NavEngineBuilder},
    error::NavError,
    log::{ConsoleLog, LogSink, SharedLogSink, SilentLog},
    ownership::{BackTint, BarHidden, ChromeContext, ChromeProperty, OwnershipModifier, Title},
    route_stack::{Route, RouteStack, StackChange, SubscriptionId},
    screen::{ChromeDeclarations, MountedChrome, Screen},
    ui_cycle::UiCycle,
};
