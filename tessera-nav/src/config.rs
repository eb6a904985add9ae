//! Engine configuration.

use crate::{chrome::ChromeSnapshot, color::Color};

/// Configuration for a [`NavEngine`](crate::NavEngine).
#[derive(Clone, Debug, PartialEq)]
pub struct NavConfig {
    /// Route navigation log lines to [`ConsoleLog`](crate::ConsoleLog)
    /// instead of discarding them.
    ///
    /// Ignored when an explicit sink is installed through
    /// [`NavEngineBuilder::log_sink`](crate::NavEngineBuilder::log_sink).
    pub debug_logging: bool,
    /// Animate the pushes that replay the initial stack onto the native
    /// surface. Platforms usually mount the first stack without animation.
    pub animate_initial_mount: bool,
    /// Bar title shown while no screen owns the title.
    pub default_title: String,
    /// Bar visibility while no screen owns it.
    pub default_bar_hidden: bool,
    /// Back-button tint while no screen owns it.
    pub default_back_tint: Color,
}

impl Default for NavConfig {
    /// Silent logging, unanimated initial mount, empty title, visible bar and
    /// the platform tint.
    fn default() -> Self {
        Self {
            debug_logging: false,
            animate_initial_mount: false,
            default_title: String::new(),
            default_bar_hidden: false,
            default_back_tint: Color::default(),
        }
    }
}

impl NavConfig {
    pub(crate) fn default_chrome(&self) -> ChromeSnapshot {
        ChromeSnapshot {
            title: self.default_title.clone(),
            bar_hidden: self.default_bar_hidden,
            back_button_tint: self.default_back_tint,
        }
    }
}
