//! Screens as produced by the application, plus their chrome declarations.
//!
//! ## Usage
//!
//! Wrap rendered content in a [`Screen`] and chain the `nav_*` decorators:
//!
//! ```
//! use tessera_nav::{Color, Screen};
//!
//! let screen = Screen::new("settings view")
//!     .nav_title("Settings")
//!     .nav_back_tint(Color::RED);
//! assert_eq!(screen.declarations().title.as_deref(), Some("Settings"));
//! ```

use crate::{
    color::Color,
    ownership::{BackTint, BarHidden, ChromeContext, OwnershipModifier, Title},
};

/// Chrome values a screen asks for. `None` leaves the property alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChromeDeclarations {
    /// Declared title.
    pub title: Option<String>,
    /// Declared bar visibility.
    pub bar_hidden: Option<bool>,
    /// Declared back-button tint.
    pub back_tint: Option<Color>,
}

impl ChromeDeclarations {
    /// Whether nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.bar_hidden.is_none() && self.back_tint.is_none()
    }
}

/// Renderable content produced by the screen factory, with its chrome
/// declarations.
#[derive(Clone, Debug)]
pub struct Screen<S> {
    content: S,
    chrome: ChromeDeclarations,
}

impl<S> Screen<S> {
    /// Wrap content with no declarations.
    pub fn new(content: S) -> Self {
        Self {
            content,
            chrome: ChromeDeclarations::default(),
        }
    }

    /// Declare the bar title while this screen is on top.
    pub fn nav_title(mut self, title: impl Into<String>) -> Self {
        self.chrome.title = Some(title.into());
        self
    }

    /// Declare bar visibility while this screen is on top.
    pub fn nav_bar_hidden(mut self, hidden: bool) -> Self {
        self.chrome.bar_hidden = Some(hidden);
        self
    }

    /// Declare the back-button tint while this screen is on top.
    pub fn nav_back_tint(mut self, tint: Color) -> Self {
        self.chrome.back_tint = Some(tint);
        self
    }

    /// The wrapped content.
    pub fn content(&self) -> &S {
        &self.content
    }

    /// The declarations.
    pub fn declarations(&self) -> &ChromeDeclarations {
        &self.chrome
    }

    /// Split into content and declarations.
    pub fn into_parts(self) -> (S, ChromeDeclarations) {
        (self.content, self.chrome)
    }
}

/// Live modifiers for one mounted screen.
#[derive(Debug, Default)]
pub struct MountedChrome {
    title: Option<OwnershipModifier<Title>>,
    bar_hidden: Option<OwnershipModifier<BarHidden>>,
    back_tint: Option<OwnershipModifier<BackTint>>,
}

impl MountedChrome {
    /// Turn declarations into modifiers bound to `context`.
    pub fn mount(declarations: ChromeDeclarations, context: &ChromeContext) -> Self {
        Self {
            title: declarations
                .title
                .map(|value| OwnershipModifier::new(context, value)),
            bar_hidden: declarations
                .bar_hidden
                .map(|value| OwnershipModifier::new(context, value)),
            back_tint: declarations
                .back_tint
                .map(|value| OwnershipModifier::new(context, value)),
        }
    }

    /// The screen became visible.
    pub fn appear(&mut self) {
        if let Some(title) = &mut self.title {
            title.appear();
        }
        if let Some(hidden) = &mut self.bar_hidden {
            hidden.appear();
        }
        if let Some(tint) = &mut self.back_tint {
            tint.appear();
        }
    }

    /// The screen is still visible; queue corrections for forced values.
    pub fn refresh(&mut self) -> usize {
        let mut queued = 0;
        if let Some(title) = &mut self.title {
            queued += usize::from(title.refresh());
        }
        if let Some(hidden) = &mut self.bar_hidden {
            queued += usize::from(hidden.refresh());
        }
        if let Some(tint) = &mut self.back_tint {
            queued += usize::from(tint.refresh());
        }
        queued
    }

    /// The screen was covered.
    pub fn disappear(&mut self) {
        if let Some(title) = &mut self.title {
            title.disappear();
        }
        if let Some(hidden) = &mut self.bar_hidden {
            hidden.disappear();
        }
        if let Some(tint) = &mut self.back_tint {
            tint.disappear();
        }
    }

    /// The screen is being torn down.
    pub fn release(&mut self) {
        if let Some(title) = &mut self.title {
            title.release();
        }
        if let Some(hidden) = &mut self.bar_hidden {
            hidden.release();
        }
        if let Some(tint) = &mut self.back_tint {
            tint.release();
        }
    }
}
