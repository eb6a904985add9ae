//! Claim-and-hand-back ownership of chrome properties.
//!
//! An [`OwnershipModifier`] is attached to one mounted screen and declares the
//! value it wants for one chrome property. While visible it owns the property;
//! when it goes away it hands the previous value back, unless a newer screen
//! has taken the property in the meantime.
//!
//! ```
//! use tessera_nav::{ChromeContext, OwnershipModifier, Title};
//!
//! let context = ChromeContext::default();
//! let mut inbox = OwnershipModifier::<Title>::new(&context, "Inbox".to_owned());
//! let mut message = OwnershipModifier::<Title>::new(&context, "Message".to_owned());
//!
//! inbox.appear();
//! message.appear();
//! assert_eq!(context.chrome().title(), "Message");
//!
//! message.release();
//! assert_eq!(context.chrome().title(), "Inbox");
//! ```

use std::{fmt, marker::PhantomData, sync::Arc};

use parking_lot::Mutex;
use tracing::debug;

use crate::{
    chrome::{ChromeField, ChromeStyle, ChromeValue, OwnerToken},
    color::Color,
    ui_cycle::UiCycle,
};

/// Everything a mounted screen needs to take part in chrome ownership.
///
/// The host hands this to each screen at mount time.
#[derive(Clone, Default)]
pub struct ChromeContext {
    chrome: ChromeStyle,
    cycle: UiCycle,
}

impl ChromeContext {
    /// Bundle a style and the cycle its corrections run on.
    pub fn new(chrome: ChromeStyle, cycle: UiCycle) -> Self {
        Self { chrome, cycle }
    }

    /// Shared chrome record.
    pub fn chrome(&self) -> &ChromeStyle {
        &self.chrome
    }

    /// Deferred-work queue.
    pub fn cycle(&self) -> &UiCycle {
        &self.cycle
    }
}

/// A chrome property a modifier can own.
pub trait ChromeProperty: Send + Sync + 'static {
    /// Value type of the property.
    type Value: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;
    /// Which field of [`ChromeStyle`] this is.
    const FIELD: ChromeField;
    /// Read the live value.
    fn read(chrome: &ChromeStyle) -> Self::Value;
    /// Store a value.
    fn write(chrome: &ChromeStyle, value: Self::Value);
    /// Wrap a value for the claim chain.
    fn wrap(value: Self::Value) -> ChromeValue;
}

/// The bar title.
#[derive(Debug)]
pub struct Title;

impl ChromeProperty for Title {
    type Value = String;
    const FIELD: ChromeField = ChromeField::Title;

    fn read(chrome: &ChromeStyle) -> String {
        chrome.title()
    }

    fn write(chrome: &ChromeStyle, value: String) {
        chrome.set_title(value);
    }

    fn wrap(value: String) -> ChromeValue {
        ChromeValue::Title(value)
    }
}

/// Bar visibility.
#[derive(Debug)]
pub struct BarHidden;

impl ChromeProperty for BarHidden {
    type Value = bool;
    const FIELD: ChromeField = ChromeField::BarHidden;

    fn read(chrome: &ChromeStyle) -> bool {
        chrome.bar_hidden()
    }

    fn write(chrome: &ChromeStyle, value: bool) {
        chrome.set_bar_hidden(value);
    }

    fn wrap(value: bool) -> ChromeValue {
        ChromeValue::BarHidden(value)
    }
}

/// The back-button tint.
#[derive(Debug)]
pub struct BackTint;

impl ChromeProperty for BackTint {
    type Value = Color;
    const FIELD: ChromeField = ChromeField::BackButtonTint;

    fn read(chrome: &ChromeStyle) -> Color {
        chrome.back_button_tint()
    }

    fn write(chrome: &ChromeStyle, value: Color) {
        chrome.set_back_button_tint(value);
    }

    fn wrap(value: Color) -> ChromeValue {
        ChromeValue::BackButtonTint(value)
    }
}

struct Claim<V> {
    desired: V,
    correction_pending: bool,
}

/// Per-mount claim on one chrome property.
///
/// Lifecycle:
///
/// - [`appear`](Self::appear): claim the property on the shared
///   [hand-back chain](crate::chrome#hand-back-chain) and write the desired
///   value.
/// - [`refresh`](Self::refresh): once per UI cycle while visible; when this
///   instance still owns the property but the value was forced elsewhere, a
///   correction is queued for the next cycle.
/// - [`disappear`](Self::disappear): hand back, but only while still the
///   owner. A covered claim stays on the chain.
/// - [`release`](Self::release) / drop: leave the chain. The owner restores
///   the value it found; a covered claim unlinks without touching the bar.
///
/// Once every modifier is released, in any order, the property is unclaimed
/// and holds the value it had before the first of them appeared.
pub struct OwnershipModifier<P: ChromeProperty> {
    token: OwnerToken,
    context: ChromeContext,
    claim: Arc<Mutex<Claim<P::Value>>>,
    visible: bool,
    _property: PhantomData<P>,
}

impl<P: ChromeProperty> OwnershipModifier<P> {
    /// Create a modifier with a fresh token. Nothing is written until
    /// [`appear`](Self::appear).
    pub fn new(context: &ChromeContext, desired: P::Value) -> Self {
        Self {
            token: OwnerToken::new(),
            context: context.clone(),
            claim: Arc::new(Mutex::new(Claim {
                desired,
                correction_pending: false,
            })),
            visible: false,
            _property: PhantomData,
        }
    }

    /// This instance's token.
    pub fn token(&self) -> OwnerToken {
        self.token
    }

    /// Whether this instance currently holds the property.
    pub fn is_owner(&self) -> bool {
        self.context.chrome.owner(P::FIELD) == Some(self.token)
    }

    /// Whether [`appear`](Self::appear) ran without a matching disappear.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// The declared value.
    pub fn desired(&self) -> P::Value {
        self.claim.lock().desired.clone()
    }

    /// Change the declared value; written through at once while owning.
    pub fn set_desired(&mut self, value: P::Value) {
        self.claim.lock().desired = value.clone();
        if self.visible && self.is_owner() {
            P::write(&self.context.chrome, value);
        }
    }

    /// Claim the property.
    pub fn appear(&mut self) {
        if self.visible {
            return;
        }
        self.context
            .chrome
            .claim(self.token, P::wrap(self.desired()));
        self.visible = true;
    }

    /// Queue a correction when the owned value drifted from the declared one.
    ///
    /// Returns `true` when a correction was queued by this call.
    pub fn refresh(&mut self) -> bool {
        if !self.visible || !self.is_owner() {
            return false;
        }
        let chrome = self.context.chrome.clone();
        {
            let mut claim = self.claim.lock();
            if claim.correction_pending || P::read(&chrome) == claim.desired {
                return false;
            }
            claim.correction_pending = true;
        }

        let token = self.token;
        let claim = self.claim.clone();
        self.context.cycle.defer(move || {
            let desired = {
                let mut claim = claim.lock();
                claim.correction_pending = false;
                claim.desired.clone()
            };
            if chrome.owner(P::FIELD) != Some(token) || P::read(&chrome) == desired {
                return;
            }
            debug!(field = ?P::FIELD, value = ?desired, "restoring owned chrome value");
            P::write(&chrome, desired);
        });
        true
    }

    /// Hand the property back if still the owner.
    pub fn disappear(&mut self) {
        if !self.visible {
            return;
        }
        self.visible = false;
        if self.is_owner() {
            self.context.chrome.hand_back(P::FIELD, self.token);
        } else {
            debug!(field = ?P::FIELD, "covered while not the owner, keeping claim");
        }
    }

    /// Tear down: leave the claim chain whether or not this instance is the
    /// owner.
    pub fn release(&mut self) {
        self.visible = false;
        self.context.chrome.hand_back(P::FIELD, self.token);
    }
}

impl<P: ChromeProperty> Drop for OwnershipModifier<P> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<P: ChromeProperty> fmt::Debug for OwnershipModifier<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnershipModifier")
            .field("field", &P::FIELD)
            .field("token", &self.token)
            .field("desired", &self.desired())
            .field("visible", &self.visible)
            .finish()
    }
}
