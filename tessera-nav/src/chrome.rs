//! Shared navigation-bar chrome: title, bar visibility and back-button tint.
//!
//! [`ChromeStyle`] is a cheap `Clone` handle over one shared record. It never
//! rejects a write; the "who may write" convention lives in
//! [`OwnershipModifier`](crate::OwnershipModifier), which claims a property
//! through [`ChromeStyle::claim`] and gives it up through
//! [`ChromeStyle::hand_back`].
//!
//! # Hand-back chain
//!
//! Each property keeps a chain of live claims, oldest first. Every entry
//! remembers the value that was showing when it claimed. The newest entry is
//! the owner. Handing back the newest entry restores its remembered value and
//! makes the entry below it the owner; handing back an entry further down
//! only unlinks it, passing its remembered value to the entry above. A token
//! that handed back never owns the property again, and an empty chain means
//! the property is unclaimed.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::debug;

use crate::color::Color;

static NEXT_OWNER_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of one mounted modifier instance.
///
/// Tokens are never reused within a process, so the same screen pushed twice
/// still gets two distinct owners.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct OwnerToken(u64);

impl Default for OwnerToken {
    fn default() -> Self {
        Self::new()
    }
}

impl OwnerToken {
    /// Allocate a fresh token.
    pub fn new() -> Self {
        Self(NEXT_OWNER_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

/// One chrome property.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ChromeField {
    /// Bar title.
    Title,
    /// Whether the bar is hidden.
    BarHidden,
    /// Back-button tint.
    BackButtonTint,
}

/// A value for one chrome property.
#[derive(Clone, Debug, PartialEq)]
pub enum ChromeValue {
    /// Bar title.
    Title(String),
    /// Whether the bar is hidden.
    BarHidden(bool),
    /// Back-button tint.
    BackButtonTint(Color),
}

impl ChromeValue {
    /// The property this value belongs to.
    pub fn field(&self) -> ChromeField {
        match self {
            ChromeValue::Title(_) => ChromeField::Title,
            ChromeValue::BarHidden(_) => ChromeField::BarHidden,
            ChromeValue::BackButtonTint(_) => ChromeField::BackButtonTint,
        }
    }
}

/// Plain copy of the chrome values, used for repainting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChromeSnapshot {
    /// Bar title.
    pub title: String,
    /// Whether the bar is hidden.
    pub bar_hidden: bool,
    /// Back-button tint.
    pub back_button_tint: Color,
}

impl ChromeSnapshot {
    fn get(&self, field: ChromeField) -> ChromeValue {
        match field {
            ChromeField::Title => ChromeValue::Title(self.title.clone()),
            ChromeField::BarHidden => ChromeValue::BarHidden(self.bar_hidden),
            ChromeField::BackButtonTint => ChromeValue::BackButtonTint(self.back_button_tint),
        }
    }

    /// Store `value`; returns whether anything changed.
    fn set(&mut self, value: ChromeValue) -> bool {
        match value {
            ChromeValue::Title(title) if self.title != title => self.title = title,
            ChromeValue::BarHidden(hidden) if self.bar_hidden != hidden => {
                self.bar_hidden = hidden
            }
            ChromeValue::BackButtonTint(tint) if self.back_button_tint != tint => {
                self.back_button_tint = tint
            }
            _ => return false,
        }
        true
    }
}

/// One live claim: who holds it and what was showing before.
#[derive(Clone, Debug)]
struct ClaimLink {
    token: OwnerToken,
    underneath: ChromeValue,
}

type ClaimChain = SmallVec<[ClaimLink; 4]>;

#[derive(Default)]
struct ChromeState {
    values: ChromeSnapshot,
    title_claims: ClaimChain,
    bar_hidden_claims: ClaimChain,
    tint_claims: ClaimChain,
    version: u64,
}

impl ChromeState {
    fn chain(&self, field: ChromeField) -> &ClaimChain {
        match field {
            ChromeField::Title => &self.title_claims,
            ChromeField::BarHidden => &self.bar_hidden_claims,
            ChromeField::BackButtonTint => &self.tint_claims,
        }
    }

    fn chain_mut(&mut self, field: ChromeField) -> &mut ClaimChain {
        match field {
            ChromeField::Title => &mut self.title_claims,
            ChromeField::BarHidden => &mut self.bar_hidden_claims,
            ChromeField::BackButtonTint => &mut self.tint_claims,
        }
    }

    fn store(&mut self, value: ChromeValue) -> Option<ChromeField> {
        let field = value.field();
        if !self.values.set(value) {
            return None;
        }
        self.version = self.version.wrapping_add(1);
        Some(field)
    }

    /// Unlink `token` from the chain of `field`.
    fn unlink(&mut self, field: ChromeField, token: OwnerToken) -> Unlinked {
        let chain = self.chain_mut(field);
        let Some(index) = chain.iter().position(|link| link.token == token) else {
            return Unlinked::Missing;
        };
        let link = chain.remove(index);
        match chain.get_mut(index) {
            // The claim above now sits on what this one had underneath.
            Some(above) => {
                above.underneath = link.underneath;
                Unlinked::Covered
            }
            None => Unlinked::Owner(link.underneath),
        }
    }
}

enum Unlinked {
    Missing,
    Covered,
    Owner(ChromeValue),
}

type ChromeListener = Arc<dyn Fn(ChromeField) + Send + Sync>;

/// Handle returned by [`ChromeStyle::observe`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ObserverId(u64);

#[derive(Default)]
struct Observers {
    next_id: u64,
    listeners: SmallVec<[(ObserverId, ChromeListener); 2]>,
}

/// Shared, observable chrome record.
///
/// Listeners registered with [`ChromeStyle::observe`] run after the value is
/// stored and the lock released, so they may read the style freely.
#[derive(Clone, Default)]
pub struct ChromeStyle {
    state: Arc<RwLock<ChromeState>>,
    observers: Arc<RwLock<Observers>>,
}

impl ChromeStyle {
    /// Create a style with the given unclaimed values.
    pub fn new(defaults: ChromeSnapshot) -> Self {
        Self {
            state: Arc::new(RwLock::new(ChromeState {
                values: defaults,
                ..ChromeState::default()
            })),
            observers: Arc::default(),
        }
    }

    /// Current title.
    pub fn title(&self) -> String {
        self.state.read().values.title.clone()
    }

    /// Whether the bar is hidden.
    pub fn bar_hidden(&self) -> bool {
        self.state.read().values.bar_hidden
    }

    /// Current back-button tint.
    pub fn back_button_tint(&self) -> Color {
        self.state.read().values.back_button_tint
    }

    /// Current value of `field`.
    pub fn get(&self, field: ChromeField) -> ChromeValue {
        self.state.read().values.get(field)
    }

    /// Copy of every value.
    pub fn snapshot(&self) -> ChromeSnapshot {
        self.state.read().values.clone()
    }

    /// Incremented on every effective value change.
    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    /// Replace the title.
    pub fn set_title(&self, title: impl Into<String>) {
        self.set(ChromeValue::Title(title.into()));
    }

    /// Show or hide the bar.
    pub fn set_bar_hidden(&self, hidden: bool) {
        self.set(ChromeValue::BarHidden(hidden));
    }

    /// Replace the back-button tint.
    pub fn set_back_button_tint(&self, tint: Color) {
        self.set(ChromeValue::BackButtonTint(tint));
    }

    /// Store a value without touching ownership.
    pub fn set(&self, value: ChromeValue) {
        let changed = self.state.write().store(value);
        self.notify(changed);
    }

    /// Token currently holding `field`, `None` when unclaimed.
    pub fn owner(&self, field: ChromeField) -> Option<OwnerToken> {
        self.state.read().chain(field).last().map(|link| link.token)
    }

    /// Number of live claims on `field`, owner included.
    pub fn claim_depth(&self, field: ChromeField) -> usize {
        self.state.read().chain(field).len()
    }

    /// Make `token` the owner of `value`'s property and store `value`.
    ///
    /// A token already further down the chain is unlinked first, so it always
    /// ends up as the newest claim.
    pub fn claim(&self, token: OwnerToken, value: ChromeValue) {
        let field = value.field();
        let changed = {
            let mut state = self.state.write();
            let owns = state.chain(field).last().map(|link| link.token) == Some(token);
            if !owns {
                state.unlink(field, token);
                let underneath = state.values.get(field);
                state.chain_mut(field).push(ClaimLink { token, underneath });
            }
            state.store(value)
        };
        self.notify(changed);
    }

    /// Give up `token`'s claim on `field`.
    ///
    /// The owner restores the value it found; a claim further down the chain
    /// is unlinked without touching the visible value. Returns `false` when
    /// `token` held no claim.
    pub fn hand_back(&self, field: ChromeField, token: OwnerToken) -> bool {
        let (held, changed) = {
            let mut state = self.state.write();
            match state.unlink(field, token) {
                Unlinked::Missing => (false, None),
                Unlinked::Covered => (true, None),
                Unlinked::Owner(restore) => (true, state.store(restore)),
            }
        };
        if !held {
            debug!(?field, ?token, "hand-back ignored: no live claim");
        }
        self.notify(changed);
        held
    }

    /// Register a listener for value changes.
    pub fn observe(&self, listener: impl Fn(ChromeField) + Send + Sync + 'static) -> ObserverId {
        let mut observers = self.observers.write();
        observers.next_id += 1;
        let id = ObserverId(observers.next_id);
        observers.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` when it was already gone.
    pub fn unobserve(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.listeners.len();
        observers.listeners.retain(|(listener_id, _)| *listener_id != id);
        observers.listeners.len() != before
    }

    /// Whether both handles point at the same record.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    fn notify(&self, changed: Option<ChromeField>) {
        let Some(field) = changed else {
            return;
        };
        let listeners: SmallVec<[ChromeListener; 2]> = self
            .observers
            .read()
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(field);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::{ChromeField, ChromeSnapshot, ChromeStyle, ChromeValue, OwnerToken};
    use crate::color::Color;

    #[test]
    fn tokens_are_unique() {
        let first = OwnerToken::new();
        let second = OwnerToken::new();
        assert_ne!(first, second);
    }

    #[test]
    fn listeners_fire_only_on_effective_changes() {
        let chrome = ChromeStyle::default();
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = fired.clone();
        let reader = chrome.clone();
        let observer = chrome.observe(move |field| {
            // reading inside a listener must not deadlock
            let _ = reader.snapshot();
            sink.lock().push(field);
        });

        chrome.set_title("Inbox");
        chrome.set_title("Inbox");
        chrome.set_bar_hidden(true);
        chrome.set_back_button_tint(Color::RED);
        chrome.set_back_button_tint(Color::RED);

        assert_eq!(
            *fired.lock(),
            vec![
                ChromeField::Title,
                ChromeField::BarHidden,
                ChromeField::BackButtonTint
            ]
        );
        assert_eq!(chrome.version(), 3);

        assert!(chrome.unobserve(observer));
        assert!(!chrome.unobserve(observer));
        chrome.set_title("Archive");
        assert_eq!(fired.lock().len(), 3);
    }

    #[test]
    fn unobserving_drops_the_listener() {
        let chrome = ChromeStyle::default();
        let captured = Arc::new(());
        let held = captured.clone();
        let observer = chrome.observe(move |_| {
            let _ = &held;
        });
        assert_eq!(Arc::strong_count(&captured), 2);

        chrome.unobserve(observer);
        assert_eq!(Arc::strong_count(&captured), 1);
    }

    #[test]
    fn writes_are_never_rejected() {
        let chrome = ChromeStyle::new(ChromeSnapshot {
            title: "Home".into(),
            ..ChromeSnapshot::default()
        });
        let owner = OwnerToken::new();
        chrome.claim(owner, ChromeValue::Title("Claimed".into()));

        chrome.set_title("Forced");

        assert_eq!(chrome.title(), "Forced");
        assert_eq!(chrome.owner(ChromeField::Title), Some(owner));
        assert_eq!(chrome.owner(ChromeField::BarHidden), None);
    }

    #[test]
    fn owner_hand_back_restores_value_underneath() {
        let chrome = ChromeStyle::new(ChromeSnapshot {
            title: "Root".into(),
            ..ChromeSnapshot::default()
        });
        let (first, second) = (OwnerToken::new(), OwnerToken::new());
        chrome.claim(first, ChromeValue::Title("First".into()));
        chrome.claim(second, ChromeValue::Title("Second".into()));
        assert_eq!(chrome.claim_depth(ChromeField::Title), 2);

        assert!(chrome.hand_back(ChromeField::Title, second));
        assert_eq!(chrome.title(), "First");
        assert_eq!(chrome.owner(ChromeField::Title), Some(first));

        assert!(chrome.hand_back(ChromeField::Title, first));
        assert_eq!(chrome.title(), "Root");
        assert_eq!(chrome.owner(ChromeField::Title), None);
        assert!(!chrome.hand_back(ChromeField::Title, first));
    }

    #[test]
    fn covered_claim_unlinks_without_repainting() {
        let chrome = ChromeStyle::new(ChromeSnapshot {
            title: "Root".into(),
            ..ChromeSnapshot::default()
        });
        let (first, second) = (OwnerToken::new(), OwnerToken::new());
        chrome.claim(first, ChromeValue::Title("First".into()));
        chrome.claim(second, ChromeValue::Title("Second".into()));
        let version = chrome.version();

        assert!(chrome.hand_back(ChromeField::Title, first));
        assert_eq!(chrome.title(), "Second");
        assert_eq!(chrome.version(), version);
        assert_eq!(chrome.owner(ChromeField::Title), Some(second));

        // The survivor inherits what the unlinked claim found.
        chrome.hand_back(ChromeField::Title, second);
        assert_eq!(chrome.title(), "Root");
        assert_eq!(chrome.owner(ChromeField::Title), None);
    }

    #[test]
    fn reclaiming_from_below_moves_to_the_top() {
        let chrome = ChromeStyle::default();
        let (first, second) = (OwnerToken::new(), OwnerToken::new());
        chrome.claim(first, ChromeValue::BarHidden(true));
        chrome.claim(second, ChromeValue::BarHidden(false));

        chrome.claim(first, ChromeValue::BarHidden(true));
        assert_eq!(chrome.owner(ChromeField::BarHidden), Some(first));
        assert_eq!(chrome.claim_depth(ChromeField::BarHidden), 2);

        chrome.hand_back(ChromeField::BarHidden, first);
        assert_eq!(chrome.owner(ChromeField::BarHidden), Some(second));
        assert!(!chrome.bar_hidden());
        chrome.hand_back(ChromeField::BarHidden, second);
        assert!(!chrome.bar_hidden());
        assert_eq!(chrome.owner(ChromeField::BarHidden), None);
    }

    #[test]
    fn clones_share_storage() {
        let chrome = ChromeStyle::default();
        let other = chrome.clone();
        other.set_bar_hidden(true);
        assert!(chrome.bar_hidden());
        assert!(chrome.ptr_eq(&other));
        assert!(!chrome.ptr_eq(&ChromeStyle::default()));
    }
}
