//! Faults raised when the route stack and the native surface disagree.
//!
//! None of these reach application code: the engine logs them and aborts the
//! single operation that tripped them.

use thiserror::Error;

use crate::bridge::ScreenId;

/// Desynchronization and precondition faults.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NavError {
    /// A pop asked for more screens than the native mirror holds.
    #[error("cannot pop {requested} screen(s): native stack mirrors {mirrored}")]
    Desync {
        /// Number of screens the operation wanted to remove.
        requested: usize,
        /// Number of screens the bridge believes are on the native stack.
        mirrored: usize,
    },
    /// The platform reported a screen the bridge did not expect on top.
    #[error("native surface finished showing {shown}, expected {expected:?}")]
    UnexpectedScreen {
        /// Screen the platform reported.
        shown: ScreenId,
        /// Screen the bridge mirrors on top, if any.
        expected: Option<ScreenId>,
    },
}
