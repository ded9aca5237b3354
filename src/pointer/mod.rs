//! Pointer Injection
//!
//! The OS-level cursor is an external collaborator. Everything that moves it
//! or presses its buttons goes through [`PointerSink`], so the pipeline can
//! run against a real backend or the recording [`LoggingPointer`].

pub mod logging;

#[cfg(feature = "enigo")]
pub mod enigo_backend;

pub use logging::{LoggingPointer, PointerCommand};

#[cfg(feature = "enigo")]
pub use enigo_backend::EnigoPointer;

use crate::motion::{MonitorGeometry, MonitorTarget};
use serde::{Deserialize, Serialize};

/// Mouse buttons the pipeline can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Middle => "middle",
        }
    }
}

/// Failure reported by an injection backend.
///
/// These never stop the control loop; callers log and count them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InjectionError {
    #[error("Pointer action rejected: {0}")]
    Rejected(String),

    #[error("Pointer backend unavailable: {0}")]
    Unavailable(String),
}

pub type InjectionResult<T> = std::result::Result<T, InjectionError>;

/// OS pointer injection collaborator.
///
/// Methods take `&self`: the sink is shared between the frame loop (buttons)
/// and the interpolator worker (moves).
pub trait PointerSink: Send + Sync {
    fn move_to(&self, x: i32, y: i32) -> InjectionResult<()>;

    fn click(&self, button: MouseButton, count: u32) -> InjectionResult<()>;

    fn press(&self, button: MouseButton) -> InjectionResult<()>;

    fn release(&self, button: MouseButton) -> InjectionResult<()>;

    /// Current cursor position as the OS sees it.
    fn position(&self) -> InjectionResult<MonitorTarget>;

    /// Size of the active display, if the backend can tell.
    fn display_geometry(&self) -> Option<MonitorGeometry>;
}
