pub mod host;
pub mod lifecycle;

pub use host::{PanelHooks, PanelHost, PanelId, PanelMessage, PanelSpec, PanelSurface, ViewSlot};
pub use lifecycle::{PanelHandle, PanelManager, PanelState};
