use tao::event_loop::EventLoopProxy;
use tokio::sync::mpsc;
use tray_icon::menu::MenuEvent;

use crate::status::Status;

/// Events delivered to the tray event loop.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The monitor published a new status snapshot.
    Status(Status),
    /// A tray menu item was clicked.
    Menu(MenuEvent),
    /// The config file changed on disk and was successfully re-parsed.
    ConfigReloaded,
    /// The config file changed on disk but could not be parsed.
    ConfigReloadFailed(String),
}

/// Somewhere background tasks can post [`AppEvent`]s.
pub trait EventSink: Send + Sync + 'static {
    /// Returns `false` once the receiving side is gone.
    fn send(&self, event: AppEvent) -> bool;
}

impl EventSink for EventLoopProxy<AppEvent> {
    fn send(&self, event: AppEvent) -> bool {
        self.send_event(event).is_ok()
    }
}

impl EventSink for mpsc::UnboundedSender<AppEvent> {
    fn send(&self, event: AppEvent) -> bool {
        mpsc::UnboundedSender::send(self, event).is_ok()
    }
}
