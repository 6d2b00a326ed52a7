//! System tray icon, menu and event loop.
//!
//! The tray runs on the main thread inside the `tao` event loop. Menu clicks,
//! status snapshots from the monitor and config-watcher results all arrive as
//! [`AppEvent`]s through the loop's proxy.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use tao::event::{Event, StartCause};
use tao::event_loop::{ControlFlow, EventLoop};
use tracing_appender::non_blocking::WorkerGuard;
use tray_icon::menu::{CheckMenuItem, Menu, MenuId, MenuItem, PredefinedMenuItem};
use tray_icon::{TrayIcon, TrayIconBuilder};

use crate::app::App;
use crate::dialogs;
use crate::event::AppEvent;
use crate::icon;
use crate::status::Status;

pub const APP_NAME: &str = "AutoRecord";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    AddGame,
    EditConfig,
    ReloadConfig,
    TogglePause,
    Exit,
}

/// The tray icon plus the menu items whose text/state change at runtime.
pub struct TrayController {
    tray_icon: TrayIcon,
    status_item: MenuItem,
    pause_item: CheckMenuItem,
    actions: HashMap<MenuId, MenuAction>,
}

impl TrayController {
    pub fn new(status: &Status, paused: bool) -> Result<Self> {
        tracing::info!("[tray] Creating tray icon");

        let status_item = MenuItem::new(status.menu_label(), false, None);
        let add_item = MenuItem::new("Add Game", true, None);
        let edit_item = MenuItem::new("Edit Config", true, None);
        let reload_item = MenuItem::new("Reload Config", true, None);
        let pause_item = CheckMenuItem::new("Pause Automation", true, paused, None);
        let exit_item = MenuItem::new("Exit", true, None);

        let menu = Menu::new();
        menu.append_items(&[
            &status_item,
            &PredefinedMenuItem::separator(),
            &add_item,
            &edit_item,
            &reload_item,
            &pause_item,
            &PredefinedMenuItem::separator(),
            &exit_item,
        ])
        .map_err(|e| anyhow!("Failed to build tray menu: {e}"))?;

        let actions = HashMap::from([
            (add_item.id().clone(), MenuAction::AddGame),
            (edit_item.id().clone(), MenuAction::EditConfig),
            (reload_item.id().clone(), MenuAction::ReloadConfig),
            (pause_item.id().clone(), MenuAction::TogglePause),
            (exit_item.id().clone(), MenuAction::Exit),
        ]);

        let tray_icon = TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_tooltip(status.tooltip(paused))
            .with_icon(icon::tray_icon(status.icon_color(paused))?)
            .build()
            .map_err(|e| anyhow!("Failed to create tray icon: {e}"))?;

        Ok(Self {
            tray_icon,
            status_item,
            pause_item,
            actions,
        })
    }

    pub fn action_for(&self, id: &MenuId) -> Option<MenuAction> {
        self.actions.get(id).copied()
    }

    /// Redraws icon, tooltip, status line and pause check from `status`.
    pub fn render(&self, status: &Status, paused: bool) {
        match icon::tray_icon(status.icon_color(paused)) {
            Ok(icon) => {
                if let Err(e) = self.tray_icon.set_icon(Some(icon)) {
                    tracing::warn!("[tray] Failed to set icon: {e}");
                }
            }
            Err(e) => tracing::warn!("[tray] {e:#}"),
        }
        self.set_tooltip(&status.tooltip(paused));
        self.status_item.set_text(status.menu_label());
        self.pause_item.set_checked(paused);
    }

    pub fn set_tooltip(&self, text: &str) {
        if let Err(e) = self.tray_icon.set_tooltip(Some(text)) {
            tracing::warn!("[tray] Failed to set tooltip: {e}");
        }
    }
}

/// Runs the tray event loop on the current thread until Exit is chosen.
/// `log_guard` is kept alive for as long as the loop runs.
pub fn run(event_loop: EventLoop<AppEvent>, mut app: App, log_guard: Option<WorkerGuard>) -> ! {
    let mut tray: Option<TrayController> = None;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;
        let _ = &log_guard;

        match event {
            Event::NewEvents(StartCause::Init) => {
                match TrayController::new(&app.status(), app.is_paused()) {
                    Ok(t) => tray = Some(t),
                    Err(e) => {
                        tracing::error!("[tray] {e:#}");
                        dialogs::show_error(APP_NAME, &format!("{e:#}"));
                        app.teardown();
                        *control_flow = ControlFlow::ExitWithCode(1);
                    }
                }
            }

            Event::UserEvent(AppEvent::Status(status)) => {
                if let Some(t) = &tray {
                    t.render(&status, app.is_paused());
                }
            }

            Event::UserEvent(AppEvent::ConfigReloaded) => {
                if let Some(t) = &tray {
                    t.set_tooltip("Config reloaded");
                }
            }

            Event::UserEvent(AppEvent::ConfigReloadFailed(err)) => {
                if let Some(t) = &tray {
                    t.set_tooltip(&format!("Config error: {err}"));
                }
            }

            Event::UserEvent(AppEvent::Menu(menu_event)) => {
                let Some(t) = &tray else { return };
                let Some(action) = t.action_for(&menu_event.id) else {
                    return;
                };
                tracing::debug!("[tray] Menu action: {action:?}");
                if handle_action(&mut app, t, action) {
                    tray = None;
                    *control_flow = ControlFlow::Exit;
                }
            }

            _ => {}
        }
    })
}

/// Runs one menu action. Returns `true` when the app should exit.
fn handle_action(app: &mut App, tray: &TrayController, action: MenuAction) -> bool {
    match action {
        MenuAction::EditConfig => {
            if let Err(e) = open::that(app.config_path()) {
                tracing::error!("[tray] Failed to open config: {e}");
                dialogs::show_error(APP_NAME, &format!("Could not open the config file: {e}"));
            }
        }

        MenuAction::ReloadConfig => match app.reload_config() {
            Ok(()) => tray.set_tooltip("Config reloaded"),
            Err(e) => {
                tracing::error!("[config] Reload failed: {e:#}");
                dialogs::show_error(APP_NAME, &format!("Config not reloaded:\n{e:#}"));
            }
        },

        MenuAction::TogglePause => {
            let paused = app.toggle_pause();
            // Recompute from the current snapshot so the colour changes now,
            // not on the monitor's next publish.
            tray.render(&app.status(), paused);
        }

        MenuAction::AddGame => {
            let Some(exe) = dialogs::prompt_text("Add Game", "Game executable (example: game.exe)")
            else {
                return false;
            };
            match app.add_game(&exe) {
                Ok(_) => dialogs::show_info("Added", &format!("{exe} added successfully")),
                Err(e) => {
                    tracing::error!("[config] Failed to add {exe}: {e:#}");
                    dialogs::show_error(APP_NAME, &format!("Could not add {exe}:\n{e:#}"));
                }
            }
        }

        MenuAction::Exit => {
            tracing::info!("[tray] Exit requested");
            app.teardown();
            return true;
        }
    }
    false
}
