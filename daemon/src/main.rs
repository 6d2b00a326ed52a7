#![cfg_attr(windows, windows_subsystem = "windows")]

mod app;
mod config;
mod dialogs;
mod event;
mod icon;
mod logging;
mod paths;
mod process_monitor;
mod recorder;
mod scanner;
mod session;
mod status;
mod tray;

use tao::event_loop::EventLoopBuilder;
use tray_icon::menu::MenuEvent;
use tray_icon::TrayIconEvent;

use crate::event::AppEvent;

fn main() {
    // ── Base directory ────────────────────────────────────────────────────────
    let paths = match paths::AppPaths::resolve() {
        Ok(p) => p,
        Err(e) => fatal(&e),
    };

    // ── Logging ───────────────────────────────────────────────────────────────
    let log_guard = match logging::init(paths.log_dir()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("[logging] {e:#}");
            None
        }
    };
    tracing::info!(
        "{} v{} starting in {}",
        tray::APP_NAME,
        env!("CARGO_PKG_VERSION"),
        paths.base_dir().display()
    );

    // ── Event loop + application state ───────────────────────────────────────
    let event_loop = EventLoopBuilder::<AppEvent>::with_user_event().build();
    let proxy = event_loop.create_proxy();

    let app = match app::App::init(&paths, proxy.clone()) {
        Ok(app) => app,
        Err(e) => fatal(&e),
    };

    MenuEvent::set_event_handler(Some(move |event| {
        let _ = proxy.send_event(AppEvent::Menu(event));
    }));
    TrayIconEvent::set_event_handler(Some(|event| {
        tracing::trace!("[tray] {event:?}");
    }));

    tray::run(event_loop, app, log_guard)
}

/// Reports a startup failure and exits. There is no console on Windows, so
/// the error is also shown in a dialog.
fn fatal(err: &anyhow::Error) -> ! {
    tracing::error!("{err:#}");
    eprintln!("{err:#}");
    dialogs::show_error(tray::APP_NAME, &format!("{err:#}"));
    std::process::exit(1);
}
