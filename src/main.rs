use anyhow::Result;

mod api;
mod app;
mod config;
mod handler;
mod history;
mod render;
mod session;
mod storage;
mod tui;
mod ui;
mod upload;

use app::App;
use tui::EventHandler;

/// Send diagnostics to a log file; the terminal belongs to the TUI, so the
/// usual stderr target would corrupt the screen. Logging is best-effort:
/// if the file cannot be opened the run proceeds silently.
fn init_logging() {
    let Some(data_dir) = dirs::data_dir() else {
        return;
    };
    let dir = data_dir.join("helpdesk");
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = std::fs::File::create(dir.join("helpdesk.log")) else {
        return;
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    tui::install_panic_hook();

    let mut app = App::new()?;
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut app, &mut terminal, &mut events).await;

    tui::restore()?;
    result
}

async fn run(app: &mut App, terminal: &mut tui::Tui, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(app, event).await?;
        } else {
            break;
        }

        // Reap finished chat/login/upload tasks; each completion is applied
        // to the turn or form it was spawned for.
        app.poll_pending().await;
    }
    Ok(())
}
