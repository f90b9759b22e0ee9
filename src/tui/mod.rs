//! Terminal user interface built on ratatui

mod app;
mod components;
mod events;
mod keys;
mod styles;
mod utils;

use anyhow::Result;
use crossterm::event::{DisableBracketedPaste, EnableBracketedPaste};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::{io, sync::Arc, time::Duration};
use tracing::info;

use crate::app::App as Core;
use self::app::App;
use self::events::EventHandler;

pub type Backend = CrosstermBackend<io::Stdout>;
pub type Frame<'a> = ratatui::Frame<'a>;

/// Interval between ticks driving the busy spinner
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Initialize the terminal for TUI mode
pub fn init_terminal() -> Result<Terminal<Backend>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to normal mode
pub fn restore_terminal(terminal: &mut Terminal<Backend>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Main TUI entry point
pub async fn run(core: Arc<Core>) -> Result<()> {
    let mut event_handler = EventHandler::new(TICK_INTERVAL);
    let mut app = App::new(Arc::clone(&core), event_handler.sender()).await?;
    info!("Interactive session {} started", app.session_id());

    let mut terminal = init_terminal()?;
    let result = run_app(&mut terminal, &mut app, &mut event_handler).await;
    restore_terminal(&mut terminal)?;

    // Dropping the session releases its model
    core.sessions().end(app.session_id()).await;
    info!("Interactive session {} ended", app.session_id());
    result
}

/// Main application loop
async fn run_app(
    terminal: &mut Terminal<Backend>,
    app: &mut App,
    event_handler: &mut EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| app.render(frame))?;

        match event_handler.next().await {
            Some(event) => {
                if app.handle_event(event).await? {
                    break; // Exit requested
                }
            }
            None => break,
        }
    }
    Ok(())
}
