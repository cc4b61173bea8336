//! Typing speed test in the terminal.

pub mod layouts;
pub mod model;
pub mod options;
pub mod themes;
pub mod view;
pub mod words;

use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use model::{Flow, TestState, TypingTest};
use tracing::{error, info};

use super::{
    terminal::{self, Tui},
    AppContext,
};

/// Redraw rate while a test runs, for the live wpm and pace caret.
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

pub async fn run_typing_test(context: &AppContext) -> Result<()> {
    let settings = context.settings().load().await;
    let results = context.typing_results().load().await;
    let mut test = TypingTest::new(settings.typing, results);

    let (mut terminal, _guard) = terminal::enter()?;
    typing_loop(&mut terminal, &mut test, context).await
}

async fn typing_loop(
    terminal: &mut Tui,
    test: &mut TypingTest,
    context: &AppContext,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut frames = tokio::time::interval(FRAME_INTERVAL);

    loop {
        terminal.draw(|frame| view::render(frame, test, Instant::now()))?;
        tokio::select! {
            _ = frames.tick(), if test.state() == TestState::Running => {}
            event = events.next() => {
                let Some(event) = event else { return Ok(()) };
                let Event::Key(key) = event? else { continue };
                if test.handle_key(key, Instant::now()) == Flow::Quit {
                    return Ok(());
                }
                persist(test, context).await;
            }
        }
    }
}

/// Stores a finished result and changed options. Failures are logged, the test keeps going.
async fn persist(test: &mut TypingTest, context: &AppContext) {
    if let Some(result) = test.take_result() {
        info!("Typing test finished at {:.1} wpm in {}", result.wpm, result.mode);
        if let Err(e) = context.typing_results().record(result.wpm, &result.mode).await {
            error!("Failed to save typing test result {e:?}");
        }
    }
    if test.take_settings_change() {
        let typing = test.settings.clone();
        let saved = context
            .settings()
            .update(|settings| settings.typing = typing)
            .await;
        if let Err(e) = saved {
            error!("Failed to save typing test options {e:?}");
        }
    }
}
