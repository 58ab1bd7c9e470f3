//! Line-oriented terminal front-end for a study session.

use std::io::{self, Write};
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use flashdeck_core::model::SessionSummary;
use services::ActiveSession;

/// How long a finished session waits for its last stats syncs.
pub const SYNC_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

enum Step {
    Continue,
    Quit,
}

/// Drive `session` from line input until the user quits or input ends.
///
/// Enter reveals the back, `y`/`n` records the answer, and after the last
/// card `r` restarts the same draw while `q` ends the session. Before
/// returning it waits up to [`SYNC_FLUSH_TIMEOUT`] for pending stats syncs,
/// so callers may shut the runtime down right after.
///
/// # Errors
///
/// Returns I/O errors from reading `input` or writing `out`.
pub async fn run_study<R, W>(
    mut session: ActiveSession,
    input: R,
    out: &mut W,
) -> io::Result<SessionSummary>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        if let Step::Quit = play_through(&mut session, &mut lines, out).await? {
            break;
        }
        print_summary(&session, out)?;

        writeln!(out, "[r]estart or [q]uit?")?;
        out.flush()?;
        match lines.next_line().await? {
            Some(line) if line.trim().eq_ignore_ascii_case("r") => session.restart(),
            _ => break,
        }
    }
    Ok(session.finish(SYNC_FLUSH_TIMEOUT).await)
}

async fn play_through<R, W>(
    session: &mut ActiveSession,
    lines: &mut Lines<R>,
    out: &mut W,
) -> io::Result<Step>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    while let Some(card) = session.current_card() {
        let back = card.back().to_owned();
        writeln!(
            out,
            "\n[{}/{}] ({}) {}",
            session.cursor() + 1,
            session.total_cards(),
            card.difficulty(),
            card.front()
        )?;
        writeln!(out, "press Enter to reveal")?;
        out.flush()?;
        if lines.next_line().await?.is_none() {
            return Ok(Step::Quit);
        }

        session.reveal();
        writeln!(out, "  -> {back}")?;

        loop {
            write!(out, "correct? [y/n] ")?;
            out.flush()?;
            let Some(line) = lines.next_line().await? else {
                return Ok(Step::Quit);
            };
            let correct = match line.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => true,
                "n" | "no" => false,
                _ => {
                    writeln!(out, "please answer y or n")?;
                    continue;
                }
            };
            if let Err(e) = session.record_answer(correct) {
                writeln!(out, "{e}")?;
            }
            break;
        }
    }
    Ok(Step::Continue)
}

fn print_summary<W: Write>(session: &ActiveSession, out: &mut W) -> io::Result<()> {
    let summary = session.summary();
    writeln!(out, "\nsession complete")?;
    writeln!(
        out,
        "studied {} of {} | correct {} | incorrect {} | accuracy {}%",
        summary.stats.studied_cards(),
        summary.stats.total_cards(),
        summary.stats.correct_answers(),
        summary.stats.incorrect_answers(),
        summary.accuracy
    )
}
