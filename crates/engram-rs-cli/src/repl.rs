//! Line-oriented read-eval-print loop over the turn processor.

use engram_rs_core::{render_transcript, TurnProcessor};
use log::error;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Keywords that end the session.
const EXIT_KEYWORDS: [&str; 3] = ["exit", "quit", "bye"];

/// Whether a line of input asks to end the session.
pub fn is_exit_command(line: &str) -> bool {
    let trimmed = line.trim().to_lowercase();
    EXIT_KEYWORDS.iter().any(|keyword| trimmed == *keyword)
}

/// Read user lines and process them until EOF or an exit keyword.
///
/// One turn at a time: the next prompt is not shown until the current turn
/// finishes. A turn-level error (model failure, dead tool session) ends the
/// loop.
pub async fn run_repl(processor: &TurnProcessor) -> anyhow::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("\n❓ What would you like the agent to do? ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_exit_command(input) {
            println!("👋 Goodbye!");
            break;
        }

        match processor.process(input).await {
            Ok(outcome) => {
                println!("\n🤖 Agent response:\n");
                print!("{}", render_transcript(&outcome.trace));
                println!("\n{}", outcome.answer);
            }
            Err(err) => {
                error!("turn failed: {err}");
                return Err(err.into());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::is_exit_command;

    #[test]
    fn exit_keywords_end_the_session() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("QUIT"));
        assert!(is_exit_command("  Bye  "));
    }

    #[test]
    fn ordinary_input_does_not_exit() {
        assert!(!is_exit_command("please exit the loop"));
        assert!(!is_exit_command("goodbye"));
        assert!(!is_exit_command(""));
    }
}
