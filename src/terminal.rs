use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Result};
use log::info;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use cyberaware::scenario::MediaKind;
use cyberaware::{
    PlayerCommand, PlayerConfig, ScenarioGraph, ScenarioNode, ScenarioOption, ScenarioPlayer,
    ScenarioSession,
};

type Input = Lines<BufReader<Stdin>>;

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render_node(node: &ScenarioNode, caption: Option<&str>) {
    println!("\n[{}] {}", node.media.kind, node.media.source);
    if let Some(caption) = caption {
        println!("  \"{caption}\"");
    }
}

fn render_options(node: &ScenarioNode) {
    println!();
    for (i, option) in node.options().iter().enumerate() {
        println!("  [{}] {}", i + 1, option.text);
    }
}

fn media_prompt(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Video => "  (press Enter when the video ends) ",
        MediaKind::Image => "  (press Enter once you have seen the image) ",
    }
}

/// Accepts either the 1-based position shown on screen or the option id.
fn parse_choice<'a>(node: &'a ScenarioNode, input: &str) -> Option<&'a ScenarioOption> {
    let options = node.options();
    if let Ok(n) = input.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| options.get(i));
    }
    options.iter().find(|o| o.id.eq_ignore_ascii_case(input))
}

fn is_quit(input: &str) -> bool {
    input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit")
}

/// `None` once stdin is closed.
async fn read_line(input: &mut Input, prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    Ok(input.next_line().await?.map(|line| line.trim().to_string()))
}

// ---------------------------------------------------------------------------
// Ending screen
// ---------------------------------------------------------------------------

enum RoundOutcome {
    /// The story reached an ending.
    Finished {
        ending_node_id: String,
        path: Vec<String>,
        choices_made: usize,
    },
    /// Player typed quit mid-story.
    Quit,
}

fn show_ending(outcome: &RoundOutcome, max_choices: usize) {
    println!("\n========================================");
    println!("               THE END");
    println!("========================================");

    match outcome {
        RoundOutcome::Finished {
            ending_node_id,
            path,
            choices_made,
        } => {
            println!("  Ending:    {ending_node_id}");
            println!("  Decisions: {choices_made} / {max_choices}");
            println!("  Path:      {}", path.join(" -> "));
        }
        RoundOutcome::Quit => {
            println!("  You put your phone down.");
        }
    }

    println!("========================================\n");
    println!("  [r] Restart    [q] Quit\n");
}

/// Returns `true` to play again.
async fn prompt_restart(input: &mut Input) -> Result<bool> {
    loop {
        let Some(line) = read_line(input, "> ").await? else {
            return Ok(false);
        };
        match line.to_lowercase().as_str() {
            "r" => return Ok(true),
            "q" => return Ok(false),
            _ => println!("  Press [r] to restart or [q] to quit."),
        }
    }
}

// ---------------------------------------------------------------------------
// Single playthrough
// ---------------------------------------------------------------------------

async fn play_round(
    graph: Arc<ScenarioGraph>,
    config: &PlayerConfig,
    input: &mut Input,
) -> Result<RoundOutcome> {
    let session = ScenarioSession::spawn(ScenarioPlayer::new(graph, config.clone()));
    let mut state = session.subscribe();

    session.send(PlayerCommand::Start)?;
    state.changed().await?;

    let mut rendered = 0;
    loop {
        let snap = state.borrow_and_update().clone();
        let Some(node) = snap.current_node else {
            bail!("scenario could not start: entry node is missing");
        };

        if snap.history.len() != rendered {
            render_node(&node, snap.caption.as_deref());
            rendered = snap.history.len();
        }

        if snap.finished {
            session.shutdown().await;
            return Ok(RoundOutcome::Finished {
                ending_node_id: node.id,
                path: snap.history,
                choices_made: snap.choices_made,
            });
        }

        if snap.advancing {
            state.changed().await?;
            continue;
        }

        if snap.show_options {
            render_options(&node);
            let Some(line) = read_line(input, "\n[You]: ").await? else {
                return Ok(RoundOutcome::Quit);
            };
            if is_quit(&line) {
                return Ok(RoundOutcome::Quit);
            }
            match parse_choice(&node, &line) {
                Some(option) => {
                    info!("User chose: {} ({})", option.id, option.text);
                    session.send(PlayerCommand::SelectOption(option.id.clone()))?;
                }
                None => {
                    println!("(Pick one of the numbers above.)");
                    continue;
                }
            }
        } else {
            let Some(line) = read_line(input, media_prompt(node.media.kind)).await? else {
                return Ok(RoundOutcome::Quit);
            };
            if is_quit(&line) {
                return Ok(RoundOutcome::Quit);
            }
            session.send(PlayerCommand::MediaEnded)?;
        }

        state.changed().await?;
    }
}

// ---------------------------------------------------------------------------
// Public entry point — plays the story until the user quits
// ---------------------------------------------------------------------------

pub async fn run(graph: Arc<ScenarioGraph>, config: PlayerConfig) -> Result<()> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let max_choices = graph.longest_path();

    loop {
        println!("\n========================================");
        println!("        THE GROUP CHAT: YOUR MOVE");
        println!("========================================");
        println!("Watch what happens and choose how to respond.");
        println!("Type 'quit' at any prompt to stop.\n");

        let outcome = play_round(graph.clone(), &config, &mut input).await?;
        show_ending(&outcome, max_choices);

        if !prompt_restart(&mut input).await? {
            println!("Thanks for playing! If something online is bothering you, talk to someone you trust.");
            break;
        }

        info!("Player chose to restart");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyberaware::scenario::story::cyberbullying_scenario;

    #[test]
    fn test_parse_choice_by_number() {
        let graph = cyberbullying_scenario();
        let node = graph.get("A002").unwrap();
        assert_eq!(parse_choice(node, "1").unwrap().id, "option_A");
        assert_eq!(parse_choice(node, "2").unwrap().id, "option_B");
        assert!(parse_choice(node, "0").is_none());
        assert!(parse_choice(node, "3").is_none());
    }

    #[test]
    fn test_parse_choice_by_id() {
        let graph = cyberbullying_scenario();
        let node = graph.get("A002").unwrap();
        assert_eq!(parse_choice(node, "OPTION_B").unwrap().next_node_id, "A005");
        assert!(parse_choice(node, "maybe").is_none());
    }

    #[test]
    fn test_no_choices_on_linear_node() {
        let graph = cyberbullying_scenario();
        assert!(parse_choice(graph.get("A001").unwrap(), "1").is_none());
    }

    #[test]
    fn test_quit_words() {
        assert!(is_quit("QUIT"));
        assert!(is_quit("exit"));
        assert!(!is_quit("q"));
    }
}
