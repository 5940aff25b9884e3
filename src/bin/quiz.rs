use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::KeyCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use topic_quiz::clients::{ClientType, FlexibleClient};
use topic_quiz::config::{read_single_key, AppConfig};
use topic_quiz::session::view::{advance_label, option_mark, progress_percent, OptionMark};
use topic_quiz::{
    Difficulty, FailureKind, Phase, PresetTopic, QuizController, QuizGenerator, TopicSelection, ValidationMode,
};

const KEY_WAIT: Duration = Duration::from_secs(600);

#[derive(Parser)]
#[command(author, version, about = "Five-question multiple-choice quizzes on any topic", long_about = None)]
#[command(after_help = "ENVIRONMENT VARIABLES:
    QUIZ_CLIENT        Override client type (gemini|claude|deepseek|mock)
    QUIZ_TIMEOUT_SECS  Generation timeout in seconds [default: 60]
    QUIZ_VALIDATION    strict|lenient [default: strict]
    QUIZ_DIFFICULTY    easy|medium|hard [default: medium]
    GEMINI_API_KEY     API key for Gemini (API_KEY is also accepted)
    ANTHROPIC_API_KEY  API key for Claude
    DEEPSEEK_API_KEY   API key for DeepSeek

EXAMPLES:
    quiz                                  # Auto-detect client, General Knowledge
    quiz --preset \"Science & Nature\"      # Pick a preset topic
    quiz --topic \"Roman aqueducts\" -d hard # Custom topic
    quiz --client mock                    # Offline demo questions")]
struct Args {
    /// Set client type: gemini, claude, deepseek, mock [default: auto-detect]
    #[arg(short, long)]
    client: Option<ClientType>,

    /// Custom topic; takes precedence over --preset unless blank
    #[arg(short, long)]
    topic: Option<String>,

    /// Preset topic label, e.g. "Technology"
    #[arg(short, long, value_parser = parse_preset)]
    preset: Option<PresetTopic>,

    /// Question difficulty: easy, medium, hard
    #[arg(short, long)]
    difficulty: Option<Difficulty>,

    /// Accept whatever the model returns instead of enforcing 5 questions with 4 options
    #[arg(long)]
    lenient: bool,

    /// Give up on generation after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_preset(label: &str) -> Result<PresetTopic, String> {
    PresetTopic::from_label(label).ok_or_else(|| {
        let known: Vec<&str> = PresetTopic::ALL.iter().map(PresetTopic::label).collect();
        format!("Unknown preset '{}'. Supported: {}", label, known.join(", "))
    })
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// What the user pressed while a question or explanation was on screen
enum Input {
    Option(usize),
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut app = AppConfig::from_env().context("Invalid QUIZ_* configuration")?;
    if let Some(client) = args.client {
        app.client = client;
    }
    if let Some(difficulty) = args.difficulty {
        app.difficulty = difficulty;
    }
    if let Some(secs) = args.timeout_secs {
        app.timeout = Duration::from_secs(secs);
    }
    if args.lenient {
        app.validation = ValidationMode::Lenient;
    }
    debug!(?app, "Resolved configuration");

    let client = FlexibleClient::from_type(app.client, true)
        .with_context(|| format!("Could not set up the {} client", app.client))?;

    let generator = QuizGenerator::new(client, app.generator_config());
    let controller = QuizController::new(Arc::new(generator)).with_difficulty(app.difficulty);

    let mut selection = TopicSelection::default();
    if let Some(preset) = args.preset {
        selection.select_preset(preset);
    }
    if let Some(topic) = args.topic {
        selection.custom = topic;
    }

    loop {
        let topic = selection.resolve();
        println!("Generating {} questions about \"{}\"...", app.difficulty, topic);
        controller.start(selection.clone()).await?;

        let state = controller.snapshot();
        match state.phase {
            Phase::Playing => {
                if !play_round(&controller)? {
                    break;
                }
            }
            Phase::Error => println!("{}", failure_message(state.failure)),
            phase => debug!(?phase, "Round did not start"),
        }

        print!("\nPlay again? (y/N): ");
        io::stdout().flush()?;
        let again = matches!(read_key()?, Some(KeyCode::Char('y' | 'Y')));
        println!();
        controller.reset();
        if !again {
            break;
        }
    }

    Ok(())
}

fn failure_message(kind: Option<FailureKind>) -> &'static str {
    match kind {
        Some(FailureKind::Empty) => "The model returned no questions. Please try again.",
        Some(FailureKind::Malformed) => "The model returned a quiz that could not be used. Please try again.",
        Some(FailureKind::Transport) | None => {
            "Failed to generate quiz. Please check your API key and try again."
        }
    }
}

/// Play the loaded round to the end. Returns `false` if the user quit.
fn play_round(controller: &QuizController) -> Result<bool> {
    loop {
        let state = controller.snapshot();
        if state.phase == Phase::Finished {
            if let Some(summary) = controller.summary() {
                println!("\n=== {} ===", summary.verdict);
                println!("Topic:    {}", summary.topic);
                println!("Score:    {} / {}", summary.score, summary.total);
                println!("Accuracy: {}%", summary.accuracy_percent);
            }
            return Ok(true);
        }
        let Some(question) = state.current_question() else {
            return Ok(true);
        };

        println!(
            "\n[{:>3}%] Question {} of {}",
            progress_percent(&state),
            state.current_index + 1,
            state.total()
        );
        println!("{}", question.prompt);
        for (i, option) in question.options.iter().enumerate() {
            println!("  {}. {}", i + 1, option);
        }

        let choice = loop {
            print!("Your answer (1-{}, q to quit): ", question.options.len());
            io::stdout().flush()?;
            match read_input(question.options.len())? {
                Input::Option(index) => break index,
                Input::Quit => {
                    controller.reset();
                    return Ok(false);
                }
                Input::Continue => println!(),
            }
        };
        controller.answer(choice)?;

        let state = controller.snapshot();
        if let Some(question) = state.current_question() {
            println!();
            for (i, option) in question.options.iter().enumerate() {
                let mark = match option_mark(question, state.selected_option_index, i) {
                    OptionMark::Correct => "[correct]",
                    OptionMark::Wrong => "[wrong]  ",
                    OptionMark::Pending | OptionMark::Dimmed => "         ",
                };
                println!("  {} {}. {}", mark, i + 1, option);
            }
            println!("\n{}", question.explanation);
        }

        print!("\nPress any key: {} (q to quit) ", advance_label(&state));
        io::stdout().flush()?;
        if let Input::Quit = read_input(0)? {
            controller.reset();
            return Ok(false);
        }
        println!();
        controller.advance()?;
    }
}

/// Read one keystroke, falling back to a line of input when the terminal has no raw mode.
fn read_key() -> Result<Option<KeyCode>> {
    match read_single_key(KEY_WAIT) {
        Ok(key) => Ok(key),
        Err(e) => {
            debug!(error = %e, "Raw key input unavailable, reading a line");
            let mut line = String::new();
            if io::stdin().read_line(&mut line)? == 0 {
                return Ok(Some(KeyCode::Esc));
            }
            Ok(Some(match line.trim().chars().next() {
                Some(c) => KeyCode::Char(c),
                None => KeyCode::Enter,
            }))
        }
    }
}

/// Interpret a keystroke as an option number in `1..=options`, quit, or anything else.
fn read_input(options: usize) -> Result<Input> {
    let input = match read_key()? {
        Some(KeyCode::Esc | KeyCode::Char('q' | 'Q')) => Input::Quit,
        Some(KeyCode::Char(c)) => match c.to_digit(10).map(|d| d as usize) {
            Some(n) if (1..=options).contains(&n) => {
                println!("{}", c);
                Input::Option(n - 1)
            }
            _ => Input::Continue,
        },
        _ => Input::Continue,
    };
    Ok(input)
}
