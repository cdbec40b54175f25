use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use rustyline::highlight::Highlighter;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::info;
use tracing_subscriber::EnvFilter;
use worldclock::catalog;
use worldclock::prelude::*;
use worldclock::{ENGINE_NAME, VERSION as LIB_VERSION};

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct ShellHighlighter;

impl Highlighter for ShellHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            Cow::Owned(format!("{} {}", command.yellow().bold(), rest.yellow()))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    const LOGO_TEXT: &str = include_str!("../logo.log");
    println!("{}", LOGO_TEXT.cyan());

    let rule = "-".repeat(72);
    println!("{}", rule.dimmed());
    println!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    println!("{}", rule.dimmed());
}

fn print_help() {
    println!("Available commands:");
    println!("  list                          - Lists tracked cities with their numbers.");
    println!("  show                          - Shows every clock once.");
    println!("  detail <N>                    - Shows one city with its images.");
    println!("  catalog [QUERY]               - Browses the popular-city catalog.");
    println!("  add <CATALOG NAME>            - Adds a city from the catalog.");
    println!("  add custom <NAME> <TZ> <CONT> - Adds any city; use '_' for spaces in NAME.");
    println!("  remove <N>                    - Removes city number N.");
    println!("  style | 24h | seconds         - Toggles a clock setting.");
    println!("  watch | unwatch               - Starts or stops live clock updates.");
    println!("  reset                         - Restores the default cities and settings.");
    println!("  exit                          - Quits the shell.");
}

fn print_settings(settings: &ClockSettings) {
    println!(
        "--> style: {:?}, 24h: {}, seconds: {}",
        settings.style, settings.use24h, settings.show_seconds
    );
}

fn print_reading(reading: &ClockReading) {
    let display = match &reading.display {
        ClockDisplay::Unavailable { .. } => reading.display.to_string().red().to_string(),
        other => other.to_string().green().to_string(),
    };
    println!("  {:<20} {}", reading.name.bold(), display);
}

/// Parses a 1-based city number into an index into `state.cities`.
fn city_at<'a>(state: &'a AppState, arg: Option<&&str>) -> Option<&'a City> {
    let n = arg?.parse::<usize>().ok()?;
    state.cities.get(n.checked_sub(1)?)
}

/// Prints frames for the watched view as they arrive.
fn spawn_frame_printer(engine: &WorldClockEngine) {
    let mut frame_rx = engine.subscribe_frames();
    tokio::spawn(async move {
        loop {
            match frame_rx.recv().await {
                Ok(frame) => {
                    if let FrameContent::Overview(readings) = &frame.content {
                        println!(
                            "\n<-- [TICK #{}] {}",
                            frame.tick_count,
                            frame.timestamp.format("%H:%M:%S UTC")
                        );
                        readings.iter().for_each(print_reading);
                    }
                }
                Err(RecvError::Lagged(skipped)) => println!("<-- skipped {} frames", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    let config_path = env::args_os().nth(1).map(PathBuf::from);
    let config = WorldClockConfig::load(config_path.as_deref())?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let engine = WorldClockEngine::from_config(config)?;
    let engine_handle = engine.clone();
    spawn_frame_printer(&engine_handle);

    info!("Spawning {} in the background...", ENGINE_NAME.cyan());
    tokio::spawn(async move {
        if let Err(e) = engine.run().await {
            eprintln!("\nEngine stopped with an error: {}", e);
        }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut watching: Option<ViewId> = None;

    let mut rl: Editor<ShellHighlighter, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(ShellHighlighter));

    println!("{} is running. Type 'help' for commands or 'exit' to quit.", ENGINE_NAME.cyan());

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(_) => {
                println!("Exiting clockshell...");
                break;
            }
        };
        rl.add_history_entry(line.as_str())?;
        let args = line.split_whitespace().collect::<Vec<_>>();
        let Some(command) = args.first() else {
            continue;
        };

        match *command {
            "list" => {
                let state = engine_handle.state().await;
                println!("Tracked cities:");
                for (i, city) in state.cities.iter().enumerate() {
                    println!("  #{:<3} {:<20} {}", i + 1, city.name, city.tz.dimmed());
                }
            }
            "show" => {
                let state = engine_handle.state().await;
                let now = Utc::now();
                for city in &state.cities {
                    print_reading(&ClockReading::for_city(city, &state.settings, now));
                }
            }
            "detail" => {
                let state = engine_handle.state().await;
                match city_at(&state, args.get(1)) {
                    Some(city) => {
                        print_reading(&ClockReading::for_city(city, &state.settings, Utc::now()));
                        println!("  zone:  {}", city.tz);
                        println!("  hero:  {}", city.hero_image().dimmed());
                        for url in city.images().iter().skip(1) {
                            println!("         {}", url.dimmed());
                        }
                    }
                    None => println!("Usage: detail <N>, where N comes from 'list'."),
                }
            }
            "catalog" => {
                let query = args[1..].join(" ");
                let sections = catalog::grouped(&query);
                if sections.is_empty() {
                    println!("No cities match '{}'.", query);
                }
                for (continent, options) in sections {
                    println!("{}", continent.label().cyan().bold());
                    for option in options {
                        println!("  {:<20} {}", option.name, option.tz.dimmed());
                    }
                }
            }
            "add" => {
                let result = if args.get(1) == Some(&"custom") {
                    match (args.get(2), args.get(3), args.get(4)) {
                        (Some(name), Some(tz), Some(continent)) => {
                            match continent.parse::<Continent>() {
                                Ok(continent) => {
                                    engine_handle
                                        .add_city(NewCity {
                                            name: name.replace('_', " "),
                                            tz: tz.to_string(),
                                            continent,
                                        })
                                        .await
                                }
                                Err(e) => {
                                    println!("Error: {}.", e);
                                    continue;
                                }
                            }
                        }
                        _ => {
                            println!("Usage: add custom <NAME> <TZ> <CONTINENT>");
                            continue;
                        }
                    }
                } else {
                    let name = args[1..].join(" ");
                    match catalog::find(&name) {
                        Some(option) => engine_handle.add_from_catalog(option).await,
                        None => {
                            println!(
                                "'{}' is not in the catalog. Try 'catalog' or 'add custom'.",
                                name
                            );
                            continue;
                        }
                    }
                };
                match result {
                    Ok(_) => println!("--> City added."),
                    Err(e) => println!("Error: {}.", e),
                }
            }
            "remove" => {
                let state = engine_handle.state().await;
                match city_at(&state, args.get(1)) {
                    Some(city) => {
                        if engine_handle.remove_city(&city.id).await {
                            println!("--> Removed {}.", city.name);
                        }
                    }
                    None => println!("Usage: remove <N>, where N comes from 'list'."),
                }
            }
            "style" => print_settings(&engine_handle.toggle_style().await),
            "24h" => print_settings(&engine_handle.toggle_24h().await),
            "seconds" => print_settings(&engine_handle.toggle_seconds().await),
            "watch" => {
                if watching.is_some() {
                    println!("--> Already watching.");
                } else {
                    watching = Some(engine_handle.attach_view(ViewKind::Overview).await);
                    println!("--> Watching clocks. Type 'unwatch' to stop.");
                }
            }
            "unwatch" => match watching.take() {
                Some(id) => {
                    engine_handle.detach_view(id).await;
                    println!("--> Stopped watching.");
                }
                None => println!("--> Not watching."),
            },
            "reset" => {
                engine_handle.reset().await;
                println!("--> Restored the default cities and settings.");
            }
            "help" => print_help(),
            "exit" => break,
            _ => println!("Unknown command: '{}'. Type 'help'.", line.trim()),
        }
    }

    Ok(())
}
