//! intent-probe CLI: interactive object-action intention recognition.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};

use intent_probe::catalog::Action;
use intent_probe::config::FileConfig;
use intent_probe::engine::Engine;
use intent_probe::export::{CandidateExport, CellExport, NetworkExport};
use intent_probe::paths::IntentPaths;
use intent_probe::query::{IntentOracle, Outcome, QuerySession};
use intent_probe::scene::{Scene, SceneList};

#[derive(Parser)]
#[command(name = "intent-probe", version, about = "Interactive object-action intention recognition")]
struct Cli {
    /// Config file (defaults to the XDG config location).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Template store file, overriding the config.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or reset the learned templates.
    Templates {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Ask yes/no questions about one scene until an intention is confirmed.
    Ask {
        /// Scene-list file.
        scenes: PathBuf,

        /// Scene index within the list.
        #[arg(long, default_value = "0")]
        index: usize,
    },

    /// Replay scenes with automatic answers for a known intention.
    Replay {
        /// Scene-list file.
        scenes: PathBuf,

        /// Target instance name, e.g. "Box1".
        #[arg(long)]
        object: String,

        /// Target action, e.g. "Grasp".
        #[arg(long)]
        action: String,

        /// Replay only this scene instead of the whole list.
        #[arg(long)]
        index: Option<usize>,

        /// Batch-average each scene into the templates and save them.
        #[arg(long)]
        learn: bool,
    },

    /// Dump a scene's intention network.
    Network {
        /// Scene-list file.
        scenes: PathBuf,

        #[arg(long, default_value = "0")]
        index: usize,

        #[arg(long, value_enum, default_value = "dot")]
        format: NetworkFormat,
    },

    /// Export a ranked candidate list as JSON.
    Candidates {
        /// Scene-list file. Not needed with `--catalog`.
        #[arg(required_unless_present = "catalog")]
        scenes: Option<PathBuf>,

        #[arg(long, default_value = "0")]
        index: usize,

        /// Unranked candidates over the whole catalog instead of the scene.
        #[arg(long)]
        catalog: bool,
    },
}

#[derive(Subcommand)]
enum TemplateAction {
    /// Print every template.
    Show {
        /// Print JSON instead of the store file format.
        #[arg(long)]
        json: bool,
    },
    /// Reset every template to the default prior and save.
    Reset,
}

#[derive(Clone, Copy, ValueEnum)]
enum NetworkFormat {
    Dot,
    Json,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut engine = open_engine(cli.config.as_deref(), cli.store)?;

    match cli.command {
        Commands::Templates { action } => match action {
            TemplateAction::Show { json } => {
                if json {
                    let cells = CellExport::from_store(engine.store());
                    println!("{}", serde_json::to_string_pretty(&cells).into_diagnostic()?);
                } else {
                    print!("{}", engine.store().render());
                }
            }
            TemplateAction::Reset => {
                engine.reset_templates();
                engine.persist().into_diagnostic()?;
                println!("Reset {} templates to the default prior.", engine.store().len());
            }
        },

        Commands::Ask { scenes, index } => {
            let list = SceneList::load(&scenes).into_diagnostic()?;
            let scene = list.get(index).into_diagnostic()?;
            let (_, mut session) = engine.start_session(scene).into_diagnostic()?;
            ask(&mut engine, &mut session)?;
        }

        Commands::Replay {
            scenes,
            object,
            action,
            index,
            learn,
        } => {
            let action: Action = action.parse().into_diagnostic()?;
            let oracle = IntentOracle::new(object, action);
            let list = SceneList::load(&scenes).into_diagnostic()?;
            let selected: Vec<(usize, &Scene)> = match index {
                Some(i) => vec![(i, list.get(i).into_diagnostic()?)],
                None => list.scenes().iter().enumerate().collect(),
            };

            let mut total = 0;
            for (i, scene) in selected {
                let mut prepared = engine.prepare(scene).into_diagnostic()?;
                let mut session = prepared.session();
                let outcome = session
                    .run(&oracle, engine.store_mut())
                    .into_diagnostic()?;
                total += session.asked();
                match outcome {
                    Outcome::Resolved(intention) => println!(
                        "scene {i}: {intention} after {} of {} questions",
                        session.asked(),
                        session.initial_len()
                    ),
                    _ => println!(
                        "scene {i}: exhausted after {} of {} questions",
                        session.asked(),
                        session.initial_len()
                    ),
                }
                if learn {
                    let updated = engine
                        .learn_from_scene(&mut prepared.graph)
                        .into_diagnostic()?;
                    tracing::debug!(scene = i, updated, "scene learned");
                }
            }
            println!("total questions: {total}");
            engine.persist().into_diagnostic()?;
        }

        Commands::Network {
            scenes,
            index,
            format,
        } => {
            let list = SceneList::load(&scenes).into_diagnostic()?;
            let prepared = engine
                .prepare(list.get(index).into_diagnostic()?)
                .into_diagnostic()?;
            match format {
                NetworkFormat::Dot => print!("{}", prepared.graph.network.to_dot()),
                NetworkFormat::Json => {
                    let export =
                        NetworkExport::from_network(&prepared.graph.network, prepared.beliefs.as_ref());
                    println!("{}", serde_json::to_string_pretty(&export).into_diagnostic()?);
                }
            }
        }

        Commands::Candidates {
            scenes,
            index,
            catalog,
        } => {
            let candidates = match scenes {
                Some(scenes) if !catalog => {
                    let list = SceneList::load(&scenes).into_diagnostic()?;
                    engine
                        .prepare(list.get(index).into_diagnostic()?)
                        .into_diagnostic()?
                        .candidates
                }
                _ => engine.catalog_candidates().into_diagnostic()?,
            };
            let export: Vec<CandidateExport> = candidates.iter().map(CandidateExport::from).collect();
            println!("{}", serde_json::to_string_pretty(&export).into_diagnostic()?);
        }
    }

    Ok(())
}

/// Load the config file and build an engine whose store is always file-backed.
fn open_engine(config: Option<&Path>, store: Option<PathBuf>) -> Result<Engine> {
    let paths = IntentPaths::resolve().into_diagnostic()?;
    let config_file = config.map(Path::to_path_buf).unwrap_or_else(|| paths.config_file());
    let file = FileConfig::load_or_default(&config_file).into_diagnostic()?;

    let mut engine_config = file.to_engine_config(&paths);
    if let Some(store) = store {
        engine_config.store_path = Some(store);
    }
    Engine::new(engine_config).into_diagnostic()
}

/// Put questions to the terminal until the session ends. `q` cancels.
fn ask(engine: &mut Engine, session: &mut QuerySession) -> Result<()> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let question = session.select_query().into_diagnostic()?.question();
        print!("{question} [y/n/q] ");
        std::io::stdout().flush().into_diagnostic()?;

        // EOF cancels like `q`.
        let answer = match lines.next().transpose().into_diagnostic()? {
            Some(line) => line.trim().to_ascii_lowercase(),
            None => "q".to_string(),
        };
        let accepted = match answer.as_str() {
            "y" | "yes" => true,
            "n" | "no" => false,
            "q" | "quit" => {
                session.cancel().into_diagnostic()?;
                println!("Cancelled after {} questions.", session.asked());
                return Ok(());
            }
            _ => {
                println!("Please answer y, n or q.");
                continue;
            }
        };

        match engine.evaluate(session, accepted).into_diagnostic()? {
            Outcome::Continue => continue,
            Outcome::Resolved(intention) => {
                println!("You want to {intention} ({} questions).", session.asked());
                engine.persist().into_diagnostic()?;
                return Ok(());
            }
            Outcome::Exhausted => {
                println!("No candidates left after {} questions.", session.asked());
                return Ok(());
            }
        }
    }
}
