use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use biblion_core::{DirectoryStore, PublicationConfig, StaticRegistry};
use biblion_science::{JsonLinesSink, Pipeline, presets};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "biblion",
    about = "Resolve fetched publication content into validated bibliographic records",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Publication config (TOML). Defaults to ~/.config/biblion/publication.toml.
    #[arg(long, global = true, env = "BIBLION_CONFIG")]
    config: Option<PathBuf>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one pass over a fetched collection and print emitted records
    /// as JSON lines.
    Run {
        /// Directory holding the fetched collection.
        #[arg(long)]
        root: PathBuf,

        /// Identifier prefix of files under the root. Defaults to the
        /// collection's base_url.
        #[arg(long)]
        base_url: Option<String>,

        /// Registry file (TOML, `[[entry]]` tables).
        #[arg(long)]
        registry: Option<PathBuf>,

        /// Worker threads for per-article processing.
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Show the canonical key and roles of one identifier.
    Classify { identifier: String },

    /// List the articles a collection assembles into, without extracting.
    Articles {
        #[arg(long)]
        root: PathBuf,
        #[arg(long)]
        base_url: Option<String>,
    },

    /// List built-in schemas, or print one as TOML.
    Presets { name: Option<String> },
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            root,
            base_url,
            registry,
            workers,
        } => {
            let start = Instant::now();
            let config = load_config(cli.config.as_deref())?;
            let registry = match registry {
                Some(path) => StaticRegistry::load_from(&path)
                    .with_context(|| format!("cannot load registry {}", path.display()))?,
                None => StaticRegistry::default(),
            };
            let mut pipeline = Pipeline::build(&config, &registry)
                .with_context(|| format!("invalid publication config '{}'", config.name))?;
            if let Some(workers) = workers {
                pipeline = pipeline.with_workers(workers);
            }
            let store = open_store(&root, base_url.as_deref(), &config)?;

            let sink = JsonLinesSink::new(BufWriter::new(std::io::stdout()));
            let report = pipeline.run(&store, &sink).context("pass failed")?;
            sink.into_inner().flush().context("cannot flush output")?;

            info!(
                "pass finished in {:.1}s with {} worker(s)",
                start.elapsed().as_secs_f64(),
                pipeline.workers()
            );
            if cli.json {
                eprintln!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                eprintln!("{report}");
            }
        }

        Commands::Classify { identifier } => {
            let config = load_config(cli.config.as_deref())?;
            let pipeline = Pipeline::build(&config, &StaticRegistry::default())?;
            let class = pipeline.classify(&identifier);

            if cli.json {
                print_json(&serde_json::json!({
                    "identifier": identifier,
                    "key": class.as_ref().map(|c| c.key.as_str()),
                    "roles": class.as_ref().map(|c| c.roles.clone()).unwrap_or_default(),
                }))?;
            } else {
                match class {
                    Some(class) => {
                        let roles: Vec<String> = class.roles.iter().map(|r| r.to_string()).collect();
                        println!("{}  {}", class.key, roles.join(", "));
                    }
                    None => println!("out of scope: {identifier}"),
                }
            }
        }

        Commands::Articles { root, base_url } => {
            let config = load_config(cli.config.as_deref())?;
            let pipeline = Pipeline::build(&config, &StaticRegistry::default())?;
            let store = open_store(&root, base_url.as_deref(), &config)?;

            for article in pipeline.articles(&store) {
                let full_text = article.full_text().map(|r| r.identifier().to_string());
                if cli.json {
                    let roles: serde_json::Map<String, serde_json::Value> = article
                        .roles()
                        .map(|(role, res)| (role.to_string(), res.identifier().into()))
                        .collect();
                    println!(
                        "{}",
                        serde_json::json!({
                            "key": article.key(),
                            "full_text": full_text,
                            "roles": roles,
                        })
                    );
                } else {
                    println!("{}", article.key());
                    for (role, res) in article.roles() {
                        let marker = if Some(role) == article.full_text_role() { "*" } else { " " };
                        println!("  {marker} {:<28} {}", role.as_str(), res.identifier());
                    }
                }
            }
        }

        Commands::Presets { name: None } => {
            if cli.json {
                let list: Vec<_> = presets::PRESETS
                    .iter()
                    .map(|p| serde_json::json!({ "name": p.name, "description": p.description }))
                    .collect();
                print_json(&serde_json::Value::Array(list))?;
            } else {
                for preset in &presets::PRESETS {
                    println!("{:<16} {}", preset.name, preset.description);
                }
            }
        }

        Commands::Presets { name: Some(name) } => {
            let Some(preset) = presets::lookup(&name) else {
                bail!("unknown preset '{name}', see `biblion presets`");
            };
            let definition = preset.definition();
            if cli.json {
                print_json(&serde_json::to_value(&definition)?)?;
            } else {
                print!("{}", toml::to_string_pretty(&definition)?);
            }
        }
    }

    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> Result<PublicationConfig> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(PublicationConfig::config_path);
    if !path.exists() {
        bail!("publication config {} does not exist", path.display());
    }
    PublicationConfig::load_from(&path)
        .with_context(|| format!("cannot load publication config {}", path.display()))
}

fn open_store(root: &Path, base_url: Option<&str>, config: &PublicationConfig) -> Result<DirectoryStore> {
    let base_url = base_url.unwrap_or(&config.params.base_url);
    DirectoryStore::new(root, base_url)
        .with_context(|| format!("cannot open collection at {}", root.display()))
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}
