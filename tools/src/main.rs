use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use codec::{ClientLimits, ClientSession};
use glob::Pattern;
use qsnap_tools::{
    decode_messages, describe_fields, format_decode_pretty, format_inspect, inspect_messages,
    read_demo, synthesize, write_demo, DemoMessage, SynthConfig,
};
use schema::NetFields;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "qsnap-tools",
    version,
    about = "qsnap demo inspection and decoding tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct TableArgs {
    /// Entity field table JSON (stock table when omitted).
    #[arg(long)]
    entity_fields: Option<PathBuf>,
    /// Player field table JSON (stock table when omitted).
    #[arg(long)]
    player_fields: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize every message of a demo, or of each demo in a directory.
    Inspect {
        /// Demo file or directory of demos.
        demo_path: PathBuf,
        /// Optional glob filter when inspecting a directory.
        #[arg(long)]
        glob: Option<String>,
        /// Sort inspected demos.
        #[arg(long, value_enum)]
        sort: Option<InspectSort>,
        /// Limit the number of inspected demos (after sorting).
        #[arg(long)]
        limit: Option<usize>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
        #[command(flatten)]
        tables: TableArgs,
    },
    /// Decode committed snapshots into named field values.
    Decode {
        /// Demo file.
        demo_file: PathBuf,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        #[command(flatten)]
        tables: TableArgs,
    },
    /// Print a field table and its fingerprint.
    Fields {
        #[arg(long, value_enum, default_value_t = TableKind::Entity)]
        kind: TableKind,
        /// Output format; JSON can be fed back through --entity-fields/--player-fields.
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },
    /// Write a synthetic demo over the stock tables.
    Synth {
        /// Output demo file.
        out: PathBuf,
        #[arg(long, default_value_t = 64)]
        frames: usize,
        #[arg(long, default_value_t = 32, value_parser = clap::value_parser!(u16).range(0..1000))]
        entities: u16,
        #[arg(long, default_value_t = 16)]
        keyframe_interval: usize,
        /// Leave every n-th snapshot out, as if lost.
        #[arg(long)]
        drop_every: Option<usize>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InspectSort {
    Size,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TableKind {
    Entity,
    Player,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Inspect {
            demo_path,
            glob,
            sort,
            limit,
            format,
            tables,
        } => {
            let paths = if demo_path.is_dir() {
                let mut entries = collect_demo_entries(&demo_path, glob.as_deref())?;
                if let Some(InspectSort::Size) = sort {
                    entries.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
                }
                let limit = limit.or(sort.map(|InspectSort::Size| 10));
                if let Some(limit) = limit {
                    entries.truncate(limit);
                }
                entries.into_iter().map(|entry| entry.path).collect()
            } else {
                vec![demo_path]
            };
            for path in paths {
                let messages = load_demo(&path)?;
                let mut session = new_session(&tables)?;
                let report = inspect_messages(&mut session, &messages);
                match format {
                    OutputFormat::Json => {
                        let json =
                            serde_json::to_string_pretty(&report).context("serialize json")?;
                        println!("{json}");
                    }
                    OutputFormat::Pretty => {
                        println!("== {} ==", path.display());
                        print!("{}", format_inspect(&report));
                    }
                }
            }
        }
        Command::Decode {
            demo_file,
            format,
            tables,
        } => {
            let messages = load_demo(&demo_file)?;
            let mut session = new_session(&tables)?;
            let output = decode_messages(&mut session, &messages);
            match format {
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&output).context("serialize json")?;
                    println!("{json}");
                }
                OutputFormat::Pretty => print!("{}", format_decode_pretty(&output)),
            }
        }
        Command::Fields { kind, format } => {
            let table = match kind {
                TableKind::Entity => schema::entity_fields(),
                TableKind::Player => schema::player_fields(),
            };
            match format {
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&table).context("serialize json")?;
                    println!("{json}");
                }
                OutputFormat::Pretty => print!("{}", describe_fields(&table)),
            }
        }
        Command::Synth {
            out,
            frames,
            entities,
            keyframe_interval,
            drop_every,
        } => {
            let config = SynthConfig {
                frames,
                entities,
                keyframe_interval,
                drop_every,
                ..SynthConfig::default()
            };
            let messages = synthesize(&config).context("synthesize demo")?;
            let bytes = write_demo(&messages);
            fs::write(&out, &bytes).with_context(|| format!("write demo {}", out.display()))?;
            info!(
                path = %out.display(),
                messages = messages.len(),
                bytes = bytes.len(),
                "wrote demo"
            );
        }
    }
    Ok(())
}

fn new_session(tables: &TableArgs) -> Result<ClientSession> {
    let entity_fields = match &tables.entity_fields {
        Some(path) => load_fields(path).context("load entity fields")?,
        None => schema::entity_fields(),
    };
    let player_fields = match &tables.player_fields {
        Some(path) => load_fields(path).context("load player fields")?,
        None => schema::player_fields(),
    };
    ClientSession::new(entity_fields, player_fields, ClientLimits::default())
        .context("create client session")
}

fn load_fields(path: &Path) -> Result<NetFields> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read field table {}", path.display()))?;
    serde_json::from_str(&contents).context("parse field table json")
}

fn load_demo(path: &Path) -> Result<Vec<DemoMessage>> {
    let bytes = fs::read(path).with_context(|| format!("read demo {}", path.display()))?;
    read_demo(&bytes, wire::protocol::MAX_MSGLEN)
        .with_context(|| format!("parse demo {}", path.display()))
}

struct DemoEntry {
    path: PathBuf,
    size: u64,
}

fn collect_demo_entries(dir: &Path, glob: Option<&str>) -> Result<Vec<DemoEntry>> {
    let mut entries = Vec::new();
    let pattern = match glob {
        Some(value) => Some(Pattern::new(value).context("invalid glob pattern")?),
        None => None,
    };

    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(pattern) = &pattern {
            let matches_path = pattern.matches_path(&path);
            let matches_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pattern.matches(name));
            if !matches_path && !matches_name {
                continue;
            }
        }
        let size = entry.metadata()?.len();
        entries.push(DemoEntry { path, size });
    }
    Ok(entries)
}
