//! edlcast - parse an edit decision list and publish its events on schedule.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use edlcast_edl::{AdjustmentTable, ClipCatalog, EdlParser, ParsedEdl};
use edlcast_publish::{
    HttpTranslator, JsonLinesSink, PassthroughTranslator, PublishConfig, RunReport, Scheduler,
    Translator,
};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "edlcast")]
#[command(version)]
#[command(about = "Publish EDL events as a timed, sequence-numbered record stream")]
#[command(long_about = "Parses a CMX-style edit decision list, resolves each clip to a \n\
    deliverable URL shortly before it airs, and writes one framed JSON record \n\
    per event as its record-in point approaches.\n\n\
    EXAMPLES:\n    \
    edlcast show.edl --clips clips.json\n    \
    edlcast show.edl --clips clips.json --adjustments offsets.csv -o stream.jsonl\n    \
    edlcast show.edl --clips clips.json --parse-only")]
struct Args {
    /// EDL file to publish
    edl: PathBuf,

    /// JSON catalog mapping clip titles to video identifiers
    #[arg(short, long)]
    clips: Option<PathBuf>,

    /// CSV of per-clip recorded start timecodes used to rebase source times
    #[arg(short, long)]
    adjustments: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds before record-in at which an event is published
    #[arg(long)]
    publish_lead: Option<u64>,

    /// Seconds before record-in at which an event's URL is resolved
    #[arg(long)]
    resolve_lead: Option<u64>,

    /// Skip the translation service and publish source URLs as-is
    #[arg(long)]
    offline: bool,

    /// Write records to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the parsed events as JSON and exit
    #[arg(long)]
    parse_only: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Suppress logging and the run summary
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Args {
    fn publish_config(&self) -> anyhow::Result<PublishConfig> {
        let mut config = match &self.config {
            Some(path) => PublishConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => PublishConfig::default(),
        };
        if let Some(secs) = self.publish_lead {
            config = config.with_publish_lead(secs);
        }
        if let Some(secs) = self.resolve_lead {
            config = config.with_resolve_lead(secs);
        }
        config.validate()?;
        Ok(config)
    }
}

type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn init_logging(args: &Args) -> Result<(), InitError> {
    if args.quiet {
        return Ok(());
    }
    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
}

fn parse_edl(args: &Args, config: &PublishConfig) -> anyhow::Result<ParsedEdl> {
    let catalog = match &args.clips {
        Some(path) => ClipCatalog::load(path)
            .with_context(|| format!("Failed to load clip catalog {}", path.display()))?,
        None => {
            warn!("No clip catalog given; events will publish without a source");
            ClipCatalog::new()
        }
    }
    .with_watch_url_base(config.watch_url_base.clone());

    let adjustments = match &args.adjustments {
        Some(path) => Some(
            AdjustmentTable::load(path)
                .with_context(|| format!("Failed to load adjustments {}", path.display()))?,
        ),
        None => None,
    };

    let text = std::fs::read_to_string(&args.edl)
        .with_context(|| format!("Failed to read {}", args.edl.display()))?;

    let mut parser = EdlParser::new(&catalog);
    if let Some(table) = &adjustments {
        parser = parser.with_adjustments(table);
    }
    let parsed = parser.parse(&text);

    for diagnostic in &parsed.diagnostics {
        warn!("{diagnostic}");
    }
    info!(
        title = parsed.title.as_deref().unwrap_or("-"),
        events = parsed.events.len(),
        skipped = parsed.diagnostics.len(),
        "Parsed EDL"
    );
    Ok(parsed)
}

fn print_summary(report: &RunReport) {
    eprintln!();
    eprintln!("Published {} record(s)", report.emitted);
    eprintln!("  Events:         {}", report.events);
    eprintln!("  Resolved:       {}", report.resolved);
    eprintln!("  Without source: {}", report.non_existent);
    if report.failed_deliveries > 0 {
        eprintln!("  Failed:         {}", report.failed_deliveries);
    }
    if let Some(sequence) = report.terminator_sequence {
        eprintln!("  End marker:     #{sequence}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Err(e) = init_logging(&args) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let config = args.publish_config()?;
    let parsed = parse_edl(&args, &config)?;

    if args.parse_only {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        serde_json::to_writer_pretty(&mut out, &parsed.events.sorted())?;
        writeln!(out)?;
        return Ok(());
    }

    if parsed.events.is_empty() {
        bail!("No events to publish in {}", args.edl.display());
    }

    let translator: Arc<dyn Translator> = if args.offline {
        info!("Offline mode; source URLs are published untranslated");
        Arc::new(PassthroughTranslator)
    } else {
        Arc::new(HttpTranslator::new(config.translation_service_url.clone()))
    };

    let writer: Box<dyn Write + Send> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout()),
    };
    let sink = JsonLinesSink::new(writer, config.name_prefix.clone(), config.freshness_ms);

    let mut scheduler = Scheduler::new(parsed.events, config, translator, sink)?;
    let report = scheduler.run().await?;

    if !args.quiet {
        print_summary(&report);
    }
    Ok(())
}
