//! rulesmith: convert security detection rules to D&R format through the
//! remote AI-backed tool service.

mod console;
mod credentials;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use console::ConsoleSink;
use credentials::ResolvedCredentials;
use rulesmith_core::{render_report, BatchSettings, DEFAULT_WORKERS};
use rulesmith_engine::{
    enumerate_rule_files, ensure_output_dir, mask_key, BatchScheduler, CancelFlag,
    ConnectionParams, HttpTransport, OutputSink, RuleConverter, ToolRegistry, ToolTransport,
    TransportSettings, DETECTION_TOOL, RESPONSE_TOOL,
};
use rulesmith_logging::LogDestination;

const DEFAULT_ENDPOINT: &str = "https://mcp.limacharlie.io/mcp";

#[derive(Parser)]
#[command(name = "rulesmith", version, about = "Convert security rules to D&R format")]
struct Cli {
    /// Enable debug logging.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert every rule file in a directory.
    Convert(ConvertArgs),
    /// Check credentials, connectivity and tool availability.
    Verify(ConnectionArgs),
}

#[derive(clap::Args)]
struct ConnectionArgs {
    /// Organization ID; falls back to LC_OID or ~/.limacharlie.
    #[arg(long)]
    oid: Option<String>,
    /// API key; falls back to LC_API_KEY or ~/.limacharlie.
    #[arg(long)]
    api_key: Option<String>,
    /// Optional user ID scope.
    #[arg(long)]
    uid: Option<String>,
    /// Tool service endpoint.
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
}

#[derive(clap::Args)]
struct ConvertArgs {
    #[command(flatten)]
    connection: ConnectionArgs,
    /// Source platform name (e.g. okta, crowdstrike).
    #[arg(long)]
    platform: String,
    /// Directory containing the source rules.
    #[arg(long)]
    rules_dir: PathBuf,
    /// Output directory (default: {rules-dir}/output).
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Number of parallel workers (1-50).
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    parallel_workers: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    rulesmith_logging::initialize(LogDestination::Terminal, cli.verbose);

    match cli.command {
        Command::Convert(args) => run_convert(args).await,
        Command::Verify(args) => run_verify(args).await,
    }
}

fn build_transport(
    args: &ConnectionArgs,
    creds: &ResolvedCredentials,
) -> anyhow::Result<Arc<dyn ToolTransport>> {
    let params = ConnectionParams {
        endpoint: args.endpoint.clone(),
        oid: creds.oid.clone(),
        api_key: creds.api_key.clone(),
        uid: creds.uid.clone(),
    };
    let transport = HttpTransport::new(params, TransportSettings::default())?;
    Ok(Arc::new(transport))
}

async fn run_convert(args: ConvertArgs) -> anyhow::Result<()> {
    // Validate configuration before any network activity.
    let settings = BatchSettings::new(args.parallel_workers)?;
    let creds = credentials::resolve(
        args.connection.oid.clone(),
        args.connection.api_key.clone(),
        args.connection.uid.clone(),
    )?;
    log::info!(
        "using credentials from {} (oid {}, key {})",
        creds.source,
        creds.oid,
        mask_key(&creds.api_key)
    );

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| args.rules_dir.join("output"));
    ensure_output_dir(&output_dir)?;
    let items = enumerate_rule_files(&args.rules_dir, Some(&output_dir))?;
    if items.is_empty() {
        println!("No rule files found in {}", args.rules_dir.display());
        return Ok(());
    }

    let transport = build_transport(&args.connection, &creds)?;
    transport
        .handshake()
        .await
        .context("failed to establish a session with the tool service")?;
    let registry = Arc::new(
        ToolRegistry::discover(transport.as_ref())
            .await
            .context("tool discovery failed; no conversion was attempted")?,
    );

    let output_sink = OutputSink::new(output_dir.clone());
    let converter = RuleConverter::new(
        transport,
        registry,
        output_sink.clone(),
        args.platform.to_lowercase(),
    )
    .context("required generation tools are missing on the service")?;
    let scheduler = BatchScheduler::new(Arc::new(converter), settings);

    // Ctrl-C stops new dispatches; in-flight conversions finish and are
    // still reported.
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("interrupt received; finishing in-flight conversions");
                cancel.cancel();
            }
        });
    }

    println!(
        "Processing {} rule file(s) with {} parallel worker(s)\n",
        items.len(),
        settings.workers()
    );
    let progress = Arc::new(ConsoleSink::new(items.len()));
    let summary = scheduler.run(items, progress, &cancel).await;

    let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let report = render_report(&summary, &generated);
    let report_path = output_sink.write_report(&report)?;

    println!("\nConversion complete!");
    println!(
        "Converted: {}/{} rules, failed: {}",
        summary.succeeded, summary.total, summary.failed
    );
    println!("See {} for details", report_path.display());
    Ok(())
}

async fn run_verify(args: ConnectionArgs) -> anyhow::Result<()> {
    let creds = credentials::resolve(args.oid.clone(), args.api_key.clone(), args.uid.clone())?;
    println!(
        "✓ Credentials found via {} (oid {}, key {})",
        creds.source,
        creds.oid,
        mask_key(&creds.api_key)
    );

    let transport = build_transport(&args, &creds)?;
    match transport.handshake().await {
        Ok(()) => println!("✓ Tool service reachable at {}", args.endpoint),
        Err(err) => {
            println!("✗ Cannot establish a session: {err}");
            anyhow::bail!("verification failed");
        }
    }

    let registry = match ToolRegistry::discover(transport.as_ref()).await {
        Ok(registry) => {
            println!("✓ Discovered {} tool(s)", registry.len());
            registry
        }
        Err(err) => {
            println!("✗ Tool discovery failed: {err}");
            anyhow::bail!("verification failed");
        }
    };

    let mut missing = false;
    for tool in [DETECTION_TOOL, RESPONSE_TOOL] {
        match registry.resolve(tool) {
            Ok(_) => println!("✓ Found {tool}"),
            Err(_) => {
                println!("✗ Missing {tool} (are AI features enabled for this organization?)");
                missing = true;
            }
        }
    }
    if missing {
        anyhow::bail!("verification failed");
    }
    println!("\nEnvironment looks good; you can run `rulesmith convert`.");
    Ok(())
}
