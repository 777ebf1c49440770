//! Command-line front end.
//!
//! `crawl` walks downstream lineage from a schema or explicit tables and
//! saves the graph; `impact` answers "what breaks if I change this table"
//! from a saved graph.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Args, Parser, Subcommand};
use console::style;
use tokio_util::sync::CancellationToken;

use crate::catalog::UnityCatalogClient;
use crate::config::{load_config, ImpactConfig};
use crate::crawler::{CrawlReport, CrawlStatus, Crawler, Roots};
use crate::error::{ImpactError, Result};
use crate::graph::analysis::{contacts_to_notify, detect_cycles, downstream_closure};
use crate::output::{read_graph, write_graph, DEFAULT_OUTPUT};
use crate::types::AssetId;

#[derive(Debug, Parser)]
#[command(
    name = "lineage-impact",
    version,
    about = "Discover downstream dependencies in Unity Catalog and analyse change impact"
)]
pub struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Crawl downstream lineage and save it as JSON.
    Crawl(CrawlArgs),
    /// List everything downstream of an asset in a saved graph.
    Impact(ImpactArgs),
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("roots").required(true).args(["catalog", "root"])))]
pub struct CrawlArgs {
    /// Catalog whose schema supplies the root tables.
    #[arg(long, requires = "schema")]
    pub catalog: Option<String>,

    /// Schema whose tables are the crawl roots.
    #[arg(long, requires = "catalog")]
    pub schema: Option<String>,

    /// Explicit root table (catalog.schema.table); repeatable.
    #[arg(long = "root", value_name = "ASSET", conflicts_with_all = ["catalog", "schema"])]
    pub root: Vec<String>,

    /// Output file for the JSON graph.
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Delay between asset visits, in seconds.
    #[arg(long, value_name = "SECS")]
    pub delay: Option<f64>,

    /// Stop visiting new assets after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Workspace host URL (e.g. https://abc.cloud.databricks.com).
    #[arg(long)]
    pub host: Option<String>,

    /// Personal access token.
    #[arg(long)]
    pub token: Option<String>,

    /// YAML config file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ImpactArgs {
    /// Asset whose downstream impact to report.
    pub asset: String,

    /// Graph file written by `crawl`.
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub graph: PathBuf,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Dispatch a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Crawl(args) => run_crawl(args).await,
        Command::Impact(args) => run_impact(args),
    }
}

// ---------------------------------------------------------------------------
// crawl
// ---------------------------------------------------------------------------

impl CrawlArgs {
    pub fn roots(&self) -> Result<Roots> {
        match (&self.catalog, &self.schema) {
            (Some(catalog), Some(schema)) => Ok(Roots::schema(catalog, schema)),
            _ if !self.root.is_empty() => Ok(Roots::parse_assets(&self.root)?),
            _ => Err(ImpactError::Usage(
                "either --catalog/--schema or --root is required".to_string(),
            )),
        }
    }

    /// Overlay command-line flags onto loaded configuration.
    pub fn apply_to(&self, config: &mut ImpactConfig) -> Result<()> {
        if let Some(ref host) = self.host {
            config.catalog.host = Some(host.clone());
        }
        if let Some(ref token) = self.token {
            config.catalog.token = Some(token.clone());
        }
        if let Some(delay) = self.delay {
            let invalid = || {
                ImpactError::Usage(format!(
                    "--delay must be a non-negative number of seconds, got {delay}"
                ))
            };
            let pacing = Duration::try_from_secs_f64(delay).map_err(|_| invalid())?;
            config.crawl.pacing_ms = u64::try_from(pacing.as_millis()).map_err(|_| invalid())?;
        }
        if let Some(deadline) = self.deadline {
            config.crawl.deadline_secs = Some(deadline);
        }
        Ok(())
    }
}

async fn run_crawl(args: CrawlArgs) -> Result<()> {
    let roots = args.roots()?;
    let mut config = load_config(args.config.as_deref())?;
    args.apply_to(&mut config)?;

    let client = UnityCatalogClient::new(config.catalog_config()?)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current asset");
            on_interrupt.cancel();
        }
    });

    eprintln!(
        "\n{} Scanning downstream dependencies for {} ...\n",
        style("🔍").bold(),
        style(describe_roots(&roots)).cyan()
    );

    let report = Crawler::new(&client, config.crawl_options())
        .with_cancellation(cancel)
        .crawl(&roots)
        .await?;

    if report.graph.is_empty() && report.is_complete() {
        eprintln!("No tables found.");
        return Ok(());
    }

    write_graph(&args.output, &report.graph)?;
    print_summary(&report, &args.output);
    Ok(())
}

fn describe_roots(roots: &Roots) -> String {
    match roots {
        Roots::Schema { catalog, schema } => format!("{catalog}.{schema}"),
        Roots::Assets(ids) => ids
            .iter()
            .map(AssetId::as_str)
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn print_summary(report: &CrawlReport, output: &std::path::Path) {
    match report.status {
        CrawlStatus::Complete => eprintln!(
            "\n{} Completed. Found {} objects.",
            style("✅").green(),
            report.graph.len()
        ),
        CrawlStatus::Cancelled => eprintln!(
            "\n{} Cancelled. Saved {} objects crawled so far.",
            style("⚠").yellow(),
            report.graph.len()
        ),
        CrawlStatus::DeadlineExceeded => eprintln!(
            "\n{} Deadline reached. Saved {} objects crawled so far.",
            style("⚠").yellow(),
            report.graph.len()
        ),
    }
    if report.warning_count() > 0 {
        eprintln!(
            "{} {} lookups failed; affected nodes have partial data (see log).",
            style("⚠").yellow(),
            report.warning_count()
        );
    }
    eprintln!("📄 Results saved to {}\n", style(output.display()).bold());
}

// ---------------------------------------------------------------------------
// impact
// ---------------------------------------------------------------------------

fn run_impact(args: ImpactArgs) -> Result<()> {
    let graph = read_graph(&args.graph)?;
    let asset = AssetId::new(args.asset.trim());
    if !graph.contains(&asset) {
        return Err(ImpactError::Usage(format!(
            "{} is not in {}",
            asset,
            args.graph.display()
        )));
    }

    let impacted = downstream_closure(&graph, &asset);
    let contacts = contacts_to_notify(&graph, &asset);
    let cycles: Vec<_> = detect_cycles(&graph)
        .into_iter()
        .filter(|c| c.asset_ids.contains(&asset))
        .collect();

    if args.json {
        let value = serde_json::json!({
            "asset": asset,
            "impacted": impacted,
            "contacts": contacts,
            "cycles": cycles,
        });
        let text = serde_json::to_string_pretty(&value).map_err(|source| ImpactError::Json {
            path: args.graph.clone(),
            source,
        })?;
        println!("{text}");
        return Ok(());
    }

    println!(
        "{} downstream of {}",
        style(impacted.len()).bold(),
        style(&asset).cyan()
    );
    for item in &impacted {
        println!(
            "{}↳ {}  {}",
            "  ".repeat(item.depth as usize),
            item.id,
            style(item.contact.as_deref().unwrap_or("?")).dim()
        );
    }
    if !contacts.is_empty() {
        println!("\nContacts to notify:");
        for group in &contacts {
            println!("  {} ({} assets)", style(&group.contact).bold(), group.assets.len());
        }
    }
    for cycle in &cycles {
        println!(
            "\n{} {} is on a lineage cycle of {} assets",
            style("⚠").yellow(),
            asset,
            cycle.size
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("lineage-impact").chain(args.iter().copied()))
    }

    fn crawl_args(args: &[&str]) -> CrawlArgs {
        match parse(args).unwrap().command {
            Command::Crawl(a) => a,
            other => panic!("expected crawl, got {other:?}"),
        }
    }

    #[test]
    fn crawl_with_schema() {
        let args = crawl_args(&["crawl", "--catalog", "main", "--schema", "sales"]);
        assert_eq!(args.roots().unwrap(), Roots::schema("main", "sales"));
        assert_eq!(args.output, PathBuf::from(DEFAULT_OUTPUT));
    }

    #[test]
    fn crawl_with_explicit_roots() {
        let args = crawl_args(&["crawl", "--root", "a.b.c", "--root", "a.b.d"]);
        assert_eq!(
            args.roots().unwrap(),
            Roots::Assets(vec![AssetId::new("a.b.c"), AssetId::new("a.b.d")])
        );
    }

    #[test]
    fn crawl_rejects_unqualified_root() {
        let args = crawl_args(&["crawl", "--root", "orders"]);
        assert!(args.roots().is_err());
    }

    #[test]
    fn crawl_requires_some_roots() {
        assert!(parse(&["crawl"]).is_err());
        assert!(parse(&["crawl", "--catalog", "main"]).is_err());
        assert!(parse(&["crawl", "--catalog", "m", "--schema", "s", "--root", "a.b.c"]).is_err());
    }

    #[test]
    fn flags_override_config() {
        let args = crawl_args(&[
            "crawl",
            "--catalog",
            "m",
            "--schema",
            "s",
            "--host",
            "https://flag.example",
            "--delay",
            "0.05",
            "--deadline",
            "90",
        ]);
        let mut config = ImpactConfig::default();
        config.catalog.host = Some("https://file.example".into());
        args.apply_to(&mut config).unwrap();

        assert_eq!(config.catalog.host.as_deref(), Some("https://flag.example"));
        assert_eq!(config.crawl.pacing_ms, 50);
        assert_eq!(config.crawl.deadline_secs, Some(90));
    }

    #[test]
    fn negative_delay_is_rejected() {
        let args = crawl_args(&["crawl", "--catalog", "m", "--schema", "s", "--delay=-1"]);
        let mut config = ImpactConfig::default();
        assert!(matches!(
            args.apply_to(&mut config),
            Err(ImpactError::Usage(_))
        ));
    }

    #[test]
    fn oversized_delay_is_rejected() {
        let args = crawl_args(&["crawl", "--catalog", "m", "--schema", "s", "--delay", "1e18"]);
        let mut config = ImpactConfig::default();
        assert!(matches!(
            args.apply_to(&mut config),
            Err(ImpactError::Usage(_))
        ));
        assert_eq!(config.crawl.pacing_ms, ImpactConfig::default().crawl.pacing_ms);
    }

    #[test]
    fn impact_defaults() {
        let cli = parse(&["-v", "impact", "main.sales.orders"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Impact(a) => {
                assert_eq!(a.asset, "main.sales.orders");
                assert_eq!(a.graph, PathBuf::from(DEFAULT_OUTPUT));
                assert!(!a.json);
            }
            other => panic!("expected impact, got {other:?}"),
        }
    }

    #[test]
    fn describe_roots_lists_assets() {
        let roots = Roots::Assets(vec![AssetId::new("a.b.c"), AssetId::new("a.b.d")]);
        assert_eq!(describe_roots(&roots), "a.b.c, a.b.d");
        assert_eq!(describe_roots(&Roots::schema("m", "s")), "m.s");
    }
}
