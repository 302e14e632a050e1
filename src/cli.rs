//! Command-line surface: argument parsing, one context run, rendering.

use crate::config::{AnchorviewConfig, ConfigLoader};
use crate::context::{ContextSession, ContextSettings, ContextSnapshot, Section, SectionStatus};
use crate::dataset::Dataset;
use crate::logging::LoggingConfig;
use crate::search::http::HttpSearchSource;
use crate::search::{Filter, SearchSource};
use crate::sort::SortDirection;
use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "anchorview")]
#[command(about = "Show the records surrounding one record in a time-ordered index")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root; config/ under it is read
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the anchor and its neighbours
    Context(ContextArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ContextArgs {
    /// Id of the anchor record
    pub anchor_id: String,

    /// Index or index pattern (overrides search.index)
    #[arg(long)]
    pub index: Option<String>,

    /// Primary time field
    #[arg(long, default_value = "@timestamp")]
    pub time_field: String,

    /// Time field has nanosecond precision
    #[arg(long, default_value = "false")]
    pub nanos: bool,

    /// Tie-breaker candidate, first sortable one wins (repeatable)
    #[arg(long = "tie-breaker")]
    pub tie_breakers: Vec<String>,

    /// Declare a field sortable on the index (repeatable)
    #[arg(long = "sortable")]
    pub sortable: Vec<String>,

    /// Rows before the anchor
    #[arg(long)]
    pub before: Option<usize>,

    /// Rows after the anchor
    #[arg(long)]
    pub after: Option<usize>,

    /// Display order (asc, desc)
    #[arg(long)]
    pub sort: Option<SortDirection>,

    /// Term filter, `field=value` or `!field=value` to exclude (repeatable)
    #[arg(long = "filter", value_parser = Filter::parse_term)]
    pub filters: Vec<Filter>,

    /// Source fields to show as columns
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Print JSON instead of a table
    #[arg(long, default_value = "false")]
    pub json: bool,
}

impl Cli {
    pub fn load_config(&self) -> anyhow::Result<AnchorviewConfig> {
        let config = match &self.config {
            Some(path) => ConfigLoader::load_from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => ConfigLoader::load(&self.root)
                .with_context(|| format!("Failed to load config under {}", self.root.display()))?,
        };
        Ok(config)
    }

    /// Logging config from the config file, overridden by flags.
    pub fn logging_config(&self, config: Option<&AnchorviewConfig>) -> LoggingConfig {
        if !self.verbose && self.log_level.is_none() {
            return LoggingConfig {
                level: "off".to_string(),
                ..LoggingConfig::default()
            };
        }
        let mut logging = config.map(|c| c.logging.clone()).unwrap_or_default();
        if let Some(level) = &self.log_level {
            logging.level = level.clone();
        } else if self.verbose {
            logging.level = "debug".to_string();
        }
        if let Some(format) = &self.log_format {
            logging.format = format.clone();
        }
        logging
    }
}

/// Apply flags on top of loaded configuration and validate the result.
pub fn resolve_config(
    mut config: AnchorviewConfig,
    args: &ContextArgs,
) -> anyhow::Result<AnchorviewConfig> {
    if let Some(index) = &args.index {
        config.search.index = index.clone();
    }
    if !args.tie_breakers.is_empty() {
        config.context.tie_breaker_fields = args.tie_breakers.clone();
    }
    if let Some(sort) = args.sort {
        config.context.default_sort = sort;
    }
    config.ensure_valid()?;
    Ok(config)
}

pub fn build_dataset(config: &AnchorviewConfig, args: &ContextArgs) -> Dataset {
    args.sortable.iter().fold(
        Dataset::new(config.search.index.clone(), args.time_field.clone()).with_time_nanos(args.nanos),
        |dataset, field| dataset.with_field(field.clone(), true),
    )
}

/// Run one context fetch against `source` and render it.
pub async fn run_context(
    source: Arc<dyn SearchSource>,
    config: &AnchorviewConfig,
    args: &ContextArgs,
) -> anyhow::Result<String> {
    let settings = ContextSettings::from_config(&config.context)?;
    let before = args.before.unwrap_or(settings.default_size);
    let after = args.after.unwrap_or(settings.default_size);
    let session = ContextSession::new(source, build_dataset(config, args), settings)
        .with_filters(args.filters.clone())
        .with_counts(before, after);

    let snapshot = session.set_anchor_id(args.anchor_id.clone()).await;
    if let Some(reason) = snapshot.anchor_status.failure_reason() {
        bail!(
            "Anchor '{}' could not be loaded ({})",
            args.anchor_id,
            reason.as_str()
        );
    }
    for section in [Section::Predecessors, Section::Successors] {
        if let Some(reason) = snapshot.status(section).failure_reason() {
            warn!(section = section.as_str(), reason = reason.as_str(), "section failed");
        }
    }
    info!(rows = snapshot.rows().count(), "context fetched");

    if args.json {
        render_json(&snapshot)
    } else {
        Ok(render_table(&snapshot, &args.time_field, &args.fields))
    }
}

/// Load config, connect over HTTP, run.
pub async fn execute(cli: &Cli, config: AnchorviewConfig) -> anyhow::Result<String> {
    match &cli.command {
        Commands::Context(args) => {
            let config = resolve_config(config, args)?;
            let source = HttpSearchSource::from_config(&config.search)?;
            run_context(Arc::new(source), &config, args).await
        }
    }
}

pub fn render_json(snapshot: &ContextSnapshot) -> anyhow::Result<String> {
    let status = |s: SectionStatus| {
        json!({
            "state": s.as_str(),
            "reason": s.failure_reason().map(|r| r.as_str()),
        })
    };
    let body = json!({
        "anchor_id": snapshot.anchor_id,
        "status": {
            "anchor": status(snapshot.anchor_status),
            "predecessors": status(snapshot.predecessors_status),
            "successors": status(snapshot.successors_status),
        },
        "rows": snapshot.rows().collect::<Vec<_>>(),
    });
    Ok(serde_json::to_string_pretty(&body)?)
}

pub fn render_table(snapshot: &ContextSnapshot, time_field: &str, fields: &[String]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    let mut header = vec!["".to_string(), "Time".to_string(), "Id".to_string()];
    if fields.is_empty() {
        header.push("Source".to_string());
    } else {
        header.extend(fields.iter().cloned());
    }
    table.set_header(header);

    for record in snapshot.rows() {
        let marker = if record.is_anchor { ">" } else { "" };
        let mut row = vec![
            marker.to_string(),
            display_value(record.field_value(time_field)),
            record.id.clone(),
        ];
        if fields.is_empty() {
            row.push(Value::Object(record.source.clone()).to_string());
        } else {
            row.extend(fields.iter().map(|f| display_value(record.field_value(f))));
        }
        table.add_row(row);
    }
    table.to_string()
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
