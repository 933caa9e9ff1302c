//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::cached_source::CachedShipmentSource;
use crate::adapters::csv_adapter::CsvShipmentAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::html_report::HtmlReportAdapter;
use crate::adapters::seasonal_trend_model::SeasonalTrendModel;
use crate::domain::access::AccessPolicy;
use crate::domain::advisor::{ExporterBrief, classify_shippers, request_report};
use crate::domain::aggregate::RankedTotal;
use crate::domain::analysis::{ExporterAnalysis, Narrative};
use crate::domain::config_validation::{validate_config, validate_data_config};
use crate::domain::error::ShipscopeError;
use crate::domain::filter::{DimensionFilter, FilterCriteria};
use crate::domain::overview::{DatasetOverview, FilterOptions};
use crate::domain::session::{SessionContext, SessionError};
use crate::domain::shipment::ShipmentRecord;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::ShipmentSource;
use crate::ports::forecast_port::ForecastModel;
use crate::ports::language_model_port::LanguageModelPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "shipscope", about = "Export container shipment analysis")]
pub struct Cli {
    /// User ID checked against [access] allowed_ids
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Config file plus an optional data file override.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    #[arg(short, long)]
    pub config: PathBuf,
    /// Shipment CSV; defaults to [data] path
    #[arg(long)]
    pub data: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// First shipment date (YYYY-MM-DD); defaults to the earliest record
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Last shipment date (YYYY-MM-DD); defaults to the latest record
    #[arg(long)]
    pub to: Option<NaiveDate>,
    #[arg(long, default_value = "All")]
    pub loading_port: String,
    #[arg(long, default_value = "All")]
    pub country: String,
    #[arg(long, default_value = "All")]
    pub arrival_port: String,
    /// Minimum total containers per exporter
    #[arg(long, default_value_t = 0)]
    pub min_containers: u64,
}

impl Default for FilterArgs {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            loading_port: "All".to_string(),
            country: "All".to_string(),
            arrival_port: "All".to_string(),
            min_containers: 0,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show dataset totals
    Overview {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// List filter choices
    Options {
        #[command(flatten)]
        source: SourceArgs,
        /// Narrow arrival ports to this country
        #[arg(long, default_value = "All")]
        country: String,
    },
    /// Filter shipments and rank exporters and carriers
    Search {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Drill into one or more exporters
    Analyze {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(short, long, required = true)]
        exporter: Vec<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        /// HTML report path; defaults to [report] output
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Request a sales report from the language model
        #[arg(long)]
        ai_report: bool,
        #[arg(long)]
        no_forecast: bool,
    },
    /// Ask the language model which top exporters are actual shippers
    Classify {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let user = cli.user.as_deref();
    let store = CachedShipmentSource::new(CsvShipmentAdapter::new());
    let mut stdout = io::stdout().lock();
    let result = match cli.command {
        Command::Overview { source } => run_overview(&store, &source, user, &mut stdout),
        Command::Options { source, country } => {
            run_options(&store, &source, user, &country, &mut stdout)
        }
        Command::Search {
            source,
            filters,
            limit,
        } => run_search(&store, &source, user, &filters, limit, &mut stdout),
        Command::Analyze {
            source,
            exporter,
            from,
            to,
            output,
            ai_report,
            no_forecast,
        } => {
            let request = AnalysisRequest {
                exporters: exporter,
                from,
                to,
                output,
                ai_report,
                forecast: !no_forecast,
            };
            run_analyze(&store, &source, user, &request, &mut stdout)
        }
        Command::Classify {
            source,
            filters,
            limit,
        } => run_classify(&store, &source, user, &filters, limit, &mut stdout),
        Command::Validate { config } => run_validate(&config, &mut stdout),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ShipscopeError> {
    FileConfigAdapter::from_file(path).map_err(|e| ShipscopeError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// `--data` wins over `[data] path`.
pub fn resolve_data_path(
    config: &dyn ConfigPort,
    data_override: Option<&Path>,
) -> Result<PathBuf, ShipscopeError> {
    if let Some(path) = data_override {
        return Ok(path.to_path_buf());
    }
    validate_data_config(config)?;
    config
        .get_string("data", "path")
        .map(|p| PathBuf::from(p.trim()))
        .ok_or_else(|| ShipscopeError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        })
}

/// Config, access check and record table for a data command. The access
/// check runs before any data is read.
pub fn open_source(
    store: &dyn ShipmentSource,
    source: &SourceArgs,
    user: Option<&str>,
) -> Result<(FileConfigAdapter, Arc<[ShipmentRecord]>), ShipscopeError> {
    let config = load_config(&source.config)?;
    AccessPolicy::from_config(&config).authorize(user)?;
    let data_path = resolve_data_path(&config, source.data.as_deref())?;
    let records = store.load_shipments(&data_path)?;
    Ok((config, records))
}

/// A single bound outside the default range drags the other end along, so a
/// late `--from` yields an empty window instead of an inverted one.
fn overlay_range(
    defaults: &FilterCriteria,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> (NaiveDate, NaiveDate) {
    match (from, to) {
        (Some(from), Some(to)) => (from, to),
        (Some(from), None) => (from, defaults.date_end.max(from)),
        (None, Some(to)) => (defaults.date_start.min(to), to),
        (None, None) => (defaults.date_start, defaults.date_end),
    }
}

/// Overlay command-line filters on the session defaults.
pub fn build_criteria(
    defaults: &FilterCriteria,
    args: &FilterArgs,
) -> Result<FilterCriteria, ShipscopeError> {
    let (date_start, date_end) = overlay_range(defaults, args.from, args.to);
    let criteria = FilterCriteria {
        date_start,
        date_end,
        loading_port: DimensionFilter::parse(&args.loading_port),
        arrival_country: DimensionFilter::parse(&args.country),
        arrival_port: DimensionFilter::parse(&args.arrival_port),
        min_container_threshold: args.min_containers,
    };
    criteria.validate()?;
    Ok(criteria)
}

/// `None` when the table has no rows; the caller has already said so.
fn new_session(
    records: &[ShipmentRecord],
    out: &mut dyn Write,
) -> Result<Option<SessionContext>, ShipscopeError> {
    if records.is_empty() {
        writeln!(out, "No shipments loaded.")?;
        return Ok(None);
    }
    SessionContext::new(&DatasetOverview::compute(records)).map(Some)
}

fn run_overview(
    store: &dyn ShipmentSource,
    source: &SourceArgs,
    user: Option<&str>,
    out: &mut dyn Write,
) -> Result<(), ShipscopeError> {
    let (_, records) = open_source(store, source, user)?;
    print_overview(out, &DatasetOverview::compute(&records))
}

fn run_options(
    store: &dyn ShipmentSource,
    source: &SourceArgs,
    user: Option<&str>,
    country: &str,
    out: &mut dyn Write,
) -> Result<(), ShipscopeError> {
    let (_, records) = open_source(store, source, user)?;
    let options = FilterOptions::from_records(&records, &DimensionFilter::parse(country));
    writeln!(out, "Loading ports: {}", options.loading_ports.join(", "))?;
    writeln!(out, "Arrival countries: {}", options.arrival_countries.join(", "))?;
    writeln!(out, "Arrival ports: {}", options.arrival_ports.join(", "))?;
    Ok(())
}

fn run_search(
    store: &dyn ShipmentSource,
    source: &SourceArgs,
    user: Option<&str>,
    filters: &FilterArgs,
    limit: usize,
    out: &mut dyn Write,
) -> Result<(), ShipscopeError> {
    let (_, records) = open_source(store, source, user)?;
    run_search_pipeline(&records, filters, limit, out).map(|_| ())
}

/// Filter, rank and print. Returns the session so callers can continue, or
/// `None` for an empty table.
pub fn run_search_pipeline(
    records: &[ShipmentRecord],
    filters: &FilterArgs,
    limit: usize,
    out: &mut dyn Write,
) -> Result<Option<SessionContext>, ShipscopeError> {
    let Some(mut session) = new_session(records, out)? else {
        return Ok(None);
    };
    let criteria = build_criteria(session.defaults(), filters)?;
    session.set_criteria(criteria.clone())?;

    let results = session.search(records)?;
    if results.is_empty() {
        writeln!(out, "No shipments match the selected filters.")?;
        return Ok(Some(session));
    }

    writeln!(
        out,
        "{} shipments, {} ~ {}, loading port {}, country {}, arrival port {}, min {} containers",
        results.records.len(),
        criteria.date_start,
        criteria.date_end,
        criteria.loading_port,
        criteria.arrival_country,
        criteria.arrival_port,
        criteria.min_container_threshold
    )?;
    writeln!(out)?;
    print_ranking(out, "Exporters", "Exporter", &results.exporters, limit)?;
    writeln!(out)?;
    print_ranking(out, "Carriers", "Carrier", &results.carriers, limit)?;
    Ok(Some(session))
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub exporters: Vec<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub output: Option<PathBuf>,
    pub ai_report: bool,
    pub forecast: bool,
}

fn run_analyze(
    store: &dyn ShipmentSource,
    source: &SourceArgs,
    user: Option<&str>,
    request: &AnalysisRequest,
    out: &mut dyn Write,
) -> Result<(), ShipscopeError> {
    let (config, records) = open_source(store, source, user)?;
    let seasonal = SeasonalTrendModel::from_config(&config);
    let model = request
        .forecast
        .then_some(&seasonal as &dyn ForecastModel);

    let output = request.output.clone().or_else(|| {
        config
            .get_string("report", "output")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
    });
    let report = HtmlReportAdapter::new();
    let report_target = output
        .as_ref()
        .map(|p| (&report as &dyn ReportPort, p.as_path()));

    if !request.ai_report {
        return run_analysis_pipeline(&records, request, model, None, report_target, out);
    }

    #[cfg(feature = "llm")]
    {
        use crate::adapters::openai_adapter::OpenAiAdapter;
        match OpenAiAdapter::from_config(&config) {
            Ok(client) => {
                run_analysis_pipeline(&records, request, model, Some(&client), report_target, out)
            }
            Err(e) => {
                eprintln!("warning: report request skipped: {e}");
                run_analysis_pipeline(&records, request, model, None, report_target, out)
            }
        }
    }

    #[cfg(not(feature = "llm"))]
    {
        eprintln!("warning: built without the llm feature; --ai-report ignored");
        run_analysis_pipeline(&records, request, model, None, report_target, out)
    }
}

/// Analyze the requested exporters, print the console summary, and write
/// the HTML report when a target is given.
pub fn run_analysis_pipeline(
    records: &[ShipmentRecord],
    request: &AnalysisRequest,
    model: Option<&dyn ForecastModel>,
    advisor: Option<&dyn LanguageModelPort>,
    report: Option<(&dyn ReportPort, &Path)>,
    out: &mut dyn Write,
) -> Result<(), ShipscopeError> {
    let Some(mut session) = new_session(records, out)? else {
        return Ok(());
    };
    let mut criteria = session.defaults().clone();
    (criteria.date_start, criteria.date_end) = overlay_range(&criteria, request.from, request.to);
    session.set_criteria(criteria)?;
    for exporter in &request.exporters {
        session.select_exporter(exporter.trim());
    }

    if session.analyze(records, model)?.is_empty() {
        writeln!(
            out,
            "No shipments for {} in the selected period.",
            session.selected_exporters().join(", ")
        )?;
        return Ok(());
    }

    if let Some(port) = advisor {
        let narrative = request_narratives(port, session.selected_exporters(), records);
        if let Narrative::Failed(reason) = &narrative {
            eprintln!("warning: report request failed ({reason}); run again to retry");
        }
        session.set_narrative(narrative)?;
    }

    let analysis = session
        .analysis()
        .ok_or(SessionError::NoAnalysis)?;
    print_analysis(out, analysis)?;

    if let Some((writer, path)) = report {
        writer.write(analysis, &path.display().to_string())?;
        writeln!(out, "\nReport written to {}", path.display())?;
    }
    Ok(())
}

fn request_narratives(
    port: &dyn LanguageModelPort,
    exporters: &[String],
    records: &[ShipmentRecord],
) -> Narrative {
    let mut sections = Vec::new();
    for exporter in exporters {
        let Some(brief) = ExporterBrief::build(exporter, records) else {
            sections.push(format!("## {exporter}\nNo data for this exporter."));
            continue;
        };
        match request_report(port, &brief) {
            Ok(text) if exporters.len() == 1 => return Narrative::Ready(text),
            Ok(text) => sections.push(format!("## {exporter}\n{text}")),
            Err(e) => return Narrative::Failed(e.to_string()),
        }
    }
    Narrative::Ready(sections.join("\n\n"))
}

fn run_classify(
    store: &dyn ShipmentSource,
    source: &SourceArgs,
    user: Option<&str>,
    filters: &FilterArgs,
    limit: usize,
    out: &mut dyn Write,
) -> Result<(), ShipscopeError> {
    let (config, records) = open_source(store, source, user)?;

    #[cfg(feature = "llm")]
    {
        let client = crate::adapters::openai_adapter::OpenAiAdapter::from_config(&config)?;
        run_classify_pipeline(&records, filters, limit, &client, out)
    }

    #[cfg(not(feature = "llm"))]
    {
        let _ = (config, records, filters, limit, out);
        Err(ShipscopeError::LanguageModel {
            reason: "built without the llm feature".into(),
        })
    }
}

/// Classify the top `limit` exporters of the filtered ranking. A malformed
/// reply is reported as a warning and the command still succeeds.
pub fn run_classify_pipeline(
    records: &[ShipmentRecord],
    filters: &FilterArgs,
    limit: usize,
    port: &dyn LanguageModelPort,
    out: &mut dyn Write,
) -> Result<(), ShipscopeError> {
    let Some(mut session) = new_session(records, out)? else {
        return Ok(());
    };
    let criteria = build_criteria(session.defaults(), filters)?;
    session.set_criteria(criteria)?;
    let results = session.search(records)?;

    let names: Vec<String> = results
        .exporters
        .iter()
        .take(limit)
        .map(|r| r.name.clone())
        .collect();
    if names.is_empty() {
        writeln!(out, "No shipments match the selected filters.")?;
        return Ok(());
    }

    match classify_shippers(port, &names) {
        Ok(shippers) => {
            writeln!(out, "Actual shippers ({} of {}):", shippers.len(), names.len())?;
            for name in &shippers {
                writeln!(out, "  {name}")?;
            }
            Ok(())
        }
        Err(e) if e.is_recoverable() => {
            eprintln!("warning: classification failed ({e}); run again to retry");
            writeln!(out, "Classification unavailable.")?;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn run_validate(config_path: &Path, out: &mut dyn Write) -> Result<(), ShipscopeError> {
    let config = load_config(config_path)?;
    validate_config(&config)?;
    let policy = AccessPolicy::from_config(&config);
    writeln!(out, "Configuration is valid.")?;
    if policy.is_open() {
        writeln!(out, "Access: open (no allowed_ids configured)")?;
    }
    Ok(())
}

pub fn print_overview(
    out: &mut dyn Write,
    overview: &DatasetOverview,
) -> Result<(), ShipscopeError> {
    let Some((first, last)) = overview.date_bounds() else {
        writeln!(out, "No shipments loaded.")?;
        return Ok(());
    };
    writeln!(out, "Period:            {first} ~ {last}")?;
    writeln!(out, "Shipments:         {}", overview.records)?;
    writeln!(out, "Containers:        {}", overview.total_containers)?;
    writeln!(out, "Exporters:         {}", overview.exporters)?;
    writeln!(out, "Loading ports:     {}", overview.loading_ports)?;
    writeln!(out, "Arrival countries: {}", overview.arrival_countries)?;
    writeln!(out, "Arrival ports:     {}", overview.arrival_ports)?;
    writeln!(out, "Carriers:          {}", overview.carriers)?;
    Ok(())
}

pub fn print_ranking(
    out: &mut dyn Write,
    title: &str,
    column: &str,
    rows: &[RankedTotal],
    limit: usize,
) -> Result<(), ShipscopeError> {
    writeln!(out, "{title} ({} total)", rows.len())?;
    writeln!(out, "{:>4}  {:<40} {:>10}", "Rank", column, "Containers")?;
    for row in rows.iter().take(limit) {
        writeln!(out, "{:>4}  {:<40} {:>10}", row.rank, row.name, row.total)?;
    }
    Ok(())
}

fn print_analysis(out: &mut dyn Write, analysis: &ExporterAnalysis) -> Result<(), ShipscopeError> {
    writeln!(
        out,
        "Analysis: {} ({} ~ {})",
        analysis.exporters.join(", "),
        analysis.date_start,
        analysis.date_end
    )?;
    writeln!(
        out,
        "{} shipments, {} containers, {} importers, {} countries, {} carriers",
        analysis.overview.records,
        analysis.overview.total_containers,
        analysis.overview.importers,
        analysis.overview.arrival_countries,
        analysis.overview.carriers
    )?;

    writeln!(out, "\nDestination countries")?;
    for row in &analysis.country_shares {
        writeln!(out, "  {:<30} {:>10} {:>6.1}%", row.name, row.total, row.share_pct)?;
    }

    writeln!(out, "\nMonthly containers")?;
    for m in &analysis.monthly {
        writeln!(out, "  {}  {:>10}", m.month, m.total)?;
    }

    if let Some(outcome) = analysis.forecast_outcome() {
        writeln!(out, "\nForecast (monthly)")?;
        for p in &outcome.monthly {
            let actual = p.actual_display().map(|v| v.to_string()).unwrap_or_default();
            let forecast = p.forecast_display().map(|v| v.to_string()).unwrap_or_default();
            writeln!(out, "  {}  {:>10} {:>10}", p.month, actual, forecast)?;
        }
        match outcome.backtest {
            Some(score) => writeln!(
                out,
                "  MAE over last {} dates: {}",
                score.holdout_days,
                score.mae_display()
            )?,
            None => writeln!(out, "  Backtest skipped: not enough history")?,
        }
    } else if let Some(e) = analysis.forecast_error() {
        writeln!(out, "\nForecast unavailable: {e}")?;
    }

    match &analysis.narrative {
        Narrative::Ready(text) => writeln!(out, "\nSales report\n{text}")?,
        Narrative::Failed(_) => writeln!(out, "\nSales report unavailable.")?,
        Narrative::NotRequested => {}
    }
    Ok(())
}
