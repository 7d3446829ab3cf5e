//! Finance projection CLI
//!
//! Command-line interface for running projections over a model snapshot

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use finance_projection::charts::aggregate;
use finance_projection::resolve::{parse_date, Frequency};
use finance_projection::{
    load_model, FlatRateTax, Interval, ProjectionConfig, ProjectionEngine, ProjectionResult,
    ViewSettings,
};

#[derive(Parser, Debug)]
#[command(name = "finproj", version, about = "Project a personal finance model forward in time")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every evaluation in the window as CSV
    Evaluate {
        #[command(flatten)]
        run: RunArgs,

        /// Write the CSV to a file instead of stdout
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Print each item's value at a focus date as JSON
    Today {
        #[command(flatten)]
        engine: EngineArgs,

        /// Focus date
        #[arg(long)]
        date: String,
    },
    /// Print the chart series bundle for the window as JSON
    Chart {
        #[command(flatten)]
        run: RunArgs,

        /// Bucket frequency; defaults to the model's view setting
        #[arg(long, value_enum)]
        frequency: Option<FrequencyArg>,
    },
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// JSON model snapshot
    #[arg(short, long)]
    model: PathBuf,

    /// Growth and inflation step
    #[arg(long, value_enum, default_value_t = FrequencyArg::Monthly)]
    step: FrequencyArg,

    /// Flat income tax rate applied to tagged incomes (e.g. 0.2)
    #[arg(long)]
    income_tax_rate: Option<f64>,

    /// Flat CGT rate applied to tagged gains (e.g. 0.1)
    #[arg(long)]
    cgt_rate: Option<f64>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    engine: EngineArgs,

    /// Window start
    #[arg(long)]
    start: String,

    /// Window end (exclusive)
    #[arg(long)]
    end: String,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum FrequencyArg {
    Weekly,
    #[default]
    Monthly,
    Annually,
}

impl From<FrequencyArg> for Frequency {
    fn from(arg: FrequencyArg) -> Self {
        match arg {
            FrequencyArg::Weekly => Frequency::Weekly,
            FrequencyArg::Monthly => Frequency::Monthly,
            FrequencyArg::Annually => Frequency::Annually,
        }
    }
}

impl EngineArgs {
    fn engine(&self) -> ProjectionEngine {
        let mut config = ProjectionConfig {
            step: self.step.into(),
            ..ProjectionConfig::default()
        };
        if self.income_tax_rate.is_some() || self.cgt_rate.is_some() {
            config.tax_policy = Arc::new(FlatRateTax::new(
                self.income_tax_rate.unwrap_or(0.0),
                self.cgt_rate.unwrap_or(0.0),
            ));
        }
        ProjectionEngine::new(config)
    }
}

impl RunArgs {
    fn interval(&self) -> Result<Interval> {
        let start = date_arg(&self.start)?;
        let end = date_arg(&self.end)?;
        if end < start {
            return Err(anyhow!("window end {} is before its start {}", end, start));
        }
        Ok(Interval::new(start, end))
    }
}

fn date_arg(text: &str) -> Result<NaiveDate> {
    parse_date(text).ok_or_else(|| anyhow!("unrecognised date '{}'", text))
}

fn write_evaluations<W: Write>(result: &ProjectionResult, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["name", "date", "value", "source"])?;
    for evaluation in &result.evaluations {
        writer.write_record([
            evaluation.name.clone(),
            evaluation.date.format("%Y-%m-%d").to_string(),
            format!("{:.2}", evaluation.value),
            evaluation.source.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn report_diagnostics(result: &ProjectionResult) {
    for diagnostic in &result.diagnostics {
        eprintln!("warning: {}: {}", diagnostic.item, diagnostic.message);
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Evaluate { run, csv } => {
            let model = load_model(&run.engine.model)
                .with_context(|| format!("loading {}", run.engine.model.display()))?;
            let result = run.engine.engine().project(&model, run.interval()?);
            report_diagnostics(&result);

            match csv {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    write_evaluations(&result, file)?;
                    let summary = result.summary();
                    println!(
                        "{} evaluations of {} items written to {}",
                        summary.total_evaluations,
                        summary.distinct_items,
                        path.display()
                    );
                }
                None => write_evaluations(&result, io::stdout().lock())?,
            }
        }
        Command::Today { engine, date } => {
            let model = load_model(&engine.model)
                .with_context(|| format!("loading {}", engine.model.display()))?;
            let today = engine.engine().todays_values(&model, date_arg(&date)?);
            println!("{}", serde_json::to_string_pretty(&today)?);
        }
        Command::Chart { run, frequency } => {
            let model = load_model(&run.engine.model)
                .with_context(|| format!("loading {}", run.engine.model.display()))?;
            let result = run.engine.engine().project(&model, run.interval()?);
            report_diagnostics(&result);

            let mut view = ViewSettings::from_model(&model);
            if let Some(frequency) = frequency {
                view.frequency = frequency.into();
            }
            let bundle = aggregate(&result, &model, &view);
            println!("{}", serde_json::to_string_pretty(&bundle)?);
        }
    }

    Ok(())
}
