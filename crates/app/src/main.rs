use std::{fs::File, io::BufWriter, process::ExitCode};

use clap::Parser;
use engine::{Importer, Workbook};
use settings::{Args, Settings};

mod error;
mod settings;

fn main() -> ExitCode {
    let args = Args::parse();
    let settings = match Settings::load(&args) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "budget_import={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    match run(&args, &settings) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `false` when the workbook reported any error.
fn run(args: &Args, settings: &Settings) -> error::Result<bool> {
    let mut builder = Importer::builder().parallel(settings.import.parallel);
    if let Some(threads) = settings.import.threads {
        builder = builder.threads(threads);
    }
    let importer = builder.build()?;

    if args.schema {
        let tables: Vec<_> = importer.schema().tables().collect();
        println!("{}", serde_json::to_string_pretty(&tables)?);
        return Ok(true);
    }

    let Some(path) = &args.workbook else {
        return Ok(false);
    };
    let workbook = Workbook::open(path)?;

    let errors = importer.validate(&workbook);
    for error in &errors {
        eprintln!("{error}");
    }
    if !errors.is_empty() {
        tracing::warn!("{} structural error(s), nothing converted", errors.len());
        return Ok(false);
    }
    if args.validate_only {
        tracing::info!("{} is valid", path.display());
        return Ok(true);
    }

    let conversion = importer.convert(&workbook);
    for issue in &conversion.issues {
        eprintln!("{issue}");
    }
    tracing::info!(
        "converted {} account(s), {} employer(s), {} month(s) with {} error(s)",
        conversion.accounts.len(),
        conversion.employers.len(),
        conversion.months.len(),
        conversion.issues.len()
    );

    if let Some(output) = &args.output {
        let writer = BufWriter::new(File::create(output)?);
        serde_json::to_writer_pretty(writer, &conversion)?;
        tracing::info!("records written to {}", output.display());
    }

    Ok(conversion.is_clean())
}
