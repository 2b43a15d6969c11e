//! # Reline CLI
//!
//! Usage:
//!   reline lines page.json
//!   reline apply page.json edits.json -o content.bin
//!   reline lines page.json --config reline.json
//!
//! `lines` prints the reconstructed lines as JSON. `apply` writes the
//! content stream that covers and redraws every edited line; without `-o`
//! the uncompressed operators are printed.

use std::env;
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;

use reline::model::EditSet;
use reline::session::{save_document, PageJob};
use reline::{Config, ContentStreamSink, FontContext, PageInput, RelineError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("✗ {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &[String]) -> Result<(), RelineError> {
    let config = match flag_value(args, "--config") {
        Some(path) => Config::from_json(&fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    let positional = positional_args(args);

    match positional.as_slice() {
        ["lines", page] => {
            let lines = reline::reconstruct_json(&fs::read_to_string(page)?, &config)?;
            println!("{}", serde_json::to_string_pretty(&lines)?);
            Ok(())
        }
        ["apply", page, edits] => {
            let page: PageInput = serde_json::from_str(&fs::read_to_string(page)?)?;
            let edits: EditSet = serde_json::from_str(&fs::read_to_string(edits)?)?;
            apply(page, edits, &config, flag_value(args, "-o")).await
        }
        _ => {
            eprintln!("Usage: reline lines <page.json> | reline apply <page.json> <edits.json> [-o out]");
            Err(RelineError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "unrecognized arguments",
            )))
        }
    }
}

async fn apply(
    page: PageInput,
    edits: EditSet,
    config: &Config,
    output: Option<&str>,
) -> Result<(), RelineError> {
    let mut fonts = FontContext::new();
    fonts.register_entries(&config.fonts)?;
    let fonts = Arc::new(fonts);

    let job = PageJob {
        page_index: 0,
        page_height: page.viewport_height,
        edits,
        sink: ContentStreamSink::new(Arc::clone(&fonts)),
    };
    let mut report = save_document(vec![job], fonts.as_ref(), &config.edits).await;
    if let Some((_, error)) = report.failures.pop() {
        return Err(error);
    }

    for outcome in &report.pages {
        for warning in &outcome.warnings {
            eprintln!("! {}: {}", warning.line_id, warning.error);
        }
        match output {
            Some(path) => {
                let data = outcome.sink.to_stream_object();
                fs::write(path, &data)?;
                eprintln!("✓ Written {} bytes to {}", data.len(), path);
            }
            None => print!("{}", outcome.sink.content()),
        }
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// Arguments after the program name that are neither flags nor flag values.
fn positional_args(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "-o" || arg == "--config" {
            iter.next();
        } else if !arg.starts_with('-') {
            out.push(arg.as_str());
        }
    }
    out
}
