use std::io::Read;
use std::sync::Arc;

use anyhow::Context;
use bidkit_core::config::PlacementFile;
use bidkit_core::openrtb::BidRequest;
use bidkit_core::{BasicParameterBuilder, BuilderChain};

const USAGE: &str = "usage: bidkit-adapter-cli <placement.toml | ->";

fn read_source(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read placement from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path))
}

fn run(path: &str) -> anyhow::Result<String> {
    let file = PlacementFile::from_toml_str(&read_source(path)?)
        .with_context(|| format!("invalid placement file {}", path))?;

    // Logs go to stderr; stdout carries only the request JSON.
    simple_logger::SimpleLogger::new()
        .with_level(file.app.logging.level)
        .init()
        .context("failed to initialise logger")?;
    log::debug!("loaded placement from {}", path);

    let chain = BuilderChain::new().with(BasicParameterBuilder::new(
        Some(Arc::new(file.placement)),
        Some(Arc::new(file.app.sdk)),
        Some(file.sdk_version),
        file.targeting.into_shared(),
    ));

    let mut request = BidRequest::new();
    let report = chain.run(&mut request);
    if !report.is_clean() {
        log::warn!(
            "bid request {} assembled with {} skipped builder(s)",
            request.id,
            report.failures.len()
        );
    }
    log::info!("bid request id={}, imps={}", request.id, request.imp.len());

    request
        .to_json_pretty()
        .context("failed to serialise bid request")
}

fn main() {
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    match run(&path) {
        Ok(json) => println!("{}", json),
        Err(err) => {
            eprintln!("bidkit-adapter-cli failed: {err:#}");
            std::process::exit(1);
        }
    }
}
