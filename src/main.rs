use anyhow::{Result, bail};
use tracing::info;

use browsetrail::{cli, config, logging, output, search};
use browsetrail::{BrowserRegistry, ProfileRoots};

fn main() -> Result<()> {
    let cli_opts = cli::parse();
    logging::init_logging(cli_opts.log_json);

    let mut cfg = config::load_config(cli_opts.config_path.as_deref())?;
    if let Some(dir) = cli_opts.temp_dir.clone() {
        cfg.temp_dir = Some(dir);
    }

    let roots = ProfileRoots::from_env()
        .overlay(cfg.roots())
        .overlay(ProfileRoots {
            roaming: cli_opts.roaming_root.clone(),
            local: cli_opts.local_root.clone(),
        });
    let registry = BrowserRegistry::from_config(&cfg, roots)?;

    if cli_opts.list_browsers {
        for id in registry.ids() {
            println!("{id}");
        }
        return Ok(());
    }

    let browser = cli_opts.browser.as_deref().unwrap_or(&cfg.default_browser);
    let extractor = registry.get(browser)?;
    let limit = cli_opts.limit.unwrap_or(cfg.limit);
    info!("reading {} history (limit {limit})", extractor.profile().id);

    let extraction = extractor.get_history(limit);
    if extraction.is_no_data() {
        eprintln!("History not found!");
        eprintln!("Check your logs for more information.");
        return Ok(());
    }
    if let Some(err) = extraction.extract_error() {
        bail!("{err}");
    }

    let hits = search::filter(&extraction.records, cli_opts.query.as_deref());
    let stdout = std::io::stdout();
    let mut sink = output::build_sink(cli_opts.format.into(), stdout.lock());
    let written = output::write_records(sink.as_mut(), hits)?;
    info!("wrote {written} of {} records", extraction.records.len());

    if let Some(err) = extraction.cleanup_error() {
        eprintln!("warning: {err}");
    }
    Ok(())
}
