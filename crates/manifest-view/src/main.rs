mod bootstrap;
mod report;

use anyhow::{anyhow, Context, Result};

use manifest_core::error::ManifestError;
use manifest_core::settings::Settings;
use manifest_data::analysis::build_view;
use manifest_data::reader::{FileSource, PostgrestSource, RecordSource};
use manifest_runtime::data_manager::DataManager;
use manifest_runtime::session::DashboardState;
use manifest_ui::app::App;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    let app_dir = bootstrap::ensure_directories()?;
    let log_file =
        bootstrap::resolve_log_file(settings.log_file.as_deref(), &settings.view, &app_dir);
    bootstrap::setup_logging(&settings.log_level, log_file.as_deref())?;

    tracing::info!("manifest-view v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Source: {}, View: {}, Theme: {}, Cache TTL: {}s",
        settings.source,
        settings.view,
        settings.theme,
        settings.cache_ttl
    );

    settings.validate()?;

    let source = build_source(&settings)?;
    let mut manager = DataManager::new(source, settings.cache_ttl, settings.domain_policy());

    // A failed first load ends the run: there is nothing to show.
    let data = manager
        .get_data(false)
        .context("could not load passenger records")?;

    let report = &data.normalized.report;
    tracing::info!(
        rows_in = report.rows_in,
        rows_out = report.rows_out,
        dropped = report.dropped,
        age_imputed = report.age_imputed,
        fare_imputed = report.fare_imputed,
        "records normalized"
    );

    let initial = settings.initial_filter(data.table())?;

    match settings.view.as_str() {
        "summary" => {
            let view = build_view(data.table(), &initial);
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            report::write_summary(&mut out, &data.source, &view, report)?;
        }
        "dashboard" => {
            tracing::info!("Starting dashboard...");
            drop(data);
            App::new(&settings.theme, DashboardState::new(initial))
                .run(&mut manager)
                .map_err(|e| ManifestError::Terminal(e.to_string()))?;
        }
        unknown => return Err(anyhow!("Unknown view mode: {}", unknown)),
    }

    Ok(())
}

/// Construct the record source selected by `--source`.
fn build_source(settings: &Settings) -> Result<Box<dyn RecordSource>> {
    match settings.source.as_str() {
        "file" => {
            let path = settings
                .data_path
                .clone()
                .ok_or_else(|| anyhow!("file source needs --data-path"))?;
            Ok(Box::new(FileSource::new(path)))
        }
        "postgrest" => {
            let url = settings.url.clone().unwrap_or_default();
            let key = settings.key.clone().unwrap_or_default();
            let source = PostgrestSource::new(url, key, settings.table.clone())?
                .with_order_column(settings.order_by.clone());
            Ok(Box::new(source))
        }
        other => Err(anyhow!("Unknown source: {}", other)),
    }
}
