//! # Signage Studio
//!
//! Composes a design from host props and exports it as PNG and PDF.

use clap::Parser;
use signage_renderer::SaveOutcome;
use signage_studio::{CliArgs, HostProps, Studio, StudioConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing with optional JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,signage_studio=debug,signage_assets=debug")
    });

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    // Use JSON format in production (RUST_LOG_FORMAT=json)
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let config = StudioConfig::from_args(&args)?;
    let props = HostProps::from_file(&args.props)?;

    tracing::info!(
        "Surface {}x{}, {} icons, {} fonts",
        config.width,
        config.height,
        props.icons.len(),
        props.fonts.len()
    );

    let mut studio = Studio::connect(&config, props)?;
    studio.seed().await?;

    let icon_ids: Vec<String> = studio.props().icons.iter().map(|i| i.id.clone()).collect();
    for id in icon_ids {
        studio.add_icon(&id).await?;
    }

    let report = studio.export_and_save(&args.name).await?;
    let (png, pdf) = report.artifacts.write_to(&args.out_dir, &args.name)?;
    tracing::info!("Wrote {} and {}", png.display(), pdf.display());

    match &report.save {
        SaveOutcome::Saved(record) => tracing::info!("Design saved: {}", record),
        SaveOutcome::Skipped => tracing::debug!("Remote save not requested"),
        SaveOutcome::Failed(e) => {
            tracing::warn!("Design exported locally but remote save failed: {}", e);
        }
    }

    let released = studio.teardown();
    tracing::debug!("Released {} image handles", released);
    Ok(())
}
