//! Template Renderer Binary
//!
//! Renders a catalog template to stdout. Bundle images are resolved from a
//! pre-rendered bundle index instead of a registry:
//! - Structured JSON logging on stderr
//! - Ctrl+C cancels in-flight renders
//!
//! ## Configuration
//!
//! Environment variables:
//! - `TEMPLATE_FILE`: Template path, YAML or JSON (required)
//! - `BUNDLE_INDEX`: Catalog file whose bundles are served by image reference (required)
//! - `OUTPUT_FORMAT`: "yaml" or "json" (default: yaml)
//! - `MAX_CONCURRENT_RENDERS`: Bundle renders in flight (default: 8)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! TEMPLATE_FILE=semver.yaml BUNDLE_INDEX=bundles.yaml cargo run --bin render_template --features cli
//! ```

use std::path::Path;
use std::time::Instant;

use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use channel_graph_kernel::policy::render::DEFAULT_MAX_CONCURRENT_RENDERS;
use channel_graph_kernel::{
    DeclarativeConfig, InMemoryBundleRenderer, OutputFormat, RenderContext, RenderPolicy, Template,
};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "render_template=info,channel_graph_kernel=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn required_var(name: &str) -> Result<String, Box<dyn std::error::Error>> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(format!("{name} must be set").into()),
    }
}

fn is_json(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let version = env!("CARGO_PKG_VERSION");
    info!(version = version, "Starting template renderer");

    let template_path = required_var("TEMPLATE_FILE")?;
    let index_path = required_var("BUNDLE_INDEX")?;
    let format = match std::env::var("OUTPUT_FORMAT") {
        Ok(s) => OutputFormat::from_str(&s).ok_or_else(|| format!("Unknown OUTPUT_FORMAT {s:?}"))?,
        Err(_) => OutputFormat::default(),
    };
    let max_concurrent_renders: usize = std::env::var("MAX_CONCURRENT_RENDERS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_MAX_CONCURRENT_RENDERS);
    let policy = RenderPolicy::new(max_concurrent_renders);

    let raw = tokio::fs::read_to_string(&template_path).await?;
    let template = if is_json(&template_path) {
        Template::from_json_str(&raw)?
    } else {
        Template::from_yaml_str(&raw)?
    };

    let raw = tokio::fs::read_to_string(&index_path).await?;
    let index = if is_json(&index_path) {
        DeclarativeConfig::from_json_str(&raw)?
    } else {
        DeclarativeConfig::from_yaml_str(&raw)?
    };
    let renderer = InMemoryBundleRenderer::from_config(&index);
    info!(
        template = %template_path,
        schema = template.schema(),
        images = renderer.num_images(),
        max_concurrent_renders = policy.max_concurrent_renders,
        "Template loaded"
    );

    let ctx = RenderContext::new();
    let on_interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, cancelling renders");
            on_interrupt.cancel();
        }
    });

    let start = Instant::now();
    let output = match template.render_to_string(&renderer, &ctx, &policy, format).await {
        Ok(output) => output,
        Err(e) => {
            error!(error = %e, "Template render failed");
            return Err(e.into());
        }
    };

    info!(
        latency_ms = start.elapsed().as_millis() as u64,
        bytes = output.len(),
        "Template rendered"
    );
    print!("{output}");

    Ok(())
}
