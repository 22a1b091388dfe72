#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;

    use template_schedule::{ExpansionConfig, TemplateGraph, http_api, load_expansion_config};

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .init();

    let addr: SocketAddr = std::env::var("TEMPLATE_SCHEDULE_HTTP_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()?;

    let config = match std::env::var("TEMPLATE_SCHEDULE_CONFIG") {
        Ok(path) => {
            tracing::info!(%path, "loading expansion config");
            load_expansion_config(path)?
        }
        Err(_) => ExpansionConfig::default(),
    };

    let template = match std::env::var("TEMPLATE_SCHEDULE_TEMPLATE") {
        Ok(path) => template_schedule::load_template_from_json(path)?,
        Err(_) => TemplateGraph::new("Untitled template"),
    };

    http_api::serve(addr, template, config).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
