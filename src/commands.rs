//! CLI command implementations

use std::path::PathBuf;
use std::sync::Arc;

use codeviewer_analyzer::GoAnalyzerFactory;
use codeviewer_core::{ArtifactLayout, Config, Materializer, ProjectRegistry, RelationIndex};
use codeviewer_server::{CodeviewerServer, ServerConfig};

/// Settings given on the command line; they win over the config file.
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub projects: Option<PathBuf>,
    pub resource_dir: Option<PathBuf>,
}

fn load_config(overrides: Overrides) -> anyhow::Result<Config> {
    let mut config = Config::load(overrides.config.as_deref())?;
    if let Some(projects) = overrides.projects {
        config.projects_file = projects;
    }
    if let Some(resource_dir) = overrides.resource_dir {
        config.resource_dir = resource_dir;
    }
    Ok(config.resolve_paths(&std::env::current_dir()?))
}

fn load_registry(config: &Config) -> anyhow::Result<(Arc<ProjectRegistry>, ArtifactLayout)> {
    let layout = ArtifactLayout::new(&config.resource_dir);
    let registry = ProjectRegistry::load(&config.projects_file, &layout, &GoAnalyzerFactory)?;
    if registry.is_empty() {
        tracing::warn!("No projects registered from {}", config.projects_file.display());
    }
    Ok((Arc::new(registry), layout))
}

pub async fn serve(overrides: Overrides, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let config = load_config(overrides)?;
    let (registry, layout) = load_registry(&config)?;

    let index = Arc::new(RelationIndex::build(Arc::clone(&registry), config.index_policy));
    let materializer = Arc::new(
        Materializer::new(registry, layout)
            .with_granularity(config.granularity)
            .with_display_text(config.display_text),
    );

    let server_config = ServerConfig {
        host: host.unwrap_or(config.host),
        port: port.unwrap_or(config.port),
    };
    tracing::info!("Starting Codeviewer server on {}:{}", server_config.host, server_config.port);

    let server = CodeviewerServer::new(materializer, index, server_config);
    server.start().await
}

pub fn relations(overrides: Overrides) -> anyhow::Result<()> {
    let config = load_config(overrides)?;
    let (registry, _) = load_registry(&config)?;

    let index = RelationIndex::build(registry, config.index_policy);
    println!("{}", serde_json::to_string_pretty(index.relations().as_ref())?);
    Ok(())
}

pub fn clear(overrides: Overrides, project: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(overrides)?;
    let layout = ArtifactLayout::new(&config.resource_dir);

    match project {
        Some(project) => tracing::info!("Clearing diagrams of {}", project),
        None => tracing::info!("Clearing diagram cache: {}", layout.root().display()),
    }
    layout.clear(project)?;

    tracing::info!("Cache cleared");
    Ok(())
}
