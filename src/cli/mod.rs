use std::str::FromStr;
use std::sync::Arc;
use anyhow::Context;
use clap::Subcommand;
use crate::api;
use crate::config::Config;
use crate::entities::{ProjectId, ProjectSummary};
use crate::service::ProjectService;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create a project and print its id
    CreateProject { title: String },
    /// List projects, newest first
    ListProjects,
    /// Print a project tree as JSON
    ShowProject { id: String },
    /// Print every project tree as JSON
    Export,
}

pub async fn run(command: Command, config: Config) -> anyhow::Result<()> {
    match command {
        Command::Serve => api::serve(config).await,
        Command::CreateProject { title } => with_service(&config, |service| async move {
            let project = service.create_project(&title).await?;
            println!("{}", project.id);
            Ok(())
        }).await,
        Command::ListProjects => with_service(&config, |service| async move {
            let projects = service.list_projects().await?;
            for line in projects.iter().map(format_summary) {
                println!("{}", line);
            }
            Ok(())
        }).await,
        Command::ShowProject { id } => {
            let project_id = ProjectId::from_str(&id).with_context(|| format!("invalid project id: {}", id))?;
            with_service(&config, |service| async move {
                let project = service.get_project(&project_id)
                    .await?
                    .with_context(|| format!("project not found: {}", project_id))?;
                println!("{}", serde_json::to_string_pretty(&project)?);
                Ok(())
            }).await
        },
        Command::Export => with_service(&config, |service| async move {
            let projects = service.export().await?;
            println!("{}", serde_json::to_string_pretty(&projects)?);
            Ok(())
        }).await,
    }
}

/// Opens the service, runs `f` and closes the storage whatever `f` returned.
async fn with_service<F, Fut>(config: &Config, f: F) -> anyhow::Result<()>
where
    F: FnOnce(Arc<ProjectService>) -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<()>>,
{
    let service = Arc::new(ProjectService::open(config).await?);
    let result = f(service.clone()).await;
    service.storage().close().await?;
    result
}

fn format_summary(summary: &ProjectSummary) -> String {
    format!(
        "{}  {}  {} media  {}",
        summary.id,
        summary.created_at.format("%Y-%m-%d %H:%M"),
        summary.media_count,
        &summary.title,
    )
}
