//! CLI interface for viral-templates

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use crate::collaborator::{
    ContentAnalyzer, LlmClient, LlmContentAnalyzer, LlmTemplateAdapter, TemplateAdapter,
};
use crate::config::{self, Config};
use crate::repository::{RepositoryOptions, TemplateRepository};
use crate::search::{SearchCriteria, SearchQuery, SortBy};
use crate::template::{AdaptationRequest, ContentInput, SourceContent, Template};

#[derive(Parser)]
#[command(name = "viral-templates")]
#[command(about = "Extract, search and adapt viral content templates", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Use this config file instead of the default one
    #[arg(long, global = true, env = "VIRAL_TEMPLATES_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log progress (INFO level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a template from analysed content
    Extract {
        /// JSON file with `source` metadata and optional `text`, `imageUrl`, `transcript`
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Adapt a stored template for a niche and platform
    Adapt {
        /// Template to adapt
        template_id: String,
        #[arg(long)]
        niche: String,
        #[arg(long)]
        platform: String,
        #[arg(long)]
        objective: Option<String>,
        #[arg(long)]
        audience: Option<String>,
        #[arg(long)]
        brand_name: Option<String>,
        /// Repeat for several colors
        #[arg(long = "brand-color")]
        brand_colors: Vec<String>,
        #[arg(long)]
        brand_voice: Option<String>,
        #[arg(long)]
        context: Option<String>,
    },
    /// Search stored templates
    Search {
        #[arg(long)]
        content_type: Option<String>,
        #[arg(long)]
        niche: Option<String>,
        #[arg(long)]
        min_viral_score: Option<u8>,
        #[arg(long)]
        platform: Option<String>,
        /// Match any of these tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Free text matched against name, niche and tags
        #[arg(long)]
        text: Option<String>,
        /// relevance, viral_score, adaptability, created_at or name
        #[arg(long, default_value = "relevance")]
        sort: SortBy,
        #[arg(long)]
        page: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
        /// Search adapted templates instead
        #[arg(long)]
        adapted: bool,
    },
    /// Print a template or adaptation by id
    Show { id: String },
    /// Recount and print repository statistics
    Stats,
    /// Copy every template and adaptation into a timestamped backup directory
    Backup,
    /// Show or change configuration
    Config {
        /// Set the model for a role: analysis or adaptation
        #[arg(long, num_args = 2, value_names = ["ROLE", "MODEL"])]
        set_model: Option<Vec<String>>,
        /// Set the repository root directory
        #[arg(long)]
        set_root: Option<PathBuf>,
        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
    },
}

/// Contents of the file passed to `extract --input`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractInput {
    source: SourceContent,
    #[serde(flatten)]
    content: ContentInput,
}

/// Stand-in collaborator for commands that never call the model
struct Offline;

#[async_trait]
impl ContentAnalyzer for Offline {
    async fn analyze(&self, _input: &ContentInput, _source: &SourceContent) -> Result<Value> {
        bail!("no model configured for this command")
    }
}

#[async_trait]
impl TemplateAdapter for Offline {
    async fn adapt(&self, _template: &Template, _request: &AdaptationRequest) -> Result<Value> {
        bail!("no model configured for this command")
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to serialize output")?);
    Ok(())
}

fn open_repository(config: &Config, with_model: bool) -> Result<TemplateRepository> {
    let options = RepositoryOptions {
        root: config.storage.resolve_root()?,
        warm_threshold: config.storage.warm_threshold,
        performance: config.performance.clone(),
    };

    let (analyzer, adapter): (Arc<dyn ContentAnalyzer>, Arc<dyn TemplateAdapter>) = if with_model {
        let client = LlmClient::from_config(&config.llm)?;
        (
            Arc::new(LlmContentAnalyzer::new(client.clone(), &config.llm)),
            Arc::new(LlmTemplateAdapter::new(client, &config.llm)),
        )
    } else {
        (Arc::new(Offline), Arc::new(Offline))
    };

    Ok(TemplateRepository::open(options, analyzer, adapter))
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub async fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => config::config_path()?,
    };

    if let Commands::Config { set_model, set_root, reset } = &cli.command {
        if *reset {
            config::reset_config(&config_path)?;
        }
        if let Some(pair) = set_model {
            config::set_model(&config_path, &pair[0], &pair[1])?;
        }
        if let Some(root) = set_root {
            config::set_storage_root(&config_path, root)?;
        }
        if !*reset && set_model.is_none() && set_root.is_none() {
            config::show_config(&Config::load_from(&config_path)?, &config_path)?;
        }
        return Ok(());
    }

    let config = Config::load_from(&config_path)?;

    match cli.command {
        Commands::Extract { input } => {
            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let request: ExtractInput = serde_json::from_str(&raw).context("Invalid extract input")?;

            let repo = open_repository(&config, true)?;
            let template = repo.extract(&request.content, &request.source).await?;
            print_json(&template)?;
        }
        Commands::Adapt {
            template_id,
            niche,
            platform,
            objective,
            audience,
            brand_name,
            brand_colors,
            brand_voice,
            context,
        } => {
            let request = AdaptationRequest {
                objective: objective.unwrap_or_default(),
                niche,
                target_audience: audience.unwrap_or_default(),
                platform,
                brand_name,
                brand_colors: (!brand_colors.is_empty()).then_some(brand_colors),
                brand_voice,
                additional_context: context,
            };

            let repo = open_repository(&config, true)?;
            let adapted = repo.adapt(&template_id, &request).await?;
            print_json(&adapted)?;
        }
        Commands::Search {
            content_type,
            niche,
            min_viral_score,
            platform,
            tags,
            text,
            sort,
            page,
            limit,
            adapted,
        } => {
            let criteria = SearchCriteria {
                content_type,
                niche,
                min_viral_score,
                platform,
                tags,
                search: text,
            };
            let repo = open_repository(&config, false)?;

            if adapted {
                print_json(&repo.search_adaptations(&criteria).await)?;
            } else {
                let query = SearchQuery {
                    criteria,
                    sort_by: sort,
                    page,
                    limit,
                };
                print_json(&repo.search_page(&query).await)?;
            }
        }
        Commands::Show { id } => {
            let repo = open_repository(&config, false)?;
            if let Some(template) = repo.get_template(&id).await {
                print_json(&template)?;
            } else if let Some(adapted) = repo.get_adaptation(&id).await {
                print_json(&adapted)?;
            } else {
                bail!("No template or adaptation with id '{}'", id);
            }
        }
        Commands::Stats => {
            let repo = open_repository(&config, false)?;
            print_json(&repo.recount_stats().await)?;
        }
        Commands::Backup => {
            let repo = open_repository(&config, false)?;
            let dest = repo.backup().await?;
            println!("Backup written to {}", dest.display());
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}
