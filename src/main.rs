//! Council - 入口：加载配置、初始化日志，运行起草/评审会话、列出后端或抓取单页。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures_util::StreamExt;

use council::config::{load_config, AgentRole, AppConfig};
use council::llm::{display_text, BackendRegistry, ModelRouter};
use council::research::WebResearcher;
use council::shell::{event_body, export_artifact, render_event};
use council::workflow::{DraftingLoop, SessionBuilder, StepEvent};

#[derive(Parser, Debug)]
#[command(name = "council", version, about = "Drafter / critic report-section writer")]
struct Cli {
    /// 额外配置文件（覆盖 config/default.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 对一个主题运行起草/评审循环
    Run {
        /// 分析主题，如 "EV Battery Swapping Trends in India 2025"
        scope: String,
        #[arg(long)]
        drafter: Option<String>,
        #[arg(long)]
        critic: Option<String>,
        /// 起草轮数（1..=上限）
        #[arg(long, short = 'n')]
        iterations: Option<u32>,
        /// 不导出最终稿
        #[arg(long)]
        no_export: bool,
    },
    /// 列出已配置的后端及可用性
    Backends,
    /// 抓取单页正文
    Scrape {
        url: String,
        /// 折叠空白并使用更小的截断长度
        #[arg(long)]
        deep: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    council::observability::init();

    let cli = Cli::parse();
    let config = load_config(cli.config).context("Failed to load config")?;

    match cli.command {
        Command::Run {
            scope,
            drafter,
            critic,
            iterations,
            no_export,
        } => run_session(&config, scope, drafter, critic, iterations, no_export).await,
        Command::Backends => {
            list_backends(&config);
            Ok(())
        }
        Command::Scrape { url, deep } => {
            scrape(&config, &url, deep).await;
            Ok(())
        }
    }
}

async fn run_session(
    config: &AppConfig,
    scope: String,
    drafter: Option<String>,
    critic: Option<String>,
    iterations: Option<u32>,
    no_export: bool,
) -> anyhow::Result<()> {
    let registry = Arc::new(BackendRegistry::from_config(config));

    let mut builder = SessionBuilder::new(scope).with_workflow(&config.workflow);
    if let Some(n) = iterations {
        builder = builder.max_iterations(n);
    }
    if let Some(id) = drafter {
        builder = builder.drafter(id);
    }
    if let Some(id) = critic {
        builder = builder.critic(id);
    }
    let state = builder.build(&registry).context("Invalid session parameters")?;
    let scope = state.scope().to_string();

    println!("Analyzing: {}", scope);
    println!(
        "Drafter: {}  Critic: {}  Iterations: {}",
        state.drafter_backend(),
        state.critic_backend(),
        state.max_iterations()
    );

    let model = Arc::new(ModelRouter::new(registry, config.llm.timeouts.request));
    let researcher = Arc::new(WebResearcher::new(&config.research));
    let engine = Arc::new(DraftingLoop::with_workflow(model, researcher, &config.workflow));

    let mut final_draft: Option<String> = None;
    let mut events = Box::pin(engine.stream(state));
    while let Some(event) = events.next().await {
        println!("\n== {} ==", render_event(&event));
        println!("{}", event_body(&event));
        if let StepEvent::Drafter { draft, .. } = &event {
            final_draft = Some(display_text(draft));
        }
    }

    let final_draft = final_draft.unwrap_or_else(|| "Error: No draft finalized.".to_string());
    println!("\n== Final Report Section ==\n{}", final_draft);

    if !no_export {
        let path = export_artifact(&config.app.output_dir, &scope, &final_draft)
            .context("Failed to export final section")?;
        println!("\nSaved: {}", path.display());
    }
    Ok(())
}

async fn scrape(config: &AppConfig, url: &str, deep: bool) {
    let researcher = WebResearcher::new(&config.research);
    let result = if deep {
        researcher.deep_scrape(url).await
    } else {
        researcher.scrape_url(url).await
    };
    println!("{}", display_text(&result));
}

fn list_backends(config: &AppConfig) {
    let registry = BackendRegistry::from_config(config);
    println!(
        "Deployment: {}",
        if registry.cloud_only() { "cloud-only" } else { "local" }
    );
    for backend in registry.iter() {
        let roles: Vec<String> = backend.roles.iter().map(|r| r.to_string()).collect();
        println!(
            "{:<24} {:<18} roles={:<15} available={:<5} credentials={}",
            backend.id,
            format!("{:?}", backend.family()),
            roles.join(","),
            registry.is_available(&backend.id),
            if backend.transport.has_credentials() { "ok" } else { "missing" },
        );
    }
    for role in [AgentRole::Drafter, AgentRole::Critic] {
        let options: Vec<&str> = registry
            .options_for(role)
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        println!("{} options: {}", role, options.join(", "));
    }
}
