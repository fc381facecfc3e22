//! Vispect - AI 视觉检测验证 CLI
//!
//! 驱动验证编排器的命令行入口，充当图像选择 UI 的替身:
//! 读取本地图像，提交远端推理，渲染结果转换过程

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use vispect::application::{OrchestratorConfig, VerificationOrchestrator};
use vispect::config::{load_config, print_config, AppConfig};
use vispect::domain::category::{catalog, CategoryId};
use vispect::domain::image::ImageData;
use vispect::domain::verification::{VerificationOutcome, VerificationRequest};
use vispect::infrastructure::{HttpInferenceClient, HttpInferenceClientConfig};

#[derive(Parser, Debug)]
#[command(name = "vispect", version, about = "AI visual inspection verification")]
struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 列出检测类别
    Categories,
    /// 提交图像进行验证
    Verify {
        /// 待检图像路径
        #[arg(long)]
        image: PathBuf,
        /// 类别 ID（见 `vispect categories`）
        #[arg(long)]
        category: String,
        /// 将标注后的结果图像写入该路径
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // 初始化日志
    let log_filter = format!("{},vispect={}", config.log.level, config.log.level);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));
    if config.log.json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();
    match cli.command {
        Commands::Categories => {
            list_categories(cli.json)?;
            Ok(())
        }
        Commands::Verify {
            image,
            category,
            output,
        } => verify(&config, cli.json, image, &category, output).await,
    }
}

fn list_categories(json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(catalog())?);
        return Ok(());
    }
    for category in catalog() {
        println!("{:<24} {}", category.id.as_str(), category.label);
        println!("    {}", category.description);
    }
    Ok(())
}

async fn verify(
    config: &AppConfig,
    json: bool,
    image_path: PathBuf,
    category: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    print_config(config);

    let category_id = CategoryId::parse(category).unwrap_or_else(|| {
        tracing::warn!(
            input = %category,
            fallback = %CategoryId::DEFAULT,
            "Unknown category, degrading to default analysis"
        );
        CategoryId::DEFAULT
    });

    let bytes = tokio::fs::read(&image_path)
        .await
        .with_context(|| format!("Failed to read {}", image_path.display()))?;
    let ext = image_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    let request = VerificationRequest::new(category_id, ImageData::from_extension(ext, bytes));

    let engine = Arc::new(HttpInferenceClient::new(HttpInferenceClientConfig {
        base_url: config.service.base_url.clone(),
        probe_timeout_secs: config.service.probe_timeout_secs,
        request_timeout_secs: config.service.request_timeout_secs,
        tunnel_bypass: config.service.tunnel_bypass,
    })?);
    let orchestrator = VerificationOrchestrator::new(
        engine,
        OrchestratorConfig {
            max_image_bytes: config.upload.max_image_bytes,
        },
    );

    let mut outcomes = orchestrator.subscribe();
    orchestrator
        .start(request)
        .map_err(|e| anyhow::anyhow!("Failed to start verification: {}", e))?;

    loop {
        tokio::select! {
            changed = outcomes.changed() => {
                changed.context("Orchestrator dropped")?;
                let outcome = outcomes.borrow_and_update().clone();
                match outcome {
                    VerificationOutcome::Idle => {}
                    VerificationOutcome::Pending { phase, .. } => {
                        tracing::info!(phase = phase.as_str(), "Verification in progress");
                    }
                    settled @ VerificationOutcome::Settled { .. } => {
                        return render_settled(json, settled, output.as_deref()).await;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                orchestrator.cancel();
                anyhow::bail!("Verification cancelled");
            }
        }
    }
}

async fn render_settled(
    json: bool,
    outcome: VerificationOutcome,
    output: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    match &outcome {
        VerificationOutcome::Settled { result: Ok(report), .. } => {
            if !json {
                println!("verdict:    {}", report.verdict.as_str());
                println!("confidence: {}%", report.confidence.value());
                println!("analysis:   {}", report.analysis);
            }
            if let (Some(path), Some(image)) = (output, &report.result_image) {
                tokio::fs::write(path, image.bytes())
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                tracing::info!(
                    path = %path.display(),
                    bytes = image.len(),
                    "Annotated result image saved"
                );
            }
            Ok(())
        }
        VerificationOutcome::Settled { result: Err(failure), .. } => {
            anyhow::bail!(
                "Verification failed ({}): {}",
                failure.kind.as_str(),
                failure.message
            )
        }
        _ => Ok(()),
    }
}
