// ==========================================
// 会议截稿数据集 - 命令行入口
// ==========================================
// 命令: sort / validate / test
// 退出码: 0 通过；1 存在违规；2 运行错误（文件/配置/网络客户端）
// ==========================================

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use conf_deadlines::config::{ConfigManager, PipelineConfig};
use conf_deadlines::engine::{PipelineOutcome, ValidationPipeline};
use conf_deadlines::{logging, ValidationReport};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

/// 会议截稿数据集校验工具
#[derive(Parser)]
#[command(name = "conf-deadlines", version)]
#[command(about = "会议截稿数据集 - 校验、规范化、排序与归档", long_about = None)]
struct Cli {
    /// 配置文件（默认: ./deadlines.toml，存在时加载）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 数据集目录（覆盖配置中的 data_dir）
    #[arg(long = "data-dir", global = true)]
    data_dir: Option<PathBuf>,

    /// 以 JSON 格式输出日志
    #[arg(long = "log-json", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 校验并规范化数据集，通过后排序、归档并写回。
    ///
    /// 任一致命违规（--strict 时任一警告）即不写出任何文件。
    Sort {
        /// 跳过链接可达性检查（https 协议检查仍执行）
        #[arg(long = "skip_links", alias = "skip-links")]
        skip_links: bool,

        /// 警告也判定为失败
        #[arg(long)]
        strict: bool,

        /// 不执行过期归档
        #[arg(long = "no-archive")]
        no_archive: bool,

        /// 将报告以 JSON 写入文件
        #[arg(long = "report-json")]
        report_json: Option<PathBuf>,
    },

    /// 只校验，不写出。
    Validate {
        /// 跳过链接可达性检查（https 协议检查仍执行）
        #[arg(long = "skip_links", alias = "skip-links")]
        skip_links: bool,

        /// 警告也判定为失败
        #[arg(long)]
        strict: bool,

        /// 将报告以 JSON 写入文件
        #[arg(long = "report-json")]
        report_json: Option<PathBuf>,
    },

    /// 离线校验（等同 validate --skip_links）。
    Test,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.log_json {
        logging::init_json();
    } else {
        logging::init();
    }

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("错误: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// 执行命令
///
/// # 返回
/// - Ok(true): 通过
/// - Ok(false): 存在违规
async fn run(cli: Cli) -> Result<bool> {
    let mut config = ConfigManager::load(cli.config.as_deref())
        .context("配置加载失败")?
        .into_config();
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    match cli.command {
        Commands::Sort {
            skip_links,
            strict,
            no_archive,
            report_json,
        } => {
            apply_flags(&mut config, skip_links, strict);
            let pipeline = ValidationPipeline::from_config(config)?;
            let outcome = pipeline
                .sort(Utc::now(), !no_archive)
                .await
                .context("sort 执行失败")?;

            print_report(&outcome.pipeline);
            write_report_json(report_json.as_deref(), &outcome.pipeline.report)?;

            if outcome.written {
                println!(
                    "已写出 {} 条记录，归档 {} 条",
                    outcome.pipeline.records.len(),
                    outcome.archived
                );
            } else {
                println!("校验未通过，未写出任何文件");
            }
            Ok(outcome.written)
        }
        Commands::Validate {
            skip_links,
            strict,
            report_json,
        } => {
            apply_flags(&mut config, skip_links, strict);
            validate(config, report_json.as_deref()).await
        }
        Commands::Test => {
            apply_flags(&mut config, true, false);
            validate(config, None).await
        }
    }
}

async fn validate(config: PipelineConfig, report_json: Option<&Path>) -> Result<bool> {
    let strict = config.strict;
    let pipeline = ValidationPipeline::from_config(config)?;
    let outcome = pipeline.validate().await.context("validate 执行失败")?;

    print_report(&outcome);
    write_report_json(report_json, &outcome.report)?;

    Ok(outcome.passes(strict))
}

/// 命令行开关只能打开，不能关闭配置文件中的设置
fn apply_flags(config: &mut PipelineConfig, skip_links: bool, strict: bool) {
    config.skip_links |= skip_links;
    config.strict |= strict;
}

fn print_report(outcome: &PipelineOutcome) {
    for line in outcome.report.render_lines() {
        println!("{}", line);
    }

    let summary = &outcome.report.summary;
    println!(
        "共 {} 条，有效 {} 条，致命 {}，警告 {}，重复 {}（耗时 {} ms）",
        summary.total_records,
        summary.valid_records,
        summary.fatal,
        summary.warning,
        summary.duplicates,
        outcome.elapsed.as_millis()
    );
    info!(run_id = %outcome.run_id, "报告输出完成");
}

fn write_report_json(path: Option<&Path>, report: &ValidationReport) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let json = serde_json::to_string_pretty(report).context("报告序列化失败")?;
    std::fs::write(path, json).with_context(|| format!("报告写入失败: {}", path.display()))?;
    Ok(())
}
