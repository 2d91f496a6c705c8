// ==========================================
// 任务规划控制台 - 命令行入口
// ==========================================
// 用法:
//   mission-planner missions          列出任务
//   mission-planner new <mission_id>  为任务新建作业，打印向导初始视图
//   mission-planner open <job_id>     重新打开作业，打印向导视图
//   mission-planner run <job_id>      作业处于复核步骤时触发运行
// ==========================================

use anyhow::{anyhow, bail, Context, Result};

use mission_planner::app::AppState;
use mission_planner::config::AppConfig;
use mission_planner::{logging, WizardStep};

fn usage() -> String {
    [
        "用法:",
        "  mission-planner missions",
        "  mission-planner new <mission_id>",
        "  mission-planner open <job_id>",
        "  mission-planner run <job_id>",
    ]
    .join("\n")
}

fn parse_id(arg: Option<&String>, what: &str) -> Result<i64> {
    let raw = arg.ok_or_else(|| anyhow!("缺少参数 {}\n{}", what, usage()))?;
    raw.parse::<i64>()
        .with_context(|| format!("{} 必须为整数: {}", what, raw))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} 版本: {}", mission_planner::APP_NAME, mission_planner::VERSION);
    tracing::info!("==================================================");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match args.first() {
        Some(c) => c.as_str(),
        None => {
            println!("{}", usage());
            return Ok(());
        }
    };

    let config = AppConfig::load()?;
    let state = AppState::new(config).map_err(|e| anyhow!(e))?;
    let api = state.wizard_api.clone();

    match command {
        "missions" => {
            let missions = api
                .list_missions()
                .await
                .map_err(|e| anyhow!(mission_planner::api::map_api_error(e)))?;
            print_json(&missions)?;
        }
        "new" => {
            let mission_id = parse_id(args.get(1), "mission_id")?;
            let view = api
                .open_new(mission_id)
                .await
                .map_err(|e| anyhow!(mission_planner::api::map_api_error(e)))?;
            print_json(&view)?;
        }
        "open" => {
            let job_id = parse_id(args.get(1), "job_id")?;
            let view = api
                .open_existing(job_id)
                .await
                .map_err(|e| anyhow!(mission_planner::api::map_api_error(e)))?;
            print_json(&view)?;
        }
        "run" => {
            let job_id = parse_id(args.get(1), "job_id")?;
            let view = api
                .open_existing(job_id)
                .await
                .map_err(|e| anyhow!(mission_planner::api::map_api_error(e)))?;
            if view.current_step != WizardStep::Review {
                bail!(
                    "作业 {} 尚未完成配置（当前第 {} 步）",
                    job_id,
                    view.step_number
                );
            }
            let response = api
                .run(view.session_id)
                .await
                .map_err(|e| anyhow!(mission_planner::api::map_api_error(e)))?;
            print_json(&response.run)?;
            api.close(view.session_id)
                .map_err(|e| anyhow!(mission_planner::api::map_api_error(e)))?;
        }
        other => bail!("未知命令: {}\n{}", other, usage()),
    }

    Ok(())
}
