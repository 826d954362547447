// ==========================================
// 生产计划排队系统 - 命令行入口
// ==========================================
// 用法:
//   production-planning serve
//   production-planning recompute [unit]
//   production-planning refresh
//   production-planning queue <unit>
//   production-planning recommend <quality> <gsm>
//   production-planning import-capacity <csv>
//   production-planning import-sheet <csv>
//   production-planning finalize|start|cancel|preview <sheet_id>
//   production-planning assign <sheet_id> <unit>
//
// 数据库路径: PRODUCTION_PLANNING_DB 环境变量, 否则用户数据目录
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use production_planning::app::{get_default_db_path, AppState};
use production_planning::importer::CsvLoader;
use production_planning::logging;
use serde::Serialize;

const USAGE: &str = "用法: production-planning <serve|recompute [unit]|refresh|queue <unit>|recommend <quality> <gsm>|import-capacity <csv>|import-sheet <csv>|finalize <id>|start <id>|cancel <id>|preview <id>|assign <id> <unit>>";

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).ok_or_else(|| anyhow!(USAGE))?;
    let arg = |idx: usize, name: &'static str| arg_at(&args, idx, name);

    let db_path = get_default_db_path();
    tracing::info!("{} v{}，使用数据库: {}", production_planning::APP_NAME, production_planning::VERSION, db_path);
    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    match command {
        "serve" => {
            let scheduler = state.build_scheduler().await.map_err(|e| anyhow!(e))?;
            let handle = scheduler.start();
            tokio::signal::ctrl_c()
                .await
                .context("等待退出信号失败")?;
            tracing::info!("收到退出信号，正在停止调度器");
            scheduler.stop();
            handle
                .join()
                .map_err(|_| anyhow!("调度器线程异常退出"))?;
        }
        "recompute" => match args.get(1) {
            Some(unit) => print_json(&state.queue_api.recompute_unit(unit)?)?,
            None => print_json(&state.queue_api.recompute_all_active_units()?)?,
        },
        "refresh" => print_json(&state.queue_api.refresh_production_queue()?)?,
        "queue" => print_json(&state.queue_api.get_unit_queue_status(arg(1, "unit")?)?)?,
        "recommend" => {
            let quality = arg(1, "quality")?;
            let gsm: f64 = arg(2, "gsm")?
                .parse()
                .with_context(|| format!("克重不是有效数字: {}", args[2]))?;
            match state.queue_api.get_recommendation(quality, gsm) {
                Some(unit) => println!("{}", unit),
                None => println!("(无推荐机组)"),
            }
        }
        "import-capacity" => {
            print_json(&state.capacity_api.import_unit_capacities(arg(1, "csv")?)?)?
        }
        "import-sheet" => {
            let sheet = CsvLoader::new()
                .load_sales_order_sheet(arg(1, "csv")?)
                .context("销售订单导入失败")?;
            print_json(&state.sheet_api.save_sheet(sheet)?)?
        }
        "finalize" => print_json(&state.sheet_api.finalize_sheet(arg(1, "sheet_id")?)?)?,
        "start" => print_json(&state.sheet_api.start_production(arg(1, "sheet_id")?)?)?,
        "cancel" => print_json(&state.sheet_api.cancel_sheet(arg(1, "sheet_id")?)?)?,
        "preview" => print_json(&state.sheet_api.preview_allocation(arg(1, "sheet_id")?)?)?,
        "assign" => print_json(
            &state
                .sheet_api
                .assign_unit(arg(1, "sheet_id")?, arg(2, "unit")?)?,
        )?,
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }

    Ok(())
}

fn arg_at<'a>(args: &'a [String], idx: usize, name: &str) -> Result<&'a str> {
    args.get(idx)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("缺少参数 <{}>\n{}", name, USAGE))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
