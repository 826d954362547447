// ==========================================
// 配置 / 应用装配 / 调度器 集成测试
// ==========================================
// 测试目标:
// 1. 分配规则集可由 config_kv 覆写, 启动时加载一次
// 2. 调度间隔读取
// 3. 调度器周期执行台账重算并可停止
// ==========================================


use production_planning::app::AppState;
use production_planning::config::{config_keys, ConfigManager, PlanningConfigReader};
use production_planning::domain::UnitCapacity;
use production_planning::repository::UnitCapacityRepository;
use production_planning::scheduler::{PlanningScheduler, MIN_INTERVAL};
use std::time::Duration;
use test_helpers::{create_test_db, item, TestEnv};

#[tokio::test]
async fn test_config_manager_读取默认间隔() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    assert_eq!(
        config_manager.get_capacity_recompute_interval().await.unwrap(),
        Duration::from_secs(86_400)
    );
    assert_eq!(
        config_manager.get_queue_refresh_interval().await.unwrap(),
        Duration::from_secs(3_600)
    );
    assert_eq!(
        config_manager.get_allocation_rules().await.unwrap().version,
        "v1"
    );
}

#[test]
fn test_app_state_加载覆写的分配规则() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    // 规则集 v2: 克重 > 5 一律进 Unit 4
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    config_manager
        .set_config_value(
            config_keys::ALLOCATION_RULES,
            r#"{"version":"v2","rules":[{"target_unit":"Unit 4","min_gsm_exclusive":5.0}]}"#,
        )
        .expect("写入配置失败");

    let capacity_repo = UnitCapacityRepository::new(&db_path).expect("打开仓储失败");
    capacity_repo
        .upsert(&UnitCapacity::new("Unit 4", 600.0, 400.0))
        .expect("写入产能失败");

    let state = AppState::new(db_path.clone()).expect("初始化AppState失败");
    assert_eq!(state.rule_set_version, "v2");
    assert_eq!(
        state.queue_api.get_recommendation("PLATINUM", 70.0).as_deref(),
        Some("Unit 4")
    );

    let sheet = state
        .sheet_api
        .create_draft(None, None, None, vec![item("PLATINUM", Some("PLATINUM"), 70.0, 250.0)])
        .expect("保存失败");
    assert_eq!(sheet.allocated_unit.as_deref(), Some("Unit 4"));
    assert_eq!(sheet.estimated_production_days, Some(0.25));
}

#[tokio::test]
async fn test_scheduler_周期重算并停止() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let capacity_repo = UnitCapacityRepository::new(&db_path).expect("打开仓储失败");
    capacity_repo
        .upsert(&UnitCapacity::new("Unit 1", 1000.0, 500.0))
        .expect("写入产能失败");

    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    config_manager
        .set_config_value(config_keys::CAPACITY_RECOMPUTE_INTERVAL_SECS, "1")
        .expect("写入配置失败");
    config_manager
        .set_config_value(config_keys::QUEUE_REFRESH_INTERVAL_SECS, "1")
        .expect("写入配置失败");

    let state = AppState::new(db_path.clone()).expect("初始化AppState失败");
    let scheduler = state.build_scheduler().await.expect("创建调度器失败");

    println!("步骤1: 启动调度器");
    let handle = scheduler.start();

    // 首个 tick 立即触发, 等待其执行完毕
    tokio::time::sleep(Duration::from_millis(300)).await;

    println!("步骤2: 停止调度器");
    scheduler.stop();
    handle.join().expect("scheduler thread panicked");

    let record = capacity_repo
        .find_by_unit("Unit 1")
        .expect("查询失败")
        .expect("机组不存在");
    assert!(record.last_updated.is_some(), "调度器应已执行台账重算");
    assert_eq!(record.queue_count, 0);
    assert_eq!(record.available_capacity, 1500.0);
}

#[test]
fn test_scheduler_零间隔按最小间隔运行() {
    let env = TestEnv::new().expect("无法创建测试环境");
    env.seed_units().expect("初始化机组失败");

    let scheduler = PlanningScheduler::new(env.queue_api.clone(), Duration::ZERO, Duration::ZERO);
    assert_eq!(scheduler.intervals(), (MIN_INTERVAL, MIN_INTERVAL));

    let handle = scheduler.start();
    std::thread::sleep(Duration::from_millis(300));
    scheduler.stop();
    handle.join().expect("scheduler thread panicked");

    let record = env
        .capacity_repo
        .find_by_unit("Unit 1")
        .expect("查询失败")
        .expect("机组不存在");
    assert!(record.last_updated.is_some(), "调度器应已执行台账重算");
}
