// ==========================================
// QueueApi / CapacityApi 集成测试
// ==========================================
// 测试范围:
// 1. 机组队列状态: 按序号升序 + 产能快照
// 2. 台账重算: 幂等、允许负可用产能、仅启用机组
// 3. 队列刷新: 只汇报完工候选, 不做状态转换
// 4. 机组推荐: 纯函数
// 5. 产能维护: 手工录入 / CSV 导入
// ==========================================


use production_planning::api::ApiError;
use production_planning::domain::{PlanningStatus, QueueEntry};
use production_planning::engine::CompletionPredicate;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use test_helpers::{item, TestEnv};

fn finalized_silver(env: &TestEnv, customer: &str, weight: f64) -> String {
    let id = env
        .sheet_api
        .create_draft(
            Some(customer.to_string()),
            None,
            None,
            vec![item("SILVER ROLL", Some("SILVER"), 25.0, weight)],
        )
        .expect("保存失败")
        .sheet_id;
    env.sheet_api.finalize_sheet(&id).expect("定稿失败");
    id
}

/// 把所有生产中计划单都判为已完工
struct AlwaysComplete;

impl CompletionPredicate for AlwaysComplete {
    fn name(&self) -> &str {
        "always"
    }

    fn is_complete(&self, _unit: &str, _entry: &QueueEntry) -> bool {
        true
    }
}

// ==========================================
// 队列状态
// ==========================================

#[test]
fn test_get_unit_queue_status_按序号排序() {
    let env = TestEnv::new().expect("无法创建测试环境");
    env.seed_units().expect("初始化机组失败");

    let a = finalized_silver(&env, "A", 100.0);
    let b = finalized_silver(&env, "B", 200.0);
    let c = finalized_silver(&env, "C", 300.0);
    env.sheet_api.start_production(&a).expect("开始生产失败");

    let status = env.queue_api.get_unit_queue_status("Unit 2").expect("查询失败");
    let ids: Vec<&str> = status.sheets.iter().map(|e| e.sheet_id.as_str()).collect();
    assert_eq!(ids, vec![a.as_str(), b.as_str(), c.as_str()]);
    let positions: Vec<Option<i64>> = status.sheets.iter().map(|e| e.queue_position).collect();
    assert_eq!(positions, vec![Some(1), Some(2), Some(3)]);

    let snapshot = status.capacity.expect("应返回产能快照");
    assert_eq!(snapshot.day_shift_capacity_kg, 1000.0);
    assert_eq!(snapshot.night_shift_capacity_kg, 500.0);
    assert_eq!(snapshot.current_queue_weight, 600.0);
    assert_eq!(snapshot.available_capacity, 900.0);
}

#[test]
fn test_get_unit_queue_status_草稿不在队() {
    let env = TestEnv::new().expect("无法创建测试环境");
    env.seed_units().expect("初始化机组失败");

    env.sheet_api
        .create_draft(None, None, None, vec![item("SILVER ROLL", Some("SILVER"), 25.0, 10.0)])
        .expect("保存失败");

    let status = env.queue_api.get_unit_queue_status("Unit 2").expect("查询失败");
    assert!(status.sheets.is_empty());

    let unknown = env.queue_api.get_unit_queue_status("Unit 9").expect("查询失败");
    assert!(unknown.sheets.is_empty());
    assert!(unknown.capacity.is_none());
}

// ==========================================
// 台账重算
// ==========================================

#[test]
fn test_recompute_unit_幂等且允许负值() {
    let env = TestEnv::new().expect("无法创建测试环境");
    env.seed_units().expect("初始化机组失败");

    finalized_silver(&env, "A", 1000.0);
    finalized_silver(&env, "B", 900.0);

    let first = env.queue_api.recompute_unit("Unit 2").expect("重算失败");
    let second = env.queue_api.recompute_unit("Unit 2").expect("重算失败");

    assert_eq!(first.current_queue_weight, 1900.0);
    assert_eq!(first.queue_count, 2);
    assert_eq!(first.available_capacity, -400.0);
    assert_eq!(first.current_queue_weight, second.current_queue_weight);
    assert_eq!(first.queue_count, second.queue_count);
    assert_eq!(first.available_capacity, second.available_capacity);

    assert!(matches!(
        env.queue_api.recompute_unit("Unit 9"),
        Err(ApiError::NotFound(_))
    ));
}

#[test]
fn test_recompute_all_active_units_跳过停用机组() {
    let env = TestEnv::new().expect("无法创建测试环境");
    env.seed_units().expect("初始化机组失败");
    env.capacity_api
        .upsert_unit_capacity("Unit 5", 100.0, 100.0, false)
        .expect("写入失败");

    let updated = env.queue_api.recompute_all_active_units().expect("重算失败");
    let units: Vec<&str> = updated.iter().map(|u| u.unit_name.as_str()).collect();
    assert_eq!(units, vec!["Unit 1", "Unit 2", "Unit 3", "Unit 4"]);
    assert!(updated.iter().all(|u| u.last_updated.is_some()));
}

// ==========================================
// 队列刷新
// ==========================================

#[test]
fn test_refresh_production_queue_默认不判定完工() {
    let env = TestEnv::new().expect("无法创建测试环境");
    env.seed_units().expect("初始化机组失败");

    let a = finalized_silver(&env, "A", 100.0);
    env.sheet_api.start_production(&a).expect("开始生产失败");

    let reports = env.queue_api.refresh_production_queue().expect("刷新失败");
    let unit2 = reports.iter().find(|r| r.unit == "Unit 2").expect("缺少 Unit 2");
    assert_eq!(unit2.in_production, vec![a.clone()]);
    assert!(unit2.completion_candidates.is_empty());

    let sheet = env.sheet_api.get_sheet(&a).expect("读取失败");
    assert_eq!(sheet.planning_status, PlanningStatus::InProduction);
}

#[test]
fn test_refresh_production_queue_只汇报候选() {
    let env = TestEnv::with_predicate(Arc::new(AlwaysComplete)).expect("无法创建测试环境");
    env.seed_units().expect("初始化机组失败");

    let a = finalized_silver(&env, "A", 100.0);
    let b = finalized_silver(&env, "B", 100.0);
    env.sheet_api.start_production(&a).expect("开始生产失败");

    let reports = env.queue_api.refresh_production_queue().expect("刷新失败");
    let unit2 = reports.iter().find(|r| r.unit == "Unit 2").expect("缺少 Unit 2");
    assert_eq!(unit2.completion_candidates, vec![a.clone()]);

    // 不做任何状态转换
    assert_eq!(
        env.sheet_api.get_sheet(&a).expect("读取失败").planning_status,
        PlanningStatus::InProduction
    );
    assert_eq!(
        env.sheet_api.get_sheet(&b).expect("读取失败").planning_status,
        PlanningStatus::Finalized
    );
}

// ==========================================
// 机组推荐
// ==========================================

#[test]
fn test_get_recommendation_纯函数() {
    let env = TestEnv::new().expect("无法创建测试环境");

    // 无产能记录也能给出推荐
    assert_eq!(env.queue_api.get_recommendation("super platinum", 60.0).as_deref(), Some("Unit 1"));
    assert_eq!(env.queue_api.get_recommendation("SILVER", 25.0).as_deref(), Some("Unit 2"));
    assert_eq!(env.queue_api.get_recommendation("SILVER", 15.0).as_deref(), Some("Unit 3"));
    assert_eq!(env.queue_api.get_recommendation("UNKNOWN", 12.0).as_deref(), Some("Unit 4"));
    assert_eq!(env.queue_api.get_recommendation("UNKNOWN", 5.0), None);

    assert!(env.capacity_repo.list_all().expect("查询失败").is_empty());
}

// ==========================================
// 产能维护
// ==========================================

#[test]
fn test_upsert_unit_capacity_按在队集合重算() {
    let env = TestEnv::new().expect("无法创建测试环境");
    env.seed_units().expect("初始化机组失败");
    finalized_silver(&env, "A", 500.0);

    let updated = env
        .capacity_api
        .upsert_unit_capacity("Unit 2", 2000.0, 1000.0, true)
        .expect("写入失败");
    assert_eq!(updated.current_queue_weight, 500.0);
    assert_eq!(updated.queue_count, 1);
    assert_eq!(updated.available_capacity, 2500.0);

    assert!(matches!(
        env.capacity_api.upsert_unit_capacity("Unit 2", -1.0, 0.0, true),
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        env.capacity_api.upsert_unit_capacity("  ", 1.0, 0.0, true),
        Err(ApiError::InvalidInput(_))
    ));
}

#[test]
fn test_import_unit_capacities_从CSV导入() {
    let env = TestEnv::new().expect("无法创建测试环境");

    let mut file = NamedTempFile::new().expect("创建临时文件失败");
    writeln!(file, "unit_name,day_shift_capacity_kg,night_shift_capacity_kg").unwrap();
    writeln!(file, "Unit 1,1200,800").unwrap();
    writeln!(file, "Unit 2,900,600").unwrap();
    file.flush().unwrap();

    let written = env
        .capacity_api
        .import_unit_capacities(file.path())
        .expect("导入失败");
    assert_eq!(written.len(), 2);

    let listed = env.capacity_api.list_unit_capacities().expect("查询失败");
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].available_capacity, 2000.0);
    assert_eq!(listed[1].available_capacity, 1500.0);

    let missing = env.capacity_api.import_unit_capacities("/nonexistent/units.csv");
    assert!(matches!(missing, Err(ApiError::ImportError(_))));
}
