use serde::{Deserialize, Serialize};

/// 机组分配规则集（不可变、带版本的配置数据）
///
/// 存储位置：config_kv（scope_id='global'，key='allocation_rules'），缺省时使用内置 v1
/// 规则按列表顺序求值，首条命中即返回
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRuleSet {
    /// 规则集版本号（随分配结果写入日志，便于审计）
    pub version: String,

    /// 有序规则列表
    pub rules: Vec<AllocationRule>,
}

/// 单条分配规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRule {
    /// 目标机组
    pub target_unit: String,

    /// 克重下限（严格大于）
    pub min_gsm_exclusive: f64,

    /// 允许的品质集合；None 表示不限品质
    #[serde(default)]
    pub qualities: Option<Vec<String>>,
}

impl AllocationRule {
    /// 判断 (品质, 克重) 是否命中本规则；品质需已大写
    pub fn matches(&self, quality_upper: &str, gsm: f64) -> bool {
        if gsm <= self.min_gsm_exclusive {
            return false;
        }
        match &self.qualities {
            None => true,
            Some(list) => list.iter().any(|q| q == quality_upper),
        }
    }
}

impl AllocationRuleSet {
    /// 内置规则集 v1
    pub fn builtin() -> Self {
        let list = |qs: &[&str]| Some(qs.iter().map(|q| q.to_string()).collect::<Vec<_>>());
        Self {
            version: "v1".to_string(),
            rules: vec![
                AllocationRule {
                    target_unit: "Unit 1".to_string(),
                    min_gsm_exclusive: 50.0,
                    qualities: list(&["SUPER PLATINUM", "PLATINUM", "PREMIUM", "GOLD", "SUPER CLASSIC"]),
                },
                AllocationRule {
                    target_unit: "Unit 2".to_string(),
                    min_gsm_exclusive: 20.0,
                    qualities: list(&["GOLD", "SILVER", "BRONZE", "CLASSIC", "ECO SPECIAL", "ECO SPL"]),
                },
                AllocationRule {
                    target_unit: "Unit 3".to_string(),
                    min_gsm_exclusive: 10.0,
                    qualities: list(&["SUPER PLATINUM", "PLATINUM", "PREMIUM", "GOLD", "SILVER", "BRONZE"]),
                },
                AllocationRule {
                    target_unit: "Unit 4".to_string(),
                    min_gsm_exclusive: 10.0,
                    qualities: None,
                },
            ],
        }
    }

    /// 校验规则集：版本非空、至少一条规则、目标机组非空、阈值有限
    pub fn validate(&self) -> Result<(), String> {
        if self.version.trim().is_empty() {
            return Err("规则集版本号不能为空".to_string());
        }
        if self.rules.is_empty() {
            return Err("规则集至少需要一条规则".to_string());
        }
        for (idx, rule) in self.rules.iter().enumerate() {
            if rule.target_unit.trim().is_empty() {
                return Err(format!("第{}条规则缺少目标机组", idx + 1));
            }
            if !rule.min_gsm_exclusive.is_finite() {
                return Err(format!("第{}条规则克重阈值无效", idx + 1));
            }
        }
        Ok(())
    }

    /// 按顺序求值，返回首条命中规则的目标机组
    pub fn evaluate(&self, quality: &str, gsm: f64) -> Option<&str> {
        let quality_upper = quality.trim().to_uppercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&quality_upper, gsm))
            .map(|rule| rule.target_unit.as_str())
    }
}

impl Default for AllocationRuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}
