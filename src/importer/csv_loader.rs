// ==========================================
// 生产计划排队系统 - CSV 加载器
// ==========================================
// 按表头名称映射列 (大小写不敏感, 列顺序无关)
//
// 机组产能文件:
//   unit_name, day_shift_capacity_kg, night_shift_capacity_kg [, is_active]
// 销售订单文件 (每行一条明细, 表头字段取首个非空值):
//   sales_order, customer, delivery_date, item_code, item_name, qty,
//   weight_per_roll, no_of_rolls, total_weight, gsm, quality, color
// ==========================================

use crate::domain::capacity::UnitCapacity;
use crate::domain::sheet::{PlanningSheet, SheetItem};
use crate::importer::error::{ImportError, ImportResult};
use chrono::NaiveDate;
use csv::StringRecord;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, instrument, warn};

/// 表头索引
struct HeaderIndex {
    columns: HashMap<String, usize>,
}

impl HeaderIndex {
    fn new(headers: &StringRecord) -> Self {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_lowercase(), idx))
            .collect();
        Self { columns }
    }

    fn require(&self, name: &str) -> ImportResult<usize> {
        self.columns
            .get(name)
            .copied()
            .ok_or_else(|| ImportError::MissingColumn(name.to_string()))
    }

    fn string(&self, record: &StringRecord, name: &str) -> Option<String> {
        self.columns
            .get(name)
            .and_then(|&idx| record.get(idx))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn f64(&self, record: &StringRecord, name: &str, row: usize) -> ImportResult<Option<f64>> {
        match self.string(record, name) {
            None => Ok(None),
            Some(raw) => {
                let value = raw.parse::<f64>().map_err(|e| ImportError::TypeConversionError {
                    row,
                    field: name.to_string(),
                    message: format!("{} ({})", e, raw),
                })?;
                if value < 0.0 {
                    return Err(ImportError::NegativeValue {
                        row,
                        field: name.to_string(),
                        value,
                    });
                }
                Ok(Some(value))
            }
        }
    }

    fn date(&self, record: &StringRecord, name: &str, row: usize) -> ImportResult<Option<NaiveDate>> {
        match self.string(record, name) {
            None => Ok(None),
            Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(&raw, "%Y%m%d"))
                .map(Some)
                .map_err(|_| ImportError::DateFormatError {
                    row,
                    field: name.to_string(),
                    value: raw,
                }),
        }
    }
}

// ==========================================
// CsvLoader - CSV 加载器
// ==========================================
pub struct CsvLoader {
    // 无状态
}

impl CsvLoader {
    pub fn new() -> Self {
        Self {}
    }

    fn open(path: &Path) -> ImportResult<csv::Reader<std::fs::File>> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        Ok(csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)?)
    }

    /// 加载机组产能初始化数据
    ///
    /// 负荷字段一律置空, 由台账重算回写
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn load_unit_capacities<P: AsRef<Path>>(&self, path: P) -> ImportResult<Vec<UnitCapacity>> {
        let path = path.as_ref();
        let mut reader = Self::open(path)?;
        let index = HeaderIndex::new(reader.headers()?);
        index.require("unit_name")?;
        index.require("day_shift_capacity_kg")?;
        index.require("night_shift_capacity_kg")?;

        let mut records = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;
            let row = row_idx + 2; // 行号从1开始, 且跳过表头

            let unit_name = match index.string(&record, "unit_name") {
                Some(name) => name,
                None => {
                    warn!(row, "机组名称为空，跳过该行");
                    continue;
                }
            };
            let day = index.f64(&record, "day_shift_capacity_kg", row)?.unwrap_or(0.0);
            let night = index.f64(&record, "night_shift_capacity_kg", row)?.unwrap_or(0.0);

            let mut capacity = UnitCapacity::new(unit_name, day, night);
            if let Some(flag) = index.string(&record, "is_active") {
                capacity.is_active = parse_flag(&flag).ok_or_else(|| ImportError::TypeConversionError {
                    row,
                    field: "is_active".to_string(),
                    message: format!("无法识别的启用标志: {}", flag),
                })?;
            }
            records.push(capacity);
        }

        if records.is_empty() {
            return Err(ImportError::EmptyFile(path.display().to_string()));
        }
        info!(units = records.len(), "机组产能数据加载完成");
        Ok(records)
    }

    /// 加载销售订单明细为草稿计划单（未保存）
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn load_sales_order_sheet<P: AsRef<Path>>(&self, path: P) -> ImportResult<PlanningSheet> {
        let path = path.as_ref();
        let mut reader = Self::open(path)?;
        let index = HeaderIndex::new(reader.headers()?);
        index.require("item_name")?;
        index.require("gsm")?;

        let mut sales_order: Option<String> = None;
        let mut customer: Option<String> = None;
        let mut delivery_date: Option<NaiveDate> = None;
        let mut items = Vec::new();

        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;
            let row = row_idx + 2;

            let item_name = index.string(&record, "item_name").ok_or_else(|| {
                ImportError::FieldMappingError {
                    row,
                    message: "item_name 为空".to_string(),
                }
            })?;

            merge_header(&mut sales_order, index.string(&record, "sales_order"), "sales_order", row);
            merge_header(&mut customer, index.string(&record, "customer"), "customer", row);
            merge_header(
                &mut delivery_date,
                index.date(&record, "delivery_date", row)?,
                "delivery_date",
                row,
            );

            let mut item = SheetItem::new(
                item_name,
                index.f64(&record, "qty", row)?.unwrap_or(0.0),
                index.f64(&record, "gsm", row)?.unwrap_or(0.0),
            );
            item.item_code = index.string(&record, "item_code");
            item.weight_per_roll = index.f64(&record, "weight_per_roll", row)?;
            item.no_of_rolls = index.f64(&record, "no_of_rolls", row)?;
            item.total_weight = index.f64(&record, "total_weight", row)?;
            item.quality = index.string(&record, "quality").map(|q| q.to_uppercase());
            item.color = index.string(&record, "color").map(|c| c.to_uppercase());
            items.push(item);
        }

        if items.is_empty() {
            return Err(ImportError::EmptyFile(path.display().to_string()));
        }

        let mut sheet = PlanningSheet::new_draft(customer, delivery_date);
        sheet.sales_order = sales_order;
        sheet.items = items;

        info!(
            sheet_id = %sheet.sheet_id,
            sales_order = ?sheet.sales_order,
            items = sheet.items.len(),
            "销售订单明细加载完成"
        );
        Ok(sheet)
    }
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// 表头字段取首个非空值, 后续不一致时告警
fn merge_header<T: PartialEq + std::fmt::Debug>(
    slot: &mut Option<T>,
    value: Option<T>,
    field: &str,
    row: usize,
) {
    match (slot.as_ref(), value) {
        (None, Some(v)) => *slot = Some(v),
        (Some(existing), Some(v)) if *existing != v => {
            warn!(row, field, existing = ?existing, ignored = ?v, "表头字段不一致，保留首个值");
        }
        _ => {}
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_unit_capacities() {
        let file = csv_file(
            "unit_name,day_shift_capacity_kg,night_shift_capacity_kg,is_active\n\
             Unit 1,1200,800,1\n\
             Unit 2,900,600,false\n\
             ,100,100,1\n",
        );
        let units = CsvLoader::new().load_unit_capacities(file.path()).unwrap();

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].unit_name, "Unit 1");
        assert_eq!(units[0].available_capacity, 2000.0);
        assert!(units[0].is_active);
        assert!(!units[1].is_active);
    }

    #[test]
    fn test_missing_capacity_column_is_rejected() {
        let file = csv_file("unit_name,day_shift_capacity_kg\nUnit 1,100\n");
        let err = CsvLoader::new().load_unit_capacities(file.path()).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn(ref c) if c == "night_shift_capacity_kg"));
    }

    #[test]
    fn test_load_sales_order_sheet() {
        let file = csv_file(
            "Sales_Order,Customer,Delivery_Date,Item_Name,Qty,Weight_Per_Roll,No_Of_Rolls,Total_Weight,GSM,Quality,Color\n\
             SO-0001,ACME,2026-11-02,SILVER NONWOVEN RED,10,25,4,,30,,\n\
             ,,,PLAIN ROLL,5,,,40,15,gold,\n",
        );
        let sheet = CsvLoader::new().load_sales_order_sheet(file.path()).unwrap();

        assert_eq!(sheet.sales_order.as_deref(), Some("SO-0001"));
        assert_eq!(sheet.customer.as_deref(), Some("ACME"));
        assert_eq!(sheet.delivery_date, NaiveDate::from_ymd_opt(2026, 11, 2));
        assert_eq!(sheet.items.len(), 2);
        assert_eq!(sheet.items[0].weight_per_roll, Some(25.0));
        assert_eq!(sheet.items[0].total_weight, None);
        assert_eq!(sheet.items[1].quality.as_deref(), Some("GOLD"));
        assert!(sheet.is_editable());
    }

    #[test]
    fn test_bad_number_reports_row() {
        let file = csv_file("item_name,gsm\nROLL,abc\n");
        let err = CsvLoader::new().load_sales_order_sheet(file.path()).unwrap_err();
        assert!(matches!(err, ImportError::TypeConversionError { row: 2, .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = CsvLoader::new()
            .load_unit_capacities("/nonexistent/units.csv")
            .unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));
    }
}
