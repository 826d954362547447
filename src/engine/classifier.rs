// ==========================================
// 生产计划排队系统 - 品名解析引擎
// ==========================================
// 规则: 最长匹配优先 (SUPER PLATINUM 优先于 PLATINUM)
// 匹配: 大写品名上做子串包含; 等长词按词表顺序(稳定排序)
// ==========================================
// 职责: 从明细品名中提取品质等级与颜色
// 红线: 只填充未设置品质的明细, 不覆盖已有值
// ==========================================

use crate::domain::sheet::SheetItem;
use tracing::instrument;

/// 品质词表（原始顺序即等长时的优先顺序）
pub const QUALITY_TERMS: &[&str] = &[
    "SUPER PLATINUM",
    "SUPER CLASSIC",
    "SUPER ECO",
    "ECO SPECIAL",
    "ECO GREEN",
    "ECO SPL",
    "LIFE STYLE",
    "LIFESTYLE",
    "PREMIUM",
    "PLATINUM",
    "CLASSIC",
    "DELUXE",
    "BRONZE",
    "SILVER",
    "ULTRA",
    "GOLD",
    "UV",
];

/// 颜色词表
pub const COLOR_TERMS: &[&str] = &[
    "GOLDEN YELLOW",
    "BRIGHT WHITE",
    "SUPER WHITE",
    "BLACK",
    "RED",
    "BLUE",
    "GREEN",
    "MILKY WHITE",
    "SUNSHINE WHITE",
    "BLEACH WHITE",
    "LEMON YELLOW",
    "BRIGHT ORANGE",
    "DARK ORANGE",
    "BABY PINK",
    "DARK PINK",
    "CRIMSON RED",
    "LIGHT MAROON",
    "DARK MAROON",
    "MEDICAL BLUE",
    "PEACOCK BLUE",
    "RELIANCE GREEN",
    "PARROT GREEN",
    "ROYAL BLUE",
    "NAVY BLUE",
    "LIGHT GREY",
    "DARK GREY",
    "CHOCOLATE BROWN",
    "LIGHT BEIGE",
    "DARK BEIGE",
    "WHITE MIX",
    "BLACK MIX",
    "COLOR MIX",
    "BEIGE MIX",
    "WHITE",
];

/// 品名解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemClassification {
    pub quality: String,
    pub color: String,
}

// ==========================================
// TextClassifier - 品名解析引擎
// ==========================================
pub struct TextClassifier {
    quality_terms: Vec<&'static str>,
    color_terms: Vec<&'static str>,
}

impl TextClassifier {
    /// 构造函数（词表在此按长度降序排好, 之后只读）
    pub fn new() -> Self {
        Self {
            quality_terms: sort_longest_first(QUALITY_TERMS),
            color_terms: sort_longest_first(COLOR_TERMS),
        }
    }

    /// 解析单个品名
    ///
    /// # 返回
    /// (品质, 颜色), 未命中为空串
    pub fn classify(&self, item_name: &str) -> ItemClassification {
        let upper = item_name.to_uppercase();
        ItemClassification {
            quality: first_match(&self.quality_terms, &upper),
            color: first_match(&self.color_terms, &upper),
        }
    }

    /// 对计划单明细批量解析
    ///
    /// 仅处理品名非空且品质未设置的明细; 返回被填充的明细数
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub fn classify_items(&self, items: &mut [SheetItem]) -> usize {
        let mut filled = 0;
        for item in items.iter_mut() {
            if item.item_name.trim().is_empty() || item.has_quality() {
                continue;
            }
            let result = self.classify(&item.item_name);
            item.quality = Some(result.quality);
            item.color = Some(result.color);
            filled += 1;
        }
        filled
    }
}

impl Default for TextClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_longest_first(terms: &[&'static str]) -> Vec<&'static str> {
    let mut sorted = terms.to_vec();
    // sort_by 是稳定排序: 等长词保持词表顺序
    sorted.sort_by(|a, b| b.len().cmp(&a.len()));
    sorted
}

fn first_match(terms: &[&'static str], upper_name: &str) -> String {
    terms
        .iter()
        .find(|term| upper_name.contains(*term))
        .map(|term| term.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_quality_wins() {
        let classifier = TextClassifier::new();
        let result = classifier.classify("NW Super Platinum 60gsm Royal Blue");
        assert_eq!(result.quality, "SUPER PLATINUM");
        assert_eq!(result.color, "ROYAL BLUE");
    }

    #[test]
    fn test_longest_color_beats_contained_color() {
        let classifier = TextClassifier::new();
        // "WHITE" 与 "BRIGHT WHITE" 都命中, 取更长者
        let result = classifier.classify("gold bright white roll");
        assert_eq!(result.quality, "GOLD");
        assert_eq!(result.color, "BRIGHT WHITE");
    }

    #[test]
    fn test_equal_length_tie_uses_vocabulary_order() {
        let classifier = TextClassifier::new();
        // BRONZE 与 SILVER 等长, 词表中 BRONZE 在前
        let result = classifier.classify("SILVER BRONZE MIX");
        assert_eq!(result.quality, "BRONZE");
    }

    #[test]
    fn test_no_match_yields_empty() {
        let classifier = TextClassifier::new();
        let result = classifier.classify("plain fabric");
        assert_eq!(result, ItemClassification::default());
    }

    #[test]
    fn test_classify_items_never_overwrites_existing_quality() {
        let classifier = TextClassifier::new();
        let mut preset = SheetItem::new("PLATINUM RED", 1.0, 60.0);
        preset.quality = Some("GOLD".to_string());
        let fresh = SheetItem::new("PLATINUM RED", 1.0, 60.0);
        let mut items = vec![preset, fresh];

        let filled = classifier.classify_items(&mut items);

        assert_eq!(filled, 1);
        assert_eq!(items[0].quality.as_deref(), Some("GOLD"));
        assert_eq!(items[0].color, None);
        assert_eq!(items[1].quality.as_deref(), Some("PLATINUM"));
        assert_eq!(items[1].color.as_deref(), Some("RED"));
    }
}
