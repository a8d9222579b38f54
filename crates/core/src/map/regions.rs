use serde::Serialize;
use std::collections::BTreeMap;

/// Legend buckets as `(lower bound inclusive, color)`, ascending.
pub const LEGEND: [(u8, &str); 5] = [
    (0, "#bfdbfe"),
    (30, "#60a5fa"),
    (60, "#2563eb"),
    (80, "#1e40af"),
    (95, "#172554"),
];

pub const HIGH_ACTIVITY_MIN: u8 = 80;
pub const LOW_ACTIVITY_MAX: u8 = 30;

// (id, display name, intensity)
const REGIONS: &[(&str, &str, u8)] = &[
    ("RU-AD", "Республика Адыгея", 75),
    ("RU-AL", "Республика Алтай", 45),
    ("RU-ALT", "Алтайский край", 65),
    ("RU-AMU", "Амурская область", 55),
    ("RU-ARK", "Архангельская область", 70),
    ("RU-AST", "Астраханская область", 80),
    ("RU-BA", "Республика Башкортостан", 85),
    ("RU-BEL", "Белгородская область", 90),
    ("RU-BRY", "Брянская область", 60),
    ("RU-BU", "Республика Бурятия", 50),
    ("RU-CE", "Чеченская Республика", 40),
    ("RU-CHE", "Челябинская область", 85),
    ("RU-CHU", "Чукотский автономный округ", 25),
    ("RU-CU", "Чувашская Республика", 75),
    ("RU-DA", "Республика Дагестан", 65),
    ("RU-IN", "Республика Ингушетия", 45),
    ("RU-IRK", "Иркутская область", 70),
    ("RU-IVA", "Ивановская область", 55),
    ("RU-KAM", "Камчатский край", 35),
    ("RU-KB", "Кабардино-Балкарская Республика", 50),
    ("RU-KC", "Карачаево-Черкесская Республика", 55),
    ("RU-KDA", "Краснодарский край", 90),
    ("RU-KEM", "Кемеровская область", 80),
    ("RU-KGD", "Калининградская область", 85),
    ("RU-KGN", "Курганская область", 45),
    ("RU-KHA", "Хабаровский край", 60),
    ("RU-KHM", "Ханты-Мансийский автономный округ", 95),
    ("RU-KIR", "Кировская область", 65),
    ("RU-KK", "Республика Хакасия", 55),
    ("RU-KL", "Республика Калмыкия", 40),
    ("RU-KLU", "Калужская область", 80),
    ("RU-KO", "Республика Коми", 60),
    ("RU-KOS", "Костромская область", 50),
    ("RU-KR", "Республика Карелия", 65),
    ("RU-KRS", "Курская область", 70),
    ("RU-KYA", "Красноярский край", 75),
    ("RU-LEN", "Ленинградская область", 85),
    ("RU-LIP", "Липецкая область", 75),
    ("RU-MAG", "Магаданская область", 30),
    ("RU-ME", "Республика Марий Эл", 60),
    ("RU-MO", "Республика Мордовия", 65),
    ("RU-MOS", "Московская область", 95),
    ("RU-MOW", "Москва", 100),
    ("RU-MUR", "Мурманская область", 70),
    ("RU-NEN", "Ненецкий автономный округ", 35),
    ("RU-NGR", "Новгородская область", 55),
    ("RU-NIZ", "Нижегородская область", 85),
    ("RU-NVS", "Новосибирская область", 80),
    ("RU-OMS", "Омская область", 70),
    ("RU-ORE", "Оренбургская область", 75),
    ("RU-ORL", "Орловская область", 60),
    ("RU-PER", "Пермский край", 80),
    ("RU-PNZ", "Пензенская область", 65),
    ("RU-PRI", "Приморский край", 70),
    ("RU-PSK", "Псковская область", 50),
    ("RU-ROS", "Ростовская область", 85),
    ("RU-RYA", "Рязанская область", 70),
    ("RU-SA", "Республика Саха (Якутия)", 45),
    ("RU-SAK", "Сахалинская область", 65),
    ("RU-SAM", "Самарская область", 85),
    ("RU-SAR", "Саратовская область", 75),
    ("RU-SE", "Республика Северная Осетия — Алания", 55),
    ("RU-SMO", "Смоленская область", 60),
    ("RU-SPE", "Санкт-Петербург", 95),
    ("RU-STA", "Ставропольский край", 75),
    ("RU-SVE", "Свердловская область", 85),
    ("RU-TAM", "Тамбовская область", 65),
    ("RU-TA", "Республика Татарстан", 90),
    ("RU-TOM", "Томская область", 70),
    ("RU-TUL", "Тульская область", 80),
    ("RU-TVE", "Тверская область", 65),
    ("RU-TY", "Республика Тыва", 35),
    ("RU-TYU", "Тюменская область", 85),
    ("RU-UD", "Удмуртская Республика", 70),
    ("RU-ULY", "Ульяновская область", 65),
    ("RU-VGG", "Волгоградская область", 75),
    ("RU-VLA", "Владимирская область", 70),
    ("RU-VLG", "Вологодская область", 60),
    ("RU-VOR", "Воронежская область", 80),
    ("RU-YAN", "Ямало-Ненецкий автономный округ", 90),
    ("RU-YAR", "Ярославская область", 75),
    ("RU-YEV", "Еврейская автономная область", 40),
    ("RU-ZAB", "Забайкальский край", 50),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub value: u8,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionStats {
    pub regions: usize,
    pub mean_value: f64,
    pub high_activity: usize,
    pub low_activity: usize,
}

pub fn color_for_value(value: u8) -> &'static str {
    LEGEND
        .iter()
        .rev()
        .find(|(lower, _)| value >= *lower)
        .map(|(_, color)| *color)
        .unwrap_or(LEGEND[0].1)
}

/// Static region id -> (name, intensity, color) table.
#[derive(Debug, Clone)]
pub struct RegionColorModel {
    by_id: BTreeMap<&'static str, RegionEntry>,
}

impl Default for RegionColorModel {
    fn default() -> Self {
        Self::from_table(REGIONS)
    }
}

impl RegionColorModel {
    pub fn from_table(table: &[(&'static str, &'static str, u8)]) -> Self {
        let by_id = table
            .iter()
            .map(|&(id, name, value)| {
                let value = value.min(100);
                (
                    id,
                    RegionEntry {
                        id,
                        name,
                        value,
                        color: color_for_value(value),
                    },
                )
            })
            .collect();
        Self { by_id }
    }

    pub fn get(&self, id: &str) -> Option<&RegionEntry> {
        self.by_id.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionEntry> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Resolves a display name such as "Москва" to its region id. Names are
    /// trimmed and must otherwise match exactly.
    pub fn region_code(&self, name: &str) -> Option<&'static str> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        self.by_id.values().find(|e| e.name == name).map(|e| e.id)
    }

    pub fn stats(&self) -> RegionStats {
        let regions = self.by_id.len();
        let total: u32 = self.by_id.values().map(|e| u32::from(e.value)).sum();
        let mean_value = if regions == 0 {
            0.0
        } else {
            f64::from(total) / regions as f64
        };
        RegionStats {
            regions,
            mean_value,
            high_activity: self
                .by_id
                .values()
                .filter(|e| e.value >= HIGH_ACTIVITY_MIN)
                .count(),
            low_activity: self
                .by_id
                .values()
                .filter(|e| e.value < LOW_ACTIVITY_MAX)
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_follow_legend_buckets() {
        assert_eq!(color_for_value(0), "#bfdbfe");
        assert_eq!(color_for_value(29), "#bfdbfe");
        assert_eq!(color_for_value(30), "#60a5fa");
        assert_eq!(color_for_value(79), "#2563eb");
        assert_eq!(color_for_value(94), "#1e40af");
        assert_eq!(color_for_value(100), "#172554");
    }

    #[test]
    fn resolves_names_to_codes() {
        let model = RegionColorModel::default();
        assert_eq!(model.region_code("Москва"), Some("RU-MOW"));
        assert_eq!(model.region_code("  Санкт-Петербург "), Some("RU-SPE"));
        assert_eq!(model.region_code("Свердловская область"), Some("RU-SVE"));
        assert_eq!(model.region_code("свердловская область"), None);
        assert_eq!(model.region_code("Атлантида"), None);
        assert_eq!(model.region_code(""), None);
    }

    #[test]
    fn entries_carry_derived_color() {
        let model = RegionColorModel::default();
        let moscow = model.get("RU-MOW").unwrap();
        assert_eq!(moscow.value, 100);
        assert_eq!(moscow.color, "#172554");
        // 75 falls in the 60..80 bucket.
        assert_eq!(model.get("RU-AD").unwrap().color, "#2563eb");
        assert!(!model.contains("RU-CR"));
    }

    #[test]
    fn stats_over_small_table() {
        let model = RegionColorModel::from_table(&[
            ("A", "a", 10),
            ("B", "b", 50),
            ("C", "c", 90),
        ]);
        let stats = model.stats();
        assert_eq!(stats.regions, 3);
        assert!((stats.mean_value - 50.0).abs() < 1e-9);
        assert_eq!(stats.high_activity, 1);
        assert_eq!(stats.low_activity, 1);
    }
}
