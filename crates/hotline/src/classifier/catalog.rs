//! Issue category catalog

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

/// How quickly a category has to be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Emergency,
    Short,
    Standard,
    Info,
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Standard
    }
}

/// One catalog entry: a problem type with its response template and executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct CategoryRecord {
    #[serde(deserialize_with = "id_from_any")]
    pub id: String,
    pub problem: String,
    #[serde(rename = "type")]
    pub category_type: String,
    pub subtype: String,
    #[serde(default)]
    pub location: Option<String>,
    pub response: String,
    #[serde(default)]
    pub executor: Option<String>,
    #[serde(default)]
    pub executor_id: Option<String>,
    #[serde(default)]
    pub executor_name: Option<String>,
    #[serde(default)]
    pub urgency: Urgency,
    /// Response time bound in hours
    #[serde(default)]
    pub response_time: u32,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Backend ids arrive both as numbers and as strings
pub(crate) fn id_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "unsupported id value: {}",
            other
        ))),
    }
}

impl CategoryRecord {
    /// Executor label shown to the caller; the backend name wins over the plain label
    pub fn executor_label(&self) -> &str {
        self.executor_name
            .as_deref()
            .or(self.executor.as_deref())
            .unwrap_or("Не визначено")
    }
}

/// Ordered, immutable set of active categories
///
/// Catalog order is the classifier's tie-break, so records are never re-sorted.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<CategoryRecord>,
}

impl Catalog {
    /// Build a catalog from records, dropping inactive ones
    pub fn new(records: Vec<CategoryRecord>) -> Self {
        Self {
            records: records.into_iter().filter(|r| r.is_active).collect(),
        }
    }

    /// Built-in table used until (or unless) the backend provides one
    pub fn builtin() -> Self {
        Self::new(builtin_records())
    }

    pub fn records(&self) -> &[CategoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[allow(clippy::too_many_arguments)]
fn record(
    id: &str,
    problem: &str,
    category_type: &str,
    subtype: &str,
    location: &str,
    response: &str,
    executor: &str,
    urgency: Urgency,
    response_time: u32,
    keywords: &[&str],
) -> CategoryRecord {
    CategoryRecord {
        id: id.to_string(),
        problem: problem.to_string(),
        category_type: category_type.to_string(),
        subtype: subtype.to_string(),
        location: Some(location.to_string()),
        response: response.to_string(),
        executor: Some(executor.to_string()),
        executor_id: None,
        executor_name: None,
        urgency,
        response_time,
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        is_active: true,
    }
}

fn builtin_records() -> Vec<CategoryRecord> {
    vec![
        record(
            "1",
            "Благоустрій території",
            "Утримання території в зимовий період",
            "розчистка снігу",
            "прибудинкова територія",
            "Вашу заявку щодо розчистки снігу прийнято. Роботи будуть виконані протягом 24 годин.",
            "Управитель будинку",
            Urgency::Short,
            24,
            &["сніг", "розчистка", "прибрати", "замело", "снігопад", "двір"],
        ),
        record(
            "2",
            "Благоустрій території",
            "Благоустрій та санітарний стан",
            "впавше дерево",
            "на машину",
            "Надійшла заявка про дерево, що впало. Аварійна служба виконає роботи протягом 3 годин.",
            "Аварійна служба",
            Urgency::Emergency,
            3,
            &["дерево", "впало", "машина", "автомобіль", "гілка", "розпилити"],
        ),
        record(
            "3",
            "Ремонт житлового фонду",
            "Покрівля",
            "протікання даху",
            "квартира",
            "Ваша заява щодо протікання даху прийнята. Аварійна служба вже направлена.",
            "Аварійна служба",
            Urgency::Emergency,
            3,
            &["протікає", "дах", "стеля", "вода", "капає", "мокро", "покрівля"],
        ),
        record(
            "4",
            "Інженерні мережі",
            "Опалення",
            "відсутність опалення",
            "квартира",
            "Заявку щодо відсутності опалення прийнято. Перевірка системи буде виконана протягом 3 годин.",
            "Служба теплопостачання",
            Urgency::Emergency,
            3,
            &["опалення", "холодно", "батареї", "радіатор", "тепло", "гаряча"],
        ),
        record(
            "5",
            "Інженерні мережі",
            "Водопостачання",
            "відсутність води",
            "будинок",
            "Заявку щодо відсутності води прийнято. Бригада виїде протягом 2 годин.",
            "Служба водопостачання",
            Urgency::Emergency,
            2,
            &["вода", "водопостачання", "кран", "немає води", "відключили воду"],
        ),
        record(
            "6",
            "Інженерні мережі",
            "Електропостачання",
            "відключення світла",
            "квартира/будинок",
            "Інформація про відключення електроенергії доступна на сайті постачальника. Для аварій зверніться за номером 104.",
            "Електропостачання",
            Urgency::Info,
            0,
            &["світло", "електрика", "відключили", "немає світла", "струм"],
        ),
        record(
            "7",
            "Громадський транспорт",
            "Маршрутки та автобуси",
            "скарга на транспорт",
            "маршрут",
            "Вашу скаргу на роботу транспорту зареєстровано. Відповідь надійде протягом 5 робочих днів.",
            "Департамент транспорту",
            Urgency::Standard,
            120,
            &["маршрутка", "автобус", "водій", "транспорт", "їде", "не зупинився"],
        ),
        record(
            "8",
            "Надзвичайні ситуації",
            "Руйнування інфраструктури",
            "пошкодження дороги",
            "дорога",
            "Заявку про пошкодження інфраструктури прийнято. Фахівці негайно виїдуть на місце.",
            "Управління НС",
            Urgency::Emergency,
            1,
            &["руйнування", "міст", "дорога", "яма", "провал", "аварія"],
        ),
    ]
}
