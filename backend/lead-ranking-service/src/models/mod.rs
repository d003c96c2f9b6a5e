use crate::utils::{is_valid_probability, parse_percent};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A sales lead as delivered by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    pub id: String,
    #[serde(alias = "customerName")]
    pub name: String,

    // Numeric attributes
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub balance: f64,
    #[serde(default, alias = "duration")]
    pub contact_duration: f64,
    #[serde(default, alias = "campaign")]
    pub campaign_count: u32,
    #[serde(default, alias = "previous")]
    pub previous_contacts: u32,
    #[serde(default = "never_contacted", alias = "pdays")]
    pub days_since_last_contact: i32,

    // Categorical attributes
    #[serde(default)]
    pub job: String,
    #[serde(default, alias = "marital")]
    pub marital_status: String,
    #[serde(default)]
    pub education: String,
    #[serde(default, alias = "poutcome")]
    pub contact_outcome: String,
    #[serde(default, alias = "contact")]
    pub contact_channel: Option<String>,
    #[serde(default, alias = "month")]
    pub last_contact_month: Option<String>,
    #[serde(default, alias = "day")]
    pub last_contact_day: Option<String>,

    // Tri-state flags
    #[serde(default)]
    pub has_loan: Flag,
    #[serde(default)]
    pub has_deposit: Flag,
    #[serde(default, alias = "housing")]
    pub has_housing: Flag,
    #[serde(default)]
    pub has_default: Flag,

    // Economic indicators
    #[serde(default, alias = "emp_var_rate")]
    pub emp_var_rate: f64,
    #[serde(default, alias = "cons_price_idx")]
    pub cons_price_idx: f64,
    #[serde(default, alias = "cons_conf_idx")]
    pub cons_conf_idx: f64,
    #[serde(default)]
    pub euribor3m: f64,
    #[serde(default, alias = "nr_employed")]
    pub nr_employed: f64,

    /// Assigned by the external classifier; never computed here.
    #[serde(default)]
    pub category: String,
    /// Conversion probability in [0, 100], `None` while pending.
    #[serde(default, deserialize_with = "deserialize_probability")]
    pub probability: Option<f64>,
    /// Position among the full loaded set, 1 = most likely to convert.
    #[serde(default)]
    pub rank: Option<u32>,
}

fn never_contacted() -> i32 {
    999
}

impl LeadRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            age: 0,
            balance: 0.0,
            contact_duration: 0.0,
            campaign_count: 0,
            previous_contacts: 0,
            days_since_last_contact: never_contacted(),
            job: String::new(),
            marital_status: String::new(),
            education: String::new(),
            contact_outcome: String::new(),
            contact_channel: None,
            last_contact_month: None,
            last_contact_day: None,
            has_loan: Flag::Unknown,
            has_deposit: Flag::Unknown,
            has_housing: Flag::Unknown,
            has_default: Flag::Unknown,
            emp_var_rate: 0.0,
            cons_price_idx: 0.0,
            cons_conf_idx: 0.0,
            euribor3m: 0.0,
            nr_employed: 0.0,
            category: String::new(),
            probability: None,
            rank: None,
        }
    }

    pub fn is_scored(&self) -> bool {
        self.probability.is_some()
    }

    /// Probability used for bucket matching and sort fallback; pending counts as zero.
    pub fn probability_or_zero(&self) -> f64 {
        self.probability.unwrap_or(0.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProbability {
    Number(f64),
    Text(String),
}

fn deserialize_probability<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawProbability>::deserialize(deserializer)?;
    let value = match raw {
        Some(RawProbability::Number(v)) => Some(v),
        Some(RawProbability::Text(s)) => parse_percent(&s),
        None => None,
    };
    Ok(value.filter(|v| is_valid_probability(*v)))
}

/// Yes/No/Unknown attribute as recorded by the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Flag {
    Yes,
    No,
    #[default]
    Unknown,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::Yes => "yes",
            Flag::No => "no",
            Flag::Unknown => "unknown",
        }
    }
}

impl From<&str> for Flag {
    /// Case-insensitive; anything other than yes/no is `Unknown`.
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "yes" => Flag::Yes,
            "no" => Flag::No,
            _ => Flag::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Flag::from).unwrap_or_default())
    }
}

/// Identifies one loaded snapshot of the record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// A persisted probability waiting to be applied to the in-memory set it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreUpdate {
    pub generation: Generation,
    pub id: String,
    pub probability: f64,
}

/// Scorer input. Field names and order are the scoring model's contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    pub age: u32,
    pub job: String,
    pub marital: String,
    pub education: String,
    #[serde(rename = "default")]
    pub credit_default: &'static str,
    pub balance: f64,
    pub housing: &'static str,
    pub loan: &'static str,
    pub contact: Option<String>,
    pub month: Option<String>,
    pub day_of_week: Option<String>,
    pub duration: f64,
    pub campaign: u32,
    pub pdays: i32,
    pub previous: u32,
    pub poutcome: String,
    pub emp_var_rate: f64,
    pub cons_price_idx: f64,
    pub cons_conf_idx: f64,
    pub euribor3m: f64,
    pub nr_employed: f64,
}

impl From<&LeadRecord> for FeatureVector {
    fn from(record: &LeadRecord) -> Self {
        Self {
            age: record.age,
            job: record.job.clone(),
            marital: record.marital_status.clone(),
            education: record.education.clone(),
            credit_default: record.has_default.as_str(),
            balance: record.balance,
            housing: record.has_housing.as_str(),
            loan: record.has_loan.as_str(),
            contact: record.contact_channel.clone(),
            month: record.last_contact_month.clone(),
            day_of_week: record.last_contact_day.clone(),
            duration: record.contact_duration,
            campaign: record.campaign_count,
            pdays: record.days_since_last_contact,
            previous: record.previous_contacts,
            poutcome: record.contact_outcome.clone(),
            emp_var_rate: record.emp_var_rate,
            cons_price_idx: record.cons_price_idx,
            cons_conf_idx: record.cons_conf_idx,
            euribor3m: record.euribor3m,
            nr_employed: record.nr_employed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_accepts_percent_strings() {
        let record: LeadRecord = serde_json::from_str(
            r#"{"id":"C-1","customerName":"Ayu","probability":"72%","hasLoan":"Yes"}"#,
        )
        .unwrap();

        assert_eq!(record.name, "Ayu");
        assert_eq!(record.probability, Some(72.0));
        assert_eq!(record.has_loan, Flag::Yes);
        assert_eq!(record.has_deposit, Flag::Unknown);
        assert_eq!(record.days_since_last_contact, 999);
    }

    #[test]
    fn test_missing_or_invalid_probability_is_pending() {
        let pending: LeadRecord =
            serde_json::from_str(r#"{"id":"C-2","name":"Budi","probability":null}"#).unwrap();
        assert!(!pending.is_scored());

        let blank: LeadRecord =
            serde_json::from_str(r#"{"id":"C-3","name":"Citra","probability":""}"#).unwrap();
        assert!(!blank.is_scored());

        let out_of_range: LeadRecord =
            serde_json::from_str(r#"{"id":"C-4","name":"Dewi","probability":140}"#).unwrap();
        assert!(!out_of_range.is_scored());
    }

    #[test]
    fn test_feature_vector_field_order() {
        let mut record = LeadRecord::new("C-5", "Eka");
        record.has_default = Flag::No;
        record.has_housing = Flag::Yes;

        let json = serde_json::to_string(&FeatureVector::from(&record)).unwrap();
        let keys: Vec<&str> = [
            "age", "job", "marital", "education", "default", "balance", "housing", "loan",
            "contact", "month", "day_of_week", "duration", "campaign", "pdays", "previous",
            "poutcome", "emp_var_rate", "cons_price_idx", "cons_conf_idx", "euribor3m",
            "nr_employed",
        ]
        .to_vec();

        let mut last = 0;
        for key in keys {
            let pos = json.find(&format!("\"{}\":", key)).unwrap();
            assert!(pos >= last, "{} out of order", key);
            last = pos;
        }
        assert!(json.contains(r#""default":"no""#));
        assert!(json.contains(r#""housing":"yes""#));
    }

    #[test]
    fn test_flag_from_text() {
        assert_eq!(Flag::from("YES"), Flag::Yes);
        assert_eq!(Flag::from(" no "), Flag::No);
        assert_eq!(Flag::from("unknown"), Flag::Unknown);
        assert_eq!(Flag::from(""), Flag::Unknown);

        let record: LeadRecord =
            serde_json::from_str(r#"{"id":"C-6","name":"Fajar","hasDeposit":"NO","hasLoan":null}"#)
                .unwrap();
        assert_eq!(record.has_deposit, Flag::No);
        assert_eq!(record.has_loan, Flag::Unknown);
    }

    #[test]
    fn test_generation_ordering() {
        let g = Generation::default();
        assert!(g.next() > g);
        assert_eq!(g.next().to_string(), "gen-1");
    }
}
