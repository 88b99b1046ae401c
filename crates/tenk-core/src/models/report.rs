//! Annual report (10-K) data model shared by the prompt and the response check.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Facts extracted from an annual report (Form 10-K) filed with the SEC.
///
/// Fields are the only facts the model may populate. Leave a field out when
/// the report does not state it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnnualReport {
    /// The name of the company as reported in the 10-K
    pub company_name: String,

    /// Name of the external auditor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auditor: Option<String>,

    /// Company's business overview (Item 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_description: Option<String>,

    /// Date when the 10-K was filed with the SEC
    #[serde(deserialize_with = "deserialize_filing_date")]
    #[schemars(with = "NaiveDate")]
    pub filing_date: NaiveDate,

    /// Key risk factors (Item 1A)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_factors: Option<Vec<String>>,

    /// Total liabilities for the most recent fiscal year (in USD). See CONSOLIDATED BALANCE SHEETS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_liabilities: Option<f64>,

    /// Total equity for the most recent fiscal year (in USD)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_equity: Option<f64>,

    /// Number of employees for the most recent fiscal year
    #[serde(
        default,
        deserialize_with = "deserialize_whole_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_employees: Option<i64>,

    /// Retained earnings for the most recent fiscal year (in USD)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retained_earnings: Option<f64>,

    /// Net debt for the most recent fiscal year (in USD)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_debt: Option<f64>,

    /// Goodwill for the most recent fiscal year (in USD)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goodwill: Option<f64>,

    /// Total revenue for the most recent fiscal year (in USD)
    #[serde(
        default,
        deserialize_with = "deserialize_whole_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_revenue: Option<i64>,

    /// Gross margin for the most recent fiscal year (in %)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross_margin: Option<f64>,

    /// Operating income for the most recent fiscal year (in USD)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_income: Option<f64>,

    /// Net income for the most recent fiscal year (in USD)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_income: Option<f64>,

    /// EBITDA for the most recent fiscal year (in USD)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebitda: Option<f64>,

    /// Net cash generated or used by core business activities during the most recent fiscal year (in USD)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_from_operations: Option<f64>,

    /// Net cash used for or provided by investment activities, including purchase or sale of long-term assets during the most recent fiscal year (in USD)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_from_investing: Option<f64>,

    /// Net cash received from or paid to finance the business during the most recent fiscal year (in USD)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_from_financing: Option<f64>,

    /// Free cash flow per share for the most recent fiscal year (in USD)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_cash_flow_per_share: Option<f64>,
}

impl AnnualReport {
    /// Create a report holding only the required fields.
    pub fn new(company_name: impl Into<String>, filing_date: NaiveDate) -> Self {
        Self {
            company_name: company_name.into(),
            auditor: None,
            business_description: None,
            filing_date,
            risk_factors: None,
            total_liabilities: None,
            total_equity: None,
            total_employees: None,
            retained_earnings: None,
            net_debt: None,
            goodwill: None,
            total_revenue: None,
            gross_margin: None,
            operating_income: None,
            net_income: None,
            ebitda: None,
            cash_from_operations: None,
            cash_from_investing: None,
            cash_from_financing: None,
            free_cash_flow_per_share: None,
        }
    }

    /// Names of optional fields that carry a value.
    pub fn present_fields(&self) -> Vec<&'static str> {
        let mut present = Vec::new();
        let mut mark = |name: &'static str, is_some: bool| {
            if is_some {
                present.push(name);
            }
        };

        mark("auditor", self.auditor.is_some());
        mark("business_description", self.business_description.is_some());
        mark("risk_factors", self.risk_factors.is_some());
        mark("total_liabilities", self.total_liabilities.is_some());
        mark("total_equity", self.total_equity.is_some());
        mark("total_employees", self.total_employees.is_some());
        mark("retained_earnings", self.retained_earnings.is_some());
        mark("net_debt", self.net_debt.is_some());
        mark("goodwill", self.goodwill.is_some());
        mark("total_revenue", self.total_revenue.is_some());
        mark("gross_margin", self.gross_margin.is_some());
        mark("operating_income", self.operating_income.is_some());
        mark("net_income", self.net_income.is_some());
        mark("ebitda", self.ebitda.is_some());
        mark("cash_from_operations", self.cash_from_operations.is_some());
        mark("cash_from_investing", self.cash_from_investing.is_some());
        mark("cash_from_financing", self.cash_from_financing.is_some());
        mark("free_cash_flow_per_share", self.free_cash_flow_per_share.is_some());

        present
    }

    /// Floating-point fields holding NaN or an infinity, which JSON cannot carry.
    pub fn non_finite_fields(&self) -> Vec<(&'static str, f64)> {
        [
            ("total_liabilities", self.total_liabilities),
            ("total_equity", self.total_equity),
            ("retained_earnings", self.retained_earnings),
            ("net_debt", self.net_debt),
            ("goodwill", self.goodwill),
            ("gross_margin", self.gross_margin),
            ("operating_income", self.operating_income),
            ("net_income", self.net_income),
            ("ebitda", self.ebitda),
            ("cash_from_operations", self.cash_from_operations),
            ("cash_from_investing", self.cash_from_investing),
            ("cash_from_financing", self.cash_from_financing),
            ("free_cash_flow_per_share", self.free_cash_flow_per_share),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.filter(|v| !v.is_finite()).map(|v| (name, v)))
        .collect()
    }
}

/// Parse a filing date given either as a calendar date or as a timestamp.
///
/// Timestamps are truncated to their date; the time of day is not kept.
pub fn parse_filing_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

fn deserialize_filing_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_filing_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid filing date '{}'", raw)))
}

/// Accept `164000` and `164000.0` alike for integer fields; reject `1.5`.
fn deserialize_whole_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct WholeNumber;

    impl<'de> Visitor<'de> for WholeNumber {
        type Value = Option<i64>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an integer or a float without a fractional part")
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2: Deserializer<'de>>(self, deserializer: D2) -> Result<Self::Value, D2::Error> {
            deserializer.deserialize_any(self)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            i64::try_from(v)
                .map(Some)
                .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            // i64::MAX as f64 rounds up to 2^63, which is already out of range
            if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
                Ok(Some(v as i64))
            } else {
                Err(E::invalid_value(Unexpected::Float(v), &self))
            }
        }
    }

    deserializer.deserialize_option(WholeNumber)
}
