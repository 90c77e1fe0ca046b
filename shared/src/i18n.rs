//! Languages and number formatting

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::metrics::FinancialSummary;

/// Currency every amount is expressed in
pub const CURRENCY_CODE: &str = "MAD";

/// Supported languages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "ar")]
    Arabic,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::French => "fr",
            Language::Arabic => "ar",
        }
    }

    /// Parse a language tag such as `fr-MA`; unknown tags give `None`
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.split(['-', '_']).next()?.trim().to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Language::English),
            "fr" => Some(Language::French),
            "ar" => Some(Language::Arabic),
            _ => None,
        }
    }

    pub fn is_rtl(&self) -> bool {
        matches!(self, Language::Arabic)
    }
}

/// `MAD 1,234.50`, with the sign in front for negatives
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!(
        "{}{} {}.{}",
        if negative { "-" } else { "" },
        CURRENCY_CODE,
        grouped,
        fraction
    )
}

struct ReportLabels {
    title: &'static str,
    income: &'static str,
    expenses: &'static str,
    profit: &'static str,
    footer: &'static str,
}

fn report_labels(language: Language) -> ReportLabels {
    match language {
        Language::English => ReportLabels {
            title: "Business Report",
            income: "Total Income",
            expenses: "Total Expenses",
            profit: "Net Profit",
            footer: "Generated by BizManager",
        },
        Language::French => ReportLabels {
            title: "Rapport d'activité",
            income: "Revenu total",
            expenses: "Dépenses totales",
            profit: "Bénéfice net",
            footer: "Généré par BizManager",
        },
        Language::Arabic => ReportLabels {
            title: "تقرير النشاط",
            income: "إجمالي المداخيل",
            expenses: "إجمالي المصاريف",
            profit: "صافي الربح",
            footer: "تم إنشاؤه بواسطة BizManager",
        },
    }
}

/// Plain-text report summary for sharing
pub fn report_share_text(summary: &FinancialSummary, language: Language) -> String {
    let labels = report_labels(language);
    format!(
        "{}\n\n{}: {}\n{}: {}\n{}: {}\n\n{}",
        labels.title,
        labels.income,
        format_currency(summary.total_income),
        labels.expenses,
        format_currency(summary.total_expenses),
        labels.profit,
        format_currency(summary.net_profit),
        labels.footer,
    )
}
