//! Dashboard aggregation over invoices.
//!
//! Invoices are narrowed by an optional project and an optional month prefix,
//! then grouped by category name. Totals are kept in centavos so the category
//! sums always add up to the filtered total.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{currency::Money, models::InvoiceFact};

/// Shown in place of a category or date when nothing matched.
pub const PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProjectFilter {
    #[default]
    All,
    Project(i64),
    /// A selector that cannot name any project.
    Nothing,
}

impl ProjectFilter {
    /// `None`, `""` and `"all"` mean every project.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("all") => ProjectFilter::All,
            Some(id) => id
                .parse()
                .map(ProjectFilter::Project)
                .unwrap_or(ProjectFilter::Nothing),
        }
    }

    fn matches(&self, project_id: i64) -> bool {
        match self {
            ProjectFilter::All => true,
            ProjectFilter::Project(id) => *id == project_id,
            ProjectFilter::Nothing => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardFilter {
    pub project: ProjectFilter,
    /// Prefix of the `YYYY-MM-DD` date, normally `YYYY-MM`.
    pub month: Option<String>,
}

impl DashboardFilter {
    pub fn new(project: Option<&str>, month: Option<&str>) -> Self {
        Self {
            project: ProjectFilter::parse(project),
            month: month
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
        }
    }

    pub fn matches(&self, fact: &InvoiceFact) -> bool {
        self.project.matches(fact.project_id)
            && self
                .month
                .as_deref()
                .map_or(true, |month| fact.date.starts_with(month))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Ascending by category name.
    pub by_category: Vec<CategoryTotal>,
    pub total: Money,
    pub dominant_category: String,
    pub invoice_count: usize,
    pub latest_date: String,
    /// Every invoice, ignoring the filter.
    pub grand_total: Money,
}

pub fn summarize<'a, I>(facts: I, filter: &DashboardFilter) -> Summary
where
    I: IntoIterator<Item = &'a InvoiceFact>,
{
    let mut grouped: BTreeMap<&str, Money> = BTreeMap::new();
    let mut grand_total = Money::ZERO;
    let mut invoice_count = 0;
    let mut latest_date: Option<&str> = None;

    for fact in facts {
        grand_total += fact.amount();
        if !filter.matches(fact) {
            continue;
        }

        invoice_count += 1;
        *grouped.entry(fact.category.as_str()).or_default() += fact.amount();
        if latest_date.map_or(true, |d| fact.date.as_str() > d) {
            latest_date = Some(fact.date.as_str());
        }
    }

    let by_category: Vec<CategoryTotal> = grouped
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: category.to_string(),
            total,
        })
        .collect();

    // first maximum wins ties
    let dominant_category = by_category
        .iter()
        .fold(None::<&CategoryTotal>, |best, c| match best {
            Some(b) if b.total >= c.total => Some(b),
            _ => Some(c),
        })
        .map_or_else(|| PLACEHOLDER.to_string(), |c| c.category.clone());

    Summary {
        total: by_category.iter().map(|c| c.total).sum(),
        by_category,
        dominant_category,
        invoice_count,
        latest_date: latest_date.unwrap_or(PLACEHOLDER).to_string(),
        grand_total,
    }
}
