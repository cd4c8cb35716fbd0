use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sqlx::Postgres;

use crate::models::Resource;

/// Ordering shared by the SQL path and the in-memory path
pub const ORDER_BY: &str = " ORDER BY is_featured DESC, created_at DESC NULLS LAST, id ASC";

/// Filter criteria for a single search call
///
/// All criteria are optional refinements; an empty request matches every
/// approved resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRequest {
    pub keyword: Option<String>,
    pub categories: BTreeSet<String>,
    pub featured_only: bool,
}

impl FilterRequest {
    /// Build a request from raw query parameters (`q`, `category`, `featured`)
    ///
    /// Never fails: anything malformed is treated as not provided.
    pub fn from_params(q: Option<&str>, category: Option<&str>, featured: Option<&str>) -> Self {
        let categories = category
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            categories,
            featured_only: crate::models::requests::parse_flag(featured),
            ..Self::default()
        }
        .with_keyword(q.unwrap_or_default())
    }

    /// Set the keyword; blank keywords clear it
    pub fn with_keyword(mut self, keyword: &str) -> Self {
        let trimmed = keyword.trim();
        self.keyword = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.categories.insert(category.to_string());
        self
    }

    pub fn featured_only(mut self) -> Self {
        self.featured_only = true;
        self
    }
}

/// One independent clause of a resource query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Only approved resources are ever surfaced
    Approved,
    /// Lowercased keyword, substring of title, description or tags
    Keyword(String),
    /// Exact, case-sensitive category membership
    CategoryIn(BTreeSet<String>),
    FeaturedOnly,
}

impl Predicate {
    #[inline]
    pub fn matches(&self, resource: &Resource) -> bool {
        match self {
            Predicate::Approved => resource.is_approved,
            Predicate::Keyword(keyword) => {
                resource.title.to_lowercase().contains(keyword.as_str())
                    || resource.description.to_lowercase().contains(keyword.as_str())
                    || resource
                        .tags
                        .as_deref()
                        .map(|tags| tags.to_lowercase().contains(keyword.as_str()))
                        .unwrap_or(false)
            }
            Predicate::CategoryIn(categories) => categories.contains(&resource.category),
            Predicate::FeaturedOnly => resource.is_featured,
        }
    }

    fn push_sql(&self, qb: &mut sqlx::QueryBuilder<'_, Postgres>) {
        match self {
            Predicate::Approved => {
                qb.push("is_approved = true");
            }
            Predicate::Keyword(keyword) => {
                let pattern = format!("%{}%", escape_like(keyword));
                qb.push("(title ILIKE ");
                qb.push_bind(pattern.clone());
                qb.push(" OR description ILIKE ");
                qb.push_bind(pattern.clone());
                qb.push(" OR tags ILIKE ");
                qb.push_bind(pattern);
                qb.push(")");
            }
            Predicate::CategoryIn(categories) => {
                qb.push("category = ANY(");
                qb.push_bind(categories.iter().cloned().collect::<Vec<String>>());
                qb.push(")");
            }
            Predicate::FeaturedOnly => {
                qb.push("is_featured = true");
            }
        }
    }
}

/// Escape LIKE metacharacters so the keyword is matched literally
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Translates a [`FilterRequest`] into a list of AND-combined predicates
///
/// The same predicate list drives both in-memory filtering and the SQL
/// `WHERE` clause sent to Postgres.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    predicates: Vec<Predicate>,
}

impl QueryBuilder {
    pub fn new(filter: &FilterRequest) -> Self {
        let mut predicates = vec![Predicate::Approved];

        if let Some(keyword) = &filter.keyword {
            predicates.push(Predicate::Keyword(keyword.to_lowercase()));
        }
        if !filter.categories.is_empty() {
            predicates.push(Predicate::CategoryIn(filter.categories.clone()));
        }
        if filter.featured_only {
            predicates.push(Predicate::FeaturedOnly);
        }

        Self { predicates }
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    #[inline]
    pub fn matches(&self, resource: &Resource) -> bool {
        self.predicates.iter().all(|p| p.matches(resource))
    }

    /// Select the matching resources, featured first
    pub fn apply(&self, resources: Vec<Resource>) -> Vec<Resource> {
        let mut matched: Vec<Resource> = resources
            .into_iter()
            .filter(|r| self.matches(r))
            .collect();

        matched.sort_by(compare_resources);
        matched
    }

    /// Append ` WHERE ...` for every predicate to a SQL query
    pub fn push_where(&self, qb: &mut sqlx::QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE ");
        for (i, predicate) in self.predicates.iter().enumerate() {
            if i > 0 {
                qb.push(" AND ");
            }
            predicate.push_sql(qb);
        }
    }
}

/// Featured first, then newest, then lowest id
pub fn compare_resources(a: &Resource, b: &Resource) -> Ordering {
    b.is_featured
        .cmp(&a.is_featured)
        .then_with(|| match (a.created_at, b.created_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id.cmp(&b.id))
}
