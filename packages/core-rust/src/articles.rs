//! Article request schemas and their parsed outputs.
//!
//! Two policies live side by side here and must stay different:
//!
//! - List, pagination, sort and date-range query fields never fail. A missing
//!   or invalid value is replaced by its fallback so list endpoints stay
//!   available.
//! - Identifier path parameters never fall back. Substituting a different id
//!   would silently address the wrong resource, so an invalid id is rejected.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::clock::{ClockSource, SystemClock};
use crate::issue::ValidationIssues;
use crate::rules;
use crate::schema::{ObjectReader, Schema};
use crate::types::{SortDirection, Tone};

/// Page used when `page` is missing or invalid.
pub const DEFAULT_PAGE: u64 = 1;
/// Page size used when `pageSize` is missing or invalid.
pub const DEFAULT_PAGE_SIZE: u64 = 10;
/// Largest accepted `pageSize`.
pub const MAX_PAGE_SIZE: u64 = 100;

// ---------------------------------------------------------------------------
// Double-Option helper for nullable + optional fields
// ---------------------------------------------------------------------------

/// Deserializes a field that may be absent (`None`), explicitly null
/// (`Some(None)`) or set (`Some(Some(v))`). Pair with `#[serde(default)]`.
#[allow(clippy::option_option)]
fn deserialize_double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Parsed `GET /articles` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListArticlesQuery {
    pub page: u64,
    pub page_size: u64,
    pub sort_direction: SortDirection,
}

impl Default for ListArticlesQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            sort_direction: SortDirection::Desc,
        }
    }
}

/// Parsed `GET /articles/search` query: pagination plus a creation-time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlesByDatesQuery {
    #[serde(flatten)]
    pub list: ListArticlesQuery,
    /// Inclusive lower bound.
    pub from: DateTime<Utc>,
    /// Inclusive upper bound.
    pub to: DateTime<Utc>,
}

/// Parsed `{id}` path parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleIdParams {
    pub id: u64,
}

/// Parsed body of `POST /articles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Parsed body of `PATCH /articles/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// `None` keeps the photo, `Some(None)` clears it, `Some(Some(url))` sets it.
    #[allow(clippy::option_option)]
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_double_option"
    )]
    pub photo_url: Option<Option<String>>,
}

/// Parsed body of `POST /articles/generate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateArticleRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
}

// ---------------------------------------------------------------------------
// Schemas
// ---------------------------------------------------------------------------

fn read_list_fields(reader: &mut ObjectReader<'_>) -> ListArticlesQuery {
    ListArticlesQuery {
        page: reader.catch("page", || DEFAULT_PAGE, |v| rules::positive_int(v, None)),
        page_size: reader.catch(
            "pageSize",
            || DEFAULT_PAGE_SIZE,
            |v| rules::positive_int(v, Some(MAX_PAGE_SIZE)),
        ),
        sort_direction: reader.catch("sortDirection", SortDirection::default, |v| {
            rules::one_of(v, SortDirection::VARIANTS)
        }),
    }
}

/// Lenient pagination and sort query. Never produces issues for fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListArticlesQuerySchema;

impl Schema for ListArticlesQuerySchema {
    type Output = ListArticlesQuery;

    fn validate(&self, raw: &Value) -> Result<Self::Output, ValidationIssues> {
        let mut reader = ObjectReader::new(raw)?;
        let query = read_list_fields(&mut reader);
        reader.finish(|| Some(query))
    }
}

/// Lenient date-range query. An invalid or missing `from` becomes the epoch;
/// an invalid or missing `to` becomes the clock's "now" at validation time.
#[derive(Clone)]
pub struct ArticlesByDatesQuerySchema {
    clock: Arc<dyn ClockSource>,
}

impl ArticlesByDatesQuerySchema {
    #[must_use]
    pub fn new(clock: Arc<dyn ClockSource>) -> Self {
        Self { clock }
    }
}

impl Default for ArticlesByDatesQuerySchema {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl Schema for ArticlesByDatesQuerySchema {
    type Output = ArticlesByDatesQuery;

    fn validate(&self, raw: &Value) -> Result<Self::Output, ValidationIssues> {
        let mut reader = ObjectReader::new(raw)?;
        let list = read_list_fields(&mut reader);
        let from = reader.catch("from", || DateTime::<Utc>::UNIX_EPOCH, rules::date);
        let to = reader.catch("to", || self.clock.now(), rules::date);
        reader.finish(|| Some(ArticlesByDatesQuery { list, from, to }))
    }
}

/// Strict `{id}` parameter shared by the get, update and delete routes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArticleIdParamsSchema;

impl Schema for ArticleIdParamsSchema {
    type Output = ArticleIdParams;

    fn validate(&self, raw: &Value) -> Result<Self::Output, ValidationIssues> {
        let mut reader = ObjectReader::new(raw)?;
        let id = reader.required("id", |v| rules::positive_int(v, None));
        reader.finish(|| Some(ArticleIdParams { id: id? }))
    }
}

/// Body of a new article.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateArticleSchema;

impl Schema for CreateArticleSchema {
    type Output = NewArticle;

    fn validate(&self, raw: &Value) -> Result<Self::Output, ValidationIssues> {
        let mut reader = ObjectReader::new(raw)?;
        let title = reader.required("title", rules::non_empty_string);
        let content = reader.required("content", rules::non_empty_string);
        let photo_url = reader.nullish("photoUrl", rules::url).flatten();
        reader.finish(|| {
            Some(NewArticle {
                title: title?,
                content: content?,
                photo_url,
            })
        })
    }
}

/// Partial update body. Every field is optional; present fields must be valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateArticleSchema;

impl Schema for UpdateArticleSchema {
    type Output = ArticlePatch;

    fn validate(&self, raw: &Value) -> Result<Self::Output, ValidationIssues> {
        let mut reader = ObjectReader::new(raw)?;
        let patch = ArticlePatch {
            title: reader.optional("title", rules::non_empty_string),
            content: reader.optional("content", rules::non_empty_string),
            photo_url: reader.nullish("photoUrl", rules::url),
        };
        reader.finish(|| Some(patch))
    }
}

/// Body of a draft-generation request.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateArticleSchema;

impl Schema for GenerateArticleSchema {
    type Output = GenerateArticleRequest;

    fn validate(&self, raw: &Value) -> Result<Self::Output, ValidationIssues> {
        let mut reader = ObjectReader::new(raw)?;
        let request = GenerateArticleRequest {
            topic: reader.optional("topic", rules::string),
            tone: reader.optional("tone", |v| rules::one_of(v, Tone::VARIANTS)),
        };
        reader.finish(|| Some(request))
    }
}
