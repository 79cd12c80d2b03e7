use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Store-assigned identifier, strictly positive.
    pub id: u64,
    pub title: String,
    pub content: String,
    /// Optional cover image, always a well-formed absolute URL.
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order in which list endpoints return articles, by creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Wire literals accepted by the query schemas.
    pub const VARIANTS: &'static [(&'static str, Self)] = &[("asc", Self::Asc), ("desc", Self::Desc)];

    /// SQL keyword for this direction.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Voice requested from the content generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Casual,
    Professional,
    Technical,
}

impl Tone {
    /// Wire literals accepted by the generate schema.
    pub const VARIANTS: &'static [(&'static str, Self)] = &[
        ("casual", Self::Casual),
        ("professional", Self::Professional),
        ("technical", Self::Technical),
    ];
}

/// One page of a listing plus the total number of matching items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
}

impl<T> Page<T> {
    /// Zero-based offset of the first item on `page`, saturating on overflow.
    #[must_use]
    pub fn offset(page: u64, page_size: u64) -> u64 {
        page.saturating_sub(1).saturating_mul(page_size)
    }
}

/// Draft produced by the content generator. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArticle {
    pub title: String,
    pub content: String,
    pub photo_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_direction_defaults_to_desc() {
        assert_eq!(SortDirection::default(), SortDirection::Desc);
        assert_eq!(serde_json::to_value(SortDirection::Asc).unwrap(), "asc");
        assert_eq!(SortDirection::Desc.as_sql(), "DESC");
    }

    #[test]
    fn page_offset_is_zero_based_and_saturating() {
        assert_eq!(Page::<()>::offset(1, 10), 0);
        assert_eq!(Page::<()>::offset(3, 10), 20);
        assert_eq!(Page::<()>::offset(u64::MAX, u64::MAX), u64::MAX);
    }

    #[test]
    fn article_uses_camel_case_on_the_wire() {
        let article = Article {
            id: 1,
            title: "t".into(),
            content: "c".into(),
            photo_url: None,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        };
        let value = serde_json::to_value(&article).unwrap();
        assert!(value.get("photoUrl").is_some());
        assert!(value.get("createdAt").is_some());
    }
}
