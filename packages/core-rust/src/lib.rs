//! Articles core: validation issues, the `Schema` capability, article schemas and types.
//!
//! This crate is framework-free. The HTTP server applies these schemas at its
//! input gates; anything that satisfies [`Schema`] can be plugged in there.

pub mod articles;
pub mod clock;
pub mod issue;
pub mod rules;
pub mod schema;
pub mod types;

pub use articles::{
    ArticleIdParams, ArticleIdParamsSchema, ArticlePatch, ArticlesByDatesQuery,
    ArticlesByDatesQuerySchema, CreateArticleSchema, GenerateArticleRequest,
    GenerateArticleSchema, ListArticlesQuery, ListArticlesQuerySchema, NewArticle,
    UpdateArticleSchema,
};
pub use clock::{ClockSource, FixedClock, SystemClock};
pub use issue::{IssueCode, PathSegment, ValidationIssue, ValidationIssues};
pub use schema::{ObjectReader, Schema};
pub use types::{Article, GeneratedArticle, Page, SortDirection, Tone};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
