//! Deterministic article draft generator.

use std::sync::Arc;

use articles_core::{ClockSource, GenerateArticleRequest, GeneratedArticle};
use async_trait::async_trait;

use crate::traits::ContentGenerator;

/// Topic used when the request has none, or only whitespace.
pub const DEFAULT_TOPIC: &str = "Auto-generated blog";

/// Cover image attached to every draft.
pub const DEFAULT_PHOTO_URL: &str =
    "https://images.unsplash.com/photo-1455390582262-044cdead277a?auto=format&fit=crop&w=1200&q=80";

const BODY: &str = "In this article we explore the daily workflow behind the project, \
highlighting the trade-offs, the technical debt we avoided, and some of the intentional \
decisions that keep the stack lean.";

const OUTRO: &str = "Expect incremental updates as we gather telemetry and user feedback. \
Until then, stay curious and keep experimenting.";

/// Builds drafts from fixed copy around the requested topic.
///
/// The tone is accepted but does not change the output.
pub struct StaticContentGenerator {
    clock: Arc<dyn ClockSource>,
}

impl StaticContentGenerator {
    #[must_use]
    pub fn new(clock: Arc<dyn ClockSource>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl ContentGenerator for StaticContentGenerator {
    async fn generate(&self, request: GenerateArticleRequest) -> anyhow::Result<GeneratedArticle> {
        let topic = request
            .topic
            .as_deref()
            .map(str::trim)
            .filter(|topic| !topic.is_empty())
            .unwrap_or(DEFAULT_TOPIC);

        let intro = format!(
            "Welcome to another edition of our {} series.",
            topic.to_lowercase()
        );
        let date = self.clock.now().format("%b %-d");

        Ok(GeneratedArticle {
            title: format!("{topic} insights for {date}"),
            content: [intro.as_str(), BODY, OUTRO].join("\n\n"),
            photo_url: Some(DEFAULT_PHOTO_URL.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use articles_core::{FixedClock, Tone};
    use chrono::{TimeZone, Utc};

    use super::*;

    fn generator() -> StaticContentGenerator {
        let at = Utc.with_ymd_and_hms(2025, 2, 3, 12, 0, 0).unwrap();
        StaticContentGenerator::new(Arc::new(FixedClock(at)))
    }

    #[tokio::test]
    async fn uses_trimmed_topic_and_short_date() {
        let draft = generator()
            .generate(GenerateArticleRequest {
                topic: Some("  Rust Tooling ".into()),
                tone: Some(Tone::Technical),
            })
            .await
            .unwrap();
        assert_eq!(draft.title, "Rust Tooling insights for Feb 3");
        assert!(draft
            .content
            .starts_with("Welcome to another edition of our rust tooling series.\n\n"));
        assert_eq!(draft.content.split("\n\n").count(), 3);
        assert_eq!(draft.photo_url.as_deref(), Some(DEFAULT_PHOTO_URL));
    }

    #[tokio::test]
    async fn blank_topic_falls_back_to_default() {
        let draft = generator()
            .generate(GenerateArticleRequest {
                topic: Some("   ".into()),
                tone: None,
            })
            .await
            .unwrap();
        assert_eq!(draft.title, "Auto-generated blog insights for Feb 3");
    }

    #[tokio::test]
    async fn tone_does_not_change_output() {
        let casual = generator()
            .generate(GenerateArticleRequest {
                topic: None,
                tone: Some(Tone::Casual),
            })
            .await
            .unwrap();
        let plain = generator()
            .generate(GenerateArticleRequest::default())
            .await
            .unwrap();
        assert_eq!(casual, plain);
    }
}
