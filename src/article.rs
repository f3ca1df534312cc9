use serde::Serialize;
use sqlx::FromRow;

/// A headline as extracted from a feed, before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    pub source: String,
    pub title: String,
    pub link: String,
    pub published: String,
}

impl Article {
    pub fn new(
        source: impl Into<String>,
        title: impl Into<String>,
        link: impl Into<String>,
        published: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
            link: link.into(),
            published: published.into(),
        }
    }
}

/// A row of the `news` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct StoredArticle {
    #[serde(skip_serializing)]
    pub id: i64,
    pub source: String,
    pub title: String,
    pub link: String,
    pub published: String,
    /// UTC, `YYYY-MM-DD HH:MM:SS`
    pub created_at: String,
}

impl From<StoredArticle> for Article {
    fn from(stored: StoredArticle) -> Self {
        Self {
            source: stored.source,
            title: stored.title,
            link: stored.link,
            published: stored.published,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_article_has_no_created_at() {
        let article = Article::new("BBC", "Headline", "https://bbc.co.uk/1", "Mon, 09 Dec 2024");
        let json = serde_json::to_value(&article).unwrap();

        assert_eq!(json["source"], "BBC");
        assert_eq!(json["title"], "Headline");
        assert_eq!(json["published"], "Mon, 09 Dec 2024");
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn test_stored_article_hides_id() {
        let stored = StoredArticle {
            id: 42,
            source: "BBC".to_string(),
            title: "Headline".to_string(),
            link: "https://bbc.co.uk/1".to_string(),
            published: String::new(),
            created_at: "2024-12-09 12:00:00".to_string(),
        };
        let json = serde_json::to_value(&stored).unwrap();

        assert!(json.get("id").is_none());
        assert_eq!(json["created_at"], "2024-12-09 12:00:00");
        assert_eq!(json["published"], "");
    }

    #[test]
    fn test_stored_into_article() {
        let stored = StoredArticle {
            id: 1,
            source: "Al Jazeera".to_string(),
            title: "T".to_string(),
            link: "L".to_string(),
            published: "P".to_string(),
            created_at: "2024-12-09 12:00:00".to_string(),
        };
        assert_eq!(Article::from(stored), Article::new("Al Jazeera", "T", "L", "P"));
    }
}
