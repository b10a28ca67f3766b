use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt::Display;

use crate::db::store::Patch;
use crate::error::{AppError, AppResult};

/// Kind of catalog entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    #[default]
    Movie,
    WebSeries,
    Podcast,
    TvChannel,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Movie => "movie",
            Category::WebSeries => "web-series",
            Category::Podcast => "podcast",
            Category::TvChannel => "tv-channel",
            Category::Other => "other",
        }
    }

    /// Episodic categories carry an episode list instead of a single link
    pub fn is_episodic(&self) -> bool {
        matches!(self, Category::WebSeries)
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One playable part of an episodic item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Episode {
    pub title: String,
    pub url: String,
}

// Catalog fields are read leniently: a value of the wrong type decodes as the
// field's default.

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_votes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f as u64)
            })
            .unwrap_or(0),
        _ => 0,
    })
}

fn lenient_category<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Category, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => Category::default(),
        value => serde_json::from_value(value).unwrap_or(Category::Other),
    })
}

fn lenient_episodes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Episode>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(entries) => entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// A watchable catalog entry as returned to clients
///
/// The fields after `thumbnail_url` are filled in by the metadata provider at
/// read time and are never written back to the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_category")]
    pub category: Category,
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub url: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_episodes",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub episodes: Vec<Episode>,
    #[serde(default, deserialize_with = "lenient_votes")]
    pub votes: u64,
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub thumbnail_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_thumbnail_url: Option<String>,
    /// Length in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl ContentItem {
    /// Case-insensitive substring match on the title; a blank needle matches all
    pub fn title_contains(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        needle.is_empty() || self.title.to_lowercase().contains(&needle)
    }

    /// Link to play: the item's own url, or the first episode's
    pub fn playable_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .or_else(|| self.episodes.first().map(|e| e.url.as_str()))
    }
}

/// Payload for adding an item to the catalog
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContentItem {
    pub title: String,
    pub category: Category,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub episodes: Vec<Episode>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl NewContentItem {
    /// Checks the required fields and the link/episode invariant for the category
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::InvalidInput("Title is required.".to_string()));
        }

        let has_url = self.url.as_deref().is_some_and(|u| !u.trim().is_empty());

        if self.category.is_episodic() {
            if has_url {
                return Err(AppError::InvalidInput(
                    "Web series take an episode list, not a single URL.".to_string(),
                ));
            }
            if self.episodes.is_empty() {
                return Err(AppError::InvalidInput(
                    "At least one episode is required.".to_string(),
                ));
            }
            if let Some(pos) = self
                .episodes
                .iter()
                .position(|e| e.title.trim().is_empty() || e.url.trim().is_empty())
            {
                return Err(AppError::InvalidInput(format!(
                    "Episode {} needs both a title and a URL.",
                    pos + 1
                )));
            }
        } else {
            if !has_url {
                return Err(AppError::InvalidInput("URL is required.".to_string()));
            }
            if !self.episodes.is_empty() {
                return Err(AppError::InvalidInput(format!(
                    "Category '{}' does not take episodes.",
                    self.category
                )));
            }
        }

        Ok(())
    }

    /// Document fields for a freshly created item
    pub fn into_patch(self) -> AppResult<Patch> {
        let mut patch = Patch::new()
            .set("title", self.title.trim())
            .set("category", self.category.as_str())
            .set("votes", 0)
            .server_timestamp("createdAt");

        if self.category.is_episodic() {
            patch = patch.set("episodes", serde_json::to_value(&self.episodes)?);
        } else if let Some(url) = self.url {
            patch = patch.set("url", url.trim());
        }

        if let Some(thumbnail) = self.thumbnail_url.filter(|t| !t.trim().is_empty()) {
            patch = patch.set("thumbnailUrl", thumbnail);
        }

        Ok(patch)
    }
}
