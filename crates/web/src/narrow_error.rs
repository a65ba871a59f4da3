//! The notice shown in place of a message feed that has nothing to show.

use {
    askama::Template,
    serde::{Deserialize, Serialize},
};

use crate::error::{Error, Result};

/// One word of a search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWord {
    pub query_word: String,
    /// The server ignores this word when searching.
    pub is_stop_word: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchData {
    pub query_words: Vec<QueryWord>,
    pub has_stop_word: bool,
}

impl SearchData {
    /// Build from `(word, is_stop_word)` pairs.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        let query_words: Vec<QueryWord> = words
            .into_iter()
            .map(|(word, is_stop_word)| QueryWord {
                query_word: word.into(),
                is_stop_word,
            })
            .collect();
        let has_stop_word = query_words.iter().any(|w| w.is_stop_word);
        Self {
            query_words,
            has_stop_word,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrowBannerData {
    pub title: String,
    /// Trusted markup explaining the empty view. Inserted unescaped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_data: Option<SearchData>,
}

#[derive(Template)]
#[template(path = "empty_feed_notice.html", escape = "html")]
struct EmptyFeedNoticeTemplate<'a> {
    title: &'a str,
    notice_html: Option<&'a str>,
    search_data: Option<&'a SearchData>,
}

/// Render the empty-feed notice. Search details take precedence over the
/// explanatory markup.
pub fn narrow_error(data: &NarrowBannerData) -> Result<String> {
    EmptyFeedNoticeTemplate {
        title: &data.title,
        notice_html: data.html.as_deref(),
        search_data: data.search_data.as_ref(),
    }
    .render()
    .map_err(|e| Error::render("empty_feed_notice.html", e))
}
