mod ops;

pub(crate) use ops::{
    create_chapter, create_summary, delete_chapter, delete_summary, reorder_chapter,
    save_chapter, save_document, save_summary,
};

use crate::api::{CreateChapterRequest, CreateSummaryRequest, UpdateChapterRequest};
use crate::delta::Delta;
use serde::{Deserialize, Deserializer, Serialize};

/// One editable rich-text body of a summary page.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum DocumentKey {
    Summary,
    Chapter(String),
}

/// Go encodes an empty chapter slice as `null`.
fn null_as_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub(crate) struct Chapter {
    #[serde(default)]
    id: String,
    #[serde(default)]
    heading: String,
    #[serde(default)]
    html: String,
    #[serde(default, with = "crate::delta::wire")]
    delta: Delta,
}

impl Chapter {
    pub(crate) fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn heading(&self) -> &str {
        &self.heading
    }

    #[allow(dead_code)]
    pub(crate) fn set_heading(&mut self, heading: impl Into<String>) {
        self.heading = heading.into();
    }

    #[allow(dead_code)]
    pub(crate) fn html(&self) -> &str {
        &self.html
    }

    #[allow(dead_code)]
    pub(crate) fn set_html(&mut self, html: impl Into<String>) {
        self.html = html.into();
    }

    #[allow(dead_code)]
    pub(crate) fn delta(&self) -> &Delta {
        &self.delta
    }

    #[allow(dead_code)]
    pub(crate) fn set_delta(&mut self, delta: Delta) {
        self.delta = delta;
    }

    pub(crate) fn update_request(&self) -> UpdateChapterRequest {
        UpdateChapterRequest {
            heading: self.heading.clone(),
            html: self.html.clone(),
            delta: self.delta.to_wire(),
        }
    }
}

/// Title, author and link: the fields the details popup edits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct SummaryDetails {
    pub title: String,
    pub book_author: String,
    pub book_url: String,
}

/// A book review as stored behind `/summaries/{uid}`.
///
/// `uid` has no setter: it is empty until the server assigns one and only
/// changes by hydrating a server response.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub(crate) struct BookSummary {
    #[serde(default)]
    uid: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    book_author: String,
    #[serde(default)]
    book_url: String,
    #[serde(default)]
    html: String,
    #[serde(default, with = "crate::delta::wire")]
    delta: Delta,
    // Server-owned; echoed back untouched so the server can parse them.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    date_created: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    date_updated: String,
    #[serde(default)]
    is_ongoing: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    chapters: Vec<Chapter>,
}

impl BookSummary {
    pub(crate) fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub(crate) fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    #[allow(dead_code)]
    pub(crate) fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    pub(crate) fn uid(&self) -> &str {
        &self.uid
    }

    pub(crate) fn is_created(&self) -> bool {
        !self.uid.trim().is_empty()
    }

    /// Nothing has been written yet.
    #[allow(dead_code)]
    pub(crate) fn is_new(&self) -> bool {
        self.html.trim().is_empty()
    }

    pub(crate) fn title(&self) -> &str {
        &self.title
    }

    #[allow(dead_code)]
    pub(crate) fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub(crate) fn book_author(&self) -> &str {
        &self.book_author
    }

    #[allow(dead_code)]
    pub(crate) fn set_book_author(&mut self, author: impl Into<String>) {
        self.book_author = author.into();
    }

    pub(crate) fn book_url(&self) -> &str {
        &self.book_url
    }

    #[allow(dead_code)]
    pub(crate) fn set_book_url(&mut self, url: impl Into<String>) {
        self.book_url = url.into();
    }

    #[allow(dead_code)]
    pub(crate) fn html(&self) -> &str {
        &self.html
    }

    #[allow(dead_code)]
    pub(crate) fn set_html(&mut self, html: impl Into<String>) {
        self.html = html.into();
    }

    #[allow(dead_code)]
    pub(crate) fn delta(&self) -> &Delta {
        &self.delta
    }

    #[allow(dead_code)]
    pub(crate) fn set_delta(&mut self, delta: Delta) {
        self.delta = delta;
    }

    pub(crate) fn is_ongoing(&self) -> bool {
        self.is_ongoing
    }

    pub(crate) fn set_ongoing(&mut self, ongoing: bool) {
        self.is_ongoing = ongoing;
    }

    pub(crate) fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub(crate) fn chapter(&self, id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    pub(crate) fn chapter_mut(&mut self, id: &str) -> Option<&mut Chapter> {
        self.chapters.iter_mut().find(|c| c.id == id)
    }

    pub(crate) fn chapter_index(&self, id: &str) -> Option<usize> {
        self.chapters.iter().position(|c| c.id == id)
    }

    pub(crate) fn details(&self) -> SummaryDetails {
        SummaryDetails {
            title: self.title.clone(),
            book_author: self.book_author.clone(),
            book_url: self.book_url.clone(),
        }
    }

    pub(crate) fn apply_details(&mut self, details: &SummaryDetails) {
        self.title = details.title.trim().to_string();
        self.book_author = details.book_author.trim().to_string();
        self.book_url = details.book_url.trim().to_string();
    }

    /// Copy an editor's rendered HTML and full contents into the matching document.
    /// Returns false when the chapter no longer exists.
    pub(crate) fn set_document_content(
        &mut self,
        key: &DocumentKey,
        html: String,
        delta: Delta,
    ) -> bool {
        match key {
            DocumentKey::Summary => {
                self.html = html;
                self.delta = delta;
                true
            }
            DocumentKey::Chapter(id) => match self.chapter_mut(id) {
                Some(chapter) => {
                    chapter.html = html;
                    chapter.delta = delta;
                    true
                }
                None => false,
            },
        }
    }

    pub(crate) fn document_html(&self, key: &DocumentKey) -> Option<&str> {
        match key {
            DocumentKey::Summary => Some(&self.html),
            DocumentKey::Chapter(id) => self.chapter(id).map(Chapter::html),
        }
    }

    /// Replace our fields with a server response, keeping the identity rule intact.
    pub(crate) fn hydrate(&mut self, server: BookSummary) {
        if self.is_created() && server.uid != self.uid {
            return;
        }
        *self = server;
    }

    pub(crate) fn create_request(&self, chapter_headings: &[String]) -> CreateSummaryRequest {
        CreateSummaryRequest {
            title: self.title.clone(),
            book_author: self.book_author.clone(),
            book_url: self.book_url.clone(),
            chapters: chapter_headings
                .iter()
                .map(|h| CreateChapterRequest { heading: h.clone() })
                .collect(),
        }
    }

    /// Remove at `from`, insert at `to`; the same move the server performs.
    pub(crate) fn move_chapter(&mut self, from: usize, to: usize) -> bool {
        if from >= self.chapters.len() || to >= self.chapters.len() {
            return false;
        }
        let chapter = self.chapters.remove(from);
        self.chapters.insert(to, chapter);
        true
    }

    pub(crate) fn remove_chapter(&mut self, id: &str) -> Option<Chapter> {
        let index = self.chapter_index(id)?;
        Some(self.chapters.remove(index))
    }

    pub(crate) fn prepend_chapter(&mut self, chapter: Chapter) {
        self.chapters.insert(0, chapter);
    }
}

/// Split the popup's comma-separated chapter list into headings.
pub(crate) fn parse_chapter_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
pub(crate) fn chapter_for_test(id: &str, heading: &str) -> Chapter {
    Chapter {
        id: id.to_string(),
        heading: heading.to_string(),
        ..Default::default()
    }
}
