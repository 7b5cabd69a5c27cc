//! Wire types shared with the identifier source and the content endpoints.
//!
//! The identifier exchange is batched and asynchronous:
//! - the canvas sends an [`IdentifierRequest`] listing newly visible cells;
//! - the source later answers with an [`IdentifierBatch`] of parallel arrays.
//!
//! Batches may arrive out of order and after the cells they describe have
//! left the screen. Cell keys travel as their canonical `"gx,gy"` strings.

use std::borrow::Cow;

use foundation::grid::CellKey;
use serde::{Deserialize, Serialize};

use crate::request::ContentId;

/// Cells whose content ids are wanted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdentifierRequest {
    #[serde(with = "cell_keys")]
    pub keys: Vec<CellKey>,
}

impl IdentifierRequest {
    pub fn new(keys: Vec<CellKey>) -> Self {
        Self { keys }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Content ids for cells, as parallel arrays: `content_ids[i]` belongs to `keys[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierBatch {
    pub content_ids: Vec<ContentId>,
    #[serde(with = "cell_keys")]
    pub keys: Vec<CellKey>,
}

impl IdentifierBatch {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (CellKey, ContentId)>) -> Self {
        let (keys, content_ids) = pairs.into_iter().unzip();
        Self { content_ids, keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len().min(self.content_ids.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Both arrays have the same length.
    pub fn is_aligned(&self) -> bool {
        self.keys.len() == self.content_ids.len()
    }

    /// Zips the parallel arrays; surplus entries on the longer side are dropped.
    pub fn pairs(&self) -> impl Iterator<Item = (CellKey, &ContentId)> + '_ {
        self.keys.iter().copied().zip(self.content_ids.iter())
    }
}

/// URL with an `{id}` placeholder, used for content fetches and for the
/// detail page a dwell navigates to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    pub const PLACEHOLDER: &'static str = "{id}";

    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn has_placeholder(&self) -> bool {
        self.0.contains(Self::PLACEHOLDER)
    }

    /// Substitutes `id` as a single percent-encoded path segment; a template
    /// without a placeholder gets `/{id}` appended.
    pub fn render(&self, id: &ContentId) -> String {
        let segment = path_segment(id.as_str());
        if self.has_placeholder() {
            self.0.replace(Self::PLACEHOLDER, &segment)
        } else {
            format!("{}/{}", self.0.trim_end_matches('/'), segment)
        }
    }
}

/// Dot segments survive `urlencoding` and would be collapsed by URL parsers.
fn path_segment(id: &str) -> Cow<'_, str> {
    match id {
        "." => Cow::Borrowed("%2E"),
        ".." => Cow::Borrowed("%2E%2E"),
        _ => urlencoding::encode(id),
    }
}

mod cell_keys {
    use foundation::grid::CellKey;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(keys: &[CellKey], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(keys.iter().map(|k| k.to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<CellKey>, D::Error> {
        let raw = Vec::<String>::deserialize(d)?;
        raw.iter()
            .map(|s| s.parse::<CellKey>().map_err(D::Error::custom))
            .collect()
    }
}
