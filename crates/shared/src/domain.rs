use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PathError;

/// Deepest selection supported: country, province, county.
pub const MAX_PATH_DEPTH: usize = 3;

/// One point of a cumulative series, `["2021-01-01", 100]` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateCount(pub NaiveDate, pub i64);

impl DateCount {
    pub fn new(date: NaiveDate, count: i64) -> Self {
        Self(date, count)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn count(&self) -> i64 {
        self.1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationLevel {
    Country,
    Province,
    County,
}

impl LocationLevel {
    pub const ALL: [LocationLevel; MAX_PATH_DEPTH] = [
        LocationLevel::Country,
        LocationLevel::Province,
        LocationLevel::County,
    ];

    pub fn depth(self) -> usize {
        match self {
            LocationLevel::Country => 1,
            LocationLevel::Province => 2,
            LocationLevel::County => 3,
        }
    }

    pub fn from_depth(depth: usize) -> Option<Self> {
        match depth {
            1 => Some(LocationLevel::Country),
            2 => Some(LocationLevel::Province),
            3 => Some(LocationLevel::County),
            _ => None,
        }
    }

    /// Placeholder entry shown at the top of a picker for this level.
    pub fn placeholder(self) -> &'static str {
        match self {
            LocationLevel::Country => "choose country",
            LocationLevel::Province => "all provinces",
            LocationLevel::County => "all counties",
        }
    }
}

impl fmt::Display for LocationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LocationLevel::Country => "country",
            LocationLevel::Province => "province",
            LocationLevel::County => "county",
        };
        f.write_str(label)
    }
}

/// A country, province or county. Children arrive as `provinces` on
/// countries and `counties` on provinces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationNode {
    pub name: String,
    #[serde(
        default,
        alias = "provinces",
        alias = "counties",
        skip_serializing_if = "Option::is_none"
    )]
    pub children: Option<Vec<LocationNode>>,
}

impl LocationNode {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: None,
        }
    }

    pub fn with_children(name: impl Into<String>, children: Vec<LocationNode>) -> Self {
        Self {
            name: name.into(),
            children: Some(children),
        }
    }

    pub fn children(&self) -> &[LocationNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn has_children(&self) -> bool {
        !self.children().is_empty()
    }

    pub fn child(&self, name: &str) -> Option<&LocationNode> {
        find_by_name(self.children(), name)
    }
}

/// Name-equality lookup. An empty name never matches.
pub fn find_by_name<'a>(nodes: &'a [LocationNode], name: &str) -> Option<&'a LocationNode> {
    if name.is_empty() {
        return None;
    }
    nodes.iter().find(|node| node.name == name)
}

/// Walk from the root of the location tree to the selected leaf.
///
/// Persisted as a JSON array of up to three names. Reading is lenient: the
/// path ends at the first `null` or empty entry and extra entries are
/// dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Option<String>>", into = "Vec<String>")]
pub struct SelectionPath {
    segments: Vec<String>,
}

impl SelectionPath {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.len() > MAX_PATH_DEPTH {
            return Err(PathError::TooDeep {
                max: MAX_PATH_DEPTH,
                actual: segments.len(),
            });
        }
        if let Some(index) = segments.iter().position(|s| s.is_empty()) {
            return Err(PathError::EmptySegment { index });
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn country(&self) -> Option<&str> {
        self.segment(0)
    }

    pub fn province(&self) -> Option<&str> {
        self.segment(1)
    }

    pub fn county(&self) -> Option<&str> {
        self.segment(2)
    }

    /// Name of the most specific selected location.
    pub fn leaf(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn level(&self) -> Option<LocationLevel> {
        LocationLevel::from_depth(self.segments.len())
    }

    /// This path extended by one more level.
    pub fn child(&self, name: impl Into<String>) -> Result<Self, PathError> {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self::new(segments)
    }

    pub fn truncated(&self, depth: usize) -> Self {
        Self {
            segments: self.segments.iter().take(depth).cloned().collect(),
        }
    }

    fn segment(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }
}

impl From<Vec<Option<String>>> for SelectionPath {
    fn from(raw: Vec<Option<String>>) -> Self {
        let segments = raw
            .into_iter()
            .map_while(|segment| segment.filter(|s| !s.is_empty()))
            .take(MAX_PATH_DEPTH)
            .collect();
        Self { segments }
    }
}

impl From<SelectionPath> for Vec<String> {
    fn from(path: SelectionPath) -> Self {
        path.segments
    }
}

impl fmt::Display for SelectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("(none)");
        }
        f.write_str(&self.segments.join(" / "))
    }
}
