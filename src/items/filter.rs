//! Composition of listing filters into a storage-independent query.
//!
//! A [`FilterRequest`] is turned into an [`ItemQuery`]: one [`Predicate`]
//! (the AND of every condition the request contributes), one [`Ordering`]
//! and a validated limit. Stores either evaluate the predicate directly
//! ([`Predicate::matches`], [`Ordering::compare`]) or translate it.

use std::{cmp, collections::BTreeSet, str::FromStr};
use thiserror::Error;
use uuid::Uuid;

use crate::{entities::Item, resolver::MimeType};

pub const DEFAULT_LIMIT: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadState {
    #[default]
    Unread,
    Read,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentTypeFilter {
    Article,
    Image,
    Video,
    #[default]
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Title,
    Site,
}

impl FromStr for ReadState {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unread" => Ok(Self::Unread),
            "read" => Ok(Self::Read),
            "all" => Ok(Self::All),
            other => Err(FilterError::InvalidArgument(format!("unknown state '{other}'"))),
        }
    }
}

impl FromStr for ContentTypeFilter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "article" => Ok(Self::Article),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "all" => Ok(Self::All),
            other => Err(FilterError::InvalidArgument(format!(
                "unknown content type '{other}'"
            ))),
        }
    }
}

impl SortOrder {
    /// Unrecognized values fall back to [`SortOrder::Newest`].
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "oldest" => Self::Oldest,
            "title" => Self::Title,
            "site" => Self::Site,
            _ => Self::Newest,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRequest {
    pub user_id: Uuid,
    pub state: ReadState,
    pub content_type: ContentTypeFilter,
    pub sort: SortOrder,
    pub limit: i64,
    pub tags: BTreeSet<String>,
}

impl FilterRequest {
    /// Request for every unread item of `user_id`, newest first.
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            state: ReadState::default(),
            content_type: ContentTypeFilter::default(),
            sort: SortOrder::default(),
            limit: DEFAULT_LIMIT,
            tags: BTreeSet::new(),
        }
    }
}

/// Boolean expression over item fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `user_id = ?`
    Owner(Uuid),
    /// `unread = ?`
    Unread(bool),
    /// `mime_type = ?`
    MimeType(MimeType),
    /// Item has at least one of these tags.
    AnyTag(BTreeSet<String>),
    /// Conjunction.
    All(Vec<Predicate>),
}

impl Predicate {
    /// ANDs `conditions` together. A single condition is returned as is.
    pub fn all(mut conditions: Vec<Predicate>) -> Self {
        if conditions.len() == 1 {
            conditions.remove(0)
        } else {
            Self::All(conditions)
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Self::Owner(user_id) => item.user_id == *user_id,
            Self::Unread(unread) => item.unread == *unread,
            Self::MimeType(mime_type) => item.mime_type == *mime_type,
            Self::AnyTag(tags) => !item.tags.is_disjoint(tags),
            Self::All(conditions) => conditions.iter().all(|c| c.matches(item)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    DateResolved,
    Title,
    ResolvedUrl,
}

impl SortKey {
    /// SQL sort expression. Text columns compare bytewise, matching
    /// [`Ordering::compare`].
    pub fn column(&self) -> &'static str {
        match self {
            Self::DateResolved => "date_resolved",
            Self::Title => r#"title COLLATE "C""#,
            Self::ResolvedUrl => r#"resolved_url COLLATE "C""#,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering {
    pub key: SortKey,
    pub direction: Direction,
}

impl Ordering {
    /// Compares by the sort key, then by item id so equal keys keep a stable
    /// order across stores.
    pub fn compare(&self, a: &Item, b: &Item) -> cmp::Ordering {
        let ordering = match self.key {
            SortKey::DateResolved => a.date_resolved.cmp(&b.date_resolved),
            SortKey::Title => a.title.cmp(&b.title),
            SortKey::ResolvedUrl => a.resolved_url.cmp(&b.resolved_url),
        }
        .then_with(|| a.id.cmp(&b.id));
        match self.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }
}

impl From<SortOrder> for Ordering {
    fn from(sort: SortOrder) -> Self {
        let (key, direction) = match sort {
            SortOrder::Newest => (SortKey::DateResolved, Direction::Desc),
            SortOrder::Oldest => (SortKey::DateResolved, Direction::Asc),
            SortOrder::Title => (SortKey::Title, Direction::Asc),
            SortOrder::Site => (SortKey::ResolvedUrl, Direction::Asc),
        };
        Self { key, direction }
    }
}

/// Fully composed listing query handed to an item store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub predicate: Predicate,
    pub ordering: Ordering,
    pub limit: i64,
}

pub fn compose(request: &FilterRequest) -> Result<ItemQuery, FilterError> {
    if request.limit <= 0 {
        return Err(FilterError::InvalidArgument(format!(
            "limit must be positive, got {}",
            request.limit
        )));
    }

    let mut conditions = vec![Predicate::Owner(request.user_id)];

    match request.state {
        ReadState::All => {}
        ReadState::Unread => conditions.push(Predicate::Unread(true)),
        ReadState::Read => conditions.push(Predicate::Unread(false)),
    }

    match request.content_type {
        ContentTypeFilter::All => {}
        ContentTypeFilter::Article => conditions.push(Predicate::MimeType(MimeType::Text)),
        ContentTypeFilter::Image => conditions.push(Predicate::MimeType(MimeType::Image)),
        ContentTypeFilter::Video => conditions.push(Predicate::MimeType(MimeType::Video)),
    }

    if !request.tags.is_empty() {
        conditions.push(Predicate::AnyTag(request.tags.clone()));
    }

    Ok(ItemQuery {
        predicate: Predicate::all(conditions),
        ordering: request.sort.into(),
        limit: request.limit,
    })
}
