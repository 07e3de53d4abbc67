//! Task list view: filter, search, sort and paginate the merged tasks.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};

use tasking_proto::task::{TaskCollection, TaskFeature, TaskId, TaskStatus, parse_action_date};

/// Rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 6;

/// Status filter offered above the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    /// Every task.
    #[default]
    All,
    /// READY or INVALIDATED.
    ReadyToMap,
    /// MAPPED or BADIMAGERY. Only offered to users who can validate.
    ReadyToValidate,
}

impl StatusFilter {
    /// Whether a task with `status` passes the filter.
    #[must_use]
    pub const fn matches(self, status: TaskStatus) -> bool {
        match self {
            Self::All => true,
            Self::ReadyToMap => status.is_mappable(),
            Self::ReadyToValidate => status.is_validatable(),
        }
    }

    /// The next filter in display order, skipping `ReadyToValidate` for
    /// users who cannot validate.
    #[must_use]
    pub const fn next(self, can_validate: bool) -> Self {
        match self {
            Self::All => Self::ReadyToMap,
            Self::ReadyToMap if can_validate => Self::ReadyToValidate,
            Self::ReadyToMap | Self::ReadyToValidate => Self::All,
        }
    }

    /// Label shown in the list header.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::ReadyToMap => "Ready for mapping",
            Self::ReadyToValidate => "Ready for validation",
        }
    }
}

/// List ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Ascending task id.
    #[default]
    Id,
    /// Most recently updated first; tasks never acted on go last.
    LastUpdate,
}

impl SortBy {
    /// The other ordering.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Id => Self::LastUpdate,
            Self::LastUpdate => Self::Id,
        }
    }

    /// Label shown in the list header.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Id => "Sort by id",
            Self::LastUpdate => "Sort by last update",
        }
    }
}

/// One line of the task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    /// Task id.
    pub id: TaskId,
    /// Current status.
    pub status: TaskStatus,
    /// Last acting user.
    pub action_by: Option<String>,
    /// Last action time, when it parses.
    pub updated: Option<DateTime<Utc>>,
}

impl TaskRow {
    fn from_feature(feature: &TaskFeature) -> Self {
        Self {
            id: feature.id(),
            status: feature.status(),
            action_by: feature.properties.action_by.clone(),
            updated: feature
                .properties
                .action_date
                .as_deref()
                .and_then(parse_action_date),
        }
    }

    fn matches_search(&self, needle: &str) -> bool {
        needle.parse::<u32>().is_ok_and(|id| id == self.id.get())
            || self
                .action_by
                .as_deref()
                .is_some_and(|by| by.contains(needle))
    }
}

/// The visible slice of the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage {
    /// Rows on this page.
    pub rows: Vec<TaskRow>,
    /// 1-based page number actually shown.
    pub page: usize,
    /// Number of pages (at least 1).
    pub pages: usize,
    /// Rows matching the filter and search, across all pages.
    pub matching: usize,
}

/// Filter, search, sort and page settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Status filter.
    pub filter: StatusFilter,
    /// Free-text search: a task id or part of a username.
    pub search: String,
    /// Ordering.
    pub sort: SortBy,
    /// Requested 1-based page.
    pub page: usize,
    /// Rows per page.
    pub page_size: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

/// Number of pages needed for `items` rows.
#[must_use]
pub const fn page_count(items: usize, page_size: usize) -> usize {
    if page_size == 0 || items == 0 {
        1
    } else {
        items.div_ceil(page_size)
    }
}

impl ListQuery {
    /// First page, no filter, sorted by id.
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            filter: StatusFilter::All,
            search: String::new(),
            sort: SortBy::Id,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Rows of `tasks` that pass the filter and search, in sort order.
    #[must_use]
    pub fn rows(&self, tasks: &TaskCollection) -> Vec<TaskRow> {
        let needle = self.search.trim();
        let mut rows: Vec<TaskRow> = tasks
            .features
            .iter()
            .filter(|f| self.filter.matches(f.status()))
            .map(TaskRow::from_feature)
            .filter(|row| needle.is_empty() || row.matches_search(needle))
            .collect();

        match self.sort {
            SortBy::Id => rows.sort_by_key(|row| row.id),
            SortBy::LastUpdate => {
                rows.sort_by_key(|row| (row.updated.is_none(), Reverse(row.updated), row.id));
            }
        }
        rows
    }

    /// The requested page of matching rows.
    ///
    /// A page past the end (or page 0) shows page 1.
    #[must_use]
    pub fn page(&self, tasks: &TaskCollection) -> ListPage {
        let rows = self.rows(tasks);
        let matching = rows.len();
        let pages = page_count(matching, self.page_size);
        let page = if (1..=pages).contains(&self.page) {
            self.page
        } else {
            1
        };
        let rows = rows
            .into_iter()
            .skip((page - 1) * self.page_size)
            .take(self.page_size)
            .collect();
        ListPage {
            rows,
            page,
            pages,
            matching,
        }
    }
}
