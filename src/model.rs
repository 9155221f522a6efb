// Core structs: CanonicalSeries, TopicDescriptor and the error taxonomy
use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;

/// Daily observations of one measured quantity, ascending by date.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalSeries {
    label: String,
    points: Vec<(NaiveDate, f64)>,
}

impl CanonicalSeries {
    /// Builds a series from unordered raw points.
    ///
    /// Non-finite values are dropped, points are sorted by date and a later
    /// point on an already seen date replaces the earlier one. An empty result
    /// is an error so that callers never hand an empty series downstream.
    pub fn from_points(
        label: impl Into<String>,
        raw: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Result<Self, SeriesError> {
        let mut by_date = BTreeMap::new();
        for (date, value) in raw {
            if value.is_finite() {
                by_date.insert(date, value);
            }
        }
        if by_date.is_empty() {
            return Err(SeriesError::Empty);
        }
        Ok(Self {
            label: label.into(),
            points: by_date.into_iter().collect(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.points[0].0
    }

    pub fn last_date(&self) -> NaiveDate {
        self.points[self.points.len() - 1].0
    }

    pub fn latest(&self) -> f64 {
        self.points[self.points.len() - 1].1
    }
}

/// The entity analyzed in one run.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicDescriptor {
    pub id: String,
    pub display_name: String,
    pub context_summary: Option<String>,
}

impl TopicDescriptor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            context_summary: None,
        }
    }

    /// Topic whose display name is derived from the id (`Eric_Dane` -> `Eric Dane`).
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        let display_name = crate::utils::display_name(&id);
        Self::new(id, display_name)
    }

    pub fn with_summary(mut self, summary: Option<String>) -> Self {
        self.context_summary = summary.filter(|s| !s.trim().is_empty());
        self
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("series has no usable points")]
    Empty,
}

/// Transport-level failure of a single request. Retried by the adapters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(String),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("invalid payload: {0}")]
    Payload(String),
    #[error("response contained no items")]
    Empty,
}

impl FetchError {
    /// Whether repeating the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(_) | FetchError::Timeout => true,
            FetchError::Status(code) => *code == 429 || *code >= 500,
            FetchError::Payload(_) | FetchError::Empty => false,
        }
    }
}

/// Terminal adapter outcome: nothing usable came back.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NoDataError {
    #[error("{source_name}: request failed after retries: {cause}")]
    Exhausted { source_name: String, cause: FetchError },
    #[error("{source_name}: upstream returned no items")]
    Empty { source_name: String },
    #[error("{source_name}: missing credential {variable}")]
    MissingCredential {
        source_name: String,
        variable: &'static str,
    },
    #[error("{source_name}: malformed response: {detail}")]
    Malformed { source_name: String, detail: String },
}

impl NoDataError {
    pub fn empty(source_name: &str) -> Self {
        NoDataError::Empty {
            source_name: source_name.to_string(),
        }
    }

    pub fn exhausted(source_name: &str, cause: FetchError) -> Self {
        NoDataError::Exhausted {
            source_name: source_name.to_string(),
            cause,
        }
    }

    /// Terminal classification of the last request error.
    pub fn from_fetch(source_name: &str, cause: FetchError) -> Self {
        match cause {
            FetchError::Empty => Self::empty(source_name),
            FetchError::Payload(detail) => Self::malformed(source_name, detail),
            other => Self::exhausted(source_name, other),
        }
    }

    pub fn malformed(source_name: &str, detail: impl Into<String>) -> Self {
        NoDataError::Malformed {
            source_name: source_name.to_string(),
            detail: detail.into(),
        }
    }
}

/// Failure of a chart renderer or publisher.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("{sink}: missing credential {variable}")]
    MissingCredential {
        sink: &'static str,
        variable: &'static str,
    },
    #[error("{sink}: api error: {detail}")]
    Api { sink: &'static str, detail: String },
    #[error("{sink}: unreachable")]
    Unreachable { sink: &'static str },
    #[error("{sink}: io error: {source}")]
    Io {
        sink: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{sink}: render failed: {detail}")]
    Render { sink: &'static str, detail: String },
}
