//! The two views and how their paths look.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::RunId;

/// Path prefix the views are served under by default.
pub const DEFAULT_BASE_PATH: &str = "/LKM-Fabricator";

/// A navigable view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum Route {
    /// The submission form, at `/`.
    Submit,
    /// Live status of one run, at `/monitor/<id>`.
    Monitor {
        /// Monitored run.
        run_id: RunId,
    },
    /// Anything else.
    NotFound {
        /// Path as given, base path removed.
        path: String,
    },
}

impl Route {
    /// Monitor route for `run_id`.
    #[must_use]
    pub fn monitor(run_id: RunId) -> Self {
        Self::Monitor { run_id }
    }

    /// Resolves `path`, stripping `base_path` if present.
    ///
    /// A trailing slash, a query string or a fragment does not change the
    /// result. Non-numeric run ids resolve to [`Route::NotFound`].
    #[must_use]
    pub fn parse(path: &str, base_path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let base = base_path.trim_end_matches('/');
        let relative = if base.is_empty() {
            path
        } else {
            match path.strip_prefix(base) {
                Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
                _ => path,
            }
        };

        let trimmed = relative.trim_end_matches('/');
        if trimmed.is_empty() {
            return Self::Submit;
        }
        if let Some(id) = trimmed.strip_prefix("/monitor/") {
            if let Ok(run_id) = id.parse::<RunId>() {
                return Self::Monitor { run_id };
            }
        }
        Self::NotFound {
            path: relative.to_string(),
        }
    }

    /// Full path of the route under `base_path`.
    #[must_use]
    pub fn to_path(&self, base_path: &str) -> String {
        let base = base_path.trim_end_matches('/');
        match self {
            Self::Submit => format!("{base}/"),
            Self::Monitor { run_id } => format!("{base}/monitor/{run_id}"),
            Self::NotFound { path } => format!("{base}{path}"),
        }
    }

    /// Page title.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::Submit => "LKM Fabricator",
            Self::Monitor { .. } => "Workflow Monitor",
            Self::NotFound { .. } => "404 - Page Not Found",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path(""))
    }
}

/// Something that can switch the active view.
#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send + Sync {
    /// Shows `route`.
    fn navigate(&self, route: &Route);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_under_base_path() {
        assert_eq!(Route::parse("/LKM-Fabricator/", DEFAULT_BASE_PATH), Route::Submit);
        assert_eq!(Route::parse("/LKM-Fabricator", DEFAULT_BASE_PATH), Route::Submit);
        assert_eq!(
            Route::parse("/LKM-Fabricator/monitor/123456", DEFAULT_BASE_PATH),
            Route::monitor(RunId(123_456))
        );
        assert_eq!(
            Route::parse("/LKM-Fabricator/monitor/42/?tab=logs", DEFAULT_BASE_PATH),
            Route::monitor(RunId(42))
        );
    }

    #[test]
    fn test_parse_without_base_path() {
        assert_eq!(Route::parse("/", ""), Route::Submit);
        assert_eq!(Route::parse("", ""), Route::Submit);
        assert_eq!(Route::parse("/monitor/7", ""), Route::monitor(RunId(7)));
        assert_eq!(Route::parse("/monitor/7", DEFAULT_BASE_PATH), Route::monitor(RunId(7)));
    }

    #[test]
    fn test_unknown_paths() {
        assert_eq!(
            Route::parse("/LKM-Fabricator/settings", DEFAULT_BASE_PATH),
            Route::NotFound { path: "/settings".into() }
        );
        assert_eq!(
            Route::parse("/monitor/abc", ""),
            Route::NotFound { path: "/monitor/abc".into() }
        );
        assert_eq!(
            Route::parse("/monitor/", ""),
            Route::NotFound { path: "/monitor/".into() }
        );
        assert_eq!(Route::parse("/nope", "").title(), "404 - Page Not Found");
    }

    #[test]
    fn test_to_path_round_trips() {
        for route in [Route::Submit, Route::monitor(RunId(99))] {
            let path = route.to_path(DEFAULT_BASE_PATH);
            assert_eq!(Route::parse(&path, DEFAULT_BASE_PATH), route);
        }
        assert_eq!(Route::monitor(RunId(5)).to_string(), "/monitor/5");
    }
}
