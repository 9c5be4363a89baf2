//! Mapping request paths to controllers.
//!
//! Every route is a REST collection: `/api/chat-messages` matches the
//! collection and `/api/chat-messages/:id` one resource in it.
use regex::{Regex, RegexSet};
use tracing::info;

use super::Error;
use crate::colors::MaybeColorize;
use crate::controller::Controller;

/// A collection path and the controller serving it.
pub struct Handler {
    base: String,
    controller: Box<dyn Controller>,
}

impl Handler {
    pub fn rest(base: &str, controller: impl Controller + 'static) -> Self {
        Self {
            base: format!("/{}", base.trim_matches('/')),
            controller: Box::new(controller),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn controller(&self) -> &dyn Controller {
        self.controller.as_ref()
    }

    /// The collection, an optional `/:id` and an optional trailing slash.
    fn pattern(&self) -> String {
        format!(r"^{}(?:/([^/]+))?/?$", regex::escape(&self.base))
    }
}

/// Finds the handler for a path.
pub struct Router {
    set: RegexSet,
    routes: Vec<(Regex, Handler)>,
}

impl Router {
    pub fn new(handlers: Vec<Handler>) -> Result<Self, Error> {
        let patterns = handlers.iter().map(Handler::pattern).collect::<Vec<_>>();
        let set = RegexSet::new(&patterns)?;

        let routes = patterns
            .iter()
            .zip(handlers)
            .map(|(pattern, handler)| Ok((Regex::new(pattern)?, handler)))
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Self { set, routes })
    }

    /// The handler for `path` and the `:id` segment, if any. When routes
    /// overlap, the longest collection path wins.
    pub fn find(&self, path: &str) -> Option<(&Handler, Option<String>)> {
        let (regex, handler) = self
            .set
            .matches(path)
            .into_iter()
            .map(|i| &self.routes[i])
            .max_by_key(|(_, handler)| handler.base.len())?;

        let id = regex
            .captures(path)
            .and_then(|captures| captures.get(1))
            .map(|id| id.as_str().to_string());

        Some((handler, id))
    }

    pub fn log_routes(&self) {
        for (_, handler) in &self.routes {
            info!(
                "{} => {}",
                handler.base.purple(),
                handler.controller.controller_name().green()
            );
        }
    }
}
