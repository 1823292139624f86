//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Look up matching route for a path
//! - Return matched target or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan (acceptable for the handful of gateway routes)
//! - First registered match wins; register specific routes first

use super::matcher::RoutePattern;
use super::RouteError;
use crate::config::RoutesConfig;

/// What the gateway does with a matched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    /// Plain forward to the backend.
    Forward,
    /// Credential translation, then forward.
    Login,
    /// WebSocket upgrade bridge.
    Command,
}

/// An ordered table of route patterns.
#[derive(Debug, Clone)]
pub struct Router<T> {
    routes: Vec<(RoutePattern, T)>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<T> Router<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pattern. Registering the same pattern twice is a configuration error.
    pub fn insert(&mut self, pattern: &str, target: T) -> Result<(), RouteError> {
        let pattern: RoutePattern = pattern.parse()?;
        if self.routes.iter().any(|(existing, _)| *existing == pattern) {
            return Err(RouteError::Duplicate(pattern.to_string()));
        }
        self.routes.push((pattern, target));
        Ok(())
    }

    /// Find the first route matching `path`.
    pub fn at(&self, path: &str) -> Option<&T> {
        self.routes
            .iter()
            .find(|(pattern, _)| pattern.matches(path))
            .map(|(_, target)| target)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Router<RouteTarget> {
    /// Build the gateway route table from configuration.
    pub fn from_config(config: &RoutesConfig) -> Result<Self, RouteError> {
        let mut router = Router::new();
        router.insert(&config.command_route(), RouteTarget::Command)?;
        router.insert(&config.login_route(), RouteTarget::Login)?;
        router.insert(&config.base_path, RouteTarget::Forward)?;
        if config.base_path == "/" {
            router.insert("/*", RouteTarget::Forward)?;
        } else {
            router.insert(&format!("{}/*", config.base_path), RouteTarget::Forward)?;
        }
        Ok(router)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_registered_match_wins() {
        let mut router = Router::new();
        router.insert("/a/b", 1).unwrap();
        router.insert("/a/*", 2).unwrap();

        assert_eq!(router.at("/a/b"), Some(&1));
        assert_eq!(router.at("/a/c"), Some(&2));
        assert_eq!(router.at("/b"), None);
    }

    #[test]
    fn duplicate_patterns_rejected() {
        let mut router = Router::new();
        router.insert("/a/*", 1).unwrap();
        let err = router.insert("/a/*", 2).unwrap_err();
        assert_eq!(err, RouteError::Duplicate("/a/*".into()));
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn gateway_table_dispatch() {
        let router = Router::from_config(&RoutesConfig::default()).unwrap();

        assert_eq!(router.at("/admin/api/login"), Some(&RouteTarget::Login));
        assert_eq!(router.at("/admin/api/command/"), Some(&RouteTarget::Command));
        assert_eq!(router.at("/admin/api/command/files/a"), Some(&RouteTarget::Command));
        assert_eq!(router.at("/admin"), Some(&RouteTarget::Forward));
        assert_eq!(router.at("/admin/static/app.css"), Some(&RouteTarget::Forward));
        assert_eq!(router.at("/admin/api/login/"), Some(&RouteTarget::Login));
        assert_eq!(router.at("/admin/api/login/extra"), Some(&RouteTarget::Login));
        assert_eq!(router.at("/admin/api/loginhelp"), Some(&RouteTarget::Forward));
        assert_eq!(router.at("/admin/api/command/api/login"), Some(&RouteTarget::Command));
        assert_eq!(router.at("/"), None);
        assert_eq!(router.at("/other"), None);
    }

    #[test]
    fn root_base_path() {
        let config = RoutesConfig {
            base_path: "/".into(),
            login_path: "/api/login".into(),
            command_path: "/api/command/".into(),
        };
        let router = Router::from_config(&config).unwrap();

        assert_eq!(router.at("/api/login"), Some(&RouteTarget::Login));
        assert_eq!(router.at("/api/login/"), Some(&RouteTarget::Login));
        assert_eq!(router.at("/api/command/x"), Some(&RouteTarget::Command));
        assert_eq!(router.at("/"), Some(&RouteTarget::Forward));
        assert_eq!(router.at("/anything"), Some(&RouteTarget::Forward));
    }
}
