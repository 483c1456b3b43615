//! # Resource Authenticators
//!
//! Process-wide, ordered registry of credential providers. Connections ask
//! the registry for credentials for a target resource; the first
//! authenticator that answers wins.
//!
//! The global registry is created once on first use and can be cleared with
//! [`ResourceAuthenticatorRegistry::reset`]. Collaborators should receive an
//! `Arc<ResourceAuthenticatorRegistry>` explicitly rather than reaching for
//! the global where they can.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace};

/// A resource that needs credentials
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceTarget {
    pub scheme: String,
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
}

impl ResourceTarget {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port: None,
            realm: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }
}

impl fmt::Display for ResourceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

/// Username and password offered for a target
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Supplies credentials for the targets it knows about
pub trait ResourceAuthenticator: Send + Sync {
    fn name(&self) -> &str;

    /// `None` when this authenticator has nothing for `target`
    fn authenticate(&self, target: &ResourceTarget) -> Option<Credentials>;
}

/// Fixed credentials for every target on one host
#[derive(Debug, Clone)]
pub struct StaticAuthenticator {
    name: String,
    host: String,
    credentials: Credentials,
}

impl StaticAuthenticator {
    pub fn new(name: impl Into<String>, host: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            credentials,
        }
    }
}

impl ResourceAuthenticator for StaticAuthenticator {
    fn name(&self) -> &str {
        &self.name
    }

    fn authenticate(&self, target: &ResourceTarget) -> Option<Credentials> {
        (target.host.eq_ignore_ascii_case(&self.host)).then(|| self.credentials.clone())
    }
}

static GLOBAL_REGISTRY: OnceLock<Arc<ResourceAuthenticatorRegistry>> = OnceLock::new();

#[derive(Default)]
pub struct ResourceAuthenticatorRegistry {
    authenticators: RwLock<Vec<Arc<dyn ResourceAuthenticator>>>,
}

impl ResourceAuthenticatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> Arc<ResourceAuthenticatorRegistry> {
        Arc::clone(GLOBAL_REGISTRY.get_or_init(|| Arc::new(Self::new())))
    }

    /// Append an authenticator; earlier registrations take precedence
    pub fn register(&self, authenticator: Arc<dyn ResourceAuthenticator>) {
        debug!(authenticator = %authenticator.name(), "🔧 Registering resource authenticator");
        self.authenticators.write().push(authenticator);
    }

    /// Remove every authenticator with the given name
    pub fn remove(&self, name: &str) -> usize {
        let mut authenticators = self.authenticators.write();
        let before = authenticators.len();
        authenticators.retain(|a| a.name() != name);
        before - authenticators.len()
    }

    pub fn reset(&self) {
        self.authenticators.write().clear();
    }

    pub fn len(&self) -> usize {
        self.authenticators.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.authenticators.read().is_empty()
    }

    /// Credentials from the first authenticator that offers any
    pub fn authenticate(&self, target: &ResourceTarget) -> Option<Credentials> {
        let authenticators = self.authenticators.read().clone();
        authenticators.iter().find_map(|authenticator| {
            let credentials = authenticator.authenticate(target);
            if credentials.is_some() {
                trace!(
                    authenticator = %authenticator.name(),
                    target = %target,
                    "Credentials supplied"
                );
            }
            credentials
        })
    }
}
