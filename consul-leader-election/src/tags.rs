//! Publishing the election role as a service tag.
//!
//! A service carries at most one role tag at a time. [`RoleTags::retag`] is the
//! pure tag-set rule; [`RoleTagSynchronizer`] applies it to the service
//! registered with the coordination service.

use tracing::{debug, info};

use crate::client::CoordinationClient;
use crate::election::Role;
use crate::error::{ElectionError, Result};

/// The pair of mutually exclusive role tags
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoleTags {
    leader: Option<String>,
    follower: Option<String>,
}

impl RoleTags {
    pub fn new(leader: Option<String>, follower: Option<String>) -> Self {
        Self { leader, follower }
    }

    /// Whether any role tag is configured
    pub fn is_enabled(&self) -> bool {
        self.leader.is_some() || self.follower.is_some()
    }

    /// Tag that marks `role`, if one is configured
    pub fn tag_for(&self, role: Role) -> Option<&str> {
        match role {
            Role::Leader => self.leader.as_deref(),
            Role::Follower => self.follower.as_deref(),
        }
    }

    /// Whether `tag` is one of the two role tags
    pub fn is_role_tag(&self, tag: &str) -> bool {
        self.leader.as_deref() == Some(tag) || self.follower.as_deref() == Some(tag)
    }

    /// Compute the tag list that publishes `desired`.
    ///
    /// Returns `None` when `existing` already carries exactly one copy of
    /// `desired` and no other role tag (or no role tag at all when `desired`
    /// is `None`). Otherwise both role tags are removed, preserving the order
    /// of the remaining tags, and `desired` is appended.
    pub fn retag(&self, existing: &[String], desired: Option<&str>) -> Option<Vec<String>> {
        let role_tags: Vec<&str> = existing
            .iter()
            .map(String::as_str)
            .filter(|tag| self.is_role_tag(tag) || Some(*tag) == desired)
            .collect();

        let conformant = match desired {
            Some(tag) => role_tags == [tag],
            None => role_tags.is_empty(),
        };
        if conformant {
            return None;
        }

        let mut tags: Vec<String> = existing
            .iter()
            .filter(|tag| !self.is_role_tag(tag) && Some(tag.as_str()) != desired)
            .cloned()
            .collect();
        tags.extend(desired.map(str::to_string));
        Some(tags)
    }
}

/// Outcome of a tag synchronization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSync {
    /// No service name configured, nothing was read or written
    Disabled,
    /// The registration already carried the desired tags
    Unchanged,
    /// The registration was rewritten
    Updated,
}

/// Keeps a service's role tag in line with the election result
pub struct RoleTagSynchronizer<'a, C: CoordinationClient + ?Sized> {
    client: &'a C,
    tags: &'a RoleTags,
}

impl<'a, C: CoordinationClient + ?Sized> RoleTagSynchronizer<'a, C> {
    pub fn new(client: &'a C, tags: &'a RoleTags) -> Self {
        Self { client, tags }
    }

    /// Publish the tag configured for `role` on `service`
    pub async fn sync_role(&self, service: Option<&str>, role: Role) -> Result<TagSync> {
        self.sync(service, self.tags.tag_for(role)).await
    }

    /// Make `desired` the only role tag on `service`.
    ///
    /// The full registration is re-submitted with its ID, name, port, address
    /// and tag-override flag untouched.
    pub async fn sync(&self, service: Option<&str>, desired: Option<&str>) -> Result<TagSync> {
        let Some(service) = service else {
            return Ok(TagSync::Disabled);
        };

        let services = self
            .client
            .services()
            .await
            .map_err(|e| ElectionError::coordination("agent services", e))?;

        let registration = match services.get(service) {
            Some(registration) => registration,
            None => {
                let mut named = services.values().filter(|r| r.name == service);
                match (named.next(), named.next()) {
                    (Some(registration), None) => registration,
                    (None, _) => {
                        return Err(ElectionError::ServiceNotFound {
                            service: service.to_string(),
                        })
                    }
                    (Some(_), Some(_)) => {
                        let mut ids: Vec<&str> = services
                            .values()
                            .filter(|r| r.name == service)
                            .map(|r| r.id.as_str())
                            .collect();
                        ids.sort_unstable();
                        return Err(ElectionError::configuration(format!(
                            "service '{}' has several instances ({}), set --service-name to one of their IDs",
                            service,
                            ids.join(", ")
                        )));
                    }
                }
            }
        };

        let Some(tags) = self.tags.retag(&registration.tags, desired) else {
            debug!(service, tag = ?desired, "service tags already up to date");
            return Ok(TagSync::Unchanged);
        };

        let mut updated = registration.clone();
        updated.tags = tags;

        self.client
            .register_service(&updated)
            .await
            .map_err(|e| ElectionError::coordination("agent service register", e))?;

        info!(service, tags = ?updated.tags, "updated service tags");
        Ok(TagSync::Updated)
    }
}
