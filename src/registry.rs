//! Profile registry
//!
//! Holds the named configuration profiles and resolves the active one from a
//! selector string. Registration is configuration-time only: errors here are
//! fatal and abort startup before any scheduler runs.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::{Profile, builtin_profiles};

/// Result type alias for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur while registering or resolving profiles
#[derive(Debug)]
pub enum RegistryError {
    /// A profile with this name is already registered
    DuplicateProfile(String),

    /// No profile with this name exists; carries the valid names for the operator
    UnknownProfile { name: String, valid: Vec<String> },

    /// The profile violates a configuration invariant
    InvalidProfile { name: String, reason: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateProfile(name) => {
                write!(f, "profile \"{name}\" is already registered")
            }
            RegistryError::UnknownProfile { name, valid } => {
                write!(
                    f,
                    "unknown profile \"{name}\" (valid profiles: {})",
                    valid.join(", ")
                )
            }
            RegistryError::InvalidProfile { name, reason } => {
                write!(f, "invalid profile \"{name}\": {reason}")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Registry of named monitoring profiles.
///
/// Read-only after startup; schedulers share it without further coordination.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, Profile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-seeded with the built-in profiles.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for profile in builtin_profiles() {
            // Built-in profiles are statically valid and uniquely named.
            let _ = registry.register(profile);
        }
        registry
    }

    /// Insert a profile, failing on name collision or invariant violation.
    pub fn register(&mut self, profile: Profile) -> RegistryResult<()> {
        profile.validate().map_err(|reason| RegistryError::InvalidProfile {
            name: profile.name.clone(),
            reason,
        })?;

        if self.profiles.contains_key(&profile.name) {
            return Err(RegistryError::DuplicateProfile(profile.name));
        }

        self.profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    /// Look up a profile by name. No implicit default substitution: callers
    /// decide their own fallback before calling.
    pub fn resolve(&self, name: &str) -> RegistryResult<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| RegistryError::UnknownProfile {
                name: name.to_string(),
                valid: self.names(),
            })
    }

    /// Registered profile names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
