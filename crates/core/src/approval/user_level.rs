//! User approval level resolution and caching.
//!
//! A user's approval level for an organisational unit is the first level,
//! in level order, that binds at or below the unit's depth and that the
//! user can see. Resolution is memoized per (user, unit) in a Moka cache.

use attest_shared::CacheConfig;
use attest_shared::types::{ApprovalLevelId, OrgUnitId, UserId};
use moka::sync::Cache;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use super::level::LevelRegistry;
use super::services::Collaborators;
use super::types::{ApprovalLevel, Authorities};

/// Default cache capacity (number of entries).
const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Default time-to-live for cache entries (10 minutes).
const DEFAULT_TTL_SECS: u64 = 600;

/// Cache of resolved user approval levels.
///
/// Keyed by (user, unit). A cached `None` means the unit is not governed by
/// any level the user can see. Entries may be stale for up to the TTL;
/// administrative edits call `invalidate_all`.
#[derive(Clone)]
pub struct UserLevelCache {
    cache: Cache<(UserId, OrgUnitId), Option<ApprovalLevelId>>,
}

impl UserLevelCache {
    /// Creates a cache with default settings.
    ///
    /// Default: 10 000 entries max, 10 minute TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CACHE_CAPACITY, DEFAULT_TTL_SECS)
    }

    /// Creates a cache with custom configuration.
    ///
    /// # Arguments
    ///
    /// * `max_capacity` - Maximum number of entries to cache
    /// * `ttl_secs` - Time-to-live in seconds for each entry
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { cache }
    }

    /// Creates a cache from application configuration.
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_config(config.user_level_capacity, config.user_level_ttl_secs)
    }

    /// Returns the cached level, resolving and caching it on a miss.
    pub fn get_or_resolve(
        &self,
        user: UserId,
        unit: OrgUnitId,
        resolve: impl FnOnce() -> Option<ApprovalLevelId>,
    ) -> Option<ApprovalLevelId> {
        self.cache.get_with((user, unit), resolve)
    }

    /// Invalidates all cached entries.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Returns the number of entries currently in the cache.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs cache maintenance tasks.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}

impl Default for UserLevelCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves user approval levels against the registry and collaborators.
pub struct UserLevelResolver<'a> {
    levels: &'a LevelRegistry,
    services: Collaborators<'a>,
    cache: &'a UserLevelCache,
}

impl<'a> UserLevelResolver<'a> {
    /// Creates a resolver.
    #[must_use]
    pub const fn new(
        levels: &'a LevelRegistry,
        services: Collaborators<'a>,
        cache: &'a UserLevelCache,
    ) -> Self {
        Self {
            levels,
            services,
            cache,
        }
    }

    /// The user's level for an assigned unit, via the cache.
    #[must_use]
    pub fn user_level(&self, user: UserId, unit: OrgUnitId) -> Option<&'a ApprovalLevel> {
        let id = self
            .cache
            .get_or_resolve(user, unit, || self.resolve(user, unit))?;
        self.levels.get(id)
    }

    /// Resolves the user's level for a unit without the cache.
    #[must_use]
    pub fn resolve(&self, user: UserId, unit: OrgUnitId) -> Option<ApprovalLevelId> {
        let depth = self.services.hierarchy.depth(unit)?;
        let found = self
            .levels
            .levels()
            .iter()
            .find(|level| level.org_unit_depth >= depth && self.can_see(user, level))
            .map(|level| level.id);

        debug!(user = %user, unit = %unit, level = ?found, "Resolved user approval level");
        found
    }

    fn can_see(&self, user: UserId, level: &ApprovalLevel) -> bool {
        let security = self.services.security;
        if !security.can_read_level(user, level) {
            return false;
        }
        match level.group_set {
            Some(set) => self
                .services
                .categories
                .groups_in_set(set)
                .into_iter()
                .any(|group| security.can_read_option_group(user, group)),
            None => !security.has_dimension_constraints(user),
        }
    }

    /// The assigned unit that governs data of `data_unit`.
    ///
    /// Of the assigned units that are `data_unit` or its ancestors, the one
    /// closest to the root wins.
    #[must_use]
    pub fn governing_unit(&self, user_units: &[OrgUnitId], data_unit: OrgUnitId) -> Option<OrgUnitId> {
        let hierarchy = self.services.hierarchy;
        user_units
            .iter()
            .copied()
            .filter(|&unit| hierarchy.is_descendant_or_self(data_unit, unit))
            .min_by_key(|&unit| hierarchy.depth(unit).unwrap_or(u32::MAX))
    }

    /// Every level the user may work with, from their highest level down.
    #[must_use]
    pub fn user_levels(&self, user: UserId, user_units: &[OrgUnitId]) -> Vec<&'a ApprovalLevel> {
        let Some(highest) = user_units
            .iter()
            .filter_map(|&unit| self.user_level(user, unit))
            .map(|level| level.level)
            .min()
        else {
            return Vec::new();
        };

        self.levels
            .levels()
            .iter()
            .filter(|level| level.level >= highest && self.services.security.can_read_level(user, level))
            .collect()
    }

    /// Level data must reach before the user may read it, per unit.
    ///
    /// For each assigned and data-view unit: the first level bound deeper
    /// than the unit, or 0 when there is none. Assigned units of a user who
    /// may approve at lower levels always map to 0.
    #[must_use]
    pub fn min_read_levels(
        &self,
        user_units: &[OrgUnitId],
        data_view_units: &[OrgUnitId],
        authorities: Authorities,
    ) -> BTreeMap<OrgUnitId, u32> {
        let mut result = BTreeMap::new();

        for &unit in user_units {
            let required = if authorities.approve_lower_levels {
                0
            } else {
                self.required_read_level(unit)
            };
            result.insert(unit, required);
        }

        for &unit in data_view_units {
            result
                .entry(unit)
                .or_insert_with(|| self.required_read_level(unit));
        }

        result
    }

    fn required_read_level(&self, unit: OrgUnitId) -> u32 {
        let Some(depth) = self.services.hierarchy.depth(unit) else {
            return 0;
        };
        self.levels
            .levels()
            .iter()
            .find(|level| level.org_unit_depth > depth)
            .map_or(0, |level| level.level)
    }
}
