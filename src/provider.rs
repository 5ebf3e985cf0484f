//! Activity source port and in-memory implementation.
//!
//! The renderer consumes activities through [`ActivityProvider`], a
//! read-only query surface: given a filter and a geographic bounding box,
//! yield every stored activity whose precomputed bounds intersect the box.
//! Implementations may block on I/O; the renderer never holds the cache
//! lock across a query. The returned sequence is lazy, finite, consumed
//! exactly once per render and never retained past it.

use chrono::NaiveDate;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::GeoBounds;

/// One stored activity, as the renderer sees it.
///
/// `bounds` is the geographic bounding box of the decoded track,
/// precomputed by whatever subsystem ingested the activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub polyline: String,
    pub activity_type: String,
    pub start_date: NaiveDate,
    pub bounds: GeoBounds,
}

/// Normalized per-request activity filter.
///
/// The activity type is stored trimmed and lowercased so that the cache
/// digest and the match semantics agree; matching is case-insensitive.
/// Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFilter {
    pub activity_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ActivityFilter {
    /// Create a normalized filter.
    pub fn new(
        activity_type: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            activity_type: activity_type
                .map(|t| t.trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty()),
            start_date,
            end_date,
        }
    }

    /// Whether an activity passes this filter.
    pub fn matches(&self, activity: &Activity) -> bool {
        if let Some(wanted) = &self.activity_type {
            if !activity.activity_type.eq_ignore_ascii_case(wanted) {
                return false;
            }
        }
        if let Some(start) = self.start_date {
            if activity.start_date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if activity.start_date > end {
                return false;
            }
        }
        true
    }
}

/// Read-only activity query surface the tile renderer consumes.
///
/// May be called concurrently from multiple tile renders.
pub trait ActivityProvider: Send + Sync {
    /// Yield activities matching `filter` whose bounding box intersects
    /// `bbox`. No ordering guarantees.
    fn query<'a>(
        &'a self,
        filter: &'a ActivityFilter,
        bbox: &GeoBounds,
    ) -> Result<Box<dyn Iterator<Item = Activity> + Send + 'a>>;
}

// ============================================================================
// In-Memory Provider
// ============================================================================

/// Bounds wrapper for R-tree spatial indexing.
#[derive(Debug, Clone)]
struct IndexedActivity {
    activity: Activity,
}

impl RTreeObject for IndexedActivity {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let b = &self.activity.bounds;
        AABB::from_corners([b.min_lng, b.min_lat], [b.max_lng, b.max_lat])
    }
}

/// Activity provider backed by an in-memory R-tree over activity bounds.
///
/// Activities crossing the antimeridian are not split here; sources must
/// split them before insertion.
#[derive(Debug)]
pub struct InMemoryProvider {
    tree: RTree<IndexedActivity>,
}

impl InMemoryProvider {
    pub fn new(activities: Vec<Activity>) -> Self {
        let indexed = activities
            .into_iter()
            .map(|activity| IndexedActivity { activity })
            .collect();
        Self {
            tree: RTree::bulk_load(indexed),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl ActivityProvider for InMemoryProvider {
    fn query<'a>(
        &'a self,
        filter: &'a ActivityFilter,
        bbox: &GeoBounds,
    ) -> Result<Box<dyn Iterator<Item = Activity> + Send + 'a>> {
        let envelope = AABB::from_corners(
            [bbox.min_lng, bbox.min_lat],
            [bbox.max_lng, bbox.max_lat],
        );
        Ok(Box::new(
            self.tree
                .locate_in_envelope_intersecting(&envelope)
                .filter(|indexed| filter.matches(&indexed.activity))
                .map(|indexed| indexed.activity.clone()),
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================
