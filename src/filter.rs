//! Query filter: the caller-supplied traversability policy.

use crate::nav_mesh::Poly;
use crate::status::{Result, Status};
use crate::{PolyFlags, MAX_AREAS};

/// Defines polygon filtering and traversal cost for navigation queries.
///
/// A polygon is traversable under a filter when its flags intersect the
/// include mask and avoid the exclude mask. Traversal cost between two
/// positions is the Euclidean distance scaled by the cost multiplier of the
/// destination polygon's area type.
///
/// Area cost multipliers below 1.0 are accepted. They make the A* heuristic
/// inadmissible, so a path search through such areas may return a valid but
/// non-optimal path; callers wanting optimal paths should keep multipliers
/// at or above 1.0.
#[derive(Debug, Clone)]
pub struct QueryFilter {
    /// Flags a polygon must share at least one bit with to be considered
    include_flags: PolyFlags,
    /// Flags a polygon must share no bits with to be considered
    exclude_flags: PolyFlags,
    /// Cost multiplier per area type
    area_cost: [f32; MAX_AREAS],
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            include_flags: PolyFlags::ALL,
            exclude_flags: PolyFlags::empty(),
            area_cost: [1.0; MAX_AREAS],
        }
    }
}

impl QueryFilter {
    /// Creates a filter accepting every polygon at unit cost
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the include flags
    pub fn include_flags(&self) -> PolyFlags {
        self.include_flags
    }

    /// Sets the include flags
    pub fn set_include_flags(&mut self, flags: PolyFlags) {
        self.include_flags = flags;
    }

    /// Returns the exclude flags
    pub fn exclude_flags(&self) -> PolyFlags {
        self.exclude_flags
    }

    /// Sets the exclude flags
    pub fn set_exclude_flags(&mut self, flags: PolyFlags) {
        self.exclude_flags = flags;
    }

    /// Returns the cost multiplier for an area type
    pub fn area_cost(&self, area: u8) -> Result<f32> {
        self.area_cost
            .get(area as usize)
            .copied()
            .ok_or(Status::invalid_param())
    }

    /// Sets the cost multiplier for an area type.
    ///
    /// Values below 1.0 degrade path optimality; see the type-level note.
    pub fn set_area_cost(&mut self, area: u8, cost: f32) -> Result<()> {
        if !cost.is_finite() || cost < 0.0 {
            return Err(Status::invalid_param());
        }
        match self.area_cost.get_mut(area as usize) {
            Some(slot) => {
                *slot = cost;
                Ok(())
            }
            None => Err(Status::invalid_param()),
        }
    }

    /// Checks if a polygon is traversable under this filter
    #[inline]
    pub fn pass_filter(&self, poly: &Poly) -> bool {
        poly.flags.intersects(self.include_flags) && !poly.flags.intersects(self.exclude_flags)
    }

    /// Cost multiplier for a polygon, by its area type.
    ///
    /// Area indices are validated at tile insertion, so the lookup cannot
    /// miss for polygons resolved from a live mesh.
    #[inline]
    pub(crate) fn poly_cost(&self, poly: &Poly) -> f32 {
        self.area_cost[poly.area as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AREA_WATER, NO_NEIGHBOR};

    fn poly_with(flags: PolyFlags, area: u8) -> Poly {
        Poly {
            verts: [0; crate::MAX_VERTS_PER_POLY],
            neighbors: [NO_NEIGHBOR; crate::MAX_VERTS_PER_POLY],
            vert_count: 3,
            area,
            flags,
            first_link: None,
        }
    }

    #[test]
    fn test_include_exclude() {
        let mut filter = QueryFilter::new();
        filter.set_include_flags(PolyFlags::WALK);
        filter.set_exclude_flags(PolyFlags::DISABLED);

        assert!(filter.pass_filter(&poly_with(PolyFlags::WALK, 0)));
        assert!(!filter.pass_filter(&poly_with(PolyFlags::SWIM, 0)));
        assert!(!filter.pass_filter(&poly_with(PolyFlags::WALK | PolyFlags::DISABLED, 0)));
    }

    #[test]
    fn test_area_cost_bounds() {
        let mut filter = QueryFilter::new();
        assert_eq!(filter.area_cost(AREA_WATER).unwrap(), 1.0);

        filter.set_area_cost(AREA_WATER, 10.0).unwrap();
        assert_eq!(filter.area_cost(AREA_WATER).unwrap(), 10.0);

        assert!(filter.set_area_cost(MAX_AREAS as u8, 1.0).is_err());
        assert!(filter.area_cost(MAX_AREAS as u8).is_err());
        assert!(filter.set_area_cost(0, f32::NAN).is_err());
        assert!(filter.set_area_cost(0, -1.0).is_err());
    }
}
