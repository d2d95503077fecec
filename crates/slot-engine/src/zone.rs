//! Zone hierarchy model.
//!
//! A facility is represented by a root zone (the whole facility) whose
//! sub-zones partition it. Bookings conflict along ancestor/descendant lines.
//! Siblings never conflict unless the directory links them explicitly with
//! `overlaps_with` (e.g. two halves of a splittable hall that share a wall
//! partition and a court line).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::slot::ZoneId;

/// A bookable area as supplied by the facility directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub price_per_hour: f64,
    #[serde(default)]
    pub parent_zone_id: Option<ZoneId>,
    #[serde(default)]
    pub sub_zone_ids: Vec<ZoneId>,
    /// Zones that share physical space with this one without being its
    /// ancestor or descendant.
    #[serde(default)]
    pub overlaps_with: Vec<ZoneId>,
}

impl Zone {
    pub fn new(id: impl Into<ZoneId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capacity: 0,
            price_per_hour: 0.0,
            parent_zone_id: None,
            sub_zone_ids: Vec::new(),
            overlaps_with: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<ZoneId>) -> Self {
        self.parent_zone_id = Some(parent.into());
        self
    }

    pub fn with_overlap(mut self, other: impl Into<ZoneId>) -> Self {
        self.overlaps_with.push(other.into());
        self
    }

    pub fn is_whole_facility(&self) -> bool {
        self.parent_zone_id.is_none() && !self.sub_zone_ids.is_empty()
    }
}

/// How a zone relates to another zone that holds a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneRelation {
    SameZone,
    /// The booked zone contains the queried zone.
    Ancestor,
    /// The booked zone lies inside the queried zone.
    Descendant,
    /// The zones are explicitly marked as sharing physical space.
    Overlapping,
}

/// Validated, normalized view of the facility directory.
#[derive(Debug, Clone, Default)]
pub struct ZoneHierarchy {
    zones: Vec<Zone>,
    index: HashMap<ZoneId, usize>,
}

impl ZoneHierarchy {
    /// Validate and normalize a zone list.
    ///
    /// Parent and sub-zone links may be given from either side; missing back
    /// links are filled in.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidHierarchy` on duplicate ids, dangling
    /// references, contradicting parent links or cycles.
    pub fn new(zones: Vec<Zone>) -> Result<Self> {
        let mut index = HashMap::with_capacity(zones.len());
        for (i, zone) in zones.iter().enumerate() {
            if index.insert(zone.id.clone(), i).is_some() {
                return Err(EngineError::InvalidHierarchy(format!(
                    "duplicate zone id '{}'",
                    zone.id
                )));
            }
        }

        let mut zones = zones;
        let known = |id: &ZoneId| -> Result<usize> {
            index.get(id).copied().ok_or_else(|| {
                EngineError::InvalidHierarchy(format!("reference to unknown zone '{}'", id))
            })
        };

        // Collect every parent edge from both directions.
        let mut parent_of: Vec<Option<usize>> = vec![None; zones.len()];
        for (i, zone) in zones.iter().enumerate() {
            if let Some(parent) = &zone.parent_zone_id {
                set_parent(&mut parent_of, &zones, i, known(parent)?)?;
            }
            for sub in &zone.sub_zone_ids {
                let s = known(sub)?;
                set_parent(&mut parent_of, &zones, s, i)?;
            }
            for other in &zone.overlaps_with {
                known(other)?;
            }
        }

        // Walk each parent chain; a chain longer than the zone count loops.
        for start in 0..zones.len() {
            let mut cursor = parent_of[start];
            let mut steps = 0;
            while let Some(p) = cursor {
                if p == start || steps > zones.len() {
                    return Err(EngineError::InvalidHierarchy(format!(
                        "zone '{}' is its own ancestor",
                        zones[start].id
                    )));
                }
                cursor = parent_of[p];
                steps += 1;
            }
        }

        // Normalize both link directions and make overlaps symmetric.
        let mut overlaps: Vec<Vec<ZoneId>> = zones.iter().map(|z| z.overlaps_with.clone()).collect();
        for (i, zone) in zones.iter().enumerate() {
            for other in &zone.overlaps_with {
                let o = index[other];
                if !overlaps[o].contains(&zone.id) {
                    overlaps[o].push(zone.id.clone());
                }
            }
            overlaps[i].retain(|id| id != &zone.id);
        }
        let ids: Vec<ZoneId> = zones.iter().map(|z| z.id.clone()).collect();
        for (i, zone) in zones.iter_mut().enumerate() {
            zone.parent_zone_id = parent_of[i].map(|p| ids[p].clone());
            zone.overlaps_with = std::mem::take(&mut overlaps[i]);
        }
        for (i, parent) in parent_of.iter().enumerate() {
            if let Some(p) = parent {
                if !zones[*p].sub_zone_ids.contains(&ids[i]) {
                    let id = ids[i].clone();
                    zones[*p].sub_zone_ids.push(id);
                }
            }
        }

        Ok(Self { zones, index })
    }

    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.index.get(id).map(|&i| &self.zones[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Zones in directory order.
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Zones without a parent.
    pub fn roots(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(|z| z.parent_zone_id.is_none())
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: &str) -> Vec<&Zone> {
        let mut out = Vec::new();
        let mut cursor = self.zone(id).and_then(|z| z.parent_zone_id.as_deref());
        while let Some(parent) = cursor.and_then(|p| self.zone(p)) {
            out.push(parent);
            cursor = parent.parent_zone_id.as_deref();
        }
        out
    }

    /// Descendants of `id`, breadth first.
    pub fn descendants(&self, id: &str) -> Vec<&Zone> {
        let mut out = Vec::new();
        let mut queue: Vec<&str> = self
            .zone(id)
            .map(|z| z.sub_zone_ids.iter().map(String::as_str).collect())
            .unwrap_or_default();
        let mut seen = HashSet::new();
        let mut head = 0;
        while head < queue.len() {
            let current = queue[head];
            head += 1;
            if !seen.insert(current) {
                continue;
            }
            if let Some(zone) = self.zone(current) {
                out.push(zone);
                queue.extend(zone.sub_zone_ids.iter().map(String::as_str));
            }
        }
        out
    }

    /// How `booked` relates to `queried`, if a booking on `booked` blocks
    /// `queried` at the same time.
    pub fn relation(&self, queried: &str, booked: &str) -> Option<ZoneRelation> {
        if queried == booked {
            return self.contains(queried).then_some(ZoneRelation::SameZone);
        }
        if self.ancestors(queried).iter().any(|z| z.id == booked) {
            return Some(ZoneRelation::Ancestor);
        }
        if self.ancestors(booked).iter().any(|z| z.id == queried) {
            return Some(ZoneRelation::Descendant);
        }
        let overlapping = self
            .zone(queried)
            .is_some_and(|z| z.overlaps_with.iter().any(|o| o == booked));
        overlapping.then_some(ZoneRelation::Overlapping)
    }
}

fn set_parent(parent_of: &mut [Option<usize>], zones: &[Zone], child: usize, parent: usize) -> Result<()> {
    match parent_of[child] {
        Some(existing) if existing != parent => Err(EngineError::InvalidHierarchy(format!(
            "zone '{}' claims parents '{}' and '{}'",
            zones[child].id, zones[existing].id, zones[parent].id
        ))),
        _ => {
            parent_of[child] = Some(parent);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facility() -> ZoneHierarchy {
        ZoneHierarchy::new(vec![
            Zone::new("hall", "Main hall"),
            Zone::new("north", "North half").with_parent("hall"),
            Zone::new("south", "South half").with_parent("hall"),
            Zone::new("court-1", "Court 1").with_parent("north"),
            Zone::new("gym", "Gym"),
        ])
        .unwrap()
    }

    #[test]
    fn back_links_are_filled_in() {
        let h = facility();
        assert_eq!(h.zone("hall").unwrap().sub_zone_ids, vec!["north", "south"]);
        assert!(h.zone("hall").unwrap().is_whole_facility());
        assert!(!h.zone("gym").unwrap().is_whole_facility());
    }

    #[test]
    fn sub_zone_ids_imply_parent() {
        let mut hall = Zone::new("hall", "Hall");
        hall.sub_zone_ids = vec!["a".to_string()];
        let h = ZoneHierarchy::new(vec![hall, Zone::new("a", "A")]).unwrap();
        assert_eq!(h.zone("a").unwrap().parent_zone_id.as_deref(), Some("hall"));
    }

    #[test]
    fn ancestors_and_descendants() {
        let h = facility();
        let up: Vec<&str> = h.ancestors("court-1").iter().map(|z| z.id.as_str()).collect();
        assert_eq!(up, vec!["north", "hall"]);
        let down: Vec<&str> = h.descendants("hall").iter().map(|z| z.id.as_str()).collect();
        assert_eq!(down, vec!["north", "south", "court-1"]);
    }

    #[test]
    fn relations() {
        let h = facility();
        assert_eq!(h.relation("court-1", "hall"), Some(ZoneRelation::Ancestor));
        assert_eq!(h.relation("hall", "court-1"), Some(ZoneRelation::Descendant));
        assert_eq!(h.relation("north", "north"), Some(ZoneRelation::SameZone));
        assert_eq!(h.relation("north", "south"), None);
        assert_eq!(h.relation("gym", "hall"), None);
    }

    #[test]
    fn overlap_is_symmetric() {
        let h = ZoneHierarchy::new(vec![
            Zone::new("hall", "Hall"),
            Zone::new("east", "East").with_parent("hall").with_overlap("west"),
            Zone::new("west", "West").with_parent("hall"),
        ])
        .unwrap();
        assert_eq!(h.relation("west", "east"), Some(ZoneRelation::Overlapping));
        assert_eq!(h.relation("east", "west"), Some(ZoneRelation::Overlapping));
    }

    #[test]
    fn cycle_rejected() {
        let err = ZoneHierarchy::new(vec![
            Zone::new("a", "A").with_parent("b"),
            Zone::new("b", "B").with_parent("a"),
        ])
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidHierarchy(_)));
    }

    #[test]
    fn contradicting_parents_rejected() {
        let mut a = Zone::new("a", "A");
        a.sub_zone_ids = vec!["c".to_string()];
        let err = ZoneHierarchy::new(vec![
            a,
            Zone::new("b", "B"),
            Zone::new("c", "C").with_parent("b"),
        ])
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidHierarchy(_)));
    }

    #[test]
    fn dangling_reference_rejected() {
        assert!(ZoneHierarchy::new(vec![Zone::new("a", "A").with_parent("ghost")]).is_err());
    }
}
