//! The deck: an ordered collection of typed objects with name-based lookup.
//!
//! Invariants:
//! - object names are unique within their type (lookup is case-insensitive,
//!   writes preserve case)
//! - insertion keeps referenced object kinds ahead of the objects that
//!   reference them (type-limits before schedules, materials before
//!   constructions, zones before zone equipment)

use anyhow::{bail, Result};
use besim_core::BesimError;
use std::collections::HashSet;

use crate::object::{DeckObject, FieldValue};
use crate::schema::{type_rank, REFERENCE_FIELDS};

#[derive(Debug, Clone, Default)]
pub struct Deck {
    objects: Vec<DeckObject>,
}

impl Deck {
    pub fn new() -> Deck {
        Deck::default()
    }

    pub fn objects(&self) -> &[DeckObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects_of_type<'a>(
        &'a self,
        object_type: &'a str,
    ) -> impl Iterator<Item = &'a DeckObject> + 'a {
        self.objects
            .iter()
            .filter(move |obj| obj.object_type().eq_ignore_ascii_case(object_type))
    }

    pub fn objects_of_type_mut<'a>(
        &'a mut self,
        object_type: &'a str,
    ) -> impl Iterator<Item = &'a mut DeckObject> + 'a {
        self.objects
            .iter_mut()
            .filter(move |obj| obj.object_type().eq_ignore_ascii_case(object_type))
    }

    /// Key field a type's identity lives in (`Zone_Name` for equipment
    /// connections, `Name` otherwise).
    fn key_field(object_type: &str) -> &'static str {
        if object_type.eq_ignore_ascii_case("ZONEHVAC:EQUIPMENTCONNECTIONS") {
            "Zone_Name"
        } else {
            "Name"
        }
    }

    fn identity(object: &DeckObject) -> Option<&str> {
        object.text(Deck::key_field(object.object_type()))
    }

    pub fn get<'a>(&'a self, object_type: &'a str, name: &str) -> Option<&'a DeckObject> {
        self.objects_of_type(object_type)
            .find(|obj| Deck::identity(obj).is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    pub fn get_mut(&mut self, object_type: &str, name: &str) -> Option<&mut DeckObject> {
        self.objects
            .iter_mut()
            .filter(|obj| obj.object_type().eq_ignore_ascii_case(object_type))
            .find(|obj| Deck::identity(obj).is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    pub fn contains(&self, object_type: &str, name: &str) -> bool {
        self.get(object_type, name).is_some()
    }

    /// Error unless (type, name) resolves. The refusal the composer relies
    /// on before wiring a reference.
    pub fn require(&self, object_type: &str, name: &str) -> Result<()> {
        if self.contains(object_type, name) {
            Ok(())
        } else {
            Err(BesimError::DependencyUnresolved(format!(
                "{object_type} '{name}' not found in deck"
            ))
            .into())
        }
    }

    /// Insert a new object, keeping dependency ranks ordered. Fails on a
    /// duplicate (type, name).
    pub fn add(&mut self, object: DeckObject) -> Result<()> {
        if let Some(name) = Deck::identity(&object) {
            if self.contains(object.object_type(), name) {
                bail!(
                    "duplicate {} named '{}'",
                    object.object_type(),
                    name
                );
            }
        }
        let rank = type_rank(object.object_type());
        let position = self
            .objects
            .iter()
            .rposition(|existing| type_rank(existing.object_type()) <= rank)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        self.objects.insert(position, object);
        Ok(())
    }

    /// Insert or replace by (type, identity).
    pub fn upsert(&mut self, object: DeckObject) -> Result<()> {
        if let Some(name) = Deck::identity(&object) {
            if let Some(existing) = self.get_mut(object.object_type(), name) {
                *existing = object;
                return Ok(());
            }
        }
        self.add(object)
    }

    pub fn remove(&mut self, object_type: &str, name: &str) -> Option<DeckObject> {
        let idx = self.objects.iter().position(|obj| {
            obj.object_type().eq_ignore_ascii_case(object_type)
                && Deck::identity(obj).is_some_and(|n| n.eq_ignore_ascii_case(name))
        })?;
        Some(self.objects.remove(idx))
    }

    pub fn zone_names(&self) -> Vec<String> {
        self.objects_of_type("ZONE")
            .filter_map(|zone| zone.name().map(str::to_string))
            .collect()
    }

    /// Check name uniqueness and every known reference field. Returns the
    /// list of violations; an empty list means the deck is consistent.
    pub fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        for object in &self.objects {
            if let Some(name) = Deck::identity(object) {
                let key = (
                    object.object_type().to_string(),
                    name.to_ascii_uppercase(),
                );
                if !seen.insert(key) {
                    violations.push(format!(
                        "duplicate {} named '{name}'",
                        object.object_type()
                    ));
                }
            }
        }
        for object in &self.objects {
            for (ref_type, field, target_type) in REFERENCE_FIELDS {
                if !object.object_type().eq_ignore_ascii_case(ref_type) {
                    continue;
                }
                let Some(FieldValue::Text(target)) = object.get_field(field) else {
                    continue;
                };
                if !self.contains(target_type, target) {
                    violations.push(format!(
                        "{} '{}' field {} references missing {} '{}'",
                        object.object_type(),
                        Deck::identity(object).unwrap_or("?"),
                        field,
                        target_type,
                        target
                    ));
                }
            }
        }
        violations
    }

    pub(crate) fn push_unchecked(&mut self, object: DeckObject) {
        self.objects.push(object);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::FieldValue;

    fn zone(name: &str) -> DeckObject {
        DeckObject::named("Zone", name)
    }

    #[test]
    fn duplicate_names_within_type_are_rejected() {
        let mut deck = Deck::new();
        deck.add(zone("Z1")).unwrap();
        assert!(deck.add(zone("z1")).is_err());
        // Same name in another type is fine.
        deck.add(DeckObject::named("Lights", "Z1")).unwrap();
    }

    #[test]
    fn insertion_keeps_dependency_order() {
        let mut deck = Deck::new();
        deck.add(zone("Z1")).unwrap();
        deck.add(DeckObject::named("Schedule:Compact", "Sched1")).unwrap();
        deck.add(DeckObject::named("ScheduleTypeLimits", "Fraction"))
            .unwrap();
        let types: Vec<&str> = deck.objects().iter().map(|o| o.object_type()).collect();
        assert_eq!(
            types,
            vec!["SCHEDULETYPELIMITS", "SCHEDULE:COMPACT", "ZONE"]
        );
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let mut deck = Deck::new();
        deck.add(zone("Zone_Perim_1")).unwrap();
        assert!(deck.contains("zone", "ZONE_PERIM_1"));
        assert!(deck.require("ZONE", "zone_perim_1").is_ok());
        assert!(deck.require("ZONE", "nope").is_err());
    }

    #[test]
    fn equipment_connections_identified_by_zone_name() {
        let mut deck = Deck::new();
        let mut conn = DeckObject::new("ZoneHVAC:EquipmentConnections");
        conn.push_field("Zone_Name", FieldValue::text("Z1"));
        deck.add(conn).unwrap();
        assert!(deck.get("ZONEHVAC:EQUIPMENTCONNECTIONS", "Z1").is_some());
    }

    #[test]
    fn validate_reports_broken_references() {
        let mut deck = Deck::new();
        let mut lights = DeckObject::named("Lights", "L1");
        lights.push_field("Zone_or_ZoneList_Name", FieldValue::text("GhostZone"));
        deck.add(lights).unwrap();
        let violations = deck.validate();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("GhostZone"));
    }
}
