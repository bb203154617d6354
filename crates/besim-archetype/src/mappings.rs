//! Catalog-string normalization: sub-type strings to lookup keys and
//! non-residential usage keys.

use besim_core::BuildingFunction;

/// Known residential sub-types with distinct archetype profiles.
pub const RESIDENTIAL_SUB_TYPES: [&str; 5] = [
    "Corner House",
    "Apartment",
    "Terrace or Semi-detached House",
    "Detached House",
    "Two-and-a-half-story House",
];

/// Known non-residential sub-types with distinct archetype profiles.
pub const NON_RESIDENTIAL_SUB_TYPES: [&str; 10] = [
    "Meeting Function",
    "Healthcare Function",
    "Sport Function",
    "Cell Function",
    "Retail Function",
    "Industrial Function",
    "Accommodation Function",
    "Office Function",
    "Education Function",
    "Other Use Function",
];

/// Fallback key for unrecognized residential sub-types.
pub const OTHER_RES: &str = "other_res";
/// Fallback key for unrecognized non-residential sub-types.
pub const OTHER_NONRES: &str = "other_nonres";

/// Map a building's sub-type string to the key used in the archetype lookup,
/// falling back to `other_res` / `other_nonres` for anything unrecognized.
pub fn archetype_key(function: BuildingFunction, sub_type: &str) -> &str {
    match function {
        BuildingFunction::Residential => RESIDENTIAL_SUB_TYPES
            .iter()
            .copied()
            .find(|known| *known == sub_type)
            .unwrap_or(OTHER_RES),
        BuildingFunction::NonResidential => NON_RESIDENTIAL_SUB_TYPES
            .iter()
            .copied()
            .find(|known| *known == sub_type)
            .unwrap_or(OTHER_NONRES),
    }
}

/// Usage key for non-residential required-ventilation rates. `None` for
/// residential buildings (they use the dwelling rate).
pub fn usage_key(function: BuildingFunction, sub_type: &str) -> Option<&'static str> {
    if function.is_residential() {
        return None;
    }
    Some(match sub_type {
        "Meeting Function" | "Cell Function" | "Office Function" => "office_area_based",
        "Healthcare Function" => "healthcare_function",
        "Sport Function" => "sport_function",
        "Retail Function" => "retail",
        "Industrial Function" => "industrial_function",
        "Accommodation Function" => "accommodation_function",
        "Education Function" => "education_function",
        _ => "retail",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sub_types_map_to_themselves() {
        assert_eq!(
            archetype_key(BuildingFunction::Residential, "Corner House"),
            "Corner House"
        );
        assert_eq!(
            archetype_key(BuildingFunction::NonResidential, "Office Function"),
            "Office Function"
        );
    }

    #[test]
    fn unknown_sub_types_fall_back() {
        assert_eq!(
            archetype_key(BuildingFunction::Residential, "Houseboat"),
            OTHER_RES
        );
        assert_eq!(
            archetype_key(BuildingFunction::NonResidential, "Launchpad"),
            OTHER_NONRES
        );
    }

    #[test]
    fn usage_keys_follow_function() {
        assert_eq!(
            usage_key(BuildingFunction::NonResidential, "Office Function"),
            Some("office_area_based")
        );
        assert_eq!(
            usage_key(BuildingFunction::NonResidential, "Launchpad"),
            Some("retail")
        );
        assert_eq!(usage_key(BuildingFunction::Residential, "Apartment"), None);
    }
}
