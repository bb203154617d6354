//! Field-name schema for the object types the pipeline reads or writes.
//!
//! The engine's object-dump format is positional; field names come from this
//! table when a deck is parsed. Unknown object types fall back to positional
//! `Field_N` names and round-trip untouched. Variable-length objects
//! (compact schedules, node lists, surfaces' vertex lists) name their fixed
//! prefix here and continue positionally.

/// Named fields for an object type, in file order.
pub fn field_names(object_type: &str) -> Option<&'static [&'static str]> {
    let names: &'static [&'static str] = match object_type.to_ascii_uppercase().as_str() {
        "ZONE" => &[
            "Name",
            "Direction_of_Relative_North",
            "X_Origin",
            "Y_Origin",
            "Z_Origin",
            "Type",
            "Multiplier",
            "Ceiling_Height",
            "Volume",
            "Floor_Area",
        ],
        "SCHEDULETYPELIMITS" => &[
            "Name",
            "Lower_Limit_Value",
            "Upper_Limit_Value",
            "Numeric_Type",
            "Unit_Type",
        ],
        "SCHEDULE:COMPACT" => &["Name", "Schedule_Type_Limits_Name"],
        "MATERIAL" => &[
            "Name",
            "Roughness",
            "Thickness",
            "Conductivity",
            "Density",
            "Specific_Heat",
            "Thermal_Absorptance",
            "Solar_Absorptance",
            "Visible_Absorptance",
        ],
        "WINDOWMATERIAL:SIMPLEGLAZINGSYSTEM" => &[
            "Name",
            "UFactor",
            "Solar_Heat_Gain_Coefficient",
            "Visible_Transmittance",
        ],
        "CONSTRUCTION" => &["Name", "Outside_Layer"],
        "LIGHTS" => &[
            "Name",
            "Zone_or_ZoneList_Name",
            "Schedule_Name",
            "Design_Level_Calculation_Method",
            "Lighting_Level",
            "Watts_per_Zone_Floor_Area",
            "Watts_per_Person",
            "Return_Air_Fraction",
            "Fraction_Radiant",
            "Fraction_Visible",
            "Fraction_Replaceable",
        ],
        "ELECTRICEQUIPMENT" => &[
            "Name",
            "Zone_or_ZoneList_Name",
            "Schedule_Name",
            "Design_Level_Calculation_Method",
            "Design_Level",
            "Watts_per_Zone_Floor_Area",
            "Watts_per_Person",
            "Fraction_Latent",
            "Fraction_Radiant",
            "Fraction_Lost",
        ],
        "PEOPLE" => &[
            "Name",
            "Zone_or_ZoneList_Name",
            "Number_of_People_Schedule_Name",
            "Number_of_People_Calculation_Method",
            "Number_of_People",
            "People_per_Zone_Floor_Area",
            "Zone_Floor_Area_per_Person",
            "Fraction_Radiant",
            "Sensible_Heat_Fraction",
            "Activity_Level_Schedule_Name",
        ],
        "ZONEINFILTRATION:DESIGNFLOWRATE" => &[
            "Name",
            "Zone_or_ZoneList_Name",
            "Schedule_Name",
            "Design_Flow_Rate_Calculation_Method",
            "Design_Flow_Rate",
            "Flow_per_Zone_Floor_Area",
            "Flow_per_Exterior_Surface_Area",
            "Air_Changes_per_Hour",
            "Constant_Term_Coefficient",
            "Temperature_Term_Coefficient",
            "Velocity_Term_Coefficient",
            "Velocity_Squared_Term_Coefficient",
        ],
        "ZONEVENTILATION:DESIGNFLOWRATE" => &[
            "Name",
            "Zone_or_ZoneList_Name",
            "Schedule_Name",
            "Design_Flow_Rate_Calculation_Method",
            "Design_Flow_Rate",
            "Flow_Rate_per_Zone_Floor_Area",
            "Flow_Rate_per_Person",
            "Air_Changes_per_Hour",
            "Ventilation_Type",
            "Fan_Pressure_Rise",
            "Fan_Total_Efficiency",
            "Constant_Term_Coefficient",
            "Temperature_Term_Coefficient",
            "Velocity_Term_Coefficient",
            "Velocity_Squared_Term_Coefficient",
        ],
        "DESIGNSPECIFICATION:OUTDOORAIR" => &[
            "Name",
            "Outdoor_Air_Method",
            "Outdoor_Air_Flow_per_Person",
            "Outdoor_Air_Flow_per_Zone_Floor_Area",
            "Outdoor_Air_Flow_per_Zone",
            "Outdoor_Air_Flow_Air_Changes_per_Hour",
        ],
        "ZONECONTROL:THERMOSTAT" => &[
            "Name",
            "Zone_or_ZoneList_Name",
            "Control_Type_Schedule_Name",
            "Control_1_Object_Type",
            "Control_1_Name",
        ],
        "THERMOSTATSETPOINT:DUALSETPOINT" => &[
            "Name",
            "Heating_Setpoint_Temperature_Schedule_Name",
            "Cooling_Setpoint_Temperature_Schedule_Name",
        ],
        "ZONEHVAC:IDEALLOADSAIRSYSTEM" => &[
            "Name",
            "Availability_Schedule_Name",
            "Zone_Supply_Air_Node_Name",
            "Zone_Exhaust_Air_Node_Name",
            "System_Inlet_Air_Node_Name",
            "Maximum_Heating_Supply_Air_Temperature",
            "Minimum_Cooling_Supply_Air_Temperature",
            "Maximum_Heating_Supply_Air_Humidity_Ratio",
            "Minimum_Cooling_Supply_Air_Humidity_Ratio",
            "Heating_Limit",
            "Maximum_Heating_Air_Flow_Rate",
            "Maximum_Sensible_Heating_Capacity",
            "Cooling_Limit",
            "Maximum_Cooling_Air_Flow_Rate",
            "Maximum_Total_Cooling_Capacity",
            "Heating_Availability_Schedule_Name",
            "Cooling_Availability_Schedule_Name",
            "Dehumidification_Control_Type",
            "Cooling_Sensible_Heat_Ratio",
            "Humidification_Control_Type",
            "Design_Specification_Outdoor_Air_Object_Name",
            "Outdoor_Air_Inlet_Node_Name",
            "Demand_Controlled_Ventilation_Type",
            "Outdoor_Air_Economizer_Type",
            "Heat_Recovery_Type",
            "Sensible_Heat_Recovery_Effectiveness",
            "Latent_Heat_Recovery_Effectiveness",
        ],
        "ZONEHVAC:EQUIPMENTCONNECTIONS" => &[
            "Zone_Name",
            "Zone_Conditioning_Equipment_List_Name",
            "Zone_Air_Inlet_Node_or_NodeList_Name",
            "Zone_Air_Exhaust_Node_or_NodeList_Name",
            "Zone_Air_Node_Name",
            "Zone_Return_Air_Node_or_NodeList_Name",
        ],
        "ZONEHVAC:EQUIPMENTLIST" => &[
            "Name",
            "Load_Distribution_Scheme",
            "Zone_Equipment_1_Object_Type",
            "Zone_Equipment_1_Name",
            "Zone_Equipment_1_Cooling_Sequence",
            "Zone_Equipment_1_Heating_or_NoLoad_Sequence",
        ],
        "NODELIST" => &["Name"],
        "WATERHEATER:MIXED" => &[
            "Name",
            "Tank_Volume",
            "Setpoint_Temperature_Schedule_Name",
            "Deadband_Temperature_Difference",
            "Maximum_Temperature_Limit",
            "Heater_Control_Type",
            "Heater_Maximum_Capacity",
            "Heater_Minimum_Capacity",
            "Heater_Ignition_Minimum_Flow_Rate",
            "Heater_Ignition_Delay",
            "Heater_Fuel_Type",
            "Heater_Thermal_Efficiency",
        ],
        "WINDOWSHADINGCONTROL" => &[
            "Name",
            "Zone_Name",
            "Shading_Control_Sequence_Number",
            "Shading_Type",
            "Construction_with_Shading_Name",
            "Shading_Control_Type",
            "Schedule_Name",
            "Setpoint",
        ],
        "ZONECONTROL:CONTAMINANTCONTROLLER" => &[
            "Name",
            "Zone_Name",
            "Carbon_Dioxide_Control_Availability_Schedule_Name",
            "Carbon_Dioxide_Setpoint_Schedule_Name",
        ],
        _ => return None,
    };
    Some(names)
}

/// Reference fields: (object_type, field, referenced_object_type). The deck
/// checks these before composition writes an object.
pub const REFERENCE_FIELDS: &[(&str, &str, &str)] = &[
    ("SCHEDULE:COMPACT", "Schedule_Type_Limits_Name", "SCHEDULETYPELIMITS"),
    ("LIGHTS", "Zone_or_ZoneList_Name", "ZONE"),
    ("LIGHTS", "Schedule_Name", "SCHEDULE:COMPACT"),
    ("ELECTRICEQUIPMENT", "Zone_or_ZoneList_Name", "ZONE"),
    ("ELECTRICEQUIPMENT", "Schedule_Name", "SCHEDULE:COMPACT"),
    ("PEOPLE", "Zone_or_ZoneList_Name", "ZONE"),
    ("ZONEINFILTRATION:DESIGNFLOWRATE", "Zone_or_ZoneList_Name", "ZONE"),
    ("ZONEINFILTRATION:DESIGNFLOWRATE", "Schedule_Name", "SCHEDULE:COMPACT"),
    ("ZONEVENTILATION:DESIGNFLOWRATE", "Zone_or_ZoneList_Name", "ZONE"),
    ("ZONEVENTILATION:DESIGNFLOWRATE", "Schedule_Name", "SCHEDULE:COMPACT"),
    ("ZONECONTROL:THERMOSTAT", "Zone_or_ZoneList_Name", "ZONE"),
    ("ZONECONTROL:THERMOSTAT", "Control_Type_Schedule_Name", "SCHEDULE:COMPACT"),
    ("ZONECONTROL:THERMOSTAT", "Control_1_Name", "THERMOSTATSETPOINT:DUALSETPOINT"),
    (
        "THERMOSTATSETPOINT:DUALSETPOINT",
        "Heating_Setpoint_Temperature_Schedule_Name",
        "SCHEDULE:COMPACT",
    ),
    (
        "THERMOSTATSETPOINT:DUALSETPOINT",
        "Cooling_Setpoint_Temperature_Schedule_Name",
        "SCHEDULE:COMPACT",
    ),
    ("ZONEHVAC:IDEALLOADSAIRSYSTEM", "Availability_Schedule_Name", "SCHEDULE:COMPACT"),
    (
        "ZONEHVAC:IDEALLOADSAIRSYSTEM",
        "Design_Specification_Outdoor_Air_Object_Name",
        "DESIGNSPECIFICATION:OUTDOORAIR",
    ),
    ("ZONEHVAC:EQUIPMENTCONNECTIONS", "Zone_Name", "ZONE"),
    (
        "ZONEHVAC:EQUIPMENTCONNECTIONS",
        "Zone_Conditioning_Equipment_List_Name",
        "ZONEHVAC:EQUIPMENTLIST",
    ),
    (
        "ZONEHVAC:EQUIPMENTLIST",
        "Zone_Equipment_1_Name",
        "ZONEHVAC:IDEALLOADSAIRSYSTEM",
    ),
    ("CONSTRUCTION", "Outside_Layer", "MATERIAL"),
    ("WINDOWSHADINGCONTROL", "Zone_Name", "ZONE"),
];

/// Write-order rank: lower ranks must appear before the objects that
/// reference them. Unknown types keep catalog order at the end of rank 5.
pub fn type_rank(object_type: &str) -> u8 {
    let upper = object_type.to_ascii_uppercase();
    if upper.starts_with("MATERIAL") || upper.starts_with("WINDOWMATERIAL") {
        return 2;
    }
    match upper.as_str() {
        "SCHEDULETYPELIMITS" => 0,
        "SCHEDULE:COMPACT" => 1,
        "CONSTRUCTION" => 3,
        "ZONE" => 4,
        "DESIGNSPECIFICATION:OUTDOORAIR" => 5,
        "BUILDINGSURFACE:DETAILED" | "FENESTRATIONSURFACE:DETAILED" => 6,
        _ => 7,
    }
}
