//! Canonical column names of the tables held by the data model variants. Raw sources must use
//! these names in their header row; derived tables (e.g. `Database::get_country`) use the
//! prefixed forms.

pub const SCENARIO_DESCRIPTOR: &str = "scenario_descriptor";
pub const FUNDING_FRACTION: &str = "funding_fraction";
pub const COUNTRY: &str = "country";
pub const YEAR: &str = "year";
pub const INDICATOR: &str = "indicator";

pub const LOW: &str = "low";
pub const CENTRAL: &str = "central";
pub const HIGH: &str = "high";

pub const MODEL_LOW: &str = "model_low";
pub const MODEL_CENTRAL: &str = "model_central";
pub const MODEL_HIGH: &str = "model_high";
pub const PF_CENTRAL: &str = "pf_central";
pub const PARTNER_CENTRAL: &str = "partner_central";

// Columns of the stats summary table
pub const FUNCTION: &str = "Function";
pub const KEY: &str = "Key";
pub const VALUE: &str = "Value";
