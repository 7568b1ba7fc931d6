// crates/parcel-index-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration for parcel-index.toml.
// Purpose: Provide a documented, valid starting point for operators.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The example mirrors a county deployment: backups live under
//! `/srv/parcels/backup`, the map front end reads from `/srv/parcels/www`.

/// Returns a complete, valid example configuration in TOML form.
#[must_use]
pub fn config_toml_example() -> String {
    r##"# parcel-index.toml

[directories.backup]
master_index = "/srv/parcels/backup/master_index"
base_source = "/srv/parcels/backup/base_source"
master_source = "/srv/parcels/backup/master_source"
history = "/srv/parcels/backup/history"

[directories.production]
master_index = "/srv/parcels/www/master_index"
map_source = "/srv/parcels/www/map"

[collections.base]
properties = ["parcelNum", "zoning", "acres"]

[[collections.base.layers]]
key = "parcels"
name = "Parcels"
dataType = "category"

[[collections.base.layers]]
key = "zoning"
name = "Zoning"
dataType = "category"

[[collections.base.layers]]
key = "acres"
name = "Acreage"
dataType = "range"

[collections.master]
properties = ["parcelNum", "owner", "zoning", "acres", "damage"]

[[collections.master.layers]]
key = "zoning"
name = "Zoning"
dataType = "category"

[[collections.master.layers]]
key = "acres"
name = "Acreage"
dataType = "range"

[[collections.master.layers]]
key = "damage"
name = "Damage Assessment"
dataType = "category"

[binning]
max_bins = 7
palette = ["#1b9e77", "#d95f02", "#7570b3", "#e7298a", "#66a61e"]

[validation]
# update_schema = "/srv/parcels/schema/update.schema.json"
"##
    .to_string()
}
