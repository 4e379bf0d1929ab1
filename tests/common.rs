//! Common fixtures: definitions, execution records and stores for tests.
use chrono::{TimeZone, Utc};
use geoflow::definition::part;
use geoflow::prelude::*;
use serde_json::json;

pub const OSM: ResourceIdentifier = ResourceIdentifier { id: 1, version: 1 };
pub const TOMTOM: ResourceIdentifier = ResourceIdentifier { id: 2, version: 3 };

/// A fixed point in time, so records compare equal across runs.
#[allow(dead_code)]
pub fn at(hour: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
}

/// The full pipeline:
///
/// ```text
/// osm ──► Transform OSM ──────┬──► Link (LIMES) ──┐
/// tomtom ► Transform TomTom ──┴───────────────────┴► Fuse (FAGI) ──► Enrich (DEER)
/// ```
#[allow(dead_code)]
pub fn pipeline_definition() -> ProcessDefinition {
    ProcessDefinitionBuilder::new("poi-integration")
        .description("Transform, link, fuse and enrich two POI datasets")
        .catalog("osm", "OSM extract", OSM)
        .catalog("tomtom", "TomTom POIs", TOMTOM)
        .step(Step::new(1, "Transform OSM", Tool::Triplegeo).with_input("osm"))
        .step(Step::new(2, "Transform TomTom", Tool::Triplegeo).with_input("tomtom"))
        .step(
            Step::new(3, "Link", Tool::Limes)
                .with_input("osm-rdf")
                .with_input("tomtom-rdf"),
        )
        .step(
            Step::new(4, "Fuse", Tool::Fagi)
                .with_input("osm-rdf")
                .with_input("tomtom-rdf")
                .with_input("links"),
        )
        .step(Step::new(5, "Enrich", Tool::Deer).with_input("fused"))
        .output("osm-rdf", "OSM triples", 1)
        .output("tomtom-rdf", "TomTom triples", 2)
        .output("links", "Links", 3)
        .output("fused", "Fused POIs", 4)
        .output("enriched", "Enriched POIs", 5)
        .build()
        .unwrap()
}

#[allow(dead_code)]
pub fn pipeline_execution() -> ProcessExecutionRecord {
    let mut execution = ProcessExecutionRecord::new(100, ProcessIdentifier::new(1, 1), at(8));
    execution.start(at(9)).unwrap();
    execution.steps = vec![
        output_step(1, "Transform OSM", Tool::Triplegeo, part::TRANSFORMED, Some("osm_transformed")),
        output_step(2, "Transform TomTom", Tool::Triplegeo, part::TRANSFORMED, Some("tomtom_transformed")),
        ProcessExecutionStepRecord::new(3, "Link", Tool::Limes)
            .with_status(ExecutionStatus::Completed)
            .with_file(ProcessExecutionStepFileRecord::new(
                geoflow::execution::StepFileRole::Output,
                "link/links.nt",
            )),
        output_step(4, "Fuse", Tool::Fagi, part::FUSED, Some("fused")),
        output_step(5, "Enrich", Tool::Deer, part::ENRICHED, Some("enriched")),
    ];
    execution.complete(at(10)).unwrap();
    execution
}

/// A completed step record with a single OUTPUT file of `part`.
#[allow(dead_code)]
pub fn output_step(
    key: i32,
    name: &str,
    tool: Tool,
    part: &str,
    table: Option<&str>,
) -> ProcessExecutionStepRecord {
    let mut file = ProcessExecutionStepFileRecord::output(&format!("{}/{}.nt", tool.slug(), part), part);
    file.table_name = table.map(str::to_string);
    ProcessExecutionStepRecord::new(key, name, tool)
        .with_status(ExecutionStatus::Completed)
        .with_file(file)
}

/// Geometry store backing the pipeline: `http://osm/1` was fused with
/// `http://tomtom/9` by link 7, keeping the OSM URI.
#[allow(dead_code)]
pub fn pipeline_store() -> MemoryFeatureStore {
    MemoryFeatureStore::new()
        .with_feature("osm_raw", "http://osm/1", point(23.72, 37.98), json!({ "id": 1, "name": "Cafe Athens" }))
        .with_feature("tomtom_raw", "http://tomtom/9", point(23.72, 37.98), json!({ "id": 9, "name": "Athens Cafe" }))
        .with_feature("osm_transformed", "http://osm/1", point(23.72, 37.98), json!({ "id": 1, "name": "Cafe Athens" }))
        .with_feature("osm_transformed", "http://osm/2", point(23.73, 37.97), json!({ "id": 2, "name": "Bakery" }))
        .with_feature("tomtom_transformed", "http://tomtom/9", point(23.72, 37.98), json!({ "id": 9, "name": "Athens Cafe", "phone": "210 1234" }))
        .with_feature("fused", "http://osm/1", point(23.72, 37.98), json!({ "id": 1, "name": "Cafe Athens", "phone": "210 1234" }))
        .with_feature("enriched", "http://osm/1", point(23.72, 37.98), json!({ "id": 1, "name": "Cafe Athens", "phone": "210 1234", "category": "cafe" }))
        .with_link("fused", 7, "http://osm/1", "http://tomtom/9")
        .with_action("fused", 7, "http://slipo.eu/def#name http://slipo.eu/def#nameValue", "keep-left", Some("Cafe Athens"))
        .with_action("fused", 7, "http://slipo.eu/def#phone http://slipo.eu/def#contactValue", "keep-right", Some("210 1234"))
        .with_action("fused", 8, "http://slipo.eu/def#homepage", "keep-left", None)
}

#[allow(dead_code)]
pub fn pipeline_catalog() -> MemoryCatalog {
    MemoryCatalog::new()
        .with_resource(ResourceRecord::new(OSM, "OSM extract").with_table("osm_raw"))
        .with_resource(ResourceRecord::new(TOMTOM, "TomTom POIs").with_table("tomtom_raw"))
}

#[allow(dead_code)]
pub fn point(x: f64, y: f64) -> serde_json::Value {
    json!({ "type": "Point", "coordinates": [x, y] })
}

/// Number of features in a materialized feature collection.
#[allow(dead_code)]
pub fn feature_count(provenance: &Provenance) -> usize {
    provenance
        .features
        .as_ref()
        .and_then(|f| f["features"].as_array())
        .map_or(0, Vec::len)
}
