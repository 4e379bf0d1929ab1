//! Tests for feature lineage resolution.
mod common;
use common::*;
use geoflow::definition::part;
use geoflow::lineage::{AttributeDictionary, Operation};
use geoflow::prelude::*;
use geoflow::store::FeatureQuery;
use serde_json::json;

fn execution_with(steps: Vec<ProcessExecutionStepRecord>) -> ProcessExecutionRecord {
    let mut execution = ProcessExecutionRecord::new(1, ProcessIdentifier::new(9, 1), at(8));
    execution.steps = steps;
    execution
}

fn transform_only() -> ProcessDefinition {
    ProcessDefinitionBuilder::new("transform")
        .catalog("osm", "OSM extract", OSM)
        .step(Step::new(1, "Transform", Tool::Triplegeo).with_input("osm"))
        .output("rdf", "Triples", 1)
        .build()
        .unwrap()
}

fn fusion_of_catalogs() -> ProcessDefinition {
    ProcessDefinitionBuilder::new("fuse-catalogs")
        .catalog("left", "OSM extract", OSM)
        .catalog("right", "TomTom POIs", TOMTOM)
        .step(
            Step::new(1, "Fuse", Tool::Fagi)
                .with_input("left")
                .with_input("right"),
        )
        .output("fused", "Fused", 1)
        .build()
        .unwrap()
}

fn fusion_of_transforms() -> ProcessDefinition {
    ProcessDefinitionBuilder::new("fuse-transforms")
        .catalog("osm", "OSM extract", OSM)
        .catalog("tomtom", "TomTom POIs", TOMTOM)
        .step(Step::new(1, "Transform OSM", Tool::Triplegeo).with_input("osm"))
        .step(Step::new(2, "Transform TomTom", Tool::Triplegeo).with_input("tomtom"))
        .step(
            Step::new(3, "Fuse", Tool::Fagi)
                .with_input("osm-rdf")
                .with_input("tomtom-rdf"),
        )
        .output("osm-rdf", "OSM triples", 1)
        .output("tomtom-rdf", "TomTom triples", 2)
        .output("fused", "Fused", 3)
        .build()
        .unwrap()
}

fn fusion_of_transforms_execution() -> ProcessExecutionRecord {
    execution_with(vec![
        output_step(1, "Transform OSM", Tool::Triplegeo, part::TRANSFORMED, Some("osm_transformed")),
        output_step(2, "Transform TomTom", Tool::Triplegeo, part::TRANSFORMED, Some("tomtom_transformed")),
        output_step(3, "Fuse", Tool::Fagi, part::FUSED, Some("fused")),
    ])
}

#[test]
fn test_transform_only_yields_single_query_at_level_zero() {
    let definition = transform_only();
    let execution = execution_with(vec![output_step(
        1,
        "Transform",
        Tool::Triplegeo,
        part::TRANSFORMED,
        Some("osm_transformed"),
    )]);
    let resolver = LineageResolver::builder(pipeline_store(), pipeline_catalog()).build();

    let provenance = resolver
        .resolve(&definition, &execution, "rdf", "1", "http://osm/1")
        .unwrap();

    assert_eq!(
        provenance.queries,
        vec![FeatureQuery::new(0, "Transform", "osm_transformed", "http://osm/1")]
    );
    assert!(provenance.operations.is_empty());
    assert_eq!(provenance.step_name, "Transform");
    assert_eq!(provenance.output_key, "rdf");
    assert_eq!(provenance.feature_id, "1");
    assert_eq!(feature_count(&provenance), 1);

    let feature = &provenance.features.as_ref().unwrap()["features"][0];
    assert_eq!(feature["source"], "Transform");
    assert_eq!(feature["properties"]["name"], "Cafe Athens");
    assert_eq!(feature["geometry"]["type"], "Point");
}

#[test]
fn test_enrichment_of_catalog_resource() {
    let definition = ProcessDefinitionBuilder::new("enrich")
        .catalog("osm", "OSM extract", OSM)
        .step(Step::new(1, "Enrich", Tool::Deer).with_input("osm"))
        .output("enriched", "Enriched", 1)
        .build()
        .unwrap();
    let execution = execution_with(vec![output_step(
        1,
        "Enrich",
        Tool::Deer,
        part::ENRICHED,
        None,
    )]);
    let store = MemoryFeatureStore::new().with_feature(
        "osm_raw",
        "http://osm/1",
        point(1.0, 2.0),
        json!({ "name": "Cafe" }),
    );
    let resolver = LineageResolver::builder(store, pipeline_catalog()).build();

    let provenance = resolver
        .resolve(&definition, &execution, "enriched", "1", "http://osm/1")
        .unwrap();

    let enrichments: Vec<_> = provenance.enrichments().collect();
    assert_eq!(enrichments.len(), 1);
    assert_eq!(enrichments[0].level, 0);
    assert_eq!(enrichments[0].input_name, "OSM extract");
    assert_eq!(enrichments[0].step_name, "Enrich");
    assert_eq!(enrichments[0].uri, "http://osm/1");
    assert_eq!(
        provenance.queries,
        vec![FeatureQuery::new(0, "OSM extract", "osm_raw", "http://osm/1")]
    );
    assert_eq!(feature_count(&provenance), 1);
}

#[test]
fn test_enrichment_output_table_is_reported_before_its_source() {
    let definition = ProcessDefinitionBuilder::new("enrich")
        .catalog("osm", "OSM extract", OSM)
        .step(Step::new(1, "Enrich", Tool::Deer).with_input("osm"))
        .output("enriched", "Enriched", 1)
        .build()
        .unwrap();
    let execution = execution_with(vec![output_step(
        1,
        "Enrich",
        Tool::Deer,
        part::ENRICHED,
        Some("enriched"),
    )]);
    let resolver = LineageResolver::builder(pipeline_store(), pipeline_catalog()).build();

    let provenance = resolver
        .resolve(&definition, &execution, "enriched", "1", "http://osm/1")
        .unwrap();

    let sources: Vec<_> = provenance.queries.iter().map(|q| (q.level, q.source.as_str())).collect();
    assert_eq!(sources, vec![(0, "Enrich"), (0, "OSM extract")]);
}

#[test]
fn test_fusion_with_link_over_catalog_inputs() {
    let definition = fusion_of_catalogs();
    let execution = execution_with(vec![output_step(1, "Fuse", Tool::Fagi, part::FUSED, Some("fused"))]);
    let resolver = LineageResolver::builder(pipeline_store(), pipeline_catalog()).build();

    let provenance = resolver
        .resolve(&definition, &execution, "fused", "9", "http://tomtom/9")
        .unwrap();

    let fusions: Vec<_> = provenance.fusions().collect();
    assert_eq!(fusions.len(), 1);
    assert_eq!(provenance.operations.len(), 1);

    let fuse = fusions[0];
    assert_eq!(fuse.level, 0);
    assert_eq!(fuse.tool, Tool::Fagi);
    assert_eq!(fuse.left_uri, "http://osm/1");
    assert_eq!(fuse.right_uri, "http://tomtom/9");
    assert_eq!(fuse.selected_uri, "http://tomtom/9");
    assert_eq!(fuse.left_input, "OSM extract");
    assert_eq!(fuse.right_input, "TomTom POIs");

    // Only the two actions recorded for link 7 belong to this feature.
    assert_eq!(fuse.actions.len(), 2);
    assert_eq!(fuse.actions[0].property, "name");
    assert_eq!(fuse.actions[0].operation, "keep-left");
    assert_eq!(fuse.actions[0].value.as_deref(), Some("Cafe Athens"));
    assert_eq!(fuse.actions[1].property, "phone");

    assert_eq!(
        provenance.queries,
        vec![
            FeatureQuery::new(0, "Fuse", "fused", "http://tomtom/9"),
            FeatureQuery::new(0, "OSM extract", "osm_raw", "http://osm/1"),
            FeatureQuery::new(0, "TomTom POIs", "tomtom_raw", "http://tomtom/9"),
        ]
    );
}

#[test]
fn test_fusion_selects_left_uri_when_queried() {
    let definition = fusion_of_catalogs();
    let execution = execution_with(vec![output_step(1, "Fuse", Tool::Fagi, part::FUSED, Some("fused"))]);
    let resolver = LineageResolver::builder(pipeline_store(), pipeline_catalog()).build();

    let provenance = resolver
        .resolve(&definition, &execution, "fused", "1", "http://osm/1")
        .unwrap();

    let fuse = provenance.fusions().next().unwrap();
    assert_eq!(fuse.selected_uri, "http://osm/1");
}

#[test]
fn test_fusion_without_link_recurses_into_both_inputs_with_original_uri() {
    let definition = fusion_of_transforms();
    let execution = fusion_of_transforms_execution();
    let store = MemoryFeatureStore::new()
        .with_table("fused_links", Vec::new())
        .with_table("fused_actions", Vec::new())
        .with_feature("fused", "http://osm/2", point(0.0, 0.0), json!({}))
        .with_feature("osm_transformed", "http://osm/2", point(0.0, 0.0), json!({}))
        .with_table("tomtom_transformed", Vec::new());
    let resolver = LineageResolver::builder(store, pipeline_catalog()).build();

    let provenance = resolver
        .resolve(&definition, &execution, "fused", "2", "http://osm/2")
        .unwrap();

    assert_eq!(provenance.fusions().count(), 0);
    assert!(provenance.operations.is_empty());
    assert_eq!(
        provenance.queries,
        vec![
            FeatureQuery::new(0, "Fuse", "fused", "http://osm/2"),
            FeatureQuery::new(1, "Transform OSM", "osm_transformed", "http://osm/2"),
            FeatureQuery::new(1, "Transform TomTom", "tomtom_transformed", "http://osm/2"),
        ]
    );
    // The TomTom table has no row for the OSM URI.
    assert_eq!(feature_count(&provenance), 2);
}

#[test]
fn test_fusion_with_link_recurses_with_side_uris() {
    let definition = fusion_of_transforms();
    let execution = fusion_of_transforms_execution();
    let resolver = LineageResolver::builder(pipeline_store(), pipeline_catalog()).build();

    let provenance = resolver
        .resolve(&definition, &execution, "fused", "1", "http://osm/1")
        .unwrap();

    assert_eq!(
        provenance.queries,
        vec![
            FeatureQuery::new(0, "Fuse", "fused", "http://osm/1"),
            FeatureQuery::new(1, "Transform OSM", "osm_transformed", "http://osm/1"),
            FeatureQuery::new(1, "Transform TomTom", "tomtom_transformed", "http://tomtom/9"),
        ]
    );
    let fuse = provenance.fusions().next().unwrap();
    assert_eq!(fuse.left_input, "Transform OSM");
    assert_eq!(fuse.right_input, "Transform TomTom");
    assert_eq!(feature_count(&provenance), 3);
}

#[test]
fn test_full_pipeline_lineage() {
    let definition = pipeline_definition();
    let execution = pipeline_execution();
    let resolver = LineageResolver::builder(pipeline_store(), pipeline_catalog()).build();

    let provenance = resolver
        .resolve(&definition, &execution, "enriched", "1", "http://osm/1")
        .unwrap();

    assert_eq!(provenance.step_name, "Enrich");
    let levels: Vec<_> = provenance
        .queries
        .iter()
        .map(|q| (q.level, q.source.as_str(), q.feature_uri.as_str()))
        .collect();
    assert_eq!(
        levels,
        vec![
            (0, "Enrich", "http://osm/1"),
            (1, "Fuse", "http://osm/1"),
            (2, "Transform OSM", "http://osm/1"),
            (2, "Transform TomTom", "http://tomtom/9"),
        ]
    );

    // Inner operations are appended before the operations that consumed them.
    assert_eq!(provenance.operations.len(), 2);
    assert!(matches!(&provenance.operations[0], Operation::Fuse(f) if f.level == 1));
    assert!(matches!(&provenance.operations[1], Operation::Enrich(e) if e.level == 0 && e.input_name == "Fuse"));
    assert_eq!(feature_count(&provenance), 4);
}

#[test]
fn test_enrichment_honors_input_part_key() {
    let definition = ProcessDefinitionBuilder::new("classified")
        .catalog("osm", "OSM extract", OSM)
        .step(Step::new(1, "Transform", Tool::Triplegeo).with_input("osm"))
        .step(Step::new(2, "Enrich", Tool::Deer).with_input_part("rdf", part::CLASSIFICATION))
        .output("rdf", "Triples", 1)
        .output("enriched", "Enriched", 2)
        .build()
        .unwrap();
    let transform = output_step(1, "Transform", Tool::Triplegeo, part::TRANSFORMED, Some("osm_transformed"))
        .with_file(
            ProcessExecutionStepFileRecord::output("triplegeo/classification.csv", part::CLASSIFICATION)
                .with_table("osm_classification"),
        );
    let execution = execution_with(vec![
        transform,
        output_step(2, "Enrich", Tool::Deer, part::ENRICHED, None),
    ]);
    let store = MemoryFeatureStore::new().with_table("osm_classification", Vec::new());
    let resolver = LineageResolver::builder(store, pipeline_catalog()).build();

    let provenance = resolver
        .resolve(&definition, &execution, "enriched", "1", "http://osm/1")
        .unwrap();

    assert_eq!(
        provenance.queries,
        vec![FeatureQuery::new(1, "Transform", "osm_classification", "http://osm/1")]
    );
    // A matching table with no matching row still yields an (empty) collection.
    assert_eq!(feature_count(&provenance), 0);
    assert!(provenance.features.is_some());
}

#[test]
fn test_passthrough_tools_contribute_nothing() {
    let definition = pipeline_definition();
    let execution = pipeline_execution();
    let resolver = LineageResolver::builder(pipeline_store(), pipeline_catalog()).build();

    let provenance = resolver
        .resolve(&definition, &execution, "links", "1", "http://osm/1")
        .unwrap();

    assert_eq!(provenance.step_name, "Link");
    assert!(provenance.queries.is_empty());
    assert!(provenance.operations.is_empty());
    assert!(provenance.features.is_none());
}

#[test]
fn test_fusion_output_without_table_contributes_nothing() {
    let definition = fusion_of_catalogs();
    let execution = execution_with(vec![output_step(1, "Fuse", Tool::Fagi, part::FUSED, None)]);
    // An empty store: any link lookup would fail with a missing table.
    let resolver = LineageResolver::builder(MemoryFeatureStore::new(), MemoryCatalog::new()).build();

    let provenance = resolver
        .resolve(&definition, &execution, "fused", "1", "http://osm/1")
        .unwrap();

    assert!(provenance.queries.is_empty());
    assert!(provenance.operations.is_empty());
    assert!(provenance.features.is_none());
}

#[test]
fn test_custom_attribute_mapping() {
    let definition = fusion_of_catalogs();
    let execution = execution_with(vec![output_step(1, "Fuse", Tool::Fagi, part::FUSED, Some("fused"))]);
    let store = pipeline_store().with_action("fused", 7, "http://example.org/rating", "keep-more-complete", Some("4"));

    let resolver = LineageResolver::builder(store, pipeline_catalog())
        .with_attribute_mapping("http://example.org/rating", "rating")
        .build();
    let provenance = resolver
        .resolve(&definition, &execution, "fused", "1", "http://osm/1")
        .unwrap();
    let properties: Vec<_> = provenance.fusions().next().unwrap().actions.iter().map(|a| a.property.as_str()).collect();
    assert_eq!(properties, vec!["name", "phone", "rating"]);

    let store = pipeline_store();
    let resolver = LineageResolver::builder(store, pipeline_catalog())
        .with_attribute_dictionary(AttributeDictionary::empty())
        .build();
    let provenance = resolver
        .resolve(&definition, &execution, "fused", "1", "http://osm/1")
        .unwrap();
    let fuse = provenance.fusions().next().unwrap();
    assert_eq!(fuse.actions[0].property, "http://slipo.eu/def#name http://slipo.eu/def#nameValue");
}

#[test]
fn test_unknown_output_key() {
    let resolver = LineageResolver::builder(pipeline_store(), pipeline_catalog()).build();
    let result = resolver.resolve(&pipeline_definition(), &pipeline_execution(), "osm", "1", "http://osm/1");
    assert!(matches!(result, Err(LineageError::OutputNotFound(key)) if key == "osm"));
}

#[test]
fn test_missing_step_record() {
    let definition = pipeline_definition();
    let mut execution = pipeline_execution();
    execution.steps.retain(|s| s.key != 4);
    let resolver = LineageResolver::builder(pipeline_store(), pipeline_catalog()).build();

    let result = resolver.resolve(&definition, &execution, "enriched", "1", "http://osm/1");
    assert!(matches!(
        result,
        Err(LineageError::StepRecordNotFound { execution_id: 100, step_key: 4, ref step_name }) if step_name == "Fuse"
    ));
}

#[test]
fn test_missing_output_file() {
    let definition = transform_only();
    let execution = execution_with(vec![output_step(1, "Transform", Tool::Triplegeo, part::CLASSIFICATION, None)]);
    let resolver = LineageResolver::builder(pipeline_store(), pipeline_catalog()).build();

    let result = resolver.resolve(&definition, &execution, "rdf", "1", "http://osm/1");
    assert!(matches!(
        result,
        Err(LineageError::OutputFileNotFound { ref part, .. }) if part == "transformed"
    ));
}

#[test]
fn test_missing_catalog_resource() {
    let definition = fusion_of_catalogs();
    let execution = execution_with(vec![output_step(1, "Fuse", Tool::Fagi, part::FUSED, Some("fused"))]);
    let catalog = MemoryCatalog::new().with_resource(ResourceRecord::new(OSM, "OSM extract"));
    let resolver = LineageResolver::builder(pipeline_store(), catalog).build();

    let result = resolver.resolve(&definition, &execution, "fused", "1", "http://osm/1");
    assert_eq!(result.unwrap_err(), LineageError::ResourceNotFound(TOMTOM));
}

#[test]
fn test_catalog_node_is_unsupported() {
    let definition = ProcessDefinitionBuilder::new("designer")
        .step(Step::new(1, "Register OSM", Tool::Catalog))
        .output("osm", "OSM", 1)
        .build()
        .unwrap();
    let execution = execution_with(vec![ProcessExecutionStepRecord::new(1, "Register OSM", Tool::Catalog)]);
    let resolver = LineageResolver::builder(pipeline_store(), pipeline_catalog()).build();

    let result = resolver.resolve(&definition, &execution, "osm", "1", "http://osm/1");
    assert_eq!(result.unwrap_err(), LineageError::UnsupportedTool(Tool::Catalog));
}

#[test]
fn test_input_arity_is_checked() {
    let definition = ProcessDefinitionBuilder::new("bad-enrich")
        .catalog("osm", "OSM extract", OSM)
        .catalog("tomtom", "TomTom POIs", TOMTOM)
        .step(
            Step::new(1, "Enrich", Tool::Deer)
                .with_input("osm")
                .with_input("tomtom"),
        )
        .output("enriched", "Enriched", 1)
        .build()
        .unwrap();
    let execution = execution_with(vec![output_step(1, "Enrich", Tool::Deer, part::ENRICHED, None)]);
    let resolver = LineageResolver::builder(pipeline_store(), pipeline_catalog()).build();

    let result = resolver.resolve(&definition, &execution, "enriched", "1", "http://osm/1");
    assert!(matches!(
        result,
        Err(LineageError::InputArity { tool: Tool::Deer, found: 2, .. })
    ));

    let definition = ProcessDefinitionBuilder::new("bad-fuse")
        .catalog("osm", "OSM extract", OSM)
        .step(Step::new(1, "Fuse", Tool::Fagi).with_input("osm"))
        .output("fused", "Fused", 1)
        .build()
        .unwrap();
    let execution = execution_with(vec![output_step(1, "Fuse", Tool::Fagi, part::FUSED, Some("fused"))]);
    let result = resolver.resolve(&definition, &execution, "fused", "1", "http://osm/1");
    assert!(matches!(
        result,
        Err(LineageError::InputArity { tool: Tool::Fagi, found: 1, .. })
    ));
}

#[test]
fn test_store_failures_propagate() {
    let definition = fusion_of_catalogs();
    let execution = execution_with(vec![output_step(1, "Fuse", Tool::Fagi, part::FUSED, Some("fused"))]);
    let resolver = LineageResolver::builder(MemoryFeatureStore::new(), pipeline_catalog()).build();

    let result = resolver.resolve(&definition, &execution, "fused", "1", "http://osm/1");
    assert_eq!(
        result.unwrap_err(),
        LineageError::Store(StoreError::TableNotFound("fused_links".to_string()))
    );
}

#[test]
fn test_self_referencing_step_is_reported_as_cycle() {
    let definition = ProcessDefinitionBuilder::new("loop")
        .step(Step::new(1, "Enrich", Tool::Deer).with_input("enriched"))
        .output("enriched", "Enriched", 1)
        .build()
        .unwrap();
    let execution = execution_with(vec![output_step(1, "Enrich", Tool::Deer, part::ENRICHED, None)]);
    let resolver = LineageResolver::builder(pipeline_store(), pipeline_catalog()).build();

    let result = resolver.resolve(&definition, &execution, "enriched", "1", "http://osm/1");
    assert!(matches!(result, Err(LineageError::Cycle { .. })));
}

#[test]
fn test_resolution_over_normalized_definition() {
    let definition = pipeline_definition().normalize();
    let mut execution = pipeline_execution();
    for step in &mut execution.steps {
        step.key -= 1;
    }
    let resolver = LineageResolver::builder(pipeline_store(), pipeline_catalog()).build();

    let provenance = resolver
        .resolve(&definition, &execution, "enriched", "1", "http://osm/1")
        .unwrap();
    assert_eq!(provenance.queries.len(), 4);
    assert_eq!(provenance.operations.len(), 2);
}

#[test]
fn test_record_of_another_step_is_rejected() {
    let definition = pipeline_definition().normalize();
    let execution = pipeline_execution();
    let resolver = LineageResolver::builder(pipeline_store(), pipeline_catalog()).build();

    // Key 1 is "Transform TomTom" after renumbering but "Transform OSM" in the execution.
    let result = resolver.resolve(&definition, &execution, "tomtom-rdf", "9", "http://tomtom/9");
    assert_eq!(
        result.unwrap_err(),
        LineageError::StepRecordMismatch {
            step_key: 1,
            step_name: "Transform TomTom".to_string(),
            tool: Tool::Triplegeo,
            record_name: "Transform OSM".to_string(),
            record_tool: Tool::Triplegeo,
        }
    );

    let result = resolver.resolve(&definition, &execution, "enriched", "1", "http://osm/1");
    assert!(matches!(
        result,
        Err(LineageError::StepRecordMismatch { record_tool: Tool::Fagi, tool: Tool::Deer, .. })
    ));
}

#[test]
fn test_aligned_execution_resolves_against_normalized_definition() {
    let definition = pipeline_definition().normalize();
    let mut execution = pipeline_execution();
    assert_eq!(execution.align_step_keys(&definition), 5);
    assert_eq!(execution.align_step_keys(&definition), 0);
    let resolver = LineageResolver::builder(pipeline_store(), pipeline_catalog()).build();

    let provenance = resolver
        .resolve(&definition, &execution, "tomtom-rdf", "9", "http://tomtom/9")
        .unwrap();
    assert_eq!(
        provenance.queries,
        vec![FeatureQuery::new(0, "Transform TomTom", "tomtom_transformed", "http://tomtom/9")]
    );

    let expected = resolver
        .resolve(&pipeline_definition(), &pipeline_execution(), "enriched", "1", "http://osm/1")
        .unwrap();
    let provenance = resolver
        .resolve(&definition, &execution, "enriched", "1", "http://osm/1")
        .unwrap();
    assert_eq!(provenance, expected);
}

#[test]
fn test_concurrent_resolutions_share_one_resolver() {
    let definition = pipeline_definition();
    let execution = pipeline_execution();
    let resolver = LineageResolver::builder(pipeline_store(), pipeline_catalog()).build();

    let results: Vec<Provenance> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    resolver
                        .resolve(&definition, &execution, "enriched", "1", "http://osm/1")
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(results[0].operations.len(), 2);
}
