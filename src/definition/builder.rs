use super::graph::ProcessDefinition;
use super::resource::{CatalogResource, ProcessResource, ResourceIdentifier};
use super::step::Step;
use crate::error::DefinitionError;

/// Fluent construction of a [`ProcessDefinition`]; validation happens in `build`.
///
/// ```
/// use geoflow::definition::{ProcessDefinitionBuilder, ResourceIdentifier, Step, Tool};
///
/// let definition = ProcessDefinitionBuilder::new("osm-pois")
///     .catalog("osm", "OSM extract", ResourceIdentifier::new(7, 1))
///     .step(Step::new(1, "Transform OSM", Tool::Triplegeo).with_input("osm"))
///     .output("osm-triples", "OSM triples", 1)
///     .build()
///     .unwrap();
///
/// assert_eq!(definition.step_by_resource_key("osm-triples").unwrap().key, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProcessDefinitionBuilder {
    name: String,
    description: Option<String>,
    resources: Vec<ProcessResource>,
    steps: Vec<Step>,
}

impl ProcessDefinitionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn resource(mut self, resource: ProcessResource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn catalog(self, key: &str, name: &str, resource: ResourceIdentifier) -> Self {
        self.resource(ProcessResource::catalog(key, name, resource))
    }

    /// Adds a catalog resource whose backing table is already resolved.
    pub fn catalog_with_table(
        self,
        key: &str,
        name: &str,
        resource: ResourceIdentifier,
        table_name: &str,
    ) -> Self {
        self.resource(ProcessResource::Catalog(CatalogResource {
            key: key.to_string(),
            name: name.to_string(),
            resource,
            table_name: Some(table_name.to_string()),
            bounding_box: None,
        }))
    }

    pub fn output(self, key: &str, name: &str, step_key: i32) -> Self {
        self.resource(ProcessResource::output(key, name, step_key))
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn build(self) -> Result<ProcessDefinition, DefinitionError> {
        ProcessDefinition::try_new(&self.name, self.description, self.resources, self.steps)
    }
}
