use super::resource::{ProcessResource, ResourceIdentifier};
use super::step::Step;
use crate::error::DefinitionError;
use ahash::AHashMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Serialized form of a [`ProcessDefinition`]. Deserialization goes through
/// this document so that every loaded definition is validated and indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub resources: Vec<ProcessResource>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// An immutable pipeline graph together with its lookup indices.
///
/// Indices are built once at construction; every lookup afterwards is a
/// single hash probe. Indices store positions into `resources`/`steps`
/// so the definition never holds two copies of a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "DefinitionDocument", into = "DefinitionDocument")]
pub struct ProcessDefinition {
    name: String,
    description: Option<String>,
    resources: Vec<ProcessResource>,
    steps: Vec<Step>,
    key_to_step: AHashMap<i32, usize>,
    node_name_to_step: AHashMap<String, usize>,
    name_to_step: AHashMap<String, usize>,
    resource_key_to_resource: AHashMap<String, usize>,
    resource_key_to_step_key: AHashMap<String, i32>,
    resource_key_to_identifier: AHashMap<String, ResourceIdentifier>,
}

impl ProcessDefinition {
    /// Validates the structural invariants and builds the lookup indices.
    pub fn try_new(
        name: &str,
        description: Option<String>,
        resources: Vec<ProcessResource>,
        steps: Vec<Step>,
    ) -> Result<Self, DefinitionError> {
        if name.trim().is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        if let Some(key) = resources.iter().map(|r| r.key()).duplicates().next() {
            return Err(DefinitionError::DuplicateResourceKey(key.to_string()));
        }
        if let Some(key) = steps.iter().map(|s| s.key).duplicates().next() {
            return Err(DefinitionError::DuplicateStepKey(key));
        }
        if let Some(n) = steps.iter().map(|s| s.name.as_str()).duplicates().next() {
            return Err(DefinitionError::DuplicateStepName(n.to_string()));
        }
        if let Some(n) = steps.iter().map(|s| s.node_name.as_str()).duplicates().next() {
            return Err(DefinitionError::DuplicateNodeName(n.to_string()));
        }

        for resource in &resources {
            if let ProcessResource::Output(output) = resource {
                if !steps.iter().any(|s| s.key == output.step_key) {
                    return Err(DefinitionError::UnknownProducingStep {
                        resource_key: output.key.clone(),
                        step_key: output.step_key,
                    });
                }
            }
        }
        for step in &steps {
            if let Some(input) = step
                .inputs
                .iter()
                .find(|i| !resources.iter().any(|r| r.key() == i.input_key))
            {
                return Err(DefinitionError::DanglingInput {
                    step: step.name.clone(),
                    input_key: input.input_key.clone(),
                });
            }
        }

        Ok(Self::assemble(name, description, resources, steps))
    }

    /// Parses and validates a definition from its JSON document form.
    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        serde_json::from_str(json).map_err(|e| DefinitionError::Json(e.to_string()))
    }

    /// Builds the indices. Callers must have established the invariants.
    fn assemble(
        name: &str,
        description: Option<String>,
        resources: Vec<ProcessResource>,
        steps: Vec<Step>,
    ) -> Self {
        let key_to_step = steps.iter().enumerate().map(|(i, s)| (s.key, i)).collect();
        let node_name_to_step = steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.node_name.clone(), i))
            .collect();
        let name_to_step = steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();
        let resource_key_to_resource = resources
            .iter()
            .enumerate()
            .map(|(i, r)| (r.key().to_string(), i))
            .collect();

        let mut resource_key_to_step_key = AHashMap::new();
        let mut resource_key_to_identifier = AHashMap::new();
        for resource in &resources {
            match resource {
                ProcessResource::Output(r) => {
                    resource_key_to_step_key.insert(r.key.clone(), r.step_key);
                }
                ProcessResource::Catalog(r) => {
                    resource_key_to_identifier.insert(r.key.clone(), r.resource);
                }
            }
        }

        Self {
            name: name.to_string(),
            description,
            resources,
            steps,
            key_to_step,
            node_name_to_step,
            name_to_step,
            resource_key_to_resource,
            resource_key_to_step_key,
            resource_key_to_identifier,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns a copy carrying a different description.
    pub fn with_description(&self, description: Option<String>) -> Self {
        Self {
            description,
            ..self.clone()
        }
    }

    pub fn resources(&self) -> &[ProcessResource] {
        &self.resources
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step_by_key(&self, key: i32) -> Option<&Step> {
        self.key_to_step.get(&key).map(|&i| &self.steps[i])
    }

    pub fn step_by_node_name(&self, node_name: &str) -> Option<&Step> {
        self.node_name_to_step.get(node_name).map(|&i| &self.steps[i])
    }

    pub fn step_by_name(&self, name: &str) -> Option<&Step> {
        self.name_to_step.get(name).map(|&i| &self.steps[i])
    }

    pub fn resource_by_key(&self, resource_key: &str) -> Option<&ProcessResource> {
        self.resource_key_to_resource
            .get(resource_key)
            .map(|&i| &self.resources[i])
    }

    /// The step producing `resource_key`, or `None` when the key is unknown
    /// or names a catalog resource.
    pub fn step_by_resource_key(&self, resource_key: &str) -> Option<&Step> {
        self.resource_key_to_step_key
            .get(resource_key)
            .and_then(|&key| self.step_by_key(key))
    }

    /// The catalog identifier behind `resource_key`, or `None` when the key
    /// is unknown or names a step output.
    pub fn resource_identifier_by_resource_key(
        &self,
        resource_key: &str,
    ) -> Option<ResourceIdentifier> {
        self.resource_key_to_identifier.get(resource_key).copied()
    }

    /// Keys of all step outputs.
    pub fn output_keys(&self) -> BTreeSet<&str> {
        self.resource_key_to_step_key
            .keys()
            .map(String::as_str)
            .collect()
    }

    /// Produces a new definition whose step keys are remapped onto `0..N`
    /// in list order. Output resources follow the remapping. `self` is untouched.
    pub fn normalize(&self) -> Self {
        let mapping: AHashMap<i32, i32> = self
            .steps
            .iter()
            .zip(0..)
            .map(|(s, seq)| (s.key, seq))
            .collect();

        let resources = self
            .resources
            .iter()
            .map(|r| match r {
                ProcessResource::Output(output) => {
                    let mut output = output.clone();
                    output.step_key = mapping[&output.step_key];
                    ProcessResource::Output(output)
                }
                other => other.clone(),
            })
            .collect();
        let steps = self
            .steps
            .iter()
            .map(|s| s.rekeyed(mapping[&s.key]))
            .collect();

        Self::assemble(&self.name, self.description.clone(), resources, steps)
    }
}

impl TryFrom<DefinitionDocument> for ProcessDefinition {
    type Error = DefinitionError;

    fn try_from(doc: DefinitionDocument) -> Result<Self, Self::Error> {
        Self::try_new(&doc.name, doc.description, doc.resources, doc.steps)
    }
}

impl From<ProcessDefinition> for DefinitionDocument {
    fn from(def: ProcessDefinition) -> Self {
        Self {
            name: def.name,
            description: def.description,
            resources: def.resources,
            steps: def.steps,
        }
    }
}
