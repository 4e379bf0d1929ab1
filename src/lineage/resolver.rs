use super::{AttributeDictionary, EnrichOperation, FuseOperation, Operation, PropertyAction, Provenance};
use crate::definition::{ProcessDefinition, Step, StepInput, Tool};
use crate::error::LineageError;
use crate::execution::{ProcessExecutionRecord, ProcessExecutionStepRecord, StepFileRole};
use crate::store::{FeatureQuery, FeatureStore, ResourceCatalog, ResourceRecord};
use tracing::{debug, warn};

/// Resolves the provenance of output features. Holds no per-call state,
/// so one resolver can serve concurrent resolutions.
pub struct LineageResolver {
    store: Box<dyn FeatureStore>,
    catalog: Box<dyn ResourceCatalog>,
    attributes: AttributeDictionary,
}

pub struct LineageResolverBuilder {
    store: Box<dyn FeatureStore>,
    catalog: Box<dyn ResourceCatalog>,
    attributes: AttributeDictionary,
}

impl LineageResolverBuilder {
    pub fn new(store: impl FeatureStore + 'static, catalog: impl ResourceCatalog + 'static) -> Self {
        Self {
            store: Box::new(store),
            catalog: Box::new(catalog),
            attributes: AttributeDictionary::default(),
        }
    }

    /// Adds or overrides the label reported for a raw fusion attribute name.
    pub fn with_attribute_mapping(mut self, raw: &str, label: &str) -> Self {
        self.attributes.insert(raw, label);
        self
    }

    /// Replaces the whole attribute dictionary.
    pub fn with_attribute_dictionary(mut self, attributes: AttributeDictionary) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn build(self) -> LineageResolver {
        LineageResolver {
            store: self.store,
            catalog: self.catalog,
            attributes: self.attributes,
        }
    }
}

impl LineageResolver {
    pub fn builder(
        store: impl FeatureStore + 'static,
        catalog: impl ResourceCatalog + 'static,
    ) -> LineageResolverBuilder {
        LineageResolverBuilder::new(store, catalog)
    }

    pub fn attributes(&self) -> &AttributeDictionary {
        &self.attributes
    }

    /// Traces `feature_uri` of output `output_key` back through the steps of
    /// `execution`. Either the full provenance is returned or an error.
    pub fn resolve(
        &self,
        definition: &ProcessDefinition,
        execution: &ProcessExecutionRecord,
        output_key: &str,
        feature_id: &str,
        feature_uri: &str,
    ) -> Result<Provenance, LineageError> {
        let step = definition
            .step_by_resource_key(output_key)
            .ok_or_else(|| LineageError::OutputNotFound(output_key.to_string()))?;

        let mut walk = Walk {
            resolver: self,
            definition,
            execution,
            queries: Vec::new(),
            operations: Vec::new(),
        };
        walk.search(0, step, None, feature_uri)?;
        let Walk {
            queries,
            operations,
            ..
        } = walk;

        let features = if queries.is_empty() {
            None
        } else {
            Some(self.store.materialize_feature_collection(&queries)?)
        };
        debug!(
            output_key,
            feature_uri,
            queries = queries.len(),
            operations = operations.len(),
            "Resolved feature provenance"
        );

        Ok(Provenance {
            step_name: step.name.clone(),
            output_key: output_key.to_string(),
            feature_id: feature_id.to_string(),
            feature_uri: feature_uri.to_string(),
            features,
            operations,
            queries,
        })
    }
}

/// Where a step input reads its features from.
enum Source<'d> {
    Catalog(ResourceRecord),
    Step(&'d Step),
}

impl Source<'_> {
    fn name(&self) -> String {
        match self {
            Source::Catalog(resource) => resource.name.clone(),
            Source::Step(step) => step.name.clone(),
        }
    }
}

/// State of a single resolution: the graph being walked and what was found so far.
struct Walk<'r, 'd> {
    resolver: &'r LineageResolver,
    definition: &'d ProcessDefinition,
    execution: &'d ProcessExecutionRecord,
    queries: Vec<FeatureQuery>,
    operations: Vec<Operation>,
}

impl<'r, 'd> Walk<'r, 'd> {
    /// Visits `step` for `uri` at recursion depth `level`. `part_key` selects
    /// the output part; `None` means the tool's default part.
    fn search(
        &mut self,
        level: usize,
        step: &'d Step,
        part_key: Option<&str>,
        uri: &str,
    ) -> Result<(), LineageError> {
        debug!(level, step = %step.name, tool = %step.tool, uri, "Tracing lineage");

        if level > self.definition.steps().len() {
            return Err(LineageError::Cycle {
                step: step.name.clone(),
                level,
            });
        }
        if step.tool == Tool::Catalog {
            return Err(LineageError::UnsupportedTool(step.tool));
        }
        let record = self.step_record(step)?;
        if matches!(
            step.tool,
            Tool::Limes | Tool::ReverseTriplegeo | Tool::Register
        ) {
            return Ok(());
        }

        let part = part_key.or(step.tool.default_output_part());
        let file = record
            .file(StepFileRole::Output, part)
            .ok_or_else(|| LineageError::OutputFileNotFound {
                step_name: step.name.clone(),
                part: part.unwrap_or_default().to_string(),
            })?;
        let table = file.table_name.as_deref();
        if let Some(table) = table {
            self.queries
                .push(FeatureQuery::new(level, &step.name, table, uri));
        }

        match step.tool {
            Tool::Deer => self.enrichment(level, step, uri),
            Tool::Fagi => match table {
                Some(table) => self.fusion(level, step, table, uri),
                None => {
                    debug!(step = %step.name, "Fusion output has no table; nothing to trace");
                    Ok(())
                }
            },
            _ => Ok(()),
        }
    }

    fn enrichment(&mut self, level: usize, step: &'d Step, uri: &str) -> Result<(), LineageError> {
        let [input] = step.inputs.as_slice() else {
            return Err(arity(step, "exactly 1"));
        };

        let source = self.source(step, input)?;
        let input_name = source.name();
        match source {
            Source::Catalog(resource) => self.push_resource(level, &resource, uri),
            Source::Step(source_step) => {
                self.search(level + 1, source_step, input.part_key.as_deref(), uri)?
            }
        }

        self.operations.push(Operation::Enrich(EnrichOperation {
            level,
            tool: step.tool,
            step_name: step.name.clone(),
            input_name,
            uri: uri.to_string(),
        }));
        Ok(())
    }

    /// The third input of a fusion step, when present, is the link set and
    /// plays no part in lineage.
    fn fusion(
        &mut self,
        level: usize,
        step: &'d Step,
        table: &str,
        uri: &str,
    ) -> Result<(), LineageError> {
        if !(2..=3).contains(&step.inputs.len()) {
            return Err(arity(step, "2 or 3"));
        }
        let (left_input, right_input) = (&step.inputs[0], &step.inputs[1]);
        let left = self.source(step, left_input)?;
        let right = self.source(step, right_input)?;

        let resolver: &'r LineageResolver = self.resolver;
        let store = &resolver.store;
        let Some(link) = store.fetch_link(table, uri)? else {
            warn!(
                step = %step.name,
                uri,
                "No fusion link found; tracing both inputs without a fuse operation"
            );
            self.trace_sides([(left, left_input, uri), (right, right_input, uri)], level)?;
            return Ok(());
        };

        let actions = store
            .fetch_fusion_actions(table, link.id)?
            .into_iter()
            .map(|a| PropertyAction {
                property: resolver.attributes.label(&a.attribute).to_string(),
                operation: a.action,
                value: a.value,
            })
            .collect();
        let selected_uri = if link.left_uri == uri {
            &link.left_uri
        } else {
            &link.right_uri
        };
        let operation = FuseOperation {
            level,
            tool: step.tool,
            step_name: step.name.clone(),
            left_uri: link.left_uri.clone(),
            right_uri: link.right_uri.clone(),
            selected_uri: selected_uri.clone(),
            left_input: left.name(),
            right_input: right.name(),
            actions,
        };

        self.trace_sides(
            [
                (left, left_input, link.left_uri.as_str()),
                (right, right_input, link.right_uri.as_str()),
            ],
            level,
        )?;
        self.operations.push(Operation::Fuse(operation));
        Ok(())
    }

    /// Catalog sides are added as features first, then step sides are searched.
    fn trace_sides(
        &mut self,
        sides: [(Source<'d>, &'d StepInput, &str); 2],
        level: usize,
    ) -> Result<(), LineageError> {
        for (source, _, uri) in &sides {
            if let Source::Catalog(resource) = source {
                self.push_resource(level, resource, uri);
            }
        }
        for (source, input, uri) in sides {
            if let Source::Step(source_step) = source {
                self.search(level + 1, source_step, input.part_key.as_deref(), uri)?;
            }
        }
        Ok(())
    }

    fn source(&self, step: &Step, input: &StepInput) -> Result<Source<'d>, LineageError> {
        let definition: &'d ProcessDefinition = self.definition;
        if let Some(id) = definition.resource_identifier_by_resource_key(&input.input_key) {
            let resource = self
                .resolver
                .catalog
                .find_resource(id)?
                .ok_or(LineageError::ResourceNotFound(id))?;
            return Ok(Source::Catalog(resource));
        }
        definition
            .step_by_resource_key(&input.input_key)
            .map(Source::Step)
            .ok_or_else(|| LineageError::DanglingInput {
                step: step.name.clone(),
                input_key: input.input_key.clone(),
            })
    }

    fn push_resource(&mut self, level: usize, resource: &ResourceRecord, uri: &str) {
        if let Some(table) = &resource.table_name {
            self.queries
                .push(FeatureQuery::new(level, &resource.name, table, uri));
        }
    }

    fn step_record(&self, step: &Step) -> Result<&'d ProcessExecutionStepRecord, LineageError> {
        let execution: &'d ProcessExecutionRecord = self.execution;
        let record = execution
            .step(step.key)
            .ok_or_else(|| LineageError::StepRecordNotFound {
                execution_id: execution.id,
                step_key: step.key,
                step_name: step.name.clone(),
            })?;
        // The record must describe the same step, not just share its key.
        if record.tool != step.tool || record.name != step.name {
            return Err(LineageError::StepRecordMismatch {
                step_key: step.key,
                step_name: step.name.clone(),
                tool: step.tool,
                record_name: record.name.clone(),
                record_tool: record.tool,
            });
        }
        Ok(record)
    }
}

fn arity(step: &Step, expected: &'static str) -> LineageError {
    LineageError::InputArity {
        step: step.name.clone(),
        tool: step.tool,
        expected,
        found: step.inputs.len(),
    }
}
