use super::{EnrichOperation, FuseOperation, Operation, PropertyAction, Provenance};
use crate::store::FeatureQuery;

/// Formats provenance into a human-readable report.
pub struct ProvenanceFormatter;

impl ProvenanceFormatter {
    /// Renders the operations and source features of `provenance`, each
    /// line indented by the depth at which it was found.
    pub fn format(provenance: &Provenance) -> String {
        let mut lines = vec![format!(
            "Provenance of <{}> in output '{}' of step '{}'",
            provenance.feature_uri, provenance.output_key, provenance.step_name
        )];

        if provenance.operations.is_empty() {
            lines.push("Operations: none".to_string());
        } else {
            lines.push("Operations:".to_string());
            // Operations are collected innermost first; report them outermost first.
            let mut operations: Vec<&Operation> = provenance.operations.iter().collect();
            operations.sort_by_key(|op| op.level());
            for op in operations {
                Self::format_operation(op, &mut lines);
            }
        }

        if provenance.queries.is_empty() {
            lines.push("Sources: none".to_string());
        } else {
            lines.push("Sources:".to_string());
            lines.extend(provenance.queries.iter().map(Self::format_query));
        }

        lines.join("\n")
    }

    fn format_operation(operation: &Operation, lines: &mut Vec<String>) {
        let indent = Self::indent(operation.level());
        match operation {
            Operation::Enrich(EnrichOperation {
                tool,
                step_name,
                input_name,
                uri,
                ..
            }) => {
                lines.push(format!(
                    "{indent}{tool} '{step_name}' enriched <{uri}> from '{input_name}'"
                ));
            }
            Operation::Fuse(FuseOperation {
                tool,
                step_name,
                left_uri,
                right_uri,
                selected_uri,
                left_input,
                right_input,
                actions,
                ..
            }) => {
                lines.push(format!(
                    "{indent}{tool} '{step_name}' fused <{left_uri}> ('{left_input}') with <{right_uri}> ('{right_input}'), selected <{selected_uri}>"
                ));
                lines.extend(
                    actions
                        .iter()
                        .map(|a| format!("{indent}    {}", Self::format_action(a))),
                );
            }
        }
    }

    fn format_action(action: &PropertyAction) -> String {
        match &action.value {
            Some(value) => format!("{}: {} = \"{}\"", action.property, action.operation, value),
            None => format!("{}: {} = null", action.property, action.operation),
        }
    }

    fn format_query(query: &FeatureQuery) -> String {
        format!(
            "{}'{}' <{}> from table {}",
            Self::indent(query.level),
            query.source,
            query.feature_uri,
            query.table_name
        )
    }

    fn indent(level: usize) -> String {
        "  ".repeat(level + 1)
    }
}
