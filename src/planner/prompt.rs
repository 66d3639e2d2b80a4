//! Prompt construction
//!
//! The prompt is fully determined by (question, descriptor, feedback), so
//! identical inputs send identical text to the model.

use crate::schema::SchemaDescriptor;

const INSTRUCTIONS: &str = "\
You translate questions about tabular datasets into a JSON query plan.
Reply with a single JSON object and nothing else.";

const GRAMMAR: &str = r#"Plan format:
{"dataset": "<base dataset>", "operations": [<operation>, ...]}

Operations, applied in order:
{"op": "filter", "column": "<col>", "comparator": "eq|ne|gt|gte|lt|lte|contains", "value": <json value>}
{"op": "aggregate", "column": "<col or * for count>", "function": "sum|avg|count|min|max", "group_by": "<col, optional>"}
{"op": "sort", "column": "<col>", "direction": "asc|desc"}
{"op": "limit", "n": <positive integer>}
{"op": "join", "left": "<base dataset>", "right": "<dataset>", "key": "<col present in both>"}
{"op": "ratio", "numerator": "<col>", "denominator": "<col>", "alias": "<new col>"}

Rules:
- At most one aggregate; only sort and limit may follow it.
- An aggregate outputs "<function>_<column>" (count of * is "count_all"), plus the group_by column.
- limit, if present, is the last operation.
- Filter values must match the column type: numbers for integer/decimal,
  "YYYY-MM-DD" strings for dates, true/false for booleans, strings for text.
- Joined columns whose name already exists are prefixed "<right dataset>."."#;

/// Builds the planning prompt
pub fn build_prompt(question: &str, descriptor: &SchemaDescriptor, feedback: Option<&str>) -> String {
    let mut prompt = String::with_capacity(
        INSTRUCTIONS.len() + GRAMMAR.len() + descriptor.text().len() + question.len() + 256,
    );
    prompt.push_str(INSTRUCTIONS);
    prompt.push_str("\n\n");
    prompt.push_str(GRAMMAR);
    prompt.push_str("\n\nDatasets:\n");
    prompt.push_str(descriptor.text());
    prompt.push_str("\nQuestion: ");
    prompt.push_str(question.trim());
    prompt.push('\n');

    if let Some(feedback) = feedback {
        prompt.push_str("\nYour previous reply was not usable: ");
        prompt.push_str(feedback);
        prompt.push_str("\nReply again with a corrected JSON plan.\n");
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, DatasetSet};
    use crate::schema::describe;

    fn descriptor() -> SchemaDescriptor {
        describe(&DatasetSet::new().with(Dataset::from_csv("sales", "region,sales\neast,10\n").unwrap()))
    }

    #[test]
    fn test_prompt_contains_schema_and_question() {
        let prompt = build_prompt("  total sales by region ", &descriptor(), None);
        assert!(prompt.contains("Dataset \"sales\""));
        assert!(prompt.contains("Question: total sales by region\n"));
        assert!(!prompt.contains("previous reply"));
    }

    #[test]
    fn test_feedback_appended() {
        let prompt = build_prompt("q", &descriptor(), Some("column 'revenue' does not exist"));
        assert!(prompt.ends_with("Reply again with a corrected JSON plan.\n"));
        assert!(prompt.contains("column 'revenue' does not exist"));
    }

    #[test]
    fn test_deterministic() {
        let d = descriptor();
        assert_eq!(build_prompt("q", &d, None), build_prompt("q", &d, None));
    }
}
