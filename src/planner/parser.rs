//! Model reply parsing
//!
//! Models wrap JSON in prose or markdown fences. The plan is taken from a
//! fenced block if there is one, else from the outermost braces.

use serde::Deserialize;

use crate::schema::SchemaDescriptor;

use super::ast::{Operation, QueryPlan};

#[derive(Deserialize)]
struct RawPlan {
    #[serde(default)]
    dataset: Option<String>,
    operations: Vec<Operation>,
}

/// Extracts the JSON payload from a model reply
pub fn extract_json(reply: &str) -> Option<&str> {
    let trimmed = reply.trim();

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        // Skip a language tag such as ```json
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            let inner = body[..end].trim();
            if !inner.is_empty() {
                return Some(inner);
            }
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

/// Parses a reply into a plan. Errors are phrased for feeding back to the model.
pub fn parse_plan(reply: &str, descriptor: &SchemaDescriptor) -> Result<QueryPlan, String> {
    let json = extract_json(reply).ok_or_else(|| "no JSON object found in the reply".to_string())?;
    let raw: RawPlan =
        serde_json::from_str(json).map_err(|e| format!("invalid plan JSON: {}", e))?;

    let dataset = match raw.dataset {
        Some(d) => d,
        None => descriptor
            .sole_dataset()
            .map(|d| d.name.clone())
            .ok_or_else(|| "the plan must name its \"dataset\"".to_string())?,
    };

    Ok(QueryPlan {
        dataset,
        operations: raw.operations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, DatasetSet};
    use crate::planner::ast::AggregateFunction;
    use crate::schema::describe;

    fn one() -> SchemaDescriptor {
        describe(&DatasetSet::new().with(Dataset::from_csv("sales", "region,sales\neast,10\n").unwrap()))
    }

    fn two() -> SchemaDescriptor {
        describe(
            &DatasetSet::new()
                .with(Dataset::from_csv("sales", "region,sales\neast,10\n").unwrap())
                .with(Dataset::from_csv("accounts", "id\n1\n").unwrap()),
        )
    }

    #[test]
    fn test_extract_from_fence() {
        let reply = "Here you go:\n```json\n{\"a\": 1}\n```\nHope that helps.";
        assert_eq!(extract_json(reply), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_extract_from_prose() {
        assert_eq!(extract_json("Sure! {\"a\": {\"b\": 2}} done"), Some("{\"a\": {\"b\": 2}}"));
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn test_dataset_defaults_when_single() {
        let reply = r#"{"operations":[{"op":"aggregate","column":"sales","function":"sum","group_by":"region"}]}"#;
        let plan = parse_plan(reply, &one()).unwrap();
        assert_eq!(plan.dataset, "sales");
        assert_eq!(
            plan.operations,
            vec![Operation::aggregate("sales", AggregateFunction::Sum, Some("region"))]
        );
        assert!(parse_plan(reply, &two()).unwrap_err().contains("dataset"));
    }

    #[test]
    fn test_bad_json_reports_reason() {
        let err = parse_plan("{\"operations\": [{\"op\": \"explode\"}]}", &one()).unwrap_err();
        assert!(err.starts_with("invalid plan JSON"));
    }
}
