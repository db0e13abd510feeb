//! JSON report renderer

use super::Report;
use crate::LicompatResult;

/// Render a report as pretty-printed JSON
pub fn render(report: &Report) -> LicompatResult<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CompatEngine;

    #[test]
    fn test_verdicts_use_matrix_vocabulary() {
        let engine = CompatEngine::builtin().unwrap();
        let pair = engine.check_pair("MIT", "GPL-3.0-only").unwrap();
        let out = render(&Report::Pair(pair)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["verdict"], "No");
        assert_eq!(value["outbound"], "MIT");
    }

    #[test]
    fn test_tree_nodes_are_tagged() {
        let engine = CompatEngine::builtin().unwrap();
        let mut diag = engine.diagnostics();
        let evaluation = engine
            .evaluate("GPL-2.0-only", &["MIT OR Apache-2.0"], &mut diag)
            .unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&render(&Report::Evaluation(evaluation)).unwrap()).unwrap();
        assert_eq!(value["tree"]["type"], "operator");
        assert_eq!(value["tree"]["op"], "OR");
        assert_eq!(value["tree"]["operands"][0]["type"], "license");
    }
}
