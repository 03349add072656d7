//! The meta-planner: decides which registered tools, if any, a query
//! needs before composition, behind `features.meta_plan`. A
//! name-matching heuristic rather than a planning model — it only has
//! to pick tool *names* the registry
//! already knows about.

/// Tool name markers the planner recognizes. Real tool names are
/// matched by substring against the query; this is intentionally coarse
/// since `ToolRegistry::invoke` rejects unknown names harmlessly.
const TOOL_MARKERS: [(&str, &str); 2] = [
    ("calculate", "calculator"),
    ("convert", "unit_converter"),
];

#[must_use]
pub fn plan_tool_calls(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    TOOL_MARKERS
        .iter()
        .filter(|(marker, _)| lower.contains(marker))
        .map(|(_, tool)| (*tool).to_string())
        .collect()
}
