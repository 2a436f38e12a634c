//! Structural contract checks.
//!
//! Each predicate inspects only the presence and type of required slots. No
//! check depends on how the candidate was authored (class, instance or plain
//! object), so any value with the right capabilities is accepted.

use super::types::ComponentKind;
use super::value::Object;

/// Tool contract: string `name`, optional string `description`, object
/// `inputSchema` (or legacy `parameters`), callable `execute`.
pub fn validate_tool(candidate: &Object) -> bool {
    let has_name = candidate.get_str("name").is_some();
    let description_ok = candidate
        .get("description")
        .is_none_or(|d| d.as_str().is_some());
    let has_schema = candidate
        .get("inputSchema")
        .or_else(|| candidate.get("parameters"))
        .is_some_and(|s| s.is_object_like());
    let has_execute = candidate.get_callable("execute").is_some();

    has_name && description_ok && has_schema && has_execute
}

/// Resource contract: string `uri`, string `name`, `content` that is a string
/// or a callable.
pub fn validate_resource(candidate: &Object) -> bool {
    let has_uri = candidate.get_str("uri").is_some();
    let has_name = candidate.get_str("name").is_some();
    let content_ok = candidate
        .get("content")
        .is_some_and(|c| c.as_str().is_some() || c.is_callable());

    has_uri && has_name && content_ok
}

/// Prompt contract: string `name`, callable `getMessages`.
pub fn validate_prompt(candidate: &Object) -> bool {
    candidate.get_str("name").is_some() && candidate.get_callable("getMessages").is_some()
}

/// Every kind whose contract the candidate satisfies
pub fn matching_kinds(candidate: &Object) -> Vec<ComponentKind> {
    ComponentKind::ALL
        .into_iter()
        .filter(|kind| kind.validate(candidate))
        .collect()
}
