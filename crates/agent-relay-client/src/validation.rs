//! Descriptor sanity checks.
//!
//! Problems found here are reported to the user but never block a
//! connection; schema failures are caught earlier, at parse time.

use agent_relay_core::CapabilityDescriptor;
use url::Url;

/// List the problems in a resolved descriptor. Empty means none found.
#[must_use]
pub fn validate_descriptor(card: &CapabilityDescriptor) -> Vec<String> {
    let mut problems = Vec::new();

    for (field, value) in [
        ("name", &card.name),
        ("description", &card.description),
        ("version", &card.version),
    ] {
        if value.trim().is_empty() {
            problems.push(format!("Field '{field}' must not be empty."));
        }
    }

    match Url::parse(&card.url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => problems.push(format!(
            "Field 'url' must use http or https, got '{}'.",
            url.scheme()
        )),
        Err(_) => problems.push(format!(
            "Field 'url' must be an absolute URL, got '{}'.",
            card.url
        )),
    }

    if card.default_input_modes.is_empty() {
        problems.push("Field 'defaultInputModes' must list at least one mode.".to_owned());
    }
    if card.default_output_modes.is_empty() {
        problems.push("Field 'defaultOutputModes' must list at least one mode.".to_owned());
    }

    if card.skills.is_empty() {
        problems.push("Field 'skills' should declare at least one skill.".to_owned());
    }
    for (index, skill) in card.skills.iter().enumerate() {
        if skill.id.trim().is_empty() {
            problems.push(format!("Skill at index {index} has an empty 'id'."));
        }
        if skill.name.trim().is_empty() {
            problems.push(format!("Skill at index {index} has an empty 'name'."));
        }
    }

    problems
}
