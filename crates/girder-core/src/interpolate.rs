//! Recursive `${key}` token interpolation.
//!
//! Unknown keys are left unexpanded and reported as warnings so partially
//! templated text stays usable; a key re-entered within its own expansion
//! chain is a hard error.

use std::collections::BTreeMap;

use girder_util::errors::GirderError;

/// Expansion passes allowed before a chain is treated as cyclic.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// The outcome of an interpolation: the expanded text plus every token
/// whose key had no value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Interpolated {
    pub text: String,
    pub unresolved: Vec<String>,
}

/// Expand `${key}` tokens in `text` against `properties`.
///
/// Values may themselves contain tokens, expanded up to `max_depth` levels.
pub fn interpolate(
    text: &str,
    properties: &BTreeMap<String, String>,
    max_depth: usize,
) -> Result<Interpolated, GirderError> {
    let mut unresolved = Vec::new();
    let expanded = expand(text, properties, &mut Vec::new(), max_depth, &mut unresolved)?;
    Ok(Interpolated {
        text: expanded,
        unresolved,
    })
}

fn expand(
    text: &str,
    properties: &BTreeMap<String, String>,
    chain: &mut Vec<String>,
    depth_left: usize,
    unresolved: &mut Vec<String>,
) -> Result<String, GirderError> {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("${") {
        let tail = &rest[start + 2..];
        let Some(end) = tail.find('}') else {
            // Unterminated token; keep the remainder as-is
            break;
        };
        let key = &tail[..end];
        result.push_str(&rest[..start]);

        match properties.get(key) {
            Some(value) => {
                if chain.iter().any(|seen| seen == key) {
                    return Err(GirderError::InterpolationCycle {
                        token: key.to_string(),
                        chain: chain.join(" -> "),
                    });
                }
                if depth_left == 0 {
                    return Err(GirderError::InterpolationCycle {
                        token: key.to_string(),
                        chain: format!("{} (expansion depth exceeded)", chain.join(" -> ")),
                    });
                }
                chain.push(key.to_string());
                let expanded = expand(value, properties, chain, depth_left - 1, unresolved)?;
                chain.pop();
                result.push_str(&expanded);
            }
            None => {
                // Tolerant: leave the token in place and flag it
                if !unresolved.iter().any(|k| k == key) {
                    unresolved.push(key.to_string());
                }
                result.push_str("${");
                result.push_str(key);
                result.push('}');
            }
        }
        rest = &tail[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}
