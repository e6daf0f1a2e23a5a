use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rendering configuration shared by layout and SVG emission.
///
/// Layout itself works on an integer grid; the values here control how grid
/// units map to device pixels and how text is styled/measured. Defaults are
/// usable as-is; user overrides deep-merge onto them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RailcarConfig {
    /// Device pixels per grid unit.
    pub scale: f64,
    pub font_family: String,
    /// Font size (px) for terminal/nonterminal box labels.
    pub font_size: f64,
    /// Font size (px) for per-rule headings.
    pub heading_font_size: f64,
    /// Font size (px) for the diagram title.
    pub title_font_size: f64,
    /// Corner radius (px) of terminal/nonterminal boxes.
    pub corner_radius: f64,
    /// Vertical gap between stacked rule diagrams, in grid units.
    pub rule_gap: u32,
}

impl Default for RailcarConfig {
    fn default() -> Self {
        Self {
            scale: 16.0,
            font_family: "ui-monospace, SFMono-Regular, Menlo, monospace".to_string(),
            font_size: 15.0,
            heading_font_size: 17.0,
            title_font_size: 20.0,
            corner_radius: 6.0,
            rule_gap: 3,
        }
    }
}

impl RailcarConfig {
    /// Applies JSON overrides on top of `self`, object-by-object.
    ///
    /// Unknown keys are rejected rather than silently dropped, so a typo'd
    /// override fails loudly.
    pub fn deep_merge(&mut self, overrides: &Value) -> Result<()> {
        let mut base = serde_json::to_value(&*self).map_err(|e| Error::InvalidConfig {
            message: e.to_string(),
        })?;
        merge_value(&mut base, overrides);
        let merged: RailcarConfig =
            serde_json::from_value(base).map_err(|e| Error::InvalidConfig {
                message: e.to_string(),
            })?;
        if let Value::Object(map) = overrides {
            let known = serde_json::to_value(&merged).map_err(|e| Error::InvalidConfig {
                message: e.to_string(),
            })?;
            for key in map.keys() {
                if known.get(key).is_none() {
                    return Err(Error::InvalidConfig {
                        message: format!("unknown config key `{key}`"),
                    });
                }
            }
        }
        if merged.scale <= 0.0 {
            return Err(Error::InvalidConfig {
                message: "scale must be positive".to_string(),
            });
        }
        *self = merged;
        Ok(())
    }
}

fn merge_value(base: &mut Value, overrides: &Value) {
    match (base, overrides) {
        (Value::Object(base_map), Value::Object(over_map)) => {
            for (k, v) in over_map {
                match base_map.get_mut(k) {
                    Some(slot) => merge_value(slot, v),
                    None => {
                        base_map.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (slot, v) => *slot = v.clone(),
    }
}
