//! Material class catalogue.

use crate::core::constants::{MAX_CLASSES, NODATA_LABEL};
use crate::core::errors::{MaterialError, MaterialResult};

/// Default classes, in model output order, with preview colours.
const DEFAULT_CLASSES: [(&str, [u8; 3]); 12] = [
    ("Unclassified", [0, 0, 0]),
    ("Asphalt", [110, 110, 110]),
    ("Concrete", [200, 200, 190]),
    ("Glass", [120, 200, 255]),
    ("Tree", [20, 120, 30]),
    ("Non_Tree_Vegetation", [140, 210, 60]),
    ("Metal", [180, 80, 200]),
    ("Red_Ceramic", [200, 60, 40]),
    ("Soil", [150, 100, 50]),
    ("Solar_Panel", [30, 30, 140]),
    ("Water", [30, 90, 220]),
    ("Polymer", [250, 220, 40]),
];

/// Colour used for pixels without a label.
pub const NODATA_COLOR: [u8; 3] = [255, 255, 255];

/// Ordered class names and their display colours.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialClasses {
    names: Vec<String>,
    colors: Vec<[u8; 3]>,
}

impl Default for MaterialClasses {
    fn default() -> Self {
        Self {
            names: DEFAULT_CLASSES.iter().map(|(n, _)| n.to_string()).collect(),
            colors: DEFAULT_CLASSES.iter().map(|(_, c)| *c).collect(),
        }
    }
}

impl MaterialClasses {
    /// Custom class names. Colours come from the default palette, then from a
    /// deterministic hash of the class index.
    pub fn from_names(names: Vec<String>) -> MaterialResult<Self> {
        if names.is_empty() || names.len() > MAX_CLASSES {
            return Err(MaterialError::config_error(format!(
                "class list must hold between 1 and {MAX_CLASSES} names, got {}",
                names.len()
            )));
        }
        let colors = (0..names.len())
            .map(|i| {
                DEFAULT_CLASSES
                    .get(i)
                    .map(|(_, c)| *c)
                    .unwrap_or_else(|| generated_color(i))
            })
            .collect();
        Ok(Self { names, colors })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Name of a label, `None` for [`NODATA_LABEL`] or out-of-range labels.
    pub fn name(&self, label: u8) -> Option<&str> {
        if label == NODATA_LABEL {
            return None;
        }
        self.names.get(label as usize).map(String::as_str)
    }

    /// Preview colour of a label.
    pub fn color(&self, label: u8) -> [u8; 3] {
        self.colors
            .get(label as usize)
            .copied()
            .filter(|_| label != NODATA_LABEL)
            .unwrap_or(NODATA_COLOR)
    }
}

fn generated_color(index: usize) -> [u8; 3] {
    let h = (index as u32).wrapping_mul(2_654_435_761);
    [(h >> 24) as u8, (h >> 16) as u8, (h >> 8) as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalogue() {
        let classes = MaterialClasses::default();
        assert_eq!(classes.len(), 12);
        assert_eq!(classes.name(1), Some("Asphalt"));
        assert_eq!(classes.name(NODATA_LABEL), None);
        assert_eq!(classes.color(NODATA_LABEL), NODATA_COLOR);
        assert_eq!(classes.color(4), [20, 120, 30]);
    }

    #[test]
    fn test_custom_names() {
        let names: Vec<String> = (0..14).map(|i| format!("class_{i}")).collect();
        let classes = MaterialClasses::from_names(names).unwrap();
        assert_eq!(classes.len(), 14);
        assert_eq!(classes.color(13), generated_color(13));
        assert!(MaterialClasses::from_names(Vec::new()).is_err());
    }
}
