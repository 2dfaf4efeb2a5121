use std::fs;
use std::path::Path;

use crate::error::LoadError;

/// Categories the tea-leaf model was trained on, in output order.
pub const DEFAULT_LABELS: [&str; 8] = [
    "Anthracnose",
    "algal leaf",
    "bird eye spot",
    "brown blight",
    "gray light",
    "healthy",
    "red leaf spot",
    "white spot",
];

/// Index-to-name mapping for the model's output vector.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSet {
    names: Vec<String>,
}

impl LabelSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LabelSet {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Read one label per line. Blank lines are skipped.
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path).map_err(|source| LoadError::Labels {
            path: path.to_path_buf(),
            source,
        })?;

        let labels = LabelSet::new(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty()),
        );

        if labels.is_empty() {
            return Err(LoadError::EmptyLabels(path.to_path_buf()));
        }

        Ok(labels)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Display name for a normalized identifier such as `bird_eye_spot`.
    pub fn by_identifier(&self, id: &str) -> Option<&str> {
        self.iter().find(|name| identifier(name) == id)
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        LabelSet::new(DEFAULT_LABELS.iter().copied())
    }
}

/// Lowercase the name and replace spaces with underscores.
pub fn identifier(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_set_has_the_trained_categories() {
        let labels = LabelSet::default();
        assert_eq!(labels.len(), 8);
        assert_eq!(labels.name(0), Some("Anthracnose"));
        assert_eq!(labels.name(5), Some("healthy"));
        assert_eq!(labels.name(8), None);
    }

    #[test]
    fn identifiers_are_lowercase_snake() {
        assert_eq!(identifier("Anthracnose"), "anthracnose");
        assert_eq!(identifier("bird eye spot"), "bird_eye_spot");
    }

    #[test]
    fn identifier_lookup_round_trips_every_label() {
        let labels = LabelSet::default();
        for (i, name) in labels.iter().enumerate() {
            let id = identifier(labels.name(i).unwrap());
            assert_eq!(labels.by_identifier(&id), Some(name));
        }
        assert_eq!(labels.by_identifier("not_a_disease"), None);
    }

    #[test]
    fn labels_file_skips_blank_lines() {
        let path = std::env::temp_dir().join(format!("leaf-labels-{}.txt", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "healthy\n\n  sick  \n").unwrap();
        drop(file);

        let labels = LabelSet::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(labels, LabelSet::new(vec!["healthy", "sick"]));
    }

    #[test]
    fn empty_labels_file_is_rejected() {
        let path = std::env::temp_dir().join(format!("leaf-empty-{}.txt", std::process::id()));
        std::fs::write(&path, "\n\n").unwrap();

        let err = LabelSet::from_file(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(err, LoadError::EmptyLabels(_)));
    }

    #[test]
    fn missing_labels_file_is_reported() {
        let err = LabelSet::from_file(Path::new("/nonexistent/labels.txt")).unwrap_err();
        assert!(matches!(err, LoadError::Labels { .. }));
    }
}
