use super::category_spec::CategorySpec;
use log::debug;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("Categories for model {0} not found.")]
    NotFound(String),
    #[error("failed to read categories for model {model}: {source}")]
    Io {
        model: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed categories for model {model}: {source}")]
    Malformed {
        model: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Directory of `<model_name>.json` category vocabularies.
#[derive(Debug, Clone)]
pub struct CategoryStore {
    dir: PathBuf,
}

impl CategoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn load(&self, model_name: &str) -> Result<CategorySpec, CategoryError> {
        // names never address anything outside the store
        if model_name.is_empty()
            || model_name.contains(['/', '\\'])
            || model_name.contains("..")
        {
            return Err(CategoryError::NotFound(model_name.to_string()));
        }

        let path = self.dir.join(format!("{model_name}.json"));
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CategoryError::NotFound(model_name.to_string()))
            }
            Err(source) => {
                return Err(CategoryError::Io {
                    model: model_name.to_string(),
                    source,
                })
            }
        };
        debug!("reading categories from {:?}", path);

        serde_json::from_reader(BufReader::new(file)).map_err(|source| CategoryError::Malformed {
            model: model_name.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, CategoryStore) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let store = CategoryStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn loads_spec_by_model_name() {
        let (_dir, store) = store_with(&[(
            "mic_classification_best.json",
            r#"{"Species": ["Escherichia coli"], "Antibiotic": ["Amikacin"]}"#,
        )]);
        let spec = store.load("mic_classification_best").unwrap();
        assert_eq!(spec.column_names(), vec!["Species", "Antibiotic"]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let (_dir, store) = store_with(&[]);
        assert!(matches!(
            store.load("rf_8_panel_enterobac_100"),
            Err(CategoryError::NotFound(name)) if name == "rf_8_panel_enterobac_100"
        ));
    }

    #[test]
    fn path_like_names_are_not_found() {
        let (_dir, store) = store_with(&[("secret.json", "{}")]);
        assert!(matches!(store.load("../secret"), Err(CategoryError::NotFound(_))));
        assert!(matches!(store.load("a/b"), Err(CategoryError::NotFound(_))));
        assert!(matches!(store.load(""), Err(CategoryError::NotFound(_))));
    }

    #[test]
    fn malformed_file_is_reported() {
        let (_dir, store) = store_with(&[("broken.json", "[1, 2")]);
        assert!(matches!(
            store.load("broken"),
            Err(CategoryError::Malformed { .. })
        ));
    }
}
