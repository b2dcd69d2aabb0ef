//! build configuration
//!
//! All parameters of a run. They can be read from a YAML or JSON file (keys in camelCase) and are then adjusted by
//! command line flags.
//!
//! ```yaml
//! encoding: ISO-8859-1
//! sourceDirectories: [src/main/resources]
//! outputDirectory: target/classes
//! includes: ["**/*.properties"]
//! excludes: ["**/secret*"]
//! properties:
//!   greeting: hello
//! propertiesFile: build.properties
//! includeSystemProperties: false
//! project:
//!   name: demo
//!   version: 1.0.0
//! ```
use crate::discovery::CandidateFiles;
use crate::encoding::Encoding;
use crate::properties::{
    ConfigurationError, Properties, PropertiesFile, PropertyStore, ProjectProperties,
    SystemProperties,
};
use crate::rewrite::{FileRewriter, LineEnding, ResourceFile, ScratchLocation};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct BuildConfig {
    pub encoding: Option<String>,
    pub source_directories: Vec<PathBuf>,
    pub output_directory: Option<PathBuf>,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub properties: IndexMap<String, String>,
    pub properties_file: Option<PathBuf>,
    pub include_project_properties: bool,
    pub include_system_properties: bool,
    pub project: ProjectConfig,
    pub line_ending: LineEnding,
    pub scratch_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub name: Option<String>,
    pub version: Option<String>,
    pub properties: IndexMap<String, String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            encoding: None,
            source_directories: vec![],
            output_directory: None,
            includes: vec![],
            excludes: vec![],
            properties: Default::default(),
            properties_file: None,
            include_project_properties: true,
            include_system_properties: true,
            project: Default::default(),
            line_ending: Default::default(),
            scratch_directory: None,
        }
    }
}

impl BuildConfig {
    /// Read a configuration file, `.json` is parsed as JSON, everything else as YAML
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        tracing::info!(path=%path.display(), "loading build configuration");

        let text = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Unreadable {
            path: path.to_owned(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            serde_json::from_str(&text).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&text).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| ConfigurationError::Invalid {
            path: path.to_owned(),
            message,
        })
    }

    pub fn encoding(&self) -> Result<Encoding, ConfigurationError> {
        match &self.encoding {
            Some(name) => Ok(name.parse()?),
            None => Ok(Encoding::default()),
        }
    }

    /// Layers in precedence order: system, project, inline, file
    pub fn property_store(&self) -> Result<PropertyStore, ConfigurationError> {
        let project = ProjectProperties::new(
            self.project.name.clone(),
            self.project.version.clone(),
            self.project.properties.clone().into_iter().collect(),
        );
        let inline: Properties = self.properties.clone().into_iter().collect();

        let mut store = PropertyStore::default()
            .layer("system", self.include_system_properties, SystemProperties)
            .layer("project", self.include_project_properties, project)
            .layer("inline", true, inline);

        if let Some(path) = &self.properties_file {
            store = store.layer("file", true, PropertiesFile::new(path.clone(), self.encoding()?));
        }

        Ok(store)
    }

    pub fn rewriter(&self) -> FileRewriter {
        let scratch = match &self.scratch_directory {
            Some(directory) => ScratchLocation::Directory(directory.clone()),
            None => ScratchLocation::Sibling,
        };
        FileRewriter::new(self.line_ending, scratch)
    }

    /// Candidate files of all source directories, in order
    ///
    /// Without source directories the output directory is scanned on its own.
    pub fn resource_files(&self, output_directory: &Path) -> Result<Vec<ResourceFile>, anyhow::Error> {
        let encoding = self.encoding()?;
        let candidates = CandidateFiles::new(&self.includes, &self.excludes)?;

        let sources = if self.source_directories.is_empty() {
            vec![output_directory.to_owned()]
        } else {
            self.source_directories.clone()
        };

        let mut files = vec![];
        for source in &sources {
            for path in candidates.scan(source, output_directory)? {
                if !files.iter().any(|f: &ResourceFile| f.path == path) {
                    files.push(ResourceFile::new(path, encoding));
                }
            }
        }

        Ok(files)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::resolver::resolve;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = BuildConfig::default();
        assert!(config.include_project_properties);
        assert!(config.include_system_properties);
        assert_eq!(config.encoding().unwrap(), Encoding::Utf8);
    }

    #[test]
    fn yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("propsub.yaml");
        std::fs::write(
            &path,
            "encoding: latin1\nincludeSystemProperties: false\nproperties:\n  k: inline\nproject:\n  name: demo\n  properties:\n    k: proj\nlineEnding: crlf\n",
        )
        .unwrap();

        let config = BuildConfig::load(&path).unwrap();
        assert_eq!(config.encoding().unwrap(), Encoding::Latin1);
        assert!(!config.include_system_properties);
        assert!(config.include_project_properties);
        assert_eq!(config.line_ending, LineEnding::Crlf);

        let properties = config.property_store().unwrap().build().unwrap();
        assert_eq!(resolve(&properties, "${k}").resolved, "inline");
        assert_eq!(properties.get("project.name"), Some("demo"));
        assert_eq!(properties.get("os.name"), None);
    }

    #[test]
    fn json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("propsub.json");
        std::fs::write(&path, r#"{"includes": ["*.txt"], "includeProjectProperties": false}"#)
            .unwrap();

        let config = BuildConfig::load(&path).unwrap();
        assert_eq!(config.includes, vec!["*.txt".to_string()]);
        assert!(!config.include_project_properties);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("propsub.yaml");
        std::fs::write(&path, "propertiesFiel: typo.properties\n").unwrap();

        assert!(matches!(
            BuildConfig::load(&path),
            Err(ConfigurationError::Invalid { .. })
        ));
    }

    #[test]
    fn unsupported_encoding() {
        let config = BuildConfig {
            encoding: Some("EBCDIC".into()),
            ..Default::default()
        };
        assert!(matches!(
            config.encoding(),
            Err(ConfigurationError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn properties_file_overrides_inline() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("build.properties");
        std::fs::write(&file, "k=file\n").unwrap();

        let config = BuildConfig {
            properties: [("k".to_string(), "inline".to_string())].into_iter().collect(),
            properties_file: Some(file),
            include_system_properties: false,
            ..Default::default()
        };

        let properties = config.property_store().unwrap().build().unwrap();
        assert_eq!(properties.get("k"), Some("file"));
    }

    #[test]
    fn resource_files_from_source_directories() {
        let source = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        for name in ["a.txt", "b.xml"] {
            std::fs::write(source.path().join(name), "").unwrap();
            std::fs::write(output.path().join(name), "").unwrap();
        }

        let config = BuildConfig {
            source_directories: vec![source.path().into(), source.path().into()],
            includes: vec!["*.txt".into()],
            ..Default::default()
        };

        let files = config.resource_files(output.path()).unwrap();
        assert_eq!(
            files,
            vec![ResourceFile::new(output.path().join("a.txt"), Encoding::Utf8)]
        );
    }
}
