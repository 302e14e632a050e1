//! Entry points for loading `AnchorviewConfig`.

use super::merge::merge_policy;
use super::sources::{environment, global_file, project_file};
use super::AnchorviewConfig;
use crate::error::ContextError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load every layer for a project rooted at `project_root`.
    pub fn load(project_root: &Path) -> Result<AnchorviewConfig, ContextError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = project_file::add_to_builder(builder, project_root)?;
        let builder = environment::add_to_builder(builder);

        let config: AnchorviewConfig = builder.build()?.try_deserialize()?;
        debug!(
            project_root = %project_root.display(),
            index = %config.search.index,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Load defaults plus a single explicit file; the file must exist.
    pub fn load_from_file(path: &Path) -> Result<AnchorviewConfig, ContextError> {
        let config = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    /// Built-in defaults only.
    pub fn defaults() -> AnchorviewConfig {
        AnchorviewConfig::default()
    }
}
