use once_cell::unsync::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{PatchError, Result};
use crate::invoice::locate::ElementIndex;
use crate::utils::dirs;

/// One invoice file. Content is read on first access and cached for the
/// lifetime of the instance; a patch pass replaces it wholesale.
#[derive(Debug)]
pub struct Document {
    path: PathBuf,
    content: OnceCell<String>,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content: OnceCell::new(),
        }
    }

    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let document = Self::new(path);
        document.content()?;
        Ok(document)
    }

    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: OnceCell::from(text.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> Result<&str> {
        self.content
            .get_or_try_init(|| {
                log::debug!("Reading {:?}", self.path);
                fs::read_to_string(&self.path).map_err(|source| PatchError::Read {
                    path: self.path.clone(),
                    source,
                })
            })
            .map(String::as_str)
    }

    pub fn set_content(&mut self, text: String) {
        self.content = OnceCell::from(text);
    }

    pub fn elements(&self) -> Result<ElementIndex> {
        ElementIndex::parse(self.content()?)
    }

    /// Writes the content verbatim to `output`, or next to the source file
    /// with `suffix` appended to its stem.
    pub fn write(&self, output: Option<&Path>, suffix: &str) -> Result<PathBuf> {
        let target = match output {
            Some(path) => path.to_path_buf(),
            None => dirs::derive_output_path(&self.path, suffix),
        };
        let content = self.content()?;

        dirs::ensure_parent_dir(&target)
            .and_then(|_| fs::write(&target, content))
            .map_err(|source| PatchError::Write {
                path: target.clone(),
                source,
            })?;

        log::info!("Wrote {:?}", target);
        Ok(target)
    }
}
