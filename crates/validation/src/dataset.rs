use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_IMAGE_SUBDIR: &str = "images";
pub const DEFAULT_CLASS_NAME: &str = "T-Bank logo";
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid dataset descriptor {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Image directory {0} does not exist")]
    MissingImageDir(PathBuf),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Failed to list images: {0}")]
    Glob(#[from] glob::GlobError),
}

/// The dataset description handed to the evaluator, stored as YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    /// Absolute dataset root.
    pub path: PathBuf,
    /// Image directory relative to `path`.
    pub val: String,
    /// Number of classes.
    pub nc: usize,
    pub names: Vec<String>,
}

impl DatasetDescriptor {
    /// Single-class descriptor rooted at `root`, made absolute against the
    /// current directory.
    pub fn single_class(root: &Path) -> Result<Self, DatasetError> {
        let absolute = std::path::absolute(root).map_err(|source| DatasetError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        let path = normalize_lexically(&absolute);

        Ok(Self {
            path,
            val: DEFAULT_IMAGE_SUBDIR.to_string(),
            nc: 1,
            names: vec![DEFAULT_CLASS_NAME.to_string()],
        })
    }

    /// Write as YAML, replacing whatever was at `path`.
    pub fn write(&self, path: &Path) -> Result<(), DatasetError> {
        let yaml = serde_yaml::to_string(self).map_err(|source| DatasetError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;

        fs::write(path, yaml).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(path = %path.display(), "Wrote dataset descriptor");
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, DatasetError> {
        let text = fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_yaml::from_str(&text).map_err(|source| DatasetError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn image_dir(&self) -> PathBuf {
        self.path.join(&self.val)
    }

    /// Images under the image directory with a known extension, sorted.
    pub fn list_images(&self) -> Result<Vec<PathBuf>, DatasetError> {
        let dir = self.image_dir();
        if !dir.is_dir() {
            return Err(DatasetError::MissingImageDir(dir));
        }

        let pattern = format!("{}/**/*", glob::Pattern::escape(&dir.to_string_lossy()));

        let mut images = Vec::new();
        for entry in glob::glob(&pattern)? {
            let path = entry?;
            if path.is_file() && has_image_extension(&path) {
                images.push(path);
            }
        }
        images.sort();

        Ok(images)
    }

    /// YOLO convention: the last `images` component of the image directory
    /// becomes `labels`, so `<root>/images/a/b.jpg` is labelled by
    /// `<root>/labels/a/b.txt`. Without such a component labels sit next to images.
    pub fn label_path_for(&self, image: &Path) -> PathBuf {
        let image_dir = self.image_dir();

        let mut swapped = false;
        let mut components: Vec<_> = Path::new(&self.val)
            .components()
            .map(|c| c.as_os_str().to_os_string())
            .collect();
        if let Some(last) = components
            .iter_mut()
            .rev()
            .find(|c| c.as_os_str() == DEFAULT_IMAGE_SUBDIR)
        {
            *last = "labels".into();
            swapped = true;
        }

        let label_dir = if swapped {
            components
                .iter()
                .fold(self.path.clone(), |acc, c| acc.join(c))
        } else {
            image_dir.clone()
        };

        let relative = image
            .strip_prefix(&image_dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(image.file_name().unwrap_or_default()));

        label_dir.join(relative).with_extension("txt")
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Folds `.` and `..` components without touching the filesystem, so
/// symlinks are not resolved. `..` at the root stays at the root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    normalized.components().next_back(),
                    None | Some(Component::RootDir | Component::Prefix(_))
                ) {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_single_class_descriptor_is_absolute() {
        let descriptor = DatasetDescriptor::single_class(Path::new("../validation-dataset")).unwrap();
        assert!(descriptor.path.is_absolute());
        assert_eq!(descriptor.val, "images");
        assert_eq!(descriptor.nc, 1);
        assert_eq!(descriptor.names, vec!["T-Bank logo".to_string()]);
    }

    #[test]
    fn test_single_class_folds_parent_components() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("crates").join("validation");
        let relative = nested.join("..").join(".").join("..").join("validation-dataset");

        let descriptor = DatasetDescriptor::single_class(&relative).unwrap();

        assert_eq!(descriptor.path, dir.path().join("validation-dataset"));
        assert!(
            descriptor
                .path
                .components()
                .all(|c| !matches!(c, Component::ParentDir | Component::CurDir))
        );
    }

    #[test]
    fn test_normalize_lexically_stops_at_root() {
        assert_eq!(
            normalize_lexically(Path::new("/../a/./b/../c")),
            PathBuf::from("/a/c")
        );
    }

    #[test]
    fn test_write_overwrites_and_reads_back() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("validate_config.yaml");
        fs::write(&config_path, "stale: true\nmore: [1, 2, 3]\n").unwrap();

        let descriptor = DatasetDescriptor::single_class(dir.path()).unwrap();
        descriptor.write(&config_path).unwrap();

        let text = fs::read_to_string(&config_path).unwrap();
        assert!(!text.contains("stale"));
        assert!(text.contains("val: images"));
        assert!(text.contains("nc: 1"));
        assert!(text.contains("T-Bank logo"));

        assert_eq!(DatasetDescriptor::read(&config_path).unwrap(), descriptor);
    }

    #[test]
    fn test_read_rejects_malformed_yaml() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("broken.yaml");
        fs::write(&config_path, "path: [unclosed").unwrap();

        let err = DatasetDescriptor::read(&config_path).unwrap_err();
        assert!(matches!(err, DatasetError::Yaml { .. }));
    }

    #[test]
    fn test_list_images_filters_extensions() {
        let dir = tempdir().unwrap();
        let images = dir.path().join("images");
        fs::create_dir_all(images.join("nested")).unwrap();
        fs::write(images.join("b.JPG"), b"").unwrap();
        fs::write(images.join("a.png"), b"").unwrap();
        fs::write(images.join("nested").join("c.webp"), b"").unwrap();
        fs::write(images.join("notes.txt"), b"").unwrap();

        let descriptor = DatasetDescriptor::single_class(dir.path()).unwrap();
        let listed = descriptor.list_images().unwrap();

        let names: Vec<_> = listed
            .iter()
            .map(|p| p.strip_prefix(&images).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.png"),
                PathBuf::from("b.JPG"),
                PathBuf::from("nested/c.webp"),
            ]
        );
    }

    #[test]
    fn test_missing_image_dir() {
        let dir = tempdir().unwrap();
        let descriptor = DatasetDescriptor::single_class(dir.path()).unwrap();
        assert!(matches!(
            descriptor.list_images(),
            Err(DatasetError::MissingImageDir(_))
        ));
    }

    #[test]
    fn test_label_path_without_images_component() {
        let descriptor = DatasetDescriptor {
            path: PathBuf::from("/data"),
            val: "val".to_string(),
            nc: 1,
            names: vec![DEFAULT_CLASS_NAME.to_string()],
        };

        assert_eq!(
            descriptor.label_path_for(Path::new("/data/val/001.png")),
            PathBuf::from("/data/val/001.txt")
        );
    }

    #[test]
    fn test_label_path_follows_yolo_layout() {
        let descriptor = DatasetDescriptor {
            path: PathBuf::from("/data/val"),
            val: "images".to_string(),
            nc: 1,
            names: vec![DEFAULT_CLASS_NAME.to_string()],
        };

        assert_eq!(
            descriptor.label_path_for(Path::new("/data/val/images/shop/001.jpg")),
            PathBuf::from("/data/val/labels/shop/001.txt")
        );
    }
}
