//! Loading trained models from a folder on disk.
//!
//! A model folder holds one or more serialized bundles plus an optional
//! `model_info.json` sidecar. When no explicit file name is given the
//! folder is scanned and the artifact is picked by extension.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::model_info::{ModelInfo, MODEL_INFO_FILENAME};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::gbdt::GbdtBundle;

/// File extension of serialized model bundles.
pub const MODEL_EXTENSION: &str = "gbdt";

/// Load a trained model and its optional metadata from `folder`.
///
/// With `model_name` given the named file is loaded as-is. Otherwise the
/// folder is scanned for `.gbdt` artifacts; when several are present the
/// lexicographically first is used with a warning.
///
/// A missing `model_info.json` is tolerated with a warning. An unreadable
/// or unparsable one is an error.
pub fn load_model_from_folder(
    folder: &Path,
    model_name: Option<&str>,
) -> Result<(Box<dyn ClassifierModel>, Option<ModelInfo>)> {
    if !folder.is_dir() {
        bail!("model folder {} does not exist", folder.display());
    }

    let artifact = match model_name {
        Some(name) => {
            let path = folder.join(name);
            if !path.is_file() {
                bail!("model file {} not found", path.display());
            }
            path
        }
        None => find_model_artifact(folder)?,
    };

    let text = fs::read_to_string(&artifact)
        .with_context(|| format!("failed to read model from {}", artifact.display()))?;
    let bundle = GbdtBundle::from_json(&text)
        .with_context(|| format!("failed to load model from {}", artifact.display()))?;

    let sidecar = folder.join(MODEL_INFO_FILENAME);
    let model_info = if sidecar.is_file() {
        Some(ModelInfo::from_file(&sidecar)?)
    } else {
        log::warn!(
            "no '{}' file found in {}; metadata checks will be skipped",
            MODEL_INFO_FILENAME,
            folder.display()
        );
        None
    };

    Ok((Box::new(bundle), model_info))
}

fn find_model_artifact(folder: &Path) -> Result<PathBuf> {
    let entries = fs::read_dir(folder)
        .with_context(|| format!("failed to read model folder {}", folder.display()))?;

    let mut candidates: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to read model folder {}", folder.display()))?
            .path();
        let matches = path
            .extension()
            .map(|ext| ext == MODEL_EXTENSION)
            .unwrap_or(false);
        if path.is_file() && matches {
            candidates.push(path);
        }
    }

    if candidates.is_empty() {
        bail!(
            "there are no '.{}' files in the folder {}",
            MODEL_EXTENSION,
            folder.display()
        );
    }

    candidates.sort();
    if candidates.len() > 1 {
        log::warn!(
            "more than one model file found in {}; using {}. Pass a model name to choose explicitly.",
            folder.display(),
            candidates[0].display()
        );
    }

    Ok(candidates.remove(0))
}
