//! Embed command implementation.
//!
//! Appends every `.seg` and `.snp` file of an index to a copy of an ELF
//! binary, one `objcopy --add-section` call per file. Each call reads the
//! previous call's output:
//!
//! ```text
//! server -> server.0 -> server.1 -> ... -> server.withindex
//! ```
//!
//! Intermediate files are removed as soon as the next one exists; the input
//! binary is never modified.

use elfdir_storage::{parse_item_name, section_prefix_for, ItemKind};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Section flags making the data invisible to the loader.
const SECTION_FLAGS: &str = "noload,readonly";

/// Suffix of the final output when no path is given.
const OUTPUT_SUFFIX: &str = "withindex";

/// One section to add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSection {
    /// Full section name, prefix included.
    pub name: String,
    /// File holding the section contents.
    pub source: PathBuf,
}

/// Finds the index files under `index_path` and names their sections.
///
/// Files are visited in lexical order. A file is embedded under its own
/// file name, so `000000000001.seg` becomes
/// `elfdir/<dir_name>/000000000001.seg`.
pub fn plan(dir_name: &str, index_path: &Path) -> Result<Vec<PlannedSection>, Box<dyn std::error::Error>> {
    let prefix = section_prefix_for(dir_name);
    let mut seen: HashMap<(ItemKind, u64), PathBuf> = HashMap::new();
    let mut sections = Vec::new();

    for entry in WalkDir::new(index_path).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str() else {
            debug!("skipping non UTF-8 file name {:?}", entry.path());
            continue;
        };
        if ItemKind::split_suffix(file_name).is_none() {
            continue;
        }

        // Refuse names the directory would reject at setup.
        let Some((kind, id)) = parse_item_name(file_name)? else {
            continue;
        };
        if let Some(previous) = seen.insert((kind, id), entry.path().to_path_buf()) {
            return Err(format!(
                "{kind} {id:x} found twice: {:?} and {:?}",
                previous,
                entry.path()
            )
            .into());
        }

        sections.push(PlannedSection {
            name: format!("{prefix}{file_name}"),
            source: entry.path().to_path_buf(),
        });
    }

    Ok(sections)
}

/// Returns `<binary>.<suffix>`.
fn sibling_path(binary: &Path, suffix: &str) -> PathBuf {
    let mut path = binary.as_os_str().to_owned();
    path.push(".");
    path.push(suffix);
    PathBuf::from(path)
}

/// Default output path for `binary`.
pub fn default_output(binary: &Path) -> PathBuf {
    sibling_path(binary, OUTPUT_SUFFIX)
}

/// Runs the embed command.
pub fn run(
    binary: &Path,
    dir_name: &str,
    index_path: &Path,
    output: Option<&Path>,
    objcopy: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Embedding {:?} into {:?} as '{}'", index_path, binary, dir_name);

    let sections = plan(dir_name, index_path)?;
    if sections.is_empty() {
        warn!("No segment or snapshot files found under {:?}", index_path);
        return Ok(());
    }

    let output = output.map_or_else(|| default_output(binary), Path::to_path_buf);
    embed(binary, &sections, &output, objcopy)?;

    println!("✓ Embedded {} sections", sections.len());
    println!("  Directory: {}", dir_name);
    println!("  Output: {:?}", output);

    Ok(())
}

/// Adds `sections` to a copy of `binary` written to `output`.
pub fn embed(
    binary: &Path,
    sections: &[PlannedSection],
    output: &Path,
    objcopy: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = binary.to_path_buf();

    for (i, section) in sections.iter().enumerate() {
        let next = sibling_path(binary, &i.to_string());
        debug!("adding section '{}' from {:?}", section.name, section.source);

        let added = add_section(objcopy, &input, section, &next);
        let removed: Result<(), Box<dyn std::error::Error>> = if i > 0 {
            fs::remove_file(&input)
                .map_err(|e| format!("error removing intermediate file {:?}: {}", input, e).into())
        } else {
            Ok(())
        };
        if let Err(err) = added.and(removed) {
            let _ = fs::remove_file(&next);
            return Err(err);
        }
        input = next;
    }

    fs::rename(&input, output)
        .map_err(|e| format!("error renaming {:?} to {:?}: {}", input, output, e))?;
    Ok(())
}

fn add_section(
    objcopy: &str,
    input: &Path,
    section: &PlannedSection,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut add = OsString::from(&section.name);
    add.push("=");
    add.push(&section.source);

    let result = Command::new(objcopy)
        .arg("--add-section")
        .arg(&add)
        .arg("--set-section-flags")
        .arg(format!("{}={}", section.name, SECTION_FLAGS))
        .arg(input)
        .arg(output)
        .output()
        .map_err(|e| format!("error running {}: {}", objcopy, e))?;

    if !result.status.success() {
        return Err(format!(
            "{} failed adding section '{}' ({}): {}",
            objcopy,
            section.name,
            result.status,
            String::from_utf8_lossy(&result.stderr).trim()
        )
        .into());
    }
    Ok(())
}
