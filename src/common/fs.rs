use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, UcmError};

/// Sidecar files that must exist next to every shapefile.
const REQUIRED_EXTENSIONS: [&str; 3] = ["shp", "shx", "dbf"];

/// Sidecar files carried along when present. Spatial indexes (.sbn/.sbx) are
/// left behind since the copy is edited afterwards.
const OPTIONAL_EXTENSIONS: [&str; 2] = ["prj", "cpg"];

/// Create the directory if it doesn’t exist; error if a non-directory exists there.
pub(crate) fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(UcmError::Io(std::io::Error::other(format!(
                "Path exists but is not a directory: {}", path.display()
            ))));
        }
    } else {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Files written by [`clone_shapefile`].
#[derive(Debug)]
pub(crate) struct ShapefileCopy {
    /// Path of the new `.shp` file.
    pub shp: PathBuf,
    files: Vec<PathBuf>,
}

impl ShapefileCopy {
    /// Remove the copied files, and only those.
    pub fn discard(self) {
        remove_files(&self.files);
    }
}

/// Whether `a` and `b` name the same file once `.` segments and symlinks are
/// resolved. Paths that do not exist yet are compared as given.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Copy every sidecar of the shapefile at `src` to the base name of `dest`.
///
/// Nothing is written when `dest` resolves to `src` or a required sidecar of
/// `src` is missing. If a copy fails midway, the files already copied are
/// removed again.
pub(crate) fn clone_shapefile(src: &Path, dest: &Path) -> Result<ShapefileCopy> {
    let src_shp = src.with_extension("shp");
    let dest_shp = dest.with_extension("shp");

    if same_file(&src_shp, &dest_shp) {
        return Err(UcmError::Io(std::io::Error::other(format!(
            "Cannot clone shapefile onto itself: {}", src_shp.display()
        ))));
    }
    if let Some(missing) = REQUIRED_EXTENSIONS.iter().map(|ext| src.with_extension(ext)).find(|p| !p.is_file()) {
        return Err(UcmError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Missing shapefile component: {}", missing.display()),
        )));
    }

    if let Some(parent) = dest_shp.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir_exists(parent)?;
    }

    let optional = OPTIONAL_EXTENSIONS.iter().filter(|ext| src.with_extension(ext).exists());
    let mut files = Vec::new();
    for ext in REQUIRED_EXTENSIONS.iter().chain(optional) {
        let target = dest.with_extension(ext);
        if let Err(e) = fs::copy(src.with_extension(ext), &target) {
            remove_files(&files);
            return Err(e.into());
        }
        files.push(target);
    }

    Ok(ShapefileCopy { shp: dest_shp, files })
}

/// Remove `files`, logging any failure other than an already missing file.
pub(crate) fn remove_files(files: &[PathBuf]) {
    for file in files {
        match fs::remove_file(file) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("[fs] failed to remove {}: {e}", file.display()),
        }
    }
}
