// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Writes a temp file and renames it into place, without fsync.
    #[default]
    BestEffort,

    /// Also flushes the file and (on unix) its directory to stable storage.
    Durable,
}

/// Replaces `path` with `contents` via a sibling temp file and a rename.
///
/// Parent directories are created. Symlinks at `path` are refused.
pub fn write_atomic(path: &Path, contents: &[u8], durability: WriteDurability) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let Some(file_name) = path.file_name() else {
        return Err(io::Error::other("path has no file name"));
    };
    fs::create_dir_all(parent)?;

    match fs::symlink_metadata(path) {
        Ok(md) if md.file_type().is_symlink() => {
            let message = format!("refusing to write through symlink {}", path.display());
            return Err(io::Error::other(message));
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }

    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    let tmp_path = parent.join(format!(".stepgraph.tmp.{}.{}", file_name.to_string_lossy(), nanos));

    let mut file = fs::OpenOptions::new().write(true).create_new(true).open(&tmp_path)?;
    let written = file.write_all(contents).and_then(|()| {
        if durability == WriteDurability::Durable {
            file.sync_all()
        } else {
            Ok(())
        }
    });
    drop(file);
    if let Err(err) = written.and_then(|()| fs::rename(&tmp_path, path)) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    if durability == WriteDurability::Durable {
        #[cfg(unix)]
        {
            fs::File::open(parent)?.sync_all()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{write_atomic, WriteDurability};

    #[test]
    fn replaces_existing_file_and_leaves_no_temp_files() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join("out.yaml");

        write_atomic(&path, b"first", WriteDurability::BestEffort).expect("write");
        write_atomic(&path, b"second", WriteDurability::Durable).expect("write");

        assert_eq!(fs::read_to_string(&path).expect("read"), "second");
        let entries = fs::read_dir(path.parent().expect("parent"))
            .expect("read dir")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        assert_eq!(entries, vec!["out.yaml".to_owned()]);
    }

    #[cfg(unix)]
    #[test]
    fn refuses_symlink_targets() {
        let dir = TempDir::new().expect("tempdir");
        let real = dir.path().join("real.json");
        let link = dir.path().join("link.json");
        fs::write(&real, "[]").expect("write");
        std::os::unix::fs::symlink(&real, &link).expect("symlink");

        write_atomic(&link, b"{}", WriteDurability::BestEffort).unwrap_err();
        assert_eq!(fs::read_to_string(&real).expect("read"), "[]");
    }
}
