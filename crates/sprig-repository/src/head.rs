//! HEAD resolution: symbolic refs, loose refs, packed-refs fallback.

use std::path::Path;

use sprig_hash::ObjectId;

use crate::RepoError;

const MAX_SYMREF_DEPTH: usize = 10;

/// Resolve `HEAD` to a commit OID. `Ok(None)` when HEAD points at a branch
/// that does not exist yet (unborn).
pub fn resolve_head(git_dir: &Path) -> Result<Option<ObjectId>, RepoError> {
    resolve_ref(git_dir, "HEAD", 0)
}

fn resolve_ref(git_dir: &Path, name: &str, depth: usize) -> Result<Option<ObjectId>, RepoError> {
    if depth > MAX_SYMREF_DEPTH {
        return Err(RepoError::InvalidRef {
            name: name.into(),
            reason: "symref chain too deep".into(),
        });
    }

    let content = match std::fs::read_to_string(git_dir.join(name)) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            // HEAD itself must exist; a missing branch target is an unborn
            // branch, possibly recorded in packed-refs.
            if name == "HEAD" {
                return Err(RepoError::InvalidRef {
                    name: name.into(),
                    reason: "missing HEAD".into(),
                });
            }
            return lookup_packed_ref(git_dir, name);
        }
        Err(e) => return Err(RepoError::Io(e)),
    };
    let content = content.trim_end();

    if let Some(target) = content.strip_prefix("ref: ") {
        return resolve_ref(git_dir, target.trim(), depth + 1);
    }

    ObjectId::from_hex(content)
        .map(Some)
        .map_err(|e| RepoError::InvalidRef {
            name: name.into(),
            reason: e.to_string(),
        })
}

/// Look a ref up in `packed-refs`. `Ok(None)` when absent.
fn lookup_packed_ref(git_dir: &Path, name: &str) -> Result<Option<ObjectId>, RepoError> {
    let content = match std::fs::read_to_string(git_dir.join("packed-refs")) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(RepoError::Io(e)),
    };

    for line in content.lines() {
        if line.starts_with('#') || line.starts_with('^') {
            continue;
        }
        if let Some((hex, ref_name)) = line.split_once(' ') {
            if ref_name.trim() == name {
                let oid = ObjectId::from_hex(hex).map_err(|e| RepoError::InvalidRef {
                    name: name.into(),
                    reason: e.to_string(),
                })?;
                return Ok(Some(oid));
            }
        }
    }
    Ok(None)
}
