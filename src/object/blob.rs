use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, IoResultExt, Result};
use crate::hash::{compute_hash, ContentHasher, Hash};
use crate::repo::Repo;

const CHUNK_SIZE: usize = 64 * 1024;

/// write a blob to the object store (`put`)
///
/// blobs are zstd compressed and stored at `objects/<hh>/<rest>`.
/// returns the SHA-256 of the uncompressed content.
pub fn write_blob(repo: &Repo, content: &[u8]) -> Result<Hash> {
    let hash = compute_hash(content);
    let blob_path = blob_path(repo, &hash);

    // deduplication: if blob already exists, we're done
    if blob_path.exists() {
        tracing::trace!(%hash, "blob already stored");
        return Ok(hash);
    }

    let level = repo.config().store.compression_level;
    // single-shot compression records the content size in the frame header
    let compressed = zstd::bulk::compress(content, level).with_path(&blob_path)?;

    persist(&blob_path, |file| file.write_all(&compressed))?;

    tracing::debug!(%hash, size = content.len(), stored = compressed.len(), "stored blob");
    Ok(hash)
}

/// write a file's content to the object store (`put_file`)
///
/// streams the file twice: once to hash it (so unchanged content never gets
/// recompressed), and once more to compress it into place. if the content
/// changed between the two reads the write is abandoned.
pub fn write_blob_file(repo: &Repo, source: &Path) -> Result<Hash> {
    let hash = hash_file(source)?;
    let blob_path = blob_path(repo, &hash);

    if blob_path.exists() {
        tracing::trace!(%hash, path = %source.display(), "blob already stored");
        return Ok(hash);
    }

    let file = File::open(source).with_path(source)?;
    let len = file.metadata().with_path(source)?.len();
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, file);
    let level = repo.config().store.compression_level;

    persist(&blob_path, |out| {
        let mut encoder = zstd::stream::write::Encoder::new(out, level)?;
        encoder.include_contentsize(true)?;
        encoder.set_pledged_src_size(Some(len))?;

        let mut hasher = ContentHasher::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            encoder.write_all(&buf[..n])?;
        }
        encoder.finish()?;

        // the bytes we compressed must be the bytes we hashed
        if hasher.finalize() != hash {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "content changed while compressing",
            ));
        }
        Ok(())
    })
    .map_err(|e| match e {
        Error::Io { source: ref err, .. } if err.kind() == std::io::ErrorKind::InvalidData => {
            Error::SourceChanged(source.to_path_buf())
        }
        // a pledged size mismatch also means the file changed under us
        Error::Io { .. } if hash_file(source).map(|h| h != hash).unwrap_or(false) => {
            Error::SourceChanged(source.to_path_buf())
        }
        e => e,
    })?;

    tracing::debug!(%hash, size = len, path = %source.display(), "stored blob from file");
    Ok(hash)
}

/// get the filesystem path to a blob
pub fn blob_path(repo: &Repo, hash: &Hash) -> PathBuf {
    let (dir, file) = hash.to_path_components();
    repo.objects_path().join(dir).join(file)
}

/// check if a blob exists in the object store
pub fn blob_exists(repo: &Repo, hash: &Hash) -> bool {
    blob_path(repo, hash).is_file()
}

/// read blob content (`get`)
///
/// the decompressed bytes are checked against the requested digest.
pub fn read_blob(repo: &Repo, hash: &Hash) -> Result<Vec<u8>> {
    let path = blob_path(repo, hash);
    let compressed = fs::read(&path).map_err(|e| not_found_or_io(e, hash, &path))?;

    let content = zstd::decode_all(&compressed[..]).map_err(|_| Error::CorruptObject(*hash))?;
    if compute_hash(&content) != *hash {
        return Err(Error::CorruptObject(*hash));
    }
    Ok(content)
}

/// read blob content into a writer (streaming)
///
/// returns the number of uncompressed bytes written. the digest is checked
/// once the stream is exhausted, so on `CorruptObject` the writer has
/// already received the bad bytes.
pub fn read_blob_to<W: Write>(repo: &Repo, hash: &Hash, writer: &mut W) -> Result<u64> {
    let path = blob_path(repo, hash);
    let file = File::open(&path).map_err(|e| not_found_or_io(e, hash, &path))?;

    let mut decoder =
        zstd::stream::read::Decoder::new(file).map_err(|_| Error::CorruptObject(*hash))?;
    let mut hasher = ContentHasher::new();

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = decoder
            .read(&mut buf)
            .map_err(|_| Error::CorruptObject(*hash))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        writer.write_all(&buf[..n]).with_path(&path)?;
        total += n as u64;
    }

    if hasher.finalize() != *hash {
        return Err(Error::CorruptObject(*hash));
    }
    Ok(total)
}

/// list every blob digest present on disk
pub fn list_blobs(repo: &Repo) -> Result<Vec<Hash>> {
    let objects = repo.objects_path();
    let mut hashes = Vec::new();

    if !objects.exists() {
        return Ok(hashes);
    }

    for entry in WalkDir::new(&objects).min_depth(2).max_depth(2) {
        let entry = entry.map_err(|e| Error::Io {
            path: objects.clone(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let dir_name = entry
            .path()
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str());
        let file_name = entry.file_name().to_str();

        // temp files and strays don't parse as a digest
        if let (Some(dir), Some(file)) = (dir_name, file_name) {
            if let Ok(hash) = Hash::from_hex(&format!("{}{}", dir, file)) {
                hashes.push(hash);
            }
        }
    }

    hashes.sort();
    Ok(hashes)
}

/// hash a file's content without storing it
fn hash_file(path: &Path) -> Result<Hash> {
    let mut file = File::open(path).with_path(path)?;
    let mut hasher = ContentHasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).with_path(path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

/// atomically create `dest`: write a temp file beside it, fsync, rename, fsync dir
fn persist<F>(dest: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> std::io::Result<()>,
{
    let dir = dest
        .parent()
        .ok_or_else(|| Error::InvalidPath(dest.display().to_string()))?;
    fs::create_dir_all(dir).with_path(dir)?;

    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = dir.join(format!("{}.tmp-{}", file_name, uuid::Uuid::new_v4()));

    let written = File::create(&tmp_path).and_then(|mut tmp_file| {
        write(&mut tmp_file)?;
        tmp_file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::Io {
            path: tmp_path,
            source: e,
        });
    }

    // rename to final location; a concurrent writer of the same digest
    // produced identical bytes, so losing the race is harmless
    if let Err(e) = fs::rename(&tmp_path, dest) {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::Io {
            path: dest.to_path_buf(),
            source: e,
        });
    }

    fsync_dir(dir)
}

fn not_found_or_io(e: std::io::Error, hash: &Hash, path: &Path) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::ObjectNotFound(*hash)
    } else {
        Error::Io {
            path: path.to_path_buf(),
            source: e,
        }
    }
}

/// fsync a directory
pub(crate) fn fsync_dir(path: &Path) -> Result<()> {
    let dir = File::open(path).with_path(path)?;
    dir.sync_all().with_path(path)?;
    Ok(())
}
