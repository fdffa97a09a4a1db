//! Discovery and preparation of a draft's not-yet-uploaded images.

use std::panic::AssertUnwindSafe;
use std::path::Path;

use coursekit_core::{AssetRole, CompressedAsset, CourseDraft, ErrorKind, Failure, Outcome};
use futures::future::join_all;
use futures::FutureExt;

use crate::compress::{AssetCompressor, AssetFile, CompressionOptions};

/// An image reference that still points at a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAsset {
    pub role: AssetRole,
    pub source_ref: String,
}

/// Remote (`http`/`https`) references are already uploaded; anything else
/// non-blank is a local path, optionally with a `file://` prefix.
#[must_use]
pub fn is_pending_local(reference: &str) -> bool {
    let reference = reference.trim();
    !reference.is_empty()
        && strip_scheme(reference, "http://").is_none()
        && strip_scheme(reference, "https://").is_none()
}

/// URI schemes are case-insensitive.
fn strip_scheme<'a>(reference: &'a str, scheme: &str) -> Option<&'a str> {
    let prefix = reference.get(..scheme.len())?;
    prefix
        .eq_ignore_ascii_case(scheme)
        .then(|| &reference[scheme.len()..])
}

/// Hero image first, then per-location images in visit order.
#[must_use]
pub fn pending_assets(draft: &CourseDraft) -> Vec<PendingAsset> {
    let hero = draft
        .hero_image_ref
        .iter()
        .filter(|r| is_pending_local(r))
        .map(|r| PendingAsset {
            role: AssetRole::Hero,
            source_ref: r.clone(),
        });
    let stops = draft.locations.iter().filter_map(|l| {
        l.image_ref
            .as_ref()
            .filter(|r| is_pending_local(r))
            .map(|r| PendingAsset {
                role: AssetRole::Location(l.id.clone()),
                source_ref: r.clone(),
            })
    });
    hero.chain(stops).collect()
}

/// Load and compress every pending asset of `draft`.
///
/// A compressor error or panic degrades to the original bytes. A local file
/// that cannot be read fails the whole preparation, since there is nothing to
/// upload in its place.
pub(crate) async fn prepare_assets(
    draft: &CourseDraft,
    compressor: &dyn AssetCompressor,
    options: &CompressionOptions,
) -> Outcome<Vec<CompressedAsset>> {
    let pending = pending_assets(draft);
    let prepared = join_all(
        pending
            .into_iter()
            .map(|asset| prepare_one(asset, compressor, options)),
    )
    .await;
    prepared.into_iter().collect()
}

async fn prepare_one(
    asset: PendingAsset,
    compressor: &dyn AssetCompressor,
    options: &CompressionOptions,
) -> Outcome<CompressedAsset> {
    let path = local_path(&asset.source_ref);
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        tracing::warn!(role = %asset.role, path = %path.display(), error = %e, "image file unreadable");
        Failure::validation(format!(
            "images: the {} image '{}' could not be read",
            asset.role, asset.source_ref
        ))
    })?;

    let original = AssetFile {
        name: path
            .file_name()
            .map_or_else(|| asset.source_ref.clone(), |n| n.to_string_lossy().into_owned()),
        content_type: content_type_for(path).to_string(),
        bytes,
    };

    let compressed = AssertUnwindSafe(compressor.compress(&original, options))
        .catch_unwind()
        .await;
    let (file, degraded) = match compressed {
        Ok(Ok(file)) => {
            tracing::debug!(
                role = %asset.role,
                before = original.bytes.len(),
                after = file.bytes.len(),
                "image compressed"
            );
            (file, false)
        }
        Ok(Err(e)) => {
            tracing::warn!(role = %asset.role, kind = %ErrorKind::AssetDegraded, error = %e, "compression failed, uploading original");
            (original, true)
        }
        Err(_) => {
            tracing::warn!(role = %asset.role, kind = %ErrorKind::AssetDegraded, "compressor panicked, uploading original");
            (original, true)
        }
    };

    Ok(CompressedAsset {
        role: asset.role,
        source_ref: asset.source_ref,
        file_name: file.name,
        content_type: file.content_type,
        bytes: file.bytes,
        degraded,
    })
}

fn local_path(reference: &str) -> &Path {
    let reference = reference.trim();
    Path::new(strip_scheme(reference, "file://").unwrap_or(reference))
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}
