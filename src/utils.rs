//! Utility functions for filename handling and request metadata

use axum::http::HeaderMap;
use std::net::SocketAddr;
use std::path::Path;

/// Replace a filename's extension, appending when there is none
///
/// Only the final extension is replaced; `album.disc1.kgm` becomes
/// `album.disc1.flac`.
///
/// # Examples
///
/// ```
/// use kgm2flac::utils::replace_extension;
///
/// assert_eq!(replace_extension("song.kgm", ".flac"), "song.flac");
/// assert_eq!(replace_extension("song", ".flac"), "song.flac");
/// ```
#[must_use]
pub fn replace_extension(name: &str, new_ext: &str) -> String {
    match Path::new(name).extension() {
        Some(ext) => {
            let stem_len = name.len() - ext.len() - 1;
            format!("{}{}", &name[..stem_len], new_ext)
        }
        None => format!("{name}{new_ext}"),
    }
}

/// Reduce a client-supplied filename to a safe basename
///
/// Takes the final path component and strips characters that would break a
/// `Content-Disposition` header or escape the workspace. Empty results fall
/// back to `"upload"`.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .replace(['"', '\0'], "_");

    let trimmed = base.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Best-effort client IP for logging
///
/// Prefers `X-Forwarded-For` (first hop), then `X-Real-Ip`, then the
/// connection's peer address.
#[must_use]
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(xff) = headers.get("x-forwarded-for")
        && let Ok(value) = xff.to_str()
        && let Some(first) = value.split(',').next()
    {
        let first = first.trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip")
        && let Ok(value) = real_ip.to_str()
    {
        let value = value.trim();
        if !value.is_empty() {
            return value.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
