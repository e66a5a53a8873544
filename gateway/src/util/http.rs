use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::{Component, Path};

/// Characters left untouched in a URL path segment (RFC 3986 unreserved)
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
  .remove(b'-')
  .remove(b'.')
  .remove(b'_')
  .remove(b'~');

/// Reduce a descriptor location to its `scheme://host:port` prefix.
///
/// Returns `None` when the location has no `://` separator, since there is no
/// way to tell host from path in that case.
pub fn control_base_url(location: &str) -> Option<String> {
  let scheme_end = location.find("://")?;
  let authority_start = scheme_end + 3;
  let base = match location[authority_start..].find('/') {
    Some(slash) => &location[..authority_start + slash],
    None => location,
  };
  Some(base.to_string())
}

/// Build the URL under which a file below the served root is reachable.
///
/// Only normal path components are kept, each percent-encoded, joined with `/`.
pub fn media_url(base_url: &str, relative_path: &Path) -> String {
  let segments: Vec<String> = relative_path
    .components()
    .filter_map(|component| match component {
      Component::Normal(segment) => Some(
        utf8_percent_encode(&segment.to_string_lossy(), PATH_SEGMENT).to_string(),
      ),
      _ => None,
    })
    .collect();

  format!("{}/{}", base_url.trim_end_matches('/'), segments.join("/"))
}
