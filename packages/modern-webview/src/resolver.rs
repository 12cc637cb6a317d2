//! Resolves virtual-stream URIs against the host's content provider.
//!
//! Navigations through [`Window::navigate_with_local_stream`] target a
//! private origin. The control routes every request for that origin here
//! instead of the network, so the host can serve content by name without
//! exposing a filesystem path to the rendering engine.
//!
//! [`Window::navigate_with_local_stream`]: crate::Window::navigate_with_local_stream

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::{Error, Result};
use crate::host::{Host, Token};

/// Origin served by the resolver. `.localhost` names never reach the network.
pub const LOCAL_STREAM_ORIGIN: &str = "https://local-stream.localhost";

/// Request filter registered with the control.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub const LOCAL_STREAM_FILTER: &str = "https://local-stream.localhost/*";

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Build the URI that makes the control request `path` from the resolver.
///
/// The host is later asked for exactly `path`, minus leading slashes. Paths
/// with `.` or `..` segments are rejected because URI normalization would
/// rewrite them before the request arrives.
pub fn local_stream_uri(path: &str) -> Result<String> {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return Err(Error::invalid_argument("resource path must not be empty"));
    }
    let mut encoded = Vec::new();
    for segment in path.split('/') {
        if segment == "." || segment == ".." {
            return Err(Error::invalid_argument(format!(
                "resource path '{}' must not contain '.' or '..' segments",
                path
            )));
        }
        encoded.push(utf8_percent_encode(segment, PATH_SEGMENT).to_string());
    }
    Ok(format!("{}/{}", LOCAL_STREAM_ORIGIN, encoded.join("/")))
}

/// Extract the resource path from a URI on the local-stream origin.
/// Returns `None` for any other origin or for the bare origin.
pub fn resource_path(uri: &str) -> Option<String> {
    let parsed = url::Url::parse(uri).ok()?;
    if parsed.origin().ascii_serialization() != LOCAL_STREAM_ORIGIN {
        return None;
    }
    let raw = parsed.path().trim_start_matches('/');
    if raw.is_empty() {
        return None;
    }
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(|path| path.into_owned())
}

/// A resource supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub path: String,
    pub mime: String,
    pub body: Vec<u8>,
}

impl Resource {
    /// Response headers in the `name: value` form the control expects.
    pub fn headers(&self) -> String {
        format!("Content-Type: {}", self.mime)
    }
}

/// Ask the host for the resource behind `uri`.
///
/// Fails with [`Error::NotFound`] when the URI is not a local-stream URI or
/// the host has no content for its path.
pub fn resolve(host: &dyn Host, owner: Token, uri: &str) -> Result<Resource> {
    let path = resource_path(uri).ok_or_else(|| Error::NotFound(uri.to_string()))?;
    match host.get_content(owner, &path) {
        Some(body) => {
            let mime = mime_guess::from_path(&path)
                .first_or_octet_stream()
                .essence_str()
                .to_string();
            log::debug!("serving local stream '{}' ({} bytes, {})", path, body.len(), mime);
            Ok(Resource { path, mime, body })
        }
        None => {
            log::warn!("local stream resource '{}' not found", path);
            Err(Error::NotFound(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MockHost;

    #[test]
    fn builds_and_parses_uris() {
        let uri = local_stream_uri("/html/index page.html").unwrap();
        assert_eq!(uri, "https://local-stream.localhost/html/index%20page.html");
        assert_eq!(resource_path(&uri).as_deref(), Some("html/index page.html"));
    }

    #[test]
    fn drops_query_and_fragment() {
        assert_eq!(
            resource_path("https://local-stream.localhost/app.js?v=3#top").as_deref(),
            Some("app.js")
        );
    }

    #[test]
    fn ignores_other_origins() {
        assert_eq!(resource_path("https://github.com/index.html"), None);
        assert_eq!(resource_path("http://local-stream.localhost/index.html"), None);
        assert_eq!(resource_path("https://local-stream.localhost/"), None);
        assert_eq!(resource_path("not a uri"), None);
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(matches!(local_stream_uri("/"), Err(Error::InvalidArgument(_))));
        assert!(matches!(local_stream_uri(""), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn backslash_survives_the_round_trip() {
        let uri = local_stream_uri("dir\\file.html").unwrap();
        assert_eq!(uri, "https://local-stream.localhost/dir%5Cfile.html");
        assert_eq!(resource_path(&uri).as_deref(), Some("dir\\file.html"));
    }

    #[test]
    fn dot_segments_are_rejected() {
        for path in ["../secret.html", "a/./b.html", "a/..", ".", "/./index.html"] {
            assert!(
                matches!(local_stream_uri(path), Err(Error::InvalidArgument(_))),
                "{} was accepted",
                path
            );
        }
    }

    #[test]
    fn dotted_names_are_not_segments() {
        let uri = local_stream_uri("..hidden/.env/a..b").unwrap();
        assert_eq!(resource_path(&uri).as_deref(), Some("..hidden/.env/a..b"));
        let uri = local_stream_uri("%2E%2E/x.html").unwrap();
        assert_eq!(resource_path(&uri).as_deref(), Some("%2E%2E/x.html"));
    }

    #[test]
    fn host_sees_the_path_it_was_given() {
        for path in ["dir\\file.html", "a b/c#d?.html", "ünï/cödé.js"] {
            let expected = path.to_string();
            let mut host = MockHost::new();
            host.expect_get_content()
                .withf(move |_, seen| seen == expected)
                .times(1)
                .returning(|_, _| Some(Vec::new()));
            let uri = local_stream_uri(path).unwrap();
            assert_eq!(resolve(&host, Token::NONE, &uri).unwrap().path, path);
        }
    }

    #[test]
    fn serves_host_content_with_mime() {
        let mut host = MockHost::new();
        host.expect_get_content()
            .withf(|owner, path| *owner == Token::new(3) && path == "css/site.css")
            .times(1)
            .returning(|_, _| Some(b"body{}".to_vec()));

        let resource = resolve(
            &host,
            Token::new(3),
            "https://local-stream.localhost/css/site.css",
        )
        .unwrap();
        assert_eq!(resource.body, b"body{}".to_vec());
        assert_eq!(resource.headers(), "Content-Type: text/css");
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        let mut host = MockHost::new();
        host.expect_get_content().returning(|_, _| Some(vec![0, 1, 2]));
        let resource = resolve(&host, Token::NONE, "https://local-stream.localhost/blob.bin1").unwrap();
        assert_eq!(resource.mime, "application/octet-stream");
    }

    #[test]
    fn missing_content_is_not_found() {
        let mut host = MockHost::new();
        host.expect_get_content().times(1).returning(|_, _| None);
        let err = resolve(&host, Token::NONE, "https://local-stream.localhost/missing.html")
            .unwrap_err();
        assert_eq!(err, Error::NotFound("missing.html".into()));
    }

    #[test]
    fn foreign_uri_never_reaches_host() {
        let mut host = MockHost::new();
        host.expect_get_content().never();
        let err = resolve(&host, Token::NONE, "https://example.com/x").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
