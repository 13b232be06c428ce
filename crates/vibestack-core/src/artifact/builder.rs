//! Artifact construction and in-process request resolution.

use indexmap::IndexMap;
use percent_encoding::percent_decode_str;

use crate::artifact::content_type::ContentType;
use crate::manifest::Manifest;

/// Path served when a request matches no route
pub const FALLBACK_PATH: &str = "/index.html";

/// One servable file of an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRoute {
    pub path: String,
    pub content_type: ContentType,
    pub body: Vec<u8>,
}

/// Result of resolving a request path against an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactResponse {
    /// 200 for a served file, 404 when neither route nor fallback exists
    pub status: u16,
    pub content_type: ContentType,
    pub body: Vec<u8>,
    /// Route that produced the body, `None` for a 404
    pub served_path: Option<String>,
}

impl ArtifactResponse {
    fn not_found() -> Self {
        Self {
            status: 404,
            content_type: ContentType::PlainText,
            body: b"Not found".to_vec(),
            served_path: None,
        }
    }
}

/// Self-contained, path-routable deployment bundle
///
/// Routes keep manifest order. The artifact owns all content, so it stays
/// usable after the snapshot that produced it is gone from memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    routes: IndexMap<String, ArtifactRoute>,
    fallback_path: String,
}

impl Artifact {
    pub fn routes(&self) -> impl Iterator<Item = &ArtifactRoute> {
        self.routes.values()
    }

    pub fn route(&self, path: &str) -> Option<&ArtifactRoute> {
        self.routes.get(path)
    }

    pub fn fallback_path(&self) -> &str {
        &self.fallback_path
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Answer a request the way the rendered script would
    ///
    /// Query string and fragment are ignored and the path is percent-decoded,
    /// so `/my%20page.html` reaches `/my page.html`. An unknown path, or one
    /// that does not decode to UTF-8, is served the fallback route with the
    /// fallback's own content type; with no fallback route the response is a
    /// 404.
    pub fn resolve(&self, request_path: &str) -> ArtifactResponse {
        let path = strip_query_and_fragment(request_path);
        let route = percent_decode_str(path)
            .decode_utf8()
            .ok()
            .and_then(|decoded| self.routes.get(&*decoded))
            .or_else(|| self.routes.get(&self.fallback_path));

        match route {
            Some(route) => ArtifactResponse {
                status: 200,
                content_type: route.content_type,
                body: route.body.clone(),
                served_path: Some(route.path.clone()),
            },
            None => ArtifactResponse::not_found(),
        }
    }
}

fn strip_query_and_fragment(request_path: &str) -> &str {
    let end = request_path
        .find(|c| c == '?' || c == '#')
        .unwrap_or(request_path.len());
    &request_path[..end]
}

/// Compiles manifests into artifacts
pub struct ArtifactBuilder;

impl ArtifactBuilder {
    /// Build the artifact for `manifest`
    ///
    /// Never fails: an empty manifest yields an artifact that answers 404
    /// for every path.
    pub fn build(manifest: &Manifest) -> Artifact {
        let routes = manifest
            .entries()
            .iter()
            .map(|entry| {
                (
                    entry.path.clone(),
                    ArtifactRoute {
                        path: entry.path.clone(),
                        content_type: ContentType::from_path(&entry.path),
                        body: entry.content.clone(),
                    },
                )
            })
            .collect();

        Artifact {
            routes,
            fallback_path: FALLBACK_PATH.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestEntry;

    fn manifest(entries: &[(&str, &str)]) -> Manifest {
        Manifest::from_entries(
            entries
                .iter()
                .map(|(p, c)| ManifestEntry {
                    path: p.to_string(),
                    content: c.as_bytes().to_vec(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_routes_keep_manifest_order() {
        let artifact = ArtifactBuilder::build(&manifest(&[
            ("/z.js", "1"),
            ("/a.css", "2"),
            ("/index.html", "3"),
        ]));
        let paths: Vec<&str> = artifact.routes().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/z.js", "/a.css", "/index.html"]);
        assert_eq!(artifact.fallback_path(), FALLBACK_PATH);
    }

    #[test]
    fn test_query_and_fragment_are_ignored() {
        let artifact = ArtifactBuilder::build(&manifest(&[
            ("/index.html", "home"),
            ("/app.js", "js"),
        ]));
        let resp = artifact.resolve("/app.js?v=3#top");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_type, ContentType::Javascript);
        assert_eq!(resp.body, b"js");
    }

    #[test]
    fn test_percent_encoded_request_paths_reach_their_route() {
        let artifact = ArtifactBuilder::build(&manifest(&[
            ("/index.html", "HOME"),
            ("/my page.html", "PAGE"),
            ("/café.css", "CAFE"),
        ]));

        let page = artifact.resolve("/my%20page.html");
        assert_eq!(page.body, b"PAGE");
        assert_eq!(page.served_path.as_deref(), Some("/my page.html"));

        let css = artifact.resolve("/caf%C3%A9.css?v=1");
        assert_eq!(css.body, b"CAFE");
        assert_eq!(css.content_type, ContentType::Css);

        assert_eq!(artifact.resolve("/my page.html").body, b"PAGE");
    }

    #[test]
    fn test_undecodable_request_path_serves_fallback() {
        let artifact = ArtifactBuilder::build(&manifest(&[("/index.html", "HOME")]));
        let resp = artifact.resolve("/%FF%FE.html");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.served_path.as_deref(), Some(FALLBACK_PATH));
    }

    #[test]
    fn test_unknown_path_without_fallback_is_404() {
        let artifact = ArtifactBuilder::build(&manifest(&[("/app.js", "js")]));
        let resp = artifact.resolve("/missing");
        assert_eq!(resp.status, 404);
        assert_eq!(resp.served_path, None);
    }

    #[test]
    fn test_empty_manifest_serves_404_everywhere() {
        let artifact = ArtifactBuilder::build(&Manifest::default());
        assert!(artifact.is_empty());
        for path in ["/", "/index.html", "/x/y.css"] {
            assert_eq!(artifact.resolve(path).status, 404);
        }
    }
}
