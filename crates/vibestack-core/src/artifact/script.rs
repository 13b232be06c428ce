//! Rendering an artifact as a standalone worker script.
//!
//! The script is an ES module exposing a `fetch` handler. It embeds the
//! route table (bodies as base64), the content-type table and the fallback
//! rule, and mirrors [`Artifact::resolve`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use indexmap::IndexMap;

use crate::artifact::builder::Artifact;
use crate::artifact::content_type::ContentType;
use crate::errors::CoreResult;
use crate::manifest::sha256_hex;

const SCRIPT_BODY: &str = r#"
function decode(b64) {
  const raw = atob(b64);
  const bytes = new Uint8Array(raw.length);
  for (let i = 0; i < raw.length; i++) bytes[i] = raw.charCodeAt(i);
  return bytes;
}

function routePath(pathname) {
  try {
    return decodeURIComponent(pathname);
  } catch (e) {
    return null;
  }
}

function contentType(path) {
  const name = path.split('/').pop();
  const dot = name.lastIndexOf('.');
  const ext = dot >= 0 ? name.slice(dot + 1).toLowerCase() : '';
  return Object.prototype.hasOwnProperty.call(TYPES, ext) ? TYPES[ext] : DEFAULT_TYPE;
}

export default {
  async fetch(request) {
    const url = new URL(request.url);
    let path = routePath(url.pathname);
    if (path === null || !Object.prototype.hasOwnProperty.call(FILES, path)) path = FALLBACK;
    if (!Object.prototype.hasOwnProperty.call(FILES, path)) {
      return new Response('Not found', {
        status: 404,
        headers: { 'Content-Type': DEFAULT_TYPE },
      });
    }
    return new Response(decode(FILES[path]), {
      headers: { 'Content-Type': contentType(path) },
    });
  }
};
"#;

impl Artifact {
    /// Render the artifact as a self-contained JavaScript module
    ///
    /// Output is deterministic for a given artifact, so its digest can be
    /// used as the stored artifact reference.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::Serialization` if the embedded tables fail to
    /// encode.
    pub fn render_script(&self) -> CoreResult<String> {
        let files: IndexMap<&str, String> = self
            .routes()
            .map(|route| (route.path.as_str(), STANDARD.encode(&route.body)))
            .collect();
        let types: IndexMap<&str, &str> = ContentType::ALL
            .iter()
            .filter_map(|ct| ct.extension().map(|ext| (ext, ct.mime())))
            .collect();

        let mut script = String::new();
        script.push_str("// Generated by vibestack. Do not edit.\n");
        script.push_str("const FILES = ");
        script.push_str(&serde_json::to_string_pretty(&files)?);
        script.push_str(";\n\nconst TYPES = ");
        script.push_str(&serde_json::to_string_pretty(&types)?);
        script.push_str(";\n\nconst DEFAULT_TYPE = ");
        script.push_str(&serde_json::to_string(ContentType::PlainText.mime())?);
        script.push_str(";\nconst FALLBACK = ");
        script.push_str(&serde_json::to_string(self.fallback_path())?);
        script.push_str(";\n");
        script.push_str(SCRIPT_BODY);
        Ok(script)
    }

    /// Hex SHA-256 of the rendered script
    ///
    /// # Errors
    ///
    /// Propagates [`Artifact::render_script`] failures.
    pub fn digest(&self) -> CoreResult<String> {
        Ok(sha256_hex(self.render_script()?.as_bytes()))
    }
}
