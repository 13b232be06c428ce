//! Artifact building: manifest to standalone, routable bundle.
//!
//! An [`Artifact`] is a route table from request path to content and
//! content type, plus a fallback path served for unknown requests. It can
//! answer requests in process ([`Artifact::resolve`]) and render itself as a
//! self-contained worker script ([`Artifact::render_script`]) that needs no
//! access to the snapshot store at serve time.

pub mod builder;
pub mod content_type;
pub mod script;

pub use builder::{Artifact, ArtifactBuilder, ArtifactResponse, ArtifactRoute, FALLBACK_PATH};
pub use content_type::ContentType;
