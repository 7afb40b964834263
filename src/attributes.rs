//! Attribute assembly: derivative sets and a placeholder in, markup
//! attributes out.
//!
//! [`assemble`] is pure. It does no path manipulation of its own; every
//! derivative path goes through the caller's [`UrlRewrite`], and an empty URL
//! is an error.
//!
//! The serialized record uses the attribute names a front-end component
//! expects:
//!
//! ```json
//! {
//!   "srcset": "/img/dawn.1a2b3c4d.9f….jpg 480w, /img/dawn.5e6f7a8b.9f….jpg 1024w",
//!   "srcsetWebp": "…",
//!   "srcsetAvif": "…",
//!   "aspectRatio": 1.5,
//!   "placeholder": "data:image/svg+xml,…"
//! }
//! ```
//!
//! Materialized placeholders emit `placeholderSrc` plus one
//! `placeholder<Format>Src` per alternate encoding instead of `placeholder`.

use crate::error::DeriveError;
use crate::placeholder::PlaceholderResult;
use crate::types::{Derivative, DerivativeResult, DerivativeSet, Format};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Context handed to a [`UrlRewrite`] along with each path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteContext {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub source_path: PathBuf,
}

type RewriteFn = dyn Fn(&Path, &RewriteContext) -> String + Send + Sync;

/// Maps a derivative path, relative to the output directory, to the URL that
/// goes into markup.
#[derive(Clone)]
pub struct UrlRewrite(Arc<RewriteFn>);

impl UrlRewrite {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Path, &RewriteContext) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Join the relative path onto a URL prefix with `/`.
    ///
    /// ```
    /// # use simple_srcset::attributes::{RewriteContext, UrlRewrite};
    /// # use std::path::Path;
    /// let ctx = RewriteContext {
    ///     input_dir: "src".into(),
    ///     output_dir: "dist/img".into(),
    ///     source_path: "src/dawn.jpg".into(),
    /// };
    /// let rewrite = UrlRewrite::prefix("/img/");
    /// assert_eq!(
    ///     rewrite.apply(Path::new("dist/img/dawn.webp"), &ctx).unwrap(),
    ///     "/img/dawn.webp"
    /// );
    /// ```
    pub fn prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let prefix = prefix.trim_end_matches('/').to_string();
        Self::new(move |relative, _| {
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if prefix.is_empty() {
                relative
            } else {
                format!("{prefix}/{relative}")
            }
        })
    }

    /// Rewrite `path`. Paths under the output directory are made relative to
    /// it first.
    pub fn apply(&self, path: &Path, ctx: &RewriteContext) -> Result<String, DeriveError> {
        let relative = path.strip_prefix(&ctx.output_dir).unwrap_or(path);
        let url = (self.0)(relative, ctx);
        if url.is_empty() {
            return Err(DeriveError::EmptyUrl(path.to_path_buf()));
        }
        Ok(url)
    }
}

impl Default for UrlRewrite {
    fn default() -> Self {
        Self::prefix("")
    }
}

impl fmt::Debug for UrlRewrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UrlRewrite(..)")
    }
}

/// How candidates are written into a srcset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SrcsetStyle {
    /// `url 480w, url 1024w`
    #[default]
    WidthDescriptors,
    /// A bare `url` when the set has exactly one derivative; otherwise the
    /// same as `WidthDescriptors`.
    PathOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaceholderAttributes {
    Inline(String),
    Materialized {
        src: String,
        alternates: BTreeMap<Format, String>,
    },
}

/// Final attributes for one source image.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRecord {
    pub srcset: String,
    pub srcset_alternates: BTreeMap<Format, String>,
    pub aspect_ratio: f64,
    pub placeholder: Option<PlaceholderAttributes>,
}

impl Serialize for AttributeRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("srcset", &self.srcset)?;
        for (format, srcset) in &self.srcset_alternates {
            map.serialize_entry(&format!("srcset{}", format.label()), srcset)?;
        }
        map.serialize_entry("aspectRatio", &self.aspect_ratio)?;
        match &self.placeholder {
            Some(PlaceholderAttributes::Inline(uri)) => {
                map.serialize_entry("placeholder", uri)?;
            }
            Some(PlaceholderAttributes::Materialized { src, alternates }) => {
                map.serialize_entry("placeholderSrc", src)?;
                for (format, src) in alternates {
                    map.serialize_entry(&format!("placeholder{}Src", format.label()), src)?;
                }
            }
            None => {}
        }
        map.end()
    }
}

/// Build the attribute record. Fails only if the rewrite yields an empty URL.
pub fn assemble(
    derivatives: &DerivativeResult,
    placeholder: Option<&PlaceholderResult>,
    rewrite: &UrlRewrite,
    ctx: &RewriteContext,
    style: SrcsetStyle,
) -> Result<AttributeRecord, DeriveError> {
    let srcset = srcset(&derivatives.original, rewrite, ctx, style)?;
    let srcset_alternates = derivatives
        .alternates
        .iter()
        .map(|(format, set)| Ok((*format, self::srcset(set, rewrite, ctx, style)?)))
        .collect::<Result<BTreeMap<_, _>, DeriveError>>()?;

    let placeholder = match placeholder {
        None => None,
        Some(PlaceholderResult::Inline { data_uri, .. }) => {
            Some(PlaceholderAttributes::Inline(data_uri.clone()))
        }
        Some(PlaceholderResult::Materialized {
            original,
            alternates,
            ..
        }) => Some(PlaceholderAttributes::Materialized {
            src: rewrite.apply(&original.path, ctx)?,
            alternates: alternates
                .iter()
                .map(|(format, d)| Ok((*format, rewrite.apply(&d.path, ctx)?)))
                .collect::<Result<_, DeriveError>>()?,
        }),
    };

    Ok(AttributeRecord {
        srcset,
        srcset_alternates,
        aspect_ratio: derivatives.aspect_ratio,
        placeholder,
    })
}

fn srcset(
    set: &DerivativeSet,
    rewrite: &UrlRewrite,
    ctx: &RewriteContext,
    style: SrcsetStyle,
) -> Result<String, DeriveError> {
    if let (SrcsetStyle::PathOnly, [only]) = (style, set.derivatives.as_slice()) {
        return rewrite.apply(&only.path, ctx);
    }
    let candidates = set
        .derivatives
        .iter()
        .map(|d: &Derivative| Ok(format!("{} {}w", rewrite.apply(&d.path, ctx)?, d.width)))
        .collect::<Result<Vec<_>, DeriveError>>()?;
    Ok(candidates.join(", "))
}
