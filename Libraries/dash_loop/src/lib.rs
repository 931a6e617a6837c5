//! Serves a finite (on-demand) MPEG-DASH presentation as an endless live stream.
//!
//! The [`ManifestEngine`] rewrites a static MPD into a dynamic one at load time and
//! maps the ever-growing fragment numbers a live player requests back onto the
//! finite set of fragment files stored under `<base dir>/<representation id>/`.

pub mod availability;
pub mod engine;
pub mod error;
pub mod mpd;
pub mod probe;
pub mod registry;
pub mod resolver;
pub mod template;

pub use availability::is_available;
pub use engine::ManifestEngine;
pub use error::{ConfigurationError, FormatError, FragmentError, LoadError, SerializeError};
pub use resolver::{FragmentRef, FragmentToken, RepresentationResolver};
