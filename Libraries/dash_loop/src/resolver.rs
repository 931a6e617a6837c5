//! Maps unbounded logical fragment numbers onto the finite set of files stored
//! for each representation of one adaptation set.

use std::collections::HashMap;

use crate::error::{ConfigurationError, FragmentError};

/// What a client-supplied fragment token refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum FragmentRef {
    /// A numbered media fragment, wrapped onto the stored files.
    Physical {
        /// The logical number the client asked for (≥ 1).
        fragment_number: u64,
        /// 1-based index of the file on disk, in `[1, fragment_count]`.
        index: u64,
        /// Seconds after stream start at which the fragment becomes available.
        ///
        /// Exact while `fragment_number` stays below 2^53. Past that the value
        /// is rounded to the nearest `f64`, which is still billions of years
        /// after the start, so the availability decision is unaffected.
        presentation_time: f64,
    },
    /// A non-numeric token (e.g. an initialization segment name), served as-is.
    Passthrough(String),
}

impl FragmentRef {
    /// Name of the file inside the representation's directory.
    pub fn file_name(&self) -> String {
        match self {
            FragmentRef::Physical { index, .. } => index.to_string(),
            FragmentRef::Passthrough(token) => token.clone(),
        }
    }

    /// Passthrough tokens are not on the timeline and report zero.
    pub fn presentation_time(&self) -> f64 {
        match self {
            FragmentRef::Physical { presentation_time, .. } => *presentation_time,
            FragmentRef::Passthrough(_) => 0.0,
        }
    }
}

/// How a fragment token parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentToken<'a> {
    Number(u64),
    /// Numeric, but zero, negative or too large for `u64`.
    OutOfRange,
    /// Not a number; may name a file directly.
    Name(&'a str),
    /// Would escape the representation directory.
    Unsafe,
}

impl<'a> FragmentToken<'a> {
    pub fn parse(token: &'a str) -> Self {
        let digits = token
            .strip_prefix('+')
            .or_else(|| token.strip_prefix('-'))
            .unwrap_or(token);
        let numeric = !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());

        if numeric {
            if token.starts_with('-') {
                return FragmentToken::OutOfRange;
            }
            return match digits.parse::<u64>() {
                Ok(0) | Err(_) => FragmentToken::OutOfRange,
                Ok(n) => FragmentToken::Number(n),
            };
        }

        if token.is_empty() || token == "." || token == ".." || token.contains(['/', '\\']) {
            FragmentToken::Unsafe
        } else {
            FragmentToken::Name(token)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RepresentationInfo {
    fragment_count: u64,
    segment_duration: f64,
}

/// The representations of one adaptation set and their stored fragment counts.
#[derive(Debug, Clone, Default)]
pub struct RepresentationResolver {
    representations: HashMap<String, RepresentationInfo>,
}

impl RepresentationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a representation. Called once per representation at load time.
    pub fn register(
        &mut self,
        representation_id: &str,
        fragment_count: u64,
        segment_duration: f64,
    ) -> Result<(), ConfigurationError> {
        if fragment_count == 0 {
            return Err(ConfigurationError::NoFragments {
                representation_id: representation_id.to_string(),
                path: Default::default(),
            });
        }
        if self.representations.contains_key(representation_id) {
            return Err(ConfigurationError::DuplicateRepresentation {
                representation_id: representation_id.to_string(),
            });
        }
        self.representations.insert(
            representation_id.to_string(),
            RepresentationInfo {
                fragment_count,
                segment_duration,
            },
        );
        Ok(())
    }

    pub fn has_representation(&self, representation_id: &str) -> bool {
        self.representations.contains_key(representation_id)
    }

    pub fn fragment_count(&self, representation_id: &str) -> Option<u64> {
        self.representations.get(representation_id).map(|r| r.fragment_count)
    }

    pub fn segment_duration(&self, representation_id: &str) -> Option<f64> {
        self.representations.get(representation_id).map(|r| r.segment_duration)
    }

    pub fn representation_ids(&self) -> impl Iterator<Item = &str> {
        self.representations.keys().map(String::as_str)
    }

    /// Resolves a client token for `representation_id`.
    ///
    /// Fragment `n` wraps to file `((n - 1) mod fragment_count) + 1`, while its
    /// presentation time keeps growing with the unwrapped number
    /// (`n * segment_duration`).
    pub fn resolve(&self, representation_id: &str, token: &str) -> Result<FragmentRef, FragmentError> {
        let info = self
            .representations
            .get(representation_id)
            .ok_or_else(|| FragmentError::NotFound {
                representation_id: representation_id.to_string(),
            })?;

        match FragmentToken::parse(token) {
            FragmentToken::Number(n) => Ok(FragmentRef::Physical {
                fragment_number: n,
                index: (n - 1) % info.fragment_count + 1,
                presentation_time: n as f64 * info.segment_duration,
            }),
            FragmentToken::Name(name) => Ok(FragmentRef::Passthrough(name.to_string())),
            FragmentToken::OutOfRange | FragmentToken::Unsafe => Err(FragmentError::InvalidFragment {
                token: token.to_string(),
            }),
        }
    }
}
