//! Module: identity
//! Responsibility: canonical string encoding and decoding of type
//! identities, generic arguments included.
//! Does not own: the registry that resolves an identity to a live type.
//!
//! Invariants:
//! - A type name never contains the segment separator or bracket/arity
//!   structure characters; construction rejects them.
//! - The encoded form round-trips: `parse(encode(id)) == id`.
//! - Generic argument blocks are bracket-balanced; parsing tracks depth
//!   instead of splitting naively, so nested generics survive.


use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use thiserror::Error as ThisError;

/// Arity marker separating a generic type name from its argument count.
pub const ARITY_MARKER: char = '`';

///
/// DiscriminatorError
///

#[derive(Debug, ThisError)]
pub enum DiscriminatorError {
    #[error("discriminator is empty")]
    Empty,

    #[error("generic arity '{arity}' is not a positive count")]
    InvalidArity { arity: String },

    #[error("generic arity {arity} does not match {found} argument(s)")]
    ArityMismatch { arity: usize, found: usize },

    #[error("discriminator has {found} segment(s); need at least type and module")]
    MissingModule { found: usize },

    #[error("discriminator has {found} segments; at most type, module, and version")]
    TooManySegments { found: usize },

    #[error("discriminator segment is empty")]
    EmptySegment,

    #[error("name '{name}' contains a reserved structure character")]
    ReservedCharacter { name: String },

    #[error("generic argument block is not bracket-balanced")]
    UnbalancedBrackets,

    #[error("no registered type matches '{discriminator}'")]
    TypeNotFound { discriminator: String },
}

///
/// TypeIdentity
///
/// Canonical identity of a type: name, defining module, optional module
/// version, and generic arguments. Immutable once constructed.
///
/// Encoded forms (wire-stable):
/// - non-generic: `TypeName, ModuleName` or `TypeName, ModuleName, Version`
/// - generic:     ``TypeName`N[[Arg1],[Arg2]], ModuleName[, Version]``
///   where each argument is itself an encoded, bracket-delimited
///   discriminator.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct TypeIdentity {
    type_name: String,
    module_name: String,
    module_version: Option<String>,
    generic_args: Vec<TypeIdentity>,
}

impl TypeIdentity {
    /// Construct a non-generic, unversioned identity.
    pub fn new(
        type_name: impl Into<String>,
        module_name: impl Into<String>,
    ) -> Result<Self, DiscriminatorError> {
        let type_name = type_name.into();
        let module_name = module_name.into();

        check_name(&type_name)?;
        check_segment(&module_name)?;

        Ok(Self {
            type_name,
            module_name,
            module_version: None,
            generic_args: Vec::new(),
        })
    }

    /// Construct an identity carrying a module version.
    pub fn versioned(
        type_name: impl Into<String>,
        module_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, DiscriminatorError> {
        let version = version.into();
        check_segment(&version)?;

        let mut id = Self::new(type_name, module_name)?;
        id.module_version = Some(version);

        Ok(id)
    }

    /// Attach generic arguments, turning this into a generic identity.
    #[must_use]
    pub fn with_args(mut self, args: Vec<Self>) -> Self {
        self.generic_args = args;
        self
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    #[must_use]
    pub fn module_version(&self) -> Option<&str> {
        self.module_version.as_deref()
    }

    #[must_use]
    pub fn generic_args(&self) -> &[Self] {
        &self.generic_args
    }

    #[must_use]
    pub fn is_generic(&self) -> bool {
        !self.generic_args.is_empty()
    }

    /// Encode the wire-stable string form.
    ///
    /// The module version is written only when `enforce_version` is set
    /// and the identity actually carries one.
    #[must_use]
    pub fn encode(&self, enforce_version: bool) -> String {
        let mut out = String::new();
        out.push_str(&self.type_name);

        if !self.generic_args.is_empty() {
            out.push(ARITY_MARKER);
            out.push_str(&self.generic_args.len().to_string());
            out.push('[');
            for (i, arg) in self.generic_args.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push('[');
                out.push_str(&arg.encode(enforce_version));
                out.push(']');
            }
            out.push(']');
        }

        out.push_str(", ");
        out.push_str(&self.module_name);

        if enforce_version {
            if let Some(version) = &self.module_version {
                out.push_str(", ");
                out.push_str(version);
            }
        }

        out
    }

    /// Parse an encoded discriminator.
    pub fn parse(input: &str) -> Result<Self, DiscriminatorError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(DiscriminatorError::Empty);
        }

        // The arity marker, when present, always precedes the first
        // separator; anything after the first comma belongs to module
        // or version segments (or to bracketed argument blocks, which
        // the generic path consumes before splitting).
        let first_comma = input.find(',').unwrap_or(input.len());
        match input.find(ARITY_MARKER) {
            Some(tick) if tick < first_comma => parse_generic(input, tick),
            _ => parse_simple(input),
        }
    }

    /// Registry path: `module::Type`, generic arguments included for
    /// closed generic identities.
    #[must_use]
    pub fn canonical_path(&self) -> String {
        let mut path = format!("{}::{}", self.module_name, self.type_name);
        if !self.generic_args.is_empty() {
            path.push('<');
            for (i, arg) in self.generic_args.iter().enumerate() {
                if i > 0 {
                    path.push(',');
                }
                path.push_str(&arg.canonical_path());
            }
            path.push('>');
        }

        path
    }

    /// Registry path of the open generic definition this identity
    /// closes over, e.g. ``module::Wrapper`1``.
    #[must_use]
    pub fn definition_path(&self) -> String {
        format!(
            "{}::{}{}{}",
            self.module_name,
            self.type_name,
            ARITY_MARKER,
            self.generic_args.len()
        )
    }
}

impl Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode(false))
    }
}

impl FromStr for TypeIdentity {
    type Err = DiscriminatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ── Construction checks ─────────────────

fn check_name(name: &str) -> Result<(), DiscriminatorError> {
    if name.is_empty() {
        return Err(DiscriminatorError::EmptySegment);
    }
    if name.contains([',', '[', ']', ARITY_MARKER]) {
        return Err(DiscriminatorError::ReservedCharacter {
            name: name.to_string(),
        });
    }

    Ok(())
}

fn check_segment(segment: &str) -> Result<(), DiscriminatorError> {
    if segment.is_empty() {
        return Err(DiscriminatorError::EmptySegment);
    }
    if segment.contains(',') {
        return Err(DiscriminatorError::ReservedCharacter {
            name: segment.to_string(),
        });
    }

    Ok(())
}

// ── Parsing ─────────────────

fn parse_simple(input: &str) -> Result<TypeIdentity, DiscriminatorError> {
    if input.contains(['[', ']']) {
        return Err(DiscriminatorError::UnbalancedBrackets);
    }

    let segments: Vec<&str> = input.split(',').map(str::trim).collect();
    match segments.as_slice() {
        [name, module] => TypeIdentity::new(*name, *module),
        [name, module, version] => TypeIdentity::versioned(*name, *module, *version),
        _ if segments.len() < 2 => Err(DiscriminatorError::MissingModule {
            found: segments.len(),
        }),
        _ => Err(DiscriminatorError::TooManySegments {
            found: segments.len(),
        }),
    }
}

fn parse_generic(input: &str, tick: usize) -> Result<TypeIdentity, DiscriminatorError> {
    let type_name = input[..tick].trim();
    let rest = &input[tick + ARITY_MARKER.len_utf8()..];

    let block_start = rest
        .find('[')
        .ok_or(DiscriminatorError::UnbalancedBrackets)?;
    let arity_text = &rest[..block_start];
    let arity: usize = arity_text
        .parse()
        .map_err(|_| DiscriminatorError::InvalidArity {
            arity: arity_text.to_string(),
        })?;
    if arity == 0 {
        return Err(DiscriminatorError::InvalidArity {
            arity: arity_text.to_string(),
        });
    }

    let (args_block, after) = split_balanced(&rest[block_start..])?;
    let arg_texts = split_args(args_block)?;
    if arg_texts.len() != arity {
        return Err(DiscriminatorError::ArityMismatch {
            arity,
            found: arg_texts.len(),
        });
    }

    let generic_args = arg_texts
        .into_iter()
        .map(TypeIdentity::parse)
        .collect::<Result<Vec<_>, _>>()?;

    // Remainder after the argument block: `, Module[, Version]`.
    let tail = after
        .trim_start()
        .strip_prefix(',')
        .ok_or(DiscriminatorError::MissingModule { found: 1 })?;
    let segments: Vec<&str> = tail.split(',').map(str::trim).collect();
    let base = match segments.as_slice() {
        [module] => TypeIdentity::new(type_name, *module)?,
        [module, version] => TypeIdentity::versioned(type_name, *module, *version)?,
        _ => {
            return Err(DiscriminatorError::TooManySegments {
                found: segments.len() + 1,
            });
        }
    };

    Ok(base.with_args(generic_args))
}

/// Split `[…]…` at the bracket matching the leading one. Returns the
/// block interior and the remainder after the matching close bracket.
fn split_balanced(block: &str) -> Result<(&str, &str), DiscriminatorError> {
    debug_assert!(block.starts_with('['));

    let mut depth = 0usize;
    for (i, ch) in block.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&block[1..i], &block[i + 1..]));
                }
            }
            _ => {}
        }
    }

    Err(DiscriminatorError::UnbalancedBrackets)
}

/// Split a `[A],[B],…` interior into per-argument slices, tracking
/// bracket depth so argument strings containing brackets stay whole.
fn split_args(interior: &str) -> Result<Vec<&str>, DiscriminatorError> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, ch) in interior.char_indices() {
        match ch {
            '[' => {
                if depth == 0 {
                    start = i + 1;
                }
                depth += 1;
            }
            ']' => {
                if depth == 0 {
                    return Err(DiscriminatorError::UnbalancedBrackets);
                }
                depth -= 1;
                if depth == 0 {
                    args.push(&interior[start..i]);
                }
            }
            ',' if depth == 0 => {}
            c if depth == 0 && !c.is_whitespace() => {
                return Err(DiscriminatorError::UnbalancedBrackets);
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(DiscriminatorError::UnbalancedBrackets);
    }

    Ok(args)
}
