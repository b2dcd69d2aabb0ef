//! # propsub - property substitution for build resources
//!
//! For CLI usage see the `README.md` of the repository.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `propsub` works internally.
//!
//! ### Terms
//!
//! - a **property** is a key/value pair, both are strings
//! - a **layer** is one source of properties (environment, project, inline configuration, a properties file)
//! - a **token** is a `${...}` placeholder in a text file that refers to a property
//! - a **resource file** is a file produced by the build that may contain tokens
//!
//! ### Building the property mapping
//!
//! see [properties::PropertyStore]
//!
//! Layers are applied in a fixed order, later ones replacing keys of earlier ones:
//!
//! | layer                              | enabled by                       | example key        |
//! |------------------------------------|----------------------------------|--------------------|
//! | [properties::SystemProperties]     | `includeSystemProperties`        | `env.HOME`         |
//! | [properties::ProjectProperties]    | `includeProjectProperties`       | `project.version`  |
//! | inline properties                  | always                           | anything           |
//! | [properties::PropertiesFile]       | `propertiesFile` set             | anything           |
//!
//! The result is a [properties::Properties] value that is never modified afterwards. If any layer fails to load
//! (unknown encoding, unreadable file, ...) the run stops with a [properties::ConfigurationError] before a single
//! resource file was opened.
//!
//! ### Resolving a line
//!
//! see [resolver::Resolver] and [expression]
//!
//! ```
//! # use propsub::{properties, resolver::resolve};
//! let properties = properties! {
//!     "name" => "world",
//!     "greeting" => "hello ${name}",
//! };
//!
//! assert_eq!(resolve(&properties, "${greeting}!").resolved, "hello world!");
//! assert_eq!(resolve(&properties, "${unknown}").resolved, "${unknown}");
//! assert_eq!(resolve(&properties, "${unknown:fallback}").resolved, "fallback");
//! assert_eq!(resolve(&properties, "$${name}").resolved, "${name}");
//! ```
//!
//! Unknown keys are not an error. A build can run the same substitution over many files and each file only gets
//! what is defined, everything else stays visible as `${...}` in the output.
//!
//! Values are expanded recursively. The resolver keeps the keys currently being expanded on a stack, a key that
//! refers back to itself (directly or through other keys) stops expanding at that point.
//!
//! ### Rewriting files
//!
//! see [rewrite::FileRewriter]
//!
//! Files are processed one after another. Each file is read line by line and every line is resolved. From the first
//! changed line on the output goes to a scratch file, files without a changed line are left alone. Changed files are verified and then atomically
//! renamed into place, so at any point in time the path holds either the complete old or the complete new content.
//!
//! Failing to read or write a file stops the run ([rewrite::RewriteError]), a failed verification is only logged
//! ([rewrite::CopyVerificationError]) and reported in the [rewrite::Summary].
//!
pub mod config;
pub mod discovery;
pub mod encoding;
pub mod expression;
pub mod properties;
pub mod properties_file;
pub mod resolver;
pub mod rewrite;
pub mod value;
