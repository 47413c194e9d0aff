use std::path::PathBuf;
use thiserror::Error;

/// Fatal and item-level errors raised while opening or materializing a dataset.
///
/// Construction-time failures (missing manifest, bad names source, invalid
/// keypoint shape) abort [`Extractor::open`](crate::Extractor::open) outright.
/// The same type also carries per-item failures, which are routed through the
/// configured [`ErrorPolicy`](crate::policy::ErrorPolicy) instead of
/// propagating directly.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("can't read dataset folder '{path}'")]
    DatasetDirMissing { path: PathBuf },

    #[error("can't read dataset descriptor file '{path}'")]
    ManifestMissing { path: PathBuf },

    #[error("failed to parse dataset descriptor {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid dataset descriptor {path}: {message}")]
    ManifestInvalid { path: PathBuf, message: String },

    #[error("can't find '{subset}' subset list file '{path}'")]
    SubsetListMissing { subset: String, path: PathBuf },

    #[error("can't find '{subset}' subset image folder '{path}'")]
    SubsetFolderMissing { subset: String, path: PathBuf },

    #[error("no names entry in dataset descriptor {path}")]
    NamesMissing { path: PathBuf },

    #[error("failed to parse label names from {path}: {message}")]
    NamesInvalid { path: PathBuf, message: String },

    #[error("invalid keypoint shape: {message}")]
    KeypointShape { message: String },

    #[error("invalid skeleton sub-label hint: {message}")]
    SkeletonHint { message: String },

    #[error("failed to parse dataset meta file {path}: {source}")]
    MetaParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid dataset meta file {path}: {message}")]
    MetaInvalid { path: PathBuf, message: String },

    #[error("failed to parse label registry {path}: {source}")]
    RegistryParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid image size index {path}, line {line}: {message}")]
    SizeIndexInvalid {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("can't find image info for '{path}'")]
    ImageSizeUnavailable { path: PathBuf },

    #[error("failed to read dimensions of image {path}: {source}")]
    ImageProbe {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("unsupported image {path}: {message}")]
    InvalidImage { path: PathBuf, message: String },

    #[error("failed while traversing {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error(transparent)]
    Annotation(#[from] AnnotationError),
}

/// Record-level errors raised while parsing a single annotation.
///
/// These never fail the owning item on their own; the item keeps its
/// remaining valid annotations and the failure is routed through the error
/// policy.
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("unexpected field count {found} in the {kind} description; expected {expected}")]
    FieldCount {
        kind: &'static str,
        found: usize,
        expected: &'static str,
    },

    #[error("can't parse {field} from '{value}'; expected {expected}")]
    FieldParse {
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("undeclared label '{label}'")]
    UndeclaredLabel { label: String },
}
