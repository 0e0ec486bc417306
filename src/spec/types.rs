use crate::validator::Schema;
use http::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Where a parameter's raw value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Query,
    Path,
    Header,
    FormData,
    Body,
}

impl ParameterLocation {
    /// Parse the `in` field of a parameter object.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "query" => Some(ParameterLocation::Query),
            "path" => Some(ParameterLocation::Path),
            "header" => Some(ParameterLocation::Header),
            "formData" => Some(ParameterLocation::FormData),
            "body" => Some(ParameterLocation::Body),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Query => "query",
            ParameterLocation::Path => "path",
            ParameterLocation::Header => "header",
            ParameterLocation::FormData => "formData",
            ParameterLocation::Body => "body",
        }
    }
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoding used to pack an array-valued parameter into one string field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionFormat {
    Csv,
    Ssv,
    Tsv,
    Pipes,
    /// Every occurrence of the key contributes one element (query/formData only)
    Multi,
}

impl CollectionFormat {
    /// Unknown formats fall back to comma separation.
    pub fn parse(s: &str) -> Self {
        match s {
            "ssv" => CollectionFormat::Ssv,
            "tsv" => CollectionFormat::Tsv,
            "pipes" => CollectionFormat::Pipes,
            "multi" => CollectionFormat::Multi,
            _ => CollectionFormat::Csv,
        }
    }

    pub fn delimiter(&self) -> char {
        match self {
            CollectionFormat::Ssv => ' ',
            CollectionFormat::Tsv => '\t',
            CollectionFormat::Pipes => '|',
            CollectionFormat::Csv | CollectionFormat::Multi => ',',
        }
    }
}

/// Routing placeholder flavour used when a `{name}` token is compiled.
///
/// * `Standard` (`:name`) matches up to the next `/` or `.`
/// * `Relaxed` (`#name`) matches up to the next `/`
/// * `Wildcard` (`*name`) matches the rest of the path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderKind {
    #[default]
    Standard,
    Relaxed,
    Wildcard,
}

impl PlaceholderKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            ":" | "standard" => Some(PlaceholderKind::Standard),
            "#" | "relaxed" => Some(PlaceholderKind::Relaxed),
            "*" | "wildcard" => Some(PlaceholderKind::Wildcard),
            _ => None,
        }
    }

    pub fn sigil(&self) -> char {
        match self {
            PlaceholderKind::Standard => ':',
            PlaceholderKind::Relaxed => '#',
            PlaceholderKind::Wildcard => '*',
        }
    }

    pub(crate) fn from_sigil(c: char) -> Option<Self> {
        match c {
            ':' => Some(PlaceholderKind::Standard),
            '#' => Some(PlaceholderKind::Relaxed),
            '*' => Some(PlaceholderKind::Wildcard),
            _ => None,
        }
    }
}

/// One declared parameter of an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub location: ParameterLocation,
    /// Declared `type` (absent for body parameters, which carry a full schema)
    pub param_type: Option<String>,
    pub required: bool,
    pub default: Option<Value>,
    pub collection_format: Option<CollectionFormat>,
    /// `items.type` for array parameters
    pub item_type: Option<String>,
    pub placeholder: PlaceholderKind,
    /// Body parameters: the `schema` object.
    /// Everything else: `{"type":"object","properties":{name: <param as schema>}}`.
    pub schema: Schema,
    /// Body parameters only: `{name}` as a required property, checked when
    /// the body never arrived so the error lands at `/<name>`.
    pub missing_schema: Option<Schema>,
}

impl ParameterSpec {
    pub fn is_body(&self) -> bool {
        self.location == ParameterLocation::Body
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.param_type.as_deref(), Some("integer") | Some("number"))
    }

    pub fn is_boolean(&self) -> bool {
        self.param_type.as_deref() == Some("boolean")
    }

    pub fn is_array(&self) -> bool {
        self.param_type.as_deref() == Some("array") || self.collection_format.is_some()
    }
}

/// Response declaration for one status code (or `default`).
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSpec {
    /// `None` means no output constraint for this status
    pub schema: Option<Schema>,
}

/// Responses keyed by the literal status string (`"200"`, `"404"`, `"default"`).
pub type Responses = BTreeMap<String, ResponseSpec>;

/// Everything needed to serve one (method, path) pair.
///
/// Created once when the specification is compiled and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    pub method: Method,
    /// Path template as written in the document, e.g. `/pets/{id}`
    pub path_template: String,
    /// Mount prefix + template with routing placeholders, e.g. `/api/pets/:id`
    pub route_template: Arc<str>,
    pub operation_id: Option<String>,
    pub method_name: String,
    pub controller_name: String,
    pub around_hook: Option<String>,
    pub parameters: Vec<ParameterSpec>,
    pub responses: Responses,
    /// Path parameter defaults, applied by the router when a trailing placeholder is omitted
    pub defaults: BTreeMap<String, Value>,
}

impl OperationDescriptor {
    /// The operation id, or the raw path template when the document declares none.
    pub fn display_id(&self) -> &str {
        self.operation_id.as_deref().unwrap_or(&self.path_template)
    }

    /// Schema registered for `status`, falling back to `default`.
    ///
    /// Returns `None` when neither exists or the matching entry declares no schema.
    pub fn response_schema(&self, status: u16) -> Option<&Schema> {
        self.responses
            .get(status.to_string().as_str())
            .or_else(|| self.responses.get("default"))
            .and_then(|r| r.schema.as_ref())
    }

    /// Every parameter and response schema the operation validates against.
    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.parameters
            .iter()
            .flat_map(|p| std::iter::once(&p.schema).chain(p.missing_schema.as_ref()))
            .chain(self.responses.values().filter_map(|r| r.schema.as_ref()))
    }
}
