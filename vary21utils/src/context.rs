/// Enumerated catalog-traversal contexts
/// Generally used for error reporting
#[derive(Debug, Clone)]
pub enum ErrorContext {
    TechFile,
    Group(String),
    Parameter(String),
    Variation(String),
    Unknown,
}
