//! Operation id to controller method name.

/// Convert a CamelCase identifier into `snake_case`.
///
/// Strings that do not start with an ASCII uppercase letter are returned
/// unchanged. `::` separated segments are joined with `-`. Every uppercase
/// letter starts a new word, so `HTTPGet` becomes `h_t_t_p_get`.
pub fn decamelize(s: &str) -> String {
    if !s.starts_with(|c: char| c.is_ascii_uppercase()) {
        return s.to_string();
    }

    s.split("::")
        .map(|segment| {
            let mut words: Vec<String> = Vec::new();
            for c in segment.chars() {
                match words.last_mut() {
                    Some(word) if !c.is_ascii_uppercase() => word.push(c),
                    _ => words.push(c.to_ascii_lowercase().to_string()),
                }
            }
            words.join("_")
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Upper-case the first character.
pub fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Derive the controller method name for an operation.
///
/// `listPets` becomes `list_pets`. Without an operation id the raw path template is
/// used, which `decamelize` leaves untouched because it starts with `/`.
pub fn method_name_for(operation_id: Option<&str>, path_template: &str) -> String {
    decamelize(&ucfirst(operation_id.unwrap_or(path_template)))
}
