//! Name inflection for relation conventions.
//!
//! Relation defaults are derived from names: a belongs-to called `author`
//! gets the foreign key `author_id`, its inverse on the owner is the
//! pluralized model name, and accessor names are built from the singular
//! form. These helpers implement those derivations.

/// Convert a name to snake_case.
///
/// # Examples
///
/// ```
/// use cerulean_core::inflect::snake_case;
///
/// assert_eq!(snake_case("BlogPost"), "blog_post");
/// assert_eq!(snake_case("blogPost"), "blog_post");
/// assert_eq!(snake_case("blog_post"), "blog_post");
/// assert_eq!(snake_case("HTTPServer"), "http_server");
/// ```
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && chars[i - 1].is_lowercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if prev_lower || (prev_upper && next_lower) {
                out.push('_');
            }
            for lower in c.to_lowercase() {
                out.push(lower);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Pluralize an English noun.
///
/// Handles the regular patterns relation names use; irregular nouns keep
/// their regular-rule form and can be overridden at relation definition.
///
/// # Examples
///
/// ```
/// use cerulean_core::inflect::pluralize;
///
/// assert_eq!(pluralize("post"), "posts");
/// assert_eq!(pluralize("category"), "categories");
/// assert_eq!(pluralize("box"), "boxes");
/// assert_eq!(pluralize("key"), "keys");
/// ```
pub fn pluralize(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    if let Some(stem) = name.strip_suffix('y') {
        if !stem.is_empty() && !ends_in_vowel(stem) {
            return format!("{stem}ies");
        }
    }
    if name.ends_with('s')
        || name.ends_with('x')
        || name.ends_with('z')
        || name.ends_with("ch")
        || name.ends_with("sh")
    {
        return format!("{name}es");
    }
    format!("{name}s")
}

/// Singularize an English noun, the inverse of [`pluralize`].
///
/// # Examples
///
/// ```
/// use cerulean_core::inflect::singularize;
///
/// assert_eq!(singularize("posts"), "post");
/// assert_eq!(singularize("categories"), "category");
/// assert_eq!(singularize("boxes"), "box");
/// assert_eq!(singularize("keys"), "key");
/// ```
pub fn singularize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    if let Some(stem) = name.strip_suffix("es") {
        if stem.ends_with('x')
            || stem.ends_with('z')
            || stem.ends_with("ch")
            || stem.ends_with("sh")
            || stem.ends_with('s')
        {
            return stem.to_string();
        }
    }
    if let Some(stem) = name.strip_suffix('s') {
        if !stem.is_empty() && !stem.ends_with('s') {
            return stem.to_string();
        }
    }
    name.to_string()
}

fn ends_in_vowel(s: &str) -> bool {
    s.chars()
        .next_back()
        .is_some_and(|c| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'))
}
