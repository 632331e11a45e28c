//! SQL identifier quoting utilities.
//!
//! Grammars quote every table and column name that reaches rendered SQL;
//! these functions make arbitrary strings safe to embed as identifiers.

/// Quote a SQL identifier using ANSI double-quoting.
///
/// Embedded double-quotes are escaped by doubling them (`"` → `""`).
/// This function is safe against SQL injection for any input string.
///
/// # Examples
///
/// ```
/// use cerulean_core::quote_ident;
///
/// assert_eq!(quote_ident("posts"), "\"posts\"");
/// assert_eq!(quote_ident("post\"title"), "\"post\"\"title\"");
/// assert_eq!(quote_ident("select"), "\"select\""); // SQL keyword
/// ```
#[inline]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a SQL identifier using MySQL backtick quoting.
///
/// Embedded backticks are escaped by doubling them.
///
/// # Examples
///
/// ```
/// use cerulean_core::quote_ident_mysql;
///
/// assert_eq!(quote_ident_mysql("posts"), "`posts`");
/// assert_eq!(quote_ident_mysql("post`title"), "`post``title`");
/// ```
#[inline]
pub fn quote_ident_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
