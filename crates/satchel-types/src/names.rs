//! Naming rules shared by configuration and storage.

/// Whether `name` can be used as a session collection.
///
/// Collection names end up in SQL text, so only `[A-Za-z_][A-Za-z0-9_]*` is
/// accepted, and names in SQLite's reserved `sqlite_` namespace are refused.
pub fn is_collection_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.to_ascii_lowercase().starts_with("sqlite_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_names() {
        for good in ["sessions", "_web_sessions2", "sqlite", "my_sqlite_table"] {
            assert!(is_collection_name(good), "{good}");
        }
        for bad in ["", "1abc", "a-b", "drop table;", "sqlite_master", "SQLite_Stat1"] {
            assert!(!is_collection_name(bad), "{bad}");
        }
    }
}
