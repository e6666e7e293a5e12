use std::fmt;

/// A source or destination table, optionally schema-qualified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableLocation {
    pub schema: Option<String>,
    pub name: String,
}

impl TableLocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Same schema, name extended with `suffix` (`account` -> `account_backup`).
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self {
            schema: self.schema.clone(),
            name: format!("{}{}", self.name, suffix),
        }
    }

    /// Render as a quoted PostgreSQL identifier safe to splice into SQL.
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_identifier(schema), quote_identifier(&self.name)),
            None => quote_identifier(&self.name),
        }
    }
}

impl fmt::Display for TableLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_are_quoted() {
        assert_eq!(TableLocation::new("transaction").quoted(), r#""transaction""#);
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let loc = TableLocation::new(r#"evil"; DROP TABLE account; --"#);
        assert_eq!(loc.quoted(), r#""evil""; DROP TABLE account; --""#);
    }

    #[test]
    fn schema_is_quoted_separately() {
        let loc = TableLocation::with_schema("audit", "Account");
        assert_eq!(loc.quoted(), r#""audit"."Account""#);
        assert_eq!(loc.to_string(), "audit.Account");
    }

    #[test]
    fn backup_keeps_schema() {
        let backup = TableLocation::with_schema("audit", "account").with_suffix("_backup");
        assert_eq!(backup, TableLocation::with_schema("audit", "account_backup"));
    }
}
