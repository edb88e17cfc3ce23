// Renders a fresh config file from database settings, salts, and extra PHP.
use crate::core::error::{Error, ErrorKind};
use crate::core::transform::render_value;

const TEMPLATE: &str = include_str!("templates/wp-config.php.tmpl");

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateParams {
    pub db_name: String,
    pub db_user: String,
    pub db_pass: String,
    pub db_host: String,
    pub db_prefix: String,
    pub db_charset: String,
    pub db_collate: String,
    pub locale: Option<String>,
    /// `(KEY, secret)` pairs; empty leaves the salt block out.
    pub salts: Vec<(String, String)>,
    pub extra_php: Option<String>,
}

impl TemplateParams {
    pub fn new(db_name: impl Into<String>, db_user: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            db_user: db_user.into(),
            db_pass: String::new(),
            db_host: "localhost".to_string(),
            db_prefix: "wp_".to_string(),
            db_charset: "utf8mb4".to_string(),
            db_collate: String::new(),
            locale: None,
            salts: Vec::new(),
            extra_php: None,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.db_prefix.is_empty()
            || !self
                .db_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("invalid table prefix '{}'", self.db_prefix))
                .with_hint("Table prefixes may only contain letters, digits, and underscores."));
        }
        Ok(())
    }
}

pub fn render(params: &TemplateParams) -> String {
    let mut out = String::with_capacity(TEMPLATE.len() + 1024);
    let mut rest = TEMPLATE;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start..].find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&placeholder(params, &rest[start + 2..start + len]));
        rest = &rest[start + len + 2..];
        // Block placeholders own their line; drop it entirely when they render empty.
        if out.ends_with('\n') && rest.starts_with('\n') {
            rest = &rest[1..];
        }
    }
    out.push_str(rest);
    out
}

fn placeholder(params: &TemplateParams, key: &str) -> String {
    let quoted = |value: &str| render_value(value, false);
    match key {
        "DB_NAME" => quoted(&params.db_name),
        "DB_USER" => quoted(&params.db_user),
        "DB_PASSWORD" => quoted(&params.db_pass),
        "DB_HOST" => quoted(&params.db_host),
        "DB_CHARSET" => quoted(&params.db_charset),
        "DB_COLLATE" => quoted(&params.db_collate),
        "TABLE_PREFIX" => quoted(&params.db_prefix),
        "SALTS" => params
            .salts
            .iter()
            .map(|(key, secret)| format!("define( '{key}', {} );\n", quoted(secret)))
            .collect(),
        "LOCALE" => params
            .locale
            .as_deref()
            .map(|locale| format!("define( 'WPLANG', {} );\n", quoted(locale)))
            .unwrap_or_default(),
        "EXTRA_PHP" => params
            .extra_php
            .as_deref()
            .filter(|php| !php.trim().is_empty())
            .map(|php| format!("{}\n", php.trim_end()))
            .unwrap_or_default(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::anchor::{self, AnchorSpec};
    use crate::core::locator::{self, DefinitionKind, DefinitionValue};

    fn params() -> TemplateParams {
        let mut params = TemplateParams::new("shop", "admin");
        params.db_pass = "it's secret".to_string();
        params.salts = vec![("AUTH_KEY".to_string(), "k{{DB_NAME}}\\".to_string())];
        params
    }

    #[test]
    fn rendered_values_are_locatable() {
        let text = render(&params());
        let value = |kind, name| locator::find(&text, kind, name).map(|def| def.value);
        assert_eq!(
            value(DefinitionKind::Constant, "DB_NAME"),
            Some(DefinitionValue::Quoted("shop".into()))
        );
        assert_eq!(
            value(DefinitionKind::Constant, "DB_PASSWORD"),
            Some(DefinitionValue::Quoted("it's secret".into()))
        );
        assert_eq!(
            value(DefinitionKind::Constant, "AUTH_KEY"),
            Some(DefinitionValue::Quoted("k{{DB_NAME}}\\".into()))
        );
        assert_eq!(
            value(DefinitionKind::Variable, "table_prefix"),
            Some(DefinitionValue::Quoted("wp_".into()))
        );
        assert!(!text.contains("WPLANG"));
    }

    #[test]
    fn template_carries_anchor_and_bootstrap() {
        let text = render(&params());
        assert!(anchor::locate(&text, &AnchorSpec::default()).is_ok());
        assert!(text.contains("require_once ABSPATH . 'wp-settings.php';"));
        assert!(!text.contains("{{"));
    }

    #[test]
    fn optional_blocks_render_when_set() {
        let mut params = params();
        params.locale = Some("de_DE".to_string());
        params.extra_php = Some("define( 'WP_CACHE', true );\n\n".to_string());
        let text = render(&params);
        assert!(text.contains("define( 'WPLANG', 'de_DE' );\n"));
        let extra = text.find("WP_CACHE").expect("extra php");
        let stop = text.find("That's all, stop editing!").expect("anchor");
        assert!(extra < stop);
    }

    #[test]
    fn prefix_is_validated() {
        let mut params = params();
        params.db_prefix = "wp-".to_string();
        assert_eq!(params.validate().unwrap_err().kind(), ErrorKind::Usage);
    }
}
