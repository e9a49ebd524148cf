//! Typed view over well-known settings
//!
//! `SiteSettings` decodes the settings a site build commonly reads. Missing
//! settings decode as `None` or empty; nothing is written back into the
//! effective configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{ConfigError, EffectiveConfig};

/// A `(label, URL)` link, as in `LINKS` and `SOCIAL`. Items after the
/// URL (icon names and the like) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<serde_json::Value>")]
pub struct Link {
    pub label: String,
    pub url: String,
}

impl TryFrom<Vec<serde_json::Value>> for Link {
    type Error = String;

    fn try_from(parts: Vec<serde_json::Value>) -> Result<Self, Self::Error> {
        Ok(Self {
            label: string_item(&parts, 0, "label")?,
            url: string_item(&parts, 1, "URL")?,
        })
    }
}

/// A theme navbar entry: `(title, URL, page slug, [sub-links])`. The slug
/// and sub-links may be left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<serde_json::Value>")]
pub struct NavLink {
    pub title: String,
    pub url: String,
    pub slug: String,
    pub children: Vec<NavLink>,
}

impl TryFrom<Vec<serde_json::Value>> for NavLink {
    type Error = String;

    fn try_from(parts: Vec<serde_json::Value>) -> Result<Self, Self::Error> {
        let slug = match parts.get(2) {
            Some(_) => string_item(&parts, 2, "page slug")?,
            None => String::new(),
        };
        let children = match parts.get(3) {
            None => Vec::new(),
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .map(|item| -> Result<NavLink, String> {
                    match item {
                        serde_json::Value::Array(child) => {
                            let mut link = NavLink::try_from(child.clone())?;
                            link.children.clear();
                            Ok(link)
                        }
                        _ => Err("sub-link must be a sequence".to_string()),
                    }
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err("sub-links must be a sequence".to_string()),
        };
        Ok(Self {
            title: string_item(&parts, 0, "title")?,
            url: string_item(&parts, 1, "URL")?,
            slug,
            children,
        })
    }
}

fn string_item(parts: &[serde_json::Value], index: usize, what: &str) -> Result<String, String> {
    match parts.get(index) {
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(format!("link {} must be a string, found {}", what, other)),
        None => Err(format!("link is missing its {}", what)),
    }
}

/// `DEFAULT_PAGINATION`: `False` or items per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pagination {
    Switch(bool),
    PerPage(u32),
}

/// Theme display options (`M_*`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeOptions {
    #[serde(rename = "M_SITE_LOGO", default)]
    pub site_logo: Option<String>,
    #[serde(rename = "M_SITE_LOGO_TEXT", default)]
    pub site_logo_text: Option<String>,
    #[serde(rename = "M_THEME_COLOR", default)]
    pub theme_color: Option<String>,
    /// (path, MIME type)
    #[serde(rename = "M_FAVICON", default)]
    pub favicon: Option<(String, String)>,
    #[serde(rename = "M_CSS_FILES", default)]
    pub css_files: Vec<String>,
    #[serde(rename = "M_FINE_PRINT", default)]
    pub fine_print: Option<String>,
    #[serde(rename = "M_LINKS_NAVBAR1", default)]
    pub navbar_left: Vec<NavLink>,
    #[serde(rename = "M_LINKS_NAVBAR2", default)]
    pub navbar_right: Vec<NavLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SiteSettings {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub sitename: Option<String>,
    #[serde(default)]
    pub siteurl: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub default_lang: Option<String>,
    #[serde(default)]
    pub default_pagination: Option<Pagination>,
    #[serde(default)]
    pub relative_urls: Option<bool>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub social: Vec<Link>,
    #[serde(default)]
    pub static_paths: Vec<String>,
    #[serde(default)]
    pub extra_path_metadata: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    pub direct_templates: Vec<String>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub theme_static_dir: Option<String>,
    #[serde(default)]
    pub plugin_paths: Vec<String>,
    #[serde(default)]
    pub plugins: Vec<String>,
    #[serde(flatten)]
    pub theme_options: ThemeOptions,
}

impl SiteSettings {
    pub fn from_effective(config: &EffectiveConfig) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(config.settings_json())?)
    }

    /// Destination path for an extra static file, from `EXTRA_PATH_METADATA`.
    pub fn extra_destination(&self, source_path: &str) -> Option<&str> {
        self.extra_path_metadata
            .get(source_path)?
            .get("path")?
            .as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::ConfigFragment;
    use siteconf_syntax::{parse, Value};

    fn config_from(src: &str) -> EffectiveConfig {
        let doc = parse(src).unwrap();
        EffectiveConfig::fold(vec![ConfigFragment::from_pairs(
            doc.assignments.into_iter().map(|a| (a.name, a.value)),
        )])
    }

    #[test]
    fn test_decode_site_settings() {
        let config = config_from(
            r#"
AUTHOR = 'cpauvert'
SITENAME = 'mi-atlas'
SITEURL = ''
DEFAULT_PAGINATION = False
LINKS = (('Pelican', 'https://getpelican.com/'),
         ('Python.org', 'https://www.python.org/'),)
STATIC_PATHS = ["extra"]
EXTRA_PATH_METADATA = {'extra/favicon.ico': {'path': 'favicon.ico'}}
THEME = 'm.css/pelican-theme'
PLUGINS = ['m.htmlsanity', 'm.components']
M_FAVICON = ('extra/favicon.ico', 'image/x-ico')
M_LINKS_NAVBAR1 = [('Framework', 'framework.html', '', []),
                   ('Docs', 'docs.html', 'docs', [('API', 'api.html', 'api')])]
"#,
        );
        let site = SiteSettings::from_effective(&config).unwrap();
        assert_eq!(site.sitename.as_deref(), Some("mi-atlas"));
        assert_eq!(site.siteurl.as_deref(), Some(""));
        assert_eq!(site.default_pagination, Some(Pagination::Switch(false)));
        assert_eq!(site.links.len(), 2);
        assert_eq!(site.links[0].label, "Pelican");
        assert_eq!(site.extra_destination("extra/favicon.ico"), Some("favicon.ico"));
        assert_eq!(site.plugins, vec!["m.htmlsanity", "m.components"]);
        assert_eq!(
            site.theme_options.favicon,
            Some(("extra/favicon.ico".to_string(), "image/x-ico".to_string()))
        );
        assert_eq!(site.theme_options.navbar_left[1].children[0].title, "API");
        assert!(site.social.is_empty());
        assert!(site.timezone.is_none());
    }

    #[test]
    fn test_missing_settings_are_not_invented() {
        let config = config_from("SITENAME = 'x'\n");
        let site = SiteSettings::from_effective(&config).unwrap();
        assert!(site.theme.is_none());
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_wrong_shape_is_decode_error() {
        let config = EffectiveConfig::fold(vec![ConfigFragment::from_pairs([(
            "LINKS",
            Value::Str("https://getpelican.com/".into()),
        )])]);
        let err = SiteSettings::from_effective(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSettings(_)));
    }

    #[test]
    fn test_extra_link_items_are_ignored() {
        let config = config_from(
            "SOCIAL = (('GitHub', 'https://github.com/cpauvert', 'github'),)\n\
             M_LINKS_NAVBAR2 = [('Blog', 'blog.html')]\n",
        );
        let diagnostics = Catalog::builtin().unwrap().check(&config);
        assert!(diagnostics.is_empty());

        let site = SiteSettings::from_effective(&config).unwrap();
        assert_eq!(site.social[0].url, "https://github.com/cpauvert");
        assert_eq!(site.theme_options.navbar_right[0].slug, "");
        assert!(site.theme_options.navbar_right[0].children.is_empty());
    }

    #[test]
    fn test_short_link_is_rejected_by_both() {
        let config = config_from("LINKS = (('Pelican',),)\n");
        assert_eq!(Catalog::builtin().unwrap().check(&config).len(), 1);
        let err = SiteSettings::from_effective(&config).unwrap_err();
        assert!(err.to_string().contains("missing its URL"));
    }

    #[test]
    fn test_pagination_per_page() {
        let config = config_from("DEFAULT_PAGINATION = 10\n");
        let site = SiteSettings::from_effective(&config).unwrap();
        assert_eq!(site.default_pagination, Some(Pagination::PerPage(10)));
    }
}
