//! Settings-file syntax for static-site configuration.
//!
//! A settings file is a sequence of `NAME = expression` statements whose
//! right sides are literals (strings, numbers, booleans, `None`) and
//! collections (tuples, lists, dicts), optionally combined with `+` and
//! references to names bound earlier.

mod error;
mod lexer;
mod parser;
mod value;

pub use error::SyntaxError;
pub use parser::{
    parse, parse_expression, parse_with_scope, Assignment, Document, EmptyScope, Import, Scope,
};
pub use value::Value;

/// Whether `name` is a valid setting identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("SITENAME"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("M_LINKS_NAVBAR1"));
        assert!(!is_identifier("1ST"));
        assert!(!is_identifier("A-B"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_parse_reference_settings_file() {
        let src = r#"#!/usr/bin/env python
# -*- coding: utf-8 -*- #

AUTHOR = 'cpauvert'
SITENAME = 'mi-atlas'
SITEURL = ''

PATH = 'content'

# Blogroll
LINKS = (('Pelican', 'https://getpelican.com/'),
         ('You can modify those links in your config file', '#'),)

STATIC_PATHS = ["extra"]
ARCHIVES_SAVE_AS = ""

M_CSS_FILES = ['https://fonts.googleapis.com/css?family=Source+Sans+Pro:400,400i,600,600i%7CSource+Code+Pro:400,400i,600',
                       '/static/m-dark.css']
M_FAVICON = ('extra/favicon.ico', 'image/x-ico')
M_FINE_PRINT = SITENAME + """. Powered by `Pelican <https://getpelican.com>`_
and `m.css <https://mcss.mosra.cz>`_. """

M_LINKS_NAVBAR1 = [('Framework', 'framework.html', '', []),
                  ('Github', 'https://github.com/cpauvert/mi-atlas', '', [])]
"#;
        let doc = parse(src).unwrap();
        let names: Vec<&str> = doc.assignments.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "AUTHOR",
                "SITENAME",
                "SITEURL",
                "PATH",
                "LINKS",
                "STATIC_PATHS",
                "ARCHIVES_SAVE_AS",
                "M_CSS_FILES",
                "M_FAVICON",
                "M_FINE_PRINT",
                "M_LINKS_NAVBAR1",
            ]
        );
        let fine_print = doc.assignments[9].value.as_str().unwrap();
        assert!(fine_print.starts_with("mi-atlas. Powered by"));
        let navbar = doc.assignments[10].value.as_seq().unwrap();
        assert_eq!(navbar.len(), 2);
        assert_eq!(navbar[1].as_seq().unwrap()[3], Value::List(vec![]));
    }
}
