//! Command-line requirement declarations.
//!
//! One argument per requirement:
//!
//! ```text
//! [?]NAME[CONSTRAINT][;IMPORT]...
//!
//! IMPORT := [import ]MOD[ as ALIAS][, MOD[ as ALIAS]]...
//!         | from MOD import NAME[ as ALIAS][, NAME[ as ALIAS]]...
//! ```
//!
//! A leading `?` marks the requirement optional. Example:
//! `"pymongo>=3.11.4,<4.0.0;import pymongo;from bson import ObjectId"`.

use rundeps_core::{DependencyManager, Error, ImportSpec, ModuleResolver, VersionQuery};

/// A parsed declaration, not yet validated by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub constraint: String,
    pub optional: bool,
    pub imports: Vec<ImportSpec>,
}

impl Declaration {
    pub fn parse(input: &str) -> Result<Self, Error> {
        let invalid = |reason: &str| Error::InvalidRequirement {
            name: input.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = input.split(';');
        let head = segments.next().unwrap_or_default().trim();

        let (optional, head) = match head.strip_prefix('?') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, head),
        };

        let name_len = head
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
            .unwrap_or(head.len());
        let (name, constraint) = head.split_at(name_len);
        if name.is_empty() {
            return Err(invalid("missing package name"));
        }

        let mut imports = Vec::new();
        for segment in segments.map(str::trim).filter(|s| !s.is_empty()) {
            parse_import(segment, &mut imports).map_err(|reason| invalid(&reason))?;
        }

        Ok(Self {
            name: name.to_string(),
            constraint: constraint.trim().to_string(),
            optional,
            imports,
        })
    }

    /// Declare this requirement on `manager` through the builder API.
    pub fn apply<H>(&self, manager: &mut DependencyManager<H>) -> Result<(), Error>
    where
        H: ModuleResolver + VersionQuery,
    {
        let requirement = manager.package(&self.name, &self.constraint, self.optional)?;
        for spec in &self.imports {
            match spec.source() {
                Some(source) => requirement.from_module(source).import_module(spec.target()),
                None => requirement.import_module(spec.target()),
            };
            if let Some(alias) = spec.alias() {
                requirement.as_module(alias);
            }
        }
        Ok(())
    }
}

fn parse_import(segment: &str, out: &mut Vec<ImportSpec>) -> Result<(), String> {
    if let Some(rest) = segment.strip_prefix("from ") {
        let (source, names) = rest
            .split_once(" import ")
            .ok_or_else(|| format!("expected 'from MOD import NAME' in '{segment}'"))?;
        let source = source.trim();
        check_dotted(source, segment)?;
        for item in names.split(',') {
            let (target, alias) = parse_item(item, segment)?;
            let spec = ImportSpec::from_import(source, target);
            out.push(match alias {
                Some(alias) => spec.with_alias(alias),
                None => spec,
            });
        }
        return Ok(());
    }

    let modules = segment.strip_prefix("import ").unwrap_or(segment);
    for item in modules.split(',') {
        let (target, alias) = parse_item(item, segment)?;
        check_dotted(target, segment)?;
        let spec = ImportSpec::direct(target);
        out.push(match alias {
            Some(alias) => spec.with_alias(alias),
            None => spec,
        });
    }
    Ok(())
}

/// `NAME` or `NAME as ALIAS`.
fn parse_item<'a>(item: &'a str, segment: &str) -> Result<(&'a str, Option<&'a str>), String> {
    let words: Vec<&str> = item.split_whitespace().collect();
    let (target, alias) = match words.as_slice() {
        [target] => (*target, None),
        [target, "as", alias] => (*target, Some(*alias)),
        _ => return Err(format!("cannot parse import '{}' in '{segment}'", item.trim())),
    };

    if !is_identifier_path(target) {
        return Err(format!("invalid import name '{target}' in '{segment}'"));
    }
    if let Some(alias) = alias {
        if !is_identifier(alias) {
            return Err(format!("invalid alias '{alias}' in '{segment}'"));
        }
    }
    Ok((target, alias))
}

fn check_dotted(path: &str, segment: &str) -> Result<(), String> {
    if is_identifier_path(path) {
        Ok(())
    } else {
        Err(format!("invalid module path '{path}' in '{segment}'"))
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn is_identifier_path(s: &str) -> bool {
    s.split('.').all(is_identifier)
}
