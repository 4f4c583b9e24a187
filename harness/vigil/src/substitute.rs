//! `%`-substitutions in RUN commands.

use std::path::Path;

use rustc_hash::FxHashMap;

/// Errors expanding a command template.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SubstituteError {
    #[error("unterminated `{0}(`")]
    Unterminated(&'static str),
    #[error("unknown prerequisite `{0}` in %prereq(...)")]
    UnknownPrerequisite(String),
}

/// An ordered substitution table.
///
/// At each `%`, the longest matching key wins, so `%target-run` is never
/// clobbered by a shorter `%t`.
#[derive(Clone, Debug, Default)]
pub struct Substitutions {
    /// Sorted by descending key length, then key.
    table: Vec<(String, String)>,
    prerequisites: FxHashMap<String, String>,
}

impl Substitutions {
    /// The per-fixture built-ins: `%s`, `%S`, `%t`, `%T`.
    pub fn for_fixture(fixture: &Path, output: &Path, workspace: &Path) -> Self {
        let dir = fixture.parent().unwrap_or_else(|| Path::new("."));
        let mut subs = Substitutions::default();
        subs.insert("%s", path_str(fixture));
        subs.insert("%S", path_str(dir));
        subs.insert("%t", path_str(output));
        subs.insert("%T", path_str(workspace));
        subs
    }

    /// Add `key => value`, replacing any existing entry for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.table.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.table.push((key, value)),
        }
        self.table
            .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    }

    /// Add suite substitutions. Their values may use the built-ins already
    /// present (`%t`, `%S`, ...), which are expanded now.
    pub fn extend_from_config<'a>(
        &mut self,
        entries: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Result<(), SubstituteError> {
        let builtins = self.clone();
        for (key, value) in entries {
            let value = builtins.apply(value)?;
            self.insert(key.clone(), value);
        }
        Ok(())
    }

    /// Make `%prereq(name)` expand to `dir`.
    pub fn add_prerequisite(&mut self, name: impl Into<String>, dir: &Path) {
        self.prerequisites.insert(name.into(), path_str(dir));
    }

    /// Expand every substitution in `template`.
    ///
    /// Unknown `%word` sequences are left as written.
    pub fn apply(&self, template: &str) -> Result<String, SubstituteError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            rest = &rest[pos..];

            if let Some(after) = rest.strip_prefix("%%") {
                out.push('%');
                rest = after;
            } else if let Some(after) = rest.strip_prefix("%empty-directory(") {
                let (inner, after) =
                    split_parenthesized(after).ok_or(SubstituteError::Unterminated("%empty-directory"))?;
                let dir = self.apply(inner)?;
                out.push_str(&format!("rm -rf {dir} && mkdir -p {dir}"));
                rest = after;
            } else if let Some(after) = rest.strip_prefix("%prereq(") {
                let (name, after) =
                    split_parenthesized(after).ok_or(SubstituteError::Unterminated("%prereq"))?;
                let dir = self
                    .prerequisites
                    .get(name.trim())
                    .ok_or_else(|| SubstituteError::UnknownPrerequisite(name.trim().to_string()))?;
                out.push_str(dir);
                rest = after;
            } else if let Some((key, value)) = self
                .table
                .iter()
                .find(|(key, _)| rest.starts_with(key.as_str()) && !continues_word(key, &rest[key.len()..]))
            {
                out.push_str(value);
                rest = &rest[key.len()..];
            } else {
                out.push('%');
                rest = &rest[1..];
            }
        }

        out.push_str(rest);
        Ok(out)
    }
}

/// Split `inner)rest` at the `)` closing an already-opened parenthesis.
fn split_parenthesized(text: &str) -> Option<(&str, &str)> {
    let mut depth = 1usize;
    for (index, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&text[..index], &text[index + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

/// Whether `after` extends `key` into a longer name, as `arget-run` does
/// after `%t` in `%target-run`. A `-` ends the key, so `%t-main` expands.
fn continues_word(key: &str, after: &str) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    key.chars().next_back().is_some_and(is_word) && after.chars().next().is_some_and(is_word)
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fixture_subs() -> Substitutions {
        Substitutions::for_fixture(
            Path::new("/suite/pt/main.swift"),
            Path::new("/tmp/w/t"),
            Path::new("/tmp/w"),
        )
    }

    #[test]
    fn builtins() {
        let subs = fixture_subs();
        assert_eq!(
            subs.apply("cp %s %t/main.swift && ls %S/Inputs %T").unwrap(),
            "cp /suite/pt/main.swift /tmp/w/t/main.swift && ls /suite/pt/Inputs /tmp/w"
        );
    }

    #[test]
    fn empty_directory() {
        let subs = fixture_subs();
        assert_eq!(
            subs.apply("%empty-directory(%t)").unwrap(),
            "rm -rf /tmp/w/t && mkdir -p /tmp/w/t"
        );
        assert_eq!(
            subs.apply("%empty-directory(%t").unwrap_err(),
            SubstituteError::Unterminated("%empty-directory")
        );
    }

    #[test]
    fn longest_key_wins() {
        let mut subs = fixture_subs();
        let config: FxHashMap<String, String> = [
            ("%target-run".to_string(), "env".to_string()),
            ("%target-build-swift".to_string(), "swiftc -module-cache-path %t/mc".to_string()),
        ]
        .into_iter()
        .collect();
        subs.extend_from_config(&config).unwrap();
        assert_eq!(subs.apply("%target-run %t/main").unwrap(), "env /tmp/w/t/main");
        assert_eq!(
            subs.apply("%target-build-swift -o %t/main").unwrap(),
            "swiftc -module-cache-path /tmp/w/t/mc -o /tmp/w/t/main"
        );
    }

    #[test]
    fn percent_escape_and_unknown() {
        let subs = fixture_subs();
        assert_eq!(subs.apply("printf '%%d' 100%").unwrap(), "printf '%d' 100%");
        assert_eq!(subs.apply("%unknown-tool").unwrap(), "%unknown-tool");
        assert_eq!(subs.apply("%target-run %t").unwrap(), "%target-run /tmp/w/t");
    }

    #[test]
    fn dash_ends_a_builtin() {
        let subs = fixture_subs();
        assert_eq!(
            subs.apply("cp %s %s-copy && mkdir %t-main").unwrap(),
            "cp /suite/pt/main.swift /suite/pt/main.swift-copy && mkdir /tmp/w/t-main"
        );
        assert_eq!(subs.apply("%target-run").unwrap(), "%target-run");
    }

    #[test]
    fn prerequisites() {
        let mut subs = fixture_subs();
        subs.add_prerequisite("PlaygroundSupport", Path::new("/cache/PlaygroundSupport"));
        assert_eq!(
            subs.apply("-I %prereq(PlaygroundSupport)").unwrap(),
            "-I /cache/PlaygroundSupport"
        );
        assert_eq!(
            subs.apply("%prereq(Missing)").unwrap_err(),
            SubstituteError::UnknownPrerequisite("Missing".to_string())
        );
    }

    #[test]
    fn config_overrides_builtin() {
        let mut subs = fixture_subs();
        subs.insert("%s", "other.swift");
        assert_eq!(subs.apply("%s").unwrap(), "other.swift");
    }
}
