//! Placeholder substitution for URLs and file names.
//!
//! This is deliberately not a template language: a fixed set of placeholders
//! is replaced verbatim in one left-to-right pass, and anything else,
//! including unknown `{{.Foo}}` placeholders, is left untouched. Substituted
//! values are never scanned again.

/// Opening sequence shared by every placeholder.
const OPEN: &str = "{{.";

/// Placeholder for the repository owner.
pub const REPO_OWNER: &str = "{{.RepoOwner}}";
/// Placeholder for the repository name.
pub const REPO_NAME: &str = "{{.RepoName}}";
/// Placeholder for the tool name.
pub const NAME: &str = "{{.Name}}";
/// Placeholder for the version without prefix.
pub const VERSION: &str = "{{.Version}}";
/// Placeholder for the version prefix (usually `v`).
pub const VERSION_PREFIX: &str = "{{.VersionPrefix}}";

/// Values substituted into a template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateFields<'a> {
    /// Repository owner, e.g. `bufbuild`.
    pub repo_owner: &'a str,
    /// Repository name, e.g. `buf`.
    pub repo_name: &'a str,
    /// Tool name.
    pub name: &'a str,
    /// Version without prefix, e.g. `1.28.0`.
    pub version: &'a str,
    /// Version prefix, e.g. `v`.
    pub version_prefix: &'a str,
}

/// Replace every known placeholder in `template`.
///
/// ```
/// use tooldeck_core::template::{TemplateFields, render};
///
/// let fields = TemplateFields {
///     repo_name: "buf",
///     version: "1.28.0",
///     ..TemplateFields::default()
/// };
/// assert_eq!(render("{{.RepoName}}-{{.Version}}.tar.gz", &fields), "buf-1.28.0.tar.gz");
/// ```
#[must_use]
pub fn render(template: &str, fields: &TemplateFields<'_>) -> String {
    let substitutions = [
        (REPO_OWNER, fields.repo_owner),
        (REPO_NAME, fields.repo_name),
        (NAME, fields.name),
        (VERSION_PREFIX, fields.version_prefix),
        (VERSION, fields.version),
    ];

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        match substitutions.iter().find(|(p, _)| rest.starts_with(p)) {
            Some((placeholder, value)) => {
                out.push_str(value);
                rest = &rest[placeholder.len()..];
            }
            None => {
                out.push_str(OPEN);
                rest = &rest[OPEN.len()..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> TemplateFields<'static> {
        TemplateFields {
            repo_owner: "bufbuild",
            repo_name: "buf",
            name: "buf",
            version: "1.28.0",
            version_prefix: "v",
        }
    }

    #[test]
    fn test_render_archive_name() {
        assert_eq!(
            render("{{.RepoName}}-{{.Version}}.tar.gz", &fields()),
            "buf-1.28.0.tar.gz"
        );
    }

    #[test]
    fn test_render_all_placeholders() {
        assert_eq!(
            render(
                "https://github.com/{{.RepoOwner}}/{{.RepoName}}/releases/download/{{.VersionPrefix}}{{.Version}}/{{.Name}}",
                &fields()
            ),
            "https://github.com/bufbuild/buf/releases/download/v1.28.0/buf"
        );
    }

    #[test]
    fn test_unknown_placeholder_left_verbatim() {
        assert_eq!(
            render("{{.Os}}-{{.Version}}", &fields()),
            "{{.Os}}-1.28.0"
        );
    }

    #[test]
    fn test_repeated_placeholder() {
        assert_eq!(
            render("{{.Version}}/{{.Version}}", &fields()),
            "1.28.0/1.28.0"
        );
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let f = TemplateFields {
            repo_owner: "{{.Version}}",
            name: "{{.RepoName}}",
            version: "{{.Name}}",
            ..fields()
        };
        assert_eq!(
            render("{{.RepoOwner}}/{{.Name}}/{{.Version}}", &f),
            "{{.Version}}/{{.RepoName}}/{{.Name}}"
        );
    }

    #[test]
    fn test_unterminated_placeholder() {
        assert_eq!(render("{{.Version", &fields()), "{{.Version");
        assert_eq!(render("a{{.{{.Version}}", &fields()), "a{{.1.28.0");
    }

    #[test]
    fn test_no_placeholders() {
        assert_eq!(render("plain.zip", &fields()), "plain.zip");
    }
}
