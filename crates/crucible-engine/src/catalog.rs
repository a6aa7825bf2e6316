//! Language catalog.
//!
//! Static mapping from language tag to sandbox image, source filename and
//! command templates. Compiled languages rely on an entrypoint baked into
//! their image that compiles the mounted source in place and exits non-zero
//! on compile failure; `go` compiles and runs in one step via `go run`.

/// Everything the provisioner needs to know about one supported language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageSpec {
    pub tag: &'static str,
    /// Image name before the configured prefix is applied.
    pub image: &'static str,
    /// Filename the source is written to inside the scratch directory.
    pub source_filename: &'static str,
    /// Whether the workload involves an in-sandbox compile step.
    pub compiled: bool,
}

const CATALOG: &[LanguageSpec] = &[
    LanguageSpec { tag: "python", image: "python-executor", source_filename: "main.py", compiled: false },
    LanguageSpec { tag: "javascript", image: "js-executor", source_filename: "main.js", compiled: false },
    LanguageSpec { tag: "cpp", image: "cpp-executor", source_filename: "main.cpp", compiled: true },
    LanguageSpec { tag: "java", image: "java-executor", source_filename: "Main.java", compiled: true },
    LanguageSpec { tag: "go", image: "go-executor", source_filename: "main.go", compiled: true },
];

/// Name of the stdin file written next to the source when input is present.
pub const STDIN_FILENAME: &str = "input.txt";

/// Resolve a language tag. Unknown tags fail fast before admission.
pub fn lookup(tag: &str) -> Option<&'static LanguageSpec> {
    CATALOG.iter().find(|spec| spec.tag == tag)
}

/// All supported tags, for diagnostics.
pub fn supported_tags() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|spec| spec.tag)
}

impl LanguageSpec {
    /// Full image name with the configured prefix applied.
    pub fn image_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.image)
    }

    /// The argv the sandbox executes.
    ///
    /// With stdin present the command is wrapped in `/bin/sh -c` so the
    /// workload reads its input through shell redirection; stdin is never
    /// delivered over the container attach stream.
    pub fn command(&self, with_stdin: bool) -> Vec<String> {
        let bare: Vec<&str> = match self.tag {
            "python" => vec!["python3", self.source_filename],
            "javascript" => vec!["node", self.source_filename],
            "go" => vec!["go", "run", self.source_filename],
            // cpp and java hand the source to the image entrypoint.
            _ => vec![self.source_filename],
        };

        if with_stdin {
            let redirected = match self.tag {
                "python" => format!("python3 {} < {}", self.source_filename, STDIN_FILENAME),
                "javascript" => format!("node {} < {}", self.source_filename, STDIN_FILENAME),
                "go" => format!("go run {} < {}", self.source_filename, STDIN_FILENAME),
                _ => format!("./{} < {}", self.source_filename, STDIN_FILENAME),
            };
            vec!["/bin/sh".to_string(), "-c".to_string(), redirected]
        } else {
            bare.into_iter().map(String::from).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_tag_is_fully_defined() {
        for tag in ["python", "javascript", "cpp", "java", "go"] {
            let spec = lookup(tag).unwrap_or_else(|| panic!("missing catalog entry for {tag}"));
            assert!(!spec.image.is_empty());
            assert!(!spec.source_filename.is_empty());
            assert!(!spec.command(false).is_empty());
            assert!(!spec.command(true).is_empty());
        }
    }

    #[test]
    fn supported_tags_cover_the_catalog() {
        let tags: Vec<&str> = supported_tags().collect();
        assert_eq!(tags, vec!["python", "javascript", "cpp", "java", "go"]);
    }

    #[test]
    fn unknown_tags_are_rejected() {
        assert!(lookup("rust").is_none());
        assert!(lookup("").is_none());
        assert!(lookup("Python").is_none());
    }

    #[test]
    fn image_prefix_is_applied() {
        let spec = lookup("python").unwrap();
        assert_eq!(spec.image_name(""), "python-executor");
        assert_eq!(spec.image_name("crucible/"), "crucible/python-executor");
    }

    #[test]
    fn stdin_wraps_command_in_shell_redirection() {
        let spec = lookup("python").unwrap();
        assert_eq!(spec.command(false), vec!["python3", "main.py"]);
        assert_eq!(
            spec.command(true),
            vec!["/bin/sh", "-c", "python3 main.py < input.txt"]
        );
    }

    #[test]
    fn compiled_languages_use_the_image_entrypoint() {
        let cpp = lookup("cpp").unwrap();
        assert!(cpp.compiled);
        assert_eq!(cpp.command(false), vec!["main.cpp"]);
        assert_eq!(cpp.command(true), vec!["/bin/sh", "-c", "./main.cpp < input.txt"]);

        let go = lookup("go").unwrap();
        assert_eq!(go.command(false), vec!["go", "run", "main.go"]);
    }

    #[test]
    fn java_source_is_capitalized() {
        assert_eq!(lookup("java").unwrap().source_filename, "Main.java");
    }
}
