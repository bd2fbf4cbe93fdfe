use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::ir::Program;

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> std::result::Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        format!("at JSON path {path} → {}", err.into_inner())
    })
}

pub fn parse_program(src: &str, origin: &str) -> Result<Program> {
    from_str_with_path(src).map_err(|message| Error::Parse { path: origin.to_string(), message })
}

pub fn load_program(path: &Path) -> Result<Program> {
    let source = std::fs::read_to_string(path)?;
    parse_program(&source, &path.to_string_lossy())
}

/// Literal paths pass through; anything with glob characters is expanded and
/// must match at least one file.
pub fn resolve_file_path_patterns<I>(patterns: I) -> std::result::Result<Vec<PathBuf>, Box<dyn std::error::Error + Send + Sync>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                return Err(format!("glob pattern matched no files: {pattern}").into());
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_carry_the_json_path() {
        let src = r#"{"types": [{"name": "A", "fields": [{"name": "x"}]}]}"#;
        let err = parse_program(src, "a.json").unwrap_err().to_string();
        assert!(err.contains("a.json"), "{err}");
        assert!(err.contains("types[0].fields[0]"), "{err}");
    }

    #[test]
    fn literal_paths_are_kept_verbatim() {
        let paths = resolve_file_path_patterns(["does/not/exist.json"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("does/not/exist.json")]);
    }
}
