//! Display names for payloads.
//!
//! The loader tells payload classes apart by whether the registered name
//! carries an extension: scripts are looked up as `name.bas`, executables as
//! a bare `name`.

use std::path::Path;

/// Extensions kept by [`NameClassifier::default`].
pub const DEFAULT_PRESERVED_EXTENSIONS: &[&str] = &["bas"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingPolicy {
  /// Keep the whole file name, extension included.
  PreserveExtension,
  /// Use the file stem.
  StripExtension,
}

impl NamingPolicy {
  /// Returns `None` when the path has no UTF-8 file name.
  pub fn display_name<'a>(&self, path: &'a Path) -> Option<&'a str> {
    let name = match self {
      NamingPolicy::PreserveExtension => path.file_name(),
      NamingPolicy::StripExtension => path.file_stem(),
    }?;

    name.to_str().filter(|name| !name.is_empty())
  }
}

/// Picks a [`NamingPolicy`] from the file extension.
#[derive(Debug, Clone)]
pub struct NameClassifier {
  /// Lowercase, without the leading dot.
  preserved: Vec<String>,
}

impl NameClassifier {
  pub fn new<I, S>(preserved: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    Self {
      preserved: preserved
        .into_iter()
        .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
        .collect(),
    }
  }

  pub fn classify(&self, path: &Path) -> NamingPolicy {
    let preserve = path
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| {
        self
          .preserved
          .iter()
          .any(|p| p.eq_ignore_ascii_case(ext))
      });

    if preserve {
      NamingPolicy::PreserveExtension
    } else {
      NamingPolicy::StripExtension
    }
  }

  pub fn display_name<'a>(&self, path: &'a Path) -> Option<&'a str> {
    self.classify(path).display_name(path)
  }
}

impl Default for NameClassifier {
  fn default() -> Self {
    Self::new(DEFAULT_PRESERVED_EXTENSIONS)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strips_directory_and_extension() {
    let classifier = NameClassifier::default();

    assert_eq!(classifier.display_name(Path::new("build/a.bin")), Some("a"));
    assert_eq!(classifier.display_name(Path::new("hello")), Some("hello"));
    assert_eq!(classifier.display_name(Path::new("x/lib.tar.gz")), Some("lib.tar"));
  }

  #[test]
  fn keeps_script_extension_case_insensitively() {
    let classifier = NameClassifier::default();

    assert_eq!(
      classifier.display_name(Path::new("progs/shell.bas")),
      Some("shell.bas")
    );
    assert_eq!(classifier.display_name(Path::new("GAME.BAS")), Some("GAME.BAS"));
    assert_eq!(
      classifier.classify(Path::new("demo.Bas")),
      NamingPolicy::PreserveExtension
    );
  }

  #[test]
  fn hidden_files_have_no_extension() {
    let classifier = NameClassifier::default();
    assert_eq!(classifier.display_name(Path::new("dir/.bas")), Some(".bas"));
  }

  #[test]
  fn custom_extension_set() {
    let classifier = NameClassifier::new([".txt", "LUA"]);

    assert_eq!(classifier.display_name(Path::new("notes.txt")), Some("notes.txt"));
    assert_eq!(classifier.display_name(Path::new("boot.lua")), Some("boot.lua"));
    assert_eq!(classifier.display_name(Path::new("shell.bas")), Some("shell"));
  }

  #[test]
  fn rejects_paths_without_file_name() {
    assert_eq!(NameClassifier::default().display_name(Path::new("/")), None);
    assert_eq!(NameClassifier::default().display_name(Path::new("..")), None);
  }
}
