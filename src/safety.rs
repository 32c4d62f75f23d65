use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyLevel {
    Safe,
    Protected,
}

/// Guards the recursive content-directory delete against paths that can only
/// be there by mistake: filesystem roots, the home directory, system trees.
pub struct SafetyChecker {
    protected_paths: Vec<PathBuf>,
    protected_prefixes: Vec<&'static str>,
}

impl SafetyChecker {
    pub fn new() -> Self {
        let mut protected_paths: Vec<PathBuf> = [
            dirs::home_dir(),
            dirs::document_dir(),
            dirs::desktop_dir(),
            dirs::audio_dir(),
            dirs::data_dir(),
            dirs::data_local_dir(),
        ]
        .into_iter()
        .flatten()
        .collect();

        for var in ["ProgramFiles", "ProgramFiles(x86)", "CommonProgramFiles", "PUBLIC"] {
            if let Some(value) = std::env::var_os(var) {
                protected_paths.push(PathBuf::from(value));
            }
        }

        Self {
            protected_paths,
            protected_prefixes: vec![
                "/System",
                "/usr",
                "/bin",
                "/sbin",
                "/etc",
                "/Applications",
                r"C:\Windows",
            ],
        }
    }

    pub fn check_path(&self, path: &Path) -> SafetyLevel {
        if !path.is_absolute() || is_root(path) || has_dot_components(path) {
            return SafetyLevel::Protected;
        }

        // A protected dir, or anything that contains one.
        if self
            .protected_paths
            .iter()
            .any(|p| starts_with_ignore_case(p, path))
        {
            return SafetyLevel::Protected;
        }

        if self
            .protected_prefixes
            .iter()
            .any(|prefix| starts_with_ignore_case(path, Path::new(prefix)))
        {
            return SafetyLevel::Protected;
        }

        SafetyLevel::Safe
    }

    pub fn is_safe_to_delete(&self, path: &Path) -> bool {
        self.check_path(path) == SafetyLevel::Safe
    }
}

impl Default for SafetyChecker {
    fn default() -> Self {
        Self::new()
    }
}

fn is_root(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
}

/// `..` and `.` make the lexical checks below meaningless.
fn has_dot_components(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::ParentDir | Component::CurDir))
}

/// Component-wise `Path::starts_with`, ignoring ASCII case so that
/// `C:\windows` and `C:\Windows` compare equal.
fn starts_with_ignore_case(path: &Path, base: &Path) -> bool {
    let mut path = path.components();
    base.components().all(|b| {
        path.next().is_some_and(|p| {
            p.as_os_str()
                .to_string_lossy()
                .eq_ignore_ascii_case(&b.as_os_str().to_string_lossy())
        })
    })
}
