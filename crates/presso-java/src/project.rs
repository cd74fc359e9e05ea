//! Project-level helpers: package names, main classes and new-file templates.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::batch::{analyze_path, find_java_files};
use crate::kinds::{NodeKind, SymbolKind};
use crate::tree::{NodeId, SyntaxTree};
use crate::validation::{validate_name_for, ValidationError};

// ============================================================================
// Error Types
// ============================================================================

/// Errors from project-level operations.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("directory does not exist: {path}")]
    NotADirectory { path: String },

    #[error("package name cannot be empty")]
    EmptyPackage,

    #[error("invalid file name: {0}")]
    InvalidName(#[from] ValidationError),

    #[error("no main class found under {root}")]
    NoMainClass { root: String },

    #[error("main class found in {file}, but its package name could not be determined")]
    MissingPackage { file: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for project operations.
pub type ProjectResult<T> = Result<T, ProjectError>;

// ============================================================================
// Tree Helpers
// ============================================================================

/// The name in the file's `package` declaration.
pub fn package_name(tree: &SyntaxTree) -> Option<String> {
    let package = tree.child_of_kind(tree.root(), NodeKind::PackageDeclaration)?;
    tree.named_children(package)
        .find(|&c| matches!(tree.kind(c), NodeKind::ScopedIdentifier | NodeKind::Identifier))
        .map(|c| tree.text(c).to_string())
}

/// Whether a class in the file declares `public static void main(String[])`.
///
/// The varargs form `main(String...)` is accepted too.
pub fn is_main_class(tree: &SyntaxTree) -> bool {
    tree.preorder()
        .filter(|&n| tree.kind(n) == NodeKind::MethodDeclaration)
        .any(|method| is_class_method(tree, method) && is_main_method(tree, method))
}

fn is_class_method(tree: &SyntaxTree, method: NodeId) -> bool {
    tree.parent(method)
        .filter(|&body| tree.kind(body) == NodeKind::ClassBody)
        .and_then(|body| tree.parent(body))
        .is_some_and(|decl| tree.kind(decl) == NodeKind::ClassDeclaration)
}

fn is_main_method(tree: &SyntaxTree, method: NodeId) -> bool {
    let name_is_main = tree
        .child_by_field(method, "name")
        .is_some_and(|n| tree.text(n) == "main");
    let returns_void = tree
        .child_by_field(method, "type")
        .is_some_and(|t| tree.node(t).kind_name == "void_type");
    if !name_is_main || !returns_void {
        return false;
    }

    let Some(modifiers) = tree
        .children(method)
        .iter()
        .copied()
        .find(|&c| tree.node(c).kind_name == "modifiers")
    else {
        return false;
    };
    let mut keywords: Vec<&str> = tree
        .children(modifiers)
        .iter()
        .filter(|&&c| !tree.node(c).is_named)
        .map(|&c| tree.node(c).kind_name)
        .collect();
    keywords.sort_unstable();
    if keywords != ["public", "static"] {
        return false;
    }

    let Some(params) = tree.child_by_field(method, "parameters") else {
        return false;
    };
    let params: Vec<NodeId> = tree.named_children(params).collect();
    let [param] = params.as_slice() else {
        return false;
    };
    match tree.kind(*param) {
        NodeKind::FormalParameter => tree
            .child_by_field(*param, "type")
            .filter(|&t| tree.node(t).kind_name == "array_type")
            .and_then(|t| tree.child_by_field(t, "element"))
            .is_some_and(|e| tree.text(e) == "String"),
        NodeKind::SpreadParameter => tree
            .child_of_kind(*param, NodeKind::TypeIdentifier)
            .is_some_and(|t| tree.text(t) == "String"),
        _ => false,
    }
}

/// A file declaring a main class, with its package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainClass {
    pub file: PathBuf,
    pub package: String,
}

/// The first file under `root` (in path order) that declares a main class.
pub fn find_main_class(root: &Path) -> ProjectResult<MainClass> {
    if !root.is_dir() {
        return Err(ProjectError::NotADirectory {
            path: root.to_string_lossy().into_owned(),
        });
    }

    let files = find_java_files(root);
    debug!(root = %root.display(), files = files.len(), "searching for main class");

    let found = files.par_iter().find_map_first(|path| {
        let analysis = analyze_path(path).ok()?;
        is_main_class(analysis.tree()).then(|| (path.clone(), package_name(analysis.tree())))
    });

    match found {
        Some((file, Some(package))) => Ok(MainClass { file, package }),
        Some((file, None)) => Err(ProjectError::MissingPackage {
            file: file.to_string_lossy().into_owned(),
        }),
        None => Err(ProjectError::NoMainClass {
            root: root.to_string_lossy().into_owned(),
        }),
    }
}

// ============================================================================
// New File Templates
// ============================================================================

/// The kind of type a new file declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JavaFileTemplate {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

impl JavaFileTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            JavaFileTemplate::Class => "class",
            JavaFileTemplate::Interface => "interface",
            JavaFileTemplate::Enum => "enum",
            JavaFileTemplate::Record => "record",
            JavaFileTemplate::Annotation => "annotation",
        }
    }

    /// Source text of a new, empty type.
    pub fn render(&self, package: &str, name: &str) -> String {
        let header = format!("package {};\n\npublic ", package);
        match self {
            JavaFileTemplate::Class => format!("{header}class {name} {{\n\n}}"),
            JavaFileTemplate::Interface => format!("{header}interface {name} {{\n\n}}"),
            JavaFileTemplate::Enum => format!("{header}enum {name} {{\n\n}}"),
            JavaFileTemplate::Record => format!("{header}record {name}(\n\n) {{\n\n}}"),
            JavaFileTemplate::Annotation => format!("{header}@interface {name} {{\n\n}}"),
        }
    }
}

impl fmt::Display for JavaFileTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JavaFileTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "class" => Ok(JavaFileTemplate::Class),
            "interface" => Ok(JavaFileTemplate::Interface),
            "enum" => Ok(JavaFileTemplate::Enum),
            "record" => Ok(JavaFileTemplate::Record),
            "annotation" => Ok(JavaFileTemplate::Annotation),
            other => Err(format!("unknown file type: {}", other)),
        }
    }
}

/// Which source tree a new file goes into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceDirectoryType {
    #[default]
    Main,
    Test,
}

impl SourceDirectoryType {
    /// Conventional location relative to the project root.
    pub fn relative_path(&self) -> &'static Path {
        match self {
            SourceDirectoryType::Main => Path::new("src/main/java"),
            SourceDirectoryType::Test => Path::new("src/test/java"),
        }
    }
}

/// Find (or create) the directory for `package` under `root`.
///
/// The source directory is searched for recursively, so nested modules work;
/// when none exists it is created directly under `root`.
pub fn package_directory(
    root: &Path,
    package: &str,
    dir_type: SourceDirectoryType,
) -> ProjectResult<PathBuf> {
    if !root.is_dir() {
        return Err(ProjectError::NotADirectory {
            path: root.to_string_lossy().into_owned(),
        });
    }
    let package = package.trim();
    if package.is_empty() {
        return Err(ProjectError::EmptyPackage);
    }

    let relative = dir_type.relative_path();
    let source_dir = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .find(|p| p.ends_with(relative))
        .unwrap_or_else(|| root.join(relative));

    let dir = package
        .split('.')
        .fold(source_dir, |dir, segment| dir.join(segment));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// A rendered new file, not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJavaFile {
    pub path: PathBuf,
    pub type_name: String,
    pub contents: String,
}

/// Prepare a new source file: validate the name, render the template and
/// create the package directory.
pub fn new_java_file(
    root: &Path,
    package: &str,
    file_name: &str,
    template: JavaFileTemplate,
    dir_type: SourceDirectoryType,
) -> ProjectResult<NewJavaFile> {
    let trimmed = file_name.trim();
    let type_name = Path::new(trimmed)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    validate_name_for(&type_name, SymbolKind::Type)?;

    let dir = package_directory(root, package, dir_type)?;
    let path = dir.join(format!("{}.java", type_name));
    let contents = template.render(package.trim(), &type_name);
    info!(path = %path.display(), template = %template, "prepared new file");

    Ok(NewJavaFile {
        path,
        type_name,
        contents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse;
    use tempfile::TempDir;

    mod package_tests {
        use super::*;

        #[test]
        fn dotted_package() {
            let tree = parse("package com.example.app;\n\nclass A {}").unwrap();
            assert_eq!(package_name(&tree).as_deref(), Some("com.example.app"));
        }

        #[test]
        fn single_segment_package() {
            let tree = parse("package app;\nclass A {}").unwrap();
            assert_eq!(package_name(&tree).as_deref(), Some("app"));
        }

        #[test]
        fn no_package() {
            let tree = parse("class A {}").unwrap();
            assert_eq!(package_name(&tree), None);
        }
    }

    mod main_class_tests {
        use super::*;

        #[test]
        fn array_parameter() {
            let tree = parse("class App { public static void main(String[] args) {} }").unwrap();
            assert!(is_main_class(&tree));
        }

        #[test]
        fn varargs_parameter() {
            let tree = parse("class App { static public void main(String... args) {} }").unwrap();
            assert!(is_main_class(&tree));
        }

        #[test]
        fn wrong_shape_rejected() {
            for source in [
                "class App { public void main(String[] args) {} }",
                "class App { public static int main(String[] args) { return 0; } }",
                "class App { public static void main(int[] args) {} }",
                "class App { public static void start(String[] args) {} }",
                "class App { public static final void main(String[] args) {} }",
                "interface App { public static void main(String[] args) {} }",
            ] {
                let tree = parse(source).unwrap();
                assert!(!is_main_class(&tree), "{source}");
            }
        }

        #[test]
        fn find_main_class_in_tree() {
            let temp = TempDir::new().unwrap();
            let dir = temp.path().join("src/main/java/com/example");
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("Util.java"), "package com.example;\nclass Util {}").unwrap();
            fs::write(
                dir.join("App.java"),
                "package com.example;\npublic class App { public static void main(String[] args) {} }",
            )
            .unwrap();

            let found = find_main_class(temp.path()).unwrap();
            assert_eq!(found.file, dir.join("App.java"));
            assert_eq!(found.package, "com.example");
        }

        #[test]
        fn no_main_class() {
            let temp = TempDir::new().unwrap();
            fs::write(temp.path().join("A.java"), "class A {}").unwrap();
            assert!(matches!(
                find_main_class(temp.path()),
                Err(ProjectError::NoMainClass { .. })
            ));
        }
    }

    mod template_tests {
        use super::*;

        #[test]
        fn class_template() {
            assert_eq!(
                JavaFileTemplate::Class.render("com.example", "Foo"),
                "package com.example;\n\npublic class Foo {\n\n}"
            );
        }

        #[test]
        fn record_and_annotation_templates() {
            assert_eq!(
                JavaFileTemplate::Record.render("p", "Point"),
                "package p;\n\npublic record Point(\n\n) {\n\n}"
            );
            assert_eq!(
                JavaFileTemplate::Annotation.render("p", "Marker"),
                "package p;\n\npublic @interface Marker {\n\n}"
            );
        }

        #[test]
        fn rendered_templates_parse_cleanly() {
            for template in [
                JavaFileTemplate::Class,
                JavaFileTemplate::Interface,
                JavaFileTemplate::Enum,
                JavaFileTemplate::Annotation,
            ] {
                let tree = parse(template.render("com.example", "Thing")).unwrap();
                assert!(!tree.has_errors(), "{template}");
            }
        }

        #[test]
        fn parse_template_names() {
            assert_eq!("CLASS".parse::<JavaFileTemplate>(), Ok(JavaFileTemplate::Class));
            assert_eq!("record".parse::<JavaFileTemplate>(), Ok(JavaFileTemplate::Record));
            assert!("struct".parse::<JavaFileTemplate>().is_err());
        }
    }

    mod directory_tests {
        use super::*;

        #[test]
        fn creates_conventional_layout() {
            let temp = TempDir::new().unwrap();
            let dir =
                package_directory(temp.path(), "com.example.app", SourceDirectoryType::Main).unwrap();
            assert_eq!(dir, temp.path().join("src/main/java/com/example/app"));
            assert!(dir.is_dir());
        }

        #[test]
        fn finds_nested_source_root() {
            let temp = TempDir::new().unwrap();
            let nested = temp.path().join("module-a/src/test/java");
            fs::create_dir_all(&nested).unwrap();
            let dir = package_directory(temp.path(), "t", SourceDirectoryType::Test).unwrap();
            assert_eq!(dir, nested.join("t"));
        }

        #[test]
        fn empty_package_rejected() {
            let temp = TempDir::new().unwrap();
            assert!(matches!(
                package_directory(temp.path(), "  ", SourceDirectoryType::Main),
                Err(ProjectError::EmptyPackage)
            ));
        }

        #[test]
        fn new_file_strips_extension() {
            let temp = TempDir::new().unwrap();
            let file = new_java_file(
                temp.path(),
                "com.example",
                " Widget.java ",
                JavaFileTemplate::Interface,
                SourceDirectoryType::Main,
            )
            .unwrap();
            assert_eq!(file.type_name, "Widget");
            assert_eq!(
                file.path,
                temp.path().join("src/main/java/com/example/Widget.java")
            );
            assert!(file.contents.contains("public interface Widget"));
        }

        #[test]
        fn new_file_rejects_bad_name() {
            let temp = TempDir::new().unwrap();
            let err = new_java_file(
                temp.path(),
                "p",
                "9Lives",
                JavaFileTemplate::Class,
                SourceDirectoryType::Main,
            )
            .unwrap_err();
            assert!(matches!(err, ProjectError::InvalidName(_)));
        }
    }
}
