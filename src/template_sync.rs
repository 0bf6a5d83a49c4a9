//! # Cross-Repository Templates
//!
//! Keeps shared files (CI workflows, linters, build scripts) in line across
//! projects. A template directory holds one subdirectory per template and a
//! `template_map.txt` assigning each project a template:
//!
//! ```text
//! dedlin:pypi_library
//! llm_build:pypi_library
//! scratch:
//! ```
//!
//! A project with an empty assignment is left alone. Template files may
//! contain `{{{PROJECT_NAME}}}`, replaced by the project's directory name
//! before comparing or copying. Comparison ignores CR/LF differences, and an
//! empty template file accepts any existing file.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use similar::TextDiff;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::executor::Status;
use crate::output::Report;
use crate::repository::dir_name;

pub const TEMPLATE_MAP_FILE: &str = "template_map.txt";
pub const PROJECT_NAME_TOKEN: &str = "{{{PROJECT_NAME}}}";
pub const DEFAULT_TEMPLATE: &str = "default";

/// Project to template assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateMap {
    entries: BTreeMap<String, String>,
}

impl TemplateMap {
    /// Parse `project:template` lines. Blank lines are ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let Some((project, template)) = line.split_once(':') else {
                return Err(Error::Template {
                    message: format!("Invalid line in {TEMPLATE_MAP_FILE}: {line}"),
                });
            };
            entries.insert(project.trim().to_string(), template.trim().to_string());
        }
        Ok(Self { entries })
    }

    pub fn contains(&self, project: &str) -> bool {
        self.entries.contains_key(project)
    }

    /// Assigned template, `None` when unmapped or left blank.
    pub fn template_for(&self, project: &str) -> Option<&str> {
        self.entries
            .get(project)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difference {
    Missing,
    /// Line counts differ.
    DifferentLength,
    DifferentContents,
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Difference::Missing => "missing",
            Difference::DifferentLength => "different length",
            Difference::DifferentContents => "different contents",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDifference {
    /// Path relative to both the template and the project root.
    pub relative: PathBuf,
    pub template_file: PathBuf,
    pub project_file: PathBuf,
    pub kind: Difference,
    /// Unified diff from the project file to the rendered template.
    pub diff: Option<String>,
}

impl FileDifference {
    pub fn describe(&self) -> String {
        let template = self.template_file.display();
        let project = self.project_file.display();
        match self.kind {
            Difference::Missing => format!("File {template} is missing in {project}."),
            Difference::DifferentLength => {
                format!("Files {template} and {project} have different lengths.")
            }
            Difference::DifferentContents => {
                format!("Files {template} and {project} have different contents.")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectComparison {
    pub project_dir: PathBuf,
    pub template: String,
    pub differences: Vec<FileDifference>,
}

impl ProjectComparison {
    pub fn render(&self, report: &mut Report) {
        let dir = self.project_dir.display();
        if self.differences.is_empty() {
            report.success(format!("No differences in {dir}"));
            return;
        }
        report.warn(format!(
            "Differences in {dir} (template '{}'):",
            self.template
        ));
        for difference in &self.differences {
            report.plain(difference.describe());
            if let Some(diff) = &difference.diff {
                for line in diff.lines() {
                    report.push(diff_tone(line), line);
                }
            }
        }
    }
}

fn diff_tone(line: &str) -> crate::output::Tone {
    use crate::output::Tone;
    if line.starts_with("+++") || line.starts_with("---") {
        Tone::Plain
    } else if line.starts_with('+') {
        Tone::Success
    } else if line.starts_with('-') {
        Tone::Danger
    } else if line.starts_with("@@") {
        Tone::Info
    } else {
        Tone::Plain
    }
}

/// Substitute the project name and drop carriage returns.
pub fn render_template(text: &str, project: &str) -> String {
    normalize(&text.replace(PROJECT_NAME_TOKEN, project))
}

fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Compare a rendered template with a project file, `None` when they match.
pub fn compare_text(rendered_template: &str, project_text: &str) -> Option<Difference> {
    if rendered_template.is_empty() {
        return None;
    }
    let project_text = normalize(project_text);
    let template: Vec<&str> = rendered_template.lines().collect();
    let project: Vec<&str> = project_text.lines().collect();
    if template == project {
        None
    } else if template.len() != project.len() {
        Some(Difference::DifferentLength)
    } else {
        Some(Difference::DifferentContents)
    }
}

fn read_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| Error::io_at(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// A template directory together with its map.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    dir: PathBuf,
    map: TemplateMap,
}

impl TemplateSet {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(Error::Template {
                message: format!("Template directory {} does not exist.", dir.display()),
            });
        }
        let map_path = dir.join(TEMPLATE_MAP_FILE);
        let map = if map_path.exists() {
            TemplateMap::parse(&read_lossy(&map_path)?)?
        } else {
            TemplateMap::default()
        };
        Ok(Self { dir, map })
    }

    pub fn map_path(&self) -> PathBuf {
        self.dir.join(TEMPLATE_MAP_FILE)
    }

    pub fn map(&self) -> &TemplateMap {
        &self.map
    }

    /// Append every project not yet in the map and return their names.
    ///
    /// New entries are `project:` or, with `use_default`, `project:default`.
    pub fn init(&mut self, projects: &[PathBuf], use_default: bool) -> Result<Vec<String>> {
        let missing: Vec<String> = projects
            .iter()
            .map(|p| dir_name(p))
            .filter(|name| !self.map.contains(name))
            .collect();
        if missing.is_empty() {
            return Ok(missing);
        }

        let template = if use_default { DEFAULT_TEMPLATE } else { "" };
        let map_path = self.map_path();
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&map_path)
            .map_err(|e| Error::io_at(&map_path, e))?;
        for name in &missing {
            writeln!(file, "{name}:{template}").map_err(|e| Error::io_at(&map_path, e))?;
            self.map.entries.insert(name.clone(), template.to_string());
        }
        info!("Added {} projects to {}", missing.len(), map_path.display());
        Ok(missing)
    }

    /// Files of `template`, relative to its root, in a stable order.
    fn template_files(&self, template: &str) -> Vec<PathBuf> {
        let root = self.dir.join(template);
        WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable template entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.path().strip_prefix(&root).ok().map(Path::to_path_buf))
            .collect()
    }

    /// Compare a project with its assigned template. `None` when the
    /// project has no template.
    pub fn compare(&self, project_dir: &Path) -> Result<Option<ProjectComparison>> {
        let project = dir_name(project_dir);
        let Some(template) = self.map.template_for(&project) else {
            return Ok(None);
        };
        let template_root = self.dir.join(template);
        debug!("Comparing {} to {}", template_root.display(), project_dir.display());

        let mut differences = Vec::new();
        for relative in self.template_files(template) {
            let template_file = template_root.join(&relative);
            let project_file = project_dir.join(&relative);
            let rendered = render_template(&read_lossy(&template_file)?, &project);

            let (kind, diff) = if !project_file.exists() {
                (Difference::Missing, None)
            } else {
                let current = read_lossy(&project_file)?;
                match compare_text(&rendered, &current) {
                    None => continue,
                    Some(kind) => {
                        let current = normalize(&current);
                        let diff = TextDiff::from_lines(&current, &rendered)
                            .unified_diff()
                            .header(
                                &project_file.display().to_string(),
                                &template_file.display().to_string(),
                            )
                            .to_string();
                        (kind, Some(diff))
                    }
                }
            };
            differences.push(FileDifference {
                relative,
                template_file,
                project_file,
                kind,
                diff,
            });
        }

        Ok(Some(ProjectComparison {
            project_dir: project_dir.to_path_buf(),
            template: template.to_string(),
            differences,
        }))
    }

    /// Copy every differing template file into the project.
    pub fn sync(&self, project_dir: &Path, dry_run: bool, report: &mut Report) -> Result<Status> {
        let Some(comparison) = self.compare(project_dir)? else {
            report.plain(format!(
                "No template assigned to {} in {}.",
                dir_name(project_dir),
                self.map_path().display()
            ));
            return Ok(Status::Skipped);
        };
        if comparison.differences.is_empty() {
            report.plain(format!("No differences in {}", project_dir.display()));
            return Ok(Status::Skipped);
        }

        let project = dir_name(project_dir);
        for difference in &comparison.differences {
            let source = difference.template_file.display();
            let target = difference.project_file.display();
            if dry_run {
                report.plain(format!("Would have copied {source} to {target}"));
                continue;
            }
            if let Some(parent) = difference.project_file.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;
            }
            let rendered = render_template(&read_lossy(&difference.template_file)?, &project);
            fs::write(&difference.project_file, rendered)
                .map_err(|e| Error::io_at(&difference.project_file, e))?;
            info!("Copied {} to {}", source, target);
            report.success(format!("Copied {source} to {target}"));
        }
        Ok(Status::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    /// templates/{template_map.txt, lib/...} and projects/dedlin
    fn fixture(map: &str) -> (TempDir, PathBuf, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let templates = tmp.path().join("templates");
        let project = tmp.path().join("projects").join("dedlin");
        fs::create_dir_all(&project).unwrap();
        write(&templates.join(TEMPLATE_MAP_FILE), map);
        write(
            &templates.join("lib").join("Makefile"),
            "check:\n\tpytest {{{PROJECT_NAME}}}\n",
        );
        write(
            &templates.join("lib").join(".github/workflows/build.yml"),
            "name: build\n",
        );
        (tmp, templates, project)
    }

    #[test]
    fn test_parse_map() {
        let map = TemplateMap::parse("dedlin:lib\n\nscratch:\n  spaced : other \n").unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.template_for("dedlin"), Some("lib"));
        assert_eq!(map.template_for("scratch"), None);
        assert!(map.contains("scratch"));
        assert_eq!(map.template_for("spaced"), Some("other"));
    }

    #[test]
    fn test_parse_map_rejects_line_without_colon() {
        let err = TemplateMap::parse("dedlin lib\n").unwrap_err();
        assert!(err.to_string().contains("Invalid line"));
    }

    #[test]
    fn test_compare_text_rules() {
        assert_eq!(compare_text("a\nb\n", "a\r\nb\r\n"), None);
        assert_eq!(compare_text("", "anything"), None);
        assert_eq!(
            compare_text("a\nb\n", "a\n"),
            Some(Difference::DifferentLength)
        );
        assert_eq!(
            compare_text("a\nb\n", "a\nc\n"),
            Some(Difference::DifferentContents)
        );
    }

    #[test]
    fn test_render_substitutes_project_name() {
        assert_eq!(
            render_template("pytest {{{PROJECT_NAME}}}\r\n", "dedlin"),
            "pytest dedlin\n"
        );
    }

    #[test]
    fn test_missing_template_dir() {
        let tmp = TempDir::new().unwrap();
        let err = TemplateSet::open(tmp.path().join("nope")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_compare_reports_each_kind() {
        let (_tmp, templates, project) = fixture("dedlin:lib\n");
        write(&project.join("Makefile"), "check:\n\tpytest other\n");

        let set = TemplateSet::open(&templates).unwrap();
        let comparison = set.compare(&project).unwrap().unwrap();

        assert_eq!(comparison.template, "lib");
        let kinds: Vec<_> = comparison
            .differences
            .iter()
            .map(|d| (d.relative.clone(), d.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (
                    PathBuf::from(".github/workflows/build.yml"),
                    Difference::Missing
                ),
                (PathBuf::from("Makefile"), Difference::DifferentContents),
            ]
        );
        let diff = comparison.differences[1].diff.as_ref().unwrap();
        assert!(diff.contains("-\tpytest other"));
        assert!(diff.contains("+\tpytest dedlin"));
    }

    #[test]
    fn test_unmapped_project_is_not_compared() {
        let (_tmp, templates, project) = fixture("dedlin:\n");
        let set = TemplateSet::open(&templates).unwrap();
        assert!(set.compare(&project).unwrap().is_none());
    }

    #[test]
    fn test_sync_copies_and_creates_parents() {
        let (_tmp, templates, project) = fixture("dedlin:lib\n");
        let set = TemplateSet::open(&templates).unwrap();
        let mut report = Report::new();

        let status = set.sync(&project, false, &mut report).unwrap();

        assert_eq!(status, Status::Success);
        assert_eq!(
            fs::read_to_string(project.join("Makefile")).unwrap(),
            "check:\n\tpytest dedlin\n"
        );
        assert!(project.join(".github/workflows/build.yml").exists());
        assert!(set
            .compare(&project)
            .unwrap()
            .unwrap()
            .differences
            .is_empty());
    }

    #[test]
    fn test_sync_dry_run_writes_nothing() {
        let (_tmp, templates, project) = fixture("dedlin:lib\n");
        let set = TemplateSet::open(&templates).unwrap();
        let mut report = Report::new();

        let status = set.sync(&project, true, &mut report).unwrap();

        assert_eq!(status, Status::Success);
        assert!(!project.join("Makefile").exists());
        assert!(!project.join(".github").exists());
        assert!(report
            .texts()
            .iter()
            .all(|t| t.starts_with("Would have copied")));
    }

    #[test]
    fn test_init_appends_missing_projects() {
        let (tmp, templates, project) = fixture("dedlin:lib\n");
        let other = tmp.path().join("projects").join("llm_build");
        fs::create_dir_all(&other).unwrap();

        let mut set = TemplateSet::open(&templates).unwrap();
        let added = set.init(&[project, other], true).unwrap();

        assert_eq!(added, vec!["llm_build"]);
        let text = fs::read_to_string(templates.join(TEMPLATE_MAP_FILE)).unwrap();
        assert_eq!(text, "dedlin:lib\nllm_build:default\n");
        assert_eq!(set.map().template_for("llm_build"), Some("default"));
    }
}
