//! End-to-end conversion properties over fixture vaults

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use denotify_core::config::{AssetPolicy, ConvertConfig, OutputFormat};
use denotify_core::report::{ConversionReport, Warning};
use denotify_core::Converter;
use regex::Regex;
use tempfile::{tempdir, TempDir};
use walkdir::WalkDir;

fn now() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2030-06-01T12:00:00", "%Y-%m-%dT%H:%M:%S").unwrap()
}

struct Vault {
    dir: TempDir,
}

impl Vault {
    fn new(files: &[(&str, &str)]) -> Self {
        let dir = tempdir().unwrap();
        for (rel, content) in files {
            let path = dir.path().join("vault").join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        Self { dir }
    }

    fn input(&self) -> PathBuf {
        self.dir.path().join("vault")
    }

    fn out(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn convert(&self, config: ConvertConfig, out: &str) -> ConversionReport {
        Converter::new(config)
            .with_now(now())
            .convert(&self.input(), &self.out(out))
            .unwrap()
    }
}

/// All files under `root`, relative path → contents
fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

fn read_output(report: &ConversionReport, source: &str) -> String {
    let note = report
        .notes
        .iter()
        .find(|n| n.source == source)
        .unwrap_or_else(|| panic!("{} not converted", source));
    fs::read_to_string(report.output.join(&note.output)).unwrap()
}

fn linked_vault() -> Vault {
    Vault::new(&[
        (
            "A.md",
            "---\ncreated: 2024-01-10T08:00:00\n---\nSee [[B]] and [[B|custom text]].\n",
        ),
        (
            "B.md",
            "---\ntitle: My Note\ncreated: 2024-01-15T09:30:00\ntags: [x, y]\n---\n# My Note\nBack to [[A]].\n",
        ),
        ("projects/Plan.md", "Link to [My Note](../B.md) and ![[diagram.png]]\n"),
        ("projects/attachments/diagram.png", "png-bytes"),
        ("Undated.md", "no front matter, links [[Plan]]\n"),
    ])
}

#[test]
fn test_round_trip_reference_targets_denote_name() {
    let vault = linked_vault();
    let report = vault.convert(ConvertConfig::default(), "out");
    assert!(report.is_success());

    let a = read_output(&report, "A.md");
    assert!(a.contains("[[file:20240115T093000--my-note__x_y.org][B]]"), "{}", a);
    assert!(vault.out("out").join("20240115T093000--my-note__x_y.org").is_file());

    let md = vault.convert(
        ConvertConfig {
            format: OutputFormat::Md,
            ..Default::default()
        },
        "out-md",
    );
    let a = read_output(&md, "A.md");
    assert!(a.contains("[B](20240115T093000--my-note__x_y.md)"), "{}", a);
}

#[test]
fn test_alias_label_preserved() {
    let vault = linked_vault();
    let report = vault.convert(ConvertConfig::default(), "out");
    let a = read_output(&report, "A.md");
    assert!(a.contains("[[file:20240115T093000--my-note__x_y.org][custom text]]"));
    assert!(!a.contains("[[B|custom text]]"));
}

#[test]
fn test_idempotent_across_runs() {
    let vault = linked_vault();
    let first = vault.convert(ConvertConfig::default(), "run1");
    let second = vault.convert(ConvertConfig::default(), "run2");
    assert_eq!(first.notes, second.notes);
    assert_eq!(snapshot(&vault.out("run1")), snapshot(&vault.out("run2")));

    // Re-running into the same directory neither drifts nor adds files
    let again = vault.convert(ConvertConfig::default(), "run1");
    assert_eq!(first.notes, again.notes);
    assert_eq!(snapshot(&vault.out("run1")), snapshot(&vault.out("run2")));
}

#[test]
fn test_no_dangling_links() {
    let file_link = Regex::new(r"\[\[file:([^\]\[:]+)(?:::[^\]]*)?\]").unwrap();

    for preserve_structure in [false, true] {
        let vault = linked_vault();
        let config = ConvertConfig {
            preserve_structure,
            ..Default::default()
        };
        let report = vault.convert(config, "out");
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);

        for note in &report.notes {
            let path = report.output.join(&note.output);
            let content = fs::read_to_string(&path).unwrap();
            let dir = path.parent().unwrap();
            for caps in file_link.captures_iter(&content) {
                let target = dir.join(&caps[1]);
                assert!(
                    target.is_file(),
                    "{} links to missing {} (structure={})",
                    note.output,
                    &caps[1],
                    preserve_structure
                );
            }
        }
    }
}

#[test]
fn test_generated_names_unique() {
    let files: Vec<(String, String)> = (0..6)
        .map(|i| {
            (
                format!("folder{}/Daily.md", i),
                "---\ncreated: 2024-03-01T00:00:00\n---\nsame\n".to_string(),
            )
        })
        .collect();
    let refs: Vec<(&str, &str)> = files.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
    let vault = Vault::new(&refs);

    let report = vault.convert(ConvertConfig::default(), "out");
    let mut names: Vec<&str> = report.notes.iter().map(|n| n.output.as_str()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 6);
    assert_eq!(snapshot(&vault.out("out")).len(), 6);
    assert!(names.contains(&"20240301T000000--daily.org"));
    assert!(names.contains(&"20240301T000000--daily-6.org"));
}

#[test]
fn test_asset_dedup_across_relative_paths() {
    let vault = Vault::new(&[
        ("a/one.md", "![[shared.png]]\n"),
        ("b/two.md", "![img](../attachments/shared.png)\n"),
        ("attachments/shared.png", "image"),
    ]);
    let report = vault.convert(ConvertConfig::default(), "out");

    assert_eq!(report.assets.len(), 1);
    assert_eq!(report.assets[0].references.len(), 2);
    let copied: Vec<String> = snapshot(&vault.out("out").join("assets")).into_keys().collect();
    assert_eq!(copied.len(), 1);

    let link = format!("[[file:assets/{}]]", copied[0]);
    assert!(read_output(&report, "a/one.md").contains(&link));
    assert!(read_output(&report, "b/two.md").contains(&link));
}

#[test]
fn test_link_policy_points_at_source_without_copy() {
    let vault = Vault::new(&[("n.md", "![[p.png]]\n"), ("p.png", "x")]);
    let config = ConvertConfig {
        assets: AssetPolicy::Link,
        ..Default::default()
    };
    let report = vault.convert(config, "out");
    assert!(!vault.out("out").join("assets").exists());
    assert_eq!(report.assets.len(), 1);
    let body = read_output(&report, "n.md");
    assert!(body.contains("p.png]]"));
    assert!(body.contains("[[file:/"));
}

#[test]
fn test_ambiguity_reported_and_path_qualification_resolves() {
    let vault = Vault::new(&[
        ("a/x.md", "---\ntitle: Notes\ncreated: 2024-01-01T00:00:00\n---\n"),
        ("b/y.md", "---\ntitle: Notes\ncreated: 2024-01-02T00:00:00\n---\n"),
        ("c.md", "Bare [[Notes]] and qualified [[a/x]]\n"),
    ]);
    let report = vault.convert(ConvertConfig::default(), "out");

    let ambiguous: Vec<&Warning> = report.warnings_of("ambiguous_reference").collect();
    assert_eq!(ambiguous.len(), 1);
    match ambiguous[0] {
        Warning::AmbiguousReference { candidates, .. } => {
            assert_eq!(candidates, &vec!["a/x.md".to_string(), "b/y.md".to_string()]);
        }
        other => panic!("unexpected {:?}", other),
    }

    let c = read_output(&report, "c.md");
    assert!(c.contains("Bare [[Notes]]"));
    assert!(c.contains("[[file:20240101T000000--notes.org][a/x]]"));
}

#[test]
fn test_missing_asset_untouched_and_warned_once() {
    let vault = Vault::new(&[(
        "n.md",
        "---\ncreated: 2024-01-01T00:00:00\n---\n![[nope.png]]\nagain ![[nope.png]]\n",
    )]);
    let report = vault.convert(ConvertConfig::default(), "out");

    assert_eq!(report.warnings_of("unresolved_asset").count(), 1);
    assert_eq!(report.warnings.len(), 1);
    let body = read_output(&report, "n.md");
    assert_eq!(body.matches("![[nope.png]]").count(), 2);
    assert!(report.is_success());
}

#[test]
fn test_preserved_wikilinks_in_markdown() {
    let vault = linked_vault();
    let config = ConvertConfig {
        format: OutputFormat::Md,
        preserve_links: true,
        ..Default::default()
    };
    let report = vault.convert(config, "out");
    let a = read_output(&report, "A.md");
    assert!(a.contains("[[20240115T093000--my-note__x_y|B]]"), "{}", a);
    assert!(a.contains("[[20240115T093000--my-note__x_y|custom text]]"));
    assert!(a.starts_with("---\ntitle:      \"A\"\n"));
}

#[test]
fn test_folder_tags_in_filenames() {
    let vault = Vault::new(&[(
        "Work/Meetings/Standup.md",
        "---\ncreated: 2024-02-02T10:00:00\ntags: [work]\n---\n",
    )]);
    let config = ConvertConfig {
        add_folder_tags: true,
        ..Default::default()
    };
    let report = vault.convert(config, "out");
    assert_eq!(report.notes[0].output, "20240202T100000--standup__meetings_work.org");
}

#[test]
fn test_anchor_links_do_not_become_keywords() {
    let vault = Vault::new(&[
        (
            "Guide.md",
            "---\ncreated: 2024-01-15T09:30:00\n---\nSee [intro](#intro) below.\n\n[[#Summary]] #howto\n",
        ),
        ("Index.md", "---\ncreated: 2024-01-16T00:00:00\n---\n[[Guide]]\n"),
    ]);
    let report = vault.convert(ConvertConfig::default(), "out");

    let guide = report.notes.iter().find(|n| n.source == "Guide.md").unwrap();
    assert_eq!(guide.output, "20240115T093000--guide__howto.org");
    let index = read_output(&report, "Index.md");
    assert!(index.contains("[[file:20240115T093000--guide__howto.org][Guide]]"));
}
