//! Dependency graph consistency check.
//!
//! Walks the installed closure of a root package once and reports:
//!
//! - version splits: one package name reachable under several hashes;
//! - edges whose cached name or version disagrees with the manifest they
//!   point at;
//! - non-empty versions that do not parse as semver (informational).
//!
//! The check never fetches and never modifies anything.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;
use crate::package::hash::ContentHash;
use crate::package::manifest::Package;
use crate::package::store::PackageStore;


#[derive(Clone, Copy, Debug, Default)]
pub struct CheckOptions {
    /// Check name/version agreement on every edge, not only the root's.
    pub deep: bool,
}

// ─── Report ────────────────────────────────────────────────────────

/// One hash a duplicated name resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportedAs {
    pub version: String,
    pub hash: ContentHash,
    /// Names of the importing packages, sorted.
    pub importers: Vec<String>,
}

/// A package name reachable under more than one hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Duplicate {
    pub name: String,
    /// Ordered by semver (unparseable first), then by hash.
    pub imports: Vec<ImportedAs>,
}

/// An edge whose cached metadata disagrees with its target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mismatch {
    Name {
        importer: String,
        dep_name: String,
        actual: String,
    },
    Version {
        importer: String,
        dep_name: String,
        expected: String,
        actual: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidVersion {
    pub name: String,
    pub hash: ContentHash,
    pub version: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub duplicates: Vec<Duplicate>,
    pub mismatches: Vec<Mismatch>,
    /// Notes only; these never fail the check.
    pub invalid_versions: Vec<InvalidVersion>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.duplicates.is_empty() && self.mismatches.is_empty()
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for note in &self.invalid_versions {
            writeln!(
                f,
                "package {} ({}) has an invalid version '{}': {}",
                note.name, note.hash, note.version, note.reason
            )?;
        }
        for dup in &self.duplicates {
            writeln!(f, "package {} imported as:", dup.name)?;
            for imp in &dup.imports {
                let version = if imp.version.is_empty() {
                    "(no version)"
                } else {
                    &imp.version
                };
                writeln!(f, "  - {} {}", version, imp.hash)?;
                for importer in &imp.importers {
                    writeln!(f, "    - {}", importer)?;
                }
            }
        }
        for mismatch in &self.mismatches {
            match mismatch {
                Mismatch::Name {
                    importer,
                    dep_name,
                    actual,
                } => writeln!(
                    f,
                    "{}: dependency {} references a package with name {}",
                    importer, dep_name, actual
                )?,
                Mismatch::Version {
                    importer,
                    dep_name,
                    expected,
                    actual,
                } => writeln!(
                    f,
                    "{}: dependency {} has version {} but the referenced package has version {}",
                    importer, dep_name, expected, actual
                )?,
            }
        }
        Ok(())
    }
}

// ─── Walk ──────────────────────────────────────────────────────────

struct Entry {
    version: String,
    parsed: Option<semver::Version>,
    importers: Vec<String>,
}

struct Checker<'s, 'a> {
    store: &'s PackageStore<'a>,
    deep: bool,
    /// name → hash → entry. A hash enters the index once, when it is
    /// first traversed.
    index: BTreeMap<String, BTreeMap<ContentHash, Entry>>,
    report: CheckReport,
}

impl Checker<'_, '_> {
    fn traverse(&mut self, pkg: &Package, is_root: bool) -> Result<()> {
        for dep in &pkg.dependencies {
            let target = self.store.load_dependency(dep)?.package;

            if is_root || self.deep {
                if dep.name != target.name {
                    self.report.mismatches.push(Mismatch::Name {
                        importer: pkg.name.clone(),
                        dep_name: dep.name.clone(),
                        actual: target.name.clone(),
                    });
                }
                if dep.version != target.version {
                    self.report.mismatches.push(Mismatch::Version {
                        importer: pkg.name.clone(),
                        dep_name: dep.name.clone(),
                        expected: dep.version.clone(),
                        actual: target.version.clone(),
                    });
                }
            }

            let by_hash = self.index.entry(target.name.clone()).or_default();
            if let Some(entry) = by_hash.get_mut(&dep.hash) {
                entry.importers.push(pkg.name.clone());
                continue;
            }

            let parsed = match semver::Version::parse(&target.version) {
                Ok(v) => Some(v),
                Err(e) => {
                    if !target.version.is_empty() {
                        self.report.invalid_versions.push(InvalidVersion {
                            name: target.name.clone(),
                            hash: dep.hash,
                            version: target.version.clone(),
                            reason: e.to_string(),
                        });
                    }
                    None
                }
            };
            by_hash.insert(
                dep.hash,
                Entry {
                    version: target.version.clone(),
                    parsed,
                    importers: vec![pkg.name.clone()],
                },
            );

            self.traverse(&target, false)?;
        }
        Ok(())
    }

    fn finish(mut self) -> CheckReport {
        for (name, by_hash) in self.index {
            if by_hash.len() < 2 {
                continue;
            }
            let mut imports: Vec<(Option<semver::Version>, ImportedAs)> = by_hash
                .into_iter()
                .map(|(hash, mut entry)| {
                    entry.importers.sort();
                    let imp = ImportedAs {
                        version: entry.version,
                        hash,
                        importers: entry.importers,
                    };
                    (entry.parsed, imp)
                })
                .collect();
            imports.sort_by(|(va, a), (vb, b)| va.cmp(vb).then_with(|| a.hash.cmp(&b.hash)));
            self.report.duplicates.push(Duplicate {
                name,
                imports: imports.into_iter().map(|(_, imp)| imp).collect(),
            });
        }
        self.report
    }
}

/// Check the installed closure of `root` for version splits and
/// name/version drift.
///
/// Every dependency must already be installed; a missing one is an error.
/// Inconsistencies are collected in the returned report, never raised.
pub fn check(
    store: &PackageStore<'_>,
    root: &Package,
    opts: CheckOptions,
) -> Result<CheckReport> {
    let mut checker = Checker {
        store,
        deep: opts.deep,
        index: BTreeMap::new(),
        report: CheckReport::default(),
    };
    checker.traverse(root, true)?;
    Ok(checker.finish())
}
