//! Builds the artifact bundle of one package.
//!
//! The pipeline runs parse, documentation and check in that order. Each step
//! needs the previous one to have succeeded and the first failure ends the
//! build; a partial bundle is never returned.
//!
//! The directory is parsed twice. The documentation reader consumes the
//! forest it is given and strips its comments, while the checker and the
//! syntax accessors need an untouched forest. Both passes read the same
//! files with the same options, so the two forests agree on content.

use crate::check::{CheckedPackage, Checker, Importer, SourceImporter, TypeInfo};
use crate::config::{ParseConfig, Settings};
use crate::docs::DocPackage;
use crate::error::{PackageError, PackageResult};
use crate::locate::{PackageIdentity, SourceContext};
use crate::syntax::{self, FileSet, ParseMode, SyntaxFile, SyntaxPackage};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info_span, warn};

/// Everything known about a built package. Immutable once built.
pub struct ArtifactBundle {
    pub identity: PackageIdentity,
    /// Positions of the syntax forest
    pub fileset: FileSet,
    pub syntax: SyntaxPackage,
    pub docs: Arc<DocPackage>,
    pub checked: CheckedPackage,
    importer: Arc<dyn Importer>,
    annotations: OnceLock<PackageResult<TypeInfo>>,
}

impl ArtifactBundle {
    /// The annotation index, computed on first use by re-checking the
    /// syntax forest with recording enabled.
    pub fn annotations(&self) -> PackageResult<&TypeInfo> {
        self.annotations
            .get_or_init(|| {
                debug!("building annotation index for {}", self.identity.name);
                let files: Vec<&SyntaxFile> = self.syntax.files.values().collect();
                Checker::new(self.importer.as_ref())
                    .check_with_info(
                        &self.identity.name,
                        &self.identity.dir,
                        &self.fileset,
                        &files,
                    )
                    .map(|(_, info)| info)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn has_annotations(&self) -> bool {
        self.annotations.get().is_some()
    }
}

impl fmt::Debug for ArtifactBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactBundle")
            .field("package", &self.identity.name)
            .field("dir", &self.identity.dir)
            .field("files", &self.syntax.files.len())
            .field("objects", &self.checked.scope.len())
            .field("annotations", &self.has_annotations())
            .finish()
    }
}

/// Produces artifact bundles. Implemented by [`Toolchain`]; other
/// implementations can wrap or replace it.
pub trait BuildBundle: Send + Sync {
    fn build(&self, identity: &PackageIdentity) -> PackageResult<ArtifactBundle>;
}

/// The default builder: tree-sitter parsing, the documentation reader and
/// the declaration checker.
#[derive(Clone)]
pub struct Toolchain {
    parse: ParseConfig,
    importer: Arc<dyn Importer>,
}

impl Toolchain {
    /// Builder resolving imports through `context`.
    pub fn new(context: SourceContext) -> Self {
        Self {
            parse: ParseConfig::default(),
            importer: Arc::new(SourceImporter::new(context)),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(SourceContext::from_settings(settings)).with_parse_config(settings.parse.clone())
    }

    pub fn with_parse_config(mut self, parse: ParseConfig) -> Self {
        self.parse = parse;
        self
    }

    /// Replace the import resolver used by the checker.
    pub fn with_importer(mut self, importer: Arc<dyn Importer>) -> Self {
        self.importer = importer;
        self
    }

    pub fn parse_config(&self) -> &ParseConfig {
        &self.parse
    }

    /// Accepts a file name when the parse settings and the locator's
    /// classification allow it. An identity without any classified files
    /// accepts every Go file.
    fn file_filter(&self, identity: &PackageIdentity) -> impl Fn(&str) -> bool + use<> {
        let buildable: BTreeSet<String> = identity
            .buildable_go_files()
            .into_iter()
            .map(str::to_string)
            .collect();
        let include_tests = self.parse.include_tests;
        let respect = self.parse.respect_build_constraints && !buildable.is_empty();
        move |name: &str| {
            if !include_tests && name.ends_with("_test.go") {
                return false;
            }
            !respect || buildable.contains(name)
        }
    }

    fn run(&self, identity: &PackageIdentity) -> PackageResult<ArtifactBundle> {
        let mode = ParseMode {
            retain_comments: self.parse.retain_comments,
        };
        let filter = self.file_filter(identity);
        let not_found = || PackageError::PackageNotFound {
            name: identity.name.clone(),
            dir: identity.dir.clone(),
        };

        debug!("step 1: parsing syntax forest");
        let mut syntax_forest = syntax::parse_dir(&identity.dir, &filter, mode)?;

        debug!("step 2: parsing documentation forest");
        let mut doc_forest = syntax::parse_dir(&identity.dir, &filter, mode)?;

        debug!("step 3: reading documentation");
        let doc_package = doc_forest
            .take_package(&identity.name)
            .ok_or_else(not_found)?;
        let syntax_package = syntax_forest
            .take_package(&identity.name)
            .ok_or_else(not_found)?;
        let docs = DocPackage::new(doc_package, &identity.import_path);

        debug!("step 4: checking declarations");
        let files: Vec<&SyntaxFile> = syntax_package.files.values().collect();
        let checked = Checker::new(self.importer.as_ref()).check(
            &identity.name,
            &identity.dir,
            &syntax_forest.fileset,
            &files,
        )?;

        Ok(ArtifactBundle {
            identity: identity.clone(),
            fileset: syntax_forest.fileset,
            syntax: syntax_package,
            docs: Arc::new(docs),
            checked,
            importer: Arc::clone(&self.importer),
            annotations: OnceLock::new(),
        })
    }
}

impl BuildBundle for Toolchain {
    fn build(&self, identity: &PackageIdentity) -> PackageResult<ArtifactBundle> {
        let span = info_span!("build", package = %identity.name, dir = %identity.dir.display());
        let _enter = span.enter();
        let result = self.run(identity);
        match &result {
            Ok(bundle) => debug!(
                "built {} ({} files, {} objects)",
                identity.name,
                bundle.syntax.files.len(),
                bundle.checked.scope.len()
            ),
            Err(e) => warn!("build of {} failed: {e}", identity.name),
        }
        result
    }
}
