//! Run command - materialize the symlink tree for a source tree

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::cli::RunArgs;
use crate::collision::{self, CollisionPolicy, Placement};
use crate::config::TaggoConfig;
use crate::filters::{Checkpoint, FilterMode, FilterQuery, FilterSet, Verdict};
use crate::metadata::{
    KeyPath, MetadataPlugin, MetadataStore, Scope, describe_path, describe_tag, plugin_by_name,
};
use crate::tags::TagSyntax;
use crate::template::{NameTemplate, TemplateError};
use crate::walk::{TreeWalk, WalkPolicy};
use crate::{TaggoError, commands};

type Result<T> = std::result::Result<T, TaggoError>;

/// Link name templates, optionally split by source kind
#[derive(Debug, Clone)]
pub struct Templates {
    file: NameTemplate,
    folder: NameTemplate,
}

impl Templates {
    /// Parse the shared template and the optional per-kind overrides
    ///
    /// # Errors
    /// Returns `TemplateError` if any template does not parse.
    pub fn new(default: &str, file: Option<&str>, folder: Option<&str>) -> std::result::Result<Self, TemplateError> {
        Ok(Self {
            file: NameTemplate::parse(file.unwrap_or(default))?,
            folder: NameTemplate::parse(folder.unwrap_or(default))?,
        })
    }

    #[must_use]
    pub const fn for_kind(&self, is_dir: bool) -> &NameTemplate {
        if is_dir { &self.folder } else { &self.file }
    }
}

/// Immutable configuration of one materialize run
pub struct RunOptions {
    pub syntax: TagSyntax,
    pub subtag_separator: char,
    pub hierarchy_separator: String,
    pub templates: Templates,
    pub filters: FilterSet,
    /// Evaluated per tag after the late filters
    pub query: Option<FilterQuery>,
    /// Enabled plugins in execution order
    pub plugins: Vec<Box<dyn MetadataPlugin>>,
    /// Values filled in for missing key paths
    pub defaults: Vec<(KeyPath, Value)>,
    pub collision: CollisionPolicy,
    pub skip_hidden: bool,
    pub auto_cleanup: bool,
    pub dry_run: bool,
}

impl RunOptions {
    /// Options taken from the configuration alone
    ///
    /// # Errors
    /// Returns an error for an invalid tag character, template or plugin name.
    pub fn from_config(config: &TaggoConfig) -> Result<Self> {
        Ok(Self {
            syntax: TagSyntax::new(config.tag_char)?,
            subtag_separator: config.subtag_separator,
            hierarchy_separator: config.hierarchy_separator.clone(),
            templates: Templates::new(
                &config.symlink_name,
                config.symlink_name_file.as_deref(),
                config.symlink_name_folder.as_deref(),
            )?,
            filters: FilterSet::default(),
            query: None,
            plugins: load_plugins(&config.metadata_plugins)?,
            defaults: Vec::new(),
            collision: config.collision_handler,
            skip_hidden: config.skip_hidden,
            auto_cleanup: false,
            dry_run: false,
        })
    }

    /// Options from command line arguments layered over the configuration
    ///
    /// # Errors
    /// Returns an error for invalid templates, filters, plugin names and
    /// malformed metadata defaults.
    pub fn from_args(args: &RunArgs, config: &TaggoConfig) -> Result<Self> {
        let mut options = Self::from_config(config)?;

        if args.symlink_name.is_some() || args.symlink_name_file.is_some() || args.symlink_name_folder.is_some() {
            let default = args.symlink_name.as_deref().unwrap_or(&config.symlink_name);
            options.templates = Templates::new(
                default,
                args.symlink_name_file
                    .as_deref()
                    .or(config.symlink_name_file.as_deref()),
                args.symlink_name_folder
                    .as_deref()
                    .or(config.symlink_name_folder.as_deref()),
            )?;
        }

        if !args.metadata_addons.is_empty() {
            let mut names = config.metadata_plugins.clone();
            names.extend(args.metadata_addons.iter().cloned());
            options.plugins = load_plugins(&names)?;
        }

        options.filters = FilterSet::parse_all(&args.filters, args.filter_mode, &options.plugin_names())?;
        options.query = args.filter_query.as_deref().map(FilterQuery::parse).transpose()?;
        options.defaults = parse_defaults(&args.metadata_defaults)?;
        if let Some(policy) = args.collision_handler {
            options.collision = policy;
        }
        options.skip_hidden |= args.skip_hidden;
        options.auto_cleanup = args.auto_cleanup;
        options.dry_run = args.dry;
        Ok(options)
    }

    /// Replace the filters, parsed against the enabled plugins
    ///
    /// # Errors
    /// Returns `TaggoError::FilterError` for the first invalid definition.
    pub fn with_filters<S: AsRef<str>>(mut self, definitions: &[S], mode: FilterMode) -> Result<Self> {
        self.filters = FilterSet::parse_all(definitions, mode, &self.plugin_names())?;
        Ok(self)
    }

    #[must_use]
    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }
}

fn load_plugins(names: &[String]) -> Result<Vec<Box<dyn MetadataPlugin>>> {
    let mut plugins: Vec<Box<dyn MetadataPlugin>> = Vec::new();
    for name in names {
        let plugin = plugin_by_name(name.trim())
            .ok_or_else(|| TaggoError::InvalidInput(format!("Unknown metadata plugin '{name}'")))?;
        if plugins.iter().all(|p| p.name() != plugin.name()) {
            plugins.push(plugin);
        }
    }
    Ok(plugins)
}

/// Parse `key.path=value` metadata defaults
///
/// # Errors
/// Returns `TaggoError::InvalidInput` for entries without `=` and key path
/// errors for invalid keys.
pub fn parse_defaults<S: AsRef<str>>(entries: &[S]) -> Result<Vec<(KeyPath, Value)>> {
    entries
        .iter()
        .map(|entry| {
            let entry = entry.as_ref();
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| TaggoError::InvalidInput(format!("Invalid metadata default '{entry}', expected key=value")))?;
            Ok((KeyPath::parse(key)?, Value::String(value.to_string())))
        })
        .collect()
}

/// Counts of what a run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tagged files and folders seen
    pub entries: usize,
    pub created: usize,
    pub replaced: usize,
    pub unchanged: usize,
    /// Links left alone because of the collision policy
    pub kept: usize,
    /// Entries or tags dropped by filters
    pub filtered: usize,
}

impl RunSummary {
    fn record(&mut self, placement: Placement) {
        match placement {
            Placement::Created => self.created += 1,
            Placement::Replaced => self.replaced += 1,
            Placement::Unchanged => self.unchanged += 1,
            Placement::Skipped => self.kept += 1,
        }
    }
}

/// Everything one materialize run needs while walking
struct Materializer<'a> {
    options: &'a RunOptions,
    link_root: PathBuf,
    store: MetadataStore,
    summary: RunSummary,
}

/// Execute the run command: materialize links for `src` below `dst`
///
/// # Errors
/// Returns an error if `src` is missing, `dst` is not a directory, a template
/// cannot be rendered, a collision aborts the run, or filesystem calls fail.
pub fn execute(src: &Path, dst: &Path, options: &RunOptions) -> Result<RunSummary> {
    let src = collision::normalize(&std::path::absolute(src)?);
    let dst = collision::normalize(&std::path::absolute(dst)?);
    debug!(src = %src.display(), dst = %dst.display(), "starting run");

    let src_meta = fs::metadata(&src).map_err(|_| TaggoError::PathNotFound(src.clone()))?;
    if dst.exists() && !dst.is_dir() {
        return Err(TaggoError::DestinationNotDirectory(dst));
    }

    let mut run = Materializer {
        options,
        link_root: dst.clone(),
        store: MetadataStore::new(),
        summary: RunSummary::default(),
    };
    run.fill_global(&src);

    if src_meta.is_file() {
        // A single file only counts its own tags, never those of its folders
        let root = src.parent().unwrap_or(&src).to_path_buf();
        run.process(&root, &src, false)?;
    } else {
        let policy = WalkPolicy {
            skip_hidden: options.skip_hidden,
            exclude: dst.starts_with(&src).then(|| dst.clone()),
        };
        for visit in TreeWalk::new(&src, policy) {
            let visit = match visit {
                Ok(visit) => visit,
                Err(e) if !e.is_root() => {
                    warn!(path = %e.path().display(), error = %e, "skipping unreadable directory");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            run.process(&src, &visit.dir, true)?;
            for file in &visit.files {
                run.process(&src, file, false)?;
            }
        }
    }

    if options.auto_cleanup {
        if dst.is_dir() {
            commands::cleanup(&dst, options.dry_run)?;
        } else {
            debug!(dst = %dst.display(), "nothing to clean up");
        }
    }

    info!(
        entries = run.summary.entries,
        created = run.summary.created,
        replaced = run.summary.replaced,
        unchanged = run.summary.unchanged,
        kept = run.summary.kept,
        filtered = run.summary.filtered,
        dry_run = options.dry_run,
        "run finished"
    );
    Ok(run.summary)
}

impl Materializer<'_> {
    fn fill_global(&mut self, src: &Path) {
        let now = Local::now();
        self.store.add(Scope::Global, "src", src.to_string_lossy().into_owned());
        self.store.add(Scope::Global, "dst", self.link_root.to_string_lossy().into_owned());
        self.store.add(Scope::Global, "tag-char", self.options.syntax.tag_char().to_string());
        self.store.add(Scope::Global, "version", env!("CARGO_PKG_VERSION"));
        self.store.add(
            Scope::Global,
            "now",
            json!({
                "iso": now.format("%Y-%m-%dT%H:%M:%S").to_string(),
                "year": now.year(),
                "month": now.month(),
                "day": now.day(),
            }),
        );
    }

    fn apply_defaults(&mut self) -> Result<()> {
        for (key, value) in &self.options.defaults {
            self.store.insert_default(key, value.clone())?;
        }
        Ok(())
    }

    fn passes(&mut self, checkpoint: &Checkpoint, path: &Path) -> bool {
        let mut verdict = self.options.filters.check(checkpoint, &self.store);
        if *checkpoint == Checkpoint::Late
            && !verdict.is_skip()
            && let Some(query) = &self.options.query
        {
            verdict = query.check(&self.store);
        }
        match verdict {
            Verdict::Proceed => true,
            Verdict::Skip(reason) => {
                debug!(path = %path.display(), reason = %reason, "filtered");
                self.summary.filtered += 1;
                false
            }
        }
    }

    /// Materialize every tag of one file or folder
    fn process(&mut self, root: &Path, path: &Path, is_dir: bool) -> Result<()> {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return Ok(());
        };
        let syntax = &self.options.syntax;
        if !syntax.may_contain_tags(&name) {
            return Ok(());
        }
        let tags = syntax.tags_in(&name);
        if tags.is_empty() {
            return Ok(());
        }
        debug!(path = %path.display(), tags = ?tags.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), "tagged entry");
        self.summary.entries += 1;

        self.store.clear(Scope::Path);
        self.store.clear(Scope::Tag);
        self.store.add_multiple(
            Scope::Path,
            describe_path(root, path, is_dir, &self.options.hierarchy_separator),
        );
        if !self.passes(&Checkpoint::Early, path) {
            return Ok(());
        }

        if !is_dir {
            let options = self.options;
            for plugin in &options.plugins {
                let data = plugin.run(path);
                self.store.add(Scope::Path, plugin.name(), Value::Object(data));
                if !self.passes(&Checkpoint::Plugin(plugin.name().to_string()), path) {
                    return Ok(());
                }
            }
        }

        for tag in &tags {
            self.store.clear(Scope::Tag);
            self.store
                .add_multiple(Scope::Tag, describe_tag(tag, self.options.subtag_separator));
            self.apply_defaults()?;
            if !self.passes(&Checkpoint::Late, path) {
                continue;
            }
            self.link(path, is_dir)?;
        }
        Ok(())
    }

    fn link(&mut self, source: &Path, is_dir: bool) -> Result<()> {
        let template = self.options.templates.for_kind(is_dir);
        let name = template.render(&self.store, &self.options.hierarchy_separator)?;
        let link = collision::normalize(&self.link_root.join(&name));
        let parent = link.parent().unwrap_or(&self.link_root);
        let target = collision::relative_path(source, parent);
        debug!(link = %link.display(), target = %target.display(), "computed link");

        let resolution = collision::resolve(self.options.collision, &link, &self.link_root, &target)?;
        let placement = collision::place_link(&link, &target, &resolution, self.options.dry_run)?;
        self.summary.record(placement);
        Ok(())
    }
}
